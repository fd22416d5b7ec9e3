//! Pixel extraction from decoded tiles.
//!
//! Decoding is delegated to a [`TileDecoder`]; [`ImageDecoder`] is the
//! default and handles whatever formats the `image` crate was built with.

use image::{DynamicImage, GenericImageView, Rgba};

use crate::error::{BoxError, QueryError, QueryResult};
use crate::geometry::projection::{check_tile_size, SphericalMercator};
use crate::geometry::{LngLat, TileCoord};

/// An RGBA pixel read from a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    /// Whether the color channels are premultiplied by alpha
    pub premultiplied: bool,
}

impl PixelColor {
    #[must_use]
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r,
            g,
            b,
            a,
            premultiplied: false,
        }
    }
}

impl From<Rgba<u8>> for PixelColor {
    fn from(Rgba([r, g, b, a]): Rgba<u8>) -> Self {
        PixelColor::rgba(r, g, b, a)
    }
}

/// The value sampled for one query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    /// `None` when the point's tile does not exist
    pub pixel: Option<PixelColor>,
    pub lnglat: LngLat,
    /// Index of the point in the caller's input
    pub id: usize,
}

/// A decoded raster tile.
pub trait DecodedTile {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Color at tile-local pixel `(x, y)`; callers guarantee it is in bounds.
    fn pixel(&self, x: u32, y: u32) -> PixelColor;
}

/// Turns raw tile bytes into a [`DecodedTile`].
pub trait TileDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DecodedTile>, BoxError>;
}

/// [`TileDecoder`] backed by the `image` crate, format sniffed from the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DecodedTile>, BoxError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Box::new(img))
    }
}

impl DecodedTile for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn pixel(&self, x: u32, y: u32) -> PixelColor {
        self.get_pixel(x, y).into()
    }
}

/// Sample `points` from an encoded tile using the default [`ImageDecoder`].
///
/// `ids[i]` is the original index of `points[i]`.
pub fn get_pixels(
    bytes: &[u8],
    points: &[LngLat],
    tile: TileCoord,
    tile_size: u32,
    ids: &[usize],
) -> QueryResult<Vec<PixelSample>> {
    check_tile_size(tile_size)?;
    let projection = SphericalMercator::shared(tile_size);
    get_pixels_with(bytes, points, tile, ids, &projection, &ImageDecoder)
}

/// Sample `points` from an encoded tile with an explicit projection and decoder.
///
/// # Errors
///
/// Fails if the tile cannot be decoded, is not square, does not match the
/// projection's tile size, or if a point lands outside the tile.
pub fn get_pixels_with(
    bytes: &[u8],
    points: &[LngLat],
    tile: TileCoord,
    ids: &[usize],
    projection: &SphericalMercator,
    decoder: &dyn TileDecoder,
) -> QueryResult<Vec<PixelSample>> {
    check_aligned(points, ids)?;

    let tile_size = projection.tile_size();
    let image = decoder
        .decode(bytes)
        .map_err(|source| QueryError::Decode { tile, source })?;
    let (width, height) = (image.width(), image.height());

    if width != height {
        return Err(QueryError::NonSquareTile { tile, width, height });
    }
    if width != tile_size {
        return Err(QueryError::TileSizeMismatch {
            tile,
            expected: tile_size,
            actual: width,
        });
    }

    let (origin_x, origin_y) = tile.origin_px(tile_size);
    let limit = i64::from(tile_size);

    points
        .iter()
        .zip(ids)
        .map(|(&lnglat, &id)| {
            let (px, py) = projection.px(lnglat, tile.z)?;
            let x = (px - origin_x) as i64;
            let y = (py - origin_y) as i64;

            if x < 0 || y < 0 || x >= limit || y >= limit {
                return Err(QueryError::PointOutsideTile { tile, lnglat, x, y });
            }

            Ok(PixelSample {
                pixel: Some(image.pixel(x as u32, y as u32)),
                lnglat,
                id,
            })
        })
        .collect()
}

/// Samples for a tile that does not exist: every pixel is `None`.
pub fn empty_pixel_response(points: &[LngLat], ids: &[usize]) -> QueryResult<Vec<PixelSample>> {
    check_aligned(points, ids)?;

    Ok(points
        .iter()
        .zip(ids)
        .map(|(&lnglat, &id)| PixelSample {
            pixel: None,
            lnglat,
            id,
        })
        .collect())
}

fn check_aligned(points: &[LngLat], ids: &[usize]) -> QueryResult<()> {
    if points.len() != ids.len() {
        return Err(QueryError::InvalidInput(format!(
            "{} points but {} ids",
            points.len(),
            ids.len()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{coordinate_tile, png, solid_tile};
    use super::*;

    const SIERRA_TILE: TileCoord = TileCoord { z: 16, x: 10642, y: 24989 };

    #[test]
    fn test_single_point_in_known_tile() {
        let bytes = coordinate_tile(256);
        let point = LngLat::new(-121.539, 39.2429);

        let samples = get_pixels(&bytes, &[point], SIERRA_TILE, 256, &[0]).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].id, 0);
        assert_eq!(samples[0].lnglat, point);
        assert_eq!(samples[0].pixel, Some(PixelColor::rgba(128, 127, 7, 255)));
    }

    #[test]
    fn test_ids_are_carried_through() {
        let bytes = solid_tile(256, [10, 20, 30, 40]);
        let points = [LngLat::new(-121.539, 39.2429), LngLat::new(-121.5395, 39.2425)];

        let samples = get_pixels(&bytes, &points, SIERRA_TILE, 256, &[5, 2]).unwrap();
        assert_eq!(samples.iter().map(|s| s.id).collect::<Vec<_>>(), vec![5, 2]);
        for s in &samples {
            assert_eq!(s.pixel, Some(PixelColor::rgba(10, 20, 30, 40)));
        }
    }

    #[test]
    fn test_non_square_tile_fails() {
        let bytes = png(256, 128, |_, _| Rgba([0, 0, 0, 255]));
        let err = get_pixels(&bytes, &[LngLat::new(-121.539, 39.2429)], SIERRA_TILE, 256, &[0])
            .unwrap_err();

        match err {
            QueryError::NonSquareTile { tile, width, height } => {
                assert_eq!(tile, SIERRA_TILE);
                assert_eq!((width, height), (256, 128));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tile_size_mismatch_fails() {
        let bytes = solid_tile(512, [0, 0, 0, 255]);
        let err = get_pixels(&bytes, &[LngLat::new(-121.539, 39.2429)], SIERRA_TILE, 256, &[0])
            .unwrap_err();

        assert!(matches!(
            err,
            QueryError::TileSizeMismatch { expected: 256, actual: 512, .. }
        ));
    }

    #[test]
    fn test_point_on_seam_is_outside_tile() {
        // (0, 0) maps to global pixel (256, 256) at zoom 1, one past tile 1/0/0
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(0.0, 0.0)], TileCoord::new(1, 0, 0), 256, &[0])
            .unwrap_err();

        match err {
            QueryError::PointOutsideTile { x, y, .. } => assert_eq!((x, y), (256, 256)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_point_in_another_tile_fails() {
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(120.0, -40.0)], SIERRA_TILE, 256, &[0])
            .unwrap_err();
        assert!(matches!(err, QueryError::PointOutsideTile { .. }));
    }

    #[test]
    fn test_point_north_west_of_tile_fails() {
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(-121.6, 39.3)], SIERRA_TILE, 256, &[0])
            .unwrap_err();

        match err {
            QueryError::PointOutsideTile { tile, x, y, .. } => {
                assert_eq!(tile, SIERRA_TILE);
                assert!(x < 0, "x = {x}");
                assert!(y < 0, "y = {y}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_point_beyond_mercator_limit_fails() {
        // 86N projects above the top edge of the pixel plane
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(10.0, 86.0)], TileCoord::new(2, 2, 0), 256, &[0])
            .unwrap_err();

        match err {
            QueryError::PointOutsideTile { x, y, .. } => {
                assert!((0..256).contains(&x), "x = {x}");
                assert!(y < 0, "y = {y}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(0.0, 0.0)], SIERRA_TILE, 0, &[0]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = get_pixels(b"not an image", &[LngLat::new(0.0, 0.0)], SIERRA_TILE, 256, &[0])
            .unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }));
    }

    #[test]
    fn test_misaligned_ids_fail() {
        let bytes = coordinate_tile(256);
        let err = get_pixels(&bytes, &[LngLat::new(-121.539, 39.2429)], SIERRA_TILE, 256, &[0, 1])
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_pixel_response() {
        let points = [LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0)];
        let samples = empty_pixel_response(&points, &[3, 9]).unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.pixel.is_none()));
        assert_eq!(samples[0].id, 3);
        assert_eq!(samples[1].lnglat, points[1]);
    }

    struct FlatDecoder;

    struct Flat(u32);

    impl DecodedTile for Flat {
        fn width(&self) -> u32 {
            self.0
        }

        fn height(&self) -> u32 {
            self.0
        }

        fn pixel(&self, x: u32, y: u32) -> PixelColor {
            PixelColor {
                r: x as u8,
                g: y as u8,
                b: 0,
                a: 255,
                premultiplied: true,
            }
        }
    }

    impl TileDecoder for FlatDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<Box<dyn DecodedTile>, BoxError> {
            Ok(Box::new(Flat(u32::from(bytes[0]) * 2)))
        }
    }

    #[test]
    fn test_custom_decoder() {
        let sm = SphericalMercator::new(256);
        let samples = get_pixels_with(
            &[128],
            &[LngLat::new(-121.539, 39.2429)],
            SIERRA_TILE,
            &[0],
            &sm,
            &FlatDecoder,
        )
        .unwrap();

        let pixel = samples[0].pixel.unwrap();
        assert!(pixel.premultiplied);
        assert_eq!((pixel.r, pixel.g), (128, 127));
    }
}
