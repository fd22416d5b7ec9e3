pub mod projection;

use std::fmt;

/// A geographic coordinate in degrees (EPSG:4326).
///
/// Coordinates are always stored longitude first, matching GeoJSON and the
/// `[lng, lat]` arrays callers usually hold.
///
/// # Example
///
/// ```rust
/// use tilequery::LngLat;
///
/// let sf = LngLat::new(-122.4, 37.8);
/// assert_eq!(sf.lng, -122.4);
///
/// let from_array: LngLat = [-122.4, 37.8].into();
/// assert_eq!(sf, from_array);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl LngLat {
    #[inline]
    #[must_use]
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Both components are finite numbers.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lng, self.lat)
    }
}

impl From<(f64, f64)> for LngLat {
    #[inline]
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

impl From<[f64; 2]> for LngLat {
    #[inline]
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl From<LngLat> for [f64; 2] {
    #[inline]
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

/// An input coordinate tagged with its position in the caller's point list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    pub lnglat: LngLat,
    /// Original index, used to restore input order after sampling
    pub id: usize,
}

impl QueryPoint {
    #[inline]
    #[must_use]
    pub fn new(lnglat: LngLat, id: usize) -> Self {
        Self { lnglat, id }
    }

    /// Tag each coordinate with its index in `points`.
    #[must_use]
    pub fn enumerate(points: &[LngLat]) -> Vec<QueryPoint> {
        points
            .iter()
            .enumerate()
            .map(|(id, &lnglat)| QueryPoint::new(lnglat, id))
            .collect()
    }
}

/// A tile in the z/x/y slippy-map pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,
    /// Column, 0 at the antimeridian
    pub x: u32,
    /// Row, 0 at the north edge
    pub y: u32,
}

impl TileCoord {
    #[inline]
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Global pixel coordinate of this tile's top-left corner.
    #[inline]
    #[must_use]
    pub fn origin_px(&self, tile_size: u32) -> (f64, f64) {
        (
            f64::from(self.x) * f64::from(tile_size),
            f64::from(self.y) * f64::from(tile_size),
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Extent {
    /// Smallest extent containing every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LngLat>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Extent {
            west: first.lng,
            south: first.lat,
            east: first.lng,
            north: first.lat,
        };

        Some(iter.fold(init, |acc, p| Extent {
            west: acc.west.min(p.lng),
            south: acc.south.min(p.lat),
            east: acc.east.max(p.lng),
            north: acc.north.max(p.lat),
        }))
    }

    #[inline]
    #[must_use]
    pub fn south_west(&self) -> LngLat {
        LngLat::new(self.west, self.south)
    }

    #[inline]
    #[must_use]
    pub fn north_east(&self) -> LngLat {
        LngLat::new(self.east, self.north)
    }

    #[inline]
    #[must_use]
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    #[inline]
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lnglat_from_array_and_tuple() {
        let a: LngLat = [-121.0, 39.0].into();
        let b: LngLat = (-121.0, 39.0).into();
        assert_eq!(a, b);
        assert_eq!(a.lng, -121.0);
        assert_eq!(a.lat, 39.0);

        let back: [f64; 2] = a.into();
        assert_eq!(back, [-121.0, 39.0]);
    }

    #[test]
    fn test_lnglat_is_finite() {
        assert!(LngLat::new(10.0, 20.0).is_finite());
        assert!(!LngLat::new(f64::NAN, 20.0).is_finite());
        assert!(!LngLat::new(10.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_query_point_enumerate() {
        let points = [LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0)];
        let tagged = QueryPoint::enumerate(&points);
        assert_eq!(tagged.len(), 2);
        assert_eq!(tagged[0].id, 0);
        assert_eq!(tagged[1].id, 1);
        assert_eq!(tagged[1].lnglat, points[1]);
    }

    #[test]
    fn test_tile_coord_display_and_origin() {
        let tile = TileCoord::new(16, 10642, 24989);
        assert_eq!(tile.to_string(), "16/10642/24989");
        assert_eq!(tile.origin_px(256), (2_724_352.0, 6_397_184.0));
    }

    #[test]
    fn test_extent_from_points() {
        let extent = Extent::from_points([
            LngLat::new(-10.0, 5.0),
            LngLat::new(20.0, -3.0),
            LngLat::new(0.0, 40.0),
        ])
        .unwrap();

        assert_eq!(extent.west, -10.0);
        assert_eq!(extent.east, 20.0);
        assert_eq!(extent.south, -3.0);
        assert_eq!(extent.north, 40.0);
        assert_eq!(extent.lng_span(), 30.0);
        assert_eq!(extent.lat_span(), 43.0);
    }

    #[test]
    fn test_extent_empty() {
        assert!(Extent::from_points(std::iter::empty()).is_none());
    }
}
