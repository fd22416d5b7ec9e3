//! Zoom level selection for point queries.
//!
//! When the caller does not pin a zoom, [`estimate_zoom`] picks one from the
//! spread of the query points: the dominant axis of their bounding box is cut
//! into `2 * N` slices and the zoom is chosen so a single tile spans roughly
//! one slice. The number of tiles to load therefore grows with the number of
//! points rather than with the area they cover.

use crate::geometry::projection::{SphericalMercator, DEFAULT_TILE_SIZE};
use crate::geometry::{Extent, LngLat};

/// Longitude span of the mercator world in degrees.
const WORLD_LNG_SPAN: f64 = 360.0;

/// Latitude span of the mercator world in degrees (2 x 85.05112878).
const WORLD_LAT_SPAN: f64 = 170.102_257_56;

/// Estimate a zoom level in `[min_zoom, max_zoom]` for sampling `points`.
///
/// The projected x/y ranges of the bounding box only pick the dominant axis.
/// That axis's degree span is divided into `2 * N` slices and the result is
/// the zoom at which one `tile_size` tile covers about one slice:
/// `floor(log2(world_span / slice) - log2(tile_size / 256))`, with a world
/// span of 360 degrees for longitude and 170.10225756 for latitude. This
/// targets tile-sized cells rather than single screen pixels.
///
/// A single point (or no points) samples at `max_zoom`, as do points that all
/// share one location and a zero `tile_size`.
#[must_use]
pub fn estimate_zoom(points: &[LngLat], min_zoom: u8, max_zoom: u8, tile_size: u32) -> u8 {
    let min_zoom = min_zoom.min(max_zoom);

    if points.len() <= 1 || tile_size == 0 {
        return max_zoom;
    }
    let Some(extent) = Extent::from_points(points.iter().copied()) else {
        return max_zoom;
    };

    let projection = SphericalMercator::shared(tile_size);
    let (min_x, min_y) = projection.forward(extent.south_west());
    let (max_x, max_y) = projection.forward(extent.north_east());
    let x_range = (max_x - min_x).abs();
    let y_range = (max_y - min_y).abs();

    let slices = (points.len() * 2) as f64;
    let (world_span, slice) = if x_range > y_range {
        (WORLD_LNG_SPAN, extent.lng_span() / slices)
    } else {
        (WORLD_LAT_SPAN, extent.lat_span() / slices)
    };

    if slice.is_nan() || slice <= 0.0 {
        return max_zoom;
    }

    let tile_scale = (f64::from(tile_size) / f64::from(DEFAULT_TILE_SIZE)).log2();
    let zoom = ((world_span / slice).log2() - tile_scale).floor();

    if zoom.is_nan() {
        return max_zoom;
    }
    zoom.clamp(f64::from(min_zoom), f64::from(max_zoom)) as u8
}
