//! Spherical mercator projection and tile/pixel math for a fixed tile size.
//!
//! A [`SphericalMercator`] precomputes its per-zoom constants once and is
//! immutable afterwards, so a single instance is shared across every
//! concurrent branch of a query. [`SphericalMercator::shared`] hands out one
//! process-wide instance per tile size.

use std::f64::consts::PI;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use ahash::AHashMap;

use crate::error::{QueryError, QueryResult};
use crate::geometry::{LngLat, TileCoord};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest zoom level the projection precomputes.
pub const MAX_ZOOM: u8 = 30;

/// WGS84 semi-major axis in meters
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the earth's circumference in Web Mercator meters
const HALF_EARTH: f64 = 20_037_508.342_789_244;

/// Latitudes are clamped through sin(lat) to keep the mercator y finite.
const SIN_LAT_LIMIT: f64 = 0.9999;

#[derive(Debug, Clone, Copy)]
struct ZoomLevel {
    px_per_degree: f64,
    px_per_radian: f64,
    /// Pixel coordinate of (0, 0)
    center: f64,
    /// Width and height of the global pixel plane
    size: f64,
}

/// Forward projection and pixel math for one tile size.
#[derive(Debug)]
pub struct SphericalMercator {
    tile_size: u32,
    levels: Vec<ZoomLevel>,
}

impl SphericalMercator {
    /// Build the per-zoom lookup table for `tile_size` pixel tiles.
    #[must_use]
    pub fn new(tile_size: u32) -> Self {
        let mut size = f64::from(tile_size);
        let mut levels = Vec::with_capacity(usize::from(MAX_ZOOM) + 1);

        for _ in 0..=MAX_ZOOM {
            levels.push(ZoomLevel {
                px_per_degree: size / 360.0,
                px_per_radian: size / (2.0 * PI),
                center: size / 2.0,
                size,
            });
            size *= 2.0;
        }

        Self { tile_size, levels }
    }

    /// Process-wide instance for `tile_size`, created on first use.
    ///
    /// Instances are never evicted: the registry holds one table per distinct
    /// tile size for the life of the process. Public entry points reject a
    /// zero tile size before reaching it.
    pub fn shared(tile_size: u32) -> Arc<SphericalMercator> {
        static REGISTRY: LazyLock<Mutex<AHashMap<u32, Arc<SphericalMercator>>>> =
            LazyLock::new(|| Mutex::new(AHashMap::new()));

        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            registry
                .entry(tile_size)
                .or_insert_with(|| Arc::new(SphericalMercator::new(tile_size))),
        )
    }

    #[inline]
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn level(&self, zoom: u8) -> QueryResult<&ZoomLevel> {
        self.levels.get(usize::from(zoom)).ok_or_else(|| {
            QueryError::InvalidInput(format!("zoom {zoom} exceeds maximum zoom {MAX_ZOOM}"))
        })
    }

    /// Project to spherical mercator meters (EPSG:3857), clamped to the world extent.
    #[must_use]
    pub fn forward(&self, p: LngLat) -> (f64, f64) {
        let x = EARTH_RADIUS * p.lng.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + 0.5 * p.lat.to_radians()).tan().ln();
        (x.clamp(-HALF_EARTH, HALF_EARTH), y.clamp(-HALF_EARTH, HALF_EARTH))
    }

    /// Global pixel coordinate of `p` at `zoom`, rounded to whole pixels.
    pub fn px(&self, p: LngLat, zoom: u8) -> QueryResult<(f64, f64)> {
        if !p.is_finite() {
            return Err(QueryError::InvalidInput(format!(
                "coordinate {p} is not a finite number"
            )));
        }
        let level = self.level(zoom)?;

        let f = p.lat.to_radians().sin().clamp(-SIN_LAT_LIMIT, SIN_LAT_LIMIT);
        let x = (level.center + p.lng * level.px_per_degree).round();
        let y = (level.center + 0.5 * ((1.0 + f) / (1.0 - f)).ln() * -level.px_per_radian).round();

        Ok((x.min(level.size), y.min(level.size)))
    }

    /// Tile holding `p` at `zoom`.
    ///
    /// Computed as the minimum tile of the degenerate box `[p, p]`, so a
    /// point sitting exactly on a seam belongs to the tile west/north of it.
    pub fn tile_containing(&self, p: LngLat, zoom: u8) -> QueryResult<TileCoord> {
        let (px, py) = self.px(p, zoom)?;
        let size = f64::from(self.tile_size);

        let index = |v: f64| -> u32 {
            let lower = (v / size).floor().min(((v - 1.0) / size).floor());
            lower.max(0.0) as u32
        };

        Ok(TileCoord::new(zoom, index(px), index(py)))
    }
}

/// Reject tile sizes that cannot describe a pixel plane.
pub(crate) fn check_tile_size(tile_size: u32) -> QueryResult<()> {
    if tile_size == 0 {
        return Err(QueryError::InvalidInput("tile_size must be positive".into()));
    }
    Ok(())
}

impl Default for SphericalMercator {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE)
    }
}
