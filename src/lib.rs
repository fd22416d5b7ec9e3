//! # tilequery - Point sampling for tiled raster pyramids
//!
//! Answers "what raster value sits under each of these points?" against a
//! z/x/y tile pyramid without the caller dealing with tile boundaries, zoom
//! levels or pixel math.
//!
//! ## Features
//!
//! - **Zoom estimation**: picks a zoom from the spread of the query points
//! - **Minimal tile set**: each tile under the query is fetched exactly once
//! - **Concurrent loading**: tiles are fetched through your own async loader
//! - **Missing tiles**: "tile not found" yields empty samples, not an error
//! - **Stable output**: results come back in input order regardless of which
//!   tile finished first
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tilequery::{LngLat, LoadError, PointQuery, TileCoord};
//!
//! let loader = |tile: TileCoord| async move {
//!     let path = format!("tiles/{}/{}/{}.png", tile.z, tile.x, tile.y);
//!     tokio::fs::read(path).await.map_err(LoadError::from)
//! };
//!
//! let samples = PointQuery::new(loader)
//!     .zoom_range(0, 16)
//!     .query(&[LngLat::new(-121.54, 39.24)])
//!     .await?;
//!
//! println!("{:?}", samples[0].pixel);
//! ```
//!
//! ## Architecture
//!
//! - [`geometry`]: coordinate types and the spherical mercator projection
//! - [`zoom`]: zoom level estimation
//! - [`tile_query`]: partitioning points into per-tile buckets
//! - [`loader`]: concurrent tile loading through a [`TileLoader`]
//! - [`pixel`]: tile decoding and per-point pixel extraction
//! - [`point_query`]: result assembly and the [`PointQuery`] builder
//! - [`error`]: the [`QueryError`] and [`LoadError`] types

// ============================================================================
// Public modules
// ============================================================================

pub mod error;
pub mod geometry;
pub mod loader;
pub mod pixel;
pub mod point_query;
pub mod tile_query;
pub mod zoom;

// ============================================================================
// Errors
// ============================================================================

pub use error::{BoxError, LoadError, QueryError, QueryResult};

// ============================================================================
// Geometry & Projection
// ============================================================================

pub use geometry::projection::{SphericalMercator, DEFAULT_TILE_SIZE, MAX_ZOOM};
pub use geometry::{Extent, LngLat, QueryPoint, TileCoord};

// ============================================================================
// Query Pipeline
// ============================================================================
// Primary API: PointQuery::new(loader).zoom_range(..).query(&points).await

pub use loader::{load_tiles, LoadOptions, TileLoader};
pub use point_query::{multi_query, multi_query_with, query_points, PointQuery};
pub use tile_query::{build_query, TileQuery};
pub use zoom::estimate_zoom;

// ============================================================================
// Pixel Sampling
// ============================================================================

pub use pixel::{
    empty_pixel_response,
    get_pixels,
    get_pixels_with,
    DecodedTile,
    ImageDecoder,
    PixelColor,
    PixelSample,
    TileDecoder,
};
