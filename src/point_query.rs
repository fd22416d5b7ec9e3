//! Point queries against a tiled raster pyramid.
//!
//! This module ties the pipeline together: [`multi_query`] samples a set of
//! loaded tiles and restores the caller's point order, and the [`PointQuery`]
//! builder runs the whole thing from raw coordinates.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilequery::{LngLat, LoadError, PointQuery, TileCoord};
//!
//! let loader = |tile: TileCoord| async move {
//!     let url = format!("https://tiles.example.com/{}/{}/{}.png", tile.z, tile.x, tile.y);
//!     fetch(&url).await
//! };
//!
//! let samples = PointQuery::new(loader)
//!     .zoom_range(0, 16)
//!     .query(&[LngLat::new(-122.4, 37.8), LngLat::new(-122.3, 37.7)])
//!     .await?;
//!
//! for sample in &samples {
//!     println!("{} -> {:?}", sample.lnglat, sample.pixel);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::geometry::projection::{check_tile_size, SphericalMercator};
use crate::geometry::LngLat;
use crate::loader::{load_tiles, LoadOptions, TileLoader};
use crate::pixel::{empty_pixel_response, get_pixels_with, ImageDecoder, PixelSample, TileDecoder};
use crate::tile_query::TileQuery;

/// Sample loaded tiles with the default [`ImageDecoder`].
///
/// Returns one [`PixelSample`] per point across all tiles, sorted by id.
/// Must be called from within a tokio runtime.
pub async fn multi_query(tiles: Vec<TileQuery>, tile_size: u32) -> QueryResult<Vec<PixelSample>> {
    multi_query_with(tiles, tile_size, Arc::new(ImageDecoder)).await
}

/// Sample loaded tiles with a custom decoder.
///
/// Each tile is decoded on tokio's blocking pool. The first failing tile
/// aborts the whole call.
pub async fn multi_query_with(
    tiles: Vec<TileQuery>,
    tile_size: u32,
    decoder: Arc<dyn TileDecoder>,
) -> QueryResult<Vec<PixelSample>> {
    check_tile_size(tile_size)?;
    let projection = SphericalMercator::shared(tile_size);

    let tasks = tiles.into_iter().map(|query| {
        let projection = Arc::clone(&projection);
        let decoder = Arc::clone(&decoder);
        async move {
            if query.empty {
                return empty_pixel_response(&query.points, &query.point_ids);
            }

            tokio::task::spawn_blocking(move || sample_tile(&query, &projection, decoder.as_ref()))
                .await
                .map_err(|e| QueryError::TaskJoin(e.to_string()))?
        }
    });

    let mut samples: Vec<PixelSample> = try_join_all(tasks).await?.into_iter().flatten().collect();
    samples.sort_unstable_by_key(|s| s.id);
    Ok(samples)
}

fn sample_tile(
    query: &TileQuery,
    projection: &SphericalMercator,
    decoder: &dyn TileDecoder,
) -> QueryResult<Vec<PixelSample>> {
    let Some(data) = query.data.as_deref() else {
        return Err(QueryError::InvalidInput(format!(
            "tile {} has not been loaded",
            query.tile
        )));
    };
    get_pixels_with(data, &query.points, query.tile, &query.point_ids, projection, decoder)
}

/// Load and sample every point in one call.
///
/// Equivalent to [`load_tiles`] followed by [`multi_query`].
pub async fn query_points<L>(
    points: &[LngLat],
    options: &LoadOptions,
    loader: &L,
) -> QueryResult<Vec<PixelSample>>
where
    L: TileLoader,
{
    run_query(points, options, loader, Arc::new(ImageDecoder)).await
}

async fn run_query<L>(
    points: &[LngLat],
    options: &LoadOptions,
    loader: &L,
    decoder: Arc<dyn TileDecoder>,
) -> QueryResult<Vec<PixelSample>>
where
    L: TileLoader,
{
    let tiles = load_tiles(points, options, loader).await?;
    let samples = multi_query_with(tiles, options.resolved_tile_size(), decoder).await?;
    debug!(samples = samples.len(), "Point query complete");
    Ok(samples)
}

/// Builder for point queries.
///
/// ```rust,ignore
/// let samples = PointQuery::new(loader)
///     .zoom_range(0, 16)
///     .tile_size(512)
///     .query(&points)
///     .await?;
/// ```
pub struct PointQuery<L> {
    loader: L,
    options: LoadOptions,
    decoder: Arc<dyn TileDecoder>,
}

impl<L: TileLoader> PointQuery<L> {
    /// Create a query that fetches tiles through `loader`.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            options: LoadOptions::default(),
            decoder: Arc::new(ImageDecoder),
        }
    }

    /// Replace all load options at once.
    #[must_use]
    pub fn options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the zoom range the estimator may choose from
    #[must_use]
    pub fn zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.options = self.options.with_zoom_range(min_zoom, max_zoom);
        self
    }

    /// Sample at a fixed zoom instead of estimating one
    #[must_use]
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.options = self.options.with_zoom(zoom);
        self
    }

    #[must_use]
    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.options = self.options.with_tile_size(tile_size);
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.options = self.options.with_max_concurrency(limit);
        self
    }

    /// Use a custom tile decoder
    #[must_use]
    pub fn decoder<D>(mut self, decoder: D) -> Self
    where
        D: TileDecoder + 'static,
    {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Sample every point, returning results in input order.
    pub async fn query(&self, points: &[LngLat]) -> QueryResult<Vec<PixelSample>> {
        run_query(points, &self.options, &self.loader, Arc::clone(&self.decoder)).await
    }
}

impl<L> fmt::Debug for PointQuery<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointQuery")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
