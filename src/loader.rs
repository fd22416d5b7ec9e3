//! Concurrent tile loading for a point query.
//!
//! [`load_tiles`] validates the query, picks a zoom, partitions the points by
//! tile and calls the caller's [`TileLoader`] once per distinct tile. All
//! loads run concurrently on the calling task.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilequery::{load_tiles, LoadError, LoadOptions, LngLat, TileCoord};
//!
//! let loader = |tile: TileCoord| async move {
//!     let path = format!("tiles/{}/{}/{}.png", tile.z, tile.x, tile.y);
//!     tokio::fs::read(path).await.map_err(LoadError::from)
//! };
//!
//! let options = LoadOptions::new(0, 16);
//! let tiles = load_tiles(&[LngLat::new(-122.4, 37.8)], &options, &loader).await?;
//! ```

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join_all;
use futures::{stream, StreamExt, TryFutureExt, TryStreamExt};
use tracing::{debug, warn};

use crate::error::{LoadError, QueryError, QueryResult};
use crate::geometry::projection::{check_tile_size, SphericalMercator, DEFAULT_TILE_SIZE, MAX_ZOOM};
use crate::geometry::{LngLat, QueryPoint, TileCoord};
use crate::tile_query::{build_query, TileQuery};
use crate::zoom::estimate_zoom;

/// Source of raw tile bytes.
///
/// Return [`LoadError::TileNotFound`] for tiles that do not exist; the query
/// treats those as empty. Any other error aborts the query.
///
/// Implemented for any `Fn(TileCoord) -> impl Future<Output = Result<Vec<u8>, LoadError>>`.
pub trait TileLoader: Send + Sync {
    fn load(&self, tile: TileCoord) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

impl<F, Fut> TileLoader for F
where
    F: Fn(TileCoord) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>, LoadError>> + Send,
{
    fn load(&self, tile: TileCoord) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
        self(tile)
    }
}

/// Options for loading the tiles under a set of points.
///
/// `min_zoom` and `max_zoom` are required; everything else has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Lowest zoom the estimator may pick
    pub min_zoom: Option<u8>,
    /// Highest zoom the estimator may pick
    pub max_zoom: Option<u8>,
    /// Fixed zoom, bypassing estimation
    pub zoom: Option<u8>,
    /// Tile edge length in pixels (default 256)
    pub tile_size: Option<u32>,
    /// Maximum number of loader calls in flight (default unbounded)
    pub max_concurrency: Option<usize>,
}

impl LoadOptions {
    /// Options with the required zoom bounds set.
    #[must_use]
    pub fn new(min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            min_zoom: Some(min_zoom),
            max_zoom: Some(max_zoom),
            ..Default::default()
        }
    }

    /// Read options from `TILEQUERY_*` environment variables.
    ///
    /// Recognised: `TILEQUERY_MIN_ZOOM`, `TILEQUERY_MAX_ZOOM`, `TILEQUERY_ZOOM`,
    /// `TILEQUERY_TILE_SIZE`, `TILEQUERY_MAX_CONCURRENCY`. Unset or unparsable
    /// variables leave the option empty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            min_zoom: var_value(&lookup, "TILEQUERY_MIN_ZOOM"),
            max_zoom: var_value(&lookup, "TILEQUERY_MAX_ZOOM"),
            zoom: var_value(&lookup, "TILEQUERY_ZOOM"),
            tile_size: var_value(&lookup, "TILEQUERY_TILE_SIZE"),
            max_concurrency: var_value(&lookup, "TILEQUERY_MAX_CONCURRENCY"),
        }
    }

    #[must_use]
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = Some(min_zoom);
        self.max_zoom = Some(max_zoom);
        self
    }

    /// Pin the zoom instead of estimating it.
    #[must_use]
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = Some(zoom);
        self
    }

    #[must_use]
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Effective tile size.
    #[must_use]
    pub fn resolved_tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    /// Validate the options against `points` and return `(zoom, tile_size)`.
    pub fn resolve(&self, points: &[LngLat]) -> QueryResult<(u8, u32)> {
        validate_points(points)?;

        let min_zoom = self
            .min_zoom
            .ok_or(QueryError::MissingConfiguration("min_zoom"))?;
        let max_zoom = self
            .max_zoom
            .ok_or(QueryError::MissingConfiguration("max_zoom"))?;

        if min_zoom > max_zoom {
            return Err(QueryError::InvalidInput(format!(
                "min_zoom {min_zoom} is greater than max_zoom {max_zoom}"
            )));
        }
        if max_zoom > MAX_ZOOM {
            return Err(QueryError::InvalidInput(format!(
                "max_zoom {max_zoom} exceeds maximum zoom {MAX_ZOOM}"
            )));
        }

        let tile_size = self.resolved_tile_size();
        check_tile_size(tile_size)?;

        let zoom = match self.zoom {
            Some(zoom) if zoom > MAX_ZOOM => {
                return Err(QueryError::InvalidInput(format!(
                    "zoom {zoom} exceeds maximum zoom {MAX_ZOOM}"
                )));
            }
            Some(zoom) => zoom,
            None => estimate_zoom(points, min_zoom, max_zoom, tile_size),
        };

        Ok((zoom, tile_size))
    }
}

fn var_value<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    parse_value(name, &raw)
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = raw, "Ignoring unparsable setting");
            None
        }
    }
}

fn validate_points(points: &[LngLat]) -> QueryResult<()> {
    if points.is_empty() {
        return Err(QueryError::InvalidInput("at least one point is required".into()));
    }
    if let Some((idx, p)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        return Err(QueryError::InvalidInput(format!(
            "point {idx} {p} is not a finite coordinate"
        )));
    }
    Ok(())
}

/// Load every tile under `points`.
///
/// Tiles the loader reports as missing come back with `empty` set. The call
/// fails if every tile is missing, or as soon as any load fails with an error
/// other than [`LoadError::TileNotFound`].
pub async fn load_tiles<L>(
    points: &[LngLat],
    options: &LoadOptions,
    loader: &L,
) -> QueryResult<Vec<TileQuery>>
where
    L: TileLoader,
{
    let (zoom, tile_size) = options.resolve(points)?;
    let projection = SphericalMercator::shared(tile_size);

    let queries = build_query(&QueryPoint::enumerate(points), zoom, &projection)?;
    let total = queries.len();
    debug!(zoom, tile_size, points = points.len(), tiles = total, "Loading tiles");

    let missing = AtomicUsize::new(0);
    let missing = &missing;

    let fetches = queries.into_iter().map(|mut query| async move {
        match loader.load(query.tile).await {
            Ok(data) => query.attach_data(data),
            Err(LoadError::TileNotFound) => {
                debug!(tile = %query.tile, "Tile not found, sampling as empty");
                missing.fetch_add(1, Ordering::SeqCst);
                query.mark_missing();
            }
            Err(LoadError::Other(source)) => {
                warn!(tile = %query.tile, error = %source, "Tile load failed");
                return Err(QueryError::Loader {
                    tile: query.tile,
                    source,
                });
            }
        }
        Ok(query)
    });

    let loaded: Vec<TileQuery> = match options.max_concurrency {
        Some(limit) => {
            // Unordered so a failure surfaces while earlier tiles are still loading
            let mut indexed: Vec<(usize, TileQuery)> = stream::iter(fetches.enumerate())
                .map(|(idx, fetch)| fetch.map_ok(move |query| (idx, query)))
                .buffer_unordered(limit.max(1))
                .try_collect()
                .await?;
            indexed.sort_unstable_by_key(|&(idx, _)| idx);
            indexed.into_iter().map(|(_, query)| query).collect()
        }
        None => try_join_all(fetches).await?,
    };

    if missing.load(Ordering::SeqCst) == total {
        return Err(QueryError::NoData { tiles: total });
    }

    Ok(loaded)
}
