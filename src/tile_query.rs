//! Partitioning of query points into per-tile buckets.

use ahash::AHashMap;

use crate::error::QueryResult;
use crate::geometry::projection::SphericalMercator;
use crate::geometry::{LngLat, QueryPoint, TileCoord};

/// The points of one query that fall in a single tile.
///
/// `points` and `point_ids` are parallel: `point_ids[i]` is the caller's index
/// of `points[i]`. After loading, either `data` holds the tile bytes or
/// `empty` is set.
#[derive(Debug, Clone)]
pub struct TileQuery {
    pub tile: TileCoord,
    pub points: Vec<LngLat>,
    pub point_ids: Vec<usize>,
    /// Raw tile bytes, once loaded
    pub data: Option<Vec<u8>>,
    /// The loader reported that this tile does not exist
    pub empty: bool,
}

impl TileQuery {
    #[must_use]
    pub fn new(tile: TileCoord) -> Self {
        Self {
            tile,
            points: Vec::new(),
            point_ids: Vec::new(),
            data: None,
            empty: false,
        }
    }

    /// Add a point to this bucket.
    pub fn push(&mut self, point: QueryPoint) {
        self.points.push(point.lnglat);
        self.point_ids.push(point.id);
    }

    /// Number of points in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.point_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.point_ids.is_empty()
    }

    pub(crate) fn attach_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
        self.empty = false;
    }

    pub(crate) fn mark_missing(&mut self) {
        self.data = None;
        self.empty = true;
    }
}

/// Group `points` by the tile containing each of them at `zoom`.
///
/// Tiles appear in the order their first point was seen; within a tile,
/// points keep their input order.
pub fn build_query(
    points: &[QueryPoint],
    zoom: u8,
    projection: &SphericalMercator,
) -> QueryResult<Vec<TileQuery>> {
    let mut queries: Vec<TileQuery> = Vec::new();
    let mut index_by_tile: AHashMap<TileCoord, usize> = AHashMap::new();

    for &point in points {
        let tile = projection.tile_containing(point.lnglat, zoom)?;

        let idx = *index_by_tile.entry(tile).or_insert_with(|| {
            queries.push(TileQuery::new(tile));
            queries.len() - 1
        });
        queries[idx].push(point);
    }

    Ok(queries)
}
