//! Error types for point queries.
//!
//! [`QueryError`] is the single error surfaced by every public operation.
//! [`LoadError`] is what a [`TileLoader`](crate::loader::TileLoader) returns;
//! its [`LoadError::TileNotFound`] variant is the benign "no tile here"
//! sentinel and never reaches the caller on its own.

use thiserror::Error;

use crate::geometry::{LngLat, TileCoord};

/// Boxed error used for opaque collaborator failures (loader transport, decoder).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while querying points against a tile pyramid.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query points were empty or malformed, or the options were inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required option was not provided.
    #[error("Missing configuration: {0} is required")]
    MissingConfiguration(&'static str),

    /// Every tile covering the query was reported as missing.
    #[error("No data: all {tiles} tile(s) covering the query are missing")]
    NoData { tiles: usize },

    /// The loader failed with something other than "tile not found".
    #[error("Loading tile {tile} failed: {source}")]
    Loader {
        tile: TileCoord,
        #[source]
        source: BoxError,
    },

    /// Tile bytes could not be decoded into an image.
    #[error("Decoding tile {tile} failed: {source}")]
    Decode {
        tile: TileCoord,
        #[source]
        source: BoxError,
    },

    /// The decoded tile is not square.
    #[error("Invalid tile {tile}: tile must be square, got {width}x{height}")]
    NonSquareTile {
        tile: TileCoord,
        width: u32,
        height: u32,
    },

    /// The decoded tile does not match the configured tile size.
    #[error("Invalid tile {tile}: expected {expected}px tiles, got {actual}px")]
    TileSizeMismatch {
        tile: TileCoord,
        expected: u32,
        actual: u32,
    },

    /// A point projected outside the tile it was assigned to.
    #[error("Point {lnglat} falls outside tile {tile} at local pixel ({x}, {y})")]
    PointOutsideTile {
        tile: TileCoord,
        lnglat: LngLat,
        x: i64,
        y: i64,
    },

    /// A blocking sampling task panicked or was cancelled.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

/// Errors a tile loader may return.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The tile does not exist in the pyramid. Treated as an empty tile.
    #[error("Tile does not exist")]
    TileNotFound,

    /// Any other failure. Aborts the whole query.
    #[error(transparent)]
    Other(BoxError),
}

impl LoadError {
    /// Wrap an arbitrary error as a hard loader failure.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        LoadError::Other(err.into())
    }

    /// Whether this is the benign "tile not found" signal.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::TileNotFound)
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::TileNotFound
        } else {
            LoadError::Other(Box::new(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_not_found() {
        assert!(LoadError::TileNotFound.is_not_found());
        assert!(!LoadError::other("connection reset").is_not_found());
    }

    #[test]
    fn test_io_not_found_maps_to_sentinel() {
        let err: LoadError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.is_not_found());

        let err: LoadError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_messages_carry_tile() {
        let err = QueryError::TileSizeMismatch {
            tile: TileCoord::new(3, 1, 2),
            expected: 256,
            actual: 512,
        };
        let msg = err.to_string();
        assert!(msg.contains("3/1/2"), "{msg}");
        assert!(msg.contains("256"), "{msg}");
        assert!(msg.contains("512"), "{msg}");
    }
}
