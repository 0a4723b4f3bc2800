use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;

use crate::boundary::{BoundaryCollection, BoundaryParseError};

#[derive(Debug, Error)]
pub enum BoundaryLoadError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] BoundaryParseError),
}

/// Where boundary documents come from. Fetches are single-threaded; the
/// returned future need not be `Send`.
pub trait BoundarySource {
    fn fetch(&self) -> impl Future<Output = Result<String, BoundaryLoadError>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Reads a boundary document from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBoundarySource {
    path: PathBuf,
}

impl FileBoundarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BoundarySource for FileBoundarySource {
    async fn fetch(&self) -> Result<String, BoundaryLoadError> {
        std::fs::read_to_string(&self.path).map_err(|source| BoundaryLoadError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory document, for hosts that already hold the payload.
#[derive(Debug, Clone)]
pub struct StaticBoundarySource(pub String);

impl BoundarySource for StaticBoundarySource {
    async fn fetch(&self) -> Result<String, BoundaryLoadError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("<inline {} bytes>", self.0.len())
    }
}

/// Fetch and parse a boundary document.
pub async fn load_boundaries(
    source: &impl BoundarySource,
) -> Result<BoundaryCollection, BoundaryLoadError> {
    let payload = source.fetch().await?;
    let collection = BoundaryCollection::from_geojson_str(&payload)?;
    tracing::debug!(
        source = %source.describe(),
        features = collection.features.len(),
        rings = collection.ring_count(),
        "boundary data loaded"
    );
    Ok(collection)
}
