//! Ingestion errors (thiserror) and recoverable topology warnings.

use std::path::PathBuf;

use thiserror::Error;

/// Broad class of an [`IngestError`], for callers that only need to branch
/// on what went wrong rather than on the exact message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unreadable file/directory.
    Io,
    /// Header, property, type or stride violations; bad configuration.
    Format,
    /// The bytes on disk cannot describe a valid asset.
    CorruptAsset,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("No atlas (.dxt1/.rgb/.hdr) for chunk {chunk} in {}", .dir.display())]
    MissingAtlas { dir: PathBuf, chunk: usize },

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid parameters in {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt asset: {0}")]
    CorruptAsset(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::MissingPath(_) | Self::MissingAtlas { .. } => ErrorKind::Io,
            Self::Format(_) | Self::Config { .. } => ErrorKind::Format,
            Self::CorruptAsset(_) => ErrorKind::CorruptAsset,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// An edge shared by more than two faces. Adjacency for it is best-effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologyWarning {
    /// Smaller vertex index of the edge (chunk-local).
    pub v0: u32,
    pub v1: u32,
    pub incident_faces: usize,
}

impl std::fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "non-manifold edge ({}, {}) shared by {} faces",
            self.v0, self.v1, self.incident_faces
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let io = IngestError::io("a.ply", std::io::Error::other("boom"));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(IngestError::Format("x".into()).kind(), ErrorKind::Format);
        assert_eq!(
            IngestError::CorruptAsset("x".into()).kind(),
            ErrorKind::CorruptAsset
        );
        assert!(io.to_string().contains("a.ply"));
    }
}
