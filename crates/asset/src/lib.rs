//! Asset loading for Ptex quad meshes.
//! PLY parsing, Morton-order chunking, per-chunk adjacency and atlas selection.

pub mod adjacency;
pub mod atlas;
pub mod error;
pub mod mesh;
pub mod params;
pub mod ply;
pub mod ptex;
pub mod split;
pub mod upload;

pub use adjacency::{AdjacencyCode, AdjacencyTable};
pub use atlas::{AtlasFormat, AtlasImage};
pub use error::{ErrorKind, IngestError, IngestResult, TopologyWarning};
pub use mesh::MeshData;
pub use params::AtlasParameters;
pub use ptex::{PtexChunk, PtexMesh};
pub use upload::{ChunkBuffers, PtexUniforms};
