//! One-shot ingestion of a Ptex mesh and its atlas directory.

use std::path::Path;

use corelib::{Aabb, ToneMapping};
use rayon::prelude::*;

use crate::adjacency::{Adjacency, AdjacencyTable, compute_adjacency};
use crate::atlas::{AtlasImage, AtlasSet, load_atlases};
use crate::error::{IngestError, IngestResult, TopologyWarning};
use crate::mesh::MeshData;
use crate::params::AtlasParameters;
use crate::ply::load_ply_from_path;
use crate::split::split_mesh;

/// Everything the renderer needs for one chunk.
#[derive(Clone, Debug)]
pub struct PtexChunk {
    pub mesh: MeshData,
    pub adjacency: AdjacencyTable,
    pub atlas: AtlasImage,
    pub warnings: Vec<TopologyWarning>,
}

/// A fully ingested mesh: chunks, atlases and display defaults.
#[derive(Clone, Debug)]
pub struct PtexMesh {
    pub chunks: Vec<PtexChunk>,
    pub params: AtlasParameters,
    pub is_hdr: bool,
    pub tone: ToneMapping,
}

fn ensure_exists(path: &Path) -> IngestResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(IngestError::MissingPath(path.to_path_buf()))
    }
}

impl PtexMesh {
    /// Load `mesh_path` and the atlases and `parameters.json` in `atlas_dir`.
    pub fn load(mesh_path: impl AsRef<Path>, atlas_dir: impl AsRef<Path>) -> IngestResult<Self> {
        Self::load_with_split(mesh_path, atlas_dir, None)
    }

    /// Like [`PtexMesh::load`], optionally overriding the configured split size.
    pub fn load_with_split(
        mesh_path: impl AsRef<Path>,
        atlas_dir: impl AsRef<Path>,
        split_size: Option<f32>,
    ) -> IngestResult<Self> {
        let mesh_path = mesh_path.as_ref();
        let atlas_dir = atlas_dir.as_ref();
        ensure_exists(mesh_path)?;
        ensure_exists(atlas_dir)?;

        let mut params = AtlasParameters::load(atlas_dir)?;
        if let Some(split_size) = split_size {
            log::info!("Overriding split size {} -> {}", params.split_size, split_size);
            params.split_size = split_size;
        }

        let mesh = load_ply_from_path(mesh_path)?;
        Self::from_mesh(mesh, atlas_dir, params)
    }

    /// Run the pipeline on an already parsed mesh.
    pub fn from_mesh(
        mesh: MeshData,
        atlas_dir: &Path,
        params: AtlasParameters,
    ) -> IngestResult<Self> {
        mesh.require_quads()?;

        let parts = if params.split_size > 0.0 {
            split_mesh(&mesh, params.split_size)?
        } else {
            vec![mesh]
        };

        let adjacency = parts
            .par_iter()
            .map(compute_adjacency)
            .collect::<IngestResult<Vec<Adjacency>>>()?;
        log::info!("Computed adjacency for {} chunks", parts.len());

        let AtlasSet { atlases, is_hdr } = load_atlases(atlas_dir, parts.len())?;

        let chunks: Vec<PtexChunk> = parts
            .into_iter()
            .zip(adjacency)
            .zip(atlases)
            .map(|((mesh, adjacency), atlas)| PtexChunk {
                mesh,
                adjacency: adjacency.table,
                atlas,
                warnings: adjacency.warnings,
            })
            .collect();

        let tone = ToneMapping::for_atlas(is_hdr);
        if is_hdr {
            log::info!("HDR atlases found, using tone mapping {:?}", tone);
        }

        Ok(Self {
            chunks,
            params,
            is_hdr,
            tone,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn face_count(&self) -> usize {
        self.chunks.iter().map(|c| c.mesh.face_count()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.chunks.iter().map(|c| c.mesh.vertex_count()).sum()
    }

    pub fn bounds(&self) -> Aabb {
        self.chunks
            .iter()
            .map(|c| c.mesh.bounds())
            .fold(Aabb::EMPTY, Aabb::union)
    }

    pub fn warnings(&self) -> impl Iterator<Item = (usize, &TopologyWarning)> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .flat_map(|(i, c)| c.warnings.iter().map(move |w| (i, w)))
    }
}
