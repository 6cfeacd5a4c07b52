//! Byte views handed to the external renderer.

use bytemuck::{Pod, Zeroable};

use crate::atlas::AtlasFormat;
use crate::ptex::{PtexChunk, PtexMesh};

/// Borrowed GPU upload data for one chunk. Quads are not triangulated.
#[derive(Clone, Copy, Debug)]
pub struct ChunkBuffers<'a> {
    /// `vec4<f32>` per vertex.
    pub positions: &'a [u8],
    /// `vec4<f32>` per vertex, empty when the mesh has no normals.
    pub normals: &'a [u8],
    /// `u32` per quad corner.
    pub indices: &'a [u8],
    /// One packed `u32` per face edge, face-major.
    pub adjacency: &'a [u8],
    pub atlas: &'a [u8],
    pub index_count: usize,
    pub atlas_format: AtlasFormat,
    pub atlas_dim: u32,
}

impl PtexChunk {
    pub fn buffers(&self) -> ChunkBuffers<'_> {
        ChunkBuffers {
            positions: bytemuck::cast_slice(&self.mesh.positions),
            normals: bytemuck::cast_slice(&self.mesh.normals),
            indices: bytemuck::cast_slice(&self.mesh.indices),
            adjacency: bytemuck::cast_slice(self.adjacency.codes()),
            atlas: self.atlas.as_bytes(),
            index_count: self.mesh.indices.len(),
            atlas_format: self.atlas.format,
            atlas_dim: self.atlas.dim,
        }
    }
}

/// Per-chunk shader parameters (std140-compatible, 48 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PtexUniforms {
    /// Plane equation; all zeros disables clipping.
    pub clip_plane: [f32; 4],
    pub tile_size: i32,
    pub width_in_tiles: i32,
    pub exposure: f32,
    /// Already inverted (`1 / gamma`).
    pub gamma: f32,
    pub saturation: f32,
    pub _pad: [f32; 3],
}

impl PtexUniforms {
    pub const NO_CLIP: [f32; 4] = [0.0; 4];

    /// Uniforms for drawing `chunk` with the settings of the mesh it belongs to.
    pub fn new(mesh: &PtexMesh, chunk: &PtexChunk, clip_plane: [f32; 4]) -> Self {
        let tile_size = mesh.params.tile_size;
        Self {
            clip_plane,
            tile_size: tile_size as i32,
            width_in_tiles: chunk.atlas.width_in_tiles(tile_size) as i32,
            exposure: mesh.tone.exposure,
            gamma: mesh.tone.shader_gamma(),
            saturation: mesh.tone.saturation,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_layout() {
        assert_eq!(std::mem::size_of::<PtexUniforms>(), 48);
        let u = PtexUniforms::zeroed();
        assert_eq!(u.clip_plane, PtexUniforms::NO_CLIP);
        assert_eq!(bytemuck::bytes_of(&u).len(), 48);
    }
}
