//! CPU-side mesh representation shared by the parser, splitter and encoder.

use corelib::{Aabb, Vec3};

use crate::error::{IngestError, IngestResult};

pub const DEFAULT_POSITION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const DEFAULT_NORMAL: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const DEFAULT_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Indexed polygon mesh with homogeneous positions.
///
/// `normals` and `colors` are either empty or parallel to `positions`.
/// `indices` holds `face_count() * polygon_stride` entries; the stride is 0
/// for a mesh without faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 4]>,
    pub normals: Vec<[f32; 4]>,
    pub colors: Vec<[u8; 4]>,
    pub indices: Vec<u32>,
    pub polygon_stride: usize,
}

impl MeshData {
    pub fn new(positions: Vec<[f32; 4]>, indices: Vec<u32>, polygon_stride: usize) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            colors: Vec::new(),
            indices,
            polygon_stride,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        if self.polygon_stride == 0 {
            0
        } else {
            self.indices.len() / self.polygon_stride
        }
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Vertex indices of face `i`.
    #[inline]
    pub fn face(&self, i: usize) -> &[u32] {
        let s = self.polygon_stride;
        &self.indices[i * s..(i + 1) * s]
    }

    pub fn faces(&self) -> impl ExactSizeIterator<Item = &[u32]> + '_ {
        self.indices.chunks_exact(self.polygon_stride.max(1))
    }

    /// Position of vertex `i` without the homogeneous coordinate.
    #[inline]
    pub fn position3(&self, i: usize) -> Vec3 {
        let [x, y, z, _] = self.positions[i];
        Vec3::new(x, y, z)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points((0..self.vertex_count()).map(|i| self.position3(i)))
    }

    /// Colors, filled with the default when the mesh carries none.
    pub fn colors_or_default(&self) -> Vec<[u8; 4]> {
        if self.has_colors() {
            self.colors.clone()
        } else {
            vec![DEFAULT_COLOR; self.vertex_count()]
        }
    }

    /// Checks buffer lengths and index range.
    pub fn validate(&self) -> IngestResult<()> {
        let n = self.vertex_count();
        if self.has_normals() && self.normals.len() != n {
            return Err(IngestError::Format(format!(
                "normal count {} does not match vertex count {n}",
                self.normals.len()
            )));
        }
        if self.has_colors() && self.colors.len() != n {
            return Err(IngestError::Format(format!(
                "color count {} does not match vertex count {n}",
                self.colors.len()
            )));
        }
        if self.polygon_stride == 0 {
            if !self.indices.is_empty() {
                return Err(IngestError::Format(
                    "indices present but polygon stride is 0".into(),
                ));
            }
            return Ok(());
        }
        if self.indices.len() % self.polygon_stride != 0 {
            return Err(IngestError::Format(format!(
                "{} indices is not a multiple of stride {}",
                self.indices.len(),
                self.polygon_stride
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(IngestError::CorruptAsset(format!(
                "vertex index {bad} out of range (vertex count {n})"
            )));
        }
        Ok(())
    }

    /// Splitting and adjacency only work on quads.
    pub fn require_quads(&self) -> IngestResult<()> {
        if self.polygon_stride == 4 {
            Ok(())
        } else {
            Err(IngestError::Format(format!(
                "expected a quad mesh, found polygon stride {}",
                self.polygon_stride
            )))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_access() {
        let m = fixtures::quad_grid(2, 1);
        assert_eq!(m.vertex_count(), 6);
        assert_eq!(m.face_count(), 2);
        assert_eq!(m.face(1), &[1, 2, 5, 4]);
        assert_eq!(m.faces().len(), 2);
        assert!(m.validate().is_ok());
        assert!(m.require_quads().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let mut m = fixtures::quad_grid(1, 1);
        m.indices[3] = 99;
        let err = m.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptAsset);
    }

    #[test]
    fn empty_mesh_has_no_faces() {
        let m = MeshData::new(vec![DEFAULT_POSITION; 2], Vec::new(), 0);
        assert_eq!(m.face_count(), 0);
        assert_eq!(m.faces().len(), 0);
        assert_eq!(m.colors_or_default(), vec![DEFAULT_COLOR; 2]);
        assert!(m.require_quads().is_err());
    }

    #[test]
    fn bounds_cover_positions() {
        let b = fixtures::cube().bounds();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ONE);
    }
}
