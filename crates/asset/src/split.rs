//! Spatial partitioning of a quad mesh into Morton-ordered chunks.
//!
//! Vertices are bucketed on a grid of `split_size` cells anchored at the
//! mesh's minimum corner. Each face takes the smallest Morton key of its
//! vertices; faces are stably sorted by key and every run of equal keys
//! becomes one chunk with its own dense vertex numbering.

use std::collections::HashMap;
use std::ops::Range;

use corelib::morton;
use rayon::prelude::*;

use crate::error::IngestResult;
use crate::mesh::MeshData;

/// Sorted face order and chunk boundaries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Original face ids in ascending key order.
    pub faces: Vec<u32>,
    /// One key per chunk, ascending.
    pub keys: Vec<u64>,
    starts: Vec<usize>,
}

impl ChunkPlan {
    /// Whole mesh as a single chunk, original face order.
    fn single(face_count: usize) -> Self {
        if face_count == 0 {
            return Self::default();
        }
        Self {
            faces: (0..face_count as u32).collect(),
            keys: vec![0],
            starts: vec![0, face_count],
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    pub fn range(&self, chunk: usize) -> Range<usize> {
        self.starts[chunk]..self.starts[chunk + 1]
    }

    pub fn chunk_faces(&self, chunk: usize) -> &[u32] {
        &self.faces[self.range(chunk)]
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.starts.windows(2).map(|w| w[0]..w[1])
    }
}

/// Morton key of every vertex's grid cell.
pub fn vertex_keys(mesh: &MeshData, split_size: f32) -> Vec<u64> {
    let origin = mesh.bounds().min;
    (0..mesh.vertex_count())
        .into_par_iter()
        .map(|i| {
            let c = morton::grid_cell(mesh.position3(i), origin, split_size);
            morton::encode3(c.x, c.y, c.z)
        })
        .collect()
}

/// Compute the chunk partition without copying any vertex data.
/// A non-positive (or NaN) `split_size` puts every face in one chunk.
pub fn plan_chunks(mesh: &MeshData, split_size: f32) -> IngestResult<ChunkPlan> {
    let face_count = mesh.face_count();
    if face_count == 0 {
        return Ok(ChunkPlan::default());
    }
    mesh.require_quads()?;
    if !(split_size > 0.0) {
        return Ok(ChunkPlan::single(face_count));
    }

    let keys = vertex_keys(mesh, split_size);
    let mut order: Vec<(u64, u32)> = (0..face_count)
        .into_par_iter()
        .map(|f| {
            let key = mesh
                .face(f)
                .iter()
                .map(|&v| keys[v as usize])
                .min()
                .unwrap_or(u64::MAX);
            (key, f as u32)
        })
        .collect();

    // Stable: faces sharing a key keep their original relative order.
    order.par_sort_by_key(|&(key, _)| key);

    let mut plan = ChunkPlan {
        faces: Vec::with_capacity(face_count),
        keys: Vec::new(),
        starts: Vec::new(),
    };
    for (i, &(key, face)) in order.iter().enumerate() {
        if plan.keys.last() != Some(&key) {
            plan.keys.push(key);
            plan.starts.push(i);
        }
        plan.faces.push(face);
    }
    plan.starts.push(face_count);
    Ok(plan)
}

/// Copy the given faces (by original id) into a standalone mesh whose
/// vertices are numbered in first-seen order. Colors are not carried.
pub fn extract_chunk(mesh: &MeshData, faces: &[u32]) -> MeshData {
    let stride = mesh.polygon_stride;
    let mut remap: HashMap<u32, u32> = HashMap::with_capacity(faces.len() * stride);
    let mut referenced: Vec<u32> = Vec::new();
    let mut indices = Vec::with_capacity(faces.len() * stride);

    for &f in faces {
        for &v in mesh.face(f as usize) {
            let local = *remap.entry(v).or_insert_with(|| {
                referenced.push(v);
                (referenced.len() - 1) as u32
            });
            indices.push(local);
        }
    }

    let positions = referenced
        .iter()
        .map(|&v| mesh.positions[v as usize])
        .collect();
    let normals = if mesh.has_normals() {
        referenced
            .iter()
            .map(|&v| mesh.normals[v as usize])
            .collect()
    } else {
        Vec::new()
    };

    MeshData {
        positions,
        normals,
        colors: Vec::new(),
        indices,
        polygon_stride: stride,
    }
}

/// Split `mesh` into spatially coherent chunks. With splitting disabled the
/// result is a single unchanged copy of the input.
pub fn split_mesh(mesh: &MeshData, split_size: f32) -> IngestResult<Vec<MeshData>> {
    if !(split_size > 0.0) {
        return Ok(vec![mesh.clone()]);
    }

    let plan = plan_chunks(mesh, split_size)?;
    let chunks: Vec<MeshData> = (0..plan.chunk_count())
        .into_par_iter()
        .map(|i| extract_chunk(mesh, plan.chunk_faces(i)))
        .collect();

    let largest = chunks.iter().map(MeshData::face_count).max().unwrap_or(0);
    log::info!(
        "Split {} faces into {} chunks (split size {}, largest chunk {} faces)",
        mesh.face_count(),
        chunks.len(),
        split_size,
        largest
    );
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mesh::{DEFAULT_POSITION, fixtures};

    #[test]
    fn disabled_split_copies_mesh() {
        let mesh = MeshData::new(vec![DEFAULT_POSITION, [1.0, 2.0, 3.0, 1.0]], Vec::new(), 0);
        let chunks = split_mesh(&mesh, 0.0).expect("split");
        assert_eq!(chunks, vec![mesh.clone()]);
        assert!(chunks[0].normals.is_empty());

        let grid = fixtures::quad_grid(3, 3);
        assert_eq!(split_mesh(&grid, -1.0).expect("split"), vec![grid.clone()]);
        assert_eq!(split_mesh(&grid, f32::NAN).expect("split"), vec![grid]);
    }

    #[test]
    fn grid_cells_become_chunks() {
        let mesh = fixtures::quad_grid(4, 4);
        let plan = plan_chunks(&mesh, 2.0).expect("plan");
        assert_eq!(plan.chunk_count(), 4);
        assert_eq!(plan.chunk_faces(0), &[0, 1, 4, 5]);
        assert_eq!(plan.chunk_faces(1), &[2, 3, 6, 7]);
        assert!(plan.keys.windows(2).all(|k| k[0] < k[1]));

        let chunks = split_mesh(&mesh, 2.0).expect("split");
        assert!(chunks.iter().all(|c| c.face_count() == 4 && c.vertex_count() == 9));
        assert!(chunks.iter().all(|c| c.colors.is_empty() && c.normals.len() == 9));
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let mesh = fixtures::quad_grid(9, 7);
        let plan = plan_chunks(&mesh, 1.7).expect("plan");
        let mut seen: Vec<u32> = plan.faces.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..mesh.face_count() as u32).collect::<Vec<_>>());

        let chunks = split_mesh(&mesh, 1.7).expect("split");
        assert_eq!(chunks.len(), plan.chunk_count());
        let total: usize = chunks.iter().map(MeshData::face_count).sum();
        assert_eq!(total, mesh.face_count());
        for (chunk, range) in chunks.iter().zip(plan.ranges()) {
            assert!(!range.is_empty());
            assert!(chunk.validate().is_ok());
            for (local, &orig) in plan.faces[range].iter().enumerate() {
                for (&l, &g) in chunk.face(local).iter().zip(mesh.face(orig as usize)) {
                    assert_eq!(chunk.positions[l as usize], mesh.positions[g as usize]);
                }
            }
        }
    }

    #[test]
    fn split_is_deterministic() {
        let mesh = fixtures::quad_grid(12, 5);
        let a = split_mesh(&mesh, 2.5).expect("split");
        let b = split_mesh(&mesh, 2.5).expect("split");
        assert_eq!(a, b);
    }

    #[test]
    fn first_seen_numbering() {
        let mut mesh = fixtures::quad_grid(1, 1);
        mesh.indices = vec![3, 1, 0, 2];
        let chunks = split_mesh(&mesh, 100.0).expect("split");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].indices, vec![0, 1, 2, 3]);
        assert_eq!(chunks[0].positions[0], mesh.positions[3]);
    }

    #[test]
    fn triangles_cannot_be_split() {
        let mesh = MeshData::new(vec![DEFAULT_POSITION; 3], vec![0, 1, 2], 3);
        let err = split_mesh(&mesh, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
