//! Per-face, per-edge neighbor table for quad chunks.
//!
//! Every face edge gets one 32-bit [`AdjacencyCode`]: the neighboring face
//! in the low 30 bits and the number of quarter turns between the two faces'
//! edge numbering in the top 2 bits. The shader uses it to sample across a
//! face boundary with correctly oriented coordinates.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::error::{IngestError, IngestResult, TopologyWarning};
use crate::mesh::MeshData;

pub const ROTATION_SHIFT: u32 = 30;
pub const FACE_MASK: u32 = 0x3FFF_FFFF;
const EDGES: usize = 4;

/// Packed `(rotation << 30) | face`. Face bits all set means "no neighbor".
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct AdjacencyCode(u32);

impl AdjacencyCode {
    pub const NONE: Self = Self(FACE_MASK);

    /// `face` must be below [`FACE_MASK`]; `rotation` is taken mod 4.
    #[inline]
    pub fn new(face: u32, rotation: u8) -> Self {
        debug_assert!(face < FACE_MASK, "face index {face} collides with the sentinel");
        Self((u32::from(rotation & 3) << ROTATION_SHIFT) | (face & FACE_MASK))
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn neighbor(self) -> Option<u32> {
        let face = self.0 & FACE_MASK;
        (face != FACE_MASK).then_some(face)
    }

    #[inline]
    pub fn rotation(self) -> u8 {
        (self.0 >> ROTATION_SHIFT) as u8
    }

    #[inline]
    pub fn has_neighbor(self) -> bool {
        self.neighbor().is_some()
    }
}

impl Default for AdjacencyCode {
    fn default() -> Self {
        Self::NONE
    }
}

/// Codes in face-major, edge-minor order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdjacencyTable {
    codes: Vec<AdjacencyCode>,
}

impl AdjacencyTable {
    #[inline]
    pub fn get(&self, face: usize, edge: usize) -> AdjacencyCode {
        self.codes[face * EDGES + edge]
    }

    pub fn codes(&self) -> &[AdjacencyCode] {
        &self.codes
    }

    pub fn face_count(&self) -> usize {
        self.codes.len() / EDGES
    }

    /// Number of edges with a recorded neighbor.
    pub fn linked_edges(&self) -> usize {
        self.codes.iter().filter(|c| c.has_neighbor()).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Adjacency {
    pub table: AdjacencyTable,
    pub warnings: Vec<TopologyWarning>,
}

/// Order-independent key of the edge between two vertices.
#[inline]
pub fn edge_key(a: u32, b: u32) -> u64 {
    (u64::from(a.min(b)) << 32) | u64::from(a.max(b))
}

#[inline]
fn face_edge_key(mesh: &MeshData, face: usize, edge: usize) -> u64 {
    let v = mesh.face(face);
    edge_key(v[edge], v[(edge + 1) % EDGES])
}

/// Pick the neighbor of `(face, edge)` among every face edge sharing its key.
fn resolve(incident: &[(u32, u8)], face: u32, edge: u8) -> AdjacencyCode {
    match incident {
        [a, b] => {
            let (this, other) = if *a == (face, edge) { (a, b) } else { (b, a) };
            if other.0 == face {
                return AdjacencyCode::NONE;
            }
            let rotation = (i32::from(this.1) - i32::from(other.1) + 2) & 3;
            AdjacencyCode::new(other.0, rotation as u8)
        }
        // Non-manifold: the partner is unspecified, the last other face wins.
        _ => incident
            .iter()
            .rev()
            .find(|&&(f, _)| f != face)
            .map_or(AdjacencyCode::NONE, |&(f, _)| AdjacencyCode::new(f, 0)),
    }
}

/// Build the adjacency table for one quad chunk.
pub fn compute_adjacency(mesh: &MeshData) -> IngestResult<Adjacency> {
    mesh.require_quads()?;
    let face_count = mesh.face_count();
    if face_count >= FACE_MASK as usize {
        return Err(IngestError::Format(format!(
            "{face_count} faces do not fit in a 30-bit adjacency code"
        )));
    }

    // Build phase; must finish before any lookup.
    let mut edges: HashMap<u64, Vec<(u32, u8)>> = HashMap::with_capacity(face_count * 2);
    for f in 0..face_count {
        for e in 0..EDGES {
            edges
                .entry(face_edge_key(mesh, f, e))
                .or_insert_with(|| Vec::with_capacity(2))
                .push((f as u32, e as u8));
        }
    }

    let edges = &edges;
    let codes: Vec<AdjacencyCode> = (0..face_count * EDGES)
        .into_par_iter()
        .map(|slot| {
            let (f, e) = (slot / EDGES, slot % EDGES);
            edges
                .get(&face_edge_key(mesh, f, e))
                .map_or(AdjacencyCode::NONE, |incident| {
                    resolve(incident, f as u32, e as u8)
                })
        })
        .collect();

    let mut warnings: Vec<TopologyWarning> = edges
        .iter()
        .filter(|(_, incident)| incident.len() > 2)
        .map(|(&key, incident)| TopologyWarning {
            v0: (key >> 32) as u32,
            v1: key as u32,
            incident_faces: incident.len(),
        })
        .collect();
    warnings.sort_by_key(|w| (w.v0, w.v1));

    if !warnings.is_empty() {
        log::warn!(
            "{} non-manifold edges, adjacency across them is best-effort (first: {})",
            warnings.len(),
            warnings[0]
        );
    }

    Ok(Adjacency {
        table: AdjacencyTable { codes },
        warnings,
    })
}
