use std::path::Path;

use asset::atlas::{AtlasFormat, atlas_path};
use asset::ply::save_ply;
use asset::{ErrorKind, MeshData, PtexMesh, PtexUniforms};
use corelib::ToneMapping;

fn quad_grid(w: u32, h: u32) -> MeshData {
    let mut positions = Vec::new();
    for y in 0..=h {
        for x in 0..=w {
            positions.push([x as f32, y as f32, 0.0, 1.0]);
        }
    }
    let row = w + 1;
    let mut indices = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * row + x;
            indices.extend_from_slice(&[i, i + 1, i + row + 1, i + row]);
        }
    }
    let mut mesh = MeshData::new(positions, indices, 4);
    mesh.normals = vec![[0.0, 0.0, 1.0, 1.0]; mesh.vertex_count()];
    mesh
}

fn write_scene(dir: &Path, mesh: &MeshData, split_size: f32, atlases: &[(AtlasFormat, usize)]) {
    save_ply(mesh, dir.join("mesh.ply")).expect("write mesh");
    let atlas_dir = dir.join("textures");
    std::fs::create_dir_all(&atlas_dir).expect("mkdir");
    std::fs::write(
        atlas_dir.join("parameters.json"),
        format!(r#"{{"splitSize": {split_size}, "tileSize": 4}}"#),
    )
    .expect("write parameters");
    for (chunk, &(format, len)) in atlases.iter().enumerate() {
        std::fs::write(atlas_path(&atlas_dir, chunk, format), vec![7u8; len]).expect("atlas");
    }
}

#[test]
fn ingest_split_scene() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mesh = quad_grid(4, 4);
    write_scene(dir.path(), &mesh, 2.0, &[(AtlasFormat::Rgb8, 3 * 16 * 16); 4]);

    let ptex = PtexMesh::load(dir.path().join("mesh.ply"), dir.path().join("textures"))
        .expect("ingest");
    assert_eq!(ptex.chunk_count(), 4);
    assert_eq!(ptex.face_count(), mesh.face_count());
    assert_eq!(ptex.bounds(), mesh.bounds());
    assert!(!ptex.is_hdr);
    assert_eq!(ptex.tone, ToneMapping::default());
    assert_eq!(ptex.warnings().count(), 0);

    for chunk in &ptex.chunks {
        assert_eq!(chunk.mesh.face_count(), 4);
        // A 2x2 patch has four interior edges, each seen from both sides.
        assert_eq!(chunk.adjacency.linked_edges(), 8);
        assert_eq!(chunk.atlas.dim, 16);

        let buffers = chunk.buffers();
        assert_eq!(buffers.positions.len(), 9 * 16);
        assert_eq!(buffers.normals.len(), 9 * 16);
        assert_eq!(buffers.indices.len(), 16 * 4);
        assert_eq!(buffers.adjacency.len(), 16 * 4);
        assert_eq!(buffers.index_count, 16);
        assert_eq!(buffers.atlas.len(), 3 * 16 * 16);
    }

    let plane = [0.0, 1.0, 0.0, -0.5];
    for chunk in &ptex.chunks {
        let uniforms = PtexUniforms::new(&ptex, chunk, plane);
        assert_eq!(uniforms.clip_plane, plane);
        assert_eq!(uniforms.tile_size, 4);
        assert_eq!(uniforms.width_in_tiles, 4);
        assert_eq!(uniforms.exposure, 1.0);
    }
}

#[test]
fn unsplit_hdr_scene() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mesh = quad_grid(3, 2);
    write_scene(dir.path(), &mesh, 0.0, &[(AtlasFormat::RgbHalf, 6 * 8 * 8)]);

    let ptex = PtexMesh::load(dir.path().join("mesh.ply"), dir.path().join("textures"))
        .expect("ingest");
    assert_eq!(ptex.chunk_count(), 1);
    assert_eq!(ptex.chunks[0].mesh.indices, mesh.indices);
    assert!(ptex.is_hdr);
    assert_eq!(ptex.tone, ToneMapping::hdr());
    assert_eq!(ptex.chunks[0].atlas.format, AtlasFormat::RgbHalf);

    let uniforms = PtexUniforms::new(&ptex, &ptex.chunks[0], PtexUniforms::NO_CLIP);
    assert_eq!(uniforms.clip_plane, PtexUniforms::NO_CLIP);
    assert_eq!(uniforms.gamma, 1.0 / 1.5);
    assert_eq!(uniforms.exposure, 0.025);
}

#[test]
fn split_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mesh = quad_grid(4, 4);
    write_scene(dir.path(), &mesh, 2.0, &[(AtlasFormat::Dxt1, 8 * 8 / 2)]);

    let ptex = PtexMesh::load_with_split(
        dir.path().join("mesh.ply"),
        dir.path().join("textures"),
        Some(0.0),
    )
    .expect("ingest");
    assert_eq!(ptex.chunk_count(), 1);
    assert_eq!(ptex.params.split_size, 0.0);
    assert_eq!(ptex.chunks[0].atlas.dim, 8);
}

#[test]
fn failures_are_classified() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mesh = quad_grid(4, 4);
    // Only one atlas for four chunks.
    write_scene(dir.path(), &mesh, 2.0, &[(AtlasFormat::Rgb8, 3 * 16 * 16)]);
    let textures = dir.path().join("textures");

    let err = PtexMesh::load(dir.path().join("mesh.ply"), &textures).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let err = PtexMesh::load(dir.path().join("missing.ply"), &textures).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let tris = MeshData::new(quad_grid(1, 1).positions, vec![0, 1, 2], 3);
    save_ply(&tris, dir.path().join("tris.ply")).expect("write");
    let err = PtexMesh::load(dir.path().join("tris.ply"), &textures).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    std::fs::write(textures.join("0-color-ptex.rgb"), vec![0u8; 10]).expect("write");
    let err = PtexMesh::load_with_split(dir.path().join("mesh.ply"), &textures, Some(0.0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptAsset);
}
