//! ptex-inspect: ingest a Ptex quad mesh and report what the renderer gets.
//!
//! ```bash
//! ptex-inspect mesh.ply textures/
//! ptex-inspect mesh.ply textures/ --split-size 0
//! ptex-inspect mesh.ply textures/ --export out/
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asset::ply::save_ply;
use asset::{PtexMesh, PtexUniforms};
use clap::Parser;

#[derive(Parser)]
#[command(name = "ptex-inspect")]
#[command(version, about = "Load a Ptex quad mesh and print its chunk layout")]
struct Args {
    /// Binary little-endian PLY quad mesh
    mesh: PathBuf,

    /// Directory with parameters.json and <i>-color-ptex.{dxt1,rgb,hdr}
    atlas_dir: PathBuf,

    /// Override splitSize from parameters.json (<= 0 disables splitting)
    #[arg(long)]
    split_size: Option<f32>,

    /// Write every chunk as PLY and every RGB/HDR atlas as PNG into this directory
    #[arg(long)]
    export: Option<PathBuf>,
}

fn export(ptex: &PtexMesh, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    for (i, chunk) in ptex.chunks.iter().enumerate() {
        save_ply(&chunk.mesh, dir.join(format!("chunk-{i}.ply")))?;
        if !chunk.atlas.save_png(dir.join(format!("chunk-{i}.png")))? {
            log::debug!("Chunk {i}: DXT1 atlas, no preview");
        }
    }
    log::info!("Exported {} chunks to {}", ptex.chunk_count(), dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!(
        "Loading mesh {} with atlases from {}",
        args.mesh.display(),
        args.atlas_dir.display()
    );

    let ptex = PtexMesh::load_with_split(&args.mesh, &args.atlas_dir, args.split_size)
        .with_context(|| format!("Failed to ingest {}", args.mesh.display()))?;

    let bounds = ptex.bounds();
    log::info!(
        "{} chunks, {} faces, {} vertices, bounds centered at {:?} with size {:?}, hdr={}",
        ptex.chunk_count(),
        ptex.face_count(),
        ptex.vertex_count(),
        bounds.center(),
        bounds.size(),
        ptex.is_hdr
    );

    for (i, chunk) in ptex.chunks.iter().enumerate() {
        let buffers = chunk.buffers();
        let uniforms = PtexUniforms::new(&ptex, chunk, PtexUniforms::NO_CLIP);
        log::info!(
            "chunk {i}: {} faces, {} vertices, {} linked edges, {:?} atlas {}x{} ({} tiles wide), {} bytes",
            chunk.mesh.face_count(),
            chunk.mesh.vertex_count(),
            chunk.adjacency.linked_edges(),
            buffers.atlas_format,
            buffers.atlas_dim,
            buffers.atlas_dim,
            uniforms.width_in_tiles,
            buffers.positions.len()
                + buffers.normals.len()
                + buffers.indices.len()
                + buffers.adjacency.len()
                + buffers.atlas.len()
        );
    }

    for (i, warning) in ptex.warnings() {
        log::warn!("chunk {i}: {warning}");
    }

    log::info!(
        "Tone mapping: exposure {}, gamma {}, saturation {}",
        ptex.tone.exposure,
        ptex.tone.gamma,
        ptex.tone.saturation
    );

    if let Some(dir) = &args.export {
        export(&ptex, dir)?;
    }

    Ok(())
}
