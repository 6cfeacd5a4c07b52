//! Per-chunk texture atlases.
//!
//! Each chunk `i` has exactly one of `i-color-ptex.dxt1`, `.rgb` or `.hdr`
//! in the atlas directory. The files are raw pixel data without a header;
//! atlases are always square, so the side length follows from the file size.

use std::path::{Path, PathBuf};

use half::f16;
use rayon::prelude::*;

use crate::error::{IngestError, IngestResult};

/// Stored pixel format, in probing priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtlasFormat {
    /// S3TC/DXT1 4x4 blocks, 8 bytes per block.
    Dxt1,
    /// 8-bit linear RGB.
    Rgb8,
    /// Half-float RGB (HDR).
    RgbHalf,
}

impl AtlasFormat {
    pub const PROBE_ORDER: [AtlasFormat; 3] =
        [AtlasFormat::Dxt1, AtlasFormat::Rgb8, AtlasFormat::RgbHalf];

    pub fn extension(self) -> &'static str {
        match self {
            AtlasFormat::Dxt1 => "dxt1",
            AtlasFormat::Rgb8 => "rgb",
            AtlasFormat::RgbHalf => "hdr",
        }
    }

    pub fn is_hdr(self) -> bool {
        self == AtlasFormat::RgbHalf
    }

    /// Number of texels stored in `bytes` bytes, if the size divides evenly.
    pub fn texels_for(self, bytes: u64) -> Option<u64> {
        match self {
            AtlasFormat::Dxt1 => bytes.checked_mul(2),
            AtlasFormat::Rgb8 => (bytes % 3 == 0).then_some(bytes / 3),
            AtlasFormat::RgbHalf => (bytes % 6 == 0).then_some(bytes / 6),
        }
    }

    /// Side length of a square atlas stored in `bytes` bytes.
    pub fn square_dim(self, bytes: u64) -> IngestResult<u32> {
        let corrupt = |why: &str| {
            IngestError::CorruptAsset(format!(
                "{bytes} bytes is not a square .{} atlas: {why}",
                self.extension()
            ))
        };
        let texels = self
            .texels_for(bytes)
            .ok_or_else(|| corrupt("size is not a whole number of texels"))?;
        if texels == 0 {
            return Err(corrupt("file is empty"));
        }
        let dim = texels.isqrt();
        if dim * dim != texels {
            return Err(corrupt("texel count is not a perfect square"));
        }
        if self == AtlasFormat::Dxt1 && dim % 4 != 0 {
            return Err(corrupt("side is not a multiple of the 4x4 block size"));
        }
        u32::try_from(dim).map_err(|_| corrupt("side does not fit in 32 bits"))
    }
}

pub fn atlas_path(dir: &Path, chunk: usize, format: AtlasFormat) -> PathBuf {
    dir.join(format!("{chunk}-color-ptex.{}", format.extension()))
}

/// Raw atlas bytes plus what was inferred about them.
#[derive(Clone, Debug)]
pub struct AtlasImage {
    pub data: Vec<u8>,
    pub dim: u32,
    pub format: AtlasFormat,
    pub path: PathBuf,
}

impl AtlasImage {
    /// Validate `data` as a square atlas of `format`.
    pub fn from_bytes(data: Vec<u8>, format: AtlasFormat, path: PathBuf) -> IngestResult<Self> {
        let dim = format.square_dim(data.len() as u64)?;
        Ok(Self {
            data,
            dim,
            format,
            path,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// How many tiles of `tile_size` texels fit across the atlas.
    pub fn width_in_tiles(&self, tile_size: u32) -> u32 {
        if tile_size == 0 { 0 } else { self.dim / tile_size }
    }

    /// Linear RGB of the texel at `(x, y)`. DXT1 atlases are not decoded.
    pub fn texel_rgb(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.dim || y >= self.dim {
            return None;
        }
        let i = (y as usize * self.dim as usize + x as usize) * 3;
        match self.format {
            AtlasFormat::Dxt1 => None,
            AtlasFormat::Rgb8 => {
                let p = &self.data[i..i + 3];
                Some([p[0], p[1], p[2]].map(|c| f32::from(c) / 255.0))
            }
            AtlasFormat::RgbHalf => {
                let p = &self.data[i * 2..i * 2 + 6];
                Some([0, 2, 4].map(|o| f16::from_le_bytes([p[o], p[o + 1]]).to_f32()))
            }
        }
    }

    /// 8-bit RGB copy for previews; HDR values are clamped to `[0, 1]`.
    pub fn to_rgb8(&self) -> Option<Vec<u8>> {
        match self.format {
            AtlasFormat::Dxt1 => None,
            AtlasFormat::Rgb8 => Some(self.data.clone()),
            AtlasFormat::RgbHalf => Some(
                self.data
                    .chunks_exact(2)
                    .map(|h| {
                        let v = f16::from_le_bytes([h[0], h[1]]).to_f32();
                        (v.clamp(0.0, 1.0) * 255.0).round() as u8
                    })
                    .collect(),
            ),
        }
    }

    /// Write a PNG preview. Returns `Ok(false)` for DXT1 atlases.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> IngestResult<bool> {
        let path = path.as_ref();
        let Some(rgb) = self.to_rgb8() else {
            return Ok(false);
        };
        let img = image::RgbImage::from_raw(self.dim, self.dim, rgb).ok_or_else(|| {
            IngestError::CorruptAsset(format!("atlas {:?} does not match its size", self.path))
        })?;
        img.save(path).map_err(|e| IngestError::io(path, std::io::Error::other(e)))?;
        log::info!("Wrote atlas preview {:?} ({}x{})", path, self.dim, self.dim);
        Ok(true)
    }
}

/// Find which atlas file exists for `chunk`.
pub fn probe_atlas(dir: &Path, chunk: usize) -> IngestResult<(AtlasFormat, PathBuf)> {
    AtlasFormat::PROBE_ORDER
        .into_iter()
        .map(|format| (format, atlas_path(dir, chunk, format)))
        .find(|(_, path)| path.is_file())
        .ok_or_else(|| IngestError::MissingAtlas {
            dir: dir.to_path_buf(),
            chunk,
        })
}

/// Locate, size-check and read the atlas for `chunk`.
pub fn select_atlas(dir: &Path, chunk: usize) -> IngestResult<AtlasImage> {
    let (format, path) = probe_atlas(dir, chunk)?;
    let len = std::fs::metadata(&path)
        .map_err(|e| IngestError::io(&path, e))?
        .len();
    // Reject before reading a possibly large file.
    format.square_dim(len)?;
    let data = std::fs::read(&path).map_err(|e| IngestError::io(&path, e))?;
    let atlas = AtlasImage::from_bytes(data, format, path)?;
    log::debug!(
        "Chunk {chunk}: {:?} atlas {}x{} from {:?}",
        atlas.format,
        atlas.dim,
        atlas.dim,
        atlas.path
    );
    Ok(atlas)
}

/// Atlases for every chunk, in chunk order.
#[derive(Clone, Debug, Default)]
pub struct AtlasSet {
    pub atlases: Vec<AtlasImage>,
    /// Any chunk stored as half-float HDR.
    pub is_hdr: bool,
}

/// Load atlases for chunks `0..chunk_count` in parallel.
pub fn load_atlases(dir: &Path, chunk_count: usize) -> IngestResult<AtlasSet> {
    let atlases = (0..chunk_count)
        .into_par_iter()
        .map(|chunk| select_atlas(dir, chunk))
        .collect::<IngestResult<Vec<_>>>()?;
    let is_hdr = atlases.iter().any(|a| a.format.is_hdr());
    let bytes: usize = atlases.iter().map(|a| a.data.len()).sum();
    log::info!(
        "Loaded {} atlases ({} bytes{})",
        atlases.len(),
        bytes,
        if is_hdr { ", HDR" } else { "" }
    );
    Ok(AtlasSet { atlases, is_hdr })
}
