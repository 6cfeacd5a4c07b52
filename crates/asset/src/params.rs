//! `parameters.json` stored next to the atlases.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

pub const PARAMETERS_FILE: &str = "parameters.json";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasParameters {
    /// Grid cell size in world units; `<= 0` disables splitting.
    #[serde(rename = "splitSize")]
    pub split_size: f32,
    /// Texels per face tile, consumed by the shader.
    #[serde(rename = "tileSize")]
    pub tile_size: u32,
}

impl AtlasParameters {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read `<dir>/parameters.json`.
    pub fn load(dir: &Path) -> IngestResult<Self> {
        let path = dir.join(PARAMETERS_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| IngestError::io(&path, e))?;
        let params =
            Self::from_json(&text).map_err(|source| IngestError::Config { path, source })?;
        log::info!(
            "Atlas parameters: split size {}, tile size {}",
            params.split_size,
            params.tile_size
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_known_keys() {
        let p = AtlasParameters::from_json(r#"{"splitSize": 1.5, "tileSize": 16, "extra": true}"#)
            .expect("parse");
        assert_eq!(p.split_size, 1.5);
        assert_eq!(p.tile_size, 16);
    }

    #[test]
    fn missing_key_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(PARAMETERS_FILE), r#"{"splitSize": 0}"#).expect("write");
        let err = AtlasParameters::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, IngestError::Config { .. }));
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = AtlasParameters::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
