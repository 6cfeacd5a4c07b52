/// Display parameters handed to the mesh shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneMapping {
    pub exposure: f32,
    pub gamma: f32,
    pub saturation: f32,
}

impl ToneMapping {
    /// Defaults for scenes whose atlases are stored as half-float HDR.
    pub const fn hdr() -> Self {
        Self {
            exposure: 0.025,
            gamma: 1.6969,
            saturation: 1.5,
        }
    }

    pub fn for_atlas(is_hdr: bool) -> Self {
        if is_hdr { Self::hdr() } else { Self::default() }
    }

    /// The shader expects the reciprocal.
    #[inline]
    pub fn shader_gamma(&self) -> f32 {
        1.0 / self.gamma
    }
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            gamma: 1.0,
            saturation: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdr_switches_defaults() {
        assert_eq!(ToneMapping::for_atlas(false), ToneMapping::default());
        let hdr = ToneMapping::for_atlas(true);
        assert_eq!(hdr.exposure, 0.025);
        assert!((hdr.shader_gamma() - 1.0 / 1.6969).abs() < 1e-6);
    }
}
