//! 3D Morton (Z-order) codes over 21-bit grid coordinates.

use crate::{UVec3, Vec3};

/// Bits kept per axis; three axes fit in the low 63 bits of a `u64`.
pub const AXIS_BITS: u32 = 21;
pub const AXIS_MAX: u32 = (1 << AXIS_BITS) - 1;

/// Spread the low 21 bits of `v` so that two zero bits follow each one.
#[inline]
pub fn part1by2(v: u32) -> u64 {
    let mut x = u64::from(v) & 0x1f_ffff;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

/// Interleave x, y, z (x in the lowest bit).
#[inline]
pub fn encode3(x: u32, y: u32, z: u32) -> u64 {
    (part1by2(z) << 2) | (part1by2(y) << 1) | part1by2(x)
}

/// Integer grid cell of `p` for a grid anchored at `origin`.
/// Coordinates are clamped into `0..=AXIS_MAX`; NaN maps to 0.
#[inline]
pub fn grid_cell(p: Vec3, origin: Vec3, cell_size: f32) -> UVec3 {
    let c = ((p - origin) / cell_size).floor();
    let hi = AXIS_MAX as f32;
    UVec3::new(
        clamp_axis(c.x, hi),
        clamp_axis(c.y, hi),
        clamp_axis(c.z, hi),
    )
}

#[inline]
fn clamp_axis(v: f32, hi: f32) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= hi {
        AXIS_MAX
    } else {
        v as u32
    }
}
