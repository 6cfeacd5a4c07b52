//! Core types: math re-exports, bounds, Morton codes, tone mapping.

pub use glam::{UVec3, Vec3, Vec4, vec3};

pub mod bounds;
pub mod morton;
pub mod tonemap;

pub use bounds::Aabb;
pub use tonemap::ToneMapping;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_feed_grid_cells() {
        let b = Aabb::from_points([vec3(-1.0, 0.0, 2.0), vec3(3.0, 4.0, 6.0)]);
        let cell = morton::grid_cell(vec3(2.9, 0.1, 5.5), b.min, 1.0);
        assert_eq!(cell, UVec3::new(3, 0, 3));
        assert_eq!(morton::encode3(cell.x, cell.y, cell.z), 0b101_101);
    }
}
