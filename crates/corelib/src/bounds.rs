use crate::Vec3;

/// Axis-aligned bounding box. An empty box has `min > max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.extend(p);
        }
        b
    }

    #[inline]
    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Extent along each axis; zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    #[test]
    fn empty_box_has_no_size() {
        let b = Aabb::default();
        assert!(b.is_empty());
        assert_eq!(b.size(), Vec3::ZERO);
    }

    #[test]
    fn extend_and_union() {
        let a = Aabb::from_points([vec3(0.0, 0.0, 0.0), vec3(1.0, 2.0, 3.0)]);
        let b = Aabb::from_points([vec3(-1.0, 5.0, 1.0)]);
        let u = a.union(b);
        assert_eq!(u.min, vec3(-1.0, 0.0, 0.0));
        assert_eq!(u.max, vec3(1.0, 5.0, 3.0));
        assert_eq!(u.size(), vec3(2.0, 5.0, 3.0));
        assert_eq!(a.center(), vec3(0.5, 1.0, 1.5));
    }
}
