//! Shape overlap tests
//!
//! Every entity class has one fixed shape: the player, projectiles and
//! obstacle cells are axis-aligned boxes, chain segments and pickups are
//! circles. Both tests treat touching edges as a miss.

use glam::{IVec2, Vec2};

use crate::cell_center;
use crate::consts::CELL_SIZE;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// The box covering a whole grid cell
    pub fn from_cell(cell: IVec2) -> Self {
        Self::from_center(cell_center(cell), Vec2::splat(CELL_SIZE / 2.0))
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Closest point inside the box to `p`
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// Circle given by center and radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        let closest = aabb.closest_point(self.center);
        closest.distance_squared(self.center) < self.radius * self.radius
    }
}
