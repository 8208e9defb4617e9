//! Shape dispatcher: selects the lattice generator for a [`SpawnShape`].

use glam::Vec3;

use crate::shapes::primitives::*;
use crate::shapes::SpawnShape;

/// Lattice points filling `shape` at the given `spacing`, at most `limit`.
pub fn points_for(shape: &SpawnShape, spacing: f32, limit: usize) -> Vec<Vec3> {
    match *shape {
        SpawnShape::Sphere { center, radius } => lattice_sphere(center, radius, spacing, limit),
        SpawnShape::Box {
            center,
            half_extents,
        } => lattice_box(center, half_extents, spacing, limit),
        SpawnShape::Cylinder {
            center,
            radius,
            half_height,
        } => lattice_cylinder(center, radius, half_height, spacing, limit),
    }
}
