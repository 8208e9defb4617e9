/// Spawn volumes for seeding fluid.
///
/// Each shape is filled with a regular lattice at a caller-chosen spacing.
/// `primitives` holds the per-shape generators and `dispatcher` selects among them.
pub mod primitives;
pub mod dispatcher;

use glam::Vec3;

/// A volume particles can be spawned into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnShape {
    Sphere { center: Vec3, radius: f32 },
    Box { center: Vec3, half_extents: Vec3 },
    /// Upright cylinder along +Z.
    Cylinder { center: Vec3, radius: f32, half_height: f32 },
}
