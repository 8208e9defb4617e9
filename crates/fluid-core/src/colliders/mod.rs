//! Collider query contract shared by collision response and adhesion.
//!
//! The solver only ever talks to `dyn Collider`; concrete shapes live in
//! [`primitives`] and [`skinned`].

pub mod primitives;
pub mod skinned;

use glam::{Affine3A, Vec3};

pub use primitives::{BoxCollider, CapsuleCollider, PlaneCollider, SphereCollider};
pub use skinned::{Bone, SkinnedCollider};

/// Index of a bone inside a skinned collider.
pub type BoneId = u32;

/// Non-owning, generational handle to an external actor.
///
/// Particles store this instead of any reference to the actor itself. A handle
/// whose actor no longer shows up in the collider list is simply stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    pub index: u32,
    pub generation: u32,
}

impl ActorId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Result of a closest-point query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Closest point on the surface.
    pub point: Vec3,
    /// Outward unit normal at `point`.
    pub normal: Vec3,
    /// Signed distance from the query point (negative inside).
    pub distance: f32,
    /// Bone owning the surface, for skinned colliders.
    pub bone: Option<BoneId>,
}

pub trait Collider: Send + Sync {
    /// Actor this collider belongs to.
    fn actor(&self) -> ActorId;

    /// Disabled colliders are skipped by collision and adhesion.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Closest surface point, outward normal and signed distance.
    /// `None` when the query is degenerate for this shape.
    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit>;

    /// Signed distance and its gradient (outward normal) at `position`.
    fn signed_distance(&self, position: Vec3) -> Option<(f32, Vec3)> {
        self.closest_point(position).map(|hit| (hit.distance, hit.normal))
    }

    fn is_point_inside(&self, position: Vec3) -> bool {
        matches!(self.signed_distance(position), Some((d, _)) if d < 0.0)
    }

    /// World transform of the whole collider (`bone == None`) or of one bone.
    fn frame(&self, bone: Option<BoneId>) -> Option<Affine3A>;
}

/// Find the collider owning `actor` in the current list.
pub fn find_actor<'a>(colliders: &[&'a dyn Collider], actor: ActorId) -> Option<&'a dyn Collider> {
    colliders.iter().copied().find(|c| c.actor() == actor)
}
