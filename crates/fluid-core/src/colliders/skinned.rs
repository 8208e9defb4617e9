//! Skinned-mesh collider approximated by one capsule per bone.

use glam::{Affine3A, Vec3};

use super::primitives::{closest_on_segment, sphere_hit};
use super::{ActorId, BoneId, Collider, SurfaceHit};

/// A bone capsule running along the bone's local Z axis, centred on the bone
/// origin.
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Bone space to world space. Updated by the animation system every frame.
    pub transform: Affine3A,
    pub half_height: f32,
    pub radius: f32,
}

impl Bone {
    pub fn new(
        name: impl Into<String>,
        transform: Affine3A,
        half_height: f32,
        radius: f32,
    ) -> Self {
        Self {
            name: name.into(),
            transform,
            half_height,
            radius,
        }
    }

    fn segment(&self) -> (Vec3, Vec3) {
        let half = Vec3::new(0.0, 0.0, self.half_height);
        (
            self.transform.transform_point3(-half),
            self.transform.transform_point3(half),
        )
    }
}

#[derive(Clone, Debug)]
pub struct SkinnedCollider {
    pub actor: ActorId,
    /// Component transform, used for whole-object attachment.
    pub transform: Affine3A,
    pub bones: Vec<Bone>,
    pub enabled: bool,
}

impl SkinnedCollider {
    pub fn new(actor: ActorId, transform: Affine3A, bones: Vec<Bone>) -> Self {
        Self {
            actor,
            transform,
            bones,
            enabled: true,
        }
    }

    pub fn bone_name(&self, bone: BoneId) -> Option<&str> {
        self.bones.get(bone as usize).map(|b| b.name.as_str())
    }

    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .map(|i| i as BoneId)
    }
}

impl Collider for SkinnedCollider {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit> {
        let mut best: Option<SurfaceHit> = None;
        for (i, bone) in self.bones.iter().enumerate() {
            let (a, b) = bone.segment();
            let axis_point = closest_on_segment(position, a, b);
            let hit = sphere_hit(position, axis_point, bone.radius, Some(i as BoneId));
            if best.map_or(true, |h| hit.distance < h.distance) {
                best = Some(hit);
            }
        }
        best
    }

    fn frame(&self, bone: Option<BoneId>) -> Option<Affine3A> {
        match bone {
            None => Some(self.transform),
            Some(id) => self.bones.get(id as usize).map(|b| b.transform),
        }
    }
}
