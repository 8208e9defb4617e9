//! Analytic collider shapes.

use glam::{Affine3A, Quat, Vec3};

use super::{ActorId, BoneId, Collider, SurfaceHit};
use crate::math::try_normalize;

/// Closest point on segment `[a, b]` to `p`.
#[inline]
pub(crate) fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 1e-12 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Hit against a sphere of `radius` around `center`. Points at the exact
/// center resolve upward.
#[inline]
pub(crate) fn sphere_hit(p: Vec3, center: Vec3, radius: f32, bone: Option<BoneId>) -> SurfaceHit {
    let d = p - center;
    let len = d.length();
    let normal = try_normalize(d).unwrap_or(Vec3::Z);
    SurfaceHit {
        point: center + normal * radius,
        normal,
        distance: len - radius,
        bone,
    }
}

/// Frame whose local +Z axis points along `axis`.
#[inline]
pub(crate) fn frame_along(axis: Vec3, origin: Vec3) -> Affine3A {
    let rotation = try_normalize(axis)
        .map(|dir| Quat::from_rotation_arc(Vec3::Z, dir))
        .unwrap_or(Quat::IDENTITY);
    Affine3A::from_rotation_translation(rotation, origin)
}

#[derive(Clone, Debug)]
pub struct SphereCollider {
    pub actor: ActorId,
    pub center: Vec3,
    pub radius: f32,
    pub enabled: bool,
}

impl SphereCollider {
    pub fn new(actor: ActorId, center: Vec3, radius: f32) -> Self {
        Self { actor, center, radius, enabled: true }
    }
}

impl Collider for SphereCollider {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit> {
        Some(sphere_hit(position, self.center, self.radius, None))
    }

    fn frame(&self, _bone: Option<BoneId>) -> Option<Affine3A> {
        Some(Affine3A::from_translation(self.center))
    }
}

/// Infinite plane through `origin`; everything behind `normal` is solid.
#[derive(Clone, Debug)]
pub struct PlaneCollider {
    pub actor: ActorId,
    pub origin: Vec3,
    pub normal: Vec3,
    pub enabled: bool,
}

impl PlaneCollider {
    pub fn new(actor: ActorId, origin: Vec3, normal: Vec3) -> Self {
        Self {
            actor,
            origin,
            normal: try_normalize(normal).unwrap_or(Vec3::Z),
            enabled: true,
        }
    }
}

impl Collider for PlaneCollider {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit> {
        let distance = (position - self.origin).dot(self.normal);
        Some(SurfaceHit {
            point: position - self.normal * distance,
            normal: self.normal,
            distance,
            bone: None,
        })
    }

    fn frame(&self, _bone: Option<BoneId>) -> Option<Affine3A> {
        Some(frame_along(self.normal, self.origin))
    }
}

/// Oriented box. `transform` must be rigid (rotation + translation).
#[derive(Clone, Debug)]
pub struct BoxCollider {
    pub actor: ActorId,
    pub transform: Affine3A,
    pub half_extents: Vec3,
    pub enabled: bool,
}

impl BoxCollider {
    pub fn new(actor: ActorId, transform: Affine3A, half_extents: Vec3) -> Self {
        Self {
            actor,
            transform,
            half_extents: half_extents.abs(),
            enabled: true,
        }
    }

    pub fn axis_aligned(actor: ActorId, center: Vec3, half_extents: Vec3) -> Self {
        Self::new(actor, Affine3A::from_translation(center), half_extents)
    }
}

impl Collider for BoxCollider {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit> {
        let local = self.transform.inverse().transform_point3(position);
        let he = self.half_extents;
        let clamped = local.clamp(-he, he);
        let outside = local - clamped;

        let (local_point, local_normal, distance) = if let Some(n) = try_normalize(outside) {
            (clamped, n, outside.length())
        } else {
            // Inside: push out through the nearest face.
            let q = local.abs() - he;
            let (axis, depth) = if q.x >= q.y && q.x >= q.z {
                (0, q.x)
            } else if q.y >= q.z {
                (1, q.y)
            } else {
                (2, q.z)
            };
            let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            let mut point = local;
            point[axis] = sign * he[axis];
            (point, normal, depth)
        };

        let normal = try_normalize(self.transform.transform_vector3(local_normal))?;
        Some(SurfaceHit {
            point: self.transform.transform_point3(local_point),
            normal,
            distance,
            bone: None,
        })
    }

    fn frame(&self, _bone: Option<BoneId>) -> Option<Affine3A> {
        Some(self.transform)
    }
}

/// Capsule around segment `[a, b]`.
#[derive(Clone, Debug)]
pub struct CapsuleCollider {
    pub actor: ActorId,
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
    pub enabled: bool,
}

impl CapsuleCollider {
    pub fn new(actor: ActorId, a: Vec3, b: Vec3, radius: f32) -> Self {
        Self { actor, a, b, radius, enabled: true }
    }
}

impl Collider for CapsuleCollider {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn closest_point(&self, position: Vec3) -> Option<SurfaceHit> {
        let axis_point = closest_on_segment(position, self.a, self.b);
        Some(sphere_hit(position, axis_point, self.radius, None))
    }

    fn frame(&self, _bone: Option<BoneId>) -> Option<Affine3A> {
        Some(frame_along(self.b - self.a, (self.a + self.b) * 0.5))
    }
}
