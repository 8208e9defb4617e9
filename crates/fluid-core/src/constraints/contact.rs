use glam::Vec3;

use crate::colliders::{ActorId, BoneId, Collider};
use crate::config::FluidPreset;
use crate::events::{CollisionEvent, CollisionEventQueue};
use crate::math::decompose;
use crate::particle::Particle;

/// Extra clearance added to the particle radius when resolving contacts.
pub const COLLISION_SKIN: f32 = 0.1;

/// Restitution/friction response shared by every collision domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactResponse {
    /// Particles are kept this far from surfaces.
    pub margin: f32,
    pub restitution: f32,
    /// Fraction of tangential velocity removed per contact, `[0, 1]`.
    pub friction: f32,
    /// Approach speeds below this stop instead of bouncing.
    pub min_bounce_speed: f32,
}

impl ContactResponse {
    pub fn from_preset(preset: &FluidPreset) -> Self {
        Self {
            margin: preset.particle_radius + COLLISION_SKIN,
            restitution: preset.restitution,
            friction: preset.friction,
            min_bounce_speed: preset.min_bounce_speed,
        }
    }

    /// Velocity after touching a surface with unit `normal`.
    ///
    /// Separating velocities pass through. Fast approaches bounce with
    /// restitution; slow ones lose their normal component so resting
    /// particles do not jitter. Friction damps the tangential part either way.
    pub fn respond(&self, velocity: Vec3, normal: Vec3) -> Vec3 {
        let (vn, vt) = decompose(velocity, normal);
        if vn >= 0.0 {
            return velocity;
        }
        let vt = vt * (1.0 - self.friction.clamp(0.0, 1.0));
        let vn = if -vn > self.min_bounce_speed {
            -vn * self.restitution
        } else {
            0.0
        };
        normal * vn + vt
    }
}

/// A resolved contact: push the particle out along `normal` until it sits
/// `margin` off the surface, then back-solve `position` so that the
/// finalize step's `(predicted - position) / dt` reproduces the response
/// velocity.
pub(crate) fn resolve_contact(
    p: &mut Particle,
    normal: Vec3,
    penetration: f32,
    response: &ContactResponse,
    dt: f32,
) -> (Vec3, f32) {
    let incoming = (p.predicted - p.position) / dt;
    p.predicted += normal * penetration;
    let outgoing = response.respond(incoming, normal);
    p.position = p.predicted - outgoing * dt;
    p.velocity = outgoing;
    (incoming, (-incoming.dot(normal)).max(0.0))
}

/// Queue an impact event for `p` when it passes the queue's filters.
pub(crate) fn report_impact(
    events: &mut CollisionEventQueue,
    p: &Particle,
    incoming: Vec3,
    impact_speed: f32,
    actor: Option<ActorId>,
    bone: Option<BoneId>,
) {
    if impact_speed <= 0.0 {
        return;
    }
    events.push(CollisionEvent {
        particle: p.id,
        position: p.predicted,
        velocity: incoming,
        impact_speed,
        actor,
        bone,
    });
}

/// Resolve predicted positions against an explicit collider list.
///
/// Colliders are processed in list order; each later collider sees the
/// velocity left by the previous one.
pub fn handle_collisions(
    particles: &mut [Particle],
    colliders: &[&dyn Collider],
    response: &ContactResponse,
    dt: f32,
    events: &mut CollisionEventQueue,
) {
    if dt <= 0.0 || colliders.is_empty() {
        return;
    }
    for p in particles.iter_mut() {
        for collider in colliders.iter().filter(|c| c.is_enabled()) {
            let Some(hit) = collider.closest_point(p.predicted) else {
                continue;
            };
            if hit.distance >= response.margin {
                continue;
            }
            let (incoming, impact_speed) =
                resolve_contact(p, hit.normal, response.margin - hit.distance, response, dt);
            report_impact(events, p, incoming, impact_speed, Some(collider.actor()), hit.bone);
        }
    }
}
