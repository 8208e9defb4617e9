//! Surface adhesion with an attachment state machine, plus particle cohesion.
//!
//! Adhesion runs in two phases: a read-only scan of every particle against the
//! collider list (parallel when enabled), then a sequential pass that applies
//! forces and attachment transitions in particle order.

use glam::{Affine3A, Vec3};

use crate::colliders::{find_actor, ActorId, BoneId, Collider, SurfaceHit};
use crate::fluids::KernelCoefficients;
use crate::parallel::map_indices;
use crate::particle::{Attachment, Particle};

/// Attached particles stay attached to the same actor up to this distance.
pub const MAINTAIN_MARGIN: f32 = 15.0;
/// Maintain margin while resting near the ground.
pub const MAINTAIN_MARGIN_NEAR_GROUND: f32 = 5.0;
/// Free particles attach within this distance.
pub const ATTACH_MARGIN: f32 = 10.0;
/// Strict band: switching to another collider, and where the spring takes over.
pub const STRICT_MARGIN: f32 = 5.0;

const SPRING_GAIN: f32 = 0.5;
const SPRING_MAX: f32 = 50.0;
/// Kernel distances below this fraction of the support are held at it.
///
/// The Akinci adhesion spline vanishes on `[0, h/2]` and peaks at `3h/4`, so
/// particles touching a surface get the peak pull instead of none.
pub const ADHESION_HOLD_FRACTION: f32 = 0.75;

/// Surface a particle should be attached to after this substep.
#[derive(Clone, Copy, Debug)]
struct AttachTarget {
    actor: ActorId,
    bone: Option<BoneId>,
    normal: Vec3,
    frame: Affine3A,
}

/// Read-phase result for one particle.
#[derive(Clone, Copy, Debug, Default)]
struct AdhesionOutcome {
    force: Vec3,
    target: Option<AttachTarget>,
}

pub struct AdhesionSolver;

impl AdhesionSolver {
    /// Pull particles toward nearby collider surfaces and update attachment.
    ///
    /// `radius` is the adhesion kernel support, `contact_offset` is subtracted
    /// from the surface distance before the kernel is evaluated. A positive
    /// `detach_threshold` tears off attached particles moving away from their
    /// surface faster than that speed.
    pub fn apply(
        particles: &mut [Particle],
        colliders: &[&dyn Collider],
        strength: f32,
        radius: f32,
        detach_threshold: f32,
        contact_offset: f32,
    ) {
        if particles.is_empty() {
            return;
        }
        let kernels = KernelCoefficients::precompute(radius.max(0.0));
        let active = strength > 0.0 && radius > 0.0;

        let outcomes = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                if !active {
                    return AdhesionOutcome::default();
                }
                evaluate(&view[i], colliders, strength, &kernels, detach_threshold, contact_offset)
            })
        };

        for (p, outcome) in particles.iter_mut().zip(outcomes) {
            update_attachment_state(p, &outcome);
        }
    }

    /// Pairwise Akinci cohesion, added straight to velocity.
    pub fn apply_cohesion(particles: &mut [Particle], strength: f32, smoothing_radius: f32) {
        if strength <= 0.0 || smoothing_radius <= 0.0 || particles.is_empty() {
            return;
        }
        let kernels = KernelCoefficients::precompute(smoothing_radius);

        let pulls = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pi = &view[i];
                let mut pull = Vec3::ZERO;
                for &j in &pi.neighbors {
                    let j = j as usize;
                    if j == i {
                        continue;
                    }
                    let Some(pj) = view.get(j) else {
                        continue;
                    };
                    let r = pi.position - pj.position;
                    let r_len = r.length();
                    if r_len <= 1e-6 {
                        continue;
                    }
                    pull -= (r / r_len) * (strength * kernels.cohesion(r_len));
                }
                pull
            })
        };

        for (p, dv) in particles.iter_mut().zip(pulls) {
            p.velocity += dv;
        }
    }
}

/// Closest enabled collider to `position`.
fn closest_surface<'a>(
    colliders: &[&'a dyn Collider],
    position: Vec3,
) -> Option<(&'a dyn Collider, SurfaceHit)> {
    let mut best: Option<(&'a dyn Collider, SurfaceHit)> = None;
    for &collider in colliders.iter().filter(|c| c.is_enabled()) {
        let Some(hit) = collider.closest_point(position) else {
            continue;
        };
        if best.map_or(true, |(_, b)| hit.distance < b.distance) {
            best = Some((collider, hit));
        }
    }
    best
}

fn evaluate(
    p: &Particle,
    colliders: &[&dyn Collider],
    strength: f32,
    kernels: &KernelCoefficients,
    detach_threshold: f32,
    contact_offset: f32,
) -> AdhesionOutcome {
    let Some((collider, hit)) = closest_surface(colliders, p.position) else {
        return AdhesionOutcome::default();
    };

    // An attachment to an actor missing from the list is stale.
    let current = p
        .attached_actor()
        .filter(|&actor| find_actor(colliders, actor).is_some_and(|c| c.is_enabled()));
    let same_actor = current == Some(collider.actor());

    let margin = match current {
        Some(_) if same_actor && (p.near_ground || p.near_boundary) => MAINTAIN_MARGIN_NEAR_GROUND,
        Some(_) if same_actor => MAINTAIN_MARGIN,
        Some(_) => STRICT_MARGIN,
        None if p.just_detached => return AdhesionOutcome::default(),
        None => ATTACH_MARGIN,
    };
    if hit.distance > margin {
        return AdhesionOutcome::default();
    }

    if same_actor && detach_threshold > 0.0 && p.velocity.dot(hit.normal) > detach_threshold {
        return AdhesionOutcome::default();
    }

    let Some(frame) = collider.frame(hit.bone) else {
        return AdhesionOutcome::default();
    };

    let toward_surface = -hit.normal;
    let force = if same_actor && hit.distance > STRICT_MARGIN {
        toward_surface * (hit.distance * SPRING_GAIN).min(SPRING_MAX)
    } else {
        let r = (hit.distance - contact_offset).max(ADHESION_HOLD_FRACTION * kernels.h);
        toward_surface * (strength * kernels.adhesion(r))
    };

    AdhesionOutcome {
        force,
        target: Some(AttachTarget {
            actor: collider.actor(),
            bone: hit.bone,
            normal: hit.normal,
            frame,
        }),
    }
}

/// Apply the read-phase outcome to one particle.
///
/// The local offset is always re-derived from the target's current frame, so
/// it follows a change of actor or bone and tracks drift while attached.
fn update_attachment_state(p: &mut Particle, outcome: &AdhesionOutcome) {
    p.velocity += outcome.force;
    let was_attached = p.is_attached();
    p.just_detached = false;

    match outcome.target {
        Some(target) => {
            p.attachment = Some(Attachment {
                actor: target.actor,
                bone: target.bone,
                local_offset: target.frame.inverse().transform_point3(p.position),
                surface_normal: target.normal,
            });
        }
        None => {
            p.attachment = None;
            // Blocks re-attachment on the next substep.
            p.just_detached = was_attached;
        }
    }
}
