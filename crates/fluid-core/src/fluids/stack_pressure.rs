use glam::Vec3;

use crate::fluids::KernelCoefficients;
use crate::math::{tangent_component, try_normalize};
use crate::parallel::map_indices;
use crate::particle::Particle;

/// Makes stacked particles on a slope slide faster than lone ones.
///
/// For each attached particle, gravity is projected onto its surface plane.
/// Neighbors attached to the same actor and sitting up-slope contribute
/// `m_j * W(r) * (height_diff / r)` to a stack weight, and the particle is
/// accelerated down-slope by `weight * scale`.
pub struct StackPressureSolver;

impl StackPressureSolver {
    pub fn apply(
        particles: &mut [Particle],
        gravity: Vec3,
        scale: f32,
        kernels: &KernelCoefficients,
        dt: f32,
    ) {
        if scale == 0.0 || particles.is_empty() || dt <= 0.0 {
            return;
        }

        let accelerations = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pi = &view[i];
                let Some(attachment) = pi.attachment else {
                    return Vec3::ZERO;
                };
                let along = tangent_component(gravity, attachment.surface_normal);
                let Some(down_slope) = try_normalize(along) else {
                    // Horizontal surface: nothing to slide along.
                    return Vec3::ZERO;
                };
                let up_slope = -down_slope;

                let mut weight = 0.0_f32;
                for &j in &pi.neighbors {
                    let j = j as usize;
                    if j == i {
                        continue;
                    }
                    let Some(pj) = view.get(j) else {
                        continue;
                    };
                    if pj.attached_actor() != Some(attachment.actor) {
                        continue;
                    }
                    let r = pj.position - pi.position;
                    let dist = r.length();
                    if dist <= 1e-6 || dist >= kernels.h {
                        continue;
                    }
                    let height = r.dot(up_slope);
                    if height <= 0.0 {
                        continue;
                    }
                    weight += pj.mass * kernels.poly6(dist) * (height / dist);
                }
                down_slope * (weight * scale)
            })
        };

        for (p, acc) in particles.iter_mut().zip(accelerations) {
            p.velocity += acc * dt;
        }
    }
}
