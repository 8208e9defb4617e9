use glam::Vec3;

use crate::fluids::KernelCoefficients;
use crate::parallel::map_indices;
use crate::particle::Particle;

/// XSPH velocity smoothing.
///
/// Blends each particle's velocity toward the poly6-weighted average of its
/// neighbors' velocities:
///
/// `v_i += c * Σ_j (v_j - v_i) W_ij / Σ_j W_ij`
///
/// Applied after positions are finalized, so `position` is the reference.
pub struct ViscositySolver;

impl ViscositySolver {
    /// Every correction is computed from the incoming velocities before any is
    /// written, so the result does not depend on particle order.
    pub fn apply_xsph(particles: &mut [Particle], viscosity: f32, kernels: &KernelCoefficients) {
        if viscosity <= 0.0 || particles.is_empty() {
            return;
        }
        let c = viscosity.min(1.0);

        let corrections = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pi = &view[i];
                let mut weighted = Vec3::ZERO;
                let mut weight_sum = 0.0_f32;
                for &j in &pi.neighbors {
                    let j = j as usize;
                    if j == i {
                        continue;
                    }
                    let Some(pj) = view.get(j) else {
                        continue;
                    };
                    let w = kernels.poly6_sq((pi.position - pj.position).length_squared());
                    if w <= 0.0 {
                        continue;
                    }
                    weighted += (pj.velocity - pi.velocity) * w;
                    weight_sum += w;
                }
                if weight_sum > 0.0 {
                    weighted * (c / weight_sum)
                } else {
                    Vec3::ZERO
                }
            })
        };

        for (p, dv) in particles.iter_mut().zip(corrections) {
            p.velocity += dv;
        }
    }
}
