use glam::Vec3;

use crate::config::FluidPreset;
use crate::fluids::KernelCoefficients;
use crate::parallel::map_indices;
use crate::particle::Particle;

/// Keeps the lambda denominator away from zero for isolated particles.
const DENOMINATOR_EPSILON: f32 = 1.0e-9;

/// Artificial pressure against particle clustering at free surfaces.
///
/// `s_corr = -k * (W(r) / W(dq * h))^n`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TensileCorrection {
    pub k: f32,
    pub n: i32,
    /// Reference distance as a fraction of the smoothing radius.
    pub dq: f32,
}

impl Default for TensileCorrection {
    fn default() -> Self {
        Self {
            k: 0.001,
            n: 4,
            dq: 0.3,
        }
    }
}

/// XPBD density constraint solver.
///
/// Reference: "Position Based Fluids", Macklin & Muller, SIGGRAPH 2013, with
/// the compliance term of XPBD (Macklin, Muller & Chentanez 2016).
///
/// Each iteration runs three passes over the particles:
/// 1. density from the poly6 kernel over the neighbor list,
/// 2. the multiplier increment `dλ = (-C - α̃λ) / (Σ|∇C|² + α̃)`,
/// 3. position corrections `Δp_i = 1/ρ0 Σ_j m_j (dλ_i + dλ_j + s_corr) ∇W`.
///
/// The constraint is unilateral: a particle below rest density gets no
/// increment, so nothing is ever pulled together (the tensile term aside).
///
/// Rest density, compliance and radius are owned by the solver, not read
/// from a shared preset, so one instance may be re-pointed at another preset.
pub struct DensityConstraint {
    rest_density: f32,
    compliance: f32,
    smoothing_radius: f32,
    tensile: Option<TensileCorrection>,
    kernels: KernelCoefficients,
    delta_lambda: Vec<f32>,
}

impl DensityConstraint {
    pub fn new(rest_density: f32, compliance: f32, smoothing_radius: f32) -> Self {
        Self {
            rest_density,
            compliance,
            smoothing_radius,
            tensile: None,
            kernels: KernelCoefficients::precompute(smoothing_radius),
            delta_lambda: Vec::new(),
        }
    }

    pub fn from_preset(preset: &FluidPreset) -> Self {
        let mut solver = Self::new(preset.rest_density, preset.compliance, preset.smoothing_radius);
        solver.configure(preset);
        solver
    }

    /// Pull every solver-local setting from `preset`.
    pub fn configure(&mut self, preset: &FluidPreset) {
        self.set_rest_density(preset.rest_density);
        self.set_compliance(preset.compliance);
        self.set_smoothing_radius(preset.smoothing_radius);
        self.tensile = preset.tensile_correction.then_some(TensileCorrection {
            k: preset.tensile_k,
            n: preset.tensile_n,
            dq: preset.tensile_dq,
        });
    }

    pub fn rest_density(&self) -> f32 {
        self.rest_density
    }

    pub fn set_rest_density(&mut self, rest_density: f32) {
        self.rest_density = rest_density;
    }

    pub fn compliance(&self) -> f32 {
        self.compliance
    }

    pub fn set_compliance(&mut self, compliance: f32) {
        self.compliance = compliance.max(0.0);
    }

    pub fn smoothing_radius(&self) -> f32 {
        self.smoothing_radius
    }

    pub fn set_smoothing_radius(&mut self, smoothing_radius: f32) {
        if smoothing_radius != self.smoothing_radius {
            self.smoothing_radius = smoothing_radius;
            self.kernels = KernelCoefficients::precompute(smoothing_radius);
        }
    }

    pub fn tensile_correction(&self) -> Option<TensileCorrection> {
        self.tensile
    }

    pub fn set_tensile_correction(&mut self, tensile: Option<TensileCorrection>) {
        self.tensile = tensile;
    }

    pub fn kernels(&self) -> &KernelCoefficients {
        &self.kernels
    }

    fn is_usable(&self) -> bool {
        self.rest_density > 0.0 && self.smoothing_radius > 0.0
    }

    /// Run `iterations` full iterations for one substep.
    ///
    /// Returns the largest positive constraint value seen by the last
    /// iteration's density pass.
    pub fn solve(&mut self, particles: &mut [Particle], dt: f32, iterations: u32) -> f32 {
        for p in particles.iter_mut() {
            p.lambda = 0.0;
        }
        let mut violation = 0.0;
        for _ in 0..iterations {
            violation = self.solve_iteration(particles, dt);
        }
        violation
    }

    /// One density / multiplier / correction round on the current predicted
    /// positions. Returns `max(C_i, 0)` over all particles, measured before
    /// this round's correction.
    pub fn solve_iteration(&mut self, particles: &mut [Particle], dt: f32) -> f32 {
        if particles.is_empty() || !self.is_usable() || dt <= 0.0 {
            return 0.0;
        }
        self.compute_densities(particles);
        let violation = self.compute_multipliers(particles, dt);
        self.apply_position_corrections(particles);
        violation
    }

    /// Pass 1: `ρ_i = Σ_j m_j W(|p_i - p_j|)` over the neighbor list.
    pub fn compute_densities(&self, particles: &mut [Particle]) {
        let k = &self.kernels;
        let densities = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pos_i = view[i].predicted;
                let mut rho = 0.0_f32;
                for &j in &view[i].neighbors {
                    let Some(pj) = view.get(j as usize) else {
                        continue;
                    };
                    rho += pj.mass * k.poly6_sq((pos_i - pj.predicted).length_squared());
                }
                rho
            })
        };
        for (p, rho) in particles.iter_mut().zip(densities) {
            p.density = rho;
        }
    }

    /// Pass 2: multiplier increments. Stores the increment in a scratch buffer
    /// and accumulates the total into `Particle::lambda`.
    fn compute_multipliers(&mut self, particles: &mut [Particle], dt: f32) -> f32 {
        let k = &self.kernels;
        let inv_rho0 = 1.0 / self.rest_density;
        let alpha_tilde = self.compliance / (dt * dt);

        let increments = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pi = &view[i];
                let c_i = pi.density * inv_rho0 - 1.0;
                if c_i <= 0.0 {
                    return (0.0, 0.0);
                }

                let mut grad_sum_sq = 0.0_f32;
                let mut grad_self = Vec3::ZERO;
                for &j in &pi.neighbors {
                    let j = j as usize;
                    if j == i {
                        continue;
                    }
                    let Some(pj) = view.get(j) else {
                        continue;
                    };
                    let r = pi.predicted - pj.predicted;
                    let grad_j = k.spiky_gradient(r, r.length()) * (pj.mass * inv_rho0);
                    grad_sum_sq += grad_j.length_squared();
                    grad_self += grad_j;
                }
                grad_sum_sq += grad_self.length_squared();

                let denominator = grad_sum_sq + alpha_tilde + DENOMINATOR_EPSILON;
                let d_lambda = (-c_i - alpha_tilde * pi.lambda) / denominator;
                (d_lambda, c_i)
            })
        };

        self.delta_lambda.clear();
        let mut violation = 0.0_f32;
        for (p, (d_lambda, c_i)) in particles.iter_mut().zip(increments) {
            p.lambda += d_lambda;
            self.delta_lambda.push(d_lambda);
            violation = violation.max(c_i);
        }
        violation
    }

    /// Pass 3: compute every `Δp` against the unmodified positions, then apply.
    fn apply_position_corrections(&self, particles: &mut [Particle]) {
        let k = &self.kernels;
        let h = self.smoothing_radius;
        let inv_rho0 = 1.0 / self.rest_density;
        let d_lambda = &self.delta_lambda;
        let tensile = self.tensile.map(|t| {
            let w_dq = k.poly6(t.dq * h);
            (t, if w_dq > 0.0 { 1.0 / w_dq } else { 0.0 })
        });

        let corrections = {
            let view: &[Particle] = particles;
            map_indices(view.len(), |i| {
                let pi = &view[i];
                let lambda_i = d_lambda[i];
                let mut delta_p = Vec3::ZERO;
                for &j in &pi.neighbors {
                    let j = j as usize;
                    if j == i {
                        continue;
                    }
                    let Some(pj) = view.get(j) else {
                        continue;
                    };
                    let r = pi.predicted - pj.predicted;
                    let r_len = r.length();
                    if r_len >= h {
                        continue;
                    }

                    let s_corr = match tensile {
                        Some((t, inv_w_dq)) => {
                            let ratio = k.poly6(r_len) * inv_w_dq;
                            -t.k * ratio.powi(t.n)
                        }
                        None => 0.0,
                    };

                    let scale = (lambda_i + d_lambda[j] + s_corr) * pj.mass;
                    delta_p += scale * k.spiky_gradient(r, r_len);
                }
                delta_p * inv_rho0
            })
        };

        for (p, dp) in particles.iter_mut().zip(corrections) {
            p.predicted += dp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(distance: f32) -> Vec<Particle> {
        let mut a = Particle::new(0, Vec3::ZERO, Vec3::ZERO, 1.0);
        let mut b = Particle::new(1, Vec3::new(distance, 0.0, 0.0), Vec3::ZERO, 1.0);
        a.neighbors = vec![0, 1];
        b.neighbors = vec![0, 1];
        vec![a, b]
    }

    #[test]
    fn test_compressed_pair_is_pushed_apart() {
        let h = 10.0;
        let k = KernelCoefficients::precompute(h);
        // Rest density reached at 6 cm; place them at 3 cm.
        let rest = k.poly6(0.0) + k.poly6(6.0);
        let mut solver = DensityConstraint::new(rest, 0.0, h);
        let mut particles = pair(3.0);
        let violation = solver.solve_iteration(&mut particles, 1.0 / 240.0);
        assert!(violation > 0.0);
        let gap = particles[1].predicted.x - particles[0].predicted.x;
        assert!(gap > 3.0, "gap {gap} should grow");
        // Symmetric push.
        assert!((particles[0].predicted.x + (particles[1].predicted.x - 3.0)).abs() < 1e-4);
    }

    #[test]
    fn test_sparse_pair_is_not_pulled_together() {
        let h = 10.0;
        let k = KernelCoefficients::precompute(h);
        let rest = k.poly6(0.0) + k.poly6(2.0);
        let mut solver = DensityConstraint::new(rest, 0.0, h);
        let mut particles = pair(8.0);
        solver.solve_iteration(&mut particles, 1.0 / 240.0);
        assert_eq!(particles[0].predicted, Vec3::ZERO);
        assert_eq!(particles[1].predicted, Vec3::new(8.0, 0.0, 0.0));
    }

    #[test]
    fn test_tensile_term_repels_sparse_pair() {
        let h = 10.0;
        let k = KernelCoefficients::precompute(h);
        let rest = k.poly6(0.0) + k.poly6(2.0);
        let mut solver = DensityConstraint::new(rest, 0.0, h);
        solver.set_tensile_correction(Some(TensileCorrection {
            k: 0.1,
            ..TensileCorrection::default()
        }));
        let mut particles = pair(3.0);
        solver.solve_iteration(&mut particles, 1.0 / 240.0);
        assert!(particles[1].predicted.x - particles[0].predicted.x > 3.0);
    }

    #[test]
    fn test_out_of_range_neighbor_is_skipped() {
        let mut particles = pair(3.0);
        particles[0].neighbors.push(99);
        let solver = DensityConstraint::new(1.0, 0.0, 10.0);
        solver.compute_densities(&mut particles);
        assert!(particles[0].density > 0.0);
        assert!((particles[0].density - particles[1].density).abs() < 1e-9);
    }
}
