use fluid_core::constraints::density::DensityConstraint;
use fluid_core::fluids::viscosity::ViscositySolver;
use fluid_core::fluids::{
    adhesion_kernel, cohesion_kernel, poly6_kernel, spiky_gradient, KernelCoefficients,
};
use fluid_core::particle::Particle;
use glam::Vec3;
use proptest::prelude::*;
use std::f32::consts::PI;

#[test]
fn test_poly6_kernel_zero_distance() {
    let h = 10.0_f32;
    let result = poly6_kernel(0.0, h);
    // At r=0 the (h^2 - r^2)^3 term equals h^6, so peak = coeff * h^6
    let peak = 315.0 / (64.0 * PI * h.powi(9)) * h.powi(6);
    assert!(
        (result - peak).abs() < peak * 1e-5,
        "poly6(0, {h}) = {result}, expected {peak}"
    );
}

#[test]
fn test_poly6_kernel_at_boundary() {
    let h = 10.0_f32;
    assert_eq!(poly6_kernel(h, h), 0.0, "poly6(h, h) should be 0.0");
    assert_eq!(KernelCoefficients::precompute(h).poly6(h), 0.0);
}

#[test]
fn test_spiky_gradient_zero_distance() {
    let r = Vec3::new(1e-7, 0.0, 0.0);
    let result = spiky_gradient(r, r.length(), 10.0);
    assert_eq!(result, Vec3::ZERO, "near-zero r_len should return ZERO");
}

#[test]
fn test_spiky_gradient_direction() {
    let h = 10.0_f32;
    let r = Vec3::new(5.0, 0.0, 0.0);
    let grad = spiky_gradient(r, r.length(), h);
    assert!(
        grad.x < 0.0,
        "gradient x should be negative (pointing toward neighbor), got {}",
        grad.x
    );
    assert!(grad.y.abs() < 1e-10 && grad.z.abs() < 1e-10);
}

#[test]
fn test_spiky_gradient_fades_at_boundary() {
    let h = 10.0_f32;
    let near = spiky_gradient(Vec3::new(9.99, 0.0, 0.0), 9.99, h).length();
    let mid = spiky_gradient(Vec3::new(5.0, 0.0, 0.0), 5.0, h).length();
    assert!(near < mid * 1e-3, "|grad| near h = {near}, at h/2 = {mid}");
}

#[test]
fn test_adhesion_kernel_band() {
    let h = 10.0_f32;
    assert_eq!(adhesion_kernel(4.9, h), 0.0);
    assert_eq!(adhesion_kernel(5.0, h), 0.0, "radicand is zero at h/2");
    assert!(adhesion_kernel(7.5, h) > 0.0);
    assert_eq!(adhesion_kernel(10.5, h), 0.0);
}

/// Two particles 2 cm apart with velocities 0 and 10: each sees only the other,
/// so the normalized blend moves both halfway toward each other.
#[test]
fn test_xsph_two_particles_closed_form() {
    let kernels = KernelCoefficients::precompute(10.0);
    let mut a = Particle::new(0, Vec3::ZERO, Vec3::ZERO, 1.0);
    let mut b = Particle::new(1, Vec3::new(2.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 1.0);
    a.neighbors = vec![0, 1];
    b.neighbors = vec![1, 0];
    let mut particles = vec![a, b];

    ViscositySolver::apply_xsph(&mut particles, 0.5, &kernels);

    assert!((particles[0].velocity.x - 5.0).abs() < 1e-4, "a: {:?}", particles[0].velocity);
    assert!((particles[1].velocity.x - 5.0).abs() < 1e-4, "b: {:?}", particles[1].velocity);

    // Swapped storage order gives the same answer.
    let mut swapped = vec![moving(0.0, 10.0), moving(2.0, 0.0)];
    swapped[0].neighbors = vec![0, 1];
    swapped[1].neighbors = vec![0, 1];
    ViscositySolver::apply_xsph(&mut swapped, 0.5, &kernels);
    assert!((swapped[0].velocity.x - 5.0).abs() < 1e-4);
    assert!((swapped[1].velocity.x - 5.0).abs() < 1e-4);
}

fn moving(x: f32, vx: f32) -> Particle {
    Particle::new(0, Vec3::new(x, 0.0, 0.0), Vec3::new(vx, 0.0, 0.0), 1.0)
}

#[test]
fn test_densities_non_negative() {
    let solver = DensityConstraint::new(1.0, 0.0, 10.0);
    let mut particles: Vec<Particle> = (0..20)
        .map(|i| {
            let t = i as f32;
            let position = Vec3::new((t * 1.7).sin() * 6.0, (t * 0.9).cos() * 6.0, t * 0.4);
            Particle::new(i, position, Vec3::ZERO, 0.5 + t * 0.1)
        })
        .collect();
    let all: Vec<u32> = (0..20).collect();
    for p in &mut particles {
        p.neighbors = all.clone();
    }
    solver.compute_densities(&mut particles);
    for p in &particles {
        assert!(p.density >= 0.0, "density {} < 0", p.density);
        // Self term alone is positive.
        assert!(p.density > 0.0);
    }
}

proptest! {
    #[test]
    fn test_kernels_vanish_outside_support(h in 0.5f32..50.0, extra in 0.0f32..100.0) {
        let r = h + extra + 1e-3;
        prop_assert_eq!(poly6_kernel(r, h), 0.0);
        prop_assert_eq!(spiky_gradient(Vec3::new(r, 0.0, 0.0), r, h), Vec3::ZERO);
        prop_assert_eq!(cohesion_kernel(r, h), 0.0);
        prop_assert_eq!(adhesion_kernel(r, h), 0.0);
        let k = KernelCoefficients::precompute(h);
        prop_assert_eq!(k.poly6(r), 0.0);
        prop_assert_eq!(k.viscosity_laplacian(r), 0.0);
    }

    #[test]
    fn test_adhesion_zero_inside_half_radius(h in 0.5f32..50.0, frac in 0.0f32..0.5) {
        prop_assert_eq!(adhesion_kernel(h * frac, h), 0.0);
    }

    #[test]
    fn test_poly6_non_negative(h in 0.5f32..50.0, frac in 0.0f32..1.5) {
        prop_assert!(poly6_kernel(h * frac, h) >= 0.0);
    }
}
