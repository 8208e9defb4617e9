pub mod adhesion;
pub mod stack_pressure;
pub mod viscosity;

use glam::Vec3;
use std::f32::consts::PI;

/// Distances below this are treated as coincident for gradient directions.
const MIN_GRADIENT_DISTANCE: f32 = 1e-6;

/// Poly6 smoothing kernel for SPH density estimation.
///
/// Returns `W(r, h) = 315 / (64 * PI * h^9) * (h^2 - r^2)^3` when `0 <= r < h`,
/// and `0.0` otherwise. `W(h, h)` is exactly zero.
#[inline]
pub fn poly6_kernel(r: f32, h: f32) -> f32 {
    if r >= h || r < 0.0 {
        return 0.0;
    }
    let h2 = h * h;
    let diff = h2 - r * r;
    let h9 = h2 * h2 * h2 * h2 * h;
    let coeff = 315.0 / (64.0 * PI * h9);
    coeff * diff * diff * diff
}

/// Spiky kernel gradient for SPH pressure correction.
///
/// Returns `(r / r_len) * (-45 / (PI * h^6)) * (h - r_len)^2` when
/// `r_len < h` and `r_len > 1e-6`, and `Vec3::ZERO` otherwise.
#[inline]
pub fn spiky_gradient(r: Vec3, r_len: f32, h: f32) -> Vec3 {
    if r_len >= h || r_len <= MIN_GRADIENT_DISTANCE {
        return Vec3::ZERO;
    }
    let h6 = h * h * h * h * h * h;
    let coeff = -45.0 / (PI * h6);
    let diff = h - r_len;
    (r / r_len) * coeff * diff * diff
}

/// Laplacian of the classic SPH viscosity kernel, `45 / (PI * h^6) * (h - r)`.
///
/// The solver smooths velocities with XSPH instead; this is kept for callers
/// that want a force-based viscosity term.
#[inline]
pub fn viscosity_laplacian(r: f32, h: f32) -> f32 {
    if r >= h || r < 0.0 {
        return 0.0;
    }
    let h6 = h * h * h * h * h * h;
    45.0 / (PI * h6) * (h - r)
}

/// Akinci et al. 2013 adhesion kernel.
///
/// Non-zero only for `0.5h < r <= h`:
/// `0.007 / h^3.25 * (-4r^2/h + 6r - 2h)^0.25`.
#[inline]
pub fn adhesion_kernel(r: f32, h: f32) -> f32 {
    if h <= 0.0 {
        return 0.0;
    }
    adhesion_with_coeff(r, h, 0.007 / h.powf(3.25))
}

/// Akinci et al. 2013 cohesion spline, `32 / (PI * h^9)` times
/// `(h - r)^3 r^3` on `(h/2, h]` and `2 (h - r)^3 r^3 - h^6 / 64` on `(0, h/2]`.
#[inline]
pub fn cohesion_kernel(r: f32, h: f32) -> f32 {
    let h2 = h * h;
    let h6 = h2 * h2 * h2;
    let h9 = h6 * h2 * h;
    cohesion_with_coeff(r, h, h6, 32.0 / (PI * h9))
}

#[inline]
fn adhesion_with_coeff(r: f32, h: f32, coeff: f32) -> f32 {
    if r > h || 2.0 * r <= h {
        return 0.0;
    }
    let radicand = -4.0 * r * r / h + 6.0 * r - 2.0 * h;
    if radicand <= 0.0 {
        return 0.0;
    }
    coeff * radicand.powf(0.25)
}

#[inline]
fn cohesion_with_coeff(r: f32, h: f32, h6: f32, coeff: f32) -> f32 {
    if r > h || r <= 0.0 {
        return 0.0;
    }
    let d = h - r;
    let spline = d * d * d * r * r * r;
    if 2.0 * r > h {
        coeff * spline
    } else {
        coeff * (2.0 * spline - h6 / 64.0)
    }
}

/// Kernel constants for one smoothing radius.
///
/// Built once per substep so the hot loops never call `powi`/`powf`.
/// Read-only after construction; several domains may share one instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelCoefficients {
    pub h: f32,
    pub h2: f32,
    pub h6: f32,
    pub h9: f32,
    /// `315 / (64 PI h^9)`
    pub poly6: f32,
    /// `-45 / (PI h^6)`
    pub spiky_grad: f32,
    /// `45 / (PI h^6)`
    pub viscosity_laplacian: f32,
    /// `32 / (PI h^9)`
    pub cohesion: f32,
    /// `0.007 / h^3.25`
    pub adhesion: f32,
}

impl KernelCoefficients {
    pub fn precompute(h: f32) -> Self {
        let h2 = h * h;
        let h6 = h2 * h2 * h2;
        let h9 = h6 * h2 * h;
        Self {
            h,
            h2,
            h6,
            h9,
            poly6: 315.0 / (64.0 * PI * h9),
            spiky_grad: -45.0 / (PI * h6),
            viscosity_laplacian: 45.0 / (PI * h6),
            cohesion: 32.0 / (PI * h9),
            adhesion: 0.007 / h.powf(3.25),
        }
    }

    /// Poly6 from a squared distance.
    #[inline]
    pub fn poly6_sq(&self, r2: f32) -> f32 {
        if r2 >= self.h2 || r2 < 0.0 {
            return 0.0;
        }
        let diff = self.h2 - r2;
        self.poly6 * diff * diff * diff
    }

    #[inline]
    pub fn poly6(&self, r: f32) -> f32 {
        if r < 0.0 {
            return 0.0;
        }
        self.poly6_sq(r * r)
    }

    #[inline]
    pub fn spiky_gradient(&self, r: Vec3, r_len: f32) -> Vec3 {
        if r_len >= self.h || r_len <= MIN_GRADIENT_DISTANCE {
            return Vec3::ZERO;
        }
        let diff = self.h - r_len;
        (r / r_len) * self.spiky_grad * diff * diff
    }

    #[inline]
    pub fn viscosity_laplacian(&self, r: f32) -> f32 {
        if r >= self.h || r < 0.0 {
            return 0.0;
        }
        self.viscosity_laplacian * (self.h - r)
    }

    #[inline]
    pub fn cohesion(&self, r: f32) -> f32 {
        cohesion_with_coeff(r, self.h, self.h6, self.cohesion)
    }

    #[inline]
    pub fn adhesion(&self, r: f32) -> f32 {
        adhesion_with_coeff(r, self.h, self.adhesion)
    }

    /// Density a particle sees inside an infinite cubic lattice of the given
    /// spacing, every site carrying `mass`.
    ///
    /// Used to derive a rest density that agrees with the kernel normalisation.
    pub fn lattice_rest_density(&self, spacing: f32, mass: f32) -> f32 {
        if spacing <= 0.0 || self.h <= 0.0 {
            return 0.0;
        }
        let n = (self.h / spacing).ceil() as i32;
        let mut rho = 0.0_f32;
        for x in -n..=n {
            for y in -n..=n {
                for z in -n..=n {
                    let offset = Vec3::new(x as f32, y as f32, z as f32) * spacing;
                    rho += mass * self.poly6_sq(offset.length_squared());
                }
            }
        }
        rho
    }
}
