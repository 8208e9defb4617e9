use glam::Vec3;
use thiserror::Error;

use crate::fluids::KernelCoefficients;

/// How world geometry is queried during `handle_world_collision`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WorldCollisionMode {
    /// Sweep the particle sphere from its previous to its predicted position.
    #[default]
    Sweep,
    /// Sample a signed distance (heightfield, SDF) at the predicted position.
    Distance,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive and finite (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Physical parameters of one fluid. Read-only during a `simulate` call.
///
/// Every length is in centimeters, every time in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct FluidPreset {
    pub smoothing_radius: f32,
    /// Rest density in mass units per cm^3, consistent with the kernels.
    pub rest_density: f32,
    pub particle_mass: f32,
    pub particle_radius: f32,
    pub gravity: Vec3,
    /// Ticks per second; the fixed substep is `1 / (simulation_rate * substeps)`.
    pub simulation_rate: f32,
    pub substeps: u32,
    pub solver_iterations: u32,
    /// XPBD compliance (inverse stiffness) of the density constraint.
    pub compliance: f32,
    pub tensile_correction: bool,
    pub tensile_k: f32,
    pub tensile_n: i32,
    /// Tensile reference distance as a fraction of the smoothing radius.
    pub tensile_dq: f32,
    /// XSPH blend factor in `[0, 1]`.
    pub viscosity: f32,
    pub adhesion_strength: f32,
    /// Kernel support of the adhesion force.
    pub adhesion_radius: f32,
    /// Speed away from the surface that tears an attached particle off.
    /// `0` disables the speed-based release.
    pub detach_threshold: f32,
    pub cohesion_strength: f32,
    pub stack_pressure_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Normal approach speed below which contacts stop bouncing.
    pub min_bounce_speed: f32,
    /// Upper bound on substeps per `simulate` call.
    pub max_substeps_per_call: u32,
    pub world_collision_mode: WorldCollisionMode,
}

impl Default for FluidPreset {
    fn default() -> Self {
        let smoothing_radius = 10.0;
        let particle_radius = 2.5;
        let particle_mass = 1.0;
        let rest_density = KernelCoefficients::precompute(smoothing_radius)
            .lattice_rest_density(particle_radius * 2.0, particle_mass);
        Self {
            smoothing_radius,
            rest_density,
            particle_mass,
            particle_radius,
            gravity: Vec3::new(0.0, 0.0, -980.0),
            simulation_rate: 60.0,
            substeps: 4,
            solver_iterations: 3,
            compliance: 1.0e-7,
            tensile_correction: true,
            tensile_k: 0.001,
            tensile_n: 4,
            tensile_dq: 0.3,
            viscosity: 0.05,
            adhesion_strength: 0.0,
            adhesion_radius: 10.0,
            detach_threshold: 0.0,
            cohesion_strength: 0.0,
            stack_pressure_scale: 0.0,
            friction: 0.1,
            restitution: 0.3,
            min_bounce_speed: 10.0,
            max_substeps_per_call: 16,
            world_collision_mode: WorldCollisionMode::Sweep,
        }
    }
}

impl FluidPreset {
    /// Fixed substep length in seconds.
    pub fn substep_dt(&self) -> f32 {
        1.0 / (self.simulation_rate * self.substeps as f32)
    }

    /// Re-derive `rest_density` from a cubic packing at `spacing`.
    pub fn calibrate_rest_density(&mut self, spacing: f32) {
        self.rest_density = KernelCoefficients::precompute(self.smoothing_radius)
            .lattice_rest_density(spacing, self.particle_mass);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("smoothing_radius", self.smoothing_radius)?;
        positive("rest_density", self.rest_density)?;
        positive("particle_mass", self.particle_mass)?;
        positive("particle_radius", self.particle_radius)?;
        positive("simulation_rate", self.simulation_rate)?;
        if self.substeps == 0 {
            return Err(ConfigError::Zero { field: "substeps" });
        }
        if self.solver_iterations == 0 {
            return Err(ConfigError::Zero {
                field: "solver_iterations",
            });
        }
        if self.max_substeps_per_call == 0 {
            return Err(ConfigError::Zero {
                field: "max_substeps_per_call",
            });
        }
        in_range("compliance", self.compliance, 0.0, f32::MAX)?;
        in_range("viscosity", self.viscosity, 0.0, 1.0)?;
        in_range("friction", self.friction, 0.0, 1.0)?;
        in_range("restitution", self.restitution, 0.0, 1.0)?;
        in_range("tensile_dq", self.tensile_dq, 0.0, 1.0)?;
        in_range("adhesion_radius", self.adhesion_radius, 0.0, f32::MAX)?;
        in_range("detach_threshold", self.detach_threshold, 0.0, f32::MAX)?;
        in_range("min_bounce_speed", self.min_bounce_speed, 0.0, f32::MAX)?;
        if !self.gravity.is_finite() {
            return Err(ConfigError::NotPositive {
                field: "gravity",
                value: f32::NAN,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
