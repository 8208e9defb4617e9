//! Position-based fluid simulation (PBF with XPBD compliance) on the CPU.
//!
//! Lengths are centimeters, times are seconds. The caller owns the particle
//! array, the spatial hash and the time accumulator; [`solver::SimulationContext`]
//! advances them in fixed substeps.

pub mod colliders;
pub mod config;
pub mod constraints;
pub mod events;
pub mod fluids;
pub mod grid;
pub mod materials;
pub mod math;
mod parallel;
pub mod particle;
pub mod shapes;
pub mod snapshot;
pub mod solver;
pub mod world;

pub use colliders::{ActorId, Collider};
pub use config::{ConfigError, FluidPreset};
pub use grid::SpatialHash;
pub use particle::{Particle, ParticleSet};
pub use solver::{SimulationContext, SimulationParams, StepStats};
