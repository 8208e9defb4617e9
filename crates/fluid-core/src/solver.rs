use glam::Vec3;

use crate::colliders::Collider;
use crate::config::{ConfigError, FluidPreset};
use crate::constraints::contact::{handle_collisions, ContactResponse};
use crate::constraints::density::DensityConstraint;
use crate::events::{CollisionEvent, CollisionEventQueue};
use crate::fluids::adhesion::AdhesionSolver;
use crate::fluids::stack_pressure::StackPressureSolver;
use crate::fluids::viscosity::ViscositySolver;
use crate::fluids::KernelCoefficients;
use crate::grid::SpatialHash;
use crate::parallel::{for_each_mut, map_indices};
use crate::particle::Particle;
use crate::world::{handle_world_collision, VolumeBoundary, WorldCollision, WorldQuery};

/// Accumulated time within this fraction of a substep still runs the substep,
/// so `dt == substep_dt` never loses a tick to rounding.
const ACCUMULATOR_TOLERANCE: f32 = 1.0e-4;

/// Per-call inputs, built fresh by the caller every frame.
pub struct SimulationParams<'a> {
    /// Extra acceleration on top of gravity, cm/s².
    pub external_force: Vec3,
    /// Explicit colliders, including skinned ones for bone attachment.
    pub colliders: Vec<&'a dyn Collider>,
    pub world_collision: bool,
    pub world: Option<&'a dyn WorldQuery>,
    pub volume: Option<VolumeBoundary>,
    /// Minimum impact speed that produces a collision event.
    pub event_velocity_threshold: f32,
    pub max_events_per_frame: u32,
    /// Seconds between two events of the same particle.
    pub event_cooldown: f32,
}

impl Default for SimulationParams<'_> {
    fn default() -> Self {
        Self {
            external_force: Vec3::ZERO,
            colliders: Vec::new(),
            world_collision: false,
            world: None,
            volume: None,
            event_velocity_threshold: 100.0,
            max_events_per_frame: 32,
            event_cooldown: 0.25,
        }
    }
}

/// What one `simulate` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    pub substeps: u32,
    pub particle_count: usize,
    pub attached_count: usize,
    pub events_queued: usize,
    /// Largest positive density constraint value of the last substep.
    pub max_density_error: f32,
}

/// Solver-local state for one fluid domain.
///
/// The particle array, the spatial hash and the time accumulator belong to
/// the caller and are passed into every call.
pub struct SimulationContext {
    density: DensityConstraint,
    kernels: KernelCoefficients,
    events: CollisionEventQueue,
    /// Preset last pushed into the solver; `None` until one validates.
    applied: Option<FluidPreset>,
    positions: Vec<Vec3>,
    elapsed: f32,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationContext {
    pub fn new() -> Self {
        let preset = FluidPreset::default();
        Self {
            density: DensityConstraint::from_preset(&preset),
            kernels: KernelCoefficients::precompute(preset.smoothing_radius),
            events: CollisionEventQueue::new(),
            applied: None,
            positions: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// Validate `preset` and push it into the solver-local state.
    ///
    /// On error the previous configuration stays in place.
    pub fn apply_preset(&mut self, preset: &FluidPreset) -> Result<(), ConfigError> {
        preset.validate()?;
        self.density.configure(preset);
        self.kernels = KernelCoefficients::precompute(preset.smoothing_radius);
        self.applied = Some(preset.clone());
        log::debug!(
            "fluid preset applied: h={} rho0={} dt={}",
            preset.smoothing_radius,
            preset.rest_density,
            preset.substep_dt()
        );
        Ok(())
    }

    /// Re-apply only when the preset changed, so solver-local overrides made
    /// through [`density_solver_mut`](Self::density_solver_mut) survive.
    fn sync_preset(&mut self, preset: &FluidPreset) -> Result<(), ConfigError> {
        if self.applied.as_ref() == Some(preset) {
            return Ok(());
        }
        self.apply_preset(preset)
    }

    pub fn density_solver(&self) -> &DensityConstraint {
        &self.density
    }

    pub fn density_solver_mut(&mut self) -> &mut DensityConstraint {
        &mut self.density
    }

    pub fn kernels(&self) -> &KernelCoefficients {
        &self.kernels
    }

    /// Simulated seconds so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn events(&self) -> &[CollisionEvent] {
        self.events.events()
    }

    /// Hand queued collision events to the caller.
    pub fn drain_events(&mut self) -> impl Iterator<Item = CollisionEvent> + '_ {
        self.events.drain()
    }

    /// Advance the simulation by `dt` seconds of wall time.
    ///
    /// `dt` is added to `accumulated`; fixed substeps run while a full one is
    /// owed and the remainder carries to the next call. At most
    /// `max_substeps_per_call` substeps run per call; time still owed at the
    /// cap carries over too, up to one more call's worth, and the rest is
    /// dropped.
    /// An invalid preset, no particles or `dt <= 0` leave everything untouched.
    pub fn simulate(
        &mut self,
        particles: &mut [Particle],
        preset: &FluidPreset,
        params: &SimulationParams<'_>,
        hash: &mut SpatialHash,
        dt: f32,
        accumulated: &mut f32,
    ) -> StepStats {
        if particles.is_empty() || dt <= 0.0 || !dt.is_finite() {
            return StepStats::default();
        }
        if let Err(err) = self.sync_preset(preset) {
            log::warn!("simulate skipped: {err}");
            return StepStats::default();
        }

        let substep_dt = preset.substep_dt();
        let tolerance = substep_dt * ACCUMULATOR_TOLERANCE;
        *accumulated += dt;
        self.begin_frame(params, hash, preset);

        let mut stats = StepStats {
            particle_count: particles.len(),
            ..StepStats::default()
        };
        while *accumulated + tolerance >= substep_dt
            && stats.substeps < preset.max_substeps_per_call
        {
            stats.max_density_error =
                self.simulate_substep(particles, preset, params, hash, substep_dt);
            *accumulated -= substep_dt;
            stats.substeps += 1;
        }

        // Owed time past the cap carries over, up to one capped call's worth.
        let backlog = preset.max_substeps_per_call as f32 * substep_dt;
        if *accumulated > backlog {
            log::debug!(
                "substep backlog over {} substeps, dropping {:.4}s",
                preset.max_substeps_per_call,
                *accumulated - backlog
            );
            *accumulated = backlog;
        }
        *accumulated = accumulated.max(0.0);

        self.finish_stats(particles, &mut stats);
        stats
    }

    /// Settle freshly spawned particles by running `substeps` fixed substeps
    /// right away, then zeroing their velocities so they start at rest.
    pub fn run_initialization_simulation(
        &mut self,
        particles: &mut [Particle],
        preset: &FluidPreset,
        params: &SimulationParams<'_>,
        hash: &mut SpatialHash,
        substeps: u32,
    ) -> StepStats {
        if particles.is_empty() || substeps == 0 {
            return StepStats::default();
        }
        if let Err(err) = self.sync_preset(preset) {
            log::warn!("initialization skipped: {err}");
            return StepStats::default();
        }

        self.begin_frame(params, hash, preset);
        let substep_dt = preset.substep_dt();
        let mut stats = StepStats {
            particle_count: particles.len(),
            ..StepStats::default()
        };
        for _ in 0..substeps {
            stats.max_density_error =
                self.simulate_substep(particles, preset, params, hash, substep_dt);
            stats.substeps += 1;
        }
        for_each_mut(particles, |p| p.velocity = Vec3::ZERO);

        self.finish_stats(particles, &mut stats);
        stats
    }

    fn begin_frame(
        &mut self,
        params: &SimulationParams<'_>,
        hash: &mut SpatialHash,
        preset: &FluidPreset,
    ) {
        self.events.begin_frame(
            params.max_events_per_frame,
            params.event_velocity_threshold,
            params.event_cooldown,
        );
        hash.set_cell_size(preset.smoothing_radius);
    }

    fn finish_stats(&self, particles: &[Particle], stats: &mut StepStats) {
        stats.attached_count = particles.iter().filter(|p| p.is_attached()).count();
        stats.events_queued = self.events.len();
        log::trace!(
            "frame: {} substeps, {} particles, {} attached, {} events, C_max={:.5}",
            stats.substeps,
            stats.particle_count,
            stats.attached_count,
            stats.events_queued,
            stats.max_density_error
        );
    }

    /// One fixed substep. Returns the density violation of the last iteration.
    fn simulate_substep(
        &mut self,
        particles: &mut [Particle],
        preset: &FluidPreset,
        params: &SimulationParams<'_>,
        hash: &mut SpatialHash,
        dt: f32,
    ) -> f32 {
        // STEP 1: integrate gravity and external force, predict positions
        let acceleration = preset.gravity + params.external_force;
        for_each_mut(particles, |p| {
            p.velocity += acceleration * dt;
            p.predicted = p.position + p.velocity * dt;
        });

        // STEP 2: neighbor lists from the predicted positions
        self.update_neighbors(particles, hash, preset.smoothing_radius);

        // STEP 3: XPBD density constraint
        let violation = self.density.solve(particles, dt, preset.solver_iterations);

        // STEP 4: collisions, explicit colliders then world and volume
        let response = ContactResponse::from_preset(preset);
        handle_collisions(particles, &params.colliders, &response, dt, &mut self.events);
        let world = WorldCollision {
            world: params.world.filter(|_| params.world_collision),
            mode: preset.world_collision_mode,
            volume: params.volume.as_ref(),
        };
        handle_world_collision(particles, &world, &response, dt, &mut self.events);

        // STEP 5: velocity from displacement, commit positions
        let inv_dt = 1.0 / dt;
        for_each_mut(particles, |p| {
            p.velocity = (p.predicted - p.position) * inv_dt;
            p.position = p.predicted;
        });

        // STEP 6: velocity-level passes
        ViscositySolver::apply_xsph(particles, preset.viscosity, &self.kernels);
        AdhesionSolver::apply(
            particles,
            &params.colliders,
            preset.adhesion_strength,
            preset.adhesion_radius,
            preset.detach_threshold,
            preset.particle_radius,
        );
        AdhesionSolver::apply_cohesion(
            particles,
            preset.cohesion_strength,
            preset.smoothing_radius,
        );
        if preset.stack_pressure_scale != 0.0 && particles.iter().any(Particle::is_attached) {
            StackPressureSolver::apply(
                particles,
                preset.gravity,
                preset.stack_pressure_scale,
                &self.kernels,
                dt,
            );
        }

        self.events.advance(dt);
        self.elapsed += dt;
        violation
    }

    /// Rebuild the hash from predicted positions and refill every
    /// particle's neighbor list (self included).
    fn update_neighbors(
        &mut self,
        particles: &mut [Particle],
        hash: &mut SpatialHash,
        radius: f32,
    ) {
        self.positions.clear();
        self.positions.extend(particles.iter().map(|p| p.predicted));
        hash.build_from_positions(&self.positions);

        let hash: &SpatialHash = hash;
        let positions = &self.positions;
        let lists = map_indices(positions.len(), |i| {
            let mut out = Vec::new();
            hash.get_neighbors(positions[i], radius, &mut out);
            out
        });
        for (p, list) in particles.iter_mut().zip(lists) {
            p.neighbors = list;
        }
    }
}
