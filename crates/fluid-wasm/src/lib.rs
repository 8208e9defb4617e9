use fluid_core::colliders::{ActorId, BoxCollider, Collider, PlaneCollider, SphereCollider};
use fluid_core::materials::MaterialPreset;
use fluid_core::shapes::SpawnShape;
use fluid_core::snapshot::{write_snapshot, RenderParticle};
use fluid_core::world::{GroundPlane, VolumeBoundary, WorldQuery};
use fluid_core::{FluidPreset, ParticleSet, SimulationContext, SimulationParams, SpatialHash};
use glam::Vec3;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct FluidWorld {
    particles: ParticleSet,
    preset: FluidPreset,
    context: SimulationContext,
    hash: SpatialHash,
    accumulated: f32,
    colliders: Vec<Box<dyn Collider>>,
    next_actor: u32,
    ground: Option<GroundPlane>,
    bounds: Option<VolumeBoundary>,
    events_last_step: usize,
    gpu_buffer: Vec<RenderParticle>,
}

#[wasm_bindgen]
impl FluidWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(max_particles: usize) -> FluidWorld {
        web_sys::console::log_1(
            &format!("WASM FluidWorld created: capacity {max_particles}").into(),
        );

        let preset = FluidPreset::default();
        let mut particles = ParticleSet::new(max_particles);
        particles.particle_mass = preset.particle_mass;

        FluidWorld {
            particles,
            hash: SpatialHash::new(preset.smoothing_radius),
            preset,
            context: SimulationContext::new(),
            accumulated: 0.0,
            colliders: Vec::new(),
            next_actor: 0,
            ground: None,
            bounds: None,
            events_last_step: 0,
            gpu_buffer: Vec::with_capacity(max_particles),
        }
    }

    /// Advance by `dt` seconds. Returns the wall time spent, in milliseconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f32) -> f32 {
        let start = js_sys::Date::now();

        let params = simulation_params(&self.colliders, self.ground.as_ref(), self.bounds);
        self.context.simulate(
            self.particles.particles_mut(),
            &self.preset,
            &params,
            &mut self.hash,
            dt,
            &mut self.accumulated,
        );
        self.events_last_step = self.context.drain_events().count();

        self.write_gpu_output();
        (js_sys::Date::now() - start) as f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_ptr(&self) -> *const f32 {
        self.gpu_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_byte_length(&self) -> usize {
        bytemuck::cast_slice::<RenderParticle, u8>(&self.gpu_buffer).len()
    }

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    #[wasm_bindgen]
    pub fn events_last_step(&self) -> usize {
        self.events_last_step
    }

    #[wasm_bindgen]
    pub fn spawn_particle(&mut self, x: f32, y: f32, z: f32, vx: f32, vy: f32, vz: f32) -> i32 {
        let index = self
            .particles
            .spawn_particle(Vec3::new(x, y, z), Vec3::new(vx, vy, vz))
            .map_or(-1, |i| i as i32);
        self.write_gpu_output();
        index
    }

    /// Fill a sphere with a lattice at the rest spacing, then pre-settle it.
    #[wasm_bindgen]
    pub fn spawn_sphere(&mut self, x: f32, y: f32, z: f32, radius: f32, source: u32) -> usize {
        let shape = SpawnShape::Sphere {
            center: Vec3::new(x, y, z),
            radius,
        };
        self.spawn_shape(&shape, source)
    }

    #[wasm_bindgen]
    pub fn spawn_box(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        hx: f32,
        hy: f32,
        hz: f32,
        source: u32,
    ) -> usize {
        let shape = SpawnShape::Box {
            center: Vec3::new(x, y, z),
            half_extents: Vec3::new(hx, hy, hz),
        };
        self.spawn_shape(&shape, source)
    }

    #[wasm_bindgen]
    pub fn remove_particles_in_radius(&mut self, x: f32, y: f32, z: f32, radius: f32) -> usize {
        let removed = self.particles.remove_particles_in_radius(Vec3::new(x, y, z), radius);
        self.write_gpu_output();
        removed
    }

    #[wasm_bindgen]
    pub fn remove_particles_from_source(&mut self, source: u32) -> usize {
        let removed = self.particles.remove_particles_from_source(source);
        self.write_gpu_output();
        removed
    }

    #[wasm_bindgen]
    pub fn clear_all_particles(&mut self) {
        self.particles.clear_all_particles();
        self.write_gpu_output();
    }

    /// 0 water, 1 honey, 2 slime, 3 blood.
    #[wasm_bindgen]
    pub fn set_material(&mut self, material: u32) {
        let material = match material {
            1 => MaterialPreset::HONEY,
            2 => MaterialPreset::SLIME,
            3 => MaterialPreset::BLOOD,
            _ => MaterialPreset::WATER,
        };
        material.apply_to(&mut self.preset);
    }

    #[wasm_bindgen]
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.preset.gravity = Vec3::new(x, y, z);
    }

    #[wasm_bindgen]
    pub fn set_solver_config(&mut self, substeps: u32, solver_iterations: u32) {
        self.preset.substeps = substeps;
        self.preset.solver_iterations = solver_iterations;
    }

    #[wasm_bindgen]
    pub fn set_ground(&mut self, enabled: bool, height: f32) {
        self.ground = enabled.then_some(GroundPlane { height, actor: None });
    }

    #[wasm_bindgen]
    pub fn set_bounds(
        &mut self,
        min_x: f32,
        min_y: f32,
        min_z: f32,
        max_x: f32,
        max_y: f32,
        max_z: f32,
    ) {
        self.bounds = Some(VolumeBoundary::new(
            Vec3::new(min_x, min_y, min_z),
            Vec3::new(max_x, max_y, max_z),
        ));
    }

    #[wasm_bindgen]
    pub fn add_sphere_collider(&mut self, x: f32, y: f32, z: f32, radius: f32) -> u32 {
        let actor = self.next_actor_id();
        self.colliders
            .push(Box::new(SphereCollider::new(actor, Vec3::new(x, y, z), radius)));
        actor.index
    }

    #[wasm_bindgen]
    pub fn add_box_collider(&mut self, x: f32, y: f32, z: f32, hx: f32, hy: f32, hz: f32) -> u32 {
        let actor = self.next_actor_id();
        self.colliders.push(Box::new(BoxCollider::axis_aligned(
            actor,
            Vec3::new(x, y, z),
            Vec3::new(hx, hy, hz),
        )));
        actor.index
    }

    #[wasm_bindgen]
    pub fn add_wall(&mut self, x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> u32 {
        let actor = self.next_actor_id();
        self.colliders.push(Box::new(PlaneCollider::new(
            actor,
            Vec3::new(x, y, z),
            Vec3::new(nx, ny, nz),
        )));
        actor.index
    }

    /// Removing a collider leaves attached particles with a stale handle,
    /// which the solver treats as detached.
    #[wasm_bindgen]
    pub fn remove_collider(&mut self, index: u32) {
        self.colliders.retain(|c| c.actor().index != index);
    }
}

impl FluidWorld {
    fn next_actor_id(&mut self) -> ActorId {
        let actor = ActorId::new(self.next_actor, 0);
        self.next_actor += 1;
        actor
    }

    fn spawn_shape(&mut self, shape: &SpawnShape, source: u32) -> usize {
        let spacing = self.preset.particle_radius * 2.0;
        let before = self.particles.len();
        let spawned = self
            .particles
            .spawn_particles_in_shape(shape, spacing, Vec3::ZERO, source);
        if spawned > 0 {
            let params = simulation_params(&self.colliders, self.ground.as_ref(), self.bounds);
            // Only the new particles settle; the rest keep their motion.
            self.context.run_initialization_simulation(
                &mut self.particles.particles_mut()[before..],
                &self.preset,
                &params,
                &mut self.hash,
                4,
            );
            // Settling may have produced impacts nobody listens for.
            self.context.drain_events().for_each(drop);
        }
        web_sys::console::log_1(
            &format!("spawned {spawned} particles ({before} -> {})", self.particles.len()).into(),
        );
        self.write_gpu_output();
        spawned
    }

    fn write_gpu_output(&mut self) {
        write_snapshot(
            self.particles.particles(),
            self.preset.particle_radius,
            &mut self.gpu_buffer,
        );
    }
}

/// Scene borrowed for one solver call. Stepping and spawn pre-settling see the
/// same colliders, ground and bounds.
fn simulation_params<'a>(
    colliders: &'a [Box<dyn Collider>],
    ground: Option<&'a GroundPlane>,
    volume: Option<VolumeBoundary>,
) -> SimulationParams<'a> {
    SimulationParams {
        colliders: colliders.iter().map(|c| c.as_ref()).collect(),
        world_collision: ground.is_some(),
        world: ground.map(|g| g as &dyn WorldQuery),
        volume,
        ..SimulationParams::default()
    }
}
