use glam::Vec3;

use crate::colliders::{ActorId, BoneId};
use crate::shapes::dispatcher::points_for;
use crate::shapes::SpawnShape;

/// Stable particle identity. Never reused, unlike array indices.
pub type ParticleId = u32;

/// Emitter that spawned a particle.
pub type SourceId = u32;

/// Glue between a particle and a collider surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attachment {
    /// Non-owning handle to the surface's actor.
    pub actor: ActorId,
    /// Bone of a skinned collider, `None` for the whole object.
    pub bone: Option<BoneId>,
    /// Position in the attached frame's local space.
    ///
    /// Refreshed every substep and not read by the solver. Renderers and game
    /// code use it to carry attached fluid along with an animated surface.
    pub local_offset: Vec3,
    pub surface_normal: Vec3,
}

/// One simulated fluid particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Position at the end of the previous substep.
    pub position: Vec3,
    /// Tentative position while constraints are solved.
    pub predicted: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
    // Transient solver state, rebuilt every substep.
    pub density: f32,
    pub lambda: f32,
    /// Indices into the same particle slice, rebuilt every substep.
    /// May contain the particle itself.
    pub neighbors: Vec<u32>,
    pub attachment: Option<Attachment>,
    /// Set for the substep after a release to block immediate re-attachment.
    pub just_detached: bool,
    pub near_ground: bool,
    /// Within a contact margin of the simulation volume walls. Shrinks the
    /// adhesion maintain margin like `near_ground`.
    pub near_boundary: bool,
    pub id: ParticleId,
    pub source: SourceId,
}

impl Particle {
    pub fn new(id: ParticleId, position: Vec3, velocity: Vec3, mass: f32) -> Self {
        Self {
            position,
            predicted: position,
            velocity,
            mass,
            density: 0.0,
            lambda: 0.0,
            neighbors: Vec::new(),
            attachment: None,
            just_detached: false,
            near_ground: false,
            near_boundary: false,
            id,
            source: 0,
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    #[inline]
    pub fn attached_actor(&self) -> Option<ActorId> {
        self.attachment.map(|a| a.actor)
    }
}

/// Owning particle array plus the spawn/despawn surface.
///
/// Removal compacts the array in order, so indices shift but ids never do.
pub struct ParticleSet {
    particles: Vec<Particle>,
    max_particles: usize,
    /// Optional cap on live particles per source.
    pub max_per_source: Option<usize>,
    /// Mass given to newly spawned particles.
    pub particle_mass: f32,
    next_id: ParticleId,
}

impl ParticleSet {
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::new(),
            max_particles,
            max_per_source: None,
            particle_mass: 1.0,
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn count_for_source(&self, source: SourceId) -> usize {
        self.particles.iter().filter(|p| p.source == source).count()
    }

    fn remaining_for(&self, source: SourceId) -> usize {
        let global = self.max_particles.saturating_sub(self.particles.len());
        match self.max_per_source {
            Some(quota) => global.min(quota.saturating_sub(self.count_for_source(source))),
            None => global,
        }
    }

    fn push(&mut self, source: SourceId, position: Vec3, velocity: Vec3) -> usize {
        let mut p = Particle::new(self.next_id, position, velocity, self.particle_mass);
        p.source = source;
        self.next_id = self.next_id.wrapping_add(1);
        self.particles.push(p);
        self.particles.len() - 1
    }

    /// Spawn one particle from the default source. Returns its index, or
    /// `None` when the set is full.
    pub fn spawn_particle(&mut self, position: Vec3, velocity: Vec3) -> Option<usize> {
        self.spawn_particle_from(0, position, velocity)
    }

    pub fn spawn_particle_from(
        &mut self,
        source: SourceId,
        position: Vec3,
        velocity: Vec3,
    ) -> Option<usize> {
        if self.remaining_for(source) == 0 {
            log::debug!("spawn rejected: source {source} at capacity");
            return None;
        }
        Some(self.push(source, position, velocity))
    }

    /// Fill `shape` with a lattice of the given spacing. Returns how many
    /// particles were actually spawned (capacity may truncate the fill).
    pub fn spawn_particles_in_shape(
        &mut self,
        shape: &SpawnShape,
        spacing: f32,
        velocity: Vec3,
        source: SourceId,
    ) -> usize {
        let budget = self.remaining_for(source);
        let points = points_for(shape, spacing, budget);
        let spawned = points.len();
        if spawned == budget {
            log::debug!("spawn stopped at the remaining budget of {budget} for source {source}");
        }
        for p in points {
            self.push(source, p, velocity);
        }
        spawned
    }

    /// Remove every particle within `radius` of `center`. Returns the count.
    pub fn remove_particles_in_radius(&mut self, center: Vec3, radius: f32) -> usize {
        let r_sq = radius * radius;
        self.retain(|p| (p.position - center).length_squared() > r_sq)
    }

    pub fn remove_particles_from_source(&mut self, source: SourceId) -> usize {
        self.retain(|p| p.source != source)
    }

    pub fn clear_all_particles(&mut self) {
        self.particles.clear();
    }

    fn retain(&mut self, keep: impl FnMut(&Particle) -> bool) -> usize {
        let before = self.particles.len();
        self.particles.retain(keep);
        // Neighbor lists hold indices that compaction just invalidated.
        for p in &mut self.particles {
            p.neighbors.clear();
        }
        before - self.particles.len()
    }
}
