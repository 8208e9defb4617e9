use std::collections::HashMap;

use glam::Vec3;

use crate::colliders::{ActorId, BoneId};
use crate::particle::ParticleId;

/// A particle hit a surface hard enough to be worth reporting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub particle: ParticleId,
    pub position: Vec3,
    /// Velocity before the collision response.
    pub velocity: Vec3,
    /// Approach speed along the surface normal.
    pub impact_speed: f32,
    pub actor: Option<ActorId>,
    pub bone: Option<BoneId>,
}

/// Rate-limited outbox of collision events.
///
/// The simulation only enqueues; the caller drains and dispatches.
#[derive(Debug, Default)]
pub struct CollisionEventQueue {
    events: Vec<CollisionEvent>,
    /// Simulation time of each particle's last accepted event.
    last_event: HashMap<ParticleId, f32>,
    time: f32,
    budget: u32,
    /// Minimum impact speed for an event.
    pub velocity_threshold: f32,
    /// Seconds a particle must wait between events.
    pub cooldown: f32,
}

impl CollisionEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a frame with a fresh budget and drop expired cooldowns.
    pub fn begin_frame(&mut self, budget: u32, velocity_threshold: f32, cooldown: f32) {
        self.budget = budget;
        self.velocity_threshold = velocity_threshold;
        self.cooldown = cooldown;
        let now = self.time;
        self.last_event.retain(|_, t| now - *t < cooldown);
    }

    /// Advance the queue's clock by one substep.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
    }

    /// Queue `event` if it is fast enough, the frame budget allows it and the
    /// particle is not cooling down. Returns whether it was queued.
    pub fn push(&mut self, event: CollisionEvent) -> bool {
        if self.budget == 0 || event.impact_speed < self.velocity_threshold {
            return false;
        }
        if let Some(&t) = self.last_event.get(&event.particle) {
            if self.time - t < self.cooldown {
                return false;
            }
        }
        self.last_event.insert(event.particle, self.time);
        self.budget -= 1;
        self.events.push(event);
        true
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Hand every queued event to the caller.
    pub fn drain(&mut self) -> impl Iterator<Item = CollisionEvent> + '_ {
        self.events.drain(..)
    }
}
