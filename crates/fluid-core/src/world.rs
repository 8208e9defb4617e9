//! World geometry collision.
//!
//! World queries are injected through [`WorldQuery`]; the solver never reaches
//! for global scene state. Two modes are supported: a sphere sweep from the
//! previous to the predicted position, or a signed-distance sample at the
//! predicted position (heightfields, SDF volumes). Both feed the same
//! restitution/friction response as explicit colliders.

use glam::{Vec2, Vec3};

use crate::colliders::ActorId;
use crate::config::WorldCollisionMode;
use crate::constraints::contact::{report_impact, resolve_contact, ContactResponse};
use crate::events::CollisionEventQueue;
use crate::math::try_normalize;
use crate::particle::Particle;

/// Surfaces whose normal points at least this far up count as ground.
const GROUND_NORMAL_Z: f32 = 0.7;

/// Distance (beyond the contact margin) within which the ground hint is set.
const NEAR_GROUND_DISTANCE: f32 = 5.0;

/// Refinement steps when bisecting a sweep hit.
const SWEEP_BISECTION_STEPS: u32 = 10;

/// First contact along a sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    /// Fraction of the sweep in `[0, 1]` where the sphere first touches.
    pub time: f32,
    pub normal: Vec3,
    pub actor: Option<ActorId>,
}

/// Signed distance from world geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceSample {
    pub distance: f32,
    pub normal: Vec3,
    pub actor: Option<ActorId>,
}

/// World-geometry capability passed in by the caller.
pub trait WorldQuery: Send + Sync {
    /// Sweep a sphere of `radius` from `start` to `end`.
    fn sweep_sphere(&self, start: Vec3, end: Vec3, radius: f32) -> Option<SweepHit>;

    /// Signed distance of `position` from the surface, `None` outside the
    /// queried domain.
    fn sample_distance(&self, position: Vec3) -> Option<DistanceSample>;
}

/// Sweep by stepping `sample_distance` along the path and bisecting the first
/// crossing. Shared by the sampled world types.
fn sweep_by_sampling<W: WorldQuery + ?Sized>(
    world: &W,
    start: Vec3,
    end: Vec3,
    radius: f32,
    step: f32,
) -> Option<SweepHit> {
    let touching = |p: Vec3| world.sample_distance(p).filter(|s| s.distance < radius);
    if let Some(s) = touching(start) {
        return Some(SweepHit {
            time: 0.0,
            normal: s.normal,
            actor: s.actor,
        });
    }
    let length = (end - start).length();
    let steps = ((length / step.max(1e-3)).ceil() as u32).max(1);
    let mut free_t = 0.0_f32;
    for k in 1..=steps {
        let t = k as f32 / steps as f32;
        if touching(start.lerp(end, t)).is_none() {
            free_t = t;
            continue;
        }
        let (mut lo, mut hi) = (free_t, t);
        for _ in 0..SWEEP_BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if touching(start.lerp(end, mid)).is_some() {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let sample = touching(start.lerp(end, hi))?;
        return Some(SweepHit {
            time: lo,
            normal: sample.normal,
            actor: sample.actor,
        });
    }
    None
}

/// Flat ground at a fixed height, normal +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
    pub actor: Option<ActorId>,
}

impl WorldQuery for GroundPlane {
    fn sweep_sphere(&self, start: Vec3, end: Vec3, radius: f32) -> Option<SweepHit> {
        let d0 = start.z - self.height - radius;
        let d1 = end.z - self.height - radius;
        if d0 < 0.0 {
            return Some(SweepHit {
                time: 0.0,
                normal: Vec3::Z,
                actor: self.actor,
            });
        }
        if d1 >= 0.0 {
            return None;
        }
        Some(SweepHit {
            time: d0 / (d0 - d1),
            normal: Vec3::Z,
            actor: self.actor,
        })
    }

    fn sample_distance(&self, position: Vec3) -> Option<DistanceSample> {
        Some(DistanceSample {
            distance: position.z - self.height,
            normal: Vec3::Z,
            actor: self.actor,
        })
    }
}

/// Regular grid of terrain heights (landscape collision).
///
/// Heights are stored row-major, `x` fastest, sampled bilinearly and clamped
/// at the borders.
#[derive(Clone, Debug)]
pub struct Heightfield {
    /// World XY of sample `(0, 0)`.
    pub origin: Vec2,
    pub cell_size: f32,
    pub width: usize,
    pub depth: usize,
    pub heights: Vec<f32>,
    pub actor: Option<ActorId>,
}

impl Heightfield {
    /// Returns `None` when `heights` does not match `width * depth`.
    pub fn new(
        origin: Vec2,
        cell_size: f32,
        width: usize,
        depth: usize,
        heights: Vec<f32>,
    ) -> Option<Self> {
        if width < 2 || depth < 2 || heights.len() != width * depth || cell_size <= 0.0 {
            return None;
        }
        Some(Self {
            origin,
            cell_size,
            width,
            depth,
            heights,
            actor: None,
        })
    }

    /// Build from a height function evaluated at every sample.
    pub fn from_fn(
        origin: Vec2,
        cell_size: f32,
        width: usize,
        depth: usize,
        f: impl Fn(f32, f32) -> f32,
    ) -> Option<Self> {
        let mut heights = Vec::with_capacity(width * depth);
        for j in 0..depth {
            for i in 0..width {
                heights.push(f(
                    origin.x + i as f32 * cell_size,
                    origin.y + j as f32 * cell_size,
                ));
            }
        }
        Self::new(origin, cell_size, width, depth, heights)
    }

    fn at(&self, i: usize, j: usize) -> f32 {
        self.heights[j.min(self.depth - 1) * self.width + i.min(self.width - 1)]
    }

    /// Bilinear height at world `(x, y)`.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        let max = Vec2::new((self.width - 1) as f32, (self.depth - 1) as f32);
        let g = ((Vec2::new(x, y) - self.origin) / self.cell_size).clamp(Vec2::ZERO, max);
        let i = (g.x.floor() as usize).min(self.width - 2);
        let j = (g.y.floor() as usize).min(self.depth - 2);
        let fx = g.x - i as f32;
        let fy = g.y - j as f32;
        let h0 = self.at(i, j) + (self.at(i + 1, j) - self.at(i, j)) * fx;
        let h1 = self.at(i, j + 1) + (self.at(i + 1, j + 1) - self.at(i, j + 1)) * fx;
        h0 + (h1 - h0) * fy
    }

    /// Surface normal from central differences.
    pub fn normal_at(&self, x: f32, y: f32) -> Vec3 {
        let e = self.cell_size * 0.5;
        let dx = (self.height_at(x + e, y) - self.height_at(x - e, y)) / (2.0 * e);
        let dy = (self.height_at(x, y + e) - self.height_at(x, y - e)) / (2.0 * e);
        try_normalize(Vec3::new(-dx, -dy, 1.0)).unwrap_or(Vec3::Z)
    }

    fn contains_xy(&self, x: f32, y: f32) -> bool {
        let extent = Vec2::new((self.width - 1) as f32, (self.depth - 1) as f32) * self.cell_size;
        let local = Vec2::new(x, y) - self.origin;
        local.cmpge(Vec2::ZERO).all() && local.cmple(extent).all()
    }
}

impl WorldQuery for Heightfield {
    fn sweep_sphere(&self, start: Vec3, end: Vec3, radius: f32) -> Option<SweepHit> {
        sweep_by_sampling(self, start, end, radius, self.cell_size * 0.5)
    }

    fn sample_distance(&self, position: Vec3) -> Option<DistanceSample> {
        if !self.contains_xy(position.x, position.y) {
            return None;
        }
        let normal = self.normal_at(position.x, position.y);
        // Vertical gap projected onto the normal; exact on planar patches.
        let distance = (position.z - self.height_at(position.x, position.y)) * normal.z;
        Some(DistanceSample {
            distance,
            normal,
            actor: self.actor,
        })
    }
}

/// Axis-aligned box the fluid must stay inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeBoundary {
    pub min: Vec3,
    pub max: Vec3,
}

impl VolumeBoundary {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Deepest wall penetration of a sphere at `position`, as
    /// `(inward normal, depth)`, plus whether any wall is within `near`.
    fn deepest_wall(&self, position: Vec3, margin: f32, near: f32) -> (Option<(Vec3, f32)>, bool) {
        let mut deepest: Option<(Vec3, f32)> = None;
        let mut is_near = false;
        for axis in 0..3 {
            let mut normal = Vec3::ZERO;
            let below = self.min[axis] + margin - position[axis];
            let above = position[axis] - (self.max[axis] - margin);
            for (depth, sign) in [(below, 1.0), (above, -1.0)] {
                if depth > -near {
                    is_near = true;
                }
                if depth > 0.0 && deepest.map_or(true, |(_, d)| depth > d) {
                    normal[axis] = sign;
                    deepest = Some((normal, depth));
                }
            }
        }
        (deepest, is_near)
    }
}

/// Everything world collision needs for one substep.
pub struct WorldCollision<'a> {
    pub world: Option<&'a dyn WorldQuery>,
    pub mode: WorldCollisionMode,
    pub volume: Option<&'a VolumeBoundary>,
}

/// Resolve predicted positions against world geometry and the volume
/// boundary, and refresh the `near_ground` / `near_boundary` hints.
pub fn handle_world_collision(
    particles: &mut [Particle],
    collision: &WorldCollision<'_>,
    response: &ContactResponse,
    dt: f32,
    events: &mut CollisionEventQueue,
) {
    if dt <= 0.0 {
        return;
    }
    for p in particles.iter_mut() {
        p.near_ground = false;
        p.near_boundary = false;

        if let Some(world) = collision.world {
            resolve_world(p, world, collision.mode, response, dt, events);
        }

        if let Some(volume) = collision.volume {
            // Up to one pass per axis so corners resolve fully.
            for _ in 0..3 {
                let (deepest, near) =
                    volume.deepest_wall(p.predicted, response.margin, NEAR_GROUND_DISTANCE);
                p.near_boundary |= near;
                let Some((normal, depth)) = deepest else {
                    break;
                };
                let (incoming, speed) = resolve_contact(p, normal, depth, response, dt);
                report_impact(events, p, incoming, speed, None, None);
            }
        }
    }
}

fn resolve_world(
    p: &mut Particle,
    world: &dyn WorldQuery,
    mode: WorldCollisionMode,
    response: &ContactResponse,
    dt: f32,
    events: &mut CollisionEventQueue,
) {
    let margin = response.margin;
    match mode {
        WorldCollisionMode::Sweep => {
            if let Some(hit) = world.sweep_sphere(p.position, p.predicted, margin) {
                let contact = p.position.lerp(p.predicted, hit.time);
                // Depth past the contact point along the normal.
                let depth = (contact - p.predicted).dot(hit.normal).max(0.0);
                let (incoming, speed) = resolve_contact(p, hit.normal, depth, response, dt);
                report_impact(events, p, incoming, speed, hit.actor, None);
            }
            // A sweep starting inside the margin stops at its start point;
            // finish pushing out along the sampled normal.
            if let Some(sample) = world.sample_distance(p.predicted) {
                if sample.distance < margin {
                    resolve_contact(p, sample.normal, margin - sample.distance, response, dt);
                }
            }
        }
        WorldCollisionMode::Distance => {
            if let Some(sample) = world.sample_distance(p.predicted) {
                if sample.distance < margin {
                    let (incoming, speed) =
                        resolve_contact(p, sample.normal, margin - sample.distance, response, dt);
                    report_impact(events, p, incoming, speed, sample.actor, None);
                }
            }
        }
    }

    if let Some(sample) = world.sample_distance(p.predicted) {
        p.near_ground =
            sample.normal.z >= GROUND_NORMAL_Z && sample.distance < margin + NEAR_GROUND_DISTANCE;
    }
}
