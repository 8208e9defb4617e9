use bytemuck::{Pod, Zeroable};

use crate::particle::Particle;

/// Read-only per-particle record handed to the renderer.
///
/// 32 bytes, laid out to match a WGSL `struct { vec3f, f32, vec3f, u32 }`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderParticle {
    pub position: [f32; 3],
    pub radius: f32,
    pub velocity: [f32; 3],
    /// `1` while attached to a surface, `0` otherwise.
    pub attached: u32,
}

impl RenderParticle {
    pub fn from_particle(p: &Particle, radius: f32) -> Self {
        Self {
            position: p.position.to_array(),
            radius,
            velocity: p.velocity.to_array(),
            attached: u32::from(p.is_attached()),
        }
    }
}

/// Overwrite `out` with one record per particle, resizing it to fit.
pub fn write_snapshot(particles: &[Particle], radius: f32, out: &mut Vec<RenderParticle>) {
    out.clear();
    out.extend(particles.iter().map(|p| RenderParticle::from_particle(p, radius)));
}

/// Raw bytes of a snapshot, ready for a GPU upload.
pub fn as_bytes(snapshot: &[RenderParticle]) -> &[u8] {
    bytemuck::cast_slice(snapshot)
}
