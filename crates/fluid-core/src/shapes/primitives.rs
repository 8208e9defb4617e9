//! Lattice generators for spawn volumes.
//!
//! Every generator walks a cubic lattice of the given `spacing` aligned to the
//! shape's minimum corner and keeps the sites that fall inside the shape, up
//! to a caller-supplied limit.

use glam::Vec3;

/// Lattices finer than this many sites along any axis are refused.
pub const MAX_SITES_PER_AXIS: u32 = 1024;

/// Iterate lattice sites inside the box `[min, max]`, stopping once `limit`
/// sites have been kept.
fn lattice(
    min: Vec3,
    max: Vec3,
    spacing: f32,
    limit: usize,
    mut keep: impl FnMut(Vec3) -> bool,
) -> Vec<Vec3> {
    let mut out = Vec::new();
    if limit == 0 || spacing.is_nan() || spacing <= 0.0 || !(max.cmpge(min).all()) {
        return out;
    }
    let counts = ((max - min) / spacing).floor();
    if !counts.is_finite() || counts.max_element() >= MAX_SITES_PER_AXIS as f32 {
        log::warn!("spawn lattice refused: spacing {spacing} over {} is too fine", max - min);
        return out;
    }
    let (nx, ny, nz) = (counts.x as u32, counts.y as u32, counts.z as u32);
    // Centre the lattice inside the bounds.
    let slack = (max - min - counts * spacing) * 0.5;
    let origin = min + slack;
    'fill: for z in 0..=nz {
        for y in 0..=ny {
            for x in 0..=nx {
                let p = origin + Vec3::new(x as f32, y as f32, z as f32) * spacing;
                if keep(p) {
                    out.push(p);
                    if out.len() == limit {
                        break 'fill;
                    }
                }
            }
        }
    }
    out
}

/// Lattice sites inside a solid sphere.
pub fn lattice_sphere(center: Vec3, radius: f32, spacing: f32, limit: usize) -> Vec<Vec3> {
    let r = Vec3::splat(radius.max(0.0));
    let r_sq = radius * radius;
    lattice(center - r, center + r, spacing, limit, |p| {
        (p - center).length_squared() <= r_sq
    })
}

/// Lattice sites inside an axis-aligned box.
pub fn lattice_box(center: Vec3, half_extents: Vec3, spacing: f32, limit: usize) -> Vec<Vec3> {
    let he = half_extents.abs();
    lattice(center - he, center + he, spacing, limit, |_| true)
}

/// Lattice sites inside an upright cylinder.
pub fn lattice_cylinder(
    center: Vec3,
    radius: f32,
    half_height: f32,
    spacing: f32,
    limit: usize,
) -> Vec<Vec3> {
    let he = Vec3::new(radius, radius, half_height).abs();
    let r_sq = radius * radius;
    lattice(center - he, center + he, spacing, limit, |p| {
        let d = p - center;
        d.x * d.x + d.y * d.y <= r_sq
    })
}
