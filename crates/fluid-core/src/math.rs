use glam::Vec3;

/// Squared length below which a vector is treated as degenerate.
pub const DEGENERATE_LENGTH_SQ: f32 = 1.0e-12;

/// Split `v` into the component along the unit `normal` and the remainder.
///
/// Returns `(normal_speed, tangential)` where `normal_speed = v · normal`.
#[inline]
pub fn decompose(v: Vec3, normal: Vec3) -> (f32, Vec3) {
    let vn = v.dot(normal);
    (vn, v - normal * vn)
}

/// Project `v` onto the plane with unit `normal`.
#[inline]
pub fn tangent_component(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Normalize, or return `None` for (near) zero-length input.
#[inline]
pub fn try_normalize(v: Vec3) -> Option<Vec3> {
    let len_sq = v.length_squared();
    if len_sq <= DEGENERATE_LENGTH_SQ {
        None
    } else {
        Some(v / len_sq.sqrt())
    }
}
