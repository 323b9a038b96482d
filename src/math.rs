use cgmath::prelude::*;
use cgmath::{Vector3, Vector4};

/// RGBA color, components nominally in `[0, 1]`.
pub type Color = Vector4<f32>;

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f32 = 1e-6;

pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

pub fn is_finite3(v: Vector3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

pub fn is_finite4(v: Vector4<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite() && v.w.is_finite()
}

/// Normalizes `v`, or returns `None` when it is too short to have a direction.
pub fn try_normalize(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let length = v.magnitude();
    if length > EPSILON && length.is_finite() {
        Some(v / length)
    } else {
        None
    }
}

/// Reflects `v` about the plane with unit normal `normal`.
pub fn reflect(v: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    v - normal * (2.0 * v.dot(normal))
}

pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Builds two unit vectors perpendicular to `axis` (and to each other).
pub fn orthonormal_basis(axis: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let helper = if axis.y.abs() < 0.999 {
        WORLD_UP
    } else {
        Vector3::unit_x()
    };
    let tangent = axis.cross(helper).normalize();
    let bitangent = axis.cross(tangent);
    (tangent, bitangent)
}
