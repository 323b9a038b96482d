use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use cgmath::prelude::*;
use cgmath::{vec3, Vector3};

use crate::math::{is_finite3, try_normalize, smoothstep, EPSILON, WORLD_UP};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceFieldKind {
    Attract,
    Repel,
    Vortex,
    Turbulence,
}

/// Maps normalized distance from the field center (`0..=1`) to an influence factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Falloff {
    #[default]
    None,
    Linear,
    Quadratic,
    Smooth,
}

impl Falloff {
    pub fn factor(self, normalized_distance: f32) -> f32 {
        let n = normalized_distance.clamp(0.0, 1.0);
        match self {
            Falloff::None => 1.0,
            Falloff::Linear => 1.0 - n,
            Falloff::Quadratic => (1.0 - n) * (1.0 - n),
            Falloff::Smooth => 1.0 - smoothstep(n),
        }
    }
}

/// A spherical region that pushes on the particles inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceField {
    pub kind: ForceFieldKind,
    pub position: Vector3<f32>,
    pub radius: f32,
    pub strength: f32,
    pub falloff: Falloff,
    pub turbulence_scale: f32,
}

impl ForceField {
    pub fn new(kind: ForceFieldKind, position: Vector3<f32>, radius: f32, strength: f32) -> Self {
        Self {
            kind,
            position,
            radius,
            strength,
            falloff: Falloff::None,
            turbulence_scale: 1.0,
        }
    }

    pub fn attract(position: Vector3<f32>, radius: f32, strength: f32) -> Self {
        Self::new(ForceFieldKind::Attract, position, radius, strength)
    }

    pub fn repel(position: Vector3<f32>, radius: f32, strength: f32) -> Self {
        Self::new(ForceFieldKind::Repel, position, radius, strength)
    }

    pub fn vortex(position: Vector3<f32>, radius: f32, strength: f32) -> Self {
        Self::new(ForceFieldKind::Vortex, position, radius, strength)
    }

    pub fn turbulence(position: Vector3<f32>, radius: f32, strength: f32, scale: f32) -> Self {
        Self::new(ForceFieldKind::Turbulence, position, radius, strength).with_turbulence_scale(scale)
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_turbulence_scale(mut self, scale: f32) -> Self {
        self.turbulence_scale = scale;
        self
    }

    /// Clamps values a running simulation cannot use.
    pub fn sanitized(mut self) -> Self {
        if !is_finite3(self.position) {
            tracing::warn!(target: "particles", "force field position is not finite, moved to origin");
            self.position = Vector3::zero();
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            tracing::warn!(target: "particles", radius = self.radius, "force field radius clamped to 0");
            self.radius = 0.0;
        }
        if !self.strength.is_finite() {
            tracing::warn!(target: "particles", "force field strength is not finite, clamped to 0");
            self.strength = 0.0;
        }
        if !self.turbulence_scale.is_finite() || self.turbulence_scale <= 0.0 {
            tracing::warn!(
                target: "particles",
                scale = self.turbulence_scale,
                "turbulence scale clamped to 1"
            );
            self.turbulence_scale = 1.0;
        }
        self
    }

    /// Strength after falloff at `distance` from the center; zero outside the radius.
    pub fn influence(&self, distance: f32) -> f32 {
        if self.radius <= EPSILON || distance > self.radius {
            return 0.0;
        }
        self.strength * self.falloff.factor(distance / self.radius)
    }

    /// Acceleration this field applies to a particle at `position`.
    pub fn force_at(&self, position: Vector3<f32>) -> Vector3<f32> {
        let offset = position - self.position;
        let distance = offset.magnitude();
        let influence = self.influence(distance);
        if influence == 0.0 {
            return Vector3::zero();
        }

        match self.kind {
            ForceFieldKind::Turbulence => {
                turbulence_noise(position, self.turbulence_scale) * influence
            }
            kind => {
                let Some(direction) = try_normalize(offset) else {
                    return Vector3::zero();
                };
                match kind {
                    ForceFieldKind::Attract => -direction * influence,
                    ForceFieldKind::Repel => direction * influence,
                    _ => direction.cross(WORLD_UP) * influence,
                }
            }
        }
    }
}

fn hash_lattice(cell: Vector3<i64>, axis: u8) -> f32 {
    let mut hasher = DefaultHasher::new();
    cell.x.hash(&mut hasher);
    cell.y.hash(&mut hasher);
    cell.z.hash(&mut hasher);
    axis.hash(&mut hasher);
    // top 24 bits mapped to [-1, 1]
    let bits = (hasher.finish() >> 40) as f32;
    bits / ((1u64 << 23) as f32) - 1.0
}

fn value_noise(p: Vector3<f32>, axis: u8) -> f32 {
    let base = vec3(p.x.floor(), p.y.floor(), p.z.floor());
    let cell = vec3(base.x as i64, base.y as i64, base.z as i64);
    let fx = smoothstep(p.x - base.x);
    let fy = smoothstep(p.y - base.y);
    let fz = smoothstep(p.z - base.z);

    let corner = |dx: i64, dy: i64, dz: i64| hash_lattice(cell + vec3(dx, dy, dz), axis);
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), fx);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), fx);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), fx);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), fx);
    lerp(lerp(x00, x10, fy), lerp(x01, x11, fy), fz)
}

/// Deterministic pseudo-noise vector with components in `[-1, 1]`.
///
/// Depends only on `position * scale`, so both integration strategies see
/// identical values.
pub fn turbulence_noise(position: Vector3<f32>, scale: f32) -> Vector3<f32> {
    let p = position * scale;
    if !is_finite3(p) {
        return Vector3::zero();
    }
    vec3(
        value_noise(p, 0),
        value_noise(p + vec3(100.0, 0.0, 0.0), 1),
        value_noise(p + vec3(0.0, 100.0, 0.0), 2),
    )
}
