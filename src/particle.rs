use cgmath::prelude::*;
use cgmath::Vector3;

use crate::math::{is_finite3, Color};

/// One slot of the particle pool.
///
/// A slot whose `life` is at or below zero is dead: its visual state is
/// meaningless and it is dropped by the next compaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub life: f32,
    pub initial_life: f32,
    pub start_size: f32,
    pub size: f32,
    pub end_size: f32,
    pub start_color: Color,
    pub color: Color,
    pub end_color: Color,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub mass: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            velocity: Vector3::zero(),
            life: 0.0,
            initial_life: 0.0,
            start_size: 1.0,
            size: 1.0,
            end_size: 1.0,
            start_color: Color::new(1.0, 1.0, 1.0, 1.0),
            color: Color::new(1.0, 1.0, 1.0, 1.0),
            end_color: Color::new(1.0, 1.0, 1.0, 1.0),
            rotation: 0.0,
            angular_velocity: 0.0,
            mass: 1.0,
        }
    }
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Remaining life as a fraction of the initial life, 1 at birth and 0 at death.
    pub fn life_ratio(&self) -> f32 {
        if self.initial_life > 0.0 {
            (self.life / self.initial_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Re-derives color and size from the remaining life and spins the particle.
    ///
    /// Values run from the end value at `t = 0` to the start value at `t = 1`.
    pub fn update_properties(&mut self, dt: f32) {
        let t = self.life_ratio();
        self.color = self.end_color.lerp(self.start_color, t);
        self.size = self.end_size + (self.start_size - self.end_size) * t;
        self.rotation += self.angular_velocity * dt;
    }

    pub(crate) fn has_finite_state(&self) -> bool {
        is_finite3(self.position)
            && is_finite3(self.velocity)
            && self.life.is_finite()
            && self.size.is_finite()
            && self.rotation.is_finite()
    }

    /// Retires a particle whose state went non-finite so nothing bad crosses the frame boundary.
    pub(crate) fn retire_degenerate(&mut self) {
        self.position = Vector3::zero();
        self.velocity = Vector3::zero();
        self.life = 0.0;
        self.size = self.end_size;
        self.rotation = 0.0;
    }
}
