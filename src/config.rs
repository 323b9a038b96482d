use cgmath::prelude::*;
use cgmath::{vec3, Vector3};

use crate::collision::CollisionResponse;
use crate::integrate::ExecutionStrategy;
use crate::math::is_finite3;
use crate::render::RenderMode;

/// Construction-time settings of a particle system.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSystemConfig {
    pub max_particles: usize,
    pub strategy: ExecutionStrategy,
    pub sort_particles: bool,
    pub render_mode: RenderMode,
    pub gravity: Vector3<f32>,
    pub wind: Vector3<f32>,
    pub air_resistance: f32,
    pub collisions_enabled: bool,
    pub collision_response: CollisionResponse,
    pub restitution: f32,
    /// Length in simulated seconds of the emission-rate reporting window.
    pub stats_interval: f32,
    pub batch_chunk_size: usize,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ParticleSystemConfig {
    fn default() -> Self {
        Self {
            max_particles: 10_000,
            strategy: ExecutionStrategy::Batch,
            sort_particles: true,
            render_mode: RenderMode::default(),
            gravity: vec3(0.0, -9.81, 0.0),
            wind: Vector3::zero(),
            air_resistance: 0.01,
            collisions_enabled: true,
            collision_response: CollisionResponse::Bounce,
            restitution: 0.8,
            stats_interval: 1.0,
            batch_chunk_size: 1024,
            seed: None,
        }
    }
}

impl ParticleSystemConfig {
    pub fn new(max_particles: usize) -> Self {
        Self {
            max_particles,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_sorting(mut self, sort_particles: bool) -> Self {
        self.sort_particles = sort_particles;
        self
    }

    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn with_gravity(mut self, gravity: Vector3<f32>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_wind(mut self, wind: Vector3<f32>) -> Self {
        self.wind = wind;
        self
    }

    pub fn with_air_resistance(mut self, air_resistance: f32) -> Self {
        self.air_resistance = air_resistance;
        self
    }

    pub fn with_collisions(mut self, enabled: bool, response: CollisionResponse, restitution: f32) -> Self {
        self.collisions_enabled = enabled;
        self.collision_response = response;
        self.restitution = restitution;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_stats_interval(mut self, seconds: f32) -> Self {
        self.stats_interval = seconds;
        self
    }

    pub fn with_batch_chunk_size(mut self, chunk_size: usize) -> Self {
        self.batch_chunk_size = chunk_size;
        self
    }

    /// Returns a copy with every out-of-range value clamped, logging each fix.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.max_particles == 0 {
            tracing::warn!(target: "particles", "max_particles was 0, clamped to 1");
            self.max_particles = 1;
        }
        if !is_finite3(self.gravity) {
            tracing::warn!(target: "particles", "gravity is not finite, reset to zero");
            self.gravity = Vector3::zero();
        }
        if !is_finite3(self.wind) {
            tracing::warn!(target: "particles", "wind is not finite, reset to zero");
            self.wind = Vector3::zero();
        }
        if !self.air_resistance.is_finite() || self.air_resistance < 0.0 {
            tracing::warn!(target: "particles", value = self.air_resistance, "air resistance clamped to 0");
            self.air_resistance = 0.0;
        }
        if !self.restitution.is_finite() || !(0.0..=1.0).contains(&self.restitution) {
            let clamped = if self.restitution.is_finite() {
                self.restitution.clamp(0.0, 1.0)
            } else {
                defaults.restitution
            };
            tracing::warn!(target: "particles", value = self.restitution, clamped, "restitution out of range");
            self.restitution = clamped;
        }
        if !self.stats_interval.is_finite() || self.stats_interval <= 0.0 {
            tracing::warn!(target: "particles", value = self.stats_interval, "stats interval reset to default");
            self.stats_interval = defaults.stats_interval;
        }
        if self.batch_chunk_size == 0 {
            tracing::warn!(target: "particles", "batch chunk size was 0, reset to default");
            self.batch_chunk_size = defaults.batch_chunk_size;
        }
        self
    }
}
