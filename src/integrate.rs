//! Per-frame particle integration.
//!
//! [`step_particle`] is the reference update for a single live particle.
//! Both strategies run exactly this step, so they agree bit-for-bit; the
//! batch strategy just spreads the pool across the rayon pool and returns
//! only after every chunk has finished.

use cgmath::Vector3;
use rayon::prelude::*;

use crate::collision::{resolve_collisions, CollisionPlane, CollisionSettings};
use crate::force_field::ForceField;
use crate::particle::Particle;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    /// Data-parallel over the whole pool.
    #[default]
    Batch,
    /// Slot by slot on the calling thread.
    Sequential,
}

impl ExecutionStrategy {
    pub fn integrator(self, batch_chunk_size: usize) -> Box<dyn Integrator> {
        match self {
            ExecutionStrategy::Batch => Box::new(BatchIntegrator::new(batch_chunk_size)),
            ExecutionStrategy::Sequential => Box::new(SequentialIntegrator),
        }
    }
}

/// Global simulation inputs shared by every particle in a frame.
#[derive(Clone, Copy, Debug)]
pub struct SimulationParams<'a> {
    pub gravity: Vector3<f32>,
    pub wind: Vector3<f32>,
    pub air_resistance: f32,
    pub force_fields: &'a [ForceField],
    pub collision_planes: &'a [CollisionPlane],
    pub collisions_enabled: bool,
    pub collision: CollisionSettings,
}

/// Advances one live particle by `dt`.
///
/// Returns `true` when the particle had to be retired because its state
/// went non-finite.
pub fn step_particle(particle: &mut Particle, params: &SimulationParams<'_>, dt: f32) -> bool {
    particle.velocity += params.gravity * dt;
    particle.velocity += params.wind * dt;
    // not clamped: a large air_resistance * dt flips the velocity
    particle.velocity *= 1.0 - params.air_resistance * dt;

    for field in params.force_fields {
        particle.velocity += field.force_at(particle.position) * dt;
    }

    particle.position += particle.velocity * dt;

    if params.collisions_enabled {
        resolve_collisions(particle, params.collision_planes, &params.collision);
    }

    particle.life -= dt;
    particle.update_properties(dt);

    if particle.has_finite_state() {
        false
    } else {
        particle.retire_degenerate();
        true
    }
}

/// One way of running [`step_particle`] over the live prefix of the pool.
pub trait Integrator: Send + Sync + std::fmt::Debug {
    fn strategy(&self) -> ExecutionStrategy;

    /// Steps every particle with `life > 0`; dead slots are left untouched.
    ///
    /// Returns how many particles were retired for non-finite state. A
    /// non-positive or non-finite `dt` does nothing.
    fn integrate(&self, particles: &mut [Particle], params: &SimulationParams<'_>, dt: f32) -> usize;
}

fn step_alive(particles: &mut [Particle], params: &SimulationParams<'_>, dt: f32) -> usize {
    let mut retired = 0;
    for particle in particles.iter_mut().filter(|p| p.is_alive()) {
        if step_particle(particle, params, dt) {
            retired += 1;
        }
    }
    retired
}

fn valid_dt(dt: f32) -> bool {
    dt.is_finite() && dt > 0.0
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialIntegrator;

impl Integrator for SequentialIntegrator {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Sequential
    }

    fn integrate(&self, particles: &mut [Particle], params: &SimulationParams<'_>, dt: f32) -> usize {
        if !valid_dt(dt) {
            return 0;
        }
        step_alive(particles, params, dt)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BatchIntegrator {
    chunk_size: usize,
}

impl BatchIntegrator {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for BatchIntegrator {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Integrator for BatchIntegrator {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Batch
    }

    fn integrate(&self, particles: &mut [Particle], params: &SimulationParams<'_>, dt: f32) -> usize {
        if !valid_dt(dt) {
            return 0;
        }
        particles
            .par_chunks_mut(self.chunk_size)
            .map(|chunk| step_alive(chunk, params, dt))
            .sum()
    }
}
