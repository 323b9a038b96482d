//! Real-time particle simulation core.
//!
//! A [`ParticleSystem`] owns a fixed-capacity pool of particles and advances
//! it frame by frame: emitters spawn particles, global forces, force fields
//! and collision planes act on them, and live particles are handed to an
//! external [`ParticleRenderer`] sorted back-to-front.
//!
//! Integration runs either data-parallel on the rayon pool
//! ([`ExecutionStrategy::Batch`]) or on the calling thread
//! ([`ExecutionStrategy::Sequential`]); both produce identical results.

mod collision;
mod config;
mod edits;
mod emitter;
mod error;
mod force_field;
mod integrate;
mod math;
mod particle;
mod pool;
mod render;
mod sort;
mod stats;
mod system;

pub use collision::{resolve_collisions, CollisionPlane, CollisionResponse, CollisionSettings};
pub use config::ParticleSystemConfig;
pub use edits::{SceneEdit, SceneEditHandle};
pub use emitter::{
    EmissionDesc, EmissionShape, Emitter, EmitterDesc, EmitterHandle, ValueRange, VelocityDistribution, MIN_LIFE,
};
pub use error::{ParticleError, Result};
pub use force_field::{turbulence_noise, Falloff, ForceField, ForceFieldKind};
pub use integrate::{
    step_particle, BatchIntegrator, ExecutionStrategy, Integrator, SequentialIntegrator, SimulationParams,
};
pub use math::{Color, EPSILON, WORLD_UP};
pub use particle::Particle;
pub use pool::ParticlePool;
pub use render::{ParticleRenderer, RenderInstance, RenderMode, RenderSubmission};
pub use sort::{DepthSorter, ParticleIndex};
pub use stats::ParticleStatistics;
pub use system::ParticleSystem;
