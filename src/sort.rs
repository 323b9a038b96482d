use cgmath::prelude::*;
use cgmath::Vector3;
use rayon::prelude::*;

use crate::integrate::ExecutionStrategy;
use crate::particle::Particle;

/// Below this many entries the parallel sort costs more than it saves.
const PARALLEL_SORT_THRESHOLD: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleIndex {
    pub pool_index: u32,
    pub camera_distance_squared: f32,
}

/// Back-to-front ordering of the live particles for alpha blending.
///
/// Only the auxiliary index list is rebuilt; the pool is never reordered.
#[derive(Clone, Debug, Default)]
pub struct DepthSorter {
    indices: Vec<ParticleIndex>,
}

impl DepthSorter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
        }
    }

    pub fn indices(&self) -> &[ParticleIndex] {
        &self.indices
    }

    pub fn capacity(&self) -> usize {
        self.indices.capacity()
    }

    /// Drops the current order, keeping the allocation.
    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Rebuilds the index list over live particles, farthest from `camera` first.
    pub fn sort(&mut self, particles: &[Particle], camera: Vector3<f32>, strategy: ExecutionStrategy) -> &[ParticleIndex] {
        self.indices.clear();
        self.indices.extend(
            particles
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_alive())
                .map(|(i, p)| ParticleIndex {
                    pool_index: i as u32,
                    camera_distance_squared: (p.position - camera).magnitude2(),
                }),
        );

        let farthest_first =
            |a: &ParticleIndex, b: &ParticleIndex| b.camera_distance_squared.total_cmp(&a.camera_distance_squared);
        if strategy == ExecutionStrategy::Batch && self.indices.len() >= PARALLEL_SORT_THRESHOLD {
            self.indices.par_sort_unstable_by(farthest_first);
        } else {
            self.indices.sort_unstable_by(farthest_first);
        }
        &self.indices
    }
}
