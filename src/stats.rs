use std::time::Duration;

use crate::integrate::ExecutionStrategy;

/// Read-only snapshot refreshed once at the end of every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleStatistics {
    pub active_particles: usize,
    pub max_particles: usize,
    /// Particles per second over the last completed reporting interval.
    pub emission_rate: f32,
    pub memory_usage_bytes: usize,
    /// Simulated seconds accumulated over all updates.
    pub simulation_time: f64,
    /// Wall-clock cost of the last update.
    pub last_update: Duration,
    pub strategy: ExecutionStrategy,
    pub total_emitted: u64,
    /// Particles retired last update because their state went non-finite.
    pub degenerate_retired: usize,
}

impl ParticleStatistics {
    pub(crate) fn new(max_particles: usize, strategy: ExecutionStrategy) -> Self {
        Self {
            active_particles: 0,
            max_particles,
            emission_rate: 0.0,
            memory_usage_bytes: 0,
            simulation_time: 0.0,
            last_update: Duration::ZERO,
            strategy,
            total_emitted: 0,
            degenerate_retired: 0,
        }
    }

    pub fn utilization(&self) -> f32 {
        if self.max_particles == 0 {
            0.0
        } else {
            self.active_particles as f32 / self.max_particles as f32
        }
    }
}

/// Windowed emission counter behind [`ParticleStatistics::emission_rate`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct EmissionMeter {
    interval: f32,
    emitted: u64,
    elapsed: f32,
    rate: f32,
    total: u64,
}

impl EmissionMeter {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            emitted: 0,
            elapsed: 0.0,
            rate: 0.0,
            total: 0,
        }
    }

    pub fn record(&mut self, count: usize) {
        self.emitted += count as u64;
        self.total += count as u64;
    }

    /// Closes the reporting interval once enough simulated time has passed.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.rate = self.emitted as f32 / self.elapsed;
            self.emitted = 0;
            self.elapsed = 0.0;
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
