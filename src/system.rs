use std::mem::size_of;
use std::time::Instant;

use cgmath::Vector3;
use rand::{rngs::StdRng, SeedableRng};

use crate::collision::{CollisionPlane, CollisionResponse, CollisionSettings};
use crate::config::ParticleSystemConfig;
use crate::edits::{SceneEdit, SceneEditHandle};
use crate::emitter::{emit_into, EmissionDesc, Emitter, EmitterArena, EmitterDesc, EmitterHandle};
use crate::error::{ParticleError, Result};
use crate::force_field::ForceField;
use crate::integrate::{ExecutionStrategy, Integrator, SimulationParams};
use crate::math::is_finite3;
use crate::particle::Particle;
use crate::pool::ParticlePool;
use crate::render::{build_instances, ParticleRenderer, RenderInstance, RenderMode, RenderSubmission};
use crate::sort::{DepthSorter, ParticleIndex};
use crate::stats::{EmissionMeter, ParticleStatistics};

/// Owns a particle pool together with everything that acts on it.
///
/// One frame is `update(dt)` followed by `render(camera, renderer)`:
///
/// 1. queued [`SceneEdit`]s are applied,
/// 2. emitters stamp new particles into the pool,
/// 3. every live particle is integrated (forces, motion, collisions, aging),
/// 4. dead particles are compacted out of the live prefix,
/// 5. statistics are refreshed.
///
/// `render` then sorts the live particles back-to-front (when enabled) and
/// hands them to the renderer.
pub struct ParticleSystem {
    config: ParticleSystemConfig,
    pool: ParticlePool,
    emitters: EmitterArena,
    force_fields: Vec<ForceField>,
    collision_planes: Vec<CollisionPlane>,
    gravity: Vector3<f32>,
    wind: Vector3<f32>,
    air_resistance: f32,
    collisions_enabled: bool,
    collision: CollisionSettings,
    integrator: Box<dyn Integrator>,
    sorter: DepthSorter,
    sort_particles: bool,
    render_mode: RenderMode,
    instances: Vec<RenderInstance>,
    rng: StdRng,
    edits: SceneEditHandle,
    meter: EmissionMeter,
    simulation_time: f64,
    statistics: ParticleStatistics,
}

impl ParticleSystem {
    pub fn new(config: ParticleSystemConfig) -> Self {
        let config = config.validated();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut system = Self {
            pool: ParticlePool::new(config.max_particles),
            emitters: EmitterArena::default(),
            force_fields: Vec::new(),
            collision_planes: Vec::new(),
            gravity: config.gravity,
            wind: config.wind,
            air_resistance: config.air_resistance,
            collisions_enabled: config.collisions_enabled,
            collision: CollisionSettings {
                response: config.collision_response,
                restitution: config.restitution,
            },
            integrator: config.strategy.integrator(config.batch_chunk_size),
            sorter: DepthSorter::with_capacity(config.max_particles),
            sort_particles: config.sort_particles,
            render_mode: config.render_mode,
            instances: Vec::new(),
            rng,
            edits: SceneEditHandle::default(),
            meter: EmissionMeter::new(config.stats_interval),
            simulation_time: 0.0,
            statistics: ParticleStatistics::new(config.max_particles, config.strategy),
            config,
        };
        system.refresh_statistics(Default::default(), 0);

        tracing::info!(
            target: "particles",
            max_particles = system.config.max_particles,
            strategy = ?system.config.strategy,
            "particle system initialized"
        );
        system
    }

    pub fn with_capacity(max_particles: usize) -> Self {
        Self::new(ParticleSystemConfig::new(max_particles))
    }

    pub fn config(&self) -> &ParticleSystemConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Emitters
    // ---------------------------------------------------------------------

    pub fn create_emitter(&mut self, desc: EmitterDesc) -> Result<EmitterHandle> {
        desc.validate()?;
        tracing::debug!(target: "particles", name = %desc.name, rate = desc.rate, "created particle emitter");
        Ok(self.emitters.insert(Emitter::new(desc)))
    }

    pub fn destroy_emitter(&mut self, handle: EmitterHandle) -> Result<()> {
        let emitter = self
            .emitters
            .remove(handle)
            .ok_or(ParticleError::UnknownEmitter(handle))?;
        tracing::debug!(target: "particles", name = %emitter.name(), "destroyed particle emitter");
        Ok(())
    }

    pub fn emitter(&self, handle: EmitterHandle) -> Option<&Emitter> {
        self.emitters.get(handle)
    }

    pub fn emitter_mut(&mut self, handle: EmitterHandle) -> Option<&mut Emitter> {
        self.emitters.get_mut(handle)
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Emits `count` particles right now through an emitter's own descriptor.
    pub fn burst(&mut self, handle: EmitterHandle, count: u32) -> Result<usize> {
        let emitter = self
            .emitters
            .get_mut(handle)
            .ok_or(ParticleError::UnknownEmitter(handle))?;
        let emitted = emitter.emit(&mut self.pool, &mut self.rng, count);
        self.meter.record(emitted);
        Ok(emitted)
    }

    /// One-shot emission of `emission.count` particles, bypassing emitters.
    ///
    /// Returns how many were actually spawned; the request is silently cut
    /// down to the free capacity of the pool.
    pub fn emit_particles(&mut self, emission: &EmissionDesc) -> usize {
        if let Err(err) = emission.check() {
            tracing::warn!(target: "particles", %err, "ignoring emission request");
            return 0;
        }
        let emission = emission.sanitized();
        let emitted = emit_into(&mut self.pool, &mut self.rng, &emission, emission.count as usize);
        self.meter.record(emitted);
        emitted
    }

    // ---------------------------------------------------------------------
    // Global forces and scene geometry
    // ---------------------------------------------------------------------

    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f32>) {
        if is_finite3(gravity) {
            self.gravity = gravity;
        } else {
            tracing::warn!(target: "particles", "ignoring non-finite gravity");
        }
    }

    pub fn wind_force(&self) -> Vector3<f32> {
        self.wind
    }

    pub fn set_wind_force(&mut self, wind: Vector3<f32>) {
        if is_finite3(wind) {
            self.wind = wind;
        } else {
            tracing::warn!(target: "particles", "ignoring non-finite wind force");
        }
    }

    pub fn set_air_resistance(&mut self, air_resistance: f32) {
        if air_resistance.is_finite() && air_resistance >= 0.0 {
            self.air_resistance = air_resistance;
        } else {
            tracing::warn!(target: "particles", air_resistance, "air resistance clamped to 0");
            self.air_resistance = 0.0;
        }
    }

    pub fn force_fields(&self) -> &[ForceField] {
        &self.force_fields
    }

    /// Adds a field and returns its index in the field list.
    pub fn add_force_field(&mut self, field: ForceField) -> usize {
        self.force_fields.push(field.sanitized());
        self.force_fields.len() - 1
    }

    /// Removes the field at `index`; later fields shift down by one.
    pub fn remove_force_field(&mut self, index: usize) -> Result<ForceField> {
        if index >= self.force_fields.len() {
            return Err(ParticleError::ForceFieldOutOfRange {
                index,
                len: self.force_fields.len(),
            });
        }
        Ok(self.force_fields.remove(index))
    }

    pub fn collision_planes(&self) -> &[CollisionPlane] {
        &self.collision_planes
    }

    pub fn set_collision_planes(&mut self, planes: Vec<CollisionPlane>) {
        self.collision_planes = planes;
    }

    pub fn set_collisions_enabled(&mut self, enabled: bool) {
        self.collisions_enabled = enabled;
    }

    pub fn set_collision_response(&mut self, response: CollisionResponse) {
        self.collision.response = response;
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.collision.restitution = if restitution.is_finite() {
            restitution.clamp(0.0, 1.0)
        } else {
            tracing::warn!(target: "particles", "ignoring non-finite restitution");
            self.collision.restitution
        };
    }

    /// Handle for queuing structural edits from other threads or callbacks.
    pub fn edit_handle(&self) -> SceneEditHandle {
        self.edits.clone()
    }

    fn apply_pending_edits(&mut self) {
        for edit in self.edits.drain() {
            match edit {
                SceneEdit::AddForceField(field) => {
                    self.add_force_field(field);
                }
                SceneEdit::RemoveForceField(index) => {
                    if let Err(err) = self.remove_force_field(index) {
                        tracing::warn!(target: "particles", %err, "dropping queued force field removal");
                    }
                }
                SceneEdit::SetCollisionPlanes(planes) => self.set_collision_planes(planes),
                SceneEdit::SetGravity(gravity) => self.set_gravity(gravity),
                SceneEdit::SetWindForce(wind) => self.set_wind_force(wind),
            }
        }
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    pub fn strategy(&self) -> ExecutionStrategy {
        self.integrator.strategy()
    }

    pub fn set_strategy(&mut self, strategy: ExecutionStrategy) {
        if strategy != self.integrator.strategy() {
            tracing::info!(target: "particles", ?strategy, "switching integration strategy");
            self.integrator = strategy.integrator(self.config.batch_chunk_size);
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// A zero, negative or non-finite `dt` leaves every particle untouched;
    /// only the statistics snapshot is refreshed.
    pub fn update(&mut self, dt: f32) {
        let started = Instant::now();
        self.apply_pending_edits();

        let mut degenerate = 0;
        let mut emitted = 0;
        if dt.is_finite() && dt > 0.0 {
            self.simulation_time += f64::from(dt);

            for emitter in self.emitters.iter_mut() {
                let due = emitter.particles_to_emit(dt);
                if due > 0 {
                    emitted += emitter.emit(&mut self.pool, &mut self.rng, due);
                }
            }
            self.meter.record(emitted);

            let params = SimulationParams {
                gravity: self.gravity,
                wind: self.wind,
                air_resistance: self.air_resistance,
                force_fields: &self.force_fields,
                collision_planes: &self.collision_planes,
                collisions_enabled: self.collisions_enabled,
                collision: self.collision,
            };
            degenerate = self.integrator.integrate(self.pool.active_mut(), &params, dt);
            if degenerate > 0 {
                tracing::warn!(target: "particles", count = degenerate, "retired particles with non-finite state");
            }
            self.meter.advance(dt);
        } else if dt != 0.0 {
            tracing::debug!(target: "particles", dt, "ignoring invalid time step");
        }

        let removed = self.pool.compact();
        // pool indices and depths from the last sort no longer hold
        self.sorter.clear();
        self.refresh_statistics(started.elapsed(), degenerate);

        tracing::trace!(
            target: "particles",
            active = self.pool.active_count(),
            emitted,
            removed,
            "frame updated"
        );
    }

    /// Orders the live particles back-to-front as seen from `camera`.
    pub fn sort(&mut self, camera: Vector3<f32>) -> &[ParticleIndex] {
        let strategy = self.integrator.strategy();
        self.sorter.sort(self.pool.active(), camera, strategy)
    }

    /// Result of the most recent sort; empty again after each [`update`](Self::update).
    pub fn sorted_indices(&self) -> &[ParticleIndex] {
        self.sorter.indices()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn set_sorting(&mut self, enabled: bool) {
        self.sort_particles = enabled;
    }

    /// Submits the live particles to `renderer` in the current presentation mode.
    ///
    /// Returns the number of instances submitted; an unavailable renderer
    /// or an empty pool submits nothing.
    pub fn render(&mut self, camera: Vector3<f32>, renderer: &mut dyn ParticleRenderer) -> usize {
        if !renderer.is_available() {
            tracing::debug!(target: "particles", "renderer unavailable, skipping particle submission");
            return 0;
        }
        if self.pool.is_empty() {
            self.sorter.clear();
            return 0;
        }

        let strategy = self.integrator.strategy();
        let order = if self.sort_particles {
            Some(self.sorter.sort(self.pool.active(), camera, strategy))
        } else {
            None
        };
        build_instances(&self.render_mode, self.pool.active(), order, &mut self.instances);

        renderer.submit(&RenderSubmission {
            mode: self.render_mode,
            camera,
            particle_count: self.pool.active_count(),
            instances: &self.instances,
        });
        self.instances.len()
    }

    // ---------------------------------------------------------------------
    // State access
    // ---------------------------------------------------------------------

    /// Live prefix of the pool.
    pub fn particles(&self) -> &[Particle] {
        self.pool.active()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn max_particles(&self) -> usize {
        self.pool.capacity()
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn statistics(&self) -> ParticleStatistics {
        self.statistics
    }

    /// Drops every particle; emitters, fields and planes are kept.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.sorter.clear();
        self.refresh_statistics(Default::default(), 0);
    }

    fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.pool.capacity() * size_of::<Particle>()
            + self.force_fields.capacity() * size_of::<ForceField>()
            + self.collision_planes.capacity() * size_of::<CollisionPlane>()
            + self.emitters.len() * size_of::<Emitter>()
            + self.sorter.capacity() * size_of::<ParticleIndex>()
            + self.instances.capacity() * size_of::<RenderInstance>()
    }

    fn refresh_statistics(&mut self, last_update: std::time::Duration, degenerate: usize) {
        self.statistics = ParticleStatistics {
            active_particles: self.pool.active_count(),
            max_particles: self.pool.capacity(),
            emission_rate: self.meter.rate(),
            memory_usage_bytes: self.memory_usage(),
            simulation_time: self.simulation_time,
            last_update,
            strategy: self.integrator.strategy(),
            total_emitted: self.meter.total(),
            degenerate_retired: degenerate,
        };
    }
}

impl std::fmt::Debug for ParticleSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystem")
            .field("active", &self.pool.active_count())
            .field("max_particles", &self.pool.capacity())
            .field("emitters", &self.emitters.len())
            .field("force_fields", &self.force_fields.len())
            .field("collision_planes", &self.collision_planes.len())
            .field("strategy", &self.integrator.strategy())
            .finish()
    }
}
