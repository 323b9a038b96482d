//! Emission descriptors, shape/velocity sampling and emitter bookkeeping.
//!
//! An [`EmissionDesc`] fully describes a batch of newborn particles. Emitters
//! wrap one together with a rate so the system can stamp particles into the
//! pool every frame; one-shot bursts use the descriptor directly.

use std::f32::consts::{PI, TAU};

use cgmath::prelude::*;
use cgmath::{vec3, Vector3};
use rand::Rng;

use crate::error::{ParticleError, Result};
use crate::math::{is_finite3, is_finite4, orthonormal_basis, try_normalize, Color, WORLD_UP};
use crate::particle::Particle;
use crate::pool::ParticlePool;

/// Shortest lifetime a particle may be born with.
pub const MIN_LIFE: f32 = 1e-3;

/// Cap on the particles one emitter can owe in a single frame.
const MAX_DUE_PER_FRAME: f32 = u32::MAX as f32;

/// Closed interval sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn constant(value: f32) -> Self {
        Self { min: value, max: value }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Uniform in `[min, max]`; `min` when the range is empty or reversed.
    ///
    /// The width is taken in f64 so finite bounds as wide as `-f32::MAX..=f32::MAX`
    /// still sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.min < self.max {
            let min = f64::from(self.min);
            let width = f64::from(self.max) - min;
            let u: f64 = rng.gen_range(0.0..=1.0);
            ((min + width * u) as f32).clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    fn ordered(self, what: &str) -> Self {
        if self.min > self.max {
            tracing::warn!(target: "particles", min = self.min, max = self.max, "{what} range reversed, swapping");
            Self::new(self.max, self.min)
        } else {
            self
        }
    }

    fn floored(self, floor: f32, what: &str) -> Self {
        if self.min < floor {
            tracing::warn!(target: "particles", min = self.min, floor, "{what} clamped to minimum");
        }
        Self::new(self.min.max(floor), self.max.max(floor))
    }
}

/// Volume new particles are placed in, relative to the emission position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum EmissionShape {
    #[default]
    Point,
    Sphere { radius: f32, surface_only: bool },
    Box { half_extents: Vector3<f32> },
    /// Apex at the emission position, opening along +Y.
    Cone { half_angle: f32, height: f32 },
}

impl EmissionShape {
    fn is_finite(&self) -> bool {
        match *self {
            Self::Point => true,
            Self::Sphere { radius, .. } => radius.is_finite(),
            Self::Box { half_extents } => is_finite3(half_extents),
            Self::Cone { half_angle, height } => half_angle.is_finite() && height.is_finite(),
        }
    }

    fn sanitized(self) -> Self {
        match self {
            Self::Point => Self::Point,
            Self::Sphere { radius, surface_only } => Self::Sphere {
                radius: radius.abs(),
                surface_only,
            },
            Self::Box { half_extents } => Self::Box {
                half_extents: vec3(half_extents.x.abs(), half_extents.y.abs(), half_extents.z.abs()),
            },
            Self::Cone { half_angle, height } => Self::Cone {
                half_angle: half_angle.clamp(0.0, PI * 0.5 - 1e-3),
                height: height.abs(),
            },
        }
    }

    /// Offset from the emission position, uniform over the shape's volume
    /// (or surface for a surface-only sphere).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f32> {
        match *self {
            Self::Point => Vector3::zero(),
            Self::Sphere { radius, surface_only } => {
                let direction = random_unit_vector(rng);
                let distance = if surface_only {
                    radius
                } else {
                    radius * rng.gen_range(0.0f32..=1.0).cbrt()
                };
                direction * distance
            }
            Self::Box { half_extents } => vec3(
                ValueRange::new(-half_extents.x, half_extents.x).sample(rng),
                ValueRange::new(-half_extents.y, half_extents.y).sample(rng),
                ValueRange::new(-half_extents.z, half_extents.z).sample(rng),
            ),
            Self::Cone { half_angle, height } => {
                let y = height * rng.gen_range(0.0f32..=1.0).cbrt();
                let ring = y * half_angle.tan() * rng.gen_range(0.0f32..=1.0).sqrt();
                let phi = rng.gen_range(0.0..TAU);
                vec3(ring * phi.cos(), y, ring * phi.sin())
            }
        }
    }
}

/// How the initial velocity of a particle is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VelocityDistribution {
    Constant(Vector3<f32>),
    /// Each component uniform between `min` and `max`.
    Box { min: Vector3<f32>, max: Vector3<f32> },
    /// Direction uniform inside a cone around `direction`.
    Cone {
        direction: Vector3<f32>,
        half_angle: f32,
        speed: ValueRange,
    },
    /// Away from the emission position.
    Radial { speed: ValueRange },
}

impl Default for VelocityDistribution {
    fn default() -> Self {
        Self::Box {
            min: vec3(-1.0, 2.0, -1.0),
            max: vec3(1.0, 5.0, 1.0),
        }
    }
}

impl VelocityDistribution {
    fn is_finite(&self) -> bool {
        match *self {
            Self::Constant(v) => is_finite3(v),
            Self::Box { min, max } => is_finite3(min) && is_finite3(max),
            Self::Cone {
                direction,
                half_angle,
                speed,
            } => is_finite3(direction) && half_angle.is_finite() && speed.is_finite(),
            Self::Radial { speed } => speed.is_finite(),
        }
    }

    fn sanitized(self) -> Self {
        match self {
            Self::Box { min, max } => Self::Box {
                min: vec3(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
                max: vec3(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
            },
            Self::Cone {
                direction,
                half_angle,
                speed,
            } => Self::Cone {
                direction: try_normalize(direction).unwrap_or(WORLD_UP),
                half_angle: half_angle.clamp(0.0, PI),
                speed: speed.ordered("cone speed"),
            },
            Self::Radial { speed } => Self::Radial {
                speed: speed.ordered("radial speed"),
            },
            constant => constant,
        }
    }

    /// `offset` is the particle's position relative to the emission origin.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, offset: Vector3<f32>) -> Vector3<f32> {
        match *self {
            Self::Constant(v) => v,
            Self::Box { min, max } => vec3(
                ValueRange::new(min.x, max.x).sample(rng),
                ValueRange::new(min.y, max.y).sample(rng),
                ValueRange::new(min.z, max.z).sample(rng),
            ),
            Self::Cone {
                direction,
                half_angle,
                speed,
            } => {
                let z = rng.gen_range(half_angle.cos()..=1.0);
                let phi = rng.gen_range(0.0..TAU);
                let sin_theta = (1.0 - z * z).max(0.0).sqrt();
                let (tangent, bitangent) = orthonormal_basis(direction);
                let dir = tangent * (sin_theta * phi.cos()) + bitangent * (sin_theta * phi.sin()) + direction * z;
                dir * speed.sample(rng)
            }
            Self::Radial { speed } => {
                let dir = try_normalize(offset).unwrap_or_else(|| random_unit_vector(rng));
                dir * speed.sample(rng)
            }
        }
    }
}

fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f32> {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    vec3(r * phi.cos(), r * phi.sin(), z)
}

/// Everything needed to stamp `count` newborn particles into the pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmissionDesc {
    pub position: Vector3<f32>,
    pub count: u32,
    pub shape: EmissionShape,
    pub velocity: VelocityDistribution,
    pub life: ValueRange,
    pub size: ValueRange,
    /// `end_size = start_size * size_over_lifetime`.
    pub size_over_lifetime: f32,
    pub start_color: Color,
    pub end_color: Color,
    pub angular_velocity: ValueRange,
    pub mass: ValueRange,
}

impl Default for EmissionDesc {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            count: 1,
            shape: EmissionShape::Point,
            velocity: VelocityDistribution::default(),
            life: ValueRange::new(1.0, 3.0),
            size: ValueRange::new(0.1, 0.3),
            size_over_lifetime: 0.5,
            start_color: Color::new(1.0, 1.0, 1.0, 1.0),
            end_color: Color::new(1.0, 1.0, 1.0, 0.0),
            angular_velocity: ValueRange::constant(0.0),
            mass: ValueRange::constant(1.0),
        }
    }
}

impl EmissionDesc {
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_shape(mut self, shape: EmissionShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_velocity(mut self, velocity: VelocityDistribution) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_life(mut self, min: f32, max: f32) -> Self {
        self.life = ValueRange::new(min, max);
        self
    }

    pub fn with_size(mut self, min: f32, max: f32, over_lifetime: f32) -> Self {
        self.size = ValueRange::new(min, max);
        self.size_over_lifetime = over_lifetime;
        self
    }

    pub fn with_colors(mut self, start: Color, end: Color) -> Self {
        self.start_color = start;
        self.end_color = end;
        self
    }

    pub fn with_angular_velocity(mut self, min: f32, max: f32) -> Self {
        self.angular_velocity = ValueRange::new(min, max);
        self
    }

    pub fn with_mass(mut self, min: f32, max: f32) -> Self {
        self.mass = ValueRange::new(min, max);
        self
    }

    /// Rejects descriptors carrying NaN or infinite values.
    pub fn check(&self) -> Result<()> {
        let finite = is_finite3(self.position)
            && self.shape.is_finite()
            && self.velocity.is_finite()
            && self.life.is_finite()
            && self.size.is_finite()
            && self.size_over_lifetime.is_finite()
            && is_finite4(self.start_color)
            && is_finite4(self.end_color)
            && self.angular_velocity.is_finite()
            && self.mass.is_finite();
        if finite {
            Ok(())
        } else {
            Err(ParticleError::invalid("emission descriptor contains non-finite values"))
        }
    }

    /// Orders reversed ranges and clamps values into their valid domain, logging each fix.
    pub fn sanitized(self) -> Self {
        let size_over_lifetime = if self.size_over_lifetime < 0.0 {
            tracing::warn!(target: "particles", "negative size-over-lifetime factor clamped to 0");
            0.0
        } else {
            self.size_over_lifetime
        };
        Self {
            shape: self.shape.sanitized(),
            velocity: self.velocity.sanitized(),
            life: self.life.ordered("life").floored(MIN_LIFE, "life"),
            size: self.size.ordered("size").floored(0.0, "size"),
            size_over_lifetime,
            angular_velocity: self.angular_velocity.ordered("angular velocity"),
            mass: self.mass.ordered("mass").floored(0.0, "mass"),
            ..self
        }
    }

    pub fn sample_particle<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle {
        let offset = self.shape.sample(rng);
        let velocity = self.velocity.sample(rng, offset);
        let life = self.life.sample(rng);
        let start_size = self.size.sample(rng);

        Particle {
            position: self.position + offset,
            velocity,
            life,
            initial_life: life,
            start_size,
            size: start_size,
            end_size: start_size * self.size_over_lifetime,
            start_color: self.start_color,
            color: self.start_color,
            end_color: self.end_color,
            rotation: rng.gen_range(0.0..TAU),
            angular_velocity: self.angular_velocity.sample(rng),
            mass: self.mass.sample(rng),
        }
    }
}

/// Stamps up to `requested` particles into the free tail of the pool.
///
/// Returns how many were actually written; saturation is not an error.
pub(crate) fn emit_into<R: Rng + ?Sized>(
    pool: &mut ParticlePool,
    rng: &mut R,
    desc: &EmissionDesc,
    requested: usize,
) -> usize {
    let slots = pool.spawn(requested);
    for slot in slots.iter_mut() {
        *slot = desc.sample_particle(rng);
    }
    slots.len()
}

/// Continuous emission source description.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterDesc {
    pub name: String,
    /// Template for every particle this emitter spawns; its `count` is ignored, the rate decides.
    pub emission: EmissionDesc,
    /// Particles per second.
    pub rate: f32,
    /// Emission stops after this many seconds unless `looping`.
    pub duration: Option<f32>,
    pub looping: bool,
    pub enabled: bool,
}

impl Default for EmitterDesc {
    fn default() -> Self {
        Self {
            name: String::from("emitter"),
            emission: EmissionDesc::default(),
            rate: 100.0,
            duration: None,
            looping: true,
            enabled: true,
        }
    }
}

impl EmitterDesc {
    pub fn new(name: impl Into<String>, emission: EmissionDesc, rate: f32) -> Self {
        Self {
            name: name.into(),
            emission,
            rate,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration: f32, looping: bool) -> Self {
        self.duration = Some(duration);
        self.looping = looping;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(ParticleError::invalid(format!(
                "emitter '{}' has invalid rate {}",
                self.name, self.rate
            )));
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(ParticleError::invalid(format!(
                    "emitter '{}' has invalid duration {duration}",
                    self.name
                )));
            }
        }
        self.emission.check()
    }
}

#[derive(Clone, Debug)]
pub struct Emitter {
    desc: EmitterDesc,
    accumulator: f32,
    elapsed: f32,
    total_emitted: u64,
}

impl Emitter {
    pub(crate) fn new(mut desc: EmitterDesc) -> Self {
        desc.emission = desc.emission.sanitized();
        Self {
            desc,
            accumulator: 0.0,
            elapsed: 0.0,
            total_emitted: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &EmitterDesc {
        &self.desc
    }

    pub fn position(&self) -> Vector3<f32> {
        self.desc.emission.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        if is_finite3(position) {
            self.desc.emission.position = position;
        } else {
            tracing::warn!(target: "particles", emitter = %self.desc.name, "ignoring non-finite emitter position");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.desc.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.desc.enabled = enabled;
    }

    pub fn set_rate(&mut self, rate: f32) {
        if rate.is_finite() && rate >= 0.0 {
            self.desc.rate = rate;
        } else {
            tracing::warn!(target: "particles", emitter = %self.desc.name, rate, "ignoring invalid emission rate");
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }

    /// A non-looping emitter whose duration ran out.
    pub fn is_finished(&self) -> bool {
        matches!(self.desc.duration, Some(d) if !self.desc.looping && self.elapsed >= d)
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.elapsed = 0.0;
    }

    /// Number of particles due this frame; carries the fractional remainder forward.
    pub(crate) fn particles_to_emit(&mut self, dt: f32) -> u32 {
        if !self.desc.enabled || self.is_finished() {
            return 0;
        }
        if let Some(duration) = self.desc.duration {
            if self.desc.looping && self.elapsed >= duration {
                self.elapsed %= duration;
            }
        }

        self.elapsed += dt;
        // saturate instead of overflowing to inf, which would leave NaN behind
        self.accumulator = (self.accumulator + self.desc.rate * dt).min(MAX_DUE_PER_FRAME);

        let count = self.accumulator.floor();
        self.accumulator -= count;
        count as u32
    }

    pub(crate) fn emit<R: Rng + ?Sized>(&mut self, pool: &mut ParticlePool, rng: &mut R, count: u32) -> usize {
        let emitted = emit_into(pool, rng, &self.desc.emission, count as usize);
        self.total_emitted += emitted as u64;
        emitted
    }
}

/// Stable, generation-checked reference to an emitter owned by a system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EmitterHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct EmitterSlot {
    generation: u32,
    emitter: Option<Emitter>,
}

/// Emitter storage; destroyed slots are reused with a bumped generation.
#[derive(Debug, Default)]
pub(crate) struct EmitterArena {
    slots: Vec<EmitterSlot>,
    free: Vec<u32>,
    len: usize,
}

impl EmitterArena {
    pub fn insert(&mut self, emitter: Emitter) -> EmitterHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.emitter = Some(emitter);
            return EmitterHandle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(EmitterSlot {
            generation: 0,
            emitter: Some(emitter),
        });
        EmitterHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn remove(&mut self, handle: EmitterHandle) -> Option<Emitter> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let emitter = slot.emitter.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(emitter)
    }

    pub fn get(&self, handle: EmitterHandle) -> Option<&Emitter> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.emitter.as_ref())
    }

    pub fn get_mut(&mut self, handle: EmitterHandle) -> Option<&mut Emitter> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.emitter.as_mut())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Emitter> {
        self.slots.iter_mut().filter_map(|slot| slot.emitter.as_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }
}
