//! Hand-off of finished particle state to an external renderer.
//!
//! The core never draws anything itself. Each presentation mode turns the
//! live particles into a flat list of [`RenderInstance`]s, which a renderer
//! can upload as-is: [`RenderSubmission::encode`] packs them into a WGSL
//! storage buffer layout (`arrayLength` header plus runtime array).

use cgmath::Vector3;
use encase::{ArrayLength, ShaderType, StorageBuffer};

use crate::error::Result;
use crate::math::Color;
use crate::particle::Particle;
use crate::sort::ParticleIndex;

#[derive(Clone, Copy, Debug, PartialEq, ShaderType)]
pub struct RenderInstance {
    pub position: Vector3<f32>,
    pub size: f32,
    pub color: Color,
    pub rotation: f32,
}

impl RenderInstance {
    fn from_particle(particle: &Particle) -> Self {
        Self {
            position: particle.position,
            size: particle.size,
            color: particle.color,
            rotation: particle.rotation,
        }
    }
}

/// Presentation mode with its per-mode data.
///
/// Only draw submission depends on the mode; simulation is identical for all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderMode {
    /// Camera-facing point sprites.
    Billboard { size_scale: f32 },
    /// One instance of a renderer-owned mesh per particle.
    Mesh { mesh_id: u32 },
    /// Tapering ribbon of `segments` instances trailing behind each particle.
    Trail { segments: u32, length_scale: f32 },
    /// Soft, inflated puffs whose opacity follows `density`.
    Volumetric { density: f32 },
}

impl Default for RenderMode {
    fn default() -> Self {
        Self::Billboard { size_scale: 1.0 }
    }
}

impl RenderMode {
    /// Appends the instances for `particle` under this mode.
    fn expand(&self, particle: &Particle, out: &mut Vec<RenderInstance>) {
        let base = RenderInstance::from_particle(particle);
        match *self {
            RenderMode::Billboard { size_scale } => out.push(RenderInstance {
                size: base.size * size_scale,
                ..base
            }),
            RenderMode::Mesh { .. } => out.push(base),
            RenderMode::Trail { segments, length_scale } => {
                let segments = segments.max(1);
                let tail = particle.velocity * length_scale;
                for k in 0..segments {
                    let t = k as f32 / segments as f32;
                    let mut color = base.color;
                    color.w *= 1.0 - t;
                    out.push(RenderInstance {
                        position: base.position - tail * t,
                        size: base.size * (1.0 - 0.5 * t),
                        color,
                        ..base
                    });
                }
            }
            RenderMode::Volumetric { density } => {
                let density = density.clamp(0.0, 1.0);
                let mut color = base.color;
                color.w *= density;
                out.push(RenderInstance {
                    size: base.size * (1.0 + density),
                    color,
                    ..base
                });
            }
        }
    }
}

/// Builds the instance list for the live particles, in `order` when given.
pub(crate) fn build_instances(
    mode: &RenderMode,
    particles: &[Particle],
    order: Option<&[ParticleIndex]>,
    out: &mut Vec<RenderInstance>,
) {
    out.clear();
    match order {
        Some(order) => {
            for index in order {
                let particle = &particles[index.pool_index as usize];
                if particle.is_alive() {
                    mode.expand(particle, out);
                }
            }
        }
        None => {
            for particle in particles.iter().filter(|p| p.is_alive()) {
                mode.expand(particle, out);
            }
        }
    }
}

#[derive(ShaderType)]
struct GpuInstances<'a> {
    pub length: ArrayLength,
    #[size(runtime)]
    pub instances: &'a [RenderInstance],
}

/// One frame's worth of draw data for a single particle system.
#[derive(Clone, Copy, Debug)]
pub struct RenderSubmission<'a> {
    pub mode: RenderMode,
    pub camera: Vector3<f32>,
    pub particle_count: usize,
    pub instances: &'a [RenderInstance],
}

impl RenderSubmission<'_> {
    /// Packs the instances into a WGSL storage-buffer image.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = StorageBuffer::new(Vec::new());
        buffer.write(&GpuInstances {
            length: ArrayLength,
            instances: self.instances,
        })?;
        Ok(buffer.into_inner())
    }
}

/// External drawing backend.
pub trait ParticleRenderer {
    /// Renderers that lost their device report `false`; submission is skipped.
    fn is_available(&self) -> bool {
        true
    }

    fn submit(&mut self, submission: &RenderSubmission<'_>);
}
