use std::time::Instant;

use cgmath::prelude::*;
use cgmath::vec3;
use particle_engine::{
    CollisionPlane, CollisionResponse, EmissionDesc, EmissionShape, EmitterDesc, ExecutionStrategy, Falloff,
    ForceField, Particle, ParticleRenderer, ParticleStatistics, ParticleSystem, ParticleSystemConfig,
    RenderSubmission, ValueRange, VelocityDistribution,
};
use tracing_subscriber::EnvFilter;

const SIMULATION_RATE: f32 = 60.0;
const SIMULATED_SECONDS: u32 = 6;
const ORBIT_SPEED: f32 = 20.0;
const ORBIT_DISTANCE: f32 = 25.0;

struct Camera {
    pub target: cgmath::Vector3<f32>,
    pub pitch: f32,
    pub yaw: f32,
}

impl Camera {
    fn new(target: cgmath::Vector3<f32>) -> Self {
        Self {
            target,
            pitch: 20.0,
            yaw: 0.0,
        }
    }

    fn position(&self) -> cgmath::Vector3<f32> {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();

        let backward = cgmath::vec3(
            pitch_rad.cos() * yaw_rad.sin(),
            pitch_rad.sin(),
            pitch_rad.cos() * yaw_rad.cos(),
        )
        .normalize();

        self.target + backward * ORBIT_DISTANCE
    }
}

/// Packs each submission into a storage-buffer image, as a GPU backend would before upload.
#[derive(Default)]
struct Renderer {
    storage_buffer: Vec<u8>,
    storage_buffer_size: usize,
    frames: u64,
    instances: u64,
}

impl ParticleRenderer for Renderer {
    fn submit(&mut self, submission: &RenderSubmission<'_>) {
        match submission.encode() {
            Ok(bytes) => {
                if bytes.len() > self.storage_buffer_size {
                    tracing::debug!(
                        old_size = self.storage_buffer_size,
                        new_size = bytes.len(),
                        "growing particle storage buffer"
                    );
                    self.storage_buffer_size = bytes.len();
                }
                self.storage_buffer = bytes;
                self.frames += 1;
                self.instances += submission.instances.len() as u64;
            }
            Err(err) => tracing::error!(%err, "failed to encode particle instances"),
        }
    }
}

fn build_scene(strategy: ExecutionStrategy) -> particle_engine::Result<ParticleSystem> {
    let config = ParticleSystemConfig::new(20_000)
        .with_strategy(strategy)
        .with_collisions(true, CollisionResponse::Bounce, 0.6)
        .with_seed(0x5eed);
    let mut system = ParticleSystem::new(config);

    let fountain = EmissionDesc::default()
        .with_shape(EmissionShape::Sphere {
            radius: 0.25,
            surface_only: false,
        })
        .with_velocity(VelocityDistribution::Cone {
            direction: vec3(0.0, 1.0, 0.0),
            half_angle: 0.35,
            speed: ValueRange::new(8.0, 12.0),
        })
        .with_life(2.0, 4.0)
        .with_size(0.1, 0.2, 0.25)
        .with_colors(
            cgmath::vec4(0.4, 0.7, 1.0, 1.0),
            cgmath::vec4(1.0, 1.0, 1.0, 0.0),
        )
        .with_angular_velocity(-2.0, 2.0);
    system.create_emitter(EmitterDesc::new("fountain", fountain, 2_000.0))?;

    let sparks = EmissionDesc::default()
        .with_position(vec3(6.0, 1.0, 0.0))
        .with_velocity(VelocityDistribution::Radial {
            speed: ValueRange::new(2.0, 4.0),
        })
        .with_life(0.5, 1.0);
    system.create_emitter(EmitterDesc::new("sparks", sparks, 400.0).with_duration(1.5, true))?;

    system.add_force_field(ForceField::vortex(vec3(0.0, 4.0, 0.0), 5.0, 6.0).with_falloff(Falloff::Smooth));
    system.add_force_field(ForceField::turbulence(vec3(0.0, 6.0, 0.0), 8.0, 3.0, 0.5));

    system.set_collision_planes(vec![
        CollisionPlane::ground(0.0),
        CollisionPlane::new(vec3(-1.0, 0.0, 0.0), -10.0)?.with_response(CollisionResponse::Die),
    ]);

    Ok(system)
}

fn run(strategy: ExecutionStrategy) -> particle_engine::Result<(ParticleStatistics, Vec<Particle>)> {
    let mut system = build_scene(strategy)?;
    let mut camera = Camera::new(vec3(0.0, 4.0, 0.0));
    let mut renderer = Renderer::default();
    let edits = system.edit_handle();

    let dt = 1.0 / SIMULATION_RATE;
    let frames = SIMULATED_SECONDS * SIMULATION_RATE as u32;
    let started = Instant::now();

    for frame in 0..frames {
        if frame == frames / 2 {
            // a gust halfway through, applied at the next update
            let edits = edits.clone();
            std::thread::spawn(move || edits.set_wind_force(vec3(3.0, 0.0, 0.0)))
                .join()
                .ok();
        }

        camera.yaw += ORBIT_SPEED * dt;
        system.update(dt);
        system.render(camera.position(), &mut renderer);

        if (frame + 1) % SIMULATION_RATE as u32 == 0 {
            let stats = system.statistics();
            tracing::info!(
                ?strategy,
                time = %format!("{:.1}s", stats.simulation_time),
                active = stats.active_particles,
                utilization = %format!("{:.1}%", stats.utilization() * 100.0),
                emission_rate = stats.emission_rate,
                update = %format!("{:.3}ms", stats.last_update.as_secs_f64() * 1000.0),
                "simulation progress"
            );
        }
    }

    tracing::info!(
        ?strategy,
        wall_time = %format!("{:.3}s", started.elapsed().as_secs_f64()),
        frames = renderer.frames,
        instances = renderer.instances,
        buffer_bytes = renderer.storage_buffer.len(),
        "run finished"
    );

    Ok((system.statistics(), system.particles().to_vec()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let batch = run(ExecutionStrategy::Batch);
    let sequential = run(ExecutionStrategy::Sequential);

    match (batch, sequential) {
        (Ok((batch_stats, batch_particles)), Ok((_, sequential_particles))) => {
            tracing::info!(
                total_emitted = batch_stats.total_emitted,
                memory_bytes = batch_stats.memory_usage_bytes,
                identical = batch_particles == sequential_particles,
                "batch and sequential runs compared"
            );
        }
        (Err(err), _) | (_, Err(err)) => {
            tracing::error!(%err, "failed to build particle scene");
            std::process::exit(1);
        }
    }
}
