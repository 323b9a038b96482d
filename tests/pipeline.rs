use cgmath::prelude::*;
use cgmath::{vec3, Vector3};
use particle_engine::{
    CollisionPlane, CollisionResponse, EmissionDesc, EmitterDesc, ExecutionStrategy, ForceField, ParticleError,
    ParticleRenderer, ParticleSystem, ParticleSystemConfig, RenderInstance, RenderSubmission, ValueRange,
    VelocityDistribution,
};

#[derive(Default)]
struct CountingRenderer {
    unavailable: bool,
    submissions: usize,
    last: Vec<RenderInstance>,
}

impl ParticleRenderer for CountingRenderer {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn submit(&mut self, submission: &RenderSubmission<'_>) {
        self.submissions += 1;
        self.last = submission.instances.to_vec();
    }
}

fn weightless(max_particles: usize) -> ParticleSystemConfig {
    ParticleSystemConfig::new(max_particles)
        .with_gravity(Vector3::zero())
        .with_air_resistance(0.0)
        .with_seed(42)
}

fn falling_point(y: f32, speed: f32) -> EmissionDesc {
    EmissionDesc::default()
        .with_position(vec3(0.0, y, 0.0))
        .with_velocity(VelocityDistribution::Constant(vec3(0.0, -speed, 0.0)))
        .with_life(5.0, 5.0)
        .with_size(0.0, 0.0, 1.0)
}

fn fountain_scene(strategy: ExecutionStrategy) -> ParticleSystem {
    let config = ParticleSystemConfig::new(4_000).with_strategy(strategy).with_seed(1234);
    let mut system = ParticleSystem::new(config);
    let emission = EmissionDesc::default()
        .with_velocity(VelocityDistribution::Cone {
            direction: vec3(0.0, 1.0, 0.0),
            half_angle: 0.4,
            speed: ValueRange::new(5.0, 9.0),
        })
        .with_life(0.5, 2.0)
        .with_angular_velocity(-1.0, 1.0);
    system
        .create_emitter(EmitterDesc::new("fountain", emission, 1_500.0))
        .unwrap();
    system.add_force_field(ForceField::vortex(vec3(0.0, 2.0, 0.0), 4.0, 5.0));
    system.add_force_field(ForceField::turbulence(vec3(0.0, 3.0, 0.0), 6.0, 2.0, 0.7));
    system.add_force_field(ForceField::attract(vec3(1.0, 4.0, 0.0), 3.0, 8.0));
    system.set_collision_planes(vec![
        CollisionPlane::ground(0.0),
        CollisionPlane::new(vec3(-1.0, 0.0, 0.0), -2.5)
            .unwrap()
            .with_response(CollisionResponse::Die),
    ]);
    system
}

#[test]
fn test_emission_saturates_at_capacity() {
    let mut system = ParticleSystem::new(weightless(100));
    let emitted = system.emit_particles(&falling_point(10.0, 0.0).with_count(200));
    assert_eq!(emitted, 100);
    assert_eq!(system.active_count(), 100);
    assert_eq!(system.emit_particles(&falling_point(10.0, 0.0).with_count(5)), 0);
}

#[test]
fn test_zero_dt_changes_nothing() {
    let mut system = ParticleSystem::new(ParticleSystemConfig::new(50).with_seed(3));
    system.emit_particles(&EmissionDesc::default().with_count(20));
    let before = system.particles().to_vec();

    system.update(0.0);
    system.update(-1.0);
    system.update(f32::NAN);

    assert_eq!(system.particles(), &before[..]);
    assert_eq!(system.statistics().simulation_time, 0.0);
}

#[test]
fn test_die_plane_removes_particle_before_render() {
    let config = weightless(10).with_collisions(true, CollisionResponse::Die, 0.8);
    let mut system = ParticleSystem::new(config);
    system.set_collision_planes(vec![CollisionPlane::ground(0.0)]);
    system.emit_particles(&falling_point(0.2, 5.0));

    system.update(0.1);
    assert_eq!(system.active_count(), 0);
    assert_eq!(system.statistics().active_particles, 0);

    let mut renderer = CountingRenderer::default();
    assert_eq!(system.render(Vector3::zero(), &mut renderer), 0);
    assert_eq!(renderer.submissions, 0);
}

#[test]
fn test_bounce_reflects_velocity() {
    let config = weightless(10).with_collisions(true, CollisionResponse::Bounce, 1.0);
    let mut system = ParticleSystem::new(config);
    system.set_collision_planes(vec![CollisionPlane::ground(0.0)]);
    system.emit_particles(&falling_point(0.2, 5.0));

    system.update(0.1);
    let particle = system.particles()[0];
    assert_eq!(particle.velocity, vec3(0.0, 5.0, 0.0));
    assert!(particle.position.y >= -1e-5);
}

#[test]
fn test_stick_freezes_particle() {
    let config = weightless(10).with_collisions(true, CollisionResponse::Stick, 0.8);
    let mut system = ParticleSystem::new(config);
    system.set_collision_planes(vec![CollisionPlane::ground(0.0)]);
    system.emit_particles(&falling_point(0.2, 5.0));

    system.update(0.1);
    let resting = system.particles()[0].position;
    system.update(0.1);
    assert_eq!(system.particles()[0].velocity, Vector3::zero());
    assert_eq!(system.particles()[0].position, resting);
}

#[test]
fn test_disabled_collisions_let_particles_through() {
    let config = weightless(10).with_collisions(false, CollisionResponse::Die, 0.8);
    let mut system = ParticleSystem::new(config);
    system.set_collision_planes(vec![CollisionPlane::ground(0.0)]);
    system.emit_particles(&falling_point(0.2, 5.0));

    system.update(0.1);
    assert_eq!(system.active_count(), 1);
    assert!(system.particles()[0].position.y < 0.0);
}

#[test]
fn test_strategies_produce_identical_frames() {
    let mut batch = fountain_scene(ExecutionStrategy::Batch);
    let mut sequential = fountain_scene(ExecutionStrategy::Sequential);

    for _ in 0..90 {
        batch.update(1.0 / 60.0);
        sequential.update(1.0 / 60.0);
    }

    assert!(batch.active_count() > 0);
    assert_eq!(batch.particles(), sequential.particles());
    assert_eq!(batch.statistics().total_emitted, sequential.statistics().total_emitted);
}

#[test]
fn test_switching_strategy_mid_run_is_seamless() {
    let mut reference = fountain_scene(ExecutionStrategy::Sequential);
    let mut switched = fountain_scene(ExecutionStrategy::Sequential);

    for frame in 0..60 {
        if frame == 30 {
            switched.set_strategy(ExecutionStrategy::Batch);
        }
        reference.update(1.0 / 60.0);
        switched.update(1.0 / 60.0);
    }
    assert_eq!(reference.particles(), switched.particles());
}

#[test]
fn test_queued_gravity_change_applies_on_next_update() {
    let mut system = ParticleSystem::new(weightless(10));
    system.emit_particles(&falling_point(10.0, 0.0));
    let edits = system.edit_handle();

    std::thread::spawn(move || edits.set_gravity(vec3(0.0, -10.0, 0.0)))
        .join()
        .unwrap();
    assert_eq!(system.gravity(), Vector3::zero());

    system.update(0.1);
    assert_eq!(system.gravity(), vec3(0.0, -10.0, 0.0));
    assert!((system.particles()[0].velocity.y + 1.0).abs() < 1e-5);
}

#[test]
fn test_stale_emitter_handle_is_rejected() {
    let mut system = ParticleSystem::new(weightless(10));
    let first = system
        .create_emitter(EmitterDesc::new("first", falling_point(1.0, 0.0), 1.0))
        .unwrap();
    system.destroy_emitter(first).unwrap();
    let second = system
        .create_emitter(EmitterDesc::new("second", falling_point(1.0, 0.0), 1.0))
        .unwrap();

    assert!(system.emitter(first).is_none());
    assert_eq!(system.emitter(second).unwrap().name(), "second");
    assert!(matches!(system.burst(first, 3), Err(ParticleError::UnknownEmitter(h)) if h == first));
    assert!(matches!(system.destroy_emitter(first), Err(ParticleError::UnknownEmitter(_))));
}

#[test]
fn test_unavailable_renderer_is_skipped() {
    let mut system = ParticleSystem::new(weightless(10));
    system.emit_particles(&falling_point(1.0, 0.0).with_count(4));
    let mut renderer = CountingRenderer {
        unavailable: true,
        ..Default::default()
    };

    assert_eq!(system.render(vec3(0.0, 0.0, 5.0), &mut renderer), 0);
    assert_eq!(renderer.submissions, 0);

    renderer.unavailable = false;
    assert_eq!(system.render(vec3(0.0, 0.0, 5.0), &mut renderer), 4);
    assert_eq!(renderer.last.len(), 4);
}

#[test]
fn test_particles_fade_and_expire() {
    let mut system = ParticleSystem::new(weightless(10));
    let start = cgmath::vec4(1.0, 0.0, 0.0, 1.0);
    let end = cgmath::vec4(0.0, 0.0, 1.0, 0.0);
    system.emit_particles(
        &falling_point(1.0, 0.0)
            .with_life(1.0, 1.0)
            .with_size(2.0, 2.0, 0.5)
            .with_colors(start, end),
    );

    system.update(0.5);
    let halfway = system.particles()[0];
    assert!((halfway.life_ratio() - 0.5).abs() < 1e-5);
    assert!((halfway.size - 1.5).abs() < 1e-5);
    assert!((halfway.color - start.lerp(end, 0.5)).magnitude() < 1e-5);

    system.update(0.6);
    assert_eq!(system.active_count(), 0);
}

#[test]
fn test_emitter_rate_over_one_second() {
    let mut system = ParticleSystem::new(weightless(1_000));
    system
        .create_emitter(EmitterDesc::new("steady", falling_point(1.0, 0.0), 120.0))
        .unwrap();
    for _ in 0..64 {
        system.update(1.0 / 64.0);
    }
    let emitted = system.statistics().total_emitted;
    assert!((119..=120).contains(&emitted), "emitted {emitted}");
}
