use cgmath::prelude::*;
use cgmath::Vector3;

use crate::error::{ParticleError, Result};
use crate::math::{reflect, try_normalize};
use crate::particle::Particle;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionResponse {
    /// Retire the particle on contact.
    Die,
    /// Reflect the velocity about the plane, scaled by restitution.
    ///
    /// Only a particle still moving into the plane is reflected; one already
    /// separating keeps its velocity and is just pushed back out.
    #[default]
    Bounce,
    /// Zero the velocity and leave the particle where it is.
    Stick,
}

/// Static plane `normal · p = distance` with unit `normal`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionPlane {
    normal: Vector3<f32>,
    distance: f32,
    response: Option<CollisionResponse>,
}

impl CollisionPlane {
    /// The normal is normalized; zero-length or non-finite input is rejected.
    pub fn new(normal: Vector3<f32>, distance_from_origin: f32) -> Result<Self> {
        let normal = try_normalize(normal).ok_or(ParticleError::DegeneratePlane)?;
        if !distance_from_origin.is_finite() {
            return Err(ParticleError::invalid("plane distance is not finite"));
        }
        Ok(Self {
            normal,
            distance: distance_from_origin,
            response: None,
        })
    }

    /// Horizontal ground plane at height `y`, facing up.
    pub fn ground(y: f32) -> Self {
        Self {
            normal: Vector3::unit_y(),
            distance: y,
            response: None,
        }
    }

    /// Overrides the system-wide response for this plane only.
    pub fn with_response(mut self, response: CollisionResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn distance_from_origin(&self) -> f32 {
        self.distance
    }

    pub fn response(&self) -> Option<CollisionResponse> {
        self.response
    }

    pub fn signed_distance(&self, point: Vector3<f32>) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionSettings {
    pub response: CollisionResponse,
    pub restitution: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            response: CollisionResponse::Bounce,
            restitution: 0.8,
        }
    }
}

/// Tests `particle` against every plane in order and applies each hit's response.
///
/// Planes are handled independently; when two planes disagree, the last one
/// to touch the velocity wins.
///
/// A bounce reflects and scales the velocity only while `velocity · normal < 0`;
/// a separating particle inside the radius band keeps its velocity and is only
/// depenetrated.
pub fn resolve_collisions(particle: &mut Particle, planes: &[CollisionPlane], settings: &CollisionSettings) {
    for plane in planes {
        let radius = particle.size * 0.5;
        let distance = plane.signed_distance(particle.position);
        if distance >= radius {
            continue;
        }

        match plane.response.unwrap_or(settings.response) {
            CollisionResponse::Die => particle.life = 0.0,
            CollisionResponse::Bounce => {
                if particle.velocity.dot(plane.normal) < 0.0 {
                    particle.velocity = reflect(particle.velocity, plane.normal) * settings.restitution;
                }
                let penetration = (radius - distance).max(0.0);
                particle.position += plane.normal * penetration;
            }
            CollisionResponse::Stick => particle.velocity = Vector3::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec3;

    fn particle_at(position: Vector3<f32>, velocity: Vector3<f32>) -> Particle {
        Particle {
            position,
            velocity,
            life: 1.0,
            initial_life: 1.0,
            size: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(matches!(
            CollisionPlane::new(Vector3::zero(), 0.0),
            Err(ParticleError::DegeneratePlane)
        ));
    }

    #[test]
    fn test_plane_normalizes_normal() {
        let plane = CollisionPlane::new(vec3(0.0, 2.0, 0.0), 1.0).unwrap();
        assert_eq!(plane.normal(), Vector3::unit_y());
        assert!((plane.signed_distance(vec3(0.0, 3.0, 0.0)) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounce_reverses_normal_velocity_and_depenetrates() {
        let mut p = particle_at(vec3(0.0, -0.1, 0.0), vec3(0.0, -5.0, 0.0));
        let settings = CollisionSettings {
            response: CollisionResponse::Bounce,
            restitution: 1.0,
        };
        resolve_collisions(&mut p, &[CollisionPlane::ground(0.0)], &settings);
        assert!((p.velocity - vec3(0.0, 5.0, 0.0)).magnitude() < 1e-5);
        assert!((p.position.y - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_bounce_scales_whole_velocity_by_restitution() {
        let mut p = particle_at(vec3(0.0, 0.1, 0.0), vec3(2.0, -4.0, 0.0));
        let settings = CollisionSettings {
            response: CollisionResponse::Bounce,
            restitution: 0.5,
        };
        resolve_collisions(&mut p, &[CollisionPlane::ground(0.0)], &settings);
        assert!((p.velocity - vec3(1.0, 2.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_bounce_does_not_reflect_separating_particle() {
        let mut p = particle_at(vec3(0.0, 0.1, 0.0), vec3(0.0, 3.0, 0.0));
        resolve_collisions(&mut p, &[CollisionPlane::ground(0.0)], &CollisionSettings::default());
        assert_eq!(p.velocity, vec3(0.0, 3.0, 0.0));
        assert!(p.position.y >= 0.25 - 1e-6);
    }

    #[test]
    fn test_die_retires_particle() {
        let mut p = particle_at(vec3(0.0, 0.0, 0.0), vec3(0.0, -1.0, 0.0));
        let plane = CollisionPlane::ground(0.0).with_response(CollisionResponse::Die);
        resolve_collisions(&mut p, &[plane], &CollisionSettings::default());
        assert!(!p.is_alive());
    }

    #[test]
    fn test_stick_zeroes_velocity_in_place() {
        let mut p = particle_at(vec3(1.0, 0.1, 1.0), vec3(3.0, -1.0, 0.0));
        let settings = CollisionSettings {
            response: CollisionResponse::Stick,
            restitution: 1.0,
        };
        resolve_collisions(&mut p, &[CollisionPlane::ground(0.0)], &settings);
        assert_eq!(p.velocity, Vector3::zero());
        assert_eq!(p.position, vec3(1.0, 0.1, 1.0));
    }

    #[test]
    fn test_particle_clear_of_plane_is_untouched() {
        let mut p = particle_at(vec3(0.0, 2.0, 0.0), vec3(0.0, -1.0, 0.0));
        resolve_collisions(&mut p, &[CollisionPlane::ground(0.0)], &CollisionSettings::default());
        assert_eq!(p.velocity, vec3(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_multiple_planes_apply_in_order() {
        let floor = CollisionPlane::ground(0.0);
        let wall = CollisionPlane::new(vec3(1.0, 0.0, 0.0), 0.0)
            .unwrap()
            .with_response(CollisionResponse::Stick);
        let mut p = particle_at(vec3(0.0, 0.0, 0.0), vec3(-1.0, -1.0, 0.0));
        let settings = CollisionSettings {
            response: CollisionResponse::Bounce,
            restitution: 1.0,
        };
        resolve_collisions(&mut p, &[floor, wall], &settings);
        assert_eq!(p.velocity, Vector3::zero());
        assert!((p.position.y - 0.25).abs() < 1e-6);
    }
}
