use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Sinusoidal motion along an axis. A zero radius means the primitive is static.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub axis: Vec3,
    pub radius: f32,
    pub velocity: f32,
}

impl Orbit {
    pub const STATIC: Orbit = Orbit {
        axis: Vec3::Z,
        radius: 0.0,
        velocity: 0.0,
    };

    pub fn is_static(&self) -> bool {
        self.radius == 0.0
    }

    /// Displacement from the rest centre at phase `t`.
    pub fn offset(&self, t: f32) -> Vec3 {
        self.axis * self.radius * (self.velocity * t).sin()
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self::STATIC
    }
}

/// Rest centre plus an orbit and its phase accumulator.
///
/// Position is a pure function of (centre, phase): advancing by zero never
/// moves the primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    center: Vec3,
    orbit: Orbit,
    phase: f32,
}

impl Motion {
    pub fn new(center: Vec3, orbit: Orbit) -> Self {
        Self {
            center,
            orbit,
            phase: 0.0,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn orbit(&self) -> &Orbit {
        &self.orbit
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn position(&self) -> Vec3 {
        if self.orbit.is_static() {
            self.center
        } else {
            self.center + self.orbit.offset(self.phase)
        }
    }

    /// Accumulate `rate` into the phase and return the new position.
    pub fn advance(&mut self, rate: f32) -> Vec3 {
        self.phase += rate;
        self.position()
    }
}

/// A point light. Not `Clone`: a light is moved into exactly one room.
#[derive(Debug, PartialEq)]
pub struct Light {
    pub motion: Motion,
    pub color: Vec3,
    pub strength: f32,
}

impl Light {
    pub fn new(position: Vec3, color: Vec3, strength: f32, orbit: Orbit) -> Self {
        Self {
            motion: Motion::new(position, orbit),
            color,
            strength,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.motion.position()
    }
}

/// A dynamic sphere primitive. Not `Clone`, for the same reason as [`Light`].
#[derive(Debug, PartialEq)]
pub struct Sphere {
    pub motion: Motion,
    pub radius: f32,
    pub color: Vec3,
    pub roughness: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, color: Vec3, roughness: f32, orbit: Orbit) -> Self {
        Self {
            motion: Motion::new(center, orbit),
            radius,
            color,
            roughness,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.motion.position()
    }
}

/// A bounded, textured plane. Static and GPU-only.
///
/// The extent is measured from `center` along `tangent` (u) and `bitangent` (v).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub center: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub u_min: f32,
    pub u_max: f32,
    pub v_min: f32,
    pub v_max: f32,
    pub color: Vec3,
    pub material: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbiting() -> Motion {
        Motion::new(
            Vec3::new(2.0, 2.0, 0.5),
            Orbit {
                axis: Vec3::Z,
                radius: 0.25,
                velocity: 1.5,
            },
        )
    }

    #[test]
    fn static_motion_never_moves() {
        let mut m = Motion::new(Vec3::new(1.0, 2.0, 3.0), Orbit::STATIC);
        for _ in 0..10 {
            assert_eq!(m.advance(0.7), Vec3::new(1.0, 2.0, 3.0));
        }
        assert!((m.phase() - 7.0).abs() < 1e-5);
    }

    #[test]
    fn orbit_follows_sine_law() {
        let mut m = orbiting();
        m.advance(0.4);
        let t0 = m.phase();
        let dt = 1.1;
        let pos = m.advance(dt);
        let expected = Vec3::new(2.0, 2.0, 0.5) + Vec3::Z * 0.25 * (1.5 * (t0 + dt)).sin();
        assert!((pos - expected).length() < 1e-6);
    }

    #[test]
    fn zero_rate_is_idempotent() {
        let mut m = orbiting();
        m.advance(0.9);
        let before = m.position();
        assert_eq!(m.advance(0.0), before);
        assert_eq!(m.position(), before);
    }

    #[test]
    fn new_primitives_start_at_rest_centre() {
        let light = Light::new(Vec3::ONE, Vec3::X, 1.0, Orbit::default());
        assert_eq!(light.position(), Vec3::ONE);

        let sphere = Sphere::new(
            Vec3::new(3.0, 3.0, 0.5),
            0.2,
            Vec3::Y,
            0.1,
            Orbit {
                axis: Vec3::X,
                radius: 1.0,
                velocity: 2.0,
            },
        );
        assert_eq!(sphere.center(), Vec3::new(3.0, 3.0, 0.5));
    }
}
