use glam::Vec3;
use roomtrace_common::GridCoord;
use serde::{Deserialize, Serialize};

use crate::map::{CellVocabulary, GridMap};

const PITCH_LIMIT: f32 = 89.0;

/// Collision settings for [`Observer::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// How far ahead, in multiples of the step, the destination cell is probed.
    pub probe: f32,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { probe: 10.0 }
    }
}

/// The moving viewpoint. Z is up; yaw (`theta`) and pitch (`phi`) are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    position: Vec3,
    theta: f32,
    phi: f32,
    forwards: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Observer {
    pub fn new(position: Vec3) -> Self {
        Self::with_angles(position, 0.0, 0.0)
    }

    pub fn with_angles(position: Vec3, theta: f32, phi: f32) -> Self {
        let mut observer = Self {
            position,
            theta: theta.rem_euclid(360.0),
            phi: phi.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            forwards: Vec3::X,
            right: Vec3::NEG_Y,
            up: Vec3::Z,
        };
        observer.recalculate_basis();
        observer
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn forwards(&self) -> Vec3 {
        self.forwards
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Grid cell currently under the observer.
    pub fn coordinate(&self) -> GridCoord {
        GridCoord::from_position(self.position)
    }

    /// Teleport without collision checks.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Turn by `d_theta` / `d_phi` degrees. Yaw wraps, pitch clamps.
    pub fn spin(&mut self, d_theta: f32, d_phi: f32) {
        self.theta = (self.theta + d_theta).rem_euclid(360.0);
        self.phi = (self.phi + d_phi).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.recalculate_basis();
    }

    /// Move along the view direction and strafe axis on the ground plane.
    ///
    /// X and Y are resolved separately so the observer slides along walls: each
    /// axis moves only if the cell `probe` steps ahead is walkable. Returns
    /// whether the position changed.
    pub fn walk(
        &mut self,
        forward: f32,
        strafe: f32,
        map: &GridMap,
        vocabulary: &CellVocabulary,
        config: &WalkConfig,
    ) -> bool {
        let delta = self.forwards * forward + self.right * strafe;
        let before = self.position;

        let probe_x = Vec3::new(self.position.x + config.probe * delta.x, self.position.y, 0.0);
        if walkable(map, vocabulary, GridCoord::from_position(probe_x)) {
            self.position.x += delta.x;
        }
        let probe_y = Vec3::new(self.position.x, self.position.y + config.probe * delta.y, 0.0);
        if walkable(map, vocabulary, GridCoord::from_position(probe_y)) {
            self.position.y += delta.y;
        }

        self.position != before
    }

    fn recalculate_basis(&mut self) {
        let (sin_t, cos_t) = self.theta.to_radians().sin_cos();
        let (sin_p, cos_p) = self.phi.to_radians().sin_cos();
        self.forwards = Vec3::new(cos_t * cos_p, sin_t * cos_p, sin_p);
        self.right = self.forwards.cross(Vec3::Z).normalize();
        self.up = self.right.cross(self.forwards).normalize();
    }
}

fn walkable(map: &GridMap, vocabulary: &CellVocabulary, cell: GridCoord) -> bool {
    map.wall(cell).is_some_and(|code| vocabulary.is_walkable(code))
}
