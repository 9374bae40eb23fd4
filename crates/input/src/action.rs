use roomtrace_stream::Scene;
use serde::{Deserialize, Serialize};

/// A high-level action produced by whatever input device is attached.
///
/// The scene consumes actions, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Walk along the observer's forwards and right axes.
    Walk { forward: f32, strafe: f32 },
    /// Turn by yaw/pitch deltas in degrees.
    Look { d_theta: f32, d_phi: f32 },
    ToggleOverlay,
    Quit,
    /// No-op (used for input that hasn't been bound).
    Noop,
}

impl Action {
    /// Apply to the scene. Returns whether the observer changed.
    pub fn apply(self, scene: &mut Scene) -> bool {
        match self {
            Action::Walk { forward, strafe } => {
                let moved = scene.walk(forward, strafe);
                if !moved && (forward != 0.0 || strafe != 0.0) {
                    tracing::trace!(forward, strafe, "walk blocked");
                }
                moved
            }
            Action::Look { d_theta, d_phi } => {
                if d_theta == 0.0 && d_phi == 0.0 {
                    return false;
                }
                scene.spin(d_theta, d_phi);
                true
            }
            Action::ToggleOverlay | Action::Quit | Action::Noop => false,
        }
    }
}

/// Walk and look speeds. Both are per reference frame of 16 ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Cells per reference frame.
    pub walk_speed: f32,
    /// Degrees per pointer pixel per millisecond of frame time.
    pub look_sensitivity: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            walk_speed: 0.1,
            look_sensitivity: 0.05,
        }
    }
}

impl InputConfig {
    /// Pointer delta in pixels to a look action. Moving right or down turns
    /// right or down.
    pub fn look(&self, dx: f32, dy: f32, frame_ms: f32) -> Action {
        if dx == 0.0 && dy == 0.0 {
            return Action::Noop;
        }
        let scale = frame_ms * self.look_sensitivity;
        Action::Look {
            d_theta: -dx * scale,
            d_phi: -dy * scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

/// Which movement keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveKeys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
}

impl MoveKeys {
    pub fn set(&mut self, key: MoveKey, pressed: bool) {
        match key {
            MoveKey::Forward => self.forward = pressed,
            MoveKey::Back => self.back = pressed,
            MoveKey::Left => self.left = pressed,
            MoveKey::Right => self.right = pressed,
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }

    /// Walk action for the held keys at the given update rate. Opposite keys
    /// cancel out.
    pub fn walk(&self, config: &InputConfig, rate: f32) -> Action {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        let forward = axis(self.forward, self.back);
        let strafe = axis(self.right, self.left);
        if forward == 0.0 && strafe == 0.0 {
            return Action::Noop;
        }
        let step = config.walk_speed * rate;
        Action::Walk {
            forward: forward * step,
            strafe: strafe * step,
        }
    }
}
