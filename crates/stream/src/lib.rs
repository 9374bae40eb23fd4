//! Per-frame update phase: which rooms are active around the observer, motion
//! integration scoped to those rooms, and frame timing.
//!
//! # Invariants
//! - The active set is recomputed every update from the observer's cell.
//! - Primitives of inactive rooms never advance.
//! - The update phase never touches GPU state; it only raises the dirty flag.

mod clock;
mod scene;
mod tracker;

pub use clock::{FrameClock, REFERENCE_FRAME_MS};
pub use scene::{Scene, SceneStats};
pub use tracker::{ActivePolicy, ActiveRoomTracker, TrackerConfig, TrackerStats};
