//! Developer tooling: read-only views over a built scene.
//!
//! # Invariants
//! - Tools never mutate world or scene state.

pub mod inspector;

pub use inspector::{RoomInfo, SceneInspector, SceneSummary};
