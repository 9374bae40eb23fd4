//! Input mapped to observer actions.
//!
//! Windowing code translates raw key and mouse events into [`MoveKeys`] state
//! and pointer deltas; this crate turns them into [`Action`]s and applies
//! those to a [`roomtrace_stream::Scene`].
//!
//! # Invariants
//! - The scene is only ever changed through actions.
//! - Motion scales with the frame rate so speed does not depend on fps.

pub mod action;

pub use action::{Action, InputConfig, MoveKey, MoveKeys};
