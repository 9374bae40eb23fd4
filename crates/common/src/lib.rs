//! Shared types: grid coordinates, cell codes, room and mesh identifiers.

pub mod types;

pub use types::{CellCode, GridCoord, MeshHandle, RoomId, PASSABLE};
