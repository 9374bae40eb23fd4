//! World kernel: static grid map, room partitioning, room/door ownership,
//! the coordinate → room spatial index, dynamic primitives and the observer.
//!
//! # Invariants
//! - Every passable cell belongs to exactly one room.
//! - The map is immutable once the world is built.
//! - A primitive is owned by exactly one room once assigned.
//! - Room and door meshes are uploaded to the GPU at most once.

pub mod error;
pub mod lookup;
pub mod map;
pub mod mesh;
pub mod observer;
pub mod partition;
pub mod primitives;
pub mod room;
pub mod world;

pub use error::WorldError;
pub use lookup::SpatialIndex;
pub use map::{CellVocabulary, GridMap, Layer, MapError};
pub use mesh::{Face, MeshState, MeshUploader, StaticMesh, Vertex, VERTEX_FLOATS, VERTEX_STRIDE};
pub use observer::{Observer, WalkConfig};
pub use partition::{BoundaryEdge, EdgeKind, Partition, PartitionWarning, RoomPartitioner};
pub use primitives::{Light, Motion, Orbit, Plane, Sphere};
pub use room::{Door, Room};
pub use world::World;
