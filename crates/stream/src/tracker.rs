use std::collections::BTreeSet;

use roomtrace_common::{GridCoord, RoomId};
use roomtrace_kernel::World;
use serde::{Deserialize, Serialize};

/// How far the active set reaches beyond the room that contains the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePolicy {
    /// Only the containing room.
    Occupied,
    /// The containing room plus every room within this many door crossings.
    DoorRadius(u32),
}

/// Active-room tracking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Written as `occupied` or `{ door_radius: N }` in scene files.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub policy: ActivePolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            policy: ActivePolicy::Occupied,
        }
    }
}

/// Per-update tracking statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub active_rooms: usize,
    pub transitions: u64,
    pub misses: u64,
}

/// Maps the observer's cell to the set of rooms whose primitives advance.
///
/// Any cell the spatial index resolves makes its room current, whether it is
/// a boundary or an interior cell. Door cells and cells outside every room
/// resolve to nothing and keep the previous active set.
#[derive(Debug)]
pub struct ActiveRoomTracker {
    pub config: TrackerConfig,
    current: Option<RoomId>,
    active: BTreeSet<RoomId>,
    stats: TrackerStats,
}

impl ActiveRoomTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            current: None,
            active: BTreeSet::new(),
            stats: TrackerStats::default(),
        }
    }

    /// Recompute the active set for an observer at `coord`. Returns `true` when
    /// the containing room changed.
    pub fn update(&mut self, coord: GridCoord, world: &World) -> bool {
        let room = match world.lookup(coord) {
            Ok(room) => room,
            Err(e) => {
                self.stats.misses += 1;
                tracing::trace!("active room unchanged: {e}");
                return false;
            }
        };

        if self.current == Some(room) {
            return false;
        }

        tracing::debug!(from = ?self.current, to = %room, %coord, "active room changed");
        self.current = Some(room);
        self.active = match self.config.policy {
            ActivePolicy::Occupied => BTreeSet::from([room]),
            ActivePolicy::DoorRadius(hops) => world.rooms_within(room, hops),
        };
        self.stats.transitions += 1;
        self.stats.active_rooms = self.active.len();
        true
    }

    /// The room containing the observer, once one has been entered.
    pub fn current(&self) -> Option<RoomId> {
        self.current
    }

    pub fn active(&self) -> &BTreeSet<RoomId> {
        &self.active
    }

    pub fn is_active(&self, room: RoomId) -> bool {
        self.active.contains(&room)
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }
}
