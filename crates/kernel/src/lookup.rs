use std::collections::HashMap;

use roomtrace_common::{GridCoord, RoomId};

use crate::error::WorldError;

/// Coordinate → owning room, built once by the partitioner and queried every frame.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    cells: HashMap<GridCoord, RoomId>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ownership of a cell. Returns the previous owner, which for a
    /// correct partition is always `None`.
    pub(crate) fn insert(&mut self, coord: GridCoord, room: RoomId) -> Option<RoomId> {
        self.cells.insert(coord, room)
    }

    pub fn lookup(&self, coord: GridCoord) -> Result<RoomId, WorldError> {
        self.cells
            .get(&coord)
            .copied()
            .ok_or(WorldError::CoordinateNotInAnyRoom(coord))
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Number of indexed cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GridCoord, &RoomId)> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hits_and_misses() {
        let mut index = SpatialIndex::new();
        assert!(index.insert(GridCoord::new(1, 1), RoomId(0)).is_none());
        assert_eq!(index.lookup(GridCoord::new(1, 1)), Ok(RoomId(0)));
        assert_eq!(
            index.lookup(GridCoord::new(-3, 9)),
            Err(WorldError::CoordinateNotInAnyRoom(GridCoord::new(-3, 9)))
        );
    }

    #[test]
    fn insert_reports_previous_owner() {
        let mut index = SpatialIndex::new();
        index.insert(GridCoord::new(0, 0), RoomId(0));
        assert_eq!(index.insert(GridCoord::new(0, 0), RoomId(1)), Some(RoomId(0)));
        assert_eq!(index.len(), 1);
    }
}
