use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Material/passability tag stored in every map layer cell.
pub type CellCode = i32;

/// Wall-layer code of a cell that can be walked through and partitioned into rooms.
pub const PASSABLE: CellCode = 0;

/// A cell position in the map grid.
///
/// Rows grow along world +Y, columns along world +X. Signed so that positions
/// outside the map discretise to coordinates that simply miss every lookup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GridCoord {
    pub row: i32,
    pub col: i32,
}

impl GridCoord {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Discretise a continuous world position: row = floor(y), col = floor(x).
    pub fn from_position(pos: Vec3) -> Self {
        Self {
            row: pos.y.floor() as i32,
            col: pos.x.floor() as i32,
        }
    }

    /// The four edge-adjacent neighbours, in north/south/west/east order.
    pub fn neighbors4(self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.row - 1, self.col),
            GridCoord::new(self.row + 1, self.col),
            GridCoord::new(self.row, self.col - 1),
            GridCoord::new(self.row, self.col + 1),
        ]
    }

    /// World-space centre of the cell at the given height.
    pub fn center(self, z: f32) -> Vec3 {
        Vec3::new(self.col as f32 + 0.5, self.row as f32 + 0.5, z)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Index of a room in partition (creation) order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RoomId(pub usize);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// Opaque handle to a static mesh resident on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_position_floors_each_axis() {
        assert_eq!(
            GridCoord::from_position(Vec3::new(2.7, 5.2, 0.5)),
            GridCoord::new(5, 2)
        );
        assert_eq!(
            GridCoord::from_position(Vec3::new(-0.5, 0.0, 0.0)),
            GridCoord::new(0, -1)
        );
    }

    #[test]
    fn neighbors_are_edge_adjacent() {
        let c = GridCoord::new(3, 4);
        for n in c.neighbors4() {
            let d = (n.row - c.row).abs() + (n.col - c.col).abs();
            assert_eq!(d, 1);
        }
    }

    #[test]
    fn coords_order_row_major() {
        let mut v = vec![
            GridCoord::new(1, 0),
            GridCoord::new(0, 5),
            GridCoord::new(0, 1),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                GridCoord::new(0, 1),
                GridCoord::new(0, 5),
                GridCoord::new(1, 0)
            ]
        );
    }

    #[test]
    fn center_is_mid_cell() {
        assert_eq!(GridCoord::new(2, 3).center(0.5), Vec3::new(3.5, 2.5, 0.5));
    }

    #[test]
    fn mesh_handles_key_an_ordered_map() {
        let mut resident = std::collections::BTreeMap::new();
        resident.insert(MeshHandle(3), "c");
        resident.insert(MeshHandle(1), "a");
        resident.insert(MeshHandle(2), "b");
        assert_eq!(resident.values().copied().collect::<String>(), "abc");
    }
}
