//! Room partitioning: connected components of passable cells, per-cell
//! geometry, boundary edge classification and door linking.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use roomtrace_common::{CellCode, GridCoord, RoomId, PASSABLE};

use crate::lookup::SpatialIndex;
use crate::map::{CellVocabulary, GridMap};
use crate::mesh::{Face, StaticMesh, Vertex};
use crate::room::{Door, Room};

/// Classification of a boundary edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Wall,
    Door,
}

/// Where a passable cell meets an impassable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryEdge {
    /// The passable side.
    pub inside: GridCoord,
    /// The impassable side; may lie outside the map.
    pub outside: GridCoord,
    /// Wall code of `outside`, `None` past the map edge.
    pub code: Option<CellCode>,
    pub kind: EdgeKind,
}

/// Legal but suspicious partition results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionWarning {
    /// The room has no interior cells and cannot become active by containment.
    DegenerateRoom { room: RoomId, cells: usize },
}

impl std::fmt::Display for PartitionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionWarning::DegenerateRoom { room, cells } => {
                write!(f, "{room} has {cells} cells and no interior")
            }
        }
    }
}

/// Everything the partitioner hands to the world.
#[derive(Debug)]
pub struct Partition {
    pub rooms: Vec<Room>,
    pub doors: BTreeMap<GridCoord, Door>,
    pub index: SpatialIndex,
    pub edges: Vec<BoundaryEdge>,
    pub warnings: Vec<PartitionWarning>,
}

/// Cells of one connected component before geometry is attached.
#[derive(Debug, Default)]
struct Component {
    boundary: BTreeSet<GridCoord>,
    interior: BTreeSet<GridCoord>,
}

pub struct RoomPartitioner<'a> {
    map: &'a GridMap,
    vocabulary: &'a CellVocabulary,
}

impl<'a> RoomPartitioner<'a> {
    pub fn new(map: &'a GridMap, vocabulary: &'a CellVocabulary) -> Self {
        Self { map, vocabulary }
    }

    pub fn partition(&self) -> Partition {
        let _span = tracing::info_span!("partition_rooms").entered();

        let (components, index) = self.connected_components();

        let mut rooms: Vec<Room> = components
            .into_iter()
            .enumerate()
            .map(|(i, component)| {
                let id = RoomId(i);
                let mut vertices = Vec::new();
                for &cell in component.boundary.iter().chain(&component.interior) {
                    self.cell_geometry(cell, &mut vertices);
                }
                let mesh = StaticMesh::built(id.to_string(), vertices);
                Room::new(id, component.boundary, component.interior, mesh)
            })
            .collect();

        let edges = self.boundary_edges();
        let doors = self.link_doors(&edges, &index, &mut rooms);

        let mut warnings = Vec::new();
        for room in rooms.iter().filter(|r| r.is_degenerate()) {
            tracing::warn!(room = %room.id(), cells = room.cell_count(), "room has no interior cells");
            warnings.push(PartitionWarning::DegenerateRoom {
                room: room.id(),
                cells: room.cell_count(),
            });
        }

        tracing::debug!(
            rooms = rooms.len(),
            doors = doors.len(),
            edges = edges.len(),
            indexed = index.len(),
            "partition complete"
        );

        Partition {
            rooms,
            doors,
            index,
            edges,
            warnings,
        }
    }

    /// Breadth-first flood fill seeded in row-major order, so room ids are stable.
    fn connected_components(&self) -> (Vec<Component>, SpatialIndex) {
        let mut index = SpatialIndex::new();
        let mut components = Vec::new();

        for seed in self.map.coords() {
            if !self.map.is_passable(seed) || index.contains(seed) {
                continue;
            }
            let id = RoomId(components.len());
            let mut component = Component::default();
            let mut queue = VecDeque::from([seed]);
            index.insert(seed, id);

            while let Some(cell) = queue.pop_front() {
                let mut enclosed = true;
                for n in cell.neighbors4() {
                    if !self.map.is_passable(n) {
                        enclosed = false;
                        continue;
                    }
                    if !index.contains(n) {
                        index.insert(n, id);
                        queue.push_back(n);
                    }
                }
                if enclosed {
                    component.interior.insert(cell);
                } else {
                    component.boundary.insert(cell);
                }
            }
            components.push(component);
        }

        (components, index)
    }

    /// Floor, ceiling and solid-wall quads for one passable cell. Door faces are
    /// emitted into the door's own mesh instead.
    fn cell_geometry(&self, cell: GridCoord, out: &mut Vec<Vertex>) {
        if let Some(code) = self.map.floor(cell).filter(|&c| c != PASSABLE) {
            Face::floor(cell, code).push_vertices(out);
        }
        if let Some(code) = self.map.ceiling(cell).filter(|&c| c != PASSABLE) {
            Face::ceiling(cell, code).push_vertices(out);
        }
        for n in cell.neighbors4() {
            match self.map.wall(n) {
                Some(code) if code != PASSABLE && !self.vocabulary.is_door(code) => {
                    Face::wall(cell, n, code).push_vertices(out);
                }
                _ => {}
            }
        }
    }

    /// All passable/impassable edges of the wall layer, classified, in row-major
    /// order of the passable cell.
    pub fn boundary_edges(&self) -> Vec<BoundaryEdge> {
        let mut edges = Vec::new();
        for inside in self.map.coords().filter(|&c| self.map.is_passable(c)) {
            for outside in inside.neighbors4() {
                if self.map.is_passable(outside) {
                    continue;
                }
                let code = self.map.wall(outside);
                edges.push(BoundaryEdge {
                    inside,
                    outside,
                    code,
                    kind: classify_edge(code, self.vocabulary),
                });
            }
        }
        edges
    }

    fn link_doors(
        &self,
        edges: &[BoundaryEdge],
        index: &SpatialIndex,
        rooms: &mut [Room],
    ) -> BTreeMap<GridCoord, Door> {
        let mut faces: BTreeMap<GridCoord, (CellCode, Vec<Vertex>, BTreeSet<RoomId>)> =
            BTreeMap::new();

        for edge in edges.iter().filter(|e| e.kind == EdgeKind::Door) {
            let room = match index.lookup(edge.inside) {
                Ok(room) => room,
                Err(e) => {
                    tracing::warn!(door = %edge.outside, "door edge without a room: {e}");
                    continue;
                }
            };
            let code = edge.code.unwrap_or(self.vocabulary.door_code);
            let entry = faces
                .entry(edge.outside)
                .or_insert_with(|| (code, Vec::new(), BTreeSet::new()));
            Face::wall(edge.inside, edge.outside, code).push_vertices(&mut entry.1);
            entry.2.insert(room);
        }

        let mut doors = BTreeMap::new();
        for (coord, (code, vertices, linked)) in faces {
            let mut door = Door::new(coord, code, StaticMesh::built(format!("door{coord}"), vertices));
            for room in linked {
                door.link_room(room);
                if let Some(r) = rooms.get_mut(room.0) {
                    r.link_door(coord);
                }
            }
            doors.insert(coord, door);
        }
        doors
    }
}

/// Door edges are those whose solid side carries the door code; everything else,
/// including the map edge, is plain wall.
pub fn classify_edge(code: Option<CellCode>, vocabulary: &CellVocabulary) -> EdgeKind {
    match code {
        Some(c) if vocabulary.is_door(c) => EdgeKind::Door,
        _ => EdgeKind::Wall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn partition(walls: Vec<Vec<CellCode>>) -> (GridMap, Partition) {
        let map = GridMap::from_walls(walls, 4, 2).unwrap();
        let vocab = CellVocabulary::default();
        let p = RoomPartitioner::new(&map, &vocab).partition();
        (map, p)
    }

    /// Splitmix64 step, for reproducible pseudo-random maps.
    fn splitmix64(state: &mut u64) -> u64 {
        *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = *state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn random_walls(seed: u64, rows: usize, cols: usize) -> Vec<Vec<CellCode>> {
        let mut state = seed;
        (0..rows)
            .map(|_| {
                (0..cols)
                    .map(|_| match splitmix64(&mut state) % 10 {
                        0..=5 => 0,
                        6 => 7,
                        n => n as CellCode,
                    })
                    .collect()
            })
            .collect()
    }

    /// The built-in demo level: one big room split by a partial wall of 8s,
    /// with door pairs (7) in the outer wall.
    fn demo_walls() -> Vec<Vec<CellCode>> {
        vec![
            vec![6, 6, 6, 7, 7, 6, 6, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![8, 0, 0, 0, 0, 8, 8, 8],
            vec![8, 0, 0, 0, 0, 0, 0, 8],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 6, 6, 7, 7, 6, 6, 6],
        ]
    }

    /// Two regions joined only through the door cell at (3, 4).
    fn two_rooms() -> Vec<Vec<CellCode>> {
        let mut walls = vec![vec![0; 8]; 8];
        for (row, cells) in walls.iter_mut().enumerate() {
            cells[4] = if row == 3 { 7 } else { 6 };
        }
        walls
    }

    fn assert_exact_cover(map: &GridMap, p: &Partition) {
        let mut seen = HashSet::new();
        for room in &p.rooms {
            for &c in room.coords() {
                assert!(map.is_passable(c), "{c} is not passable");
                assert!(seen.insert(c), "{c} appears in two rooms");
                assert!(!(room.boundary().contains(&c) && room.is_interior(c)));
            }
        }
        assert_eq!(seen.len(), map.passable_count());
        assert_eq!(p.index.len(), map.passable_count());
    }

    #[test]
    fn demo_level_is_one_room() {
        let (map, p) = partition(demo_walls());
        assert_eq!(p.rooms.len(), 1);
        assert_exact_cover(&map, &p);
        assert!(!p.rooms[0].is_degenerate());
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn demo_level_exterior_doors_link_one_room() {
        let (_map, p) = partition(demo_walls());
        let coords: Vec<GridCoord> = p.doors.keys().copied().collect();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(0, 3),
                GridCoord::new(0, 4),
                GridCoord::new(7, 3),
                GridCoord::new(7, 4)
            ]
        );
        for door in p.doors.values() {
            assert_eq!(door.rooms().len(), 1);
            assert_eq!(door.code(), 7);
            assert_eq!(door.mesh.vertex_count(), 6);
        }
        assert_eq!(p.rooms[0].doors().len(), 4);
    }

    #[test]
    fn connecting_door_links_both_rooms() {
        let (map, p) = partition(two_rooms());
        assert_eq!(p.rooms.len(), 2);
        assert_exact_cover(&map, &p);

        let door = &p.doors[&GridCoord::new(3, 4)];
        assert_eq!(
            door.rooms().iter().copied().collect::<Vec<_>>(),
            vec![RoomId(0), RoomId(1)]
        );
        assert_eq!(door.other_side(RoomId(0)), Some(RoomId(1)));
        // One face seen from each side.
        assert_eq!(door.mesh.vertex_count(), 12);
    }

    #[test]
    fn room_ids_follow_row_major_seed_order() {
        let (_map, p) = partition(two_rooms());
        assert_eq!(p.index.lookup(GridCoord::new(0, 0)), Ok(RoomId(0)));
        assert_eq!(p.index.lookup(GridCoord::new(0, 5)), Ok(RoomId(1)));
        assert!(p.index.lookup(GridCoord::new(3, 4)).is_err());
    }

    #[test]
    fn interior_cells_have_four_passable_neighbours() {
        let (map, p) = partition(two_rooms());
        for room in &p.rooms {
            for &c in room.interior() {
                assert!(c.neighbors4().iter().all(|&n| map.is_passable(n)));
            }
            for &c in room.boundary() {
                assert!(c.neighbors4().iter().any(|&n| !map.is_passable(n)));
            }
        }
        // Map edge counts as solid, so row 0 is boundary.
        assert!(p.rooms[0].boundary().contains(&GridCoord::new(0, 1)));
        assert!(p.rooms[0].is_interior(GridCoord::new(1, 1)));
        assert!(p.rooms[1].is_interior(GridCoord::new(4, 6)));
    }

    #[test]
    fn isolated_cell_is_a_degenerate_room() {
        let walls = vec![vec![6, 6, 6], vec![6, 0, 6], vec![6, 6, 6]];
        let (map, p) = partition(walls);
        assert_eq!(p.rooms.len(), 1);
        assert_exact_cover(&map, &p);
        assert_eq!(p.rooms[0].cell_count(), 1);
        assert_eq!(
            p.warnings,
            vec![PartitionWarning::DegenerateRoom {
                room: RoomId(0),
                cells: 1
            }]
        );
    }

    #[test]
    fn solid_map_has_no_rooms() {
        let (_map, p) = partition(vec![vec![6; 4]; 4]);
        assert!(p.rooms.is_empty());
        assert!(p.doors.is_empty());
        assert!(p.index.is_empty());
    }

    #[test]
    fn geometry_counts_floor_ceiling_and_walls() {
        // 1x2 corridor of passable cells with solid walls around it.
        let walls = vec![vec![6, 6, 6, 6], vec![6, 0, 0, 6], vec![6, 6, 6, 6]];
        let (_map, p) = partition(walls);
        // Each cell: floor + ceiling + 3 walls = 5 quads = 30 vertices.
        assert_eq!(p.rooms[0].mesh.vertex_count(), 60);
    }

    #[test]
    fn door_faces_go_to_the_door_mesh() {
        let walls = vec![vec![6, 7, 6], vec![6, 0, 6], vec![6, 6, 6]];
        let (_map, p) = partition(walls);
        // floor + ceiling + 3 solid walls; the northern face belongs to the door.
        assert_eq!(p.rooms[0].mesh.vertex_count(), 30);
        assert_eq!(p.doors[&GridCoord::new(0, 1)].mesh.vertex_count(), 6);
    }

    #[test]
    fn edges_are_classified_by_door_code() {
        let map = GridMap::from_walls(demo_walls(), 4, 2).unwrap();
        let vocab = CellVocabulary::default();
        let edges = RoomPartitioner::new(&map, &vocab).boundary_edges();
        let doors: Vec<&BoundaryEdge> =
            edges.iter().filter(|e| e.kind == EdgeKind::Door).collect();
        assert_eq!(doors.len(), 4);
        for e in doors {
            assert_eq!(e.code, Some(7));
        }
        assert!(
            edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Wall)
                .all(|e| e.code != Some(7))
        );
    }

    #[test]
    fn map_edge_is_a_wall_edge() {
        assert_eq!(classify_edge(None, &CellVocabulary::default()), EdgeKind::Wall);
        assert_eq!(classify_edge(Some(7), &CellVocabulary::default()), EdgeKind::Door);
        let custom = CellVocabulary { door_code: 9 };
        assert_eq!(classify_edge(Some(7), &custom), EdgeKind::Wall);
    }

    #[test]
    fn random_maps_are_covered_exactly_once() {
        for seed in 0..32u64 {
            let walls = random_walls(seed, 12, 17);
            let (map, p) = partition(walls);
            assert_exact_cover(&map, &p);

            for (id, room) in p.rooms.iter().enumerate() {
                assert_eq!(room.id(), RoomId(id));
                for &c in room.coords() {
                    assert_eq!(p.index.lookup(c), Ok(room.id()));
                }
            }
        }
    }

    #[test]
    fn random_map_doors_touch_room_boundaries() {
        let vocab = CellVocabulary::default();
        for seed in 100..132u64 {
            let (map, p) = partition(random_walls(seed, 10, 10));
            for (coord, door) in &p.doors {
                assert_eq!(map.wall(*coord), Some(vocab.door_code));
                let touches = coord.neighbors4().iter().any(|&n| {
                    p.rooms
                        .iter()
                        .any(|r| r.boundary().contains(&n))
                });
                assert!(touches, "door {coord} touches no room boundary");
                for room in door.rooms() {
                    assert!(p.rooms[room.0].doors().contains(coord));
                }
            }
        }
    }

    #[test]
    fn repeated_lookups_are_stable() {
        let (map, p) = partition(random_walls(7, 9, 9));
        for c in map.coords() {
            assert_eq!(p.index.lookup(c), p.index.lookup(c));
        }
    }
}
