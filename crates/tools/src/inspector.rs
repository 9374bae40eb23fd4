use std::collections::BTreeSet;
use std::fmt::Write;

use roomtrace_common::{GridCoord, RoomId};
use roomtrace_kernel::World;
use roomtrace_stream::Scene;

/// Read-only queries against a world or scene for debugging and overlays.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene) -> SceneSummary {
        let world = scene.world();
        let map = world.map();
        SceneSummary {
            rows: map.rows(),
            cols: map.cols(),
            passable: map.passable_count(),
            rooms: world.room_count(),
            degenerate_rooms: world.rooms().iter().filter(|r| r.is_degenerate()).count(),
            doors: world.door_count(),
            lights: world.light_count(),
            spheres: world.sphere_count(),
            planes: world.planes().len(),
            current_room: scene.tracker().current(),
            active_rooms: scene.active_rooms().iter().copied().collect(),
        }
    }

    pub fn room_info(world: &World, id: RoomId) -> Option<RoomInfo> {
        let room = world.room(id)?;
        Some(RoomInfo {
            id,
            cells: room.cell_count(),
            interior: room.interior().len(),
            boundary: room.boundary().len(),
            doors: room.doors().iter().copied().collect(),
            neighbors: world.door_neighbors(id),
            lights: room.lights().len(),
            spheres: room.spheres().len(),
            mesh_vertices: room.mesh.vertex_count(),
        })
    }

    pub fn rooms(world: &World) -> Vec<RoomInfo> {
        world
            .rooms()
            .iter()
            .filter_map(|room| Self::room_info(world, room.id()))
            .collect()
    }

    /// One character per cell: room id in base 36 (`*` past that), `+` for a
    /// door, `#` for any other solid cell and `@` for the marked cell.
    pub fn ascii_map(world: &World, marker: Option<GridCoord>) -> String {
        let map = world.map();
        let mut out = String::with_capacity(map.rows() * (map.cols() + 1));
        for row in 0..map.rows() as i32 {
            for col in 0..map.cols() as i32 {
                let coord = GridCoord::new(row, col);
                let glyph = if marker == Some(coord) {
                    '@'
                } else if let Ok(id) = world.lookup(coord) {
                    std::char::from_digit(id.0 as u32, 36).unwrap_or('*')
                } else if world.doors().contains_key(&coord) {
                    '+'
                } else {
                    '#'
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

/// Summary of a scene for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub rows: usize,
    pub cols: usize,
    pub passable: usize,
    pub rooms: usize,
    pub degenerate_rooms: usize,
    pub doors: usize,
    pub lights: usize,
    pub spheres: usize,
    pub planes: usize,
    pub current_room: Option<RoomId>,
    pub active_rooms: Vec<RoomId>,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: {}x{} passable={} rooms={} (degenerate={}) doors={} lights={} spheres={} planes={}",
            self.rows,
            self.cols,
            self.passable,
            self.rooms,
            self.degenerate_rooms,
            self.doors,
            self.lights,
            self.spheres,
            self.planes,
        )?;
        match self.current_room {
            Some(id) => write!(f, " current={id} active={}", self.active_rooms.len()),
            None => write!(f, " current=none"),
        }
    }
}

/// Detailed info about a single room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub cells: usize,
    pub interior: usize,
    pub boundary: usize,
    pub doors: Vec<GridCoord>,
    pub neighbors: BTreeSet<RoomId>,
    pub lights: usize,
    pub spheres: usize,
    pub mesh_vertices: usize,
}

impl std::fmt::Display for RoomInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: cells={} interior={} boundary={} lights={} spheres={} vertices={}",
            self.id, self.cells, self.interior, self.boundary, self.lights, self.spheres, self.mesh_vertices
        )?;
        if !self.doors.is_empty() {
            let mut doors = String::new();
            for (i, d) in self.doors.iter().enumerate() {
                if i > 0 {
                    doors.push(' ');
                }
                let _ = write!(doors, "{d}");
            }
            write!(f, " doors=[{doors}]")?;
        }
        if !self.neighbors.is_empty() {
            let names: Vec<String> = self.neighbors.iter().map(RoomId::to_string).collect();
            write!(f, " neighbors=[{}]", names.join(" "))?;
        }
        Ok(())
    }
}
