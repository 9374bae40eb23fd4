use std::collections::BTreeSet;

use roomtrace_common::{CellCode, GridCoord, RoomId};

use crate::mesh::StaticMesh;
use crate::primitives::{Light, Sphere};

/// A maximal 4-connected region of passable cells.
///
/// Boundary cells touch at least one solid (or out-of-bounds) cell; interior
/// cells have four passable neighbours. Only interior cells count for
/// "observer is inside this room" tests.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    boundary: BTreeSet<GridCoord>,
    interior: BTreeSet<GridCoord>,
    doors: BTreeSet<GridCoord>,
    lights: Vec<Light>,
    spheres: Vec<Sphere>,
    pub mesh: StaticMesh,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        boundary: BTreeSet<GridCoord>,
        interior: BTreeSet<GridCoord>,
        mesh: StaticMesh,
    ) -> Self {
        Self {
            id,
            boundary,
            interior,
            doors: BTreeSet::new(),
            lights: Vec::new(),
            spheres: Vec::new(),
            mesh,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn boundary(&self) -> &BTreeSet<GridCoord> {
        &self.boundary
    }

    pub fn interior(&self) -> &BTreeSet<GridCoord> {
        &self.interior
    }

    /// Boundary and interior cells, boundary first.
    pub fn coords(&self) -> impl Iterator<Item = &GridCoord> {
        self.boundary.iter().chain(self.interior.iter())
    }

    pub fn cell_count(&self) -> usize {
        self.boundary.len() + self.interior.len()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.boundary.contains(&coord) || self.interior.contains(&coord)
    }

    pub fn is_interior(&self, coord: GridCoord) -> bool {
        self.interior.contains(&coord)
    }

    /// A room without interior cells can never become active by containment.
    pub fn is_degenerate(&self) -> bool {
        self.interior.is_empty()
    }

    pub fn doors(&self) -> &BTreeSet<GridCoord> {
        &self.doors
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub(crate) fn link_door(&mut self, door: GridCoord) {
        self.doors.insert(door);
    }

    pub(crate) fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub(crate) fn add_sphere(&mut self, sphere: Sphere) {
        self.spheres.push(sphere);
    }

    /// Advance every owned light and sphere. Returns how many primitives moved.
    pub(crate) fn advance(&mut self, rate: f32) -> usize {
        for light in &mut self.lights {
            light.motion.advance(rate);
        }
        for sphere in &mut self.spheres {
            sphere.motion.advance(rate);
        }
        self.lights.len() + self.spheres.len()
    }
}

/// A door cell: a solid wall cell carrying the door code that borders one or two rooms.
#[derive(Debug)]
pub struct Door {
    coordinate: GridCoord,
    code: CellCode,
    rooms: BTreeSet<RoomId>,
    pub mesh: StaticMesh,
}

impl Door {
    pub(crate) fn new(coordinate: GridCoord, code: CellCode, mesh: StaticMesh) -> Self {
        Self {
            coordinate,
            code,
            rooms: BTreeSet::new(),
            mesh,
        }
    }

    pub fn coordinate(&self) -> GridCoord {
        self.coordinate
    }

    pub fn code(&self) -> CellCode {
        self.code
    }

    /// Rooms this door opens onto; one for exterior doors, two for connecting doors.
    pub fn rooms(&self) -> &BTreeSet<RoomId> {
        &self.rooms
    }

    pub(crate) fn link_room(&mut self, room: RoomId) {
        self.rooms.insert(room);
    }

    /// The room on the other side of this door from `from`, if any.
    pub fn other_side(&self, from: RoomId) -> Option<RoomId> {
        self.rooms.iter().copied().find(|&r| r != from)
    }
}
