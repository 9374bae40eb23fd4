use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec3;
use roomtrace_common::{CellCode, GridCoord, RoomId};

use crate::error::WorldError;
use crate::lookup::SpatialIndex;
use crate::map::{CellVocabulary, GridMap};
use crate::mesh::MeshUploader;
use crate::partition::{Partition, PartitionWarning, RoomPartitioner};
use crate::primitives::{Light, Plane, Sphere};
use crate::room::{Door, Room};

/// The authoritative static world: the map, its rooms and doors, the spatial
/// index and every primitive assigned to a room.
///
/// Rooms and doors are iterated in creation/coordinate order, so every derived
/// view (staging order, inspector output) is deterministic.
#[derive(Debug)]
pub struct World {
    map: GridMap,
    vocabulary: CellVocabulary,
    rooms: Vec<Room>,
    doors: BTreeMap<GridCoord, Door>,
    index: SpatialIndex,
    planes: Vec<Plane>,
    warnings: Vec<PartitionWarning>,
}

impl World {
    /// Partition `map` and take ownership of everything the partitioner produced.
    pub fn build(map: GridMap, vocabulary: CellVocabulary) -> Self {
        let _span = tracing::info_span!("build_world", rows = map.rows(), cols = map.cols()).entered();
        let Partition {
            rooms,
            doors,
            index,
            warnings,
            ..
        } = RoomPartitioner::new(&map, &vocabulary).partition();
        tracing::info!(rooms = rooms.len(), doors = doors.len(), "world built");
        Self {
            map,
            vocabulary,
            rooms,
            doors,
            index,
            planes: Vec::new(),
            warnings,
        }
    }

    /// Validate raw layers and build. Malformed layers abort construction.
    pub fn from_layers(
        walls: Vec<Vec<CellCode>>,
        floors: Vec<Vec<CellCode>>,
        ceilings: Vec<Vec<CellCode>>,
        vocabulary: CellVocabulary,
    ) -> Result<Self, WorldError> {
        let map = GridMap::new(walls, floors, ceilings)?;
        Ok(Self::build(map, vocabulary))
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn vocabulary(&self) -> &CellVocabulary {
        &self.vocabulary
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn doors(&self) -> &BTreeMap<GridCoord, Door> {
        &self.doors
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn warnings(&self) -> &[PartitionWarning] {
        &self.warnings
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn add_plane(&mut self, plane: Plane) {
        self.planes.push(plane);
    }

    pub fn lookup(&self, coord: GridCoord) -> Result<RoomId, WorldError> {
        self.index.lookup(coord)
    }

    /// Room owning the cell under a world-space position.
    pub fn room_at(&self, position: Vec3) -> Result<RoomId, WorldError> {
        self.index.lookup(GridCoord::from_position(position))
    }

    /// Assign a light to the room containing it. The light is consumed, so it can
    /// never be owned by two rooms.
    pub fn assign_light(&mut self, light: Light) -> Result<RoomId, WorldError> {
        let id = self.room_at(light.position())?;
        tracing::debug!(room = %id, "light assigned");
        self.rooms[id.0].add_light(light);
        Ok(id)
    }

    pub fn assign_sphere(&mut self, sphere: Sphere) -> Result<RoomId, WorldError> {
        let id = self.room_at(sphere.center())?;
        tracing::debug!(room = %id, "sphere assigned");
        self.rooms[id.0].add_sphere(sphere);
        Ok(id)
    }

    /// Rooms reachable from `room` through exactly one door.
    pub fn door_neighbors(&self, room: RoomId) -> BTreeSet<RoomId> {
        let Some(r) = self.room(room) else {
            return BTreeSet::new();
        };
        r.doors()
            .iter()
            .filter_map(|coord| self.doors.get(coord))
            .filter_map(|door| door.other_side(room))
            .collect()
    }

    /// Rooms within `hops` door crossings of `start`, `start` included.
    pub fn rooms_within(&self, start: RoomId, hops: u32) -> BTreeSet<RoomId> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([(start, 0u32)]);
        while let Some((room, depth)) = queue.pop_front() {
            if depth == hops {
                continue;
            }
            for next in self.door_neighbors(room) {
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        seen
    }

    /// Advance every primitive owned by the given rooms. Unknown ids are skipped.
    /// Returns the number of primitives advanced.
    pub fn advance_rooms<'a>(&mut self, rooms: impl IntoIterator<Item = &'a RoomId>, rate: f32) -> usize {
        let mut advanced = 0;
        for id in rooms {
            if let Some(room) = self.rooms.get_mut(id.0) {
                advanced += room.advance(rate);
            }
        }
        advanced
    }

    /// Upload every room mesh, then every door mesh, exactly once.
    pub fn upload_meshes<U: MeshUploader + ?Sized>(&mut self, uploader: &mut U) -> Result<usize, WorldError> {
        let mut uploaded = 0;
        for room in &mut self.rooms {
            room.mesh.upload(uploader)?;
            uploaded += 1;
        }
        for door in self.doors.values_mut() {
            door.mesh.upload(uploader)?;
            uploaded += 1;
        }
        tracing::info!(uploaded, "static meshes resident");
        Ok(uploaded)
    }

    pub fn light_count(&self) -> usize {
        self.rooms.iter().map(|r| r.lights().len()).sum()
    }

    pub fn sphere_count(&self) -> usize {
        self.rooms.iter().map(|r| r.spheres().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapError;
    use crate::mesh::Vertex;
    use crate::primitives::Orbit;
    use roomtrace_common::MeshHandle;

    /// Three rooms in a row joined by doors at (1, 2) and (1, 5).
    fn corridor_world() -> World {
        let walls = vec![
            vec![6, 6, 6, 6, 6, 6, 6, 6],
            vec![0, 0, 7, 0, 0, 7, 0, 0],
            vec![6, 6, 6, 6, 6, 6, 6, 6],
        ];
        World::build(GridMap::from_walls(walls, 4, 2).unwrap(), CellVocabulary::default())
    }

    fn two_region_world() -> World {
        let mut walls = vec![vec![0; 8]; 8];
        for (row, cells) in walls.iter_mut().enumerate() {
            cells[4] = if row == 3 { 7 } else { 6 };
        }
        World::build(GridMap::from_walls(walls, 4, 2).unwrap(), CellVocabulary::default())
    }

    fn orbiting() -> Orbit {
        Orbit {
            axis: Vec3::Z,
            radius: 0.2,
            velocity: 1.0,
        }
    }

    struct Sink(u64);

    impl MeshUploader for Sink {
        fn upload_mesh(&mut self, _label: &str, _vertices: &[Vertex]) -> MeshHandle {
            self.0 += 1;
            MeshHandle(self.0)
        }
    }

    #[test]
    fn malformed_layers_abort_construction() {
        let err = World::from_layers(
            vec![vec![0, 0], vec![0]],
            vec![vec![0, 0], vec![0, 0]],
            vec![vec![0, 0], vec![0, 0]],
            CellVocabulary::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WorldError::MalformedMap(MapError::RaggedRow { .. })));
    }

    #[test]
    fn assignment_moves_entities_into_rooms() {
        let mut w = two_region_world();
        let a = w
            .assign_light(Light::new(Vec3::new(1.5, 1.5, 0.5), Vec3::ONE, 1.0, Orbit::STATIC))
            .unwrap();
        let b = w
            .assign_sphere(Sphere::new(Vec3::new(6.5, 6.5, 0.3), 0.2, Vec3::X, 0.5, Orbit::STATIC))
            .unwrap();
        assert_eq!(a, RoomId(0));
        assert_eq!(b, RoomId(1));
        assert_eq!(w.rooms()[0].lights().len(), 1);
        assert_eq!(w.rooms()[1].spheres().len(), 1);
        assert_eq!(w.light_count(), 1);
        assert_eq!(w.sphere_count(), 1);
    }

    #[test]
    fn assignment_outside_any_room_fails() {
        let mut w = two_region_world();
        let err = w
            .assign_light(Light::new(Vec3::new(4.5, 0.5, 0.5), Vec3::ONE, 1.0, Orbit::STATIC))
            .unwrap_err();
        assert_eq!(err, WorldError::CoordinateNotInAnyRoom(GridCoord::new(0, 4)));

        let err = w
            .assign_sphere(Sphere::new(Vec3::new(-1.0, 3.0, 0.5), 0.2, Vec3::X, 0.0, Orbit::STATIC))
            .unwrap_err();
        assert_eq!(err, WorldError::CoordinateNotInAnyRoom(GridCoord::new(3, -1)));
        assert_eq!(w.light_count() + w.sphere_count(), 0);
    }

    #[test]
    fn door_graph_hops() {
        let w = corridor_world();
        assert_eq!(w.room_count(), 3);
        assert_eq!(w.door_count(), 2);
        assert_eq!(w.door_neighbors(RoomId(1)), BTreeSet::from([RoomId(0), RoomId(2)]));
        assert_eq!(w.rooms_within(RoomId(0), 0), BTreeSet::from([RoomId(0)]));
        assert_eq!(w.rooms_within(RoomId(0), 1), BTreeSet::from([RoomId(0), RoomId(1)]));
        assert_eq!(w.rooms_within(RoomId(0), 2).len(), 3);
        assert!(w.door_neighbors(RoomId(42)).is_empty());
    }

    #[test]
    fn only_requested_rooms_advance() {
        let mut w = two_region_world();
        let start_a = Vec3::new(1.5, 1.5, 0.5);
        let start_b = Vec3::new(6.5, 6.5, 0.5);
        w.assign_light(Light::new(start_a, Vec3::ONE, 1.0, orbiting())).unwrap();
        w.assign_light(Light::new(start_b, Vec3::ONE, 1.0, orbiting())).unwrap();

        let advanced = w.advance_rooms(&[RoomId(0)], 0.5);
        assert_eq!(advanced, 1);
        assert_ne!(w.rooms()[0].lights()[0].position(), start_a);
        assert_eq!(w.rooms()[1].lights()[0].position(), start_b);

        assert_eq!(w.advance_rooms(&[RoomId(9)], 0.5), 0);
    }

    #[test]
    fn meshes_upload_once() {
        let mut w = two_region_world();
        let mut sink = Sink(0);
        assert_eq!(w.upload_meshes(&mut sink).unwrap(), 3);
        assert!(w.rooms().iter().all(|r| r.mesh.is_uploaded()));
        assert!(matches!(
            w.upload_meshes(&mut sink),
            Err(WorldError::MeshAlreadyUploaded { .. })
        ));
        assert_eq!(sink.0, 3);
    }

    #[test]
    fn room_at_discretises_position() {
        let w = two_region_world();
        assert_eq!(w.room_at(Vec3::new(0.99, 7.99, 0.0)), Ok(RoomId(0)));
        assert_eq!(w.room_at(Vec3::new(5.0, 0.0, 0.0)), Ok(RoomId(1)));
        assert!(w.room_at(Vec3::new(4.2, 3.5, 0.0)).is_err());
    }
}
