use std::collections::BTreeSet;

use roomtrace_common::RoomId;
use roomtrace_kernel::{Observer, WalkConfig, World};

use crate::tracker::{ActiveRoomTracker, TrackerConfig};

/// What one update pass did, for overlays and trace output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub current_room: Option<RoomId>,
    pub active_rooms: usize,
    pub advanced: usize,
    pub room_changed: bool,
}

/// World plus observer plus tracker: everything the update phase mutates.
///
/// The dirty flag is raised by anything that changes what the next frame
/// would draw and cleared by the renderer through [`Scene::take_dirty`].
#[derive(Debug)]
pub struct Scene {
    world: World,
    observer: Observer,
    tracker: ActiveRoomTracker,
    walk: WalkConfig,
    dirty: bool,
}

impl Scene {
    pub fn new(world: World, observer: Observer, tracker: TrackerConfig, walk: WalkConfig) -> Self {
        let mut tracker = ActiveRoomTracker::new(tracker);
        tracker.update(observer.coordinate(), &world);
        Self {
            world,
            observer,
            tracker,
            walk,
            dirty: true,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn tracker(&self) -> &ActiveRoomTracker {
        &self.tracker
    }

    pub fn active_rooms(&self) -> &BTreeSet<RoomId> {
        self.tracker.active()
    }

    /// Walk the observer with collision against the wall layer.
    pub fn walk(&mut self, forward: f32, strafe: f32) -> bool {
        let moved = self.observer.walk(
            forward,
            strafe,
            self.world.map(),
            self.world.vocabulary(),
            &self.walk,
        );
        self.dirty |= moved;
        moved
    }

    pub fn spin(&mut self, d_theta: f32, d_phi: f32) {
        if d_theta != 0.0 || d_phi != 0.0 {
            self.observer.spin(d_theta, d_phi);
            self.dirty = true;
        }
    }

    /// Recompute the active set from the observer's cell, then advance the
    /// primitives of active rooms by `rate`. Inactive rooms are left untouched.
    pub fn update(&mut self, rate: f32) -> SceneStats {
        let _span = tracing::info_span!("scene_update").entered();

        let room_changed = self.tracker.update(self.observer.coordinate(), &self.world);
        let advanced = self.world.advance_rooms(self.tracker.active(), rate);
        self.dirty |= room_changed || advanced > 0;

        let stats = SceneStats {
            current_room: self.tracker.current(),
            active_rooms: self.tracker.active().len(),
            advanced,
            room_changed,
        };
        tracing::trace!(
            active = stats.active_rooms,
            advanced = stats.advanced,
            "scene update complete"
        );
        stats
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use roomtrace_kernel::{CellVocabulary, GridMap, Light, Orbit};

    fn orbit() -> Orbit {
        Orbit {
            axis: Vec3::Z,
            radius: 0.25,
            velocity: 1.0,
        }
    }

    /// 8x8 map, regions A (cols 0..=3) and B (cols 5..=7) joined by the door at
    /// (3, 4), with one orbiting light in each region.
    fn two_region_scene(start: Vec3) -> Scene {
        let mut walls = vec![vec![0; 8]; 8];
        for (row, cells) in walls.iter_mut().enumerate() {
            cells[4] = if row == 3 { 7 } else { 6 };
        }
        let mut world = World::build(
            GridMap::from_walls(walls, 4, 2).unwrap(),
            CellVocabulary::default(),
        );
        world
            .assign_light(Light::new(Vec3::new(1.5, 1.5, 0.5), Vec3::ONE, 1.0, orbit()))
            .unwrap();
        world
            .assign_light(Light::new(Vec3::new(6.5, 6.5, 0.5), Vec3::ONE, 1.0, orbit()))
            .unwrap();
        Scene::new(
            world,
            Observer::new(start),
            TrackerConfig::default(),
            WalkConfig::default(),
        )
    }

    fn light_phase(scene: &Scene, room: usize) -> f32 {
        scene.world().rooms()[room].lights()[0].motion.phase()
    }

    #[test]
    fn only_active_room_lights_advance() {
        let mut scene = two_region_scene(Vec3::new(2.5, 2.5, 0.5));
        let stats = scene.update(1.0);
        assert_eq!(stats.current_room, Some(RoomId(0)));
        assert_eq!(stats.advanced, 1);
        assert_eq!(light_phase(&scene, 0), 1.0);
        assert_eq!(light_phase(&scene, 1), 0.0);
    }

    #[test]
    fn walking_through_the_door_moves_activity() {
        let mut scene = two_region_scene(Vec3::new(2.5, 3.5, 0.5));
        scene.update(1.0);
        let b_before = scene.world().rooms()[1].lights()[0].position();

        // Step east along row 3 in small strides until the observer is inside B.
        let mut steps = 0;
        while scene.observer().coordinate().col < 6 {
            assert!(scene.walk(0.05, 0.0), "walk blocked at {}", scene.observer().coordinate());
            scene.update(0.0);
            steps += 1;
            assert!(steps < 200);
        }

        let a_phase = light_phase(&scene, 0);
        let stats = scene.update(1.0);
        assert_eq!(stats.current_room, Some(RoomId(1)));
        assert_eq!(light_phase(&scene, 0), a_phase);
        assert_ne!(scene.world().rooms()[1].lights()[0].position(), b_before);
    }

    #[test]
    fn dirty_flag_tracks_changes() {
        let mut scene = two_region_scene(Vec3::new(2.5, 2.5, 0.5));
        assert!(scene.take_dirty());
        assert!(!scene.is_dirty());

        scene.spin(0.0, 0.0);
        assert!(!scene.is_dirty());
        scene.spin(10.0, 0.0);
        assert!(scene.take_dirty());

        scene.update(0.5);
        assert!(scene.take_dirty());
    }

    #[test]
    fn observer_outside_the_map_advances_nothing() {
        let mut scene = two_region_scene(Vec3::new(-3.0, -3.0, 0.5));
        let stats = scene.update(1.0);
        assert_eq!(stats.current_room, None);
        assert_eq!(stats.advanced, 0);
        assert_eq!(light_phase(&scene, 0), 0.0);
    }
}
