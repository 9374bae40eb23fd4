//! Scene files: map layers, primitives, materials, the observer start and
//! the runtime configuration of every crate, in YAML or JSON.
//!
//! The format is picked from the file extension (`.yaml`/`.yml` or `.json`).
//! Every section except `map` is optional and falls back to its default.
//!
//! # Invariants
//! - A scene file never reaches the partitioner with malformed layers.
//! - Every light and sphere of a loaded scene is owned by exactly one room.

use std::path::{Path, PathBuf};

use glam::Vec3;
use roomtrace_common::{CellCode, GridCoord};
use roomtrace_kernel::{
    CellVocabulary, GridMap, Light, MapError, Observer, Orbit, Plane, Sphere, WalkConfig, World,
    WorldError,
};
use roomtrace_input::InputConfig;
use roomtrace_render::{DispatchConfig, MaterialDescriptor, StagingConfig};
use roomtrace_stream::{Scene, TrackerConfig};
use serde::{Deserialize, Serialize};

/// Errors from loading, saving or building a scene.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported scene file extension: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("malformed map: {0}")]
    Map(#[from] MapError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("map has no passable cell to place the observer in")]
    NoSpawnCell,
}

/// On-disk encoding of a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Yaml,
    Json,
}

impl SceneFormat {
    pub fn from_path(path: &Path) -> Result<Self, AssetError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(AssetError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Runtime configuration gathered from every crate that has some.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub vocabulary: CellVocabulary,
    pub walk: WalkConfig,
    pub tracker: TrackerConfig,
    pub staging: StagingConfig,
    pub dispatch: DispatchConfig,
    pub input: InputConfig,
}

/// The three map layers. Missing floor or ceiling layers are derived from the
/// wall layer: passable cells get `floor_code`/`ceiling_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayers {
    pub walls: Vec<Vec<CellCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors: Option<Vec<Vec<CellCode>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceilings: Option<Vec<Vec<CellCode>>>,
    #[serde(default = "default_surface_code")]
    pub floor_code: CellCode,
    #[serde(default = "default_surface_code")]
    pub ceiling_code: CellCode,
}

fn default_surface_code() -> CellCode {
    1
}

impl MapLayers {
    pub fn to_grid(&self) -> Result<GridMap, MapError> {
        match (&self.floors, &self.ceilings) {
            (None, None) => GridMap::from_walls(self.walls.clone(), self.floor_code, self.ceiling_code),
            _ => {
                let derived = GridMap::from_walls(self.walls.clone(), self.floor_code, self.ceiling_code)?;
                let layer = |given: &Option<Vec<Vec<CellCode>>>, pick: fn(&GridMap, GridCoord) -> Option<CellCode>| {
                    given.clone().unwrap_or_else(|| {
                        (0..derived.rows() as i32)
                            .map(|row| {
                                (0..derived.cols() as i32)
                                    .map(|col| pick(&derived, GridCoord::new(row, col)).unwrap_or(0))
                                    .collect()
                            })
                            .collect()
                    })
                };
                let floors = layer(&self.floors, GridMap::floor);
                let ceilings = layer(&self.ceilings, GridMap::ceiling);
                GridMap::new(self.walls.clone(), floors, ceilings)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSpec {
    pub position: Vec3,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default = "default_strength")]
    pub strength: f32,
    #[serde(default)]
    pub orbit: Orbit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereSpec {
    pub center: Vec3,
    pub radius: f32,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub roughness: f32,
    #[serde(default)]
    pub orbit: Orbit,
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_strength() -> f32 {
    1.0
}

/// Observer start. Angles are degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverSpec {
    pub position: Vec3,
    #[serde(default)]
    pub theta: f32,
    #[serde(default)]
    pub phi: f32,
}

/// A complete scene as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub name: String,
    pub map: MapLayers,
    #[serde(default)]
    pub lights: Vec<LightSpec>,
    #[serde(default)]
    pub spheres: Vec<SphereSpec>,
    #[serde(default)]
    pub planes: Vec<Plane>,
    /// Indexed by cell code.
    #[serde(default)]
    pub materials: Vec<MaterialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer: Option<ObserverSpec>,
    #[serde(default)]
    pub config: SceneConfig,
}

/// Surface codes of the built-in level.
const FLOOR_CODE: CellCode = 4;
const CEILING_CODE: CellCode = 2;

impl SceneFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let format = SceneFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let scene = Self::parse(&text, format)?;
        tracing::debug!(path = %path.display(), name = %scene.name, "scene file loaded");
        Ok(scene)
    }

    pub fn parse(text: &str, format: SceneFormat) -> Result<Self, AssetError> {
        Ok(match format {
            SceneFormat::Yaml => serde_yaml::from_str(text)?,
            SceneFormat::Json => serde_json::from_str(text)?,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        match SceneFormat::from_path(path)? {
            SceneFormat::Yaml => serde_yaml::to_writer(file, self)?,
            SceneFormat::Json => serde_json::to_writer_pretty(file, self)?,
        }
        Ok(())
    }

    /// The built-in level, tiled floor (code 4) under a plaster ceiling (code 2): an 8x8 room split by a partial wall, four door
    /// cells in the outer wall and a light in each quadrant.
    pub fn demo() -> Self {
        let walls = vec![
            vec![6, 6, 6, 7, 7, 6, 6, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![8, 0, 0, 0, 0, 8, 8, 8],
            vec![8, 0, 0, 0, 0, 0, 0, 8],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 0, 0, 0, 0, 0, 0, 6],
            vec![6, 6, 6, 7, 7, 6, 6, 6],
        ];
        let sway = Orbit {
            axis: Vec3::Z,
            radius: 0.25,
            velocity: 0.05,
        };
        let lights = [
            (GridCoord::new(2, 2), Vec3::new(1.0, 0.9, 0.8)),
            (GridCoord::new(5, 2), Vec3::new(0.8, 0.9, 1.0)),
            (GridCoord::new(2, 5), Vec3::new(1.0, 0.8, 0.8)),
            (GridCoord::new(5, 5), Vec3::new(0.8, 1.0, 0.8)),
        ]
        .into_iter()
        .map(|(cell, color)| LightSpec {
            position: cell.center(0.5),
            color,
            strength: 4.0,
            orbit: sway,
        })
        .collect();

        let floor = Plane {
            center: Vec3::new(4.0, 4.0, 0.0),
            normal: Vec3::Z,
            tangent: Vec3::X,
            bitangent: Vec3::Y,
            u_min: -4.0,
            u_max: 4.0,
            v_min: -4.0,
            v_max: 4.0,
            color: Vec3::splat(0.7),
            material: FLOOR_CODE as u32,
        };

        Self {
            name: "demo".into(),
            map: MapLayers {
                walls,
                floors: None,
                ceilings: None,
                floor_code: FLOOR_CODE,
                ceiling_code: CEILING_CODE,
            },
            lights,
            spheres: vec![SphereSpec {
                center: GridCoord::new(5, 3).center(0.4),
                radius: 0.3,
                color: Vec3::new(0.9, 0.3, 0.2),
                roughness: 0.2,
                orbit: Orbit {
                    axis: Vec3::X,
                    radius: 0.5,
                    velocity: 0.03,
                },
            }],
            planes: vec![floor],
            // Indexed by cell code.
            materials: vec![
                MaterialDescriptor::basic("void", Vec3::ZERO),
                MaterialDescriptor::basic("stone", Vec3::splat(0.8)),
                MaterialDescriptor::basic("plaster", Vec3::new(0.85, 0.85, 0.8)),
                MaterialDescriptor::basic("brick", Vec3::new(0.6, 0.3, 0.25)),
                MaterialDescriptor::pbr("tile", Vec3::new(0.9, 0.85, 0.8), 0.0, 0.4, 0.0),
            ],
            observer: Some(ObserverSpec {
                position: GridCoord::new(2, 2).center(0.5),
                theta: 0.0,
                phi: 0.0,
            }),
            config: SceneConfig::default(),
        }
    }

    /// Partition the map and hand every primitive to the room containing it.
    pub fn build_world(&self) -> Result<World, AssetError> {
        let map = self.map.to_grid()?;
        let mut world = World::build(map, self.config.vocabulary);
        for light in &self.lights {
            world.assign_light(Light::new(light.position, light.color, light.strength, light.orbit))?;
        }
        for sphere in &self.spheres {
            world.assign_sphere(Sphere::new(
                sphere.center,
                sphere.radius,
                sphere.color,
                sphere.roughness,
                sphere.orbit,
            ))?;
        }
        for plane in &self.planes {
            world.add_plane(*plane);
        }
        Ok(world)
    }

    /// Build the world and place the observer. Without an explicit start the
    /// observer stands in the first interior cell, or the first room cell if
    /// no room has an interior.
    pub fn build_scene(&self) -> Result<Scene, AssetError> {
        let world = self.build_world()?;
        let observer = match self.observer {
            Some(start) => Observer::with_angles(start.position, start.theta, start.phi),
            None => Observer::new(spawn_cell(&world)?.center(0.5)),
        };
        let scene = Scene::new(world, observer, self.config.tracker.clone(), self.config.walk);
        tracing::info!(
            name = %self.name,
            rooms = scene.world().room_count(),
            doors = scene.world().door_count(),
            lights = scene.world().light_count(),
            spheres = scene.world().sphere_count(),
            "scene built"
        );
        Ok(scene)
    }
}

fn spawn_cell(world: &World) -> Result<GridCoord, AssetError> {
    world
        .rooms()
        .iter()
        .find_map(|room| room.interior().iter().next().copied())
        .or_else(|| world.rooms().iter().find_map(|room| room.coords().next().copied()))
        .ok_or(AssetError::NoSpawnCell)
}
