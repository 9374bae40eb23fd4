//! Static render geometry generated for rooms and doors.
//!
//! Vertices are interleaved as position(3) uv(2) tangent(3) bitangent(3)
//! normal(3): 14 floats, 56 bytes, attribute slots 0..=4 in that order. The
//! shading pipeline that consumes these buffers depends on this exact layout.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use roomtrace_common::{CellCode, GridCoord, MeshHandle};

use crate::error::WorldError;

pub const VERTEX_FLOATS: usize = 14;
pub const VERTEX_STRIDE: usize = VERTEX_FLOATS * std::mem::size_of::<f32>();

/// Attribute slot, byte offset and component count for each vertex field.
pub const VERTEX_ATTRIBUTES: [(u32, usize, usize); 5] =
    [(0, 0, 3), (1, 12, 2), (2, 20, 3), (3, 32, 3), (4, 44, 3)];

/// Floor sits at z = 0, ceiling at z = WALL_HEIGHT.
pub const WALL_HEIGHT: f32 = 1.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub normal: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_STRIDE);

/// One textured unit quad. `tangent × bitangent = normal`; the normal faces
/// into the cell the quad is visible from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub center: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
    pub material: CellCode,
}

impl Face {
    pub fn floor(cell: GridCoord, material: CellCode) -> Self {
        Self {
            center: cell.center(0.0),
            tangent: Vec3::X,
            bitangent: Vec3::Y,
            normal: Vec3::Z,
            material,
        }
    }

    pub fn ceiling(cell: GridCoord, material: CellCode) -> Self {
        Self {
            center: cell.center(WALL_HEIGHT),
            tangent: Vec3::NEG_X,
            bitangent: Vec3::Y,
            normal: Vec3::NEG_Z,
            material,
        }
    }

    /// The wall between `cell` and the edge-adjacent `toward`, seen from `cell`.
    pub fn wall(cell: GridCoord, toward: GridCoord, material: CellCode) -> Self {
        let step = Vec3::new(
            (toward.col - cell.col) as f32,
            (toward.row - cell.row) as f32,
            0.0,
        );
        let normal = -step;
        Self {
            center: cell.center(WALL_HEIGHT * 0.5) + step * 0.5,
            tangent: Vec3::Z.cross(normal),
            bitangent: Vec3::Z,
            normal,
            material,
        }
    }

    /// Append two counter-clockwise triangles. The material code selects the
    /// atlas row: v spans [material, material + 1).
    pub fn push_vertices(&self, out: &mut Vec<Vertex>) {
        let half_t = self.tangent * 0.5;
        let half_b = self.bitangent * 0.5;
        let row = self.material as f32;
        let corners = [
            (self.center - half_t - half_b, [0.0, row]),
            (self.center + half_t - half_b, [1.0, row]),
            (self.center + half_t + half_b, [1.0, row + 1.0]),
            (self.center - half_t + half_b, [0.0, row + 1.0]),
        ];
        for i in [0, 1, 2, 2, 3, 0] {
            let (position, uv) = corners[i];
            out.push(Vertex {
                position: position.to_array(),
                uv,
                tangent: self.tangent.to_array(),
                bitangent: self.bitangent.to_array(),
                normal: self.normal.to_array(),
            });
        }
    }
}

/// Receives static meshes for GPU residency.
pub trait MeshUploader {
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex]) -> MeshHandle;
}

/// Lifecycle of a static mesh: generated on the CPU, then uploaded exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshState {
    Built { vertices: Vec<Vertex> },
    Uploaded { handle: MeshHandle, vertex_count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticMesh {
    label: String,
    state: MeshState,
}

impl StaticMesh {
    pub fn built(label: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            label: label.into(),
            state: MeshState::Built { vertices },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> &MeshState {
        &self.state
    }

    /// CPU-side vertices; `None` once the mesh lives on the GPU.
    pub fn vertices(&self) -> Option<&[Vertex]> {
        match &self.state {
            MeshState::Built { vertices } => Some(vertices),
            MeshState::Uploaded { .. } => None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match &self.state {
            MeshState::Built { vertices } => vertices.len(),
            MeshState::Uploaded { vertex_count, .. } => *vertex_count,
        }
    }

    pub fn handle(&self) -> Option<MeshHandle> {
        match self.state {
            MeshState::Uploaded { handle, .. } => Some(handle),
            MeshState::Built { .. } => None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self.state, MeshState::Uploaded { .. })
    }

    /// Transition `Built → Uploaded`. A second upload is a programming error.
    pub fn upload<U: MeshUploader + ?Sized>(
        &mut self,
        uploader: &mut U,
    ) -> Result<MeshHandle, WorldError> {
        let MeshState::Built { vertices } = &self.state else {
            return Err(WorldError::MeshAlreadyUploaded {
                label: self.label.clone(),
            });
        };
        let handle = uploader.upload_mesh(&self.label, vertices);
        let vertex_count = vertices.len();
        tracing::debug!(label = %self.label, vertex_count, "mesh uploaded");
        self.state = MeshState::Uploaded {
            handle,
            vertex_count,
        };
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingUploader {
        uploads: Vec<(String, usize)>,
    }

    impl MeshUploader for CountingUploader {
        fn upload_mesh(&mut self, label: &str, vertices: &[Vertex]) -> MeshHandle {
            self.uploads.push((label.to_string(), vertices.len()));
            MeshHandle(self.uploads.len() as u64)
        }
    }

    fn assert_basis(face: &Face) {
        let n = face.tangent.cross(face.bitangent);
        assert!((n - face.normal).length() < 1e-6, "{face:?}");
    }

    #[test]
    fn vertex_layout_is_56_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 56);
        assert_eq!(VERTEX_STRIDE, 56);
        let v = Vertex::zeroed();
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats.len(), VERTEX_FLOATS);
    }

    #[test]
    fn face_bases_are_right_handed() {
        let c = GridCoord::new(2, 2);
        assert_basis(&Face::floor(c, 4));
        assert_basis(&Face::ceiling(c, 2));
        for n in c.neighbors4() {
            assert_basis(&Face::wall(c, n, 6));
        }
    }

    #[test]
    fn wall_faces_point_into_the_cell() {
        let c = GridCoord::new(2, 2);
        let north = Face::wall(c, GridCoord::new(1, 2), 6);
        assert_eq!(north.normal, Vec3::Y);
        assert_eq!(north.center, Vec3::new(2.5, 2.0, 0.5));
        let east = Face::wall(c, GridCoord::new(2, 3), 6);
        assert_eq!(east.normal, Vec3::NEG_X);
        assert_eq!(east.center, Vec3::new(3.0, 2.5, 0.5));
    }

    #[test]
    fn quad_emits_two_triangles_in_cell_bounds() {
        let mut out = Vec::new();
        Face::floor(GridCoord::new(1, 3), 4).push_vertices(&mut out);
        assert_eq!(out.len(), 6);
        for v in &out {
            assert!((3.0..=4.0).contains(&v.position[0]));
            assert!((1.0..=2.0).contains(&v.position[1]));
            assert_eq!(v.position[2], 0.0);
            assert!((4.0..=5.0).contains(&v.uv[1]));
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn upload_happens_once() {
        let mut out = Vec::new();
        Face::floor(GridCoord::new(0, 0), 1).push_vertices(&mut out);
        let mut mesh = StaticMesh::built("room#0", out);
        let mut uploader = CountingUploader {
            uploads: Vec::new(),
        };

        let handle = mesh.upload(&mut uploader).unwrap();
        assert!(mesh.is_uploaded());
        assert_eq!(mesh.handle(), Some(handle));
        assert_eq!(mesh.vertex_count(), 6);
        assert!(mesh.vertices().is_none());

        let err = mesh.upload(&mut uploader).unwrap_err();
        assert_eq!(
            err,
            WorldError::MeshAlreadyUploaded {
                label: "room#0".into()
            }
        );
        assert_eq!(uploader.uploads, vec![("room#0".to_string(), 6)]);
    }
}
