use bytemuck::{Pod, Zeroable};
use roomtrace_kernel::Observer;

/// Element counts of each staged buffer for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounts {
    pub spheres: u32,
    pub planes: u32,
    pub lights: u32,
    pub materials: u32,
}

/// Per-frame uniform at binding 5. Layout matches the WGSL `Frame` struct:
/// each vec3 is padded by the following count.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub position: [f32; 3],
    pub sphere_count: u32,
    pub forwards: [f32; 3],
    pub plane_count: u32,
    pub right: [f32; 3],
    pub light_count: u32,
    pub up: [f32; 3],
    pub material_count: u32,
    pub resolution: [u32; 2],
    pub tan_half_fov: f32,
    pub aspect: f32,
}

const _: () = assert!(std::mem::size_of::<FrameUniform>() == 80);

impl FrameUniform {
    pub fn new(observer: &Observer, counts: FrameCounts, resolution: (u32, u32), fov_degrees: f32) -> Self {
        let (width, height) = (resolution.0.max(1), resolution.1.max(1));
        Self {
            position: observer.position().to_array(),
            sphere_count: counts.spheres,
            forwards: observer.forwards().to_array(),
            plane_count: counts.planes,
            right: observer.right().to_array(),
            light_count: counts.lights,
            up: observer.up().to_array(),
            material_count: counts.materials,
            resolution: [width, height],
            tan_half_fov: (fov_degrees.to_radians() * 0.5).tan(),
            aspect: width as f32 / height as f32,
        }
    }

    pub fn counts(&self) -> FrameCounts {
        FrameCounts {
            spheres: self.sphere_count,
            planes: self.plane_count,
            lights: self.light_count,
            materials: self.material_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uniform_carries_basis_and_counts() {
        let observer = Observer::new(Vec3::new(1.0, 2.0, 0.5));
        let counts = FrameCounts {
            spheres: 3,
            planes: 1,
            lights: 4,
            materials: 9,
        };
        let u = FrameUniform::new(&observer, counts, (800, 400), 90.0);
        assert_eq!(u.position, [1.0, 2.0, 0.5]);
        assert_eq!(u.counts(), counts);
        assert_eq!(u.aspect, 2.0);
        assert!((u.tan_half_fov - 1.0).abs() < 1e-6);
        assert_eq!(bytemuck::bytes_of(&u).len(), 80);
    }

    #[test]
    fn zero_sized_resolution_is_clamped() {
        let u = FrameUniform::new(&Observer::new(Vec3::ZERO), FrameCounts::default(), (0, 0), 60.0);
        assert_eq!(u.resolution, [1, 1]);
        assert_eq!(u.aspect, 1.0);
    }
}
