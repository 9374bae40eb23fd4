use roomtrace_kernel::{Light, Plane, Sphere};

use crate::material::MaterialDescriptor;

/// A value with a fixed-size float layout in a GPU storage buffer.
pub trait GpuRecord {
    /// Floats per record.
    const STRIDE: usize;

    /// Write exactly `STRIDE` floats into `out`.
    fn write_record(&self, out: &mut [f32]);
}

/// center(3) radius color(3) roughness
impl GpuRecord for Sphere {
    const STRIDE: usize = 8;

    fn write_record(&self, out: &mut [f32]) {
        out[0..3].copy_from_slice(&self.center().to_array());
        out[3] = self.radius;
        out[4..7].copy_from_slice(&self.color.to_array());
        out[7] = self.roughness;
    }
}

/// center(3) u_min tangent(3) u_max bitangent(3) v_min normal(3) v_max color(3) material
impl GpuRecord for Plane {
    const STRIDE: usize = 20;

    fn write_record(&self, out: &mut [f32]) {
        out[0..3].copy_from_slice(&self.center.to_array());
        out[3] = self.u_min;
        out[4..7].copy_from_slice(&self.tangent.to_array());
        out[7] = self.u_max;
        out[8..11].copy_from_slice(&self.bitangent.to_array());
        out[11] = self.v_min;
        out[12..15].copy_from_slice(&self.normal.to_array());
        out[15] = self.v_max;
        out[16..19].copy_from_slice(&self.color.to_array());
        out[19] = self.material as f32;
    }
}

/// position(3) strength color(3) pad
impl GpuRecord for Light {
    const STRIDE: usize = 8;

    fn write_record(&self, out: &mut [f32]) {
        out[0..3].copy_from_slice(&self.position().to_array());
        out[3] = self.strength;
        out[4..7].copy_from_slice(&self.color.to_array());
        out[7] = 0.0;
    }
}

/// albedo(3) emissive glossiness normal pad(2)
impl GpuRecord for MaterialDescriptor {
    const STRIDE: usize = 8;

    fn write_record(&self, out: &mut [f32]) {
        let u = self.uniform_values();
        out[0..3].copy_from_slice(&u.albedo.to_array());
        out[3] = u.emissive;
        out[4] = u.glossiness;
        out[5] = u.normal;
        out[6] = 0.0;
        out[7] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use roomtrace_kernel::Orbit;

    fn encode<R: GpuRecord>(record: &R) -> Vec<f32> {
        let mut out = vec![f32::NAN; R::STRIDE];
        record.write_record(&mut out);
        out
    }

    #[test]
    fn sphere_layout() {
        let s = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, Vec3::new(0.1, 0.2, 0.3), 0.9, Orbit::STATIC);
        assert_eq!(encode(&s), vec![1.0, 2.0, 3.0, 0.5, 0.1, 0.2, 0.3, 0.9]);
    }

    #[test]
    fn plane_layout_interleaves_extent() {
        let p = Plane {
            center: Vec3::new(1.0, 1.0, 0.0),
            normal: Vec3::Z,
            tangent: Vec3::X,
            bitangent: Vec3::Y,
            u_min: -1.0,
            u_max: 2.0,
            v_min: -3.0,
            v_max: 4.0,
            color: Vec3::splat(0.5),
            material: 6,
        };
        assert_eq!(
            encode(&p),
            vec![
                1.0, 1.0, 0.0, -1.0, //
                1.0, 0.0, 0.0, 2.0, //
                0.0, 1.0, 0.0, -3.0, //
                0.0, 0.0, 1.0, 4.0, //
                0.5, 0.5, 0.5, 6.0,
            ]
        );
    }

    #[test]
    fn light_layout_uses_current_position() {
        let mut l = Light::new(
            Vec3::new(2.0, 2.0, 0.5),
            Vec3::ONE,
            3.0,
            Orbit {
                axis: Vec3::X,
                radius: 1.0,
                velocity: 1.0,
            },
        );
        l.motion.advance(std::f32::consts::FRAC_PI_2);
        let out = encode(&l);
        assert!((out[0] - 3.0).abs() < 1e-5);
        assert_eq!(&out[3..], &[3.0, 1.0, 1.0, 1.0, 0.0]);
    }
}
