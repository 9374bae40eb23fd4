use std::collections::BTreeSet;

use roomtrace_common::RoomId;
use roomtrace_kernel::{Light, Observer, Plane, Sphere, World};
use serde::{Deserialize, Serialize};

use crate::bindings;
use crate::device::DeviceContext;
use crate::frame::{FrameCounts, FrameUniform};
use crate::material::MaterialDescriptor;
use crate::records::GpuRecord;
use crate::staging::StagingBuffer;

/// Fixed capacities of the staging buffers, in records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub spheres: usize,
    pub planes: usize,
    pub lights: usize,
    pub materials: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            spheres: 1024,
            planes: 1024,
            lights: 256,
            materials: 64,
        }
    }
}

/// Compute dispatch parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Work-group edge in pixels; must match the compute program.
    pub tile_size: u32,
    pub fov_degrees: f32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tile_size: 16,
            fov_degrees: 60.0,
        }
    }
}

/// Work groups covering a `width × height` image with square tiles.
pub fn workgroups(width: u32, height: u32, tile: u32) -> (u32, u32) {
    let tile = tile.max(1);
    (width.div_ceil(tile), height.div_ceil(tile))
}

/// Everything one frame reads.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub world: &'a World,
    pub active: &'a BTreeSet<RoomId>,
    pub observer: &'a Observer,
    pub materials: &'a [MaterialDescriptor],
    pub resolution: (u32, u32),
}

/// What one frame staged and dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub counts: FrameCounts,
    pub dropped: u64,
    pub floats_uploaded: usize,
    pub groups: (u32, u32),
}

/// Owns the staging buffers and drives the per-frame protocol: stage and flush
/// every buffer, write the frame uniform, dispatch, barrier, draw.
#[derive(Debug)]
pub struct RayTraceDispatch {
    config: DispatchConfig,
    spheres: StagingBuffer<Sphere>,
    planes: StagingBuffer<Plane>,
    lights: StagingBuffer<Light>,
    materials: StagingBuffer<MaterialDescriptor>,
    frames: u64,
}

impl RayTraceDispatch {
    pub fn new(staging: &StagingConfig, config: DispatchConfig) -> Self {
        Self {
            config,
            spheres: StagingBuffer::new("spheres", bindings::SPHERES, staging.spheres),
            planes: StagingBuffer::new("planes", bindings::PLANES, staging.planes),
            lights: StagingBuffer::new("lights", bindings::LIGHTS, staging.lights),
            materials: StagingBuffer::new("materials", bindings::MATERIALS, staging.materials),
            frames: 0,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Records dropped across all buffers since creation.
    pub fn dropped_total(&self) -> u64 {
        self.spheres.dropped() + self.planes.dropped() + self.lights.dropped() + self.materials.dropped()
    }

    pub fn render_frame<D: DeviceContext + ?Sized>(&mut self, device: &mut D, inputs: &FrameInputs<'_>) -> FrameStats {
        let _span = tracing::info_span!("ray_trace_frame", frame = self.frames).entered();
        let dropped_before = self.dropped_total();

        let counts = self.stage(inputs);

        let floats_uploaded = self.spheres.flush(device)
            + self.planes.flush(device)
            + self.lights.flush(device)
            + self.materials.flush(device);
        device.write_frame(&FrameUniform::new(
            inputs.observer,
            counts,
            inputs.resolution,
            self.config.fov_degrees,
        ));

        let groups = workgroups(inputs.resolution.0, inputs.resolution.1, self.config.tile_size);
        device.dispatch_compute(groups.0, groups.1);
        device.memory_barrier();
        device.draw_fullscreen();

        self.frames += 1;
        let dropped = self.dropped_total() - dropped_before;
        if dropped > 0 {
            tracing::warn!(dropped, "staging capacity exceeded, records dropped this frame");
        }
        tracing::trace!(
            spheres = counts.spheres,
            planes = counts.planes,
            lights = counts.lights,
            groups_x = groups.0,
            groups_y = groups.1,
            "frame dispatched"
        );

        FrameStats {
            counts,
            dropped,
            floats_uploaded,
            groups,
        }
    }

    /// Record active rooms' spheres and lights, every plane and every material.
    fn stage(&mut self, inputs: &FrameInputs<'_>) -> FrameCounts {
        let _span = tracing::info_span!("stage_primitives").entered();

        for room in inputs.active.iter().filter_map(|id| inputs.world.room(*id)) {
            for sphere in room.spheres() {
                stage(&mut self.spheres, sphere);
            }
            for light in room.lights() {
                stage(&mut self.lights, light);
            }
        }
        for plane in inputs.world.planes() {
            stage(&mut self.planes, plane);
        }
        for material in inputs.materials {
            stage(&mut self.materials, material);
        }

        FrameCounts {
            spheres: self.spheres.written() as u32,
            planes: self.planes.written() as u32,
            lights: self.lights.written() as u32,
            materials: self.materials.written() as u32,
        }
    }
}

fn stage<R: GpuRecord>(buffer: &mut StagingBuffer<R>, record: &R) {
    if let Err(e) = buffer.push(record) {
        tracing::debug!("{e}");
    }
}
