//! Backend-agnostic half of the ray tracer: typed GPU records, fixed-capacity
//! staging buffers, material descriptors and the per-frame dispatch protocol.
//!
//! # Invariants
//! - A staging buffer never writes past `capacity * stride` floats.
//! - A flush uploads exactly `written * stride` floats and resets the count.
//! - Every frame runs stage → compute dispatch → memory barrier → fullscreen draw.
//! - The renderer never mutates world truth.

mod device;
mod dispatch;
mod frame;
mod material;
mod records;
mod staging;

pub use device::{DeviceCommand, DeviceContext, RecordingDevice};
pub use dispatch::{DispatchConfig, FrameInputs, FrameStats, RayTraceDispatch, StagingConfig, workgroups};
pub use frame::{FrameCounts, FrameUniform};
pub use material::{Channel, ChannelSet, MaterialDescriptor};
pub use records::GpuRecord;
pub use staging::{StagingBuffer, StagingError};

/// Compute-program binding slots.
pub mod bindings {
    pub const IMAGE: u32 = 0;
    pub const SPHERES: u32 = 1;
    pub const PLANES: u32 = 2;
    pub const LIGHTS: u32 = 3;
    pub const MATERIALS: u32 = 4;
    pub const FRAME: u32 = 5;
}
