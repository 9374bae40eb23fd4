//! wgpu backend for the room ray tracer.
//!
//! A compute program writes one pixel per invocation into a storage image,
//! then a fullscreen triangle samples that image onto the surface.
//!
//! # Invariants
//! - Storage buffers are sized once from the staging capacities.
//! - Each frame records the compute pass before the blit pass in one encoder.
//! - Renderer never mutates world state.

mod gpu;
mod shaders;

pub use gpu::{WgpuFrame, WgpuMeshUploader, WgpuRenderer};
