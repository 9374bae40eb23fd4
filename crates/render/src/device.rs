use roomtrace_common::MeshHandle;
use roomtrace_kernel::{MeshUploader, Vertex};

use crate::frame::FrameUniform;

/// The GPU operations one frame needs, passed explicitly to staging, dispatch
/// and mesh upload instead of living in global state.
pub trait DeviceContext: MeshUploader {
    /// Replace the leading `floats.len()` floats of the storage buffer at `binding`.
    fn write_storage(&mut self, binding: u32, floats: &[f32], elements: usize);

    fn write_frame(&mut self, frame: &FrameUniform);

    /// Run the ray-trace program over `groups_x * groups_y` work groups.
    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32);

    /// Make compute image writes visible to the sampling pass.
    fn memory_barrier(&mut self);

    /// Draw the output image over the whole viewport.
    fn draw_fullscreen(&mut self);
}

/// One captured call on a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    UploadMesh { label: String, vertices: usize },
    WriteStorage { binding: u32, floats: Vec<f32>, elements: usize },
    WriteFrame(FrameUniform),
    Dispatch { groups_x: u32, groups_y: u32 },
    Barrier,
    DrawFullscreen,
}

/// Headless device that records every call. Used by tests and the CLI to run
/// frames without a GPU.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    next_handle: u64,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Total floats written to `binding` across all recorded writes.
    pub fn storage_floats(&self, binding: u32) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                DeviceCommand::WriteStorage {
                    binding: b, floats, ..
                } if *b == binding => floats.len(),
                _ => 0,
            })
            .sum()
    }

    /// Every fullscreen draw is preceded by a dispatch and then a barrier, with
    /// no storage or frame writes between the dispatch and the draw.
    pub fn frames_are_ordered(&self) -> bool {
        let mut dispatched = false;
        let mut fenced = false;
        for command in &self.commands {
            match command {
                DeviceCommand::Dispatch { .. } => {
                    dispatched = true;
                    fenced = false;
                }
                DeviceCommand::Barrier => fenced = dispatched,
                DeviceCommand::WriteStorage { .. } | DeviceCommand::WriteFrame(_) => {
                    if dispatched {
                        return false;
                    }
                }
                DeviceCommand::DrawFullscreen => {
                    if !(dispatched && fenced) {
                        return false;
                    }
                    dispatched = false;
                    fenced = false;
                }
                DeviceCommand::UploadMesh { .. } => {}
            }
        }
        true
    }
}

impl MeshUploader for RecordingDevice {
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex]) -> MeshHandle {
        self.next_handle += 1;
        self.commands.push(DeviceCommand::UploadMesh {
            label: label.to_string(),
            vertices: vertices.len(),
        });
        MeshHandle(self.next_handle)
    }
}

impl DeviceContext for RecordingDevice {
    fn write_storage(&mut self, binding: u32, floats: &[f32], elements: usize) {
        self.commands.push(DeviceCommand::WriteStorage {
            binding,
            floats: floats.to_vec(),
            elements,
        });
    }

    fn write_frame(&mut self, frame: &FrameUniform) {
        self.commands.push(DeviceCommand::WriteFrame(*frame));
    }

    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32) {
        self.commands.push(DeviceCommand::Dispatch { groups_x, groups_y });
    }

    fn memory_barrier(&mut self) {
        self.commands.push(DeviceCommand::Barrier);
    }

    fn draw_fullscreen(&mut self) {
        self.commands.push(DeviceCommand::DrawFullscreen);
    }
}
