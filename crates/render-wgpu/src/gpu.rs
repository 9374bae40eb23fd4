use std::collections::BTreeMap;

use roomtrace_common::MeshHandle;
use roomtrace_kernel::{Light, MeshUploader, Plane, Sphere, Vertex};
use roomtrace_render::{bindings, DeviceContext, FrameUniform, GpuRecord, MaterialDescriptor, StagingConfig};
use wgpu::util::DeviceExt;

use crate::shaders;

/// A static room or door mesh resident on the GPU.
struct ResidentMesh {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// Compute ray tracer plus the blit that shows its output.
///
/// Owns the storage buffers (bindings 1-4), the frame uniform (5), the output
/// image (0) and every uploaded static mesh. Per-frame work goes through
/// [`WgpuRenderer::begin_frame`].
pub struct WgpuRenderer {
    compute_pipeline: wgpu::ComputePipeline,
    compute_layout: wgpu::BindGroupLayout,
    compute_bind_group: wgpu::BindGroup,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    storage: BTreeMap<u32, wgpu::Buffer>,
    frame_buffer: wgpu::Buffer,
    image_view: wgpu::TextureView,
    extent: (u32, u32),
    meshes: BTreeMap<MeshHandle, ResidentMesh>,
    next_mesh: u64,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        staging: &StagingConfig,
    ) -> Self {
        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ray_trace_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: bindings::IMAGE,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                storage_entry(bindings::SPHERES),
                storage_entry(bindings::PLANES),
                storage_entry(bindings::LIGHTS),
                storage_entry(bindings::MATERIALS),
                wgpu::BindGroupLayoutEntry {
                    binding: bindings::FRAME,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ray_trace_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RAY_TRACE_SHADER.into()),
        });
        let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ray_trace_pipeline_layout"),
            bind_group_layouts: &[&compute_layout],
            push_constant_ranges: &[],
        });
        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("ray_trace_pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Storage buffers are sized once from the staging capacities; zero
        // capacities still get one record so the binding is valid.
        let mut storage = BTreeMap::new();
        for (binding, label, bytes) in [
            (bindings::SPHERES, "sphere_buffer", record_bytes::<Sphere>(staging.spheres)),
            (bindings::PLANES, "plane_buffer", record_bytes::<Plane>(staging.planes)),
            (bindings::LIGHTS, "light_buffer", record_bytes::<Light>(staging.lights)),
            (
                bindings::MATERIALS,
                "material_buffer",
                record_bytes::<MaterialDescriptor>(staging.materials),
            ),
        ] {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            storage.insert(binding, buffer);
        }

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniform_buffer"),
            contents: bytemuck::bytes_of(&<FrameUniform as bytemuck::Zeroable>::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let image_view = Self::create_image(device, width, height);

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit_pipeline_layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let compute_bind_group =
            Self::create_compute_bind_group(device, &compute_layout, &image_view, &storage, &frame_buffer);
        let blit_bind_group = Self::create_blit_bind_group(device, &blit_layout, &image_view, &sampler);

        tracing::debug!(width, height, "ray trace pipeline created");

        Self {
            compute_pipeline,
            compute_layout,
            compute_bind_group,
            blit_pipeline,
            blit_layout,
            blit_bind_group,
            sampler,
            storage,
            frame_buffer,
            image_view,
            extent: (width.max(1), height.max(1)),
            meshes: BTreeMap::new(),
            next_mesh: 0,
            surface_format,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    pub fn resident_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn resident_vertices(&self) -> u64 {
        self.meshes.values().map(|m| m.vertex_count as u64).sum()
    }

    /// Recreate the output image when the surface size changes.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let extent = (width.max(1), height.max(1));
        if extent == self.extent {
            return;
        }
        self.extent = extent;
        self.image_view = Self::create_image(device, extent.0, extent.1);
        self.compute_bind_group = Self::create_compute_bind_group(
            device,
            &self.compute_layout,
            &self.image_view,
            &self.storage,
            &self.frame_buffer,
        );
        self.blit_bind_group =
            Self::create_blit_bind_group(device, &self.blit_layout, &self.image_view, &self.sampler);
    }

    /// Mesh uploads outside a frame, e.g. right after the world is built.
    pub fn uploader<'a>(&'a mut self, device: &'a wgpu::Device) -> WgpuMeshUploader<'a> {
        WgpuMeshUploader { renderer: self, device }
    }

    /// Start recording one frame that will draw into `target`.
    pub fn begin_frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        target: &'a wgpu::TextureView,
    ) -> WgpuFrame<'a> {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ray_trace_encoder"),
        });
        WgpuFrame {
            renderer: self,
            device,
            queue,
            target,
            encoder,
        }
    }

    fn upload_vertices(&mut self, device: &wgpu::Device, label: &str, vertices: &[Vertex]) -> MeshHandle {
        self.next_mesh += 1;
        let handle = MeshHandle(self.next_mesh);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.meshes.insert(
            handle,
            ResidentMesh {
                buffer,
                vertex_count: vertices.len() as u32,
            },
        );
        handle
    }

    fn create_image(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ray_trace_image"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn create_compute_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        image: &wgpu::TextureView,
        storage: &BTreeMap<u32, wgpu::Buffer>,
        frame: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: bindings::IMAGE,
            resource: wgpu::BindingResource::TextureView(image),
        }];
        entries.extend(storage.iter().map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: *binding,
            resource: buffer.as_entire_binding(),
        }));
        entries.push(wgpu::BindGroupEntry {
            binding: bindings::FRAME,
            resource: frame.as_entire_binding(),
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ray_trace_bind_group"),
            layout,
            entries: &entries,
        })
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        image: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(image),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

fn record_bytes<R: GpuRecord>(capacity: usize) -> u64 {
    (capacity.max(1) * R::STRIDE * std::mem::size_of::<f32>()) as u64
}

/// [`MeshUploader`] over a renderer outside any frame.
pub struct WgpuMeshUploader<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
}

impl MeshUploader for WgpuMeshUploader<'_> {
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex]) -> MeshHandle {
        self.renderer.upload_vertices(self.device, label, vertices)
    }
}

/// One frame in flight. Storage and uniform writes go through the queue; the
/// compute and blit passes are recorded into one encoder and submitted by
/// [`WgpuFrame::finish`].
pub struct WgpuFrame<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl WgpuFrame<'_> {
    pub fn finish(self) {
        self.queue.submit(std::iter::once(self.encoder.finish()));
    }
}

impl MeshUploader for WgpuFrame<'_> {
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex]) -> MeshHandle {
        self.renderer.upload_vertices(self.device, label, vertices)
    }
}

impl DeviceContext for WgpuFrame<'_> {
    fn write_storage(&mut self, binding: u32, floats: &[f32], _elements: usize) {
        let Some(buffer) = self.renderer.storage.get(&binding) else {
            tracing::warn!(binding, "no storage buffer bound at slot");
            return;
        };
        if floats.is_empty() {
            return;
        }
        self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(floats));
    }

    fn write_frame(&mut self, frame: &FrameUniform) {
        self.queue
            .write_buffer(&self.renderer.frame_buffer, 0, bytemuck::bytes_of(frame));
    }

    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32) {
        let mut pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("ray_trace_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.renderer.compute_pipeline);
        pass.set_bind_group(0, &self.renderer.compute_bind_group, &[]);
        pass.dispatch_workgroups(groups_x, groups_y, 1);
    }

    fn memory_barrier(&mut self) {
        // The compute pass has ended; wgpu transitions the image from storage
        // write to sampled read at the next pass boundary.
        tracing::trace!("compute pass closed before sampling");
    }

    fn draw_fullscreen(&mut self) {
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.renderer.blit_pipeline);
        pass.set_bind_group(0, &self.renderer.blit_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_sizes_follow_record_strides() {
        assert_eq!(record_bytes::<Sphere>(1024), 1024 * 32);
        assert_eq!(record_bytes::<Plane>(10), 10 * 80);
        assert_eq!(record_bytes::<Light>(0), 32);
        assert_eq!(record_bytes::<MaterialDescriptor>(4), 128);
    }
}
