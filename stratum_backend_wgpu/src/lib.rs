// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu backend for stratum.
//!
//! Implements [`GpuBackend`] on `wgpu`: fixed-capacity vertex buffers with
//! per-instance matrix and texture-coordinate attributes, and one instanced
//! indexed draw per batch. Three pipelines cover the draw modes — filled
//! quads (triangle list), outlined quads (line list over the same unit
//! quad), and connection lines (two endpoint matrices per instance).
//!
//! Draw calls arriving from
//! [`BatchStorage::submit_all`](stratum_render::BatchStorage::submit_all)
//! are recorded in order and encoded into a single render pass by
//! [`present`](WgpuBackend::present); buffer writes go straight to the
//! queue. The host owns the surface, window, and frame timing — this crate
//! never touches them.
//!
//! Texture pixels come from outside: the host registers each atlas (the
//! palette strips, the glyph atlas, the connection gradient) with
//! [`register_texture`](WgpuBackend::register_texture), and the backend
//! serves the [`TextureProvider`] lookups the editing layer needs for
//! glyph metrics.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use stratum_core::props::{DrawMode, TextureId};
use stratum_render::{BufferId, DrawCall, GpuBackend, TextureBinding, TextureProvider};

/// Unit quad corners in top-left, top-right, bottom-right, bottom-left
/// order — matching the corner order of the UV payload.
const QUAD_VERTICES: [[f32; 2]; 4] = [[-0.5, 0.5], [0.5, 0.5], [0.5, -0.5], [-0.5, -0.5]];

/// Endpoint selectors for the connection line.
const LINE_VERTICES: [[f32; 2]; 2] = [[-0.5, 0.0], [0.5, 0.0]];

/// Two triangles covering the quad.
const FILL_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Four edges as a line list.
const OUTLINE_INDICES: [u16; 8] = [0, 1, 1, 2, 2, 3, 3, 0];

/// A single segment.
const LINE_INDICES: [u16; 2] = [0, 1];

const QUAD_SHADER: &str = r"
struct View {
    matrix: mat3x3<f32>,
}

@group(0) @binding(0) var<uniform> view: View;
@group(1) @binding(0) var atlas: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexInput {
    @builtin(vertex_index) corner: u32,
    @location(0) position: vec2<f32>,
    @location(1) world0: vec3<f32>,
    @location(2) world1: vec3<f32>,
    @location(3) world2: vec3<f32>,
    @location(4) uv01: vec4<f32>,
    @location(5) uv23: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = mat3x3(in.world0, in.world1, in.world2);
    let p = view.matrix * (world * vec3(in.position, 1.0));

    // Texture coordinates arrive as one quad per instance, in the same
    // corner order as the unit quad.
    var uv: vec2<f32>;
    switch in.corner {
        case 0u: { uv = in.uv01.xy; }
        case 1u: { uv = in.uv01.zw; }
        case 2u: { uv = in.uv23.xy; }
        default: { uv = in.uv23.zw; }
    }

    var out: VertexOutput;
    out.clip_position = vec4(p.xy, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(atlas, atlas_sampler, in.uv);
}
";

const CONNECTION_SHADER: &str = r"
struct View {
    matrix: mat3x3<f32>,
}

@group(0) @binding(0) var<uniform> view: View;
@group(1) @binding(0) var atlas: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) a0: vec3<f32>,
    @location(2) a1: vec3<f32>,
    @location(3) a2: vec3<f32>,
    @location(4) b0: vec3<f32>,
    @location(5) b1: vec3<f32>,
    @location(6) b2: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    // Each instance carries both endpoint matrices; the vertex's sign
    // picks which one places it.
    var world: mat3x3<f32>;
    if in.position.x < 0.0 {
        world = mat3x3(in.a0, in.a1, in.a2);
    } else {
        world = mat3x3(in.b0, in.b1, in.b2);
    }
    let p = view.matrix * (world * vec3(0.0, 0.0, 1.0));

    var out: VertexOutput;
    out.clip_position = vec4(p.xy, 0.0, 1.0);
    out.uv = vec2(0.5, 0.5);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(atlas, atlas_sampler, in.uv);
}
";

/// The camera uniform: a 3×3 view matrix with vec4-aligned columns, per
/// WGSL uniform layout rules.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ViewUniform {
    columns: [[f32; 4]; 3],
}

/// Creates one of the three batch pipelines over the shared layout.
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    module: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    topology: wgpu::PrimitiveTopology,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Allocates a small static buffer and uploads its contents.
fn upload_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    usage: wgpu::BufferUsages,
    bytes: &[u8],
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: bytes.len() as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    queue.write_buffer(&buffer, 0, bytes);
    buffer
}

struct TextureEntry {
    bind_group: wgpu::BindGroup,
    binding: TextureBinding,
}

/// A [`GpuBackend`] rendering instanced batches through `wgpu`.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    fill_pipeline: wgpu::RenderPipeline,
    outline_pipeline: wgpu::RenderPipeline,
    connection_pipeline: wgpu::RenderPipeline,

    quad_vertices: wgpu::Buffer,
    line_vertices: wgpu::Buffer,
    fill_indices: wgpu::Buffer,
    outline_indices: wgpu::Buffer,
    line_indices: wgpu::Buffer,

    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,

    textures: HashMap<TextureId, TextureEntry>,
    buffers: Vec<wgpu::Buffer>,
    pending: Vec<DrawCall>,
}

impl std::fmt::Debug for TextureEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureEntry")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl WgpuBackend {
    /// Creates a backend rendering to surfaces of the given format.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum view layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stratum texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stratum pipeline layout"),
            bind_group_layouts: &[&view_layout, &texture_layout],
            immediate_size: 0,
        });

        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stratum quad shader"),
            source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
        });
        let connection_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stratum connection shader"),
            source: wgpu::ShaderSource::Wgsl(CONNECTION_SHADER.into()),
        });

        // Per-vertex unit geometry, shared by every instance.
        let position_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<[f32; 2]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            }],
        };
        // One 3×3 world matrix per instance, three vec3 columns.
        let matrix_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<[f32; 9]>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                    shader_location: 2,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 24,
                    shader_location: 3,
                },
            ],
        };
        // One UV quad per instance, two vec4s of corner pairs.
        let uv_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<[f32; 8]>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 4,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 16,
                    shader_location: 5,
                },
            ],
        };
        // Two endpoint matrices per connection instance, six vec3s.
        let endpoint_attributes: Vec<wgpu::VertexAttribute> = (0..6)
            .map(|i| wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: u64::from(i) * 12,
                shader_location: i + 1,
            })
            .collect();
        let endpoints_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<[f32; 18]>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &endpoint_attributes,
        };

        let quad_buffers = [position_layout.clone(), matrix_layout, uv_layout];
        let fill_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            "stratum fill",
            &quad_shader,
            &quad_buffers,
            wgpu::PrimitiveTopology::TriangleList,
            format,
        );
        let outline_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            "stratum outline",
            &quad_shader,
            &quad_buffers,
            wgpu::PrimitiveTopology::LineList,
            format,
        );
        let connection_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            "stratum connection",
            &connection_shader,
            &[position_layout, endpoints_layout],
            wgpu::PrimitiveTopology::LineList,
            format,
        );

        let quad_vertices = upload_buffer(
            &device,
            &queue,
            "stratum quad vertices",
            wgpu::BufferUsages::VERTEX,
            bytemuck::cast_slice(&QUAD_VERTICES),
        );
        let line_vertices = upload_buffer(
            &device,
            &queue,
            "stratum line vertices",
            wgpu::BufferUsages::VERTEX,
            bytemuck::cast_slice(&LINE_VERTICES),
        );
        let fill_indices = upload_buffer(
            &device,
            &queue,
            "stratum fill indices",
            wgpu::BufferUsages::INDEX,
            bytemuck::cast_slice(&FILL_INDICES),
        );
        let outline_indices = upload_buffer(
            &device,
            &queue,
            "stratum outline indices",
            wgpu::BufferUsages::INDEX,
            bytemuck::cast_slice(&OUTLINE_INDICES),
        );
        let line_indices = upload_buffer(
            &device,
            &queue,
            "stratum line indices",
            wgpu::BufferUsages::INDEX,
            bytemuck::cast_slice(&LINE_INDICES),
        );

        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stratum view uniform"),
            size: size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum view bind group"),
            layout: &view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        let mut backend = Self {
            device,
            queue,
            fill_pipeline,
            outline_pipeline,
            connection_pipeline,
            quad_vertices,
            line_vertices,
            fill_indices,
            outline_indices,
            line_indices,
            view_buffer,
            view_bind_group,
            texture_layout,
            textures: HashMap::new(),
            buffers: Vec::new(),
            pending: Vec::new(),
        };
        backend.set_view(1.0, 1.0, (0.0, 0.0), 1.0);
        backend
    }

    /// Updates the camera: viewport size in pixels, pan in world units,
    /// zoom factor. World coordinates map to clip space as
    /// `2 * zoom / viewport` with the pan applied first.
    pub fn set_view(&mut self, width: f32, height: f32, pan: (f32, f32), zoom: f32) {
        let sx = 2.0 * zoom / width;
        let sy = 2.0 * zoom / height;
        let uniform = ViewUniform {
            columns: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [2.0 * pan.0 / width, 2.0 * pan.1 / height, 1.0, 0.0],
            ],
        };
        self.queue
            .write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Uploads an RGBA8 texture and binds it under `id`. Re-registering an
    /// id replaces its pixels and keeps the unit.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is not `width * height * 4` bytes.
    pub fn register_texture(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: wgpu::FilterMode,
    ) {
        assert_eq!(
            pixels.len() as u64,
            u64::from(width) * u64::from(height) * 4,
            "texture payload must be RGBA8"
        );
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stratum atlas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("stratum atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stratum atlas bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let unit = self
            .textures
            .get(&id)
            .map_or_else(
                || u32::try_from(self.textures.len()).expect("texture count exceeds u32"),
                |existing| existing.binding.unit,
            );
        self.textures.insert(
            id,
            TextureEntry {
                bind_group,
                binding: TextureBinding {
                    unit,
                    width,
                    height,
                },
            },
        );
    }

    /// Encodes every draw recorded since the last present into one render
    /// pass and submits it.
    ///
    /// # Panics
    ///
    /// Panics if a recorded draw references a texture that was never
    /// registered.
    pub fn present(&mut self, target: &wgpu::TextureView, clear: wgpu::Color) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stratum frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stratum batches"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_bind_group(0, &self.view_bind_group, &[]);

            for call in &self.pending {
                let atlas = self
                    .textures
                    .get(&call.texture)
                    .unwrap_or_else(|| panic!("texture {:?} was never registered", call.texture));
                pass.set_bind_group(1, &atlas.bind_group, &[]);

                let matrices = &self.buffers[call.matrix_buffer.0 as usize];
                match call.mode {
                    DrawMode::Fill | DrawMode::Outline => {
                        let (pipeline, indices, index_count) = if call.mode == DrawMode::Fill {
                            (&self.fill_pipeline, &self.fill_indices, FILL_INDICES.len())
                        } else {
                            (
                                &self.outline_pipeline,
                                &self.outline_indices,
                                OUTLINE_INDICES.len(),
                            )
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
                        pass.set_vertex_buffer(1, matrices.slice(..));
                        pass.set_vertex_buffer(
                            2,
                            self.buffers[call.uv_buffer.0 as usize].slice(..),
                        );
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                        #[expect(
                            clippy::cast_possible_truncation,
                            reason = "index counts are small constants"
                        )]
                        pass.draw_indexed(0..index_count as u32, 0, 0..call.instances);
                    }
                    DrawMode::Line => {
                        pass.set_pipeline(&self.connection_pipeline);
                        pass.set_vertex_buffer(0, self.line_vertices.slice(..));
                        pass.set_vertex_buffer(1, matrices.slice(..));
                        pass.set_index_buffer(
                            self.line_indices.slice(..),
                            wgpu::IndexFormat::Uint16,
                        );
                        #[expect(
                            clippy::cast_possible_truncation,
                            reason = "index counts are small constants"
                        )]
                        pass.draw_indexed(0..LINE_INDICES.len() as u32, 0, 0..call.instances);
                    }
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.pending.clear();
    }
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, float_capacity: u32) -> BufferId {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stratum instance buffer"),
            size: u64::from(float_capacity) * 4,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = BufferId(u32::try_from(self.buffers.len()).expect("buffer count exceeds u32"));
        self.buffers.push(buffer);
        id
    }

    fn write_buffer(&mut self, id: BufferId, float_offset: u32, data: &[f32]) {
        self.queue.write_buffer(
            &self.buffers[id.0 as usize],
            u64::from(float_offset) * 4,
            bytemuck::cast_slice(data),
        );
    }

    fn draw(&mut self, call: &DrawCall) {
        self.pending.push(*call);
    }
}

impl TextureProvider for WgpuBackend {
    fn texture(&self, id: TextureId) -> Option<TextureBinding> {
        self.textures.get(&id).map(|entry| entry.binding)
    }
}
