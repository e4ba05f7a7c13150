//! wgpu implementation of [`RenderBackend`].
//!
//! Notes:
//! - Every draw and every clear is recorded into its own encoder and submitted
//!   immediately. The batch vertex buffer is rewritten between batches through
//!   `Queue::write_buffer`, which is ordered before the next submission.
//! - Render pipelines are cached per target layout (color formats, depth, sample count).
//! - The quad pipeline writes RGBA to color slot 0 and the entity id to slot 1
//!   when that slot is `ColorInt32`. Other attachments are left out of the pass.
//! - Read back copies one texel into a 256-byte staging buffer and blocks on
//!   `Device::poll`; origin is the top-left texel.

use std::collections::HashMap;
use std::sync::mpsc;

use glam::Mat4;
use wgpu::util::DeviceExt;

use super::backend::{
    validate_target_descs, AttachmentDesc, AttachmentFormat, AttachmentId, BackendError, BufferId,
    BufferKind, ClearValue, DrawCall, RenderBackend, TargetBinding, TextureDesc, TextureId,
};
use super::resources::ResourceTable;
use super::vertex::QuadVertex;

/// Texture bindings declared by `quad.wgsl`.
pub const MAX_TEXTURE_SLOTS: usize = 16;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const ENTITY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Sint;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

fn texture_format(format: AttachmentFormat) -> wgpu::TextureFormat {
    match format {
        AttachmentFormat::Color8888 => COLOR_FORMAT,
        AttachmentFormat::ColorInt32 => ENTITY_FORMAT,
        AttachmentFormat::DepthStencil => DEPTH_FORMAT,
    }
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuBuffer {
    kind: BufferKind,
    buffer: wgpu::Buffer,
}

struct GpuAttachment {
    desc: AttachmentDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// Single-sample resolve storage of a multisampled color attachment.
    resolve: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl GpuAttachment {
    /// Single-sample texture holding the final image.
    fn readable(&self) -> &wgpu::Texture {
        self.resolve.as_ref().map_or(&self.texture, |(t, _)| t)
    }

    fn sampled_view(&self) -> &wgpu::TextureView {
        self.resolve.as_ref().map_or(&self.view, |(_, v)| v)
    }

    fn resolve_view(&self) -> Option<&wgpu::TextureView> {
        self.resolve.as_ref().map(|(_, v)| v)
    }
}

/// Expands batch textures to `slots` bindings.
///
/// Dead and unused slots take the first live texture (slot 0, the white
/// fallback, unless it is dead itself). `None` when no texture is live.
fn fill_slots<T: Copy>(views: &[Option<T>], slots: usize) -> Option<Vec<T>> {
    let fallback = views.iter().find_map(|v| *v)?;
    Some(
        (0..slots)
            .map(|slot| views.get(slot).copied().flatten().unwrap_or(fallback))
            .collect(),
    )
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    colors: Vec<Option<wgpu::TextureFormat>>,
    depth: bool,
    samples: u32,
}

impl PipelineKey {
    fn writes_entity_id(&self) -> bool {
        self.colors.get(1).copied().flatten() == Some(ENTITY_FORMAT)
    }
}

/// Production backend.
///
/// Holds clones of the device and queue, so it can outlive the borrow of the
/// `Gpu` that created them but not the device itself.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_color_attachments: usize,

    textures: ResourceTable<GpuTexture>,
    buffers: ResourceTable<GpuBuffer>,
    attachments: ResourceTable<GpuAttachment>,

    shader: wgpu::ShaderModule,
    texture_bgl: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    sampler: wgpu::Sampler,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    readback: wgpu::Buffer,

    bound: Option<TargetBinding>,
    warned_unbound: bool,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });

        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu camera bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size_of::<Mat4>() as u64),
                },
                count: None,
            }],
        });

        let mut texture_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        texture_entries.extend((0..MAX_TEXTURE_SLOTS as u32).map(|slot| wgpu::BindGroupLayoutEntry {
            binding: slot + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu texture slots bgl"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nabu quad pipeline layout"),
            bind_group_layouts: &[&camera_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let camera_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("nabu camera ubo"),
            contents: bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu camera bind group"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nabu quad sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("nabu pixel readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_color_attachments =
            (device.limits().max_color_attachments as usize).min(super::framebuffer::MAX_COLOR_ATTACHMENTS);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            max_color_attachments,
            textures: ResourceTable::default(),
            buffers: ResourceTable::default(),
            attachments: ResourceTable::default(),
            shader,
            texture_bgl,
            pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
            camera_ubo,
            camera_bind_group,
            readback,
            bound: None,
            warned_unbound: false,
        }
    }

    /// Displayable view of a color attachment (the resolve target when multisampled).
    pub fn attachment_view(&self, id: AttachmentId) -> Option<&wgpu::TextureView> {
        self.attachments
            .get(id.0)
            .filter(|a| a.desc.format == AttachmentFormat::Color8888)
            .map(GpuAttachment::sampled_view)
    }

    /// Runs `create` inside a validation error scope.
    fn scoped<T>(&self, what: &'static str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, BackendError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(scope.pop()) {
            None => Ok(value),
            Some(err) => Err(BackendError::Creation {
                what,
                reason: err.to_string(),
            }),
        }
    }

    fn pipeline_key(&self, target: &TargetBinding) -> Option<PipelineKey> {
        let mut samples = 1;
        let mut colors = Vec::with_capacity(target.colors.len());
        for (slot, id) in target.colors.iter().enumerate() {
            let att = self.attachments.get(id.0)?;
            samples = att.desc.samples;
            colors.push(match (slot, att.desc.format) {
                (0, AttachmentFormat::Color8888) => Some(COLOR_FORMAT),
                (1, AttachmentFormat::ColorInt32) => Some(ENTITY_FORMAT),
                _ => None,
            });
        }
        if let Some(depth) = target.depth {
            samples = self.attachments.get(depth.0)?.desc.samples;
        }
        Some(PipelineKey {
            colors,
            depth: target.depth.is_some(),
            samples,
        })
    }

    fn ensure_pipeline(&mut self, key: &PipelineKey) {
        if self.pipelines.contains_key(key) {
            return;
        }

        let targets: Vec<Option<wgpu::ColorTargetState>> = key
            .colors
            .iter()
            .map(|format| {
                format.map(|format| wgpu::ColorTargetState {
                    format,
                    blend: (format == COLOR_FORMAT).then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let entry_point = if key.writes_entity_id() {
            "fs_main_picking"
        } else {
            "fs_main"
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("nabu quad pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: key.depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: key.samples,
                ..Default::default()
            },
            multiview_mask: None,
            cache: None,
        });

        log::debug!("quad pipeline created for {key:?} ({entry_point})");
        self.pipelines.insert(key.clone(), pipeline);
    }

    fn texture_bind_group(&self, textures: &[TextureId]) -> Option<wgpu::BindGroup> {
        let views: Vec<Option<&wgpu::TextureView>> = textures
            .iter()
            .map(|id| self.textures.get(id.0).map(|t| &t.view))
            .collect();
        let views = fill_slots(&views, MAX_TEXTURE_SLOTS)?;

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        entries.extend(views.into_iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: slot as u32 + 1,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu texture slots"),
            layout: &self.texture_bgl,
            entries: &entries,
        }))
    }
}

impl RenderBackend for WgpuBackend {
    fn max_texture_slots(&self) -> usize {
        MAX_TEXTURE_SLOTS
    }

    fn max_color_attachments(&self) -> usize {
        self.max_color_attachments
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, BackendError> {
        let texture = self.scoped("texture", |device| {
            device.create_texture_with_data(
                &self.queue,
                &wgpu::TextureDescriptor {
                    label: Some(desc.label),
                    size: wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                desc.rgba,
            )
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(TextureId(self.textures.insert(GpuTexture {
            _texture: texture,
            view,
        })))
    }

    fn release_texture(&mut self, id: TextureId) {
        let released = self.textures.remove(id.0).is_some();
        debug_assert!(released, "double release of {id}");
        if !released {
            log::warn!("release of dead {id} ignored");
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<BufferId, BackendError> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT).max(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = self.scoped("buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(match kind {
                    BufferKind::Vertex => "nabu quad vbo",
                    BufferKind::Index => "nabu quad ibo",
                }),
                size,
                usage,
                mapped_at_creation: false,
            })
        })?;
        Ok(BufferId(self.buffers.insert(GpuBuffer { kind, buffer })))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) {
        let Some(buf) = self.buffers.get(id.0) else {
            debug_assert!(false, "write to dead {id}");
            log::warn!("write to dead {id} ignored");
            return;
        };
        if data.is_empty() {
            return;
        }
        self.queue.write_buffer(&buf.buffer, offset, data);
    }

    fn release_buffer(&mut self, id: BufferId) {
        match self.buffers.remove(id.0) {
            Some(buf) => buf.buffer.destroy(),
            None => {
                debug_assert!(false, "double release of {id}");
                log::warn!("release of dead {id} ignored");
            }
        }
    }

    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentId, BackendError> {
        let format = texture_format(desc.format);
        let multisampled = desc.samples > 1;
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        let readable = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::TEXTURE_BINDING;
        let usage = if multisampled || desc.format.is_depth() {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            readable
        };

        let (texture, resolve) = self.scoped("attachment", |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("nabu framebuffer attachment"),
                size,
                mip_level_count: 1,
                sample_count: desc.samples,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            });
            let resolve = (multisampled && desc.format.is_color()).then(|| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("nabu framebuffer resolve"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: readable,
                    view_formats: &[],
                })
            });
            (texture, resolve)
        })?;

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let resolve = resolve.map(|t| {
            let v = t.create_view(&wgpu::TextureViewDescriptor::default());
            (t, v)
        });

        Ok(AttachmentId(self.attachments.insert(GpuAttachment {
            desc: *desc,
            texture,
            view,
            resolve,
        })))
    }

    fn release_attachment(&mut self, id: AttachmentId) {
        match self.attachments.remove(id.0) {
            Some(att) => {
                att.texture.destroy();
                if let Some((t, _)) = att.resolve {
                    t.destroy();
                }
            }
            None => {
                debug_assert!(false, "double release of {id}");
                log::warn!("release of dead {id} ignored");
            }
        }
        if self
            .bound
            .as_ref()
            .is_some_and(|t| t.attachments().any(|a| a == id))
        {
            log::warn!("{id} released while bound; unbinding target");
            self.bound = None;
        }
    }

    fn validate_target(&self, target: &TargetBinding) -> Result<(), BackendError> {
        validate_target_descs(target, self.max_color_attachments, |id| {
            self.attachments.get(id.0).map(|a| a.desc)
        })
    }

    fn bind_target(&mut self, target: Option<TargetBinding>) {
        self.bound = target;
    }

    fn bound_target(&self) -> Option<&TargetBinding> {
        self.bound.as_ref()
    }

    fn clear_attachment(&mut self, id: AttachmentId, value: ClearValue) {
        let Some(att) = self.attachments.get(id.0) else {
            log::warn!("clear of dead {id} ignored");
            return;
        };

        let color_load = match (att.desc.format, value) {
            (AttachmentFormat::Color8888, ClearValue::Color(c)) => Some(wgpu::Color::from(c)),
            (AttachmentFormat::ColorInt32, ClearValue::Int(v)) => Some(wgpu::Color {
                r: v as f64,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            }),
            (AttachmentFormat::DepthStencil, ClearValue::DepthStencil { .. }) => None,
            (format, value) => {
                log::warn!("{value:?} does not match {format:?} attachment {id}");
                return;
            }
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu clear encoder"),
            });
        {
            let color_attachments = [color_load.map(|clear| wgpu::RenderPassColorAttachment {
                view: &att.view,
                depth_slice: None,
                resolve_target: att.resolve_view(),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })];
            let depth_stencil_attachment = match value {
                ClearValue::DepthStencil { depth, stencil } => Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &att.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(stencil),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                _ => None,
            };
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu clear pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixel(&mut self, id: AttachmentId, x: u32, y: u32) -> Result<i32, BackendError> {
        let att = self
            .attachments
            .get(id.0)
            .ok_or(BackendError::UnknownAttachment(id))?;
        if att.desc.format.is_depth() {
            return Err(BackendError::Unreadable(id, "depth/stencil"));
        }
        if x >= att.desc.width || y >= att.desc.height {
            return Err(BackendError::Readback(format!(
                "({x}, {y}) outside {}x{}",
                att.desc.width, att.desc.height
            )));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: att.readable(),
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.readback.slice(..4);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| BackendError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| BackendError::Readback(e.to_string()))?
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        let bytes = {
            let view = slice.get_mapped_range();
            [view[0], view[1], view[2], view[3]]
        };
        self.readback.unmap();
        Ok(i32::from_le_bytes(bytes))
    }

    fn set_view_projection(&mut self, view_projection: Mat4) {
        self.queue.write_buffer(
            &self.camera_ubo,
            0,
            bytemuck::cast_slice(&view_projection.to_cols_array()),
        );
    }

    fn draw_indexed(&mut self, call: &DrawCall<'_>) {
        if call.index_count == 0 || call.vertex_count == 0 {
            return;
        }
        let Some(target) = self.bound.clone() else {
            if !self.warned_unbound {
                log::warn!("draw without a bound framebuffer skipped");
                self.warned_unbound = true;
            }
            return;
        };
        let Some(key) = self.pipeline_key(&target) else {
            log::warn!("draw into a target with dead attachments skipped");
            return;
        };
        self.ensure_pipeline(&key);

        let Some(bind_group) = self.texture_bind_group(call.textures) else {
            log::warn!("draw without any live texture skipped");
            return;
        };
        let (Some(vb), Some(ib)) = (
            self.buffers.get(call.vertex_buffer.0),
            self.buffers.get(call.index_buffer.0),
        ) else {
            log::warn!("draw with dead buffers skipped");
            return;
        };
        debug_assert!(vb.kind == BufferKind::Vertex && ib.kind == BufferKind::Index);
        let Some(pipeline) = self.pipelines.get(&key) else {
            return;
        };

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = target
            .colors
            .iter()
            .zip(&key.colors)
            .map(|(id, format)| {
                let att = self.attachments.get(id.0)?;
                format.map(|_| wgpu::RenderPassColorAttachment {
                    view: &att.view,
                    depth_slice: None,
                    resolve_target: att.resolve_view(),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();
        let depth_stencil_attachment = target
            .depth
            .and_then(|id| self.attachments.get(id.0))
            .map(|att| wgpu::RenderPassDepthStencilAttachment {
                view: &att.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu quad batch encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu quad batch pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let vertex_bytes = call.vertex_count as u64 * QuadVertex::STRIDE as u64;
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            rpass.set_bind_group(1, &bind_group, &[]);
            rpass.set_vertex_buffer(0, vb.buffer.slice(..vertex_bytes));
            rpass.set_index_buffer(ib.buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..call.index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
