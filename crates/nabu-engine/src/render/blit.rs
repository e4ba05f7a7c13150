//! Presents a framebuffer color attachment into a rectangle of the window surface.

use glam::Vec2;

use crate::coords::Rect;
use crate::render::{RenderCtx, RenderTarget};

/// Textured-rectangle renderer for surface passes.
///
/// Pipeline and sampler are created lazily and rebuilt when the surface format
/// changes. The bind group is rebuilt per call because the source view changes
/// whenever the framebuffer is resized.
#[derive(Default)]
pub struct BlitRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
}

impl BlitRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `source` stretched over `rect` (logical pixels).
    ///
    /// The rect is clipped to the surface; an empty result draws nothing.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        source: &wgpu::TextureView,
        rect: Rect,
    ) {
        let Some(px) = physical_viewport(rect, ctx.scale_factor, ctx.physical_size()) else {
            return;
        };

        self.ensure_pipeline(ctx);
        let (Some(pipeline), Some(bgl), Some(sampler)) = (
            self.pipeline.as_ref(),
            self.bind_group_layout.as_ref(),
            self.sampler.as_ref(),
        ) else {
            return;
        };

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu blit bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("nabu blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_viewport(px.origin.x, px.origin.y, px.size.x, px.size.y, 0.0, 1.0);
        rpass.draw(0..3, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("nabu blit bgl"),
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

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("nabu blit pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("nabu blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nabu blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.sampler = Some(sampler);
    }
}

/// Logical rect → physical viewport clipped to a `surface_px` sized surface.
fn physical_viewport(rect: Rect, scale_factor: f32, surface_px: Vec2) -> Option<Rect> {
    if !rect.is_finite() || !scale_factor.is_finite() || scale_factor <= 0.0 {
        return None;
    }
    let r = rect.normalized().scaled(scale_factor);
    let min = r.min().round().clamp(Vec2::ZERO, surface_px);
    let max = r.max().round().clamp(Vec2::ZERO, surface_px);
    let px = Rect::from_origin_size(min, max - min);
    (!px.is_empty()).then_some(px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_scales_and_rounds() {
        let px = physical_viewport(Rect::new(10.0, 20.0, 100.5, 50.0), 2.0, Vec2::new(1000.0, 1000.0));
        assert_eq!(px, Some(Rect::new(20.0, 40.0, 201.0, 100.0)));
    }

    #[test]
    fn viewport_is_clipped_to_surface() {
        let px = physical_viewport(Rect::new(-10.0, 0.0, 100.0, 100.0), 1.0, Vec2::new(50.0, 60.0));
        assert_eq!(px, Some(Rect::new(0.0, 0.0, 50.0, 60.0)));
    }

    #[test]
    fn offscreen_or_degenerate_rect_draws_nothing() {
        let surface = Vec2::new(100.0, 100.0);
        assert_eq!(physical_viewport(Rect::new(200.0, 0.0, 10.0, 10.0), 1.0, surface), None);
        assert_eq!(physical_viewport(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, surface), None);
        assert_eq!(physical_viewport(Rect::new(0.0, 0.0, f32::NAN, 1.0), 1.0, surface), None);
    }
}
