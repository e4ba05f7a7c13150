use glam::{Mat4, Vec2};

use crate::coords::Rect;
use crate::paint::Color;
use crate::render::framebuffer::{
    ENTITY_ID_ATTACHMENT, INVALID_PIXEL, MAX_FRAMEBUFFER_DIMENSION,
};
use crate::render::{
    AttachmentFormat, AttachmentId, BatchRenderer, Framebuffer, FramebufferError, FramebufferSpec,
    RenderBackend,
};

/// A rectangle of the window showing an offscreen scene, with entity picking.
///
/// Owns a `[Color8888, ColorInt32, DepthStencil]` framebuffer sized to the
/// panel bounds in physical pixels. One scale factor, read from the window,
/// is used for both framebuffer sizing and pointer mapping.
#[derive(Debug)]
pub struct ViewportPanel {
    framebuffer: Framebuffer,
    /// Window logical pixels.
    bounds: Rect,
    scale_factor: f32,
    pub clear_color: Color,
}

impl ViewportPanel {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        bounds: Rect,
        scale_factor: f32,
    ) -> Result<Self, FramebufferError> {
        let scale_factor = sanitize_scale(scale_factor);
        let bounds = bounds.normalized();
        let (width, height) = framebuffer_size(bounds.size, scale_factor);
        let spec = FramebufferSpec::new(width, height).with_attachments([
            AttachmentFormat::Color8888,
            AttachmentFormat::ColorInt32,
            AttachmentFormat::DepthStencil,
        ]);

        Ok(Self {
            framebuffer: Framebuffer::create(backend, spec)?,
            bounds,
            scale_factor,
            clear_color: Color::new(0.1, 0.1, 0.12, 1.0),
        })
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Attachment shown on screen (color attachment 0).
    pub fn display_attachment(&self) -> Option<AttachmentId> {
        self.framebuffer.color_attachment(0)
    }

    /// Moves/resizes the panel.
    ///
    /// The framebuffer is reallocated only when its physical size changes; the
    /// new logical size is then returned so the camera can update its aspect
    /// ratio. Non-finite bounds or scale are ignored, as are empty bounds
    /// (a collapsed panel keeps its last framebuffer).
    pub fn set_bounds<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        bounds: Rect,
        scale_factor: f32,
    ) -> Result<Option<Vec2>, FramebufferError> {
        if !bounds.is_finite() || !scale_factor.is_finite() || scale_factor <= 0.0 {
            log::warn!("ignoring viewport bounds {bounds:?} at scale {scale_factor}");
            return Ok(None);
        }

        let bounds = bounds.normalized();
        self.bounds = bounds;
        self.scale_factor = scale_factor;
        if bounds.is_empty() {
            return Ok(None);
        }

        let (width, height) = framebuffer_size(bounds.size, scale_factor);
        if (width, height) == (self.framebuffer.width(), self.framebuffer.height()) {
            return Ok(None);
        }
        let resized = self.framebuffer.resize(backend, width, height)?;
        Ok(resized.then_some(bounds.size))
    }

    /// Renders one frame into the framebuffer.
    ///
    /// Clears color and depth, resets entity ids to "none", then runs one full
    /// scene through `renderer` with `draw` issuing the quads.
    pub fn render<B, F>(
        &mut self,
        backend: &mut B,
        renderer: &mut BatchRenderer,
        view_projection: Mat4,
        draw: F,
    ) where
        B: RenderBackend + ?Sized,
        F: FnOnce(&mut BatchRenderer, &mut B),
    {
        if self.framebuffer.is_disposed() {
            return;
        }

        self.framebuffer.clear(backend, self.clear_color);
        self.framebuffer
            .clear_attachment(backend, ENTITY_ID_ATTACHMENT, INVALID_PIXEL);

        self.framebuffer.bind(backend);
        renderer.begin_scene(backend, view_projection);
        draw(renderer, backend);
        renderer.end_scene(backend);
        self.framebuffer.unbind(backend);
    }

    /// Maps a pointer position (window logical pixels) to a framebuffer texel.
    ///
    /// `None` when the pointer is outside the panel or past the framebuffer edge.
    pub fn pointer_to_texel(&self, pointer: Vec2) -> Option<(u32, u32)> {
        if !pointer.is_finite() || !self.bounds.contains(pointer) {
            return None;
        }
        let texel = (self.bounds.to_local(pointer) * self.scale_factor).floor();
        let (w, h) = (self.framebuffer.width(), self.framebuffer.height());
        if texel.x < 0.0 || texel.y < 0.0 || texel.x >= w as f32 || texel.y >= h as f32 {
            return None;
        }
        Some((texel.x as u32, texel.y as u32))
    }

    /// Entity id under the pointer, or `None` over empty space or outside the panel.
    pub fn hovered_entity<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        pointer: Vec2,
    ) -> Option<i32> {
        let (x, y) = self.pointer_to_texel(pointer)?;
        let id = self
            .framebuffer
            .read_pixel(backend, ENTITY_ID_ATTACHMENT, x, y);
        (id != INVALID_PIXEL).then_some(id)
    }

    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        self.framebuffer.dispose(backend);
    }
}

fn sanitize_scale(scale_factor: f32) -> f32 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        log::warn!("invalid scale factor {scale_factor}; using 1.0");
        1.0
    }
}

/// Logical size × scale, rounded and clamped to what a framebuffer accepts.
fn framebuffer_size(logical: Vec2, scale_factor: f32) -> (u32, u32) {
    let px = (logical * scale_factor).round();
    let clamp = |v: f32| {
        if v.is_finite() {
            (v.max(1.0) as u32).min(MAX_FRAMEBUFFER_DIMENSION)
        } else {
            1
        }
    };
    (clamp(px.x), clamp(px.y))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::render::{BatchConfig, Quad, SoftwareBackend};

    fn setup(bounds: Rect, scale: f32) -> (SoftwareBackend, BatchRenderer, ViewportPanel) {
        let mut backend = SoftwareBackend::new();
        let renderer = BatchRenderer::new(&mut backend, BatchConfig::default()).unwrap();
        let panel = ViewportPanel::new(&mut backend, bounds, scale).unwrap();
        (backend, renderer, panel)
    }

    fn teardown(mut backend: SoftwareBackend, mut renderer: BatchRenderer, mut panel: ViewportPanel) {
        panel.dispose(&mut backend);
        renderer.release(&mut backend);
    }

    // ── sizing ────────────────────────────────────────────────────────────

    #[test]
    fn framebuffer_follows_bounds_times_scale() {
        let (b, r, p) = setup(Rect::new(100.0, 50.0, 200.0, 100.0), 2.0);
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (400, 200));
        assert!(p.display_attachment().is_some());
        teardown(b, r, p);
    }

    #[test]
    fn set_bounds_resizes_only_on_physical_change() {
        let (mut b, r, mut p) = setup(Rect::new(0.0, 0.0, 100.0, 100.0), 1.0);

        let moved = p.set_bounds(&mut b, Rect::new(20.0, 20.0, 100.0, 100.0), 1.0).unwrap();
        assert_eq!(moved, None);
        assert_eq!(p.bounds().origin, Vec2::new(20.0, 20.0));

        let grown = p.set_bounds(&mut b, Rect::new(20.0, 20.0, 160.0, 90.0), 1.0).unwrap();
        assert_eq!(grown, Some(Vec2::new(160.0, 90.0)));
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (160, 90));

        let rescaled = p.set_bounds(&mut b, Rect::new(20.0, 20.0, 160.0, 90.0), 2.0).unwrap();
        assert_eq!(rescaled, Some(Vec2::new(160.0, 90.0)));
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (320, 180));
        teardown(b, r, p);
    }

    #[test]
    fn degenerate_bounds_keep_framebuffer() {
        let (mut b, r, mut p) = setup(Rect::new(0.0, 0.0, 64.0, 32.0), 1.0);
        assert_eq!(p.set_bounds(&mut b, Rect::new(0.0, 0.0, 0.0, 0.0), 1.0).unwrap(), None);
        assert_eq!(p.set_bounds(&mut b, Rect::new(0.0, 0.0, 10.0, 10.0), f32::NAN).unwrap(), None);
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (64, 32));
        teardown(b, r, p);
    }

    #[test]
    fn framebuffer_size_is_clamped() {
        assert_eq!(framebuffer_size(Vec2::new(0.2, 20_000.0), 1.0), (1, MAX_FRAMEBUFFER_DIMENSION));
        assert_eq!(framebuffer_size(Vec2::new(100.4, 50.6), 1.5), (151, 76));
    }

    // ── pointer mapping ───────────────────────────────────────────────────

    #[test]
    fn pointer_maps_through_scale() {
        let (b, r, p) = setup(Rect::new(100.0, 50.0, 200.0, 100.0), 2.0);
        assert_eq!(p.pointer_to_texel(Vec2::new(150.0, 75.0)), Some((100, 50)));
        assert_eq!(p.pointer_to_texel(Vec2::new(100.0, 50.0)), Some((0, 0)));
        assert_eq!(p.pointer_to_texel(Vec2::new(299.9, 149.9)), Some((399, 199)));
        teardown(b, r, p);
    }

    #[test]
    fn pointer_outside_panel_maps_to_none() {
        let (b, r, p) = setup(Rect::new(100.0, 50.0, 200.0, 100.0), 2.0);
        assert_eq!(p.pointer_to_texel(Vec2::new(99.0, 75.0)), None);
        assert_eq!(p.pointer_to_texel(Vec2::new(300.0, 75.0)), None);
        assert_eq!(p.pointer_to_texel(Vec2::new(150.0, 150.0)), None);
        assert_eq!(p.pointer_to_texel(Vec2::new(f32::NAN, 75.0)), None);
        teardown(b, r, p);
    }

    // ── picking ───────────────────────────────────────────────────────────

    #[test]
    fn hover_reports_entity_under_pointer() {
        let (mut b, mut r, mut p) = setup(Rect::new(0.0, 0.0, 64.0, 64.0), 1.0);

        p.render(&mut b, &mut r, Mat4::IDENTITY, |r, b| {
            r.draw_quad(b, &Quad::rect(Vec3::ZERO, Vec2::splat(1.0)).entity(7));
        });

        assert_eq!(p.hovered_entity(&mut b, Vec2::new(32.0, 32.0)), Some(7));
        assert_eq!(p.hovered_entity(&mut b, Vec2::new(2.0, 2.0)), None);
        assert_eq!(p.hovered_entity(&mut b, Vec2::new(100.0, 2.0)), None);
        assert_eq!(r.stats().draw_calls, 1);
        assert!(!p.framebuffer().is_bound(&b));
        teardown(b, r, p);
    }

    #[test]
    fn hover_with_scale_and_offset() {
        let (mut b, mut r, mut p) = setup(Rect::new(10.0, 10.0, 32.0, 32.0), 2.0);

        p.render(&mut b, &mut r, Mat4::IDENTITY, |r, b| {
            r.draw_quad(b, &Quad::rect(Vec3::ZERO, Vec2::splat(2.0)).entity(3));
        });

        assert_eq!(p.hovered_entity(&mut b, Vec2::new(11.0, 11.0)), Some(3));
        assert_eq!(p.hovered_entity(&mut b, Vec2::new(41.5, 41.5)), Some(3));
        assert_eq!(p.hovered_entity(&mut b, Vec2::new(9.0, 11.0)), None);
        teardown(b, r, p);
    }

    #[test]
    fn each_frame_starts_with_no_entities() {
        let (mut b, mut r, mut p) = setup(Rect::new(0.0, 0.0, 16.0, 16.0), 1.0);
        let center = Vec2::new(8.0, 8.0);

        p.render(&mut b, &mut r, Mat4::IDENTITY, |r, b| {
            r.draw_quad(b, &Quad::rect(Vec3::ZERO, Vec2::splat(2.0)).entity(5));
        });
        assert_eq!(p.hovered_entity(&mut b, center), Some(5));

        p.render(&mut b, &mut r, Mat4::IDENTITY, |_, _| {});
        assert_eq!(p.hovered_entity(&mut b, center), None);
        teardown(b, r, p);
    }
}
