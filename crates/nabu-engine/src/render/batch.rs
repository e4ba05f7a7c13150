//! # Batched quad renderer
//!
//! Accumulates quads into a fixed-capacity vertex array and submits them in
//! as few draws as possible. A batch is flushed when:
//! 1. it already holds `max_quads_per_batch` quads, or
//! 2. a quad needs a texture that is not in the slot table and every slot is taken, or
//! 3. the scene ends.
//!
//! The flush happens *before* the pending quad is recorded, so a quad is never
//! split across two draws. Untextured quads sample the fallback texture in slot
//! 0 and can never exhaust the slot table.
//!
//! Slot assignment is per batch: after a flush the table restarts from slot 1,
//! so the number of draws depends on the order in which distinct textures are
//! first used, not only on how many there are.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::paint::Color;

use super::backend::{BackendError, DrawCall, RenderBackend, TextureId};
use super::buffer::{IndexBuffer, VertexBuffer};
use super::texture::Texture2D;
use super::texture_slots::TextureSlots;
use super::vertex::{
    quad_indices, QuadVertex, INDICES_PER_QUAD, NO_ENTITY, QUAD_POSITIONS, QUAD_TEX_COORDS,
    VERTICES_PER_QUAD,
};

pub const DEFAULT_MAX_QUADS_PER_BATCH: usize = 10_000;
pub const DEFAULT_MAX_TEXTURE_SLOTS: usize = 16;

/// Batch capacity limits.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BatchConfig {
    /// Quads per draw submission. Values below 1 are raised to 1.
    pub max_quads_per_batch: usize,

    /// Texture slots per draw, including the fallback slot 0.
    ///
    /// Clamped into `[2, backend.max_texture_slots()]`.
    pub max_texture_slots: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_quads_per_batch: DEFAULT_MAX_QUADS_PER_BATCH,
            max_texture_slots: DEFAULT_MAX_TEXTURE_SLOTS,
        }
    }
}

/// Counters accumulated until [`BatchRenderer::reset_stats`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub quad_count: u32,
}

impl RenderStats {
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.quad_count * VERTICES_PER_QUAD as u32
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.quad_count * INDICES_PER_QUAD as u32
    }
}

/// One drawable quad: a unit square transformed by `transform`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub transform: Mat4,
    pub color: Color,
    pub texture: Option<TextureId>,
    pub tiling_factor: f32,
    /// Per-corner texture coordinates, in [`QUAD_POSITIONS`] order.
    pub tex_coords: [Vec2; 4],
    pub entity_id: i32,
}

impl Quad {
    pub fn new(transform: Mat4) -> Self {
        Self {
            transform,
            color: Color::WHITE,
            texture: None,
            tiling_factor: 1.0,
            tex_coords: QUAD_TEX_COORDS,
            entity_id: NO_ENTITY,
        }
    }

    /// Axis-aligned quad centered at `position`.
    pub fn rect(position: Vec3, size: Vec2) -> Self {
        Self::rotated_rect(position, size, 0.0)
    }

    /// Quad centered at `position`, rotated by `rotation` radians around Z.
    pub fn rotated_rect(position: Vec3, size: Vec2, rotation: f32) -> Self {
        Self::new(Mat4::from_scale_rotation_translation(
            size.extend(1.0),
            Quat::from_rotation_z(rotation),
            position,
        ))
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn tiling(mut self, tiling_factor: f32) -> Self {
        self.tiling_factor = tiling_factor;
        self
    }

    pub fn tex_coords(mut self, tex_coords: [Vec2; 4]) -> Self {
        self.tex_coords = tex_coords;
        self
    }

    /// Samples a sub-rectangle `[min, max]` of the texture (atlas sprites).
    pub fn tex_region(mut self, min: Vec2, max: Vec2) -> Self {
        self.tex_coords = [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ];
        self
    }

    pub fn entity(mut self, entity_id: i32) -> Self {
        self.entity_id = entity_id;
        self
    }
}

/// Batched quad renderer.
///
/// Owns the vertex/index buffers, the fallback texture and the batch state.
/// Every GPU call goes through the backend passed to each method; the renderer
/// itself is not tied to a graphics API.
#[derive(Debug)]
pub struct BatchRenderer {
    config: BatchConfig,

    vertices: Vec<QuadVertex>,
    quad_count: usize,
    slots: TextureSlots,

    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    white: Texture2D,

    in_scene: bool,
    stats: RenderStats,
    warned_outside_scene: bool,
}

impl BatchRenderer {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        config: BatchConfig,
    ) -> Result<Self, BackendError> {
        let config = effective_config(&config, backend.max_texture_slots());

        let mut white = Texture2D::white(backend)?;

        let mut vertex_buffer =
            match VertexBuffer::new(backend, config.max_quads_per_batch * VERTICES_PER_QUAD) {
                Ok(vb) => vb,
                Err(e) => {
                    white.release(backend);
                    return Err(e);
                }
            };

        let index_buffer = match IndexBuffer::new(backend, &quad_indices(config.max_quads_per_batch)) {
            Ok(ib) => ib,
            Err(e) => {
                vertex_buffer.release(backend);
                white.release(backend);
                return Err(e);
            }
        };

        log::debug!(
            "batch renderer ready: {} quads/batch, {} texture slots",
            config.max_quads_per_batch,
            config.max_texture_slots
        );

        Ok(Self {
            vertices: Vec::with_capacity(config.max_quads_per_batch * VERTICES_PER_QUAD),
            quad_count: 0,
            slots: TextureSlots::new(white.id(), config.max_texture_slots),
            vertex_buffer,
            index_buffer,
            white,
            in_scene: false,
            stats: RenderStats::default(),
            warned_outside_scene: false,
            config,
        })
    }

    /// Effective limits after clamping to the backend.
    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    /// Fallback texture bound to slot 0.
    #[inline]
    pub fn white_texture(&self) -> TextureId {
        self.white.id()
    }

    /// Slot table of the batch being recorded.
    #[inline]
    pub fn texture_slots(&self) -> &[TextureId] {
        self.slots.as_slice()
    }

    /// Quads recorded but not yet submitted.
    #[inline]
    pub fn pending_quads(&self) -> usize {
        self.quad_count
    }

    #[inline]
    pub fn in_scene(&self) -> bool {
        self.in_scene
    }

    /// Starts a scene: uploads the camera matrix once and empties the batch.
    pub fn begin_scene<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, view_projection: Mat4) {
        if self.in_scene {
            log::warn!("begin_scene called while a scene is open; flushing the open scene");
            self.flush(backend);
        }
        backend.set_view_projection(view_projection);
        self.start_batch();
        self.in_scene = true;
    }

    /// Ends the scene, submitting whatever is still queued.
    pub fn end_scene<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if !self.in_scene {
            log::warn!("end_scene called without begin_scene");
            return;
        }
        self.flush(backend);
        self.start_batch();
        self.in_scene = false;
    }

    /// Records one quad, flushing first if the batch cannot take it.
    pub fn draw_quad<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, quad: &Quad) {
        if !self.in_scene {
            if !self.warned_outside_scene {
                log::warn!("draw_quad outside begin_scene/end_scene; quad ignored");
                self.warned_outside_scene = true;
            }
            return;
        }

        if self.quad_count >= self.config.max_quads_per_batch {
            self.next_batch(backend);
        }

        let tex_index = match quad.texture {
            Some(texture) => self.resolve_slot(backend, texture) as f32,
            None => 0.0,
        };

        let color = quad.color.to_array();
        for (corner, tex_coord) in QUAD_POSITIONS.iter().zip(quad.tex_coords) {
            let p = quad.transform * *corner;
            self.vertices.push(QuadVertex {
                position: [p.x, p.y, p.z],
                color,
                tex_coord: tex_coord.to_array(),
                tex_index,
                tiling_factor: quad.tiling_factor,
                entity_id: quad.entity_id,
            });
        }

        self.quad_count += 1;
        self.stats.quad_count += 1;
    }

    /// Solid axis-aligned rectangle centered at `position`.
    pub fn draw_rect<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Vec3,
        size: Vec2,
        color: Color,
    ) {
        self.draw_quad(backend, &Quad::rect(position, size).color(color));
    }

    /// Solid rectangle rotated by `rotation` radians.
    pub fn draw_rotated_rect<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Vec3,
        size: Vec2,
        rotation: f32,
        color: Color,
    ) {
        self.draw_quad(backend, &Quad::rotated_rect(position, size, rotation).color(color));
    }

    /// Textured rectangle with the texture repeated `tiling_factor` times.
    pub fn draw_textured_rect<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Vec3,
        size: Vec2,
        texture: &Texture2D,
        tiling_factor: f32,
    ) {
        let quad = Quad::rect(position, size)
            .texture(texture.id())
            .tiling(tiling_factor);
        self.draw_quad(backend, &quad);
    }

    /// Releases buffers and the fallback texture. Idempotent.
    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        self.vertex_buffer.release(backend);
        self.index_buffer.release(backend);
        self.white.release(backend);
    }

    fn resolve_slot<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, texture: TextureId) -> u32 {
        // A fresh table always has a free slot (capacity >= 2), so this runs at most twice.
        loop {
            if let Some(slot) = self.slots.resolve(texture) {
                return slot;
            }
            self.next_batch(backend);
        }
    }

    fn next_batch<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        self.flush(backend);
        self.start_batch();
    }

    fn start_batch(&mut self) {
        self.vertices.clear();
        self.quad_count = 0;
        self.slots.reset();
    }

    fn flush<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.quad_count == 0 {
            return;
        }

        self.vertex_buffer.write(backend, &self.vertices);
        backend.draw_indexed(&DrawCall {
            vertex_buffer: self.vertex_buffer.id(),
            index_buffer: self.index_buffer.id(),
            vertex_count: self.vertices.len() as u32,
            index_count: (self.quad_count * INDICES_PER_QUAD) as u32,
            textures: self.slots.as_slice(),
        });
        self.stats.draw_calls += 1;
    }
}

fn effective_config(requested: &BatchConfig, backend_slots: usize) -> BatchConfig {
    let max_quads_per_batch = requested.max_quads_per_batch.max(1);
    let max_texture_slots = requested
        .max_texture_slots
        .clamp(2, backend_slots.max(2));

    if max_texture_slots != requested.max_texture_slots {
        log::warn!(
            "max_texture_slots {} not supported by backend; using {}",
            requested.max_texture_slots,
            max_texture_slots
        );
    }

    BatchConfig {
        max_quads_per_batch,
        max_texture_slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::software::SoftwareBackend;

    fn setup(max_quads: usize, slots: usize) -> (SoftwareBackend, BatchRenderer) {
        let mut backend = SoftwareBackend::new();
        let renderer = BatchRenderer::new(
            &mut backend,
            BatchConfig {
                max_quads_per_batch: max_quads,
                max_texture_slots: slots,
            },
        )
        .unwrap();
        (backend, renderer)
    }

    fn textures(backend: &mut SoftwareBackend, n: usize) -> Vec<Texture2D> {
        (0..n)
            .map(|i| {
                let v = (i * 40) as u8;
                Texture2D::from_rgba8(backend, "t", 1, 1, &[v, v, v, 255]).unwrap()
            })
            .collect()
    }

    fn unit() -> Quad {
        Quad::new(Mat4::IDENTITY)
    }

    // ── flush counting ────────────────────────────────────────────────────

    #[test]
    fn undersized_batch_flushes_exactly_once() {
        let (mut backend, mut r) = setup(100, 8);
        let texs = textures(&mut backend, 7);

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for i in 0..100 {
            let t = &texs[i % texs.len()];
            r.draw_quad(&mut backend, &unit().texture(t.id()));
        }
        r.end_scene(&mut backend);

        assert_eq!(backend.draws().len(), 1);
        assert_eq!(r.stats().draw_calls, 1);
        assert_eq!(backend.draws()[0].index_count, 600);
        assert_eq!(backend.draws()[0].textures.len(), 8);
    }

    #[test]
    fn quad_capacity_splits_into_ceil_batches() {
        let (mut backend, mut r) = setup(10, 4);
        let texs = textures(&mut backend, 1);

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for _ in 0..35 {
            r.draw_quad(&mut backend, &unit().texture(texs[0].id()));
        }
        r.end_scene(&mut backend);

        let draws = backend.draws();
        assert_eq!(draws.len(), 4);
        assert!(draws.iter().all(|d| d.index_count <= 60));
        let quads: u32 = draws.iter().map(|d| d.index_count / 6).sum();
        assert_eq!(quads, 35);
        assert_eq!(draws[3].index_count, 30);
    }

    #[test]
    fn exactly_full_batch_does_not_emit_trailing_empty_draw() {
        let (mut backend, mut r) = setup(10, 4);
        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for _ in 0..20 {
            r.draw_quad(&mut backend, &unit());
        }
        r.end_scene(&mut backend);
        assert_eq!(backend.draws().len(), 2);
    }

    #[test]
    fn slot_exhaustion_flushes_before_recording_quad() {
        let (mut backend, mut r) = setup(100, 4);
        let texs = textures(&mut backend, 4);

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for t in &texs[..3] {
            r.draw_quad(&mut backend, &unit().texture(t.id()));
        }
        assert!(backend.draws().is_empty());

        r.draw_quad(&mut backend, &unit().texture(texs[3].id()));
        assert_eq!(backend.draws().len(), 1);
        assert_eq!(backend.draws()[0].index_count, 18);
        assert_eq!(r.texture_slots(), &[r.white_texture(), texs[3].id()]);
        assert_eq!(r.pending_quads(), 1);

        r.end_scene(&mut backend);
        assert_eq!(backend.draws().len(), 2);
        assert_eq!(backend.draws()[1].index_count, 6);
    }

    #[test]
    fn first_use_order_determines_batches() {
        let (mut backend, mut r) = setup(100, 4);
        let texs = textures(&mut backend, 4);
        let ids: Vec<TextureId> = texs.iter().map(Texture2D::id).collect();

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for &id in &[ids[0], ids[1], ids[2], ids[3], ids[0]] {
            r.draw_quad(&mut backend, &unit().texture(id));
        }
        r.end_scene(&mut backend);

        let draws = backend.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1].textures, vec![r.white_texture(), ids[3], ids[0]]);
    }

    #[test]
    fn untextured_quads_never_exhaust_slots() {
        let (mut backend, mut r) = setup(100, 3);
        let texs = textures(&mut backend, 2);

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.draw_quad(&mut backend, &unit().texture(texs[0].id()));
        r.draw_quad(&mut backend, &unit().texture(texs[1].id()));
        for _ in 0..50 {
            r.draw_quad(&mut backend, &unit());
        }
        r.end_scene(&mut backend);

        assert_eq!(backend.draws().len(), 1);
    }

    #[test]
    fn empty_scene_issues_no_draw() {
        let (mut backend, mut r) = setup(100, 4);
        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.end_scene(&mut backend);
        assert!(backend.draws().is_empty());
        assert_eq!(r.stats().draw_calls, 0);
    }

    // ── slot table ────────────────────────────────────────────────────────

    #[test]
    fn repeated_texture_resolves_to_same_slot() {
        let (mut backend, mut r) = setup(100, 4);
        let texs = textures(&mut backend, 1);
        let a = texs[0].id();

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.draw_quad(&mut backend, &unit());
        r.draw_quad(&mut backend, &unit());
        r.draw_quad(&mut backend, &unit().texture(a));
        r.draw_quad(&mut backend, &unit().texture(a));

        assert_eq!(r.texture_slots(), &[r.white_texture(), a]);
        r.end_scene(&mut backend);

        let verts = backend.last_vertices();
        let slots: Vec<f32> = verts.iter().step_by(4).map(|v| v.tex_index).collect();
        assert_eq!(slots, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn explicit_fallback_texture_uses_slot_zero() {
        let (mut backend, mut r) = setup(100, 2);
        let white = r.white_texture();
        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.draw_quad(&mut backend, &unit().texture(white));
        assert_eq!(r.texture_slots(), &[white]);
        r.end_scene(&mut backend);
    }

    // ── vertex construction ───────────────────────────────────────────────

    #[test]
    fn corners_share_per_quad_attributes() {
        let (mut backend, mut r) = setup(100, 4);
        let quad = Quad::rect(Vec3::new(10.0, 20.0, 0.5), Vec2::new(4.0, 2.0))
            .color(Color::new(1.0, 0.0, 0.0, 1.0))
            .tiling(3.0)
            .entity(42);

        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.draw_quad(&mut backend, &quad);
        r.end_scene(&mut backend);

        let v = backend.last_vertices();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].position, [8.0, 19.0, 0.5]);
        assert_eq!(v[2].position, [12.0, 21.0, 0.5]);
        assert!(v.iter().all(|c| c.entity_id == 42 && c.tiling_factor == 3.0));
        assert_eq!(v[1].tex_coord, [1.0, 0.0]);
    }

    #[test]
    fn tex_region_maps_corners() {
        let q = unit().tex_region(Vec2::new(0.25, 0.5), Vec2::new(0.5, 1.0));
        assert_eq!(q.tex_coords[0], Vec2::new(0.25, 0.5));
        assert_eq!(q.tex_coords[2], Vec2::new(0.5, 1.0));
    }

    // ── scene lifecycle / config ──────────────────────────────────────────

    #[test]
    fn draw_outside_scene_is_ignored() {
        let (mut backend, mut r) = setup(100, 4);
        r.draw_quad(&mut backend, &unit());
        assert_eq!(r.pending_quads(), 0);
        r.begin_scene(&mut backend, Mat4::IDENTITY);
        r.end_scene(&mut backend);
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn begin_scene_uploads_camera_once() {
        let (mut backend, mut r) = setup(2, 4);
        let vp = Mat4::from_scale(Vec3::splat(0.5));
        r.begin_scene(&mut backend, vp);
        for _ in 0..5 {
            r.draw_quad(&mut backend, &unit());
        }
        r.end_scene(&mut backend);
        assert_eq!(backend.view_projection_uploads(), 1);
        assert_eq!(backend.view_projection(), vp);
        assert_eq!(backend.draws().len(), 3);
    }

    #[test]
    fn stats_accumulate_until_reset() {
        let (mut backend, mut r) = setup(3, 4);
        r.begin_scene(&mut backend, Mat4::IDENTITY);
        for _ in 0..7 {
            r.draw_quad(&mut backend, &unit());
        }
        r.end_scene(&mut backend);

        let s = r.stats();
        assert_eq!((s.draw_calls, s.quad_count), (3, 7));
        assert_eq!((s.vertex_count(), s.index_count()), (28, 42));
        r.reset_stats();
        assert_eq!(r.stats(), RenderStats::default());
    }

    #[test]
    fn config_is_clamped_to_backend_limits() {
        let (mut backend, mut r) = setup(0, 64);
        assert_eq!(r.config().max_quads_per_batch, 1);
        assert_eq!(r.config().max_texture_slots, backend.max_texture_slots());
        r.release(&mut backend);
        r.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }
}
