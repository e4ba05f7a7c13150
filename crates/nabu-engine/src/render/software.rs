//! CPU reference implementation of [`RenderBackend`].
//!
//! Rasterizes quad batches with edge functions at pixel centers, samples
//! textures with nearest filtering and repeat addressing, and depth-tests
//! with `LessEqual`, matching the wgpu pipeline closely enough that picking
//! and clear semantics can be verified without a GPU. Every draw submission is
//! recorded so callers can count and inspect them.

use glam::{Mat4, Vec2, Vec4};

use crate::paint::Color;

use super::backend::{
    AttachmentDesc, AttachmentFormat, AttachmentId, BackendError, BufferId, BufferKind, ClearValue,
    DrawCall, RenderBackend, TargetBinding, TextureDesc, TextureId, validate_target_descs,
};
use super::resources::ResourceTable;
use super::vertex::QuadVertex;

const DEFAULT_MAX_TEXTURE_SLOTS: usize = 16;
const DEFAULT_MAX_COLOR_ATTACHMENTS: usize = 4;

/// A draw submission as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub vertex_count: u32,
    pub index_count: u32,
    pub textures: Vec<TextureId>,
}

#[derive(Debug)]
struct SoftTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SoftTexture {
    fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Nearest sample with repeat addressing; `uv` has its origin at the top-left texel.
    fn sample(&self, uv: Vec2) -> Color {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let [r, g, b, a] = self.texel(x, y);
        Color::from_rgba8(r, g, b, a)
    }
}

#[derive(Debug)]
struct SoftBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

#[derive(Debug)]
enum Pixels {
    Color(Vec<[u8; 4]>),
    Int(Vec<i32>),
    Depth { depth: Vec<f32>, stencil: Vec<u32> },
}

#[derive(Debug)]
struct SoftAttachment {
    desc: AttachmentDesc,
    pixels: Pixels,
}

impl SoftAttachment {
    fn new(desc: AttachmentDesc) -> Self {
        let n = (desc.width * desc.height) as usize;
        let pixels = match desc.format {
            AttachmentFormat::Color8888 => Pixels::Color(vec![[0; 4]; n]),
            AttachmentFormat::ColorInt32 => Pixels::Int(vec![0; n]),
            AttachmentFormat::DepthStencil => Pixels::Depth {
                depth: vec![1.0; n],
                stencil: vec![0; n],
            },
        };
        Self { desc, pixels }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.desc.width + x) as usize
    }
}

/// CPU rasterizer and draw recorder.
#[derive(Debug)]
pub struct SoftwareBackend {
    max_texture_slots: usize,
    max_color_attachments: usize,

    textures: ResourceTable<SoftTexture>,
    buffers: ResourceTable<SoftBuffer>,
    attachments: ResourceTable<SoftAttachment>,

    bound: Option<TargetBinding>,
    view_projection: Mat4,
    view_projection_uploads: usize,
    buffer_writes: usize,

    draws: Vec<RecordedDraw>,
    last_vertices: Vec<QuadVertex>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_TEXTURE_SLOTS, DEFAULT_MAX_COLOR_ATTACHMENTS)
    }

    pub fn with_limits(max_texture_slots: usize, max_color_attachments: usize) -> Self {
        Self {
            max_texture_slots,
            max_color_attachments,
            textures: ResourceTable::default(),
            buffers: ResourceTable::default(),
            attachments: ResourceTable::default(),
            bound: None,
            view_projection: Mat4::IDENTITY,
            view_projection_uploads: 0,
            buffer_writes: 0,
            draws: Vec::new(),
            last_vertices: Vec::new(),
        }
    }

    /// Draw submissions received so far, in order.
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Vertices consumed by the most recent draw.
    pub fn last_vertices(&self) -> &[QuadVertex] {
        &self.last_vertices
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn view_projection_uploads(&self) -> usize {
        self.view_projection_uploads
    }

    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_attachments(&self) -> usize {
        self.attachments.len()
    }

    /// Size of a live attachment.
    pub fn attachment_size(&self, id: AttachmentId) -> Option<(u32, u32)> {
        self.attachments
            .get(id.0)
            .map(|a| (a.desc.width, a.desc.height))
    }

    /// Raw RGBA of a texture texel; `None` for dead handles or out-of-range coordinates.
    pub fn texel(&self, id: TextureId, x: u32, y: u32) -> Option<[u8; 4]> {
        let tex = self.textures.get(id.0)?;
        (x < tex.width && y < tex.height).then(|| tex.texel(x, y))
    }

    fn rasterize(&mut self, call: &DrawCall<'_>, target: &TargetBinding) {
        let Some(indices) = self.decode_indices(call.index_buffer, call.index_count) else {
            return;
        };

        let color_id = target.colors.first().copied();
        let entity_id = target.colors.get(1).copied().filter(|id| {
            self.attachments
                .get(id.0)
                .is_some_and(|a| a.desc.format == AttachmentFormat::ColorInt32)
        });
        let Some((width, height)) = target
            .attachments()
            .next()
            .and_then(|id| self.attachment_size(id))
        else {
            return;
        };

        // Vertices in framebuffer space: pixel x/y with a top-left origin, plus depth.
        let screen: Vec<Vec4> = self
            .last_vertices
            .iter()
            .map(|v| {
                let clip = self.view_projection * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0);
                let ndc = clip / clip.w;
                Vec4::new(
                    (ndc.x * 0.5 + 0.5) * width as f32,
                    (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
                    ndc.z,
                    1.0,
                )
            })
            .collect();

        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= screen.len() || b >= screen.len() || c >= screen.len() {
                log::warn!("index out of range for {} vertices; triangle skipped", screen.len());
                continue;
            }
            self.fill_triangle(
                [screen[a], screen[b], screen[c]],
                [a, b, c],
                (width, height),
                call.textures,
                color_id,
                entity_id,
                target.depth,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_triangle(
        &mut self,
        p: [Vec4; 3],
        verts: [usize; 3],
        (width, height): (u32, u32),
        textures: &[TextureId],
        color_id: Option<AttachmentId>,
        entity_id: Option<AttachmentId>,
        depth_id: Option<AttachmentId>,
    ) {
        let area = edge(p[0], p[1], p[2]);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        let min_x = p.iter().map(|v| v.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let min_y = p.iter().map(|v| v.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
        let max_x = (p.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max).ceil() as u32).min(width);
        let max_y = (p.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max).ceil() as u32).min(height);

        let [v0, v1, v2] = verts.map(|i| self.last_vertices[i]);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let center = Vec4::new(x as f32 + 0.5, y as f32 + 0.5, 0.0, 1.0);
                let w0 = edge(p[1], p[2], center) / area;
                let w1 = edge(p[2], p[0], center) / area;
                let w2 = edge(p[0], p[1], center) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * p[0].z + w1 * p[1].z + w2 * p[2].z;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }

                if let Some(id) = depth_id
                    && !self.depth_test(id, x, y, depth)
                {
                    continue;
                }

                if let Some(id) = color_id {
                    let tint = Color::from(std::array::from_fn::<f32, 4, _>(|i| {
                        w0 * v0.color[i] + w1 * v1.color[i] + w2 * v2.color[i]
                    }));
                    let uv = Vec2::from(v0.tex_coord) * w0
                        + Vec2::from(v1.tex_coord) * w1
                        + Vec2::from(v2.tex_coord) * w2;
                    let texel = self.sample_slot(textures, v0.tex_index, uv * v0.tiling_factor);
                    let src = Color::new(
                        tint.r * texel.r,
                        tint.g * texel.g,
                        tint.b * texel.b,
                        tint.a * texel.a,
                    );
                    self.blend(id, x, y, src);
                }

                if let Some(id) = entity_id
                    && let Some(att) = self.attachments.get_mut(id.0)
                    && let Pixels::Int(ints) = &mut att.pixels
                {
                    let i = (y * att.desc.width + x) as usize;
                    ints[i] = v0.entity_id;
                }
            }
        }
    }

    fn depth_test(&mut self, id: AttachmentId, x: u32, y: u32, depth: f32) -> bool {
        let Some(att) = self.attachments.get_mut(id.0) else {
            return true;
        };
        let i = att.offset(x, y);
        match &mut att.pixels {
            Pixels::Depth { depth: stored, .. } if depth <= stored[i] => {
                stored[i] = depth;
                true
            }
            Pixels::Depth { .. } => false,
            _ => true,
        }
    }

    fn sample_slot(&self, textures: &[TextureId], tex_index: f32, uv: Vec2) -> Color {
        let slot = tex_index.round().max(0.0) as usize;
        let live = |id: &TextureId| self.textures.get(id.0);
        // Out-of-range or dead slots sample the first live texture, as the wgpu binding does.
        let tex = textures
            .get(slot)
            .and_then(live)
            .or_else(|| textures.iter().find_map(live));
        match tex {
            // Texture rows are stored top-first while tex_coord v grows upward.
            Some(tex) => tex.sample(Vec2::new(uv.x, 1.0 - uv.y)),
            None => Color::WHITE,
        }
    }

    /// Source-over alpha blending into an RGBA8 attachment.
    fn blend(&mut self, id: AttachmentId, x: u32, y: u32, src: Color) {
        let Some(att) = self.attachments.get_mut(id.0) else {
            return;
        };
        let i = att.offset(x, y);
        if let Pixels::Color(px) = &mut att.pixels {
            let [r, g, b, a] = px[i];
            let dst = Color::from_rgba8(r, g, b, a);
            let inv = 1.0 - src.a;
            let out = Color::new(
                src.r * src.a + dst.r * inv,
                src.g * src.a + dst.g * inv,
                src.b * src.a + dst.b * inv,
                src.a + dst.a * inv,
            );
            px[i] = out.to_rgba8();
        }
    }

    fn decode_indices(&self, id: BufferId, count: u32) -> Option<Vec<u32>> {
        let buf = self.buffers.get(id.0)?;
        debug_assert_eq!(buf.kind, BufferKind::Index);
        let bytes = buf.data.get(..count as usize * 4)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>)
                .collect(),
        )
    }

    fn decode_vertices(&self, id: BufferId, count: u32) -> Vec<QuadVertex> {
        let Some(buf) = self.buffers.get(id.0) else {
            return Vec::new();
        };
        debug_assert_eq!(buf.kind, BufferKind::Vertex);
        let len = (count as usize * QuadVertex::STRIDE).min(buf.data.len());
        buf.data[..len]
            .chunks_exact(QuadVertex::STRIDE)
            .map(bytemuck::pod_read_unaligned::<QuadVertex>)
            .collect()
    }
}

/// Signed area of the parallelogram spanned by `a→b` and `a→c`.
#[inline]
fn edge(a: Vec4, b: Vec4, c: Vec4) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

impl RenderBackend for SoftwareBackend {
    fn max_texture_slots(&self) -> usize {
        self.max_texture_slots
    }

    fn max_color_attachments(&self) -> usize {
        self.max_color_attachments
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, BackendError> {
        if desc.rgba.len() != (desc.width * desc.height * 4) as usize {
            return Err(BackendError::Creation {
                what: "texture",
                reason: format!("'{}': pixel data does not match size", desc.label),
            });
        }
        Ok(TextureId(self.textures.insert(SoftTexture {
            width: desc.width,
            height: desc.height,
            rgba: desc.rgba.to_vec(),
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
        Ok(BufferId(self.buffers.insert(SoftBuffer {
            kind,
            data: vec![0; size as usize],
        })))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) {
        let Some(buf) = self.buffers.get_mut(id.0) else {
            debug_assert!(false, "write to dead {id}");
            log::warn!("write to dead {id} ignored");
            return;
        };
        let start = offset as usize;
        let Some(dst) = buf.data.get_mut(start..start + data.len()) else {
            log::warn!("write of {} bytes at {offset} overflows {id}", data.len());
            return;
        };
        dst.copy_from_slice(data);
        self.buffer_writes += 1;
    }

    fn release_buffer(&mut self, id: BufferId) {
        let released = self.buffers.remove(id.0).is_some();
        debug_assert!(released, "double release of {id}");
        if !released {
            log::warn!("release of dead {id} ignored");
        }
    }

    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentId, BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::Creation {
                what: "attachment",
                reason: format!("zero-sized {}x{}", desc.width, desc.height),
            });
        }
        Ok(AttachmentId(self.attachments.insert(SoftAttachment::new(*desc))))
    }

    fn release_attachment(&mut self, id: AttachmentId) {
        let released = self.attachments.remove(id.0).is_some();
        debug_assert!(released, "double release of {id}");
        if !released {
            log::warn!("release of dead {id} ignored");
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
        let Some(att) = self.attachments.get_mut(id.0) else {
            log::warn!("clear of dead {id} ignored");
            return;
        };
        match (&mut att.pixels, value) {
            (Pixels::Color(px), ClearValue::Color(c)) => px.fill(c.to_rgba8()),
            (Pixels::Int(px), ClearValue::Int(v)) => px.fill(v),
            (Pixels::Depth { depth, stencil }, ClearValue::DepthStencil { depth: d, stencil: s }) => {
                depth.fill(d);
                stencil.fill(s);
            }
            (_, value) => {
                log::warn!("{value:?} does not match {:?} attachment {id}", att.desc.format);
            }
        }
    }

    fn read_pixel(&mut self, id: AttachmentId, x: u32, y: u32) -> Result<i32, BackendError> {
        let att = self
            .attachments
            .get(id.0)
            .ok_or(BackendError::UnknownAttachment(id))?;
        if x >= att.desc.width || y >= att.desc.height {
            return Err(BackendError::Readback(format!(
                "({x}, {y}) outside {}x{}",
                att.desc.width, att.desc.height
            )));
        }
        let i = att.offset(x, y);
        match &att.pixels {
            Pixels::Int(px) => Ok(px[i]),
            Pixels::Color(px) => Ok(i32::from_le_bytes(px[i])),
            Pixels::Depth { .. } => Err(BackendError::Unreadable(id, "depth/stencil")),
        }
    }

    fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
        self.view_projection_uploads += 1;
    }

    fn draw_indexed(&mut self, call: &DrawCall<'_>) {
        self.draws.push(RecordedDraw {
            vertex_count: call.vertex_count,
            index_count: call.index_count,
            textures: call.textures.to_vec(),
        });
        self.last_vertices = self.decode_vertices(call.vertex_buffer, call.vertex_count);

        let Some(target) = self.bound.clone() else {
            log::trace!("draw without bound target recorded only");
            return;
        };
        self.rasterize(call, &target);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::render::vertex::quad_indices;

    fn attachment(backend: &mut SoftwareBackend, format: AttachmentFormat, w: u32, h: u32) -> AttachmentId {
        backend
            .create_attachment(&AttachmentDesc {
                format,
                width: w,
                height: h,
                samples: 1,
            })
            .unwrap()
    }

    fn corner(x: f32, y: f32, z: f32, entity_id: i32) -> QuadVertex {
        QuadVertex {
            position: [x, y, z],
            color: [1.0, 0.0, 0.0, 1.0],
            tex_coord: [0.0, 0.0],
            tex_index: 0.0,
            tiling_factor: 1.0,
            entity_id,
        }
    }

    /// Uploads one axis-aligned quad in NDC and draws it.
    fn draw_ndc_quad(backend: &mut SoftwareBackend, min: Vec2, max: Vec2, z: f32, entity: i32) {
        let white = backend
            .create_texture(&TextureDesc {
                label: "white",
                width: 1,
                height: 1,
                rgba: &[255; 4],
            })
            .unwrap();
        let verts = [
            corner(min.x, min.y, z, entity),
            corner(max.x, min.y, z, entity),
            corner(max.x, max.y, z, entity),
            corner(min.x, max.y, z, entity),
        ];
        let vb = backend.create_buffer(BufferKind::Vertex, 4 * 48).unwrap();
        backend.write_buffer(vb, 0, bytemuck::cast_slice(&verts));
        let ib = backend.create_buffer(BufferKind::Index, 24).unwrap();
        backend.write_buffer(ib, 0, bytemuck::cast_slice(&quad_indices(1)));
        backend.draw_indexed(&DrawCall {
            vertex_buffer: vb,
            index_buffer: ib,
            vertex_count: 4,
            index_count: 6,
            textures: &[white],
        });
    }

    // ── rasterization ─────────────────────────────────────────────────────

    #[test]
    fn half_viewport_quad_covers_left_half_only() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 8, 8);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 8, 8);
        b.clear_attachment(ids, ClearValue::Int(-1));
        b.bind_target(Some(TargetBinding {
            colors: vec![color, ids],
            depth: None,
        }));

        draw_ndc_quad(&mut b, Vec2::new(-1.0, -1.0), Vec2::new(0.0, 1.0), 0.0, 7);

        assert_eq!(b.read_pixel(ids, 0, 0).unwrap(), 7);
        assert_eq!(b.read_pixel(ids, 3, 7).unwrap(), 7);
        assert_eq!(b.read_pixel(ids, 4, 4).unwrap(), -1);
        assert_eq!(b.read_pixel(color, 1, 1).unwrap(), i32::from_le_bytes([255, 0, 0, 255]));
    }

    #[test]
    fn top_of_ndc_maps_to_row_zero() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 4, 4);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 4, 4);
        b.clear_attachment(ids, ClearValue::Int(-1));
        b.bind_target(Some(TargetBinding {
            colors: vec![color, ids],
            depth: None,
        }));

        draw_ndc_quad(&mut b, Vec2::new(-1.0, 0.0), Vec2::new(1.0, 1.0), 0.0, 3);

        assert_eq!(b.read_pixel(ids, 2, 0).unwrap(), 3);
        assert_eq!(b.read_pixel(ids, 2, 3).unwrap(), -1);
    }

    #[test]
    fn depth_test_keeps_nearer_fragment() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 4, 4);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 4, 4);
        let depth = attachment(&mut b, AttachmentFormat::DepthStencil, 4, 4);
        b.clear_attachment(depth, ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
        b.bind_target(Some(TargetBinding {
            colors: vec![color, ids],
            depth: Some(depth),
        }));

        draw_ndc_quad(&mut b, Vec2::splat(-1.0), Vec2::splat(1.0), 0.2, 1);
        draw_ndc_quad(&mut b, Vec2::splat(-1.0), Vec2::splat(1.0), 0.5, 2);
        assert_eq!(b.read_pixel(ids, 1, 1).unwrap(), 1);

        draw_ndc_quad(&mut b, Vec2::splat(-1.0), Vec2::splat(1.0), 0.2, 3);
        assert_eq!(b.read_pixel(ids, 1, 1).unwrap(), 3);
    }

    #[test]
    fn view_projection_transforms_positions() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 4, 4);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 4, 4);
        b.clear_attachment(ids, ClearValue::Int(-1));
        b.bind_target(Some(TargetBinding {
            colors: vec![color, ids],
            depth: None,
        }));
        b.set_view_projection(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));

        draw_ndc_quad(&mut b, Vec2::splat(-1.0), Vec2::new(0.0, 1.0), 0.0, 5);

        assert_eq!(b.read_pixel(ids, 0, 0).unwrap(), -1);
        assert_eq!(b.read_pixel(ids, 3, 0).unwrap(), 5);
    }

    #[test]
    fn draw_without_target_is_recorded_only() {
        let mut b = SoftwareBackend::new();
        draw_ndc_quad(&mut b, Vec2::splat(-1.0), Vec2::splat(1.0), 0.0, 1);
        assert_eq!(b.draws().len(), 1);
        assert_eq!(b.last_vertices().len(), 4);
    }

    #[test]
    fn dead_slot_texture_samples_slot_zero() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 2, 2);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 2, 2);
        b.clear_attachment(ids, ClearValue::Int(-1));
        b.bind_target(Some(TargetBinding {
            colors: vec![color, ids],
            depth: None,
        }));

        let white = b
            .create_texture(&TextureDesc { label: "white", width: 1, height: 1, rgba: &[255; 4] })
            .unwrap();
        let gone = b
            .create_texture(&TextureDesc { label: "gone", width: 1, height: 1, rgba: &[0, 255, 0, 255] })
            .unwrap();
        b.release_texture(gone);

        let verts: Vec<QuadVertex> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .into_iter()
            .map(|(x, y)| QuadVertex {
                color: [1.0; 4],
                tex_index: 1.0,
                ..corner(x, y, 0.0, 9)
            })
            .collect();
        let vb = b.create_buffer(BufferKind::Vertex, 4 * 48).unwrap();
        b.write_buffer(vb, 0, bytemuck::cast_slice(&verts));
        let ib = b.create_buffer(BufferKind::Index, 24).unwrap();
        b.write_buffer(ib, 0, bytemuck::cast_slice(&quad_indices(1)));
        b.draw_indexed(&DrawCall {
            vertex_buffer: vb,
            index_buffer: ib,
            vertex_count: 4,
            index_count: 6,
            textures: &[white, gone],
        });

        assert_eq!(b.read_pixel(ids, 1, 1).unwrap(), 9);
        assert_eq!(b.read_pixel(color, 1, 1).unwrap(), i32::from_le_bytes([255; 4]));
    }

    // ── clears / read back ────────────────────────────────────────────────

    #[test]
    fn clear_touches_only_named_attachment() {
        let mut b = SoftwareBackend::new();
        let color = attachment(&mut b, AttachmentFormat::Color8888, 2, 2);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 2, 2);
        b.clear_attachment(color, ClearValue::Color(Color::new(0.0, 0.0, 1.0, 1.0)));
        b.clear_attachment(ids, ClearValue::Int(-1));
        assert_eq!(b.read_pixel(color, 0, 0).unwrap(), i32::from_le_bytes([0, 0, 255, 255]));

        b.clear_attachment(ids, ClearValue::Int(9));
        assert_eq!(b.read_pixel(ids, 1, 1).unwrap(), 9);
        assert_eq!(b.read_pixel(color, 1, 1).unwrap(), i32::from_le_bytes([0, 0, 255, 255]));
    }

    #[test]
    fn mismatched_clear_value_is_ignored() {
        let mut b = SoftwareBackend::new();
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 2, 2);
        b.clear_attachment(ids, ClearValue::Int(4));
        b.clear_attachment(ids, ClearValue::Color(Color::BLACK));
        assert_eq!(b.read_pixel(ids, 0, 0).unwrap(), 4);
    }

    #[test]
    fn read_back_rejects_depth_and_out_of_range() {
        let mut b = SoftwareBackend::new();
        let depth = attachment(&mut b, AttachmentFormat::DepthStencil, 2, 2);
        let ids = attachment(&mut b, AttachmentFormat::ColorInt32, 2, 2);
        assert!(matches!(b.read_pixel(depth, 0, 0), Err(BackendError::Unreadable(..))));
        assert!(matches!(b.read_pixel(ids, 2, 0), Err(BackendError::Readback(_))));
        b.release_attachment(ids);
        assert!(matches!(b.read_pixel(ids, 0, 0), Err(BackendError::UnknownAttachment(_))));
    }

    // ── completeness ──────────────────────────────────────────────────────

    #[test]
    fn validate_rejects_mismatched_sizes_and_misplaced_formats() {
        let mut b = SoftwareBackend::new();
        let a = attachment(&mut b, AttachmentFormat::Color8888, 4, 4);
        let small = attachment(&mut b, AttachmentFormat::ColorInt32, 2, 2);
        let depth = attachment(&mut b, AttachmentFormat::DepthStencil, 4, 4);

        let mismatched = TargetBinding {
            colors: vec![a, small],
            depth: None,
        };
        assert!(matches!(
            b.validate_target(&mismatched),
            Err(BackendError::IncompleteTarget(_))
        ));

        let depth_as_color = TargetBinding {
            colors: vec![depth],
            depth: None,
        };
        assert!(b.validate_target(&depth_as_color).is_err());

        let ok = TargetBinding {
            colors: vec![a],
            depth: Some(depth),
        };
        assert!(b.validate_target(&ok).is_ok());
        assert!(b.validate_target(&TargetBinding::default()).is_err());
    }

    #[test]
    fn validate_rejects_multisampled_integers() {
        let mut b = SoftwareBackend::new();
        let ids = b
            .create_attachment(&AttachmentDesc {
                format: AttachmentFormat::ColorInt32,
                width: 4,
                height: 4,
                samples: 4,
            })
            .unwrap();
        let target = TargetBinding {
            colors: vec![ids],
            depth: None,
        };
        assert!(matches!(
            b.validate_target(&target),
            Err(BackendError::IncompleteTarget(_))
        ));
    }

    #[test]
    fn releasing_bound_attachment_unbinds() {
        let mut b = SoftwareBackend::new();
        let a = attachment(&mut b, AttachmentFormat::Color8888, 2, 2);
        b.bind_target(Some(TargetBinding {
            colors: vec![a],
            depth: None,
        }));
        b.release_attachment(a);
        assert!(b.bound_target().is_none());
        assert_eq!(b.live_attachments(), 0);
    }
}
