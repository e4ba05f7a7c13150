//! Per-quad vertex record and the shared triangulation pattern.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

/// Entity id written by quads that do not belong to an entity.
pub const NO_ENTITY: i32 = -1;

/// Vertices emitted per quad.
pub const VERTICES_PER_QUAD: usize = 4;

/// Indices emitted per quad (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// One corner of a batched quad.
///
/// All four corners of a quad share `tex_index`, `tiling_factor` and
/// `entity_id`; they differ only in `position` and `tex_coord`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
    /// Texture-slot index; the shader converts it to an integer.
    pub tex_index: f32,
    pub tiling_factor: f32,
    pub entity_id: i32,
}

impl QuadVertex {
    pub const STRIDE: usize = std::mem::size_of::<QuadVertex>();

    const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4, // color
        2 => Float32x2, // tex_coord
        3 => Float32,   // tex_index
        4 => Float32,   // tiling_factor
        5 => Sint32     // entity_id
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Unit quad corners in local space, counter-clockwise from bottom-left.
pub const QUAD_POSITIONS: [Vec4; 4] = [
    Vec4::new(-0.5, -0.5, 0.0, 1.0),
    Vec4::new(0.5, -0.5, 0.0, 1.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
    Vec4::new(-0.5, 0.5, 0.0, 1.0),
];

/// Full-texture coordinates matching [`QUAD_POSITIONS`].
pub const QUAD_TEX_COORDS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Builds the index pattern for `max_quads` quads: `0 1 2, 2 3 0` per quad, offset by 4.
///
/// Computed once at renderer creation; the index buffer is never rewritten.
pub fn quad_indices(max_quads: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(max_quads * INDICES_PER_QUAD);
    for quad in 0..max_quads as u32 {
        let base = quad * VERTICES_PER_QUAD as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    indices
}
