//! GPU rendering subsystem.
//!
//! - `batch`: batched quad renderer (`begin_scene` / `draw_quad` / `end_scene`).
//! - `framebuffer`: offscreen multi-attachment target with entity-id read back.
//! - `backend`: the graphics-API seam both are written against, with a wgpu
//!   implementation and a CPU reference implementation.
//! - `blit`: presents a framebuffer attachment on the window surface.
//!
//! Convention:
//! - World geometry goes through the camera's view-projection matrix.
//! - Framebuffer texels and read back use a top-left origin, like pointer coordinates.

mod backend;
pub mod batch;
mod blit;
mod buffer;
mod ctx;
pub mod framebuffer;
mod resources;
mod software;
mod texture;
mod texture_slots;
mod vertex;
mod wgpu_backend;

pub use backend::{
    AttachmentDesc, AttachmentFormat, AttachmentId, BackendError, BufferId, BufferKind, ClearValue,
    DrawCall, RenderBackend, TargetBinding, TextureDesc, TextureId,
};
pub use batch::{BatchConfig, BatchRenderer, Quad, RenderStats};
pub use blit::BlitRenderer;
pub use buffer::{IndexBuffer, VertexBuffer};
pub use ctx::{RenderCtx, RenderTarget};
pub use framebuffer::{Framebuffer, FramebufferError, FramebufferSpec};
pub use software::{RecordedDraw, SoftwareBackend};
pub use texture::Texture2D;
pub use texture_slots::TextureSlots;
pub use vertex::{quad_indices, QuadVertex, INDICES_PER_QUAD, NO_ENTITY, VERTICES_PER_QUAD};
pub use wgpu_backend::{WgpuBackend, MAX_TEXTURE_SLOTS};
