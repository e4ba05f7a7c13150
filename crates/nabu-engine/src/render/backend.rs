//! Graphics-API seam used by the batched renderer and the framebuffer.
//!
//! Everything above this trait (batching, slot allocation, framebuffer state
//! machine, picking) is API-agnostic. Resources live inside the backend and are
//! referenced through small copyable handles, so owners can release them
//! deterministically while a graphics context is known to exist.
//!
//! Implementations:
//! - [`WgpuBackend`](super::WgpuBackend): production backend.
//! - [`SoftwareBackend`](super::SoftwareBackend): CPU reference rasterizer, used headless and in tests.

use core::fmt;

use glam::Mat4;
use thiserror::Error;

use crate::paint::Color;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Raw backend index, stable for the lifetime of the resource.
            #[inline]
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Sampled RGBA8 texture.
    TextureId
);
handle!(
    /// Vertex or index buffer.
    BufferId
);
handle!(
    /// Render-target storage backing one framebuffer attachment.
    AttachmentId
);

/// Storage format of a framebuffer attachment.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttachmentFormat {
    /// 8-bit RGBA color, sampleable for display.
    Color8888,
    /// Signed 32-bit integer, used for per-pixel entity ids.
    ColorInt32,
    /// Combined depth/stencil.
    DepthStencil,
}

impl AttachmentFormat {
    #[inline]
    pub fn is_color(self) -> bool {
        !self.is_depth()
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self, AttachmentFormat::DepthStencil)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Initial contents of a sampled texture (tightly packed RGBA8 rows).
#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttachmentDesc {
    pub format: AttachmentFormat,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

/// The set of attachments draws are redirected to while bound.
///
/// Color attachments are in declaration order; location `i` of the fragment
/// output writes to `colors[i]`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TargetBinding {
    pub colors: Vec<AttachmentId>,
    pub depth: Option<AttachmentId>,
}

impl TargetBinding {
    pub fn attachments(&self) -> impl Iterator<Item = AttachmentId> + '_ {
        self.colors.iter().copied().chain(self.depth)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClearValue {
    Color(Color),
    Int(i32),
    DepthStencil { depth: f32, stencil: u32 },
}

impl From<i32> for ClearValue {
    fn from(value: i32) -> Self {
        ClearValue::Int(value)
    }
}

impl From<Color> for ClearValue {
    fn from(color: Color) -> Self {
        ClearValue::Color(color)
    }
}

/// One draw submission: indexed triangles from a quad batch.
#[derive(Debug, Copy, Clone)]
pub struct DrawCall<'a> {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    /// Number of vertices written to `vertex_buffer` for this batch.
    pub vertex_count: u32,
    pub index_count: u32,
    /// Texture-slot table; vertex `tex_index` values index into it.
    pub textures: &'a [TextureId],
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to create {what}: {reason}")]
    Creation { what: &'static str, reason: String },

    #[error("{0} is not a live resource")]
    UnknownAttachment(AttachmentId),

    #[error("incomplete render target: {0}")]
    IncompleteTarget(String),

    #[error("{0} cannot be read back: {1}")]
    Unreadable(AttachmentId, &'static str),

    #[error("pixel read back failed: {0}")]
    Readback(String),
}

/// Minimal graphics API the rendering core is written against.
///
/// All calls happen on the render thread. Releasing a handle that is not live
/// is a lifetime bug: implementations `debug_assert!` on it and log in release.
pub trait RenderBackend {
    /// Number of texture bindings a single draw can sample from.
    fn max_texture_slots(&self) -> usize;

    /// Maximum number of simultaneously bound color attachments.
    fn max_color_attachments(&self) -> usize;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, BackendError>;
    fn release_texture(&mut self, id: TextureId);

    fn create_buffer(&mut self, kind: BufferKind, size: u64) -> Result<BufferId, BackendError>;
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]);
    fn release_buffer(&mut self, id: BufferId);

    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentId, BackendError>;
    fn release_attachment(&mut self, id: AttachmentId);

    /// Completeness check for a set of attachments.
    fn validate_target(&self, target: &TargetBinding) -> Result<(), BackendError>;

    /// Redirects subsequent draws. `None` restores the default (no offscreen target).
    fn bind_target(&mut self, target: Option<TargetBinding>);
    fn bound_target(&self) -> Option<&TargetBinding>;

    /// Clears exactly one attachment; others are untouched.
    fn clear_attachment(&mut self, id: AttachmentId, value: ClearValue);

    /// Reads one texel of a color attachment, origin top-left.
    ///
    /// `ColorInt32` returns the stored integer; `Color8888` returns the RGBA
    /// bytes packed little-endian. Does not change the bound target.
    fn read_pixel(&mut self, id: AttachmentId, x: u32, y: u32) -> Result<i32, BackendError>;

    /// Uploads the camera matrix used by subsequent draws.
    fn set_view_projection(&mut self, view_projection: Mat4);

    fn draw_indexed(&mut self, call: &DrawCall<'_>);
}

/// Completeness rules shared by every backend.
///
/// `lookup` resolves a handle to its description, `None` for dead handles.
pub(crate) fn validate_target_descs(
    target: &TargetBinding,
    max_color_attachments: usize,
    lookup: impl Fn(AttachmentId) -> Option<AttachmentDesc>,
) -> Result<(), BackendError> {
    if target.colors.is_empty() && target.depth.is_none() {
        return Err(BackendError::IncompleteTarget("no attachments".into()));
    }
    if target.colors.len() > max_color_attachments {
        return Err(BackendError::IncompleteTarget(format!(
            "{} color attachments exceed the limit of {max_color_attachments}",
            target.colors.len()
        )));
    }

    let mut first: Option<AttachmentDesc> = None;
    for (i, id) in target.attachments().enumerate() {
        let desc = lookup(id).ok_or(BackendError::UnknownAttachment(id))?;
        let is_depth_slot = i >= target.colors.len();
        if desc.format.is_depth() != is_depth_slot {
            return Err(BackendError::IncompleteTarget(format!(
                "{id} has format {:?} in a {} slot",
                desc.format,
                if is_depth_slot { "depth" } else { "color" }
            )));
        }
        if desc.format == AttachmentFormat::ColorInt32 && desc.samples > 1 {
            return Err(BackendError::IncompleteTarget(format!(
                "integer attachment {id} cannot be multisampled"
            )));
        }
        match first {
            None => first = Some(desc),
            Some(f) if (f.width, f.height, f.samples) != (desc.width, desc.height, desc.samples) => {
                return Err(BackendError::IncompleteTarget(format!(
                    "{id} is {}x{} ({} samples), expected {}x{} ({} samples)",
                    desc.width, desc.height, desc.samples, f.width, f.height, f.samples
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
