//! # Multi-attachment framebuffer
//!
//! An offscreen render target made of up to four color attachments (RGBA8 or
//! signed-int32) plus at most one depth/stencil attachment. Color attachments
//! keep their declaration order: index 0 is what the viewport displays and the
//! `ColorInt32` attachment (conventionally index 1) holds per-pixel entity ids.
//!
//! Lifecycle: [`Framebuffer::create`] yields a ready target or an error, a
//! valid [`Framebuffer::resize`] reallocates storage in place, and
//! [`Framebuffer::dispose`] releases everything exactly once.

use thiserror::Error;

use crate::paint::Color;

use super::backend::{
    AttachmentDesc, AttachmentFormat, AttachmentId, BackendError, ClearValue, RenderBackend,
    TargetBinding,
};

/// Hard cap on either framebuffer dimension.
pub const MAX_FRAMEBUFFER_DIMENSION: u32 = 8192;

/// Color attachments a framebuffer may declare, whatever the backend supports.
pub const MAX_COLOR_ATTACHMENTS: usize = 4;

/// Color attachment index conventionally holding entity ids.
pub const ENTITY_ID_ATTACHMENT: usize = 1;

/// Value [`Framebuffer::read_pixel`] returns for rejected reads.
pub const INVALID_PIXEL: i32 = -1;

#[derive(Debug, Error)]
pub enum FramebufferError {
    #[error("invalid framebuffer spec: {0}")]
    InvalidSpec(String),

    #[error("framebuffer incomplete: {0}")]
    Incomplete(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Size, sample count and ordered attachment formats.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FramebufferSpec {
    pub width: u32,
    pub height: u32,
    /// 1 disables multisampling; 4 is the only other supported count.
    pub samples: u32,
    pub attachments: Vec<AttachmentFormat>,
}

impl FramebufferSpec {
    /// Viewport layout: display color, entity ids, depth/stencil.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples: 1,
            attachments: vec![
                AttachmentFormat::Color8888,
                AttachmentFormat::ColorInt32,
                AttachmentFormat::DepthStencil,
            ],
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_attachments(mut self, attachments: impl Into<Vec<AttachmentFormat>>) -> Self {
        self.attachments = attachments.into();
        self
    }

    pub fn color_formats(&self) -> impl Iterator<Item = AttachmentFormat> + '_ {
        self.attachments.iter().copied().filter(|f| f.is_color())
    }

    pub fn has_depth(&self) -> bool {
        self.attachments.iter().any(|f| f.is_depth())
    }

    pub fn validate(&self) -> Result<(), FramebufferError> {
        if !valid_dimension(self.width) || !valid_dimension(self.height) {
            return Err(FramebufferError::InvalidSpec(format!(
                "size {}x{} outside 1..={MAX_FRAMEBUFFER_DIMENSION}",
                self.width, self.height
            )));
        }
        if !matches!(self.samples, 1 | 4) {
            return Err(FramebufferError::InvalidSpec(format!(
                "unsupported sample count {}",
                self.samples
            )));
        }
        if self.attachments.is_empty() {
            return Err(FramebufferError::InvalidSpec("no attachments".into()));
        }
        let depth = self.attachments.iter().filter(|f| f.is_depth()).count();
        if depth > 1 {
            return Err(FramebufferError::InvalidSpec(format!(
                "{depth} depth/stencil attachments, at most one allowed"
            )));
        }
        let colors = self.attachments.len() - depth;
        if colors > MAX_COLOR_ATTACHMENTS {
            return Err(FramebufferError::InvalidSpec(format!(
                "{colors} color attachments, at most {MAX_COLOR_ATTACHMENTS} allowed"
            )));
        }
        Ok(())
    }
}

#[inline]
fn valid_dimension(v: u32) -> bool {
    (1..=MAX_FRAMEBUFFER_DIMENSION).contains(&v)
}

#[derive(Debug)]
pub struct Framebuffer {
    spec: FramebufferSpec,
    color_formats: Vec<AttachmentFormat>,
    target: TargetBinding,
    disposed: bool,
}

impl Framebuffer {
    /// Allocates every attachment and checks the result is complete.
    ///
    /// Nothing is leaked on failure: storage allocated before the error is released.
    pub fn create<B: RenderBackend + ?Sized>(
        backend: &mut B,
        spec: FramebufferSpec,
    ) -> Result<Self, FramebufferError> {
        spec.validate()?;

        let target = allocate(backend, &spec)?;
        let fb = Self {
            color_formats: spec.color_formats().collect(),
            spec,
            target,
            disposed: false,
        };

        log::debug!(
            "framebuffer created: {}x{}, {} samples, {:?}",
            fb.spec.width,
            fb.spec.height,
            fb.spec.samples,
            fb.spec.attachments
        );
        Ok(fb)
    }

    #[inline]
    pub fn spec(&self) -> &FramebufferSpec {
        &self.spec
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.spec.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.spec.height
    }

    /// Attachments bound while this framebuffer is the draw target.
    #[inline]
    pub fn target(&self) -> &TargetBinding {
        &self.target
    }

    /// Handle of color attachment `index`, for display or direct backend use.
    pub fn color_attachment(&self, index: usize) -> Option<AttachmentId> {
        if self.disposed {
            return None;
        }
        self.target.colors.get(index).copied()
    }

    pub fn color_format(&self, index: usize) -> Option<AttachmentFormat> {
        self.color_formats.get(index).copied()
    }

    pub fn depth_attachment(&self) -> Option<AttachmentId> {
        if self.disposed {
            return None;
        }
        self.target.depth
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_bound<B: RenderBackend + ?Sized>(&self, backend: &B) -> bool {
        !self.disposed && backend.bound_target() == Some(&self.target)
    }

    /// Reallocates every attachment at `width × height`.
    ///
    /// Returns `Ok(false)` when the request is ignored: a zero or over-cap
    /// dimension, an unchanged size, a bound or disposed framebuffer. If the new
    /// storage cannot be created the framebuffer ends up disposed and the error
    /// is returned.
    pub fn resize<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<bool, FramebufferError> {
        if self.disposed {
            log::warn!("resize of a disposed framebuffer ignored");
            return Ok(false);
        }
        if !valid_dimension(width) || !valid_dimension(height) {
            log::warn!(
                "framebuffer resize to {width}x{height} ignored (limits 1..={MAX_FRAMEBUFFER_DIMENSION})"
            );
            return Ok(false);
        }
        if self.is_bound(backend) {
            log::warn!("framebuffer resize while bound ignored; resize between frames");
            return Ok(false);
        }
        if (width, height) == (self.spec.width, self.spec.height) {
            return Ok(false);
        }

        self.release_attachments(backend);
        self.spec.width = width;
        self.spec.height = height;

        match allocate(backend, &self.spec) {
            Ok(target) => {
                self.target = target;
                log::debug!("framebuffer resized to {width}x{height}");
                Ok(true)
            }
            Err(e) => {
                self.target = TargetBinding::default();
                self.disposed = true;
                Err(e)
            }
        }
    }

    /// Redirects subsequent draws into this framebuffer.
    pub fn bind<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        if self.disposed {
            log::warn!("bind of a disposed framebuffer ignored");
            return;
        }
        backend.bind_target(Some(self.target.clone()));
    }

    /// Restores the default target if this framebuffer is bound.
    pub fn unbind<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        if self.is_bound(backend) {
            backend.bind_target(None);
        }
    }

    /// Reads one texel of color attachment `index`, origin top-left.
    ///
    /// Rejected reads (bad index, out-of-range coordinates, backend failure)
    /// return [`INVALID_PIXEL`]. The bound target is left as it was.
    pub fn read_pixel<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        index: usize,
        x: u32,
        y: u32,
    ) -> i32 {
        let Some(id) = self.color_attachment(index) else {
            log::warn!("read_pixel: no color attachment {index}");
            return INVALID_PIXEL;
        };
        if x >= self.spec.width || y >= self.spec.height {
            log::warn!(
                "read_pixel: ({x}, {y}) outside {}x{}",
                self.spec.width,
                self.spec.height
            );
            return INVALID_PIXEL;
        }
        match backend.read_pixel(id, x, y) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("read_pixel failed: {e}");
                INVALID_PIXEL
            }
        }
    }

    /// Clears color attachment `index` only.
    ///
    /// Integer attachments take an `i32`, RGBA8 attachments a [`Color`];
    /// a mismatched value is ignored with a warning.
    pub fn clear_attachment<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        index: usize,
        value: impl Into<ClearValue>,
    ) {
        let value = value.into();
        let (Some(id), Some(format)) = (self.color_attachment(index), self.color_format(index))
        else {
            log::warn!("clear_attachment: no color attachment {index}");
            return;
        };
        let matches = matches!(
            (format, value),
            (AttachmentFormat::ColorInt32, ClearValue::Int(_))
                | (AttachmentFormat::Color8888, ClearValue::Color(_))
        );
        if !matches {
            log::warn!("clear_attachment: {value:?} does not fit {format:?} attachment {index}");
            return;
        }
        backend.clear_attachment(id, value);
    }

    /// Clears every RGBA8 attachment to `color` and depth/stencil to `(1.0, 0)`.
    ///
    /// Integer attachments are left alone; clear them with [`Self::clear_attachment`].
    pub fn clear<B: RenderBackend + ?Sized>(&self, backend: &mut B, color: Color) {
        if self.disposed {
            return;
        }
        for (id, format) in self.target.colors.iter().zip(&self.color_formats) {
            if *format == AttachmentFormat::Color8888 {
                backend.clear_attachment(*id, ClearValue::Color(color));
            }
        }
        if let Some(depth) = self.target.depth {
            backend.clear_attachment(
                depth,
                ClearValue::DepthStencil {
                    depth: 1.0,
                    stencil: 0,
                },
            );
        }
    }

    /// Releases all storage. Idempotent.
    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.disposed {
            return;
        }
        self.unbind(backend);
        self.release_attachments(backend);
        self.target = TargetBinding::default();
        self.disposed = true;
        log::debug!("framebuffer disposed");
    }

    fn release_attachments<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        for id in self.target.attachments() {
            backend.release_attachment(id);
        }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !self.disposed {
            log::warn!(
                "framebuffer {}x{} dropped without dispose; GPU storage leaked",
                self.spec.width,
                self.spec.height
            );
        }
    }
}

/// Allocates storage for `spec` and validates completeness.
fn allocate<B: RenderBackend + ?Sized>(
    backend: &mut B,
    spec: &FramebufferSpec,
) -> Result<TargetBinding, FramebufferError> {
    let mut target = TargetBinding::default();

    for &format in &spec.attachments {
        let desc = AttachmentDesc {
            format,
            width: spec.width,
            height: spec.height,
            samples: spec.samples,
        };
        match backend.create_attachment(&desc) {
            Ok(id) if format.is_depth() => target.depth = Some(id),
            Ok(id) => target.colors.push(id),
            Err(e) => {
                release_all(backend, &target);
                return Err(e.into());
            }
        }
    }

    if let Err(e) = backend.validate_target(&target) {
        release_all(backend, &target);
        return Err(match e {
            BackendError::IncompleteTarget(reason) => FramebufferError::Incomplete(reason),
            other => other.into(),
        });
    }

    Ok(target)
}

fn release_all<B: RenderBackend + ?Sized>(backend: &mut B, target: &TargetBinding) {
    for id in target.attachments() {
        backend.release_attachment(id);
    }
}
