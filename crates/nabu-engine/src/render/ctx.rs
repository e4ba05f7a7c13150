use glam::Vec2;

/// Renderer-facing context for surface passes (device/queue + surface format + size).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Surface size in logical pixels.
    pub surface_size: Vec2,
    /// Physical pixels per logical pixel.
    pub scale_factor: f32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: Vec2,
        scale_factor: f32,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            surface_size,
            scale_factor,
        }
    }

    /// Surface size in physical pixels.
    #[inline]
    pub fn physical_size(&self) -> Vec2 {
        (self.surface_size * self.scale_factor).round()
    }
}

/// Surface pass target (frame encoder + swapchain view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
