/// One acquired swapchain frame.
///
/// Presented when dropped after `Gpu::submit`. Holding it blocks acquisition of
/// the next frame.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
