//! wgpu device and window surface.
//!
//! Creates the Instance/Adapter/Device/Queue, configures the swapchain and
//! hands out per-frame encoders. Offscreen rendering goes through
//! `render::WgpuBackend`, built from the same device and queue.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
