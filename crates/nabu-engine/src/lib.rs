//! nabu engine crate.
//!
//! Batched 2D quad rendering into multi-attachment framebuffers, with
//! entity-id picking, an orthographic camera, and the winit/wgpu runtime that
//! hosts them.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod render;
pub mod camera;
pub mod viewport;
