//! Paint model shared between the renderer and applications.
//!
//! Scope is intentionally small: a linear RGBA tint color. Images are
//! textures and live in `render::texture`.

pub mod color;

pub use color::Color;
