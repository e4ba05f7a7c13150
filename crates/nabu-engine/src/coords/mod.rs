//! Screen-space geometry shared by the runtime, the viewport panel and picking.
//!
//! Canonical CPU space for UI-level coordinates:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! World-space math (transforms, camera matrices) uses `glam` directly.

mod rect;

pub use rect::Rect;
