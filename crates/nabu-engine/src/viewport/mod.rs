//! Viewport panel: an offscreen scene shown inside the window, with hover picking.

mod panel;

pub use panel::ViewportPanel;
