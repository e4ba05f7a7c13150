//! 2D orthographic camera and its keyboard/scroll controller.

mod controller;
mod orthographic;

pub use controller::{CameraConfig, OrthographicCameraController};
pub use orthographic::{OrthographicCamera, OrthographicCameraBounds};
