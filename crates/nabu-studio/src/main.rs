mod app;
mod scene;

use anyhow::Result;
use nabu_engine::device::GpuInit;
use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::app::StudioApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "nabu studio".to_string(),
        initial_size: LogicalSize::new(1280.0, 720.0),
    };
    Runtime::run(config, GpuInit::default(), StudioApp::new())
}
