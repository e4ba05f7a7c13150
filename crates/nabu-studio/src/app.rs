use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec2;
use winit::window::WindowId;

use nabu_engine::camera::{CameraConfig, OrthographicCameraController};
use nabu_engine::coords::Rect;
use nabu_engine::core::{App, AppControl, FrameCtx};
use nabu_engine::device::Gpu;
use nabu_engine::input::{InputEvent, KeySet};
use nabu_engine::paint::Color;
use nabu_engine::render::{BatchConfig, BatchRenderer, BlitRenderer, Texture2D, WgpuBackend};
use nabu_engine::viewport::ViewportPanel;

use crate::scene::Scene;

/// Gap between the window edge and the viewport panel, logical pixels.
const PANEL_MARGIN: f32 = 24.0;
/// Frames between render-stat log lines.
const STATS_INTERVAL: u64 = 300;

/// GPU-side state, created on the first frame once a device exists.
struct GpuState {
    backend: WgpuBackend,
    renderer: BatchRenderer,
    panel: ViewportPanel,
    blit: BlitRenderer,
    checker: Texture2D,
}

impl GpuState {
    fn new(gpu: &Gpu<'_>, bounds: Rect, scale_factor: f32) -> Result<Self> {
        let mut backend = WgpuBackend::new(gpu.device(), gpu.queue());
        let renderer = BatchRenderer::new(&mut backend, BatchConfig::default())
            .context("failed to create batch renderer")?;
        let checker = Texture2D::checkerboard(&mut backend, 2, 8, [235, 235, 235, 255], [150, 150, 160, 255])
            .context("failed to create checkerboard texture")?;
        let panel = ViewportPanel::new(&mut backend, bounds, scale_factor)
            .context("failed to create viewport framebuffer")?;

        Ok(Self {
            backend,
            renderer,
            panel,
            blit: BlitRenderer::new(),
            checker,
        })
    }

    fn release(&mut self) {
        self.panel.dispose(&mut self.backend);
        self.checker.release(&mut self.backend);
        self.renderer.release(&mut self.backend);
    }
}

pub struct StudioApp {
    gpu: Option<GpuState>,
    /// Created on the first frame, sharing the window's held-key set.
    camera: Option<OrthographicCameraController>,
    scene: Scene,
    hovered: Option<i32>,
}

impl StudioApp {
    pub fn new() -> Self {
        Self {
            gpu: None,
            camera: None,
            scene: Scene::grid(),
            hovered: None,
        }
    }

    fn update_hover(&mut self, hovered: Option<i32>) {
        if hovered == self.hovered {
            return;
        }
        self.hovered = hovered;
        match hovered.and_then(|id| self.scene.entity(id)) {
            Some(entity) => log::info!("hovering entity {} ({})", entity.id, entity.name),
            None if hovered.is_some() => log::warn!("picked id {hovered:?} matches no entity"),
            None => log::debug!("hover cleared"),
        }
    }
}

fn studio_camera(panel_size: Vec2, keys: Arc<KeySet>) -> OrthographicCameraController {
    let config = CameraConfig {
        rotation_enabled: true,
        ..CameraConfig::default()
    };
    OrthographicCameraController::with_keys(panel_size.x / panel_size.y, config, keys)
}

fn panel_bounds(window_size: Vec2) -> Rect {
    Rect::from_origin_size(Vec2::ZERO, window_size).inset(PANEL_MARGIN)
}

impl App for StudioApp {
    fn on_input(&mut self, _window_id: WindowId, event: &InputEvent) -> AppControl {
        // Held keys reach the camera through the shared set; the panel decides its aspect ratio.
        if let (Some(camera), InputEvent::MouseWheel { .. }) = (self.camera.as_mut(), event) {
            camera.on_event(event);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let dt = ctx.time.dt;
        self.scene.update(dt);

        let scale = ctx.window.scale_factor();
        let bounds = panel_bounds(ctx.window.logical_size());

        if self.gpu.is_none() {
            match GpuState::new(ctx.gpu, bounds, scale) {
                Ok(state) => {
                    self.camera = Some(studio_camera(state.panel.bounds().size, ctx.input.keys()));
                    self.gpu = Some(state);
                }
                Err(e) => {
                    log::error!("{e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let (Some(gpu), Some(camera)) = (self.gpu.as_mut(), self.camera.as_mut()) else {
            return AppControl::Exit;
        };
        camera.on_update(dt);

        match gpu.panel.set_bounds(&mut gpu.backend, bounds, scale) {
            Ok(Some(size)) => {
                camera.on_resize(size.x, size.y);
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("viewport framebuffer lost: {e}");
                return AppControl::Exit;
            }
        }

        let scene = &self.scene;
        let hovered = self.hovered;
        let checker = &gpu.checker;
        gpu.panel.render(
            &mut gpu.backend,
            &mut gpu.renderer,
            camera.camera().view_projection(),
            |renderer, backend| scene.draw(renderer, backend, checker, hovered),
        );

        let pointer = ctx.input.pointer_pos.map(|(x, y)| Vec2::new(x, y));
        let picked = pointer.and_then(|p| gpu.panel.hovered_entity(&mut gpu.backend, p));

        if ctx.time.frame_index % STATS_INTERVAL == 0 {
            let stats = gpu.renderer.stats();
            log::debug!(
                "{:.0} fps, {} draw calls, {} quads",
                ctx.time.fps(),
                stats.draw_calls,
                stats.quad_count
            );
        }
        gpu.renderer.reset_stats();

        let (backend, blit, panel) = (&gpu.backend, &mut gpu.blit, &gpu.panel);
        let control = ctx.render(Color::new(0.05, 0.05, 0.06, 1.0), |rctx, target| {
            let Some(view) = panel
                .display_attachment()
                .and_then(|id| backend.attachment_view(id))
            else {
                return;
            };
            blit.render(rctx, target, view, panel.bounds());
        });

        self.update_hover(picked);
        control
    }

    fn on_exit(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            gpu.release();
        }
    }
}
