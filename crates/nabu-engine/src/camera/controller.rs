use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::orthographic::{OrthographicCamera, OrthographicCameraBounds};
use crate::input::{scroll_lines, InputEvent, Key, KeySet, KeyState, MouseWheelDelta};

/// Controller tuning. Zoom is the half-height of the view in world units.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub default_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom change per scroll line.
    pub zoom_sensitivity: f32,
    /// Used when a resize yields a non-finite aspect ratio.
    pub default_aspect_ratio: f32,
    /// World units per second at zoom 1.
    pub translation_speed: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub rotation_enabled: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_zoom: 1.0,
            min_zoom: 0.25,
            max_zoom: 10.0,
            zoom_sensitivity: 0.25,
            default_aspect_ratio: 16.0 / 9.0,
            translation_speed: 1.0,
            rotation_speed: 180.0,
            rotation_enabled: false,
        }
    }
}

/// Keyboard/scroll driven orthographic camera.
///
/// Key state lives in a shared `KeySet`, so key events may be fed from the
/// platform thread while `on_update` runs on the render thread.
#[derive(Debug)]
pub struct OrthographicCameraController {
    config: CameraConfig,
    aspect_ratio: f32,
    zoom_level: f32,
    bounds: OrthographicCameraBounds,
    camera: OrthographicCamera,

    position: Vec3,
    rotation: f32,

    /// Scales translation and rotation speed.
    pub speed_multiplier: f32,

    keys: Arc<KeySet>,
}

impl OrthographicCameraController {
    pub fn new(aspect_ratio: f32, config: CameraConfig) -> Self {
        Self::with_keys(aspect_ratio, config, Arc::new(KeySet::new()))
    }

    /// Controller reading key state from an existing set (e.g. `InputState::keys`).
    pub fn with_keys(aspect_ratio: f32, config: CameraConfig, keys: Arc<KeySet>) -> Self {
        let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            config.default_aspect_ratio
        };
        let zoom_level = config.default_zoom.clamp(config.min_zoom, config.max_zoom);
        let bounds = OrthographicCameraBounds::from_zoom(aspect_ratio, zoom_level);

        Self {
            camera: OrthographicCamera::from_bounds(bounds),
            config,
            aspect_ratio,
            zoom_level,
            bounds,
            position: Vec3::ZERO,
            rotation: 0.0,
            speed_multiplier: 1.0,
            keys,
        }
    }

    /// Moves and rotates the camera from the held keys.
    pub fn on_update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let held = |a: Key, b: Key| self.keys.contains(a) || self.keys.contains(b);
        let mut local = Vec2::ZERO;
        if held(Key::A, Key::ArrowLeft) {
            local.x -= 1.0;
        }
        if held(Key::D, Key::ArrowRight) {
            local.x += 1.0;
        }
        if held(Key::W, Key::ArrowUp) {
            local.y += 1.0;
        }
        if held(Key::S, Key::ArrowDown) {
            local.y -= 1.0;
        }

        let mut spin = 0.0;
        if self.config.rotation_enabled {
            if self.keys.contains(Key::Q) {
                spin += 1.0;
            }
            if self.keys.contains(Key::E) {
                spin -= 1.0;
            }
        }

        if local != Vec2::ZERO {
            let speed = self.config.translation_speed * self.speed_multiplier * self.zoom_level;
            let world = Vec2::from_angle(self.rotation.to_radians()).rotate(local);
            self.position += (world * speed * dt).extend(0.0);
            self.camera.set_position(self.position);
        }

        if spin != 0.0 {
            let step = spin * self.config.rotation_speed * self.speed_multiplier * dt;
            self.rotation = wrap_degrees(self.rotation + step);
            self.camera.set_rotation(self.rotation);
        }
    }

    /// Feeds one input event. Returns `true` if the camera consumed it.
    pub fn on_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key { key, state, .. } => {
                match state {
                    KeyState::Pressed => self.keys.insert(*key),
                    KeyState::Released => self.keys.remove(*key),
                };
                false
            }
            InputEvent::MouseWheel { delta, .. } => self.on_scroll(*delta),
            InputEvent::Resized { width, height } => self.on_resize(*width, *height),
            InputEvent::Focused(false) => {
                self.keys.clear();
                false
            }
            _ => false,
        }
    }

    /// Applies a wheel delta to the zoom level. Non-finite deltas are ignored.
    pub fn on_scroll(&mut self, delta: MouseWheelDelta) -> bool {
        let lines = scroll_lines(delta);
        if !lines.is_finite() {
            log::warn!("ignoring non-finite scroll delta {delta:?}");
            return false;
        }
        self.set_zoom_level(self.zoom_level - lines * self.config.zoom_sensitivity);
        true
    }

    /// Recomputes the aspect ratio from a view size.
    ///
    /// Non-positive (or NaN) sizes are rejected without touching any state.
    pub fn on_resize(&mut self, width: f32, height: f32) -> bool {
        if !(width > 0.0 && height > 0.0) {
            log::warn!("ignoring camera resize to {width}x{height}");
            return false;
        }

        let aspect = width / height;
        self.aspect_ratio = if aspect.is_finite() {
            aspect
        } else {
            log::warn!(
                "aspect ratio of {width}x{height} is not finite; using {}",
                self.config.default_aspect_ratio
            );
            self.config.default_aspect_ratio
        };
        self.update_projection();
        true
    }

    /// Sets the zoom level, clamped to the configured range.
    pub fn set_zoom_level(&mut self, zoom: f32) {
        if zoom.is_nan() {
            return;
        }
        self.zoom_level = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        self.update_projection();
    }

    #[inline]
    pub fn zoom_level(&self) -> f32 {
        self.zoom_level
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    #[inline]
    pub fn bounds(&self) -> OrthographicCameraBounds {
        self.bounds
    }

    #[inline]
    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    #[inline]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Shared handle to the held-key set.
    pub fn keys(&self) -> Arc<KeySet> {
        Arc::clone(&self.keys)
    }

    fn update_projection(&mut self) {
        self.bounds = OrthographicCameraBounds::from_zoom(self.aspect_ratio, self.zoom_level);
        let b = self.bounds;
        self.camera.set_projection(b.left, b.right, b.bottom, b.top);
    }
}

/// Wraps an angle in degrees into `(-180, 180]`.
fn wrap_degrees(degrees: f32) -> f32 {
    let d = degrees.rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn controller() -> OrthographicCameraController {
        OrthographicCameraController::new(2.0, CameraConfig::default())
    }

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, modifiers: Modifiers::default(), code: 0, repeat: false }
    }

    fn wheel(delta: MouseWheelDelta) -> InputEvent {
        InputEvent::MouseWheel { delta, modifiers: Modifiers::default() }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    // ── zoom ──────────────────────────────────────────────────────────────

    #[test]
    fn scroll_adjusts_zoom_by_sensitivity() {
        let mut c = controller();
        assert!(c.on_event(&wheel(MouseWheelDelta::Line { x: 0.0, y: 2.0 })));
        assert!(close(c.zoom_level(), 0.5));
        assert!(close(c.bounds().height(), 1.0));
        assert!(close(c.bounds().width(), 2.0));
    }

    #[test]
    fn zoom_stays_clamped_after_any_scroll_sequence() {
        let mut c = controller();
        let deltas = [5.0, -100.0, 3.5, 1e9, -1e9, 0.1, -0.7, 40.0];
        for y in deltas {
            c.on_event(&wheel(MouseWheelDelta::Line { x: 0.0, y }));
            let z = c.zoom_level();
            assert!((0.25..=10.0).contains(&z), "zoom {z} out of range");
        }
        c.on_event(&wheel(MouseWheelDelta::Line { x: 0.0, y: 1e9 }));
        assert_eq!(c.zoom_level(), 0.25);
        c.on_event(&wheel(MouseWheelDelta::Line { x: 0.0, y: -1e9 }));
        assert_eq!(c.zoom_level(), 10.0);
    }

    #[test]
    fn pixel_scroll_is_converted_to_lines() {
        let mut c = controller();
        c.on_event(&wheel(MouseWheelDelta::Pixel { x: 0.0, y: 40.0 }));
        assert!(close(c.zoom_level(), 0.5));
    }

    #[test]
    fn non_finite_scroll_is_ignored() {
        let mut c = controller();
        assert!(!c.on_event(&wheel(MouseWheelDelta::Line { x: 0.0, y: f32::NAN })));
        assert!(!c.on_event(&wheel(MouseWheelDelta::Pixel { x: 0.0, y: f32::INFINITY })));
        assert_eq!(c.zoom_level(), 1.0);
    }

    #[test]
    fn set_zoom_level_clamps() {
        let mut c = controller();
        c.set_zoom_level(100.0);
        assert_eq!(c.zoom_level(), 10.0);
        c.set_zoom_level(f32::NAN);
        assert_eq!(c.zoom_level(), 10.0);
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_sets_exact_aspect_ratio() {
        let mut c = controller();
        assert!(c.on_event(&InputEvent::Resized { width: 800.0, height: 600.0 }));
        assert_eq!(c.aspect_ratio(), 800.0 / 600.0);
        assert!(close(c.bounds().width(), 2.0 * 800.0 / 600.0));
    }

    #[test]
    fn invalid_resize_leaves_state_untouched() {
        let mut c = controller();
        let bounds = c.bounds();
        for (w, h) in [(0.0, 600.0), (800.0, 0.0), (-1.0, 5.0), (f32::NAN, 1.0)] {
            assert!(!c.on_resize(w, h));
            assert_eq!(c.aspect_ratio(), 2.0);
            assert_eq!(c.bounds(), bounds);
        }
    }

    #[test]
    fn infinite_aspect_falls_back_to_default() {
        let mut c = controller();
        assert!(c.on_resize(f32::MAX, f32::MIN_POSITIVE));
        assert_eq!(c.aspect_ratio(), 16.0 / 9.0);
        assert!(c.camera().view_projection().is_finite());
    }

    #[test]
    fn invalid_initial_aspect_uses_default() {
        let c = OrthographicCameraController::new(f32::NAN, CameraConfig::default());
        assert_eq!(c.aspect_ratio(), 16.0 / 9.0);
    }

    // ── movement ──────────────────────────────────────────────────────────

    #[test]
    fn movement_scales_with_zoom_and_dt() {
        let mut c = controller();
        c.set_zoom_level(2.0);
        c.on_event(&key(Key::D, KeyState::Pressed));
        c.on_update(0.5);
        assert!(close(c.camera().position().x, 1.0));
        assert!(close(c.camera().position().y, 0.0));

        c.on_event(&key(Key::D, KeyState::Released));
        c.on_update(0.5);
        assert!(close(c.camera().position().x, 1.0));
    }

    #[test]
    fn speed_multiplier_scales_movement() {
        let mut c = controller();
        c.speed_multiplier = 3.0;
        c.on_event(&key(Key::ArrowUp, KeyState::Pressed));
        c.on_update(1.0);
        assert!(close(c.camera().position().y, 3.0));
    }

    #[test]
    fn movement_follows_rotation() {
        let config = CameraConfig { rotation_enabled: true, ..CameraConfig::default() };
        let mut c = OrthographicCameraController::new(1.0, config);
        c.on_event(&key(Key::Q, KeyState::Pressed));
        c.on_update(0.5);
        assert!(close(c.camera().rotation(), 90.0));
        c.on_event(&key(Key::Q, KeyState::Released));

        c.on_event(&key(Key::W, KeyState::Pressed));
        c.on_update(1.0);
        let p = c.camera().position();
        assert!(close(p.x, -1.0) && close(p.y, 0.0), "moved to {p:?}");
    }

    #[test]
    fn rotation_wraps_and_respects_enable_flag() {
        let mut disabled = controller();
        disabled.on_event(&key(Key::Q, KeyState::Pressed));
        disabled.on_update(1.0);
        assert_eq!(disabled.camera().rotation(), 0.0);

        let config = CameraConfig { rotation_enabled: true, ..CameraConfig::default() };
        let mut c = OrthographicCameraController::new(1.0, config);
        c.on_event(&key(Key::E, KeyState::Pressed));
        c.on_update(1.5);
        assert!(close(c.camera().rotation(), 90.0));

        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(270.0), -90.0);
        assert_eq!(wrap_degrees(720.0), 0.0);
    }

    #[test]
    fn bad_dt_does_nothing() {
        let mut c = controller();
        c.on_event(&key(Key::D, KeyState::Pressed));
        c.on_update(f32::NAN);
        c.on_update(-1.0);
        assert_eq!(c.camera().position(), Vec3::ZERO);
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut c = controller();
        c.on_event(&key(Key::D, KeyState::Pressed));
        c.on_event(&InputEvent::Focused(false));
        c.on_update(1.0);
        assert_eq!(c.camera().position(), Vec3::ZERO);
    }

    #[test]
    fn keys_from_another_thread_drive_update() {
        let mut c = controller();
        let keys = c.keys();
        std::thread::spawn(move || {
            keys.insert(Key::S);
        })
        .join()
        .unwrap();

        c.on_update(1.0);
        assert!(close(c.camera().position().y, -1.0));
    }

    #[test]
    fn input_state_keys_drive_shared_controller() {
        use crate::input::{InputFrame, InputState};

        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let mut c = OrthographicCameraController::with_keys(2.0, CameraConfig::default(), state.keys());

        state.apply_event(&mut frame, key(Key::D, KeyState::Pressed));
        c.on_update(1.0);
        assert!(close(c.camera().position().x, 1.0));

        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(c.keys().is_empty());
        c.on_update(1.0);
        assert!(close(c.camera().position().x, 1.0));
    }
}
