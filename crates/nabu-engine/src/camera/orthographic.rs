use glam::{Mat4, Vec3};

/// Near/far planes of every orthographic projection; quads at z = 0 land at depth 0.5.
const NEAR: f32 = -1.0;
const FAR: f32 = 1.0;

/// Projection bounds in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrthographicCameraBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl OrthographicCameraBounds {
    /// Bounds of an `aspect_ratio`-wide view of half-height `zoom` around the origin.
    pub fn from_zoom(aspect_ratio: f32, zoom: f32) -> Self {
        Self {
            left: -aspect_ratio * zoom,
            right: aspect_ratio * zoom,
            bottom: -zoom,
            top: zoom,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// 2D camera: orthographic projection, position and rotation about Z.
///
/// View, projection and their product are cached and recomputed by every setter.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    projection: Mat4,
    view: Mat4,
    view_projection: Mat4,

    position: Vec3,
    /// Degrees, counter-clockwise.
    rotation: f32,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        let projection = Mat4::orthographic_rh(left, right, bottom, top, NEAR, FAR);
        Self {
            projection,
            view: Mat4::IDENTITY,
            view_projection: projection,
            position: Vec3::ZERO,
            rotation: 0.0,
        }
    }

    pub fn from_bounds(bounds: OrthographicCameraBounds) -> Self {
        Self::new(bounds.left, bounds.right, bounds.bottom, bounds.top)
    }

    pub fn set_projection(&mut self, left: f32, right: f32, bottom: f32, top: f32) {
        self.projection = Mat4::orthographic_rh(left, right, bottom, top, NEAR, FAR);
        self.view_projection = self.projection * self.view;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recalculate_view();
    }

    /// Sets the rotation in degrees.
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
        self.recalculate_view();
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    fn recalculate_view(&mut self) {
        let transform = Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.to_radians());
        self.view = transform.inverse();
        self.view_projection = self.projection * self.view;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec4};

    fn clip(camera: &OrthographicCamera, p: Vec3) -> Vec2 {
        let c = camera.view_projection() * Vec4::new(p.x, p.y, p.z, 1.0);
        Vec2::new(c.x, c.y) / c.w
    }

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn bounds_map_to_clip_corners() {
        let camera = OrthographicCamera::new(-2.0, 2.0, -1.0, 1.0);
        assert!(approx(clip(&camera, Vec3::new(-2.0, -1.0, 0.0)), Vec2::new(-1.0, -1.0)));
        assert!(approx(clip(&camera, Vec3::new(2.0, 1.0, 0.0)), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn z_zero_is_mid_depth() {
        let camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        let c = camera.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((c.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn position_moves_world_the_other_way() {
        let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        camera.set_position(Vec3::new(0.5, 0.0, 0.0));
        assert!(approx(clip(&camera, Vec3::new(0.5, 0.0, 0.0)), Vec2::ZERO));
        assert!(approx(clip(&camera, Vec3::ZERO), Vec2::new(-0.5, 0.0)));
    }

    #[test]
    fn rotation_is_counter_clockwise_degrees() {
        let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        camera.set_rotation(90.0);
        // Camera turned left: a point on world +Y appears on screen +X.
        assert!(approx(clip(&camera, Vec3::new(0.0, 0.5, 0.0)), Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn set_projection_keeps_view() {
        let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
        camera.set_position(Vec3::new(1.0, 0.0, 0.0));
        camera.set_projection(-2.0, 2.0, -2.0, 2.0);
        assert_eq!(camera.view_projection(), camera.projection() * camera.view());
        assert!(approx(clip(&camera, Vec3::new(1.0, 0.0, 0.0)), Vec2::ZERO));
    }

    #[test]
    fn bounds_from_zoom() {
        let b = OrthographicCameraBounds::from_zoom(2.0, 1.5);
        assert_eq!(b.width(), 6.0);
        assert_eq!(b.height(), 3.0);
    }
}
