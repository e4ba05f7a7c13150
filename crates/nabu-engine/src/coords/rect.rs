use glam::Vec2;

/// Axis-aligned rectangle in logical pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let min = self.origin.min(self.origin + self.size);
        let max = self.origin.max(self.origin + self.size);
        Rect::from_origin_size(min, max - min)
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let r = self.normalized();
        p.x >= r.origin.x && p.y >= r.origin.y && p.x < r.max().x && p.y < r.max().y
    }

    /// Converts a point in the same space as `self` into coordinates relative to `origin`.
    #[inline]
    pub fn to_local(self, p: Vec2) -> Vec2 {
        p - self.origin
    }

    /// Scales origin and size by `factor` (logical → physical pixels).
    #[inline]
    pub fn scaled(self, factor: f32) -> Self {
        Rect::from_origin_size(self.origin * factor, self.size * factor)
    }

    /// Shrinks the rectangle by `amount` on every side, never below zero size.
    #[inline]
    pub fn inset(self, amount: f32) -> Self {
        let r = self.normalized();
        let size = (r.size - Vec2::splat(2.0 * amount)).max(Vec2::ZERO);
        Rect::from_origin_size(r.origin + Vec2::splat(amount), size)
    }
}
