//! Demo scene: a grid of entities, some textured, one slowly spinning.

use glam::{Vec2, Vec3};
use nabu_engine::paint::Color;
use nabu_engine::render::{BatchRenderer, Quad, RenderBackend, Texture2D};

pub const GRID: i32 = 12;
const SPACING: f32 = 0.3;
const TILE: f32 = 0.24;

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i32,
    pub name: String,
    pub position: Vec3,
    pub color: Color,
    pub textured: bool,
}

#[derive(Debug)]
pub struct Scene {
    /// Sorted by id.
    entities: Vec<Entity>,
    spin: f32,
}

impl Scene {
    pub fn grid() -> Self {
        let half = (GRID - 1) as f32 * SPACING * 0.5;
        let entities = (0..GRID * GRID)
            .map(|id| {
                let (col, row) = (id % GRID, id / GRID);
                let t = |v: i32| v as f32 / (GRID - 1) as f32;
                Entity {
                    id,
                    name: format!("tile ({col}, {row})"),
                    position: Vec3::new(col as f32 * SPACING - half, row as f32 * SPACING - half, 0.1),
                    color: Color::new(0.2 + 0.8 * t(col), 0.3, 0.2 + 0.8 * t(row), 1.0),
                    textured: (col + row) % 5 == 0,
                }
            })
            .collect();

        Self { entities, spin: 0.0 }
    }

    /// Entity with `id`, if it is alive.
    pub fn entity(&self, id: i32) -> Option<&Entity> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entities[i])
    }

    pub fn update(&mut self, dt: f32) {
        self.spin = (self.spin + dt * 45.0) % 360.0;
    }

    pub fn draw<B: RenderBackend + ?Sized>(
        &self,
        renderer: &mut BatchRenderer,
        backend: &mut B,
        checker: &Texture2D,
        hovered: Option<i32>,
    ) {
        // Floor: tiled checkerboard behind everything, not pickable.
        let floor = GRID as f32 * SPACING + 0.4;
        renderer.draw_textured_rect(backend, Vec3::new(0.0, 0.0, -0.5), Vec2::splat(floor), checker, GRID as f32);

        for e in &self.entities {
            let rotation = if e.id == 0 { self.spin.to_radians() } else { 0.0 };
            let scale = if hovered == Some(e.id) { 1.15 } else { 1.0 };
            let mut quad = Quad::rotated_rect(e.position, Vec2::splat(TILE * scale), rotation)
                .color(e.color)
                .entity(e.id);
            if e.textured {
                quad = quad.texture(checker.id()).tiling(2.0);
            }
            renderer.draw_quad(backend, &quad);
        }
    }
}
