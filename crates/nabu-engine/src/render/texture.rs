//! Sampled 2D textures.
//!
//! Users hold a [`Texture2D`]; quads reference it by its copyable [`TextureId`].
//! The 1x1 white texture is the renderer's slot-0 fallback: the fragment stage
//! always computes `texel × tint`, so untextured quads need no separate path.

use std::path::Path;

use anyhow::{Context, Result};

use super::backend::{BackendError, RenderBackend, TextureDesc, TextureId};

#[derive(Debug)]
pub struct Texture2D {
    id: TextureId,
    width: u32,
    height: u32,
    released: bool,
}

impl Texture2D {
    /// Uploads tightly packed RGBA8 pixels.
    pub fn from_rgba8<B: RenderBackend + ?Sized>(
        backend: &mut B,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Self, BackendError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(BackendError::Creation {
                what: "texture",
                reason: format!(
                    "'{label}': {width}x{height} needs {expected} bytes, got {}",
                    rgba.len()
                ),
            });
        }

        let id = backend.create_texture(&TextureDesc {
            label,
            width,
            height,
            rgba,
        })?;
        Ok(Self {
            id,
            width,
            height,
            released: false,
        })
    }

    /// 1x1 opaque white.
    pub fn white<B: RenderBackend + ?Sized>(backend: &mut B) -> Result<Self, BackendError> {
        Self::from_rgba8(backend, "white 1x1", 1, 1, &[255, 255, 255, 255])
    }

    /// Two-color checkerboard of `cells × cells` squares, `cell_px` pixels each.
    pub fn checkerboard<B: RenderBackend + ?Sized>(
        backend: &mut B,
        cells: u32,
        cell_px: u32,
        a: [u8; 4],
        b: [u8; 4],
    ) -> Result<Self, BackendError> {
        let size = (cells * cell_px).max(1);
        let cell_px = cell_px.max(1);
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let even = ((x / cell_px) + (y / cell_px)) % 2 == 0;
                rgba.extend_from_slice(if even { &a } else { &b });
            }
        }
        Self::from_rgba8(backend, "checkerboard", size, size, &rgba)
    }

    /// Decodes an image file (PNG/JPEG) and uploads it.
    pub fn from_path<B: RenderBackend + ?Sized>(backend: &mut B, path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to load texture '{}'", path.display()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let label = path.to_string_lossy();
        let texture = Self::from_rgba8(backend, &label, width, height, img.as_raw())?;
        log::debug!("loaded texture '{label}' ({width}x{height}) as {}", texture.id);
        Ok(texture)
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Releases the GPU storage. Idempotent.
    pub fn release<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.released {
            return;
        }
        backend.release_texture(self.id);
        self.released = true;
    }
}

impl Drop for Texture2D {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("texture {} dropped without release; GPU storage leaked", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::software::SoftwareBackend;

    #[test]
    fn rejects_mismatched_pixel_data() {
        let mut backend = SoftwareBackend::new();
        let err = Texture2D::from_rgba8(&mut backend, "bad", 2, 2, &[0; 4]).unwrap_err();
        assert!(matches!(err, BackendError::Creation { what: "texture", .. }));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let mut backend = SoftwareBackend::new();
        let mut tex =
            Texture2D::checkerboard(&mut backend, 2, 1, [255; 4], [0, 0, 0, 255]).unwrap();
        assert_eq!((tex.width(), tex.height()), (2, 2));
        assert_eq!(backend.texel(tex.id(), 0, 0), Some([255; 4]));
        assert_eq!(backend.texel(tex.id(), 1, 0), Some([0, 0, 0, 255]));
        tex.release(&mut backend);
        tex.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }

    // ── file loading ──────────────────────────────────────────────────────

    #[test]
    fn from_path_uploads_decoded_png() {
        let path = std::env::temp_dir().join(format!("nabu-texture-{}.png", std::process::id()));
        image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255])
            .unwrap()
            .save(&path)
            .unwrap();

        let mut backend = SoftwareBackend::new();
        let loaded = Texture2D::from_path(&mut backend, &path);
        std::fs::remove_file(&path).ok();

        let mut tex = loaded.unwrap();
        assert_eq!((tex.width(), tex.height()), (2, 1));
        assert_eq!(backend.texel(tex.id(), 0, 0), Some([255, 0, 0, 255]));
        assert_eq!(backend.texel(tex.id(), 1, 0), Some([0, 0, 255, 255]));
        tex.release(&mut backend);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let mut backend = SoftwareBackend::new();
        let path = std::env::temp_dir().join("nabu-texture-does-not-exist.png");
        let err = Texture2D::from_path(&mut backend, &path).unwrap_err();
        assert!(err.to_string().contains("failed to load texture"));
        assert_eq!(backend.live_textures(), 0);
    }
}
