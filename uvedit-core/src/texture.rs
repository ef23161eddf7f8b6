/// Pre-expanded texture pixel cache
use crate::error::{MeshError, Result};

/// A 2D RGBA8 pixel surface with a fixed, fully expanded layout.
///
/// The cache is built once per texture assignment so the rasterizer's inner
/// loop samples a flat buffer instead of going through a per-pixel accessor.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<[u8; 4]>,
}

impl Texture {
    /// Wrap an already-decoded RGBA8 buffer, row-major, top row first.
    pub fn from_rgba8(width: u32, height: u32, rgba: Vec<[u8; 4]>) -> Result<Self> {
        if rgba.len() != (width as usize) * (height as usize) || width == 0 || height == 0 {
            return Err(MeshError::TextureSize {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Two-tone placeholder used when no texture is supplied.
    pub fn checker(size: u32, cells: u32) -> Self {
        let size = size.max(2);
        let cell = (size / cells.max(1)).max(1);
        let mut rgba = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let on = ((x / cell) + (y / cell)) % 2 == 0;
                rgba.push(if on {
                    [180, 180, 188, 255]
                } else {
                    [90, 90, 98, 255]
                });
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest texel at integer coordinates, clamped into range.
    pub fn texel(&self, x: i32, y: i32) -> [u8; 4] {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        self.rgba[y * self.width as usize + x]
    }

    /// Base color for wireframe strokes, sampled near the texture center.
    pub fn center_color(&self) -> [u8; 4] {
        self.texel(self.width as i32 / 2, self.height as i32 / 2)
    }
}
