/// 2D UV editor viewport and rendering
use nalgebra::Vector2;

use crate::geometry::Mesh;
use crate::raster::Framebuffer;
use crate::select::Selection;
use crate::texture::Texture;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 20.0;

const UV_BACKGROUND: [u8; 4] = [32, 32, 32, 255];
const EDGE_COLOR: [u8; 4] = [200, 200, 220, 255];
const BORDER_COLOR: [u8; 4] = [105, 105, 105, 255];
const VERTEX_COLOR: [u8; 4] = [150, 190, 230, 255];
const SELECTED_COLOR: [u8; 4] = [255, 165, 0, 255];

/// Pan/zoom mapping between UV space (V up) and editor pixels (Y down).
///
/// UV (0,0) maps to the bottom-left of the unit square on screen; the same
/// flip the 3D rasterizer bakes into its projected attributes, so the two
/// views agree visually.
#[derive(Debug, Clone, Copy)]
pub struct UvViewport {
    width: u32,
    height: u32,
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
}

impl UvViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Reset pan and zoom, as when a new mesh is assigned.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn uv_to_screen(&self, uv: Vector2<f32>) -> (f32, f32) {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        (
            uv.x * self.zoom * w + self.pan_x,
            (1.0 - uv.y) * self.zoom * h + self.pan_y,
        )
    }

    pub fn screen_to_uv(&self, x: f32, y: f32) -> Vector2<f32> {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        Vector2::new(
            (x - self.pan_x) / (w * self.zoom),
            1.0 - (y - self.pan_y) / (h * self.zoom),
        )
    }

    /// Pixel drag delta expressed in UV space under the current mapping.
    pub fn delta_to_uv(&self, dx: f32, dy: f32) -> Vector2<f32> {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        Vector2::new(dx / (w * self.zoom), -dy / (h * self.zoom))
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom by a factor keeping the UV point under the cursor fixed.
    pub fn zoom_about(&mut self, x: f32, y: f32, factor: f32) {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < 1e-4 {
            return;
        }
        let before = self.screen_to_uv(x, y);
        self.zoom = new_zoom;
        let (sx, sy) = self.uv_to_screen(before);
        self.pan_x += x - sx;
        self.pan_y += y - sy;
    }

    /// Closest vertex marker within `max_dist` pixels of the given point.
    pub fn hit_test_vertex(&self, mesh: &Mesh, x: f32, y: f32, max_dist: f32) -> Option<u32> {
        let mut best: Option<(u32, f32)> = None;
        for (vi, v) in mesh.vertices.iter().enumerate() {
            let (sx, sy) = self.uv_to_screen(v.uv);
            let dist_sq = (x - sx) * (x - sx) + (y - sy) * (y - sy);
            if dist_sq <= max_dist * max_dist && best.map_or(true, |(_, d)| dist_sq < d) {
                best = Some((vi as u32, dist_sq));
            }
        }
        best.map(|(vi, _)| vi)
    }

    /// Vertices whose screen projection falls inside the given rectangle.
    pub fn vertices_in_rect(
        &self,
        mesh: &Mesh,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
    ) -> Vec<u32> {
        let (min_x, max_x) = (x0.min(x1), x0.max(x1));
        let (min_y, max_y) = (y0.min(y1), y0.max(y1));
        let mut hits = Vec::new();
        for (vi, v) in mesh.vertices.iter().enumerate() {
            let (sx, sy) = self.uv_to_screen(v.uv);
            if sx >= min_x && sx <= max_x && sy >= min_y && sy <= max_y {
                hits.push(vi as u32);
            }
        }
        hits
    }
}

/// Draw the UV-space view: the texture over the unit square, every
/// triangle's edges, then vertex markers with selection highlighting.
pub fn render_uv_view(
    mesh: &Mesh,
    texture: &Texture,
    selection: &Selection,
    viewport: &UvViewport,
    fb: &mut Framebuffer,
) {
    fb.clear(UV_BACKGROUND);

    // Texture backdrop across the unit square.
    let (left, top) = viewport.uv_to_screen(Vector2::new(0.0, 1.0));
    let (right, bottom) = viewport.uv_to_screen(Vector2::new(1.0, 0.0));
    let x0 = (left.floor() as i32).max(0);
    let x1 = (right.ceil() as i32).min(fb.width() as i32 - 1);
    let y0 = (top.floor() as i32).max(0);
    let y1 = (bottom.ceil() as i32).min(fb.height() as i32 - 1);
    let tex_w = texture.width() as f32;
    let tex_h = texture.height() as f32;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let uv = viewport.screen_to_uv(x as f32 + 0.5, y as f32 + 0.5);
            if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
                continue;
            }
            let tx = (uv.x * (tex_w - 1.0)) as i32;
            let ty = ((1.0 - uv.y) * (tex_h - 1.0)) as i32;
            fb.put(x, y, texture.texel(tx, ty));
        }
    }

    // Unit square outline.
    fb.draw_line(left, top, right, top, BORDER_COLOR, 1.0, false);
    fb.draw_line(right, top, right, bottom, BORDER_COLOR, 1.0, false);
    fb.draw_line(right, bottom, left, bottom, BORDER_COLOR, 1.0, false);
    fb.draw_line(left, bottom, left, top, BORDER_COLOR, 1.0, false);

    // Triangle edges in UV space.
    for tri in mesh.indices.chunks_exact(3) {
        let (v0, v1, v2) = match (
            mesh.vertices.get(tri[0] as usize),
            mesh.vertices.get(tri[1] as usize),
            mesh.vertices.get(tri[2] as usize),
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => continue,
        };
        let p0 = viewport.uv_to_screen(v0.uv);
        let p1 = viewport.uv_to_screen(v1.uv);
        let p2 = viewport.uv_to_screen(v2.uv);
        fb.draw_line(p0.0, p0.1, p1.0, p1.1, EDGE_COLOR, 1.0, false);
        fb.draw_line(p1.0, p1.1, p2.0, p2.1, EDGE_COLOR, 1.0, false);
        fb.draw_line(p2.0, p2.1, p0.0, p0.1, EDGE_COLOR, 1.0, false);
    }

    // Vertex markers on top so they stay easy to select.
    for (vi, v) in mesh.vertices.iter().enumerate() {
        let (sx, sy) = viewport.uv_to_screen(v.uv);
        let color = if selection.contains(vi as u32) {
            SELECTED_COLOR
        } else {
            VERTEX_COLOR
        };
        let (cx, cy) = (sx.round() as i32, sy.round() as i32);
        for dy in -1..=1 {
            for dx in -1..=1 {
                fb.put(cx + dx, cy + dy, color);
            }
        }
    }
}
