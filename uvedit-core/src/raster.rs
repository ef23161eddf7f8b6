/// CPU triangle rasterizer with depth buffering
use crate::geometry::Mesh;
use crate::projection::{barycentric, edge_denom, OrbitCamera, ScreenVertex, VertexCache, DEGENERATE_AREA};
use crate::select::Selection;
use crate::texture::Texture;

/// Outline color for triangles whose three corners are all selected.
const HIGHLIGHT_COLOR: [u8; 4] = [255, 165, 0, 255];

/// Opacity of plain wireframe strokes.
const WIREFRAME_ALPHA: f32 = 0.5;

/// Stroke endpoints beyond this magnitude come from near-degenerate
/// projections and are skipped rather than walked pixel by pixel.
const MAX_LINE_COORD: f32 = 1e4;

/// Color + depth scratch buffer owned by the rasterizer, reused across
/// frames and flushed to the display surface in one bulk copy.
///
/// Pixels are written only through the shading and stroke helpers; the raw
/// buffer is handed out read-only.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            color: vec![[0, 0, 0, 255]; size],
            depth: vec![f32::INFINITY; size],
        }
    }

    /// Resize for a new viewport, keeping the allocation when unchanged.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        let size = width * height;
        self.color.resize(size, [0, 0, 0, 255]);
        self.depth.resize(size, f32::INFINITY);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixel data for the bulk copy to the display surface.
    pub fn data(&self) -> &[[u8; 4]] {
        &self.color
    }

    pub fn clear(&mut self, background: [u8; 4]) {
        self.color.fill(background);
        self.depth.fill(f32::INFINITY);
    }

    pub(crate) fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.color[y as usize * self.width + x as usize] = color;
    }

    pub(crate) fn blend(&mut self, x: i32, y: i32, color: [u8; 4], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let dst = &mut self.color[y as usize * self.width + x as usize];
        for c in 0..3 {
            dst[c] = (color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha)) as u8;
        }
        dst[3] = 255;
    }

    /// Bresenham stroke between two screen points, bypassing the depth
    /// buffer. `thick` widens the stroke by one pixel for highlights.
    pub(crate) fn draw_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: [u8; 4],
        alpha: f32,
        thick: bool,
    ) {
        if !x0.is_finite() || !y0.is_finite() || !x1.is_finite() || !y1.is_finite() {
            return;
        }
        if x0.abs().max(x1.abs()) > MAX_LINE_COORD || y0.abs().max(y1.abs()) > MAX_LINE_COORD {
            return;
        }

        let mut x = x0.round() as i32;
        let mut y = y0.round() as i32;
        let xe = x1.round() as i32;
        let ye = y1.round() as i32;

        let dx = (xe - x).abs();
        let dy = -(ye - y).abs();
        let sx = if x < xe { 1 } else { -1 };
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend(x, y, color, alpha);
            if thick {
                self.blend(x + 1, y, color, alpha);
                self.blend(x, y + 1, color, alpha);
            }
            if x == xe && y == ye {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// How the 3D view draws the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Textured,
    Wireframe,
}

/// Software renderer for the 3D preview.
pub struct Renderer {
    cache: VertexCache,
    pub mode: RenderMode,
    pub background: [u8; 4],
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            cache: VertexCache::new(),
            mode: RenderMode::Textured,
            background: [44, 44, 50, 255],
        }
    }

    /// Render one frame into the framebuffer.
    ///
    /// Triangles with out-of-range indices or a near-zero projected area are
    /// skipped; the rest of the frame still renders. Triangles whose three
    /// corners are all selected get an outline overlay.
    pub fn render(
        &mut self,
        mesh: &Mesh,
        texture: &Texture,
        camera: &OrbitCamera,
        selection: &Selection,
        fb: &mut Framebuffer,
    ) {
        fb.clear(self.background);
        if mesh.vertices.is_empty() || mesh.indices.len() < 3 {
            return;
        }

        self.cache
            .project(mesh, camera, fb.width() as u32, fb.height() as u32);

        match self.mode {
            RenderMode::Textured => {
                for tri in mesh.indices.chunks_exact(3) {
                    let (v0, v1, v2) = match (
                        self.cache.get(tri[0]),
                        self.cache.get(tri[1]),
                        self.cache.get(tri[2]),
                    ) {
                        (Some(a), Some(b), Some(c)) => (a, b, c),
                        _ => continue,
                    };
                    raster_triangle(fb, v0, v1, v2, texture);
                }
            }
            RenderMode::Wireframe => {
                let base = texture.center_color();
                for tri in mesh.indices.chunks_exact(3) {
                    let (v0, v1, v2) = match (
                        self.cache.get(tri[0]),
                        self.cache.get(tri[1]),
                        self.cache.get(tri[2]),
                    ) {
                        (Some(a), Some(b), Some(c)) => (a, b, c),
                        _ => continue,
                    };
                    let (v0, v1, v2) = (*v0, *v1, *v2);
                    fb.draw_line(v0.x, v0.y, v1.x, v1.y, base, WIREFRAME_ALPHA, false);
                    fb.draw_line(v1.x, v1.y, v2.x, v2.y, base, WIREFRAME_ALPHA, false);
                    fb.draw_line(v2.x, v2.y, v0.x, v0.y, base, WIREFRAME_ALPHA, false);
                }
            }
        }

        if !selection.is_empty() {
            self.outline_selected(mesh, selection, fb);
        }
    }

    fn outline_selected(&self, mesh: &Mesh, selection: &Selection, fb: &mut Framebuffer) {
        for tri in mesh.indices.chunks_exact(3) {
            if !selection.contains(tri[0])
                || !selection.contains(tri[1])
                || !selection.contains(tri[2])
            {
                continue;
            }
            let (v0, v1, v2) = match (
                self.cache.get(tri[0]),
                self.cache.get(tri[1]),
                self.cache.get(tri[2]),
            ) {
                (Some(a), Some(b), Some(c)) => (*a, *b, *c),
                _ => continue,
            };
            fb.draw_line(v0.x, v0.y, v1.x, v1.y, HIGHLIGHT_COLOR, 1.0, true);
            fb.draw_line(v1.x, v1.y, v2.x, v2.y, HIGHLIGHT_COLOR, 1.0, true);
            fb.draw_line(v2.x, v2.y, v0.x, v0.y, HIGHLIGHT_COLOR, 1.0, true);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a texture coordinate into [0, 1).
fn wrap01(x: f32) -> f32 {
    x - x.floor()
}

/// Depth-based shade factor. NDC depth is normalized from [-1, 1] to [0, 1];
/// nearer fragments come out brighter.
fn depth_shade(ndc_z: f32) -> f32 {
    let normalized = ((ndc_z + 1.0) * 0.5).clamp(0.0, 1.0);
    0.3 + 0.7 * (1.0 - normalized)
}

/// Fill one projected triangle.
///
/// Depth is a linear barycentric blend of the NDC depths; texture
/// coordinates are perspective-correct. Both views' visuals bake in that
/// mismatch, so the two interpolation schemes must change together or not
/// at all.
fn raster_triangle(
    fb: &mut Framebuffer,
    v0: &ScreenVertex,
    v1: &ScreenVertex,
    v2: &ScreenVertex,
    texture: &Texture,
) {
    let denom = edge_denom(v0, v1, v2);
    if denom.abs() < DEGENERATE_AREA {
        return;
    }
    let inv_denom = 1.0 / denom;

    let min_x = (v0.x.min(v1.x).min(v2.x).floor() as i32).max(0);
    let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i32).min(fb.width as i32 - 1);
    let min_y = (v0.y.min(v1.y).min(v2.y).floor() as i32).max(0);
    let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i32).min(fb.height as i32 - 1);

    let tex_w = texture.width() as i32;
    let tex_h = texture.height() as i32;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            let (w0, w1, w2) = barycentric(v0, v1, v2, px, py, inv_denom);
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let inv_w = w0 * v0.inv_w + w1 * v1.inv_w + w2 * v2.inv_w;
            if inv_w <= 0.0 {
                // Behind the camera.
                continue;
            }

            let depth = w0 * v0.z + w1 * v1.z + w2 * v2.z;
            let idx = y as usize * fb.width + x as usize;
            if depth >= fb.depth[idx] {
                continue;
            }
            fb.depth[idx] = depth;

            let u_over_w = w0 * v0.u_over_w + w1 * v1.u_over_w + w2 * v2.u_over_w;
            let v_over_w = w0 * v0.v_over_w + w1 * v1.v_over_w + w2 * v2.v_over_w;
            let u = wrap01(u_over_w / inv_w);
            let v = wrap01(v_over_w / inv_w);

            let tx = (u * (tex_w - 1) as f32) as i32;
            let ty = (v * (tex_h - 1) as f32) as i32;
            let sample = texture.texel(tx, ty);

            let shade = depth_shade(depth);
            fb.color[idx] = [
                (sample[0] as f32 * shade) as u8,
                (sample[1] as f32 * shade) as u8,
                (sample[2] as f32 * shade) as u8,
                sample[3],
            ];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Vertex};

    fn flat_texture() -> Texture {
        Texture::from_rgba8(2, 2, vec![[200, 200, 200, 255]; 4]).unwrap()
    }

    fn front_camera() -> OrbitCamera {
        let mut camera = OrbitCamera::new();
        camera.orbit(-camera.yaw(), -camera.pitch());
        camera
    }

    #[test]
    fn test_wrap01() {
        assert!((wrap01(1.25) - 0.25).abs() < 1e-6);
        assert!((wrap01(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(wrap01(0.0), 0.0);
    }

    #[test]
    fn test_depth_shade_range() {
        assert!((depth_shade(-1.0) - 1.0).abs() < 1e-6);
        assert!((depth_shade(1.0) - 0.3).abs() < 1e-6);
        assert!(depth_shade(5.0) >= 0.3 - 1e-6);
    }

    #[test]
    fn test_quad_covers_center_pixel() {
        let mesh = Mesh::unit_quad();
        let mut renderer = Renderer::new();
        let mut fb = Framebuffer::new(64, 64);
        renderer.render(
            &mesh,
            &flat_texture(),
            &front_camera(),
            &Selection::new(),
            &mut fb,
        );
        let center = fb.data()[32 * 64 + 32];
        assert_ne!(center, renderer.background);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let mesh = Mesh::from_buffers(
            vec![
                Vertex::new(-0.5, 0.0, -0.5, 0.0, 0.0),
                Vertex::new(0.5, 0.0, -0.5, 1.0, 0.0),
                Vertex::new(0.5, 0.0, 0.5, 1.0, 1.0),
            ],
            vec![0, 1, 99],
        );
        let mut renderer = Renderer::new();
        let mut fb = Framebuffer::new(32, 32);
        renderer.render(
            &mesh,
            &flat_texture(),
            &front_camera(),
            &Selection::new(),
            &mut fb,
        );
        // The only triangle references a missing vertex; the frame is empty.
        assert!(fb.data().iter().all(|&c| c == renderer.background));
    }

    #[test]
    fn test_depth_test_is_order_independent() {
        // Two overlapping quads at different depths (y is the view axis at
        // yaw 0 / pitch 0, so smaller y is nearer).
        let near = [
            Vertex::new(-0.4, -0.2, -0.4, 0.0, 0.0),
            Vertex::new(0.4, -0.2, -0.4, 1.0, 0.0),
            Vertex::new(0.4, -0.2, 0.4, 1.0, 1.0),
            Vertex::new(-0.4, -0.2, 0.4, 0.0, 1.0),
        ];
        let far = [
            Vertex::new(-0.5, 0.2, -0.5, 0.0, 0.0),
            Vertex::new(0.5, 0.2, -0.5, 1.0, 0.0),
            Vertex::new(0.5, 0.2, 0.5, 1.0, 1.0),
            Vertex::new(-0.5, 0.2, 0.5, 0.0, 1.0),
        ];

        let mut verts_a = Vec::new();
        verts_a.extend_from_slice(&near);
        verts_a.extend_from_slice(&far);
        let mesh_a = Mesh::from_buffers(
            verts_a,
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
        );

        let mut verts_b = Vec::new();
        verts_b.extend_from_slice(&far);
        verts_b.extend_from_slice(&near);
        let mesh_b = Mesh::from_buffers(
            verts_b,
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
        );

        let texture = flat_texture();
        let camera = front_camera();
        let mut renderer = Renderer::new();
        let mut fb_a = Framebuffer::new(48, 48);
        let mut fb_b = Framebuffer::new(48, 48);
        renderer.render(&mesh_a, &texture, &camera, &Selection::new(), &mut fb_a);
        renderer.render(&mesh_b, &texture, &camera, &Selection::new(), &mut fb_b);

        assert_eq!(fb_a.data(), fb_b.data());
    }

    #[test]
    fn test_wireframe_leaves_interior_empty() {
        let mesh = Mesh::unit_quad();
        let mut renderer = Renderer::new();
        renderer.mode = RenderMode::Wireframe;
        let mut fb = Framebuffer::new(64, 64);
        renderer.render(
            &mesh,
            &flat_texture(),
            &front_camera(),
            &Selection::new(),
            &mut fb,
        );
        let touched = fb
            .data()
            .iter()
            .filter(|&&c| c != renderer.background)
            .count();
        // Strokes only: far fewer pixels than a filled quad would cover.
        assert!(touched > 0);
        assert!(touched < 64 * 64 / 4);
    }

    #[test]
    fn test_selection_outline_drawn() {
        let mesh = Mesh::unit_quad();
        let mut selection = Selection::new();
        selection.apply([0u32, 1, 2, 3], false, mesh.vertices.len());

        let mut renderer = Renderer::new();
        let mut fb = Framebuffer::new(64, 64);
        renderer.render(
            &mesh,
            &flat_texture(),
            &front_camera(),
            &selection,
            &mut fb,
        );
        let highlighted = fb.data().iter().any(|&c| {
            c[0] > 200 && c[1] > 100 && c[1] < 200 && c[2] < 60
        });
        assert!(highlighted);
    }
}
