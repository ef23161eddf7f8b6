/// Screen-space triangle picking
use crate::geometry::Mesh;
use crate::projection::{barycentric, edge_denom, OrbitCamera, VertexCache, DEGENERATE_AREA};

/// Resolves viewport pixels to triangles by re-running the renderer's
/// projection, so picks land exactly where the rasterizer drew.
#[derive(Debug, Default)]
pub struct Picker {
    cache: VertexCache,
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Front-most triangle under the given pixel, as its three vertex
    /// indices, or `None` when nothing qualifies.
    ///
    /// The hit test runs against the pixel center. Among all triangles whose
    /// barycentric weights are non-negative there, the one with the smallest
    /// interpolated NDC depth wins.
    pub fn pick(
        &mut self,
        mesh: &Mesh,
        camera: &OrbitCamera,
        width: u32,
        height: u32,
        pixel: (i32, i32),
    ) -> Option<[u32; 3]> {
        if mesh.vertices.is_empty() || mesh.indices.len() < 3 {
            return None;
        }

        self.cache.project(mesh, camera, width, height);

        let px = pixel.0 as f32 + 0.5;
        let py = pixel.1 as f32 + 0.5;

        let mut best: Option<([u32; 3], f32)> = None;
        for tri in mesh.indices.chunks_exact(3) {
            let (v0, v1, v2) = match (
                self.cache.get(tri[0]),
                self.cache.get(tri[1]),
                self.cache.get(tri[2]),
            ) {
                (Some(a), Some(b), Some(c)) => (a, b, c),
                _ => continue,
            };

            let denom = edge_denom(v0, v1, v2);
            if denom.abs() < DEGENERATE_AREA {
                continue;
            }
            let (w0, w1, w2) = barycentric(v0, v1, v2, px, py, 1.0 / denom);
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = w0 * v0.z + w1 * v1.z + w2 * v2.z;
            if best.map_or(true, |(_, d)| depth < d) {
                best = Some(([tri[0], tri[1], tri[2]], depth));
            }
        }

        best.map(|(indices, _)| indices)
    }
}
