/// Mesh data for previewing and UV editing
use nalgebra::{Point3, Vector2, Vector3};

/// Radius below which a mesh is treated as degenerate for framing purposes.
const MIN_BOUNDING_RADIUS: f32 = 1e-4;

/// One face corner: a 3D position plus a 2D texture coordinate.
///
/// Vertices are stored per face corner. Two triangles meeting at a UV seam
/// reference distinct vertex records even when their positions coincide; the
/// core never deduplicates them. Texture coordinates may fall outside [0,1]
/// and are wrapped at sample time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub uv: Vector2<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            uv: Vector2::new(u, v),
        }
    }
}

/// An indexed triangle mesh with derived framing bounds.
///
/// `indices` is flat, grouped in threes. A triple referencing any
/// out-of-range vertex is skipped by every consumer, never treated as fatal.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    center: Point3<f32>,
    bounding_radius: f32,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            center: Point3::origin(),
            bounding_radius: 1.0,
        }
    }

    pub fn with_capacity(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            center: Point3::origin(),
            bounding_radius: 1.0,
        }
    }

    /// Build a mesh from raw buffers and compute its bounds.
    pub fn from_buffers(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            vertices,
            indices,
            center: Point3::origin(),
            bounding_radius: 1.0,
        };
        mesh.recompute_bounds();
        mesh
    }

    /// Midpoint of the axis-aligned bounding box of all vertex positions.
    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    /// Maximum distance from the center to any vertex, floored to 1.0.
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Recompute the framing bounds from the current vertex positions.
    ///
    /// Must be called whenever positions are loaded or bulk-replaced. UV-only
    /// edits leave the bounds untouched. For an empty mesh the center is the
    /// origin and the radius 1.0; a radius at or below a small epsilon is
    /// floored to 1.0 so later divisions stay safe.
    pub fn recompute_bounds(&mut self) {
        if self.vertices.is_empty() {
            self.center = Point3::origin();
            self.bounding_radius = 1.0;
            return;
        }

        let mut min: Vector3<f32> = self.vertices[0].position.coords;
        let mut max = min;
        for v in &self.vertices {
            min = min.inf(&v.position.coords);
            max = max.sup(&v.position.coords);
        }
        self.center = Point3::from((min + max) * 0.5);

        let mut radius = 0.0f32;
        for v in &self.vertices {
            let d = (v.position - self.center).norm();
            if d > radius {
                radius = d;
            }
        }
        self.bounding_radius = if radius > MIN_BOUNDING_RADIUS {
            radius
        } else {
            1.0
        };
    }

    /// Unit quad in the XZ plane, UV-mapped corner to corner. Two triangles,
    /// four shared corner vertices. Used as the fallback preview mesh and by
    /// tests.
    pub fn unit_quad() -> Self {
        let vertices = vec![
            Vertex::new(-0.5, 0.0, -0.5, 0.0, 0.0),
            Vertex::new(0.5, 0.0, -0.5, 1.0, 0.0),
            Vertex::new(0.5, 0.0, 0.5, 1.0, 1.0),
            Vertex::new(-0.5, 0.0, 0.5, 0.0, 1.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Self::from_buffers(vertices, indices)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mesh_bounds() {
        let mut mesh = Mesh::new();
        mesh.recompute_bounds();
        assert_eq!(mesh.center(), Point3::origin());
        assert_eq!(mesh.bounding_radius(), 1.0);
    }

    #[test]
    fn test_quad_bounds() {
        let mesh = Mesh::unit_quad();
        assert!((mesh.center() - Point3::origin()).norm() < 1e-6);
        let expected = (0.5f32 * 0.5 + 0.5 * 0.5).sqrt();
        assert!((mesh.bounding_radius() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_single_point_radius_floor() {
        let mesh = Mesh::from_buffers(vec![Vertex::new(3.0, -2.0, 7.0, 0.0, 0.0)], vec![]);
        assert!((mesh.center() - Point3::new(3.0, -2.0, 7.0)).norm() < 1e-6);
        assert_eq!(mesh.bounding_radius(), 1.0);
    }

    #[test]
    fn test_radius_always_positive() {
        let mesh = Mesh::from_buffers(
            vec![
                Vertex::new(-10.0, 0.0, 0.0, 0.0, 0.0),
                Vertex::new(30.0, 4.0, -2.0, 1.0, 1.0),
            ],
            vec![],
        );
        assert!(mesh.bounding_radius() > 0.0);
        assert!((mesh.center() - Point3::new(10.0, 2.0, -1.0)).norm() < 1e-5);
    }
}
