/// Adjacency graph and seam-aware selection expansion
use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use nalgebra::Point3;

use crate::geometry::Mesh;

/// Lattice cell key of a quantized vertex position.
type BucketKey = (i64, i64, i64);

/// Topology index over one mesh: which triangles own each vertex, and which
/// vertices coincide in space despite being separate records.
///
/// Built once per mesh assignment and discarded when the mesh reference
/// changes. UV edits never touch topology or positions, so the graph is
/// never patched incrementally.
#[derive(Debug)]
pub struct AdjacencyGraph {
    /// Triangle corner indices, one triple per mesh triangle.
    triangles: Vec<[u32; 3]>,
    /// Vertex index -> triangles that reference it.
    vertex_triangles: Vec<Vec<u32>>,
    /// Lattice cell -> every vertex whose position quantizes into it.
    buckets: HashMap<BucketKey, Vec<u32>>,
    /// Vertex index -> its lattice cell.
    vertex_bucket: Vec<BucketKey>,
}

impl AdjacencyGraph {
    /// Lattice resolution used to merge coincident seam vertices.
    ///
    /// A heuristic, not a proven threshold: meshes at unusual scales may
    /// over- or under-merge and can pass a different value to
    /// [`AdjacencyGraph::build_with_scale`].
    pub const DEFAULT_QUANTIZE_SCALE: f32 = 1000.0;

    pub fn build(mesh: &Mesh) -> Self {
        Self::build_with_scale(mesh, Self::DEFAULT_QUANTIZE_SCALE)
    }

    pub fn build_with_scale(mesh: &Mesh, quantize_scale: f32) -> Self {
        let vertex_count = mesh.vertices.len();
        let mut vertex_triangles = vec![Vec::new(); vertex_count];
        let mut triangles = Vec::with_capacity(mesh.triangle_count());

        for (tri, corners) in mesh.indices.chunks_exact(3).enumerate() {
            triangles.push([corners[0], corners[1], corners[2]]);
            for &vi in corners {
                if let Some(owners) = vertex_triangles.get_mut(vi as usize) {
                    owners.push(tri as u32);
                }
            }
        }

        let mut buckets: HashMap<BucketKey, Vec<u32>> = HashMap::new();
        let mut vertex_bucket = Vec::with_capacity(vertex_count);
        for (vi, v) in mesh.vertices.iter().enumerate() {
            let key = quantize(&v.position, quantize_scale);
            buckets.entry(key).or_default().push(vi as u32);
            vertex_bucket.push(key);
        }

        debug!(
            "adjacency graph: {} vertices, {} triangles, {} position buckets",
            vertex_count,
            triangles.len(),
            buckets.len()
        );

        Self {
            triangles,
            vertex_triangles,
            buckets,
            vertex_bucket,
        }
    }

    /// Grow a picked triangle into the full connected patch containing it.
    ///
    /// Breadth-first over owning triangles. Whenever a vertex enters the
    /// result, every other vertex in its position bucket enters too, which is
    /// what carries the selection across duplicated seam vertices. Seed
    /// indices always appear in the result, even when they reference nothing.
    pub fn expand(&self, seed: [u32; 3]) -> HashSet<u32> {
        let mut result = HashSet::new();
        let mut pending: VecDeque<u32> = VecDeque::new();
        let mut visited: HashSet<u32> = HashSet::new();

        for &v in &seed {
            self.visit(v, &mut result, &mut pending, &mut visited);
        }

        while let Some(tri) = pending.pop_front() {
            if let Some(corners) = self.triangles.get(tri as usize) {
                for &v in corners {
                    self.visit(v, &mut result, &mut pending, &mut visited);
                }
            }
        }

        result
    }

    fn visit(
        &self,
        v: u32,
        result: &mut HashSet<u32>,
        pending: &mut VecDeque<u32>,
        visited: &mut HashSet<u32>,
    ) {
        if !result.insert(v) {
            return;
        }
        let owners = match self.vertex_triangles.get(v as usize) {
            Some(owners) => owners,
            None => return,
        };
        for &tri in owners {
            if visited.insert(tri) {
                pending.push_back(tri);
            }
        }
        if let Some(mates) = self.buckets.get(&self.vertex_bucket[v as usize]) {
            for &mate in mates {
                if mate != v {
                    self.visit(mate, result, pending, visited);
                }
            }
        }
    }
}

fn quantize(p: &Point3<f32>, scale: f32) -> BucketKey {
    (
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    )
}

/// Expand a picked seed triangle against an optional adjacency graph.
///
/// Without a graph (mesh unset or without triangles) the result degrades to
/// exactly the seed indices.
pub fn expand_selection(graph: Option<&AdjacencyGraph>, seed: [u32; 3]) -> HashSet<u32> {
    match graph {
        Some(graph) => graph.expand(seed),
        None => seed.iter().copied().collect(),
    }
}

/// A deduplicated vertex-index selection.
///
/// Valid only against the mesh it was built from; callers clear it whenever
/// the mesh reference changes. The viewer and the UV editor each hold their
/// own and reconcile it from selection-changed events.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    indices: HashSet<u32>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.indices.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices.iter().copied()
    }

    /// Replace or extend the selection, dropping indices outside the mesh.
    pub fn apply(
        &mut self,
        indices: impl IntoIterator<Item = u32>,
        additive: bool,
        vertex_count: usize,
    ) {
        if !additive {
            self.indices.clear();
        }
        for index in indices {
            if (index as usize) < vertex_count {
                self.indices.insert(index);
            }
        }
    }

    pub fn insert(&mut self, index: u32) {
        self.indices.insert(index);
    }

    pub fn toggle(&mut self, index: u32) {
        if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
    }

    pub fn select_all(&mut self, vertex_count: usize) {
        self.indices = (0..vertex_count as u32).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Vertex};

    /// Two quads sharing no vertices and sitting far apart.
    fn two_separate_quads() -> Mesh {
        let mut vertices = Vec::new();
        for offset in [0.0f32, 10.0] {
            vertices.push(Vertex::new(offset, 0.0, 0.0, 0.0, 0.0));
            vertices.push(Vertex::new(offset + 1.0, 0.0, 0.0, 1.0, 0.0));
            vertices.push(Vertex::new(offset + 1.0, 1.0, 0.0, 1.0, 1.0));
            vertices.push(Vertex::new(offset, 1.0, 0.0, 0.0, 1.0));
        }
        Mesh::from_buffers(vertices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7])
    }

    #[test]
    fn test_expansion_stays_in_connected_component() {
        let mesh = two_separate_quads();
        let graph = AdjacencyGraph::build(&mesh);
        let result = graph.expand([0, 1, 2]);
        let expected: HashSet<u32> = [0, 1, 2, 3].into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_expansion_covers_whole_fan() {
        let mesh = two_separate_quads();
        let graph = AdjacencyGraph::build(&mesh);
        // Seeding from the second quad's second triangle reaches all of it.
        let result = graph.expand([4, 6, 7]);
        let expected: HashSet<u32> = [4, 5, 6, 7].into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_expansion_crosses_seam_duplicates() {
        // Two triangle fans with disjoint index sets; vertex 2 and vertex 3
        // are separate records at the same position (a UV seam).
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0, 0.2, 0.0),
            Vertex::new(1.0, 1.0, 0.0, 0.2, 0.2),
            Vertex::new(1.0, 1.0, 0.0, 0.8, 0.2),
            Vertex::new(2.0, 1.0, 0.0, 0.8, 0.0),
            Vertex::new(2.0, 2.0, 0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_buffers(vertices, vec![0, 1, 2, 3, 4, 5]);
        let graph = AdjacencyGraph::build(&mesh);

        let from_first = graph.expand([0, 1, 2]);
        let all: HashSet<u32> = (0..6).collect();
        assert_eq!(from_first, all);

        let from_second = graph.expand([3, 4, 5]);
        assert_eq!(from_second, all);
    }

    #[test]
    fn test_expansion_without_graph_returns_seed() {
        let result = expand_selection(None, [7, 8, 9]);
        let expected: HashSet<u32> = [7, 8, 9].into_iter().collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_expansion_with_out_of_range_seed() {
        let mesh = two_separate_quads();
        let graph = AdjacencyGraph::build(&mesh);
        let result = graph.expand([0, 1, 99]);
        // The dangling index is kept; expansion still covers the first quad.
        assert!(result.contains(&99));
        assert!(result.contains(&3));
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_quantization_scale_is_tunable() {
        // 0.4 apart: merged at scale 1, distinct at the default scale.
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0),
            Vertex::new(0.4, 0.0, 0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_buffers(vertices, vec![]);
        let coarse = AdjacencyGraph::build_with_scale(&mesh, 1.0);
        assert_eq!(coarse.buckets.len(), 1);
        let fine = AdjacencyGraph::build(&mesh);
        assert_eq!(fine.buckets.len(), 2);
    }

    #[test]
    fn test_selection_apply_replace_and_additive() {
        let mut selection = Selection::new();
        selection.apply([0u32, 1, 2], false, 10);
        assert_eq!(selection.len(), 3);
        selection.apply([5u32], true, 10);
        assert_eq!(selection.len(), 4);
        selection.apply([7u32], false, 10);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(7));
    }

    #[test]
    fn test_selection_apply_drops_out_of_range() {
        let mut selection = Selection::new();
        selection.apply([2u32, 42], false, 4);
        assert_eq!(selection.len(), 1);
        assert!(!selection.contains(42));
    }

    #[test]
    fn test_selection_toggle() {
        let mut selection = Selection::new();
        selection.toggle(3);
        assert!(selection.contains(3));
        selection.toggle(3);
        assert!(!selection.contains(3));
    }
}
