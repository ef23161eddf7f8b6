/// UV transform engine
use std::collections::HashMap;

use log::debug;
use nalgebra::Vector2;

use crate::event::{EditorEvent, EventQueue};
use crate::geometry::Mesh;
use crate::select::Selection;
use crate::uv_view::UvViewport;

/// Generous bound containing runaway drags while keeping out-of-range UVs
/// editable.
const UV_LIMIT: f32 = 4.0;

const SCALE_MIN: f32 = 0.1;
const SCALE_MAX: f32 = 10.0;

/// Radians of rotation per horizontal pixel of drag.
const ROTATE_PER_PIXEL: f32 = 0.01;

/// Default snapping grid: 1/16th of the UV square.
const DEFAULT_SNAP_GRID: f32 = 0.0625;

/// Empty space reserved around packed UVs inside the unit square.
const PACK_MARGIN: f32 = 0.02;

/// The active transform. A closed choice, switched explicitly by the host,
/// never inferred from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Move,
    Scale,
    Rotate,
}

/// Selected UVs captured at drag start, plus their mean as the pivot.
///
/// Every update applies the total displacement to this snapshot, so the
/// outcome depends only on where the pointer ended up, not the path taken.
#[derive(Debug)]
struct DragSession {
    start_uvs: HashMap<u32, Vector2<f32>>,
    pivot: Vector2<f32>,
}

/// Owns the 2D editor's selection, viewport and transform state, and applies
/// UV mutations to the shared mesh.
#[derive(Debug)]
pub struct UvEditor {
    pub mode: TransformMode,
    pub selection: Selection,
    pub viewport: UvViewport,
    drag: Option<DragSession>,
    snap_grid: f32,
}

impl UvEditor {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            mode: TransformMode::Move,
            selection: Selection::new(),
            viewport: UvViewport::new(viewport_width, viewport_height),
            drag: None,
            snap_grid: DEFAULT_SNAP_GRID,
        }
    }

    /// Forget selection, drag and view state when the mesh reference changes.
    pub fn reset_for_mesh(&mut self) {
        self.selection.clear();
        self.drag = None;
        self.viewport.reset();
    }

    /// Switch the transform mode, dropping any drag in flight.
    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
        self.drag = None;
    }

    pub fn drag_active(&self) -> bool {
        self.drag.is_some()
    }

    /// Snapshot the selected UVs and their mean pivot. A drag over an empty
    /// selection is a no-op.
    pub fn begin_drag(&mut self, mesh: &Mesh) {
        if self.selection.is_empty() {
            self.drag = None;
            return;
        }
        let mut start_uvs = HashMap::new();
        for index in self.selection.iter() {
            if let Some(v) = mesh.vertices.get(index as usize) {
                start_uvs.insert(index, v.uv);
            }
        }
        let pivot = mean_uv(start_uvs.values());
        debug!("uv drag start: {} vertices, pivot {:?}", start_uvs.len(), pivot);
        self.drag = Some(DragSession { start_uvs, pivot });
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Re-apply the active drag for a total pixel displacement from its
    /// start. Mutates the mesh UVs and queues a change event.
    pub fn update_drag(&mut self, mesh: &mut Mesh, dx: f32, dy: f32, events: &mut EventQueue) {
        let drag = match &self.drag {
            Some(drag) => drag,
            None => return,
        };
        if drag.start_uvs.is_empty() {
            return;
        }

        match self.mode {
            TransformMode::Move => {
                let delta = self.viewport.delta_to_uv(dx, dy);
                for (&index, &start) in &drag.start_uvs {
                    if let Some(v) = mesh.vertices.get_mut(index as usize) {
                        v.uv = clamp_uv(start + delta);
                    }
                }
            }
            TransformMode::Scale => {
                let half_width = self.viewport.width().max(1) as f32 * 0.5;
                let factor = (1.0 + dx / half_width).clamp(SCALE_MIN, SCALE_MAX);
                for (&index, &start) in &drag.start_uvs {
                    if let Some(v) = mesh.vertices.get_mut(index as usize) {
                        v.uv = clamp_uv(drag.pivot + (start - drag.pivot) * factor);
                    }
                }
            }
            TransformMode::Rotate => {
                let angle = dx * ROTATE_PER_PIXEL;
                let (sin, cos) = angle.sin_cos();
                for (&index, &start) in &drag.start_uvs {
                    if let Some(v) = mesh.vertices.get_mut(index as usize) {
                        let off = start - drag.pivot;
                        let rotated =
                            Vector2::new(off.x * cos - off.y * sin, off.x * sin + off.y * cos);
                        v.uv = clamp_uv(drag.pivot + rotated);
                    }
                }
            }
        }

        events.push(EditorEvent::UvChanged);
    }

    pub fn select_all(&mut self, mesh: &Mesh) {
        self.selection.select_all(mesh.vertices.len());
        self.drag = None;
    }

    /// Fit the selected UVs into the unit square, preserving aspect ratio
    /// and reserving a margin. Degenerate (point) selections are left alone.
    pub fn pack_selection(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        let indices: Vec<u32> = self.selected_in_range(mesh);
        if indices.is_empty() {
            return false;
        }

        let mut min = Vector2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vector2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &index in &indices {
            let uv = mesh.vertices[index as usize].uv;
            min = min.inf(&uv);
            max = max.sup(&uv);
        }
        let extent = max - min;
        if extent.x <= 1e-6 && extent.y <= 1e-6 {
            return false;
        }

        let scale = 1.0 / extent.x.max(extent.y);
        let shrink = 1.0 - 2.0 * PACK_MARGIN;
        let mut changed = false;
        for &index in &indices {
            let v = &mut mesh.vertices[index as usize];
            let packed = (v.uv - min) * scale * shrink + Vector2::new(PACK_MARGIN, PACK_MARGIN);
            changed |= set_uv(v, clamp_uv(packed));
        }
        self.notify(changed, events);
        changed
    }

    /// Rotate the selection 90 degrees counter-clockwise about its centroid.
    pub fn rotate_quarter(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        self.transform_about_centroid(mesh, events, |off| Vector2::new(-off.y, off.x))
    }

    /// Rotate the selection 180 degrees about its centroid.
    pub fn rotate_half(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        self.transform_about_centroid(mesh, events, |off| -off)
    }

    /// Mirror the selection's U coordinates about its centroid.
    pub fn flip_horizontal(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        self.transform_about_centroid(mesh, events, |off| Vector2::new(-off.x, off.y))
    }

    /// Mirror the selection's V coordinates about its centroid.
    pub fn flip_vertical(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        self.transform_about_centroid(mesh, events, |off| Vector2::new(off.x, -off.y))
    }

    /// Round every selected UV to the nearest snap-grid multiple.
    pub fn snap_to_grid(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        let indices = self.selected_in_range(mesh);
        if indices.is_empty() {
            return false;
        }
        let grid = self.snap_grid.max(1e-6);
        let mut changed = false;
        for index in indices {
            let v = &mut mesh.vertices[index as usize];
            let snapped = Vector2::new(
                (v.uv.x / grid).round() * grid,
                (v.uv.y / grid).round() * grid,
            );
            changed |= set_uv(v, clamp_uv(snapped));
        }
        self.notify(changed, events);
        changed
    }

    /// Spread UV islands (connected components of the index buffer) into a
    /// grid of cells so they no longer overlap. Islands keep their original
    /// scale and are only translated, so the layout may exceed the unit
    /// square when islands are large. Operates on the whole mesh.
    pub fn pack_islands(&mut self, mesh: &mut Mesh, events: &mut EventQueue) -> bool {
        let vertex_count = mesh.vertices.len();
        if vertex_count == 0 || mesh.indices.len() < 3 {
            return false;
        }

        let mut parent: Vec<u32> = (0..vertex_count as u32).collect();
        for tri in mesh.indices.chunks_exact(3) {
            for &(a, b) in &[(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if (a as usize) < vertex_count && (b as usize) < vertex_count {
                    union(&mut parent, a, b);
                }
            }
        }

        let mut islands: HashMap<u32, Vec<u32>> = HashMap::new();
        for vi in 0..vertex_count as u32 {
            islands.entry(find(&mut parent, vi)).or_default().push(vi);
        }
        if islands.len() <= 1 {
            return false;
        }

        struct Island {
            min: Vector2<f32>,
            extent: Vector2<f32>,
            vertices: Vec<u32>,
        }
        let mut boxes: Vec<Island> = Vec::with_capacity(islands.len());
        let mut max_extent = Vector2::new(0.0f32, 0.0f32);
        for (_, vertices) in islands {
            let mut min = Vector2::new(f32::INFINITY, f32::INFINITY);
            let mut max = Vector2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
            for &vi in &vertices {
                let uv = mesh.vertices[vi as usize].uv;
                min = min.inf(&uv);
                max = max.sup(&uv);
            }
            let extent = max - min;
            max_extent = max_extent.sup(&extent);
            boxes.push(Island {
                min,
                extent,
                vertices,
            });
        }

        // Larger islands first so they land in the top-left cells.
        boxes.sort_by(|a, b| {
            let area_a = a.extent.x.max(0.0) * a.extent.y.max(0.0);
            let area_b = b.extent.x.max(0.0) * b.extent.y.max(0.0);
            area_b.partial_cmp(&area_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        let cols = (boxes.len() as f32).sqrt().ceil() as usize;
        let cell_w = if max_extent.x > 0.0 {
            max_extent.x + 2.0 * PACK_MARGIN
        } else {
            1.0
        };
        let cell_h = if max_extent.y > 0.0 {
            max_extent.y + 2.0 * PACK_MARGIN
        } else {
            1.0
        };

        let mut changed = false;
        for (slot, island) in boxes.iter().enumerate() {
            if island.extent.x <= 1e-6 || island.extent.y <= 1e-6 {
                continue;
            }
            let col = (slot % cols) as f32;
            let row = (slot / cols) as f32;
            let base = Vector2::new(col * cell_w + PACK_MARGIN, row * cell_h + PACK_MARGIN);
            let offset = base - island.min;
            if offset.norm() <= 1e-6 {
                continue;
            }
            for &vi in &island.vertices {
                let v = &mut mesh.vertices[vi as usize];
                changed |= set_uv(v, v.uv + offset);
            }
        }
        self.notify(changed, events);
        changed
    }

    fn transform_about_centroid(
        &mut self,
        mesh: &mut Mesh,
        events: &mut EventQueue,
        map: impl Fn(Vector2<f32>) -> Vector2<f32>,
    ) -> bool {
        let indices = self.selected_in_range(mesh);
        if indices.is_empty() {
            return false;
        }
        let pivot = mean_uv(indices.iter().map(|&i| &mesh.vertices[i as usize].uv));
        let mut changed = false;
        for index in indices {
            let v = &mut mesh.vertices[index as usize];
            let mapped = pivot + map(v.uv - pivot);
            changed |= set_uv(v, clamp_uv(mapped));
        }
        self.notify(changed, events);
        changed
    }

    fn selected_in_range(&self, mesh: &Mesh) -> Vec<u32> {
        self.selection
            .iter()
            .filter(|&i| (i as usize) < mesh.vertices.len())
            .collect()
    }

    fn notify(&self, changed: bool, events: &mut EventQueue) {
        if changed {
            events.push(EditorEvent::UvChanged);
        }
    }
}

fn mean_uv<'a>(uvs: impl Iterator<Item = &'a Vector2<f32>>) -> Vector2<f32> {
    let mut sum = Vector2::new(0.0f32, 0.0);
    let mut count = 0;
    for uv in uvs {
        sum += uv;
        count += 1;
    }
    if count > 0 {
        sum / count as f32
    } else {
        Vector2::new(0.0, 0.0)
    }
}

fn clamp_uv(uv: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(
        uv.x.clamp(-UV_LIMIT, UV_LIMIT),
        uv.y.clamp(-UV_LIMIT, UV_LIMIT),
    )
}

/// Write a UV back, reporting whether it actually moved.
fn set_uv(v: &mut crate::geometry::Vertex, uv: Vector2<f32>) -> bool {
    if (uv - v.uv).norm() <= 1e-6 {
        return false;
    }
    v.uv = uv;
    true
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize];
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[rb as usize] = ra;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Vertex};

    fn quad_editor() -> (Mesh, UvEditor, EventQueue) {
        let mesh = Mesh::unit_quad();
        let mut editor = UvEditor::new(200, 200);
        editor.select_all(&mesh);
        (mesh, editor, EventQueue::new())
    }

    fn uvs(mesh: &Mesh) -> Vec<(f32, f32)> {
        mesh.vertices.iter().map(|v| (v.uv.x, v.uv.y)).collect()
    }

    #[test]
    fn test_move_zero_delta_is_identity() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        let before = uvs(&mesh);
        editor.begin_drag(&mesh);
        editor.update_drag(&mut mesh, 0.0, 0.0, &mut events);
        assert_eq!(uvs(&mesh), before);
    }

    #[test]
    fn test_scale_unit_factor_is_identity() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        editor.set_mode(TransformMode::Scale);
        editor.select_all(&mesh);
        let before = uvs(&mesh);
        editor.begin_drag(&mesh);
        editor.update_drag(&mut mesh, 0.0, 0.0, &mut events);
        assert_eq!(uvs(&mesh), before);
    }

    #[test]
    fn test_rotate_zero_angle_is_identity() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        editor.set_mode(TransformMode::Rotate);
        editor.select_all(&mesh);
        let before = uvs(&mesh);
        editor.begin_drag(&mesh);
        editor.update_drag(&mut mesh, 0.0, 0.0, &mut events);
        assert_eq!(uvs(&mesh), before);
    }

    #[test]
    fn test_move_quad_by_half_u() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        editor.begin_drag(&mesh);
        // 100 px over a 200 px viewport at zoom 1 is +0.5 in U.
        editor.update_drag(&mut mesh, 100.0, 0.0, &mut events);
        let expected = vec![(0.5, 0.0), (1.5, 0.0), (1.5, 1.0), (0.5, 1.0)];
        for (got, want) in uvs(&mesh).iter().zip(&expected) {
            assert!((got.0 - want.0).abs() < 1e-5);
            assert!((got.1 - want.1).abs() < 1e-5);
        }
        assert_eq!(events.pop(), Some(EditorEvent::UvChanged));
    }

    #[test]
    fn test_scale_factor_two_about_pivot() {
        let mut mesh = Mesh::from_buffers(
            vec![
                Vertex::new(0.0, 0.0, 0.0, 0.4, 0.5),
                Vertex::new(1.0, 0.0, 0.0, 0.6, 0.5),
            ],
            vec![],
        );
        let mut editor = UvEditor::new(200, 200);
        editor.set_mode(TransformMode::Scale);
        editor.select_all(&mesh);
        let mut events = EventQueue::new();
        editor.begin_drag(&mesh);
        // dx of half the viewport width gives factor 1 + 100/100 = 2.
        editor.update_drag(&mut mesh, 100.0, 0.0, &mut events);
        assert!((mesh.vertices[0].uv.x - 0.3).abs() < 1e-5);
        assert!((mesh.vertices[1].uv.x - 0.7).abs() < 1e-5);
        assert!((mesh.vertices[1].uv.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_scale_factor_clamped() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        editor.set_mode(TransformMode::Scale);
        editor.select_all(&mesh);
        editor.begin_drag(&mesh);
        editor.update_drag(&mut mesh, 1e6, 0.0, &mut events);
        // Factor capped at 10: corner (1,1) lands at 5.5 and clamps to 4.
        assert!((mesh.vertices[2].uv.x - 4.0).abs() < 1e-5);
        for v in &mesh.vertices {
            assert!(v.uv.x.abs() <= UV_LIMIT + 1e-6);
            assert!(v.uv.y.abs() <= UV_LIMIT + 1e-6);
        }
    }

    #[test]
    fn test_rotate_half_turn_via_drag() {
        let mut mesh = Mesh::from_buffers(
            vec![
                Vertex::new(0.0, 0.0, 0.0, 0.0, 0.5),
                Vertex::new(1.0, 0.0, 0.0, 1.0, 0.5),
            ],
            vec![],
        );
        let mut editor = UvEditor::new(200, 200);
        editor.set_mode(TransformMode::Rotate);
        editor.select_all(&mesh);
        let mut events = EventQueue::new();
        editor.begin_drag(&mesh);
        let dx = std::f32::consts::PI / ROTATE_PER_PIXEL;
        editor.update_drag(&mut mesh, dx, 0.0, &mut events);
        // 180 degrees about pivot (0.5, 0.5) swaps the endpoints.
        assert!((mesh.vertices[0].uv.x - 1.0).abs() < 1e-3);
        assert!((mesh.vertices[1].uv.x - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_drag_is_not_path_dependent() {
        let (mut mesh_a, mut editor, mut events) = quad_editor();
        editor.begin_drag(&mesh_a);
        editor.update_drag(&mut mesh_a, 40.0, 0.0, &mut events);
        editor.update_drag(&mut mesh_a, -20.0, 10.0, &mut events);
        editor.end_drag();

        let (mut mesh_b, mut editor_b, mut events_b) = quad_editor();
        editor_b.begin_drag(&mesh_b);
        editor_b.update_drag(&mut mesh_b, -20.0, 10.0, &mut events_b);
        editor_b.end_drag();

        assert_eq!(uvs(&mesh_a), uvs(&mesh_b));
    }

    #[test]
    fn test_drag_without_selection_is_noop() {
        let mut mesh = Mesh::unit_quad();
        let mut editor = UvEditor::new(200, 200);
        let mut events = EventQueue::new();
        editor.begin_drag(&mesh);
        editor.update_drag(&mut mesh, 50.0, 50.0, &mut events);
        assert!(!editor.drag_active());
        assert!(events.is_empty());
        assert_eq!(uvs(&mesh), uvs(&Mesh::unit_quad()));
    }

    #[test]
    fn test_pack_selection_fits_unit_square() {
        let mut mesh = Mesh::from_buffers(
            vec![
                Vertex::new(0.0, 0.0, 0.0, -2.0, -2.0),
                Vertex::new(1.0, 0.0, 0.0, 2.0, 1.0),
            ],
            vec![],
        );
        let mut editor = UvEditor::new(200, 200);
        editor.select_all(&mesh);
        let mut events = EventQueue::new();
        assert!(editor.pack_selection(&mut mesh, &mut events));
        for v in &mesh.vertices {
            assert!(v.uv.x >= PACK_MARGIN - 1e-5 && v.uv.x <= 1.0 - PACK_MARGIN + 1e-5);
            assert!(v.uv.y >= PACK_MARGIN - 1e-5 && v.uv.y <= 1.0 - PACK_MARGIN + 1e-5);
        }
        assert_eq!(events.pop(), Some(EditorEvent::UvChanged));
    }

    #[test]
    fn test_snap_to_grid() {
        let mut mesh = Mesh::from_buffers(
            vec![Vertex::new(0.0, 0.0, 0.0, 0.33, 0.7)],
            vec![],
        );
        let mut editor = UvEditor::new(200, 200);
        editor.select_all(&mesh);
        let mut events = EventQueue::new();
        assert!(editor.snap_to_grid(&mut mesh, &mut events));
        let uv = mesh.vertices[0].uv;
        let grid = DEFAULT_SNAP_GRID;
        assert!(((uv.x / grid).round() * grid - uv.x).abs() < 1e-6);
        assert!(((uv.y / grid).round() * grid - uv.y).abs() < 1e-6);
    }

    #[test]
    fn test_flip_preserves_centroid() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        let before = mean_uv(mesh.vertices.iter().map(|v| &v.uv));
        assert!(editor.flip_horizontal(&mut mesh, &mut events));
        let after = mean_uv(mesh.vertices.iter().map(|v| &v.uv));
        assert!((after - before).norm() < 1e-5);
    }

    #[test]
    fn test_rotate_quarter_moves_corner() {
        let (mut mesh, mut editor, mut events) = quad_editor();
        assert!(editor.rotate_quarter(&mut mesh, &mut events));
        // (0,0) about pivot (0.5,0.5): offset (-.5,-.5) -> (.5,-.5) -> (1,0).
        assert!((mesh.vertices[0].uv.x - 1.0).abs() < 1e-5);
        assert!((mesh.vertices[0].uv.y - 0.0).abs() < 1e-5);
    }

    #[test]
    fn test_pack_islands_separates_overlap() {
        // Two quads stacked on the same UV area, disjoint in the index
        // buffer.
        let mut vertices = Vec::new();
        for _ in 0..2 {
            vertices.push(Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0));
            vertices.push(Vertex::new(1.0, 0.0, 0.0, 0.5, 0.0));
            vertices.push(Vertex::new(1.0, 1.0, 0.0, 0.5, 0.5));
            vertices.push(Vertex::new(0.0, 1.0, 0.0, 0.0, 0.5));
        }
        let mut mesh = Mesh::from_buffers(
            vertices,
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
        );
        let mut editor = UvEditor::new(200, 200);
        let mut events = EventQueue::new();
        assert!(editor.pack_islands(&mut mesh, &mut events));

        let min_u_a = (0..4).map(|i| mesh.vertices[i].uv.x).fold(f32::INFINITY, f32::min);
        let max_u_a = (0..4).map(|i| mesh.vertices[i].uv.x).fold(f32::NEG_INFINITY, f32::max);
        let min_u_b = (4..8).map(|i| mesh.vertices[i].uv.x).fold(f32::INFINITY, f32::min);
        let max_u_b = (4..8).map(|i| mesh.vertices[i].uv.x).fold(f32::NEG_INFINITY, f32::max);
        // Scale preserved, no horizontal overlap between the two islands.
        assert!((max_u_a - min_u_a - 0.5).abs() < 1e-5);
        assert!((max_u_b - min_u_b - 0.5).abs() < 1e-5);
        assert!(max_u_a <= min_u_b + 1e-5 || max_u_b <= min_u_a + 1e-5);
    }

    #[test]
    fn test_ops_on_empty_selection_are_noops() {
        let mut mesh = Mesh::unit_quad();
        let mut editor = UvEditor::new(200, 200);
        let mut events = EventQueue::new();
        assert!(!editor.pack_selection(&mut mesh, &mut events));
        assert!(!editor.rotate_quarter(&mut mesh, &mut events));
        assert!(!editor.snap_to_grid(&mut mesh, &mut events));
        assert!(events.is_empty());
    }
}
