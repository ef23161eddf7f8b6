/// Orbit camera and screen-space projection
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::geometry::Mesh;

/// Pitch limit keeping the camera away from the poles (radians).
const PITCH_LIMIT: f32 = 1.5;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 100.0;

/// Smallest clip-space w magnitude allowed before the perspective divide.
const MIN_CLIP_W: f32 = 1e-6;

/// Projected triangles with a 2D signed area below this are skipped.
pub(crate) const DEGENERATE_AREA: f32 = 1e-8;

/// Orbit camera parameterized by yaw, pitch and distance around the origin.
///
/// World up is fixed to +Z so the camera never rolls. At yaw 0 / pitch 0 the
/// eye sits on the negative Y axis looking at the origin. Yaw is unbounded
/// (it wraps through the trig functions); pitch and distance are clamped.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            yaw: 0.6,
            pitch: -0.3,
            distance: 3.0,
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Reset to the framing used when a new mesh is assigned.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Apply a yaw/pitch delta, clamping pitch.
    pub fn orbit(&mut self, dyaw: f32, dpitch: f32) {
        self.yaw += dyaw;
        self.pitch = (self.pitch + dpitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Scale the orbit distance, clamping into the valid range.
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Camera position in spherical coordinates around the origin.
    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Point3::new(
            self.distance * cos_pitch * sin_yaw,
            -self.distance * cos_pitch * cos_yaw,
            self.distance * sin_pitch,
        )
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye(), &Point3::origin(), &Vector3::z())
    }

    pub fn projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect = width as f32 / height.max(1) as f32;
        Matrix4::new_perspective(aspect, self.fov, self.near, self.far)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizing world transform: recenter the mesh, then scale it into a unit
/// bounding sphere so framing is independent of the mesh's native size.
/// Computed fresh each frame from the current mesh state.
pub fn world_matrix(mesh: &Mesh) -> Matrix4<f32> {
    let scale = 1.0 / mesh.bounding_radius().max(1e-4);
    Matrix4::new_scaling(scale) * Matrix4::new_translation(&(-mesh.center().coords))
}

/// Combined mesh-space to clip-space transform for one frame or pick.
pub fn view_projection(
    mesh: &Mesh,
    camera: &OrbitCamera,
    width: u32,
    height: u32,
) -> Matrix4<f32> {
    camera.projection_matrix(width, height) * camera.view_matrix() * world_matrix(mesh)
}

/// Projected vertex attributes in the layout both the rasterizer and the
/// picker interpolate from.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    /// NDC depth.
    pub z: f32,
    /// Reciprocal of clip-space w.
    pub inv_w: f32,
    /// u / w.
    pub u_over_w: f32,
    /// (1 - v) / w. V is pre-flipped so image rows (down) and UV rows (up)
    /// agree; the 2D editor reproduces the same flip.
    pub v_over_w: f32,
}

/// Reusable projection scratch, resized only when the vertex count changes.
///
/// Both the rasterizer and the picker project through this type with the same
/// combined transform, which is what guarantees pick/render agreement.
#[derive(Debug, Default)]
pub struct VertexCache {
    verts: Vec<ScreenVertex>,
}

impl VertexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project every mesh vertex for the given camera and viewport.
    pub fn project(&mut self, mesh: &Mesh, camera: &OrbitCamera, width: u32, height: u32) {
        let mvp = view_projection(mesh, camera, width, height);
        self.verts.resize(mesh.vertices.len(), ScreenVertex::default());

        let w_scale = (width.max(1) - 1) as f32;
        let h_scale = (height.max(1) - 1) as f32;

        for (sv, v) in self.verts.iter_mut().zip(&mesh.vertices) {
            let clip: Vector4<f32> = mvp * v.position.to_homogeneous();
            let mut w = clip.w;
            if w.abs() < MIN_CLIP_W {
                w = MIN_CLIP_W.copysign(w);
            }
            let inv_w = 1.0 / w;

            let ndc_x = clip.x * inv_w;
            let ndc_y = clip.y * inv_w;
            let ndc_z = clip.z * inv_w;

            sv.x = (ndc_x * 0.5 + 0.5) * w_scale;
            sv.y = (1.0 - (ndc_y * 0.5 + 0.5)) * h_scale;
            sv.z = ndc_z;
            sv.inv_w = inv_w;
            sv.u_over_w = v.uv.x * inv_w;
            sv.v_over_w = (1.0 - v.uv.y) * inv_w;
        }
    }

    pub fn get(&self, index: u32) -> Option<&ScreenVertex> {
        self.verts.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }
}

/// Signed denominator of the edge-function barycentric formula (twice the
/// projected triangle's signed area).
pub(crate) fn edge_denom(v0: &ScreenVertex, v1: &ScreenVertex, v2: &ScreenVertex) -> f32 {
    (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y)
}

/// Barycentric weights of a screen point given the precomputed reciprocal
/// denominator. Weights sum to 1; any negative weight means outside.
pub(crate) fn barycentric(
    v0: &ScreenVertex,
    v1: &ScreenVertex,
    v2: &ScreenVertex,
    px: f32,
    py: f32,
    inv_denom: f32,
) -> (f32, f32, f32) {
    let w0 = ((v1.y - v2.y) * (px - v2.x) + (v2.x - v1.x) * (py - v2.y)) * inv_denom;
    let w1 = ((v2.y - v0.y) * (px - v2.x) + (v0.x - v2.x) * (py - v2.y)) * inv_denom;
    (w0, w1, 1.0 - w0 - w1)
}
