/// UVEdit Core Library - Software rendering, picking and UV editing
///
/// This library provides the engine behind the textured mesh previewer: a
/// CPU triangle rasterizer with depth buffering and perspective-correct
/// texture interpolation, a screen-space picker that mirrors the rasterizer's
/// projection, seam-aware selection expansion, and the Move/Scale/Rotate
/// UV transform engine. The terminal frontend lives in a separate crate.

pub mod error;
pub mod event;
pub mod geometry;
pub mod obj;
pub mod pick;
pub mod projection;
pub mod raster;
pub mod select;
pub mod texture;
pub mod uv_edit;
pub mod uv_view;

// Re-export commonly used types
pub use error::{MeshError, Result};
pub use event::{EditorEvent, EventQueue};
pub use geometry::{Mesh, Vertex};
pub use pick::Picker;
pub use projection::{OrbitCamera, ScreenVertex, VertexCache};
pub use raster::{Framebuffer, RenderMode, Renderer};
pub use select::{expand_selection, AdjacencyGraph, Selection};
pub use texture::Texture;
pub use uv_edit::{TransformMode, UvEditor};
pub use uv_view::{render_uv_view, UvViewport};
