use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the asset-loading boundary.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors raised while loading or saving preview assets.
///
/// Only the loading boundary fails hard. The render, pick, selection and
/// transform paths are best-effort: malformed triangles or degenerate
/// projections are skipped and the rest of the frame still renders.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed mesh data: {0}")]
    Malformed(String),

    #[error("texture buffer holds {len} pixels, expected {width}x{height}")]
    TextureSize { width: u32, height: u32, len: usize },
}
