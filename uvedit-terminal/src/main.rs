/// uvedit - preview a textured mesh and edit its UVs in the terminal
///
/// Controls:
///   - Left drag (3D pane): orbit, scroll: zoom
///   - Right click (3D pane): pick a face patch (Shift: additive)
///   - Left click/drag (UV pane): select and transform, Middle drag: pan
///   - g/s/r: move/scale/rotate, a: select all, w: wireframe, o: export
use clap::Parser;
use log::debug;
use std::path::{Path, PathBuf};
use uvedit_core::{obj, Mesh, MeshError, Texture};
use uvedit_terminal::TerminalApp;

#[derive(Parser)]
#[command(
    name = "uvedit",
    about = "Preview a textured mesh and edit its texture coordinates"
)]
struct Args {
    /// Wavefront OBJ mesh to preview (defaults to a demo quad)
    mesh: Option<PathBuf>,

    /// Texture image mapped onto the mesh (png or jpeg)
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Start in wireframe mode
    #[arg(short, long)]
    wireframe: bool,

    /// Where `o` writes the edited mesh
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MeshError> {
    let args = Args::parse();

    let mesh = match &args.mesh {
        Some(path) => obj::load_obj(path)?,
        None => Mesh::unit_quad(),
    };
    let texture = match &args.texture {
        Some(path) => load_texture(path)?,
        None => Texture::checker(64, 8),
    };

    let mut app = TerminalApp::new(mesh, texture)?;
    app.set_wireframe(args.wireframe);
    app.set_export_path(args.out.unwrap_or_else(|| export_path_for(args.mesh.as_deref())));
    app.run()?;
    Ok(())
}

fn load_texture(path: &Path) -> Result<Texture, MeshError> {
    let img = image::open(path)
        .map_err(|e| MeshError::Malformed(format!("texture {}: {e}", path.display())))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    debug!("loaded texture {}: {width}x{height}", path.display());
    let rgba = img.pixels().map(|p| p.0).collect();
    Texture::from_rgba8(width, height, rgba)
}

/// Default export target: the input name with an `-edited` suffix.
fn export_path_for(mesh: Option<&Path>) -> PathBuf {
    match mesh {
        Some(path) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "mesh".to_string());
            path.with_file_name(format!("{stem}-edited.obj"))
        }
        None => PathBuf::from("uvedit-export.obj"),
    }
}
