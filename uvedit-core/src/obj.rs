/// Wavefront OBJ import and export for preview meshes
use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, warn};
use nalgebra::{Point3, Vector2};
use nom::{
    character::complete::{char, i64 as parse_i64, multispace0, multispace1},
    combinator::opt,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::{MeshError, Result};
use crate::geometry::{Mesh, Vertex};

/// Load a mesh from an OBJ file.
pub fn load_obj(path: &Path) -> Result<Mesh> {
    if !path.exists() {
        return Err(MeshError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let mesh = parse_obj(&text);
    debug!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parse OBJ text into a per-face-corner mesh.
///
/// Only `v`, `vt` and `f` records matter; everything else (normals, groups,
/// materials, junk) is ignored. Faces with more than three corners are fan
/// triangulated. Indices are 1-based and may be negative (relative to the
/// end of the respective list). A corner referencing an out-of-range
/// position or texture coordinate resolves to zeroed attributes rather than
/// failing — previews should survive sloppy exports.
///
/// One vertex record is emitted per face corner, so seam vertices stay
/// duplicated exactly as the selection machinery expects.
pub fn parse_obj(input: &str) -> Mesh {
    let mut positions: Vec<Point3<f32>> = Vec::new();
    let mut tex_coords: Vec<Vector2<f32>> = Vec::new();
    let mut mesh = Mesh::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("vt") {
            if let Ok((_, (u, v))) = parse_float_pair(rest) {
                tex_coords.push(Vector2::new(u, v));
            } else {
                warn!("skipping malformed texture coordinate: {line}");
            }
        } else if let Some(rest) = line.strip_prefix("vn") {
            let _ = rest; // normals are not used by the preview
        } else if let Some(rest) = line.strip_prefix('v') {
            if let Ok((_, (x, y, z))) = parse_float_triple(rest) {
                positions.push(Point3::new(x, y, z));
            } else {
                warn!("skipping malformed position: {line}");
            }
        } else if let Some(rest) = line.strip_prefix('f') {
            parse_face(rest, &positions, &tex_coords, &mut mesh);
        }
    }

    mesh.recompute_bounds();
    mesh
}

fn parse_face(
    rest: &str,
    positions: &[Point3<f32>],
    tex_coords: &[Vector2<f32>],
    mesh: &mut Mesh,
) {
    let mut first: Option<u32> = None;
    let mut prev: Option<u32> = None;

    for token in rest.split_whitespace() {
        let (vi, ti) = match parse_corner(token) {
            Ok((_, corner)) => corner,
            Err(_) => {
                warn!("skipping malformed face corner: {token}");
                continue;
            }
        };

        let position = resolve(vi, positions.len())
            .and_then(|i| positions.get(i))
            .copied()
            .unwrap_or_else(Point3::origin);
        let uv = resolve(ti.unwrap_or(0), tex_coords.len())
            .and_then(|i| tex_coords.get(i))
            .copied()
            .unwrap_or_else(Vector2::zeros);

        mesh.vertices.push(Vertex {
            position,
            uv,
        });
        let index = (mesh.vertices.len() - 1) as u32;

        match (first, prev) {
            (None, _) => first = Some(index),
            (Some(f), Some(p)) => {
                // Fan triangulation for polygons beyond a triangle.
                mesh.indices.extend_from_slice(&[f, p, index]);
            }
            _ => {}
        }
        prev = Some(index);
    }
}

/// Map an OBJ index to a list offset. Positive indices are 1-based, negative
/// count back from the end, zero means "unreferenced".
fn resolve(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else if index > 0 {
        index - 1
    } else {
        0
    };
    (0..len as i64).contains(&resolved).then(|| resolved as usize)
}

fn parse_corner(input: &str) -> IResult<&str, (i64, Option<i64>)> {
    let (input, vi) = parse_i64(input)?;
    let (input, ti) = opt(preceded(char('/'), opt(parse_i64)))(input)?;
    // A trailing normal reference is parsed and dropped.
    let (input, _) = opt(preceded(char('/'), opt(parse_i64)))(input)?;
    Ok((input, (vi, ti.flatten())))
}

fn parse_float_pair(input: &str) -> IResult<&str, (f32, f32)> {
    let (input, u) = preceded(multispace1, float)(input)?;
    let (input, v) = preceded(multispace1, float)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (u, v)))
}

fn parse_float_triple(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (x, y, z)))
}

/// Write the current mesh back out as OBJ, one position and texture
/// coordinate per stored vertex so edited UVs survive round trips.
pub fn save_obj(mesh: &Mesh, path: &Path) -> Result<()> {
    let mut out = Vec::new();
    write_obj(mesh, &mut out)?;
    fs::write(path, out)?;
    debug!("saved {} vertices to {}", mesh.vertices.len(), path.display());
    Ok(())
}

fn write_obj<W: Write>(mesh: &Mesh, out: &mut W) -> std::io::Result<()> {
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
    }
    for v in &mesh.vertices {
        writeln!(out, "vt {} {}", v.uv.x, v.uv.y)?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        writeln!(
            out,
            "f {}/{} {}/{} {}/{}",
            tri[0] + 1,
            tri[0] + 1,
            tri[1] + 1,
            tri[1] + 1,
            tri[2] + 1,
            tri[2] + 1
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triangle_with_uvs() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n",
        );
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!((mesh.vertices[1].uv.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );
        // Four corners stored, two triangles sharing the fan root.
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        assert_eq!(mesh.vertices.len(), 3);
        assert!((mesh.vertices[2].position.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_corners_stay_duplicated() {
        // The same position referenced by two faces becomes two records.
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n",
        );
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn test_out_of_range_reference_zeroes() {
        let mesh = parse_obj("v 1 2 3\nf 1 5 1\n");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].position, Point3::origin());
    }

    #[test]
    fn test_junk_lines_ignored() {
        let mesh = parse_obj(
            "# comment\no thing\nusemtl stuff\nv 0 0 0\nv 1 0 0\nv 0 1 0\nnonsense\nf 1 2 3\n",
        );
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
    }

    #[test]
    fn test_normals_in_faces_ignored() {
        let mesh = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n",
        );
        assert_eq!(mesh.vertices.len(), 3);
        assert!((mesh.vertices[2].uv.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_recomputed_on_load() {
        let mesh = parse_obj("v -1 0 0\nv 1 0 0\nv 0 0 0\nf 1 2 3\n");
        assert!((mesh.bounding_radius() - 1.0).abs() < 1e-6);
        assert!((mesh.center().x).abs() < 1e-6);
    }

    #[test]
    fn test_export_format() {
        let mesh = Mesh::unit_quad();
        let mut out = Vec::new();
        write_obj(&mesh, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("v -0.5 0 -0.5"));
        assert!(text.contains("vt 1 1"));
        assert!(text.contains("f 1/1 2/2 3/3"));
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let err = load_obj(Path::new("/definitely/not/here.obj")).unwrap_err();
        assert!(matches!(err, MeshError::NotFound(_)));
    }
}
