//! Model loading from Wavefront OBJ files.
//!
//! The loader handles the subset of OBJ that textured triangle meshes use:
//! `v` positions, `vt` texture coordinates, and `f` faces. Normals,
//! materials, groups, and smoothing directives are skipped. Faces may have
//! any number of corners and are fan-triangulated; corners that reference
//! the same position and texture coordinate collapse into a single vertex
//! so the index buffer does the sharing.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::info;

use meshview_rhi::vertex::Vertex;

use crate::error::{AssetError, AssetResult};

/// Deduplication key for one face corner.
///
/// `f32` has no `Eq` or `Hash`, but corners that reference the same OBJ
/// indices produce bit-identical floats, so the bit patterns are the right
/// equality here.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CornerKey {
    position: [u32; 3],
    tex_coord: [u32; 2],
}

impl CornerKey {
    fn new(position: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position: [
                position.x.to_bits(),
                position.y.to_bits(),
                position.z.to_bits(),
            ],
            tex_coord: [tex_coord.x.to_bits(), tex_coord.y.to_bits()],
        }
    }
}

/// An indexed triangle mesh ready for upload.
#[derive(Debug, Default)]
pub struct Model {
    /// Deduplicated vertices.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl Model {
    /// Loads a model from a Wavefront OBJ file.
    ///
    /// Texture V coordinates are flipped to Vulkan's top-left image origin,
    /// and every vertex gets a white color so the shader's vertex tint is a
    /// no-op for textured models.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a directive is
    /// malformed, a face index is out of range, or the file defines no
    /// faces.
    pub fn load_obj(path: &Path) -> AssetResult<Self> {
        let file = File::open(path)?;
        let model = Self::parse_obj(path, BufReader::new(file))?;

        info!(
            "Loaded OBJ model '{}': {} vertices, {} triangles",
            path.display(),
            model.vertices.len(),
            model.indices.len() / 3
        );

        Ok(model)
    }

    /// Parses OBJ data from a reader. `path` is used for error context only.
    fn parse_obj(path: &Path, reader: impl BufRead) -> AssetResult<Self> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut tex_coords: Vec<Vec2> = Vec::new();

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut unique: HashMap<CornerKey, u32> = HashMap::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();

            match parts[0] {
                "v" => positions.push(parse_vec3(path, line_index, &parts)?),
                "vt" => tex_coords.push(parse_vec2(path, line_index, &parts)?),
                "f" => {
                    if parts.len() < 4 {
                        return Err(malformed(
                            path,
                            line_index,
                            "face needs at least 3 corners",
                        ));
                    }

                    let mut corners = Vec::with_capacity(parts.len() - 1);
                    for part in &parts[1..] {
                        let (position, tex_coord) =
                            resolve_corner(path, line_index, part, &positions, &tex_coords)?;
                        corners.push(dedup_corner(
                            &mut vertices,
                            &mut unique,
                            position,
                            tex_coord,
                        ));
                    }

                    // Fan triangulation around the first corner.
                    for i in 1..corners.len() - 1 {
                        indices.push(corners[0]);
                        indices.push(corners[i]);
                        indices.push(corners[i + 1]);
                    }
                }
                _ => {}
            }
        }

        if indices.is_empty() {
            return Err(AssetError::EmptyModel(path.to_path_buf()));
        }

        Ok(Self { vertices, indices })
    }
}

/// Returns the vertex index for a corner, inserting a new vertex on first
/// sight. The V coordinate is flipped here, after deduplication keying.
fn dedup_corner(
    vertices: &mut Vec<Vertex>,
    unique: &mut HashMap<CornerKey, u32>,
    position: Vec3,
    tex_coord: Vec2,
) -> u32 {
    let key = CornerKey::new(position, tex_coord);
    *unique.entry(key).or_insert_with(|| {
        let index = vertices.len() as u32;
        vertices.push(Vertex::new(
            position,
            Vec3::ONE,
            Vec2::new(tex_coord.x, 1.0 - tex_coord.y),
        ));
        index
    })
}

/// Resolves one `f` corner reference (`pos`, `pos/tex`, or `pos/tex/normal`)
/// to its position and texture coordinate. A missing texture reference
/// falls back to the origin.
fn resolve_corner(
    path: &Path,
    line_index: usize,
    part: &str,
    positions: &[Vec3],
    tex_coords: &[Vec2],
) -> AssetResult<(Vec3, Vec2)> {
    let mut refs = part.split('/');

    let position_ref = refs.next().unwrap_or("");
    let position_index = parse_index(path, line_index, position_ref, positions.len())?;
    let position = *positions.get(position_index).ok_or_else(|| {
        malformed(
            path,
            line_index,
            &format!("position index {} out of range", position_index + 1),
        )
    })?;

    let tex_coord = match refs.next() {
        Some(raw) if !raw.is_empty() => {
            let tex_index = parse_index(path, line_index, raw, tex_coords.len())?;
            *tex_coords.get(tex_index).ok_or_else(|| {
                malformed(
                    path,
                    line_index,
                    &format!("texture index {} out of range", tex_index + 1),
                )
            })?
        }
        _ => Vec2::ZERO,
    };

    Ok((position, tex_coord))
}

/// Parses an OBJ index reference into a zero-based index. OBJ indices are
/// one-based; negative values count back from the end of the list.
fn parse_index(path: &Path, line_index: usize, raw: &str, count: usize) -> AssetResult<usize> {
    let value: i64 = raw
        .parse()
        .map_err(|_| malformed(path, line_index, &format!("invalid index '{}'", raw)))?;

    if value > 0 {
        Ok((value - 1) as usize)
    } else if value < 0 {
        let back = value.unsigned_abs() as usize;
        count.checked_sub(back).ok_or_else(|| {
            malformed(
                path,
                line_index,
                &format!("relative index {} out of range", value),
            )
        })
    } else {
        Err(malformed(path, line_index, "OBJ indices are 1-based"))
    }
}

fn parse_vec3(path: &Path, line_index: usize, parts: &[&str]) -> AssetResult<Vec3> {
    if parts.len() < 4 {
        return Err(malformed(path, line_index, "expected 3 components"));
    }

    Ok(Vec3::new(
        parse_float(path, line_index, parts[1])?,
        parse_float(path, line_index, parts[2])?,
        parse_float(path, line_index, parts[3])?,
    ))
}

fn parse_vec2(path: &Path, line_index: usize, parts: &[&str]) -> AssetResult<Vec2> {
    if parts.len() < 3 {
        return Err(malformed(path, line_index, "expected 2 components"));
    }

    Ok(Vec2::new(
        parse_float(path, line_index, parts[1])?,
        parse_float(path, line_index, parts[2])?,
    ))
}

fn parse_float(path: &Path, line_index: usize, raw: &str) -> AssetResult<f32> {
    raw.parse()
        .map_err(|_| malformed(path, line_index, &format!("invalid number '{}'", raw)))
}

fn malformed(path: &Path, line_index: usize, message: &str) -> AssetError {
    AssetError::ObjParse {
        path: path.to_path_buf(),
        line: line_index + 1,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> AssetResult<Model> {
        Model::parse_obj(Path::new("test.obj"), Cursor::new(text))
    }

    #[test]
    fn test_triangle_parses() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.0 0.0\n\
             vt 1.0 0.0\n\
             vt 0.0 1.0\n\
             f 1/1 2/2 3/3\n",
        )
        .unwrap();

        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.indices, vec![0, 1, 2]);
        assert_eq!(model.vertices[1].position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_quad_fan_triangulates() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 1.0 1.0 0.0\n\
             v 0.0 1.0 0.0\n\
             f 1 2 3 4\n",
        )
        .unwrap();

        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_shared_corners_deduplicate() {
        // Two triangles sharing an edge: 6 corners, 4 unique vertices.
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 1.0 1.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.0 0.0\n\
             vt 1.0 0.0\n\
             vt 1.0 1.0\n\
             vt 0.0 1.0\n\
             f 1/1 2/2 3/3\n\
             f 1/1 3/3 4/4\n",
        )
        .unwrap();

        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_same_position_different_texcoord_stays_split() {
        // A seam: one position referenced with two texture coordinates.
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.0 0.0\n\
             vt 1.0 0.0\n\
             f 1/1 2/1 3/1\n\
             f 1/2 2/1 3/1\n",
        )
        .unwrap();

        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.indices[3], 3);
    }

    #[test]
    fn test_texcoord_v_flipped() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vt 0.5 0.25\n\
             f 1/1 2/1 3/1\n",
        )
        .unwrap();

        assert_eq!(model.vertices[0].tex_coord, Vec2::new(0.5, 0.75));
    }

    #[test]
    fn test_vertex_color_is_white() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             f 1 2 3\n",
        )
        .unwrap();

        assert!(model.vertices.iter().all(|v| v.color == Vec3::ONE));
    }

    #[test]
    fn test_normals_and_unknown_directives_skipped() {
        let model = parse(
            "# comment\n\
             mtllib scene.mtl\n\
             o thing\n\
             v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             vn 0.0 0.0 1.0\n\
             s off\n\
             f 1//1 2//1 3//1\n",
        )
        .unwrap();

        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.indices.len(), 3);
    }

    #[test]
    fn test_negative_indices_count_from_end() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             f -3 -2 -1\n",
        )
        .unwrap();

        assert_eq!(model.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_position_index_out_of_range() {
        let result = parse("v 0.0 0.0 0.0\nf 1 2 3\n");
        assert!(matches!(result, Err(AssetError::ObjParse { line: 2, .. })));
    }

    #[test]
    fn test_zero_index_rejected() {
        let result = parse("v 0.0 0.0 0.0\nf 0 0 0\n");
        assert!(matches!(result, Err(AssetError::ObjParse { .. })));
    }

    #[test]
    fn test_malformed_position_rejected() {
        let result = parse("v 0.0 abc 0.0\n");
        assert!(matches!(result, Err(AssetError::ObjParse { line: 1, .. })));
    }

    #[test]
    fn test_no_faces_rejected() {
        let result = parse("v 0.0 0.0 0.0\nv 1.0 0.0 0.0\n");
        assert!(matches!(result, Err(AssetError::EmptyModel(_))));
    }

    #[test]
    fn test_missing_texcoord_defaults_to_flipped_origin() {
        let model = parse(
            "v 0.0 0.0 0.0\n\
             v 1.0 0.0 0.0\n\
             v 0.0 1.0 0.0\n\
             f 1 2 3\n",
        )
        .unwrap();

        // (0, 0) raw becomes (0, 1) after the V flip.
        assert_eq!(model.vertices[0].tex_coord, Vec2::new(0.0, 1.0));
    }
}
