//! Integration tests for asset loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use meshview_resources::{Model, TextureData};

/// Returns a unique path in the system temp directory for this test run.
fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("meshview-{}-{}", std::process::id(), name))
}

#[test]
fn test_load_obj_from_disk() {
    let path = temp_path("pyramid.obj");
    fs::write(
        &path,
        "# square pyramid\n\
         v -1.0 -1.0 0.0\n\
         v 1.0 -1.0 0.0\n\
         v 1.0 1.0 0.0\n\
         v -1.0 1.0 0.0\n\
         v 0.0 0.0 1.0\n\
         vt 0.0 0.0\n\
         vt 1.0 0.0\n\
         vt 1.0 1.0\n\
         vt 0.0 1.0\n\
         vt 0.5 0.5\n\
         f 1/1 2/2 3/3 4/4\n\
         f 1/1 2/2 5/5\n\
         f 2/2 3/3 5/5\n\
         f 3/3 4/4 5/5\n\
         f 4/4 1/1 5/5\n",
    )
    .expect("Failed to write test OBJ");

    let model = Model::load_obj(&path).expect("Failed to load OBJ");
    let _ = fs::remove_file(&path);

    // 4 base corners + apex, shared across the quad and the four sides.
    assert_eq!(model.vertices.len(), 5);
    // One quad (two triangles) + four sides = 6 triangles.
    assert_eq!(model.indices.len(), 18);

    // Every index must land inside the vertex list.
    let vertex_count = model.vertices.len() as u32;
    assert!(model.indices.iter().all(|&i| i < vertex_count));
}

#[test]
fn test_load_obj_missing_file_is_error() {
    let result = Model::load_obj(Path::new("does/not/exist.obj"));
    assert!(result.is_err());
}

#[test]
fn test_load_texture_converts_to_rgba8() {
    let path = temp_path("gradient.png");

    // RGB source: the loader must widen it to four channels.
    let image = image::RgbImage::from_fn(4, 2, |x, y| {
        image::Rgb([x as u8 * 60, y as u8 * 120, 255])
    });
    image.save(&path).expect("Failed to write test PNG");

    let data = TextureData::load(&path).expect("Failed to load texture");
    let _ = fs::remove_file(&path);

    assert_eq!(data.width, 4);
    assert_eq!(data.height, 2);
    assert_eq!(data.pixels.len(), data.byte_len());
    // First pixel: (0, 0, 255) with an opaque alpha added.
    assert_eq!(&data.pixels[0..4], &[0, 0, 255, 255]);
}

#[test]
fn test_load_viking_room_model() {
    // Repo asset; skip when it has not been downloaded.
    let model_path = Path::new("../../assets/models/viking_room.obj");
    if !model_path.exists() {
        println!("Skipping test: model file not found at {:?}", model_path);
        return;
    }

    let model = Model::load_obj(model_path).expect("Failed to load OBJ model");

    assert!(!model.vertices.is_empty(), "Model should have vertices");
    assert_eq!(
        model.indices.len() % 3,
        0,
        "Indices should form whole triangles"
    );

    // Deduplication should collapse far below one vertex per corner.
    assert!(
        model.vertices.len() < model.indices.len(),
        "Expected shared vertices ({} vertices for {} indices)",
        model.vertices.len(),
        model.indices.len()
    );

    println!(
        "Loaded model: {} vertices, {} triangles",
        model.vertices.len(),
        model.indices.len() / 3
    );
}
