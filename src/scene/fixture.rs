//! Small glTF documents for tests. Every document built here shares one
//! `.bin` buffer holding a single textured triangle.

pub const BIN_URI: &str = "scene.bin";

/// positions (36 bytes), normals (36), texcoords (24), u16 indices (6) + 2
/// bytes of padding.
const BIN_LEN: usize = 104;

const BUFFER_VIEWS: &str = r#"[
    {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
    {"buffer": 0, "byteOffset": 36, "byteLength": 36, "target": 34962},
    {"buffer": 0, "byteOffset": 72, "byteLength": 24, "target": 34962},
    {"buffer": 0, "byteOffset": 96, "byteLength": 6, "target": 34963}
]"#;

const ACCESSORS: &str = r#"[
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
    {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"},
    {"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"},
    {"bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR"}
]"#;

pub const TRIANGLE_PRIMITIVE: &str = r#"{"attributes": {"POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2}, "indices": 3, "material": 0}"#;

pub const MATERIALS: &str =
    r#"[{"pbrMetallicRoughness": {"baseColorFactor": [1, 0.5, 0.25, 1], "metallicFactor": 0.5}}]"#;

/// A material with a base color texture, and the texture and image it needs.
pub const TEXTURED_SECTIONS: [(&str, &str); 4] = [
    (
        "materials",
        r#"[{"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}]"#,
    ),
    ("textures", r#"[{"source": 0, "sampler": 0}]"#),
    ("images", r#"[{"uri": "albedo.png"}]"#),
    ("samplers", r#"[{"magFilter": 9728, "minFilter": 9987}]"#),
];

/// A glTF document with the shared buffer, views and accessors plus the
/// given top-level sections. Without a "materials" section, [`MATERIALS`] is
/// used.
pub fn gltf(sections: &[(&str, &str)]) -> String {
    let mut json = format!(
        r#"{{"asset": {{"version": "2.0"}}, "buffers": [{{"uri": "{BIN_URI}", "byteLength": {BIN_LEN}}}], "bufferViews": {BUFFER_VIEWS}, "accessors": {ACCESSORS}"#
    );
    for (key, value) in sections {
        json.push_str(&format!(r#", "{key}": {value}"#));
    }
    if !sections.iter().any(|&(key, _)| key == "materials") {
        json.push_str(&format!(r#", "materials": {MATERIALS}"#));
    }
    json.push('}');
    json
}

/// `count` meshes, each with one triangle primitive.
pub fn meshes(count: usize) -> String {
    let mesh = format!(r#"{{"primitives": [{TRIANGLE_PRIMITIVE}]}}"#);
    format!("[{}]", vec![mesh; count].join(", "))
}

/// One root node per mesh.
pub fn mesh_nodes(count: usize) -> String {
    let nodes: Vec<String> = (0..count).map(|i| format!(r#"{{"mesh": {i}}}"#)).collect();
    format!("[{}]", nodes.join(", "))
}

/// The contents of [`BIN_URI`].
pub fn bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let texcoords: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 4] = [0, 1, 2, 0];
    let mut bin = Vec::with_capacity(BIN_LEN);
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&normals));
    bin.extend_from_slice(bytemuck::cast_slice(&texcoords));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    assert_eq!(bin.len(), BIN_LEN);
    bin
}

/// A `size`x`size` PNG filled with one color.
pub fn png(size: u32, color: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(size, size, image::Rgba(color));
    let image = image::DynamicImage::ImageRgba8(image);
    let mut png = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .unwrap();
    png.into_inner()
}
