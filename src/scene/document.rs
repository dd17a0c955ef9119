//! The parts of a glTF 2.0 JSON document the viewer understands, parsed with
//! `tinyjson` and validated so that every index refers to an existing entry.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use thiserror::Error;
use tinyjson::JsonValue;

type Object = HashMap<String, JsonValue>;

/// glTF `bufferView.target` for index data.
const ELEMENT_ARRAY_BUFFER: usize = 34963;
/// glTF `primitive.mode` default, triangles.
const MODE_TRIANGLES: u32 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("{what} is missing")]
    Missing { what: String },
    #[error("{what} should be {expected}")]
    WrongType { what: String, expected: &'static str },
    #[error("{what} refers to index {index}, but there are only {len}")]
    IndexOutOfRange {
        what: String,
        index: usize,
        len: usize,
    },
    #[error("{what} has unsupported value {value}")]
    Unsupported { what: String, value: String },
    #[error("node {0} is the child of more than one node")]
    MultipleParents(usize),
    #[error("node {0} is part of a cycle")]
    Cycle(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    pub uri: Option<String>,
    pub byte_length: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferViewKind {
    Vertex,
    Index,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub kind: BufferViewKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub count: usize,
    pub kind: AccessorType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub uri: Option<String>,
}

/// Raw glTF sampler enums; `None` means the document left it undefined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: Option<u32>,
    pub wrap_t: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub source: Option<usize>,
    pub sampler: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    /// Uses `KHR_materials_pbrSpecularGlossiness`.
    pub specular_glossiness: bool,
    pub normal_texture: Option<usize>,
    pub occlusion_texture: Option<usize>,
    pub emissive_texture: Option<usize>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    /// (semantic, accessor index), sorted by semantic.
    pub attributes: Vec<(String, usize)>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: u32,
}

impl Primitive {
    pub fn attribute(&self, semantic: &str) -> Option<usize> {
        self.attributes
            .iter()
            .find(|(name, _)| name == semantic)
            .map(|&(_, accessor)| accessor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalTransform {
    Matrix(Mat4),
    Trs {
        translation: Option<Vec3>,
        rotation: Option<Quat>,
        scale: Option<Vec3>,
    },
}

impl LocalTransform {
    /// The node's transform relative to its parent: the explicit matrix, or
    /// `T * R * S`.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            LocalTransform::Matrix(matrix) => matrix,
            LocalTransform::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(
                scale.unwrap_or(Vec3::ONE),
                rotation.unwrap_or(Quat::IDENTITY),
                translation.unwrap_or(Vec3::ZERO),
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub transform: LocalTransform,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn parse(json: &str) -> Result<Document, DocumentError> {
        let root: JsonValue = json
            .parse()
            .map_err(|err: tinyjson::JsonParseError| DocumentError::Json(err.to_string()))?;
        let root = as_object(&root, "document")?;

        let buffers = parse_array(root, "buffers", parse_buffer)?;
        let mut buffer_views = parse_array(root, "bufferViews", parse_buffer_view)?;
        let accessors = parse_array(root, "accessors", parse_accessor)?;
        let images = parse_array(root, "images", parse_image)?;
        let samplers = parse_array(root, "samplers", parse_sampler)?;
        let textures = parse_array(root, "textures", parse_texture)?;
        let materials = parse_array(root, "materials", parse_material)?;
        let meshes = parse_array(root, "meshes", parse_mesh)?;
        let mut nodes = parse_array(root, "nodes", parse_node)?;

        for (i, view) in buffer_views.iter().enumerate() {
            check_index(&format!("bufferViews[{i}].buffer"), view.buffer, buffers.len())?;
        }
        for (i, accessor) in accessors.iter().enumerate() {
            if let Some(view) = accessor.buffer_view {
                check_index(&format!("accessors[{i}].bufferView"), view, buffer_views.len())?;
            }
        }
        for (i, texture) in textures.iter().enumerate() {
            if let Some(source) = texture.source {
                check_index(&format!("textures[{i}].source"), source, images.len())?;
            }
            if let Some(sampler) = texture.sampler {
                check_index(&format!("textures[{i}].sampler"), sampler, samplers.len())?;
            }
        }
        for (i, material) in materials.iter().enumerate() {
            let pbr = material.pbr_metallic_roughness.as_ref();
            let texture_refs = [
                pbr.and_then(|pbr| pbr.base_color_texture),
                pbr.and_then(|pbr| pbr.metallic_roughness_texture),
                material.normal_texture,
                material.occlusion_texture,
                material.emissive_texture,
            ];
            for texture in texture_refs.into_iter().flatten() {
                check_index(&format!("materials[{i}] texture"), texture, textures.len())?;
            }
        }
        for (i, mesh) in meshes.iter().enumerate() {
            for (j, primitive) in mesh.primitives.iter().enumerate() {
                let what = format!("meshes[{i}].primitives[{j}]");
                for (semantic, accessor) in &primitive.attributes {
                    check_index(&format!("{what}.{semantic}"), *accessor, accessors.len())?;
                }
                if let Some(indices) = primitive.indices {
                    check_index(&format!("{what}.indices"), indices, accessors.len())?;
                    // Views without a target are classified by how they are used.
                    if let Some(view) = accessors[indices].buffer_view {
                        buffer_views[view].kind = BufferViewKind::Index;
                    }
                }
                if let Some(material) = primitive.material {
                    check_index(&format!("{what}.material"), material, materials.len())?;
                }
            }
        }
        for i in 0..nodes.len() {
            if let Some(mesh) = nodes[i].mesh {
                check_index(&format!("nodes[{i}].mesh"), mesh, meshes.len())?;
            }
            for j in 0..nodes[i].children.len() {
                let child = nodes[i].children[j];
                check_index(&format!("nodes[{i}].children"), child, nodes.len())?;
                if nodes[child].parent.is_some() {
                    return Err(DocumentError::MultipleParents(child));
                }
                nodes[child].parent = Some(i);
            }
        }
        for start in 0..nodes.len() {
            let mut node = start;
            let mut steps = 0;
            while let Some(parent) = nodes[node].parent {
                steps += 1;
                if steps > nodes.len() {
                    return Err(DocumentError::Cycle(start));
                }
                node = parent;
            }
        }

        Ok(Document {
            buffers,
            buffer_views,
            accessors,
            images,
            samplers,
            textures,
            materials,
            meshes,
            nodes,
        })
    }
}

fn check_index(what: &str, index: usize, len: usize) -> Result<(), DocumentError> {
    if index < len {
        Ok(())
    } else {
        Err(DocumentError::IndexOutOfRange {
            what: what.to_string(),
            index,
            len,
        })
    }
}

fn as_object<'a>(value: &'a JsonValue, what: &str) -> Result<&'a Object, DocumentError> {
    value.get::<Object>().ok_or_else(|| DocumentError::WrongType {
        what: what.to_string(),
        expected: "an object",
    })
}

/// Parses the array at `root[key]` with `parse`, an absent key being empty.
fn parse_array<T>(
    root: &Object,
    key: &str,
    parse: fn(&Object, &str) -> Result<T, DocumentError>,
) -> Result<Vec<T>, DocumentError> {
    let Some(values) = root.get(key) else {
        return Ok(Vec::new());
    };
    let values = values
        .get::<Vec<JsonValue>>()
        .ok_or_else(|| DocumentError::WrongType {
            what: key.to_string(),
            expected: "an array",
        })?;
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let what = format!("{key}[{i}]");
            parse(as_object(value, &what)?, &what)
        })
        .collect()
}

fn field_what(what: &str, key: &str) -> String {
    format!("{what}.{key}")
}

/// Return the number at `object[key]` as usize, if present. glTF indices,
/// offsets and lengths all fit in a u32.
fn take_usize(object: &Object, key: &str, what: &str) -> Result<Option<usize>, DocumentError> {
    match object.get(key) {
        None => Ok(None),
        Some(JsonValue::Number(n))
            if (0.0..=u32::MAX as f64).contains(n) && n.fract() == 0.0 =>
        {
            Ok(Some(*n as usize))
        }
        Some(_) => Err(DocumentError::WrongType {
            what: field_what(what, key),
            expected: "a non-negative integer",
        }),
    }
}

fn require_usize(object: &Object, key: &str, what: &str) -> Result<usize, DocumentError> {
    take_usize(object, key, what)?.ok_or_else(|| DocumentError::Missing {
        what: field_what(what, key),
    })
}

fn take_f32(object: &Object, key: &str, what: &str) -> Result<Option<f32>, DocumentError> {
    match object.get(key) {
        None => Ok(None),
        Some(JsonValue::Number(n)) => Ok(Some(*n as f32)),
        Some(_) => Err(DocumentError::WrongType {
            what: field_what(what, key),
            expected: "a number",
        }),
    }
}

/// Return `object[key]` as an array of exactly N numbers, if present.
fn take_floats<const N: usize>(
    object: &Object,
    key: &str,
    what: &str,
) -> Result<Option<[f32; N]>, DocumentError> {
    let Some(value) = object.get(key) else {
        return Ok(None);
    };
    let wrong_type = || DocumentError::WrongType {
        what: field_what(what, key),
        expected: "an array of numbers of the right length",
    };
    let values = value.get::<Vec<JsonValue>>().ok_or_else(wrong_type)?;
    if values.len() != N {
        return Err(wrong_type());
    }
    let mut floats = [0.0; N];
    for (float, value) in floats.iter_mut().zip(values) {
        *float = *value.get::<f64>().ok_or_else(wrong_type)? as f32;
    }
    Ok(Some(floats))
}

fn take_string(object: &Object, key: &str, what: &str) -> Result<Option<String>, DocumentError> {
    match object.get(key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DocumentError::WrongType {
            what: field_what(what, key),
            expected: "a string",
        }),
    }
}

fn take_bool(object: &Object, key: &str, what: &str) -> Result<Option<bool>, DocumentError> {
    match object.get(key) {
        None => Ok(None),
        Some(JsonValue::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(DocumentError::WrongType {
            what: field_what(what, key),
            expected: "a boolean",
        }),
    }
}

fn take_object<'a>(
    object: &'a Object,
    key: &str,
    what: &str,
) -> Result<Option<&'a Object>, DocumentError> {
    object
        .get(key)
        .map(|value| as_object(value, &field_what(what, key)))
        .transpose()
}

/// The texture index of a textureInfo object, e.g. `"normalTexture": {"index": 0}`.
fn take_texture_info(object: &Object, key: &str, what: &str) -> Result<Option<usize>, DocumentError> {
    match take_object(object, key, what)? {
        Some(info) => Ok(Some(require_usize(info, "index", &field_what(what, key))?)),
        None => Ok(None),
    }
}

fn parse_buffer(object: &Object, what: &str) -> Result<Buffer, DocumentError> {
    Ok(Buffer {
        uri: take_string(object, "uri", what)?,
        byte_length: require_usize(object, "byteLength", what)?,
    })
}

fn parse_buffer_view(object: &Object, what: &str) -> Result<BufferView, DocumentError> {
    let kind = match take_usize(object, "target", what)? {
        Some(ELEMENT_ARRAY_BUFFER) => BufferViewKind::Index,
        _ => BufferViewKind::Vertex,
    };
    Ok(BufferView {
        buffer: require_usize(object, "buffer", what)?,
        byte_offset: take_usize(object, "byteOffset", what)?.unwrap_or(0),
        byte_length: require_usize(object, "byteLength", what)?,
        byte_stride: take_usize(object, "byteStride", what)?,
        kind,
    })
}

fn parse_accessor(object: &Object, what: &str) -> Result<Accessor, DocumentError> {
    let component_type = match require_usize(object, "componentType", what)? {
        5120 => ComponentType::I8,
        5121 => ComponentType::U8,
        5122 => ComponentType::I16,
        5123 => ComponentType::U16,
        5125 => ComponentType::U32,
        5126 => ComponentType::F32,
        other => {
            return Err(DocumentError::Unsupported {
                what: field_what(what, "componentType"),
                value: other.to_string(),
            })
        }
    };
    let kind = match take_string(object, "type", what)?.as_deref() {
        Some("SCALAR") => AccessorType::Scalar,
        Some("VEC2") => AccessorType::Vec2,
        Some("VEC3") => AccessorType::Vec3,
        Some("VEC4") => AccessorType::Vec4,
        Some("MAT2") => AccessorType::Mat2,
        Some("MAT3") => AccessorType::Mat3,
        Some("MAT4") => AccessorType::Mat4,
        Some(other) => {
            return Err(DocumentError::Unsupported {
                what: field_what(what, "type"),
                value: other.to_string(),
            })
        }
        None => {
            return Err(DocumentError::Missing {
                what: field_what(what, "type"),
            })
        }
    };
    Ok(Accessor {
        buffer_view: take_usize(object, "bufferView", what)?,
        byte_offset: take_usize(object, "byteOffset", what)?.unwrap_or(0),
        component_type,
        normalized: take_bool(object, "normalized", what)?.unwrap_or(false),
        count: require_usize(object, "count", what)?,
        kind,
    })
}

fn parse_image(object: &Object, what: &str) -> Result<Image, DocumentError> {
    Ok(Image {
        uri: take_string(object, "uri", what)?,
    })
}

fn parse_sampler(object: &Object, what: &str) -> Result<Sampler, DocumentError> {
    let take_enum =
        |key| take_usize(object, key, what).map(|value| value.map(|value| value as u32));
    Ok(Sampler {
        mag_filter: take_enum("magFilter")?,
        min_filter: take_enum("minFilter")?,
        wrap_s: take_enum("wrapS")?,
        wrap_t: take_enum("wrapT")?,
    })
}

fn parse_texture(object: &Object, what: &str) -> Result<Texture, DocumentError> {
    Ok(Texture {
        source: take_usize(object, "source", what)?,
        sampler: take_usize(object, "sampler", what)?,
    })
}

fn parse_material(object: &Object, what: &str) -> Result<Material, DocumentError> {
    let pbr_metallic_roughness = match take_object(object, "pbrMetallicRoughness", what)? {
        Some(pbr) => {
            let what = field_what(what, "pbrMetallicRoughness");
            Some(PbrMetallicRoughness {
                base_color_factor: take_floats(pbr, "baseColorFactor", &what)?.unwrap_or([1.0; 4]),
                base_color_texture: take_texture_info(pbr, "baseColorTexture", &what)?,
                metallic_factor: take_f32(pbr, "metallicFactor", &what)?.unwrap_or(1.0),
                roughness_factor: take_f32(pbr, "roughnessFactor", &what)?.unwrap_or(1.0),
                metallic_roughness_texture: take_texture_info(
                    pbr,
                    "metallicRoughnessTexture",
                    &what,
                )?,
            })
        }
        None => None,
    };
    let specular_glossiness = take_object(object, "extensions", what)?
        .is_some_and(|extensions| extensions.contains_key("KHR_materials_pbrSpecularGlossiness"));
    let alpha_mode = match take_string(object, "alphaMode", what)?.as_deref() {
        None | Some("OPAQUE") => AlphaMode::Opaque,
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        Some(other) => {
            return Err(DocumentError::Unsupported {
                what: field_what(what, "alphaMode"),
                value: other.to_string(),
            })
        }
    };
    Ok(Material {
        name: take_string(object, "name", what)?,
        pbr_metallic_roughness,
        specular_glossiness,
        normal_texture: take_texture_info(object, "normalTexture", what)?,
        occlusion_texture: take_texture_info(object, "occlusionTexture", what)?,
        emissive_texture: take_texture_info(object, "emissiveTexture", what)?,
        emissive_factor: take_floats(object, "emissiveFactor", what)?.unwrap_or([0.0; 3]),
        alpha_mode,
    })
}

fn parse_primitive(object: &Object, what: &str) -> Result<Primitive, DocumentError> {
    let attributes = take_object(object, "attributes", what)?.ok_or_else(|| {
        DocumentError::Missing {
            what: field_what(what, "attributes"),
        }
    })?;
    let attributes_what = field_what(what, "attributes");
    let mut attributes = attributes
        .keys()
        .map(|semantic| Ok((semantic.clone(), require_usize(attributes, semantic, &attributes_what)?)))
        .collect::<Result<Vec<_>, DocumentError>>()?;
    attributes.sort();
    Ok(Primitive {
        attributes,
        indices: take_usize(object, "indices", what)?,
        material: take_usize(object, "material", what)?,
        mode: take_usize(object, "mode", what)?
            .map(|mode| mode as u32)
            .unwrap_or(MODE_TRIANGLES),
    })
}

fn parse_mesh(object: &Object, what: &str) -> Result<Mesh, DocumentError> {
    let primitives = parse_array(object, "primitives", parse_primitive)
        .map_err(|err| prefix_error(err, what))?;
    Ok(Mesh {
        name: take_string(object, "name", what)?,
        primitives,
    })
}

/// Nested arrays are parsed with their own key as context; put the parent's
/// path in front.
fn prefix_error(err: DocumentError, what: &str) -> DocumentError {
    let prefix = |inner: String| format!("{what}.{inner}");
    match err {
        DocumentError::Missing { what: inner } => DocumentError::Missing {
            what: prefix(inner),
        },
        DocumentError::WrongType {
            what: inner,
            expected,
        } => DocumentError::WrongType {
            what: prefix(inner),
            expected,
        },
        DocumentError::Unsupported { what: inner, value } => DocumentError::Unsupported {
            what: prefix(inner),
            value,
        },
        other => other,
    }
}

fn parse_node(object: &Object, what: &str) -> Result<Node, DocumentError> {
    let children = match object.get("children") {
        None => Vec::new(),
        Some(children) => {
            let wrong_type = || DocumentError::WrongType {
                what: field_what(what, "children"),
                expected: "an array of node indices",
            };
            let children = children.get::<Vec<JsonValue>>().ok_or_else(wrong_type)?;
            children
                .iter()
                .map(|child| match child {
                    JsonValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
                    _ => Err(wrong_type()),
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    let transform = match take_floats::<16>(object, "matrix", what)? {
        Some(matrix) => LocalTransform::Matrix(Mat4::from_cols_array(&matrix)),
        None => LocalTransform::Trs {
            translation: take_floats::<3>(object, "translation", what)?.map(Vec3::from),
            rotation: take_floats::<4>(object, "rotation", what)?.map(Quat::from_array),
            scale: take_floats::<3>(object, "scale", what)?.map(Vec3::from),
        },
    };
    Ok(Node {
        name: take_string(object, "name", what)?,
        mesh: take_usize(object, "mesh", what)?,
        children,
        parent: None,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::fixture;

    #[test]
    fn parses_the_fixture_document() {
        let json = fixture::gltf(&[
            ("meshes", fixture::meshes(1).as_str()),
            ("nodes", fixture::mesh_nodes(1).as_str()),
            ("materials", fixture::MATERIALS),
        ]);
        let doc = Document::parse(&json).unwrap();
        assert_eq!(doc.buffers.len(), 1);
        assert_eq!(doc.buffers[0].uri.as_deref(), Some(fixture::BIN_URI));
        assert_eq!(doc.buffer_views.len(), 4);
        assert_eq!(doc.buffer_views[0].kind, BufferViewKind::Vertex);
        assert_eq!(doc.buffer_views[3].kind, BufferViewKind::Index);
        assert_eq!(doc.accessors[0].kind, AccessorType::Vec3);
        assert_eq!(doc.accessors[3].component_type, ComponentType::U16);
        let primitive = &doc.meshes[0].primitives[0];
        let semantics: Vec<_> = primitive.attributes.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(semantics, ["NORMAL", "POSITION", "TEXCOORD_0"]);
        assert_eq!(primitive.indices, Some(3));
        assert_eq!(primitive.mode, MODE_TRIANGLES);
        assert!(doc.materials[0].pbr_metallic_roughness.is_some());
    }

    #[test]
    fn index_views_without_target_are_classified_by_use() {
        let json = r#"{
            "buffers": [{"uri": "a.bin", "byteLength": 16}],
            "bufferViews": [{"buffer": 0, "byteLength": 16}],
            "accessors": [{"bufferView": 0, "componentType": 5123, "count": 3, "type": "SCALAR"}],
            "meshes": [{"primitives": [{"attributes": {}, "indices": 0}]}]
        }"#;
        let doc = Document::parse(json).unwrap();
        assert_eq!(doc.buffer_views[0].kind, BufferViewKind::Index);
    }

    #[test]
    fn material_defaults() {
        let json = r#"{"materials": [{"pbrMetallicRoughness": {}}, {}]}"#;
        let doc = Document::parse(json).unwrap();
        let pbr = doc.materials[0].pbr_metallic_roughness.as_ref().unwrap();
        assert_eq!(pbr.base_color_factor, [1.0; 4]);
        assert_eq!(pbr.metallic_factor, 1.0);
        assert_eq!(pbr.roughness_factor, 1.0);
        assert_eq!(doc.materials[0].alpha_mode, AlphaMode::Opaque);
        assert_eq!(doc.materials[1].pbr_metallic_roughness, None);
        assert_eq!(doc.materials[1].emissive_factor, [0.0; 3]);
    }

    #[test]
    fn detects_specular_glossiness_materials() {
        let json = r#"{"materials": [{"extensions": {"KHR_materials_pbrSpecularGlossiness": {}}}]}"#;
        let doc = Document::parse(json).unwrap();
        assert!(doc.materials[0].specular_glossiness);
    }

    #[test]
    fn node_parents_are_derived_from_children() {
        let json = r#"{"nodes": [{"children": [1]}, {"children": [2]}, {"translation": [1, 2, 3]}]}"#;
        let doc = Document::parse(json).unwrap();
        assert_eq!(doc.nodes[0].parent, None);
        assert_eq!(doc.nodes[1].parent, Some(0));
        assert_eq!(doc.nodes[2].parent, Some(1));
        assert_eq!(
            doc.nodes[2].transform.matrix(),
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn rejects_out_of_range_references() {
        let json = r#"{"meshes": [], "nodes": [{"mesh": 0}]}"#;
        assert_eq!(
            Document::parse(json),
            Err(DocumentError::IndexOutOfRange {
                what: "nodes[0].mesh".to_string(),
                index: 0,
                len: 0,
            })
        );
    }

    #[test]
    fn rejects_shared_children_and_cycles() {
        let shared = r#"{"nodes": [{"children": [2]}, {"children": [2]}, {}]}"#;
        assert_eq!(
            Document::parse(shared),
            Err(DocumentError::MultipleParents(2))
        );
        let cycle = r#"{"nodes": [{"children": [1]}, {"children": [0]}]}"#;
        assert!(matches!(
            Document::parse(cycle),
            Err(DocumentError::Cycle(_))
        ));
    }

    #[test]
    fn reports_missing_and_mistyped_fields() {
        let missing = r#"{"buffers": [{"uri": "a.bin"}]}"#;
        assert_eq!(
            Document::parse(missing),
            Err(DocumentError::Missing {
                what: "buffers[0].byteLength".to_string()
            })
        );
        let mistyped = r#"{"meshes": [{"primitives": [{"attributes": {"POSITION": "zero"}}]}]}"#;
        assert_eq!(
            Document::parse(mistyped),
            Err(DocumentError::WrongType {
                what: "meshes[0].primitives[0].attributes.POSITION".to_string(),
                expected: "a non-negative integer",
            })
        );
        assert!(matches!(
            Document::parse("{"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn rejects_integers_beyond_u32() {
        let json = r#"{"bufferViews": [{"buffer": 0, "byteOffset": 1e20, "byteLength": 4}]}"#;
        assert_eq!(
            Document::parse(json),
            Err(DocumentError::WrongType {
                what: "bufferViews[0].byteOffset".to_string(),
                expected: "a non-negative integer",
            })
        );
    }
}
