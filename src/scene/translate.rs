use glam::{Mat4, Vec3, Vec4};
use log::{debug, warn};

use crate::renderer::program::{ATTR_LOC_NORMAL, ATTR_LOC_POSITION, ATTR_LOC_TEXCOORD_0};
use crate::renderer::{
    BufferUsage, Filter, Gfx, IndexType, MetallicParams, MipmapFilter, PrimitiveType,
    SamplerDesc, VertexAttribute, VertexFormat, VertexLayout, Wrap, MAX_VERTEX_BUFFERS,
};
use crate::scene::document::{
    self, AccessorType, AlphaMode, BufferViewKind, ComponentType, Document,
};
use crate::scene::pipeline_cache::PipelineKey;
use crate::scene::{
    check_capacity, BufferSlot, EntityKind, ImageSlot, LoadError, Material, Mesh,
    MetallicImages, MetallicMaterial, Node, Primitive, Scene,
};

/// A file that has to be fetched before part of the scene can be drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLoad {
    /// The contents of glTF buffer `index`.
    Buffer { index: usize, uri: String },
    /// The encoded pixels of glTF image `index`.
    Image { index: usize, uri: String },
}

impl SourceLoad {
    pub fn uri(&self) -> &str {
        match self {
            SourceLoad::Buffer { uri, .. } | SourceLoad::Image { uri, .. } => uri,
        }
    }
}

/// Fills the empty `scene` from `doc`, allocating GPU buffers and pipelines
/// on the way, and returns the files that still need to be loaded.
///
/// Buffers, images, materials, meshes and nodes are translated in that
/// order. If one of them does not fit in the scene's limits, the error is
/// returned right away and the later ones are left empty.
pub fn translate(
    doc: &Document,
    scene: &mut Scene,
    gfx: &mut dyn Gfx,
) -> Result<Vec<SourceLoad>, LoadError> {
    let mut loads = Vec::new();
    translate_buffers(doc, scene, gfx, &mut loads)?;
    translate_images(doc, scene, &mut loads)?;
    translate_materials(doc, scene)?;
    translate_meshes(doc, scene, gfx)?;
    translate_nodes(doc, scene)?;
    debug!(
        "Translated {} buffers, {} images, {} materials, {} meshes, {} nodes",
        scene.buffers.len(),
        scene.images.len(),
        scene.materials.len(),
        scene.meshes.len(),
        scene.nodes.len(),
    );
    Ok(loads)
}

fn external_uri(uri: Option<&str>, what: impl FnOnce() -> String) -> Result<String, LoadError> {
    match uri {
        Some(uri) if !uri.starts_with("data:") => Ok(uri.to_string()),
        _ => Err(LoadError::EmbeddedData(what())),
    }
}

/// One buffer slot per buffer view.
fn translate_buffers(
    doc: &Document,
    scene: &mut Scene,
    gfx: &mut dyn Gfx,
    loads: &mut Vec<SourceLoad>,
) -> Result<(), LoadError> {
    check_capacity(EntityKind::Buffers, doc.buffer_views.len(), scene.limits.buffers)?;
    for view in &doc.buffer_views {
        scene.buffers.push(BufferSlot {
            usage: match view.kind {
                BufferViewKind::Vertex => BufferUsage::Vertex,
                BufferViewKind::Index => BufferUsage::Index,
            },
            offset: view.byte_offset,
            size: view.byte_length,
            source: view.buffer,
            handle: gfx.alloc_buffer(),
            loaded: false,
        });
    }
    for (index, buffer) in doc.buffers.iter().enumerate() {
        if doc.buffer_views.iter().any(|view| view.buffer == index) {
            let uri = external_uri(buffer.uri.as_deref(), || format!("buffers[{index}]"))?;
            loads.push(SourceLoad::Buffer { index, uri });
        }
    }
    Ok(())
}

/// One image slot per texture.
fn translate_images(
    doc: &Document,
    scene: &mut Scene,
    loads: &mut Vec<SourceLoad>,
) -> Result<(), LoadError> {
    check_capacity(EntityKind::Images, doc.textures.len(), scene.limits.images)?;
    for texture in &doc.textures {
        let sampler = match texture.sampler {
            Some(sampler) => sampler_desc(&doc.samplers[sampler]),
            None => SamplerDesc::default(),
        };
        scene.images.push(ImageSlot {
            source: texture.source,
            sampler,
            resource: None,
        });
        let Some(index) = texture.source else {
            continue;
        };
        let already_loading = loads
            .iter()
            .any(|load| matches!(load, SourceLoad::Image { index: i, .. } if *i == index));
        if !already_loading {
            let uri = external_uri(doc.images[index].uri.as_deref(), || format!("images[{index}]"))?;
            loads.push(SourceLoad::Image { index, uri });
        }
    }
    Ok(())
}

const FILTER_NEAREST: u32 = 9728;
const FILTER_LINEAR: u32 = 9729;
const FILTER_NEAREST_MIPMAP_NEAREST: u32 = 9984;
const FILTER_LINEAR_MIPMAP_NEAREST: u32 = 9985;
const FILTER_NEAREST_MIPMAP_LINEAR: u32 = 9986;
const FILTER_LINEAR_MIPMAP_LINEAR: u32 = 9987;
const WRAP_CLAMP_TO_EDGE: u32 = 33071;
const WRAP_MIRRORED_REPEAT: u32 = 33648;

fn sampler_desc(sampler: &document::Sampler) -> SamplerDesc {
    let filter = |filter| match filter {
        Some(FILTER_NEAREST) => Filter::Nearest,
        _ => Filter::Linear,
    };
    let mipmap_filter = match sampler.min_filter {
        Some(
            FILTER_NEAREST
            | FILTER_LINEAR
            | FILTER_NEAREST_MIPMAP_NEAREST
            | FILTER_LINEAR_MIPMAP_NEAREST,
        ) => MipmapFilter::Nearest,
        Some(FILTER_NEAREST_MIPMAP_LINEAR | FILTER_LINEAR_MIPMAP_LINEAR) => MipmapFilter::Linear,
        _ => MipmapFilter::Linear,
    };
    let wrap = |wrap| match wrap {
        Some(WRAP_CLAMP_TO_EDGE) => Wrap::ClampToEdge,
        Some(WRAP_MIRRORED_REPEAT) => Wrap::MirroredRepeat,
        _ => Wrap::Repeat,
    };
    SamplerDesc {
        min_filter: filter(sampler.min_filter),
        mag_filter: filter(sampler.mag_filter),
        mipmap_filter,
        wrap_u: wrap(sampler.wrap_s),
        wrap_v: wrap(sampler.wrap_t),
    }
}

fn translate_materials(doc: &Document, scene: &mut Scene) -> Result<(), LoadError> {
    check_capacity(EntityKind::Materials, doc.materials.len(), scene.limits.materials)?;
    for (index, material) in doc.materials.iter().enumerate() {
        let pbr = material.pbr_metallic_roughness.as_ref();
        if material.specular_glossiness && pbr.is_none() {
            warn!("Material {index} uses specular-glossiness, primitives using it won't be drawn");
            scene.materials.push(Material::Specular);
            continue;
        }
        let mut params = MetallicParams {
            emissive_factor: Vec3::from(material.emissive_factor),
            ..MetallicParams::default()
        };
        if let Some(pbr) = pbr {
            params.base_color_factor = Vec4::from(pbr.base_color_factor);
            params.metallic_factor = pbr.metallic_factor;
            params.roughness_factor = pbr.roughness_factor;
        }
        // Texture indices double as image slot indices.
        let images = MetallicImages {
            base_color: pbr.and_then(|pbr| pbr.base_color_texture),
            metallic_roughness: pbr.and_then(|pbr| pbr.metallic_roughness_texture),
            normal: material.normal_texture,
            occlusion: material.occlusion_texture,
            emissive: material.emissive_texture,
        };
        scene
            .materials
            .push(Material::Metallic(MetallicMaterial { params, images }));
    }
    Ok(())
}

fn translate_meshes(doc: &Document, scene: &mut Scene, gfx: &mut dyn Gfx) -> Result<(), LoadError> {
    check_capacity(EntityKind::Meshes, doc.meshes.len(), scene.limits.meshes)?;
    for mesh in &doc.meshes {
        let first_primitive = scene.primitives.len();
        check_capacity(
            EntityKind::Primitives,
            first_primitive + mesh.primitives.len(),
            scene.limits.primitives,
        )?;
        for primitive in &mesh.primitives {
            let primitive = translate_primitive(doc, scene, gfx, primitive)?;
            scene.primitives.push(primitive);
        }
        scene.meshes.push(Mesh {
            first_primitive,
            num_primitives: mesh.primitives.len(),
        });
    }
    Ok(())
}

fn attribute_location(semantic: &str) -> Option<usize> {
    match semantic {
        "POSITION" => Some(ATTR_LOC_POSITION),
        "NORMAL" => Some(ATTR_LOC_NORMAL),
        "TEXCOORD_0" => Some(ATTR_LOC_TEXCOORD_0),
        _ => None,
    }
}

fn vertex_format(accessor: &document::Accessor) -> Option<VertexFormat> {
    let normalized = accessor.normalized;
    match (accessor.component_type, accessor.kind) {
        (ComponentType::I8, AccessorType::Vec4) if normalized => Some(VertexFormat::Byte4N),
        (ComponentType::I8, AccessorType::Vec4) => Some(VertexFormat::Byte4),
        (ComponentType::U8, AccessorType::Vec4) if normalized => Some(VertexFormat::UByte4N),
        (ComponentType::U8, AccessorType::Vec4) => Some(VertexFormat::UByte4),
        (ComponentType::I16, AccessorType::Vec2) if normalized => Some(VertexFormat::Short2N),
        (ComponentType::I16, AccessorType::Vec2) => Some(VertexFormat::Short2),
        (ComponentType::I16, AccessorType::Vec4) if normalized => Some(VertexFormat::Short4N),
        (ComponentType::I16, AccessorType::Vec4) => Some(VertexFormat::Short4),
        (ComponentType::F32, AccessorType::Scalar) => Some(VertexFormat::Float),
        (ComponentType::F32, AccessorType::Vec2) => Some(VertexFormat::Float2),
        (ComponentType::F32, AccessorType::Vec3) => Some(VertexFormat::Float3),
        (ComponentType::F32, AccessorType::Vec4) => Some(VertexFormat::Float4),
        _ => None,
    }
}

fn primitive_type(mode: u32) -> PrimitiveType {
    match mode {
        0 => PrimitiveType::Points,
        1 => PrimitiveType::Lines,
        3 => PrimitiveType::LineStrip,
        5 => PrimitiveType::TriangleStrip,
        // Line loops and triangle fans have no equivalent.
        _ => PrimitiveType::Triangles,
    }
}

fn translate_primitive(
    doc: &Document,
    scene: &mut Scene,
    gfx: &mut dyn Gfx,
    primitive: &document::Primitive,
) -> Result<Primitive, LoadError> {
    // Each distinct buffer view gets the next vertex buffer bind slot.
    let mut vertex_buffers = [None; MAX_VERTEX_BUFFERS];
    let mut num_vertex_buffers = 0;
    let mut layout = VertexLayout::default();
    for (semantic, accessor_index) in &primitive.attributes {
        let Some(location) = attribute_location(semantic) else {
            continue;
        };
        let accessor = &doc.accessors[*accessor_index];
        let view = accessor
            .buffer_view
            .ok_or(LoadError::MissingBufferView(*accessor_index))?;
        let format = vertex_format(accessor).ok_or(LoadError::UnsupportedVertexFormat {
            accessor: *accessor_index,
        })?;
        let slot = match vertex_buffers[..num_vertex_buffers]
            .iter()
            .position(|&buffer| buffer == Some(view))
        {
            Some(slot) => slot,
            None => {
                vertex_buffers[num_vertex_buffers] = Some(view);
                num_vertex_buffers += 1;
                num_vertex_buffers - 1
            }
        };
        layout.buffers[slot].stride = doc.buffer_views[view]
            .byte_stride
            .unwrap_or(format.byte_size());
        layout.attrs[location] = Some(VertexAttribute {
            buffer_index: slot,
            offset: accessor.byte_offset,
            format,
        });
    }

    let (index_type, index_buffer, base_element, num_elements) = match primitive.indices {
        Some(accessor_index) => {
            let accessor = &doc.accessors[accessor_index];
            let index_type = match accessor.component_type {
                ComponentType::U16 => IndexType::Uint16,
                ComponentType::U32 => IndexType::Uint32,
                _ => {
                    return Err(LoadError::UnsupportedIndexType {
                        accessor: accessor_index,
                    })
                }
            };
            let view = accessor
                .buffer_view
                .ok_or(LoadError::MissingBufferView(accessor_index))?;
            let base_element = accessor.byte_offset / index_type.byte_size();
            (index_type, Some(view), base_element, accessor.count)
        }
        None => {
            let count_from = primitive
                .attribute("POSITION")
                .or_else(|| primitive.attributes.first().map(|&(_, accessor)| accessor));
            let num_elements = count_from.map_or(0, |accessor| doc.accessors[accessor].count);
            (IndexType::None, None, 0, num_elements)
        }
    };

    let alpha = primitive
        .material
        .is_some_and(|material| doc.materials[material].alpha_mode != AlphaMode::Opaque);
    let key = PipelineKey {
        layout,
        primitive_type: primitive_type(primitive.mode),
        index_type,
        alpha,
    };
    let pipeline = scene.pipelines.get_or_create(gfx, &key)?;

    Ok(Primitive {
        pipeline,
        material: primitive.material,
        vertex_buffers,
        index_buffer,
        base_element,
        num_elements,
    })
}

/// One scene node per glTF node with a mesh, with its world transform baked in.
fn translate_nodes(doc: &Document, scene: &mut Scene) -> Result<(), LoadError> {
    let mesh_nodes = doc.nodes.iter().filter(|node| node.mesh.is_some()).count();
    check_capacity(EntityKind::Nodes, mesh_nodes, scene.limits.nodes)?;
    for (index, node) in doc.nodes.iter().enumerate() {
        if let Some(mesh) = node.mesh {
            scene.nodes.push(Node {
                mesh,
                transform: world_transform(doc, index),
            });
        }
    }
    Ok(())
}

fn world_transform(doc: &Document, node: usize) -> Mat4 {
    let mut transform = doc.nodes[node].transform.matrix();
    let mut parent = doc.nodes[node].parent;
    while let Some(index) = parent {
        transform = doc.nodes[index].transform.matrix() * transform;
        parent = doc.nodes[index].parent;
    }
    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::RecordingGfx;
    use crate::scene::{fixture, SceneLimits};

    fn translate_json(
        json: &str,
        limits: SceneLimits,
    ) -> (Result<Vec<SourceLoad>, LoadError>, Scene, RecordingGfx) {
        let doc = Document::parse(json).unwrap();
        let mut scene = Scene::new(limits);
        let mut gfx = RecordingGfx::new();
        let result = translate(&doc, &mut scene, &mut gfx);
        (result, scene, gfx)
    }

    fn translate_ok(json: &str) -> (Vec<SourceLoad>, Scene, RecordingGfx) {
        let (result, scene, gfx) = translate_json(json, SceneLimits::default());
        (result.unwrap(), scene, gfx)
    }

    #[test]
    fn indexed_primitive() {
        let json = fixture::gltf(&[
            ("meshes", fixture::meshes(1).as_str()),
            ("materials", fixture::MATERIALS),
        ]);
        let (loads, scene, gfx) = translate_ok(&json);
        assert_eq!(
            loads,
            [SourceLoad::Buffer {
                index: 0,
                uri: fixture::BIN_URI.to_string()
            }]
        );
        let primitive = &scene.primitives[0];
        assert_eq!(primitive.index_buffer, Some(3));
        assert_eq!(primitive.base_element, 0);
        assert_eq!(primitive.num_elements, 3);
        assert_eq!(primitive.material, Some(0));
        // Attributes are visited in name order: NORMAL, POSITION, TEXCOORD_0.
        assert_eq!(&primitive.vertex_buffers[..4], &[Some(1), Some(0), Some(2), None]);

        let desc = gfx.pipelines[0].1;
        assert_eq!(desc.index_type, IndexType::Uint16);
        assert_eq!(desc.primitive_type, PrimitiveType::Triangles);
        let position = desc.layout.attrs[ATTR_LOC_POSITION].unwrap();
        assert_eq!(position.buffer_index, 1);
        assert_eq!(position.format, VertexFormat::Float3);
        assert_eq!(desc.layout.buffers[1].stride, 12);
        assert_eq!(desc.layout.buffers[2].stride, 8);
    }

    #[test]
    fn unindexed_primitive_counts_position_elements() {
        let json = fixture::gltf(&[(
            "meshes",
            r#"[{"primitives": [{"attributes": {"NORMAL": 1, "POSITION": 0}}]}]"#,
        )]);
        let (_, scene, gfx) = translate_ok(&json);
        let primitive = &scene.primitives[0];
        assert_eq!(primitive.index_buffer, None);
        assert_eq!(primitive.num_elements, 3);
        assert_eq!(primitive.material, None);
        assert_eq!(gfx.pipelines[0].1.index_type, IndexType::None);
    }

    #[test]
    fn buffer_usage_follows_views() {
        let (_, scene, gfx) = translate_ok(&fixture::gltf(&[]));
        let usages: Vec<_> = scene.buffers.iter().map(|slot| slot.usage).collect();
        assert_eq!(
            usages,
            [
                BufferUsage::Vertex,
                BufferUsage::Vertex,
                BufferUsage::Vertex,
                BufferUsage::Index
            ]
        );
        assert_eq!((scene.buffers[3].offset, scene.buffers[3].size), (96, 6));
        assert!(scene.buffers.iter().all(|slot| !slot.loaded));
        assert_eq!(gfx.live_objects, 4);
    }

    #[test]
    fn equal_primitives_share_pipelines() {
        let lines = format!(
            r#"[{{"primitives": [{0}, {0}]}}, {{"primitives": [{0}]}}, {{"primitives": [{1}]}}, {{"primitives": [{2}]}}]"#,
            fixture::TRIANGLE_PRIMITIVE,
            r#"{"attributes": {"POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2}, "indices": 3, "mode": 1}"#,
            r#"{"attributes": {"POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2}, "indices": 3, "material": 1}"#,
        );
        let json = fixture::gltf(&[
            ("meshes", lines.as_str()),
            ("materials", r#"[{}, {"alphaMode": "BLEND"}]"#),
        ]);
        let (_, scene, gfx) = translate_ok(&json);
        let pipelines: Vec<_> = scene.primitives.iter().map(|p| p.pipeline).collect();
        assert_eq!(pipelines, [0, 0, 0, 1, 2]);
        assert_eq!(gfx.pipelines.len(), 3);
        assert_eq!(gfx.pipelines[1].1.primitive_type, PrimitiveType::Lines);
        assert!(gfx.pipelines[2].1.alpha_blend);
        assert_eq!(
            scene.meshes[..2],
            [
                Mesh {
                    first_primitive: 0,
                    num_primitives: 2
                },
                Mesh {
                    first_primitive: 2,
                    num_primitives: 1
                }
            ]
        );
    }

    #[test]
    fn too_many_meshes_stops_before_nodes() {
        let json = fixture::gltf(&[
            ("meshes", fixture::meshes(17).as_str()),
            ("nodes", fixture::mesh_nodes(17).as_str()),
        ]);
        let (result, scene, _) = translate_json(&json, SceneLimits::default());
        assert!(matches!(
            result,
            Err(LoadError::Capacity {
                kind: EntityKind::Meshes,
                max: 16
            })
        ));
        assert!(scene.meshes.is_empty());
        assert!(scene.nodes.is_empty());
        assert_eq!(scene.buffers.len(), 4);
    }

    #[test]
    fn limits_apply_to_every_kind() {
        let json = fixture::gltf(&[
            ("meshes", fixture::meshes(3).as_str()),
            ("nodes", r#"[{"mesh": 0}, {}, {"mesh": 1}, {"mesh": 2}]"#),
        ]);
        let limits = SceneLimits {
            primitives: 2,
            ..SceneLimits::default()
        };
        let (result, scene, _) = translate_json(&json, limits);
        assert!(matches!(
            result,
            Err(LoadError::Capacity {
                kind: EntityKind::Primitives,
                ..
            })
        ));
        assert_eq!(scene.primitives.len(), 2);

        // Nodes without a mesh don't count.
        let limits = SceneLimits {
            nodes: 3,
            ..SceneLimits::default()
        };
        let (result, scene, _) = translate_json(&json, limits);
        assert!(result.is_ok());
        assert_eq!(scene.nodes.len(), 3);

        let limits = SceneLimits {
            buffers: 3,
            ..SceneLimits::default()
        };
        let (result, scene, gfx) = translate_json(&json, limits);
        assert!(matches!(
            result,
            Err(LoadError::Capacity {
                kind: EntityKind::Buffers,
                ..
            })
        ));
        assert!(scene.buffers.is_empty());
        assert_eq!(gfx.live_objects, 0);
    }

    #[test]
    fn world_transforms_include_parents() {
        let nodes = r#"[
            {"children": [1], "translation": [1, 0, 0]},
            {"mesh": 0, "rotation": [0, 0.70710677, 0, 0.70710677], "children": [2, 3]},
            {"mesh": 0, "translation": [0, 0, 1]},
            {"mesh": 0, "matrix": [2, 0, 0, 0, 0, 2, 0, 0, 0, 0, 2, 0, 0, 2, 0, 1]},
            {"scale": [2, 2, 2]}
        ]"#;
        let json = fixture::gltf(&[("meshes", fixture::meshes(1).as_str()), ("nodes", nodes)]);
        let (_, scene, _) = translate_ok(&json);
        assert_eq!(scene.nodes.len(), 3);

        let parent = scene.nodes[0].transform;
        assert!(parent
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::X, 1e-5));
        // Rotation is applied before translation.
        assert!(parent
            .transform_point3(Vec3::Z)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        let child = scene.nodes[1].transform;
        assert!(child
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        let matrix_child = scene.nodes[2].transform;
        assert!(matrix_child
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
        assert!(matrix_child
            .transform_vector3(Vec3::X)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn unsupported_formats_are_errors() {
        let json = fixture::gltf(&[(
            "meshes",
            r#"[{"primitives": [{"attributes": {"POSITION": 3}}]}]"#,
        )]);
        let (result, _, _) = translate_json(&json, SceneLimits::default());
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedVertexFormat { accessor: 3 })
        ));

        let json = fixture::gltf(&[(
            "meshes",
            r#"[{"primitives": [{"attributes": {"POSITION": 0}, "indices": 0}]}]"#,
        )]);
        let (result, _, _) = translate_json(&json, SceneLimits::default());
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedIndexType { accessor: 0 })
        ));
    }

    fn index_accessor_json(component_type: u32, byte_offset: usize) -> String {
        format!(
            r#"{{"buffers": [{{"uri": "a.bin", "byteLength": 24}}],
            "bufferViews": [{{"buffer": 0, "byteLength": 12}}, {{"buffer": 0, "byteOffset": 12, "byteLength": 12}}],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3"}},
                {{"bufferView": 1, "byteOffset": {byte_offset}, "componentType": {component_type}, "count": 3, "type": "SCALAR"}}
            ],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}]}}"#
        )
    }

    #[test]
    fn index_offset_becomes_base_element() {
        let (_, scene, _) = translate_ok(&index_accessor_json(5123, 4));
        let primitive = &scene.primitives[0];
        assert_eq!(primitive.index_buffer, Some(1));
        assert_eq!(primitive.base_element, 2);
        assert_eq!(primitive.num_elements, 3);

        let (_, scene, _) = translate_ok(&index_accessor_json(5125, 4));
        assert_eq!(scene.primitives[0].base_element, 1);
    }

    #[test]
    fn byte_indices_are_rejected() {
        let json = index_accessor_json(5121, 0);
        let (result, _, gfx) = translate_json(&json, SceneLimits::default());
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedIndexType { accessor: 1 })
        ));
        assert!(gfx.pipelines.is_empty());
    }

    #[test]
    fn embedded_buffers_are_rejected() {
        let json = r#"{
            "buffers": [{"uri": "data:application/octet-stream;base64,AAAA", "byteLength": 3}],
            "bufferViews": [{"buffer": 0, "byteLength": 3}]
        }"#;
        let (result, _, _) = translate_json(json, SceneLimits::default());
        assert!(matches!(result, Err(LoadError::EmbeddedData(what)) if what == "buffers[0]"));
    }

    #[test]
    fn images_are_loaded_once_per_source() {
        let mut sections = fixture::TEXTURED_SECTIONS.to_vec();
        sections[1] = ("textures", r#"[{"source": 0, "sampler": 0}, {"source": 0}, {}]"#);
        let (loads, scene, _) = translate_ok(&fixture::gltf(&sections));
        assert_eq!(
            loads[1..],
            [SourceLoad::Image {
                index: 0,
                uri: "albedo.png".to_string()
            }]
        );
        assert_eq!(scene.images.len(), 3);
        assert_eq!(scene.images[2].source, None);
        assert_eq!(scene.images[1].sampler, SamplerDesc::default());
        assert_eq!(
            scene.images[0].sampler,
            SamplerDesc {
                min_filter: Filter::Linear,
                mag_filter: Filter::Nearest,
                mipmap_filter: MipmapFilter::Linear,
                wrap_u: Wrap::Repeat,
                wrap_v: Wrap::Repeat,
            }
        );
    }

    #[test]
    fn sampler_tables() {
        let sampler = document::Sampler {
            mag_filter: Some(FILTER_LINEAR),
            min_filter: Some(FILTER_NEAREST),
            wrap_s: Some(WRAP_CLAMP_TO_EDGE),
            wrap_t: Some(WRAP_MIRRORED_REPEAT),
        };
        let desc = sampler_desc(&sampler);
        assert_eq!(desc.min_filter, Filter::Nearest);
        assert_eq!(desc.mag_filter, Filter::Linear);
        assert_eq!(desc.mipmap_filter, MipmapFilter::Nearest);
        assert_eq!((desc.wrap_u, desc.wrap_v), (Wrap::ClampToEdge, Wrap::MirroredRepeat));

        let mipmapped = |min_filter| {
            sampler_desc(&document::Sampler {
                min_filter: Some(min_filter),
                ..Default::default()
            })
        };
        assert_eq!(mipmapped(FILTER_LINEAR_MIPMAP_NEAREST).mipmap_filter, MipmapFilter::Nearest);
        assert_eq!(mipmapped(FILTER_LINEAR_MIPMAP_NEAREST).min_filter, Filter::Linear);
        assert_eq!(mipmapped(FILTER_NEAREST_MIPMAP_LINEAR).mipmap_filter, MipmapFilter::Linear);

        assert_eq!(sampler_desc(&document::Sampler::default()), SamplerDesc::default());
    }

    #[test]
    fn materials() {
        let materials = r#"[
            {"pbrMetallicRoughness": {"baseColorFactor": [1, 0.5, 0.25, 1], "metallicFactor": 0.5, "metallicRoughnessTexture": {"index": 1}},
             "normalTexture": {"index": 0}, "emissiveFactor": [1, 1, 0]},
            {"extensions": {"KHR_materials_pbrSpecularGlossiness": {}}}
        ]"#;
        let json = fixture::gltf(&[
            ("materials", materials),
            ("textures", r#"[{}, {}]"#),
        ]);
        let (_, scene, _) = translate_ok(&json);
        let Material::Metallic(metallic) = scene.materials[0] else {
            panic!("expected a metallic material");
        };
        assert_eq!(metallic.params.base_color_factor, Vec4::new(1.0, 0.5, 0.25, 1.0));
        assert_eq!(metallic.params.metallic_factor, 0.5);
        assert_eq!(metallic.params.roughness_factor, 1.0);
        assert_eq!(metallic.params.emissive_factor, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(
            metallic.images,
            MetallicImages {
                metallic_roughness: Some(1),
                normal: Some(0),
                ..MetallicImages::default()
            }
        );
        assert_eq!(scene.materials[1], Material::Specular);
    }
}
