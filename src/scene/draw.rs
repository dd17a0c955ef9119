use glam::{Mat4, Vec3};

use crate::renderer::{
    texture_slot, Bindings, Filter, Gfx, ImageDesc, ImageId, LightParams, MipmapFilter,
    PassAction, SamplerDesc, SamplerId, UniformSlot, ViewId, VsParams, Wrap,
};
use crate::scene::{Material, MetallicImages, MetallicMaterial, Primitive, Scene};

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.569, 0.918, 1.0];
pub const CLEAR_COLOR_FAILED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

const PLACEHOLDER_SIZE: u32 = 8;

/// Textures bound in place of material textures that are missing or still
/// loading.
pub struct Placeholders {
    images: [ImageId; 3],
    white: ViewId,
    black: ViewId,
    normal: ViewId,
    sampler: SamplerId,
}

impl Placeholders {
    pub fn new(gfx: &mut dyn Gfx) -> Placeholders {
        let mut make = |rgba: [u8; 4]| {
            let pixels = rgba.repeat((PLACEHOLDER_SIZE * PLACEHOLDER_SIZE) as usize);
            let image = gfx.make_image(&ImageDesc {
                width: PLACEHOLDER_SIZE,
                height: PLACEHOLDER_SIZE,
                pixels: &pixels,
                mipmaps: false,
            });
            (image, gfx.make_view(image))
        };
        let (white_image, white) = make([0xFF, 0xFF, 0xFF, 0xFF]);
        let (black_image, black) = make([0, 0, 0, 0xFF]);
        let (normal_image, normal) = make([0x80, 0x80, 0xFF, 0xFF]);
        let sampler = gfx.make_sampler(&SamplerDesc {
            min_filter: Filter::Nearest,
            mag_filter: Filter::Nearest,
            mipmap_filter: MipmapFilter::None,
            wrap_u: Wrap::Repeat,
            wrap_v: Wrap::Repeat,
        });
        Placeholders {
            images: [white_image, black_image, normal_image],
            white,
            black,
            normal,
            sampler,
        }
    }

    /// The placeholder for a texture bind slot: a flat normal for normal
    /// maps, black for emission, white for the rest.
    fn view(&self, slot: usize) -> ViewId {
        match slot {
            texture_slot::NORMAL => self.normal,
            texture_slot::EMISSIVE => self.black,
            _ => self.white,
        }
    }

    pub fn destroy(self, gfx: &mut dyn Gfx) {
        gfx.destroy_sampler(self.sampler);
        for view in [self.white, self.black, self.normal] {
            gfx.destroy_view(view);
        }
        for image in self.images {
            gfx.destroy_image(image);
        }
    }
}

pub struct FrameParams<'a> {
    /// Applied on top of every node's world transform.
    pub root_transform: Mat4,
    pub view_proj: Mat4,
    pub eye_pos: Vec3,
    pub light: LightParams,
    pub placeholders: &'a Placeholders,
}

/// Records one render pass drawing every node of the scene, and returns the
/// number of draw calls made. A failed scene is only cleared to red.
pub fn draw_scene(scene: &Scene, gfx: &mut dyn Gfx, frame: &FrameParams) -> usize {
    if scene.is_failed() {
        gfx.begin_pass(&PassAction {
            clear_color: CLEAR_COLOR_FAILED,
        });
        gfx.end_pass();
        return 0;
    }

    gfx.begin_pass(&PassAction {
        clear_color: CLEAR_COLOR,
    });
    let mut draws = 0;
    for node in &scene.nodes {
        let vs_params = VsParams {
            model: frame.root_transform * node.transform,
            view_proj: frame.view_proj,
            eye_pos: frame.eye_pos,
            _pad: 0.0,
        };
        let mesh = scene.meshes[node.mesh];
        for primitive in &scene.primitives[mesh.primitives()] {
            let material = match primitive.material.map(|index| &scene.materials[index]) {
                Some(Material::Specular) => continue,
                Some(Material::Metallic(material)) => *material,
                None => MetallicMaterial::default(),
            };
            // Buffers that haven't finished loading yet.
            let Some(bindings) =
                primitive_bindings(scene, primitive, &material.images, frame.placeholders)
            else {
                continue;
            };
            let Some(pipeline) = scene.pipelines.pipeline(primitive.pipeline) else {
                continue;
            };
            gfx.apply_pipeline(pipeline);
            gfx.apply_bindings(&bindings);
            gfx.apply_uniforms(UniformSlot::VsParams, bytemuck::bytes_of(&vs_params));
            gfx.apply_uniforms(UniformSlot::LightParams, bytemuck::bytes_of(&frame.light));
            gfx.apply_uniforms(
                UniformSlot::MetallicParams,
                bytemuck::bytes_of(&material.params),
            );
            gfx.draw(primitive.base_element, primitive.num_elements, 1);
            draws += 1;
        }
    }
    gfx.end_pass();
    draws
}

fn primitive_bindings(
    scene: &Scene,
    primitive: &Primitive,
    images: &MetallicImages,
    placeholders: &Placeholders,
) -> Option<Bindings> {
    let mut bindings = Bindings::default();
    for (slot, buffer) in primitive.vertex_buffers.iter().enumerate() {
        if let Some(buffer) = buffer {
            let buffer = &scene.buffers[*buffer];
            if !buffer.loaded {
                return None;
            }
            bindings.vertex_buffers[slot] = Some(buffer.handle);
        }
    }
    if let Some(buffer) = primitive.index_buffer {
        let buffer = &scene.buffers[buffer];
        if !buffer.loaded {
            return None;
        }
        bindings.index_buffer = Some(buffer.handle);
    }
    for (slot, image) in images.by_texture_slot().into_iter().enumerate() {
        let loaded = image
            .and_then(|image| scene.images.get(image))
            .and_then(|image| image.resource);
        let (view, sampler) = match loaded {
            Some(resource) => (resource.view, resource.sampler),
            None => (placeholders.view(slot), placeholders.sampler),
        };
        bindings.views[slot] = Some(view);
        bindings.samplers[slot] = Some(sampler);
    }
    Some(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::{Command, RecordingGfx};
    use crate::scene::document::Document;
    use crate::scene::{fixture, translate, LoadError, SceneLimits};

    const LIGHT: LightParams = LightParams {
        light_pos: Vec3::new(10.0, 10.0, 10.0),
        light_range: 200.0,
        light_color: Vec3::new(1.0, 1.5, 2.0),
        light_intensity: 700.0,
    };

    fn scene_from(json: &str, gfx: &mut RecordingGfx) -> Scene {
        let mut scene = Scene::new(SceneLimits::default());
        let doc = Document::parse(json).unwrap();
        translate(&doc, &mut scene, gfx).unwrap();
        scene
    }

    fn frame(placeholders: &Placeholders) -> FrameParams {
        FrameParams {
            root_transform: Mat4::from_rotation_y(1.0),
            view_proj: Mat4::IDENTITY,
            eye_pos: Vec3::new(0.0, 0.0, 2.5),
            light: LIGHT,
            placeholders,
        }
    }

    #[test]
    fn failed_scene_only_clears() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        let (meshes, nodes) = (fixture::meshes(1), fixture::mesh_nodes(1));
        let json = fixture::gltf(&[("meshes", meshes.as_str()), ("nodes", nodes.as_str())]);
        let mut scene = scene_from(&json, &mut gfx);
        scene
            .init_buffers_from_source(&mut gfx, 0, &fixture::bin())
            .unwrap();
        scene.fail(&LoadError::MissingBufferView(0));

        let draws = draw_scene(&scene, &mut gfx, &frame(&placeholders));
        assert_eq!(draws, 0);
        assert_eq!(
            gfx.commands,
            [
                Command::BeginPass(PassAction {
                    clear_color: CLEAR_COLOR_FAILED
                }),
                Command::EndPass
            ]
        );
    }

    #[test]
    fn primitives_wait_for_their_buffers() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        let (meshes, nodes) = (fixture::meshes(2), fixture::mesh_nodes(2));
        let json = fixture::gltf(&[("meshes", meshes.as_str()), ("nodes", nodes.as_str())]);
        let mut scene = scene_from(&json, &mut gfx);

        assert_eq!(draw_scene(&scene, &mut gfx, &frame(&placeholders)), 0);
        assert_eq!(
            gfx.commands[0],
            Command::BeginPass(PassAction {
                clear_color: CLEAR_COLOR
            })
        );

        scene
            .init_buffers_from_source(&mut gfx, 0, &fixture::bin())
            .unwrap();
        gfx.clear_commands();
        assert_eq!(draw_scene(&scene, &mut gfx, &frame(&placeholders)), 2);
        assert_eq!(gfx.draws(), 2);
        assert!(gfx.commands.contains(&Command::Draw {
            base_element: 0,
            num_elements: 3,
            num_instances: 1,
        }));
        let bindings = gfx.bindings()[0];
        assert_eq!(bindings.index_buffer, Some(scene.buffers[3].handle));
        assert_eq!(bindings.vertex_buffers[1], Some(scene.buffers[0].handle));
    }

    #[test]
    fn missing_textures_use_placeholders() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        let mut sections = fixture::TEXTURED_SECTIONS.to_vec();
        let (meshes, nodes) = (fixture::meshes(1), fixture::mesh_nodes(1));
        sections.extend([("meshes", meshes.as_str()), ("nodes", nodes.as_str())]);
        let mut scene = scene_from(&fixture::gltf(&sections), &mut gfx);
        scene
            .init_buffers_from_source(&mut gfx, 0, &fixture::bin())
            .unwrap();

        draw_scene(&scene, &mut gfx, &frame(&placeholders));
        let bindings = gfx.bindings()[0];
        assert_eq!(bindings.views[texture_slot::BASE_COLOR], Some(placeholders.white));
        assert_eq!(bindings.views[texture_slot::METALLIC_ROUGHNESS], Some(placeholders.white));
        assert_eq!(bindings.views[texture_slot::NORMAL], Some(placeholders.normal));
        assert_eq!(bindings.views[texture_slot::OCCLUSION], Some(placeholders.white));
        assert_eq!(bindings.views[texture_slot::EMISSIVE], Some(placeholders.black));
        assert!(bindings
            .samplers
            .iter()
            .all(|&sampler| sampler == Some(placeholders.sampler)));

        scene
            .init_images_from_source(&mut gfx, 0, &fixture::png(2, [255, 0, 0, 255]))
            .unwrap();
        gfx.clear_commands();
        draw_scene(&scene, &mut gfx, &frame(&placeholders));
        let loaded = scene.images[0].resource.unwrap();
        let bindings = gfx.bindings()[0];
        assert_eq!(bindings.views[texture_slot::BASE_COLOR], Some(loaded.view));
        assert_eq!(bindings.samplers[texture_slot::BASE_COLOR], Some(loaded.sampler));
        assert_eq!(bindings.views[texture_slot::NORMAL], Some(placeholders.normal));
    }

    #[test]
    fn uniforms_carry_node_and_material_params() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        let nodes = r#"[{"mesh": 0, "translation": [0, 3, 0]}]"#;
        let json = fixture::gltf(&[("meshes", fixture::meshes(1).as_str()), ("nodes", nodes)]);
        let mut scene = scene_from(&json, &mut gfx);
        scene
            .init_buffers_from_source(&mut gfx, 0, &fixture::bin())
            .unwrap();

        let params = frame(&placeholders);
        draw_scene(&scene, &mut gfx, &params);
        let uniforms: Vec<_> = gfx
            .commands
            .iter()
            .filter_map(|command| match command {
                Command::ApplyUniforms(slot, data) => Some((*slot, data.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            uniforms.iter().map(|(slot, _)| *slot).collect::<Vec<_>>(),
            UniformSlot::ALL
        );
        let vs_params: VsParams = bytemuck::pod_read_unaligned(&uniforms[0].1);
        let expected = params.root_transform * Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        assert!(vs_params.model.abs_diff_eq(expected, 1e-6));
        assert_eq!(vs_params.eye_pos, params.eye_pos);
        let light: LightParams = bytemuck::pod_read_unaligned(&uniforms[1].1);
        assert_eq!(light, LIGHT);
        let Material::Metallic(material) = scene.materials[0] else {
            panic!("expected a metallic material");
        };
        let metallic: crate::renderer::MetallicParams =
            bytemuck::pod_read_unaligned(&uniforms[2].1);
        assert_eq!(metallic, material.params);
    }

    #[test]
    fn specular_primitives_are_skipped() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        let json = fixture::gltf(&[
            ("meshes", fixture::meshes(1).as_str()),
            ("nodes", fixture::mesh_nodes(1).as_str()),
            (
                "materials",
                r#"[{"extensions": {"KHR_materials_pbrSpecularGlossiness": {}}}]"#,
            ),
        ]);
        let mut scene = scene_from(&json, &mut gfx);
        scene
            .init_buffers_from_source(&mut gfx, 0, &fixture::bin())
            .unwrap();
        assert_eq!(draw_scene(&scene, &mut gfx, &frame(&placeholders)), 0);
    }

    #[test]
    fn placeholders_are_released() {
        let mut gfx = RecordingGfx::new();
        let placeholders = Placeholders::new(&mut gfx);
        assert_eq!(gfx.images.len(), 3);
        assert!(gfx
            .images
            .iter()
            .all(|&(_, width, height, mipmaps)| (width, height) == (8, 8) && !mipmaps));
        assert_eq!(gfx.samplers[0].1.min_filter, Filter::Nearest);
        placeholders.destroy(&mut gfx);
        assert_eq!(gfx.live_objects, 0);
    }
}
