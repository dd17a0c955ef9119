use crate::renderer::{texture_slot, MetallicParams, MAX_TEXTURE_BINDINGS};

/// Image slots used by a metallic-roughness material, as indices into
/// [`Scene::images`](super::Scene::images).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetallicImages {
    pub base_color: Option<usize>,
    pub metallic_roughness: Option<usize>,
    pub normal: Option<usize>,
    pub occlusion: Option<usize>,
    pub emissive: Option<usize>,
}

impl MetallicImages {
    /// The image slots in shader texture bind slot order.
    pub fn by_texture_slot(&self) -> [Option<usize>; MAX_TEXTURE_BINDINGS] {
        let mut slots = [None; MAX_TEXTURE_BINDINGS];
        slots[texture_slot::BASE_COLOR] = self.base_color;
        slots[texture_slot::METALLIC_ROUGHNESS] = self.metallic_roughness;
        slots[texture_slot::NORMAL] = self.normal;
        slots[texture_slot::OCCLUSION] = self.occlusion;
        slots[texture_slot::EMISSIVE] = self.emissive;
        slots
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetallicMaterial {
    pub params: MetallicParams,
    pub images: MetallicImages,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    Metallic(MetallicMaterial),
    /// Specular-glossiness materials are recognized, but there's no shader
    /// for them, so primitives using one are not drawn.
    Specular,
}
