//! The scene store: fixed-capacity arrays of GPU-ready objects that refer to
//! each other by index, built from a glTF document by [`translate`] and drawn
//! by [`draw_scene`].

pub mod document;
mod draw;
#[cfg(test)]
pub mod fixture;
mod material;
pub mod pipeline_cache;
mod translate;

use std::fmt;

use glam::Mat4;
use log::error;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::renderer::{
    BufferId, BufferUsage, Gfx, ImageDesc, ImageId, MipmapFilter, SamplerDesc, SamplerId,
    ViewId, MAX_VERTEX_BUFFERS,
};
use document::DocumentError;
use pipeline_cache::PipelineCache;

pub use draw::{draw_scene, FrameParams, Placeholders, CLEAR_COLOR, CLEAR_COLOR_FAILED};
pub use material::{Material, MetallicImages, MetallicMaterial};
pub use translate::{translate, SourceLoad};

/// Maximum number of each kind of object a scene can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneLimits {
    pub buffers: usize,
    pub images: usize,
    pub materials: usize,
    pub pipelines: usize,
    pub primitives: usize,
    pub meshes: usize,
    pub nodes: usize,
}

impl Default for SceneLimits {
    fn default() -> Self {
        SceneLimits {
            buffers: 16,
            images: 16,
            materials: 16,
            pipelines: 16,
            primitives: 16,
            meshes: 16,
            nodes: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Buffers,
    Images,
    Materials,
    Pipelines,
    Primitives,
    Meshes,
    Nodes,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Buffers => "buffers",
            EntityKind::Images => "images",
            EntityKind::Materials => "materials",
            EntityKind::Pipelines => "pipelines",
            EntityKind::Primitives => "primitives",
            EntityKind::Meshes => "meshes",
            EntityKind::Nodes => "nodes",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("the scene can hold at most {max} {kind}")]
    Capacity { kind: EntityKind, max: usize },
    #[error("invalid glTF document: {0}")]
    Document(#[from] DocumentError),
    #[error("accessor {accessor} has a vertex format that can't be used as a vertex attribute")]
    UnsupportedVertexFormat { accessor: usize },
    #[error("accessor {accessor} has an unsupported index type")]
    UnsupportedIndexType { accessor: usize },
    #[error("accessor {0} has no buffer view")]
    MissingBufferView(usize),
    #[error("{0} does not refer to an external file")]
    EmbeddedData(String),
    #[error("buffer view {view} (bytes {offset}..{end}) is outside its {len} byte buffer")]
    BufferRange {
        view: usize,
        offset: usize,
        end: usize,
        len: usize,
    },
    #[error("could not decode image {index}: {source}")]
    Image {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("could not load {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: FetchError,
    },
}

pub(crate) fn check_capacity(kind: EntityKind, count: usize, max: usize) -> Result<(), LoadError> {
    if count > max {
        Err(LoadError::Capacity { kind, max })
    } else {
        Ok(())
    }
}

/// `Loading` moves to `Ready` or `Failed` exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneStatus {
    Loading,
    Ready,
    Failed,
}

/// A range of a glTF buffer that becomes one GPU buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferSlot {
    pub usage: BufferUsage,
    pub offset: usize,
    pub size: usize,
    /// Index of the glTF buffer the bytes come from.
    pub source: usize,
    pub handle: BufferId,
    pub loaded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    pub image: ImageId,
    pub view: ViewId,
    pub sampler: SamplerId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageSlot {
    /// Index of the glTF image with the pixels, if the texture has one.
    pub source: Option<usize>,
    pub sampler: SamplerDesc,
    pub resource: Option<LoadedImage>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    /// Index into [`Scene::pipelines`].
    pub pipeline: usize,
    pub material: Option<usize>,
    /// Buffer slot bound at each vertex buffer bind slot.
    pub vertex_buffers: [Option<usize>; MAX_VERTEX_BUFFERS],
    pub index_buffer: Option<usize>,
    pub base_element: usize,
    pub num_elements: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mesh {
    pub first_primitive: usize,
    pub num_primitives: usize,
}

impl Mesh {
    pub fn primitives(&self) -> std::ops::Range<usize> {
        self.first_primitive..self.first_primitive + self.num_primitives
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub mesh: usize,
    /// World-space transform.
    pub transform: Mat4,
}

pub struct Scene {
    pub limits: SceneLimits,
    status: SceneStatus,
    pub buffers: Vec<BufferSlot>,
    pub images: Vec<ImageSlot>,
    pub pipelines: PipelineCache,
    pub materials: Vec<Material>,
    pub primitives: Vec<Primitive>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
}

impl Scene {
    pub fn new(limits: SceneLimits) -> Scene {
        Scene {
            limits,
            status: SceneStatus::Loading,
            buffers: Vec::new(),
            images: Vec::new(),
            pipelines: PipelineCache::new(limits.pipelines),
            materials: Vec::new(),
            primitives: Vec::new(),
            meshes: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn status(&self) -> SceneStatus {
        self.status
    }

    pub fn is_failed(&self) -> bool {
        self.status == SceneStatus::Failed
    }

    /// Marks a loading scene as failed. Has no effect once the scene has
    /// left the loading state.
    pub fn fail(&mut self, err: &LoadError) {
        if self.status == SceneStatus::Loading {
            error!("Loading the scene failed: {err}");
            self.status = SceneStatus::Failed;
        }
    }

    pub fn mark_ready(&mut self) {
        if self.status == SceneStatus::Loading {
            self.status = SceneStatus::Ready;
        }
    }

    /// Uploads the parts of glTF buffer `source` that the scene's buffer
    /// slots refer to.
    pub fn init_buffers_from_source(
        &mut self,
        gfx: &mut dyn Gfx,
        source: usize,
        bytes: &[u8],
    ) -> Result<(), LoadError> {
        for (view, slot) in self.buffers.iter_mut().enumerate() {
            if slot.source != source {
                continue;
            }
            let end = slot.offset.checked_add(slot.size);
            let data = end
                .and_then(|end| bytes.get(slot.offset..end))
                .ok_or(LoadError::BufferRange {
                    view,
                    offset: slot.offset,
                    end: end.unwrap_or(usize::MAX),
                    len: bytes.len(),
                })?;
            gfx.init_buffer(slot.handle, slot.usage, data);
            slot.loaded = true;
        }
        Ok(())
    }

    /// Decodes glTF image `source` and creates the GPU image, view and sampler
    /// for every image slot that uses it.
    pub fn init_images_from_source(
        &mut self,
        gfx: &mut dyn Gfx,
        source: usize,
        bytes: &[u8],
    ) -> Result<(), LoadError> {
        let pixels = image::load_from_memory(bytes)
            .map_err(|err| LoadError::Image {
                index: source,
                source: err,
            })?
            .into_rgba8();
        for slot in &mut self.images {
            if slot.source != Some(source) || slot.resource.is_some() {
                continue;
            }
            let image = gfx.make_image(&ImageDesc {
                width: pixels.width(),
                height: pixels.height(),
                pixels: pixels.as_raw(),
                mipmaps: slot.sampler.mipmap_filter != MipmapFilter::None,
            });
            slot.resource = Some(LoadedImage {
                image,
                view: gfx.make_view(image),
                sampler: gfx.make_sampler(&slot.sampler),
            });
        }
        Ok(())
    }

    /// Releases every GPU object the scene created.
    pub fn destroy(&mut self, gfx: &mut dyn Gfx) {
        for slot in self.buffers.drain(..) {
            gfx.destroy_buffer(slot.handle);
        }
        for slot in self.images.drain(..) {
            if let Some(resource) = slot.resource {
                gfx.destroy_sampler(resource.sampler);
                gfx.destroy_view(resource.view);
                gfx.destroy_image(resource.image);
            }
        }
        self.pipelines.destroy(gfx);
        self.materials.clear();
        self.primitives.clear();
        self.meshes.clear();
        self.nodes.clear();
    }
}
