//! The GPU seam: a small, handle-based graphics API modelled on immediate
//! "make object, bind, draw" libraries, plus its OpenGL ES 3.0 implementation.
//!
//! Everything above this module (scene loading, frame rendering) talks to the
//! GPU exclusively through [`Gfx`], so it can run against
//! [`gles::GlesRenderer`] in the application and against a recording backend
//! in tests.

mod bumpalloc_buffer;
mod gl;
pub mod gles;
pub mod program;
#[cfg(test)]
pub mod recording;

pub use program::{LightParams, MetallicParams, VsParams};

/// Maximum number of vertex buffers that can be bound for one draw.
pub const MAX_VERTEX_BUFFERS: usize = 8;
/// Maximum number of vertex attributes a pipeline's layout can describe.
pub const MAX_VERTEX_ATTRIBUTES: usize = 8;
/// Number of texture (view + sampler) bind slots used by the PBR shader.
pub const MAX_TEXTURE_BINDINGS: usize = 5;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// A GPU buffer, possibly only allocated and not initialized yet.
    BufferId
);
handle!(
    /// A 2D RGBA8 texture.
    ImageId
);
handle!(
    /// A sampleable view of an [`ImageId`].
    ViewId
);
handle!(
    /// Texture filtering and addressing state.
    SamplerId
);
handle!(
    /// An immutable bundle of shader, vertex layout and fixed-function state.
    PipelineId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Byte4,
    Byte4N,
    UByte4,
    UByte4N,
    Short2,
    Short2N,
    Short4,
    Short4N,
}

impl VertexFormat {
    /// Size of one element in bytes.
    pub fn byte_size(self) -> usize {
        match self {
            VertexFormat::Float => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::Byte4
            | VertexFormat::Byte4N
            | VertexFormat::UByte4
            | VertexFormat::UByte4N
            | VertexFormat::Short2
            | VertexFormat::Short2N => 4,
            VertexFormat::Short4 | VertexFormat::Short4N => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub stride: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Vertex buffer bind slot this attribute reads from.
    pub buffer_index: usize,
    /// Byte offset of the attribute inside each vertex of that buffer.
    pub offset: usize,
    pub format: VertexFormat,
}

/// Describes how vertex buffer bind slots map to shader attribute locations.
/// Attribute `i` feeds shader input location `i`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub buffers: [VertexBufferLayout; MAX_VERTEX_BUFFERS],
    pub attrs: [Option<VertexAttribute>; MAX_VERTEX_ATTRIBUTES],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexType {
    #[default]
    None,
    Uint16,
    Uint32,
}

impl IndexType {
    pub fn byte_size(self) -> usize {
        match self {
            IndexType::None => 0,
            IndexType::Uint16 => 2,
            IndexType::Uint32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipmapFilter {
    None,
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_filter: MipmapFilter,
    pub wrap_u: Wrap,
    pub wrap_v: Wrap,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        SamplerDesc {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_filter: MipmapFilter::Linear,
            wrap_u: Wrap::Repeat,
            wrap_v: Wrap::Repeat,
        }
    }
}

/// An RGBA8 image, `pixels.len() == width * height * 4`.
pub struct ImageDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
    /// Build the mip chain after upload, for samplers that filter between
    /// mip levels.
    pub mipmaps: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineDesc {
    pub layout: VertexLayout,
    pub primitive_type: PrimitiveType,
    pub index_type: IndexType,
    pub cull_back_faces: bool,
    pub depth_write: bool,
    pub alpha_blend: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassAction {
    pub clear_color: [f32; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    pub vertex_buffers: [Option<BufferId>; MAX_VERTEX_BUFFERS],
    pub index_buffer: Option<BufferId>,
    pub views: [Option<ViewId>; MAX_TEXTURE_BINDINGS],
    pub samplers: [Option<SamplerId>; MAX_TEXTURE_BINDINGS],
}

/// Uniform blocks of the PBR shader, see [`program`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformSlot {
    VsParams,
    LightParams,
    MetallicParams,
}

impl UniformSlot {
    pub const ALL: [UniformSlot; 3] = [
        UniformSlot::VsParams,
        UniformSlot::LightParams,
        UniformSlot::MetallicParams,
    ];

    /// The uniform buffer binding point of the block.
    pub fn binding(self) -> u32 {
        match self {
            UniformSlot::VsParams => 0,
            UniformSlot::LightParams => 1,
            UniformSlot::MetallicParams => 2,
        }
    }
}

/// Texture bind slots of the metallic-roughness shader.
pub mod texture_slot {
    pub const BASE_COLOR: usize = 0;
    pub const METALLIC_ROUGHNESS: usize = 1;
    pub const NORMAL: usize = 2;
    pub const OCCLUSION: usize = 3;
    pub const EMISSIVE: usize = 4;
}

/// A graphics device. All calls are made from the render thread.
///
/// Buffers are created in two steps, [`Gfx::alloc_buffer`] and
/// [`Gfx::init_buffer`], so a handle can be recorded in the scene before its
/// contents have been loaded.
pub trait Gfx {
    fn alloc_buffer(&mut self) -> BufferId;
    fn init_buffer(&mut self, buffer: BufferId, usage: BufferUsage, data: &[u8]);
    fn make_image(&mut self, desc: &ImageDesc) -> ImageId;
    fn make_view(&mut self, image: ImageId) -> ViewId;
    fn make_sampler(&mut self, desc: &SamplerDesc) -> SamplerId;
    fn make_pipeline(&mut self, desc: &PipelineDesc) -> PipelineId;

    fn begin_pass(&mut self, action: &PassAction);
    fn apply_pipeline(&mut self, pipeline: PipelineId);
    fn apply_bindings(&mut self, bindings: &Bindings);
    fn apply_uniforms(&mut self, slot: UniformSlot, data: &[u8]);
    fn draw(&mut self, base_element: usize, num_elements: usize, num_instances: usize);
    fn end_pass(&mut self);
    fn commit(&mut self);

    fn destroy_buffer(&mut self, buffer: BufferId);
    fn destroy_image(&mut self, image: ImageId);
    fn destroy_view(&mut self, view: ViewId);
    fn destroy_sampler(&mut self, sampler: SamplerId);
    fn destroy_pipeline(&mut self, pipeline: PipelineId);
}
