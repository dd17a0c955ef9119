use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;

use log::warn;

use crate::renderer::bumpalloc_buffer::BumpAllocatedBuffer;
use crate::renderer::gl::{self, GlError};
use crate::renderer::{
    program, Bindings, BufferId, BufferUsage, Filter, Gfx, ImageDesc, ImageId, IndexType,
    MipmapFilter, PassAction, PipelineDesc, PipelineId, PrimitiveType, SamplerDesc, SamplerId,
    UniformSlot, VertexFormat, ViewId, Wrap, MAX_TEXTURE_BINDINGS,
};

struct GlBuffer {
    name: gl::types::GLuint,
    usage: Option<BufferUsage>,
}

/// [`Gfx`] implemented on OpenGL ES 3.0 (and WebGL 2).
///
/// Pipelines are not GL objects: their fixed-function state is applied in
/// [`Gfx::apply_pipeline`], and their vertex layout is combined with the
/// bound buffers in [`Gfx::apply_bindings`] on a single VAO.
pub struct GlesRenderer {
    program: gl::types::GLuint,
    vao: gl::types::GLuint,
    uniforms: BumpAllocatedBuffer,
    next_id: u32,
    buffers: HashMap<u32, GlBuffer>,
    images: HashMap<u32, gl::types::GLuint>,
    views: HashMap<u32, gl::types::GLuint>,
    samplers: HashMap<u32, gl::types::GLuint>,
    pipelines: HashMap<u32, PipelineDesc>,
    current_pipeline: Option<PipelineDesc>,
}

impl GlesRenderer {
    /// Loads the GL entry points with `loader` and sets up the shader program.
    /// A GL context must be current on the calling thread.
    pub fn new<F>(loader: F, width: i32, height: i32) -> Result<GlesRenderer, GlError>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        gl::call!(gl::Viewport(0, 0, width, height));
        let program = program::create_metallic_program()?;
        let mut vao = 0;
        gl::call!(gl::GenVertexArrays(1, &mut vao));
        gl::call!(gl::BindVertexArray(vao));
        Ok(GlesRenderer {
            program,
            vao,
            uniforms: BumpAllocatedBuffer::new(),
            next_id: 1,
            buffers: HashMap::new(),
            images: HashMap::new(),
            views: HashMap::new(),
            samplers: HashMap::new(),
            pipelines: HashMap::new(),
            current_pipeline: None,
        })
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        gl::call!(gl::Viewport(0, 0, width, height));
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn buffer_target(usage: BufferUsage) -> gl::types::GLenum {
    match usage {
        BufferUsage::Vertex => gl::ARRAY_BUFFER,
        BufferUsage::Index => gl::ELEMENT_ARRAY_BUFFER,
    }
}

fn primitive_mode(primitive_type: PrimitiveType) -> gl::types::GLenum {
    match primitive_type {
        PrimitiveType::Points => gl::POINTS,
        PrimitiveType::Lines => gl::LINES,
        PrimitiveType::LineStrip => gl::LINE_STRIP,
        PrimitiveType::Triangles => gl::TRIANGLES,
        PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
    }
}

/// Returns (component count, component type, normalized).
fn vertex_format(format: VertexFormat) -> (gl::types::GLint, gl::types::GLenum, bool) {
    match format {
        VertexFormat::Float => (1, gl::FLOAT, false),
        VertexFormat::Float2 => (2, gl::FLOAT, false),
        VertexFormat::Float3 => (3, gl::FLOAT, false),
        VertexFormat::Float4 => (4, gl::FLOAT, false),
        VertexFormat::Byte4 => (4, gl::BYTE, false),
        VertexFormat::Byte4N => (4, gl::BYTE, true),
        VertexFormat::UByte4 => (4, gl::UNSIGNED_BYTE, false),
        VertexFormat::UByte4N => (4, gl::UNSIGNED_BYTE, true),
        VertexFormat::Short2 => (2, gl::SHORT, false),
        VertexFormat::Short2N => (2, gl::SHORT, true),
        VertexFormat::Short4 => (4, gl::SHORT, false),
        VertexFormat::Short4N => (4, gl::SHORT, true),
    }
}

fn min_filter(filter: Filter, mipmap_filter: MipmapFilter) -> gl::types::GLenum {
    match (filter, mipmap_filter) {
        (Filter::Nearest, MipmapFilter::None) => gl::NEAREST,
        (Filter::Linear, MipmapFilter::None) => gl::LINEAR,
        (Filter::Nearest, MipmapFilter::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
        (Filter::Linear, MipmapFilter::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
        (Filter::Nearest, MipmapFilter::Linear) => gl::NEAREST_MIPMAP_LINEAR,
        (Filter::Linear, MipmapFilter::Linear) => gl::LINEAR_MIPMAP_LINEAR,
    }
}

fn mag_filter(filter: Filter) -> gl::types::GLenum {
    match filter {
        Filter::Nearest => gl::NEAREST,
        Filter::Linear => gl::LINEAR,
    }
}

fn wrap(wrap: Wrap) -> gl::types::GLenum {
    match wrap {
        Wrap::Repeat => gl::REPEAT,
        Wrap::ClampToEdge => gl::CLAMP_TO_EDGE,
        Wrap::MirroredRepeat => gl::MIRRORED_REPEAT,
    }
}

impl Gfx for GlesRenderer {
    fn alloc_buffer(&mut self) -> BufferId {
        let mut name = 0;
        gl::call!(gl::GenBuffers(1, &mut name));
        let id = self.next_id();
        self.buffers.insert(id, GlBuffer { name, usage: None });
        BufferId(id)
    }

    fn init_buffer(&mut self, buffer: BufferId, usage: BufferUsage, data: &[u8]) {
        let Some(gl_buffer) = self.buffers.get_mut(&buffer.0) else {
            warn!("init_buffer: unknown buffer {buffer:?}");
            return;
        };
        gl_buffer.usage = Some(usage);
        let target = buffer_target(usage);
        gl::call!(gl::BindBuffer(target, gl_buffer.name));
        gl::call!(gl::BufferData(
            target,
            data.len() as isize,
            data.as_ptr() as *const c_void,
            gl::STATIC_DRAW,
        ));
        gl::call!(gl::BindBuffer(target, 0));
    }

    fn make_image(&mut self, desc: &ImageDesc) -> ImageId {
        let mut texture = 0;
        gl::call!(gl::GenTextures(1, &mut texture));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture));
        gl::call!(gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA8 as gl::types::GLint,
            desc.width as gl::types::GLsizei,
            desc.height as gl::types::GLsizei,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            desc.pixels.as_ptr() as *const c_void,
        ));
        if desc.mipmaps {
            gl::call!(gl::GenerateMipmap(gl::TEXTURE_2D));
        }
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
        let id = self.next_id();
        self.images.insert(id, texture);
        ImageId(id)
    }

    fn make_view(&mut self, image: ImageId) -> ViewId {
        let texture = self.images.get(&image.0).copied().unwrap_or(0);
        let id = self.next_id();
        self.views.insert(id, texture);
        ViewId(id)
    }

    fn make_sampler(&mut self, desc: &SamplerDesc) -> SamplerId {
        let mut sampler = 0;
        gl::call!(gl::GenSamplers(1, &mut sampler));
        let params = [
            (
                gl::TEXTURE_MIN_FILTER,
                min_filter(desc.min_filter, desc.mipmap_filter),
            ),
            (gl::TEXTURE_MAG_FILTER, mag_filter(desc.mag_filter)),
            (gl::TEXTURE_WRAP_S, wrap(desc.wrap_u)),
            (gl::TEXTURE_WRAP_T, wrap(desc.wrap_v)),
        ];
        for (pname, value) in params {
            gl::call!(gl::SamplerParameteri(
                sampler,
                pname,
                value as gl::types::GLint
            ));
        }
        let id = self.next_id();
        self.samplers.insert(id, sampler);
        SamplerId(id)
    }

    fn make_pipeline(&mut self, desc: &PipelineDesc) -> PipelineId {
        let id = self.next_id();
        self.pipelines.insert(id, *desc);
        PipelineId(id)
    }

    fn begin_pass(&mut self, action: &PassAction) {
        let [r, g, b, a] = action.clear_color;
        gl::call!(gl::ColorMask(gl::TRUE, gl::TRUE, gl::TRUE, gl::TRUE));
        gl::call!(gl::DepthMask(gl::TRUE));
        gl::call!(gl::ClearColor(r, g, b, a));
        gl::call!(gl::ClearDepthf(1.0));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));
        gl::call!(gl::BindVertexArray(self.vao));
        self.current_pipeline = None;
    }

    fn apply_pipeline(&mut self, pipeline: PipelineId) {
        let Some(desc) = self.pipelines.get(&pipeline.0).copied() else {
            self.current_pipeline = None;
            return;
        };
        if desc.cull_back_faces {
            gl::call!(gl::Enable(gl::CULL_FACE));
            gl::call!(gl::CullFace(gl::BACK));
        } else {
            gl::call!(gl::Disable(gl::CULL_FACE));
        }
        gl::call!(gl::FrontFace(gl::CCW));
        gl::call!(gl::Enable(gl::DEPTH_TEST));
        gl::call!(gl::DepthFunc(gl::LEQUAL));
        gl::call!(gl::DepthMask(if desc.depth_write {
            gl::TRUE
        } else {
            gl::FALSE
        }));
        if desc.alpha_blend {
            gl::call!(gl::Enable(gl::BLEND));
            gl::call!(gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA));
            gl::call!(gl::ColorMask(gl::TRUE, gl::TRUE, gl::TRUE, gl::FALSE));
        } else {
            gl::call!(gl::Disable(gl::BLEND));
            gl::call!(gl::ColorMask(gl::TRUE, gl::TRUE, gl::TRUE, gl::TRUE));
        }
        gl::call!(gl::UseProgram(self.program));
        self.current_pipeline = Some(desc);
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        let Some(pipeline) = self.current_pipeline else {
            return;
        };
        for (location, attr) in pipeline.layout.attrs.iter().enumerate() {
            let location = location as gl::types::GLuint;
            let bound = attr.and_then(|attr| {
                let buffer = bindings.vertex_buffers[attr.buffer_index]?;
                let gl_buffer = self.buffers.get(&buffer.0)?;
                (gl_buffer.usage == Some(BufferUsage::Vertex)).then_some((attr, gl_buffer.name))
            });
            let Some((attr, name)) = bound else {
                gl::call!(gl::DisableVertexAttribArray(location));
                continue;
            };
            let (size, type_, normalized) = vertex_format(attr.format);
            let stride = pipeline.layout.buffers[attr.buffer_index].stride;
            gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, name));
            gl::call!(gl::EnableVertexAttribArray(location));
            gl::call!(gl::VertexAttribPointer(
                location,
                size,
                type_,
                if normalized { gl::TRUE } else { gl::FALSE },
                stride as gl::types::GLsizei,
                ptr::null::<c_void>().wrapping_add(attr.offset),
            ));
        }
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, 0));

        let index_buffer = bindings
            .index_buffer
            .and_then(|buffer| self.buffers.get(&buffer.0))
            .filter(|buffer| buffer.usage == Some(BufferUsage::Index))
            .map(|buffer| buffer.name)
            .unwrap_or(0);
        gl::call!(gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer));

        for unit in 0..MAX_TEXTURE_BINDINGS {
            let texture = bindings.views[unit]
                .and_then(|view| self.views.get(&view.0).copied())
                .unwrap_or(0);
            let sampler = bindings.samplers[unit]
                .and_then(|sampler| self.samplers.get(&sampler.0).copied())
                .unwrap_or(0);
            gl::call!(gl::ActiveTexture(gl::TEXTURE0 + unit as gl::types::GLenum));
            gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture));
            gl::call!(gl::BindSampler(unit as gl::types::GLuint, sampler));
        }
    }

    fn apply_uniforms(&mut self, slot: UniformSlot, data: &[u8]) {
        let (buffer, offset) = self.uniforms.allocate_buffer(data);
        gl::call!(gl::BindBufferRange(
            gl::UNIFORM_BUFFER,
            slot.binding(),
            buffer,
            offset as isize,
            data.len() as isize,
        ));
    }

    fn draw(&mut self, base_element: usize, num_elements: usize, num_instances: usize) {
        let Some(pipeline) = self.current_pipeline else {
            return;
        };
        let mode = primitive_mode(pipeline.primitive_type);
        let count = num_elements as gl::types::GLsizei;
        let instances = num_instances as gl::types::GLsizei;
        let index_type = match pipeline.index_type {
            IndexType::None => {
                gl::call!(gl::DrawArraysInstanced(
                    mode,
                    base_element as gl::types::GLint,
                    count,
                    instances
                ));
                return;
            }
            IndexType::Uint16 => gl::UNSIGNED_SHORT,
            IndexType::Uint32 => gl::UNSIGNED_INT,
        };
        let offset = base_element * pipeline.index_type.byte_size();
        gl::call!(gl::DrawElementsInstanced(
            mode,
            count,
            index_type,
            ptr::null::<c_void>().wrapping_add(offset),
            instances,
        ));
    }

    fn end_pass(&mut self) {
        self.current_pipeline = None;
    }

    fn commit(&mut self) {
        self.uniforms.clear();
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(gl_buffer) = self.buffers.remove(&buffer.0) {
            gl::call!(gl::DeleteBuffers(1, &gl_buffer.name));
        }
    }

    fn destroy_image(&mut self, image: ImageId) {
        if let Some(texture) = self.images.remove(&image.0) {
            gl::call!(gl::DeleteTextures(1, &texture));
        }
    }

    fn destroy_view(&mut self, view: ViewId) {
        // Views share their image's texture object.
        self.views.remove(&view.0);
    }

    fn destroy_sampler(&mut self, sampler: SamplerId) {
        if let Some(sampler) = self.samplers.remove(&sampler.0) {
            gl::call!(gl::DeleteSamplers(1, &sampler));
        }
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        self.pipelines.remove(&pipeline.0);
    }
}

impl Drop for GlesRenderer {
    fn drop(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            gl::call!(gl::DeleteBuffers(1, &buffer.name));
        }
        for (_, texture) in self.images.drain() {
            gl::call!(gl::DeleteTextures(1, &texture));
        }
        for (_, sampler) in self.samplers.drain() {
            gl::call!(gl::DeleteSamplers(1, &sampler));
        }
        gl::call!(gl::DeleteVertexArrays(1, &self.vao));
        gl::call!(gl::DeleteProgram(self.program));
    }
}
