#![allow(
    clippy::all,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code,
    unused_imports
)]

use std::ffi::CString;

use thiserror::Error;

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

/// Calls the given GL function in an `unsafe` block, and in debug builds,
/// panics with the error name and call site if `glGetError` reports anything.
macro_rules! call {
    ($expr:expr) => {{
        #[allow(unused_unsafe)]
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            let error = unsafe { $crate::renderer::gl::GetError() };
            if error != $crate::renderer::gl::NO_ERROR {
                let error_number_stringified;
                let error_name = match error {
                    $crate::renderer::gl::INVALID_ENUM => "INVALID_ENUM",
                    $crate::renderer::gl::INVALID_VALUE => "INVALID_VALUE",
                    $crate::renderer::gl::INVALID_OPERATION => "INVALID_OPERATION",
                    $crate::renderer::gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
                    $crate::renderer::gl::INVALID_FRAMEBUFFER_OPERATION => {
                        "INVALID_FRAMEBUFFER_OPERATION"
                    }
                    _ => {
                        error_number_stringified = format!("{error}");
                        &error_number_stringified
                    }
                };
                panic!(
                    "OpenGL error {error_name} at {}:{}:{}",
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}
pub(crate) use call;

#[derive(Debug, Error)]
pub enum GlError {
    #[error("compiling {stage} shader failed: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("linking shader program failed: {0}")]
    Link(String),
    #[error("shader program has no uniform block named {0:?}")]
    MissingUniformBlock(&'static str),
}

pub fn create_shader(shader_type: types::GLenum, source: &str) -> Result<types::GLuint, GlError> {
    let shader = call!(CreateShader(shader_type));
    let sources = [source.as_bytes().as_ptr() as *const types::GLchar];
    let source_lens = [source.len() as types::GLint];
    call!(ShaderSource(shader, 1, sources.as_ptr(), source_lens.as_ptr()));
    call!(CompileShader(shader));
    let mut compile_status = 0;
    call!(GetShaderiv(shader, COMPILE_STATUS, &mut compile_status));
    if compile_status == FALSE as types::GLint {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetShaderInfoLog(
            shader,
            info_log.len() as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteShader(shader));
        let stage = if shader_type == VERTEX_SHADER {
            "vertex"
        } else {
            "fragment"
        };
        return Err(GlError::Compile {
            stage,
            log: String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned(),
        });
    }
    Ok(shader)
}

pub fn create_program(shaders: &[types::GLuint]) -> Result<types::GLuint, GlError> {
    let program = call!(CreateProgram());
    for &shader in shaders {
        call!(AttachShader(program, shader));
    }
    call!(LinkProgram(program));
    let mut link_status = 0;
    call!(GetProgramiv(program, LINK_STATUS, &mut link_status));
    if link_status == FALSE as types::GLint {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetProgramInfoLog(
            program,
            info_log.len() as types::GLsizei,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteProgram(program));
        return Err(GlError::Link(
            String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned(),
        ));
    }
    Ok(program)
}

pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}

pub fn get_uniform_block_index(program: types::GLuint, name: &str) -> Option<types::GLuint> {
    let name = CString::new(name).ok()?;
    let index = call!(GetUniformBlockIndex(program, name.as_ptr()));
    (index != INVALID_INDEX).then_some(index)
}
