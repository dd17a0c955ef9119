use std::ffi::c_void;
use std::ptr;

use crate::renderer::gl;

/// A uniform buffer that is filled front to back during a frame and rewound
/// on [`BumpAllocatedBuffer::clear`]. Every allocation starts at a multiple
/// of the driver's uniform buffer offset alignment.
pub struct BumpAllocatedBuffer {
    buffer: gl::types::GLuint,
    alignment: usize,
    offset: usize,
    size: usize,
    data: Vec<u8>,
}

impl BumpAllocatedBuffer {
    pub fn new() -> BumpAllocatedBuffer {
        let mut buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut buffer));
        let mut alignment = 0;
        gl::call!(gl::GetIntegerv(
            gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT,
            &mut alignment
        ));
        BumpAllocatedBuffer {
            buffer,
            alignment: alignment.max(1) as usize,
            offset: 0,
            size: 0,
            data: Vec::new(),
        }
    }

    /// Writes the given bytes to the buffer, and returns the buffer and the
    /// offset where the data has been written to.
    pub fn allocate_buffer(&mut self, bytes: &[u8]) -> (gl::types::GLuint, usize) {
        let start = self.offset.next_multiple_of(self.alignment);
        let end = start + bytes.len();
        self.data.resize(start, 0);
        self.data.extend_from_slice(bytes);
        gl::call!(gl::BindBuffer(gl::UNIFORM_BUFFER, self.buffer));
        if end > self.size {
            // Grow, then upload everything written so far this frame, which
            // includes the new bytes.
            self.size = (end * 2).max(4096);
            gl::call!(gl::BufferData(
                gl::UNIFORM_BUFFER,
                self.size as isize,
                ptr::null(),
                gl::DYNAMIC_DRAW
            ));
            gl::call!(gl::BufferSubData(
                gl::UNIFORM_BUFFER,
                0,
                self.data.len() as isize,
                self.data.as_ptr() as *const c_void,
            ));
        } else {
            gl::call!(gl::BufferSubData(
                gl::UNIFORM_BUFFER,
                start as isize,
                bytes.len() as isize,
                bytes.as_ptr() as *const c_void,
            ));
        }
        self.offset = end;
        (self.buffer, start)
    }

    pub fn clear(&mut self) {
        self.offset = 0;
        self.data.clear();
    }
}

impl Drop for BumpAllocatedBuffer {
    fn drop(&mut self) {
        gl::call!(gl::DeleteBuffers(1, &self.buffer));
    }
}
