//! Caller-owned dynamic state blocks H-commands dereference at replay time
//! (§3). These are never allocated by this crate; it only reads (and, for
//! `VertexInputBinding`'s VAO cache fields, writes back into) caller memory
//! reached through [`crate::instruction::Instruction`] pointer arguments.
#![allow(non_camel_case_types)]

use super::types::{GLenum, GLuint};

#[repr(C)]
pub struct RuntimeStats {
    pub draw_calls: i32,
    pub effective_draw_calls: i32,
}

#[repr(C)]
pub struct BeginMode {
    pub mode: GLenum,
    pub patch_vertices: i32,
}

pub const GL_PATCHES: GLenum = 0x000E;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct DrawCallInfo {
    pub face_vertex_count: i32,
    pub instance_count: i32,
    pub first_index: i32,
    pub first_instance: i32,
    pub base_vertex: i32,
}

#[repr(C)]
pub struct DrawCallInfoList {
    pub count: i32,
    pub infos: *const DrawCallInfo,
}

#[repr(C)]
pub struct IndirectDrawArgs {
    pub handle: GLuint,
    pub offset: isize,
    pub stride: i32,
    pub count: i32,
}

#[repr(C)]
pub struct DepthTestMode {
    pub comparison: GLenum,
    pub clamp: i32,
}

#[repr(C)]
pub struct DepthBiasInfo {
    pub constant: f32,
    pub slope_scale: f32,
    pub clamp: f32,
}

#[repr(C)]
pub struct BlendMode {
    pub enabled: i32,
    pub src_rgb: GLenum,
    pub dst_rgb: GLenum,
    pub op_rgb: GLenum,
    pub src_a: GLenum,
    pub dst_a: GLenum,
    pub op_a: GLenum,
}

#[repr(C)]
pub struct StencilFace {
    pub func: GLenum,
    pub reference: i32,
    pub mask: GLuint,
    pub sfail: GLenum,
    pub dfail: GLenum,
    pub pass: GLenum,
}

#[repr(C)]
pub struct StencilMode {
    pub enabled: i32,
    pub front: StencilFace,
    pub back: StencilFace,
}

#[repr(C)]
pub struct VertexBufferBinding {
    pub buffer: GLuint,
    pub offset: isize,
    pub stride: i32,
}

#[repr(C)]
pub struct VertexAttribBinding {
    pub location: GLuint,
    pub gl_type: GLenum,
    pub components: i32,
    pub normalized: u8,
    pub integer: u8,
    pub buffer_index: u32,
    pub relative_offset: u32,
    pub divisor: u32,
}

#[repr(C)]
pub struct VertexValueBinding {
    pub location: GLuint,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// The VM mutates `vao_handle`/`vao_context` in place; everything else is
/// read-only from the VM's perspective (§3 lifecycle note).
#[repr(C)]
pub struct VertexInputBinding {
    pub index_buffer: GLuint,
    pub buffer_binding_count: i32,
    pub buffer_bindings: *const VertexBufferBinding,
    pub attrib_binding_count: i32,
    pub attrib_bindings: *const VertexAttribBinding,
    pub value_binding_count: i32,
    pub value_bindings: *const VertexValueBinding,
    pub vao_handle: GLuint,
    pub vao_context: usize,
}
