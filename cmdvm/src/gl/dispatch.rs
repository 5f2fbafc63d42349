//! GL driver entry point loading (§4.7 for Vulkan's analogue, §6.4 for the
//! loader contract on the GL side, §C9).
//!
//! `vmInit` on the GL side is lazy and idempotent: the first caller to
//! touch the table populates it via the supplied loader; later calls are
//! no-ops. That matches `original_source`'s `vmInit()` guarded by a single
//! `initialized` bool, reimplemented here with `lazy_static` + a `Mutex`
//! because this crate has no single global translation unit to stash a
//! plain bool in safely.

use super::types::*;
use cmdvm_utils::log::error;
use std::ffi::CString;
use std::os::raw::c_void;
use std::sync::Mutex;

pub type BindVertexArrayFn = unsafe extern "system" fn(GLuint);
pub type UseProgramFn = unsafe extern "system" fn(GLuint);
pub type ActiveTextureFn = unsafe extern "system" fn(GLenum);
pub type BindSamplerFn = unsafe extern "system" fn(GLuint, GLuint);
pub type BindTextureFn = unsafe extern "system" fn(GLenum, GLuint);
pub type BindBufferBaseFn = unsafe extern "system" fn(GLenum, GLuint, GLuint);
pub type BindBufferRangeFn = unsafe extern "system" fn(GLenum, GLuint, GLuint, GLintptr, GLsizeiptr);
pub type BindFramebufferFn = unsafe extern "system" fn(GLenum, GLuint);
pub type ViewportFn = unsafe extern "system" fn(GLint, GLint, GLsizei, GLsizei);
pub type EnableFn = unsafe extern "system" fn(GLenum);
pub type DisableFn = unsafe extern "system" fn(GLenum);
pub type DepthFuncFn = unsafe extern "system" fn(GLenum);
pub type CullFaceFn = unsafe extern "system" fn(GLenum);
pub type BlendFuncSeparateFn = unsafe extern "system" fn(GLenum, GLenum, GLenum, GLenum);
pub type BlendEquationSeparateFn = unsafe extern "system" fn(GLenum, GLenum);
pub type BlendColorFn = unsafe extern "system" fn(GLfloat, GLfloat, GLfloat, GLfloat);
pub type PolygonModeFn = unsafe extern "system" fn(GLenum, GLenum);
pub type StencilFuncSeparateFn = unsafe extern "system" fn(GLenum, GLenum, GLint, GLuint);
pub type StencilOpSeparateFn = unsafe extern "system" fn(GLenum, GLenum, GLenum, GLenum);
pub type PatchParameteriFn = unsafe extern "system" fn(GLenum, GLint);
pub type DrawElementsFn = unsafe extern "system" fn(GLenum, GLsizei, GLenum, *const GLvoid);
pub type DrawArraysFn = unsafe extern "system" fn(GLenum, GLint, GLsizei);
pub type DrawElementsInstancedFn =
    unsafe extern "system" fn(GLenum, GLsizei, GLenum, *const GLvoid, GLsizei);
pub type DrawArraysInstancedFn = unsafe extern "system" fn(GLenum, GLint, GLsizei, GLsizei);
pub type ClearFn = unsafe extern "system" fn(GLbitfield);
pub type BindImageTextureFn =
    unsafe extern "system" fn(GLuint, GLuint, GLint, GLboolean, GLint, GLenum, GLenum);
pub type ClearColorFn = unsafe extern "system" fn(GLfloat, GLfloat, GLfloat, GLfloat);
pub type ClearDepthFn = unsafe extern "system" fn(f64);
pub type GetErrorFn = unsafe extern "system" fn() -> GLenum;
pub type BindBufferFn = unsafe extern "system" fn(GLenum, GLuint);
pub type VertexAttribPointerFn =
    unsafe extern "system" fn(GLuint, GLint, GLenum, GLboolean, GLsizei, *const GLvoid);
pub type VertexAttribIPointerFn =
    unsafe extern "system" fn(GLuint, GLint, GLenum, GLsizei, *const GLvoid);
pub type VertexAttribDivisorFn = unsafe extern "system" fn(GLuint, GLuint);
pub type EnableVertexAttribArrayFn = unsafe extern "system" fn(GLuint);
pub type DisableVertexAttribArrayFn = unsafe extern "system" fn(GLuint);
pub type UniformFvFn = unsafe extern "system" fn(GLint, GLsizei, *const GLfloat);
pub type UniformIvFn = unsafe extern "system" fn(GLint, GLsizei, *const GLint);
pub type UniformMatrixFvFn = unsafe extern "system" fn(GLint, GLsizei, GLboolean, *const GLfloat);
pub type TexParameteriFn = unsafe extern "system" fn(GLenum, GLenum, GLint);
pub type TexParameterfFn = unsafe extern "system" fn(GLenum, GLenum, GLfloat);
pub type VertexAttrib1fFn = unsafe extern "system" fn(GLuint, GLfloat);
pub type VertexAttrib2fFn = unsafe extern "system" fn(GLuint, GLfloat, GLfloat);
pub type VertexAttrib3fFn = unsafe extern "system" fn(GLuint, GLfloat, GLfloat, GLfloat);
pub type VertexAttrib4fFn = unsafe extern "system" fn(GLuint, GLfloat, GLfloat, GLfloat, GLfloat);
pub type MultiDrawArraysIndirectFn =
    unsafe extern "system" fn(GLenum, *const GLvoid, GLsizei, GLsizei);
pub type MultiDrawElementsIndirectFn =
    unsafe extern "system" fn(GLenum, GLenum, *const GLvoid, GLsizei, GLsizei);
pub type DrawArraysIndirectFn = unsafe extern "system" fn(GLenum, *const GLvoid);
pub type DrawElementsIndirectFn = unsafe extern "system" fn(GLenum, GLenum, *const GLvoid);
pub type DrawArraysInstancedBaseInstanceFn =
    unsafe extern "system" fn(GLenum, GLint, GLsizei, GLsizei, GLuint);
pub type DrawElementsInstancedBaseVertexBaseInstanceFn =
    unsafe extern "system" fn(GLenum, GLsizei, GLenum, *const GLvoid, GLsizei, GLint, GLuint);
pub type DrawElementsBaseVertexFn =
    unsafe extern "system" fn(GLenum, GLsizei, GLenum, *const GLvoid, GLint);
pub type DepthMaskFn = unsafe extern "system" fn(GLboolean);
pub type ColorMaskiFn = unsafe extern "system" fn(GLuint, GLboolean, GLboolean, GLboolean, GLboolean);
pub type StencilMaskFn = unsafe extern "system" fn(GLuint);
pub type DrawBuffersFn = unsafe extern "system" fn(GLsizei, *const GLenum);
pub type GenVertexArraysFn = unsafe extern "system" fn(GLsizei, *mut GLuint);
pub type DeleteVertexArraysFn = unsafe extern "system" fn(GLsizei, *const GLuint);
pub type PolygonOffsetFn = unsafe extern "system" fn(GLfloat, GLfloat);
pub type PolygonOffsetClampFn = unsafe extern "system" fn(GLfloat, GLfloat, GLfloat);
pub type BindTexturesFn = unsafe extern "system" fn(GLuint, GLsizei, *const GLuint);
pub type BindSamplersFn = unsafe extern "system" fn(GLuint, GLsizei, *const GLuint);

/// Raw function-pointer signature returned by a platform's
/// `get_proc`-style loader (WGL/GLX/EGL/CGL all agree on this shape).
pub type GlGetProcAddress = unsafe extern "C" fn(*const std::os::raw::c_char) -> *mut c_void;

/// The loaded GL entry points this crate calls into. Every field is
/// `Option`: a `None` means the loader could not resolve it, which for
/// optional (extension-gated) entries triggers the fallbacks documented in
/// §4.3/§4.4, and for required entries means the instruction silently
/// no-ops (§7 "Unresolved driver entry").
#[derive(Default)]
pub struct GlFns {
    pub bind_vertex_array: Option<BindVertexArrayFn>,
    pub use_program: Option<UseProgramFn>,
    pub active_texture: Option<ActiveTextureFn>,
    pub bind_sampler: Option<BindSamplerFn>,
    pub bind_texture: Option<BindTextureFn>,
    pub bind_buffer_base: Option<BindBufferBaseFn>,
    pub bind_buffer_range: Option<BindBufferRangeFn>,
    pub bind_framebuffer: Option<BindFramebufferFn>,
    pub viewport: Option<ViewportFn>,
    pub enable: Option<EnableFn>,
    pub disable: Option<DisableFn>,
    pub depth_func: Option<DepthFuncFn>,
    pub cull_face: Option<CullFaceFn>,
    pub blend_func_separate: Option<BlendFuncSeparateFn>,
    pub blend_equation_separate: Option<BlendEquationSeparateFn>,
    pub blend_color: Option<BlendColorFn>,
    pub polygon_mode: Option<PolygonModeFn>,
    pub stencil_func_separate: Option<StencilFuncSeparateFn>,
    pub stencil_op_separate: Option<StencilOpSeparateFn>,
    pub patch_parameteri: Option<PatchParameteriFn>,
    pub draw_elements: Option<DrawElementsFn>,
    pub draw_arrays: Option<DrawArraysFn>,
    pub draw_elements_instanced: Option<DrawElementsInstancedFn>,
    pub draw_arrays_instanced: Option<DrawArraysInstancedFn>,
    pub clear: Option<ClearFn>,
    pub bind_image_texture: Option<BindImageTextureFn>,
    pub clear_color: Option<ClearColorFn>,
    pub clear_depth: Option<ClearDepthFn>,
    pub get_error: Option<GetErrorFn>,
    pub bind_buffer: Option<BindBufferFn>,
    pub vertex_attrib_pointer: Option<VertexAttribPointerFn>,
    pub vertex_attrib_i_pointer: Option<VertexAttribIPointerFn>,
    pub vertex_attrib_divisor: Option<VertexAttribDivisorFn>,
    pub enable_vertex_attrib_array: Option<EnableVertexAttribArrayFn>,
    pub disable_vertex_attrib_array: Option<DisableVertexAttribArrayFn>,
    pub uniform1fv: Option<UniformFvFn>,
    pub uniform1iv: Option<UniformIvFn>,
    pub uniform2fv: Option<UniformFvFn>,
    pub uniform2iv: Option<UniformIvFn>,
    pub uniform3fv: Option<UniformFvFn>,
    pub uniform3iv: Option<UniformIvFn>,
    pub uniform4fv: Option<UniformFvFn>,
    pub uniform4iv: Option<UniformIvFn>,
    pub uniform_matrix2fv: Option<UniformMatrixFvFn>,
    pub uniform_matrix3fv: Option<UniformMatrixFvFn>,
    pub uniform_matrix4fv: Option<UniformMatrixFvFn>,
    pub tex_parameteri: Option<TexParameteriFn>,
    pub tex_parameterf: Option<TexParameterfFn>,
    pub vertex_attrib1f: Option<VertexAttrib1fFn>,
    pub vertex_attrib2f: Option<VertexAttrib2fFn>,
    pub vertex_attrib3f: Option<VertexAttrib3fFn>,
    pub vertex_attrib4f: Option<VertexAttrib4fFn>,
    pub multi_draw_arrays_indirect: Option<MultiDrawArraysIndirectFn>,
    pub multi_draw_elements_indirect: Option<MultiDrawElementsIndirectFn>,
    pub draw_arrays_indirect: Option<DrawArraysIndirectFn>,
    pub draw_elements_indirect: Option<DrawElementsIndirectFn>,
    pub draw_arrays_instanced_base_instance: Option<DrawArraysInstancedBaseInstanceFn>,
    pub draw_elements_instanced_base_vertex_base_instance:
        Option<DrawElementsInstancedBaseVertexBaseInstanceFn>,
    pub draw_elements_base_vertex: Option<DrawElementsBaseVertexFn>,
    pub depth_mask: Option<DepthMaskFn>,
    pub color_maski: Option<ColorMaskiFn>,
    pub stencil_mask: Option<StencilMaskFn>,
    pub draw_buffers: Option<DrawBuffersFn>,
    pub gen_vertex_arrays: Option<GenVertexArraysFn>,
    pub delete_vertex_arrays: Option<DeleteVertexArraysFn>,
    pub polygon_offset: Option<PolygonOffsetFn>,
    pub polygon_offset_clamp: Option<PolygonOffsetClampFn>,
    pub bind_textures: Option<BindTexturesFn>,
    pub bind_samplers: Option<BindSamplersFn>,
}

macro_rules! load_fn {
    ($get_proc:expr, $name:expr) => {{
        let cname = CString::new($name).unwrap();
        let ptr = unsafe { $get_proc(cname.as_ptr()) };
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { std::mem::transmute_copy(&ptr) })
        }
    }};
}

impl GlFns {
    fn load(get_proc: GlGetProcAddress) -> GlFns {
        let mut fns = GlFns::default();
        fns.bind_vertex_array = load_fn!(get_proc, "glBindVertexArray");
        fns.use_program = load_fn!(get_proc, "glUseProgram");
        fns.active_texture = load_fn!(get_proc, "glActiveTexture");
        fns.bind_sampler = load_fn!(get_proc, "glBindSampler");
        fns.bind_texture = load_fn!(get_proc, "glBindTexture");
        fns.bind_buffer_base = load_fn!(get_proc, "glBindBufferBase");
        fns.bind_buffer_range = load_fn!(get_proc, "glBindBufferRange");
        fns.bind_framebuffer = load_fn!(get_proc, "glBindFramebuffer");
        fns.viewport = load_fn!(get_proc, "glViewport");
        fns.enable = load_fn!(get_proc, "glEnable");
        fns.disable = load_fn!(get_proc, "glDisable");
        fns.depth_func = load_fn!(get_proc, "glDepthFunc");
        fns.cull_face = load_fn!(get_proc, "glCullFace");
        fns.blend_func_separate = load_fn!(get_proc, "glBlendFuncSeparate");
        fns.blend_equation_separate = load_fn!(get_proc, "glBlendEquationSeparate");
        fns.blend_color = load_fn!(get_proc, "glBlendColor");
        fns.polygon_mode = load_fn!(get_proc, "glPolygonMode");
        fns.stencil_func_separate = load_fn!(get_proc, "glStencilFuncSeparate");
        fns.stencil_op_separate = load_fn!(get_proc, "glStencilOpSeparate");
        fns.patch_parameteri = load_fn!(get_proc, "glPatchParameteri");
        fns.draw_elements = load_fn!(get_proc, "glDrawElements");
        fns.draw_arrays = load_fn!(get_proc, "glDrawArrays");
        fns.draw_elements_instanced = load_fn!(get_proc, "glDrawElementsInstanced");
        fns.draw_arrays_instanced = load_fn!(get_proc, "glDrawArraysInstanced");
        fns.clear = load_fn!(get_proc, "glClear");
        fns.bind_image_texture = load_fn!(get_proc, "glBindImageTexture");
        fns.clear_color = load_fn!(get_proc, "glClearColor");
        fns.clear_depth = load_fn!(get_proc, "glClearDepth");
        fns.get_error = load_fn!(get_proc, "glGetError");
        fns.bind_buffer = load_fn!(get_proc, "glBindBuffer");
        fns.vertex_attrib_pointer = load_fn!(get_proc, "glVertexAttribPointer");
        fns.vertex_attrib_i_pointer = load_fn!(get_proc, "glVertexAttribIPointer");
        fns.vertex_attrib_divisor = load_fn!(get_proc, "glVertexAttribDivisor");
        fns.enable_vertex_attrib_array = load_fn!(get_proc, "glEnableVertexAttribArray");
        fns.disable_vertex_attrib_array = load_fn!(get_proc, "glDisableVertexAttribArray");
        fns.uniform1fv = load_fn!(get_proc, "glUniform1fv");
        fns.uniform1iv = load_fn!(get_proc, "glUniform1iv");
        fns.uniform2fv = load_fn!(get_proc, "glUniform2fv");
        fns.uniform2iv = load_fn!(get_proc, "glUniform2iv");
        fns.uniform3fv = load_fn!(get_proc, "glUniform3fv");
        fns.uniform3iv = load_fn!(get_proc, "glUniform3iv");
        fns.uniform4fv = load_fn!(get_proc, "glUniform4fv");
        fns.uniform4iv = load_fn!(get_proc, "glUniform4iv");
        fns.uniform_matrix2fv = load_fn!(get_proc, "glUniformMatrix2fv");
        fns.uniform_matrix3fv = load_fn!(get_proc, "glUniformMatrix3fv");
        fns.uniform_matrix4fv = load_fn!(get_proc, "glUniformMatrix4fv");
        fns.tex_parameteri = load_fn!(get_proc, "glTexParameteri");
        fns.tex_parameterf = load_fn!(get_proc, "glTexParameterf");
        fns.vertex_attrib1f = load_fn!(get_proc, "glVertexAttrib1f");
        fns.vertex_attrib2f = load_fn!(get_proc, "glVertexAttrib2f");
        fns.vertex_attrib3f = load_fn!(get_proc, "glVertexAttrib3f");
        fns.vertex_attrib4f = load_fn!(get_proc, "glVertexAttrib4f");
        fns.multi_draw_arrays_indirect = load_fn!(get_proc, "glMultiDrawArraysIndirect");
        fns.multi_draw_elements_indirect = load_fn!(get_proc, "glMultiDrawElementsIndirect");
        fns.draw_arrays_indirect = load_fn!(get_proc, "glDrawArraysIndirect");
        fns.draw_elements_indirect = load_fn!(get_proc, "glDrawElementsIndirect");
        fns.draw_arrays_instanced_base_instance =
            load_fn!(get_proc, "glDrawArraysInstancedBaseInstance");
        fns.draw_elements_instanced_base_vertex_base_instance =
            load_fn!(get_proc, "glDrawElementsInstancedBaseVertexBaseInstance");
        fns.draw_elements_base_vertex = load_fn!(get_proc, "glDrawElementsBaseVertex");
        fns.depth_mask = load_fn!(get_proc, "glDepthMask");
        fns.color_maski = load_fn!(get_proc, "glColorMaski");
        fns.stencil_mask = load_fn!(get_proc, "glStencilMask");
        fns.draw_buffers = load_fn!(get_proc, "glDrawBuffers");
        fns.gen_vertex_arrays = load_fn!(get_proc, "glGenVertexArrays");
        fns.delete_vertex_arrays = load_fn!(get_proc, "glDeleteVertexArrays");
        fns.polygon_offset = load_fn!(get_proc, "glPolygonOffset");
        fns.polygon_offset_clamp = load_fn!(get_proc, "glPolygonOffsetClamp");
        fns.bind_textures = load_fn!(get_proc, "glBindTextures");
        fns.bind_samplers = load_fn!(get_proc, "glBindSamplers");
        fns
    }
}

lazy_static::lazy_static! {
    static ref GL: Mutex<Option<GlFns>> = Mutex::new(None);
}

/// Idempotent init: the first call loads the table via `get_proc`; later
/// calls observe the already-populated table and return immediately. This
/// mirrors `original_source`'s `vmInit()` guarded by its `initialized` bool.
pub fn vm_init(get_proc: GlGetProcAddress) {
    let mut slot = GL.lock().unwrap();
    if slot.is_some() {
        return;
    }
    let fns = GlFns::load(get_proc);
    if fns.bind_vertex_array.is_none() || fns.draw_arrays.is_none() || fns.draw_elements.is_none() {
        error!("GLVM: one or more required GL entry points failed to resolve");
    }
    *slot = Some(fns);
}

/// Runs `f` against the loaded table. Panics if `vm_init` was never called,
/// which is a caller bug (replay before init), not a recoverable condition.
pub fn with_gl<R>(f: impl FnOnce(&GlFns) -> R) -> R {
    let slot = GL.lock().unwrap();
    let fns = slot.as_ref().expect("GLVM::vm_init was never called");
    f(fns)
}
