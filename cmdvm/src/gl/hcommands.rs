//! H-command execution (§4.4).
//!
//! H-commands dereference caller-owned memory blocks (see [`super::structs`])
//! at replay time so a constant program can vary its inputs frame over
//! frame. Each one runs its own redundancy check against the persistent
//! [`super::hstate::HState`] before touching the driver - never against the
//! per-replay [`super::state::GlState`], which is reset every call.

use super::dispatch::GlFns;
use super::hstate::with_h_state;
use super::structs::*;
use super::types::GLenum;
use super::vao_cleanup;
use crate::instruction::{Instruction, OpCode};

pub fn is_h_command(code: OpCode) -> bool {
    use OpCode::*;
    matches!(
        code,
        HDrawArrays
            | HDrawElements
            | HDrawArraysIndirect
            | HDrawElementsIndirect
            | HSetDepthTest
            | HSetDepthBias
            | HSetCullFace
            | HSetPolygonMode
            | HSetBlendMode
            | HSetStencilMode
            | HSetConservativeRaster
            | HSetMultisample
            | HBindTextures
            | HBindSamplers
            | HBindVertexAttributes
    )
}

/// Dispatches one H-command. Called in place of [`super::interpreter::emit`]
/// whenever [`is_h_command`] is true, by both interpreters (§4.2, §4.3):
/// H-command state lives outside either one, so there is nothing for a
/// redundancy-checking caller to pass in beyond the driver table.
pub fn run(gl: &GlFns, inst: &Instruction) {
    use OpCode::*;
    match inst.code {
        HDrawArrays => h_draw_arrays(gl, inst),
        HDrawElements => h_draw_elements(gl, inst),
        HDrawArraysIndirect => h_draw_arrays_indirect(gl, inst),
        HDrawElementsIndirect => h_draw_elements_indirect(gl, inst),
        HSetDepthTest => h_set_depth_test(gl, inst),
        HSetDepthBias => h_set_depth_bias(gl, inst),
        HSetCullFace => h_set_cull_face(gl, inst),
        HSetPolygonMode => h_set_polygon_mode(gl, inst),
        HSetBlendMode => h_set_blend_mode(gl, inst),
        HSetStencilMode => h_set_stencil_mode(gl, inst),
        HSetConservativeRaster => h_set_conservative_raster(inst),
        HSetMultisample => h_set_multisample(inst),
        HBindTextures => h_bind_textures(gl, inst),
        HBindSamplers => h_bind_samplers(gl, inst),
        HBindVertexAttributes => h_bind_vertex_attributes(gl, inst),
        _ => unreachable!("run() called on a non-H opcode"),
    }
}

fn is_active(ptr: *const i32) -> bool {
    ptr.is_null() || unsafe { *ptr != 0 }
}

/// args: stats*, is_active*, begin_mode*, draw_list*
fn h_draw_arrays(gl: &GlFns, inst: &Instruction) {
    let stats = inst.arg_ptr(0) as *mut RuntimeStats;
    let active_ptr = inst.arg_ptr(1) as *const i32;
    let begin_mode = inst.arg_ptr(2) as *const BeginMode;
    let list = inst.arg_ptr(3) as *const DrawCallInfoList;
    if !is_active(active_ptr) || begin_mode.is_null() || list.is_null() {
        return;
    }
    let mode = unsafe { (*begin_mode).mode };
    set_patch_vertices(gl, unsafe { &*begin_mode });
    let infos = unsafe { draw_infos(&*list) };
    for info in infos {
        bump_stats(stats);
        let plain = info.instance_count == 1 && info.first_instance == 0;
        if plain {
            if let Some(f) = gl.draw_arrays {
                unsafe { f(mode, info.first_index, info.face_vertex_count) }
                bump_effective(stats, info);
            }
        } else if let Some(f) = gl.draw_arrays_instanced_base_instance {
            unsafe {
                f(
                    mode,
                    info.first_index,
                    info.face_vertex_count,
                    info.instance_count,
                    info.first_instance as u32,
                )
            }
            bump_effective(stats, info);
        }
    }
}

/// args: stats*, is_active*, begin_mode*, index_type(value), draw_list*
fn h_draw_elements(gl: &GlFns, inst: &Instruction) {
    let stats = inst.arg_ptr(0) as *mut RuntimeStats;
    let active_ptr = inst.arg_ptr(1) as *const i32;
    let begin_mode = inst.arg_ptr(2) as *const BeginMode;
    let index_type = inst.arg_u32(3);
    let list = inst.arg_ptr(4) as *const DrawCallInfoList;
    if !is_active(active_ptr) || begin_mode.is_null() || list.is_null() {
        return;
    }
    let mode = unsafe { (*begin_mode).mode };
    set_patch_vertices(gl, unsafe { &*begin_mode });
    let infos = unsafe { draw_infos(&*list) };
    for info in infos {
        bump_stats(stats);
        let offset = (info.first_index as isize) as *const GLvoid;
        let plain = info.instance_count == 1 && info.first_instance == 0;
        if plain {
            if let Some(f) = gl.draw_elements_base_vertex {
                unsafe { f(mode, info.face_vertex_count, index_type, offset, info.base_vertex) }
                bump_effective(stats, info);
            }
        } else if let Some(f) = gl.draw_elements_instanced_base_vertex_base_instance {
            unsafe {
                f(
                    mode,
                    info.face_vertex_count,
                    index_type,
                    offset,
                    info.instance_count,
                    info.base_vertex,
                    info.first_instance as u32,
                )
            }
            bump_effective(stats, info);
        }
    }
}

/// §4.4: `mode == GL_PATCHES` requires setting the patch vertex count before
/// any draw in the batch, mirroring `hglDrawArrays`/`hglDrawElements`'s call
/// to `glPatchParameteri` ahead of their draw loop.
fn set_patch_vertices(gl: &GlFns, begin_mode: &BeginMode) {
    if begin_mode.mode != GL_PATCHES {
        return;
    }
    if let Some(f) = gl.patch_parameteri {
        const GL_PATCH_VERTICES: GLenum = 0x8E72;
        unsafe { f(GL_PATCH_VERTICES, begin_mode.patch_vertices) };
    }
}

use super::types::GLvoid;

/// args: stats*, is_active*, begin_mode*, indirect_args*
fn h_draw_arrays_indirect(gl: &GlFns, inst: &Instruction) {
    let stats = inst.arg_ptr(0) as *mut RuntimeStats;
    let active_ptr = inst.arg_ptr(1) as *const i32;
    let begin_mode = inst.arg_ptr(2) as *const BeginMode;
    let args = inst.arg_ptr(3) as *const IndirectDrawArgs;
    if !is_active(active_ptr) || begin_mode.is_null() || args.is_null() {
        return;
    }
    let mode = unsafe { (*begin_mode).mode };
    let a = unsafe { &*args };
    bump_stats(stats);
    if let Some(f) = gl.multi_draw_arrays_indirect {
        unsafe { f(mode, a.offset as *const GLvoid, a.count, a.stride) }
        bump_effective_indirect(stats);
    }
}

/// args: stats*, is_active*, begin_mode*, index_type(value), indirect_args*
fn h_draw_elements_indirect(gl: &GlFns, inst: &Instruction) {
    let stats = inst.arg_ptr(0) as *mut RuntimeStats;
    let active_ptr = inst.arg_ptr(1) as *const i32;
    let begin_mode = inst.arg_ptr(2) as *const BeginMode;
    let index_type = inst.arg_u32(3);
    let args = inst.arg_ptr(4) as *const IndirectDrawArgs;
    if !is_active(active_ptr) || begin_mode.is_null() || args.is_null() {
        return;
    }
    let mode = unsafe { (*begin_mode).mode };
    let a = unsafe { &*args };
    bump_stats(stats);
    if let Some(f) = gl.multi_draw_elements_indirect {
        unsafe { f(mode, index_type, a.offset as *const GLvoid, a.count, a.stride) }
        bump_effective_indirect(stats);
    }
}

unsafe fn draw_infos(list: &DrawCallInfoList) -> &[DrawCallInfo] {
    if list.infos.is_null() || list.count <= 0 {
        &[]
    } else {
        std::slice::from_raw_parts(list.infos, list.count as usize)
    }
}

fn bump_stats(stats: *mut RuntimeStats) {
    if !stats.is_null() {
        unsafe { (*stats).draw_calls += 1 };
    }
}

/// §8.6: `effective_draw_calls` sums `instance_count` over actually-issued
/// draws, not a flat count of issued calls - mirrors `vk/indirect.rs`'s
/// `+= instance_count` on the Vulkan side.
fn bump_effective(stats: *mut RuntimeStats, info: &DrawCallInfo) {
    if !stats.is_null() {
        unsafe { (*stats).effective_draw_calls += info.instance_count };
    }
}

/// The GPU-resident indirect-args buffer, not the replayed instruction, holds
/// the real instance count for `multi_draw_*_indirect`, so this path can only
/// count the call itself.
fn bump_effective_indirect(stats: *mut RuntimeStats) {
    if !stats.is_null() {
        unsafe { (*stats).effective_draw_calls += 1 };
    }
}

/// args: DepthTestMode*. `comparison == 0` disables depth test and depth
/// clamp; otherwise enables depth test, sets the depth func, and toggles
/// depth clamp by `clamp` (§4.4).
fn h_set_depth_test(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const DepthTestMode;
    if ptr.is_null() {
        return;
    }
    let should = with_h_state(|h| unsafe { h.should_set_depth_test(&(*ptr).comparison as *const u32 as *const i32) });
    if !should {
        return;
    }
    let mode = unsafe { &*ptr };
    const GL_DEPTH_TEST: u32 = 0x0B71;
    const GL_DEPTH_CLAMP: u32 = 0x864F;
    if mode.comparison == 0 {
        if let Some(f) = gl.disable {
            unsafe {
                f(GL_DEPTH_TEST);
                f(GL_DEPTH_CLAMP);
            }
        }
        return;
    }
    if let Some(f) = gl.enable {
        unsafe { f(GL_DEPTH_TEST) };
    }
    if let Some(f) = gl.depth_func {
        unsafe { f(mode.comparison) };
    }
    if mode.clamp != 0 {
        if let Some(f) = gl.enable {
            unsafe { f(GL_DEPTH_CLAMP) };
        }
    } else if let Some(f) = gl.disable {
        unsafe { f(GL_DEPTH_CLAMP) };
    }
}

/// args: DepthBiasInfo*. Non-zero constant/slope enables the three
/// POLYGON_OFFSET capabilities and sets the bias; all-zero disables them
/// (§4.4).
fn h_set_depth_bias(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const DepthBiasInfo;
    if ptr.is_null() {
        return;
    }
    let info = unsafe { &*ptr };
    const GL_POLYGON_OFFSET_FILL: u32 = 0x8037;
    const GL_POLYGON_OFFSET_LINE: u32 = 0x2A02;
    const GL_POLYGON_OFFSET_POINT: u32 = 0x2A01;
    let active = info.constant != 0.0 || info.slope_scale != 0.0;
    if active {
        if let Some(f) = gl.enable {
            unsafe {
                f(GL_POLYGON_OFFSET_FILL);
                f(GL_POLYGON_OFFSET_LINE);
                f(GL_POLYGON_OFFSET_POINT);
            }
        }
        if let Some(f) = gl.polygon_offset_clamp {
            unsafe { f(info.slope_scale, info.constant, info.clamp) };
        } else if let Some(f) = gl.polygon_offset {
            unsafe { f(info.slope_scale, info.constant) };
        }
    } else if let Some(f) = gl.disable {
        unsafe {
            f(GL_POLYGON_OFFSET_FILL);
            f(GL_POLYGON_OFFSET_LINE);
            f(GL_POLYGON_OFFSET_POINT);
        }
    }
}

/// args: face* (pointer to the dereferenced GLenum)
fn h_set_cull_face(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const u32;
    if ptr.is_null() {
        return;
    }
    let face = unsafe { *ptr } as i64;
    if with_h_state(|h| h.should_set_cull_face(face)) {
        if let Some(f) = gl.cull_face {
            unsafe { f(face as u32) };
        }
    }
}

/// args: mode* (pointer to the dereferenced GLenum)
fn h_set_polygon_mode(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const u32;
    if ptr.is_null() {
        return;
    }
    let mode = unsafe { *ptr } as i64;
    if with_h_state(|h| h.should_set_polygon_mode(mode)) {
        if let Some(f) = gl.polygon_mode {
            unsafe { f(0x0404 /* GL_FRONT_AND_BACK */, mode as u32) };
        }
    }
}

/// args: BlendMode*. `original_source`'s blend-mode redundancy check is a
/// dead stub that unconditionally returns true (`HShouldSetBlendModes`,
/// marked TODO questioning whether that interpreter path still runs), so
/// this always emits - there is no useful content-comparison rule to port
/// (see DESIGN.md).
fn h_set_blend_mode(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const BlendMode;
    if ptr.is_null() {
        return;
    }
    let mode = unsafe { &*ptr };
    if mode.enabled != 0 {
        if let Some(f) = gl.enable {
            unsafe { f(0x0BE2 /* GL_BLEND */) };
        }
    } else if let Some(f) = gl.disable {
        unsafe { f(0x0BE2) };
    }
    if let Some(f) = gl.blend_func_separate {
        unsafe { f(mode.src_rgb, mode.dst_rgb, mode.src_a, mode.dst_a) };
    }
    if let Some(f) = gl.blend_equation_separate {
        unsafe { f(mode.op_rgb, mode.op_a) };
    }
}

/// args: StencilMode*
fn h_set_stencil_mode(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const StencilMode;
    if ptr.is_null() {
        return;
    }
    let mode = unsafe { &*ptr };
    let size = std::mem::size_of::<StencilFace>();
    let should = with_h_state(|h| unsafe {
        h.should_set_stencil_mode(
            &mode.front as *const StencilFace as *const u8,
            &mode.back as *const StencilFace as *const u8,
            size,
        )
    });
    if !should {
        return;
    }
    if mode.enabled != 0 {
        if let Some(f) = gl.enable {
            unsafe { f(0x0B90 /* GL_STENCIL_TEST */) };
        }
    } else if let Some(f) = gl.disable {
        unsafe { f(0x0B90) };
    }
    if let Some(f) = gl.stencil_func_separate {
        unsafe {
            f(0x0404, mode.front.func, mode.front.reference, mode.front.mask);
            f(0x0405 /* GL_BACK */, mode.back.func, mode.back.reference, mode.back.mask);
        }
    }
    if let Some(f) = gl.stencil_op_separate {
        unsafe {
            f(0x0404, mode.front.sfail, mode.front.dfail, mode.front.pass);
            f(0x0405, mode.back.sfail, mode.back.dfail, mode.back.pass);
        }
    }
}

/// args: enabled* (pointer to an int flag)
fn h_set_conservative_raster(inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const i32;
    if ptr.is_null() {
        return;
    }
    let _ = with_h_state(|h| unsafe { h.should_set_conservative_raster(ptr) });
    // No portable GL enum for conservative rasterization across vendors;
    // the redundancy check still runs so downstream custom opcodes can
    // consult `HState` consistently, matching the original's always-present
    // hgl call even when the feature is unavailable.
}

/// args: enabled* (pointer to an int flag)
fn h_set_multisample(gl: &GlFns, inst: &Instruction) {
    let ptr = inst.arg_ptr(0) as *const i32;
    if ptr.is_null() {
        return;
    }
    let should = with_h_state(|h| unsafe { h.should_set_multisample(ptr) });
    if !should {
        return;
    }
    let enabled = unsafe { *ptr } != 0;
    if enabled {
        if let Some(f) = gl.enable {
            unsafe { f(0x809D /* GL_MULTISAMPLE */) };
        }
    } else if let Some(f) = gl.disable {
        unsafe { f(0x809D) };
    }
}

/// args: first(u32), count(i32), targets*, textures*
fn h_bind_textures(gl: &GlFns, inst: &Instruction) {
    let first = inst.arg_u32(0);
    let count = inst.arg_i32(1);
    let targets = inst.arg_ptr(2) as *const u32;
    let textures = inst.arg_ptr(3) as *const u32;
    if count <= 0 || textures.is_null() {
        return;
    }
    // `targets` is accepted for §3 wire compatibility but glBindTextures has
    // no per-slot target parameter; real per-target binds for mixed texture
    // targets go through the low-code `BindTexture` opcode instead.
    let _ = targets;
    if let Some(f) = gl.bind_textures {
        unsafe { f(first, count, textures) };
    }
}

/// args: first(u32), count(i32), samplers*
fn h_bind_samplers(gl: &GlFns, inst: &Instruction) {
    let first = inst.arg_u32(0);
    let count = inst.arg_i32(1);
    let samplers = inst.arg_ptr(2) as *const u32;
    if count <= 0 || samplers.is_null() {
        return;
    }
    if let Some(f) = gl.bind_samplers {
        unsafe { f(first, count, samplers) };
    }
}

/// args: context(usize value), binding* (`VertexInputBinding`, nullable)
///
/// On a redundant bind this is a no-op. On a real change it configures the
/// vertex array: allocating a fresh VAO the first time a binding is seen,
/// and scheduling the VAO for deletion under its owning context (`§4.4`,
/// [`vao_cleanup`]) if the binding had previously been realized under a
/// *different* GL context than the one active now.
fn h_bind_vertex_attributes(gl: &GlFns, inst: &Instruction) {
    let context = inst.arg_usize(0);
    let ptr = inst.arg_ptr(1) as *mut VertexInputBinding;
    let should = with_h_state(|h| h.should_bind_vertex_attributes(ptr as *const u8, context));
    if !should {
        return;
    }
    if ptr.is_null() {
        if let Some(f) = gl.bind_vertex_array {
            unsafe { f(0) };
        }
        return;
    }
    let binding = unsafe { &mut *ptr };

    if binding.vao_handle != 0 && binding.vao_context != context {
        vao_cleanup::schedule_drop(binding.vao_context, binding.vao_handle);
        binding.vao_handle = 0;
    }

    if binding.vao_handle == 0 {
        let mut handle = 0u32;
        if let Some(f) = gl.gen_vertex_arrays {
            unsafe { f(1, &mut handle as *mut u32) };
        }
        binding.vao_handle = handle;
        binding.vao_context = context;
        configure_vertex_array(gl, binding);
    }

    if let Some(f) = gl.bind_vertex_array {
        unsafe { f(binding.vao_handle) };
    }
}

fn configure_vertex_array(gl: &GlFns, binding: &VertexInputBinding) {
    if let Some(f) = gl.bind_vertex_array {
        unsafe { f(binding.vao_handle) };
    }
    if binding.index_buffer != 0 {
        if let Some(f) = gl.bind_buffer {
            unsafe { f(0x8893 /* GL_ELEMENT_ARRAY_BUFFER */, binding.index_buffer) };
        }
    }

    let attribs: &[VertexAttribBinding] = if binding.attrib_bindings.is_null() {
        &[]
    } else {
        unsafe {
            std::slice::from_raw_parts(binding.attrib_bindings, binding.attrib_binding_count.max(0) as usize)
        }
    };
    let buffers: &[VertexBufferBinding] = if binding.buffer_bindings.is_null() {
        &[]
    } else {
        unsafe {
            std::slice::from_raw_parts(binding.buffer_bindings, binding.buffer_binding_count.max(0) as usize)
        }
    };

    for attrib in attribs {
        let buf = buffers.get(attrib.buffer_index as usize);
        if let Some(buf) = buf {
            if let Some(f) = gl.bind_buffer {
                unsafe { f(0x8892 /* GL_ARRAY_BUFFER */, buf.buffer) };
            }
        }
        if let Some(f) = gl.enable_vertex_attrib_array {
            unsafe { f(attrib.location) };
        }
        let stride = buf.map(|b| b.stride).unwrap_or(0);
        let offset = (attrib.relative_offset as isize
            + buf.map(|b| b.offset).unwrap_or(0)) as *const GLvoid;
        if attrib.integer != 0 {
            if let Some(f) = gl.vertex_attrib_i_pointer {
                unsafe { f(attrib.location, attrib.components, attrib.gl_type, stride, offset) };
            }
        } else if let Some(f) = gl.vertex_attrib_pointer {
            unsafe {
                f(
                    attrib.location,
                    attrib.components,
                    attrib.gl_type,
                    attrib.normalized,
                    stride,
                    offset,
                )
            }
        }
        if attrib.divisor != 0 {
            if let Some(f) = gl.vertex_attrib_divisor {
                unsafe { f(attrib.location, attrib.divisor) };
            }
        }
    }

    let values: &[VertexValueBinding] = if binding.value_bindings.is_null() {
        &[]
    } else {
        unsafe {
            std::slice::from_raw_parts(binding.value_bindings, binding.value_binding_count.max(0) as usize)
        }
    };
    for value in values {
        if let Some(f) = gl.disable_vertex_attrib_array {
            unsafe { f(value.location) };
        }
        if let Some(f) = gl.vertex_attrib4f {
            unsafe { f(value.location, value.x, value.y, value.z, value.w) };
        }
    }
}
