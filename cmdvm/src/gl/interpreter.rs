//! GL direct and redundancy-checking replay (§4.2, §4.3, §5).

use super::dispatch::{with_gl, GlFns};
use super::hcommands;
use super::state::GlState;
use crate::instruction::{Instruction, OpCode};
use crate::program::Fragment;
use cmdvm_utils::log::error;

bitflags::bitflags! {
    /// Mirrors `original_source`'s `VMMode` enum. `RuntimeStateSorting` is
    /// carried as a reserved bit: nothing in this crate reorders commands
    /// (an explicit Non-goal), so it is accepted but ignored.
    pub struct VMMode: u32 {
        const NONE = 0x0000_0000;
        const NO_OPTIMIZATION = 0x0000_0000;
        const RUNTIME_REDUNDANCY_CHECKS = 0x0000_0001;
        const RUNTIME_STATE_SORTING = 0x0000_0002;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total_instructions: u64,
    pub removed_instructions: u64,
}

/// Dispatches one low-code instruction directly to the driver, with no
/// redundancy check. Used both by the direct interpreter and, for every
/// non-cacheable opcode, by the redundancy interpreter.
fn emit(gl: &GlFns, inst: &Instruction) {
    use OpCode::*;
    match inst.code {
        BindVertexArray => call1(gl.bind_vertex_array, inst),
        BindProgram => call1(gl.use_program, inst),
        ActiveTexture => call1(gl.active_texture, inst),
        BindSampler => {
            if let Some(f) = gl.bind_sampler {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        BindTexture => {
            if let Some(f) = gl.bind_texture {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        BindBufferBase => {
            if let Some(f) = gl.bind_buffer_base {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1), inst.arg_u32(2)) }
            }
        }
        BindBufferRange => {
            if let Some(f) = gl.bind_buffer_range {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_u32(2),
                        inst.args[3],
                        inst.args[4],
                    )
                }
            }
        }
        BindFramebuffer => {
            if let Some(f) = gl.bind_framebuffer {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        Viewport => {
            if let Some(f) = gl.viewport {
                unsafe {
                    f(
                        inst.arg_i32(0),
                        inst.arg_i32(1),
                        inst.arg_i32(2),
                        inst.arg_i32(3),
                    )
                }
            }
        }
        Enable => call1(gl.enable, inst),
        Disable => call1(gl.disable, inst),
        DepthFunc => call1(gl.depth_func, inst),
        CullFace => call1(gl.cull_face, inst),
        BlendFuncSeparate => {
            if let Some(f) = gl.blend_func_separate {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_u32(2),
                        inst.arg_u32(3),
                    )
                }
            }
        }
        BlendEquationSeparate => {
            if let Some(f) = gl.blend_equation_separate {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        BlendColor => {
            if let Some(f) = gl.blend_color {
                unsafe {
                    f(
                        inst.arg_f32(0),
                        inst.arg_f32(1),
                        inst.arg_f32(2),
                        inst.arg_f32(3),
                    )
                }
            }
        }
        PolygonMode => {
            if let Some(f) = gl.polygon_mode {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        StencilFuncSeparate => {
            if let Some(f) = gl.stencil_func_separate {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_i32(2),
                        inst.arg_u32(3),
                    )
                }
            }
        }
        StencilOpSeparate => {
            if let Some(f) = gl.stencil_op_separate {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_u32(2),
                        inst.arg_u32(3),
                    )
                }
            }
        }
        PatchParameter => {
            if let Some(f) = gl.patch_parameteri {
                unsafe { f(inst.arg_u32(0), inst.arg_i32(1)) }
            }
        }
        DrawElements => {
            if let Some(f) = gl.draw_elements {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_i32(1),
                        inst.arg_u32(2),
                        inst.arg_ptr(3),
                    )
                }
            }
        }
        DrawArrays => {
            if let Some(f) = gl.draw_arrays {
                unsafe { f(inst.arg_u32(0), inst.arg_i32(1), inst.arg_i32(2)) }
            }
        }
        DrawElementsInstanced => {
            if let Some(f) = gl.draw_elements_instanced {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_i32(1),
                        inst.arg_u32(2),
                        inst.arg_ptr(3),
                        inst.arg_i32(4),
                    )
                }
            }
        }
        DrawArraysInstanced => {
            if let Some(f) = gl.draw_arrays_instanced {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_i32(1),
                        inst.arg_i32(2),
                        inst.arg_i32(3),
                    )
                }
            }
        }
        Clear => call1(gl.clear, inst),
        BindImageTexture => {
            if let Some(f) = gl.bind_image_texture {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_i32(2),
                        inst.arg_bool(3) as u8,
                        inst.arg_i32(4),
                        inst.arg_u32(5),
                        0, // access/format packed by caller into arg5 upstream of the ABI boundary
                    )
                }
            }
        }
        ClearColor => {
            if let Some(f) = gl.clear_color {
                unsafe {
                    f(
                        inst.arg_f32(0),
                        inst.arg_f32(1),
                        inst.arg_f32(2),
                        inst.arg_f32(3),
                    )
                }
            }
        }
        ClearDepth => {
            if let Some(f) = gl.clear_depth {
                unsafe { f(f64::from_bits(inst.args[0] as u64)) }
            }
        }
        GetError => {
            if let Some(f) = gl.get_error {
                unsafe {
                    f();
                }
            }
        }
        BindBuffer => {
            if let Some(f) = gl.bind_buffer {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        VertexAttribPointer => {
            if let Some(f) = gl.vertex_attrib_pointer {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_i32(1),
                        inst.arg_u32(2),
                        inst.arg_bool(3) as u8,
                        inst.arg_i32(4),
                        inst.arg_ptr(5),
                    )
                }
            }
        }
        VertexAttribDivisor => {
            if let Some(f) = gl.vertex_attrib_divisor {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1)) }
            }
        }
        EnableVertexAttribArray => call1(gl.enable_vertex_attrib_array, inst),
        DisableVertexAttribArray => call1(gl.disable_vertex_attrib_array, inst),
        Uniform1fv => uniform_fv(gl.uniform1fv, inst),
        Uniform1iv => uniform_iv(gl.uniform1iv, inst),
        Uniform2fv => uniform_fv(gl.uniform2fv, inst),
        Uniform2iv => uniform_iv(gl.uniform2iv, inst),
        Uniform3fv => uniform_fv(gl.uniform3fv, inst),
        Uniform3iv => uniform_iv(gl.uniform3iv, inst),
        Uniform4fv => uniform_fv(gl.uniform4fv, inst),
        Uniform4iv => uniform_iv(gl.uniform4iv, inst),
        UniformMatrix2fv => uniform_matrix_fv(gl.uniform_matrix2fv, inst),
        UniformMatrix3fv => uniform_matrix_fv(gl.uniform_matrix3fv, inst),
        UniformMatrix4fv => uniform_matrix_fv(gl.uniform_matrix4fv, inst),
        TexParameteri => {
            if let Some(f) = gl.tex_parameteri {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1), inst.arg_i32(2)) }
            }
        }
        TexParameterf => {
            if let Some(f) = gl.tex_parameterf {
                unsafe { f(inst.arg_u32(0), inst.arg_u32(1), inst.arg_f32(2)) }
            }
        }
        VertexAttrib1f => {
            if let Some(f) = gl.vertex_attrib1f {
                unsafe { f(inst.arg_u32(0), inst.arg_f32(1)) }
            }
        }
        VertexAttrib2f => {
            if let Some(f) = gl.vertex_attrib2f {
                unsafe { f(inst.arg_u32(0), inst.arg_f32(1), inst.arg_f32(2)) }
            }
        }
        VertexAttrib3f => {
            if let Some(f) = gl.vertex_attrib3f {
                unsafe { f(inst.arg_u32(0), inst.arg_f32(1), inst.arg_f32(2), inst.arg_f32(3)) }
            }
        }
        VertexAttrib4f => {
            if let Some(f) = gl.vertex_attrib4f {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_f32(1),
                        inst.arg_f32(2),
                        inst.arg_f32(3),
                        inst.arg_f32(4),
                    )
                }
            }
        }
        MultiDrawArraysIndirect => {
            if let Some(f) = gl.multi_draw_arrays_indirect {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_ptr(1),
                        inst.arg_i32(2),
                        inst.arg_i32(3),
                    )
                }
            }
        }
        MultiDrawElementsIndirect => {
            if let Some(f) = gl.multi_draw_elements_indirect {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_u32(1),
                        inst.arg_ptr(2),
                        inst.arg_i32(3),
                        inst.arg_i32(4),
                    )
                }
            }
        }
        DepthMask => {
            if let Some(f) = gl.depth_mask {
                unsafe { f(inst.arg_bool(0) as u8) }
            }
        }
        ColorMask => {
            if let Some(f) = gl.color_maski {
                unsafe {
                    f(
                        inst.arg_u32(0),
                        inst.arg_bool(1) as u8,
                        inst.arg_bool(2) as u8,
                        inst.arg_bool(3) as u8,
                        inst.arg_bool(4) as u8,
                    )
                }
            }
        }
        StencilMask => call1(gl.stencil_mask, inst),
        DrawBuffers => {
            if let Some(f) = gl.draw_buffers {
                unsafe { f(inst.arg_i32(0), inst.arg_ptr(1) as *const u32) }
            }
        }
        // H-commands never reach `emit`: the interpreters dispatch them
        // through `hcommands` before falling through to this function.
        HDrawArrays | HDrawElements | HDrawArraysIndirect | HDrawElementsIndirect
        | HSetDepthTest | HSetDepthBias | HSetCullFace | HSetPolygonMode | HSetBlendMode
        | HSetStencilMode | HSetConservativeRaster | HSetMultisample | HBindTextures
        | HBindSamplers | HBindVertexAttributes => unreachable!("H-commands handled upstream"),
    }
}

fn call1(f: Option<unsafe extern "system" fn(u32)>, inst: &Instruction) {
    if let Some(f) = f {
        unsafe { f(inst.arg_u32(0)) }
    }
}

fn uniform_fv(
    f: Option<super::dispatch::UniformFvFn>,
    inst: &Instruction,
) {
    if let Some(f) = f {
        unsafe { f(inst.arg_i32(0), inst.arg_i32(1), inst.arg_ptr(2) as *const f32) }
    }
}

fn uniform_iv(
    f: Option<super::dispatch::UniformIvFn>,
    inst: &Instruction,
) {
    if let Some(f) = f {
        unsafe { f(inst.arg_i32(0), inst.arg_i32(1), inst.arg_ptr(2) as *const i32) }
    }
}

fn uniform_matrix_fv(
    f: Option<super::dispatch::UniformMatrixFvFn>,
    inst: &Instruction,
) {
    if let Some(f) = f {
        unsafe {
            f(
                inst.arg_i32(0),
                inst.arg_i32(1),
                inst.arg_bool(2) as u8,
                inst.arg_ptr(3) as *const f32,
            )
        }
    }
}

/// Runs every instruction of `frag` and its chain directly, with no
/// redundancy elimination (§4.2). On unknown opcode, logs and continues.
pub fn run_no_redundancy_checks(frag: &Fragment) -> Statistics {
    with_gl(|gl| {
        let mut total = 0u64;
        let mut current = Some(frag);
        while let Some(f) = current {
            f.for_each_instruction(|inst| {
                total += 1;
                if hcommands::is_h_command(inst.code) {
                    hcommands::run(gl, inst);
                } else {
                    emit(gl, inst);
                }
            });
            current = f.get_next();
        }
        Statistics {
            total_instructions: total,
            removed_instructions: 0,
        }
    })
}

/// Runs `frag` and its chain, single fragment only, ignoring any `next`
/// link even if present (§6.1 `vmRunSingle`).
pub fn run_single(frag: &Fragment) {
    with_gl(|gl| {
        frag.for_each_instruction(|inst| {
            if hcommands::is_h_command(inst.code) {
                hcommands::run(gl, inst);
            } else {
                emit(gl, inst);
            }
        });
    });
}

/// Runs `frag` and its chain through the redundancy cache (§4.3). Returns
/// counts for both total instructions walked and instructions suppressed.
pub fn run_redundancy_checks(frag: &Fragment) -> Statistics {
    with_gl(|gl| {
        let mut state = GlState::new();
        let mut total = 0u64;
        let mut current = Some(frag);
        while let Some(f) = current {
            f.for_each_instruction(|inst| {
                total += 1;
                dispatch_cacheable(gl, &mut state, inst);
            });
            current = f.get_next();
        }
        let removed = state.removed_instructions();
        Statistics {
            total_instructions: total,
            removed_instructions: removed,
        }
    })
}

fn dispatch_cacheable(gl: &GlFns, state: &mut GlState, inst: &Instruction) {
    use OpCode::*;
    if hcommands::is_h_command(inst.code) {
        // H-command redundancy state is a persistent global (`hstate`), not
        // the per-replay `GlState` threaded through this function.
        hcommands::run(gl, inst);
        return;
    }
    let should_emit = match inst.code {
        BindVertexArray => state.should_set_vertex_array(inst.args[0] as i64),
        BindProgram => state.should_set_program(inst.args[0] as i64),
        ActiveTexture => state.should_set_active_texture(inst.args[0] as i64),
        BindSampler => state.should_set_sampler(inst.arg_i32(0), inst.args[1] as i64),
        BindTexture => state.should_set_texture(inst.arg_u32(0), inst.args[1] as i64),
        BindBufferBase => state.should_set_buffer(
            inst.arg_u32(0),
            inst.arg_i32(1),
            inst.args[2] as i64,
            0,
            0,
        ),
        BindBufferRange => state.should_set_buffer(
            inst.arg_u32(0),
            inst.arg_i32(1),
            inst.args[2] as i64,
            inst.args[3] as i64,
            inst.args[4] as i64,
        ),
        Enable => state.should_enable(inst.args[0] as i64),
        Disable => state.should_disable(inst.args[0] as i64),
        DepthFunc => state.should_set_depth_func(inst.args[0] as i64),
        CullFace => state.should_set_cull_face(inst.args[0] as i64),
        DepthMask => state.should_set_depth_mask(inst.args[0] as i64),
        StencilMask => state.should_set_stencil_mask(inst.args[0] as i64),
        PolygonMode => state.should_set_polygon_mode(inst.args[0] as i64, inst.args[1] as i64),
        BlendFuncSeparate => state.should_set_blend_func(
            inst.args[0] as i64,
            inst.args[1] as i64,
            inst.args[2] as i64,
            inst.args[3] as i64,
        ),
        BlendEquationSeparate => {
            state.should_set_blend_equation(inst.args[0] as i64, inst.args[1] as i64)
        }
        BlendColor => state.should_set_blend_color(
            inst.args[0] as i64,
            inst.args[1] as i64,
            inst.args[2] as i64,
            inst.args[3] as i64,
        ),
        StencilFuncSeparate => state.should_set_stencil_func(
            inst.args[0] as i64,
            inst.args[1] as i64,
            inst.args[2] as i64,
            inst.args[3] as i64,
        ),
        StencilOpSeparate => state.should_set_stencil_op(
            inst.args[0] as i64,
            inst.args[1] as i64,
            inst.args[2] as i64,
            inst.args[3] as i64,
        ),
        PatchParameter => state.should_set_patch_parameter(inst.args[0] as i64, inst.args[1] as i64),
        ColorMask => state.should_set_color_mask(
            inst.args[0] as i64,
            inst.arg_bool(1),
            inst.arg_bool(2),
            inst.arg_bool(3),
            inst.arg_bool(4),
        ),
        DrawBuffers => {
            let n = inst.arg_usize(0);
            let ptr = inst.arg_ptr(1) as *const u32;
            let buffers = if ptr.is_null() || n == 0 {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(ptr, n) }
            };
            state.should_set_draw_buffers(buffers)
        }
        _ => true, // non-cacheable opcodes always emit
    };
    if should_emit {
        emit(gl, inst);
    }
}

pub fn unknown_opcode(code: i32) {
    error!("GLVM: unknown instruction code: {}", code);
}
