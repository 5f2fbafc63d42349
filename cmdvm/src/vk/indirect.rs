//! Vulkan indirect helpers (§4.6). Each dereferences a caller-owned binding
//! struct at replay time and issues the matching `vkCmd*` call through the
//! resolved dispatch table.

use super::dispatch::Vkvm;
use super::structs::*;
use ash::vk;

pub fn bind_descriptor_sets(
    vkvm: &Vkvm,
    cmd: vk::CommandBuffer,
    binding: &IndirectBindDescriptorSetsBinding,
) {
    if binding.set_count == 0 {
        return;
    }
    if let Some(f) = vkvm.bind_descriptor_sets {
        unsafe {
            f(
                cmd,
                binding.bind_point,
                binding.layout,
                binding.first_set,
                binding.set_count,
                binding.sets,
                0,
                std::ptr::null(),
            )
        }
    }
}

pub fn bind_index_buffer(vkvm: &Vkvm, cmd: vk::CommandBuffer, binding: &IndirectBindIndexBufferBinding) {
    if let Some(f) = vkvm.bind_index_buffer {
        unsafe { f(cmd, binding.buffer, binding.offset, binding.index_type) }
    }
}

pub fn bind_vertex_buffers(
    vkvm: &Vkvm,
    cmd: vk::CommandBuffer,
    binding: &IndirectBindVertexBuffersBinding,
) {
    if binding.binding_count == 0 {
        return;
    }
    if let Some(f) = vkvm.bind_vertex_buffers {
        unsafe {
            f(
                cmd,
                binding.first_binding,
                binding.binding_count,
                binding.buffers,
                binding.offsets,
            )
        }
    }
}

/// (§4.6 "draw"). `is_active` follows the same caller-owned-flag convention
/// as the GL H-commands (`gl::hcommands::is_active`).
pub fn draw(
    vkvm: &Vkvm,
    cmd: vk::CommandBuffer,
    stats: *mut RuntimeStats,
    is_active: *const i32,
    call: &IndirectDrawCall,
) {
    let active = is_active.is_null() || unsafe { *is_active != 0 };
    if !active || call.count == 0 {
        return;
    }

    if call.is_indirect != 0 {
        bump(stats, 1, call.count as i32);
        if call.is_indexed != 0 {
            if let Some(f) = vkvm.draw_indexed_indirect {
                unsafe { f(cmd, call.handle, call.offset, call.count, call.stride) }
            }
        } else if let Some(f) = vkvm.draw_indirect {
            unsafe { f(cmd, call.handle, call.offset, call.count, call.stride) }
        }
        return;
    }

    if call.infos.is_null() {
        return;
    }
    let infos = unsafe { std::slice::from_raw_parts(call.infos, call.count as usize) };
    bump(stats, call.count as i32, 0);
    for info in infos {
        if info.instance_count == 0 || info.face_vertex_count == 0 {
            continue;
        }
        bump(stats, 0, info.instance_count as i32);
        if call.is_indexed != 0 {
            if let Some(f) = vkvm.draw_indexed {
                unsafe {
                    f(
                        cmd,
                        info.face_vertex_count,
                        info.instance_count,
                        info.first_index,
                        info.base_vertex,
                        info.first_instance,
                    )
                }
            }
        } else if let Some(f) = vkvm.draw {
            unsafe {
                f(
                    cmd,
                    info.face_vertex_count,
                    info.instance_count,
                    info.first_index,
                    info.first_instance,
                )
            }
        }
    }
}

fn bump(stats: *mut RuntimeStats, draw_calls: i32, effective: i32) {
    if stats.is_null() {
        return;
    }
    unsafe {
        (*stats).draw_calls += draw_calls;
        (*stats).effective_draw_calls += effective;
    }
}
