//! Caller-owned dynamic bindings the Vulkan indirect opcodes dereference at
//! replay time (§4.5, §4.6), analogous to `gl::structs` on the GL side.
#![allow(non_camel_case_types)]

use ash::vk;

#[repr(C)]
pub struct RuntimeStats {
    pub draw_calls: i32,
    pub effective_draw_calls: i32,
}

#[repr(C)]
pub struct IndirectBindPipelineBinding {
    pub bind_point: vk::PipelineBindPoint,
    pub pipeline: vk::Pipeline,
}

#[repr(C)]
pub struct IndirectBindDescriptorSetsBinding {
    pub bind_point: vk::PipelineBindPoint,
    pub layout: vk::PipelineLayout,
    pub first_set: u32,
    pub set_count: u32,
    pub sets: *const vk::DescriptorSet,
}

#[repr(C)]
pub struct IndirectBindIndexBufferBinding {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub index_type: vk::IndexType,
}

#[repr(C)]
pub struct IndirectBindVertexBuffersBinding {
    pub first_binding: u32,
    pub binding_count: u32,
    pub buffers: *const vk::Buffer,
    pub offsets: *const vk::DeviceSize,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct DrawCallInfo {
    pub face_vertex_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub first_instance: u32,
    pub base_vertex: i32,
}

#[repr(C)]
pub struct IndirectDrawCall {
    pub is_indirect: i32,
    pub is_indexed: i32,
    pub count: u32,
    pub handle: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub stride: u32,
    pub infos: *const DrawCallInfo,
}
