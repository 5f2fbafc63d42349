//! Vulkan command encoder (§4.5): walks a fragment chain's packed byte
//! records and replays them as `vkCmd*` calls through the resolved
//! dispatch table.

use super::command_fragment::CommandFragment;
use super::dispatch::Vkvm;
use super::indirect;
use super::structs::{
    IndirectBindDescriptorSetsBinding, IndirectBindIndexBufferBinding,
    IndirectBindPipelineBinding, IndirectBindVertexBuffersBinding, IndirectDrawCall, RuntimeStats,
};
use super::types::{offset_ptr, RecordHeader, VkOpCode};
use ash::vk;
use cmdvm_utils::log::error;

#[allow(non_camel_case_types)]
#[repr(C)]
struct BindPipelinePayload {
    bind_point: vk::PipelineBindPoint,
    pipeline: vk::Pipeline,
}

#[repr(C)]
struct BindIndexBufferPayload {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    index_type: vk::IndexType,
}

#[repr(C)]
struct BindVertexBuffersPayload {
    first_binding: u32,
    binding_count: u32,
    buffers_offset: u32,
    offsets_offset: u32,
}

#[repr(C)]
struct DrawPayload {
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
}

#[repr(C)]
struct DrawIndexedPayload {
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    vertex_offset: i32,
    first_instance: u32,
}

#[repr(C)]
struct DrawIndirectPayload {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    draw_count: u32,
    stride: u32,
}

#[repr(C)]
struct DispatchPayload {
    x: u32,
    y: u32,
    z: u32,
}

#[repr(C)]
struct DispatchIndirectPayload {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
}

#[repr(C)]
struct PushConstantsPayload {
    layout: vk::PipelineLayout,
    stage_flags: vk::ShaderStageFlags,
    offset: u32,
    size: u32,
    values_offset: u32,
}

#[repr(C)]
struct StencilFaceValuePayload {
    face_mask: vk::StencilFaceFlags,
    value: u32,
}

#[repr(C)]
struct ExecuteCommandsPayload {
    count: u32,
    buffers_offset: u32,
}

#[repr(C)]
struct CallFragmentPayload {
    fragment: *const CommandFragment,
}

#[repr(C)]
struct CustomPayload {
    func: Option<unsafe extern "C" fn(vk::CommandBuffer, *mut std::ffi::c_void)>,
    user_data: *mut std::ffi::c_void,
}

#[repr(C)]
struct IndirectPayload {
    binding_offset: u32,
}

/// Per-replay encoder state (§4.5 "a tiny state `{ last_pipeline }`").
#[derive(Default)]
struct EncoderState {
    last_pipeline: vk::Pipeline,
}

/// Replays `frag` and its chain against `cmd` (§4.5, §6.1 Vulkan `vmRun`).
pub fn run(vkvm: &Vkvm, cmd: vk::CommandBuffer, frag: &CommandFragment) {
    let mut state = EncoderState::default();
    #[cfg(debug_assertions)]
    let mut visited = std::collections::HashSet::new();
    run_chain(
        vkvm,
        cmd,
        frag,
        &mut state,
        #[cfg(debug_assertions)]
        &mut visited,
    );
}

fn run_chain(
    vkvm: &Vkvm,
    cmd: vk::CommandBuffer,
    frag: &CommandFragment,
    state: &mut EncoderState,
    #[cfg(debug_assertions)] visited: &mut std::collections::HashSet<usize>,
) {
    #[cfg(debug_assertions)]
    {
        if !visited.insert(frag.identity()) {
            error!("VKVM: cycle detected in fragment chain, aborting traversal");
            return;
        }
    }

    run_one(vkvm, cmd, frag, state);

    if let Some(next) = unsafe { frag.next.as_ref() } {
        run_chain(
            vkvm,
            cmd,
            next,
            state,
            #[cfg(debug_assertions)]
            visited,
        );
    }
}

fn run_one(vkvm: &Vkvm, cmd: vk::CommandBuffer, frag: &CommandFragment, state: &mut EncoderState) {
    let mut cursor = frag.commands;
    for _ in 0..frag.command_count {
        if cursor.is_null() {
            break;
        }
        let header = unsafe { &*(cursor as *const RecordHeader) };
        let opcode = match VkOpCode::from_u32(header.opcode) {
            Some(op) => op,
            None => {
                error!("VKVM: unknown instruction code: {}", header.opcode);
                cursor = unsafe { cursor.add(header.length as usize) };
                continue;
            }
        };
        let payload = unsafe { cursor.add(8) };
        run_record(vkvm, cmd, state, opcode, cursor, payload);
        cursor = unsafe { cursor.add(header.length as usize) };
    }
}

fn run_record(
    vkvm: &Vkvm,
    cmd: vk::CommandBuffer,
    state: &mut EncoderState,
    opcode: VkOpCode,
    record_base: *const u8,
    payload: *const u8,
) {
    use VkOpCode::*;
    match opcode {
        BindPipeline => {
            let p = unsafe { &*(payload as *const BindPipelinePayload) };
            if let Some(f) = vkvm.bind_pipeline {
                unsafe { f(cmd, p.bind_point, p.pipeline) }
            }
        }
        SetViewport => {
            #[repr(C)]
            struct P {
                first_viewport: u32,
                count: u32,
                viewports_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let viewports = unsafe { offset_ptr(record_base, p.viewports_offset) } as *const vk::Viewport;
            if let Some(f) = vkvm.set_viewport {
                unsafe { f(cmd, p.first_viewport, p.count, viewports) }
            }
        }
        SetScissor => {
            #[repr(C)]
            struct P {
                first_scissor: u32,
                count: u32,
                scissors_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let scissors = unsafe { offset_ptr(record_base, p.scissors_offset) } as *const vk::Rect2D;
            if let Some(f) = vkvm.set_scissor {
                unsafe { f(cmd, p.first_scissor, p.count, scissors) }
            }
        }
        BindDescriptorSets => {
            #[repr(C)]
            struct P {
                bind_point: vk::PipelineBindPoint,
                layout: vk::PipelineLayout,
                first_set: u32,
                set_count: u32,
                sets_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            if p.set_count == 0 {
                return;
            }
            let sets = unsafe { offset_ptr(record_base, p.sets_offset) } as *const vk::DescriptorSet;
            if let Some(f) = vkvm.bind_descriptor_sets {
                unsafe { f(cmd, p.bind_point, p.layout, p.first_set, p.set_count, sets, 0, std::ptr::null()) }
            }
        }
        SetLineWidth => {
            let width = unsafe { *(payload as *const f32) };
            if let Some(f) = vkvm.set_line_width {
                unsafe { f(cmd, width) }
            }
        }
        SetDepthBias => {
            #[repr(C)]
            struct P {
                constant: f32,
                clamp: f32,
                slope: f32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.set_depth_bias {
                unsafe { f(cmd, p.constant, p.clamp, p.slope) }
            }
        }
        SetBlendConstants => {
            let c = payload as *const f32;
            if let Some(f) = vkvm.set_blend_constants {
                unsafe { f(cmd, c) }
            }
        }
        SetDepthBounds => {
            #[repr(C)]
            struct P {
                min: f32,
                max: f32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.set_depth_bounds {
                unsafe { f(cmd, p.min, p.max) }
            }
        }
        SetStencilCompareMask => {
            let p = unsafe { &*(payload as *const StencilFaceValuePayload) };
            if let Some(f) = vkvm.set_stencil_compare_mask {
                unsafe { f(cmd, p.face_mask, p.value) }
            }
        }
        SetStencilWriteMask => {
            let p = unsafe { &*(payload as *const StencilFaceValuePayload) };
            if let Some(f) = vkvm.set_stencil_write_mask {
                unsafe { f(cmd, p.face_mask, p.value) }
            }
        }
        SetStencilReference => {
            let p = unsafe { &*(payload as *const StencilFaceValuePayload) };
            if let Some(f) = vkvm.set_stencil_reference {
                unsafe { f(cmd, p.face_mask, p.value) }
            }
        }
        BindIndexBuffer => {
            let p = unsafe { &*(payload as *const BindIndexBufferPayload) };
            if let Some(f) = vkvm.bind_index_buffer {
                unsafe { f(cmd, p.buffer, p.offset, p.index_type) }
            }
        }
        BindVertexBuffers => {
            let p = unsafe { &*(payload as *const BindVertexBuffersPayload) };
            if p.binding_count == 0 {
                return;
            }
            let buffers = unsafe { offset_ptr(record_base, p.buffers_offset) } as *const vk::Buffer;
            let offsets = unsafe { offset_ptr(record_base, p.offsets_offset) } as *const vk::DeviceSize;
            if let Some(f) = vkvm.bind_vertex_buffers {
                unsafe { f(cmd, p.first_binding, p.binding_count, buffers, offsets) }
            }
        }
        Draw => {
            let p = unsafe { &*(payload as *const DrawPayload) };
            if let Some(f) = vkvm.draw {
                unsafe { f(cmd, p.vertex_count, p.instance_count, p.first_vertex, p.first_instance) }
            }
        }
        DrawIndexed => {
            let p = unsafe { &*(payload as *const DrawIndexedPayload) };
            if let Some(f) = vkvm.draw_indexed {
                unsafe {
                    f(
                        cmd,
                        p.index_count,
                        p.instance_count,
                        p.first_index,
                        p.vertex_offset,
                        p.first_instance,
                    )
                }
            }
        }
        DrawIndirect => {
            let p = unsafe { &*(payload as *const DrawIndirectPayload) };
            if let Some(f) = vkvm.draw_indirect {
                unsafe { f(cmd, p.buffer, p.offset, p.draw_count, p.stride) }
            }
        }
        DrawIndexedIndirect => {
            let p = unsafe { &*(payload as *const DrawIndirectPayload) };
            if let Some(f) = vkvm.draw_indexed_indirect {
                unsafe { f(cmd, p.buffer, p.offset, p.draw_count, p.stride) }
            }
        }
        Dispatch => {
            let p = unsafe { &*(payload as *const DispatchPayload) };
            if let Some(f) = vkvm.dispatch {
                unsafe { f(cmd, p.x, p.y, p.z) }
            }
        }
        DispatchIndirect => {
            let p = unsafe { &*(payload as *const DispatchIndirectPayload) };
            if let Some(f) = vkvm.dispatch_indirect {
                unsafe { f(cmd, p.buffer, p.offset) }
            }
        }
        PushConstants => {
            let p = unsafe { &*(payload as *const PushConstantsPayload) };
            let values = unsafe { offset_ptr(record_base, p.values_offset) } as *const std::ffi::c_void;
            if let Some(f) = vkvm.push_constants {
                unsafe { f(cmd, p.layout, p.stage_flags, p.offset, p.size, values) }
            }
        }
        ExecuteCommands => {
            let p = unsafe { &*(payload as *const ExecuteCommandsPayload) };
            let buffers = unsafe { offset_ptr(record_base, p.buffers_offset) } as *const vk::CommandBuffer;
            if let Some(f) = vkvm.execute_commands {
                unsafe { f(cmd, p.count, buffers) }
            }
        }
        CallFragment => {
            let p = unsafe { &*(payload as *const CallFragmentPayload) };
            if let Some(inner) = unsafe { p.fragment.as_ref() } {
                #[cfg(debug_assertions)]
                {
                    // Fresh `run` call: a nested fragment chain re-enters with
                    // its own cycle guard rooted at `inner`, consistent with
                    // "recursively run another fragment chain with the same
                    // encoder state. Cycle guard in debug." (§4.5)
                    run_inner_with_guard(vkvm, cmd, inner, state);
                }
                #[cfg(not(debug_assertions))]
                {
                    run_one(vkvm, cmd, inner, state);
                    if let Some(next) = unsafe { inner.next.as_ref() } {
                        run_one(vkvm, cmd, next, state);
                    }
                }
            }
        }
        Custom => {
            let p = unsafe { &*(payload as *const CustomPayload) };
            if let Some(f) = p.func {
                unsafe { f(cmd, p.user_data) }
            }
        }
        IndirectBindPipeline => {
            let p = unsafe { &*(payload as *const IndirectPayload) };
            let binding = unsafe { offset_ptr(record_base, p.binding_offset) } as *const IndirectBindPipelineBinding;
            if let Some(b) = unsafe { binding.as_ref() } {
                if b.pipeline != state.last_pipeline {
                    if let Some(f) = vkvm.bind_pipeline {
                        unsafe { f(cmd, b.bind_point, b.pipeline) }
                    }
                    state.last_pipeline = b.pipeline;
                }
            }
        }
        IndirectBindDescriptorSets => {
            let p = unsafe { &*(payload as *const IndirectPayload) };
            let binding =
                unsafe { offset_ptr(record_base, p.binding_offset) } as *const IndirectBindDescriptorSetsBinding;
            if let Some(b) = unsafe { binding.as_ref() } {
                indirect::bind_descriptor_sets(vkvm, cmd, b);
            }
        }
        IndirectBindIndexBuffer => {
            let p = unsafe { &*(payload as *const IndirectPayload) };
            let binding =
                unsafe { offset_ptr(record_base, p.binding_offset) } as *const IndirectBindIndexBufferBinding;
            if let Some(b) = unsafe { binding.as_ref() } {
                indirect::bind_index_buffer(vkvm, cmd, b);
            }
        }
        IndirectBindVertexBuffers => {
            let p = unsafe { &*(payload as *const IndirectPayload) };
            let binding =
                unsafe { offset_ptr(record_base, p.binding_offset) } as *const IndirectBindVertexBuffersBinding;
            if let Some(b) = unsafe { binding.as_ref() } {
                indirect::bind_vertex_buffers(vkvm, cmd, b);
            }
        }
        IndirectDraw => {
            #[repr(C)]
            struct P {
                stats_offset: u32,
                is_active_offset: u32,
                call_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let stats = unsafe { offset_ptr(record_base, p.stats_offset) } as *mut RuntimeStats;
            let is_active = unsafe { offset_ptr(record_base, p.is_active_offset) } as *const i32;
            let call = unsafe { offset_ptr(record_base, p.call_offset) } as *const IndirectDrawCall;
            if let Some(c) = unsafe { call.as_ref() } {
                indirect::draw(vkvm, cmd, stats, is_active, c);
            }
        }
        CopyBuffer => {
            #[repr(C)]
            struct P {
                src_buffer: vk::Buffer,
                dst_buffer: vk::Buffer,
                region_count: u32,
                regions_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::BufferCopy;
            if let Some(f) = vkvm.copy_buffer {
                unsafe { f(cmd, p.src_buffer, p.dst_buffer, p.region_count, regions) }
            }
        }
        CopyImage => {
            #[repr(C)]
            struct P {
                src_image: vk::Image,
                src_layout: vk::ImageLayout,
                dst_image: vk::Image,
                dst_layout: vk::ImageLayout,
                region_count: u32,
                regions_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::ImageCopy;
            if let Some(f) = vkvm.copy_image {
                unsafe { f(cmd, p.src_image, p.src_layout, p.dst_image, p.dst_layout, p.region_count, regions) }
            }
        }
        BlitImage => {
            #[repr(C)]
            struct P {
                src_image: vk::Image,
                src_layout: vk::ImageLayout,
                dst_image: vk::Image,
                dst_layout: vk::ImageLayout,
                region_count: u32,
                regions_offset: u32,
                filter: vk::Filter,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::ImageBlit;
            if let Some(f) = vkvm.blit_image {
                unsafe {
                    f(
                        cmd,
                        p.src_image,
                        p.src_layout,
                        p.dst_image,
                        p.dst_layout,
                        p.region_count,
                        regions,
                        p.filter,
                    )
                }
            }
        }
        CopyBufferToImage => {
            #[repr(C)]
            struct P {
                src_buffer: vk::Buffer,
                dst_image: vk::Image,
                dst_layout: vk::ImageLayout,
                region_count: u32,
                regions_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::BufferImageCopy;
            if let Some(f) = vkvm.copy_buffer_to_image {
                unsafe { f(cmd, p.src_buffer, p.dst_image, p.dst_layout, p.region_count, regions) }
            }
        }
        CopyImageToBuffer => {
            #[repr(C)]
            struct P {
                src_image: vk::Image,
                src_layout: vk::ImageLayout,
                dst_buffer: vk::Buffer,
                region_count: u32,
                regions_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::BufferImageCopy;
            if let Some(f) = vkvm.copy_image_to_buffer {
                unsafe { f(cmd, p.src_image, p.src_layout, p.dst_buffer, p.region_count, regions) }
            }
        }
        UpdateBuffer => {
            #[repr(C)]
            struct P {
                dst_buffer: vk::Buffer,
                dst_offset: vk::DeviceSize,
                data_size: vk::DeviceSize,
                data_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let data = unsafe { offset_ptr(record_base, p.data_offset) } as *const std::ffi::c_void;
            if let Some(f) = vkvm.update_buffer {
                unsafe { f(cmd, p.dst_buffer, p.dst_offset, p.data_size, data) }
            }
        }
        FillBuffer => {
            #[repr(C)]
            struct P {
                dst_buffer: vk::Buffer,
                dst_offset: vk::DeviceSize,
                size: vk::DeviceSize,
                data: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.fill_buffer {
                unsafe { f(cmd, p.dst_buffer, p.dst_offset, p.size, p.data) }
            }
        }
        ClearColorImage => {
            #[repr(C)]
            struct P {
                image: vk::Image,
                layout: vk::ImageLayout,
                color: vk::ClearColorValue,
                range_count: u32,
                ranges_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let ranges = unsafe { offset_ptr(record_base, p.ranges_offset) } as *const vk::ImageSubresourceRange;
            if let Some(f) = vkvm.clear_color_image {
                unsafe { f(cmd, p.image, p.layout, &p.color, p.range_count, ranges) }
            }
        }
        ClearDepthStencilImage => {
            #[repr(C)]
            struct P {
                image: vk::Image,
                layout: vk::ImageLayout,
                depth_stencil: vk::ClearDepthStencilValue,
                range_count: u32,
                ranges_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let ranges = unsafe { offset_ptr(record_base, p.ranges_offset) } as *const vk::ImageSubresourceRange;
            if let Some(f) = vkvm.clear_depth_stencil_image {
                unsafe { f(cmd, p.image, p.layout, &p.depth_stencil, p.range_count, ranges) }
            }
        }
        ClearAttachments => {
            #[repr(C)]
            struct P {
                attachment_count: u32,
                attachments_offset: u32,
                rect_count: u32,
                rects_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let attachments = unsafe { offset_ptr(record_base, p.attachments_offset) } as *const vk::ClearAttachment;
            let rects = unsafe { offset_ptr(record_base, p.rects_offset) } as *const vk::ClearRect;
            if let Some(f) = vkvm.clear_attachments {
                unsafe { f(cmd, p.attachment_count, attachments, p.rect_count, rects) }
            }
        }
        ResolveImage => {
            #[repr(C)]
            struct P {
                src_image: vk::Image,
                src_layout: vk::ImageLayout,
                dst_image: vk::Image,
                dst_layout: vk::ImageLayout,
                region_count: u32,
                regions_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let regions = unsafe { offset_ptr(record_base, p.regions_offset) } as *const vk::ImageResolve;
            if let Some(f) = vkvm.resolve_image {
                unsafe { f(cmd, p.src_image, p.src_layout, p.dst_image, p.dst_layout, p.region_count, regions) }
            }
        }
        SetEvent => {
            #[repr(C)]
            struct P {
                event: vk::Event,
                stage_mask: vk::PipelineStageFlags,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.set_event {
                unsafe { f(cmd, p.event, p.stage_mask) }
            }
        }
        ResetEvent => {
            #[repr(C)]
            struct P {
                event: vk::Event,
                stage_mask: vk::PipelineStageFlags,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.reset_event {
                unsafe { f(cmd, p.event, p.stage_mask) }
            }
        }
        WaitEvents => {
            #[repr(C)]
            struct P {
                event_count: u32,
                events_offset: u32,
                src_stage_mask: vk::PipelineStageFlags,
                dst_stage_mask: vk::PipelineStageFlags,
                memory_barrier_count: u32,
                memory_barriers_offset: u32,
                buffer_barrier_count: u32,
                buffer_barriers_offset: u32,
                image_barrier_count: u32,
                image_barriers_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let events = unsafe { offset_ptr(record_base, p.events_offset) } as *const vk::Event;
            let memory_barriers =
                unsafe { offset_ptr(record_base, p.memory_barriers_offset) } as *const vk::MemoryBarrier;
            let buffer_barriers =
                unsafe { offset_ptr(record_base, p.buffer_barriers_offset) } as *const vk::BufferMemoryBarrier;
            let image_barriers =
                unsafe { offset_ptr(record_base, p.image_barriers_offset) } as *const vk::ImageMemoryBarrier;
            if let Some(f) = vkvm.wait_events {
                unsafe {
                    f(
                        cmd,
                        p.event_count,
                        events,
                        p.src_stage_mask,
                        p.dst_stage_mask,
                        p.memory_barrier_count,
                        memory_barriers,
                        p.buffer_barrier_count,
                        buffer_barriers,
                        p.image_barrier_count,
                        image_barriers,
                    )
                }
            }
        }
        PipelineBarrier => {
            #[repr(C)]
            struct P {
                src_stage_mask: vk::PipelineStageFlags,
                dst_stage_mask: vk::PipelineStageFlags,
                dependency_flags: vk::DependencyFlags,
                memory_barrier_count: u32,
                memory_barriers_offset: u32,
                buffer_barrier_count: u32,
                buffer_barriers_offset: u32,
                image_barrier_count: u32,
                image_barriers_offset: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            let memory_barriers =
                unsafe { offset_ptr(record_base, p.memory_barriers_offset) } as *const vk::MemoryBarrier;
            let buffer_barriers =
                unsafe { offset_ptr(record_base, p.buffer_barriers_offset) } as *const vk::BufferMemoryBarrier;
            let image_barriers =
                unsafe { offset_ptr(record_base, p.image_barriers_offset) } as *const vk::ImageMemoryBarrier;
            if let Some(f) = vkvm.pipeline_barrier {
                unsafe {
                    f(
                        cmd,
                        p.src_stage_mask,
                        p.dst_stage_mask,
                        p.dependency_flags,
                        p.memory_barrier_count,
                        memory_barriers,
                        p.buffer_barrier_count,
                        buffer_barriers,
                        p.image_barrier_count,
                        image_barriers,
                    )
                }
            }
        }
        BeginQuery => {
            #[repr(C)]
            struct P {
                query_pool: vk::QueryPool,
                query: u32,
                flags: vk::QueryControlFlags,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.begin_query {
                unsafe { f(cmd, p.query_pool, p.query, p.flags) }
            }
        }
        EndQuery => {
            #[repr(C)]
            struct P {
                query_pool: vk::QueryPool,
                query: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.end_query {
                unsafe { f(cmd, p.query_pool, p.query) }
            }
        }
        ResetQueryPool => {
            #[repr(C)]
            struct P {
                query_pool: vk::QueryPool,
                first_query: u32,
                query_count: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.reset_query_pool {
                unsafe { f(cmd, p.query_pool, p.first_query, p.query_count) }
            }
        }
        WriteTimestamp => {
            #[repr(C)]
            struct P {
                pipeline_stage: vk::PipelineStageFlags,
                query_pool: vk::QueryPool,
                query: u32,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.write_timestamp {
                unsafe { f(cmd, p.pipeline_stage, p.query_pool, p.query) }
            }
        }
        CopyQueryPoolResults => {
            #[repr(C)]
            struct P {
                query_pool: vk::QueryPool,
                first_query: u32,
                query_count: u32,
                dst_buffer: vk::Buffer,
                dst_offset: vk::DeviceSize,
                stride: vk::DeviceSize,
                flags: vk::QueryResultFlags,
            }
            let p = unsafe { &*(payload as *const P) };
            if let Some(f) = vkvm.copy_query_pool_results {
                unsafe {
                    f(
                        cmd,
                        p.query_pool,
                        p.first_query,
                        p.query_count,
                        p.dst_buffer,
                        p.dst_offset,
                        p.stride,
                        p.flags,
                    )
                }
            }
        }
        BeginRenderPass => {
            #[repr(C)]
            struct P {
                render_pass: vk::RenderPass,
                framebuffer: vk::Framebuffer,
                render_area: vk::Rect2D,
                clear_value_count: u32,
                clear_values_offset: u32,
                contents: vk::SubpassContents,
            }
            let p = unsafe { &*(payload as *const P) };
            let clear_values = unsafe { offset_ptr(record_base, p.clear_values_offset) } as *const vk::ClearValue;
            let info = vk::RenderPassBeginInfo::builder()
                .render_pass(p.render_pass)
                .framebuffer(p.framebuffer)
                .render_area(p.render_area)
                .clear_values(unsafe { std::slice::from_raw_parts(clear_values, p.clear_value_count as usize) })
                .build();
            if let Some(f) = vkvm.begin_render_pass {
                unsafe { f(cmd, &info, p.contents) }
            }
        }
        NextSubpass => {
            let contents = unsafe { *(payload as *const vk::SubpassContents) };
            if let Some(f) = vkvm.next_subpass {
                unsafe { f(cmd, contents) }
            }
        }
        EndRenderPass => {
            let _ = (record_base, payload);
            if let Some(f) = vkvm.end_render_pass {
                unsafe { f(cmd) }
            }
        }
    }
}

#[cfg(debug_assertions)]
fn run_inner_with_guard(vkvm: &Vkvm, cmd: vk::CommandBuffer, inner: &CommandFragment, state: &mut EncoderState) {
    let mut visited = std::collections::HashSet::new();
    run_chain(vkvm, cmd, inner, state, &mut visited);
}

#[cfg(test)]
mod tests {
    use super::super::command_fragment::test_builder::Packer;
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CALLS: RefCell<Vec<String>> = RefCell::new(Vec::new());
    }

    fn record(msg: String) {
        CALLS.with(|c| c.borrow_mut().push(msg));
    }

    unsafe extern "system" fn mock_bind_pipeline(
        _cmd: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    ) {
        record(format!("bind_pipeline({:?},{:?})", bind_point, pipeline));
    }

    unsafe extern "system" fn mock_draw(
        _cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        record(format!(
            "draw({vertex_count},{instance_count},{first_vertex},{first_instance})"
        ));
    }

    fn mock_vkvm() -> Vkvm {
        let mut t = Vkvm::default();
        t.bind_pipeline = Some(mock_bind_pipeline);
        t.draw = Some(mock_draw);
        t
    }

    #[repr(C)]
    struct RawBindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    }

    #[repr(C)]
    struct RawDraw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    }

    fn as_bytes<T>(v: &T) -> &[u8] {
        unsafe { std::slice::from_raw_parts(v as *const T as *const u8, std::mem::size_of::<T>()) }
    }

    #[test]
    fn decodes_bind_pipeline_then_draw() {
        CALLS.with(|c| c.borrow_mut().clear());
        let bind = RawBindPipeline {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            pipeline: vk::Pipeline::from_raw(7),
        };
        let draw = RawDraw {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        };
        let mut packer = Packer::new();
        packer
            .push(VkOpCode::BindPipeline, as_bytes(&bind))
            .push(VkOpCode::Draw, as_bytes(&draw));
        let (bytes, count) = packer.into_bytes();

        let frag = unsafe { CommandFragment::new(count, bytes.as_ptr(), std::ptr::null()) };
        let vkvm = mock_vkvm();
        run(&vkvm, vk::CommandBuffer::null(), &frag);

        CALLS.with(|c| {
            let calls = c.borrow();
            assert_eq!(calls.len(), 2);
            assert!(calls[0].starts_with("bind_pipeline"));
            assert!(calls[1].starts_with("draw(3,1,0,0)"));
        });
    }

    #[test]
    fn indirect_bind_pipeline_suppresses_repeat() {
        CALLS.with(|c| c.borrow_mut().clear());
        let binding = super::super::structs::IndirectBindPipelineBinding {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            pipeline: vk::Pipeline::from_raw(9),
        };

        #[repr(C)]
        struct Rec {
            binding_offset: u32,
        }
        // binding lives right after this record's payload in the byte buffer
        let mut packer = Packer::new();
        let header_and_payload_len = 8 + std::mem::size_of::<Rec>();
        let rec = Rec {
            binding_offset: header_and_payload_len as u32,
        };
        let mut payload = as_bytes(&rec).to_vec();
        payload.extend_from_slice(as_bytes(&binding));
        packer.push(VkOpCode::IndirectBindPipeline, &payload);
        let (bytes, count) = packer.into_bytes();

        let frag = unsafe { CommandFragment::new(count, bytes.as_ptr(), std::ptr::null()) };
        let vkvm = mock_vkvm();
        let mut state = EncoderState::default();
        run_one(&vkvm, vk::CommandBuffer::null(), &frag, &mut state);
        run_one(&vkvm, vk::CommandBuffer::null(), &frag, &mut state);

        CALLS.with(|c| assert_eq!(c.borrow().len(), 1));
    }
}
