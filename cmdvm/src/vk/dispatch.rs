//! Vulkan dispatch table (§4.7).
//!
//! Unlike the GL table (`gl::dispatch`), this is resolved explicitly once
//! per logical device and handed to the caller as an `Arc`, matching
//! `thundr::Device`'s `Arc`-shared, post-init-immutable `ash::Device`: there
//! is no lazy/global slot here because a process may drive more than one
//! Vulkan device.

use ash::vk;
use cmdvm_utils::log::{error, info};
use std::ffi::CString;

macro_rules! load_pfn {
    ($get_proc:expr, $device:expr, $name:expr) => {{
        let cname = CString::new($name).unwrap();
        let raw = unsafe { $get_proc($device, cname.as_ptr()) };
        raw.map(|f| unsafe { std::mem::transmute_copy(&f) })
    }};
}

/// Loaded `vkCmd*` entry points for one logical device (§3 "Vulkan dispatch
/// table", §4.7). Every field is `Option`; a `None` after `init` means that
/// command family can never be recorded through this handle.
#[derive(Default)]
pub struct Vkvm {
    pub bind_pipeline: Option<vk::PFN_vkCmdBindPipeline>,
    pub set_viewport: Option<vk::PFN_vkCmdSetViewport>,
    pub set_scissor: Option<vk::PFN_vkCmdSetScissor>,
    pub set_line_width: Option<vk::PFN_vkCmdSetLineWidth>,
    pub set_depth_bias: Option<vk::PFN_vkCmdSetDepthBias>,
    pub set_blend_constants: Option<vk::PFN_vkCmdSetBlendConstants>,
    pub set_depth_bounds: Option<vk::PFN_vkCmdSetDepthBounds>,
    pub set_stencil_compare_mask: Option<vk::PFN_vkCmdSetStencilCompareMask>,
    pub set_stencil_write_mask: Option<vk::PFN_vkCmdSetStencilWriteMask>,
    pub set_stencil_reference: Option<vk::PFN_vkCmdSetStencilReference>,
    pub bind_descriptor_sets: Option<vk::PFN_vkCmdBindDescriptorSets>,
    pub bind_index_buffer: Option<vk::PFN_vkCmdBindIndexBuffer>,
    pub bind_vertex_buffers: Option<vk::PFN_vkCmdBindVertexBuffers>,
    pub draw: Option<vk::PFN_vkCmdDraw>,
    pub draw_indexed: Option<vk::PFN_vkCmdDrawIndexed>,
    pub draw_indirect: Option<vk::PFN_vkCmdDrawIndirect>,
    pub draw_indexed_indirect: Option<vk::PFN_vkCmdDrawIndexedIndirect>,
    pub dispatch: Option<vk::PFN_vkCmdDispatch>,
    pub dispatch_indirect: Option<vk::PFN_vkCmdDispatchIndirect>,
    pub copy_buffer: Option<vk::PFN_vkCmdCopyBuffer>,
    pub copy_image: Option<vk::PFN_vkCmdCopyImage>,
    pub blit_image: Option<vk::PFN_vkCmdBlitImage>,
    pub copy_buffer_to_image: Option<vk::PFN_vkCmdCopyBufferToImage>,
    pub copy_image_to_buffer: Option<vk::PFN_vkCmdCopyImageToBuffer>,
    pub update_buffer: Option<vk::PFN_vkCmdUpdateBuffer>,
    pub fill_buffer: Option<vk::PFN_vkCmdFillBuffer>,
    pub clear_color_image: Option<vk::PFN_vkCmdClearColorImage>,
    pub clear_depth_stencil_image: Option<vk::PFN_vkCmdClearDepthStencilImage>,
    pub clear_attachments: Option<vk::PFN_vkCmdClearAttachments>,
    pub resolve_image: Option<vk::PFN_vkCmdResolveImage>,
    pub set_event: Option<vk::PFN_vkCmdSetEvent>,
    pub reset_event: Option<vk::PFN_vkCmdResetEvent>,
    pub wait_events: Option<vk::PFN_vkCmdWaitEvents>,
    pub pipeline_barrier: Option<vk::PFN_vkCmdPipelineBarrier>,
    pub begin_query: Option<vk::PFN_vkCmdBeginQuery>,
    pub end_query: Option<vk::PFN_vkCmdEndQuery>,
    pub reset_query_pool: Option<vk::PFN_vkCmdResetQueryPool>,
    pub write_timestamp: Option<vk::PFN_vkCmdWriteTimestamp>,
    pub copy_query_pool_results: Option<vk::PFN_vkCmdCopyQueryPoolResults>,
    pub push_constants: Option<vk::PFN_vkCmdPushConstants>,
    pub begin_render_pass: Option<vk::PFN_vkCmdBeginRenderPass>,
    pub next_subpass: Option<vk::PFN_vkCmdNextSubpass>,
    pub end_render_pass: Option<vk::PFN_vkCmdEndRenderPass>,
    pub execute_commands: Option<vk::PFN_vkCmdExecuteCommands>,
}

impl Vkvm {
    /// Resolves every entry point through `get_proc` against `device`. The
    /// handle is returned regardless of outcome (§4.7 "still returned but
    /// initialization reports failure"); callers must check the `Result`
    /// before replaying.
    pub fn init(
        device: vk::Device,
        get_proc: vk::PFN_vkGetDeviceProcAddr,
    ) -> (Vkvm, crate::error::Result<()>) {
        let mut t = Vkvm::default();
        t.bind_pipeline = load_pfn!(get_proc, device, "vkCmdBindPipeline");
        t.set_viewport = load_pfn!(get_proc, device, "vkCmdSetViewport");
        t.set_scissor = load_pfn!(get_proc, device, "vkCmdSetScissor");
        t.set_line_width = load_pfn!(get_proc, device, "vkCmdSetLineWidth");
        t.set_depth_bias = load_pfn!(get_proc, device, "vkCmdSetDepthBias");
        t.set_blend_constants = load_pfn!(get_proc, device, "vkCmdSetBlendConstants");
        t.set_depth_bounds = load_pfn!(get_proc, device, "vkCmdSetDepthBounds");
        t.set_stencil_compare_mask = load_pfn!(get_proc, device, "vkCmdSetStencilCompareMask");
        t.set_stencil_write_mask = load_pfn!(get_proc, device, "vkCmdSetStencilWriteMask");
        t.set_stencil_reference = load_pfn!(get_proc, device, "vkCmdSetStencilReference");
        t.bind_descriptor_sets = load_pfn!(get_proc, device, "vkCmdBindDescriptorSets");
        t.bind_index_buffer = load_pfn!(get_proc, device, "vkCmdBindIndexBuffer");
        t.bind_vertex_buffers = load_pfn!(get_proc, device, "vkCmdBindVertexBuffers");
        t.draw = load_pfn!(get_proc, device, "vkCmdDraw");
        t.draw_indexed = load_pfn!(get_proc, device, "vkCmdDrawIndexed");
        t.draw_indirect = load_pfn!(get_proc, device, "vkCmdDrawIndirect");
        t.draw_indexed_indirect = load_pfn!(get_proc, device, "vkCmdDrawIndexedIndirect");
        t.dispatch = load_pfn!(get_proc, device, "vkCmdDispatch");
        t.dispatch_indirect = load_pfn!(get_proc, device, "vkCmdDispatchIndirect");
        t.copy_buffer = load_pfn!(get_proc, device, "vkCmdCopyBuffer");
        t.copy_image = load_pfn!(get_proc, device, "vkCmdCopyImage");
        t.blit_image = load_pfn!(get_proc, device, "vkCmdBlitImage");
        t.copy_buffer_to_image = load_pfn!(get_proc, device, "vkCmdCopyBufferToImage");
        t.copy_image_to_buffer = load_pfn!(get_proc, device, "vkCmdCopyImageToBuffer");
        t.update_buffer = load_pfn!(get_proc, device, "vkCmdUpdateBuffer");
        t.fill_buffer = load_pfn!(get_proc, device, "vkCmdFillBuffer");
        t.clear_color_image = load_pfn!(get_proc, device, "vkCmdClearColorImage");
        t.clear_depth_stencil_image = load_pfn!(get_proc, device, "vkCmdClearDepthStencilImage");
        t.clear_attachments = load_pfn!(get_proc, device, "vkCmdClearAttachments");
        t.resolve_image = load_pfn!(get_proc, device, "vkCmdResolveImage");
        t.set_event = load_pfn!(get_proc, device, "vkCmdSetEvent");
        t.reset_event = load_pfn!(get_proc, device, "vkCmdResetEvent");
        t.wait_events = load_pfn!(get_proc, device, "vkCmdWaitEvents");
        t.pipeline_barrier = load_pfn!(get_proc, device, "vkCmdPipelineBarrier");
        t.begin_query = load_pfn!(get_proc, device, "vkCmdBeginQuery");
        t.end_query = load_pfn!(get_proc, device, "vkCmdEndQuery");
        t.reset_query_pool = load_pfn!(get_proc, device, "vkCmdResetQueryPool");
        t.write_timestamp = load_pfn!(get_proc, device, "vkCmdWriteTimestamp");
        t.copy_query_pool_results = load_pfn!(get_proc, device, "vkCmdCopyQueryPoolResults");
        t.push_constants = load_pfn!(get_proc, device, "vkCmdPushConstants");
        t.begin_render_pass = load_pfn!(get_proc, device, "vkCmdBeginRenderPass");
        t.next_subpass = load_pfn!(get_proc, device, "vkCmdNextSubpass");
        t.end_render_pass = load_pfn!(get_proc, device, "vkCmdEndRenderPass");
        t.execute_commands = load_pfn!(get_proc, device, "vkCmdExecuteCommands");

        let ok = t.draw.is_some() && t.bind_pipeline.is_some() && t.pipeline_barrier.is_some();
        if !ok {
            error!("VKVM: one or more required vkCmd* entry points failed to resolve");
            (t, Err(crate::error::CmdVmError::DispatchLoadFailed))
        } else {
            info!("VKVM: dispatch table resolved");
            (t, Ok(()))
        }
    }
}
