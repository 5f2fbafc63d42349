//! Vulkan opcode table and packed-record layout (§4.5, §4.5.1, §6.2).

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VkOpCode {
    BindPipeline = 1,
    SetViewport = 2,
    SetScissor = 3,
    SetLineWidth = 4,
    SetDepthBias = 5,
    SetBlendConstants = 6,
    SetDepthBounds = 7,
    SetStencilCompareMask = 8,
    SetStencilWriteMask = 9,
    SetStencilReference = 10,
    BindDescriptorSets = 11,
    BindIndexBuffer = 12,
    BindVertexBuffers = 13,
    Draw = 14,
    DrawIndexed = 15,
    DrawIndirect = 16,
    DrawIndexedIndirect = 17,
    Dispatch = 18,
    DispatchIndirect = 19,
    CopyBuffer = 20,
    CopyImage = 21,
    BlitImage = 22,
    CopyBufferToImage = 23,
    CopyImageToBuffer = 24,
    UpdateBuffer = 25,
    FillBuffer = 26,
    ClearColorImage = 27,
    ClearDepthStencilImage = 28,
    ClearAttachments = 29,
    ResolveImage = 30,
    SetEvent = 31,
    ResetEvent = 32,
    WaitEvents = 33,
    PipelineBarrier = 34,
    BeginQuery = 35,
    EndQuery = 36,
    ResetQueryPool = 37,
    WriteTimestamp = 38,
    CopyQueryPoolResults = 39,
    PushConstants = 40,
    BeginRenderPass = 41,
    NextSubpass = 42,
    EndRenderPass = 43,
    ExecuteCommands = 44,

    CallFragment = 100,
    Custom = 101,

    IndirectBindPipeline = 110,
    IndirectBindDescriptorSets = 111,
    IndirectBindIndexBuffer = 112,
    IndirectBindVertexBuffers = 113,
    IndirectDraw = 114,
}

impl VkOpCode {
    pub fn from_u32(v: u32) -> Option<VkOpCode> {
        use VkOpCode::*;
        Some(match v {
            1 => BindPipeline,
            2 => SetViewport,
            3 => SetScissor,
            4 => SetLineWidth,
            5 => SetDepthBias,
            6 => SetBlendConstants,
            7 => SetDepthBounds,
            8 => SetStencilCompareMask,
            9 => SetStencilWriteMask,
            10 => SetStencilReference,
            11 => BindDescriptorSets,
            12 => BindIndexBuffer,
            13 => BindVertexBuffers,
            14 => Draw,
            15 => DrawIndexed,
            16 => DrawIndirect,
            17 => DrawIndexedIndirect,
            18 => Dispatch,
            19 => DispatchIndirect,
            20 => CopyBuffer,
            21 => CopyImage,
            22 => BlitImage,
            23 => CopyBufferToImage,
            24 => CopyImageToBuffer,
            25 => UpdateBuffer,
            26 => FillBuffer,
            27 => ClearColorImage,
            28 => ClearDepthStencilImage,
            29 => ClearAttachments,
            30 => ResolveImage,
            31 => SetEvent,
            32 => ResetEvent,
            33 => WaitEvents,
            34 => PipelineBarrier,
            35 => BeginQuery,
            36 => EndQuery,
            37 => ResetQueryPool,
            38 => WriteTimestamp,
            39 => CopyQueryPoolResults,
            40 => PushConstants,
            41 => BeginRenderPass,
            42 => NextSubpass,
            43 => EndRenderPass,
            44 => ExecuteCommands,
            100 => CallFragment,
            101 => Custom,
            110 => IndirectBindPipeline,
            111 => IndirectBindDescriptorSets,
            112 => IndirectBindIndexBuffer,
            113 => IndirectBindVertexBuffers,
            114 => IndirectDraw,
            _ => return None,
        })
    }
}

/// Header of one packed record (§6.2): `length` is the total record size in
/// bytes including this header, `opcode` identifies the payload layout that
/// follows immediately after.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub length: u32,
    pub opcode: u32,
}

/// Reconstructs an absolute pointer from a record-relative byte offset.
/// A zero offset means null (§6.2). `record_base` must point at the start
/// of the `length` field of the record the offset was taken from.
///
/// # Safety
/// `record_base` must be valid and `offset` must have been produced by the
/// same encoding convention used when the record was packed.
pub unsafe fn offset_ptr(record_base: *const u8, offset: u32) -> *const u8 {
    if offset == 0 {
        std::ptr::null()
    } else {
        record_base.add(offset as usize)
    }
}
