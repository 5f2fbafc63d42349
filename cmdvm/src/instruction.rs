//! Opcode table and the fixed-size instruction record.
//!
//! Numbering follows the original GLVM/HGL opcode assignment exactly: it is
//! part of the external ABI and must not change (see commands.h equivalents
//! upstream of this crate).

/// Number of argument slots an [`Instruction`] carries. Unused slots are
/// zeroed by every `append*` call.
pub const MAX_ARGS: usize = 6;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OpCode {
    BindVertexArray = 1,
    BindProgram = 2,
    ActiveTexture = 3,
    BindSampler = 4,
    BindTexture = 5,
    BindBufferBase = 6,
    BindBufferRange = 7,
    BindFramebuffer = 8,
    Viewport = 9,
    Enable = 10,
    Disable = 11,
    DepthFunc = 12,
    CullFace = 13,
    BlendFuncSeparate = 14,
    BlendEquationSeparate = 15,
    BlendColor = 16,
    PolygonMode = 17,
    StencilFuncSeparate = 18,
    StencilOpSeparate = 19,
    PatchParameter = 20,
    DrawElements = 21,
    DrawArrays = 22,
    DrawElementsInstanced = 23,
    DrawArraysInstanced = 24,
    Clear = 25,
    BindImageTexture = 26,
    ClearColor = 27,
    ClearDepth = 28,
    GetError = 29,
    BindBuffer = 30,
    VertexAttribPointer = 31,
    VertexAttribDivisor = 32,
    EnableVertexAttribArray = 33,
    DisableVertexAttribArray = 34,
    Uniform1fv = 35,
    Uniform1iv = 36,
    Uniform2fv = 37,
    Uniform2iv = 38,
    Uniform3fv = 39,
    Uniform3iv = 40,
    Uniform4fv = 41,
    Uniform4iv = 42,
    UniformMatrix2fv = 43,
    UniformMatrix3fv = 44,
    UniformMatrix4fv = 45,
    TexParameteri = 46,
    TexParameterf = 47,
    VertexAttrib1f = 48,
    VertexAttrib2f = 49,
    VertexAttrib3f = 50,
    VertexAttrib4f = 51,
    MultiDrawArraysIndirect = 52,
    MultiDrawElementsIndirect = 53,
    DepthMask = 54,
    ColorMask = 55,
    StencilMask = 56,
    DrawBuffers = 57,

    HDrawArrays = 100,
    HDrawElements = 101,
    HDrawArraysIndirect = 102,
    HDrawElementsIndirect = 103,
    HSetDepthTest = 104,
    HSetDepthBias = 105,
    HSetCullFace = 106,
    HSetPolygonMode = 107,
    HSetBlendMode = 108,
    HSetStencilMode = 109,
    HSetConservativeRaster = 110,
    HSetMultisample = 111,
    HBindTextures = 112,
    HBindSamplers = 113,
    HBindVertexAttributes = 114,
}

impl OpCode {
    /// Reconstructs an opcode from its wire value. Returns `None` for any
    /// value not in the table; callers treat that as "unknown opcode" per
    /// the spec's diagnostic-and-skip error model.
    pub fn from_i32(v: i32) -> Option<OpCode> {
        use OpCode::*;
        Some(match v {
            1 => BindVertexArray,
            2 => BindProgram,
            3 => ActiveTexture,
            4 => BindSampler,
            5 => BindTexture,
            6 => BindBufferBase,
            7 => BindBufferRange,
            8 => BindFramebuffer,
            9 => Viewport,
            10 => Enable,
            11 => Disable,
            12 => DepthFunc,
            13 => CullFace,
            14 => BlendFuncSeparate,
            15 => BlendEquationSeparate,
            16 => BlendColor,
            17 => PolygonMode,
            18 => StencilFuncSeparate,
            19 => StencilOpSeparate,
            20 => PatchParameter,
            21 => DrawElements,
            22 => DrawArrays,
            23 => DrawElementsInstanced,
            24 => DrawArraysInstanced,
            25 => Clear,
            26 => BindImageTexture,
            27 => ClearColor,
            28 => ClearDepth,
            29 => GetError,
            30 => BindBuffer,
            31 => VertexAttribPointer,
            32 => VertexAttribDivisor,
            33 => EnableVertexAttribArray,
            34 => DisableVertexAttribArray,
            35 => Uniform1fv,
            36 => Uniform1iv,
            37 => Uniform2fv,
            38 => Uniform2iv,
            39 => Uniform3fv,
            40 => Uniform3iv,
            41 => Uniform4fv,
            42 => Uniform4iv,
            43 => UniformMatrix2fv,
            44 => UniformMatrix3fv,
            45 => UniformMatrix4fv,
            46 => TexParameteri,
            47 => TexParameterf,
            48 => VertexAttrib1f,
            49 => VertexAttrib2f,
            50 => VertexAttrib3f,
            51 => VertexAttrib4f,
            52 => MultiDrawArraysIndirect,
            53 => MultiDrawElementsIndirect,
            54 => DepthMask,
            55 => ColorMask,
            56 => StencilMask,
            57 => DrawBuffers,
            100 => HDrawArrays,
            101 => HDrawElements,
            102 => HDrawArraysIndirect,
            103 => HDrawElementsIndirect,
            104 => HSetDepthTest,
            105 => HSetDepthBias,
            106 => HSetCullFace,
            107 => HSetPolygonMode,
            108 => HSetBlendMode,
            109 => HSetStencilMode,
            110 => HSetConservativeRaster,
            111 => HSetMultisample,
            112 => HBindTextures,
            113 => HBindSamplers,
            114 => HBindVertexAttributes,
            _ => return None,
        })
    }

    /// Whether this opcode is consulted by the redundancy cache (§4.3). All
    /// H-commands and non-cacheable low opcodes always emit.
    pub fn is_cacheable(&self) -> bool {
        use OpCode::*;
        matches!(
            self,
            BindVertexArray
                | BindProgram
                | ActiveTexture
                | BindSampler
                | BindTexture
                | BindBufferBase
                | BindBufferRange
                | Enable
                | Disable
                | DepthFunc
                | CullFace
                | DepthMask
                | StencilMask
                | PolygonMode
                | BlendFuncSeparate
                | BlendEquationSeparate
                | BlendColor
                | StencilFuncSeparate
                | StencilOpSeparate
                | PatchParameter
                | ColorMask
                | DrawBuffers
        )
    }
}

/// A pointer-wide argument slot. Reinterpreted as pointer, integer, enum, or
/// (via [`Instruction::arg_f32`]) the bit pattern of a 32-bit float.
pub type Arg = isize;

/// A single recorded operation: an opcode plus up to [`MAX_ARGS`] arguments.
/// Value-typed and immutable once appended to a [`crate::program::Block`].
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub code: OpCode,
    pub args: [Arg; MAX_ARGS],
}

impl Instruction {
    pub fn new(code: OpCode, args: [Arg; MAX_ARGS]) -> Instruction {
        Instruction { code, args }
    }

    pub fn arg_ptr(&self, i: usize) -> *mut std::ffi::c_void {
        self.args[i] as *mut std::ffi::c_void
    }

    pub fn arg_u32(&self, i: usize) -> u32 {
        self.args[i] as u32
    }

    pub fn arg_i32(&self, i: usize) -> i32 {
        self.args[i] as i32
    }

    pub fn arg_usize(&self, i: usize) -> usize {
        self.args[i] as usize
    }

    pub fn arg_bool(&self, i: usize) -> bool {
        self.args[i] != 0
    }

    /// Reinterprets the low 32 bits of the slot as an IEEE-754 float, per
    /// the data model's "pointer-wide integer reinterpretable...via bitwise
    /// reinterpretation" rule.
    pub fn arg_f32(&self, i: usize) -> f32 {
        f32::from_bits(self.args[i] as u32)
    }
}

/// Packs an `f32` into an [`Arg`] slot using the same bitwise convention
/// [`Instruction::arg_f32`] unpacks it with. Used by tests that build
/// instructions carrying float arguments (e.g. `BlendColor`).
pub fn pack_f32(v: f32) -> Arg {
    v.to_bits() as Arg
}
