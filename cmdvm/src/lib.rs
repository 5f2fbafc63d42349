//! A pair of command-fragment virtual machines that record, link, and
//! replay graphics-API call sequences against two back-ends: a redundancy-
//! eliminating OpenGL interpreter (`gl`) and a Vulkan secondary-command-
//! buffer replay engine (`vk`). See `program` for the shared fragment/block
//! data model and `ffi` for the C-ABI entry points external recorders use
//! to drive either one.

pub mod error;
pub mod ffi;
pub mod gl;
pub mod instruction;
pub mod program;
pub mod vk;

pub use error::{CmdVmError, Result};
pub use instruction::{Arg, Instruction, OpCode, MAX_ARGS};
pub use program::{Block, Fragment};
