//! VKVM: the Vulkan secondary-command-buffer backend (§4.5-§4.7).

pub mod command_fragment;
pub mod dispatch;
mod encoder;
pub mod indirect;
pub mod structs;
pub mod types;

pub use command_fragment::CommandFragment;
pub use dispatch::Vkvm;
pub use encoder::run as vm_run;
