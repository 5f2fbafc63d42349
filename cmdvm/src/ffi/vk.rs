//! C-ABI surface over the Vulkan-side safe core (§6.1, §4.7).

use crate::vk::command_fragment::CommandFragment;
use crate::vk::dispatch::Vkvm;
use ash::vk;
use std::os::raw::c_int;

/// Resolves the Vulkan dispatch table and returns an opaque handle via
/// `out_vkvm`. Returns 0 if every entry point resolved, -1 otherwise (the
/// handle is still written and still usable for resolved entries, per
/// §4.7 "still returned but initialization reports failure").
///
/// # Safety
/// `out_vkvm` must be valid for a pointer write. The returned handle must
/// be released with `vkvmFree`.
#[no_mangle]
pub unsafe extern "C" fn vkvmInit(
    device: vk::Device,
    get_proc: vk::PFN_vkGetDeviceProcAddr,
    out_vkvm: *mut *mut Vkvm,
) -> c_int {
    let (table, result) = Vkvm::init(device, get_proc);
    *out_vkvm = Box::into_raw(Box::new(table));
    if result.is_ok() {
        0
    } else {
        -1
    }
}

/// # Safety
/// `vkvm` must be a pointer returned by `vkvmInit`, not yet freed.
#[no_mangle]
pub unsafe extern "C" fn vkvmFree(vkvm: *mut Vkvm) {
    if !vkvm.is_null() {
        drop(Box::from_raw(vkvm));
    }
}

/// # Safety
/// `vkvm` and `fragment` must be live pointers from `vkvmInit`/the
/// recorder that packed `fragment` (§1); `cmd` must be a command buffer
/// currently recording.
#[no_mangle]
pub unsafe extern "C" fn vkvmRun(vkvm: *const Vkvm, cmd: vk::CommandBuffer, fragment: *const CommandFragment) {
    crate::vk::vm_run(&*vkvm, cmd, &*fragment);
}
