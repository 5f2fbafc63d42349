//! C-ABI surface over the GL-side safe core (§6.1). Thin wrappers only: all
//! behavior lives in [`crate::program`], [`crate::gl`]; this module's job is
//! pointer/arity translation at the boundary, mirroring how `thundr` keeps
//! `Thundr` a thin facade over `Renderer`/`Device`.

use crate::gl::dispatch::GlGetProcAddress;
use crate::gl::interpreter::{Statistics, VMMode};
use crate::instruction::OpCode;
use crate::program::Fragment;
use cmdvm_utils::log::error;
use std::os::raw::c_int;

#[no_mangle]
pub unsafe extern "C" fn vmInit(get_proc: GlGetProcAddress) {
    crate::gl::dispatch::vm_init(get_proc);
}

#[no_mangle]
pub unsafe extern "C" fn vmCreate() -> *mut Fragment {
    Box::into_raw(Fragment::new())
}

/// # Safety
/// `fragment` must be a pointer returned by [`vmCreate`], not yet passed to
/// `vmDelete`. Per §3, destroying a fragment must not follow its `next`
/// link: only this one allocation is freed.
#[no_mangle]
pub unsafe extern "C" fn vmDelete(fragment: *mut Fragment) {
    if !fragment.is_null() {
        drop(Box::from_raw(fragment));
    }
}

/// # Safety
/// `fragment` must be a live pointer from `vmCreate`.
#[no_mangle]
pub unsafe extern "C" fn vmHasNext(fragment: *const Fragment) -> bool {
    (*fragment).has_next()
}

/// # Safety
/// `fragment` must be a live pointer from `vmCreate`.
#[no_mangle]
pub unsafe extern "C" fn vmGetNext(fragment: *const Fragment) -> *const Fragment {
    match (*fragment).get_next() {
        Some(f) => f as *const Fragment,
        None => std::ptr::null(),
    }
}

/// # Safety
/// Both pointers must be live `vmCreate` allocations.
#[no_mangle]
pub unsafe extern "C" fn vmLink(left: *const Fragment, right: *const Fragment) {
    (*left).link(&*right);
}

/// # Safety
/// `left` must be a live `vmCreate` allocation.
#[no_mangle]
pub unsafe extern "C" fn vmUnlink(left: *const Fragment) {
    (*left).unlink();
}

/// # Safety
/// `fragment` must be a live `vmCreate` allocation.
#[no_mangle]
pub unsafe extern "C" fn vmNewBlock(fragment: *const Fragment) -> usize {
    (*fragment).new_block()
}

/// Returns 0 on success, -1 if `block` was never allocated.
///
/// # Safety
/// `fragment` must be a live `vmCreate` allocation.
#[no_mangle]
pub unsafe extern "C" fn vmClearBlock(fragment: *const Fragment, block: usize) -> c_int {
    match (*fragment).clear_block(block) {
        Ok(()) => 0,
        Err(e) => {
            error!("GLVM: {}", e);
            -1
        }
    }
}

/// # Safety
/// `fragment` must be a live `vmCreate` allocation.
#[no_mangle]
pub unsafe extern "C" fn vmClear(fragment: *const Fragment) {
    (*fragment).clear();
}

macro_rules! vm_append {
    ($name:ident, $method:ident, $($arg:ident),+) => {
        /// Returns 0 on success, -1 on an invalid block index or unknown
        /// opcode.
        ///
        /// # Safety
        /// `fragment` must be a live `vmCreate` allocation.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            fragment: *const Fragment,
            block: usize,
            opcode: i32,
            $($arg: isize),+
        ) -> c_int {
            let code = match OpCode::from_i32(opcode) {
                Some(c) => c,
                None => {
                    error!("GLVM: unknown instruction code: {}", opcode);
                    return -1;
                }
            };
            match (*fragment).$method(block, code, $($arg),+) {
                Ok(()) => 0,
                Err(e) => {
                    error!("GLVM: {}", e);
                    -1
                }
            }
        }
    };
}

vm_append!(vmAppend1, append1, a0);
vm_append!(vmAppend2, append2, a0, a1);
vm_append!(vmAppend3, append3, a0, a1, a2);
vm_append!(vmAppend4, append4, a0, a1, a2, a3);
vm_append!(vmAppend5, append5, a0, a1, a2, a3, a4);
vm_append!(vmAppend6, append6, a0, a1, a2, a3, a4, a5);

/// # Safety
/// `fragment` must be a live `vmCreate` allocation; `vmInit` must have run.
#[no_mangle]
pub unsafe extern "C" fn vmRunSingle(fragment: *const Fragment) {
    crate::gl::interpreter::run_single(&*fragment);
}

/// # Safety
/// `fragment` must be a live `vmCreate` allocation; `vmInit` must have run;
/// `stats_out`, if non-null, must be valid for a `Statistics` write.
#[no_mangle]
pub unsafe extern "C" fn vmRun(fragment: *const Fragment, mode: u32, stats_out: *mut Statistics) {
    let mode = VMMode::from_bits_truncate(mode);
    let stats = if mode.contains(VMMode::RUNTIME_REDUNDANCY_CHECKS) {
        crate::gl::interpreter::run_redundancy_checks(&*fragment)
    } else {
        crate::gl::interpreter::run_no_redundancy_checks(&*fragment)
    };
    if !stats_out.is_null() {
        *stats_out = stats;
    }
}
