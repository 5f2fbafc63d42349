//! End-to-end coverage of the GL redundancy interpreter against a mock
//! driver table (S1): repeating `glEnable`/`glDisable` with the same
//! argument must only reach the mock once.

use cmdvm::gl::dispatch::{vm_init, GlGetProcAddress};
use cmdvm::gl::{run_redundancy_checks, run_no_redundancy_checks};
use cmdvm::instruction::OpCode;
use cmdvm::Fragment;
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};

static ENABLE_CALLS: AtomicUsize = AtomicUsize::new(0);
static DISABLE_CALLS: AtomicUsize = AtomicUsize::new(0);
static DRAW_ARRAYS_CALLS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "system" fn mock_enable(_cap: u32) {
    ENABLE_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn mock_disable(_cap: u32) {
    DISABLE_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn mock_bind_vertex_array(_vao: u32) {}

unsafe extern "system" fn mock_draw_arrays(_mode: u32, _first: i32, _count: i32) {
    DRAW_ARRAYS_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn mock_draw_elements(_mode: u32, _count: i32, _ty: u32, _indices: *const c_void) {}

unsafe extern "C" fn mock_get_proc(name: *const c_char) -> *mut c_void {
    let name = CStr::from_ptr(name).to_str().unwrap();
    match name {
        "glEnable" => mock_enable as *mut c_void,
        "glDisable" => mock_disable as *mut c_void,
        "glBindVertexArray" => mock_bind_vertex_array as *mut c_void,
        "glDrawArrays" => mock_draw_arrays as *mut c_void,
        "glDrawElements" => mock_draw_elements as *mut c_void,
        _ => std::ptr::null_mut(),
    }
}

fn init_once() {
    unsafe {
        let f: GlGetProcAddress = mock_get_proc;
        vm_init(f);
    }
}

const GL_DEPTH_TEST: isize = 0x0B71;
const GL_CULL_FACE: isize = 0x0B44;

#[test]
fn repeated_enable_is_suppressed_by_redundancy_check() {
    init_once();
    let before = ENABLE_CALLS.load(Ordering::SeqCst);

    let frag = Fragment::new();
    let block = frag.new_block();
    frag.append1(block, OpCode::Enable, GL_DEPTH_TEST).unwrap();
    frag.append1(block, OpCode::Enable, GL_DEPTH_TEST).unwrap();
    frag.append1(block, OpCode::Enable, GL_DEPTH_TEST).unwrap();

    let stats = run_redundancy_checks(&frag);

    assert_eq!(stats.total_instructions, 3);
    assert_eq!(stats.removed_instructions, 2);
    assert_eq!(ENABLE_CALLS.load(Ordering::SeqCst) - before, 1);
}

#[test]
fn distinct_capabilities_are_not_suppressed() {
    init_once();
    let before = ENABLE_CALLS.load(Ordering::SeqCst);

    let frag = Fragment::new();
    let block = frag.new_block();
    frag.append1(block, OpCode::Enable, GL_DEPTH_TEST).unwrap();
    frag.append1(block, OpCode::Enable, GL_CULL_FACE).unwrap();

    let stats = run_redundancy_checks(&frag);

    assert_eq!(stats.removed_instructions, 0);
    assert_eq!(ENABLE_CALLS.load(Ordering::SeqCst) - before, 2);
}

#[test]
fn no_redundancy_path_never_suppresses() {
    init_once();
    let before = DRAW_ARRAYS_CALLS.load(Ordering::SeqCst);

    let frag = Fragment::new();
    let block = frag.new_block();
    frag.append3(block, OpCode::DrawArrays, 0x0004, 0, 3).unwrap();
    frag.append3(block, OpCode::DrawArrays, 0x0004, 0, 3).unwrap();

    let stats = run_no_redundancy_checks(&frag);

    assert_eq!(stats.total_instructions, 2);
    assert_eq!(stats.removed_instructions, 0);
    assert_eq!(DRAW_ARRAYS_CALLS.load(Ordering::SeqCst) - before, 2);
}

#[test]
fn fragment_chain_is_walked_in_link_order() {
    init_once();
    let before = ENABLE_CALLS.load(Ordering::SeqCst);

    let first = Fragment::new();
    let second = Fragment::new();
    let b1 = first.new_block();
    let b2 = second.new_block();
    first.append1(b1, OpCode::Enable, GL_DEPTH_TEST).unwrap();
    second.append1(b2, OpCode::Enable, GL_DEPTH_TEST).unwrap();
    first.link(&second);

    // Same capability repeated across the chain is still redundant: the
    // cache spans the whole replay call, not just one fragment (§4.3).
    let stats = run_redundancy_checks(&first);

    assert_eq!(stats.total_instructions, 2);
    assert_eq!(stats.removed_instructions, 1);
    assert_eq!(ENABLE_CALLS.load(Ordering::SeqCst) - before, 1);
}
