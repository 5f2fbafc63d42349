//! Deferred VAO cleanup (§4.4, §5).
//!
//! `HBindVertexAttributes` may discover that a cached VAO belongs to a GL
//! context other than the one currently active. It cannot delete that VAO
//! itself (deleting from the wrong context is undefined behavior), so it
//! enqueues the handle here; the owning context reaps its own bucket later
//! via [`cleanup`]. Mirrors `thundr::DeletionQueue`'s "schedule now, drop
//! later under the owner's authority" shape, keyed by GL context identity
//! instead of a timeline point.

use super::dispatch::GlFns;
use super::types::GLuint;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref ORPHANED_VAOS: Mutex<HashMap<usize, Vec<GLuint>>> = Mutex::new(HashMap::new());
}

/// Enqueues `vao` for deletion by the context identified by `context`. Safe
/// to call from any thread; mutation is serialized by a single mutex (§5).
pub fn schedule_drop(context: usize, vao: GLuint) {
    ORPHANED_VAOS
        .lock()
        .unwrap()
        .entry(context)
        .or_default()
        .push(vao);
}

/// Deletes every VAO queued for `context`. Must be called on a thread with
/// `context` current; this function only drains the queue and issues the
/// driver calls, it does not make any context current itself.
pub fn cleanup(context: usize, gl: &GlFns) {
    let handles = ORPHANED_VAOS
        .lock()
        .unwrap()
        .remove(&context)
        .unwrap_or_default();
    if handles.is_empty() {
        return;
    }
    if let Some(del) = gl.delete_vertex_arrays {
        unsafe { del(handles.len() as i32, handles.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_then_drain_is_empty() {
        schedule_drop(0xdead, 7);
        schedule_drop(0xdead, 8);
        let drained = ORPHANED_VAOS.lock().unwrap().remove(&0xdead).unwrap();
        assert_eq!(drained, vec![7, 8]);
        assert!(ORPHANED_VAOS.lock().unwrap().get(&0xdead).is_none());
    }
}
