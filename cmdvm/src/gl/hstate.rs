//! H-command redundancy state (§4.4).
//!
//! Unlike [`super::state::GlState`], this is **not** scoped to one replay
//! call. `original_source`'s `hgl*` entry points (`hglSetDepthTest`,
//! `hglBindVertexArray`, ...) take no `State` parameter at all - their
//! pointer/content comparison is against whatever the *previous call to
//! that same hgl function* saw, frame over frame, for the lifetime of the
//! process. This crate reproduces that with a `lazy_static` global guarded
//! by a mutex, the same pattern `gl::dispatch` uses for the driver table.

use lazy_static::lazy_static;
use std::sync::Mutex;

type Scalar = i64;

/// Tracks the last pointer an H-command slot saw so a later call can
/// `memcmp` its *current* bytes against the new call's bytes. Mirrors
/// `original_source`'s raw `int* hDepthTest`-style fields: it is not a
/// snapshot, it re-reads the old pointer's live memory every time.
#[derive(Default)]
struct PointerSlot {
    last_ptr: Option<*const u8>,
}

impl PointerSlot {
    /// # Safety
    /// `ptr` must be valid for `size` bytes, and the previously stored
    /// pointer (if any) must still be valid for `size` bytes too - true as
    /// long as the caller keeps H-command state blocks alive across the
    /// frames it replays fragments that reference them (§3 lifecycle note).
    unsafe fn should_apply(&mut self, ptr: *const u8, size: usize) -> bool {
        let should = match self.last_ptr {
            None => true,
            Some(last) => {
                std::slice::from_raw_parts(last, size) != std::slice::from_raw_parts(ptr, size)
            }
        };
        if should {
            self.last_ptr = Some(ptr);
        }
        should
    }
}

// SAFETY: the raw pointers inside `PointerSlot` are never dereferenced by
// this type itself, only compared byte-for-byte under the caller's safety
// contract above; the whole `HState` lives behind a `Mutex`, so access is
// already serialized across threads.
unsafe impl Send for PointerSlot {}

#[derive(Default)]
pub struct HState {
    depth_test: PointerSlot,
    cull_face: Option<Scalar>,
    polygon_mode: Option<Scalar>,
    stencil_mode_front: PointerSlot,
    stencil_mode_back: PointerSlot,
    conservative_raster: PointerSlot,
    multisample: PointerSlot,
    vertex_input: Option<(usize, usize)>,
    removed_instructions: u64,
}

impl HState {
    pub fn removed_instructions(&self) -> u64 {
        self.removed_instructions
    }

    fn mark_removed(&mut self) {
        self.removed_instructions += 1;
    }

    /// # Safety
    /// `ptr` must be non-null and valid for `size_of::<i32>()` bytes.
    pub unsafe fn should_set_depth_test(&mut self, ptr: *const i32) -> bool {
        if self.depth_test.should_apply(ptr as *const u8, 4) {
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_cull_face(&mut self, face: Scalar) -> bool {
        if self.cull_face != Some(face) {
            self.cull_face = Some(face);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_polygon_mode(&mut self, mode: Scalar) -> bool {
        if self.polygon_mode != Some(mode) {
            self.polygon_mode = Some(mode);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    /// # Safety
    /// `front`/`back` must each be non-null and valid for `size` bytes of
    /// the caller's `StencilMode`-equivalent struct.
    pub unsafe fn should_set_stencil_mode(
        &mut self,
        front: *const u8,
        back: *const u8,
        size: usize,
    ) -> bool {
        let front_changed = self.stencil_mode_front.should_apply(front, size);
        let back_changed = self.stencil_mode_back.should_apply(back, size);
        if front_changed || back_changed {
            true
        } else {
            self.mark_removed();
            false
        }
    }

    /// # Safety
    /// `ptr` must be non-null and valid for `size_of::<i32>()` bytes.
    pub unsafe fn should_set_conservative_raster(&mut self, ptr: *const i32) -> bool {
        if self.conservative_raster.should_apply(ptr as *const u8, 4) {
            true
        } else {
            self.mark_removed();
            false
        }
    }

    /// # Safety
    /// `ptr` must be non-null and valid for `size_of::<i32>()` bytes.
    pub unsafe fn should_set_multisample(&mut self, ptr: *const i32) -> bool {
        if self.multisample.should_apply(ptr as *const u8, 4) {
            true
        } else {
            self.mark_removed();
            false
        }
    }

    /// Keyed on `(pointer, context)` rather than the pointer alone: the same
    /// binding address replayed under a *different* GL context is a real
    /// change (the caller's struct may be shared across contexts, with the
    /// VAO-cache rebuild decided by `vao_context` inside the struct itself),
    /// not a redundant repeat of the prior call.
    pub fn should_bind_vertex_attributes(&mut self, binding: *const u8, context: usize) -> bool {
        let key = (binding as usize, context);
        if self.vertex_input != Some(key) {
            self.vertex_input = Some(key);
            true
        } else {
            self.mark_removed();
            false
        }
    }
}

lazy_static! {
    static ref H_STATE: Mutex<HState> = Mutex::new(HState::default());
}

pub fn with_h_state<R>(f: impl FnOnce(&mut HState) -> R) -> R {
    let mut guard = H_STATE.lock().unwrap();
    f(&mut guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_test_tracks_live_pointer_content() {
        let mut s = HState::default();
        let mut block: i32 = 1;
        unsafe {
            assert!(s.should_set_depth_test(&block as *const i32));
            assert!(!s.should_set_depth_test(&block as *const i32));
            block = 2;
            // same pointer, mutated content: must re-apply
            assert!(s.should_set_depth_test(&block as *const i32));
        }
    }

    #[test]
    fn stencil_mode_applies_if_either_face_changed() {
        let mut s = HState::default();
        let front = [1u8, 2, 3, 4];
        let back = [5u8, 6, 7, 8];
        unsafe {
            assert!(s.should_set_stencil_mode(front.as_ptr(), back.as_ptr(), 4));
            assert!(!s.should_set_stencil_mode(front.as_ptr(), back.as_ptr(), 4));
        }
        let back2 = [9u8, 9, 9, 9];
        unsafe {
            assert!(s.should_set_stencil_mode(front.as_ptr(), back2.as_ptr(), 4));
        }
    }
}
