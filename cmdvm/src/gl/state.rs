//! The GL redundancy cache for low-code opcodes (§3 "GL state cache", §4.3).
//!
//! One `GlState` belongs to exactly one redundancy-interpreter *replay
//! call* and is reset at the start of each one (§4.3 "Reset re-initializes
//! all sentinels"). H-command redundancy tracking is a separate, longer-
//! lived object: see [`super::hstate`].

use std::collections::HashMap;

type Scalar = i64;

#[derive(Default)]
pub struct GlState {
    current_program: Option<Scalar>,
    current_vertex_array: Option<Scalar>,
    current_active_texture: Option<Scalar>,
    current_depth_func: Option<Scalar>,
    current_cull_face: Option<Scalar>,
    current_depth_mask: Option<Scalar>,
    current_stencil_mask: Option<Scalar>,

    // target -> unit -> texture
    current_texture: HashMap<u32, HashMap<i32, Scalar>>,
    current_sampler: HashMap<i32, Scalar>,
    // (target, index) -> (buffer, offset, size). Keyed on the pair, not
    // just `index`: the historical implementation keyed on `index` alone
    // and collided bindings across target families (see SPEC_FULL.md §4.3).
    current_buffer: HashMap<(u32, i32), (Scalar, Scalar, Scalar)>,
    modes: HashMap<Scalar, bool>,
    patch_parameters: HashMap<Scalar, Scalar>,
    current_color_mask: HashMap<Scalar, u8>,
    current_draw_buffers: Vec<u32>,

    current_polygon_mode: Option<(Scalar, Scalar)>,
    blend_func: Option<(Scalar, Scalar, Scalar, Scalar)>,
    blend_equation: Option<(Scalar, Scalar)>,
    blend_color: Option<(Scalar, Scalar, Scalar, Scalar)>,
    stencil_func: Option<(Scalar, Scalar, Scalar, Scalar)>,
    stencil_op: Option<(Scalar, Scalar, Scalar, Scalar)>,

    removed_instructions: u64,
}

impl GlState {
    pub fn new() -> GlState {
        GlState::default()
    }

    /// Re-initializes every sentinel, as if freshly constructed (§4.3
    /// "Reset re-initializes all sentinels").
    pub fn reset(&mut self) {
        *self = GlState::default();
    }

    pub fn removed_instructions(&self) -> u64 {
        self.removed_instructions
    }

    fn mark_removed(&mut self) {
        self.removed_instructions += 1;
    }

    pub fn should_set_program(&mut self, program: Scalar) -> bool {
        if self.current_program != Some(program) {
            self.current_program = Some(program);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_vertex_array(&mut self, vao: Scalar) -> bool {
        if self.current_vertex_array != Some(vao) {
            self.current_vertex_array = Some(vao);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_active_texture(&mut self, unit: Scalar) -> bool {
        if self.current_active_texture != Some(unit) {
            self.current_active_texture = Some(unit);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn active_texture_unit(&self) -> i32 {
        self.current_active_texture.unwrap_or(0) as i32
    }

    pub fn should_set_depth_func(&mut self, func: Scalar) -> bool {
        if self.current_depth_func != Some(func) {
            self.current_depth_func = Some(func);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_cull_face(&mut self, face: Scalar) -> bool {
        if self.current_cull_face != Some(face) {
            self.current_cull_face = Some(face);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_depth_mask(&mut self, mask: Scalar) -> bool {
        if self.current_depth_mask != Some(mask) {
            self.current_depth_mask = Some(mask);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_stencil_mask(&mut self, mask: Scalar) -> bool {
        if self.current_stencil_mask != Some(mask) {
            self.current_stencil_mask = Some(mask);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_texture(&mut self, target: u32, texture: Scalar) -> bool {
        let unit = self.active_texture_unit();
        let per_unit = self.current_texture.entry(target).or_default();
        match per_unit.get(&unit) {
            Some(&cur) if cur == texture => {
                self.mark_removed();
                false
            }
            _ => {
                per_unit.insert(unit, texture);
                true
            }
        }
    }

    pub fn should_set_sampler(&mut self, index: i32, sampler: Scalar) -> bool {
        match self.current_sampler.get(&index) {
            Some(&cur) if cur == sampler => {
                self.mark_removed();
                false
            }
            _ => {
                self.current_sampler.insert(index, sampler);
                true
            }
        }
    }

    pub fn should_set_buffer(
        &mut self,
        target: u32,
        index: i32,
        buffer: Scalar,
        offset: Scalar,
        size: Scalar,
    ) -> bool {
        let key = (target, index);
        match self.current_buffer.get(&key) {
            Some(&cur) if cur == (buffer, offset, size) => {
                self.mark_removed();
                false
            }
            _ => {
                self.current_buffer.insert(key, (buffer, offset, size));
                true
            }
        }
    }

    pub fn should_enable(&mut self, flag: Scalar) -> bool {
        match self.modes.get(&flag) {
            Some(true) => {
                self.mark_removed();
                false
            }
            _ => {
                self.modes.insert(flag, true);
                true
            }
        }
    }

    pub fn should_disable(&mut self, flag: Scalar) -> bool {
        match self.modes.get(&flag) {
            Some(false) => {
                self.mark_removed();
                false
            }
            _ => {
                self.modes.insert(flag, false);
                true
            }
        }
    }

    pub fn should_set_polygon_mode(&mut self, face: Scalar, mode: Scalar) -> bool {
        if self.current_polygon_mode != Some((face, mode)) {
            self.current_polygon_mode = Some((face, mode));
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_blend_func(
        &mut self,
        src_rgb: Scalar,
        dst_rgb: Scalar,
        src_a: Scalar,
        dst_a: Scalar,
    ) -> bool {
        let v = (src_rgb, dst_rgb, src_a, dst_a);
        if self.blend_func != Some(v) {
            self.blend_func = Some(v);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_blend_equation(&mut self, rgb: Scalar, alpha: Scalar) -> bool {
        let v = (rgb, alpha);
        if self.blend_equation != Some(v) {
            self.blend_equation = Some(v);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_blend_color(&mut self, r: Scalar, g: Scalar, b: Scalar, a: Scalar) -> bool {
        let v = (r, g, b, a);
        if self.blend_color != Some(v) {
            self.blend_color = Some(v);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_stencil_func(
        &mut self,
        face: Scalar,
        func: Scalar,
        reference: Scalar,
        mask: Scalar,
    ) -> bool {
        let v = (face, func, reference, mask);
        if self.stencil_func != Some(v) {
            self.stencil_func = Some(v);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_stencil_op(
        &mut self,
        face: Scalar,
        sfail: Scalar,
        dpfail: Scalar,
        dppass: Scalar,
    ) -> bool {
        let v = (face, sfail, dpfail, dppass);
        if self.stencil_op != Some(v) {
            self.stencil_op = Some(v);
            true
        } else {
            self.mark_removed();
            false
        }
    }

    pub fn should_set_patch_parameter(&mut self, parameter: Scalar, value: Scalar) -> bool {
        match self.patch_parameters.get(&parameter) {
            Some(&cur) if cur == value => {
                self.mark_removed();
                false
            }
            _ => {
                self.patch_parameters.insert(parameter, value);
                true
            }
        }
    }

    pub fn should_set_color_mask(&mut self, index: Scalar, r: bool, g: bool, b: bool, a: bool) -> bool {
        let mask = ((r as u8) << 3) | ((g as u8) << 2) | ((b as u8) << 1) | (a as u8);
        match self.current_color_mask.get(&index) {
            Some(&cur) if cur == mask => {
                self.mark_removed();
                false
            }
            _ => {
                self.current_color_mask.insert(index, mask);
                true
            }
        }
    }

    pub fn should_set_draw_buffers(&mut self, buffers: &[u32]) -> bool {
        if self.current_draw_buffers == buffers {
            self.mark_removed();
            return false;
        }
        self.current_draw_buffers = buffers.to_vec();
        true
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_cache_suppresses_repeat() {
        let mut s = GlState::new();
        assert!(s.should_set_program(5));
        assert!(!s.should_set_program(5));
        assert_eq!(s.removed_instructions(), 1);
        assert!(s.should_set_program(6));
    }

    #[test]
    fn texture_is_keyed_by_target_and_active_unit() {
        let mut s = GlState::new();
        s.should_set_active_texture(0);
        assert!(s.should_set_texture(0x0DE1 /* GL_TEXTURE_2D */, 42));
        assert!(!s.should_set_texture(0x0DE1, 42));
        s.should_set_active_texture(1);
        // same target, different unit: not redundant even though the
        // texture handle is identical
        assert!(s.should_set_texture(0x0DE1, 42));
    }

    #[test]
    fn buffer_cache_is_keyed_by_target_and_index_not_index_alone() {
        let mut s = GlState::new();
        assert!(s.should_set_buffer(0x8A11 /* UNIFORM_BUFFER */, 0, 7, 0, 64));
        // same index, different target: historically collided, must not
        // be suppressed here
        assert!(s.should_set_buffer(0x90D2 /* SHADER_STORAGE_BUFFER */, 0, 7, 0, 64));
    }

    #[test]
    fn enable_disable_round_trip() {
        let mut s = GlState::new();
        assert!(s.should_enable(0x0B44));
        assert!(!s.should_enable(0x0B44));
        assert!(s.should_disable(0x0B44));
        assert!(!s.should_disable(0x0B44));
    }

    #[test]
    fn draw_buffers_compares_length_and_elements() {
        let mut s = GlState::new();
        assert!(s.should_set_draw_buffers(&[0x8CE0, 0x8CE1]));
        assert!(!s.should_set_draw_buffers(&[0x8CE0, 0x8CE1]));
        assert!(s.should_set_draw_buffers(&[0x8CE0]));
    }

    #[test]
    fn reset_clears_every_sentinel() {
        let mut s = GlState::new();
        s.should_set_program(5);
        s.reset();
        assert!(s.should_set_program(5));
    }
}
