//! Fragment/Block program model (§3, §4.1).
//!
//! A [`Fragment`] owns an ordered sequence of [`Block`]s and a single,
//! *non-owning* `next` link used to chain fragments for replay. Destroying
//! a fragment must not follow that link: ownership of the chain is the
//! caller's responsibility, mirroring the C-ABI `vmCreate`/`vmDelete` pair
//! this crate exposes in `ffi`.

use crate::error::{CmdVmError, Result};
use crate::instruction::{Instruction, OpCode, MAX_ARGS};
use std::cell::{Cell, RefCell};

#[derive(Debug, Default)]
pub struct Block {
    instructions: Vec<Instruction>,
}

impl Block {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    fn push(&mut self, code: OpCode, args: [isize; MAX_ARGS]) {
        self.instructions.push(Instruction::new(code, args));
    }
}

/// Owns a chain of blocks plus a weak link to the next fragment in a replay
/// chain. A `Fragment` is always heap-allocated individually (see
/// [`Fragment::new`]); there is no arena.
pub struct Fragment {
    blocks: RefCell<Vec<Block>>,
    next: Cell<*mut Fragment>,
}

impl Fragment {
    pub fn new() -> Box<Fragment> {
        Box::new(Fragment {
            blocks: RefCell::new(Vec::new()),
            next: Cell::new(std::ptr::null_mut()),
        })
    }

    /// Allocates a new, empty block and returns its index.
    pub fn new_block(&self) -> usize {
        let mut blocks = self.blocks.borrow_mut();
        blocks.push(Block::default());
        blocks.len() - 1
    }

    pub fn clear_block(&self, block: usize) -> Result<()> {
        let mut blocks = self.blocks.borrow_mut();
        let b = blocks
            .get_mut(block)
            .ok_or(CmdVmError::InvalidBlockIndex(block))?;
        b.clear();
        Ok(())
    }

    pub fn clear(&self) {
        for b in self.blocks.borrow_mut().iter_mut() {
            b.clear();
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.borrow().len()
    }

    /// Runs `f` against every instruction of every block, in block then
    /// instruction order (the replay interpreters' required traversal
    /// order, §5).
    pub fn for_each_instruction(&self, mut f: impl FnMut(&Instruction)) {
        for block in self.blocks.borrow().iter() {
            for inst in block.instructions() {
                f(inst);
            }
        }
    }

    fn append(&self, block: usize, code: OpCode, args: [isize; MAX_ARGS]) -> Result<()> {
        let mut blocks = self.blocks.borrow_mut();
        let b = blocks
            .get_mut(block)
            .ok_or(CmdVmError::InvalidBlockIndex(block))?;
        b.push(code, args);
        Ok(())
    }

    pub fn append1(&self, block: usize, code: OpCode, a0: isize) -> Result<()> {
        self.append(block, code, [a0, 0, 0, 0, 0, 0])
    }

    pub fn append2(&self, block: usize, code: OpCode, a0: isize, a1: isize) -> Result<()> {
        self.append(block, code, [a0, a1, 0, 0, 0, 0])
    }

    pub fn append3(&self, block: usize, code: OpCode, a0: isize, a1: isize, a2: isize) -> Result<()> {
        self.append(block, code, [a0, a1, a2, 0, 0, 0])
    }

    pub fn append4(
        &self,
        block: usize,
        code: OpCode,
        a0: isize,
        a1: isize,
        a2: isize,
        a3: isize,
    ) -> Result<()> {
        self.append(block, code, [a0, a1, a2, a3, 0, 0])
    }

    pub fn append5(
        &self,
        block: usize,
        code: OpCode,
        a0: isize,
        a1: isize,
        a2: isize,
        a3: isize,
        a4: isize,
    ) -> Result<()> {
        self.append(block, code, [a0, a1, a2, a3, a4, 0])
    }

    pub fn append6(
        &self,
        block: usize,
        code: OpCode,
        a0: isize,
        a1: isize,
        a2: isize,
        a3: isize,
        a4: isize,
        a5: isize,
    ) -> Result<()> {
        self.append(block, code, [a0, a1, a2, a3, a4, a5])
    }

    /// Overwrites this fragment's successor. Idempotent: a second call just
    /// replaces the prior link, it does not error or chain.
    pub fn link(&self, next: &Fragment) {
        self.next.set(next as *const Fragment as *mut Fragment);
    }

    pub fn unlink(&self) {
        self.next.set(std::ptr::null_mut());
    }

    pub fn has_next(&self) -> bool {
        !self.next.get().is_null()
    }

    /// # Safety
    /// The returned reference is only valid as long as the linked fragment
    /// has not been dropped by its owner. Callers that walk chains (the
    /// replay interpreters) are trusted to respect fragment lifetimes, the
    /// same contract the C-ABI `vmGetNext` gives external callers.
    pub fn get_next(&self) -> Option<&Fragment> {
        let ptr = self.next.get();
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { &*ptr })
        }
    }

    /// Identity used by the Vulkan cycle detector (§4.5): two fragments are
    /// the same node iff they are the same allocation.
    pub fn identity(&self) -> usize {
        self as *const Fragment as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_zero_pads_unused_slots() {
        let frag = Fragment::new();
        let b = frag.new_block();
        frag.append2(b, OpCode::BindTexture, 7, 3).unwrap();
        frag.for_each_instruction(|inst| {
            assert_eq!(inst.args, [7, 3, 0, 0, 0, 0]);
        });
    }

    #[test]
    fn clear_block_removes_instructions_without_destroying_fragment() {
        let frag = Fragment::new();
        let b = frag.new_block();
        frag.append1(b, OpCode::BindProgram, 1).unwrap();
        frag.clear_block(b).unwrap();
        assert_eq!(frag.block_count(), 1);
        let mut count = 0;
        frag.for_each_instruction(|_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn invalid_block_index_is_an_error_not_a_panic() {
        let frag = Fragment::new();
        assert!(matches!(
            frag.append1(5, OpCode::BindProgram, 1),
            Err(CmdVmError::InvalidBlockIndex(5))
        ));
    }

    #[test]
    fn link_is_idempotent_and_weak() {
        let a = Fragment::new();
        let b = Fragment::new();
        let c = Fragment::new();
        a.link(&b);
        assert!(a.has_next());
        a.link(&c);
        assert_eq!(a.get_next().unwrap().identity(), c.identity());

        // destroying `a`'s notion of a successor doesn't touch b/c
        a.unlink();
        assert!(!a.has_next());
        assert_eq!(b.block_count(), 0);
    }
}
