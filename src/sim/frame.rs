//! The call stack and call frame management.
//!
//! This module exposes:
//! - [`FrameStack`]: The call stack used by the Simulator.
//! - [`Frame`]: The data held in a given frame.

/// A single call frame.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Frame {
    /// The address of the `CALL` instruction that created this frame.
    pub caller_addr: u16,

    /// The address of the subroutine being called.
    pub callee_addr: u16,

    /// The address execution resumes at after this frame returns.
    ///
    /// This is the PC after the `CALL` instruction was fetched.
    pub return_addr: u16,
}

/// The call stack.
///
/// A frame is pushed on each `CALL` and popped on each `RET`.
/// There is no fixed depth.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameStack {
    frames: Vec<Frame>
}

impl FrameStack {
    /// Creates a new, empty frame stack.
    pub fn new() -> Self {
        Self { frames: vec![] }
    }

    /// The number of frames on the stack.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// All the frames on the stack, from the bottom.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The return addresses on the stack, from the bottom.
    ///
    /// This is the stack as a CHIP-8 machine sees it.
    pub fn return_addrs(&self) -> impl Iterator<Item=u16> + '_ {
        self.frames.iter().map(|f| f.return_addr)
    }

    /// The frame on top of the stack (the current subroutine).
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(super) fn push_frame(&mut self, caller_addr: u16, callee_addr: u16, return_addr: u16) {
        self.frames.push(Frame { caller_addr, callee_addr, return_addr });
    }

    pub(super) fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub(super) fn clear(&mut self) {
        self.frames.clear();
    }
}
