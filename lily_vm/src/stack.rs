//! The operand stack and its frames.
//!
//! One stack per VM. A [`StackFrame`] spans the slots of one call; a
//! [`BlockFrame`] tracks the extent and local addresses of one basic-block
//! limit inside that call. `BlockFrame.end` is zero exactly while it is the
//! current block frame.

use rustc_hash::FxHashMap;

use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::value::Value;

const STACK_COEFF_INC: usize = 2;
const STACK_BASE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct Stack {
    buffer: Vec<Value>,
    capacity: usize,
    max_capacity: usize,
}

impl Stack {
    pub fn new(max_capacity: usize) -> Self {
        let capacity = STACK_BASE_CAPACITY.min(max_capacity.max(1));
        Stack {
            buffer: Vec::with_capacity(capacity),
            capacity,
            max_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn push(&mut self, value: Value) -> RuntimeResult<()> {
        if self.buffer.len() >= self.max_capacity {
            return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow));
        }
        if self.buffer.len() == self.capacity {
            self.capacity = (self.capacity * STACK_COEFF_INC).min(self.max_capacity);
            self.buffer.reserve_exact(self.capacity - self.buffer.len());
        }
        self.buffer.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> RuntimeResult<Value> {
        self.buffer
            .pop()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackEmpty))
    }

    pub fn peek(&self) -> RuntimeResult<&Value> {
        self.buffer
            .last()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackEmpty))
    }

    pub fn get(&self, addr: usize) -> Option<&Value> {
        self.buffer.get(addr)
    }

    pub fn set(&mut self, addr: usize, value: Value) -> RuntimeResult<()> {
        match self.buffer.get_mut(addr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::new(RuntimeErrorKind::StackEmpty)),
        }
    }

    /// Pop and drop down to `len` slots. Net-zero stack effect per block is
    /// enforced by calling this with the block frame's `begin`.
    pub fn truncate(&mut self, len: usize) {
        while self.buffer.len() > len {
            drop(self.buffer.pop());
        }
    }

    /// Linear scan of the pre-frame region for a constant instance.
    pub fn find_const(&self, pre_frame_len: usize, name: &str) -> Option<&Value> {
        self.buffer[..pre_frame_len.min(self.buffer.len())]
            .iter()
            .find(|value| match value {
                Value::Object(crate::value::Obj::Instance(instance)) => instance.name == name,
                _ => false,
            })
    }
}

/// Per-basic-block bookkeeping inside a frame.
#[derive(Debug)]
pub struct BlockFrame {
    /// Blocks merged into this limit (back-edges land here repeatedly).
    pub names: Vec<String>,
    pub variables: FxHashMap<String, usize>,
    pub regs: FxHashMap<String, usize>,
    pub begin: usize,
    /// Zero iff this is the current block frame.
    pub end: usize,
}

impl BlockFrame {
    fn new(name: String, begin: usize) -> Self {
        BlockFrame {
            names: vec![name],
            variables: FxHashMap::default(),
            regs: FxHashMap::default(),
            begin,
            end: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameReturn {
    Normal(Value),
    Raise(Value),
}

/// One call's extent on the stack.
#[derive(Debug)]
pub struct StackFrame {
    pub name: String,
    pub params: Vec<Value>,
    pub begin: usize,
    pub end: usize,
    pub current_block_frame_limit_id: usize,
    /// Indexed by block-limit id; `None` until the limit is first entered.
    pub block_frames: Vec<Option<BlockFrame>>,
    pub return_value: Option<FrameReturn>,
}

impl StackFrame {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Value>,
        begin: usize,
        entry_limit_id: usize,
        entry_block_name: impl Into<String>,
        block_frames_len: usize,
    ) -> Self {
        let mut block_frames: Vec<Option<BlockFrame>> = Vec::with_capacity(block_frames_len);
        block_frames.resize_with(block_frames_len, || None);
        block_frames[entry_limit_id] = Some(BlockFrame::new(entry_block_name.into(), begin));
        StackFrame {
            name: name.into(),
            params,
            begin,
            end: 0,
            current_block_frame_limit_id: entry_limit_id,
            block_frames,
            return_value: None,
        }
    }

    pub fn current_block_frame(&self) -> &BlockFrame {
        self.block_frames[self.current_block_frame_limit_id]
            .as_ref()
            .expect("current block frame must exist")
    }

    pub fn current_block_frame_mut(&mut self) -> &mut BlockFrame {
        self.block_frames[self.current_block_frame_limit_id]
            .as_mut()
            .expect("current block frame must exist")
    }

    /// Enter the block `name` with limit `limit_id`, the stack being
    /// `begin` slots tall. Re-entering an open limit merges instead of
    /// replacing (loop back-edges).
    pub fn add_block_frame(&mut self, limit_id: usize, name: &str, begin: usize) {
        self.current_block_frame_mut().end = begin;

        match &mut self.block_frames[limit_id] {
            Some(block_frame) => {
                block_frame.names.push(name.to_owned());
                block_frame.end = 0;
            }
            slot @ None => {
                *slot = Some(BlockFrame::new(name.to_owned(), begin));
            }
        }

        self.current_block_frame_limit_id = limit_id;
    }

    /// Drop the current limit's frame after its stack extent was cleaned.
    pub fn free_current_block_frame(&mut self) {
        self.block_frames[self.current_block_frame_limit_id] = None;
    }

    /// Resolve a register address: current block frame first, then the
    /// still-open outer limits.
    pub fn search_reg(&self, name: &str) -> Option<usize> {
        self.search(|frame| frame.regs.get(name).copied())
    }

    pub fn search_variable(&self, name: &str) -> Option<usize> {
        self.search(|frame| frame.variables.get(name).copied())
    }

    fn search(&self, mut lookup: impl FnMut(&BlockFrame) -> Option<usize>) -> Option<usize> {
        if let Some(addr) = lookup(self.current_block_frame()) {
            return Some(addr);
        }
        self.block_frames
            .iter()
            .flatten()
            .find_map(|frame| lookup(frame))
    }

    pub fn set_return(&mut self, return_value: FrameReturn) {
        self.return_value = Some(return_value);
    }
}

/// Pop and free every slot of the current block frame.
pub fn clean_block_stack(stack: &mut Stack, frame: &StackFrame) {
    let block_frame = frame.current_block_frame();
    debug_assert_eq!(block_frame.end, 0);
    stack.truncate(block_frame.begin);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn push_grows_until_max_capacity() {
        let mut stack = Stack::new(4);
        for i in 0..4 {
            stack.push(Value::Int32(i)).unwrap();
        }
        let err = stack.push(Value::Int32(4)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(stack.len(), 4);
    }

    #[test]
    fn pop_on_empty_is_fatal() {
        let mut stack = Stack::new(8);
        let err = stack.pop().unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackEmpty);
    }

    #[test]
    fn find_const_only_scans_the_pre_frame_region() {
        let mut stack = Stack::new(16);
        stack
            .push(Value::instance("main.PI", Value::Float(3.14)))
            .unwrap();
        stack
            .push(Value::instance("main.E", Value::Float(2.71)))
            .unwrap();

        assert!(stack.find_const(2, "main.PI").is_some());
        assert!(stack.find_const(1, "main.E").is_none());
        assert!(stack.find_const(2, "main.TAU").is_none());
    }

    #[test]
    fn block_frame_merges_on_shared_limit() {
        let mut frame = StackFrame::new("f", vec![], 0, 0, "entry", 2);
        frame.add_block_frame(1, "body", 3);
        assert_eq!(frame.current_block_frame_limit_id, 1);
        assert_eq!(frame.block_frames[0].as_ref().unwrap().end, 3);

        // Back-edge into the same limit merges the name and reopens it.
        frame.add_block_frame(1, "body.continue", 5);
        let body = frame.block_frames[1].as_ref().unwrap();
        assert_eq!(body.names, vec!["body".to_owned(), "body.continue".to_owned()]);
        assert_eq!(body.end, 0);
        assert_eq!(body.begin, 3);
    }

    #[test]
    fn clean_block_stack_restores_block_entry_len() {
        let mut stack = Stack::new(16);
        let mut frame = StackFrame::new("f", vec![], 0, 0, "entry", 2);
        stack.push(Value::Int32(1)).unwrap();
        stack.push(Value::Int32(2)).unwrap();
        frame.add_block_frame(1, "body", stack.len());
        stack.push(Value::Int32(3)).unwrap();
        stack.push(Value::Int32(4)).unwrap();

        clean_block_stack(&mut stack, &frame);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn register_search_reaches_outer_limits() {
        let mut frame = StackFrame::new("f", vec![], 0, 0, "entry", 2);
        frame.current_block_frame_mut().regs.insert("%0".to_owned(), 0);
        frame.add_block_frame(1, "body", 1);
        frame.current_block_frame_mut().regs.insert("%1".to_owned(), 1);

        assert_eq!(frame.search_reg("%1"), Some(1));
        assert_eq!(frame.search_reg("%0"), Some(0));
        assert_eq!(frame.search_reg("%2"), None);
    }
}
