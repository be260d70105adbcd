//! Heap accounting. The interpreter's objects live on the Rust heap; this
//! tracks their budget so runaway programs fail with a runtime error
//! instead of exhausting the host.

use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};

#[derive(Debug)]
pub struct Memory {
    pub capacity: usize,
    pub used: usize,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Memory { capacity, used: 0 }
    }

    pub fn allocate(&mut self, size: usize) -> RuntimeResult<()> {
        let used = self.used.saturating_add(size);
        if used > self.capacity {
            return Err(RuntimeError::new(RuntimeErrorKind::MemoryExhausted));
        }
        self.used = used;
        Ok(())
    }

    pub fn release(&mut self, size: usize) {
        self.used = self.used.saturating_sub(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_bounded() {
        let mut memory = Memory::new(16);
        memory.allocate(10).unwrap();
        memory.allocate(6).unwrap();
        let err = memory.allocate(1).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::MemoryExhausted);

        memory.release(10);
        memory.allocate(1).unwrap();
    }
}
