// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! I/O collaborators for the machine.
//!
//! The input and output instructions delegate to embedder-provided
//! collaborators. Calls are synchronous and blocking; a failing collaborator
//! aborts the run.

use std::collections::VecDeque;

use crate::arch::Word;
use crate::error::{VmError, VmResult};

/// Source of the values the input instruction consumes, one at a time.
pub trait InputSource {
    /// Produces the next input value. Exhaustion is an error, not an
    /// end-of-stream condition the machine could recover from.
    fn read(&mut self) -> VmResult<Word>;
}

/// Sink for the values the output instruction emits, in emission order.
pub trait OutputSink {
    /// Accepts one emitted value.
    fn write(&mut self, value: Word) -> VmResult<()>;
}

/// Scripted input: values are consumed front to back.
impl InputSource for VecDeque<Word> {
    fn read(&mut self) -> VmResult<Word> {
        self.pop_front().ok_or(VmError::InputExhausted)
    }
}

/// Collecting sink, mainly for tests and embedding.
impl OutputSink for Vec<Word> {
    fn write(&mut self, value: Word) -> VmResult<()> {
        self.push(value);
        Ok(())
    }
}
