// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::fmt;

use crate::arch::Word;

/// Errors the machine can raise. Every one of them is fatal: it aborts the
/// current run and the machine makes no attempt at recovery or resumption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VmError {
    // address errors
    /// A negative index was handed to a memory access.
    NegativeAddress(Word),

    // decode errors
    /// The kind portion of a raw opcode word matched no instruction.
    InvalidOpcode(Word),
    /// An addressing-mode digit matched no mode.
    InvalidMode {
        /// The parameter the digit belonged to.
        param: Word,
        /// The offending digit.
        digit: Word,
    },
    /// A write-destination parameter carried the immediate mode, which only
    /// ever names an operand, never an address.
    WriteToImmediate {
        /// The parameter that was marked immediate.
        param: Word,
    },

    // collaborator errors
    /// The input source had no more values to offer.
    InputExhausted,
    /// The input source produced something that is not an integer.
    MalformedInput(String),
    /// The output sink refused a value.
    OutputRejected(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeAddress(index) => {
                write!(f, "negative memory address {index}")
            }
            Self::InvalidOpcode(word) => {
                write!(f, "invalid instruction of opcode word {word}")
            }
            Self::InvalidMode { param, digit } => {
                write!(f, "invalid access mode for parameter {param}: {digit}")
            }
            Self::WriteToImmediate { param } => {
                write!(
                    f,
                    "immediate mode on write-destination parameter {param}"
                )
            }
            Self::InputExhausted => write!(f, "input source exhausted"),
            Self::MalformedInput(token) => {
                write!(f, "malformed input token: {token}")
            }
            Self::OutputRejected(reason) => {
                write!(f, "output sink rejected value: {reason}")
            }
        }
    }
}

impl std::error::Error for VmError {}

/// Result alias used throughout the crate.
pub type VmResult<T> = Result<T, VmError>;
