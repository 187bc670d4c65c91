// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use static_assertions::const_assert;

/// One memory cell. Addresses are cells too: any cell value can be used as
/// an index into memory, as long as it is not negative at the moment it is
/// used.
pub type Word = i64;

/// Register-file index of the instruction pointer.
pub const IP: Word = 0;

/// Register-file index of the relative base pointer.
pub const RBP: Word = 1;

/// Number of registers the register file holds.
pub const REGISTER_COUNT: usize = 2;
const_assert!(IP != RBP);
const_assert!((IP as usize) < REGISTER_COUNT);
const_assert!((RBP as usize) < REGISTER_COUNT);

/// Largest parameter count any instruction declares.
pub const MAX_ARITY: usize = 3;

/// Cells fetched per cycle: the opcode word plus the largest possible
/// parameter list.
pub const FETCH_WINDOW: usize = 1 + MAX_ARITY;
const_assert!(FETCH_WINDOW > MAX_ARITY);

/// Splits a raw opcode word into the instruction kind (`word % OPCODE_BASE`)
/// and its addressing-mode digits (`word / OPCODE_BASE`).
pub const OPCODE_BASE: Word = 100;
