// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::fmt;

use crate::arch::{Word, FETCH_WINDOW, IP, RBP};
use crate::error::{VmError, VmResult};
use crate::io::{InputSource, OutputSink};
use crate::mem::Memory;
use crate::op::{Mode, Op, Param};

/// Execution state of a [`Machine`]. `Halted` is terminal: only the halt
/// instruction's effect transitions into it, and nothing transitions out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// The fetch-decode-execute machine. It owns its main memory, its register
/// file and both I/O collaborators; separate machines share nothing.
pub struct Machine<I, O> {
    mem: Memory,
    regs: Memory,
    state: State,
    input: I,
    output: O,
}

impl<I: InputSource, O: OutputSink> Machine<I, O> {
    /// Creates a machine with `program` loaded at address 0 and every
    /// register zeroed.
    pub fn new(program: &[Word], input: I, output: O) -> Self {
        Self {
            mem: Memory::from_blob(program),
            regs: Memory::new(),
            state: State::Running,
            input,
            output,
        }
    }

    /// Reads the fetch window at the instruction pointer: enough cells for
    /// the largest instruction.
    pub fn fetch(&self) -> VmResult<Vec<Word>> {
        let ip = self.ip();
        self.mem.blob_get(ip, ip + FETCH_WINDOW as Word)
    }

    /// Builds the instruction held in `raw` and advances the instruction
    /// pointer past it. A branch taken later in the cycle overwrites the
    /// pointer again, which is what lets it land exactly on its target.
    pub fn decode(&mut self, raw: &[Word]) -> VmResult<Op> {
        let op = Op::decode(raw)?;
        self.set_ip(self.ip() + op.size());
        Ok(op)
    }

    /// Applies the instruction's effect.
    pub fn execute(&mut self, op: Op) -> VmResult<()> {
        match op {
            Op::Add([a, b, dst]) => {
                let sum = self.operand(a)?.wrapping_add(self.operand(b)?);
                self.write(dst, sum)
            }
            Op::Multiply([a, b, dst]) => {
                let product = self.operand(a)?.wrapping_mul(self.operand(b)?);
                self.write(dst, product)
            }
            Op::Input([dst]) => {
                let value = self.input.read()?;
                self.write(dst, value)
            }
            Op::Output([src]) => {
                let value = self.operand(src)?;
                self.output.write(value)
            }
            Op::JumpIfTrue([cond, target]) => {
                if self.operand(cond)? != 0 {
                    let target = self.operand(target)?;
                    self.set_ip(target);
                }
                Ok(())
            }
            Op::JumpIfFalse([cond, target]) => {
                if self.operand(cond)? == 0 {
                    let target = self.operand(target)?;
                    self.set_ip(target);
                }
                Ok(())
            }
            Op::LessThan([a, b, dst]) => {
                let flag = Word::from(self.operand(a)? < self.operand(b)?);
                self.write(dst, flag)
            }
            Op::Equals([a, b, dst]) => {
                let flag = Word::from(self.operand(a)? == self.operand(b)?);
                self.write(dst, flag)
            }
            Op::AdjustRelativeBase([delta]) => {
                let delta = self.operand(delta)?;
                self.set_rbp(self.rbp().wrapping_add(delta));
                Ok(())
            }
            Op::Halt => {
                self.state = State::Halted;
                Ok(())
            }
        }
    }

    /// Runs one full instruction cycle, or none at all once halted.
    pub fn step(&mut self) -> VmResult<()> {
        if self.state == State::Halted {
            return Ok(());
        }
        let raw = self.fetch()?;
        let op = self.decode(&raw)?;
        self.execute(op)
    }

    /// Runs cycles until the halt instruction fires. Once halted, further
    /// calls perform zero cycles. An error aborts the run immediately and
    /// leaves the machine in whatever state the failing cycle produced.
    pub fn run(&mut self) -> VmResult<()> {
        while self.state == State::Running {
            self.step()?;
        }
        Ok(())
    }

    /// Resolves a read parameter to its operand value.
    fn operand(&self, param: Param) -> VmResult<Word> {
        match param.mode {
            Mode::Direct => self.mem.get(param.value),
            Mode::Immediate => Ok(param.value),
            Mode::Relative => {
                self.mem.get(self.rbp().wrapping_add(param.value))
            }
        }
    }

    /// Resolves a write-destination parameter to a raw address. Unlike
    /// [`Machine::operand`] the cell is never dereferenced, and the
    /// immediate mode names no address at all.
    fn write_address(&self, param: Param) -> VmResult<Word> {
        match param.mode {
            Mode::Direct => Ok(param.value),
            Mode::Relative => Ok(self.rbp().wrapping_add(param.value)),
            Mode::Immediate => Err(VmError::WriteToImmediate {
                param: param.value,
            }),
        }
    }

    fn write(&mut self, dst: Param, value: Word) -> VmResult<()> {
        let address = self.write_address(dst)?;
        self.mem.set(address, value)
    }

    fn ip(&self) -> Word {
        self.regs.get(IP).expect("register indices are never negative")
    }

    fn set_ip(&mut self, value: Word) {
        self.regs
            .set(IP, value)
            .expect("register indices are never negative");
    }

    fn rbp(&self) -> Word {
        self.regs.get(RBP).expect("register indices are never negative")
    }

    fn set_rbp(&mut self, value: Word) {
        self.regs
            .set(RBP, value)
            .expect("register indices are never negative");
    }

    /// Main memory, for inspection. Reading it is a debugging aid, not part
    /// of the execution contract.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// The register file, for inspection.
    pub fn registers(&self) -> &Memory {
        &self.regs
    }

    /// Current execution state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The output collaborator, e.g. to collect what a program emitted.
    pub fn output(&self) -> &O {
        &self.output
    }
}

impl<I, O> fmt::Display for Machine<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regs = self.regs.cells();
        let ip = regs.get(IP as usize).copied().unwrap_or(0);
        let rbp = regs.get(RBP as usize).copied().unwrap_or(0);
        write!(
            f,
            "memory: {}\nregisters: [ip = {ip}, rbp = {rbp}]",
            self.mem
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::{Machine, State};
    use crate::arch::{Word, IP, RBP};
    use crate::error::VmError;
    use crate::op::Op;

    fn machine(program: &[Word]) -> Machine<VecDeque<Word>, Vec<Word>> {
        Machine::new(program, VecDeque::new(), Vec::new())
    }

    fn machine_with_input(
        program: &[Word],
        input: &[Word],
    ) -> Machine<VecDeque<Word>, Vec<Word>> {
        Machine::new(program, input.iter().copied().collect(), Vec::new())
    }

    #[test]
    fn fetch_covers_the_largest_instruction() {
        let vm = machine(&[1, 2, 3]);
        assert_eq!(vec![1, 2, 3, 0], vm.fetch().unwrap());
    }

    #[test]
    fn decode_advances_ip_by_instruction_size() {
        for (program, advance) in [
            (vec![1, 0, 0, 0], 4),
            (vec![2, 0, 0, 0], 4),
            (vec![3, 0, 0, 0], 2),
            (vec![4, 0, 0, 0], 2),
            (vec![5, 0, 0, 0], 3),
            (vec![6, 0, 0, 0], 3),
            (vec![7, 0, 0, 0], 4),
            (vec![8, 0, 0, 0], 4),
            (vec![9, 0, 0, 0], 2),
            (vec![99, 0, 0, 0], 1),
        ] {
            let mut vm = machine(&program);
            let raw = vm.fetch().unwrap();
            vm.decode(&raw).unwrap();
            assert_eq!(advance, vm.registers().get(IP).unwrap());
        }
    }

    #[test]
    fn taken_branches_override_the_decode_advance() {
        // jump-if-true on a nonzero immediate condition
        let mut vm = machine(&[1105, 1, 9, 99]);
        vm.step().unwrap();
        assert_eq!(9, vm.registers().get(IP).unwrap());

        // the untaken branch keeps the advanced pointer
        let mut vm = machine(&[1105, 0, 9, 99]);
        vm.step().unwrap();
        assert_eq!(3, vm.registers().get(IP).unwrap());

        let mut vm = machine(&[1106, 0, 7, 99]);
        vm.step().unwrap();
        assert_eq!(7, vm.registers().get(IP).unwrap());
    }

    #[test]
    fn halt_is_idempotent_and_terminal() {
        let mut vm = machine(&[99, 1, 0, 0, 0]);
        vm.run().unwrap();
        assert_eq!(State::Halted, vm.state());
        let ip_after_halt = vm.registers().get(IP).unwrap();

        // further runs and steps perform zero cycles
        vm.run().unwrap();
        vm.step().unwrap();
        assert_eq!(ip_after_halt, vm.registers().get(IP).unwrap());
        assert_eq!(State::Halted, vm.state());
    }

    #[test]
    fn input_writes_through_the_destination_parameter() {
        let mut vm = machine_with_input(&[3, 3, 99, 0], &[42]);
        vm.run().unwrap();
        assert_eq!(42, vm.memory().get(3).unwrap());
    }

    #[test]
    fn exhausted_input_aborts_the_run() {
        let mut vm = machine(&[3, 3, 99, 0]);
        assert_eq!(Err(VmError::InputExhausted), vm.run());
    }

    #[test]
    fn output_resolves_operands_by_mode() {
        let mut vm = machine(&[104, -7, 4, 0, 99]);
        vm.run().unwrap();
        // immediate first, then direct aimed back at the program text
        assert_eq!(&[-7, 104], vm.output().as_slice());
    }

    #[test]
    fn relative_writes_offset_the_base_pointer() {
        // shift the base to 5, then write 1 + 1 through a relative
        // destination at offset 2
        let mut vm = machine(&[109, 5, 21101, 1, 1, 2, 99]);
        vm.run().unwrap();
        assert_eq!(5, vm.registers().get(RBP).unwrap());
        assert_eq!(2, vm.memory().get(7).unwrap());
    }

    #[test]
    fn relative_reads_offset_the_base_pointer() {
        // base 3, then output the cell at base + 4
        let mut vm = machine(&[109, 3, 204, 4, 99, 0, 0, 31]);
        vm.run().unwrap();
        assert_eq!(&[31], vm.output().as_slice());
    }

    #[test]
    fn comparisons_store_flags() {
        let mut vm = machine(&[1107, 1, 2, 9, 1108, 2, 2, 10, 99]);
        vm.run().unwrap();
        assert_eq!(1, vm.memory().get(9).unwrap());
        assert_eq!(1, vm.memory().get(10).unwrap());
    }

    #[test]
    fn decode_errors_surface_through_run() {
        let mut vm = machine(&[58]);
        assert_eq!(Err(VmError::InvalidOpcode(58)), vm.run());

        let mut vm = machine(&[10001, 1, 2, 3]);
        assert_eq!(Err(VmError::WriteToImmediate { param: 3 }), vm.run());
    }

    #[test]
    fn negative_addresses_surface_through_run() {
        // direct read through a negative parameter
        let mut vm = machine(&[4, -1, 99]);
        assert_eq!(Err(VmError::NegativeAddress(-1)), vm.run());

        // relative read resolving below zero
        let mut vm = machine(&[109, -3, 204, 0, 99]);
        assert_eq!(Err(VmError::NegativeAddress(-3)), vm.run());
    }

    #[test]
    fn execute_consumes_decoded_instructions() {
        let mut vm = machine(&[1101, 3, 4, 0, 99]);
        let raw = vm.fetch().unwrap();
        let op = vm.decode(&raw).unwrap();
        assert_eq!(1, op.opcode());
        vm.execute(op).unwrap();
        assert_eq!(7, vm.memory().get(0).unwrap());
    }

    #[test]
    fn machines_are_independent() {
        let mut first = machine(&[1, 0, 0, 0, 99]);
        let second = machine(&[1, 0, 0, 0, 99]);
        first.run().unwrap();
        assert_eq!(2, first.memory().get(0).unwrap());
        assert_eq!(1, second.memory().get(0).unwrap());
    }

    #[test]
    fn displays_memory_and_registers() {
        let mut vm = machine(&[99]);
        vm.run().unwrap();
        assert_eq!(
            "memory: [99]\nregisters: [ip = 1, rbp = 0]",
            vm.to_string()
        );
    }

    #[test]
    fn fetch_zero_extends_past_the_program() {
        // a halt at the very end of memory still fetches a full window
        let mut vm = machine(&[99]);
        let raw = vm.fetch().unwrap();
        assert_eq!(vec![99, 0, 0, 0], raw);
        assert_eq!(Ok(Op::Halt), vm.decode(&raw));
    }
}
