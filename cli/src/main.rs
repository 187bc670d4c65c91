// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

//! Command-line driver for the weft machine.
//!
//! Loads a program of comma-separated integer literals from a file, runs it
//! to halt with stdin and stdout as the I/O collaborators, and prints the
//! final machine state.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write as _};
use std::process;

use anyhow::{bail, Context, Result};
use weft_vm::arch::Word;
use weft_vm::error::{VmError, VmResult};
use weft_vm::io::{InputSource, OutputSink};
use weft_vm::vm::Machine;

/// Input collaborator reading one integer per line from stdin.
struct StdinSource {
    stdin: io::Stdin,
}

impl InputSource for StdinSource {
    fn read(&mut self) -> VmResult<Word> {
        let mut line = String::new();
        let read = self
            .stdin
            .lock()
            .read_line(&mut line)
            .map_err(|error| VmError::MalformedInput(error.to_string()))?;
        if read == 0 {
            return Err(VmError::InputExhausted);
        }
        let token = line.trim();
        token
            .parse()
            .map_err(|_| VmError::MalformedInput(token.to_string()))
    }
}

/// Output collaborator printing one integer per line to stdout.
struct StdoutSink {
    stdout: io::Stdout,
}

impl OutputSink for StdoutSink {
    fn write(&mut self, value: Word) -> VmResult<()> {
        writeln!(self.stdout.lock(), "{value}")
            .map_err(|error| VmError::OutputRejected(error.to_string()))
    }
}

/// Parses a comma-separated program text into words. Whitespace around
/// literals and trailing separators are tolerated.
fn parse_program(text: &str) -> Result<Vec<Word>> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<Word>()
                .with_context(|| format!("invalid program literal `{token}`"))
        })
        .collect()
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: {} <program-file>", args[0]);
    }

    let text = fs::read_to_string(&args[1])
        .with_context(|| format!("failed to read program file `{}`", args[1]))?;
    let program = parse_program(&text)?;

    let mut machine = Machine::new(
        &program,
        StdinSource { stdin: io::stdin() },
        StdoutSink {
            stdout: io::stdout(),
        },
    );
    machine.run().context("program aborted")?;

    println!("{machine}");
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_program;

    #[test]
    fn parses_signed_literals_and_whitespace() {
        assert_eq!(
            vec![109, -1, 99],
            parse_program("109, -1,\n99\n").unwrap()
        );
        assert_eq!(vec![99], parse_program("99,").unwrap());
    }

    #[test]
    fn rejects_non_integer_tokens() {
        assert!(parse_program("1,two,3").is_err());
    }
}
