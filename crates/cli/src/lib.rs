//! Library surface of the `iocross` CLI: parsers, report rendering, and the
//! process error type. The binary in `main.rs` is a thin command layer over
//! this.

pub mod exit_codes;
pub mod parse;
pub mod report;

use exit_codes::{EXIT_CONFIG_ERROR, EXIT_INTERNAL, EXIT_IO_ERROR, EXIT_PARSE_ERROR};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO_ERROR, message: msg.into() }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE_ERROR, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG_ERROR, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INTERNAL, message: msg.into() }
    }
}
