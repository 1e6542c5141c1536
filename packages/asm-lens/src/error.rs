// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a run before any output can be produced.
///
/// Anything that only affects a single instruction, symbol or source file is
/// not an error at this level: it shows up as "unknown" data in the output or
/// in `Output::skipped`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{}: not an executable image: {source}", path.display())]
    NotAnExecutable {
        path: PathBuf,
        #[source]
        source: object::Error,
    },

    #[error("{}: unsupported format: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("{}: malformed debug info: {source}", path.display())]
    DebugInfo {
        path: PathBuf,
        #[source]
        source: gimli::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or filter pattern, reported before analysis starts.
    Input,
    /// The container or its debug info cannot be parsed.
    Format,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Input(_) | Error::Pattern(_) => ErrorKind::Input,
            Error::NotAnExecutable { .. }
            | Error::UnsupportedFormat { .. }
            | Error::DebugInfo { .. } => ErrorKind::Format,
            Error::Io { .. } => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to correlate one symbol. The matcher records these and moves on.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("symbol range 0x{start:x}..0x{end:x} lies outside section {section}")]
    OutOfSection { start: u64, end: u64, section: usize },

    #[error("no code section with index {0}")]
    MissingSection(usize),

    #[error("disassembler init failed: {0}")]
    Disassembler(#[from] capstone::Error),

    #[error("correlation panicked: {0}")]
    Panicked(String),
}
