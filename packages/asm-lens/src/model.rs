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

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::utils::hex_address;

// Output types handed to the presentation layer. Everything here is plain
// data: a UI, a report writer or a JSON consumer can use it as is. For all
// the structs, 64-bit addresses are hex strings in the JSON to avoid issues
// with JavaScript number precision.

/// One decoded instruction together with its resolved source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Instruction {
    #[serde(with = "hex_address")]
    #[ts(type = "string")]
    pub address: u64,
    pub len: u32,
    /// Raw encoding, "55 48 89 e5"
    pub bytes: String,
    /// Mnemonic and operands
    pub text: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Instruction {
    pub fn end(&self) -> u64 {
        self.address + self.len as u64
    }

    /// Grouping key: `None` means "unknown" and only equals another unknown.
    pub fn location(&self) -> Option<(&str, u32)> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some((file.as_str(), line)),
            _ => None,
        }
    }
}

/// A maximal run of consecutive instructions sharing one source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Block {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn is_known(&self) -> bool {
        self.file.is_some() && self.line.is_some()
    }

    pub fn start(&self) -> Option<u64> {
        self.instructions.first().map(|i| i.address)
    }
}

/// Lines `first_line..first_line + lines.len()` of `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceWindow {
    pub file: String,
    pub first_line: u32,
    pub lines: Vec<String>,
}

impl SourceWindow {
    pub fn last_line(&self) -> u32 {
        self.first_line + self.lines.len() as u32 - 1
    }

    pub fn contains(&self, line: u32) -> bool {
        !self.lines.is_empty() && line >= self.first_line && line <= self.last_line()
    }

    /// Text of `line` if it lies inside the window.
    pub fn line(&self, line: u32) -> Option<&str> {
        if !self.contains(line) {
            return None;
        }
        self.lines
            .get((line - self.first_line) as usize)
            .map(String::as_str)
    }
}

/// Correlated result for one accepted symbol. `sources[i]` belongs to
/// `blocks[i]` and is `None` for unknown blocks or unreadable files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Match {
    pub name: String,
    #[serde(with = "hex_address")]
    #[ts(type = "string")]
    pub address: u64,
    pub size: u64,
    pub blocks: Vec<Block>,
    pub sources: Vec<Option<SourceWindow>>,
}

impl Match {
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }
}

/// An accepted symbol that could not be correlated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkippedSymbol {
    pub name: String,
    pub reason: String,
}

/// Root object returned by the matcher. Matches are in symbol-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Output {
    pub matches: Vec<Match>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedSymbol>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds() {
        let w = SourceWindow {
            file: "/a.c".into(),
            first_line: 4,
            lines: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(w.last_line(), 6);
        assert!(w.contains(4) && w.contains(6));
        assert!(!w.contains(3) && !w.contains(7));
        assert_eq!(w.line(5), Some("b"));
        assert_eq!(w.line(7), None);
    }

    #[test]
    fn addresses_serialize_as_hex() {
        let insn = Instruction {
            address: 0x401000,
            len: 1,
            bytes: "c3".into(),
            text: "ret".into(),
            file: None,
            line: None,
        };
        let v = serde_json::to_value(&insn).unwrap();
        assert_eq!(v["address"], "0x401000");
        let back: Instruction = serde_json::from_value(v).unwrap();
        assert_eq!(back, insn);
        assert_eq!(back.location(), None);
    }
}
