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

use std::collections::HashMap;

use capstone::prelude::*;
use log::debug;

use crate::symbols::CodeMode;

/// Mnemonic used for bytes capstone can't decode.
pub const BAD_INSTRUCTION: &str = "(bad)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Arm,
    Aarch64,
    Riscv32,
    Riscv64,
}

impl Arch {
    pub fn from_object(arch: object::Architecture) -> Option<Self> {
        match arch {
            object::Architecture::I386 => Some(Arch::X86),
            object::Architecture::X86_64 => Some(Arch::X86_64),
            object::Architecture::Arm => Some(Arch::Arm),
            object::Architecture::Aarch64 => Some(Arch::Aarch64),
            object::Architecture::Riscv32 => Some(Arch::Riscv32),
            object::Architecture::Riscv64 => Some(Arch::Riscv64),
            _ => None,
        }
    }

    /// Width of the raw-bytes unit emitted when decoding fails.
    pub fn min_instruction_len(self, mode: CodeMode) -> usize {
        match (self, mode) {
            (Arch::X86 | Arch::X86_64, _) => 1,
            (Arch::Arm, CodeMode::Thumb) => 2,
            (Arch::Arm | Arch::Aarch64, _) => 4,
            (Arch::Riscv32 | Arch::Riscv64, _) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub address: u64,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
    pub op_str: String,
}

impl DecodedInstruction {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn text(&self) -> String {
        if self.op_str.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.op_str)
        }
    }
}

pub struct Disassembler {
    cs: Capstone,
    raw_width: usize,
}

impl Disassembler {
    pub fn new(arch: Arch, mode: CodeMode) -> Result<Self, capstone::Error> {
        let cs = match (arch, mode) {
            (Arch::X86, _) => Capstone::new()
                .x86()
                .mode(arch::x86::ArchMode::Mode32)
                .build()?,
            (Arch::X86_64, _) => Capstone::new()
                .x86()
                .mode(arch::x86::ArchMode::Mode64)
                .build()?,
            // For Cortex-M, we use ARM + Thumb mode
            (Arch::Arm, CodeMode::Thumb) => Capstone::new()
                .arm()
                .mode(arch::arm::ArchMode::Thumb)
                .extra_mode([arch::arm::ArchExtraMode::V8].iter().copied())
                .build()?,
            (Arch::Arm, CodeMode::Default) => Capstone::new()
                .arm()
                .mode(arch::arm::ArchMode::Arm)
                .build()?,
            (Arch::Aarch64, _) => Capstone::new()
                .arm64()
                .mode(arch::arm64::ArchMode::Arm)
                .build()?,
            (Arch::Riscv32, _) => Capstone::new()
                .riscv()
                .mode(arch::riscv::ArchMode::RiscV32)
                .extra_mode([arch::riscv::ArchExtraMode::RiscVC].iter().copied())
                .build()?,
            (Arch::Riscv64, _) => Capstone::new()
                .riscv()
                .mode(arch::riscv::ArchMode::RiscV64)
                .extra_mode([arch::riscv::ArchExtraMode::RiscVC].iter().copied())
                .build()?,
        };

        Ok(Self {
            cs,
            raw_width: arch.min_instruction_len(mode),
        })
    }

    /// Disassembles a block of memory.
    ///
    /// Never fails as a whole: wherever capstone stops, one `(bad)` unit of
    /// the architecture's minimum width is emitted and decoding resumes after
    /// it. The result covers `code` exactly, without gaps.
    pub fn decode(&self, code: &[u8], address: u64) -> Vec<DecodedInstruction> {
        let mut results = Vec::new();
        let mut offset = 0usize;

        while offset < code.len() {
            let at = address + offset as u64;
            match self.cs.disasm_all(&code[offset..], at) {
                Ok(insns) => {
                    for i in insns.iter() {
                        let bytes = i.bytes();
                        offset += bytes.len();
                        results.push(DecodedInstruction {
                            address: i.address(),
                            bytes: bytes.to_vec(),
                            mnemonic: i.mnemonic().unwrap_or("").to_string(),
                            op_str: i.op_str().unwrap_or("").to_string(),
                        });
                    }
                }
                Err(e) => debug!("capstone failed at 0x{:x}: {}", at, e),
            }

            if offset < code.len() {
                // capstone stopped short, skip over the undecodable bytes
                let width = self.raw_width.min(code.len() - offset);
                results.push(DecodedInstruction {
                    address: address + offset as u64,
                    bytes: code[offset..offset + width].to_vec(),
                    mnemonic: BAD_INSTRUCTION.to_string(),
                    op_str: String::new(),
                });
                offset += width;
            }
        }

        results
    }
}

/// Lazily created engines, one per (arch, mode). Capstone handles are not
/// `Send`, so every worker thread owns its own set.
#[derive(Default)]
pub struct DisassemblerSet {
    engines: HashMap<(Arch, CodeMode), Disassembler>,
}

impl DisassemblerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, arch: Arch, mode: CodeMode) -> Result<&Disassembler, capstone::Error> {
        if !self.engines.contains_key(&(arch, mode)) {
            let engine = Disassembler::new(arch, mode)?;
            self.engines.insert((arch, mode), engine);
        }
        Ok(&self.engines[&(arch, mode)])
    }
}
