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

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use memmap2::Mmap;
use object::{BinaryFormat, Object, ObjectSection, ObjectSymbol, SectionKind, SymbolKind};

use crate::disasm::Arch;
use crate::error::{Error, Result, SymbolError};
use crate::lines::LineTable;
use crate::section::CodeSection;
use crate::symbols::{demangle, CodeMode, Symbol, SymbolTable};

/// Everything the matcher needs from one executable image: its code
/// symbols, the bytes of its code sections and the address to line table.
///
/// Built once and read-only afterwards. It owns all of its data, so it can
/// be shared by reference between worker threads.
#[derive(Debug)]
pub struct Executable {
    pub path: PathBuf,
    pub arch: Arch,
    /// Code symbols in symbol-table order
    pub symbols: SymbolTable,
    /// Executable sections from the image (e.g., .text, .init, .plt)
    pub sections: Vec<CodeSection>,
    /// Line number information from DWARF debug info
    pub lines: LineTable,
}

impl Executable {
    /// Parse an ELF, Mach-O or PE image (linked or relocatable).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let now = Instant::now();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        // SAFETY: the map is only read during loading; everything kept is copied out.
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
        let obj = object::File::parse(&*mmap).map_err(|source| Error::NotAnExecutable {
            path: path.to_path_buf(),
            source,
        })?;

        let arch = Arch::from_object(obj.architecture()).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("architecture {:?}", obj.architecture()),
        })?;

        let mut sections = Vec::new();
        let mut slots = HashMap::new();
        for section in obj.sections() {
            if section.kind() != SectionKind::Text {
                continue;
            }
            let data = section
                .uncompressed_data()
                .map_err(|source| Error::NotAnExecutable {
                    path: path.to_path_buf(),
                    source,
                })?;
            let name = section.name().unwrap_or("").to_string();
            debug!(
                "Code section {} at 0x{:x}, {} bytes",
                name,
                section.address(),
                data.len()
            );
            slots.insert(section.index(), sections.len());
            sections.push(CodeSection::new(name, section.address(), data.into_owned()));
        }

        let mut found = Vec::new();
        for sym in obj.symbols() {
            if sym.kind() != SymbolKind::Text || !sym.is_definition() {
                continue;
            }
            // Data symbols and anything outside a code section are skipped
            let Some(&slot) = sym.section_index().and_then(|index| slots.get(&index)) else {
                continue;
            };
            let raw = match sym.name() {
                Ok(name) if !name.is_empty() => name,
                _ => continue,
            };
            let (address, mode) = code_address(arch, sym.address());
            found.push(Symbol {
                name: demangle(raw),
                raw_name: raw.to_string(),
                address,
                size: sym.size(),
                section: slot,
                mode,
            });
        }

        // Only ELF records sizes; elsewhere a zero size just means unknown
        if obj.format() != BinaryFormat::Elf {
            infer_sizes(&mut found, &sections);
        }
        let mut symbols = SymbolTable::new();
        for sym in found {
            symbols.insert(sym);
        }

        let lines = LineTable::load(&obj, &sections).map_err(|source| Error::DebugInfo {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Loaded {}: {:?}, {} code sections, {} symbols, {} line spans in {:.2?}",
            path.display(),
            arch,
            sections.len(),
            symbols.len(),
            lines.len(),
            now.elapsed()
        );

        Ok(Self {
            path: path.to_path_buf(),
            arch,
            symbols,
            sections,
            lines,
        })
    }

    /// Assemble an executable from already-parsed pieces.
    pub fn from_parts(
        arch: Arch,
        symbols: SymbolTable,
        sections: Vec<CodeSection>,
        lines: LineTable,
    ) -> Self {
        Self {
            path: PathBuf::new(),
            arch,
            symbols,
            sections,
            lines,
        }
    }

    /// The bytes covered by `sym`, clipped to the end of its section.
    pub fn symbol_bytes(&self, sym: &Symbol) -> std::result::Result<&[u8], SymbolError> {
        let section = self
            .sections
            .get(sym.section)
            .ok_or(SymbolError::MissingSection(sym.section))?;
        section
            .bytes(sym.address, sym.size)
            .ok_or(SymbolError::OutOfSection {
                start: sym.address,
                end: sym.end(),
                section: sym.section,
            })
    }
}

/// Give every zero-sized symbol the distance to the next symbol in its
/// section, or to the section end for the last one.
fn infer_sizes(symbols: &mut [Symbol], sections: &[CodeSection]) {
    let mut starts: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
    for sym in symbols.iter() {
        starts.entry(sym.section).or_default().push(sym.address);
    }
    for addresses in starts.values_mut() {
        addresses.sort_unstable();
        addresses.dedup();
    }

    for sym in symbols.iter_mut().filter(|s| s.size == 0) {
        let Some(section) = sections.get(sym.section) else {
            continue;
        };
        let next = starts
            .get(&sym.section)
            .and_then(|addresses| {
                let i = addresses.partition_point(|&a| a <= sym.address);
                addresses.get(i).copied()
            })
            .unwrap_or_else(|| section.end());
        sym.size = next.saturating_sub(sym.address);
    }
}

/// On ARM the low address bit marks Thumb code and is not part of the address.
fn code_address(arch: Arch, address: u64) -> (u64, CodeMode) {
    if arch == Arch::Arm && address & 1 == 1 {
        (address & !1, CodeMode::Thumb)
    } else {
        (address, CodeMode::Default)
    }
}
