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

//! Address to source line resolution.
//!
//! The DWARF line programs are walked once at load time (through
//! `addr2line`, which takes care of joining compilation directories, include
//! directories and file names) and flattened into a sorted map of address
//! spans. Lookups afterwards are read-only, so the table can be shared by all
//! matcher workers and queried in any order.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use gimli::{EndianRcSlice, RunTimeEndian};
use log::{debug, warn};
use object::{Object, ObjectSection};

use crate::section::CodeSection;
use crate::utils::canonicalize_path;

#[derive(Debug, Default)]
pub struct FileTable {
    // Map from file index to file path
    files_by_id: BTreeMap<u32, String>,
    id_by_file: BTreeMap<String, u32>,
    // Paths exactly as the line programs spell them
    id_by_raw: HashMap<String, u32>,
    next_id: u32,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: &str) -> u32 {
        if let Some(&id) = self.id_by_raw.get(path) {
            return id;
        }
        let fp = canonicalize_path(path);
        let id = match self.id_by_file.get(&fp) {
            Some(&id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                self.files_by_id.insert(id, fp.clone());
                self.id_by_file.insert(fp, id);
                id
            }
        };
        self.id_by_raw.insert(path.to_string(), id);
        id
    }

    pub fn get_by_id(&self, id: u32) -> Option<&str> {
        self.files_by_id.get(&id).map(String::as_str)
    }

    pub fn get_by_path(&self, path: &str) -> Option<u32> {
        if let Some(&id) = self.id_by_raw.get(path).or_else(|| self.id_by_file.get(path)) {
            return Some(id);
        }
        self.id_by_file.get(&canonicalize_path(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.files_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files_by_id.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineSpan {
    end: u64,
    file_id: u32,
    line: u32,
}

/// A resolved source position. Lines are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    pub file: &'a str,
    pub line: u32,
}

#[derive(Debug, Default)]
pub struct LineTable {
    files: FileTable,
    // Keyed by span start address
    spans: BTreeMap<u64, LineSpan>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `[start, start + len)` was generated from `file:line`.
    ///
    /// Empty spans and line 0 (compiler generated code) carry no location and
    /// are dropped. When two spans start at the same address the first one
    /// recorded is kept.
    pub fn insert(&mut self, start: u64, len: u64, file: &str, line: u32) {
        if len == 0 || line == 0 {
            return;
        }
        let file_id = self.files.intern(file);
        self.spans.entry(start).or_insert(LineSpan {
            end: start.saturating_add(len),
            file_id,
            line,
        });
    }

    /// Nearest span starting at or before `address` that still covers it.
    pub fn resolve(&self, address: u64) -> Option<SourceLocation<'_>> {
        let (_, span) = self.spans.range(..=address).next_back()?;
        if address >= span.end {
            return None;
        }
        let file = self.files.get_by_id(span.file_id)?;
        Some(SourceLocation {
            file,
            line: span.line,
        })
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Build the table for every code section from the object's DWARF.
    ///
    /// An object without `.debug_line` yields an empty table; DWARF that is
    /// present but malformed is an error.
    ///
    /// Sections whose address ranges overlap (unrelocated `.text.*` sections
    /// of an object file all start at 0) get no line info, since their rows
    /// can't be told apart.
    pub fn load(obj: &object::File<'_>, sections: &[CodeSection]) -> Result<Self, gimli::Error> {
        let mut table = LineTable::new();
        if obj.section_by_name(".debug_line").is_none() {
            debug!("No .debug_line section, all locations will be unknown");
            return Ok(table);
        }

        let endian = if obj.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        // Load DWARF sections
        let load_section = |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
            let data = obj
                .section_by_name(id.name())
                .and_then(|s| s.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[][..]));

            let data_rc: Rc<[u8]> = match data {
                Cow::Borrowed(b) => Rc::from(b),
                Cow::Owned(o) => Rc::from(o),
            };
            Ok(EndianRcSlice::new(data_rc, endian))
        };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = addr2line::Context::from_dwarf(dwarf)?;

        let ambiguous = overlapping_sections(sections);
        for (index, section) in sections.iter().enumerate() {
            if ambiguous[index] {
                warn!(
                    "{} overlaps another code section at 0x{:x}, leaving its lines unknown",
                    section.name, section.start
                );
                continue;
            }
            for (addr, len, loc) in ctx.find_location_range(section.start, section.end())? {
                if let (Some(file), Some(line)) = (loc.file, loc.line) {
                    table.insert(addr, len, file, line);
                }
            }
            debug!(
                "Line info for {}: {} spans so far, {} files",
                section.name,
                table.len(),
                table.files.len()
            );
        }
        Ok(table)
    }
}

/// Flags every non-empty section whose range intersects another one.
fn overlapping_sections(sections: &[CodeSection]) -> Vec<bool> {
    let mut order: Vec<usize> = (0..sections.len())
        .filter(|&i| sections[i].size() > 0)
        .collect();
    order.sort_by_key(|&i| sections[i].start);

    let mut flags = vec![false; sections.len()];
    // Index of the furthest reaching section seen so far
    let mut reach: Option<usize> = None;
    for i in order {
        if let Some(prev) = reach {
            if sections[i].start < sections[prev].end() {
                flags[i] = true;
                flags[prev] = true;
                if sections[i].end() <= sections[prev].end() {
                    continue;
                }
            }
        }
        reach = Some(i);
    }
    flags
}
