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

//! Symbol matching and assembly/source correlation.
//!
//! Symbols are filtered in symbol-table order until the match cap is hit.
//! Each accepted symbol is then disassembled, every instruction resolved to
//! a source line, and consecutive instructions with the same location are
//! grouped into blocks that carry a window of the surrounding source.
//!
//! Symbols are independent of each other, so the per-symbol work is spread
//! over a small pool of scoped worker threads. Workers send their results
//! back tagged with the accepted index and the main thread puts them back in
//! order, so the output doesn't depend on scheduling.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use log::{debug, info, warn};
use regex::Regex;

use crate::disasm::{DecodedInstruction, DisassemblerSet};
use crate::error::{Error, Result, SymbolError};
use crate::executable::Executable;
use crate::lines::LineTable;
use crate::model::{Block, Instruction, Match, Output, SkippedSymbol, SourceWindow};
use crate::source::SourceCache;
use crate::symbols::Symbol;
use crate::utils::hex_bytes;

pub const DEFAULT_CONTEXT: usize = 3;
pub const DEFAULT_MAX_MATCHES: i64 = 10;

#[derive(Debug, Clone)]
pub struct Options {
    /// Tested against the demangled and the raw symbol name.
    pub filter: Regex,
    /// Source lines shown on each side of a block's line.
    pub context: usize,
    /// Cap on accepted symbols; zero or less accepts nothing.
    pub max_matches: i64,
    /// Worker threads, 0 picks the available parallelism.
    pub jobs: usize,
}

impl Options {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::Input("filter pattern must not be empty".into()));
        }
        Ok(Self {
            filter: Regex::new(pattern)?,
            context: DEFAULT_CONTEXT,
            max_matches: DEFAULT_MAX_MATCHES,
            jobs: 0,
        })
    }

    pub fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }

    pub fn with_max_matches(mut self, max_matches: i64) -> Self {
        self.max_matches = max_matches;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Symbols whose name matches `filter`, in symbol-table order. Scanning stops
/// as soon as `max_matches` symbols are accepted.
pub fn select_symbols<'a>(exe: &'a Executable, filter: &Regex, max_matches: i64) -> Vec<&'a Symbol> {
    if max_matches <= 0 {
        return Vec::new();
    }
    let cap = usize::try_from(max_matches).unwrap_or(usize::MAX);

    let mut accepted = Vec::new();
    for sym in exe.symbols.iter() {
        let hit = filter.is_match(&sym.name)
            || (sym.raw_name != sym.name && filter.is_match(&sym.raw_name));
        if !hit {
            continue;
        }
        accepted.push(sym);
        if accepted.len() == cap {
            break;
        }
    }
    accepted
}

/// Match, disassemble and correlate. Never fails: symbols that can't be
/// processed end up in `Output::skipped` instead of aborting the batch.
pub fn build_output(exe: &Executable, options: &Options) -> Output {
    let now = Instant::now();
    let accepted = select_symbols(exe, &options.filter, options.max_matches);
    let sources = SourceCache::new();
    let jobs = worker_count(options.jobs, accepted.len());
    debug!(
        "Accepted {} symbols for /{}/, {} workers",
        accepted.len(),
        options.filter,
        jobs
    );

    let mut results: Vec<(usize, std::result::Result<Match, SymbolError>)> =
        Vec::with_capacity(accepted.len());

    if jobs <= 1 {
        let mut engines = DisassemblerSet::new();
        for (index, sym) in accepted.iter().enumerate() {
            let result = guarded(|| {
                correlate_symbol(exe, sym, &mut engines, &sources, options.context)
            });
            results.push((index, result));
        }
    } else {
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..jobs {
                let tx = tx.clone();
                let next = &next;
                let accepted = &accepted;
                let sources = &sources;
                scope.spawn(move || {
                    let mut engines = DisassemblerSet::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(sym) = accepted.get(index) else {
                            break;
                        };
                        let result = guarded(|| {
                            correlate_symbol(exe, sym, &mut engines, sources, options.context)
                        });
                        if tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            // Only the workers hold senders now, the loop ends when they finish
            drop(tx);
            results.extend(rx);
        });
        results.sort_unstable_by_key(|(index, _)| *index);
    }

    let mut output = Output::default();
    for (index, result) in results {
        let sym = accepted[index];
        match result {
            Ok(m) => output.matches.push(m),
            Err(e) => {
                warn!("Skipping {}: {}", sym.name, e);
                output.skipped.push(SkippedSymbol {
                    name: sym.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Matched {} symbols ({} skipped) in {:.2?}",
        output.matches.len(),
        output.skipped.len(),
        now.elapsed()
    );
    output
}

/// Run one symbol's correlation, turning a panic into a per-symbol error so
/// the rest of the batch still completes.
fn guarded<F>(correlate: F) -> std::result::Result<Match, SymbolError>
where
    F: FnOnce() -> std::result::Result<Match, SymbolError>,
{
    panic::catch_unwind(AssertUnwindSafe(correlate)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(SymbolError::Panicked(message))
    })
}

fn worker_count(requested: usize, work: usize) -> usize {
    let wanted = if requested == 0 {
        thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        requested
    };
    wanted.min(work).max(1)
}

/// Disassemble one symbol and group its instructions by source location.
pub fn correlate_symbol(
    exe: &Executable,
    sym: &Symbol,
    engines: &mut DisassemblerSet,
    sources: &SourceCache,
    context: usize,
) -> std::result::Result<Match, SymbolError> {
    let code = exe.symbol_bytes(sym)?;
    let instructions: Vec<Instruction> = if code.is_empty() {
        Vec::new()
    } else {
        engines
            .get(exe.arch, sym.mode)?
            .decode(code, sym.address)
            .into_iter()
            .map(|decoded| resolve_instruction(&exe.lines, decoded))
            .collect()
    };

    let blocks = group_blocks(instructions);
    let windows: Vec<Option<SourceWindow>> = blocks
        .iter()
        .map(|block| match (&block.file, block.line) {
            (Some(file), Some(line)) => sources.lines(file, line, context),
            _ => None,
        })
        .collect();

    debug!(
        "{}: {} bytes, {} blocks, {} with source",
        sym.name,
        code.len(),
        blocks.len(),
        windows.iter().filter(|w| w.is_some()).count()
    );

    Ok(Match {
        name: sym.name.clone(),
        address: sym.address,
        size: sym.size,
        blocks,
        sources: windows,
    })
}

fn resolve_instruction(lines: &LineTable, decoded: DecodedInstruction) -> Instruction {
    let location = lines.resolve(decoded.address);
    Instruction {
        address: decoded.address,
        len: decoded.len() as u32,
        bytes: hex_bytes(&decoded.bytes),
        text: decoded.text(),
        file: location.map(|l| l.file.to_string()),
        line: location.map(|l| l.line),
    }
}

/// Split an instruction sequence into runs that share a source location.
///
/// A new block starts whenever (file, line) differs from the previous
/// instruction's. Unknown locations group only with directly adjacent
/// unknowns, and a line that comes back later starts a fresh block.
pub fn group_blocks(instructions: Vec<Instruction>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for insn in instructions {
        if let Some(block) = blocks.last_mut() {
            if block_location(block) == insn.location() {
                block.instructions.push(insn);
                continue;
            }
        }
        let (file, line) = match insn.location() {
            Some((file, line)) => (Some(file.to_string()), Some(line)),
            None => (None, None),
        };
        blocks.push(Block {
            file,
            line,
            instructions: vec![insn],
        });
    }
    blocks
}

fn block_location(block: &Block) -> Option<(&str, u32)> {
    match (&block.file, block.line) {
        (Some(file), Some(line)) => Some((file.as_str(), line)),
        _ => None,
    }
}
