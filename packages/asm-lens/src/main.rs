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

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::debug;

use asm_lens::matcher::{DEFAULT_CONTEXT, DEFAULT_MAX_MATCHES};
use asm_lens::view::DEFAULT_TEXT_SIZE;
use asm_lens::{
    build_output, logging, report, Error, ErrorKind, Executable, Options, Output, ViewConfig,
    ViewState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Source windows followed by their instructions
    Text,
    /// Full output as JSON
    Json,
    /// Compact JSON, one tuple per instruction
    Compact,
}

/// Show the disassembly of matching functions next to the source lines they
/// came from.
#[derive(Parser, Debug)]
#[command(name = "asm-lens", version, about)]
struct Cli {
    /// Filter the symbols by regexp
    #[arg(short = 'f', long = "filter", value_parser = non_empty)]
    filter: String,

    /// Source lines of context around each block
    #[arg(short = 'c', long = "context", default_value_t = DEFAULT_CONTEXT)]
    context: usize,

    /// Maximum number of matches to parse
    #[arg(
        short = 'm',
        long = "max-matches",
        default_value_t = DEFAULT_MAX_MATCHES,
        allow_negative_numbers = true
    )]
    max_matches: i64,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 'j', long = "jobs", default_value_t = 0)]
    jobs: usize,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Only show the match with this index
    #[arg(long = "select")]
    select: Option<usize>,

    /// Default font size for graphical front ends
    #[arg(long = "text-size", default_value_t = DEFAULT_TEXT_SIZE)]
    text_size: u32,

    /// User font for graphical front ends
    #[arg(long = "font")]
    font: Option<PathBuf>,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,

    /// Executable to inspect
    executable: PathBuf,
}

fn non_empty(s: &str) -> std::result::Result<String, String> {
    if s.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match logging::init(cli.debug) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            None
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("asm-lens: {:#}", e);
            match e.downcast_ref::<Error>().map(Error::kind) {
                Some(ErrorKind::Input) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Input errors are reported before the executable is touched
    let view_config = view_config(cli)?;
    let options = Options::new(&cli.filter)?
        .with_context(cli.context)
        .with_max_matches(cli.max_matches)
        .with_jobs(cli.jobs);
    debug!("{:?} {:?}", options, view_config);

    let exe = Executable::load(&cli.executable)
        .with_context(|| format!("loading {}", cli.executable.display()))?;
    let output = build_output(&exe, &options);

    let output = match cli.select {
        Some(index) => select_one(&output, index)?,
        None => output,
    };

    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    match cli.format {
        Format::Text => report::write_text(&mut w, &output)?,
        Format::Json => writeln!(w, "{}", report::to_json(&output)?)?,
        Format::Compact => {
            serde_json::to_writer(&mut w, &report::serialize_compact(&output))?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn view_config(cli: &Cli) -> asm_lens::Result<ViewConfig> {
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(Error::Input(format!(
                "font {} is not a readable file",
                font.display()
            )));
        }
    }
    Ok(ViewConfig {
        text_size: cli.text_size,
        font: cli.font.clone(),
    })
}

fn select_one(output: &Output, index: usize) -> Result<Output> {
    let mut state = ViewState::new();
    state.select_index(output, index);
    let Some(m) = state.selected_match(output) else {
        bail!(Error::Input(format!(
            "--select {} is out of range, {} matches",
            index,
            output.matches.len()
        )));
    };
    Ok(Output {
        matches: vec![m.clone()],
        skipped: Vec::new(),
    })
}
