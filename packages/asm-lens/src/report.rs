use std::io::{self, Write};

use serde_json::{json, Value};

use crate::model::{Block, Match, Output, SourceWindow};

/// Serialize `Output` into a compact JSON message.
/// Format:
/// {
///   "t": "matches",
///   "matches": [
///     { "name": ..., "start": "0x...",
///       "blocks": [ { "file": ..., "line": ..., "src_first": ..., "src": [...],
///                     "lines": [ [addr_hex, bytes, instr], ... ] } ] }
///   ],
///   "skipped": [ [name, reason], ... ]
/// }
pub fn serialize_compact(output: &Output) -> Value {
    let matches: Vec<Value> = output.matches.iter().map(compact_match).collect();
    let skipped: Vec<Value> = output
        .skipped
        .iter()
        .map(|s| json!([s.name, s.reason]))
        .collect();

    json!({
        "t": "matches",
        "matches": Value::Array(matches),
        "skipped": Value::Array(skipped),
    })
}

fn compact_match(m: &Match) -> Value {
    let blocks: Vec<Value> = m
        .blocks
        .iter()
        .zip(&m.sources)
        .map(|(block, window)| {
            let lines: Vec<Value> = block
                .instructions
                .iter()
                // Address as hex string for JS safe handling
                .map(|i| json!([format!("0x{:x}", i.address), i.bytes, i.text]))
                .collect();
            json!({
                "file": block.file,
                "line": block.line,
                "src_first": window.as_ref().map(|w| w.first_line),
                "src": window.as_ref().map(|w| w.lines.clone()),
                "lines": Value::Array(lines),
            })
        })
        .collect();

    json!({
        "name": m.name,
        "start": format!("0x{:x}", m.address),
        "blocks": Value::Array(blocks),
    })
}

/// Full output as pretty JSON, with the same field names as the Rust types.
pub fn to_json(output: &Output) -> serde_json::Result<String> {
    serde_json::to_string_pretty(output)
}

/// Plain-text rendering: for each match, every block's source window
/// followed by its instructions.
pub fn write_text<W: Write>(w: &mut W, output: &Output) -> io::Result<()> {
    if output.matches.is_empty() {
        writeln!(w, "no matches")?;
    }
    for (i, m) in output.matches.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        write_match(w, m)?;
    }
    for s in &output.skipped {
        writeln!(w, "skipped {}: {}", s.name, s.reason)?;
    }
    Ok(())
}

pub fn write_match<W: Write>(w: &mut W, m: &Match) -> io::Result<()> {
    writeln!(w, "{} 0x{:x} ({} bytes)", m.name, m.address, m.size)?;
    if m.blocks.is_empty() {
        writeln!(w, "  (empty)")?;
    }
    let width = m.instructions().map(|i| i.bytes.len()).max().unwrap_or(0);
    for (block, window) in m.blocks.iter().zip(&m.sources) {
        write_block_header(w, block, window.as_ref())?;
        for insn in &block.instructions {
            writeln!(
                w,
                "      0x{:<10x} {:<width$}  {}",
                insn.address,
                insn.bytes,
                insn.text,
                width = width
            )?;
        }
    }
    Ok(())
}

fn write_block_header<W: Write>(
    w: &mut W,
    block: &Block,
    window: Option<&SourceWindow>,
) -> io::Result<()> {
    let (Some(file), Some(line)) = (&block.file, block.line) else {
        return writeln!(w, "  ??");
    };
    writeln!(w, "  {}:{}", file, line)?;
    let Some(window) = window else {
        return writeln!(w, "    (source unavailable)");
    };
    for (offset, text) in window.lines.iter().enumerate() {
        let n = window.first_line + offset as u32;
        let marker = if n == line { '>' } else { ' ' };
        writeln!(w, "   {} {:>5} | {}", marker, n, text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instruction, SkippedSymbol};

    fn sample() -> Output {
        let insn = |address: u64, bytes: &str, text: &str, line: Option<u32>| Instruction {
            address,
            len: (bytes.len() as u32 + 1) / 3,
            bytes: bytes.into(),
            text: text.into(),
            file: line.map(|_| "/src/a.c".to_string()),
            line,
        };
        Output {
            matches: vec![Match {
                name: "main.foo".into(),
                address: 0x1000,
                size: 5,
                blocks: vec![
                    Block {
                        file: Some("/src/a.c".into()),
                        line: Some(2),
                        instructions: vec![
                            insn(0x1000, "55", "push rbp", Some(2)),
                            insn(0x1001, "48 89 e5", "mov rbp, rsp", Some(2)),
                        ],
                    },
                    Block {
                        file: None,
                        line: None,
                        instructions: vec![insn(0x1004, "c3", "ret", None)],
                    },
                ],
                sources: vec![
                    Some(SourceWindow {
                        file: "/src/a.c".into(),
                        first_line: 1,
                        lines: vec!["int f() {".into(), "  return 0;".into(), "}".into()],
                    }),
                    None,
                ],
            }],
            skipped: vec![SkippedSymbol {
                name: "bad".into(),
                reason: "outside section".into(),
            }],
        }
    }

    #[test]
    fn compact_basic() {
        let v = serialize_compact(&sample());
        assert_eq!(v["t"], "matches");
        let m = &v["matches"][0];
        assert_eq!(m["name"], "main.foo");
        assert_eq!(m["start"], "0x1000");
        let lines = m["blocks"][0]["lines"].as_array().expect("lines array");
        assert_eq!(lines.len(), 2);
        let first = lines[0].as_array().expect("line array");
        assert_eq!(first.len(), 3);
        assert!(first[0].as_str().unwrap().starts_with("0x"));
        assert_eq!(m["blocks"][0]["src_first"], 1);
        assert!(m["blocks"][1]["src"].is_null());
        assert_eq!(v["skipped"][0][0], "bad");
    }

    #[test]
    fn text_marks_resolved_line() {
        let mut buf = Vec::new();
        write_text(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("main.foo 0x1000 (5 bytes)\n"));
        assert!(text.contains("  /src/a.c:2\n"));
        assert!(text.contains(">     2 |   return 0;"));
        assert!(text.contains("  ??\n"));
        assert!(text.contains("mov rbp, rsp"));
        assert!(text.contains("skipped bad: outside section"));
    }

    #[test]
    fn text_empty_output() {
        let mut buf = Vec::new();
        write_text(&mut buf, &Output::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "no matches\n");
    }

    #[test]
    fn json_round_trips() {
        let out = sample();
        let s = to_json(&out).unwrap();
        let back: Output = serde_json::from_str(&s).unwrap();
        assert_eq!(back, out);
    }
}
