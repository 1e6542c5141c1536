use asm_lens::report::serialize_compact;
use asm_lens::{build_output, Executable, Options};

// Usage: print_compact <executable> [filter]
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or_else(|| anyhow::anyhow!("missing executable"))?;
    let filter = args.next().unwrap_or_else(|| "main".to_string());

    let exe = Executable::load(&path)?;
    let output = build_output(&exe, &Options::new(&filter)?);
    eprintln!("{}", serde_json::to_string_pretty(&serialize_compact(&output))?);
    Ok(())
}
