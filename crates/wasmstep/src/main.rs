use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use wasmstep::{heap_data_from_wasm, Heap};
use wasmstep_runtime::PAGE_SIZE;

/// wasmstep — inspect the heap a WebAssembly module would start with.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input WebAssembly binary (.wasm)
    input: PathBuf,

    /// Hex-dump the first N bytes of the initialized heap
    #[arg(long, value_name = "N")]
    dump_bytes: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    eprintln!("wasmstep: reading {}", cli.input.display());

    let wasm_bytes =
        fs::read(&cli.input).with_context(|| format!("failed to read {}", cli.input.display()))?;

    let heap_data = heap_data_from_wasm(&wasm_bytes).context("failed to parse module")?;

    println!(
        "initial heap: {} bytes ({} pages)",
        heap_data.start_size,
        heap_data.start_size / PAGE_SIZE
    );
    println!("data segments: {}", heap_data.segments.len());
    for (i, segment) in heap_data.segments.iter().enumerate() {
        println!(
            "  segment {i}: offset {} len {}",
            segment.offset,
            segment.data.len()
        );
    }

    if let Some(n) = cli.dump_bytes {
        let heap = Heap::from_data(&heap_data)
            .map_err(|e| anyhow!("failed to initialize heap: {e}"))?;
        let n = n.min(heap.size());
        let bytes = heap
            .get_bytes(0, n)
            .map_err(|e| anyhow!("failed to read heap: {e}"))?;
        for (row_index, row) in bytes.chunks(16).enumerate() {
            let hex: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
            println!("{:08x}  {}", row_index * 16, hex.join(" "));
        }
    }

    eprintln!("wasmstep: done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["wasmstep", "input.wasm"]);
        assert_eq!(cli.input, PathBuf::from("input.wasm"));
        assert!(cli.dump_bytes.is_none());
    }

    #[test]
    fn cli_parses_dump_bytes() {
        let cli = Cli::parse_from(["wasmstep", "input.wasm", "--dump-bytes", "64"]);
        assert_eq!(cli.dump_bytes, Some(64));
    }
}
