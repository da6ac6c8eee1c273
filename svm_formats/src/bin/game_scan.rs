use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use svm_formats::scan_directory;

#[derive(Parser, Debug)]
#[command(about = "List game files with the fingerprints used for detection", version)]
struct Args {
    /// Game directory to scan
    path: PathBuf,

    /// Directory depth to descend into
    #[arg(long, default_value_t = 1)]
    depth: usize,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let scan = scan_directory(&args.path, args.depth)?;
    let mut fingerprints = Vec::with_capacity(scan.len());
    let names: Vec<String> = scan.file_names().map(str::to_string).collect();
    for name in &names {
        if let Some(fp) = scan.fingerprint(name)? {
            fingerprints.push(fp);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fingerprints)?);
        return Ok(());
    }

    println!("{} files in {}", fingerprints.len(), scan.root().display());
    for fp in &fingerprints {
        println!(
            "{name:<32} {size:>10} {hash}",
            name = fp.name,
            size = fp.size,
            hash = &fp.hash[..16]
        );
    }
    Ok(())
}
