use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use svm_formats::read_savegame;

#[derive(Parser, Debug)]
#[command(about = "Print the header of a savegame slot file", version)]
struct Args {
    /// Slot file to inspect (e.g. saves/castlemaster.001)
    path: PathBuf,

    /// Write the thumbnail as raw RGBA8888 bytes to this path
    #[arg(long)]
    thumbnail_rgba: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file = File::open(&args.path)
        .with_context(|| format!("opening {}", args.path.display()))?;
    let save = read_savegame(&mut BufReader::new(file))
        .with_context(|| format!("parsing {}", args.path.display()))?;

    println!("version      : {}", save.header.version);
    println!("description  : {}", save.header.description);
    println!("engine       : {}", save.header.engine_id);
    println!(
        "play time    : {}:{:02}:{:02}",
        save.info.play_time_secs / 3600,
        (save.info.play_time_secs / 60) % 60,
        save.info.play_time_secs % 60
    );
    let date = save.info.date;
    if date.is_unset() {
        println!("saved        : unknown");
    } else {
        println!(
            "saved        : {:04}-{:02}-{:02} {:02}:{:02}",
            date.year, date.month, date.day, date.hour, date.minute
        );
    }
    match save.thumbnail.as_ref() {
        Some(thumb) => println!("thumbnail    : {}x{}", thumb.width, thumb.height),
        None => println!("thumbnail    : none"),
    }
    println!("payload      : {} bytes", save.payload.len());

    if let (Some(path), Some(thumb)) = (args.thumbnail_rgba.as_ref(), save.thumbnail.as_ref()) {
        std::fs::write(path, thumb.to_rgba8888())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote thumbnail pixels to {}", path.display());
    }
    Ok(())
}
