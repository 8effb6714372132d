mod archive;
mod bytes_io;
mod cipher;
mod cli;
mod crc32;
mod deflate;
mod entry;
mod error;
mod ies;

// Lightweight verbosity-gated logging helper used throughout the crate.
macro_rules! vprintln {
    ($verbose:expr, $level:expr, $($arg:tt)*) => {
        if $verbose >= $level {
            eprintln!($($arg)*);
        }
    };
}

use anyhow::Context;
use clap::Parser;

use crate::archive::Archive;
use crate::cli::{BuildConfig, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let config = BuildConfig::try_from(cli).context("invalid arguments")?;

    vprintln!(verbose, 1, "packing {:?} -> {:?}", config.input, config.output);

    let mut archive = Archive::new(config.old_version, config.new_version);
    archive
        .add_folder(config.pack_name.as_deref(), &config.input)
        .with_context(|| format!("ingesting {:?}", config.input))?;

    vprintln!(verbose, 1, "{} entries collected", archive.entries().len());

    archive
        .save(&config.output)
        .with_context(|| format!("saving {:?}", config.output))?;

    println!(
        "{}",
        serde_json::json!({
            "output": config.output,
            "entries": archive.entries().len(),
            "old_version": config.old_version,
            "new_version": config.new_version,
        })
    );

    Ok(())
}
