//! BLND CLI - Command-line tool for BLND animation blend files.
//!
//! This is the main entry point for the `blnd` command-line application.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use blnd::prelude::*;

/// BLND - animation blend file tool
#[derive(Parser)]
#[command(name = "blnd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a file and encode it again
    Roundtrip {
        /// Input BLND file
        #[arg(short, long, env = "BLND_INPUT")]
        input: PathBuf,

        /// Output BLND file
        #[arg(short, long, env = "BLND_OUTPUT")]
        output: PathBuf,
    },

    /// Dump a decoded file as JSON
    Dump {
        /// Input BLND file
        #[arg(short, long, env = "BLND_INPUT")]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long, env = "BLND_OUTPUT")]
        output: PathBuf,
    },

    /// Show header fields and collection counts
    Info {
        /// Input BLND file
        #[arg(short, long, env = "BLND_INPUT")]
        input: PathBuf,
    },

    /// Check round-trip identity for every BLND file under a directory
    Verify {
        /// Directory to search
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Roundtrip { input, output } => {
            cmd_roundtrip(&input, &output)?;
        }
        Commands::Dump { input, output } => {
            cmd_dump(&input, &output)?;
        }
        Commands::Info { input } => {
            cmd_info(&input)?;
        }
        Commands::Verify { dir } => {
            cmd_verify(&dir)?;
        }
    }

    Ok(())
}

fn cmd_roundtrip(input: &Path, output: &Path) -> Result<()> {
    println!("Round-tripping: {} -> {}", input.display(), output.display());

    let start = Instant::now();
    let original = fs::read(input).context("Failed to read input file")?;
    let file = BlendFile::parse(&original).context("Failed to decode BLND file")?;
    let encoded = file.to_bytes().context("Failed to encode BLND file")?;
    fs::write(output, &encoded).context("Failed to write output file")?;

    if encoded == original {
        println!("Identical ({} bytes) in {:?}", encoded.len(), start.elapsed());
    } else {
        let first_diff = original
            .iter()
            .zip(&encoded)
            .position(|(a, b)| a != b)
            .unwrap_or(original.len().min(encoded.len()));
        println!(
            "Different: {} bytes in, {} bytes out, first difference at {:#x}",
            original.len(),
            encoded.len(),
            first_diff
        );
    }

    Ok(())
}

fn cmd_dump(input: &Path, output: &Path) -> Result<()> {
    println!("Dumping: {} -> {}", input.display(), output.display());

    let file = BlendFile::open(input).context("Failed to decode BLND file")?;
    let json = file.to_json_string().context("Failed to render JSON")?;
    fs::write(output, json).context("Failed to write output file")?;

    println!("Dump complete");

    Ok(())
}

fn cmd_info(input: &Path) -> Result<()> {
    let file = BlendFile::open(input).context("Failed to decode BLND file")?;
    let header = &file.header;
    let pool = &file.pool;

    println!("File: {}", input.display());
    println!(
        "Header: engine {:#010x}, block {:#010x}, version {}",
        header.engine_type, header.block_type, header.block_version
    );
    println!(
        "Pool: format token {:#010x}, version {}, cascade blend {} ({})",
        pool.format_token, pool.version, pool.use_cascade_blend, pool.cascade_blend_value
    );
    println!("Skeleton: {}", pool.skeleton.path);
    println!();
    println!("{:>8} clips", pool.clips.len());
    println!("{:>8} blends", pool.blends.len());
    println!("{:>8} transitions", pool.transitions.len());
    println!("{:>8} tracks", pool.tracks.len());
    println!("{:>8} masks", pool.masks.len());
    println!("{:>8} event lists", pool.events.len());
    println!("{:>8} animations", pool.anims.len());
    println!("{:>8} animation names", pool.anim_names.len());

    let mut clip_types: BTreeMap<String, usize> = BTreeMap::new();
    for clip in &pool.clips {
        *clip_types.entry(format!("{:?}", clip.clip_type())).or_default() += 1;
    }
    if !clip_types.is_empty() {
        println!();
        for (clip_type, count) in &clip_types {
            println!("{:>8} {}", count, clip_type);
        }
    }

    Ok(())
}

/// Decode and re-encode one file, returning whether the bytes match.
fn verify_file(path: &Path) -> Result<bool> {
    let original = fs::read(path).context("Failed to read file")?;
    let file = BlendFile::parse(&original).context("Failed to decode")?;
    let encoded = file.to_bytes().context("Failed to encode")?;
    let identical = encoded == original;
    tracing::debug!(path = %path.display(), identical, "verified");
    Ok(identical)
}

fn cmd_verify(dir: &Path) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("blnd"))
        })
        .collect();

    println!("Verifying {} files under {}...", files.len(), dir.display());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let results: Vec<(&PathBuf, Result<bool>)> = files
        .par_iter()
        .map(|path| {
            let result = verify_file(path);
            pb.inc(1);
            (path, result)
        })
        .collect();
    pb.finish_with_message("Done");

    let mut identical = 0;
    let mut different = 0;
    let mut errors = 0;
    for (path, result) in &results {
        match result {
            Ok(true) => identical += 1,
            Ok(false) => {
                eprintln!("Mismatch: {}", path.display());
                different += 1;
            }
            Err(e) => {
                eprintln!("Error in {}: {:#}", path.display(), e);
                errors += 1;
            }
        }
    }

    println!(
        "Verified {} files in {:?}: {} identical, {} different, {} errors",
        results.len(),
        start.elapsed(),
        identical,
        different,
        errors
    );

    if different + errors > 0 {
        anyhow::bail!("{} files failed round-trip verification", different + errors);
    }

    Ok(())
}
