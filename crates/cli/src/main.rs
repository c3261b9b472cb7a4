//! Cloudless CLI - cloud-reduced best-pixel composites

mod config;
mod export;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cloudless_algorithms::imagery::CompositeBuilder;
use cloudless_core::io::{read_band, GeoTiffDirSink};
use cloudless_core::{Band, ImageSequence, Raster};
use cloudless_parallel::{num_threads, ProcessingMode};

use crate::config::{CompositeConfig, SceneConfig};
use crate::export::export_composite;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cloudless")]
#[command(author, version, about = "Cloud-reduced best-pixel composites", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a composite from a JSON recipe and export every band
    Composite {
        /// Recipe file (see `cloudless recipe`)
        #[arg(short, long)]
        recipe: PathBuf,
        /// Worker threads (default: all cores)
        #[arg(short, long, conflicts_with = "sequential")]
        threads: Option<usize>,
        /// Run single-threaded
        #[arg(long)]
        sequential: bool,
    },
    /// Print the default recipe
    Recipe {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress(len: usize, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(msg.to_string());
    pb
}

/// Read every band of a scene plus its cloud score
fn read_scene(scene: &SceneConfig) -> Result<(Raster, Band)> {
    let mut transform = None;
    let mut bands = Vec::with_capacity(scene.bands.len());
    for (name, path) in &scene.bands {
        let (band, t) = read_band(path, name).with_context(|| {
            format!(
                "Scene '{}': failed to read band {} from {}",
                scene.id,
                name,
                path.display()
            )
        })?;
        match transform {
            None => transform = Some(t),
            Some(first) if first != t => {
                warn!(
                    scene = %scene.id,
                    band = %name,
                    "band geotransform differs from the scene's first band"
                );
            }
            Some(_) => {}
        }
        bands.push(band);
    }

    let raster = Raster::from_bands(bands)
        .with_context(|| format!("Scene '{}': bands do not form a raster", scene.id))?
        .with_transform(transform.unwrap_or_default());

    let (score, _) = read_band(&scene.cloud_score, "cloud").with_context(|| {
        format!("Scene '{}': failed to read cloud score {}", scene.id, scene.cloud_score.display())
    })?;

    debug!(scene = %scene.id, rows = raster.rows(), cols = raster.cols(), "scene loaded");
    Ok((raster, score))
}

fn run_composite(recipe: &Path, threads: Option<usize>, sequential: bool) -> Result<()> {
    let mut config = CompositeConfig::load(recipe)?;
    if sequential {
        config.params.mode = ProcessingMode::Sequential;
    } else if let Some(n) = threads {
        config.params.mode = ProcessingMode::ParallelWith(n);
    }
    info!(
        scenes = config.scenes.len(),
        selection = %config.params.selection,
        mode = ?config.params.mode,
        threads = if config.params.mode.is_parallel() { num_threads() } else { 1 },
        "Recipe loaded"
    );

    let pb = progress(config.scenes.len(), "Reading scenes");
    let mut images = Vec::with_capacity(config.scenes.len());
    let mut scores = Vec::with_capacity(config.scenes.len());
    for scene in &config.scenes {
        let (image, score) = read_scene(scene)?;
        images.push(image);
        scores.push(score);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let sequence =
        ImageSequence::new(images).context("Scenes are not a consistent image sequence")?;

    let pb = spinner("Building composite...");
    let start = Instant::now();
    let composite = CompositeBuilder::new(config.params.clone())
        .build(&sequence, &scores)
        .context("Failed to build composite")?;
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    let pb = spinner("Writing output...");
    let mut sink = GeoTiffDirSink::new(&config.export.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.export.output_dir.display())
    })?;
    let written = export_composite(&composite, &config, &mut sink)?;
    pb.finish_and_clear();

    println!("Composite saved to: {}", config.export.output_dir.display());
    println!("  Bands: {}", written.join(", "));
    println!(
        "  Valid cells: {} ({:.1}%)",
        composite.mask().count_valid(),
        100.0 * composite.mask().coverage()
    );
    println!("  Processing time: {:.2?}", elapsed);
    Ok(())
}

fn write_recipe(output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&CompositeConfig::template())
        .context("Failed to serialize recipe")?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write recipe {}", path.display()))?;
            println!("Recipe saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let (band, transform) = read_band(input, "band").context("Failed to read raster")?;
    pb.finish_and_clear();

    let raster = Raster::from_bands(vec![band])
        .context("Failed to read raster")?
        .with_transform(transform);
    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.band_statistics("band")?;

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
    );
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Composite {
            recipe,
            threads,
            sequential,
        } => run_composite(&recipe, threads, sequential),
        Commands::Recipe { output } => write_recipe(output.as_deref()),
        Commands::Info { input } => show_info(&input),
    }
}
