// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use flood_extent::catalog::Catalog;
use flood_extent::cli::{Cli, Commands, Window};
use flood_extent::config::FloodConfig;
use flood_extent::flood::{water_indices, FloodPipeline};
use flood_extent::io::writer::Encoding;
use flood_extent::io::{write_band, write_rgba, OutputOptions};
use flood_extent::processing::{Engine, Image};
use flood_extent::render::VisParams;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FloodConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FloodConfig::default(),
    };
    let options = OutputOptions {
        compress: cli.compress.clone(),
        compress_level: cli.compress_level,
        tiled: !cli.no_tiled,
    };

    let catalog = Catalog::new(&cli.catalog);
    let area = catalog
        .load_study_area(&config.study_area)
        .with_context(|| format!("Failed to load study area {}", config.study_area))?;
    log::info!("Loaded study area {} from {}", area.id(), catalog.root().display());

    let engine = Engine::new(catalog, cli.io_threads);
    let pipeline = FloodPipeline::new(config, area);
    let out = cli.output_dir.as_path();
    std::fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let pick = |window: Window| match window {
        Window::Pre => ("pre", pipeline.pre_composite(), pipeline.pre_confidence()),
        Window::Post => ("post", pipeline.post_composite(), pipeline.post_confidence()),
    };

    match &cli.command {
        Commands::Detect => {
            let (stats, manifest) = pipeline
                .run(&engine, out, &options)
                .context("Flood detection failed")?;
            println!(
                "Flooded pixels: {} of {} ({:.1} sq. units), {} map layers",
                stats.flooded_pixels,
                stats.valid_pixels,
                stats.flooded_area,
                manifest.layers.len()
            );
        }
        Commands::Composite { window } => {
            let (label, composite, _) = pick(*window);
            let raster = engine
                .evaluate(&composite.visualize(VisParams::false_color()))
                .with_context(|| format!("Failed to build {} composite", label))?;
            write_rgba(&raster, &out.join(format!("{}_false_color.tif", label)), &options)?;
        }
        Commands::Confidence { window } => {
            let (label, _, confidence) = pick(*window);
            export_first(&engine, confidence, &out.join(format!("{}_confidence.tif", label)), Encoding::Byte, &options)?;
        }
        Commands::Indices { window, float, scale_factor } => {
            let (label, composite, _) = pick(*window);
            let encoding = if *float {
                Encoding::Float32
            } else {
                Encoding::FixedPoint { scale_factor: *scale_factor }
            };
            let (ndwi, mndwi) = water_indices(composite);
            export_first(&engine, &ndwi, &out.join(format!("{}_ndwi.tif", label)), encoding, &options)?;
            export_first(&engine, &mndwi, &out.join(format!("{}_mndwi.tif", label)), encoding, &options)?;
        }
    }

    println!("Processing complete: {}", out.display());
    Ok(())
}

fn export_first(engine: &Engine, image: &Image, path: &Path, encoding: Encoding, options: &OutputOptions) -> Result<()> {
    let raster = engine
        .evaluate(image)
        .with_context(|| format!("Failed to compute {}", path.display()))?;
    write_band(raster.first()?, raster.geo(), path, encoding, options)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
