mod audio;
mod cli;
mod config;
mod engine;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use cli::Cli;
use config::RunConfig;
use engine::CavaAdapter;

fn main() -> Result<()> {
    // stdout carries the bars, logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect pcmbars.toml / user config
    let file_config = match cli.config.as_deref() {
        Some(path) => config::load_config(path)?,
        None => match config::find_config() {
            Some(path) => match config::load_config(&path) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path.display());
                    cfg
                }
                Err(err) => {
                    log::warn!("Ignoring config: {:#}", anyhow::Error::from(err));
                    config::Config::default()
                }
            },
            None => config::Config::default(),
        },
    };

    let run_config = RunConfig::resolve(&cli, file_config)?;
    log::info!(
        "Input: {} ({} Hz, {} channels), output: {}",
        cli.input.display(),
        run_config.sample_rate,
        run_config.channels,
        cli.output.display()
    );
    log::info!(
        "{} bars @ {} fps, stereo output: {}",
        run_config.bars,
        run_config.frame_rate,
        run_config.stereo_output
    );

    let mut engine = CavaAdapter::init(&run_config.engine_params(), run_config.height)
        .context("Failed to initialize spectrum engine")?;

    let input = open_input(&cli.input)?;
    let output = open_output(&cli.output)?;

    let summary = audio::filter::run(&run_config, &mut engine, input, output)?;

    log::info!(
        "Done: {} frames from {} samples",
        summary.frames,
        summary.samples
    );
    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .with_context(|| format!("Could not open file for reading: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path)
        .with_context(|| format!("Could not open file for writing: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
