use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::engine::EngineParams;
use crate::error::ConfigError;

/// Config file contents. Every field is optional in the file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_bars")]
    pub bars: usize,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default)]
    pub stereo: bool,
    #[serde(default)]
    pub print_cut_offs: bool,
    #[serde(default = "default_height")]
    pub height: f64,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_noise_reduction")]
    pub noise_reduction: f64,
    #[serde(default)]
    pub autosens: u32,
    #[serde(default = "default_low_cut_off")]
    pub low_cut_off: u32,
    #[serde(default = "default_high_cut_off")]
    pub high_cut_off: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            block_size: default_block_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bars: default_bars(),
            frame_rate: default_frame_rate(),
            stereo: false,
            print_cut_offs: false,
            height: default_height(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            noise_reduction: default_noise_reduction(),
            autosens: 0,
            low_cut_off: default_low_cut_off(),
            high_cut_off: default_high_cut_off(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_channels() -> u16 { 2 }
fn default_block_size() -> usize { 512 }
fn default_bars() -> usize { 10 }
fn default_frame_rate() -> f64 { 25.0 }
fn default_height() -> f64 { 100.0 }
fn default_noise_reduction() -> f64 { 0.77 }
fn default_low_cut_off() -> u32 { 50 }
fn default_high_cut_off() -> u32 { 10000 }

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `pcmbars.toml` in the working directory, then the XDG-style and platform
/// config directories.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("pcmbars.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pcmbars").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pcmbars").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel per engine execution.
    pub block_size: usize,
    pub frame_rate: f64,
    /// Bars per channel.
    pub bars: usize,
    pub stereo_output: bool,
    pub print_cut_offs: bool,
    pub height: f64,
    pub noise_reduction: f64,
    pub autosens: u32,
    pub low_cut_off: u32,
    pub high_cut_off: u32,
}

impl RunConfig {
    /// Command-line values win over the config file.
    pub fn resolve(cli: &Cli, file: Config) -> Result<Self, ConfigError> {
        let config = Self {
            sample_rate: cli.sample_rate.unwrap_or(file.audio.sample_rate),
            channels: cli.channels.unwrap_or(file.audio.channels),
            block_size: cli.block_size.unwrap_or(file.audio.block_size),
            frame_rate: cli.frame_rate.unwrap_or(file.output.frame_rate),
            bars: cli.bars.unwrap_or(file.output.bars),
            stereo_output: cli.stereo || file.output.stereo,
            print_cut_offs: cli.print_cut_offs || file.output.print_cut_offs,
            height: cli.height.unwrap_or(file.output.height),
            noise_reduction: cli.noise_reduction.unwrap_or(file.engine.noise_reduction),
            autosens: cli.autosens.unwrap_or(file.engine.autosens),
            low_cut_off: cli.low_cut_off.unwrap_or(file.engine.low_cut_off),
            high_cut_off: cli.high_cut_off.unwrap_or(file.engine.high_cut_off),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=200).contains(&self.bars) {
            return Err(ConfigError::invalid("--bars", "select between 2 and 200 bars"));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("--rate", "sample rate must be positive"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ConfigError::invalid("--channels", "channel count must be 1 or 2"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::invalid("--block-size", "block size must be positive"));
        }
        if !self.frame_rate.is_finite() || self.frame_rate < 1.0 {
            return Err(ConfigError::invalid("--framerate", "framerate must be at least 1"));
        }
        if self.frame_rate > f64::from(self.sample_rate) {
            return Err(ConfigError::invalid(
                "--framerate",
                "framerate cannot exceed the sample rate",
            ));
        }
        if self.stereo_output && self.channels != 2 {
            return Err(ConfigError::invalid("--stereo", "stereo output needs 2 input channels"));
        }
        if !(0.0..1.0).contains(&self.noise_reduction) {
            return Err(ConfigError::invalid(
                "--noise-reduction",
                "noise reduction must be in the range 0 to 1 (exclusive)",
            ));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(ConfigError::invalid("--height", "height must be a positive number"));
        }
        if self.low_cut_off == 0 || self.low_cut_off >= self.high_cut_off {
            return Err(ConfigError::invalid(
                "--low-cutoff",
                "low cut-off must be positive and below the high cut-off",
            ));
        }
        if self.high_cut_off > self.sample_rate / 2 {
            return Err(ConfigError::invalid(
                "--high-cutoff",
                format!("high cut-off must not exceed half the sample rate ({} Hz)", self.sample_rate / 2),
            ));
        }
        Ok(())
    }

    pub fn channels_out(&self) -> usize {
        if self.stereo_output { 2 } else { 1 }
    }

    /// Engine block in raw samples, all channels.
    pub fn block_len(&self) -> usize {
        self.block_size * usize::from(self.channels)
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            bars: self.bars,
            sample_rate: self.sample_rate,
            channels: self.channels,
            autosens: self.autosens,
            noise_reduction: self.noise_reduction,
            low_cut_off: self.low_cut_off,
            high_cut_off: self.high_cut_off,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        let file = Config::default();
        Self {
            sample_rate: file.audio.sample_rate,
            channels: file.audio.channels,
            block_size: file.audio.block_size,
            frame_rate: file.output.frame_rate,
            bars: file.output.bars,
            stereo_output: file.output.stereo,
            print_cut_offs: file.output.print_cut_offs,
            height: file.output.height,
            noise_reduction: file.engine.noise_reduction,
            autosens: file.engine.autosens,
            low_cut_off: file.engine.low_cut_off,
            high_cut_off: file.engine.high_cut_off,
        }
    }
}
