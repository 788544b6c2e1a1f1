use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejected run configuration. Raised before any audio is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {option}: {reason}")]
    Invalid { option: &'static str, reason: String },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            option,
            reason: reason.into(),
        }
    }
}

/// Parameters the spectrum engine cannot work with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bar count must be at least 1")]
    NoBars,

    #[error("engine supports 1 or 2 channels, got {0}")]
    Channels(u16),

    #[error("sample rate must be positive")]
    SampleRate,

    #[error("cut-off frequencies must satisfy 0 < low < high, got {low}..{high} Hz")]
    CutOffOrder { low: u32, high: u32 },

    #[error("high cut-off {high} Hz is above the Nyquist frequency {nyquist} Hz")]
    AboveNyquist { high: u32, nyquist: u32 },

    #[error("{bars} bars do not fit between {low} and {high} Hz at this sample rate")]
    TooManyBars { bars: usize, low: u32, high: u32 },
}

/// Terminal failure of the read–analyze–accumulate loop.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to read PCM input")]
    Read(#[source] io::Error),

    #[error("failed to write bar output")]
    Write(#[source] io::Error),
}
