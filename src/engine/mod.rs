//! Spectrum engine seam.
//!
//! The frame loop only talks to [`SpectrumEngine`]; [`CavaAdapter`] plugs the
//! FFT bar engine from [`cava`] into it.

pub mod cava;

use crate::error::EngineError;
use cava::CavaEngine;

/// Engine construction parameters. Passed through from the run
/// configuration untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    /// Bars per channel.
    pub bars: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// Automatic sensitivity; 0 disables it.
    pub autosens: u32,
    pub noise_reduction: f64,
    pub low_cut_off: u32,
    pub high_cut_off: u32,
}

/// An analysis engine fed one block of raw PCM per call.
///
/// Engines may keep adaptive state between calls; callers must not reset
/// it during a run. Resources are released on drop.
pub trait SpectrumEngine {
    /// Values written by [`execute`](Self::execute): bars per channel times
    /// channels.
    fn output_len(&self) -> usize;

    /// Lower cut-off frequency of each bar, one entry per bar.
    fn cut_off_frequencies(&self) -> &[f32];

    /// Analyze exactly `samples.len()` interleaved samples into `out`.
    fn execute(&mut self, samples: &[i16], out: &mut [f64]);
}

/// Decodes raw samples for [`CavaEngine`] and scales its output to the
/// configured bar height.
pub struct CavaAdapter {
    engine: CavaEngine,
    decoded: Vec<f64>,
    height: f64,
}

impl CavaAdapter {
    pub fn init(params: &EngineParams, height: f64) -> Result<Self, EngineError> {
        let engine = CavaEngine::init(params)?;
        log::info!(
            "Engine: {} bars x {} channels, cut-offs {:?} Hz",
            params.bars,
            params.channels,
            engine.cut_off_frequencies()
        );
        Ok(Self {
            engine,
            decoded: Vec::new(),
            height,
        })
    }
}

impl SpectrumEngine for CavaAdapter {
    fn output_len(&self) -> usize {
        self.engine.output_len()
    }

    fn cut_off_frequencies(&self) -> &[f32] {
        self.engine.cut_off_frequencies()
    }

    fn execute(&mut self, samples: &[i16], out: &mut [f64]) {
        // Plain widening, the engine expects full-scale integer values.
        self.decoded.clear();
        self.decoded.extend(samples.iter().map(|&s| f64::from(s)));

        self.engine.execute(&self.decoded, out);
        for value in out.iter_mut() {
            *value *= self.height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EngineParams {
        EngineParams {
            bars: 10,
            sample_rate: 44100,
            channels: 2,
            autosens: 0,
            noise_reduction: 0.77,
            low_cut_off: 50,
            high_cut_off: 10000,
        }
    }

    #[test]
    fn test_adapter_matches_engine_scaled() {
        let samples: Vec<i16> = (0..2048).map(|i| ((i * 37) % 2000 - 1000) as i16).collect();
        let decoded: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();

        let mut adapter = CavaAdapter::init(&params(), 100.0).unwrap();
        let mut engine = CavaEngine::init(&params()).unwrap();
        assert_eq!(adapter.output_len(), 20);

        let mut scaled = vec![0.0; adapter.output_len()];
        let mut raw = vec![0.0; engine.output_len()];
        adapter.execute(&samples, &mut scaled);
        engine.execute(&decoded, &mut raw);

        for (s, r) in scaled.iter().zip(&raw) {
            assert_eq!(*s, r * 100.0);
        }
        assert!(raw.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_adapter_rejects_bad_params() {
        let mut bad = params();
        bad.channels = 3;
        assert!(CavaAdapter::init(&bad, 100.0).is_err());
    }
}
