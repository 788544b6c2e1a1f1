//! FFT bar engine in the style of cava's core.
//!
//! Keeps a rolling history of the newest input samples, runs a long "bass"
//! FFT and a short "treble" FFT over it per channel, averages the magnitude
//! bins that fall into each log-spaced bar and then smooths the bars over
//! time (gravity falloff, integral memory, optional automatic sensitivity).

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::EngineParams;
use crate::error::EngineError;

/// Bars starting below this frequency use the bass FFT.
const BASS_CUT_OFF_HZ: f64 = 100.0;
/// Bass FFT length relative to the treble FFT.
const BASS_FFT_FACTOR: usize = 4;
const EQ_REFERENCE_HZ: f64 = 1000.0;
const FULL_SCALE: f64 = 32768.0;
const GRAVITY_STEP: f64 = 0.028;
const INITIAL_FRAMERATE: f64 = 75.0;

/// Treble FFT length for a sample rate, so each FFT spans a similar time.
fn treble_fft_size(sample_rate: u32) -> usize {
    match sample_rate {
        0..=8125 => 128,
        8126..=16250 => 256,
        16251..=32500 => 512,
        32501..=75000 => 1024,
        75001..=150000 => 2048,
        150001..=300000 => 4096,
        _ => 8192,
    }
}

fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

fn bin_of(freq: f64, fft_size: usize, sample_rate: u32) -> usize {
    (freq * fft_size as f64 / f64::from(sample_rate)).floor() as usize
}

/// One windowed real FFT over a strided slice of the history.
struct Analyzer {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    buffer: Vec<Complex<f64>>,
    magnitudes: Vec<f64>,
}

impl Analyzer {
    fn new(planner: &mut FftPlanner<f64>, size: usize) -> Self {
        Self {
            fft: planner.plan_fft_forward(size),
            window: hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            magnitudes: vec![0.0; size / 2 + 1],
        }
    }

    fn process(&mut self, history: &[f64], offset: usize, stride: usize) {
        for (i, (slot, w)) in self.buffer.iter_mut().zip(&self.window).enumerate() {
            *slot = Complex::new(history[offset + i * stride] * w, 0.0);
        }
        self.fft.process(&mut self.buffer);
        for (m, c) in self.magnitudes.iter_mut().zip(&self.buffer) {
            *m = c.norm();
        }
    }
}

/// Inclusive FFT bin range of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BarBins {
    bass: bool,
    lower: usize,
    upper: usize,
}

pub struct CavaEngine {
    bars: usize,
    channels: usize,
    sample_rate: u32,
    noise_reduction: f64,
    autosens: bool,

    bass: Analyzer,
    treble: Analyzer,
    /// Newest sample first, interleaved.
    history: Vec<f64>,

    bins: Vec<BarBins>,
    eq: Vec<f64>,
    cut_off_frequencies: Vec<f32>,

    prev_out: Vec<f64>,
    peak: Vec<f64>,
    fall: Vec<f64>,
    mem: Vec<f64>,
    sens: f64,
    sens_init: bool,
    framerate: f64,
}

impl CavaEngine {
    pub fn init(params: &EngineParams) -> Result<Self, EngineError> {
        let EngineParams {
            bars,
            sample_rate,
            channels,
            autosens,
            noise_reduction,
            low_cut_off,
            high_cut_off,
        } = *params;

        if bars == 0 {
            return Err(EngineError::NoBars);
        }
        if !(1..=2).contains(&channels) {
            return Err(EngineError::Channels(channels));
        }
        if sample_rate == 0 {
            return Err(EngineError::SampleRate);
        }
        if low_cut_off == 0 || low_cut_off >= high_cut_off {
            return Err(EngineError::CutOffOrder {
                low: low_cut_off,
                high: high_cut_off,
            });
        }
        if high_cut_off > sample_rate / 2 {
            return Err(EngineError::AboveNyquist {
                high: high_cut_off,
                nyquist: sample_rate / 2,
            });
        }

        let channels = usize::from(channels);
        let treble_size = treble_fft_size(sample_rate);
        let bass_size = treble_size * BASS_FFT_FACTOR;

        let mut planner = FftPlanner::new();
        let bass = Analyzer::new(&mut planner, bass_size);
        let treble = Analyzer::new(&mut planner, treble_size);

        // Log-spaced bar edges, bars + 1 of them.
        let ratio = f64::from(high_cut_off) / f64::from(low_cut_off);
        let edges: Vec<f64> = (0..=bars)
            .map(|n| f64::from(low_cut_off) * ratio.powf(n as f64 / bars as f64))
            .collect();

        let fft_size = |bass: bool| if bass { bass_size } else { treble_size };

        let mut bins: Vec<BarBins> = Vec::with_capacity(bars);
        let mut cut_off_frequencies = Vec::with_capacity(bars);
        for n in 0..bars {
            let is_bass = edges[n] < BASS_CUT_OFF_HZ;
            let size = fft_size(is_bass);
            let mut lower = bin_of(edges[n], size, sample_rate).max(1);
            let mut cut_off = edges[n];

            // Bars clumped into one bin get pushed up the spectrum.
            let clumped = bins
                .last()
                .map_or(false, |prev| prev.bass == is_bass && lower <= prev.lower);
            if clumped {
                lower = bins[n - 1].lower + 1;
                cut_off = lower as f64 * f64::from(sample_rate) / size as f64;
            }
            if lower > size / 2 {
                return Err(EngineError::TooManyBars {
                    bars,
                    low: low_cut_off,
                    high: high_cut_off,
                });
            }

            bins.push(BarBins {
                bass: is_bass,
                lower,
                upper: lower,
            });
            cut_off_frequencies.push(cut_off as f32);
        }

        for n in 0..bars {
            let size = fft_size(bins[n].bass);
            let end = match bins.get(n + 1) {
                Some(next) if next.bass == bins[n].bass => next.lower,
                _ => bin_of(edges[n + 1], size, sample_rate),
            };
            bins[n].upper = end.saturating_sub(1).clamp(bins[n].lower, size / 2);
        }

        // Normalizes a full-scale Hann-windowed tone to ~1, tilted towards
        // the treble where music carries less energy.
        let eq = bins
            .iter()
            .zip(&cut_off_frequencies)
            .map(|(b, &f)| {
                let size = fft_size(b.bass) as f64;
                (f64::from(f) / EQ_REFERENCE_HZ).sqrt() * 4.0 / (FULL_SCALE * size)
            })
            .collect();

        let outputs = bars * channels;
        Ok(Self {
            bars,
            channels,
            sample_rate,
            noise_reduction,
            autosens: autosens > 0,
            bass,
            treble,
            history: vec![0.0; bass_size * channels],
            bins,
            eq,
            cut_off_frequencies,
            prev_out: vec![0.0; outputs],
            peak: vec![0.0; outputs],
            fall: vec![0.0; outputs],
            mem: vec![0.0; outputs],
            sens: 1.0,
            sens_init: true,
            framerate: INITIAL_FRAMERATE,
        })
    }

    pub fn output_len(&self) -> usize {
        self.bars * self.channels
    }

    pub fn cut_off_frequencies(&self) -> &[f32] {
        &self.cut_off_frequencies
    }

    /// Push `input` (interleaved) into the history and write
    /// `bars * channels` values into `out`.
    ///
    /// With two channels the bars of the sample at odd input positions come
    /// first, since the history is stored newest first.
    pub fn execute(&mut self, input: &[f64], out: &mut [f64]) {
        let capacity = self.history.len();
        let input = &input[input.len().saturating_sub(capacity)..];
        let new = input.len();

        if new > 0 {
            let rate = f64::from(self.sample_rate) * self.channels as f64 / new as f64;
            self.framerate -= self.framerate / 64.0;
            self.framerate += rate / 64.0;
        }

        self.history.copy_within(..capacity - new, new);
        for (slot, &sample) in self.history[..new].iter_mut().zip(input.iter().rev()) {
            *slot = sample;
        }
        let silence = input.iter().all(|&s| s == 0.0);

        for ch in 0..self.channels {
            self.bass.process(&self.history, ch, self.channels);
            self.treble.process(&self.history, ch, self.channels);

            for (n, bar) in self.bins.iter().enumerate() {
                let magnitudes = if bar.bass {
                    &self.bass.magnitudes
                } else {
                    &self.treble.magnitudes
                };
                let sum: f64 = magnitudes[bar.lower..=bar.upper].iter().sum();
                let count = (bar.upper - bar.lower + 1) as f64;
                out[ch * self.bars + n] = sum / count * self.eq[n];
            }
        }

        let outputs = self.output_len();
        self.smooth(&mut out[..outputs], silence);
    }

    fn smooth(&mut self, out: &mut [f64], silence: bool) {
        let falloff = self.noise_reduction > 0.1;
        let gravity_mod = if falloff {
            ((60.0 / self.framerate).powf(2.5) * 1.54 / self.noise_reduction).max(1.0)
        } else {
            1.0
        };

        let mut overshoot = false;
        for (n, value) in out.iter_mut().enumerate() {
            if self.autosens {
                *value *= self.sens;
            }

            if falloff && *value < self.prev_out[n] {
                let fall = self.fall[n];
                *value = (self.peak[n] * (1.0 - fall * fall * gravity_mod)).max(0.0);
                self.fall[n] += GRAVITY_STEP;
            } else {
                self.peak[n] = *value;
                self.fall[n] = 0.0;
            }
            self.prev_out[n] = *value;

            *value += self.mem[n] * self.noise_reduction;
            self.mem[n] = *value;

            if self.autosens && *value > 1.0 {
                overshoot = true;
            }
        }

        if self.autosens {
            if overshoot {
                self.sens *= 0.98;
                self.sens_init = false;
            } else if !silence {
                self.sens *= 1.001;
                if self.sens_init {
                    self.sens *= 1.1;
                }
            }
        }
    }

    /// Current automatic sensitivity multiplier.
    #[cfg(test)]
    pub fn sensitivity(&self) -> f64 {
        self.sens
    }

    /// Inclusive FFT bin range and FFT length of bar `n`.
    #[cfg(test)]
    pub fn bar_bins(&self, n: usize) -> (usize, usize, usize) {
        let b = self.bins[n];
        let size = if b.bass {
            self.bass.window.len()
        } else {
            self.treble.window.len()
        };
        (b.lower, b.upper, size)
    }
}
