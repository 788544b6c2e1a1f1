//! Read–analyze–accumulate loop.
//!
//! Each output frame is made of `execs_per_frame` engine executions. A frame
//! is written only once every one of its reads succeeded; a short read ends
//! the run and the incomplete frame is dropped.

use std::io::{Read, Write};

use super::output::BarWriter;
use super::pcm::PcmReader;
use super::schedule::{CarryState, FramePlan};
use crate::config::RunConfig;
use crate::engine::SpectrumEngine;
use crate::error::StreamError;

/// What a clean run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines of bars written, header excluded.
    pub frames: u64,
    /// Raw samples consumed by completed reads, including those of a
    /// dropped final frame.
    pub samples: u64,
}

enum FrameState {
    Complete,
    Exhausted,
}

/// Run the filter until `input` ends.
///
/// Returns the summary on a clean end of input, or the first read or write
/// failure.
pub fn run<E, R, W>(
    config: &RunConfig,
    engine: &mut E,
    input: R,
    output: W,
) -> Result<RunSummary, StreamError>
where
    E: SpectrumEngine + ?Sized,
    R: Read,
    W: Write,
{
    let channels = usize::from(config.channels);
    let plan = FramePlan::new(config.sample_rate, channels, config.frame_rate, config.block_len());
    log::info!(
        "Frame plan: {:.3} samples/frame, {} execs of {} (+1 for {}), fraction {:.4}",
        plan.samples_per_frame,
        plan.execs_per_frame,
        plan.samples_per_exec,
        plan.samples_remainder,
        plan.sample_fraction_per_frame
    );

    let mut carry = CarryState::default();
    let mut reader = PcmReader::with_capacity(input, plan.max_read_len());
    let mut writer = BarWriter::new(output, config.bars, channels, config.channels_out());

    if config.print_cut_offs {
        writer
            .write_cut_offs(engine.cut_off_frequencies())
            .map_err(StreamError::Write)?;
    }

    let mut bars = vec![0.0; engine.output_len()];
    let mut frame = vec![0.0; engine.output_len()];
    let mut frames = 0u64;

    loop {
        frame.fill(0.0);
        let state = accumulate_frame(&plan, &mut carry, &mut reader, engine, &mut bars, &mut frame)?;
        if let FrameState::Exhausted = state {
            break;
        }

        let execs = plan.execs_per_frame as f64;
        for value in frame.iter_mut() {
            *value /= execs;
        }
        writer.write_frame(&frame).map_err(StreamError::Write)?;

        frames += 1;
        log::debug!(
            "Frame {} done, carry {:.4}",
            frames,
            carry.accumulated_sample_fractions
        );
    }

    log::info!(
        "End of input after {} frames ({} samples)",
        frames,
        reader.samples_read()
    );
    Ok(RunSummary {
        frames,
        samples: reader.samples_read(),
    })
}

/// Run every execution of one frame, summing raw engine output into `frame`.
fn accumulate_frame<E, R>(
    plan: &FramePlan,
    carry: &mut CarryState,
    reader: &mut PcmReader<R>,
    engine: &mut E,
    bars: &mut [f64],
    frame: &mut [f64],
) -> Result<FrameState, StreamError>
where
    E: SpectrumEngine + ?Sized,
    R: Read,
{
    for exec in 0..plan.execs_per_frame {
        let len = plan.read_len(exec, carry);
        let samples = match reader.read_samples(len).map_err(StreamError::Read)? {
            Some(samples) => samples,
            None => return Ok(FrameState::Exhausted),
        };

        engine.execute(samples, bars);
        for (total, &value) in frame.iter_mut().zip(bars.iter()) {
            *total += value;
        }
    }
    Ok(FrameState::Complete)
}
