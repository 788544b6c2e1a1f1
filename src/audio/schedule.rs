//! Frame scheduling.
//!
//! An output frame covers `sample_rate * channels / frame_rate` raw samples,
//! which is rarely a whole number and rarely a multiple of the engine block.
//! [`FramePlan`] splits a frame into a fixed number of engine executions and
//! [`FramePlan::read_len`] hands out the length of each read, carrying the
//! fractional sample left over by every frame forward so the output never
//! drifts away from the audio.

/// Read plan for one output frame. Computed once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    /// Exact raw samples (all channels) per output frame.
    pub samples_per_frame: f64,
    /// Engine executions per output frame, at least 1.
    pub execs_per_frame: usize,
    /// Base read length of every execution.
    pub samples_per_exec: usize,
    /// Number of leading executions in a frame that read one extra sample.
    pub samples_remainder: usize,
    /// Fractional sample dropped when flooring `samples_per_frame`.
    pub sample_fraction_per_frame: f64,
    pub channels: usize,
    /// Engine block length in raw samples (all channels).
    pub block_len: usize,
}

/// Sample accounting carried from frame to frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CarryState {
    /// Samples owed to (positive) or borrowed from (negative) the stream.
    pub accumulated_sample_fractions: f64,
    /// Direction of the next stereo pairing correction.
    round_up_next: bool,
}

impl Default for CarryState {
    fn default() -> Self {
        Self {
            accumulated_sample_fractions: 0.0,
            round_up_next: true,
        }
    }
}

impl FramePlan {
    /// `block_len` is the engine block in raw samples, i.e. already
    /// multiplied by `channels`. All inputs must be positive.
    pub fn new(sample_rate: u32, channels: usize, frame_rate: f64, block_len: usize) -> Self {
        let samples_per_frame = f64::from(sample_rate) * channels as f64 / frame_rate;

        // Leave room for one extra sample-pair on the final read.
        let execs_per_frame =
            (((samples_per_frame + channels as f64) / block_len as f64).ceil() as usize).max(1);

        let whole_samples = samples_per_frame.floor() as usize;
        let samples_per_exec = (samples_per_frame / execs_per_frame as f64).floor() as usize;
        let samples_remainder = whole_samples.saturating_sub(execs_per_frame * samples_per_exec);

        Self {
            samples_per_frame,
            execs_per_frame,
            samples_per_exec,
            samples_remainder,
            sample_fraction_per_frame: samples_per_frame - samples_per_frame.floor(),
            channels,
            block_len,
        }
    }

    /// Length in raw samples of read `exec_index` (0-based) of the current
    /// frame. Must be called once per execution, in order, with the same
    /// carry for the whole run.
    pub fn read_len(&self, exec_index: usize, carry: &mut CarryState) -> usize {
        let mut len = self.samples_per_exec + usize::from(exec_index < self.samples_remainder);

        // Stereo reads must cover whole sample-pairs.
        if self.channels == 2 && len % 2 == 1 {
            if carry.round_up_next {
                len += 1;
                carry.accumulated_sample_fractions -= 1.0;
            } else {
                len -= 1;
                carry.accumulated_sample_fractions += 1.0;
            }
            carry.round_up_next = !carry.round_up_next;
        }

        if exec_index + 1 == self.execs_per_frame {
            carry.accumulated_sample_fractions += self.sample_fraction_per_frame;
            let pair = self.channels as f64;
            if carry.accumulated_sample_fractions >= pair {
                len += self.channels;
                carry.accumulated_sample_fractions -= pair;
            }
        }

        len
    }

    /// Largest read `read_len` can return for this plan.
    pub fn max_read_len(&self) -> usize {
        self.samples_per_exec + 1 + 2 * self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES: [u32; 5] = [8000, 22050, 44100, 48000, 96000];
    const FRAME_RATES: [f64; 9] = [1.0, 7.0, 23.976, 24.99, 25.0, 29.97, 60.0, 144.0, 1000.0];
    const BLOCKS_PER_CHANNEL: [usize; 4] = [8, 64, 512, 4096];

    fn frame_lens(plan: &FramePlan, carry: &mut CarryState) -> Vec<usize> {
        (0..plan.execs_per_frame)
            .map(|i| plan.read_len(i, carry))
            .collect()
    }

    #[test]
    fn test_tiny_block_scenario() {
        let plan = FramePlan::new(44100, 2, 25.0, 8);

        assert_eq!(plan.samples_per_frame, 3528.0);
        assert_eq!(
            plan.execs_per_frame * plan.samples_per_exec + plan.samples_remainder,
            3528
        );
        assert!(plan.execs_per_frame * plan.block_len >= 3528 + 2);
        assert!(plan.samples_remainder < plan.execs_per_frame);
        assert_eq!(plan.sample_fraction_per_frame, 0.0);
    }

    #[test]
    fn test_default_block_reads_whole_frame() {
        let plan = FramePlan::new(44100, 2, 25.0, 1024);
        assert_eq!(plan.execs_per_frame, 4);
        assert_eq!(plan.samples_per_exec, 882);
        assert_eq!(plan.samples_remainder, 0);

        let mut carry = CarryState::default();
        for _ in 0..10 {
            assert_eq!(frame_lens(&plan, &mut carry), vec![882; 4]);
        }
    }

    #[test]
    fn test_integer_part_is_distributed() {
        for &rate in &RATES {
            for channels in 1..=2 {
                for &fps in &FRAME_RATES {
                    for &bpc in &BLOCKS_PER_CHANNEL {
                        let plan = FramePlan::new(rate, channels, fps, bpc * channels);
                        assert_eq!(
                            plan.execs_per_frame * plan.samples_per_exec + plan.samples_remainder,
                            plan.samples_per_frame.floor() as usize,
                            "rate={} ch={} fps={} block={}",
                            rate,
                            channels,
                            fps,
                            bpc
                        );
                        assert!(plan.samples_remainder < plan.execs_per_frame);
                        assert!((0.0..1.0).contains(&plan.sample_fraction_per_frame));
                    }
                }
            }
        }
    }

    #[test]
    fn test_reads_never_exceed_block() {
        for &rate in &RATES {
            for channels in 1..=2 {
                for &fps in &FRAME_RATES {
                    for &bpc in &BLOCKS_PER_CHANNEL {
                        let plan = FramePlan::new(rate, channels, fps, bpc * channels);
                        let mut carry = CarryState::default();
                        for _ in 0..200 {
                            for len in frame_lens(&plan, &mut carry) {
                                assert!(
                                    len <= plan.block_len,
                                    "read of {} > block {} (rate={} ch={} fps={})",
                                    len,
                                    plan.block_len,
                                    rate,
                                    channels,
                                    fps
                                );
                                assert!(len <= plan.max_read_len());
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_stereo_reads_are_even() {
        for &rate in &RATES {
            for &fps in &FRAME_RATES {
                for &bpc in &BLOCKS_PER_CHANNEL {
                    let plan = FramePlan::new(rate, 2, fps, bpc * 2);
                    let mut carry = CarryState::default();
                    for _ in 0..200 {
                        for len in frame_lens(&plan, &mut carry) {
                            assert_eq!(len % 2, 0, "rate={} fps={} block={}", rate, fps, bpc);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_no_drift_over_many_frames() {
        for &rate in &RATES {
            for channels in 1..=2 {
                for &fps in &FRAME_RATES {
                    for &bpc in &BLOCKS_PER_CHANNEL {
                        let plan = FramePlan::new(rate, channels, fps, bpc * channels);
                        let mut carry = CarryState::default();
                        let mut total = 0usize;
                        for k in 1..=1500 {
                            total += frame_lens(&plan, &mut carry).iter().sum::<usize>();
                            let exact = k as f64 * plan.samples_per_frame;
                            let drift = (total as f64 - exact).abs();
                            assert!(
                                drift <= channels as f64 + 1e-6,
                                "drift {} after {} frames (rate={} ch={} fps={} block={})",
                                drift,
                                k,
                                rate,
                                channels,
                                fps,
                                bpc
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_fraction_injects_extra_sample() {
        // 44100 / 29.97 = 1471.47..: the third frame picks up the owed sample.
        let plan = FramePlan::new(44100, 1, 29.97, 4096);
        assert_eq!(plan.execs_per_frame, 1);
        assert_eq!(plan.samples_per_exec, 1471);

        let mut carry = CarryState::default();
        let first = frame_lens(&plan, &mut carry);
        let second = frame_lens(&plan, &mut carry);
        let third = frame_lens(&plan, &mut carry);
        assert_eq!(first, vec![1471]);
        assert_eq!(second, vec![1471]);
        assert_eq!(third, vec![1472]);
        assert!(carry.accumulated_sample_fractions >= 0.0);
        assert!(carry.accumulated_sample_fractions < 1.0);
    }

    #[test]
    fn test_stereo_corrections_balance() {
        // 44100 * 2 / 25 over 442 blocks of 8: 8 reads of 7 samples per frame.
        let plan = FramePlan::new(44100, 2, 25.0, 8);
        let mut carry = CarryState::default();
        let lens = frame_lens(&plan, &mut carry);

        assert_eq!(lens.iter().sum::<usize>(), 3528);
        assert_eq!(lens.iter().filter(|&&l| l == 6).count(), 4);
        assert_eq!(carry.accumulated_sample_fractions, 0.0);
    }

    #[test]
    fn test_single_exec_odd_stereo_frame_does_not_drift() {
        // 44100 * 2 / 24.99 = 3529.41..: one odd-length read per frame.
        let plan = FramePlan::new(44100, 2, 24.99, 4096 * 2);
        assert_eq!(plan.execs_per_frame, 1);

        let mut carry = CarryState::default();
        let lens: Vec<usize> = (0..4).flat_map(|_| frame_lens(&plan, &mut carry)).collect();
        assert_eq!(lens[0], 3530);
        assert_eq!(lens[1], 3528);
        assert!(lens.iter().all(|l| l % 2 == 0));
    }
}
