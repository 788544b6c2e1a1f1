use std::io::{self, Write};

/// Writes bar frames as text, one line per frame.
///
/// Every value is printed as `"{:4} "`, truncated toward zero. With stereo
/// engine output and a single output channel the two channels are averaged
/// per bar; otherwise the engine's layout is printed as is, which for stereo
/// means the second input channel's bars come first.
pub struct BarWriter<W: Write> {
    inner: W,
    bars: usize,
    engine_channels: usize,
    channels_out: usize,
}

impl<W: Write> BarWriter<W> {
    /// `channels_out` must be 1 or `engine_channels`.
    pub fn new(inner: W, bars: usize, engine_channels: usize, channels_out: usize) -> Self {
        debug_assert!(channels_out == 1 || channels_out == engine_channels);
        Self {
            inner,
            bars,
            engine_channels,
            channels_out,
        }
    }

    /// Header line with the cut-off frequency of each bar, repeated once per
    /// output channel.
    pub fn write_cut_offs(&mut self, cut_offs: &[f32]) -> io::Result<()> {
        for _ in 0..self.channels_out {
            for &freq in cut_offs.iter().take(self.bars) {
                write!(self.inner, "{:4} ", freq as i32)?;
            }
        }
        self.end_line()
    }

    /// One frame of averaged engine output, `bars * engine_channels` values.
    pub fn write_frame(&mut self, frame: &[f64]) -> io::Result<()> {
        let mix_down = self.channels_out < self.engine_channels;
        for i in 0..self.bars * self.channels_out {
            let value = if mix_down {
                (frame[i] + frame[i + self.bars]) / 2.0
            } else {
                frame[i]
            };
            write!(self.inner, "{:4} ", value as i32)?;
        }
        self.end_line()
    }

    fn end_line(&mut self) -> io::Result<()> {
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(engine_channels: usize, channels_out: usize, bars: usize, frame: &[f64]) -> String {
        let mut writer = BarWriter::new(Vec::new(), bars, engine_channels, channels_out);
        writer.write_frame(frame).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_mono_output_averages_channels() {
        let frame = [10.0, 3.0, 0.0, 20.0, 4.0, 1.0];
        assert_eq!(render(2, 1, 3, &frame), "  15    3    0 \n");
    }

    #[test]
    fn test_values_truncate_toward_zero() {
        let frame = [-1.5, 99.99, 0.5, 0.0];
        assert_eq!(render(2, 1, 2, &frame), "   0   49 \n");

        let frame = [-3.0, 2.9, 0.0, 0.0];
        assert_eq!(render(2, 1, 2, &frame), "  -1    1 \n");
    }

    #[test]
    fn test_stereo_output_keeps_engine_order() {
        let frame = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(render(2, 2, 2, &frame), "   1    2    3    4 \n");
    }

    #[test]
    fn test_mono_engine_prints_single_channel() {
        let frame = [7.9, 1234.0, 12345.0];
        assert_eq!(render(1, 1, 3, &frame), "   7 1234 12345 \n");
    }

    #[test]
    fn test_cut_off_header_repeats_per_channel() {
        let mut writer = BarWriter::new(Vec::new(), 3, 2, 2);
        writer.write_cut_offs(&[50.0, 316.2, 2000.9]).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "  50  316 2000   50  316 2000 \n");
    }
}
