use std::io::{self, ErrorKind, Read};

const BYTES_PER_SAMPLE: usize = 2;

/// Sequential reader of interleaved signed 16-bit little-endian PCM.
///
/// Reads are all-or-nothing: a request either yields exactly the number of
/// samples asked for, or reports the end of the stream.
pub struct PcmReader<R> {
    inner: R,
    bytes: Vec<u8>,
    samples: Vec<i16>,
    samples_read: u64,
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, 0)
    }

    /// Reader with buffers sized for reads of up to `samples` samples.
    pub fn with_capacity(inner: R, samples: usize) -> Self {
        Self {
            inner,
            bytes: Vec::with_capacity(samples * BYTES_PER_SAMPLE),
            samples: Vec::with_capacity(samples),
            samples_read: 0,
        }
    }

    /// Read exactly `count` raw samples.
    ///
    /// Returns `Ok(None)` when the input ends before `count` samples are
    /// available (the incomplete tail is dropped), and `Err` when the
    /// underlying reader fails.
    pub fn read_samples(&mut self, count: usize) -> io::Result<Option<&[i16]>> {
        let wanted = count * BYTES_PER_SAMPLE;
        self.bytes.resize(wanted, 0);

        let filled = fill(&mut self.inner, &mut self.bytes)?;
        if filled < wanted {
            log::debug!(
                "End of input: wanted {} samples, got {} bytes after {} samples",
                count,
                filled,
                self.samples_read
            );
            return Ok(None);
        }

        self.samples.clear();
        self.samples.extend(
            self.bytes
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|b| i16::from_le_bytes([b[0], b[1]])),
        );
        self.samples_read += count as u64;

        Ok(Some(&self.samples))
    }

    /// Total samples handed out by successful reads.
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }
}

/// Fill `buf` from `reader` until it is full or the reader hits EOF.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
