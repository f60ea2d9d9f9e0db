//! Chrome trace event encoding
//!
//! Serialization runs in two passes over the same samples: [`TraceEncoder::output_size`]
//! computes the exact byte count by field-size arithmetic, then
//! [`TraceEncoder::encode_into`] fills a buffer of exactly that size. Neither
//! pass allocates or goes through `core::fmt`.
//!
//! Each sample becomes one object literal followed by a comma:
//!
//! ```text
//! {"pid":1,"tid":2,"ts":100,"ph":"B","cat":"render","name":"frame","args":{"tool":"x"}},
//! ```
//!
//! The trailing comma stays in place. Consumers wrap the concatenated chunks
//! between [`TRACE_PREFACE`] and [`TRACE_POSTFACE`], whose empty objects
//! absorb the stray commas.

use std::borrow::Borrow;

use crate::config::LabelEncoding;
use crate::sample::Sample;

/// Opens a trace document. Ends with an empty event and a comma.
pub const TRACE_PREFACE: &str = "{\"traceEvents\":[{},";

/// Closes a trace document opened with [`TRACE_PREFACE`]
pub const TRACE_POSTFACE: &str = "{}]}";

/// Output of a drain that found no samples
pub const EMPTY_OUTPUT: &[u8] = b"{}";

const PID_PREFIX: &[u8] = b"{\"pid\":";
const TID_PREFIX: &[u8] = b",\"tid\":";
const TS_PREFIX: &[u8] = b",\"ts\":";
const PH_PREFIX: &[u8] = b",\"ph\":\"";
const CAT_PREFIX: &[u8] = b"\",\"cat\":\"";
const NAME_PREFIX: &[u8] = b"\",\"name\":\"";
const TOOL_PREFIX: &[u8] = b"\",\"args\":{\"tool\":\"";
const SAMPLE_SUFFIX: &[u8] = b"\"}},";

const FIXED_SAMPLE_LEN: usize = PID_PREFIX.len()
    + TID_PREFIX.len()
    + TS_PREFIX.len()
    + PH_PREFIX.len()
    + 1
    + CAT_PREFIX.len()
    + NAME_PREFIX.len()
    + TOOL_PREFIX.len()
    + SAMPLE_SUFFIX.len();

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Number of base-10 digits needed to print `value`
#[inline]
pub const fn digit_count(mut value: u64) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// Width of one byte once JSON-escaped
#[inline]
const fn escaped_width(byte: u8) -> usize {
    match byte {
        b'"' | b'\\' | b'\n' | b'\r' | b'\t' | 0x08 | 0x0c => 2,
        0x00..=0x1f => 6,
        _ => 1,
    }
}

/// Whether `label` can be written without any escaping
pub fn is_json_safe(label: &str) -> bool {
    label.bytes().all(|b| escaped_width(b) == 1)
}

/// Bytes `label` occupies in the output under `encoding`
#[inline]
pub fn label_len(label: &str, encoding: LabelEncoding) -> usize {
    match encoding {
        LabelEncoding::Verbatim => label.len(),
        LabelEncoding::Escaped => label.bytes().map(escaped_width).sum(),
    }
}

/// The write cursor ran past the end of the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("encoded trace output overran its destination")]
pub struct Overrun;

/// Allocation-free cursor over a caller-owned byte slice
struct SliceWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self { out, pos: 0 }
    }

    #[inline]
    fn put_byte(&mut self, byte: u8) -> Result<(), Overrun> {
        let slot = self.out.get_mut(self.pos).ok_or(Overrun)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    #[inline]
    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), Overrun> {
        let end = self.pos.checked_add(bytes.len()).ok_or(Overrun)?;
        self.out
            .get_mut(self.pos..end)
            .ok_or(Overrun)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Digits are emitted least significant first, then reversed in place
    #[inline]
    fn put_u64(&mut self, mut value: u64) -> Result<(), Overrun> {
        let start = self.pos;
        loop {
            #[expect(clippy::cast_possible_truncation, reason = "remainder of division by 10")]
            let digit = (value % 10) as u8;
            self.put_byte(b'0' + digit)?;
            value /= 10;
            if value == 0 {
                break;
            }
        }
        self.out.get_mut(start..self.pos).ok_or(Overrun)?.reverse();
        Ok(())
    }

    fn put_label(&mut self, label: &str, encoding: LabelEncoding) -> Result<(), Overrun> {
        if encoding == LabelEncoding::Verbatim || is_json_safe(label) {
            return self.put_bytes(label.as_bytes());
        }
        for byte in label.bytes() {
            match byte {
                b'"' => self.put_bytes(b"\\\"")?,
                b'\\' => self.put_bytes(b"\\\\")?,
                b'\n' => self.put_bytes(b"\\n")?,
                b'\r' => self.put_bytes(b"\\r")?,
                b'\t' => self.put_bytes(b"\\t")?,
                0x08 => self.put_bytes(b"\\b")?,
                0x0c => self.put_bytes(b"\\f")?,
                0x00..=0x1f => {
                    self.put_bytes(b"\\u00")?;
                    for nibble in [byte >> 4, byte & 0x0f] {
                        let hex = HEX_DIGITS.get(usize::from(nibble)).ok_or(Overrun)?;
                        self.put_byte(*hex)?;
                    }
                }
                _ => self.put_byte(byte)?,
            }
        }
        Ok(())
    }
}

/// Encoder for one session's output settings
#[derive(Debug, Clone, Copy)]
pub struct TraceEncoder<'a> {
    tool: &'a str,
    encoding: LabelEncoding,
}

impl<'a> TraceEncoder<'a> {
    /// Create an encoder writing `tool` into every event's `args`
    ///
    /// `tool` is always written verbatim; configuration validation rejects
    /// names that would need escaping.
    pub fn new(tool: &'a str, encoding: LabelEncoding) -> Self {
        Self { tool, encoding }
    }

    /// Exact encoded length of one sample, trailing comma included
    #[inline]
    pub fn sample_len(&self, sample: &Sample) -> usize {
        FIXED_SAMPLE_LEN
            + digit_count(u64::from(sample.process_id()))
            + digit_count(u64::from(sample.thread_id()))
            + digit_count(sample.timestamp_us())
            + label_len(sample.category(), self.encoding)
            + label_len(sample.name(), self.encoding)
            + self.tool.len()
    }

    /// Exact buffer size needed to encode `samples`, terminator included
    pub fn output_size<'s>(&self, samples: impl IntoIterator<Item = &'s Sample>) -> usize {
        let mut any = false;
        let mut total = 0usize;
        for sample in samples {
            any = true;
            total += self.sample_len(sample);
        }
        if !any {
            total = EMPTY_OUTPUT.len();
        }
        total + 1
    }

    /// Encode `samples` into `out` followed by a NUL terminator
    ///
    /// Returns the number of bytes written, excluding the terminator. Owned
    /// samples are released as soon as they have been written.
    ///
    /// # Errors
    ///
    /// Returns [`Overrun`] if `out` is shorter than
    /// [`output_size`](Self::output_size) reports for the same samples.
    pub fn encode_into<S: Borrow<Sample>>(
        &self,
        samples: impl IntoIterator<Item = S>,
        out: &mut [u8],
    ) -> Result<usize, Overrun> {
        let mut writer = SliceWriter::new(out);
        let mut any = false;
        for sample in samples {
            any = true;
            self.write_sample(&mut writer, sample.borrow())?;
        }
        if !any {
            writer.put_bytes(EMPTY_OUTPUT)?;
        }
        let written = writer.pos;
        writer.put_byte(0)?;
        Ok(written)
    }

    #[inline]
    fn write_sample(&self, w: &mut SliceWriter<'_>, sample: &Sample) -> Result<(), Overrun> {
        w.put_bytes(PID_PREFIX)?;
        w.put_u64(u64::from(sample.process_id()))?;
        w.put_bytes(TID_PREFIX)?;
        w.put_u64(u64::from(sample.thread_id()))?;
        w.put_bytes(TS_PREFIX)?;
        w.put_u64(sample.timestamp_us())?;
        w.put_bytes(PH_PREFIX)?;
        w.put_byte(sample.kind().phase())?;
        w.put_bytes(CAT_PREFIX)?;
        w.put_label(sample.category(), self.encoding)?;
        w.put_bytes(NAME_PREFIX)?;
        w.put_label(sample.name(), self.encoding)?;
        w.put_bytes(TOOL_PREFIX)?;
        w.put_bytes(self.tool.as_bytes())?;
        w.put_bytes(SAMPLE_SUFFIX)
    }
}
