//! Host-side decoding of printf record streams into text.
//!
//! Decoding is pure: the same words and configuration always give the same
//! text. Anomalies never abort a decode; they are reported next to whatever
//! text was produced.

mod reader;

pub use reader::{RecordReader, Truncation};

use std::fmt::Write;

use crate::format::FloatFormat;
use crate::wire::{Matrix, Record, WordStream, HEADER_WORDS};

/// Default end-of-record character.
pub const DEFAULT_SUFFIX: u8 = b'\n';

/// Conditions that left the decoded text incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Record stream truncated at word {at} of {length}")]
    TruncatedStream { at: usize, length: usize },
    #[error("Declared length {length} exceeds buffer capacity of {capacity} payload words")]
    LengthExceedsCapacity { length: usize, capacity: usize },
    #[error("Buffer holds {words} words, too short for the 2-word header")]
    MissingHeader { words: usize },
}

/// Result of one decode pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedText {
    pub text: String,
    /// Set when the text is partial.
    pub issue: Option<DecodeError>,
    /// Complete records decoded, unknown ones included.
    pub records: usize,
    pub unknown_records: usize,
}

impl DecodedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.issue.is_none()
    }
}

/// Turns record streams into text.
#[derive(Debug, Clone)]
pub struct Decoder {
    float_format: FloatFormat,
    initial_suffix: u8,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(FloatFormat::default(), DEFAULT_SUFFIX)
    }
}

impl Decoder {
    pub fn new(float_format: FloatFormat, initial_suffix: u8) -> Self {
        Self {
            float_format,
            initial_suffix,
        }
    }

    pub fn float_format(&self) -> &FloatFormat {
        &self.float_format
    }

    pub fn set_float_format(&mut self, float_format: FloatFormat) {
        self.float_format = float_format;
    }

    pub fn initial_suffix(&self) -> u8 {
        self.initial_suffix
    }

    /// Typed records of a stream that starts at the first record.
    pub fn records<'a>(&self, stream: WordStream<'a>, length: usize) -> RecordReader<'a> {
        RecordReader::new(stream, length)
    }

    /// Decode a whole buffer as copied back from the device: header, then records.
    ///
    /// A declared length past the buffer end is decoded up to the end and
    /// reported as `LengthExceedsCapacity`, unless a record is cut there, which
    /// reports `TruncatedStream` at the cut.
    pub fn decode_snapshot(&self, bytes: &[u8]) -> DecodedText {
        self.decode_buffer(WordStream::from_bytes(bytes))
    }

    /// Same as [`Decoder::decode_snapshot`] for a word slice.
    pub fn decode_words(&self, words: &[u32]) -> DecodedText {
        self.decode_buffer(WordStream::from_words(words))
    }

    fn decode_buffer(&self, buffer: WordStream<'_>) -> DecodedText {
        let Some(length) = buffer.declared_length() else {
            return DecodedText {
                issue: Some(DecodeError::MissingHeader {
                    words: buffer.len(),
                }),
                ..Default::default()
            };
        };

        let length = length as usize;
        let capacity = buffer.len() - HEADER_WORDS;
        let mut decoded = self.decode_stream(buffer.payload(), length.min(capacity));
        if length > capacity {
            // A record cut at the buffer end keeps its truncation position.
            decoded
                .issue
                .get_or_insert(DecodeError::LengthExceedsCapacity { length, capacity });
        }
        decoded
    }

    /// Decode `length` words of a stream that starts at the first record.
    pub fn decode_stream(&self, stream: WordStream<'_>, length: usize) -> DecodedText {
        let mut text = TextRenderer::new(&self.float_format, self.initial_suffix);
        let mut decoded = DecodedText::default();

        for result in self.records(stream, length) {
            match result {
                Ok(record) => {
                    if matches!(record, Record::Unknown { .. }) {
                        decoded.unknown_records += 1;
                    }
                    decoded.records += 1;
                    text.record(&record);
                }
                Err(truncation) => {
                    if let Some(partial) = &truncation.partial {
                        text.values(partial);
                    }
                    decoded.issue = Some(DecodeError::TruncatedStream {
                        at: truncation.at,
                        length,
                    });
                }
            }
        }

        decoded.text = text.finish();
        decoded
    }
}

/// Text accumulator holding the suffix state of one pass.
struct TextRenderer<'f> {
    out: String,
    suffix: u8,
    float_format: &'f FloatFormat,
}

impl<'f> TextRenderer<'f> {
    fn new(float_format: &'f FloatFormat, suffix: u8) -> Self {
        Self {
            out: String::new(),
            suffix,
            float_format,
        }
    }

    fn record(&mut self, record: &Record) {
        if let Record::SetSuffix(suffix) = record {
            self.suffix = *suffix;
            return;
        }
        self.values(record);
        if self.suffix != 0 {
            self.out.push(char::from(self.suffix));
        }
    }

    /// Record body without the trailing suffix.
    fn values(&mut self, record: &Record) {
        match record {
            Record::Char(c) => self.out.push(char::from(*c)),
            Record::UInt(values) => self.list(values, |out, v| {
                let _ = write!(out, "{:08x}", v);
            }),
            Record::Int(values) => self.list(values, |out, v| {
                let _ = write!(out, "{}", v);
            }),
            Record::Float(values) => {
                let fmt = self.float_format;
                self.list(values, |out, v| fmt.write(out, *v));
            }
            Record::ULong(v) => {
                let _ = write!(self.out, "{:016x}", v);
            }
            Record::SLong(v) => {
                let _ = write!(self.out, "{}", v);
            }
            Record::Matrix(m) => self.matrix(m),
            Record::SetSuffix(_) | Record::Unknown { .. } => {}
        }
    }

    fn list<T>(&mut self, values: &[T], mut item: impl FnMut(&mut String, &T)) {
        for (n, v) in values.iter().enumerate() {
            if n > 0 {
                self.out.push_str(", ");
            }
            item(&mut self.out, v);
        }
    }

    /// One line per row, each value preceded by a space, columns comma separated.
    fn matrix(&mut self, m: &Matrix) {
        for row in 0..m.rows {
            for col in 0..m.cols {
                if col > 0 {
                    self.out.push(',');
                }
                self.out.push(' ');
                if let Some(v) = m.get(row, col) {
                    self.float_format.write(&mut self.out, v);
                }
            }
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RecordEncoder;

    fn decode(enc: &RecordEncoder) -> DecodedText {
        Decoder::default().decode_words(&enc.finish())
    }

    #[test]
    fn test_scalars() {
        let mut enc = RecordEncoder::new();
        enc.uints(&[0xbeef, 1])
            .ints(&[-3, 4])
            .ulong(0xdead_beef_0000_0001)
            .slong(-42)
            .char(b'!');
        let decoded = decode(&enc);
        assert_eq!(
            decoded.text,
            "0000beef, 00000001\n-3, 4\ndeadbeef00000001\n-42\n!\n"
        );
        assert!(decoded.is_complete());
        assert_eq!(decoded.records, 5);
    }

    #[test]
    fn test_floats_use_configured_pattern() {
        let mut enc = RecordEncoder::new();
        enc.floats(&[1.5, -0.5]);
        let decoder = Decoder::new(FloatFormat::parse("[%.1f]").unwrap(), DEFAULT_SUFFIX);
        assert_eq!(decoder.decode_words(&enc.finish()).text, "[1.5], [-0.5]\n");
    }

    #[test]
    fn test_matrix_rows_from_column_major_values() {
        let mut enc = RecordEncoder::new();
        enc.matrix(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(decode(&enc).text, " 1.000, 3.000\n 2.000, 4.000\n\n");
    }

    #[test]
    fn test_non_square_matrix() {
        let mut enc = RecordEncoder::new();
        enc.set_suffix(0).matrix(3, 1, &[1.0, 2.0, 3.0]);
        assert_eq!(decode(&enc).text, " 1.000, 2.000, 3.000\n");
    }

    #[test]
    fn test_suffix_control() {
        let mut enc = RecordEncoder::new();
        enc.set_suffix(b'|').char(b'A').char(b'B');
        assert_eq!(decode(&enc).text, "A|B|");
    }

    #[test]
    fn test_high_char_bytes_are_latin1() {
        let mut enc = RecordEncoder::new();
        enc.char(0xe9);
        let decoded = decode(&enc);
        assert_eq!(decoded.text, "\u{e9}\n");
        assert_eq!(decoded.text.len(), 3);
    }

    #[test]
    fn test_nul_suffix_appends_nothing() {
        let mut enc = RecordEncoder::new();
        enc.set_suffix(0).text("hi");
        assert_eq!(decode(&enc).text, "hi");
    }

    #[test]
    fn test_initial_suffix_is_configurable() {
        let mut enc = RecordEncoder::new();
        enc.ints(&[1]).ints(&[2]);
        let decoder = Decoder::new(FloatFormat::default(), b';');
        assert_eq!(decoder.decode_words(&enc.finish()).text, "1;2;");
    }

    #[test]
    fn test_unknown_kind_is_counted_and_skipped() {
        let mut enc = RecordEncoder::new();
        enc.record(99, 2, &[5, 6]).ints(&[7]);
        let decoded = decode(&enc);
        assert_eq!(decoded.text, "\n7\n");
        assert_eq!(decoded.unknown_records, 1);
        assert!(decoded.is_complete());
    }

    #[test]
    fn test_truncated_stream_keeps_partial_values() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').uints(&[1, 2, 3, 4]);
        let decoded = Decoder::default().decode_words(&enc.finish_with_length(7));
        assert_eq!(decoded.text, "a\n00000001, 00000002");
        assert_eq!(
            decoded.issue,
            Some(DecodeError::TruncatedStream { at: 7, length: 7 })
        );
    }

    #[test]
    fn test_length_exceeding_capacity_is_flagged() {
        let mut enc = RecordEncoder::new();
        enc.ints(&[5]);
        let decoded = Decoder::default().decode_words(&enc.finish_with_length(1000));
        assert_eq!(decoded.text, "5\n");
        assert_eq!(
            decoded.issue,
            Some(DecodeError::LengthExceedsCapacity {
                length: 1000,
                capacity: 3
            })
        );
    }

    #[test]
    fn test_record_cut_at_capacity_keeps_truncation() {
        let mut enc = RecordEncoder::new();
        enc.char(b'x').uints(&[7, 8, 9]);
        let mut words = enc.finish_with_length(1000);
        words.truncate(HEADER_WORDS + 7);

        let decoded = Decoder::default().decode_words(&words);
        assert_eq!(decoded.text, "x\n00000007, 00000008");
        assert_eq!(
            decoded.issue,
            Some(DecodeError::TruncatedStream { at: 7, length: 7 })
        );
    }

    fn assert_cut(enc: &RecordEncoder, length: u32, text: &str) {
        let decoded = Decoder::default().decode_words(&enc.finish_with_length(length));
        assert_eq!(decoded.text, text);
        assert_eq!(
            decoded.issue,
            Some(DecodeError::TruncatedStream {
                at: length as usize,
                length: length as usize
            })
        );
    }

    #[test]
    fn test_cut_ulong_emits_nothing() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').ulong(0x1111_2222_3333_4444);
        // High word read, low word past the limit.
        assert_cut(&enc, 6, "a\n");
    }

    #[test]
    fn test_cut_slong_emits_nothing() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').slong(-1);
        assert_cut(&enc, 5, "a\n");
    }

    #[test]
    fn test_cut_matrix_emits_nothing() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').matrix(2, 1, &[1.0, 2.0]);
        // Header and first element inside the limit, second element past it.
        assert_cut(&enc, 8, "a\n");
    }

    #[test]
    fn test_cut_char_payload_emits_nothing() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').char(b'b');
        assert_cut(&enc, 5, "a\n");
    }

    #[test]
    fn test_cut_set_suffix_payload_emits_nothing() {
        let mut enc = RecordEncoder::new();
        enc.char(b'a').set_suffix(b'|').char(b'b');
        assert_cut(&enc, 5, "a\n");
    }

    #[test]
    fn test_missing_header() {
        let decoded = Decoder::default().decode_snapshot(&[1, 2, 3]);
        assert!(decoded.is_empty());
        assert_eq!(decoded.issue, Some(DecodeError::MissingHeader { words: 0 }));
    }

    #[test]
    fn test_zero_length_is_empty_and_complete() {
        let decoded = Decoder::default().decode_words(&[0, 0, 1, 1, 1]);
        assert!(decoded.is_empty());
        assert!(decoded.is_complete());
    }
}
