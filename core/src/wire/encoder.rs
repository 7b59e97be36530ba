//! Host-side record writer.
//!
//! Produces exactly what a shader-side print library writes into the buffer.
//! Used by tests, benches and the in-memory backend to stand in for a GPU
//! producer.

use super::{RecordKind, HEADER_WORDS, LENGTH_WORD};

/// Builds a record stream and its header.
#[derive(Debug, Clone, Default)]
pub struct RecordEncoder {
    payload: Vec<u32>,
}

impl RecordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload words written so far.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn char(&mut self, c: u8) -> &mut Self {
        self.record(RecordKind::Char.as_word(), 1, &[c as u32])
    }

    /// Each byte of `text` as its own `Char` record.
    pub fn text(&mut self, text: &str) -> &mut Self {
        for b in text.bytes() {
            self.char(b);
        }
        self
    }

    pub fn uints(&mut self, values: &[u32]) -> &mut Self {
        self.record(RecordKind::UInt.as_word(), values.len() as u32, values)
    }

    pub fn ints(&mut self, values: &[i32]) -> &mut Self {
        let words: Vec<u32> = values.iter().map(|&v| v as u32).collect();
        self.record(RecordKind::Int.as_word(), values.len() as u32, &words)
    }

    pub fn floats(&mut self, values: &[f32]) -> &mut Self {
        let words: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
        self.record(RecordKind::Float.as_word(), values.len() as u32, &words)
    }

    pub fn ulong(&mut self, value: u64) -> &mut Self {
        self.record(RecordKind::ULong.as_word(), 1, &split_u64(value))
    }

    pub fn slong(&mut self, value: i64) -> &mut Self {
        self.record(RecordKind::SLong.as_word(), 1, &split_u64(value as u64))
    }

    /// Matrix record; `column_major` holds `cols * rows` values, one column after another.
    pub fn matrix(&mut self, cols: u32, rows: u32, column_major: &[f32]) -> &mut Self {
        let mut words = Vec::with_capacity(2 + column_major.len());
        words.push(cols);
        words.push(rows);
        words.extend(column_major.iter().map(|v| v.to_bits()));
        self.record(RecordKind::Matrix.as_word(), cols * rows, &words)
    }

    pub fn set_suffix(&mut self, suffix: u8) -> &mut Self {
        self.record(RecordKind::SetSuffix.as_word(), 1, &[suffix as u32])
    }

    /// Arbitrary record; `payload` is written verbatim after the two header words.
    pub fn record(&mut self, kind: u32, components: u32, payload: &[u32]) -> &mut Self {
        self.payload.push(kind);
        self.payload.push(components);
        self.payload.extend_from_slice(payload);
        self
    }

    /// Raw words appended without a record header.
    pub fn raw(&mut self, words: &[u32]) -> &mut Self {
        self.payload.extend_from_slice(words);
        self
    }

    /// Header followed by the payload, declaring the full payload length.
    pub fn finish(&self) -> Vec<u32> {
        self.finish_with_length(self.payload.len() as u32)
    }

    /// Header followed by the payload, declaring an arbitrary length.
    pub fn finish_with_length(&self, length: u32) -> Vec<u32> {
        let mut words = Vec::with_capacity(HEADER_WORDS + self.payload.len());
        words.push(self.payload.len() as u32);
        words.push(length);
        words.extend_from_slice(&self.payload);
        words
    }

    /// Write header and payload into a device-sized buffer.
    ///
    /// Returns the number of words written. Payload that does not fit is dropped
    /// and the declared length is clamped to what was written.
    pub fn write_into(&self, buffer: &mut [u32]) -> usize {
        if buffer.len() < HEADER_WORDS {
            return 0;
        }
        let room = buffer.len() - HEADER_WORDS;
        let count = self.payload.len().min(room);
        buffer[0] = count as u32;
        buffer[LENGTH_WORD] = count as u32;
        buffer[HEADER_WORDS..HEADER_WORDS + count].copy_from_slice(&self.payload[..count]);
        HEADER_WORDS + count
    }
}

fn split_u64(value: u64) -> [u32; 2] {
    [(value >> 32) as u32, value as u32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_record_layout() {
        let words = RecordEncoder::new().uints(&[1, 2, 3]).finish();
        assert_eq!(words, vec![5, 5, 1, 3, 1, 2, 3]);
    }

    #[test]
    fn test_ulong_is_high_word_first() {
        let words = RecordEncoder::new().ulong(0x0102_0304_0506_0708).finish();
        assert_eq!(&words[2..], &[4, 1, 0x0102_0304, 0x0506_0708]);
    }

    #[test]
    fn test_matrix_header() {
        let words = RecordEncoder::new()
            .matrix(2, 2, &[1.0, 2.0, 3.0, 4.0])
            .finish();
        assert_eq!(&words[2..6], &[6, 4, 2, 2]);
        assert_eq!(words[6], 1.0f32.to_bits());
        assert_eq!(words.len(), 2 + 8);
    }

    #[test]
    fn test_write_into_clamps_to_capacity() {
        let mut enc = RecordEncoder::new();
        enc.uints(&[1, 2, 3, 4]);
        let mut buffer = vec![0u32; 5];
        let written = enc.write_into(&mut buffer);
        assert_eq!(written, 5);
        assert_eq!(buffer, vec![3, 3, 1, 4, 1]);
    }
}
