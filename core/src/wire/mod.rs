//! Layout of the shared printf buffer.
//!
//! The GPU producer and the host decoder agree on this layout and nothing else:
//!
//! ```text
//! word[0]              producer bookkeeping (write cursor), never interpreted
//! word[1]              length: number of payload words that follow
//! word[2..2 + length]  record stream
//! ```
//!
//! Every record starts with a `kind` word and a `components` word, followed by
//! a kind-specific payload.

mod encoder;

pub use encoder::RecordEncoder;

use serde::{Deserialize, Serialize};

/// Number of 32-bit words in the reference channel configuration.
pub const DEFAULT_CAPACITY_WORDS: usize = 1024 * 1024;

/// Words before the record stream (bookkeeping + length).
pub const HEADER_WORDS: usize = 2;

/// Index of the length word.
pub const LENGTH_WORD: usize = 1;

/// Words at the start of every record (kind + components).
pub const RECORD_HEADER_WORDS: usize = 2;

/// Record type tag as written by the producer.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Char = 0,
    UInt = 1,
    Int = 2,
    Float = 3,
    ULong = 4,
    SLong = 5,
    Matrix = 6,
    SetSuffix = 7,
}

impl RecordKind {
    /// All record kinds in wire order.
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Char,
            RecordKind::UInt,
            RecordKind::Int,
            RecordKind::Float,
            RecordKind::ULong,
            RecordKind::SLong,
            RecordKind::Matrix,
            RecordKind::SetSuffix,
        ]
    }

    /// Decode a kind word, `None` for codes this decoder does not know.
    pub fn from_word(word: u32) -> Option<Self> {
        RecordKind::all().get(word as usize).copied()
    }

    pub fn as_word(self) -> u32 {
        self as u32
    }
}

/// A matrix of floats stored column-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub cols: u32,
    pub rows: u32,
    /// `values[col * rows + row]`.
    pub values: Vec<f32>,
}

impl Matrix {
    /// Element at (`row`, `col`), `None` if out of range.
    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values
            .get(col as usize * self.rows as usize + row as usize)
            .copied()
    }
}

/// One decoded record with its typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Rendered as the Latin-1 character of the byte, so bytes 0x80 and up
    /// take two UTF-8 bytes in the decoded text.
    Char(u8),
    UInt(Vec<u32>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    ULong(u64),
    SLong(i64),
    Matrix(Matrix),
    SetSuffix(u8),
    /// A kind code outside the known set. Its `components` payload words were skipped.
    Unknown { kind: u32, components: u32 },
}

impl Record {
    /// Wire kind, `None` for [`Record::Unknown`].
    pub fn kind(&self) -> Option<RecordKind> {
        match self {
            Record::Char(_) => Some(RecordKind::Char),
            Record::UInt(_) => Some(RecordKind::UInt),
            Record::Int(_) => Some(RecordKind::Int),
            Record::Float(_) => Some(RecordKind::Float),
            Record::ULong(_) => Some(RecordKind::ULong),
            Record::SLong(_) => Some(RecordKind::SLong),
            Record::Matrix(_) => Some(RecordKind::Matrix),
            Record::SetSuffix(_) => Some(RecordKind::SetSuffix),
            Record::Unknown { .. } => None,
        }
    }
}

/// Read-only view of 32-bit little-endian words over raw bytes.
///
/// Mapped staging memory carries no alignment guarantee for `u32`, so words
/// are assembled from bytes instead of cast in place.
#[derive(Debug, Clone, Copy)]
pub struct WordStream<'a> {
    bytes: &'a [u8],
}

impl<'a> WordStream<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn from_words(words: &'a [u32]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(words),
        }
    }

    /// Number of whole words available.
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn word(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        let chunk = self.bytes.get(start..start.checked_add(4)?)?;
        Some(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// Sub-stream starting at word `start`; empty if `start` is past the end.
    pub fn skip(&self, start: usize) -> WordStream<'a> {
        let offset = start.saturating_mul(4).min(self.bytes.len());
        WordStream {
            bytes: &self.bytes[offset..],
        }
    }

    /// The declared payload length, `None` if the header is missing.
    pub fn declared_length(&self) -> Option<u32> {
        if self.len() < HEADER_WORDS {
            return None;
        }
        self.word(LENGTH_WORD)
    }

    /// The record stream following the header.
    pub fn payload(&self) -> WordStream<'a> {
        self.skip(HEADER_WORDS)
    }
}
