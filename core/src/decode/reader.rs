//! Typed record iteration over a word stream.

use crate::wire::{Matrix, Record, RecordKind, WordStream};

/// A read stopped at the end of the declared stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Word index of the read that would have crossed the limit.
    pub at: usize,
    /// Values read from the cut record before the limit, if any are renderable.
    pub partial: Option<Record>,
}

/// Reads records strictly left to right, never touching a word at or past
/// `length`.
///
/// Yields `Err` once on truncation and ends afterwards.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    stream: WordStream<'a>,
    limit: usize,
    cursor: usize,
    done: bool,
}

impl<'a> RecordReader<'a> {
    /// `stream` starts at the first record; `length` is the declared payload length.
    pub fn new(stream: WordStream<'a>, length: usize) -> Self {
        Self {
            stream,
            limit: length.min(stream.len()),
            cursor: 0,
            done: false,
        }
    }

    /// Words consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn read(&mut self) -> Option<u32> {
        if self.cursor >= self.limit {
            return None;
        }
        let word = self.stream.word(self.cursor)?;
        self.cursor += 1;
        Some(word)
    }

    fn truncated(&self, partial: Option<Record>) -> Truncation {
        Truncation {
            at: self.cursor,
            partial,
        }
    }

    fn read_record(&mut self) -> Result<Record, Truncation> {
        let kind = self.read().ok_or_else(|| self.truncated(None))?;
        let components = self.read().ok_or_else(|| self.truncated(None))?;

        let Some(kind) = RecordKind::from_word(kind) else {
            return self.skip_unknown(kind, components);
        };

        match kind {
            RecordKind::Char => {
                let word = self.read().ok_or_else(|| self.truncated(None))?;
                Ok(Record::Char(word as u8))
            }
            RecordKind::UInt => self.read_list(components, |w| w, Record::UInt),
            RecordKind::Int => self.read_list(components, |w| w as i32, Record::Int),
            RecordKind::Float => self.read_list(components, f32::from_bits, Record::Float),
            RecordKind::ULong => self.read_u64().map(Record::ULong),
            RecordKind::SLong => self.read_u64().map(|v| Record::SLong(v as i64)),
            RecordKind::Matrix => self.read_matrix(),
            RecordKind::SetSuffix => {
                let word = self.read().ok_or_else(|| self.truncated(None))?;
                Ok(Record::SetSuffix(word as u8))
            }
        }
    }

    /// At least one value, `components` values when more than one is declared.
    fn read_list<T>(
        &mut self,
        components: u32,
        convert: impl Fn(u32) -> T,
        wrap: impl Fn(Vec<T>) -> Record,
    ) -> Result<Record, Truncation> {
        let count = components.max(1) as usize;
        let mut values = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            match self.read() {
                Some(word) => values.push(convert(word)),
                None => {
                    let partial = (!values.is_empty()).then(|| wrap(values));
                    return Err(self.truncated(partial));
                }
            }
        }
        Ok(wrap(values))
    }

    fn read_u64(&mut self) -> Result<u64, Truncation> {
        let high = self.read().ok_or_else(|| self.truncated(None))?;
        let low = self.read().ok_or_else(|| self.truncated(None))?;
        Ok(((high as u64) << 32) | low as u64)
    }

    /// The k-th consumed value lands at column `k / rows`, row `k % rows`, so
    /// consumption order is column-major storage order.
    fn read_matrix(&mut self) -> Result<Record, Truncation> {
        let cols = self.read().ok_or_else(|| self.truncated(None))?;
        let rows = self.read().ok_or_else(|| self.truncated(None))?;
        let count = cols as u64 * rows as u64;
        if count > self.remaining() as u64 {
            self.cursor = self.limit;
            return Err(self.truncated(None));
        }

        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let word = self.read().ok_or_else(|| self.truncated(None))?;
            values.push(f32::from_bits(word));
        }
        Ok(Record::Matrix(Matrix { cols, rows, values }))
    }

    fn skip_unknown(&mut self, kind: u32, components: u32) -> Result<Record, Truncation> {
        let skip = components as usize;
        if skip > self.remaining() {
            self.cursor = self.limit;
            return Err(self.truncated(None));
        }
        self.cursor += skip;
        log::debug!(
            "Skipped unknown printf record kind {} ({} payload words)",
            kind,
            components
        );
        Ok(Record::Unknown { kind, components })
    }

    fn remaining(&self) -> usize {
        self.limit - self.cursor
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record, Truncation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor >= self.limit {
            return None;
        }
        let result = self.read_record();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
