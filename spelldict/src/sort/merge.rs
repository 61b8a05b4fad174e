//! K-way merge of sorted batches.
//!
//! A min-heap is seeded with the first line of every batch. The smallest
//! line is popped, written, and replaced by the next line of the batch it
//! came from. Lines that compare equal are ordered by batch index so the
//! output is the same on every run.
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;

use super::batch::{LineReader, SortBatch};
use super::collation::Collation;
use crate::dictionary::encoding::LineCodec;
use crate::dictionary::error::DictionaryError;

struct HeapEntry<'c> {
    line: String,
    batch: usize,
    collation: &'c dyn Collation,
}

impl<'c> PartialEq for HeapEntry<'c> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<'c> Eq for HeapEntry<'c> {}

impl<'c> PartialOrd for HeapEntry<'c> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'c> Ord for HeapEntry<'c> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.collation
            .compare(&self.line, &other.line)
            .then_with(|| self.batch.cmp(&other.batch))
    }
}

/// Receives merged lines in order.
pub(crate) trait LineSink {
    fn push(&mut self, line: &str) -> Result<(), DictionaryError>;
}

impl LineSink for super::batch::BatchWriter {
    fn push(&mut self, line: &str) -> Result<(), DictionaryError> {
        super::batch::BatchWriter::push(self, line)
    }
}

/// Merges `batches` into `sink`. Returns the number of lines written.
///
/// With `dedup`, a line equal to the previously written one under
/// `collation` is dropped.
pub(crate) fn merge_batches<S: LineSink>(
    batches: &[SortBatch],
    codec: &LineCodec,
    collation: &dyn Collation,
    dedup: bool,
    sink: &mut S,
) -> Result<u64, DictionaryError> {
    let mut readers: Vec<LineReader<File>> = Vec::with_capacity(batches.len());
    for batch in batches {
        readers.push(batch.reader(codec)?);
    }

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(readers.len());
    for (batch, reader) in readers.iter_mut().enumerate() {
        if let Some(line) = reader.next_line()? {
            heap.push(Reverse(HeapEntry {
                line,
                batch,
                collation,
            }));
        }
    }

    let mut written = 0u64;
    let mut last: Option<String> = None;

    while let Some(Reverse(entry)) = heap.pop() {
        let is_dup = dedup
            && last
                .as_deref()
                .map_or(false, |prev| collation.compare(prev, &entry.line) == Ordering::Equal);

        if !is_dup {
            sink.push(&entry.line)?;
            written += 1;
        }

        let batch = entry.batch;
        if dedup && !is_dup {
            last = Some(entry.line);
        }

        if let Some(line) = readers[batch].next_line()? {
            heap.push(Reverse(HeapEntry {
                line,
                batch,
                collation,
            }));
        }
    }

    Ok(written)
}
