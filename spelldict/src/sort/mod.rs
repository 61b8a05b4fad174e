//! External sort of dictionary files.
//!
//! Entry lines are read in blocks small enough to sort in memory, each
//! sorted block is spilled to a [`SortBatch`], and the batches are combined
//! with a k-way merge. The result, headed by the number of lines written, is
//! staged next to the dictionary and renamed over it, so a failure at any
//! point leaves the original file in place.
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::constants::{DEFAULT_MAX_MEMORY, DEFAULT_MAX_TEMP_FILES, LINE_OVERHEAD};
use crate::dictionary::encoding::LineCodec;
use crate::dictionary::error::DictionaryError;
use crate::dictionary::header::{parent_dir, persist_over, read_header, resolve, Header};

pub mod batch;
pub mod collation;
mod merge;

pub use self::batch::{LineReader, SortBatch};
pub use self::collation::{Collation, CollationOrder, Lexicographic, LocaleCollation};
use self::batch::{copy_batch, BatchWriter};
use self::merge::{merge_batches, LineSink};

/// Limits and options of an external sort.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Most batches produced by the split phase, and the fan-in of a merge.
    pub max_temp_files: usize,
    /// Memory budget in bytes for lines buffered during the split phase.
    pub max_memory: usize,
    /// Drop lines that compare equal to the line before them.
    pub dedup: bool,
    /// Where batches are spilled. Defaults to the system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl SortConfig {
    /// Default limits, usable in `const` context.
    pub const fn default() -> SortConfig {
        SortConfig {
            max_temp_files: DEFAULT_MAX_TEMP_FILES,
            max_memory: DEFAULT_MAX_MEMORY,
            dedup: false,
            temp_dir: None,
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig::default()
    }
}

/// Block size for the split phase: enough to stay within `max_temp_files`
/// batches, but never below half the memory budget.
pub fn estimate_block_size(input_len: u64, max_temp_files: usize, max_memory: usize) -> u64 {
    let files = max_temp_files.max(1) as u64;
    let mut block = input_len / files + u64::from(input_len % files != 0);
    let floor = max_memory as u64 / 2;
    if block < floor {
        block = floor;
    }
    if block > max_memory as u64 {
        log::warn!(
            "Sort block of {} bytes exceeds the memory budget of {} bytes",
            block,
            max_memory
        );
    }
    block.max(1)
}

/// Counters from one sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortStats {
    /// Entry lines read from the input.
    pub read: u64,
    /// Entry lines written to the output.
    pub written: u64,
    /// Blank lines skipped.
    pub skipped: u64,
    /// Batches produced by the split phase.
    pub batches: usize,
    /// Merge passes, including the final one.
    pub passes: usize,
}

/// Sorts dictionary files in bounded memory.
pub struct ExternalSorter<'c> {
    config: SortConfig,
    codec: LineCodec,
    collation: &'c dyn Collation,
}

impl<'c> ExternalSorter<'c> {
    /// A sorter writing `codec`-encoded lines in the order of `collation`.
    pub fn new(config: SortConfig, codec: LineCodec, collation: &'c dyn Collation) -> Self {
        ExternalSorter {
            config,
            codec,
            collation,
        }
    }

    /// The limits this sorter runs with.
    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    fn fan_in(&self) -> usize {
        self.config.max_temp_files.max(2)
    }

    fn temp_dir(&self) -> Option<&Path> {
        self.config.temp_dir.as_deref()
    }

    /// Sorts the entries of the dictionary at `path` and replaces it.
    ///
    /// The header of the replacement holds the number of entries written,
    /// whatever the old header said. A symlinked dictionary is replaced at
    /// the link's target, and the file keeps its permissions.
    pub fn sort_file(&self, path: &Path) -> Result<SortStats, DictionaryError> {
        let path = resolve(path)?;
        self.sort_into(&path, &path)
    }

    /// Sorts the dictionary at `input` and renames the result over `output`.
    ///
    /// `output` is only replaced once the sorted file is complete and synced;
    /// `input` is never written.
    pub fn sort_into(&self, input: &Path, output: &Path) -> Result<SortStats, DictionaryError> {
        let header = read_header(input)?;

        let mut file = File::open(input).map_err(DictionaryError::io(input))?;
        let len = file.metadata().map_err(DictionaryError::io(input))?.len();
        file.seek(SeekFrom::Start(header.body_start()))
            .map_err(DictionaryError::io(input))?;

        let dir = parent_dir(output);
        let staged = NamedTempFile::new_in(dir).map_err(DictionaryError::io(dir))?;
        let mut out = BufWriter::new(staged);

        let stats = self.sort_lines(
            file,
            len.saturating_sub(header.body_start()),
            input,
            header.bom,
            &mut out,
        )?;

        if stats.written != header.count {
            log::warn!(
                "{} recorded {} entries but holds {}, correcting the count",
                output.display(),
                header.count,
                stats.written
            );
        }

        let staged = out
            .into_inner()
            .map_err(|e| DictionaryError::io(output)(e.into_error()))?;
        staged
            .as_file()
            .sync_all()
            .map_err(DictionaryError::io(staged.path()))?;
        persist_over(staged, output)?;

        Ok(stats)
    }

    /// Sorts the entry lines of `input` and writes a complete dictionary,
    /// header first, to `output`.
    ///
    /// `input_len` is the expected number of bytes and only sizes the
    /// batches. `source` names the input in errors.
    pub fn sort_lines<R: Read, W: Write>(
        &self,
        input: R,
        input_len: u64,
        source: &Path,
        bom: bool,
        output: &mut W,
    ) -> Result<SortStats, DictionaryError> {
        let mut stats = SortStats::default();
        let mut reader = LineReader::new(input, source, self.codec, 1);

        let batches = self.split(&mut reader, input_len, &mut stats)?;
        stats.batches = batches.len();
        log::debug!(
            "Split {} entries of {} into {} batches",
            stats.read,
            source.display(),
            batches.len()
        );

        let batches = self.reduce(batches, &mut stats)?;
        stats.passes += 1;

        let mut sink = EncodedSink {
            out: output,
            codec: self.codec,
            path: source,
            buf: Vec::with_capacity(64 * 1024),
        };

        if self.config.dedup {
            let mut merged = BatchWriter::new(SortBatch::create(self.temp_dir())?, self.codec);
            merge_batches(&batches, &self.codec, self.collation, true, &mut merged)?;
            drop(batches);
            let merged = merged.finish()?;

            stats.written = merged.len();
            sink.write_raw(&Header::render(merged.len(), bom, self.codec.separator()))?;
            sink.flush()?;
            copy_batch(&merged, sink.out, source)?;
        } else {
            let total: u64 = batches.iter().map(|b| b.len()).sum();
            sink.write_raw(&Header::render(total, bom, self.codec.separator()))?;
            stats.written =
                merge_batches(&batches, &self.codec, self.collation, false, &mut sink)?;
            sink.flush()?;
        }

        Ok(stats)
    }

    fn split<R: Read>(
        &self,
        reader: &mut LineReader<R>,
        input_len: u64,
        stats: &mut SortStats,
    ) -> Result<Vec<SortBatch>, DictionaryError> {
        let block = estimate_block_size(
            input_len,
            self.config.max_temp_files,
            self.config.max_memory,
        );

        let mut batches = vec![];
        let mut buffer: Vec<String> = vec![];
        let mut used = 0u64;

        while let Some(line) = reader.next_line()? {
            if line.trim().is_empty() {
                log::warn!("Skipping blank line {}", reader.line_number());
                stats.skipped += 1;
                continue;
            }

            stats.read += 1;
            used += (line.len() + LINE_OVERHEAD) as u64;
            buffer.push(line);

            if used >= block {
                batches.push(self.sort_and_save(&mut buffer)?);
                used = 0;
            }
        }

        if !buffer.is_empty() {
            batches.push(self.sort_and_save(&mut buffer)?);
        }

        Ok(batches)
    }

    fn sort_and_save(&self, buffer: &mut Vec<String>) -> Result<SortBatch, DictionaryError> {
        let collation = self.collation;
        buffer.sort_by(|a, b| collation.compare(a, b));
        if self.config.dedup {
            buffer.dedup_by(|a, b| collation.compare(a, b) == std::cmp::Ordering::Equal);
        }

        let batch = SortBatch::write(&buffer[..], &self.codec, self.temp_dir())?;
        buffer.clear();
        Ok(batch)
    }

    /// Merges groups of batches until one pass can open them all.
    fn reduce(
        &self,
        mut batches: Vec<SortBatch>,
        stats: &mut SortStats,
    ) -> Result<Vec<SortBatch>, DictionaryError> {
        let fan_in = self.fan_in();

        while batches.len() > fan_in {
            log::debug!(
                "Merging {} batches in groups of {}",
                batches.len(),
                fan_in
            );

            let mut next = Vec::with_capacity(batches.len() / fan_in + 1);
            for group in &batches.into_iter().chunks(fan_in) {
                let group: Vec<SortBatch> = group.collect();
                if group.len() == 1 {
                    next.extend(group);
                    continue;
                }

                let mut writer = BatchWriter::new(SortBatch::create(self.temp_dir())?, self.codec);
                merge_batches(
                    &group,
                    &self.codec,
                    self.collation,
                    self.config.dedup,
                    &mut writer,
                )?;
                next.push(writer.finish()?);
            }

            batches = next;
            stats.passes += 1;
        }

        Ok(batches)
    }
}

struct EncodedSink<'a, W: Write> {
    out: &'a mut W,
    codec: LineCodec,
    path: &'a Path,
    buf: Vec<u8>,
}

impl<'a, W: Write> EncodedSink<'a, W> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), DictionaryError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DictionaryError> {
        self.out
            .write_all(&self.buf)
            .map_err(DictionaryError::io(self.path))?;
        self.buf.clear();
        self.out.flush().map_err(DictionaryError::io(self.path))
    }
}

impl<'a, W: Write> LineSink for EncodedSink<'a, W> {
    fn push(&mut self, line: &str) -> Result<(), DictionaryError> {
        self.codec.encode_line(line, &mut self.buf)?;
        if self.buf.len() >= 64 * 1024 {
            self.flush()?;
        }
        Ok(())
    }
}
