//! Sorted runs spilled to temporary files.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::dictionary::encoding::LineCodec;
use crate::dictionary::error::DictionaryError;

/// A temporary file holding sorted lines, one per line, in the dictionary
/// encoding. The file is deleted when the batch is dropped.
#[derive(Debug)]
pub struct SortBatch {
    file: NamedTempFile,
    lines: u64,
}

impl SortBatch {
    pub(crate) fn create(dir: Option<&Path>) -> Result<NamedTempFile, DictionaryError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("spelldict-batch").suffix(".tmp");
        match dir {
            Some(dir) => builder.tempfile_in(dir).map_err(DictionaryError::io(dir)),
            None => builder
                .tempfile()
                .map_err(DictionaryError::io(std::env::temp_dir())),
        }
    }

    /// Writes `lines` (already sorted) to a new batch.
    pub fn write<S: AsRef<str>>(
        lines: &[S],
        codec: &LineCodec,
        dir: Option<&Path>,
    ) -> Result<SortBatch, DictionaryError> {
        let mut writer = BatchWriter::new(SortBatch::create(dir)?, *codec);
        for line in lines {
            writer.push(line.as_ref())?;
        }
        writer.finish()
    }

    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of lines in the batch.
    pub fn len(&self) -> u64 {
        self.lines
    }

    /// Whether the batch holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    /// Reads the batch back from the start.
    pub fn reader(&self, codec: &LineCodec) -> Result<LineReader<File>, DictionaryError> {
        let file = self.file.reopen().map_err(DictionaryError::io(self.path()))?;
        Ok(LineReader::new(file, self.path(), *codec, 0))
    }
}

/// Streams lines into a batch file.
pub(crate) struct BatchWriter {
    file: NamedTempFile,
    codec: LineCodec,
    buf: Vec<u8>,
    lines: u64,
}

impl BatchWriter {
    pub(crate) fn new(file: NamedTempFile, codec: LineCodec) -> BatchWriter {
        BatchWriter {
            file,
            codec,
            buf: Vec::with_capacity(64 * 1024),
            lines: 0,
        }
    }

    pub(crate) fn push(&mut self, line: &str) -> Result<(), DictionaryError> {
        self.codec.encode_line(line, &mut self.buf)?;
        self.lines += 1;
        if self.buf.len() >= 64 * 1024 {
            self.flush_buf()?;
        }
        Ok(())
    }

    fn flush_buf(&mut self) -> Result<(), DictionaryError> {
        self.file
            .write_all(&self.buf)
            .map_err(DictionaryError::io(self.file.path()))?;
        self.buf.clear();
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<SortBatch, DictionaryError> {
        self.flush_buf()?;
        self.file
            .flush()
            .map_err(DictionaryError::io(self.file.path()))?;
        Ok(SortBatch {
            file: self.file,
            lines: self.lines,
        })
    }
}

/// Line cursor over a file, decoding with the dictionary encoding.
pub struct LineReader<R> {
    reader: BufReader<R>,
    path: PathBuf,
    codec: LineCodec,
    line: u64,
    buf: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    /// `skipped` is the number of lines before the reader's position, used
    /// for error reporting.
    pub fn new(inner: R, path: &Path, codec: LineCodec, skipped: u64) -> LineReader<R> {
        LineReader {
            reader: BufReader::new(inner),
            path: path.to_path_buf(),
            codec,
            line: skipped,
            buf: Vec::with_capacity(64),
        }
    }

    /// 1-based number of the line last returned.
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// The next decoded line, without its separator.
    pub fn next_line(&mut self) -> Result<Option<String>, DictionaryError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(DictionaryError::io(&self.path))?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;

        match self.codec.decode_line(&self.buf) {
            Some(text) => Ok(Some(text.into_owned())),
            None => Err(DictionaryError::Undecodable {
                path: self.path.clone(),
                line: self.line,
                encoding: self.codec.encoding_name(),
            }),
        }
    }
}

/// Copies a batch's raw bytes to `out`.
pub(crate) fn copy_batch<W: Write>(
    batch: &SortBatch,
    out: &mut W,
    out_path: &Path,
) -> Result<u64, DictionaryError> {
    let mut file = batch.file.reopen().map_err(DictionaryError::io(batch.path()))?;
    let mut out = BufWriter::new(out);
    let n = std::io::copy(&mut file, &mut out).map_err(DictionaryError::io(out_path))?;
    out.flush().map_err(DictionaryError::io(out_path))?;
    Ok(n)
}
