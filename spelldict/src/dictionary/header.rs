//! The entry count on the first line of a dictionary file.
//!
//! New entries are appended to the end of the file and the count is then
//! rewritten. When the new count fits the bytes the old one occupied it is
//! patched in place, padded with spaces. Otherwise the file is rewritten to a
//! staged sibling and renamed over the original.
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use smol_str::SmolStr;
use tempfile::NamedTempFile;

use super::encoding::{trim_line_end, LineCodec, LineSeparator};
use super::error::DictionaryError;
use crate::constants::{MAX_HEADER_LEN, UTF8_BOM};

/// Parsed first line of a dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Entry count recorded in the file.
    pub count: u64,
    /// Whether the file starts with a UTF-8 byte order mark.
    pub bom: bool,
    field_start: u64,
    field_len: usize,
    line_len: u64,
    terminated: bool,
}

impl Header {
    /// Offset of the first entry line.
    pub fn body_start(&self) -> u64 {
        self.line_len
    }

    /// Whether `count` can be written over the current field without moving
    /// any other byte of the file.
    pub fn fits(&self, count: u64) -> bool {
        self.terminated && count.to_string().len() <= self.field_len
    }

    /// Renders a fresh header line.
    pub fn render(count: u64, bom: bool, separator: LineSeparator) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        if bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(count.to_string().as_bytes());
        out.extend_from_slice(separator.as_bytes());
        out
    }

    fn padded_field(&self, count: u64) -> Vec<u8> {
        let mut field = count.to_string().into_bytes();
        field.resize(self.field_len, b' ');
        field
    }
}

/// Reads and validates the header of the file at `path`.
pub fn read_header(path: &Path) -> Result<Header, DictionaryError> {
    let file = File::open(path).map_err(DictionaryError::io(path))?;
    parse_header(BufReader::new(file), path)
}

pub(crate) fn parse_header<R: BufRead>(reader: R, path: &Path) -> Result<Header, DictionaryError> {
    let mut raw = Vec::with_capacity(32);
    reader
        .take(MAX_HEADER_LEN as u64 + 1)
        .read_until(b'\n', &mut raw)
        .map_err(DictionaryError::io(path))?;

    let format_error = |raw: &[u8]| DictionaryError::Format {
        path: path.to_path_buf(),
        found: String::from_utf8_lossy(trim_line_end(raw)).into_owned(),
    };

    if raw.len() > MAX_HEADER_LEN {
        return Err(format_error(&raw));
    }

    let terminated = raw.last() == Some(&b'\n');
    let bom = raw.starts_with(UTF8_BOM);
    let field_start = if bom { UTF8_BOM.len() } else { 0 };
    let field = trim_line_end(&raw[field_start..]);

    let count = std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| format_error(&raw))?;

    Ok(Header {
        count,
        bom,
        field_start: field_start as u64,
        field_len: field.len(),
        line_len: raw.len() as u64,
        terminated,
    })
}

/// What [`append_entries`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Count recorded before the append.
    pub previous: u64,
    /// Count recorded after the append.
    pub count: u64,
    /// Entry lines appended.
    pub appended: usize,
    /// The header did not fit and the whole file was rewritten.
    pub rewritten: bool,
}

/// Appends `words` to the dictionary at `path` and raises its count.
///
/// Every word is validated and encoded before the file is touched, so a
/// malformed header, a blank entry or an unencodable word leaves the file as
/// it was.
pub fn append_entries(
    path: &Path,
    codec: &LineCodec,
    words: &[SmolStr],
) -> Result<PatchOutcome, DictionaryError> {
    let path = &resolve(path)?;
    let header = read_header(path)?;

    let mut entries = Vec::with_capacity(words.len() * 16);
    for word in words {
        // the sort skips blank lines
        if word.trim().is_empty() || word.contains(|c: char| c == '\n' || c == '\r') {
            return Err(DictionaryError::InvalidEntry(word.to_string()));
        }
        codec.encode_line(word, &mut entries)?;
    }

    let count = header.count + words.len() as u64;
    let mut outcome = PatchOutcome {
        previous: header.count,
        count,
        appended: words.len(),
        rewritten: false,
    };

    if words.is_empty() {
        return Ok(outcome);
    }

    if header.fits(count) {
        patch_in_place(path, &header, codec, count, &entries)?;
    } else {
        log::debug!(
            "Count {} does not fit the header of {}, rewriting",
            count,
            path.display()
        );
        rewrite(path, &header, codec, count, &entries)?;
        outcome.rewritten = true;
    }

    Ok(outcome)
}

fn patch_in_place(
    path: &Path,
    header: &Header,
    codec: &LineCodec,
    count: u64,
    entries: &[u8],
) -> Result<(), DictionaryError> {
    let map_err = DictionaryError::io(path);
    let result = (|| -> io::Result<()> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        if needs_separator(&mut file, header.body_start())? {
            file.seek(SeekFrom::End(0))?;
            file.write_all(codec.separator().as_bytes())?;
        }
        file.seek(SeekFrom::End(0))?;
        file.write_all(entries)?;

        file.seek(SeekFrom::Start(header.field_start))?;
        file.write_all(&header.padded_field(count))?;
        file.sync_all()
    })();

    result.map_err(map_err)
}

fn rewrite(
    path: &Path,
    header: &Header,
    codec: &LineCodec,
    count: u64,
    entries: &[u8],
) -> Result<(), DictionaryError> {
    let dir = parent_dir(path);
    let staged = NamedTempFile::new_in(dir).map_err(DictionaryError::io(dir))?;

    let result = (|| -> io::Result<NamedTempFile> {
        let mut original = File::open(path)?;
        let separator = needs_separator(&mut original, header.body_start())?;
        original.seek(SeekFrom::Start(header.body_start()))?;

        let mut writer = BufWriter::new(staged);
        writer.write_all(&Header::render(count, header.bom, codec.separator()))?;
        io::copy(&mut original, &mut writer)?;
        if separator {
            writer.write_all(codec.separator().as_bytes())?;
        }
        writer.write_all(entries)?;

        let staged = writer.into_inner().map_err(|e| e.into_error())?;
        staged.as_file().sync_all()?;
        Ok(staged)
    })();

    let staged = result.map_err(DictionaryError::io(path))?;
    persist_over(staged, path)
}

/// Renames `staged` over `target`, giving it the permissions of the file it
/// replaces.
pub(crate) fn persist_over(staged: NamedTempFile, target: &Path) -> Result<(), DictionaryError> {
    match fs::metadata(target) {
        Ok(meta) => fs::set_permissions(staged.path(), meta.permissions())
            .map_err(DictionaryError::io(staged.path()))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(DictionaryError::io(target)(e)),
    }

    staged
        .persist(target)
        .map_err(|e| DictionaryError::io(target)(e.error))?;
    Ok(())
}

/// `path` with symlinks resolved, so a replacement lands on the linked file
/// instead of the link.
pub(crate) fn resolve(path: &Path) -> Result<PathBuf, DictionaryError> {
    fs::canonicalize(path).map_err(DictionaryError::io(path))
}

/// True when the body is non-empty and its last byte is not a line feed.
fn needs_separator(file: &mut File, body_start: u64) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len <= body_start {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dic(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dic");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn words(w: &[&str]) -> Vec<SmolStr> {
        w.iter().map(|x| SmolStr::new(x)).collect()
    }

    #[test]
    fn parse() {
        let (_dir, path) = dic(b"2\napple\nzebra\n");
        let header = read_header(&path).unwrap();
        assert_eq!(header.count, 2);
        assert_eq!(header.body_start(), 2);
        assert!(!header.bom);

        let (_dir, path) = dic(b"\xEF\xBB\xBF 12 \r\nfoo\n");
        let header = read_header(&path).unwrap();
        assert_eq!(header.count, 12);
        assert!(header.bom);
        assert_eq!(header.body_start(), 9);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        let (_dir, path) = dic(b"SET UTF-8\nfoo\n");
        match read_header(&path) {
            Err(DictionaryError::Format { found, .. }) => assert_eq!(found, "SET UTF-8"),
            other => panic!("unexpected {:?}", other),
        }

        let (_dir, path) = dic(b"");
        assert!(matches!(read_header(&path), Err(DictionaryError::Format { .. })));

        let long = vec![b'1'; MAX_HEADER_LEN + 10];
        let (_dir, path) = dic(&long);
        assert!(matches!(read_header(&path), Err(DictionaryError::Format { .. })));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_header(&dir.path().join("nope.dic")).unwrap_err();
        assert!(matches!(err, DictionaryError::Io { .. }));
    }

    #[test]
    fn append_in_place() {
        let (_dir, path) = dic(b"2\napple\nzebra\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        let outcome = append_entries(&path, &codec, &words(&["mango"])).unwrap();

        assert_eq!(outcome.previous, 2);
        assert_eq!(outcome.count, 3);
        assert!(!outcome.rewritten);
        assert_eq!(fs::read(&path).unwrap(), b"3\napple\nzebra\nmango\n");
    }

    #[test]
    fn append_pads_wide_field() {
        let (_dir, path) = dic(b"0010\na\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        append_entries(&path, &codec, &words(&["b"])).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"11  \na\nb\n");
        assert_eq!(read_header(&path).unwrap().count, 11);
    }

    #[test]
    fn append_rewrites_when_count_grows_a_digit() {
        let (_dir, path) = dic(b"9\na\nb\nc\nd\ne\nf\ng\nh\ni\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        let outcome = append_entries(&path, &codec, &words(&["j"])).unwrap();

        assert!(outcome.rewritten);
        assert_eq!(
            fs::read(&path).unwrap(),
            b"10\na\nb\nc\nd\ne\nf\ng\nh\ni\nj\n"
        );
    }

    #[test]
    fn append_after_unterminated_last_line() {
        let (_dir, path) = dic(b"1\napple");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        append_entries(&path, &codec, &words(&["mango"])).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"2\napple\nmango\n");
    }

    #[test]
    fn append_to_bare_count() {
        let (_dir, path) = dic(b"0");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        let outcome = append_entries(&path, &codec, &words(&["word"])).unwrap();

        assert!(outcome.rewritten);
        assert_eq!(fs::read(&path).unwrap(), b"1\nword\n");
    }

    #[test]
    fn append_keeps_bom_on_rewrite() {
        let (_dir, path) = dic(b"\xEF\xBB\xBF9\na\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        append_entries(&path, &codec, &words(&["b"])).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBF10\na\nb\n");
    }

    #[test]
    fn append_encodes() {
        let (_dir, path) = dic(b"0\n");
        let codec = LineCodec::new("ISO8859-1", LineSeparator::CrLf).unwrap();
        append_entries(&path, &codec, &words(&["borogodó"])).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"1\nborogod\xF3\r\n");
    }

    #[test]
    fn bad_input_leaves_file_alone() {
        let (_dir, path) = dic(b"one\napple\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);
        assert!(append_entries(&path, &codec, &words(&["mango"])).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"one\napple\n");

        let (_dir, path) = dic(b"1\napple\n");
        let codec = LineCodec::new("ISO8859-1", LineSeparator::Lf).unwrap();
        assert!(append_entries(&path, &codec, &words(&["ok", "дом"])).is_err());
        assert!(append_entries(&path, &codec, &words(&["two\nlines"])).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"1\napple\n");
    }

    #[test]
    fn blank_entries_rejected() {
        let (_dir, path) = dic(b"1\napple\n");
        let codec = LineCodec::utf8(LineSeparator::Lf);

        for blank in &["", "\t", "  "] {
            match append_entries(&path, &codec, &words(&["mango", *blank])) {
                Err(DictionaryError::InvalidEntry(entry)) => assert_eq!(entry, *blank),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(fs::read(&path).unwrap(), b"1\napple\n");
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_mode_and_link() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, path) = dic(b"9\na\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let link = dir.path().join("link.dic");
        std::os::unix::fs::symlink(&path, &link).unwrap();

        let codec = LineCodec::utf8(LineSeparator::Lf);
        let outcome = append_entries(&link, &codec, &words(&["b"])).unwrap();

        assert!(outcome.rewritten);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&path).unwrap(), b"10\na\nb\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
