//! Merging runtime additions back into a dictionary file.
//!
//! An update validates the count line and copies the dictionary to a working
//! file next to it. The pending words are appended to the copy and its count
//! raised ([`header`]), then the copy is re-sorted by the external sorter
//! into a staged file that is renamed over the dictionary. The dictionary is
//! only written by that rename, so a failed update leaves it byte for byte
//! as it was. One writer per file is assumed: concurrent updates of the same
//! path are not supported.
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tempfile::NamedTempFile;

use crate::observer::{LogObserver, UpdateEvent, UpdateObserver};
use crate::sort::{Collation, CollationOrder, ExternalSorter, SortConfig, SortStats};

pub mod encoding;
pub mod error;
pub mod header;

use self::encoding::{LineCodec, LineSeparator};
use self::error::DictionaryError;
use self::header::{append_entries, parent_dir, read_header, resolve};

/// How dictionary files are written back.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Encoding label of the dictionary file. When unset, the encoding the
    /// spell engine reports is used.
    pub encoding: Option<String>,
    /// Line ending of written lines.
    pub line_separator: LineSeparator,
    /// Order of the entries after an update.
    pub collation: CollationOrder,
    /// Limits of the re-sort.
    pub sort: SortConfig,
}

impl UpdateConfig {
    /// Native line endings, code point order and default sort limits.
    pub const fn default() -> UpdateConfig {
        UpdateConfig {
            encoding: None,
            line_separator: LineSeparator::native(),
            collation: CollationOrder::Lexicographic,
            sort: SortConfig::default(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig::default()
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Count recorded before the update.
    pub previous: u64,
    /// Words appended.
    pub appended: usize,
    /// Count recorded after the update.
    pub count: u64,
    /// The count line had to be widened by rewriting the file.
    pub header_rewritten: bool,
    /// Counters of the re-sort.
    pub sort: SortStats,
}

/// Writes pending words into dictionary files.
pub struct DictionaryUpdater {
    codec: LineCodec,
    collation: Box<dyn Collation>,
    sort: SortConfig,
    observer: Arc<dyn UpdateObserver>,
}

impl DictionaryUpdater {
    /// An updater that reports to the log.
    pub fn new(codec: LineCodec, collation: Box<dyn Collation>, sort: SortConfig) -> Self {
        DictionaryUpdater {
            codec,
            collation,
            sort,
            observer: Arc::new(LogObserver),
        }
    }

    /// Builds an updater from configuration. `engine_encoding` is used when
    /// the configuration names no encoding.
    pub fn from_config(
        config: &UpdateConfig,
        engine_encoding: &str,
    ) -> Result<DictionaryUpdater, DictionaryError> {
        let label = config.encoding.as_deref().unwrap_or(engine_encoding);
        let codec = LineCodec::new(label, config.line_separator)?;
        let collation = config.collation.build()?;
        Ok(DictionaryUpdater::new(codec, collation, config.sort.clone()))
    }

    /// Reports updates to `observer` instead of the log.
    pub fn with_observer(mut self, observer: Arc<dyn UpdateObserver>) -> Self {
        self.set_observer(observer);
        self
    }

    /// Like [`with_observer`](Self::with_observer), in place.
    pub fn set_observer(&mut self, observer: Arc<dyn UpdateObserver>) {
        self.observer = observer;
    }

    /// Encoding and line ending of written lines.
    pub fn codec(&self) -> &LineCodec {
        &self.codec
    }

    /// Appends `words` to the dictionary at `path`, fixes its count and
    /// sorts it.
    ///
    /// A malformed count line fails before anything is written. Words are
    /// appended in code point order; their final position is decided by the
    /// sort. On any error the file at `path` is left untouched, so the same
    /// words can be written again by a later call.
    pub fn update(&self, path: &Path, words: &[SmolStr]) -> Result<UpdateSummary, DictionaryError> {
        self.observer.on_event(&UpdateEvent::Started {
            path,
            pending: words.len(),
        });

        match self.run(path, words) {
            Ok(summary) => {
                self.observer.on_event(&UpdateEvent::Finished {
                    path,
                    summary: &summary,
                });
                Ok(summary)
            }
            Err(error) => {
                self.observer.on_event(&UpdateEvent::Failed {
                    path,
                    error: &error,
                });
                Err(error)
            }
        }
    }

    fn run(&self, path: &Path, words: &[SmolStr]) -> Result<UpdateSummary, DictionaryError> {
        let target = resolve(path)?;
        read_header(&target)?;

        let mut words = words.to_vec();
        words.sort();

        let dir = parent_dir(&target);
        let working = NamedTempFile::new_in(dir).map_err(DictionaryError::io(dir))?;
        fs::copy(&target, working.path()).map_err(DictionaryError::io(&target))?;

        let outcome = append_entries(working.path(), &self.codec, &words)?;
        self.observer.on_event(&UpdateEvent::Appended {
            path,
            outcome: &outcome,
        });

        let sorter = ExternalSorter::new(self.sort.clone(), self.codec, &*self.collation);
        let stats = sorter.sort_into(working.path(), &target)?;
        self.observer.on_event(&UpdateEvent::Sorted {
            path,
            stats: &stats,
        });

        Ok(UpdateSummary {
            previous: outcome.previous,
            appended: outcome.appended,
            count: stats.written,
            header_rewritten: outcome.rewritten,
            sort: stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Lexicographic;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn dic(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dic");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn updater() -> DictionaryUpdater {
        DictionaryUpdater::new(
            LineCodec::utf8(LineSeparator::Lf),
            Box::new(Lexicographic),
            SortConfig::default(),
        )
    }

    fn words(w: &[&str]) -> Vec<SmolStr> {
        w.iter().map(|x| SmolStr::new(x)).collect()
    }

    #[test]
    fn apple_mango_zebra() {
        let (_dir, path) = dic(b"2\napple\nzebra\n");
        let summary = updater().update(&path, &words(&["mango"])).unwrap();

        assert_eq!(summary.previous, 2);
        assert_eq!(summary.count, 3);
        assert_eq!(fs::read(&path).unwrap(), b"3\napple\nmango\nzebra\n");
    }

    #[test]
    fn from_empty() {
        let (_dir, path) = dic(b"0\n");
        updater().update(&path, &words(&["word"])).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"1\nword\n");
    }

    #[test]
    fn widening_count() {
        let (_dir, path) = dic(b"9\ni\nh\ng\nf\ne\nd\nc\nb\na\n");
        let summary = updater().update(&path, &words(&["k", "j"])).unwrap();

        assert!(summary.header_rewritten);
        assert_eq!(fs::read(&path).unwrap(), b"11\na\nb\nc\nd\ne\nf\ng\nh\ni\nj\nk\n");
    }

    #[test]
    fn nothing_pending_still_sorts() {
        let (_dir, path) = dic(b"2\nzebra\napple\n");
        let summary = updater().update(&path, &[]).unwrap();

        assert_eq!(summary.appended, 0);
        assert_eq!(fs::read(&path).unwrap(), b"2\napple\nzebra\n");
    }

    #[test]
    fn bad_header_untouched() {
        let original = b"twelve\nzebra\napple\n";
        let (_dir, path) = dic(original);
        let err = updater().update(&path, &words(&["mango"])).unwrap_err();

        assert!(matches!(err, DictionaryError::Format { .. }));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    fn unusable_temp_dir(dir: &Path) -> DictionaryUpdater {
        let mut sort = SortConfig::default();
        sort.temp_dir = Some(dir.join("missing"));
        DictionaryUpdater::new(
            LineCodec::utf8(LineSeparator::Lf),
            Box::new(Lexicographic),
            sort,
        )
    }

    #[test]
    fn failed_sort_leaves_file_alone() {
        let original = b"2\napple\nzebra\n";
        let (dir, path) = dic(original);
        let failing = unusable_temp_dir(dir.path());

        for _ in 0..2 {
            let err = failing.update(&path, &words(&["mango"])).unwrap_err();
            assert!(matches!(err, DictionaryError::Io { .. }));
            assert_eq!(fs::read(&path).unwrap(), original);
            assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        }

        let summary = updater().update(&path, &words(&["mango"])).unwrap();
        assert_eq!(summary.previous, 2);
        assert_eq!(summary.count, 3);
        assert_eq!(fs::read(&path).unwrap(), b"3\napple\nmango\nzebra\n");
    }

    #[test]
    fn failed_widening_leaves_file_alone() {
        let original = b"9\na\nb\nc\nd\ne\nf\ng\nh\ni\n";
        let (dir, path) = dic(original);

        assert!(unusable_temp_dir(dir.path())
            .update(&path, &words(&["j"]))
            .is_err());
        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn known_word_is_kept_twice_without_dedup() {
        let (_dir, path) = dic(b"2\napple\nzebra\n");
        let summary = updater().update(&path, &words(&["apple"])).unwrap();

        assert_eq!(summary.appended, 1);
        assert_eq!(summary.count, 3);
        assert_eq!(fs::read(&path).unwrap(), b"3\napple\napple\nzebra\n");
    }

    #[test]
    fn blank_word_rejected() {
        let (_dir, path) = dic(b"1\napple\n");
        let err = updater().update(&path, &words(&["\t"])).unwrap_err();

        assert!(matches!(err, DictionaryError::InvalidEntry(_)));
        assert_eq!(fs::read(&path).unwrap(), b"1\napple\n");
    }

    #[cfg(unix)]
    #[test]
    fn keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = dic(b"1\nzebra\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        updater().update(&path, &words(&["apple"])).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = updater()
            .update(&dir.path().join("none.dic"), &words(&["a"]))
            .unwrap_err();
        assert!(matches!(err, DictionaryError::Io { .. }));
    }

    #[test]
    fn from_config_uses_engine_encoding() {
        let (_dir, path) = dic(b"1\nzebra\n");
        let mut config = UpdateConfig::default();
        config.line_separator = LineSeparator::Lf;
        let updater = DictionaryUpdater::from_config(&config, "ISO8859-1").unwrap();
        assert_eq!(updater.codec().encoding_name(), "windows-1252");

        updater.update(&path, &words(&["borogodó"])).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"2\nborogod\xF3\nzebra\n");

        config.encoding = Some("no-such-thing".into());
        assert!(DictionaryUpdater::from_config(&config, "UTF-8").is_err());
    }

    #[test]
    fn reports_events() {
        let (_dir, path) = dic(b"1\nb\n");
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        let observer = move |event: &UpdateEvent<'_>| {
            let name = match event {
                UpdateEvent::Started { .. } => "started",
                UpdateEvent::Appended { .. } => "appended",
                UpdateEvent::Sorted { .. } => "sorted",
                UpdateEvent::Finished { .. } => "finished",
                UpdateEvent::Failed { .. } => "failed",
            };
            sink.lock().unwrap().push(name);
        };

        let updater = updater().with_observer(Arc::new(observer));
        updater.update(&path, &words(&["a"])).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["started", "appended", "sorted", "finished"]
        );

        fs::write(&path, b"x\n").unwrap();
        seen.lock().unwrap().clear();
        assert!(updater.update(&path, &words(&["a"])).is_err());
        assert_eq!(*seen.lock().unwrap(), vec!["started", "failed"]);
    }
}
