//! A spell-checking session over one dictionary.
//!
//! A session owns a [`SpellEngine`] and the [`DiffTracker`] of words added
//! through it. Added words live only in the engine until
//! [`Session::update_dictionary`] merges them into the dictionary file.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::constants::MAX_WORD_LEN;
use crate::diff::{DiffTracker, PendingWord};
use crate::dictionary::{DictionaryUpdater, UpdateConfig, UpdateSummary};
use crate::engine::{EngineConfig, SpellEngine};
use crate::observer::UpdateObserver;

/// Errors of session operations.
pub mod error;

pub use self::error::SessionError;

/// Files and settings of a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The `.dic` file read at open and written by updates.
    pub dictionary_path: PathBuf,
    /// The `.aff` file naming the encoding and affix rules.
    pub affix_path: PathBuf,
    /// Key for encrypted dictionaries.
    #[serde(default)]
    pub key: Option<String>,
    /// Longest word in bytes of the dictionary encoding.
    #[serde(default = "SessionConfig::default_max_word_len")]
    pub max_word_len: usize,
    /// How the dictionary file is written back.
    #[serde(default)]
    pub update: UpdateConfig,
    /// Tuning of lookups.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SessionConfig {
    /// Default settings for a dictionary and affix file pair.
    pub fn new(dictionary_path: impl Into<PathBuf>, affix_path: impl Into<PathBuf>) -> Self {
        SessionConfig {
            dictionary_path: dictionary_path.into(),
            affix_path: affix_path.into(),
            key: None,
            max_word_len: MAX_WORD_LEN,
            update: UpdateConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    const fn default_max_word_len() -> usize {
        MAX_WORD_LEN
    }

    /// Reads a configuration from a JSON file. Relative dictionary and affix
    /// paths are taken relative to the file's directory.
    pub fn from_json_path(path: &Path) -> Result<SessionConfig, SessionError> {
        let config_error = |source: Box<dyn std::error::Error + Send + Sync>| SessionError::Config {
            path: path.to_path_buf(),
            source,
        };

        let bytes = std::fs::read(path).map_err(|e| config_error(e.into()))?;
        let mut config: SessionConfig =
            serde_json::from_slice(&bytes).map_err(|e| config_error(e.into()))?;

        if let Some(base) = path.parent() {
            config.dictionary_path = base.join(&config.dictionary_path);
            config.affix_path = base.join(&config.affix_path);
        }

        Ok(config)
    }
}

/// An open spell engine and the words added through it.
pub struct Session<E: SpellEngine> {
    engine: Option<E>,
    diff: DiffTracker,
    updater: DictionaryUpdater,
    config: SessionConfig,
}

impl<E: SpellEngine> Session<E> {
    /// Loads the engine and prepares the updater. An unknown encoding or
    /// collation locale fails here rather than at update time.
    pub fn open(config: SessionConfig) -> Result<Session<E>, SessionError> {
        let engine = E::create(
            &config.affix_path,
            &config.dictionary_path,
            config.key.as_deref(),
            &config.engine,
        )?;
        let updater = DictionaryUpdater::from_config(&config.update, &engine.dictionary_encoding())?;

        log::debug!(
            "Opened session on {} ({})",
            config.dictionary_path.display(),
            updater.codec().encoding_name()
        );

        Ok(Session {
            engine: Some(engine),
            diff: DiffTracker::new(),
            updater,
            config,
        })
    }

    /// Reports dictionary updates to `observer` instead of the log.
    pub fn set_observer(&mut self, observer: Arc<dyn UpdateObserver>) {
        self.updater.set_observer(observer);
    }

    /// The configuration the session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether [`close`](Self::close) has not been called yet.
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Words added since the last successful update.
    pub fn diff(&self) -> &DiffTracker {
        &self.diff
    }

    fn engine(&self, operation: &'static str) -> Result<&E, SessionError> {
        self.engine
            .as_ref()
            .ok_or(SessionError::InvalidState { operation })
    }

    fn engine_mut(&mut self, operation: &'static str) -> Result<&mut E, SessionError> {
        self.engine
            .as_mut()
            .ok_or(SessionError::InvalidState { operation })
    }

    /// Checks `word` against the length limit, measured in the dictionary
    /// encoding. A word that cannot be encoded is measured in UTF-8 unless
    /// `stored` is set, in which case it is an error.
    fn check_word(&self, name: &'static str, word: &str, stored: bool) -> Result<(), SessionError> {
        let len = match self.updater.codec().encode(word) {
            Ok(bytes) => bytes.len(),
            Err(e) if stored => return Err(e.into()),
            Err(_) => word.len(),
        };

        if len > self.config.max_word_len {
            return Err(SessionError::InvalidArgument {
                name,
                len,
                max: self.config.max_word_len,
            });
        }
        Ok(())
    }

    /// Whether `word` is spelled correctly.
    pub fn spell(&self, word: &str) -> Result<bool, SessionError> {
        let engine = self.engine("spell")?;
        self.check_word("word", word, false)?;
        Ok(engine.spell(word))
    }

    /// Same as [`spell`](Self::spell).
    #[inline]
    pub fn is_correct(&self, word: &str) -> Result<bool, SessionError> {
        self.spell(word)
    }

    /// Corrections for `word`, best first.
    pub fn suggest(&self, word: &str) -> Result<Vec<String>, SessionError> {
        let engine = self.engine("suggest")?;
        self.check_word("word", word, false)?;
        Ok(engine.suggest(word))
    }

    /// Morphological analyses of `word`.
    pub fn analyze(&self, word: &str) -> Result<Vec<String>, SessionError> {
        let engine = self.engine("analyze")?;
        self.check_word("word", word, false)?;
        Ok(engine.analyze(word))
    }

    /// Stems of `word`.
    pub fn stem(&self, word: &str) -> Result<Vec<String>, SessionError> {
        let engine = self.engine("stem")?;
        self.check_word("word", word, false)?;
        Ok(engine.stem(word))
    }

    /// Stems named by the `st:` fields of `analysis`.
    pub fn stem_analysis(&self, analysis: &[String]) -> Result<Vec<String>, SessionError> {
        Ok(self.engine("stem")?.stem_analysis(analysis))
    }

    /// Forms of `word` inflected like `basis`.
    pub fn generate(&self, word: &str, basis: &str) -> Result<Vec<String>, SessionError> {
        let engine = self.engine("generate")?;
        self.check_word("word", word, false)?;
        self.check_word("basis", basis, false)?;
        Ok(engine.generate(word, basis))
    }

    /// Forms of `word` inflected as described by `analysis`.
    pub fn generate_analysis(
        &self,
        word: &str,
        analysis: &[String],
    ) -> Result<Vec<String>, SessionError> {
        let engine = self.engine("generate")?;
        self.check_word("word", word, false)?;
        Ok(engine.generate_analysis(word, analysis))
    }

    /// Adds `word` to the engine and records it for the next update.
    pub fn add(&mut self, word: &str) -> Result<(), SessionError> {
        self.engine("add")?;
        self.check_word("word", word, true)?;
        self.engine_mut("add")?
            .add(word)
            .map_err(|source| SessionError::Engine {
                operation: "add",
                source,
            })?;
        self.diff.record(word);
        Ok(())
    }

    /// Adds `word` with the affix flags of `example` and records it, with
    /// the flags the engine gave it, for the next update.
    pub fn add_with_affix(&mut self, word: &str, example: &str) -> Result<(), SessionError> {
        self.engine("add")?;
        self.check_word("word", word, true)?;
        self.check_word("example", example, false)?;
        self.engine_mut("add")?
            .add_with_affix(word, example)
            .map_err(|source| SessionError::Engine {
                operation: "add with affix",
                source,
            })?;
        let flags = self.engine("add")?.flags(word).unwrap_or_default();
        self.diff.record_with_flags(word, &flags);
        Ok(())
    }

    /// Removes `word` from the engine. A pending addition of the same word
    /// is dropped; words already in the dictionary file stay there.
    pub fn remove(&mut self, word: &str) -> Result<(), SessionError> {
        self.engine("remove")?;
        self.check_word("word", word, false)?;
        self.engine_mut("remove")?
            .remove(word)
            .map_err(|source| SessionError::Engine {
                operation: "remove",
                source,
            })?;
        self.diff.forget(word);
        Ok(())
    }

    /// Encoding label of the dictionary, as named in the affix file.
    pub fn dictionary_encoding(&self) -> Result<String, SessionError> {
        Ok(self.engine("read the encoding")?.dictionary_encoding())
    }

    /// Merges the words added in this session into the dictionary file.
    ///
    /// On success the written words leave the diff, so calling this again
    /// without new additions leaves the entries unchanged. On failure the
    /// diff is kept for a later attempt.
    pub fn update_dictionary(&mut self) -> Result<UpdateSummary, SessionError> {
        self.engine("update the dictionary")?;

        let pending = self.diff.snapshot();
        let entries: Vec<SmolStr> = pending.iter().map(PendingWord::entry).collect();
        let summary = self
            .updater
            .update(&self.config.dictionary_path, &entries)?;
        self.diff.reconcile(&pending);

        Ok(summary)
    }

    /// Releases the engine. Later calls do nothing.
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            if !self.diff.is_empty() {
                log::debug!(
                    "Closing session on {} with {} words not written",
                    self.config.dictionary_path.display(),
                    self.diff.len()
                );
            }
            log::trace!("Closed session on {}", self.config.dictionary_path.display());
        }
    }
}

impl<E: SpellEngine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            log::warn!(
                "Session on {} dropped without being closed",
                self.config.dictionary_path.display()
            );
            self.close();
        }
    }
}
