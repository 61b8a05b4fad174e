//! The spell-checking capability a session drives.
//!
//! A [`SpellEngine`] answers lookups and takes runtime additions. It never
//! writes the dictionary file; that is the job of
//! [`DictionaryUpdater`](crate::dictionary::DictionaryUpdater).
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dictionary::error::DictionaryError;

pub mod case_handling;
mod wordlist;

pub use self::wordlist::WordListEngine;

/// Non-zero status returned by an engine for a rejected mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("engine returned status {0}")]
pub struct EngineStatus(pub i32);

/// Tuning of lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Most suggestions returned for one word.
    pub n_best: usize,
    /// Largest edit distance of a suggestion.
    pub max_distance: usize,
}

impl EngineConfig {
    /// Ten suggestions at most two edits away.
    pub const fn default() -> EngineConfig {
        EngineConfig {
            n_best: 10,
            max_distance: 2,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::default()
    }
}

/// A spell checker over one affix and dictionary pair.
pub trait SpellEngine: Sized {
    /// Loads the affix and dictionary files. `key` unlocks encrypted
    /// dictionaries where the engine supports them.
    fn create(
        affix_path: &Path,
        dictionary_path: &Path,
        key: Option<&str>,
        config: &EngineConfig,
    ) -> Result<Self, DictionaryError>;

    /// Whether `word` is spelled correctly.
    fn spell(&self, word: &str) -> bool;
    /// Corrections for `word`, best first.
    fn suggest(&self, word: &str) -> Vec<String>;
    /// Morphological analyses of `word`.
    fn analyze(&self, word: &str) -> Vec<String>;
    /// Stems of `word`.
    fn stem(&self, word: &str) -> Vec<String>;
    /// Stems named by the `st:` fields of `analysis`.
    fn stem_analysis(&self, analysis: &[String]) -> Vec<String>;
    /// Forms of `word` inflected like `basis`.
    fn generate(&self, word: &str, basis: &str) -> Vec<String>;
    /// Forms of `word` inflected as described by `analysis`.
    fn generate_analysis(&self, word: &str, analysis: &[String]) -> Vec<String>;

    /// Adds `word` for the rest of the session.
    fn add(&mut self, word: &str) -> Result<(), EngineStatus>;
    /// Adds `word`, inflecting like `example`.
    fn add_with_affix(&mut self, word: &str, example: &str) -> Result<(), EngineStatus>;
    /// Forgets `word` for the rest of the session.
    fn remove(&mut self, word: &str) -> Result<(), EngineStatus>;

    /// Affix flags the engine holds for `word`, for engines that keep them.
    fn flags(&self, _word: &str) -> Option<String> {
        None
    }

    /// Encoding label of the dictionary, as named in the affix file.
    fn dictionary_encoding(&self) -> String;
}
