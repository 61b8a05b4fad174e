//! Words added to a session that are not yet in the dictionary file.
use hashbrown::HashMap;
use smol_str::SmolStr;

/// A word waiting to be written, with the affix flags it was added with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingWord {
    /// The word as added.
    pub word: SmolStr,
    /// Affix flags, empty for a bare word.
    pub flags: SmolStr,
}

impl PendingWord {
    /// The dictionary line for this word: `word/FLAGS`, or the bare word
    /// when it has no flags. A `/` inside the word is escaped.
    pub fn entry(&self) -> SmolStr {
        let word = if self.word.contains('/') {
            self.word.replace('/', "\\/")
        } else {
            self.word.to_string()
        };

        if self.flags.is_empty() {
            SmolStr::new(word)
        } else {
            SmolStr::new(format!("{}/{}", word, self.flags))
        }
    }
}

/// Set of pending additions.
///
/// Owned by exactly one session; mutation goes through `&mut self`, so the
/// single-writer assumption of the update path holds per session. Iteration
/// order is unspecified and callers must not rely on insertion order.
#[derive(Debug, Default, Clone)]
pub struct DiffTracker {
    words: HashMap<SmolStr, SmolStr>,
}

impl DiffTracker {
    /// An empty tracker.
    pub fn new() -> DiffTracker {
        DiffTracker::default()
    }

    /// Records a word. Returns `false` if it was already pending, in which
    /// case any flags it was recorded with are kept.
    pub fn record(&mut self, word: &str) -> bool {
        if self.words.contains_key(word) {
            return false;
        }
        self.words.insert(SmolStr::new(word), SmolStr::default());
        true
    }

    /// Records a word with affix flags, replacing the flags of a pending
    /// addition of the same word. Returns `false` if it was already pending.
    pub fn record_with_flags(&mut self, word: &str, flags: &str) -> bool {
        self.words
            .insert(SmolStr::new(word), SmolStr::new(flags))
            .is_none()
    }

    /// The pending words, left in place.
    pub fn snapshot(&self) -> Vec<PendingWord> {
        self.words
            .iter()
            .map(|(word, flags)| PendingWord {
                word: word.clone(),
                flags: flags.clone(),
            })
            .collect()
    }

    /// Drops words that have been written to the dictionary file. A word
    /// whose flags changed after `written` was taken stays pending.
    pub fn reconcile<'a, I>(&mut self, written: I)
    where
        I: IntoIterator<Item = &'a PendingWord>,
    {
        for pending in written {
            if self.words.get(&pending.word) == Some(&pending.flags) {
                self.words.remove(&pending.word);
            }
        }
    }

    /// Drops a pending word. Returns `false` if it was not pending.
    pub fn forget(&mut self, word: &str) -> bool {
        self.words.remove(word).is_some()
    }

    /// Whether `word` is pending.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    /// Affix flags `word` is pending with.
    pub fn flags(&self, word: &str) -> Option<&str> {
        self.words.get(word).map(SmolStr::as_str)
    }

    /// Number of pending words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The pending words, without their flags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(|w| w.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(word: &str, flags: &str) -> PendingWord {
        PendingWord {
            word: word.into(),
            flags: flags.into(),
        }
    }

    #[test]
    fn record_is_idempotent() {
        let mut diff = DiffTracker::new();
        assert!(diff.record("borogodó"));
        assert!(!diff.record("borogodó"));
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn snapshot_does_not_clear() {
        let mut diff = DiffTracker::new();
        diff.record("apple");
        diff.record("mango");

        let mut snap = diff.snapshot();
        snap.sort_by(|a, b| a.word.cmp(&b.word));
        assert_eq!(snap, vec![pending("apple", ""), pending("mango", "")]);
        assert_eq!(diff.len(), 2);
        assert!(diff.contains("mango"));
    }

    #[test]
    fn reconcile_keeps_late_additions() {
        let mut diff = DiffTracker::new();
        diff.record("apple");
        diff.record("lar");
        let snap = diff.snapshot();
        diff.record("zebra");
        diff.record_with_flags("lar", "AB");

        diff.reconcile(&snap);
        let mut left = diff.iter().collect::<Vec<_>>();
        left.sort();
        assert_eq!(left, vec!["lar", "zebra"]);
    }

    #[test]
    fn flags_survive_plain_record() {
        let mut diff = DiffTracker::new();
        assert!(diff.record_with_flags("lar", "AB"));
        assert!(!diff.record("lar"));
        assert_eq!(diff.flags("lar"), Some("AB"));

        assert!(diff.forget("lar"));
        assert!(!diff.forget("lar"));
        assert!(diff.is_empty());
    }

    #[test]
    fn entry_lines() {
        assert_eq!(pending("casa", "").entry().as_str(), "casa");
        assert_eq!(pending("lar", "AB").entry().as_str(), "lar/AB");
        assert_eq!(pending("1/2", "N").entry().as_str(), "1\\/2/N");
        assert_eq!(pending("km/h", "").entry().as_str(), "km\\/h");
    }
}
