use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use hashbrown::HashMap;
use itertools::Itertools;
use smol_str::SmolStr;
use unic_ucd_category::GeneralCategory;

use super::case_handling::{lookup_variants, lower_case, CaseMutation};
use super::{EngineConfig, EngineStatus, SpellEngine};
use crate::constants::UTF8_BOM;
use crate::dictionary::encoding::{LineCodec, LineSeparator};
use crate::dictionary::error::DictionaryError;
use crate::dictionary::header::read_header;
use crate::sort::LineReader;

/// Hunspell's encoding when an affix file has no `SET` line.
const DEFAULT_ENCODING: &str = "ISO8859-1";

/// Plain word-list engine over a Hunspell `.dic`/`.aff` pair.
///
/// Affix rules are not applied: a word is known only as it is listed. Flags
/// are kept so `add_with_affix` can copy them.
#[derive(Debug)]
pub struct WordListEngine {
    words: HashMap<SmolStr, SmolStr>,
    encoding: String,
    config: EngineConfig,
}

impl WordListEngine {
    fn lookup(&self, word: &str) -> Option<&SmolStr> {
        if let Some((known, _)) = self.words.get_key_value(word) {
            return Some(known);
        }

        lookup_variants(word)
            .iter()
            .find_map(|v| self.words.get_key_value(v.as_str()).map(|(known, _)| known))
    }

    /// Number of known words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether no word is known.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn read_encoding(path: &Path) -> Result<String, DictionaryError> {
    let bytes = std::fs::read(path).map_err(DictionaryError::io(path))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let encoding = bytes
        .split(|b| *b == b'\n')
        .map(String::from_utf8_lossy)
        .find_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("SET"), Some(label)) => Some(label.to_string()),
                _ => None,
            }
        });

    Ok(encoding.unwrap_or_else(|| DEFAULT_ENCODING.to_string()))
}

/// Splits a `.dic` line into word and flags. A `/` preceded by a backslash
/// belongs to the word; morphological fields after a tab are dropped.
fn parse_entry(line: &str) -> (SmolStr, SmolStr) {
    let line = line.split('\t').next().unwrap_or(line);

    let mut word = String::with_capacity(line.len());
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '/'))) => {
                word.push('/');
                chars.next();
            }
            '/' => {
                let flags = line[i + 1..].split_whitespace().next().unwrap_or("");
                return (SmolStr::new(word.trim_end()), SmolStr::new(flags));
            }
            c => word.push(c),
        }
    }

    (SmolStr::new(word.trim_end()), SmolStr::default())
}

fn check_word(word: &str) -> Result<(), EngineStatus> {
    if word.trim().is_empty() || word.contains(|c: char| c == '\n' || c == '\r') {
        return Err(EngineStatus(1));
    }
    Ok(())
}

impl SpellEngine for WordListEngine {
    fn create(
        affix_path: &Path,
        dictionary_path: &Path,
        key: Option<&str>,
        config: &EngineConfig,
    ) -> Result<Self, DictionaryError> {
        if key.is_some() {
            log::debug!("Reading plain dictionary files; the key is not used");
        }

        let encoding = read_encoding(affix_path)?;
        let codec = LineCodec::new(&encoding, LineSeparator::native())?;

        let header = read_header(dictionary_path)?;
        let mut file = File::open(dictionary_path).map_err(DictionaryError::io(dictionary_path))?;
        file.seek(SeekFrom::Start(header.body_start()))
            .map_err(DictionaryError::io(dictionary_path))?;

        let mut words = HashMap::with_capacity(header.count.min(1 << 20) as usize);
        let mut reader = LineReader::new(file, dictionary_path, codec, 1);
        while let Some(line) = reader.next_line()? {
            let (word, flags) = parse_entry(&line);
            if word.is_empty() {
                continue;
            }
            words.insert(word, flags);
        }

        log::trace!(
            "Loaded {} words from {} ({})",
            words.len(),
            dictionary_path.display(),
            encoding
        );

        Ok(WordListEngine {
            words,
            encoding,
            config: config.clone(),
        })
    }

    fn spell(&self, word: &str) -> bool {
        if word.is_empty() {
            return true;
        }

        // Numbers and punctuation are not checked
        if word.chars().all(|c| !GeneralCategory::of(c).is_letter()) {
            return true;
        }

        self.lookup(word).is_some()
    }

    fn suggest(&self, word: &str) -> Vec<String> {
        if word.is_empty() {
            return vec![];
        }

        let mutation = CaseMutation::of(word);
        let needle = lower_case(word);

        self.words
            .keys()
            .filter_map(|known| {
                let distance = strsim::damerau_levenshtein(&needle, &lower_case(known));
                if distance <= self.config.max_distance {
                    Some((distance, known))
                } else {
                    None
                }
            })
            .sorted()
            .map(|(_, known)| mutation.apply(known))
            .filter(|s| s != word)
            .unique()
            .take(self.config.n_best)
            .map(String::from)
            .collect()
    }

    fn analyze(&self, word: &str) -> Vec<String> {
        match self.lookup(word) {
            Some(stem) => vec![format!(" st:{}", stem)],
            None => vec![],
        }
    }

    fn stem(&self, word: &str) -> Vec<String> {
        self.stem_analysis(&self.analyze(word))
    }

    fn stem_analysis(&self, analysis: &[String]) -> Vec<String> {
        analysis
            .iter()
            .flat_map(|record| record.split_whitespace())
            .filter_map(|field| field.strip_prefix("st:"))
            .unique()
            .map(String::from)
            .collect()
    }

    fn generate(&self, word: &str, basis: &str) -> Vec<String> {
        if self.lookup(basis).is_some() {
            vec![word.to_string()]
        } else {
            vec![]
        }
    }

    fn generate_analysis(&self, word: &str, analysis: &[String]) -> Vec<String> {
        let known = self
            .stem_analysis(analysis)
            .iter()
            .any(|stem| self.lookup(stem).is_some());

        if known {
            vec![word.to_string()]
        } else {
            vec![]
        }
    }

    fn add(&mut self, word: &str) -> Result<(), EngineStatus> {
        check_word(word)?;
        self.words.entry(SmolStr::new(word)).or_default();
        Ok(())
    }

    fn add_with_affix(&mut self, word: &str, example: &str) -> Result<(), EngineStatus> {
        check_word(word)?;
        let flags = self.words.get(example).cloned().unwrap_or_default();
        self.words.insert(SmolStr::new(word), flags);
        Ok(())
    }

    fn remove(&mut self, word: &str) -> Result<(), EngineStatus> {
        check_word(word)?;
        self.words.remove(word);
        Ok(())
    }

    fn flags(&self, word: &str) -> Option<String> {
        self.words
            .get(word)
            .filter(|flags| !flags.is_empty())
            .map(|flags| flags.to_string())
    }

    fn dictionary_encoding(&self) -> String {
        self.encoding.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn pair(aff: &[u8], dic: &[u8]) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let aff_path = dir.path().join("pt_BR.aff");
        let dic_path = dir.path().join("pt_BR.dic");
        fs::write(&aff_path, aff).unwrap();
        fs::write(&dic_path, dic).unwrap();
        (dir, aff_path, dic_path)
    }

    fn engine(dic: &[u8]) -> (tempfile::TempDir, WordListEngine) {
        let (dir, aff, dic) = pair(b"SET UTF-8\nTRY esianrtolcdugmphbyfvkwzESIANRTOLCDUGMPHBYFVKWZ\n", dic);
        let engine = WordListEngine::create(&aff, &dic, None, &EngineConfig::default()).unwrap();
        (dir, engine)
    }

    #[test]
    fn entries() {
        assert_eq!(parse_entry("casa/ABC"), ("casa".into(), "ABC".into()));
        assert_eq!(parse_entry("casa"), ("casa".into(), "".into()));
        assert_eq!(parse_entry("1\\/2/N"), ("1/2".into(), "N".into()));
        assert_eq!(parse_entry("casa/AB\tst:casa"), ("casa".into(), "AB".into()));
        assert_eq!(parse_entry("casa\tpo:noun"), ("casa".into(), "".into()));
    }

    #[test]
    fn encoding_from_affix() {
        let (_dir, aff, dic) = pair(b"# comment\nSET ISO8859-1\n", b"1\nborogod\xF3\n");
        let engine = WordListEngine::create(&aff, &dic, None, &EngineConfig::default()).unwrap();
        assert_eq!(engine.dictionary_encoding(), "ISO8859-1");
        assert!(engine.spell("borogodó"));

        let (_dir, aff, dic) = pair(b"TRY abc\n", b"1\ncasa\n");
        let engine = WordListEngine::create(&aff, &dic, Some("secret"), &EngineConfig::default())
            .unwrap();
        assert_eq!(engine.dictionary_encoding(), DEFAULT_ENCODING);
    }

    #[test]
    fn missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = WordListEngine::create(
            &dir.path().join("x.aff"),
            &dir.path().join("x.dic"),
            None,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DictionaryError::Io { .. }));
    }

    #[test]
    fn spelling() {
        let (_dir, engine) = engine("4\ncasa/AB\nBrasil\nágua\nMcDonald\n".as_bytes());

        assert!(engine.spell("casa"));
        assert!(engine.spell("Casa"));
        assert!(engine.spell("CASA"));
        assert!(engine.spell("Brasil"));
        assert!(engine.spell("BRASIL"));
        assert!(!engine.spell("brasil"));
        assert!(engine.spell("Água"));
        assert!(engine.spell("McDonald"));
        assert!(!engine.spell("mcdonald"));
        assert!(!engine.spell("caza"));
        assert!(engine.spell("1984"));
        assert!(engine.spell(""));
    }

    #[test]
    fn suggestions() {
        let (_dir, engine) = engine(b"5\ncasa\ncasas\ncaso\nbrasa\nzebra\n");

        assert_eq!(engine.suggest("cassa"), vec!["casa", "casas", "caso"]);
        assert_eq!(engine.suggest("Cassa")[0], "Casa");
        assert_eq!(engine.suggest("CASSA")[0], "CASA");
        assert!(engine.suggest("xyzzyqq").is_empty());
        assert!(!engine.suggest("casa").contains(&"casa".to_string()));
    }

    #[test]
    fn n_best() {
        let (_dir, aff, dic) = pair(b"SET UTF-8\n", b"4\naa\nab\nac\nad\n");
        let config = EngineConfig {
            n_best: 2,
            max_distance: 1,
        };
        let engine = WordListEngine::create(&aff, &dic, None, &config).unwrap();
        assert_eq!(engine.suggest("ax"), vec!["aa", "ab"]);
    }

    #[test]
    fn morphology() {
        let (_dir, engine) = engine(b"1\ncasa\n");

        assert_eq!(engine.analyze("Casa"), vec![" st:casa"]);
        assert_eq!(engine.stem("CASA"), vec!["casa"]);
        assert!(engine.analyze("caza").is_empty());
        assert_eq!(
            engine.stem_analysis(&[" st:casa po:noun".into(), " st:casa".into()]),
            vec!["casa"]
        );

        assert_eq!(engine.generate("casinha", "casa"), vec!["casinha"]);
        assert!(engine.generate("casinha", "caza").is_empty());
        assert_eq!(
            engine.generate_analysis("casinha", &[" st:casa".into()]),
            vec!["casinha"]
        );
    }

    #[test]
    fn additions() {
        let (_dir, mut engine) = engine(b"1\ncasa/AB\n");

        engine.add("borogodó").unwrap();
        assert!(engine.spell("borogodó"));

        engine.add_with_affix("lar", "casa").unwrap();
        assert_eq!(engine.flags("lar").as_deref(), Some("AB"));
        assert_eq!(engine.flags("borogodó"), None);
        assert_eq!(engine.flags("nada"), None);

        engine.remove("casa").unwrap();
        assert!(!engine.spell("casa"));

        assert_eq!(engine.add(""), Err(EngineStatus(1)));
        assert_eq!(engine.add("\t"), Err(EngineStatus(1)));
        assert_eq!(engine.add_with_affix(" ", "lar"), Err(EngineStatus(1)));
        assert_eq!(engine.add("two\nlines"), Err(EngineStatus(1)));
        assert_eq!(engine.add_with_affix("a\rb", "lar"), Err(EngineStatus(1)));
        assert_eq!(engine.len(), 2);
    }
}
