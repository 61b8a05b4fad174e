//! Capitalisation variants tried when a word is not found as written.
use itertools::Itertools;
use smol_str::SmolStr;

/// `word` in lower case.
#[inline(always)]
pub fn lower_case(s: &str) -> SmolStr {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// `word` in upper case.
#[inline(always)]
pub fn upper_case(s: &str) -> SmolStr {
    s.chars().flat_map(char::to_uppercase).collect()
}

/// `word` with its first letter capitalised.
#[inline(always)]
pub fn upper_first(s: &str) -> SmolStr {
    let mut c = s.chars();
    match c.next() {
        None => SmolStr::default(),
        Some(f) => f.to_uppercase().chain(c).collect(),
    }
}

/// `word` with its first letter in lower case.
#[inline(always)]
pub fn lower_first(s: &str) -> SmolStr {
    let mut c = s.chars();
    match c.next() {
        None => SmolStr::default(),
        Some(f) => f.to_lowercase().chain(c).collect(),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    Neither,
}

impl Case {
    #[inline(always)]
    fn of(ch: char) -> Case {
        if ch.is_lowercase() {
            Case::Lower
        } else if ch.is_uppercase() {
            Case::Upper
        } else {
            Case::Neither
        }
    }
}

/// True for words like `McDonald` or `iPhone`, whose capitals are not only
/// at the start.
pub fn is_mixed_case(word: &str) -> bool {
    let mut chars = word.chars();
    let mut last = match chars.next().map(Case::of) {
        None | Some(Case::Neither) => return false,
        Some(case) => case,
    };

    // A capital after a small letter. `SGPai` is not mixed.
    let mut mixed = false;
    for next in chars.map(Case::of) {
        match (last, next) {
            (_, Case::Neither) => return false,
            (Case::Lower, Case::Upper) => mixed = true,
            _ => {}
        }
        last = next;
    }

    mixed
}

/// True when upper-casing changes nothing.
pub fn is_all_caps(word: &str) -> bool {
    upper_case(word) == word
}

/// True when capitalising the first letter changes nothing.
pub fn is_first_caps(word: &str) -> bool {
    upper_first(word) == word
}

/// Capitalisation of a word as typed, re-applied to suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMutation {
    /// `Casa`
    FirstCaps,
    /// `CASA`
    AllCaps,
    /// Anything else, left as it is.
    None,
}

impl CaseMutation {
    /// The capitalisation of `word`.
    pub fn of(word: &str) -> CaseMutation {
        if !word.chars().any(char::is_alphabetic) {
            CaseMutation::None
        } else if is_all_caps(word) && word.chars().count() > 1 {
            CaseMutation::AllCaps
        } else if is_first_caps(word) && !is_mixed_case(word) {
            CaseMutation::FirstCaps
        } else {
            CaseMutation::None
        }
    }

    /// `word` with this capitalisation.
    pub fn apply(&self, word: &str) -> SmolStr {
        match self {
            CaseMutation::AllCaps => upper_case(word),
            CaseMutation::FirstCaps => upper_first(word),
            CaseMutation::None => SmolStr::new(word),
        }
    }
}

/// Forms of `word` to look up after the word itself has failed.
///
/// A mixed case word is only accepted as written or with its first letter
/// lowered; `McDonald` must not match `mcdonald`.
pub fn lookup_variants(word: &str) -> Vec<SmolStr> {
    let candidates = if is_mixed_case(word) {
        if is_first_caps(word) {
            vec![lower_first(word)]
        } else {
            vec![]
        }
    } else if is_all_caps(word) {
        let lower = lower_case(word);
        vec![upper_first(&lower), lower]
    } else if is_first_caps(word) {
        vec![lower_first(word)]
    } else {
        vec![]
    };

    candidates
        .into_iter()
        .filter(|w| w != word)
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants() {
        assert_eq!(lookup_variants("SAMBA"), vec!["Samba", "samba"]);
        assert_eq!(lookup_variants("Samba"), vec!["samba"]);
        assert!(lookup_variants("samba").is_empty());
        assert_eq!(lookup_variants("McDonald"), vec!["mcDonald"]);
        assert!(lookup_variants("mcDonald").is_empty());
        assert_eq!(lookup_variants("A"), vec!["a"]);
    }

    #[test]
    fn mutations() {
        assert_eq!(CaseMutation::of("IDENTITETE"), CaseMutation::AllCaps);
        assert_eq!(CaseMutation::of("Identitete"), CaseMutation::FirstCaps);
        assert_eq!(CaseMutation::of("identitete"), CaseMutation::None);
        assert_eq!(CaseMutation::of("123"), CaseMutation::None);
        assert_eq!(CaseMutation::AllCaps.apply("água"), "ÁGUA");
        assert_eq!(CaseMutation::FirstCaps.apply("água"), "Água");
    }

    #[test]
    fn mixed_case() {
        assert!(is_mixed_case("McDonald"));
        assert!(!is_mixed_case("Mcdonald"));
        assert!(is_mixed_case("McDoNaLd"));
        assert!(!is_mixed_case("MCDONALD"));
        assert!(is_mixed_case("mcDonald"));
        assert!(!is_mixed_case("mcdonald"));

        assert!(!is_mixed_case("ab"));
        assert!(is_mixed_case("aB"));
        assert!(!is_mixed_case("Ab"));
        assert!(!is_mixed_case("AB"));

        assert!(!is_mixed_case("A"));
        assert!(!is_mixed_case("aS:"));
        assert!(!is_mixed_case(":"));

        assert!(is_mixed_case("DavveVássján"));
        assert!(!is_mixed_case("Davvevássján"));
        assert!(!is_mixed_case("SGPai"));
        assert!(is_mixed_case("SgPaI"));
        assert!(is_mixed_case("sgpAI"));
    }
}
