//! Orderings used to sort dictionary lines.
use std::cmp::Ordering;
use std::fmt;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::Locale;
use language_tags::LanguageTag;
use serde::{Deserialize, Serialize};

use crate::dictionary::error::DictionaryError;

/// A total order over dictionary lines.
///
/// The same instance must drive both the batch sort and the merge, so that
/// the two phases agree.
pub trait Collation {
    /// Orders two lines.
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Plain code point order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicographic;

impl Collation for Lexicographic {
    #[inline(always)]
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// Locale tailored Unicode collation.
pub struct LocaleCollation {
    locale: Locale,
    collator: Collator,
}

impl LocaleCollation {
    /// Builds a collator for a BCP 47 tag. POSIX style `pt_BR` is accepted.
    pub fn new(tag: &str) -> Result<LocaleCollation, DictionaryError> {
        let unsupported = |reason: String| DictionaryError::UnsupportedLocale {
            locale: tag.to_string(),
            reason,
        };

        let normalized = tag.trim().replace('_', "-");
        let tag = LanguageTag::parse(&normalized).map_err(|e| unsupported(e.to_string()))?;
        let locale: Locale = tag
            .as_str()
            .parse()
            .map_err(|e: icu_locid::ParserError| unsupported(e.to_string()))?;
        let collator = Collator::try_new(&(&locale).into(), CollatorOptions::new())
            .map_err(|e| unsupported(e.to_string()))?;

        Ok(LocaleCollation { locale, collator })
    }

    /// The resolved locale.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Collation for LocaleCollation {
    #[inline(always)]
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }
}

impl fmt::Debug for LocaleCollation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleCollation")
            .field("locale", &self.locale.to_string())
            .finish()
    }
}

/// Configured collation, resolved with [`CollationOrder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollationOrder {
    /// Code point order.
    Lexicographic,
    /// Collation of a BCP 47 or POSIX locale tag.
    Locale(String),
}

impl CollationOrder {
    /// Resolves the configured order. Unknown locales fail here.
    pub fn build(&self) -> Result<Box<dyn Collation>, DictionaryError> {
        match self {
            CollationOrder::Lexicographic => Ok(Box::new(Lexicographic)),
            CollationOrder::Locale(tag) => Ok(Box::new(LocaleCollation::new(tag)?)),
        }
    }
}

impl Default for CollationOrder {
    fn default() -> Self {
        CollationOrder::Lexicographic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(collation: &dyn Collation, words: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = words.iter().map(|x| x.to_string()).collect();
        out.sort_by(|a, b| collation.compare(a, b));
        out
    }

    #[test]
    fn lexicographic() {
        assert_eq!(
            sorted(&Lexicographic, &["zebra", "apple", "Mango"]),
            vec!["Mango", "apple", "zebra"]
        );
    }

    #[test]
    fn locale_orders_accents_and_case() {
        let collation = LocaleCollation::new("pt_BR").unwrap();
        assert_eq!(collation.locale().to_string(), "pt-BR");
        assert_eq!(
            sorted(&collation, &["bola", "água", "Zebra", "abacaxi"]),
            vec!["abacaxi", "água", "bola", "Zebra"]
        );
    }

    #[test]
    fn invalid_locale() {
        assert!(matches!(
            LocaleCollation::new("not a locale!"),
            Err(DictionaryError::UnsupportedLocale { .. })
        ));
    }

    #[test]
    fn config() {
        let order: CollationOrder = serde_json::from_str(r#"{"locale":"sv-SE"}"#).unwrap();
        assert_eq!(order, CollationOrder::Locale("sv-SE".into()));
        assert!(order.build().is_ok());

        let order: CollationOrder = serde_json::from_str(r#""lexicographic""#).unwrap();
        assert_eq!(order, CollationOrder::Lexicographic);
    }
}
