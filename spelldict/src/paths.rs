//! Locating installed Hunspell dictionaries.
use std::path::{Path, PathBuf};

use language_tags::LanguageTag;

/// File stems to look for, most specific first: `pt_BR`, then `pt`.
fn candidate_names(tag: &LanguageTag) -> Vec<String> {
    let language = tag.primary_language();
    match tag.region() {
        Some(region) => vec![
            format!("{}_{}", language, region.to_uppercase()),
            language.to_string(),
        ],
        None => vec![language.to_string()],
    }
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Some(dicpath) = std::env::var_os("DICPATH") {
        dirs.extend(std::env::split_paths(&dicpath));
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(services) = pathos::macos::user::services_dir() {
            if let Some(library) = services.parent() {
                dirs.push(library.join("Spelling"));
            }
        }
        dirs.push(PathBuf::from("/Library/Spelling"));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        match std::env::var_os("XDG_DATA_HOME") {
            Some(data) => dirs.push(PathBuf::from(data).join("hunspell")),
            None => {
                if let Some(home) = std::env::var_os("HOME") {
                    dirs.push(PathBuf::from(home).join(".local/share/hunspell"));
                }
            }
        }
        dirs.push(PathBuf::from("/usr/local/share/hunspell"));
        dirs.push(PathBuf::from("/usr/share/hunspell"));
        dirs.push(PathBuf::from("/usr/share/myspell/dicts"));
        dirs.push(PathBuf::from("/usr/share/myspell"));
    }

    dirs
}

/// The `.dic` and `.aff` pair named `name` inside `dir`, if both exist.
fn find_in(dir: &Path, name: &str) -> Option<(PathBuf, PathBuf)> {
    let pattern = format!("{}.dic", name);
    let walker = globwalk::GlobWalkerBuilder::new(dir, &pattern)
        .max_depth(2)
        .case_insensitive(true)
        .build()
        .ok()?;

    walker.filter_map(Result::ok).find_map(|entry| {
        let dic = entry.path().to_path_buf();
        let aff = dic.with_extension("aff");
        if aff.is_file() {
            Some((dic, aff))
        } else {
            None
        }
    })
}

/// Finds the dictionary and affix file for `tag`, searching `DICPATH` and
/// the platform's usual Hunspell directories.
pub fn find_dictionary(tag: &LanguageTag) -> Option<(PathBuf, PathBuf)> {
    find_dictionary_in(tag, &search_dirs())
}

/// Like [`find_dictionary`], over the given directories in order.
pub fn find_dictionary_in(tag: &LanguageTag, dirs: &[PathBuf]) -> Option<(PathBuf, PathBuf)> {
    let names = candidate_names(tag);
    for name in &names {
        for dir in dirs.iter().filter(|d| d.is_dir()) {
            if let Some(found) = find_in(dir, name) {
                log::trace!("Found dictionary {} for {}", found.0.display(), tag);
                return Some(found);
            }
        }
    }
    None
}
