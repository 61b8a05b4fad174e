use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use gumdrop::Options;
use language_tags::LanguageTag;
use serde::Serialize;

use spelldict::dictionary::encoding::{LineCodec, LineSeparator};
use spelldict::dictionary::header::read_header;
use spelldict::engine::WordListEngine;
use spelldict::paths::find_dictionary;
use spelldict::session::{Session, SessionConfig};
use spelldict::sort::{CollationOrder, ExternalSorter, SortConfig};

trait OutputWriter {
    fn write_correction(&mut self, word: &str, is_correct: bool);
    fn write_suggestions(&mut self, word: &str, suggestions: &[String]);
    fn finish(&mut self) -> anyhow::Result<()>;
}

struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write_correction(&mut self, word: &str, is_correct: bool) {
        println!(
            "Input: {}\t\t[{}]",
            &word,
            if is_correct { "CORRECT" } else { "INCORRECT" }
        );
    }

    fn write_suggestions(&mut self, _word: &str, suggestions: &[String]) {
        for sugg in suggestions {
            println!("{}", sugg);
        }
        println!();
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct SuggestionRequest {
    word: String,
    is_correct: bool,
    suggestions: Vec<String>,
}

#[derive(Serialize)]
struct JsonWriter {
    results: Vec<SuggestionRequest>,
}

impl JsonWriter {
    pub fn new() -> JsonWriter {
        JsonWriter { results: vec![] }
    }
}

impl OutputWriter for JsonWriter {
    fn write_correction(&mut self, word: &str, is_correct: bool) {
        self.results.push(SuggestionRequest {
            word: word.to_owned(),
            is_correct,
            suggestions: vec![],
        });
    }

    fn write_suggestions(&mut self, _word: &str, suggestions: &[String]) {
        if let Some(last) = self.results.last_mut() {
            last.suggestions = suggestions.to_vec();
        }
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

fn writer(use_json: bool) -> Box<dyn OutputWriter> {
    if use_json {
        Box::new(JsonWriter::new())
    } else {
        Box::new(StdoutWriter)
    }
}

fn print_json_or<T: Serialize>(use_json: bool, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    if use_json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print help message")]
    help: bool,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "check whether words are correct")]
    Check(CheckArgs),

    #[options(help = "get suggestions for provided input")]
    Suggest(CheckArgs),

    #[options(help = "add words and write them to the dictionary")]
    Add(AddArgs),

    #[options(help = "sort a dictionary file and fix its count")]
    Sort(SortArgs),

    #[options(help = "print the entry count of a dictionary file")]
    Count(CountArgs),
}

/// Where the dictionary of a session comes from.
struct DictionaryArgs<'a> {
    dictionary: Option<&'a Path>,
    affix: Option<&'a Path>,
    language: Option<&'a str>,
    config: Option<&'a Path>,
    key: Option<&'a str>,
}

impl DictionaryArgs<'_> {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = if let Some(path) = self.config {
            SessionConfig::from_json_path(path)?
        } else if let Some(dic) = self.dictionary {
            let aff = self
                .affix
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dic.with_extension("aff"));
            SessionConfig::new(dic, aff)
        } else if let Some(language) = self.language {
            let tag = LanguageTag::parse(language)
                .map_err(|e| anyhow!("Invalid language tag '{}': {}", language, e))?;
            let (dic, aff) = find_dictionary(&tag)
                .ok_or_else(|| anyhow!("No dictionary found for '{}'", language))?;
            SessionConfig::new(dic, aff)
        } else {
            return Err(anyhow!(
                "One of --dictionary, --language or --config is required"
            ));
        };

        if let Some(key) = self.key {
            config.key = Some(key.to_string());
        }
        Ok(config)
    }
}

#[derive(Debug, Options)]
struct CheckArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "S", help = "always show suggestions even if word is correct")]
    always_suggest: bool,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "words to be processed")]
    inputs: Vec<String>,

    #[options(short = "d", help = "dictionary (.dic) file")]
    dictionary: Option<PathBuf>,

    #[options(short = "a", help = "affix (.aff) file, next to the dictionary by default")]
    affix: Option<PathBuf>,

    #[options(short = "l", help = "language tag of an installed dictionary")]
    language: Option<String>,

    #[options(short = "c", help = "session configuration (JSON)")]
    config: Option<PathBuf>,

    #[options(no_short, help = "key for encrypted dictionaries")]
    key: Option<String>,
}

macro_rules! dictionary_args {
    ($args:expr) => {
        DictionaryArgs {
            dictionary: $args.dictionary.as_deref(),
            affix: $args.affix.as_deref(),
            language: $args.language.as_deref(),
            config: $args.config.as_deref(),
            key: $args.key.as_deref(),
        }
    };
}

#[derive(Debug, Options)]
struct AddArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "e", help = "add words with the affixes of this known word")]
    example: Option<String>,

    #[options(no_short, help = "collation locale, code point order by default")]
    locale: Option<String>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "words to be added")]
    inputs: Vec<String>,

    #[options(short = "d", help = "dictionary (.dic) file")]
    dictionary: Option<PathBuf>,

    #[options(short = "a", help = "affix (.aff) file, next to the dictionary by default")]
    affix: Option<PathBuf>,

    #[options(short = "l", help = "language tag of an installed dictionary")]
    language: Option<String>,

    #[options(short = "c", help = "session configuration (JSON)")]
    config: Option<PathBuf>,

    #[options(no_short, help = "key for encrypted dictionaries")]
    key: Option<String>,
}

#[derive(Debug, Options)]
struct SortArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "dictionary file")]
    path: Option<PathBuf>,

    #[options(short = "e", help = "file encoding (default: UTF-8)")]
    encoding: Option<String>,

    #[options(no_short, help = "collation locale, code point order by default")]
    locale: Option<String>,

    #[options(no_short, help = "drop duplicate entries")]
    dedup: bool,

    #[options(no_short, long = "crlf", help = "write CRLF line endings")]
    crlf: bool,

    #[options(no_short, help = "memory budget in bytes")]
    max_memory: Option<usize>,

    #[options(no_short, help = "most temporary files per merge")]
    max_temp_files: Option<usize>,

    #[options(no_short, help = "directory for temporary files")]
    temp_dir: Option<PathBuf>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,
}

#[derive(Debug, Options)]
struct CountArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "dictionary file")]
    path: Option<PathBuf>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,
}

fn read_inputs(inputs: Vec<String>) -> anyhow::Result<Vec<String>> {
    if !inputs.is_empty() {
        return Ok(inputs);
    }

    eprintln!("Reading from stdin...");
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer
        .lines()
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect())
}

fn check(args: CheckArgs, is_suggesting: bool) -> anyhow::Result<()> {
    let config = dictionary_args!(args).session_config()?;
    let path = config.dictionary_path.clone();
    let mut session: Session<WordListEngine> =
        Session::open(config).with_context(|| format!("Opening {}", path.display()))?;

    let words = read_inputs(args.inputs)?;
    let mut writer = writer(args.use_json);

    for word in words {
        let is_correct = session.spell(&word)?;
        writer.write_correction(&word, is_correct);

        if is_suggesting && (args.always_suggest || !is_correct) {
            let suggestions = session.suggest(&word)?;
            writer.write_suggestions(&word, &suggestions);
        }
    }

    session.close();
    writer.finish()
}

fn add(args: AddArgs) -> anyhow::Result<()> {
    let mut config = dictionary_args!(args).session_config()?;
    let words = read_inputs(args.inputs)?;
    if let Some(locale) = args.locale {
        config.update.collation = CollationOrder::Locale(locale);
    }

    let mut session: Session<WordListEngine> = Session::open(config)?;
    for word in &words {
        match &args.example {
            Some(example) => session.add_with_affix(word, example)?,
            None => session.add(word)?,
        }
    }

    let summary = session.update_dictionary()?;
    session.close();

    print_json_or(args.use_json, &summary, || {
        println!(
            "Added {} words; {} entries (was {})",
            summary.appended, summary.count, summary.previous
        )
    })
}

fn sort(args: SortArgs) -> anyhow::Result<()> {
    let path = args.path.ok_or_else(|| anyhow!("No dictionary file given"))?;
    let separator = if args.crlf {
        LineSeparator::CrLf
    } else {
        LineSeparator::Lf
    };
    let codec = LineCodec::new(args.encoding.as_deref().unwrap_or("UTF-8"), separator)?;
    let collation = match args.locale {
        Some(locale) => CollationOrder::Locale(locale),
        None => CollationOrder::Lexicographic,
    }
    .build()?;

    let mut config = SortConfig::default();
    config.dedup = args.dedup;
    config.temp_dir = args.temp_dir;
    if let Some(v) = args.max_memory {
        config.max_memory = v;
    }
    if let Some(v) = args.max_temp_files {
        config.max_temp_files = v;
    }

    let sorter = ExternalSorter::new(config, codec, &*collation);
    let stats = sorter
        .sort_file(&path)
        .with_context(|| format!("Sorting {}", path.display()))?;

    print_json_or(args.use_json, &stats, || {
        println!(
            "Sorted {} entries in {} batches and {} passes",
            stats.written, stats.batches, stats.passes
        )
    })
}

#[derive(Serialize)]
struct CountReport<'a> {
    path: &'a Path,
    count: u64,
    bom: bool,
}

fn count(args: CountArgs) -> anyhow::Result<()> {
    let path = args.path.ok_or_else(|| anyhow!("No dictionary file given"))?;
    let header = read_header(&path)?;
    let report = CountReport {
        path: &path,
        count: header.count,
        bom: header.bom,
    };

    print_json_or(args.use_json, &report, || println!("{}", header.count))
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse_args_default_or_exit();

    match args.command {
        None => Ok(()),
        Some(Command::Check(args)) => check(args, false),
        Some(Command::Suggest(args)) => check(args, true),
        Some(Command::Add(args)) => add(args),
        Some(Command::Sort(args)) => sort(args),
        Some(Command::Count(args)) => count(args),
    }
}
