/*! Keeping Hunspell-style word lists counted and sorted.

A `.dic` file starts with the number of entries and lists one word per line
in collation order. Words added during a spell-checking [`Session`] are
tracked in memory and merged back into the file on request: the count line
is patched, the new entries are appended, and the whole file is re-sorted
with a bounded-memory external sort before it atomically replaces the
original.

# Usage examples

```no_run
use spelldict::engine::WordListEngine;
use spelldict::session::{Session, SessionConfig};

let config = SessionConfig::new("pt_BR.dic", "pt_BR.aff");
let mut session: Session<WordListEngine> = Session::open(config)?;
if !session.spell("borogodó")? {
    session.add("borogodó")?;
}
let summary = session.update_dictionary()?;
println!("{} entries", summary.count);
session.close();
# Ok::<(), spelldict::session::SessionError>(())
```

The `spelldict` command in `spelldict-bin` exposes the same operations.

[`Session`]: crate::session::Session
*/

#![warn(missing_docs)]
pub mod dictionary;
pub mod diff;
pub mod engine;
pub mod observer;
pub mod paths;
pub mod session;
pub mod sort;

/// Limits and defaults shared across the crate.
pub mod constants;

/// Logs to stderr as configured by `RUST_LOG`. Does nothing if a logger is
/// already installed.
#[cfg(feature = "logging")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}
