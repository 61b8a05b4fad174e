//! Progress reporting for dictionary updates.
//!
//! The update path reports through an [`UpdateObserver`] handed to it
//! rather than a process-wide logger. [`LogObserver`], the default, forwards
//! to the `log` facade.
use std::path::Path;

use crate::dictionary::error::DictionaryError;
use crate::dictionary::header::PatchOutcome;
use crate::dictionary::UpdateSummary;
use crate::sort::SortStats;

/// A step of a dictionary update. `path` is the dictionary as given.
#[allow(missing_docs)]
#[derive(Debug)]
pub enum UpdateEvent<'a> {
    /// An update began with `pending` words.
    Started { path: &'a Path, pending: usize },
    /// The words were appended and the count raised on a working copy.
    Appended { path: &'a Path, outcome: &'a PatchOutcome },
    /// The sorted file replaced the dictionary.
    Sorted { path: &'a Path, stats: &'a SortStats },
    /// The update succeeded.
    Finished { path: &'a Path, summary: &'a UpdateSummary },
    /// The update failed and the dictionary was left as it was.
    Failed { path: &'a Path, error: &'a DictionaryError },
}

/// Receives the progress of dictionary updates.
pub trait UpdateObserver {
    /// Called once per step, on the updating thread.
    fn on_event(&self, event: &UpdateEvent<'_>);
}

impl<F> UpdateObserver for F
where
    F: Fn(&UpdateEvent<'_>),
{
    fn on_event(&self, event: &UpdateEvent<'_>) {
        self(event)
    }
}

/// Forwards update events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl UpdateObserver for LogObserver {
    fn on_event(&self, event: &UpdateEvent<'_>) {
        match event {
            UpdateEvent::Started { path, pending } => {
                log::trace!("Updating dictionary {} with {} words", path.display(), pending)
            }
            UpdateEvent::Appended { path, outcome } => log::trace!(
                "Dictionary {} had {} entries, now {}",
                path.display(),
                outcome.previous,
                outcome.count
            ),
            UpdateEvent::Sorted { path, stats } => log::trace!(
                "Sorted {} entries of {} in {} batches",
                stats.written,
                path.display(),
                stats.batches
            ),
            UpdateEvent::Finished { path, .. } => {
                log::debug!("Dictionary {} updated", path.display())
            }
            UpdateEvent::Failed { path, error } => {
                log::error!("Failed to update dictionary {}: {}", path.display(), error)
            }
        }
    }
}
