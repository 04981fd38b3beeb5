//! Human-readable game narration.
//!
//! An append-only, turn-ordered log of every notable mutation: cash moves,
//! certificate transfers, round transitions. Consumed by a presentation
//! layer; never authoritative state. Entries are mirrored to `log::debug!`
//! so test runs can be traced with `RUST_LOG=debug`.

use im::Vector;

/// Append-only narration log.
#[derive(Clone, Debug, Default)]
pub struct ReportLog {
    entries: Vector<String>,
}

impl ReportLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        log::debug!("{entry}");
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&String> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    /// Cheap snapshot of the full narration so far.
    #[must_use]
    pub fn snapshot(&self) -> Vector<String> {
        self.entries.clone()
    }
}
