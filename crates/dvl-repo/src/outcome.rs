/// Whether an insert reached storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Written,
    /// Deduplicated by a cache or by the timeline state; nothing was written.
    Skipped,
}

/// Result of an insert: the stamped, keyed record and what happened to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Inserted<R> {
    pub record: R,
    pub outcome: InsertOutcome,
}

impl<R> Inserted<R> {
    pub fn written(record: R) -> Self {
        Self {
            record,
            outcome: InsertOutcome::Written,
        }
    }

    pub fn skipped(record: R) -> Self {
        Self {
            record,
            outcome: InsertOutcome::Skipped,
        }
    }

    pub fn is_written(&self) -> bool {
        self.outcome == InsertOutcome::Written
    }

    pub fn into_record(self) -> R {
        self.record
    }
}
