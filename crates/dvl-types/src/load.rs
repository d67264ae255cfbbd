//! Load timestamps and the audit metadata stamped onto records on insert.

use serde::{Deserialize, Serialize};

use crate::record::DataVaultObject;

/// The moment a record was first seen by the vault.
///
/// Use one timestamp per load run rather than a fresh one per insert.
pub type LoadDate = chrono::DateTime<chrono::Utc>;

/// Audit attributes a record stores directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLoadInfo {
    /// Traceable description of where the data came from.
    pub record_source: String,
    /// Which program (and version) loaded it.
    pub loaded_by: String,
}

impl StoreLoadInfo {
    pub fn new(record_source: impl Into<String>, loaded_by: impl Into<String>) -> Self {
        Self {
            record_source: record_source.into(),
            loaded_by: loaded_by.into(),
        }
    }
}

/// Foreign reference to a separately stored load-information row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadReference(pub i64);

/// Optional audit metadata supplied with an insert.
///
/// The three parts are independent; any subset may be set. A record only
/// receives the parts it opts into through [`DataVaultObject`]'s audit
/// setters, the rest is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadMetadata {
    pub store: Option<StoreLoadInfo>,
    pub load_reference: Option<LoadReference>,
    pub edited_by: Option<String>,
}

impl LoadMetadata {
    /// Metadata with nothing set.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, info: StoreLoadInfo) -> Self {
        self.store = Some(info);
        self
    }

    pub fn with_load_reference(mut self, reference: LoadReference) -> Self {
        self.load_reference = Some(reference);
        self
    }

    pub fn with_edited_by(mut self, editor: impl Into<String>) -> Self {
        self.edited_by = Some(editor.into());
        self
    }

    /// Stamp the load date and every supplied audit attribute onto `record`.
    pub fn stamp<R: DataVaultObject>(&self, record: &mut R, load_date: LoadDate) {
        record.set_load_date(load_date);
        if let Some(info) = &self.store {
            record.set_store_load_info(info);
        }
        if let Some(reference) = self.load_reference {
            record.set_load_reference(reference);
        }
        if let Some(editor) = &self.edited_by {
            record.set_edited_by(editor);
        }
    }
}
