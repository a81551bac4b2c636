//! The contract every statement importer implements.

use anyhow::Result;
use chrono::NaiveDate;
use tally_core::Entry;

use crate::source::SourceFile;

/// A statement format that can be recognised and turned into ledger entries.
pub trait Importer: Send + Sync {
    /// Display name, e.g. `funding_circle: "Assets:FundingCircle"`
    fn name(&self) -> String;

    /// Whether this importer understands `file`. Never fails: unreadable or
    /// malformed input simply does not match.
    fn identify(&self, file: &SourceFile) -> bool;

    /// Every entry in the file, in source order.
    fn extract(&self, file: &SourceFile) -> Result<Vec<Entry>>;

    /// The account this statement belongs to
    fn file_account(&self, file: &SourceFile) -> String;

    /// Short name used when filing the document
    fn file_name(&self, file: &SourceFile) -> Option<String>;

    /// Representative date used when filing the document
    fn file_date(&self, file: &SourceFile) -> Result<NaiveDate>;
}

/// First importer in `importers` that identifies `file`.
pub fn find_importer<'a>(
    importers: &'a [Box<dyn Importer>],
    file: &SourceFile,
) -> Option<&'a dyn Importer> {
    importers
        .iter()
        .map(|i| i.as_ref())
        .find(|i| i.identify(file))
}
