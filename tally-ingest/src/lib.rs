//! tally-ingest: statement importers turning bank and lending platform exports into ledger entries.

pub mod config;
pub mod importer;
pub mod importers;
pub mod source;

pub use config::{Config, ImporterConfig, load_config};
pub use importer::{Importer, find_importer};
pub use importers::{FundingCircleImporter, LendyImporter, MonzoDebitImporter, MonzoPrepaidImporter};
pub use source::SourceFile;
