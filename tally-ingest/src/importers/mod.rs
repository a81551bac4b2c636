//! Statement importers, one module per export format.

pub mod funding_circle;
pub mod lendy;
mod monzo;
pub mod monzo_debit;
pub mod monzo_prepaid;

use regex::Regex;

use crate::source::SourceFile;

pub use funding_circle::FundingCircleImporter;
pub use lendy::LendyImporter;
pub use monzo_debit::MonzoDebitImporter;
pub use monzo_prepaid::MonzoPrepaidImporter;

/// Header-aware CSV reader over the file contents. Only header names are
/// trimmed; cell text is kept verbatim and short rows are tolerated.
pub(crate) fn csv_reader(file: &SourceFile) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(file.contents().as_bytes())
}

/// Regex match that treats an invalid pattern as "no match", for use in
/// `identify` where failures must stay silent.
pub(crate) fn matches(pattern: &str, text: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
