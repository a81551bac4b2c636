//! tally-core: ledger entry model and parsing helpers shared by the statement importers

pub mod dates;
pub mod ledger;
pub mod number;

pub use dates::{parse_day_first, parse_timestamp_date};
pub use ledger::{
    Amount, Balance, Entry, Flag, MetaValue, Metadata, Note, Posting, PostingProblem, Transaction,
};
pub use number::{from_minor_units, parse_decimal};
