//! Ledger entry types produced by the statement importers.
//!
//! These mirror the double-entry directives the downstream ledger tooling
//! understands: transactions made of postings, balance assertions and notes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An exact decimal quantity of a single currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub number: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

/// Transaction / posting flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    /// Completed, nothing to review (`*`)
    #[serde(rename = "*")]
    Okay,
    /// Needs manual review (`!`)
    #[serde(rename = "!")]
    Warning,
}

impl Flag {
    pub fn as_char(&self) -> char {
        match self {
            Flag::Okay => '*',
            Flag::Warning => '!',
        }
    }
}

/// A metadata value attached to an entry. Tagged so dates and numbers keep
/// their type through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetaValue {
    Text(String),
    Date(NaiveDate),
    Number(Decimal),
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<NaiveDate> for MetaValue {
    fn from(d: NaiveDate) -> Self {
        MetaValue::Date(d)
    }
}

impl From<Decimal> for MetaValue {
    fn from(n: Decimal) -> Self {
        MetaValue::Number(n)
    }
}

/// Source location plus insertion-ordered key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub filename: String,
    pub lineno: usize,
    pub entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn new(filename: impl Into<String>, lineno: usize) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            entries: Vec::new(),
        }
    }

    /// Insert a key, replacing any previous value while keeping its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One leg of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    /// `None` leaves the amount to be interpolated by the ledger
    pub units: Option<Amount>,
    pub price: Option<Amount>,
    pub flag: Option<Flag>,
    pub meta: Option<Metadata>,
}

impl Posting {
    pub fn new(account: impl Into<String>, units: Option<Amount>) -> Self {
        Self {
            account: account.into(),
            units,
            price: None,
            flag: None,
            meta: None,
        }
    }

    pub fn with_price(mut self, price: Option<Amount>) -> Self {
        self.price = price;
        self
    }

    pub fn with_flag(mut self, flag: Option<Flag>) -> Self {
        self.flag = flag;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub meta: Metadata,
    pub date: NaiveDate,
    pub flag: Flag,
    pub payee: Option<String>,
    pub narration: Option<String>,
    pub tags: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub postings: Vec<Posting>,
}

/// Structural problems with a transaction's postings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingProblem {
    TooFewPostings(usize),
    NoUnits,
}

impl fmt::Display for PostingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostingProblem::TooFewPostings(n) => write!(f, "expected at least 2 postings, got {n}"),
            PostingProblem::NoUnits => write!(f, "no posting carries an amount"),
        }
    }
}

impl Transaction {
    /// Create a transaction with no payee, narration, tags or links
    pub fn new(meta: Metadata, date: NaiveDate, flag: Flag, postings: Vec<Posting>) -> Self {
        Self {
            meta,
            date,
            flag,
            payee: None,
            narration: None,
            tags: BTreeSet::new(),
            links: BTreeSet::new(),
            postings,
        }
    }

    /// Every transaction needs two legs and at least one concrete amount to
    /// interpolate the rest from.
    pub fn check_postings(&self) -> Result<(), PostingProblem> {
        if self.postings.len() < 2 {
            return Err(PostingProblem::TooFewPostings(self.postings.len()));
        }
        if !self.postings.iter().any(|p| p.units.is_some()) {
            return Err(PostingProblem::NoUnits);
        }
        Ok(())
    }
}

/// Assertion that `account` holds `amount` at the start of `date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub meta: Metadata,
    pub date: NaiveDate,
    pub account: String,
    pub amount: Amount,
}

/// Free-text, non-financial event on an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub meta: Metadata,
    pub date: NaiveDate,
    pub account: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Transaction(Transaction),
    Balance(Balance),
    Note(Note),
}

impl Entry {
    pub fn date(&self) -> NaiveDate {
        match self {
            Entry::Transaction(t) => t.date,
            Entry::Balance(b) => b.date,
            Entry::Note(n) => n.date,
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Entry::Transaction(t) => &t.meta,
            Entry::Balance(b) => &b.meta,
            Entry::Note(n) => &n.meta,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Entry::Transaction(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_balance(&self) -> Option<&Balance> {
        match self {
            Entry::Balance(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Entry::Note(n) => Some(n),
            _ => None,
        }
    }
}

impl From<Transaction> for Entry {
    fn from(t: Transaction) -> Self {
        Entry::Transaction(t)
    }
}

impl From<Balance> for Entry {
    fn from(b: Balance) -> Self {
        Entry::Balance(b)
    }
}

impl From<Note> for Entry {
    fn from(n: Note) -> Self {
        Entry::Note(n)
    }
}
