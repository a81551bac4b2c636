//! Pieces shared by the two Monzo importers: the API's transaction JSON,
//! unit prices for foreign spending and the non-transaction notes.
//!
//! Input is the body of `GET /transactions?expand[]=merchant&account_id=...`.
//! Amounts are integers in minor units.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tally_core::{Amount, Entry, Metadata, Note, from_minor_units, parse_timestamp_date};

use crate::source::SourceFile;

#[derive(Debug, Deserialize)]
struct Export {
    transactions: Vec<MonzoTransaction>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// `Some` whenever the key is present, so a null value still counts
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    null_as_empty(d).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MonzoTransaction {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub account_id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub local_amount: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub local_currency: String,
    pub created: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub settled: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub updated: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dedupe_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scheme: String,
    #[serde(default)]
    pub merchant: Option<Merchant>,
    #[serde(default)]
    pub counterparty: Counterparty,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "present")]
    pub decline_reason: Option<String>,
    #[serde(default)]
    pub is_load: bool,
    #[serde(default)]
    pub account_balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Merchant {
    #[serde(default)]
    pub name: Option<String>,
}

/// Counterparty details; which fields appear depends on the payment type.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Counterparty {
    pub account_number: Option<String>,
    pub sort_code: Option<String>,
    pub number: Option<String>,
    pub user_id: Option<String>,
    /// Spelled this way by the API
    pub prefered_name: Option<String>,
    pub name: Option<String>,
}

impl MonzoTransaction {
    pub fn merchant_name(&self) -> Option<&str> {
        self.merchant.as_ref().and_then(|m| m.name.as_deref())
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn date(&self) -> Result<NaiveDate> {
        parse_timestamp_date(&self.created).with_context(|| format!("transaction {}", self.id))
    }

    pub fn units(&self) -> Amount {
        Amount::new(from_minor_units(self.amount), &self.currency)
    }

    /// Exchange rate for spending in another currency, as local units per
    /// settled unit.
    ///
    /// Card checks carry a zero local amount, and there is no rate without a
    /// settled amount either, so both give `None`.
    pub fn unit_price(&self) -> Option<Amount> {
        if self.local_currency == self.currency || self.local_amount == 0 || self.amount == 0 {
            return None;
        }
        let rate = (Decimal::from(self.local_amount) / Decimal::from(self.amount))
            .abs()
            .round_dp(5);
        Some(Amount::new(rate, &self.local_currency))
    }

    /// Bank identifiers and timestamps recorded on every entry
    pub fn base_metadata(&self, filename: &str) -> Metadata {
        Metadata::new(filename, 0)
            .with("bank_id", self.id.as_str())
            .with("bank_dedupe_id", self.dedupe_id.as_str())
            .with("bank_description", self.description.as_str())
            .with("bank_created_date", self.created.as_str())
            .with("bank_settlement_date", self.settled.as_str())
            .with("bank_updated_date", self.updated.as_str())
    }
}

/// How a record ends up in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition<'a> {
    PinChange,
    Declined(&'a str),
    Posted,
}

impl MonzoTransaction {
    pub fn disposition(&self) -> Disposition<'_> {
        if self.notes.eq_ignore_ascii_case("pin change") {
            Disposition::PinChange
        } else if let Some(reason) = self.decline_reason.as_deref() {
            Disposition::Declined(reason)
        } else {
            Disposition::Posted
        }
    }
}

/// Note for a PIN change or declined payment. Declines without a payee are
/// described by the bank's raw description instead.
pub(crate) fn note_entry(
    txn: &MonzoTransaction,
    disposition: Disposition<'_>,
    payee: Option<&str>,
    account: &str,
    meta: Metadata,
) -> Result<Option<Entry>> {
    let comment = match disposition {
        Disposition::PinChange => "PIN Change".to_string(),
        Disposition::Declined(reason) => {
            let who = payee.unwrap_or(txn.description.as_str());
            format!("{who} transaction declined with reason {reason}")
        }
        Disposition::Posted => return Ok(None),
    };

    Ok(Some(Entry::Note(Note {
        meta,
        date: txn.date()?,
        account: account.to_string(),
        comment,
    })))
}

pub(crate) fn load_transactions(file: &SourceFile) -> Result<Vec<MonzoTransaction>> {
    let export: Export = serde_json::from_str(file.contents())
        .with_context(|| format!("parsing Monzo export {}", file.display_name()))?;
    Ok(export.transactions)
}

/// Matches JSON exports whose first transaction belongs to `account_id`.
pub(crate) fn identify(file: &SourceFile, account_id: &str) -> bool {
    if !file.basename().ends_with(".json") {
        return false;
    }
    let Ok(transactions) = load_transactions(file) else {
        return false;
    };
    match transactions.first() {
        Some(first) if !first.account_id.is_empty() => first.account_id == account_id,
        _ => false,
    }
}

/// Creation date of the last transaction in the export
pub(crate) fn file_date(file: &SourceFile) -> Result<NaiveDate> {
    let transactions = load_transactions(file)?;
    match transactions.last() {
        Some(last) => last.date(),
        None => bail!("no transactions in {}", file.display_name()),
    }
}
