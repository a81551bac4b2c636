//! Monzo prepaid card importer (API transaction JSON)
//!
//! Top-ups (`is_load`) are booked as transfers from the configured funding
//! account, everything else against `Expenses:Unknown`. Both are flagged for
//! review. Balance assertions are interleaved from the card's running balance.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use tally_core::{Amount, Balance, Entry, Flag, Metadata, Posting, Transaction, from_minor_units};
use tracing::debug;

use crate::importer::Importer;
use crate::importers::monzo::{self, Disposition, MonzoTransaction};
use crate::source::SourceFile;

const UNKNOWN_ACCOUNT: &str = "Expenses:Unknown";
/// Assert the balance after every this many transactions
const BALANCE_INTERVAL: usize = 10;
/// Add a closing assertion when fewer than this many were emitted
const MIN_BALANCES: usize = 5;

fn payee(txn: &MonzoTransaction) -> Option<&str> {
    txn.merchant_name()
}

fn narration(txn: &MonzoTransaction) -> Option<String> {
    if !txn.notes.is_empty() {
        Some(txn.notes.clone())
    } else if payee(txn).is_none() {
        Some(txn.description.clone())
    } else {
        None
    }
}

/// Whether the `count`-th of `total` posted transactions gets a balance
/// assertion, given how many were emitted before it. PIN changes and declined
/// records become notes and are not counted.
fn wants_balance(count: usize, total: usize, emitted: usize) -> bool {
    count % BALANCE_INTERVAL == 0 || (count == total && emitted < MIN_BALANCES)
}

#[derive(Debug, Clone)]
pub struct MonzoPrepaidImporter {
    pub account_id: String,
    pub account: String,
    pub default_transfer_account: String,
}

impl MonzoPrepaidImporter {
    pub fn new(
        account_id: impl Into<String>,
        account: impl Into<String>,
        default_transfer_account: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            account: account.into(),
            default_transfer_account: default_transfer_account.into(),
        }
    }

    fn to_transaction(&self, txn: &MonzoTransaction, meta: Metadata) -> Result<Transaction> {
        let mut narration = narration(txn);
        let second_account = if txn.is_load {
            narration = Some("Transfer".to_string());
            self.default_transfer_account.as_str()
        } else {
            UNKNOWN_ACCOUNT
        };

        // Even top-ups are a guess at where the money came from
        let postings = vec![
            Posting::new(&self.account, Some(txn.units())).with_price(txn.unit_price()),
            Posting::new(second_account, None).with_flag(Some(Flag::Warning)),
        ];

        let mut out = Transaction::new(meta, txn.date()?, Flag::Okay, postings);
        out.payee = payee(txn).map(str::to_string);
        out.narration = narration;
        Ok(out)
    }

    /// Opening balance of the day after `txn`
    fn balance_after(&self, txn: &MonzoTransaction, date: NaiveDate, filename: &str) -> Result<Balance> {
        let date = date
            .checked_add_days(Days::new(1))
            .with_context(|| format!("date overflow after {date}"))?;
        Ok(Balance {
            meta: Metadata::new(filename, 0),
            date,
            account: self.account.clone(),
            amount: Amount::new(from_minor_units(txn.account_balance), &txn.currency),
        })
    }
}

impl Importer for MonzoPrepaidImporter {
    fn name(&self) -> String {
        format!("tally_ingest.monzo_prepaid: \"{}\"", self.account)
    }

    fn identify(&self, file: &SourceFile) -> bool {
        let found = monzo::identify(file, &self.account_id);
        if found {
            debug!(file = %file.display_name(), account = %self.account, "identified Monzo prepaid export");
        }
        found
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Entry>> {
        let filename = file.display_name();
        let transactions = monzo::load_transactions(file)?;

        let total = transactions
            .iter()
            .filter(|t| t.disposition() == Disposition::Posted)
            .count();
        let mut count = 0;
        let mut balances = 0;

        let mut entries = Vec::with_capacity(transactions.len() + total / BALANCE_INTERVAL + 1);
        for txn in &transactions {
            let meta = txn.base_metadata(&filename);
            let disposition = txn.disposition();

            if disposition != Disposition::Posted {
                if let Some(note) = monzo::note_entry(txn, disposition, payee(txn), &self.account, meta)? {
                    entries.push(note);
                }
                continue;
            }

            let out = self
                .to_transaction(txn, meta)
                .with_context(|| format!("{filename}: transaction {}", txn.id))?;
            let date = out.date;
            entries.push(Entry::Transaction(out));
            count += 1;

            if wants_balance(count, total, balances) {
                entries.push(Entry::Balance(self.balance_after(txn, date, &filename)?));
                balances += 1;
            }
        }

        debug!(file = %filename, count = entries.len(), balances, "extracted Monzo prepaid export");
        Ok(entries)
    }

    fn file_account(&self, _file: &SourceFile) -> String {
        self.account.clone()
    }

    fn file_name(&self, _file: &SourceFile) -> Option<String> {
        Some("json".to_string())
    }

    fn file_date(&self, file: &SourceFile) -> Result<NaiveDate> {
        monzo::file_date(file)
    }
}
