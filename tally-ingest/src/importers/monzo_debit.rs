//! Monzo current account importer (API transaction JSON)
//!
//! Everything is booked against `Expenses:Unknown` with a flagged posting for
//! manual categorisation, except transfers to and from pots, which stay
//! within the account.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::{Entry, Flag, Metadata, Posting, Transaction};
use tracing::{debug, warn};

use crate::importer::Importer;
use crate::importers::monzo::{self, Disposition, MonzoTransaction};
use crate::source::SourceFile;

const POT_SCHEME: &str = "uk_retail_pot";
const UNKNOWN_ACCOUNT: &str = "Expenses:Unknown";

fn payee(txn: &MonzoTransaction) -> Option<&str> {
    txn.merchant_name()
        .or(txn.counterparty.prefered_name.as_deref())
        .or(txn.counterparty.name.as_deref())
}

fn narration(txn: &MonzoTransaction) -> Option<String> {
    if !txn.notes.is_empty() {
        Some(txn.notes.clone())
    } else if txn.scheme == POT_SCHEME {
        Some("Internal pot transfer".to_string())
    } else if payee(txn).is_none() {
        Some(txn.description.clone())
    } else {
        None
    }
}

/// Base metadata plus whichever counterparty identifiers the payment carries
fn metadata(txn: &MonzoTransaction, filename: &str) -> Metadata {
    let mut meta = txn.base_metadata(filename);
    let cp = &txn.counterparty;
    if let Some(account_number) = &cp.account_number {
        meta.insert("counterparty_account_number", account_number.as_str());
        meta.insert("counterparty_sort_code", cp.sort_code.clone().unwrap_or_default());
    } else if let Some(number) = &cp.number {
        meta.insert("counterparty_phone_number", number.as_str());
        meta.insert("counterparty_user_id", cp.user_id.clone().unwrap_or_default());
    }
    meta
}

#[derive(Debug, Clone)]
pub struct MonzoDebitImporter {
    pub account_id: String,
    pub account: String,
}

impl MonzoDebitImporter {
    pub fn new(account_id: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account: account.into(),
        }
    }

    fn to_transaction(&self, txn: &MonzoTransaction, meta: Metadata) -> Result<Transaction> {
        let first = Posting::new(&self.account, Some(txn.units())).with_price(txn.unit_price());

        let mut links = Vec::new();
        let second = if txn.scheme == POT_SCHEME {
            match txn.metadata_str("pot_id") {
                Some(pot_id) => links.push(pot_id.to_string()),
                None => warn!(id = %txn.id, "pot transfer without pot_id"),
            }
            Posting::new(&self.account, None)
        } else {
            Posting::new(UNKNOWN_ACCOUNT, None).with_flag(Some(Flag::Warning))
        };

        let mut out = Transaction::new(meta, txn.date()?, Flag::Okay, vec![first, second]);
        out.payee = payee(txn).map(str::to_string);
        out.narration = narration(txn);
        out.links.extend(links);
        Ok(out)
    }
}

impl Importer for MonzoDebitImporter {
    fn name(&self) -> String {
        format!("tally_ingest.monzo_debit: \"{}\"", self.account)
    }

    fn identify(&self, file: &SourceFile) -> bool {
        let found = monzo::identify(file, &self.account_id);
        if found {
            debug!(file = %file.display_name(), account = %self.account, "identified Monzo export");
        }
        found
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Entry>> {
        let filename = file.display_name();
        let transactions = monzo::load_transactions(file)?;

        let mut entries = Vec::with_capacity(transactions.len());
        for txn in &transactions {
            let meta = metadata(txn, &filename);
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
            entries.push(Entry::Transaction(out));
        }

        debug!(file = %filename, count = entries.len(), "extracted Monzo current account export");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::monzo::fixtures::{ACCOUNT_ID, export, txn};
    use rust_decimal::Decimal;
    use serde_json::json;
    use tally_core::{Amount, MetaValue};

    const ACCOUNT: &str = "Assets:Monzo:Current";

    fn importer() -> MonzoDebitImporter {
        MonzoDebitImporter::new(ACCOUNT_ID, ACCOUNT)
    }

    fn extract_one(v: serde_json::Value) -> Entry {
        let entries = importer().extract(&export("monzo.json", vec![v])).unwrap();
        assert_eq!(entries.len(), 1);
        entries.into_iter().next().unwrap()
    }

    fn text(s: &str) -> MetaValue {
        MetaValue::Text(s.to_string())
    }

    #[test]
    fn test_card_payment_needs_review() {
        let mut v = txn("tx_1", -1099);
        v["merchant"] = json!({ "name": "Pret A Manger" });
        let entry = extract_one(v);
        let t = entry.as_transaction().unwrap();

        assert_eq!(t.flag, Flag::Okay);
        assert_eq!(t.date, NaiveDate::from_ymd_opt(2018, 3, 1).unwrap());
        assert_eq!(t.payee.as_deref(), Some("Pret A Manger"));
        assert_eq!(t.narration, None);
        assert_eq!(t.postings.len(), 2);
        assert_eq!(t.postings[0].account, ACCOUNT);
        assert_eq!(t.postings[0].units, Some(Amount::new(Decimal::new(-1099, 2), "GBP")));
        assert!(t.postings[0].price.is_none());
        assert_eq!(t.postings[1].account, "Expenses:Unknown");
        assert_eq!(t.postings[1].flag, Some(Flag::Warning));
        assert!(t.links.is_empty());

        let keys: Vec<_> = t.meta.keys().collect();
        assert_eq!(
            keys,
            vec![
                "bank_id",
                "bank_dedupe_id",
                "bank_description",
                "bank_created_date",
                "bank_settlement_date",
                "bank_updated_date",
            ]
        );
        assert_eq!(t.meta.get("bank_id"), Some(&text("tx_1")));
    }

    #[test]
    fn test_pot_transfer_stays_in_account() {
        let mut v = txn("tx_pot", -5000);
        v["scheme"] = json!("uk_retail_pot");
        v["metadata"] = json!({ "pot_id": "pot_0001" });
        let entry = extract_one(v);
        let t = entry.as_transaction().unwrap();

        assert_eq!(t.postings[1].account, t.postings[0].account);
        assert_eq!(t.postings[1].flag, None);
        assert!(t.links.contains("pot_0001"));
        assert_eq!(t.narration.as_deref(), Some("Internal pot transfer"));
    }

    #[test]
    fn test_payee_falls_back_to_counterparty() {
        let mut v = txn("tx_2", 2500);
        v["counterparty"] = json!({
            "prefered_name": "Alice",
            "name": "Alice Smith",
            "number": "+447700900000",
            "user_id": "user_42",
        });
        let entry = extract_one(v);
        let t = entry.as_transaction().unwrap();
        assert_eq!(t.payee.as_deref(), Some("Alice"));
        assert_eq!(t.meta.get("counterparty_phone_number"), Some(&text("+447700900000")));
        assert_eq!(t.meta.get("counterparty_user_id"), Some(&text("user_42")));
        assert!(!t.meta.contains_key("counterparty_account_number"));

        let mut v = txn("tx_3", 2500);
        v["counterparty"] = json!({
            "name": "ACME LTD",
            "account_number": "12345678",
            "sort_code": "040004",
            "number": "ignored",
        });
        let entry = extract_one(v);
        let t = entry.as_transaction().unwrap();
        assert_eq!(t.payee.as_deref(), Some("ACME LTD"));
        assert_eq!(t.meta.get("counterparty_account_number"), Some(&text("12345678")));
        assert_eq!(t.meta.get("counterparty_sort_code"), Some(&text("040004")));
        assert!(!t.meta.contains_key("counterparty_phone_number"));
    }

    #[test]
    fn test_narration_order() {
        let mut v = txn("tx_4", -100);
        v["notes"] = json!("lunch with Bob");
        v["merchant"] = json!({ "name": "Cafe" });
        let entry = extract_one(v);
        assert_eq!(entry.as_transaction().unwrap().narration.as_deref(), Some("lunch with Bob"));

        let entry = extract_one(txn("tx_5", -100));
        let t = entry.as_transaction().unwrap();
        assert_eq!(t.payee, None);
        assert_eq!(t.narration.as_deref(), Some("RAW tx_5"));
    }

    #[test]
    fn test_pin_change_note() {
        let mut v = txn("tx_pin", 0);
        v["notes"] = json!("PIN Change");
        let entry = extract_one(v);
        let note = entry.as_note().unwrap();
        assert_eq!(note.comment, "PIN Change");
        assert_eq!(note.account, ACCOUNT);
        assert!(note.meta.contains_key("bank_id"));
    }

    #[test]
    fn test_decline_note() {
        let mut v = txn("tx_d", -2000);
        v["merchant"] = json!({ "name": "Trainline" });
        v["decline_reason"] = json!("INSUFFICIENT_FUNDS");
        let entry = extract_one(v);
        assert_eq!(
            entry.as_note().unwrap().comment,
            "Trainline transaction declined with reason INSUFFICIENT_FUNDS"
        );

        let mut v = txn("tx_e", -2000);
        v["decline_reason"] = json!("CARD_BLOCKED");
        let entry = extract_one(v);
        assert_eq!(
            entry.as_note().unwrap().comment,
            "RAW tx_e transaction declined with reason CARD_BLOCKED"
        );
    }

    #[test]
    fn test_zero_local_amount_has_no_price() {
        let mut v = txn("tx_check", 0);
        v["local_amount"] = json!(0);
        v["local_currency"] = json!("USD");
        let entry = extract_one(v);
        let t = entry.as_transaction().unwrap();
        assert!(t.postings[0].price.is_none());
        assert!(t.check_postings().is_ok());
    }

    #[test]
    fn test_foreign_spend_has_price() {
        let mut v = txn("tx_fx", -850);
        v["local_amount"] = json!(-1000);
        v["local_currency"] = json!("EUR");
        let entry = extract_one(v);
        let price = entry.as_transaction().unwrap().postings[0].price.clone().unwrap();
        assert_eq!(price.currency, "EUR");
        assert_eq!(price.number, Decimal::new(117647, 5));
    }
}
