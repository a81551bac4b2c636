//! Lendy (formerly Saving Stream) transaction export importer
//!
//! Exports are named `Lendy_Statement_YYYYMMDD-YYYYMMDD.csv` and carry one row
//! per account movement. Dates are day-first.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use tally_core::{Amount, Entry, Flag, Metadata, Posting, Transaction, parse_day_first, parse_decimal};
use tracing::{debug, warn};

use crate::importer::Importer;
use crate::importers::{csv_reader, matches};
use crate::source::SourceFile;

const FILENAME_PATTERN: &str = r"^Lendy_Statement_\d{8}-\d{8}\.csv$";
const HEADER: &str = concat!(
    "Txn Date,Transaction type,Loan part ID,Loan part value,Loan part detail,",
    "Loan ID,Start date,End date,Txn Amount,Balance"
);
const CURRENCY: &str = "GBP";

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Txn Date")]
    txn_date: String,
    #[serde(rename = "Transaction type")]
    txn_type: String,
    #[serde(rename = "Loan part ID", default)]
    loan_part_id: String,
    #[serde(rename = "Loan part value", default)]
    loan_part_value: String,
    #[serde(rename = "Loan part detail", default)]
    loan_part_detail: String,
    #[serde(rename = "Start date", default)]
    start_date: String,
    #[serde(rename = "End date", default)]
    end_date: String,
    #[serde(rename = "Txn Amount")]
    txn_amount: String,
}

/// Where a row's counter-posting goes, keyed on the exact transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnKind {
    Loan,
    Transfer,
    Interest,
    Unknown,
}

impl TxnKind {
    /// `None` for running balance lines, which are not movements
    fn from_type(txn_type: &str) -> Option<Self> {
        match txn_type {
            "Opening Balance" | "Available Balance" => None,
            "Loan part fund" | "Capital repayment" | "Loan part sale" => Some(TxnKind::Loan),
            "Deposit" | "Withdrawal" => Some(TxnKind::Transfer),
            "Interest" => Some(TxnKind::Interest),
            _ => Some(TxnKind::Unknown),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LendyImporter {
    pub cash_account: String,
    pub loan_account: String,
    pub interest_account: String,
    pub transfer_account: String,
}

impl LendyImporter {
    pub fn new(
        cash_account: impl Into<String>,
        loan_account: impl Into<String>,
        interest_account: impl Into<String>,
        transfer_account: impl Into<String>,
    ) -> Self {
        Self {
            cash_account: cash_account.into(),
            loan_account: loan_account.into(),
            interest_account: interest_account.into(),
            transfer_account: transfer_account.into(),
        }
    }

    fn row_to_transaction(&self, kind: TxnKind, row: &Row, mut meta: Metadata) -> Result<Transaction> {
        let mut flag = Flag::Okay;
        let mut narration = row.loan_part_detail.clone();

        let second_account = match kind {
            TxnKind::Loan => self.loan_account.as_str(),
            TxnKind::Transfer => {
                narration = "Transfer".to_string();
                self.transfer_account.as_str()
            }
            TxnKind::Interest => self.interest_account.as_str(),
            TxnKind::Unknown => {
                warn!(txn_type = %row.txn_type, "unrecognised Lendy transaction type, flagged for review");
                flag = Flag::Warning;
                "Unknown"
            }
        };

        meta.insert("type", row.txn_type.as_str());
        if !row.start_date.trim().is_empty() {
            meta.insert("start_date", parse_day_first(&row.start_date).context("Start date")?);
        }
        if !row.end_date.trim().is_empty() {
            meta.insert("end_date", parse_day_first(&row.end_date).context("End date")?);
        }
        if !row.loan_part_value.trim().is_empty() {
            meta.insert(
                "loan_part_value",
                parse_decimal(&row.loan_part_value).context("Loan part value")?,
            );
        }

        let date = parse_day_first(&row.txn_date).context("Txn Date")?;
        let units = Amount::new(parse_decimal(&row.txn_amount).context("Txn Amount")?, CURRENCY);

        let mut txn = Transaction::new(
            meta,
            date,
            flag,
            vec![
                Posting::new(&self.cash_account, Some(units)),
                Posting::new(second_account, None),
            ],
        );
        txn.narration = Some(narration);
        if !row.loan_part_id.is_empty() {
            txn.links.insert(format!("loan_{}", row.loan_part_id));
        }

        Ok(txn)
    }
}

impl Importer for LendyImporter {
    fn name(&self) -> String {
        format!("tally_ingest.lendy: \"{}\"", self.cash_account)
    }

    fn identify(&self, file: &SourceFile) -> bool {
        matches(FILENAME_PATTERN, file.basename()) && file.head().starts_with(HEADER)
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Entry>> {
        let filename = file.display_name();
        let mut rdr = csv_reader(file);
        let headers = rdr.headers()?.clone();

        let mut entries = Vec::new();
        for result in rdr.records() {
            let record = result.with_context(|| format!("reading {filename}"))?;
            let lineno = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let row: Row = record
                .deserialize(Some(&headers))
                .with_context(|| format!("{filename}:{lineno}: malformed row"))?;

            let Some(kind) = TxnKind::from_type(&row.txn_type) else {
                debug!(lineno, txn_type = %row.txn_type, "skipping balance line");
                continue;
            };

            let txn = self
                .row_to_transaction(kind, &row, Metadata::new(&filename, lineno))
                .with_context(|| format!("{filename}:{lineno}: {:?}", row.txn_type))?;
            entries.push(Entry::Transaction(txn));
        }

        debug!(file = %filename, count = entries.len(), "extracted Lendy statement");
        Ok(entries)
    }

    fn file_account(&self, _file: &SourceFile) -> String {
        self.cash_account.clone()
    }

    fn file_name(&self, _file: &SourceFile) -> Option<String> {
        Some("csv".to_string())
    }

    /// End of the statement period encoded in the filename
    fn file_date(&self, file: &SourceFile) -> Result<NaiveDate> {
        let re = Regex::new(r"^Lendy_Statement_\d{8}-(\d{8})\.csv$")?;
        let name = file.basename();
        let caps = re
            .captures(name)
            .with_context(|| format!("no statement period in {name:?}"))?;
        NaiveDate::parse_from_str(&caps[1], "%Y%m%d")
            .with_context(|| format!("invalid statement end date in {name:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tally_core::MetaValue;

    const NAME: &str = "Lendy_Statement_20190101-20190131.csv";

    fn importer() -> LendyImporter {
        LendyImporter::new(
            "Assets:Lendy:Cash",
            "Assets:Lendy:Loans",
            "Income:Lendy:Interest",
            "Assets:Bank:Current",
        )
    }

    fn statement(rows: &[&str]) -> SourceFile {
        let mut body = format!("{HEADER}\n");
        for r in rows {
            body.push_str(r);
            body.push('\n');
        }
        SourceFile::from_contents(NAME, body)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_identify() {
        let imp = importer();
        assert!(imp.identify(&statement(&[])));
        assert!(!imp.identify(&SourceFile::from_contents("Lendy_Statement.csv", HEADER)));
        assert!(!imp.identify(&SourceFile::from_contents(NAME, "Date,Description\n")));
    }

    #[test]
    fn test_from_type() {
        assert_eq!(TxnKind::from_type("Opening Balance"), None);
        assert_eq!(TxnKind::from_type("Available Balance"), None);
        assert_eq!(TxnKind::from_type("Loan part sale"), Some(TxnKind::Loan));
        assert_eq!(TxnKind::from_type("Withdrawal"), Some(TxnKind::Transfer));
        assert_eq!(TxnKind::from_type("Interest"), Some(TxnKind::Interest));
        assert_eq!(TxnKind::from_type("opening balance"), Some(TxnKind::Unknown));
    }

    #[test]
    fn test_balance_rows_are_skipped() {
        let entries = importer()
            .extract(&statement(&[
                "01/01/2019,Opening Balance,,,,,,,0.00,100.00",
                "31/01/2019,Available Balance,,,,,,,0.00,100.00",
            ]))
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_interest_with_loan_metadata() {
        let entries = importer()
            .extract(&statement(&[
                "05/01/2019,Interest,LP-77,250.00,Bridge loan 12,L12,01/12/2018,01/06/2019,1.25,101.25",
            ]))
            .unwrap();
        let txn = entries[0].as_transaction().unwrap();

        assert_eq!(txn.date, ymd(2019, 1, 5));
        assert_eq!(txn.flag, Flag::Okay);
        assert_eq!(txn.narration.as_deref(), Some("Bridge loan 12"));
        assert_eq!(txn.postings[0].account, "Assets:Lendy:Cash");
        assert_eq!(txn.postings[0].units, Some(Amount::new(Decimal::new(125, 2), "GBP")));
        assert_eq!(txn.postings[1].account, "Income:Lendy:Interest");
        assert!(txn.links.contains("loan_LP-77"));

        let keys: Vec<_> = txn.meta.keys().collect();
        assert_eq!(keys, vec!["type", "start_date", "end_date", "loan_part_value"]);
        assert_eq!(txn.meta.get("start_date"), Some(&MetaValue::Date(ymd(2018, 12, 1))));
        assert_eq!(txn.meta.get("end_date"), Some(&MetaValue::Date(ymd(2019, 6, 1))));
        assert_eq!(
            txn.meta.get("loan_part_value"),
            Some(&MetaValue::Number(Decimal::new(25000, 2)))
        );
    }

    #[test]
    fn test_transfer_and_loan_rows() {
        let entries = importer()
            .extract(&statement(&[
                "02/01/2019,Deposit,,,Card deposit,,,,500.00,600.00",
                "03/01/2019,Loan part fund,LP-1,100.00,Bridge loan 1,L1,,,-100.00,500.00",
                "04/01/2019,Capital repayment,LP-1,,Bridge loan 1,L1,,,100.00,600.00",
                "06/01/2019,Withdrawal,,,Bank withdrawal,,,,-50.00,550.00",
            ]))
            .unwrap();
        assert_eq!(entries.len(), 4);

        let deposit = entries[0].as_transaction().unwrap();
        assert_eq!(deposit.narration.as_deref(), Some("Transfer"));
        assert_eq!(deposit.postings[1].account, "Assets:Bank:Current");
        assert!(deposit.links.is_empty());
        assert_eq!(deposit.meta.keys().collect::<Vec<_>>(), vec!["type"]);

        let fund = entries[1].as_transaction().unwrap();
        assert_eq!(fund.postings[1].account, "Assets:Lendy:Loans");
        assert_eq!(fund.postings[0].units.as_ref().unwrap().number, Decimal::new(-10000, 2));

        let withdrawal = entries[3].as_transaction().unwrap();
        assert_eq!(withdrawal.narration.as_deref(), Some("Transfer"));
    }

    #[test]
    fn test_blank_optional_cells_are_omitted() {
        let entries = importer()
            .extract(&statement(&["05/01/2019,Interest,LP-77, ,Bridge loan 12,L12, , ,1.25,101.25"]))
            .unwrap();
        let txn = entries[0].as_transaction().unwrap();
        assert_eq!(txn.meta.keys().collect::<Vec<_>>(), vec!["type"]);
    }

    #[test]
    fn test_unknown_type_is_flagged() {
        let entries = importer()
            .extract(&statement(&["07/01/2019,Promotion,,,Cashback,,,,5.00,555.00"]))
            .unwrap();
        let txn = entries[0].as_transaction().unwrap();
        assert_eq!(txn.flag, Flag::Warning);
        assert_eq!(txn.postings[1].account, "Unknown");
        assert_eq!(txn.meta.get("type"), Some(&MetaValue::Text("Promotion".to_string())));
    }

    #[test]
    fn test_bad_date_aborts() {
        let res = importer().extract(&statement(&["99/99/2019,Interest,,,x,,,,1.00,1.00"]));
        assert!(res.is_err());
    }

    #[test]
    fn test_file_date() {
        assert_eq!(importer().file_date(&statement(&[])).unwrap(), ymd(2019, 1, 31));
    }
}
