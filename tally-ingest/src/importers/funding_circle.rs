//! Funding Circle lender statement importer
//!
//! Statements are exported from the lender statement page as
//! `statement_YYYY-MM_YYYY-MM-DD_HH-MM-SS.csv`:
//!   Date,Description,Paid In,Paid Out
//!   2021-02-01,Interest repayment for loan part 123456,0.42,
//!   2021-02-01,Servicing fee for Loan Part ID 123456,,0.01

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_core::{Amount, Entry, Flag, Metadata, Posting, Transaction, parse_day_first, parse_decimal};
use tracing::{debug, warn};

use crate::importer::Importer;
use crate::importers::{csv_reader, matches};
use crate::source::SourceFile;

const FILENAME_PATTERN: &str =
    r"^statement_\d{4}-\d{2}_\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}\.csv$";
const HEADER: &str = "Date,Description,Paid In,Paid Out";
const CURRENCY: &str = "GBP";
const PAYEE: &str = "Funding Circle";

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Paid In", default)]
    paid_in: String,
    #[serde(rename = "Paid Out", default)]
    paid_out: String,
}

/// What a statement line represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Transfer,
    Loan,
    Interest,
    Fee,
    UnknownIncome,
    UnknownExpense,
    /// Zero-amount line nothing else claimed
    Unknown,
}

#[derive(Debug, Clone, Copy)]
enum SignGuard {
    Any,
    Positive,
    Negative,
}

impl SignGuard {
    fn allows(self, amount: Decimal) -> bool {
        match self {
            SignGuard::Any => true,
            SignGuard::Positive => amount > Decimal::ZERO,
            SignGuard::Negative => amount < Decimal::ZERO,
        }
    }
}

struct Rule {
    pattern: Regex,
    guard: SignGuard,
    category: Category,
}

/// Ordered description rules, first match wins. The sign-only fallbacks at
/// the end catch everything the prefixes miss.
struct Classifier {
    rules: Vec<Rule>,
    loan_part_id_re: Regex,
    loan_part_re: Regex,
}

impl Classifier {
    fn new() -> Result<Self> {
        let rule = |pattern: &str, guard, category| -> Result<Rule> {
            Ok(Rule {
                pattern: Regex::new(pattern)?,
                guard,
                category,
            })
        };

        Ok(Self {
            rules: vec![
                rule(r"^(EPDQ\+3DS|FC Len Withdrawal)", SignGuard::Any, Category::Transfer)?,
                rule(
                    concat!(
                        r"^(Loan Part|Principal repayment|Loan offer|",
                        r"Early principal repayment|Principal recovery repayment)"
                    ),
                    SignGuard::Any,
                    Category::Loan,
                )?,
                rule(
                    r"^(Interest repayment|Early interest repayment|Interest recovery repayment)",
                    SignGuard::Positive,
                    Category::Interest,
                )?,
                rule(r"^Servicing fee", SignGuard::Negative, Category::Fee)?,
                rule(r"", SignGuard::Positive, Category::UnknownIncome)?,
                rule(r"", SignGuard::Negative, Category::UnknownExpense)?,
            ],
            loan_part_id_re: Regex::new(r"Loan Part ID (\d+)")?,
            loan_part_re: Regex::new(r"loan part (\d+)")?,
        })
    }

    fn classify(&self, description: &str, amount: Decimal) -> Category {
        self.rules
            .iter()
            .find(|r| r.guard.allows(amount) && r.pattern.is_match(description))
            .map(|r| r.category)
            .unwrap_or(Category::Unknown)
    }

    fn loan_id<'a>(&self, description: &'a str) -> Option<&'a str> {
        self.loan_part_id_re
            .captures(description)
            .or_else(|| self.loan_part_re.captures(description))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Paid Out is money leaving the account; exactly one side is set per row.
fn signed_amount(paid_in: &str, paid_out: &str) -> Result<Decimal> {
    let out = parse_decimal(paid_out).context("Paid Out")?;
    if out > Decimal::ZERO {
        Ok(-out)
    } else {
        parse_decimal(paid_in).context("Paid In")
    }
}

#[derive(Debug, Clone)]
pub struct FundingCircleImporter {
    pub account: String,
    pub default_transfer_account: String,
    pub fee_account: String,
    pub interest_account: String,
    pub loan_account: String,
}

impl FundingCircleImporter {
    pub fn new(
        account: impl Into<String>,
        default_transfer_account: impl Into<String>,
        fee_account: impl Into<String>,
        interest_account: impl Into<String>,
        loan_account: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            default_transfer_account: default_transfer_account.into(),
            fee_account: fee_account.into(),
            interest_account: interest_account.into(),
            loan_account: loan_account.into(),
        }
    }

    fn row_to_transaction(
        &self,
        classifier: &Classifier,
        row: &Row,
        meta: Metadata,
    ) -> Result<Transaction> {
        let date = parse_day_first(&row.date)?;
        let desc = row.description.as_str();
        let amount = signed_amount(&row.paid_in, &row.paid_out)?;

        let category = classifier.classify(desc, amount);
        let mut payee = None;
        let mut narration = desc.to_string();
        let mut flag = Flag::Okay;

        let second_account = match category {
            Category::Transfer => {
                narration = "Transfer".to_string();
                self.default_transfer_account.as_str()
            }
            Category::Loan => self.loan_account.as_str(),
            Category::Interest => {
                payee = Some(PAYEE.to_string());
                self.interest_account.as_str()
            }
            Category::Fee => {
                payee = Some(PAYEE.to_string());
                self.fee_account.as_str()
            }
            Category::UnknownIncome => {
                flag = Flag::Warning;
                "Income:Unknown"
            }
            Category::UnknownExpense => {
                flag = Flag::Warning;
                "Expenses:Unknown"
            }
            Category::Unknown => "Unknown",
        };

        if flag == Flag::Warning {
            warn!(description = desc, %amount, "unrecognised Funding Circle line, flagged for review");
        }

        let mut meta = meta;
        if narration != desc {
            meta.insert("description", desc);
        }

        let mut txn = Transaction::new(
            meta,
            date,
            flag,
            vec![
                Posting::new(&self.account, Some(Amount::new(amount, CURRENCY))),
                Posting::new(second_account, None),
            ],
        );
        txn.payee = payee;
        txn.narration = Some(narration);
        if let Some(id) = classifier.loan_id(desc) {
            txn.links.insert(format!("loan_{id}"));
        }

        Ok(txn)
    }
}

impl Importer for FundingCircleImporter {
    fn name(&self) -> String {
        format!("tally_ingest.funding_circle: \"{}\"", self.account)
    }

    fn identify(&self, file: &SourceFile) -> bool {
        matches(FILENAME_PATTERN, file.basename()) && file.head().starts_with(HEADER)
    }

    fn extract(&self, file: &SourceFile) -> Result<Vec<Entry>> {
        let classifier = Classifier::new()?;
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

            let txn = self
                .row_to_transaction(&classifier, &row, Metadata::new(&filename, lineno))
                .with_context(|| format!("{filename}:{lineno}: {:?}", row.description))?;
            entries.push(Entry::Transaction(txn));
        }

        debug!(file = %filename, count = entries.len(), "extracted Funding Circle statement");
        Ok(entries)
    }

    fn file_account(&self, _file: &SourceFile) -> String {
        self.account.clone()
    }

    fn file_name(&self, _file: &SourceFile) -> Option<String> {
        Some("csv".to_string())
    }

    /// First day of the statement month encoded in the filename
    fn file_date(&self, file: &SourceFile) -> Result<NaiveDate> {
        let re = Regex::new(r"^statement_(\d{4})-(\d{2})_")?;
        let name = file.basename();
        let caps = re
            .captures(name)
            .with_context(|| format!("no statement month in {name:?}"))?;
        let year: i32 = caps[1].parse()?;
        let month: u32 = caps[2].parse()?;
        NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("invalid statement month in {name:?}"))
    }
}
