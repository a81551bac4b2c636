//! TOML importer configuration.
//!
//! ```toml
//! [[importer]]
//! kind = "monzo_debit"
//! account_id = "acc_00009abc"
//! account = "Assets:Monzo:Current"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::importer::Importer;
use crate::importers::{FundingCircleImporter, LendyImporter, MonzoDebitImporter, MonzoPrepaidImporter};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "importer")]
    pub importers: Vec<ImporterConfig>,
}

/// One configured importer and every account it posts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImporterConfig {
    FundingCircle {
        account: String,
        default_transfer_account: String,
        fee_account: String,
        interest_account: String,
        loan_account: String,
    },
    Lendy {
        cash_account: String,
        loan_account: String,
        interest_account: String,
        transfer_account: String,
    },
    MonzoDebit {
        account_id: String,
        account: String,
    },
    MonzoPrepaid {
        account_id: String,
        account: String,
        default_transfer_account: String,
    },
}

impl ImporterConfig {
    pub fn build(&self) -> Box<dyn Importer> {
        match self.clone() {
            ImporterConfig::FundingCircle {
                account,
                default_transfer_account,
                fee_account,
                interest_account,
                loan_account,
            } => Box::new(FundingCircleImporter::new(
                account,
                default_transfer_account,
                fee_account,
                interest_account,
                loan_account,
            )),
            ImporterConfig::Lendy {
                cash_account,
                loan_account,
                interest_account,
                transfer_account,
            } => Box::new(LendyImporter::new(
                cash_account,
                loan_account,
                interest_account,
                transfer_account,
            )),
            ImporterConfig::MonzoDebit { account_id, account } => {
                Box::new(MonzoDebitImporter::new(account_id, account))
            }
            ImporterConfig::MonzoPrepaid {
                account_id,
                account,
                default_transfer_account,
            } => Box::new(MonzoPrepaidImporter::new(
                account_id,
                account,
                default_transfer_account,
            )),
        }
    }
}

impl Config {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse importer config")
    }

    /// Instantiate every configured importer, in file order
    pub fn importers(&self) -> Vec<Box<dyn Importer>> {
        self.importers.iter().map(ImporterConfig::build).collect()
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let p = path.as_ref();
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    Config::parse(&s).with_context(|| format!("in {}", p.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[importer]]
kind = "monzo_debit"
account_id = "acc_00009abc"
account = "Assets:Monzo:Current"

[[importer]]
kind = "funding_circle"
account = "Assets:FundingCircle:Cash"
default_transfer_account = "Assets:Bank:Current"
fee_account = "Expenses:FundingCircle:Fees"
interest_account = "Income:FundingCircle:Interest"
loan_account = "Assets:FundingCircle:Loans"
"#;

    #[test]
    fn test_parse_and_build() {
        let cfg = Config::parse(SAMPLE).unwrap();
        assert_eq!(cfg.importers.len(), 2);
        assert_eq!(
            cfg.importers[0],
            ImporterConfig::MonzoDebit {
                account_id: "acc_00009abc".to_string(),
                account: "Assets:Monzo:Current".to_string(),
            }
        );

        let importers = cfg.importers();
        assert_eq!(importers[0].name(), "tally_ingest.monzo_debit: \"Assets:Monzo:Current\"");
        assert_eq!(
            importers[1].name(),
            "tally_ingest.funding_circle: \"Assets:FundingCircle:Cash\""
        );
    }

    #[test]
    fn test_missing_account_is_an_error() {
        let err = Config::parse("[[importer]]\nkind = \"lendy\"\ncash_account = \"Assets:Lendy\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        assert!(Config::parse("[[importer]]\nkind = \"barclays\"\n").is_err());
    }

    #[test]
    fn test_empty_config() {
        assert!(Config::parse("").unwrap().importers().is_empty());
    }
}
