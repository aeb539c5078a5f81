use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format a statement document arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Csv,
    Xls,
    Xlsx,
    Pdf,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatKind::Csv => "csv",
            FormatKind::Xls => "xls",
            FormatKind::Xlsx => "xlsx",
            FormatKind::Pdf => "pdf",
        })
    }
}

/// The closed vocabulary of columns the engine understands. Ordering is the
/// canonical tie-break order used when mapping header columns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SemanticField {
    Date,
    Time,
    Reference,
    Credit,
    Debit,
    Amount,
    Balance,
}

impl SemanticField {
    pub const ALL: [SemanticField; 7] = [
        SemanticField::Date,
        SemanticField::Time,
        SemanticField::Reference,
        SemanticField::Credit,
        SemanticField::Debit,
        SemanticField::Amount,
        SemanticField::Balance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SemanticField::Date => "date",
            SemanticField::Time => "time",
            SemanticField::Reference => "reference",
            SemanticField::Credit => "credit",
            SemanticField::Debit => "debit",
            SemanticField::Amount => "amount",
            SemanticField::Balance => "balance",
        }
    }

    /// True for fields whose values must parse as decimals.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SemanticField::Credit
                | SemanticField::Debit
                | SemanticField::Amount
                | SemanticField::Balance
        )
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemanticField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("unknown semantic field: '{s}'"))
    }
}

/// One normalized statement row, in document order. Amount is signed:
/// positive means a credit relative to the statement's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRow {
    pub transaction_date_time: NaiveDateTime,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
    pub reference: String,
    pub order_id: Option<String>,
    pub utr: Option<String>,
    pub pay_in: bool,
}
