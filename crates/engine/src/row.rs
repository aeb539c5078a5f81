//! The common materialization pipeline: every format pipeline reduces a data
//! row to raw field texts and runs them through `materialize`.

use rust_decimal::Decimal;

use passbook_core::types::ParsedRow;
use passbook_core::{numeric, payin, reference, timestamp};

use crate::profile::{CommonSpec, RowStop};

/// Raw cell text per mapped semantic field, for one data row. `None` means
/// the field is unmapped or unreadable for this row; mapped-but-blank cells
/// arrive as `Some("")`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRow {
    pub date: Option<String>,
    pub time: Option<String>,
    pub reference: Option<String>,
    pub credit: Option<String>,
    pub debit: Option<String>,
    pub amount: Option<String>,
    pub balance: Option<String>,
}

/// Decide whether emission stops at this row, before materializing it.
pub(crate) fn should_stop(cells: &[String], stop: &RowStop) -> bool {
    match stop {
        RowStop::None => false,
        RowStop::BlankRow => cells.iter().all(|cell| cell.trim().is_empty()),
        RowStop::UntilRegex(pattern) => {
            let line = cells
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            pattern.is_match(&line)
        }
    }
}

/// Run one row through amount derivation, date parsing, reference splitting
/// and pay-in classification. `credit_debit_mapped` says whether the header
/// mapping (or PDF line pattern) carries a credit or debit column; when it
/// does, the amount is credit − debit with nulls zeroed. Returns `None` for
/// rows that cannot yield an amount or a timestamp — those are dropped, not
/// errors.
pub(crate) fn materialize(
    raw: &RawRow,
    credit_debit_mapped: bool,
    spec: &CommonSpec,
) -> Option<ParsedRow> {
    let amount = if credit_debit_mapped {
        let credit = parse_cell(&raw.credit, spec).unwrap_or(Decimal::ZERO);
        let debit = parse_cell(&raw.debit, spec).unwrap_or(Decimal::ZERO);
        credit - debit
    } else {
        parse_cell(&raw.amount, spec)?
    };

    let transaction_date_time =
        timestamp::parse_date_time(raw.date.as_deref(), raw.time.as_deref(), &spec.date)?;

    let reference_text = raw.reference.clone().unwrap_or_default();
    let split = reference::split(&reference_text, &spec.reference);
    let pay_in = payin::classify(
        amount,
        split.order_id.as_deref(),
        split.utr.as_deref(),
        &reference_text,
        &spec.pay_in,
    );

    Some(ParsedRow {
        transaction_date_time,
        amount,
        balance: parse_cell(&raw.balance, spec),
        reference: reference_text,
        order_id: split.order_id,
        utr: split.utr,
        pay_in,
    })
}

fn parse_cell(value: &Option<String>, spec: &CommonSpec) -> Option<Decimal> {
    numeric::parse_decimal(value.as_deref()?, &spec.numeric)
}
