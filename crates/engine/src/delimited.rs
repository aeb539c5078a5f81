//! Delimited (CSV) pipeline: decode, read every record up front (header
//! search needs back-scanning), resolve the header band, then materialize.

use csv::ReaderBuilder;

use passbook_core::error::EngineError;
use passbook_core::types::{FormatKind, ParsedRow, SemanticField};

use crate::header::{self, MatchMode};
use crate::profile::DelimitedProfile;
use crate::row::{self, RawRow};

pub(crate) fn parse(
    bytes: &[u8],
    profile: &DelimitedProfile,
    parser_key: &str,
    format: FormatKind,
) -> Result<Vec<ParsedRow>, EngineError> {
    let (text, _, _) = profile.charset.decode(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(profile.delimiter)
        .from_reader(text.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::IoFailure {
            parser_key: parser_key.to_string(),
            format,
            detail: format!("csv read failed at row {}: {e}", records.len()),
        })?;
        records.push(record.iter().map(str::to_string).collect());
    }

    let ctx = header::resolve(&records, &profile.headers, MatchMode::Exact, parser_key, format)?;
    let credit_debit_mapped = ctx.mapping.contains(SemanticField::Credit)
        || ctx.mapping.contains(SemanticField::Debit);
    let start = ctx.data_start_row.max(profile.skip_rows);

    let mut rows = Vec::new();
    for cells in records.iter().skip(start) {
        if row::should_stop(cells, &profile.common.row_stop) {
            break;
        }
        let read = |field: SemanticField| -> Option<String> {
            let col = ctx.mapping.column(field)?;
            cells.get(col).map(|cell| cell.trim().to_string())
        };
        let raw = RawRow {
            date: read(SemanticField::Date),
            time: read(SemanticField::Time),
            reference: read(SemanticField::Reference),
            credit: read(SemanticField::Credit),
            debit: read(SemanticField::Debit),
            amount: read(SemanticField::Amount),
            balance: read(SemanticField::Balance),
        };
        if let Some(parsed) = row::materialize(&raw, credit_debit_mapped, &profile.common) {
            rows.push(parsed);
        }
    }
    Ok(rows)
}
