//! PDF pipeline: extract the text layer, clip it between the configured
//! start/stop patterns, and materialize every line the line pattern fully
//! matches. There is no header resolution — the pattern's named groups are
//! the mapping.

use regex::{Captures, Regex};

use passbook_core::error::EngineError;
use passbook_core::types::{FormatKind, ParsedRow};

use crate::profile::{PdfProfile, RowStop};
use crate::row::{self, RawRow};

pub(crate) fn parse(
    bytes: &[u8],
    profile: &PdfProfile,
    parser_key: &str,
    format: FormatKind,
) -> Result<Vec<ParsedRow>, EngineError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| EngineError::IoFailure {
        parser_key: parser_key.to_string(),
        format,
        detail: format!("text layer extraction failed: {e}"),
    })?;
    Ok(parse_text(&text, profile))
}

/// Text-level half of the pipeline, independent of the PDF library.
pub(crate) fn parse_text(text: &str, profile: &PdfProfile) -> Vec<ParsedRow> {
    let mut body = text;
    if let Some(start) = &profile.start_after {
        if let Some(found) = start.find(body) {
            body = &body[found.end()..];
        }
    }
    if let Some(stop) = &profile.stop_before {
        if let Some(found) = stop.find(body) {
            body = &body[..found.start()];
        }
    }

    let credit_debit_mapped =
        has_group(&profile.line_pattern, "credit") || has_group(&profile.line_pattern, "debit");

    let mut rows = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let RowStop::UntilRegex(stop) = &profile.common.row_stop {
            if stop.is_match(line) {
                break;
            }
        }
        let Some(caps) = full_match(&profile.line_pattern, line) else {
            continue;
        };
        let raw = RawRow {
            date: group(&caps, &["date"]),
            time: group(&caps, &["time"]),
            reference: group(&caps, &["ref", "reference"]),
            credit: group(&caps, &["credit"]),
            debit: group(&caps, &["debit"]),
            amount: group(&caps, &["amount"]),
            balance: group(&caps, &["balance"]),
        };
        if let Some(parsed) = row::materialize(&raw, credit_debit_mapped, &profile.common) {
            rows.push(parsed);
        }
    }
    rows
}

/// The line pattern is anchored: a match must cover the whole line.
fn full_match<'t>(pattern: &Regex, line: &'t str) -> Option<Captures<'t>> {
    let caps = pattern.captures(line)?;
    let whole = caps.get(0)?;
    (whole.start() == 0 && whole.end() == line.len()).then_some(caps)
}

fn has_group(pattern: &Regex, name: &str) -> bool {
    pattern.capture_names().flatten().any(|group| group == name)
}

fn group(caps: &Captures<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| caps.name(name))
        .map(|m| m.as_str().trim().to_string())
}
