//! Header resolution: turn a band of raw header rows into a mapping from
//! semantic field to source column, plus the row the data starts at.

use std::collections::BTreeMap;

use passbook_core::error::{EngineError, SourceLocation};
use passbook_core::types::{FormatKind, SemanticField};

use crate::profile::{HeaderSpec, SearchBand, SearchSpec};

/// Field → source column. A field maps to at most one column; the first
/// candidate column (left to right) wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    columns: BTreeMap<SemanticField, usize>,
}

impl HeaderMapping {
    pub fn column(&self, field: SemanticField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: SemanticField) -> bool {
        self.columns.contains_key(&field)
    }

    /// A mapping can drive materialization only with a date, a reference,
    /// and some way to derive an amount.
    pub fn is_sufficient(&self) -> bool {
        self.contains(SemanticField::Date)
            && self.contains(SemanticField::Reference)
            && (self.contains(SemanticField::Amount)
                || self.contains(SemanticField::Credit)
                || self.contains(SemanticField::Debit))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticField, usize)> + '_ {
        self.columns.iter().map(|(field, col)| (*field, *col))
    }

    fn insert_if_absent(&mut self, field: SemanticField, col: usize) {
        self.columns.entry(field).or_insert(col);
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(SemanticField, usize)]) -> Self {
        let mut mapping = Self::default();
        for &(field, col) in pairs {
            mapping.insert_if_absent(field, col);
        }
        mapping
    }
}

/// How header text is matched against synonyms. Delimited documents need
/// the whole (merged) cell to equal a synonym; spreadsheet bands allow
/// substring matches ranked by the longest synonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchMode {
    Exact,
    Substring,
}

/// Outcome of header resolution for one document.
#[derive(Debug, Clone)]
pub(crate) struct HeaderContext {
    pub mapping: HeaderMapping,
    pub data_start_row: usize,
    /// Merged band text per column, after rightward propagation. Present
    /// only for spreadsheet SEARCH resolution; it guards neighbor probing.
    pub band: Option<Vec<String>>,
}

/// Lowercase, fold no-break spaces, trim, collapse whitespace runs.
pub(crate) fn normalize(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn resolve(
    rows: &[Vec<String>],
    spec: &HeaderSpec,
    mode: MatchMode,
    parser_key: &str,
    format: FormatKind,
) -> Result<HeaderContext, EngineError> {
    match spec {
        HeaderSpec::Fixed { row_start, columns } => {
            let mut mapping = HeaderMapping::default();
            for (&field, &col) in columns {
                mapping.insert_if_absent(field, col);
            }
            if !mapping.is_sufficient() {
                return Err(EngineError::HeaderMappingInsufficient {
                    parser_key: parser_key.to_string(),
                    format,
                    location: SourceLocation::Row(*row_start),
                });
            }
            Ok(HeaderContext { mapping, data_start_row: *row_start, band: None })
        }
        HeaderSpec::Search(search) => resolve_search(rows, search, mode, parser_key, format),
    }
}

fn resolve_search(
    rows: &[Vec<String>],
    search: &SearchSpec,
    mode: MatchMode,
    parser_key: &str,
    format: FormatKind,
) -> Result<HeaderContext, EngineError> {
    let mrc = search.multi_row_count;
    match search.band {
        SearchBand::FixedRows { from } => {
            let band_end = from + mrc - 1;
            let (mapping, band) = merge_and_map(rows, from, band_end, search, mode);
            if !mapping.is_sufficient() {
                return Err(EngineError::HeaderMappingInsufficient {
                    parser_key: parser_key.to_string(),
                    format,
                    location: SourceLocation::Row(from),
                });
            }
            Ok(context(mapping, band, band_end, search, mode))
        }
        SearchBand::Scan { from, to } => {
            if to + 1 >= from + mrc {
                for start in from..=(to + 1 - mrc) {
                    let band_end = start + mrc - 1;
                    let (mapping, band) = merge_and_map(rows, start, band_end, search, mode);
                    if mapping.is_sufficient() {
                        tracing::debug!(start, band_end, "header band matched");
                        return Ok(context(mapping, band, band_end, search, mode));
                    }
                }
            }
            Err(EngineError::HeaderNotFound {
                parser_key: parser_key.to_string(),
                format,
                from,
                to,
            })
        }
    }
}

fn context(
    mapping: HeaderMapping,
    band: Vec<String>,
    band_end: usize,
    search: &SearchSpec,
    mode: MatchMode,
) -> HeaderContext {
    HeaderContext {
        mapping,
        data_start_row: band_end + search.row_start_offset,
        band: (mode == MatchMode::Substring).then_some(band),
    }
}

fn merge_and_map(
    rows: &[Vec<String>],
    from: usize,
    to: usize,
    search: &SearchSpec,
    mode: MatchMode,
) -> (HeaderMapping, Vec<String>) {
    let mut band = merge_band(rows, from, to, &search.merge_separator);
    if mode == MatchMode::Substring {
        propagate_right(&mut band);
    }
    let mapping = map_band(&band, &search.expect, mode);
    (mapping, band)
}

/// Merged header text per column: the non-blank trimmed cell texts of the
/// band rows, top to bottom, joined by the merge separator.
fn merge_band(rows: &[Vec<String>], from: usize, to: usize, join: &str) -> Vec<String> {
    let width = rows
        .iter()
        .skip(from)
        .take(to.saturating_sub(from) + 1)
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut band = vec![String::new(); width];
    for (col, merged) in band.iter_mut().enumerate() {
        for row in from..=to {
            let Some(cell) = rows.get(row).and_then(|cells| cells.get(col)) else {
                continue;
            };
            let cell = cell.replace('\u{a0}', " ");
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            if !merged.is_empty() {
                merged.push_str(join);
            }
            merged.push_str(cell);
        }
    }
    band
}

/// Carry non-empty header text rightward into empty columns until the next
/// non-empty one. Reconstructs visually merged header bands, where only the
/// leftmost cell of a span holds the label.
fn propagate_right(band: &mut [String]) {
    let mut last = String::new();
    for text in band.iter_mut() {
        if !text.trim().is_empty() {
            last.clone_from(text);
        } else if !last.is_empty() {
            text.clone_from(&last);
        }
    }
}

fn map_band(
    band: &[String],
    expect: &BTreeMap<SemanticField, Vec<String>>,
    mode: MatchMode,
) -> HeaderMapping {
    let mut mapping = HeaderMapping::default();
    for (col, text) in band.iter().enumerate() {
        let text = normalize(text);
        if text.is_empty() {
            continue;
        }
        match mode {
            MatchMode::Exact => {
                for (&field, synonyms) in expect {
                    if synonyms.iter().any(|syn| normalize(syn) == text) {
                        mapping.insert_if_absent(field, col);
                    }
                }
            }
            MatchMode::Substring => {
                if let Some(field) = best_substring_match(&text, expect) {
                    mapping.insert_if_absent(field, col);
                }
            }
        }
    }
    mapping
}

/// The field whose synonym matches this column most specifically: longest
/// contained synonym wins, first field in canonical order breaks ties.
fn best_substring_match(
    text: &str,
    expect: &BTreeMap<SemanticField, Vec<String>>,
) -> Option<SemanticField> {
    let mut best: Option<(SemanticField, usize)> = None;
    for (&field, synonyms) in expect {
        for synonym in synonyms {
            let synonym = normalize(synonym);
            if synonym.is_empty() || !text.contains(&synonym) {
                continue;
            }
            if best.map_or(true, |(_, len)| synonym.len() > len) {
                best = Some((field, synonym.len()));
            }
        }
    }
    best.map(|(field, _)| field)
}

/// True when a header-band column's text belongs to the given field, i.e.
/// contains one of its synonyms.
pub(crate) fn band_text_matches_field(
    text: &str,
    field: SemanticField,
    expect: &BTreeMap<SemanticField, Vec<String>>,
) -> bool {
    let text = normalize(text);
    expect.get(&field).is_some_and(|synonyms| {
        synonyms.iter().any(|synonym| {
            let synonym = normalize(synonym);
            !synonym.is_empty() && text.contains(&synonym)
        })
    })
}
