//! Spreadsheet (XLS/XLSX) pipeline. The workbook is buffered and densified
//! into a `Grid` of cell texts plus the merged-region table; header
//! resolution and the guarded neighbor probe run against the grid, so the
//! calamine adapter stays a thin shell.

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Dimensions, Reader, Sheets};

use passbook_core::error::EngineError;
use passbook_core::numeric;
use passbook_core::types::{FormatKind, ParsedRow, SemanticField};

use crate::header::{self, HeaderContext, MatchMode};
use crate::profile::{HeaderSpec, SheetProfile};
use crate::row::{self, RawRow};

/// How many columns to probe left/right of a mapped column whose cell is
/// blank, before giving up on the field for that row.
const NEIGHBOR_PROBE_RADIUS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl Region {
    fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    fn spans_col(&self, col: usize) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }
}

/// Dense cell-text view of one worksheet.
#[derive(Debug, Clone, Default)]
pub(crate) struct Grid {
    rows: Vec<Vec<String>>,
    merges: Vec<Region>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>, merges: Vec<Region>) -> Self {
        Self { rows, merges }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_cells(&self, row: usize) -> &[String] {
        self.rows.get(row).map_or(&[], Vec::as_slice)
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    fn merged_region(&self, row: usize, col: usize) -> Option<&Region> {
        self.merges.iter().find(|region| region.contains(row, col))
    }

    /// The cell's own text, or the top-left text of the merged region the
    /// cell sits in.
    fn cell_or_merged_top_left(&self, row: usize, col: usize) -> Option<String> {
        if let Some(value) = self.cell(row, col) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        let region = self.merged_region(row, col)?;
        let value = self.cell(region.first_row, region.first_col)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

pub(crate) fn parse(
    bytes: Vec<u8>,
    profile: &SheetProfile,
    parser_key: &str,
    format: FormatKind,
) -> Result<Vec<ParsedRow>, EngineError> {
    let grid = load_grid(bytes, profile.sheet_index, parser_key, format)?;
    parse_grid(&grid, profile, parser_key, format)
}

pub(crate) fn parse_grid(
    grid: &Grid,
    profile: &SheetProfile,
    parser_key: &str,
    format: FormatKind,
) -> Result<Vec<ParsedRow>, EngineError> {
    let ctx = header::resolve(
        grid.rows(),
        &profile.headers,
        MatchMode::Substring,
        parser_key,
        format,
    )?;
    let expect = match &profile.headers {
        HeaderSpec::Search(search) => Some(&search.expect),
        HeaderSpec::Fixed { .. } => None,
    };
    let credit_debit_mapped = ctx.mapping.contains(SemanticField::Credit)
        || ctx.mapping.contains(SemanticField::Debit);

    let mut rows = Vec::new();
    for r in ctx.data_start_row..grid.row_count() {
        if row::should_stop(grid.row_cells(r), &profile.common.row_stop) {
            break;
        }
        let read = |field: SemanticField| read_flexible(grid, r, field, &ctx, expect, profile);
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

// ── Flexible cell read ────────────────────────────────────────────────────────

/// Read the value for a mapped field: the cell itself (or its merged
/// region's top-left), then up to `NEIGHBOR_PROBE_RADIUS` columns right and
/// left. Probing stops dead at a forbidden neighbor, so values are never
/// taken from a column owned by another field — mapped or not.
fn read_flexible(
    grid: &Grid,
    row: usize,
    field: SemanticField,
    ctx: &HeaderContext,
    expect: Option<&BTreeMap<SemanticField, Vec<String>>>,
    profile: &SheetProfile,
) -> Option<String> {
    let col = ctx.mapping.column(field)?;

    let direct = grid.cell_or_merged_top_left(row, col);
    if acceptable(direct.as_deref(), field, profile) {
        return direct;
    }

    for probe in (col + 1)..=(col + NEIGHBOR_PROBE_RADIUS) {
        if forbidden_neighbor(grid, row, probe, field, ctx, expect) {
            break;
        }
        let value = grid.cell_or_merged_top_left(row, probe);
        if acceptable(value.as_deref(), field, profile) {
            return value;
        }
    }

    for probe in (col.saturating_sub(NEIGHBOR_PROBE_RADIUS)..col).rev() {
        if forbidden_neighbor(grid, row, probe, field, ctx, expect) {
            break;
        }
        let value = grid.cell_or_merged_top_left(row, probe);
        if acceptable(value.as_deref(), field, profile) {
            return value;
        }
    }

    None
}

fn acceptable(value: Option<&str>, field: SemanticField, profile: &SheetProfile) -> bool {
    let Some(value) = value else { return false };
    if value.trim().is_empty() {
        return false;
    }
    if field.is_numeric() {
        return numeric::parse_decimal(value, &profile.common.numeric).is_some();
    }
    true
}

/// A probed column is out of bounds for the current field when:
/// (A) it is another field's mapped header column;
/// (B) it sits in a merged region spanning another mapped field's column;
/// (C) its header-band text is non-empty and matches none of the current
///     field's synonyms (a real, unmapped column such as "Instrument Id").
fn forbidden_neighbor(
    grid: &Grid,
    row: usize,
    probe_col: usize,
    current: SemanticField,
    ctx: &HeaderContext,
    expect: Option<&BTreeMap<SemanticField, Vec<String>>>,
) -> bool {
    if let (Some(band), Some(expect)) = (ctx.band.as_ref(), expect) {
        if let Some(text) = band.get(probe_col) {
            if !text.trim().is_empty() && !header::band_text_matches_field(text, current, expect) {
                return true;
            }
        }
    }

    for (field, header_col) in ctx.mapping.iter() {
        if field == current {
            continue;
        }
        if header_col == probe_col {
            return true;
        }
        if let Some(region) = grid.merged_region(row, probe_col) {
            if region.spans_col(header_col) {
                return true;
            }
        }
    }
    false
}

// ── calamine adapter ──────────────────────────────────────────────────────────

pub(crate) fn load_grid(
    bytes: Vec<u8>,
    sheet_index: usize,
    parser_key: &str,
    format: FormatKind,
) -> Result<Grid, EngineError> {
    let fail = |detail: String| EngineError::IoFailure {
        parser_key: parser_key.to_string(),
        format,
        detail,
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| fail(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let sheet_name = sheet_names
        .get(sheet_index)
        .cloned()
        .ok_or_else(|| fail(format!("workbook has no sheet at index {sheet_index}")))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| fail(e.to_string()))?;
    let merges = merged_regions(&mut workbook, &sheet_name);

    let mut rows = Vec::new();
    if let Some((end_row, end_col)) = range.end() {
        rows.reserve(end_row as usize + 1);
        for r in 0..=end_row {
            let mut cells = Vec::with_capacity(end_col as usize + 1);
            for c in 0..=end_col {
                let text = range.get_value((r, c)).map(cell_text).unwrap_or_default();
                cells.push(text);
            }
            rows.push(cells);
        }
    }
    Ok(Grid::new(rows, merges))
}

fn merged_regions(workbook: &mut Sheets<Cursor<Vec<u8>>>, sheet_name: &str) -> Vec<Region> {
    match workbook {
        Sheets::Xlsx(xlsx) => {
            if xlsx.load_merged_regions().is_err() {
                return Vec::new();
            }
            xlsx.merged_regions()
                .iter()
                .filter(|(name, _, _)| name.as_str() == sheet_name)
                .map(|(_, _, dimensions)| region_from(dimensions))
                .collect()
        }
        Sheets::Xls(xls) => xls
            .worksheet_merge_cells(sheet_name)
            .map(|regions| regions.iter().map(region_from).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn region_from(dimensions: &Dimensions) -> Region {
    Region {
        first_row: dimensions.start.0 as usize,
        last_row: dimensions.end.0 as usize,
        first_col: dimensions.start.1 as usize,
        last_col: dimensions.end.1 as usize,
    }
}

/// Lossless text of a native cell: date-formatted cells become ISO
/// local-date-time, other numeric cells the shortest plain decimal (f64
/// `Display` never uses an exponent).
fn cell_text(value: &Data) -> String {
    match value {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|stamp| stamp.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::numeric::NumericFormat;
    use passbook_core::payin::PayInRule;
    use passbook_core::reference::ReferenceSpec;
    use passbook_core::timestamp::{DateInput, DateSpec};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::profile::{CommonSpec, RowStop, SearchBand, SearchSpec};
    use SemanticField::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn grid_rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|cells| cells.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn expect() -> BTreeMap<SemanticField, Vec<String>> {
        let mut map = BTreeMap::new();
        map.insert(Date, vec!["Date".to_string()]);
        map.insert(Reference, vec!["Narration".to_string()]);
        map.insert(Credit, vec!["Credit".to_string()]);
        map.insert(Debit, vec!["Debit".to_string()]);
        map.insert(Balance, vec!["Balance".to_string()]);
        map
    }

    fn profile(band: SearchBand, mrc: usize) -> SheetProfile {
        SheetProfile {
            headers: HeaderSpec::Search(SearchSpec {
                band,
                multi_row_count: mrc,
                merge_separator: " ".to_string(),
                row_start_offset: 1,
                expect: expect(),
            }),
            sheet_index: 0,
            common: CommonSpec {
                numeric: NumericFormat::default(),
                date: DateSpec::default(),
                reference: ReferenceSpec::default(),
                pay_in: PayInRule::AmountPositive,
                row_stop: RowStop::None,
            },
        }
    }

    // ── merged-band header and propagation, end to end ───────────────────────

    #[test]
    fn visually_merged_header_band_still_maps() {
        // Row 0: "Transaction Details" merged across columns 1..=3 (value in
        // the top-left cell only). Row 1 carries the real labels.
        let grid = Grid::new(
            grid_rows(&[
                &["", "Transaction Details", "", "", ""],
                &["Date", "Narration", "Credit", "Debit", "Balance"],
                &["01/04/2025", "NEFT CR", "1000.00", "", "15000.00"],
                &["02/04/2025", "NEFT DR", "", "500.50", "14499.50"],
            ]),
            vec![Region { first_row: 0, last_row: 0, first_col: 1, last_col: 3 }],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 3 }, 2);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, dec("1000.00"));
        assert!(rows[0].pay_in);
        assert_eq!(rows[1].amount, dec("-500.50"));
        assert!(!rows[1].pay_in);
    }

    // ── neighbor probing ─────────────────────────────────────────────────────

    #[test]
    fn probe_right_recovers_a_shifted_value() {
        // The credit value slid one column right (common with merged data
        // cells); the column it lands in has no header text of its own.
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "", "Debit", "Balance"],
                &["01/04/2025", "NEFT CR", "", "1000.00", "", "15000.00"],
            ]),
            vec![],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, dec("1000.00"));
    }

    #[test]
    fn probe_never_crosses_an_unmapped_labelled_column() {
        // "Instrument Id" owns its column. A blank debit cell must not pull
        // the instrument number in, even though it parses as a decimal.
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", "Instrument Id", "Balance"],
                &["01/04/2025", "CHQ DEP", "250.00", "", "783495", "15250.00"],
            ]),
            vec![],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 1);
        // Debit stays null: amount is the credit alone.
        assert_eq!(rows[0].amount, dec("250.00"));
        assert_eq!(rows[0].balance, Some(dec("15250.00")));
    }

    #[test]
    fn probe_stops_at_another_mapped_column() {
        // Blank credit; the next column right is the mapped debit column,
        // which the probe must refuse to enter.
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", "Balance"],
                &["01/04/2025", "ATM WDL", "", "400.00", "14600.00"],
            ]),
            vec![],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows[0].amount, dec("-400.00"));
    }

    #[test]
    fn merged_data_region_reads_top_left() {
        // The date cell of row 2 sits in a merged region whose top-left
        // holds the value.
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", "Balance"],
                &["01/04/2025", "FIRST", "10.00", "", "10.00"],
                &["", "SECOND", "5.00", "", "15.00"],
            ]),
            vec![Region { first_row: 1, last_row: 2, first_col: 0, last_col: 0 }],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].transaction_date_time,
            rows[0].transaction_date_time
        );
    }

    #[test]
    fn probe_respects_merged_region_of_another_field() {
        // Fixed mode: no header band to consult, so the merged-region rule
        // is what keeps the credit probe out of the debit value block,
        // which is merged across columns 3..=4.
        let mut profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        profile.headers = HeaderSpec::Fixed {
            row_start: 1,
            columns: [(Date, 0), (Reference, 1), (Credit, 2), (Debit, 4)]
                .into_iter()
                .collect(),
        };
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", ""],
                &["01/04/2025", "NEFT", "", "450.00", ""],
            ]),
            vec![Region { first_row: 1, last_row: 1, first_col: 3, last_col: 4 }],
        );
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 1);
        // Credit stays null; the merged cell belongs to debit.
        assert_eq!(rows[0].amount, dec("-450.00"));
    }

    // ── excel serials and native cells ───────────────────────────────────────

    #[test]
    fn excel_serial_dates_with_and_without_time_column() {
        let mut profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        profile.common.date = DateSpec {
            input: DateInput::ExcelSerial,
            ..DateSpec::default()
        };
        let mut expect_with_time = expect();
        expect_with_time.insert(Time, vec!["Time".to_string()]);
        if let HeaderSpec::Search(search) = &mut profile.headers {
            search.expect = expect_with_time;
        }
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Time", "Narration", "Credit", "Debit", "Balance"],
                &["45748.5", "", "NEFT", "10.00", "", "10.00"],
                &["45748.5", "09:15", "NEFT", "20.00", "", "30.00"],
            ]),
            vec![],
        );
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows[0].transaction_date_time.to_string(), "2025-04-01 12:00:00");
        assert_eq!(rows[1].transaction_date_time.to_string(), "2025-04-01 09:15:00");
    }

    #[test]
    fn iso_text_from_date_cells_is_accepted() {
        // A date-formatted native cell stringifies as ISO; the configured
        // %d/%m/%Y format must not get in the way.
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", "Balance"],
                &["2025-04-01T00:00:00", "NEFT", "10.00", "", "10.00"],
            ]),
            vec![],
        );
        let profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows[0].transaction_date_time.to_string(), "2025-04-01 00:00:00");
    }

    #[test]
    fn cell_text_renders_native_values() {
        assert_eq!(cell_text(&Data::Float(45748.5)), "45748.5");
        assert_eq!(cell_text(&Data::Float(1000.0)), "1000");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::String("  NEFT  ".to_string())), "NEFT");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    // ── row stop on the grid ─────────────────────────────────────────────────

    #[test]
    fn blank_grid_row_stops_when_configured() {
        let mut profile = profile(SearchBand::Scan { from: 0, to: 0 }, 1);
        profile.common.row_stop = RowStop::BlankRow;
        let grid = Grid::new(
            grid_rows(&[
                &["Date", "Narration", "Credit", "Debit", "Balance"],
                &["01/04/2025", "NEFT", "10.00", "", "10.00"],
                &["", "", "", "", ""],
                &["02/04/2025", "LATE", "1.00", "", "11.00"],
            ]),
            vec![],
        );
        let rows = parse_grid(&grid, &profile, "bank", FormatKind::Xlsx).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
