//! Bank profile model: a raw serde mirror of the YAML file and the resolved
//! form the engine actually reads. Every default is materialized and every
//! regex, charset and delimiter is validated here, at load time — never at
//! row time.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::Path;

use encoding_rs::Encoding;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use passbook_core::error::EngineError;
use passbook_core::numeric::NumericFormat;
use passbook_core::payin::PayInRule;
use passbook_core::reference::{PartSpec, PartsRule, ReferenceSpec};
use passbook_core::timestamp::{DateInput, DateSpec};
use passbook_core::types::{FormatKind, SemanticField};

// ── Resolved model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum HeaderSpec {
    /// Declared coordinates; no scanning. `row_start` is the zero-based row
    /// the data begins at.
    Fixed {
        row_start: usize,
        columns: BTreeMap<SemanticField, usize>,
    },
    Search(SearchSpec),
}

#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub band: SearchBand,
    pub multi_row_count: usize,
    pub merge_separator: String,
    /// Data begins this many rows after the header band ends.
    pub row_start_offset: usize,
    pub expect: BTreeMap<SemanticField, Vec<String>>,
}

/// Where the header band may sit. Indices are zero-based (one-based profile
/// input is normalized during load).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBand {
    Scan { from: usize, to: usize },
    FixedRows { from: usize },
}

#[derive(Debug, Clone)]
pub enum RowStop {
    None,
    BlankRow,
    UntilRegex(Regex),
}

/// Options shared by every format pipeline.
#[derive(Debug, Clone)]
pub struct CommonSpec {
    pub numeric: NumericFormat,
    pub date: DateSpec,
    pub reference: ReferenceSpec,
    pub pay_in: PayInRule,
    pub row_stop: RowStop,
}

#[derive(Debug, Clone)]
pub struct DelimitedProfile {
    pub headers: HeaderSpec,
    pub charset: &'static Encoding,
    pub delimiter: u8,
    pub skip_rows: usize,
    pub common: CommonSpec,
}

#[derive(Debug, Clone)]
pub struct SheetProfile {
    pub headers: HeaderSpec,
    pub sheet_index: usize,
    pub common: CommonSpec,
}

#[derive(Debug, Clone)]
pub struct PdfProfile {
    pub start_after: Option<Regex>,
    pub stop_before: Option<Regex>,
    /// Anchored per-line pattern; its named groups are the column mapping.
    pub line_pattern: Regex,
    pub common: CommonSpec,
}

#[derive(Debug, Clone)]
pub enum FormatProfile {
    Delimited(DelimitedProfile),
    Sheet(SheetProfile),
    Pdf(PdfProfile),
}

impl FormatProfile {
    pub fn common(&self) -> &CommonSpec {
        match self {
            FormatProfile::Delimited(p) => &p.common,
            FormatProfile::Sheet(p) => &p.common,
            FormatProfile::Pdf(p) => &p.common,
        }
    }
}

/// One bank's enabled format profiles. Disabled sub-profiles are dropped
/// during load and indistinguishable from absent ones.
#[derive(Debug, Clone, Default)]
pub struct BankProfile {
    csv: Option<FormatProfile>,
    xls: Option<FormatProfile>,
    xlsx: Option<FormatProfile>,
    pdf: Option<FormatProfile>,
}

impl BankProfile {
    pub fn format(&self, kind: FormatKind) -> Option<&FormatProfile> {
        match kind {
            FormatKind::Csv => self.csv.as_ref(),
            FormatKind::Xls => self.xls.as_ref(),
            FormatKind::Xlsx => self.xlsx.as_ref(),
            FormatKind::Pdf => self.pdf.as_ref(),
        }
    }
}

/// Immutable tree of bank profiles, loaded once at startup. Parser keys are
/// trimmed and compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    banks: HashMap<String, BankProfile>,
}

impl ProfileStore {
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|e| {
            EngineError::MalformedProfile(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, EngineError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| EngineError::MalformedProfile(format!("cannot read profiles: {e}")))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let file: raw::ProfileFile = serde_yaml::from_str(text)
            .map_err(|e| EngineError::MalformedProfile(e.to_string()))?;

        let mut banks = HashMap::new();
        for (key, bank) in file.banks {
            let key = key.trim().to_lowercase();
            if !bank.enabled {
                continue;
            }
            let resolved = resolve_bank(&key, bank)?;
            banks.insert(key, resolved);
        }
        Ok(Self { banks })
    }

    pub fn bank(&self, parser_key: &str) -> Option<&BankProfile> {
        self.banks.get(&parser_key.trim().to_lowercase())
    }

    pub fn profile_for(
        &self,
        parser_key: &str,
        kind: FormatKind,
    ) -> Result<&FormatProfile, EngineError> {
        let bank = self
            .bank(parser_key)
            .ok_or_else(|| EngineError::UnknownParserKey(parser_key.trim().to_string()))?;
        bank.format(kind).ok_or_else(|| EngineError::FormatNotConfigured {
            parser_key: parser_key.trim().to_lowercase(),
            format: kind,
        })
    }
}

// ── Raw YAML layer ────────────────────────────────────────────────────────────

mod raw {
    use super::*;

    fn enabled_by_default() -> bool {
        true
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ProfileFile {
        #[serde(default)]
        pub banks: HashMap<String, Bank>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Bank {
        #[serde(default = "enabled_by_default")]
        pub enabled: bool,
        pub csv: Option<Format>,
        pub xls: Option<Format>,
        pub xlsx: Option<Format>,
        pub pdf: Option<Format>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Format {
        #[serde(default = "enabled_by_default")]
        pub enabled: bool,
        pub headers: Option<Headers>,
        #[serde(default)]
        pub numeric: Numeric,
        #[serde(default)]
        pub date_parse: DateParse,
        #[serde(default)]
        pub reference: Reference,
        pub pay_in_rule: Option<PayInRuleRaw>,
        pub row_stop: Option<RowStopRaw>,
        // delimited
        pub charset: Option<String>,
        pub delimiter: Option<String>,
        pub skip_rows: Option<usize>,
        // spreadsheet
        pub sheet_index: Option<usize>,
        // pdf
        pub start_after_regex: Option<String>,
        pub stop_before_regex: Option<String>,
        pub line_pattern: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Headers {
        pub mode: String,
        pub fixed: Option<Fixed>,
        pub search: Option<Search>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Fixed {
        pub row_start: usize,
        #[serde(default)]
        pub columns: BTreeMap<SemanticField, usize>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Search {
        pub scan_range: Option<RowRange>,
        pub fixed_header_rows: Option<FixedBand>,
        pub multi_row_count: Option<usize>,
        pub use_one_based_row_index: Option<bool>,
        pub merge_separator: Option<String>,
        pub row_start_offset: Option<usize>,
        #[serde(default)]
        pub expect: BTreeMap<SemanticField, Vec<String>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct RowRange {
        pub from: usize,
        pub to: usize,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct FixedBand {
        pub from: usize,
        pub to: Option<usize>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Numeric {
        pub thousands_separator: Option<String>,
        pub decimal_separator: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct DateParse {
        pub format: Option<String>,
        pub time_format: Option<String>,
        pub input: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Reference {
        pub splitter: Option<String>,
        pub parts_count: Option<PartsCount>,
        pub order_id: Option<IndexDef>,
        pub utr: Option<IndexDef>,
        pub utr_fallback: Option<UtrFallback>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct PartsCount {
        pub mode: String,
        #[serde(default)]
        pub values: Vec<usize>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct IndexDef {
        pub index: usize,
        #[serde(default)]
        pub clean_digits_only: bool,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct UtrFallback {
        pub regex: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct PayInRuleRaw {
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub narration_contains_any: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct RowStopRaw {
        pub mode: String,
        pub until_regex: Option<String>,
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

fn bad(key: &str, kind: &str, detail: impl std::fmt::Display) -> EngineError {
    EngineError::MalformedProfile(format!("bank '{key}' {kind}: {detail}"))
}

fn resolve_bank(key: &str, bank: raw::Bank) -> Result<BankProfile, EngineError> {
    let mut resolved = BankProfile::default();
    if let Some(fmt) = bank.csv.filter(|f| f.enabled) {
        resolved.csv = Some(FormatProfile::Delimited(resolve_delimited(key, fmt)?));
    }
    if let Some(fmt) = bank.xls.filter(|f| f.enabled) {
        resolved.xls = Some(FormatProfile::Sheet(resolve_sheet(key, "xls", fmt)?));
    }
    if let Some(fmt) = bank.xlsx.filter(|f| f.enabled) {
        resolved.xlsx = Some(FormatProfile::Sheet(resolve_sheet(key, "xlsx", fmt)?));
    }
    if let Some(fmt) = bank.pdf.filter(|f| f.enabled) {
        resolved.pdf = Some(FormatProfile::Pdf(resolve_pdf(key, fmt)?));
    }
    Ok(resolved)
}

fn resolve_delimited(key: &str, fmt: raw::Format) -> Result<DelimitedProfile, EngineError> {
    let headers = resolve_headers(key, "csv", fmt.headers.as_ref())?;
    let charset = match fmt.charset.as_deref() {
        None => encoding_rs::UTF_8,
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| bad(key, "csv", format!("unknown charset '{label}'")))?,
    };
    let delimiter = match fmt.delimiter.as_deref() {
        None => b',',
        Some(d) if d.len() == 1 && d.is_ascii() => d.as_bytes()[0],
        Some(d) => {
            return Err(bad(key, "csv", format!("delimiter must be one ASCII character, got '{d}'")))
        }
    };
    let skip_rows = fmt.skip_rows.unwrap_or(0);
    let common = resolve_common(key, "csv", &fmt)?;
    Ok(DelimitedProfile { headers, charset, delimiter, skip_rows, common })
}

fn resolve_sheet(key: &str, kind: &str, fmt: raw::Format) -> Result<SheetProfile, EngineError> {
    let headers = resolve_headers(key, kind, fmt.headers.as_ref())?;
    let sheet_index = fmt.sheet_index.unwrap_or(0);
    let common = resolve_common(key, kind, &fmt)?;
    Ok(SheetProfile { headers, sheet_index, common })
}

fn resolve_pdf(key: &str, fmt: raw::Format) -> Result<PdfProfile, EngineError> {
    let line_pattern = fmt
        .line_pattern
        .as_deref()
        .ok_or_else(|| bad(key, "pdf", "linePattern is required"))?;
    let line_pattern = Regex::new(line_pattern)
        .map_err(|e| bad(key, "pdf", format!("invalid linePattern: {e}")))?;

    // The named groups are the mapping; hold them to the same sufficiency
    // bar as a resolved header band.
    let groups: Vec<&str> = line_pattern.capture_names().flatten().collect();
    let has = |name: &str| groups.contains(&name);
    let sufficient = has("date")
        && (has("ref") || has("reference"))
        && (has("amount") || has("credit") || has("debit"));
    if !sufficient {
        return Err(bad(
            key,
            "pdf",
            "linePattern needs groups for date, ref and one of amount/credit/debit",
        ));
    }

    let start_after = fmt
        .start_after_regex
        .as_deref()
        .map(multiline)
        .transpose()
        .map_err(|e| bad(key, "pdf", format!("invalid startAfterRegex: {e}")))?;
    let stop_before = fmt
        .stop_before_regex
        .as_deref()
        .map(multiline)
        .transpose()
        .map_err(|e| bad(key, "pdf", format!("invalid stopBeforeRegex: {e}")))?;

    let common = resolve_common(key, "pdf", &fmt)?;
    Ok(PdfProfile { start_after, stop_before, line_pattern, common })
}

fn multiline(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).multi_line(true).build()
}

fn resolve_headers(
    key: &str,
    kind: &str,
    headers: Option<&raw::Headers>,
) -> Result<HeaderSpec, EngineError> {
    let headers = headers.ok_or_else(|| bad(key, kind, "headers section is required"))?;
    if headers.mode.eq_ignore_ascii_case("fixed") {
        let fixed = headers
            .fixed
            .as_ref()
            .ok_or_else(|| bad(key, kind, "headers.fixed is required in fixed mode"))?;
        return Ok(HeaderSpec::Fixed {
            row_start: fixed.row_start,
            columns: fixed.columns.clone(),
        });
    }
    if !headers.mode.eq_ignore_ascii_case("search") {
        return Err(bad(key, kind, format!("unknown headers.mode '{}'", headers.mode)));
    }

    let search = headers
        .search
        .as_ref()
        .ok_or_else(|| bad(key, kind, "headers.search is required in search mode"))?;
    if search.expect.is_empty() {
        return Err(bad(key, kind, "headers.search.expect must not be empty"));
    }
    for (field, synonyms) in &search.expect {
        if synonyms.iter().all(|s| s.trim().is_empty()) {
            return Err(bad(key, kind, format!("expect.{field} has no usable synonym")));
        }
    }

    let multi_row_count = search.multi_row_count.unwrap_or(1);
    if multi_row_count == 0 {
        return Err(bad(key, kind, "multiRowCount must be at least 1"));
    }
    let one_based = search.use_one_based_row_index.unwrap_or(true);
    let to_zero_based = |row: usize, what: &str| -> Result<usize, EngineError> {
        if one_based {
            row.checked_sub(1)
                .ok_or_else(|| bad(key, kind, format!("{what} is one-based and must be >= 1")))
        } else {
            Ok(row)
        }
    };

    let band = match (&search.scan_range, &search.fixed_header_rows) {
        (Some(_), Some(_)) => {
            return Err(bad(key, kind, "scanRange and fixedHeaderRows are mutually exclusive"))
        }
        (None, None) => {
            return Err(bad(key, kind, "search mode needs scanRange or fixedHeaderRows"))
        }
        (Some(range), None) => {
            let from = to_zero_based(range.from, "scanRange.from")?;
            let to = to_zero_based(range.to, "scanRange.to")?;
            if to < from {
                return Err(bad(key, kind, "scanRange.to must be >= scanRange.from"));
            }
            SearchBand::Scan { from, to }
        }
        (None, Some(fixed)) => {
            let from = to_zero_based(fixed.from, "fixedHeaderRows.from")?;
            if let Some(to) = fixed.to {
                let to = to_zero_based(to, "fixedHeaderRows.to")?;
                if to != from + multi_row_count - 1 {
                    return Err(bad(
                        key,
                        kind,
                        "fixedHeaderRows.to must equal from + multiRowCount - 1",
                    ));
                }
            }
            SearchBand::FixedRows { from }
        }
    };

    Ok(HeaderSpec::Search(SearchSpec {
        band,
        multi_row_count,
        merge_separator: search.merge_separator.clone().unwrap_or_else(|| " ".to_string()),
        row_start_offset: search.row_start_offset.unwrap_or(1),
        expect: search.expect.clone(),
    }))
}

fn resolve_common(key: &str, kind: &str, fmt: &raw::Format) -> Result<CommonSpec, EngineError> {
    let numeric = NumericFormat {
        thousands_separator: fmt
            .numeric
            .thousands_separator
            .clone()
            .unwrap_or_else(|| ",".to_string()),
        decimal_separator: fmt
            .numeric
            .decimal_separator
            .clone()
            .unwrap_or_else(|| ".".to_string()),
    };
    if numeric.decimal_separator.is_empty() {
        return Err(bad(key, kind, "numeric.decimalSeparator must not be empty"));
    }

    let input = match fmt.date_parse.input.as_deref() {
        None => DateInput::Text,
        Some(s) if s.eq_ignore_ascii_case("excelSerial") => DateInput::ExcelSerial,
        Some(s) => return Err(bad(key, kind, format!("unknown dateParse.input '{s}'"))),
    };
    let date = DateSpec {
        format: fmt
            .date_parse
            .format
            .clone()
            .unwrap_or_else(|| "%d/%m/%Y".to_string()),
        time_format: fmt.date_parse.time_format.clone(),
        input,
    };

    let reference = resolve_reference(key, kind, &fmt.reference)?;
    let pay_in = resolve_pay_in(key, kind, fmt.pay_in_rule.as_ref())?;
    let row_stop = resolve_row_stop(key, kind, fmt.row_stop.as_ref())?;

    Ok(CommonSpec { numeric, date, reference, pay_in, row_stop })
}

fn resolve_reference(
    key: &str,
    kind: &str,
    reference: &raw::Reference,
) -> Result<ReferenceSpec, EngineError> {
    let splitter = reference
        .splitter
        .clone()
        .filter(|s| !s.is_empty());

    let parts_count = match &reference.parts_count {
        None => PartsRule::Any,
        Some(pc) if pc.mode.eq_ignore_ascii_case("none") => PartsRule::Any,
        Some(pc) if pc.mode.eq_ignore_ascii_case("exact") => {
            let first = pc
                .values
                .first()
                .ok_or_else(|| bad(key, kind, "partsCount exact needs a value"))?;
            PartsRule::Exact(*first)
        }
        Some(pc) if pc.mode.eq_ignore_ascii_case("oneOf") => {
            if pc.values.is_empty() {
                return Err(bad(key, kind, "partsCount oneOf needs at least one value"));
            }
            PartsRule::OneOf(pc.values.clone())
        }
        Some(pc) => return Err(bad(key, kind, format!("unknown partsCount.mode '{}'", pc.mode))),
    };

    let part = |def: &Option<raw::IndexDef>| {
        def.as_ref().map(|d| PartSpec {
            index: d.index,
            clean_digits_only: d.clean_digits_only,
        })
    };
    let utr_fallback = reference
        .utr_fallback
        .as_ref()
        .map(|f| Regex::new(&f.regex))
        .transpose()
        .map_err(|e| bad(key, kind, format!("invalid utrFallback.regex: {e}")))?;

    Ok(ReferenceSpec {
        splitter,
        parts_count,
        order_id: part(&reference.order_id),
        utr: part(&reference.utr),
        utr_fallback,
    })
}

fn resolve_pay_in(
    key: &str,
    kind: &str,
    rule: Option<&raw::PayInRuleRaw>,
) -> Result<PayInRule, EngineError> {
    let Some(rule) = rule else {
        return Ok(PayInRule::AmountPositive);
    };
    let resolved = match rule.kind.as_str() {
        k if k.eq_ignore_ascii_case("amountPositive") => PayInRule::AmountPositive,
        k if k.eq_ignore_ascii_case("creditColumn") => PayInRule::CreditColumn,
        k if k.eq_ignore_ascii_case("orderIdNoSpace") => PayInRule::OrderIdNoSpace,
        k if k.eq_ignore_ascii_case("utrNoSpace") => PayInRule::UtrNoSpace,
        k if k.eq_ignore_ascii_case("narrationContains") => {
            let needles: Vec<String> = rule
                .narration_contains_any
                .iter()
                .filter(|n| !n.trim().is_empty())
                .cloned()
                .collect();
            if needles.is_empty() {
                return Err(bad(key, kind, "narrationContains needs narrationContainsAny"));
            }
            PayInRule::NarrationContains(needles)
        }
        other => return Err(bad(key, kind, format!("unknown payInRule.type '{other}'"))),
    };
    Ok(resolved)
}

fn resolve_row_stop(
    key: &str,
    kind: &str,
    stop: Option<&raw::RowStopRaw>,
) -> Result<RowStop, EngineError> {
    let Some(stop) = stop else {
        return Ok(RowStop::None);
    };
    if stop.mode.eq_ignore_ascii_case("none") {
        return Ok(RowStop::None);
    }
    if stop.mode.eq_ignore_ascii_case("blankRow") || stop.mode.eq_ignore_ascii_case("blankRows") {
        return Ok(RowStop::BlankRow);
    }
    if stop.mode.eq_ignore_ascii_case("until") || stop.mode.eq_ignore_ascii_case("untilRegex") {
        let pattern = stop
            .until_regex
            .as_deref()
            .ok_or_else(|| bad(key, kind, "rowStop until needs untilRegex"))?;
        let regex = Regex::new(pattern)
            .map_err(|e| bad(key, kind, format!("invalid untilRegex: {e}")))?;
        return Ok(RowStop::UntilRegex(regex));
    }
    Err(bad(key, kind, format!("unknown rowStop.mode '{}'", stop.mode)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_CSV: &str = r#"
banks:
  HDFC:
    csv:
      headers:
        mode: search
        search:
          scanRange: { from: 1, to: 10 }
          expect:
            date: [Date]
            reference: [Narration]
            credit: [Credit]
            debit: [Debit]
"#;

    #[test]
    fn parser_keys_are_trimmed_and_case_insensitive() {
        let store = ProfileStore::from_yaml_str(MINIMAL_CSV).unwrap();
        assert!(store.profile_for("hdfc", FormatKind::Csv).is_ok());
        assert!(store.profile_for("  HdFc ", FormatKind::Csv).is_ok());
    }

    #[test]
    fn unknown_key_and_unconfigured_format_are_distinct_errors() {
        let store = ProfileStore::from_yaml_str(MINIMAL_CSV).unwrap();
        assert!(matches!(
            store.profile_for("icici", FormatKind::Csv),
            Err(EngineError::UnknownParserKey(_))
        ));
        assert!(matches!(
            store.profile_for("hdfc", FormatKind::Pdf),
            Err(EngineError::FormatNotConfigured { .. })
        ));
    }

    #[test]
    fn disabled_bank_is_invisible() {
        let yaml = r#"
banks:
  ghost:
    enabled: false
    csv:
      headers:
        mode: search
        search:
          scanRange: { from: 1, to: 5 }
          expect: { date: [Date], reference: [Ref], amount: [Amount] }
"#;
        let store = ProfileStore::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            store.profile_for("ghost", FormatKind::Csv),
            Err(EngineError::UnknownParserKey(_))
        ));
    }

    #[test]
    fn disabled_format_is_not_configured() {
        let yaml = r#"
banks:
  axis:
    csv:
      enabled: false
      headers:
        mode: search
        search:
          scanRange: { from: 1, to: 5 }
          expect: { date: [Date], reference: [Ref], amount: [Amount] }
"#;
        let store = ProfileStore::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            store.profile_for("axis", FormatKind::Csv),
            Err(EngineError::FormatNotConfigured { .. })
        ));
    }

    #[test]
    fn one_based_scan_range_normalizes_to_zero_based() {
        let store = ProfileStore::from_yaml_str(MINIMAL_CSV).unwrap();
        let FormatProfile::Delimited(profile) = store.profile_for("hdfc", FormatKind::Csv).unwrap()
        else {
            panic!("expected a delimited profile");
        };
        let HeaderSpec::Search(search) = &profile.headers else {
            panic!("expected search mode");
        };
        assert_eq!(search.band, SearchBand::Scan { from: 0, to: 9 });
        assert_eq!(search.multi_row_count, 1);
        assert_eq!(search.row_start_offset, 1);
        assert_eq!(search.merge_separator, " ");
    }

    #[test]
    fn defaults_are_materialized() {
        let store = ProfileStore::from_yaml_str(MINIMAL_CSV).unwrap();
        let FormatProfile::Delimited(profile) = store.profile_for("hdfc", FormatKind::Csv).unwrap()
        else {
            panic!("expected a delimited profile");
        };
        assert_eq!(profile.delimiter, b',');
        assert_eq!(profile.skip_rows, 0);
        assert_eq!(profile.charset, encoding_rs::UTF_8);
        assert_eq!(profile.common.numeric, NumericFormat::default());
        assert_eq!(profile.common.date.format, "%d/%m/%Y");
        assert_eq!(profile.common.pay_in, PayInRule::AmountPositive);
        assert!(matches!(profile.common.row_stop, RowStop::None));
    }

    #[test]
    fn empty_expect_is_rejected_at_load() {
        let yaml = r#"
banks:
  broken:
    csv:
      headers:
        mode: search
        search:
          scanRange: { from: 1, to: 5 }
          expect: {}
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn unknown_expect_field_is_rejected_at_load() {
        let yaml = r#"
banks:
  broken:
    csv:
      headers:
        mode: search
        search:
          scanRange: { from: 1, to: 5 }
          expect: { narration: [Narration] }
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn multi_character_delimiter_is_rejected() {
        let yaml = r#"
banks:
  broken:
    csv:
      delimiter: "||"
      headers:
        mode: fixed
        fixed:
          rowStart: 1
          columns: { date: 0, reference: 1, amount: 2 }
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn bad_regexes_are_rejected_at_load() {
        let yaml = r#"
banks:
  broken:
    pdf:
      linePattern: "(?P<date>\\d+) (?P<ref>.+) (?P<amount>[\\d.]+"
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn pdf_line_pattern_must_cover_the_required_fields() {
        let yaml = r#"
banks:
  broken:
    pdf:
      linePattern: "(?P<date>\\d+) (?P<amount>[\\d.]+)"
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn pdf_profile_resolves_with_clip_regexes() {
        let yaml = r#"
banks:
  sbi:
    pdf:
      startAfterRegex: "^Date\\s+Narration"
      stopBeforeRegex: "^Opening Balance"
      linePattern: "(?P<date>\\S+)\\s+(?P<ref>.+)\\s+(?P<amount>[\\d,.]+)"
"#;
        let store = ProfileStore::from_yaml_str(yaml).unwrap();
        let FormatProfile::Pdf(profile) = store.profile_for("sbi", FormatKind::Pdf).unwrap() else {
            panic!("expected a pdf profile");
        };
        assert!(profile.start_after.is_some());
        assert!(profile.stop_before.is_some());
    }

    #[test]
    fn fixed_band_to_must_agree_with_multi_row_count() {
        let yaml = r#"
banks:
  broken:
    xlsx:
      headers:
        mode: search
        search:
          fixedHeaderRows: { from: 2, to: 5 }
          multiRowCount: 2
          expect: { date: [Date], reference: [Ref], amount: [Amount] }
"#;
        assert!(matches!(
            ProfileStore::from_yaml_str(yaml),
            Err(EngineError::MalformedProfile(_))
        ));
    }

    #[test]
    fn parts_count_modes_resolve() {
        let yaml = r#"
banks:
  upi:
    csv:
      headers:
        mode: fixed
        fixed:
          rowStart: 1
          columns: { date: 0, reference: 1, amount: 2 }
      reference:
        splitter: "/"
        partsCount: { mode: oneOf, values: [3, 4] }
        orderId: { index: 2, cleanDigitsOnly: true }
        utr: { index: 1 }
"#;
        let store = ProfileStore::from_yaml_str(yaml).unwrap();
        let profile = store.profile_for("upi", FormatKind::Csv).unwrap();
        let reference = &profile.common().reference;
        assert_eq!(reference.parts_count, PartsRule::OneOf(vec![3, 4]));
        assert_eq!(
            reference.order_id,
            Some(PartSpec { index: 2, clean_digits_only: true })
        );
        assert_eq!(reference.utr, Some(PartSpec { index: 1, clean_digits_only: false }));
    }
}
