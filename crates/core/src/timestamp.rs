use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// How the date column's raw text is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateInput {
    #[default]
    Text,
    /// Spreadsheet serial number: days since 1899-12-30, fraction is the
    /// time of day.
    ExcelSerial,
}

/// Date/time layout of one bank's documents. Patterns are chrono strftime
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSpec {
    pub format: String,
    pub time_format: Option<String>,
    pub input: DateInput,
}

impl Default for DateSpec {
    fn default() -> Self {
        Self {
            format: "%d/%m/%Y".to_string(),
            time_format: None,
            input: DateInput::Text,
        }
    }
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a spreadsheet serial to a wall-clock date-time. Rejects
/// non-finite and negative serials.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor();
    let mut seconds = ((serial - days) * SECONDS_PER_DAY).round() as u32;
    let mut date = NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_days(Days::new(days as u64))?;
    if seconds >= SECONDS_PER_DAY as u32 {
        date = date.succ_opt()?;
        seconds -= SECONDS_PER_DAY as u32;
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(NaiveDateTime::new(date, time))
}

/// Resolve the raw date and optional time cell of one row into a wall-clock
/// timestamp. Strategies, in order: spreadsheet serial (when configured),
/// ISO local date-time, ISO local date, then the configured pattern.
/// Wall-clock is preserved; there is no timezone conversion. An absent or
/// unparseable date yields `None` and the caller drops the row.
pub fn parse_date_time(
    date: Option<&str>,
    time: Option<&str>,
    spec: &DateSpec,
) -> Option<NaiveDateTime> {
    let date_raw = date.map(str::trim).filter(|s| !s.is_empty())?;
    let time_raw = time.map(str::trim).filter(|s| !s.is_empty());

    if spec.input == DateInput::ExcelSerial {
        if let Ok(serial) = date_raw.parse::<f64>() {
            if let Some(stamp) = from_excel_serial(serial) {
                return Some(match time_raw {
                    Some(t) => NaiveDateTime::new(stamp.date(), parse_time(t, spec)),
                    None => stamp,
                });
            }
        }
    }

    if let Some(stamp) = try_iso_date_time(date_raw) {
        return Some(match time_raw {
            Some(t) => NaiveDateTime::new(stamp.date(), parse_time(t, spec)),
            None => stamp,
        });
    }
    if let Some(day) = try_iso_date(date_raw) {
        return Some(NaiveDateTime::new(day, resolved_time(time_raw, spec)));
    }

    let day = NaiveDate::parse_from_str(date_raw, &spec.format).ok()?;
    Some(NaiveDateTime::new(day, resolved_time(time_raw, spec)))
}

fn resolved_time(time_raw: Option<&str>, spec: &DateSpec) -> NaiveTime {
    time_raw.map_or(NaiveTime::MIN, |t| parse_time(t, spec))
}

fn parse_time(raw: &str, spec: &DateSpec) -> NaiveTime {
    let configured = spec.time_format.as_deref().unwrap_or("%H:%M:%S");
    if let Ok(t) = NaiveTime::parse_from_str(raw, configured) {
        return t;
    }
    for fallback in ["%H:%M", "%H%M", "%I:%M %p"] {
        if let Ok(t) = NaiveTime::parse_from_str(raw, fallback) {
            return t;
        }
    }
    NaiveTime::MIN
}

fn try_iso_date_time(raw: &str) -> Option<NaiveDateTime> {
    if !raw.contains('T') {
        return None;
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(stamp);
        }
    }
    None
}

fn try_iso_date(raw: &str) -> Option<NaiveDate> {
    if raw.contains('T') {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
