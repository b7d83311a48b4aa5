use std::fmt;

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

/// Group key used for absent or blank values.
pub const NOT_AVAILABLE: &str = "N/A";

/// One patient-flow entry as produced by the document-parsing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Nome", default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(rename = "Setor", default, deserialize_with = "lenient_text")]
    pub sector: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(rename = "Data_Entrada", default)]
    pub entry: Option<Timestamp>,
    #[serde(rename = "Data_Saida", default)]
    pub exit: Option<Timestamp>,
    #[serde(rename = "Hospital", default, deserialize_with = "lenient_text")]
    pub hospital: Option<String>,
}

/// Spreadsheet cells arrive as whatever type the parser inferred.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Other(IgnoredAny),
}

impl Cell {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Other(_) => None,
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Cell>::deserialize(deserializer)?.and_then(Cell::into_text))
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

impl Record {
    pub fn new(name: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sector: Some(sector.into()),
            status: None,
            entry: None,
            exit: None,
            hospital: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_entry(mut self, entry: impl Into<Timestamp>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn with_exit(mut self, exit: impl Into<Timestamp>) -> Self {
        self.exit = Some(exit.into());
        self
    }

    pub fn with_hospital(mut self, hospital: impl Into<String>) -> Self {
        self.hospital = Some(hospital.into());
        self
    }

    pub fn status_key(&self) -> &str {
        group_key(self.status.as_deref())
    }

    pub fn sector_key(&self) -> &str {
        group_key(self.sector.as_deref())
    }

    pub fn hospital_key(&self) -> &str {
        group_key(self.hospital.as_deref())
    }
}

/// Maps an optional text field onto its grouping key; blank counts as absent.
pub fn group_key(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

/// Raw timestamp as it appears on the wire: epoch milliseconds or text.
///
/// Conversion to a calendar date is lazy so that unparseable values survive
/// in the raw record list and only drop out of period-filtered views. Values
/// of any other JSON type are kept verbatim under `Other` and never match a
/// period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self::Millis(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp
where
    Tz::Offset: fmt::Display,
{
    fn from(value: DateTime<Tz>) -> Self {
        Self::Text(value.to_rfc3339())
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl Timestamp {
    /// Calendar date of this timestamp as seen from `tz`.
    ///
    /// Instants carrying an offset (and epoch values) are shifted into `tz`;
    /// naive date-times are read as wall-clock time in `tz`; a bare date is
    /// returned as-is.
    pub fn local_date_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<NaiveDate> {
        match self {
            Self::Millis(ms) => millis_date(*ms, tz),
            Self::FractionalMillis(ms) => {
                if !ms.is_finite() {
                    return None;
                }
                millis_date(ms.trunc() as i64, tz)
            }
            Self::Text(raw) => parse_text_date(raw.trim(), tz),
            Self::Other(_) => None,
        }
    }
}

fn millis_date<Tz: TimeZone>(ms: i64, tz: &Tz) -> Option<NaiveDate> {
    let instant = Utc.timestamp_millis_opt(ms).single()?;
    Some(instant.with_timezone(tz).date_naive())
}

fn parse_text_date<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(tz).date_naive());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.date_naive()),
                // Falls inside a DST gap; the wall-clock date is still meaningful.
                LocalResult::None => Some(naive.date()),
            };
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Reporting period: a calendar month of a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    month: u32,
    year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("month must be between 1 and 12, got {0}")]
pub struct InvalidMonth(pub u32);

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, InvalidMonth> {
        if !(1..=12).contains(&month) {
            return Err(InvalidMonth(month));
        }
        Ok(Self { month, year })
    }

    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            month: today.month(),
            year: today.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// Intake slot a file belongs to, decided by filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Spreadsheet,
}

impl FileKind {
    pub fn classify(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(Self::Spreadsheet)
        } else {
            None
        }
    }

    pub fn mime_type(filename: &str) -> &'static str {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            "application/pdf"
        } else if lower.ends_with(".xlsx") {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        } else if lower.ends_with(".xls") {
            "application/vnd.ms-excel"
        } else {
            "application/octet-stream"
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
