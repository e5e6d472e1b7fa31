//! AAMVA driver's-license decoder.
//!
//! The scanner returns one data element per line, each starting with its
//! three-letter AAMVA element id (`DCS` family name, `DBB` birth date, ...).
//! Decoding is best effort: unknown or malformed lines never fail the scan.

use serde::Serialize;
use tracing::debug;

use crate::magstripe;
use crate::session::NAK;

pub const DEFAULT_LICENSE_CLASS: &str = "NA";

const CLASS_MARKER: &str = "DCAG";

/// Decoded license fields. Absent fields were not present in the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    pub license_class: String,
}

impl Default for LicenseRecord {
    fn default() -> Self {
        Self {
            last_name: None,
            first_name: None,
            middle_name: None,
            expiry_date: None,
            issue_date: None,
            dob: None,
            sex: None,
            height: None,
            address: None,
            city: None,
            state: None,
            postal: None,
            license_number: None,
            license_class: DEFAULT_LICENSE_CLASS.to_string(),
        }
    }
}

impl LicenseRecord {
    /// True when none of the fields that identify a person were decoded.
    pub fn lacks_identity(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.license_number.is_none()
    }
}

/// A decoded record plus the element ids nothing consumed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodeReport {
    pub record: LicenseRecord,
    pub unrecognized_tags: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    LastName,
    FirstName,
    MiddleName,
    ExpiryDate,
    IssueDate,
    Dob,
    Sex,
    Height,
    Address,
    City,
    State,
    Postal,
    LicenseNumber,
}

const TAGS: &[(&str, Field)] = &[
    ("DCS", Field::LastName),
    ("DAC", Field::FirstName),
    ("DAD", Field::MiddleName),
    ("DBA", Field::ExpiryDate),
    ("DBD", Field::IssueDate),
    ("DBB", Field::Dob),
    ("DBC", Field::Sex),
    ("DAU", Field::Height),
    ("DAG", Field::Address),
    ("DAI", Field::City),
    ("DAJ", Field::State),
    ("DAK", Field::Postal),
    ("DAQ", Field::LicenseNumber),
];

/// Decode a raw scanner payload. Never fails.
pub fn decode(raw: &str) -> LicenseRecord {
    decode_report(raw).record
}

/// Decode a raw scanner payload and report unconsumed element ids.
///
/// BC and Alberta magstripe payloads go to `magstripe`; everything else is
/// read as AAMVA element lines.
pub fn decode_report(raw: &str) -> DecodeReport {
    let raw = raw.strip_prefix(char::from(NAK)).unwrap_or(raw);
    if let Some(province) = magstripe::province(raw) {
        debug!(province = province, "Decoding magstripe license");
        return DecodeReport {
            record: magstripe::decode(raw),
            unrecognized_tags: Vec::new(),
        };
    }

    let mut report = DecodeReport::default();

    for line in raw
        .split(is_line_boundary)
        .map(|line| line.trim_matches(is_strip_char))
        .filter(|line| !line.is_empty())
    {
        let mut matched = false;
        if let Some(&(tag, field)) = TAGS.iter().find(|(tag, _)| line.starts_with(tag)) {
            apply(
                &mut report.record,
                field,
                line[tag.len()..].trim_matches(is_strip_char),
            );
            matched = true;
        }

        let class = license_class(line);
        if let Some(class) = class.as_ref() {
            report.record.license_class = class.clone();
        }

        if !matched && class.is_none() {
            let tag: String = line.chars().take(3).collect();
            if !report.unrecognized_tags.contains(&tag) {
                report.unrecognized_tags.push(tag);
            }
        }
    }

    if !report.unrecognized_tags.is_empty() {
        debug!(tags = ?report.unrecognized_tags, "Unrecognized AAMVA elements skipped");
    }
    report
}

fn apply(record: &mut LicenseRecord, field: Field, value: &str) {
    match field {
        Field::LastName => record.last_name = Some(value.to_string()),
        Field::FirstName => record.first_name = Some(value.to_string()),
        Field::MiddleName => record.middle_name = Some(value.to_string()),
        Field::ExpiryDate => record.expiry_date = Some(format_date(value)),
        Field::IssueDate => record.issue_date = Some(format_date(value)),
        Field::Dob => record.dob = Some(format_date(value)),
        Field::Sex => record.sex = Some(map_sex(value)),
        Field::Height => {
            record.height = Some(value.chars().filter(|c| !c.is_whitespace()).collect())
        }
        Field::Address => record.address = Some(value.to_string()),
        Field::City => record.city = Some(value.to_string()),
        Field::State => record.state = Some(value.to_string()),
        Field::Postal => record.postal = Some(value.to_string()),
        Field::LicenseNumber => record.license_number = Some(format_license_number(value)),
    }
}

/// Line boundaries recognised in scanner output. AAMVA payloads mix LF, CR
/// and the ASCII record/group separators.
fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Characters trimmed from both ends of a line: Unicode whitespace plus the
/// ASCII file/group/record/unit separators.
fn is_strip_char(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// `YYYYMMDD...` -> `YYYY/MM/DD`; shorter input yields an empty string.
fn format_date(value: &str) -> String {
    let digits: Vec<char> = value.chars().take(8).collect();
    if digits.len() < 8 {
        return String::new();
    }
    let year: String = digits[0..4].iter().collect();
    let month: String = digits[4..6].iter().collect();
    let day: String = digits[6..8].iter().collect();
    format!("{year}/{month}/{day}")
}

fn map_sex(value: &str) -> String {
    match value {
        "1" => "M".to_string(),
        "2" => "F".to_string(),
        other => other.to_string(),
    }
}

fn format_license_number(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() != 15 {
        return value.to_string();
    }
    let part = |r: std::ops::Range<usize>| chars[r].iter().collect::<String>();
    format!("{}-{}-{}", part(0..5), part(5..10), part(10..15))
}

/// Word characters following the first `DCAG` marker that has any.
fn license_class(line: &str) -> Option<String> {
    line.match_indices(CLASS_MARKER).find_map(|(idx, marker)| {
        let class: String = line[idx + marker.len()..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        (!class.is_empty()).then_some(class)
    })
}
