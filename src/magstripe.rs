//! BC / Alberta magnetic-stripe decoder.
//!
//! Track data looks like
//! `%BCCITY^LAST,$FIRST MIDDLE^ADDRESS$CITY PROV POSTAL^?;IIN+NUMBER=EXPDOB=?...`
//! with sex and height (`M183`) in the trailing track. Fields are pulled
//! out by position and pattern; anything missing stays `None`.

use chrono::Datelike;

use crate::aamva::LicenseRecord;
use crate::session::NAK;

/// Track 1 start sentinels for the supported provinces, with their codes.
const PROVINCES: &[(&str, &str)] = &[("%BC", "BC"), ("%AB", "AB")];

/// Province code when `raw` carries a supported magstripe sentinel.
pub fn province(raw: &str) -> Option<&'static str> {
    PROVINCES
        .iter()
        .find(|(marker, _)| raw.contains(marker))
        .map(|&(_, code)| code)
}

/// Decode with the century pivot taken from the local clock.
pub fn decode(raw: &str) -> LicenseRecord {
    let pivot = (chrono::Local::now().year() % 100) as u32;
    decode_with_pivot(raw, pivot)
}

/// Decode a magstripe payload. Two-digit birth years above `pivot` are
/// placed in the 1900s, the rest in the 2000s.
pub fn decode_with_pivot(raw: &str, pivot: u32) -> LicenseRecord {
    let raw = raw.strip_prefix(char::from(NAK)).unwrap_or(raw);
    let raw: String = raw.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    let mut record = LicenseRecord::default();

    let Some((marker, code)) = PROVINCES
        .iter()
        .find(|(marker, _)| raw.contains(marker))
        .copied()
    else {
        return record;
    };

    let parts: Vec<&str> = raw.split('^').collect();

    if let Some(idx) = parts[0].find(marker) {
        record.city = non_empty(&parts[0][idx + marker.len()..]);
    }

    if let Some(name) = parts.get(1) {
        let mut pieces = name.split(',');
        if let (Some(last), Some(rest)) = (pieces.next(), pieces.next()) {
            record.last_name = non_empty(strip_dollar(last));
            let rest = strip_dollar(rest);
            let mut given = rest.splitn(2, ' ');
            record.first_name = given.next().and_then(non_empty);
            record.middle_name = given.next().and_then(non_empty);
        }
    }

    if let Some(address) = parts.get(2) {
        match address.split_once('$') {
            Some((street, locality)) => {
                record.address = non_empty(street);
                let locality = locality.split('$').next().unwrap_or_default();
                if locality.contains(code) {
                    record.state = Some(code.to_string());
                }
                record.postal = find_postal(locality).map(str::to_string);
            }
            None => record.address = non_empty(address),
        }
    }

    if let Some(number) = find_license_number(&raw) {
        record.license_number = Some(number[number.len() - 7..].to_string());
    }

    if let Some(dates) = find_dates(&raw) {
        // Expiry is DDMMYY, birth date YYMMDD.
        record.expiry_date = Some(format!(
            "20{}/{}/{}",
            &dates[4..6],
            &dates[2..4],
            &dates[0..2]
        ));
        let century = match dates[6..8].parse::<u32>() {
            Ok(yy) if yy > pivot => "19",
            _ => "20",
        };
        record.dob = Some(format!(
            "{century}{}/{}/{}",
            &dates[6..8],
            &dates[8..10],
            &dates[10..12]
        ));
    }

    if let Some((sex, height)) = find_sex_height(&raw) {
        record.sex = Some(sex.to_string());
        record.height = Some(format!("{height}cm"));
    }

    record
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn strip_dollar(value: &str) -> &str {
    let value = value.trim();
    value.strip_prefix('$').unwrap_or(value).trim()
}

/// Digits between `;` and `=`, 13 to 16 of them.
fn find_license_number(raw: &str) -> Option<&str> {
    raw.match_indices(';').find_map(|(idx, _)| {
        let rest = &raw[idx + 1..];
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        ((13..=16).contains(&len) && rest[len..].starts_with('=')).then(|| &rest[..len])
    })
}

/// Twelve digits enclosed in `=`.
fn find_dates(raw: &str) -> Option<&str> {
    raw.match_indices('=').find_map(|(idx, _)| {
        let rest = raw[idx + 1..].as_bytes();
        (rest.len() > 12 && rest[..12].iter().all(u8::is_ascii_digit) && rest[12] == b'=')
            .then(|| &raw[idx + 1..idx + 13])
    })
}

/// First `M`/`F` followed by three digits.
fn find_sex_height(raw: &str) -> Option<(char, &str)> {
    let bytes = raw.as_bytes();
    bytes.windows(4).enumerate().find_map(|(idx, w)| {
        (matches!(w[0], b'M' | b'F') && w[1..].iter().all(u8::is_ascii_digit))
            .then(|| (char::from(w[0]), &raw[idx + 1..idx + 4]))
    })
}

/// Canadian postal code, `A1A 1A1` with the space optional.
fn find_postal(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find_map(|start| {
        let rest = &bytes[start..];
        let spaced = rest.get(3) == Some(&b' ');
        let len = if spaced { 7 } else { 6 };
        let code: Vec<u8> = rest
            .get(..len)?
            .iter()
            .copied()
            .filter(|b| !(spaced && *b == b' '))
            .collect();
        let shape_ok = code.len() == 6
            && code.iter().enumerate().all(|(i, b)| {
                if i % 2 == 0 {
                    b.is_ascii_uppercase()
                } else {
                    b.is_ascii_digit()
                }
            });
        shape_ok.then(|| &text[start..start + len])
    })
}
