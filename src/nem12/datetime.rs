use chrono::{NaiveDate, NaiveDateTime};

use super::error::{lossy, RecordError};

/// Parse a run of ASCII digits. Callers have already checked the length.
fn digits(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}

fn date_part(bytes: &[u8]) -> Option<NaiveDate> {
    let year = digits(&bytes[0..4])?;
    let month = digits(&bytes[4..6])?;
    let day = digits(&bytes[6..8])?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// `CCYYMMDD`
pub fn parse_date8(value: &[u8]) -> Result<NaiveDate, RecordError> {
    if value.len() != 8 {
        return Err(RecordError::InvalidDate {
            value: lossy(value),
        });
    }
    date_part(value).ok_or_else(|| RecordError::InvalidDate {
        value: lossy(value),
    })
}

/// `CCYYMMDDhhmm`
pub fn parse_datetime12(value: &[u8]) -> Result<NaiveDateTime, RecordError> {
    let invalid = || RecordError::InvalidDateTime {
        value: lossy(value),
    };
    if value.len() != 12 {
        return Err(invalid());
    }

    let date = date_part(value).ok_or_else(invalid)?;
    let hour = digits(&value[8..10]).ok_or_else(invalid)?;
    let minute = digits(&value[10..12]).ok_or_else(invalid)?;
    date.and_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// `CCYYMMDDhhmmss`
pub fn parse_datetime14(value: &[u8]) -> Result<NaiveDateTime, RecordError> {
    let invalid = || RecordError::InvalidDateTime {
        value: lossy(value),
    };
    if value.len() != 14 {
        return Err(invalid());
    }

    let date = date_part(value).ok_or_else(invalid)?;
    let hour = digits(&value[8..10]).ok_or_else(invalid)?;
    let minute = digits(&value[10..12]).ok_or_else(invalid)?;
    let second = digits(&value[12..14]).ok_or_else(invalid)?;
    date.and_hms_opt(hour, minute, second).ok_or_else(invalid)
}
