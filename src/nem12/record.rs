use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::error::{lossy, RecordError};

/// Minutes in one interval day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// The six NEM12 record kinds, keyed by their 3-character indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Header,
    NmiDataDetails,
    IntervalData,
    IntervalEvent,
    B2bDetails,
    EndOfData,
}

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::Header,
        RecordType::NmiDataDetails,
        RecordType::IntervalData,
        RecordType::IntervalEvent,
        RecordType::B2bDetails,
        RecordType::EndOfData,
    ];

    pub fn indicator(self) -> &'static str {
        match self {
            RecordType::Header => "100",
            RecordType::NmiDataDetails => "200",
            RecordType::IntervalData => "300",
            RecordType::IntervalEvent => "400",
            RecordType::B2bDetails => "500",
            RecordType::EndOfData => "900",
        }
    }

    pub fn from_indicator(indicator: &[u8]) -> Option<Self> {
        match indicator {
            b"100" => Some(RecordType::Header),
            b"200" => Some(RecordType::NmiDataDetails),
            b"300" => Some(RecordType::IntervalData),
            b"400" => Some(RecordType::IntervalEvent),
            b"500" => Some(RecordType::B2bDetails),
            b"900" => Some(RecordType::EndOfData),
            _ => None,
        }
    }

    /// Whether a decode failure of this record type invalidates everything after it.
    ///
    /// 200 records establish the parse context and 300 records carry the
    /// readings, so a bad one of either aborts the run. The rest are only
    /// validated.
    pub fn is_load_bearing(self) -> bool {
        matches!(self, RecordType::NmiDataDetails | RecordType::IntervalData)
    }

    fn name(self) -> &'static str {
        match self {
            RecordType::Header => "header",
            RecordType::NmiDataDetails => "NMI data details",
            RecordType::IntervalData => "interval data",
            RecordType::IntervalEvent => "interval event",
            RecordType::B2bDetails => "B2B details",
            RecordType::EndOfData => "end of data",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.indicator(), self.name())
    }
}

/// Fixed-capacity ASCII field, stored inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedField<const N: usize> {
    buf: [u8; N],
    len: u8,
}

impl<const N: usize> FixedField<N> {
    /// Copy `bytes` into the field, rejecting values wider than `N` or non-ASCII input.
    pub fn new(record_type: RecordType, name: &str, bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() > N {
            return Err(RecordError::malformed(
                record_type,
                format!(
                    "{} '{}' exceeds {} characters",
                    name,
                    lossy(bytes),
                    N
                ),
            ));
        }
        if !bytes.is_ascii() {
            return Err(RecordError::malformed(
                record_type,
                format!("{} '{}' is not ASCII", name, lossy(bytes)),
            ));
        }

        let mut buf = [0u8; N];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            buf,
            len: bytes.len() as u8,
        })
    }

    /// Like `new`, but an empty field is absent rather than an empty value.
    pub fn optional(
        record_type: RecordType,
        name: &str,
        bytes: &[u8],
    ) -> Result<Option<Self>, RecordError> {
        if bytes.is_empty() {
            Ok(None)
        } else {
            Self::new(record_type, name, bytes).map(Some)
        }
    }

    pub fn as_str(&self) -> &str {
        // Construction only accepts ASCII
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> fmt::Debug for FixedField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minutes per interval. Always a positive divisor of 1440.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalLength(u32);

impl IntervalLength {
    pub fn new(minutes: u32) -> Option<Self> {
        if minutes > 0 && MINUTES_PER_DAY % minutes == 0 {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Parse the textual field of a 200 record.
    pub fn parse(field: &[u8]) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidIntervalLength {
            value: lossy(field),
        };

        if field.is_empty() || !field.iter().all(u8::is_ascii_digit) || field.len() > 4 {
            return Err(invalid());
        }
        let minutes = field
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        Self::new(minutes).ok_or_else(invalid)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Number of interval values a 300 record must carry.
    pub fn values_per_day(self) -> usize {
        (MINUTES_PER_DAY / self.0) as usize
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl fmt::Display for IntervalLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// 100 record. One per file, paired with a 900 record.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub version_header: FixedField<5>,
    pub date_time: NaiveDateTime,
    pub from_participant: FixedField<10>,
    pub to_participant: FixedField<10>,
}

/// 200 record. Sets the NMI and interval length for the 300-500 records that follow.
#[derive(Debug, Clone, PartialEq)]
pub struct NmiDataDetailsRecord {
    pub nmi: FixedField<10>,
    pub nmi_configuration: String,
    pub register_id: Option<FixedField<10>>,
    pub nmi_suffix: FixedField<2>,
    pub mdm_data_stream_identifier: Option<FixedField<2>>,
    pub meter_serial_number: Option<FixedField<12>>,
    pub uom: FixedField<5>,
    pub interval_length: IntervalLength,
    pub next_scheduled_read_date: Option<NaiveDate>,
}

/// 300 record: one day of interval values for the active NMI.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalDataRecord {
    pub interval_date: NaiveDate,
    /// Exactly `1440 / interval_length` non-negative values.
    pub interval_values: Vec<f64>,
    pub quality_method: FixedField<3>,
    pub reason_code: Option<FixedField<3>>,
    pub reason_description: Option<String>,
    pub update_date_time: Option<NaiveDateTime>,
    pub msats_load_date_time: Option<NaiveDateTime>,
}

/// 400 record
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalEventRecord {
    pub start_interval: FixedField<4>,
    pub end_interval: FixedField<4>,
    pub quality_method: FixedField<3>,
    pub reason_code: Option<FixedField<3>>,
    pub reason_description: Option<String>,
}

/// 500 record
#[derive(Debug, Clone, PartialEq)]
pub struct B2bDetailsRecord {
    pub trans_code: FixedField<1>,
    pub ret_service_order: Option<FixedField<15>>,
    pub read_date_time: Option<NaiveDateTime>,
    pub index_read: Option<FixedField<15>>,
}

/// One decoded NEM12 line.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    NmiDataDetails(NmiDataDetailsRecord),
    IntervalData(IntervalDataRecord),
    IntervalEvent(IntervalEventRecord),
    B2bDetails(B2bDetailsRecord),
    EndOfData,
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Header(_) => RecordType::Header,
            Record::NmiDataDetails(_) => RecordType::NmiDataDetails,
            Record::IntervalData(_) => RecordType::IntervalData,
            Record::IntervalEvent(_) => RecordType::IntervalEvent,
            Record::B2bDetails(_) => RecordType::B2bDetails,
            Record::EndOfData => RecordType::EndOfData,
        }
    }
}
