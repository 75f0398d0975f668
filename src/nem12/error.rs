use super::record::RecordType;
use thiserror::Error;

/// Errors raised while decoding a single NEM12 line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("invalid date '{value}'")]
    InvalidDate { value: String },

    #[error("invalid datetime '{value}'")]
    InvalidDateTime { value: String },

    #[error("malformed {record_type} record: {reason}")]
    MalformedRecord {
        record_type: RecordType,
        reason: String,
    },

    #[error("invalid numeric literal '{literal}'")]
    InvalidNumericLiteral { literal: String },

    #[error("interval data record before any NMI data details record")]
    MissingContext,

    #[error("invalid interval length '{value}': must be a positive divisor of 1440")]
    InvalidIntervalLength { value: String },

    #[error("unknown record indicator '{indicator}'")]
    UnknownIndicator { indicator: String },
}

impl RecordError {
    pub(crate) fn malformed(record_type: RecordType, reason: impl Into<String>) -> Self {
        RecordError::MalformedRecord {
            record_type,
            reason: reason.into(),
        }
    }
}

/// Lossy rendering of raw field bytes for error messages
pub(crate) fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
