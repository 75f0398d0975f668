use crate::nem12::decode::{trim_line_end, INDICATOR_WIDTH};
use crate::nem12::{decode_line, IntervalLength, Record, RecordError, RecordType};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// State carried from a 200 record to the 300 records that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub nmi: Arc<str>,
    pub interval_length: IntervalLength,
}

/// One 300 record bound to the NMI it belongs to. The unit of expansion work.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalJob {
    pub nmi: Arc<str>,
    pub interval_date: NaiveDate,
    pub interval_length: IntervalLength,
    pub values: Vec<f64>,
    /// Source line, for diagnostics
    pub line: u64,
}

/// A decode failure that invalidates the rest of the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {record_type} record: {error}")]
pub struct FatalRecordError {
    pub line: u64,
    pub record_type: RecordType,
    pub error: RecordError,
}

/// What the processor did with one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Shorter than a record indicator
    Blank,
    /// Well-formed record with no effect on the output
    Validated(RecordType),
    /// A 200 record replaced the parse context
    ContextChanged,
    /// A 300 record ready for expansion
    Job(IntervalJob),
    /// A 900 record; nothing after it is read
    EndOfData,
    /// Malformed record that does not affect parse context, skipped
    Rejected,
}

/// Per-type record counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub header: u64,
    pub nmi_data_details: u64,
    pub interval_data: u64,
    pub interval_event: u64,
    pub b2b_details: u64,
    pub end_of_data: u64,
}

impl RecordCounts {
    pub fn increment(&mut self, record_type: RecordType) {
        let counter = match record_type {
            RecordType::Header => &mut self.header,
            RecordType::NmiDataDetails => &mut self.nmi_data_details,
            RecordType::IntervalData => &mut self.interval_data,
            RecordType::IntervalEvent => &mut self.interval_event,
            RecordType::B2bDetails => &mut self.b2b_details,
            RecordType::EndOfData => &mut self.end_of_data,
        };
        *counter += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines: u64,
    pub blank_lines: u64,
    pub records: RecordCounts,
    pub rejected: u64,
}

/// Sequential, context-carrying router of NEM12 lines.
///
/// Owns the parse context exclusively. Decode failures of 200 and 300
/// records are fatal; failures of every other record are logged and skipped.
#[derive(Debug, Default)]
pub struct LineProcessor {
    context: Option<ParseContext>,
    stats: ScanStats,
}

impl LineProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context established by the most recent 200 record
    pub fn context(&self) -> Option<&ParseContext> {
        self.context.as_ref()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }

    /// Decode and route one line.
    pub fn process_line(
        &mut self,
        line_no: u64,
        line: &[u8],
    ) -> Result<LineOutcome, FatalRecordError> {
        self.stats.lines += 1;

        let interval_length = self.context.as_ref().map(|c| c.interval_length);
        match decode_line(line, interval_length) {
            Ok(None) => {
                self.stats.blank_lines += 1;
                Ok(LineOutcome::Blank)
            }
            Ok(Some(record)) => {
                self.stats.records.increment(record.record_type());
                self.route(line_no, record)
            }
            Err(error) => self.reject(line_no, line, error),
        }
    }

    fn route(&mut self, line_no: u64, record: Record) -> Result<LineOutcome, FatalRecordError> {
        match record {
            Record::Header(_) => Ok(LineOutcome::Validated(RecordType::Header)),
            Record::IntervalEvent(_) => Ok(LineOutcome::Validated(RecordType::IntervalEvent)),
            Record::B2bDetails(_) => Ok(LineOutcome::Validated(RecordType::B2bDetails)),
            Record::NmiDataDetails(details) => {
                let context = ParseContext {
                    nmi: Arc::from(details.nmi.as_str()),
                    interval_length: details.interval_length,
                };
                debug!(
                    line = line_no,
                    nmi = %context.nmi,
                    interval_length = %context.interval_length,
                    "Parse context changed"
                );
                self.context = Some(context);
                Ok(LineOutcome::ContextChanged)
            }
            Record::IntervalData(data) => {
                let Some(context) = &self.context else {
                    return Err(FatalRecordError {
                        line: line_no,
                        record_type: RecordType::IntervalData,
                        error: RecordError::MissingContext,
                    });
                };
                Ok(LineOutcome::Job(IntervalJob {
                    nmi: Arc::clone(&context.nmi),
                    interval_date: data.interval_date,
                    interval_length: context.interval_length,
                    values: data.interval_values,
                    line: line_no,
                }))
            }
            Record::EndOfData => Ok(LineOutcome::EndOfData),
        }
    }

    fn reject(
        &mut self,
        line_no: u64,
        line: &[u8],
        error: RecordError,
    ) -> Result<LineOutcome, FatalRecordError> {
        let record_type = trim_line_end(line)
            .get(..INDICATOR_WIDTH)
            .and_then(RecordType::from_indicator);

        match record_type {
            Some(record_type) if record_type.is_load_bearing() => Err(FatalRecordError {
                line: line_no,
                record_type,
                error,
            }),
            _ => {
                warn!(line = line_no, error = %error, "Skipping malformed record");
                self.stats.rejected += 1;
                Ok(LineOutcome::Rejected)
            }
        }
    }
}
