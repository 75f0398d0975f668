//! NEM12 meter data file grammar.
//!
//! A NEM12 file is a sequence of comma-delimited records whose first three
//! characters select the record type. The 300 (interval data) record carries
//! `1440 / IntervalLength` values, where the interval length comes from the
//! most recent 200 (NMI data details) record.

pub mod datetime;
pub mod decode;
pub mod error;
pub mod numeric;
pub mod record;

pub use decode::decode_line;
pub use error::RecordError;
pub use numeric::parse_interval_value;
pub use record::{
    B2bDetailsRecord, FixedField, HeaderRecord, IntervalDataRecord, IntervalEventRecord,
    IntervalLength, NmiDataDetailsRecord, Record, RecordType,
};
