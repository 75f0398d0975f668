use super::datetime::{parse_date8, parse_datetime12, parse_datetime14};
use super::error::{lossy, RecordError};
use super::numeric::parse_interval_value;
use super::record::*;

/// Width of the record indicator prefix.
pub const INDICATOR_WIDTH: usize = 3;

const DELIMITER: u8 = b',';

/// Field count after the indicator of a 300 record, excluding the interval values:
/// IntervalDate, QualityMethod, ReasonCode, ReasonDescription, UpdateDateTime,
/// MSATSLoadDateTime.
const INTERVAL_DATA_FIXED_FIELDS: usize = 6;
/// Trailing 300 fields that may be omitted entirely.
const INTERVAL_DATA_OPTIONAL_FIELDS: usize = 4;

/// Strip trailing `\r` and `\n` bytes.
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Split the bytes after the indicator on the delimiter in a single pass.
///
/// `capacity` is the expected arity, so 300 records split without reallocating.
fn split_fields(line: &[u8], capacity: usize) -> Vec<&[u8]> {
    let mut fields = Vec::with_capacity(capacity);
    if line.len() <= INDICATOR_WIDTH {
        return fields;
    }

    // Byte INDICATOR_WIDTH is the delimiter that follows the indicator
    let rest = &line[INDICATOR_WIDTH + 1..];
    let mut start = 0;
    for (i, &b) in rest.iter().enumerate() {
        if b == DELIMITER {
            fields.push(&rest[start..i]);
            start = i + 1;
        }
    }
    fields.push(&rest[start..]);
    fields
}

fn check_arity(
    record_type: RecordType,
    fields: &[&[u8]],
    min: usize,
    max: usize,
) -> Result<(), RecordError> {
    if fields.len() < min || fields.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(RecordError::malformed(
            record_type,
            format!("expected {} fields, found {}", expected, fields.len()),
        ));
    }
    Ok(())
}

/// Field at `index`, or empty when the record omitted it.
fn optional_field<'a>(fields: &[&'a [u8]], index: usize) -> &'a [u8] {
    fields.get(index).copied().unwrap_or_default()
}

fn free_text(record_type: RecordType, name: &str, bytes: &[u8]) -> Result<String, RecordError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        RecordError::malformed(record_type, format!("{} is not valid UTF-8", name))
    })
}

fn optional_free_text(
    record_type: RecordType,
    name: &str,
    bytes: &[u8],
) -> Result<Option<String>, RecordError> {
    if bytes.is_empty() {
        Ok(None)
    } else {
        free_text(record_type, name, bytes).map(Some)
    }
}

fn optional_datetime14(bytes: &[u8]) -> Result<Option<chrono::NaiveDateTime>, RecordError> {
    if bytes.is_empty() {
        Ok(None)
    } else {
        parse_datetime14(bytes).map(Some)
    }
}

/// Decode one physical line.
///
/// `interval_length` comes from the active parse context and is only consulted
/// for 300 records, whose arity depends on it. Lines shorter than the
/// indicator decode to `Ok(None)`.
pub fn decode_line(
    line: &[u8],
    interval_length: Option<IntervalLength>,
) -> Result<Option<Record>, RecordError> {
    let line = trim_line_end(line);
    if line.len() < INDICATOR_WIDTH {
        return Ok(None);
    }

    let indicator = &line[..INDICATOR_WIDTH];
    let record_type =
        RecordType::from_indicator(indicator).ok_or_else(|| RecordError::UnknownIndicator {
            indicator: lossy(indicator),
        })?;

    if line.len() > INDICATOR_WIDTH && line[INDICATOR_WIDTH] != DELIMITER {
        return Err(RecordError::malformed(
            record_type,
            "indicator is not followed by a delimiter",
        ));
    }

    let record = match record_type {
        RecordType::Header => Record::Header(decode_header(&split_fields(line, 4))?),
        RecordType::NmiDataDetails => {
            Record::NmiDataDetails(decode_nmi_data_details(&split_fields(line, 9))?)
        }
        RecordType::IntervalData => {
            let interval_length = interval_length.ok_or(RecordError::MissingContext)?;
            let capacity = interval_length.values_per_day() + INTERVAL_DATA_FIXED_FIELDS;
            Record::IntervalData(decode_interval_data(
                &split_fields(line, capacity),
                interval_length,
            )?)
        }
        RecordType::IntervalEvent => {
            Record::IntervalEvent(decode_interval_event(&split_fields(line, 5))?)
        }
        RecordType::B2bDetails => Record::B2bDetails(decode_b2b_details(&split_fields(line, 4))?),
        RecordType::EndOfData => {
            decode_end_of_data(&split_fields(line, 0))?;
            Record::EndOfData
        }
    };

    Ok(Some(record))
}

/// `100,VersionHeader,DateTime,FromParticipant,ToParticipant`
pub fn decode_header(fields: &[&[u8]]) -> Result<HeaderRecord, RecordError> {
    const T: RecordType = RecordType::Header;
    check_arity(T, fields, 4, 4)?;

    Ok(HeaderRecord {
        version_header: FixedField::new(T, "version header", fields[0])?,
        date_time: parse_datetime12(fields[1])?,
        from_participant: FixedField::new(T, "from participant", fields[2])?,
        to_participant: FixedField::new(T, "to participant", fields[3])?,
    })
}

/// `200,NMI,NMIConfiguration,RegisterID,NMISuffix,MDMDataStreamIdentifier,
/// MeterSerialNumber,UOM,IntervalLength[,NextScheduledReadDate]`
pub fn decode_nmi_data_details(fields: &[&[u8]]) -> Result<NmiDataDetailsRecord, RecordError> {
    const T: RecordType = RecordType::NmiDataDetails;
    check_arity(T, fields, 8, 9)?;

    let nmi = FixedField::new(T, "NMI", fields[0])?;
    if nmi.is_empty() {
        return Err(RecordError::malformed(T, "NMI is empty"));
    }

    let next_scheduled_read_date = match optional_field(fields, 8) {
        b"" => None,
        date => Some(parse_date8(date)?),
    };

    Ok(NmiDataDetailsRecord {
        nmi,
        nmi_configuration: free_text(T, "NMI configuration", fields[1])?,
        register_id: FixedField::optional(T, "register id", fields[2])?,
        nmi_suffix: FixedField::new(T, "NMI suffix", fields[3])?,
        mdm_data_stream_identifier: FixedField::optional(
            T,
            "MDM data stream identifier",
            fields[4],
        )?,
        meter_serial_number: FixedField::optional(T, "meter serial number", fields[5])?,
        uom: FixedField::new(T, "unit of measure", fields[6])?,
        interval_length: IntervalLength::parse(fields[7])?,
        next_scheduled_read_date,
    })
}

/// `300,IntervalDate,IntervalValue1..IntervalValueN,QualityMethod[,ReasonCode,
/// ReasonDescription,UpdateDateTime,MSATSLoadDateTime]`
pub fn decode_interval_data(
    fields: &[&[u8]],
    interval_length: IntervalLength,
) -> Result<IntervalDataRecord, RecordError> {
    const T: RecordType = RecordType::IntervalData;
    let n = interval_length.values_per_day();
    let max = n + INTERVAL_DATA_FIXED_FIELDS;
    check_arity(T, fields, max - INTERVAL_DATA_OPTIONAL_FIELDS, max)?;

    let interval_date = parse_date8(fields[0])?;

    let mut interval_values = Vec::with_capacity(n);
    for (i, field) in fields[1..=n].iter().enumerate() {
        let value = parse_interval_value(field).map_err(|e| {
            RecordError::malformed(T, format!("interval value {}: {}", i + 1, e))
        })?;
        interval_values.push(value);
    }

    let quality_method = FixedField::new(T, "quality method", fields[n + 1])?;
    if quality_method.is_empty() {
        return Err(RecordError::malformed(T, "quality method is empty"));
    }

    Ok(IntervalDataRecord {
        interval_date,
        interval_values,
        quality_method,
        reason_code: FixedField::optional(T, "reason code", optional_field(fields, n + 2))?,
        reason_description: optional_free_text(
            T,
            "reason description",
            optional_field(fields, n + 3),
        )?,
        update_date_time: optional_datetime14(optional_field(fields, n + 4))?,
        msats_load_date_time: optional_datetime14(optional_field(fields, n + 5))?,
    })
}

/// `400,StartInterval,EndInterval,QualityMethod[,ReasonCode,ReasonDescription]`
pub fn decode_interval_event(fields: &[&[u8]]) -> Result<IntervalEventRecord, RecordError> {
    const T: RecordType = RecordType::IntervalEvent;
    check_arity(T, fields, 3, 5)?;

    Ok(IntervalEventRecord {
        start_interval: FixedField::new(T, "start interval", fields[0])?,
        end_interval: FixedField::new(T, "end interval", fields[1])?,
        quality_method: FixedField::new(T, "quality method", fields[2])?,
        reason_code: FixedField::optional(T, "reason code", optional_field(fields, 3))?,
        reason_description: optional_free_text(
            T,
            "reason description",
            optional_field(fields, 4),
        )?,
    })
}

/// `500,TransCode[,RetServiceOrder,ReadDateTime,IndexRead]`
pub fn decode_b2b_details(fields: &[&[u8]]) -> Result<B2bDetailsRecord, RecordError> {
    const T: RecordType = RecordType::B2bDetails;
    check_arity(T, fields, 1, 4)?;

    Ok(B2bDetailsRecord {
        trans_code: FixedField::new(T, "trans code", fields[0])?,
        ret_service_order: FixedField::optional(
            T,
            "retailer service order",
            optional_field(fields, 1),
        )?,
        read_date_time: optional_datetime14(optional_field(fields, 2))?,
        index_read: FixedField::optional(T, "index read", optional_field(fields, 3))?,
    })
}

/// `900`, optionally followed by empty fields.
pub fn decode_end_of_data(fields: &[&[u8]]) -> Result<(), RecordError> {
    if fields.iter().any(|f| !f.is_empty()) {
        return Err(RecordError::malformed(
            RecordType::EndOfData,
            format!("unexpected fields after indicator: {}", fields.len()),
        ));
    }
    Ok(())
}
