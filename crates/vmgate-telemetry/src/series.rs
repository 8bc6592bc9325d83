//! CSV result parsing.
//!
//! The query asks for plain CSV (header row, no annotations). A response
//! with several tables repeats the header before each table; blank lines
//! between tables are skipped by the reader. Only `_time` and `_value` are
//! kept.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// One aggregated sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Column positions of the table currently being read.
struct Columns {
    time: usize,
    value: usize,
}

/// Parse a CSV query response into points, preserving row order.
///
/// Rows with an empty `_value` are empty windows and are dropped.
pub fn parse_series(body: &str) -> TelemetryResult<Vec<SeriesPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut columns: Option<Columns> = None;
    let mut in_error_table = false;
    let mut points = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| TelemetryError::Query(format!("malformed CSV: {e}")))?;

        // An `error,reference` header followed by the message row can
        // replace the tables or follow tables already streamed.
        if in_error_table {
            let message = record
                .get(0)
                .filter(|m| !m.is_empty())
                .unwrap_or("query failed without a message");
            return Err(TelemetryError::Query(message.to_string()));
        }
        if record.get(0) == Some("error") && record.get(1) == Some("reference") {
            in_error_table = true;
            continue;
        }

        let time_idx = record.iter().position(|f| f == "_time");
        let value_idx = record.iter().position(|f| f == "_value");
        if let (Some(time), Some(value)) = (time_idx, value_idx) {
            columns = Some(Columns { time, value });
            continue;
        }

        let Some(cols) = &columns else {
            let message = record
                .get(0)
                .filter(|m| !m.is_empty())
                .unwrap_or("row before header in query response");
            return Err(TelemetryError::Query(message.to_string()));
        };

        let raw_value = record.get(cols.value).unwrap_or("").trim();
        if raw_value.is_empty() {
            continue;
        }
        let raw_time = record.get(cols.time).unwrap_or("").trim();

        let time = DateTime::parse_from_rfc3339(raw_time)
            .map_err(|e| TelemetryError::Query(format!("bad _time {raw_time:?}: {e}")))?
            .with_timezone(&Utc);
        let value = raw_value
            .parse::<f64>()
            .map_err(|e| TelemetryError::Query(format!("bad _value {raw_value:?}: {e}")))?;

        points.push(SeriesPoint { time, value });
    }

    if in_error_table {
        return Err(TelemetryError::Query("query failed without a message".into()));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_table() {
        let body = "\
,result,table,_start,_stop,_time,_value,_field,_measurement,vmname
,mean,0,2024-05-01T10:00:00Z,2024-05-01T12:00:00Z,2024-05-01T10:01:00Z,12.5,usage_average,vsphere_vm_cpu,web01
,mean,0,2024-05-01T10:00:00Z,2024-05-01T12:00:00Z,2024-05-01T10:02:00Z,14,usage_average,vsphere_vm_cpu,web01
";
        let points = parse_series(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 12.5);
        assert_eq!(points[1].value, 14.0);
        assert!(points[0].time < points[1].time);
    }

    #[test]
    fn parses_multiple_tables_and_skips_empty_values() {
        let body = "\
,result,table,_time,_value
,mean,0,2024-05-01T10:01:00Z,1.0
,mean,0,2024-05-01T10:02:00Z,

,result,table,_time,_value
,mean,1,2024-05-01T10:03:00Z,3.0
";
        let points = parse_series(body).unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn empty_body_is_empty_series() {
        assert!(parse_series("").unwrap().is_empty());
        assert!(parse_series("\r\n").unwrap().is_empty());
    }

    #[test]
    fn in_band_error_is_reported() {
        let body = "error,reference\nfailed to compile query,897\n";
        let err = parse_series(body).unwrap_err();
        assert!(matches!(err, TelemetryError::Query(ref m) if m.contains("failed to compile")));
    }

    #[test]
    fn error_after_data_table_fails_the_whole_query() {
        let body = "\
,result,table,_time,_value
,mean,0,2024-05-01T10:01:00Z,1.0

error,reference
panic: runtime error during query execution,
";
        let err = parse_series(body).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::Query(ref m) if m.starts_with("panic: runtime error")
        ));
    }

    #[test]
    fn error_header_without_message_still_fails() {
        let body = "\
,result,table,_time,_value
,mean,0,2024-05-01T10:01:00Z,1.0
error,reference
";
        assert!(matches!(parse_series(body), Err(TelemetryError::Query(_))));
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let body = ",result,table,_time,_value\n,mean,0,2024-05-01T10:01:00Z,abc\n";
        assert!(matches!(parse_series(body), Err(TelemetryError::Query(_))));
    }

    #[test]
    fn serializes_time_as_rfc3339() {
        let point = SeriesPoint {
            time: DateTime::parse_from_rfc3339("2024-05-01T10:01:00Z")
                .unwrap()
                .with_timezone(&Utc),
            value: 2.5,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["time"], "2024-05-01T10:01:00Z");
        assert_eq!(json["value"], 2.5);
    }
}
