use crate::error::{MetricsError, Result};
use crate::schema::{MetricRow, RawRow};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One spreadsheet line. Headers follow the JSON row field names.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, alias = "obra")]
    entity: Option<String>,
    #[serde(default, alias = "ano")]
    year: Option<String>,
    #[serde(default, alias = "mes")]
    month: Option<String>,
    #[serde(default)]
    order_lead_time_target: Option<String>,
    #[serde(default)]
    order_lead_time_actual: Option<String>,
    #[serde(default)]
    delivery_lead_time_target: Option<String>,
    #[serde(default)]
    delivery_lead_time_actual: Option<String>,
    #[serde(default)]
    punctuality_target: Option<String>,
    #[serde(default)]
    punctuality_actual: Option<String>,
    #[serde(default)]
    negotiation_target: Option<String>,
    #[serde(default)]
    negotiation_actual: Option<String>,
}

fn cell(value: Option<String>) -> Value {
    match value {
        Some(s) if !s.trim().is_empty() => Value::String(s),
        _ => Value::Null,
    }
}

fn year_cell(value: Option<String>) -> Value {
    match cell(value) {
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(year) => Value::from(year),
            Err(_) => Value::String(s),
        },
        other => other,
    }
}

impl From<CsvRow> for RawRow {
    fn from(row: CsvRow) -> Self {
        RawRow {
            entity: row.entity.map(Value::String).unwrap_or(Value::Null),
            year: year_cell(row.year),
            month: row.month.map(Value::String).unwrap_or(Value::Null),
            order_lead_time_target: cell(row.order_lead_time_target),
            order_lead_time_actual: cell(row.order_lead_time_actual),
            delivery_lead_time_target: cell(row.delivery_lead_time_target),
            delivery_lead_time_actual: cell(row.delivery_lead_time_actual),
            punctuality_target: cell(row.punctuality_target),
            punctuality_actual: cell(row.punctuality_actual),
            negotiation_target: cell(row.negotiation_target),
            negotiation_actual: cell(row.negotiation_actual),
        }
    }
}

/// Reads metric rows from a CSV export with a header line.
///
/// Every invalid line is reported in a single [`MetricsError::Validation`];
/// malformed CSV (e.g. ragged lines) fails with [`MetricsError::CsvError`].
pub fn rows_from_csv<R: Read>(reader: R) -> Result<Vec<MetricRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut violations = Vec::new();

    for (idx, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let raw: RawRow = record?.into();
        if let Some(row) = raw.validate(&format!("rows[{}]", idx), &mut violations) {
            rows.push(row);
        }
    }

    if !violations.is_empty() {
        return Err(MetricsError::Validation(violations));
    }

    log::debug!("Loaded {} row(s) from CSV", rows.len());
    Ok(rows)
}

pub fn rows_from_csv_path(path: impl AsRef<Path>) -> Result<Vec<MetricRow>> {
    let file = File::open(path.as_ref())?;
    rows_from_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_with_portuguese_headers() {
        let data = "\
obra,ano,mes,order_lead_time_target,order_lead_time_actual,punctuality_target,punctuality_actual
Obra A,2024,janeiro,10,8,95,90
Obra A,2024,fevereiro,12,,95,n/a
";
        let rows = rows_from_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity, "Obra A");
        assert_eq!(rows[0].year, Some(2024));
        assert_eq!(rows[0].month, "JAN");
        assert_eq!(rows[0].order_lead_time_target, Some(10.0));
        assert_eq!(rows[1].month, "FEV");
        assert_eq!(rows[1].order_lead_time_actual, None);
        assert_eq!(rows[1].punctuality_actual, None);
        assert_eq!(rows[1].negotiation_target, None);
    }

    #[test]
    fn test_reports_every_bad_line() {
        let data = "\
entity,year,month
,2024,jan
Obra B,twenty,
Obra C,2024,mar
";
        let err = rows_from_csv(data.as_bytes()).unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["rows[0].entity", "rows[1].month", "rows[1].year"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = rows_from_csv_path("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, MetricsError::IoError(_)));
    }
}
