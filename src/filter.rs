use crate::schema::MetricRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label clients send to request every project at once.
pub const ALL_ENTITIES_LABEL: &str = "Todas";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum EntityFilter {
    All,
    Named(String),
}

impl EntityFilter {
    /// `None`, blank, or "Todas" (any case) select every entity. Any other
    /// label is kept verbatim so it compares exactly against row labels.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            None => EntityFilter::All,
            Some(l) if l.trim().is_empty() => EntityFilter::All,
            Some(l) if l.trim().eq_ignore_ascii_case(ALL_ENTITIES_LABEL) => EntityFilter::All,
            Some(l) => EntityFilter::Named(l.to_string()),
        }
    }

    /// Exact label comparison for named filters.
    pub fn matches(&self, row: &MetricRow) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::Named(name) => row.entity == *name,
        }
    }

    /// Label used in summaries: the entity name, or "All".
    pub fn display_label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityFilter::All => f.write_str("All"),
            EntityFilter::Named(name) => f.write_str(name),
        }
    }
}

/// Keeps rows for the requested entity, preserving input order.
pub fn filter_rows<'a>(rows: &'a [MetricRow], entity: &EntityFilter) -> Vec<&'a MetricRow> {
    rows.iter().filter(|row| entity.matches(row)).collect()
}

/// Year predicate applied per bucket and for YTD. Rows without a year only
/// pass when no year was requested.
pub fn matches_year(row: &MetricRow, year: Option<i32>) -> bool {
    match year {
        None => true,
        Some(y) => row.year == Some(y),
    }
}
