use crate::aggregation::{summarize_categories, AggregateBlock, CategoryBlocks};
use crate::filter::{filter_rows, matches_year};
use crate::schema::{MetricRow, SummaryRequest};
use crate::series::{build_month_series, MonthRecord};
use crate::utils::MonthCode;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    /// Entity label, or "All" when every entity was requested
    pub entity: String,
    pub year: Option<i32>,
    /// Fraction of target considered acceptable, in (0, 1]
    pub target_attainment: f64,
    pub ytd: CategoryBlocks<AggregateBlock>,
    /// Exactly 12 records, JAN..DEZ
    pub months: Vec<MonthRecord>,
}

impl YearSummary {
    pub fn month(&self, month: MonthCode) -> Option<&MonthRecord> {
        self.months.iter().find(|r| r.month == month)
    }

    /// Months that received at least one non-zero figure.
    pub fn active_months(&self) -> Vec<MonthCode> {
        self.months
            .iter()
            .filter(|r| r.blocks.iter().any(|(_, b)| *b != AggregateBlock::zero()))
            .map(|r| r.month)
            .collect()
    }
}

/// Filters, buckets and aggregates the rows of a validated request.
pub fn build_year_summary(request: &SummaryRequest) -> YearSummary {
    info!(
        "Building year summary for entity '{}' (year: {:?})",
        request.entity, request.year
    );

    let filtered = filter_rows(&request.rows, &request.entity);
    debug!(
        "{} of {} row(s) matched the entity filter",
        filtered.len(),
        request.rows.len()
    );

    let ytd_rows: Vec<&MetricRow> = filtered
        .iter()
        .copied()
        .filter(|row| matches_year(row, request.year))
        .collect();
    debug!("{} row(s) contribute to year-to-date totals", ytd_rows.len());

    let months = build_month_series(&filtered, request.year);
    let ytd = summarize_categories(&ytd_rows);

    YearSummary {
        entity: request.entity.display_label(),
        year: request.year,
        target_attainment: request.target_attainment,
        ytd,
        months,
    }
}
