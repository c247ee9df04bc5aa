use crate::aggregation::{summarize_categories, AggregateBlock, CategoryBlocks};
use crate::filter::matches_year;
use crate::schema::MetricRow;
use crate::utils::MonthCode;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockField {
    Target,
    Actual,
    PercentOfTarget,
}

impl BlockField {
    pub const ALL: [BlockField; 3] = [
        BlockField::Target,
        BlockField::Actual,
        BlockField::PercentOfTarget,
    ];

    pub fn read(&self, block: &AggregateBlock) -> f64 {
        match self {
            BlockField::Target => block.target,
            BlockField::Actual => block.actual,
            BlockField::PercentOfTarget => block.percent_of_target,
        }
    }
}

/// Field-by-field difference against the previous month. Empty when there is
/// nothing to compare with.
pub type BlockDelta = BTreeMap<BlockField, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    pub month: MonthCode,
    pub blocks: CategoryBlocks<AggregateBlock>,
    pub delta: CategoryBlocks<BlockDelta>,
}

/// `curr - prev` for every field, or an empty map if either block is missing.
pub fn block_delta(curr: Option<&AggregateBlock>, prev: Option<&AggregateBlock>) -> BlockDelta {
    match (curr, prev) {
        (Some(curr), Some(prev)) => BlockField::ALL
            .into_iter()
            .map(|field| (field, field.read(curr) - field.read(prev)))
            .collect(),
        _ => BlockDelta::new(),
    }
}

/// Fills month-over-month deltas in place. The first record keeps empty deltas.
pub fn apply_deltas(records: &mut [MonthRecord]) {
    for i in 1..records.len() {
        let delta = CategoryBlocks::from_fn(|category| {
            block_delta(
                Some(records[i].blocks.get(category)),
                Some(records[i - 1].blocks.get(category)),
            )
        });
        records[i].delta = delta;
    }
}

/// Buckets rows into the 12 canonical months and summarizes each bucket.
///
/// Always returns 12 records in calendar order; empty buckets hold zero blocks.
/// Rows whose month label matches no bucket are skipped here.
pub fn build_month_series(rows: &[&MetricRow], year: Option<i32>) -> Vec<MonthRecord> {
    let mut records: Vec<MonthRecord> = MonthCode::ALL
        .into_iter()
        .map(|month| {
            let bucket: Vec<&MetricRow> = rows
                .iter()
                .copied()
                .filter(|row| row.month == month.as_str() && matches_year(row, year))
                .collect();

            debug!("Month {}: {} row(s)", month, bucket.len());

            MonthRecord {
                month,
                blocks: summarize_categories(&bucket),
                delta: CategoryBlocks::default(),
            }
        })
        .collect();

    apply_deltas(&mut records);
    records
}
