//! # Procurement Metrics Builder
//!
//! A library for turning monthly procurement KPI rows into a year summary
//! (year-to-date totals plus twelve monthly buckets with month-over-month deltas)
//! and, optionally, a narrative analysis written by a language model.
//!
//! ## Core Concepts
//!
//! - **Rows**: one observation per project ("obra") and month, with target/actual pairs
//! - **Blocks**: target vs. actual for one metric category, with percentage of target
//! - **Summed metrics**: order and delivery lead times add up across rows
//! - **Averaged metrics**: punctuality and negotiation are means of percentages
//! - **Deltas**: field-by-field difference against the previous month
//!
//! ## Example
//!
//! ```rust
//! use procurement_metrics_builder::*;
//! use serde_json::json;
//!
//! let request = SummaryRequest::from_json(&json!({
//!     "year": 2024,
//!     "entity": "X",
//!     "rows": [
//!         { "entity": "X", "year": 2024, "month": "jan",
//!           "order_lead_time_target": 10, "order_lead_time_actual": 8 }
//!     ]
//! }))
//! .unwrap();
//!
//! let summary = MetricsProcessor::process(&request);
//! assert_eq!(summary.months.len(), 12);
//! assert_eq!(summary.ytd.order_lead_time.percent_of_target, 80.0);
//! ```

pub mod aggregation;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod report;
pub mod schema;
pub mod series;
pub mod summary;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use aggregation::{summarize_block, summarize_categories, AggregateBlock, CategoryBlocks};
pub use config::AppConfig;
pub use error::{FieldViolation, MetricsError, Result};
pub use filter::{filter_rows, matches_year, EntityFilter, ALL_ENTITIES_LABEL};
pub use ingestion::{rows_from_csv, rows_from_csv_path};
pub use report::{ActionItem, ActionPriority, InsightsReport, Narrative};
pub use schema::*;
pub use series::{
    apply_deltas, block_delta, build_month_series, BlockDelta, BlockField, MonthRecord,
};
pub use summary::{build_year_summary, YearSummary};
pub use utils::*;

use log::debug;
use serde_json::Value;

pub struct MetricsProcessor;

impl MetricsProcessor {
    pub fn process(request: &SummaryRequest) -> YearSummary {
        debug!(
            "Processing {} row(s) with target attainment {}",
            request.rows.len(),
            request.target_attainment
        );
        build_year_summary(request)
    }

    /// Validates a raw JSON body and summarizes it. No aggregation happens when
    /// validation fails.
    pub fn process_json(payload: &Value) -> Result<YearSummary> {
        let request = SummaryRequest::from_json(payload)?;
        Ok(Self::process(&request))
    }

    /// Summary-only report, for callers that skip the narrative.
    pub fn report_without_narrative(request: &SummaryRequest) -> InsightsReport {
        InsightsReport::without_narrative(Self::process(request))
    }
}

pub fn summarize_request(request: &SummaryRequest) -> YearSummary {
    MetricsProcessor::process(request)
}
