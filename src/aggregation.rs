use crate::schema::{MetricCategory, MetricRow};
use crate::utils::{coerce_number, percent_of};
use serde::{Deserialize, Serialize};

/// Target vs. actual for one metric category over a set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateBlock {
    pub target: f64,
    pub actual: f64,
    pub percent_of_target: f64,
}

impl AggregateBlock {
    pub fn new(target: f64, actual: f64) -> Self {
        Self {
            target,
            actual,
            percent_of_target: percent_of(actual, target),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// One value per metric category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryBlocks<T> {
    pub order_lead_time: T,
    pub delivery_lead_time: T,
    pub punctuality: T,
    pub negotiation: T,
}

impl<T> CategoryBlocks<T> {
    pub fn from_fn(mut f: impl FnMut(MetricCategory) -> T) -> Self {
        Self {
            order_lead_time: f(MetricCategory::OrderLeadTime),
            delivery_lead_time: f(MetricCategory::DeliveryLeadTime),
            punctuality: f(MetricCategory::Punctuality),
            negotiation: f(MetricCategory::Negotiation),
        }
    }

    pub fn get(&self, category: MetricCategory) -> &T {
        match category {
            MetricCategory::OrderLeadTime => &self.order_lead_time,
            MetricCategory::DeliveryLeadTime => &self.delivery_lead_time,
            MetricCategory::Punctuality => &self.punctuality,
            MetricCategory::Negotiation => &self.negotiation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricCategory, &T)> + '_ {
        MetricCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Reduces rows into a block.
///
/// Summed categories add the coerced values. Averaged categories divide the
/// running sum by the number of rows seen, so a row with a missing or NaN value
/// still counts in the denominator and pulls the mean towards zero.
pub fn summarize_block<'a, I>(rows: I, category: MetricCategory) -> AggregateBlock
where
    I: IntoIterator<Item = &'a MetricRow>,
{
    let mut target_sum = 0.0;
    let mut actual_sum = 0.0;
    let mut n = 0usize;

    for row in rows {
        let (target, actual) = row.metric(category);
        target_sum += coerce_number(target);
        actual_sum += coerce_number(actual);
        n += 1;
    }

    if !category.is_percent() {
        return AggregateBlock::new(target_sum, actual_sum);
    }

    if n == 0 {
        return AggregateBlock::zero();
    }

    AggregateBlock::new(target_sum / n as f64, actual_sum / n as f64)
}

/// Runs [`summarize_block`] once per category over the same rows.
pub fn summarize_categories(rows: &[&MetricRow]) -> CategoryBlocks<AggregateBlock> {
    CategoryBlocks::from_fn(|category| summarize_block(rows.iter().copied(), category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: MetricCategory, target: Option<f64>, actual: Option<f64>) -> MetricRow {
        MetricRow::new("X", Some(2024), "jan").with_metric(category, target, actual)
    }

    #[test]
    fn test_summed_block() {
        let rows = vec![
            row(MetricCategory::OrderLeadTime, Some(100.0), Some(80.0)),
            row(MetricCategory::OrderLeadTime, Some(50.0), Some(60.0)),
        ];
        let block = summarize_block(&rows, MetricCategory::OrderLeadTime);
        assert_eq!(block.target, 150.0);
        assert_eq!(block.actual, 140.0);
        assert!((block.percent_of_target - 93.333_333).abs() < 1e-4);
    }

    #[test]
    fn test_summed_block_treats_missing_as_zero() {
        let rows = vec![
            row(MetricCategory::DeliveryLeadTime, None, Some(4.0)),
            row(MetricCategory::DeliveryLeadTime, Some(f64::NAN), None),
            row(MetricCategory::DeliveryLeadTime, Some(10.0), Some(6.0)),
        ];
        let block = summarize_block(&rows, MetricCategory::DeliveryLeadTime);
        assert_eq!(block.target, 10.0);
        assert_eq!(block.actual, 10.0);
        assert_eq!(block.percent_of_target, 100.0);
    }

    #[test]
    fn test_averaged_block_counts_nan_rows_in_denominator() {
        let rows = vec![
            row(MetricCategory::Punctuality, Some(10.0), Some(5.0)),
            row(MetricCategory::Punctuality, Some(f64::NAN), Some(5.0)),
            row(MetricCategory::Punctuality, Some(20.0), Some(5.0)),
        ];
        let block = summarize_block(&rows, MetricCategory::Punctuality);
        assert_eq!(block.target, 10.0);
        assert_eq!(block.actual, 5.0);
        assert_eq!(block.percent_of_target, 50.0);
    }

    #[test]
    fn test_averaged_block_empty_is_zero() {
        let rows: Vec<MetricRow> = Vec::new();
        let block = summarize_block(&rows, MetricCategory::Negotiation);
        assert_eq!(block, AggregateBlock::zero());
    }

    #[test]
    fn test_zero_target_percent_is_zero() {
        let rows = vec![row(MetricCategory::OrderLeadTime, Some(0.0), Some(12.0))];
        let block = summarize_block(&rows, MetricCategory::OrderLeadTime);
        assert_eq!(block.actual, 12.0);
        assert_eq!(block.percent_of_target, 0.0);
        assert!(block.percent_of_target.is_finite());
    }

    #[test]
    fn test_summarize_categories_routes_each_field() {
        let r = MetricRow::new("X", Some(2024), "jan")
            .with_metric(MetricCategory::OrderLeadTime, Some(10.0), Some(8.0))
            .with_metric(MetricCategory::DeliveryLeadTime, Some(20.0), Some(25.0))
            .with_metric(MetricCategory::Punctuality, Some(90.0), Some(81.0))
            .with_metric(MetricCategory::Negotiation, Some(5.0), Some(6.0));
        let blocks = summarize_categories(&[&r]);

        assert_eq!(blocks.order_lead_time, AggregateBlock::new(10.0, 8.0));
        assert_eq!(blocks.delivery_lead_time, AggregateBlock::new(20.0, 25.0));
        assert_eq!(blocks.punctuality, AggregateBlock::new(90.0, 81.0));
        assert_eq!(blocks.negotiation.percent_of_target, 120.0);
    }

    #[test]
    fn test_category_blocks_iter_order() {
        let blocks = CategoryBlocks::from_fn(|c| c.label());
        let labels: Vec<&str> = blocks.iter().map(|(_, l)| *l).collect();
        assert_eq!(
            labels,
            vec!["order_lead_time", "delivery_lead_time", "punctuality", "negotiation"]
        );
    }
}
