use crate::config::AppConfig;
use crate::error::{FieldViolation, MetricsError, Result};
use crate::filter::EntityFilter;
use crate::utils::{coerce_json_number, normalize_month, MonthCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TARGET_ATTAINMENT: f64 = 0.75;
pub const MIN_TARGET_ATTAINMENT: f64 = 0.1;
pub const MAX_TARGET_ATTAINMENT: f64 = 1.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    #[schemars(description = "Lead time from requisition to purchase order, in days. Summed across rows.")]
    OrderLeadTime,

    #[schemars(description = "Lead time from purchase order to delivery, in days. Summed across rows.")]
    DeliveryLeadTime,

    #[schemars(description = "Share of deliveries made on time, as a percentage. Averaged across rows.")]
    Punctuality,

    #[schemars(description = "Savings obtained in negotiation, as a percentage. Averaged across rows.")]
    Negotiation,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 4] = [
        MetricCategory::OrderLeadTime,
        MetricCategory::DeliveryLeadTime,
        MetricCategory::Punctuality,
        MetricCategory::Negotiation,
    ];

    /// Percentage categories are averaged; the lead times are summed.
    pub fn is_percent(&self) -> bool {
        matches!(self, MetricCategory::Punctuality | MetricCategory::Negotiation)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::OrderLeadTime => "order_lead_time",
            MetricCategory::DeliveryLeadTime => "delivery_lead_time",
            MetricCategory::Punctuality => "punctuality",
            MetricCategory::Negotiation => "negotiation",
        }
    }
}

/// One monthly observation for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricRow {
    #[schemars(description = "Project (obra) the metrics were reported for")]
    pub entity: String,

    #[schemars(description = "Calendar year of the observation")]
    pub year: Option<i32>,

    #[schemars(description = "Month label, normalized to a 3-letter uppercase code (JAN, FEV, ... DEZ)")]
    pub month: String,

    pub order_lead_time_target: Option<f64>,
    pub order_lead_time_actual: Option<f64>,
    pub delivery_lead_time_target: Option<f64>,
    pub delivery_lead_time_actual: Option<f64>,
    pub punctuality_target: Option<f64>,
    pub punctuality_actual: Option<f64>,
    pub negotiation_target: Option<f64>,
    pub negotiation_actual: Option<f64>,
}

impl MetricRow {
    /// A row with no metric values. The month label is normalized.
    pub fn new(entity: impl Into<String>, year: Option<i32>, month: &str) -> Self {
        Self {
            entity: entity.into(),
            year,
            month: normalize_month(month),
            order_lead_time_target: None,
            order_lead_time_actual: None,
            delivery_lead_time_target: None,
            delivery_lead_time_actual: None,
            punctuality_target: None,
            punctuality_actual: None,
            negotiation_target: None,
            negotiation_actual: None,
        }
    }

    pub fn with_metric(
        mut self,
        category: MetricCategory,
        target: Option<f64>,
        actual: Option<f64>,
    ) -> Self {
        let (t, a) = self.metric_slots_mut(category);
        *t = target;
        *a = actual;
        self
    }

    /// Raw `(target, actual)` pair for a category.
    pub fn metric(&self, category: MetricCategory) -> (Option<f64>, Option<f64>) {
        match category {
            MetricCategory::OrderLeadTime => {
                (self.order_lead_time_target, self.order_lead_time_actual)
            }
            MetricCategory::DeliveryLeadTime => {
                (self.delivery_lead_time_target, self.delivery_lead_time_actual)
            }
            MetricCategory::Punctuality => (self.punctuality_target, self.punctuality_actual),
            MetricCategory::Negotiation => (self.negotiation_target, self.negotiation_actual),
        }
    }

    fn metric_slots_mut(
        &mut self,
        category: MetricCategory,
    ) -> (&mut Option<f64>, &mut Option<f64>) {
        match category {
            MetricCategory::OrderLeadTime => {
                (&mut self.order_lead_time_target, &mut self.order_lead_time_actual)
            }
            MetricCategory::DeliveryLeadTime => (
                &mut self.delivery_lead_time_target,
                &mut self.delivery_lead_time_actual,
            ),
            MetricCategory::Punctuality => {
                (&mut self.punctuality_target, &mut self.punctuality_actual)
            }
            MetricCategory::Negotiation => {
                (&mut self.negotiation_target, &mut self.negotiation_actual)
            }
        }
    }

    /// Canonical bucket of this row, if the month label maps to one.
    pub fn month_code(&self) -> Option<MonthCode> {
        MonthCode::from_code(&self.month)
    }
}

/// Loosely-typed row as received on the wire. Every field is kept as raw JSON
/// so that all problems can be reported at once.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRow {
    #[serde(default, alias = "obra")]
    pub entity: Value,
    #[serde(default, alias = "ano")]
    pub year: Value,
    #[serde(default, alias = "mes")]
    pub month: Value,
    #[serde(default)]
    pub order_lead_time_target: Value,
    #[serde(default)]
    pub order_lead_time_actual: Value,
    #[serde(default)]
    pub delivery_lead_time_target: Value,
    #[serde(default)]
    pub delivery_lead_time_actual: Value,
    #[serde(default)]
    pub punctuality_target: Value,
    #[serde(default)]
    pub punctuality_actual: Value,
    #[serde(default)]
    pub negotiation_target: Value,
    #[serde(default)]
    pub negotiation_actual: Value,
}

impl RawRow {
    pub(crate) fn validate(
        self,
        path: &str,
        violations: &mut Vec<FieldViolation>,
    ) -> Option<MetricRow> {
        let entity = required_string(&self.entity, &format!("{}.entity", path), violations);
        let month = required_string(&self.month, &format!("{}.month", path), violations);
        let year = optional_integer(&self.year, &format!("{}.year", path), violations);

        let (entity, month, year) = (entity?, month?, year.ok()?);

        Some(MetricRow {
            entity,
            year,
            month: normalize_month(&month),
            order_lead_time_target: coerce_json_number(&self.order_lead_time_target),
            order_lead_time_actual: coerce_json_number(&self.order_lead_time_actual),
            delivery_lead_time_target: coerce_json_number(&self.delivery_lead_time_target),
            delivery_lead_time_actual: coerce_json_number(&self.delivery_lead_time_actual),
            punctuality_target: coerce_json_number(&self.punctuality_target),
            punctuality_actual: coerce_json_number(&self.punctuality_actual),
            negotiation_target: coerce_json_number(&self.negotiation_target),
            negotiation_actual: coerce_json_number(&self.negotiation_actual),
        })
    }
}

/// Validated input of one summary computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub year: Option<i32>,
    pub entity: EntityFilter,
    pub target_attainment: f64,
    pub rows: Vec<MetricRow>,
}

impl SummaryRequest {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self {
            year: None,
            entity: EntityFilter::All,
            target_attainment: DEFAULT_TARGET_ATTAINMENT,
            rows,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_entity(mut self, entity: EntityFilter) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_target_attainment(mut self, target_attainment: f64) -> Self {
        self.target_attainment = target_attainment;
        self
    }

    pub fn from_json_str(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_json(&value)
    }

    /// Parses a raw body under the size limit and default threshold of `config`.
    pub fn from_json_str_with_config(payload: &str, config: &AppConfig) -> Result<Self> {
        if payload.len() > config.max_payload_bytes {
            return Err(MetricsError::Validation(vec![FieldViolation::new(
                "body",
                format!("exceeds {} bytes", config.max_payload_bytes),
            )]));
        }
        let value: Value = serde_json::from_str(payload)?;
        Self::from_json_with_default(&value, config.default_target_attainment)
    }

    /// Validates a request body, collecting every violated field before failing.
    pub fn from_json(payload: &Value) -> Result<Self> {
        Self::from_json_with_default(payload, DEFAULT_TARGET_ATTAINMENT)
    }

    /// Same as [`SummaryRequest::from_json`], with the threshold used when the body omits it.
    pub fn from_json_with_default(payload: &Value, default_target_attainment: f64) -> Result<Self> {
        let mut violations = Vec::new();

        let Some(body) = payload.as_object() else {
            return Err(MetricsError::Validation(vec![FieldViolation::new(
                "body",
                "must be a JSON object",
            )]));
        };

        let year =
            optional_integer(lookup(body, "year", "ano"), "year", &mut violations).unwrap_or(None);

        let entity = match lookup(body, "entity", "obra") {
            Value::Null => EntityFilter::All,
            Value::String(label) => EntityFilter::from_label(Some(label.as_str())),
            _ => {
                violations.push(FieldViolation::new("entity", "must be a string"));
                EntityFilter::All
            }
        };

        let target_attainment = match lookup(body, "target_attainment", "meta") {
            Value::Null => default_target_attainment,
            Value::Number(n) => match n.as_f64() {
                Some(v) if (MIN_TARGET_ATTAINMENT..=MAX_TARGET_ATTAINMENT).contains(&v) => v,
                _ => {
                    violations.push(FieldViolation::new(
                        "target_attainment",
                        format!(
                            "must be between {} and {}",
                            MIN_TARGET_ATTAINMENT, MAX_TARGET_ATTAINMENT
                        ),
                    ));
                    DEFAULT_TARGET_ATTAINMENT
                }
            },
            _ => {
                violations.push(FieldViolation::new("target_attainment", "must be a number"));
                DEFAULT_TARGET_ATTAINMENT
            }
        };

        let mut rows = Vec::new();
        match body.get("rows") {
            Some(Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    let path = format!("rows[{}]", idx);
                    if !item.is_object() {
                        violations.push(FieldViolation::new(path, "must be an object"));
                        continue;
                    }
                    match serde_json::from_value::<RawRow>(item.clone()) {
                        Ok(raw) => {
                            if let Some(row) = raw.validate(&path, &mut violations) {
                                rows.push(row);
                            }
                        }
                        Err(e) => violations.push(FieldViolation::new(path, e.to_string())),
                    }
                }
            }
            Some(_) => violations.push(FieldViolation::new("rows", "must be an array")),
            None => violations.push(FieldViolation::new("rows", "is required")),
        }

        if !violations.is_empty() {
            return Err(MetricsError::Validation(violations));
        }

        Ok(Self {
            year,
            entity,
            target_attainment,
            rows,
        })
    }
}

static NULL: Value = Value::Null;

fn lookup<'a>(body: &'a serde_json::Map<String, Value>, name: &str, alias: &str) -> &'a Value {
    body.get(name).or_else(|| body.get(alias)).unwrap_or(&NULL)
}

pub(crate) fn required_string(
    value: &Value,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::String(_) => {
            violations.push(FieldViolation::new(field, "must not be empty"));
            None
        }
        Value::Null => {
            violations.push(FieldViolation::new(field, "is required"));
            None
        }
        _ => {
            violations.push(FieldViolation::new(field, "must be a string"));
            None
        }
    }
}

/// `Ok(None)` when absent, `Err(())` once the violation has been recorded.
pub(crate) fn optional_integer(
    value: &Value,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> std::result::Result<Option<i32>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match whole_number(n) {
            Some(v) => Ok(Some(v)),
            None => {
                violations.push(FieldViolation::new(field, "must be an integer"));
                Err(())
            }
        },
        _ => {
            violations.push(FieldViolation::new(field, "must be an integer"));
            Err(())
        }
    }
}

/// Integer value of a JSON number, accepting float encodings such as `2024.0`.
fn whole_number(n: &serde_json::Number) -> Option<i32> {
    if let Some(v) = n.as_i64() {
        return i32::try_from(v).ok();
    }
    n.as_f64()
        .filter(|v| v.fract() == 0.0)
        .filter(|v| *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
        .map(|v| v as i32)
}
