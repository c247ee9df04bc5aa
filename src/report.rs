use crate::error::Result;
use crate::summary::YearSummary;
use chrono::{DateTime, Utc};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionItem {
    #[schemars(description = "Short imperative title of the action (max ~10 words)")]
    pub title: String,

    #[schemars(description = "What to do and which metric or month motivates it")]
    pub description: String,

    #[schemars(description = "Urgency of the action")]
    pub priority: ActionPriority,

    #[serde(default)]
    #[schemars(
        description = "Metric category the action addresses: order_lead_time, delivery_lead_time, punctuality or negotiation"
    )]
    pub category: Option<String>,
}

/// Narrative analysis returned by the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Narrative {
    #[schemars(description = "Executive analysis of the year, in plain prose (2-4 paragraphs)")]
    pub analysis: String,

    #[serde(default)]
    #[schemars(description = "Recommended action items, most urgent first")]
    pub action_items: Vec<ActionItem>,
}

impl Narrative {
    pub fn response_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Narrative)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::response_schema())
    }
}

/// Aggregates plus the optional narrative, as returned to API consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    #[serde(flatten)]
    pub summary: YearSummary,
    pub narrative: Option<Narrative>,
    pub generated_at: DateTime<Utc>,
}

impl InsightsReport {
    /// Merges the narrative outcome into the report. A failed narrative is
    /// logged and left out; the aggregates are always kept.
    pub fn assemble(summary: YearSummary, narrative: Result<Narrative>) -> Self {
        let narrative = match narrative {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(
                    "Narrative unavailable for entity '{}' (year: {:?}): {}",
                    summary.entity, summary.year, e
                );
                None
            }
        };

        Self {
            summary,
            narrative,
            generated_at: Utc::now(),
        }
    }

    pub fn without_narrative(summary: YearSummary) -> Self {
        Self {
            summary,
            narrative: None,
            generated_at: Utc::now(),
        }
    }

    pub fn has_narrative(&self) -> bool {
        self.narrative.is_some()
    }
}
