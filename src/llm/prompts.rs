// Prompts for the narrative and repair requests

use crate::error::Result;
use crate::summary::YearSummary;

pub const SYSTEM_PROMPT_NARRATIVE: &str = r#"
You are a Procurement Performance Analyst for a construction company.
You receive the monthly KPI summary of one project ("obra") or of all projects ("All").

## METRICS
- `order_lead_time`: days from requisition to purchase order. Summed per month. LOWER actual than target is GOOD.
- `delivery_lead_time`: days from purchase order to delivery on site. Summed per month. LOWER actual than target is GOOD.
- `punctuality`: percentage of deliveries on time. Averaged per month. HIGHER actual than target is GOOD.
- `negotiation`: percentage saved in negotiation. Averaged per month. HIGHER actual than target is GOOD.

Each block has `target`, `actual` and `percent_of_target` (actual / target * 100, or 0 when the target is 0).
`delta` holds the month-over-month change of each field; the first month has no delta.
`ytd` is the year-to-date aggregate. `target_attainment` is the fraction of target the company accepts as satisfactory.

## RULES
1. Use ONLY the numbers provided. Never invent figures, suppliers or causes.
2. Months whose blocks are all zero had no data; say so instead of treating them as bad performance.
3. Compare every metric against `target_attainment`, respecting the GOOD direction of each metric.
4. Highlight the largest month-over-month changes.
5. Write in Brazilian Portuguese.

## OUTPUT
Return ONLY valid JSON with:
- `analysis`: 2-4 short paragraphs.
- `action_items`: 3-6 items, most urgent first, each with `title`, `description`, `priority` (high | medium | low) and `category`.
"#;

pub const SYSTEM_PROMPT_REPAIR: &str = "You are a JSON Repair Agent. You fix malformed JSON so it matches the requested shape. Return ONLY the corrected JSON object.";

/// User message carrying the serialized summary.
pub fn build_narrative_prompt(summary: &YearSummary) -> Result<String> {
    let payload = serde_json::to_string_pretty(summary)?;
    let year = summary
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "all years".to_string());

    Ok(format!(
        "Entity: {}\nYear: {}\nTarget attainment threshold: {:.0}%\n\n\
         ### KPI SUMMARY (JSON)\n{}\n\n\
         Analyze the summary and return the narrative JSON.",
        summary.entity,
        year,
        summary.target_attainment * 100.0,
        payload
    ))
}

/// Follow-up message asking the model to fix its own output.
pub fn build_repair_prompt(error_msg: &str, schema: &str) -> String {
    format!(
        "The JSON you provided could not be parsed:\n\nERROR: {}\n\n\
         TASK: Return the complete corrected JSON object. It MUST match this JSON Schema:\n{}\n\
         Do NOT add commentary or markdown fences.",
        error_msg, schema
    )
}
