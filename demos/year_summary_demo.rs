use procurement_metrics_builder::*;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let payload = json!({
        "year": 2024,
        "entity": "Todas",
        "target_attainment": 0.8,
        "rows": [
            { "obra": "Obra Norte", "ano": 2024, "mes": "janeiro",
              "order_lead_time_target": 12, "order_lead_time_actual": 15,
              "delivery_lead_time_target": 20, "delivery_lead_time_actual": 18,
              "punctuality_target": 95, "punctuality_actual": 88,
              "negotiation_target": 5, "negotiation_actual": 6.5 },
            { "obra": "Obra Sul", "ano": 2024, "mes": "janeiro",
              "order_lead_time_target": 10, "order_lead_time_actual": 9,
              "punctuality_target": 95, "punctuality_actual": 97 },
            { "obra": "Obra Norte", "ano": 2024, "mes": "fevereiro",
              "order_lead_time_target": 12, "order_lead_time_actual": 11,
              "delivery_lead_time_target": 20, "delivery_lead_time_actual": 25,
              "punctuality_target": 95, "punctuality_actual": 91,
              "negotiation_target": 5, "negotiation_actual": 3 }
        ]
    });

    let summary = MetricsProcessor::process_json(&payload)?;

    println!("Entity: {} | Year: {:?}", summary.entity, summary.year);
    println!(
        "{:<5} {:>10} {:>10} {:>8} {:>10}",
        "Month", "OLT tgt", "OLT act", "OLT %", "Punct %"
    );
    for record in &summary.months {
        println!(
            "{:<5} {:>10.2} {:>10.2} {:>8.2} {:>10.2}",
            record.month,
            record.blocks.order_lead_time.target,
            record.blocks.order_lead_time.actual,
            record.blocks.order_lead_time.percent_of_target,
            record.blocks.punctuality.percent_of_target,
        );
    }

    println!("\nYTD:");
    for (category, block) in summary.ytd.iter() {
        println!(
            "  {:<20} target {:>8.2}  actual {:>8.2}  ({:.2}%)",
            category.label(),
            block.target,
            block.actual,
            block.percent_of_target
        );
    }

    let report = MetricsProcessor::report_without_narrative(&SummaryRequest::from_json(&payload)?);
    println!("\n{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
