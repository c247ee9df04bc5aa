use procurement_metrics_builder::llm::{GeminiClient, NarrativeEvent, NarrativeGenerator};
use procurement_metrics_builder::*;
use std::env;
use std::fs;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    println!("Loaded configuration: {:?}", config);

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/sample_request.json".to_string());
    let body = fs::read_to_string(&path)?;
    let request = SummaryRequest::from_json_str_with_config(&body, &config)?;

    let client = GeminiClient::from_config(&config)?;
    let generator = NarrativeGenerator::new(client, config.model.clone());

    let summary = MetricsProcessor::process(&request);

    let (tx, mut rx) = mpsc::channel(16);
    let watcher = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                NarrativeEvent::Starting => println!("🚀 Starting narrative"),
                NarrativeEvent::Requesting => println!("📡 Calling model"),
                NarrativeEvent::Repairing { reason } => {
                    println!("🔧 Repairing output: {}", reason)
                }
                NarrativeEvent::Success => println!("✅ Narrative ready"),
                NarrativeEvent::Failed { reason } => println!("❌ Narrative failed: {}", reason),
            }
        }
    });

    let narrative = generator.generate(&summary, Some(tx)).await;
    watcher.await?;

    let report = InsightsReport::assemble(summary, narrative);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
