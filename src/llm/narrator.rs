use crate::error::{MetricsError, Result};
use crate::llm::prompts::{
    build_narrative_prompt, build_repair_prompt, SYSTEM_PROMPT_NARRATIVE, SYSTEM_PROMPT_REPAIR,
};
use crate::llm::{client::GeminiClient, types::*};
use crate::report::{InsightsReport, Narrative};
use crate::schema::SummaryRequest;
use crate::summary::{build_year_summary, YearSummary};
use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;

pub struct NarrativeGenerator {
    client: GeminiClient,
    model: String,
    system_prompt: String,
}

impl NarrativeGenerator {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: SYSTEM_PROMPT_NARRATIVE.to_string(),
        }
    }

    /// Replace the default analyst prompt (e.g. for another business unit)
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Asks the model for a narrative. A malformed reply gets exactly one
    /// repair request before giving up.
    pub async fn generate(
        &self,
        summary: &YearSummary,
        progress: Option<Sender<NarrativeEvent>>,
    ) -> Result<Narrative> {
        self.send_event(&progress, NarrativeEvent::Starting).await;

        let user_prompt = build_narrative_prompt(summary)?;
        let mut messages = vec![Content::user(user_prompt)];

        self.send_event(&progress, NarrativeEvent::Requesting).await;
        let raw = match self
            .client
            .generate_content(&self.model, &self.system_prompt, messages.clone(), None)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.send_failure(&progress, &e).await;
                return Err(e);
            }
        };

        let parse_error = match parse_narrative(&raw) {
            Ok(narrative) => {
                self.send_event(&progress, NarrativeEvent::Success).await;
                return Ok(narrative);
            }
            Err(e) => e,
        };

        warn!("Model returned malformed narrative, requesting repair: {}", parse_error);
        self.send_event(
            &progress,
            NarrativeEvent::Repairing {
                reason: parse_error.to_string(),
            },
        )
        .await;

        let schema = Narrative::schema_as_json()?;
        messages.push(Content::model(raw));
        messages.push(Content::user(build_repair_prompt(
            &parse_error.to_string(),
            &schema,
        )));

        let repaired = self
            .client
            .generate_content(&self.model, SYSTEM_PROMPT_REPAIR, messages, None)
            .await
            .and_then(|raw| parse_narrative(&raw));

        match repaired {
            Ok(narrative) => {
                self.send_event(&progress, NarrativeEvent::Success).await;
                Ok(narrative)
            }
            Err(e) => {
                self.send_failure(&progress, &e).await;
                Err(e)
            }
        }
    }

    /// Summarizes the request and attaches a narrative when the model cooperates.
    /// Model failures only drop the narrative.
    pub async fn build_report(&self, request: &SummaryRequest) -> InsightsReport {
        let summary = build_year_summary(request);
        info!("Requesting narrative from model '{}'", self.model);
        let narrative = self.generate(&summary, None).await;
        InsightsReport::assemble(summary, narrative)
    }

    async fn send_failure(&self, sender: &Option<Sender<NarrativeEvent>>, error: &MetricsError) {
        self.send_event(
            sender,
            NarrativeEvent::Failed {
                reason: error.to_string(),
            },
        )
        .await;
    }

    async fn send_event(&self, sender: &Option<Sender<NarrativeEvent>>, event: NarrativeEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}

/// Parses model output, tolerating markdown fences and surrounding prose.
pub fn parse_narrative(raw: &str) -> Result<Narrative> {
    let cleaned = clean_json_output(raw);
    debug!("Parsing narrative ({} bytes)", cleaned.len());
    let narrative: Narrative = serde_json::from_str(&cleaned)
        .map_err(|e| MetricsError::NarrativeFailed(format!("Malformed narrative JSON: {}", e)))?;

    if narrative.analysis.trim().is_empty() {
        return Err(MetricsError::NarrativeFailed(
            "Narrative has an empty analysis".to_string(),
        ));
    }

    Ok(narrative)
}

fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ActionPriority;
    use crate::schema::MetricRow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    const GOOD_NARRATIVE: &str = r#"{"analysis":"Prazos dentro da meta.","action_items":[]}"#;

    fn gemini_reply(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local stand-in for the Gemini endpoint. Answers each request with the
    /// next canned reply (HTTP 500 once they run out) and counts requests.
    async fn serve_replies(replies: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let idx = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = match replies.get(idx) {
                    Some(body) => ("200 OK", body.clone()),
                    None => ("500 Internal Server Error", "{}".to_string()),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn generator(base_url: &str) -> NarrativeGenerator {
        let client = GeminiClient::new("test-key".to_string()).with_base_url(base_url);
        NarrativeGenerator::new(client, "gemini-test")
    }

    fn request() -> SummaryRequest {
        let row = MetricRow::new("Obra A", Some(2024), "jan").with_metric(
            crate::schema::MetricCategory::OrderLeadTime,
            Some(10.0),
            Some(8.0),
        );
        SummaryRequest::new(vec![row]).with_year(2024)
    }

    #[tokio::test]
    async fn test_build_report_survives_unreachable_model() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let report = generator(&format!("http://{}", addr)).build_report(&request()).await;

        assert!(report.narrative.is_none());
        assert_eq!(report.summary.months.len(), 12);
        assert_eq!(report.summary.ytd.order_lead_time.percent_of_target, 80.0);
    }

    #[tokio::test]
    async fn test_well_formed_reply_needs_no_repair() {
        let (url, hits) = serve_replies(vec![gemini_reply(GOOD_NARRATIVE)]).await;

        let report = generator(&url).build_report(&request()).await;

        assert_eq!(report.narrative.unwrap().analysis, "Prazos dentro da meta.");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_repaired_once() {
        let (url, hits) = serve_replies(vec![
            gemini_reply("Segue a analise: {\"analysis\": "),
            gemini_reply(GOOD_NARRATIVE),
        ])
        .await;
        let summary = build_year_summary(&request());
        let (tx, mut rx) = mpsc::channel(16);

        let narrative = generator(&url).generate(&summary, Some(tx)).await.unwrap();

        assert_eq!(narrative.analysis, "Prazos dentro da meta.");
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], NarrativeEvent::Starting);
        assert_eq!(events[1], NarrativeEvent::Requesting);
        assert!(matches!(events[2], NarrativeEvent::Repairing { .. }));
        assert_eq!(events[3], NarrativeEvent::Success);
    }

    #[tokio::test]
    async fn test_repair_is_not_retried() {
        let (url, hits) = serve_replies(vec![
            gemini_reply("not json"),
            gemini_reply("still not json"),
            gemini_reply(GOOD_NARRATIVE),
        ])
        .await;

        let report = generator(&url).build_report(&request()).await;

        assert!(report.narrative.is_none());
        assert_eq!(report.summary.months.len(), 12);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"analysis":"Tudo dentro da meta.","action_items":[{"title":"Manter","description":"Sem desvios","priority":"low","category":"punctuality"}]}"#;
        let narrative = parse_narrative(raw).unwrap();
        assert_eq!(narrative.analysis, "Tudo dentro da meta.");
        assert_eq!(narrative.action_items[0].priority, ActionPriority::Low);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"analysis\": \"ok\", \"action_items\": []}\n```\n";
        let narrative = parse_narrative(raw).unwrap();
        assert_eq!(narrative.analysis, "ok");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_narrative("not json at all").is_err());
        assert!(parse_narrative("{\"analysis\": ").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_analysis() {
        let err = parse_narrative(r#"{"analysis": "  "}"#).unwrap_err();
        assert!(matches!(err, MetricsError::NarrativeFailed(_)));
    }

    #[test]
    fn test_clean_json_output() {
        assert_eq!(clean_json_output("xx{\"a\":1}yy"), "{\"a\":1}");
        assert_eq!(clean_json_output("  plain  "), "plain");
        assert_eq!(clean_json_output("} backwards {"), "} backwards {");
    }
}
