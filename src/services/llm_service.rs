use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::models::{
    contract::Contract,
    llm::{LlmAnswer, LlmQuery},
};

pub const EMPTY_RESPONSE: &str = "The analysis server returned an empty response.";
const RAW_EXCERPT_LEN: usize = 400;

/// Anything that can answer a question about a contract.
///
/// Implementations never fail: transport and upstream problems are folded
/// into an answer with `ok == false` and a message fit to show the user.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn ask(&self, query: LlmQuery) -> LlmAnswer;
}

/// Analysis service reached over HTTP at `{base}/llm/ask-basic`.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    endpoint: String,
    client: Client,
}

impl HttpAnalysisService {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            endpoint: format!("{}/llm/ask-basic", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unreachable(&self) -> LlmAnswer {
        LlmAnswer::failure(format!(
            "Could not reach analysis server at {}. Check that the analysis backend is running.",
            self.endpoint
        ))
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn ask(&self, query: LlmQuery) -> LlmAnswer {
        let response = match self.client.post(&self.endpoint).json(&query).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error calling analysis server {}: {}", self.endpoint, e);
                return self.unreachable();
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Error reading analysis server response: {}", e);
                return self.unreachable();
            }
        };

        if !status.is_success() {
            tracing::warn!("Analysis server answered {}: {}", status, excerpt(&body));
        }

        normalize_reply(status, &body)
    }
}

/// Folds whatever the analysis server sent back into one `LlmAnswer`.
pub fn normalize_reply(status: StatusCode, body: &str) -> LlmAnswer {
    let success = status.is_success();

    let (ok_flag, text) = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let text = ["answer", "error", "detail"]
                .iter()
                .filter_map(|key| map.get(*key))
                .filter_map(value_text)
                .next();
            (map.get("ok").and_then(Value::as_bool), text)
        }
        Ok(Value::String(s)) => (None, non_blank(&s)),
        Ok(Value::Null) => (None, None),
        Ok(_) | Err(_) => (None, if success { non_blank(body) } else { None }),
    };

    match text {
        Some(text) => LlmAnswer {
            ok: success && ok_flag != Some(false),
            answer: text,
        },
        None if success => LlmAnswer::failure(EMPTY_RESPONSE),
        None => {
            let mut answer = format!("Analysis server HTTP error {}.", status.as_u16());
            if !body.trim().is_empty() {
                answer.push_str("\n\nRaw response:\n");
                answer.push_str(&excerpt(body));
            }
            LlmAnswer::failure(answer)
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_blank(s),
        other => Some(other.to_string()),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn excerpt(body: &str) -> String {
    body.chars().take(RAW_EXCERPT_LEN).collect()
}

/// Text handed to the model for a stored contract: the full clause text when
/// there is one, otherwise a one-line summary of the metadata.
pub fn contract_text_for(contract: &Contract) -> String {
    if contract.has_full_text() {
        return contract.contract_text.clone();
    }

    let mut parts = vec!["Structured contract metadata:".to_string()];
    let fields = [
        ("Source", &contract.source),
        ("Name", &contract.name),
        ("Contractor", &contract.contractor),
        ("Type", &contract.contract_type),
        ("Phone", &contract.phone),
        ("Start date", &contract.start),
        ("End date", &contract.end),
    ];
    parts.extend(
        fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(label, value)| format!("{}: {}", label, value)),
    );
    if contract.total != 0.0 {
        parts.push(format!("Total amount (USD): {}", contract.total));
    }
    if !contract.due.is_empty() {
        parts.push(format!("Due status: {}", contract.due));
    }
    if !contract.pdf_file.is_empty() {
        parts.push(format!("PDF file: {}", contract.pdf_file));
    }
    parts.push("Note: No full clause text was provided, only structured metadata.".to_string());

    parts.join(" - ")
}

pub fn extra_context_for(contract: Option<&Contract>) -> String {
    match contract {
        Some(c) => format!(
            "This question is about the contract \"{}\" with id {}.",
            c.name, c.id
        ),
        None => "No contract was found for this question.".to_string(),
    }
}

#[cfg(test)]
mod llm_service_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base: &str) -> HttpAnalysisService {
        HttpAnalysisService::new(base, Duration::from_secs(5)).expect("Failed to build service")
    }

    #[test]
    fn test_json_answer() {
        let reply = normalize_reply(StatusCode::OK, r#"{"ok": true, "answer": "  Yes. "}"#);
        assert_eq!(reply, LlmAnswer::success("Yes."));
    }

    #[test]
    fn test_json_without_ok_flag_is_success() {
        let reply = normalize_reply(StatusCode::OK, r#"{"answer": "Fine"}"#);
        assert!(reply.ok);
    }

    #[test]
    fn test_json_error_falls_back_to_error_then_detail() {
        let reply = normalize_reply(StatusCode::OK, r#"{"ok": false, "error": "model busy"}"#);
        assert_eq!(reply, LlmAnswer::failure("model busy"));

        let reply = normalize_reply(StatusCode::OK, r#"{"ok": false, "answer": "", "detail": "oom"}"#);
        assert_eq!(reply, LlmAnswer::failure("oom"));
    }

    #[test]
    fn test_non_string_answer_is_rendered() {
        let reply = normalize_reply(StatusCode::OK, r#"{"answer": {"summary": "x"}}"#);
        assert!(reply.ok);
        assert_eq!(reply.answer, r#"{"summary":"x"}"#);
    }

    #[test]
    fn test_plain_text_success() {
        let reply = normalize_reply(StatusCode::OK, "The term is 12 months.\n");
        assert_eq!(reply, LlmAnswer::success("The term is 12 months."));
    }

    #[test]
    fn test_empty_success_body() {
        let reply = normalize_reply(StatusCode::OK, "   ");
        assert_eq!(reply, LlmAnswer::failure(EMPTY_RESPONSE));
        let reply = normalize_reply(StatusCode::OK, "{}");
        assert_eq!(reply, LlmAnswer::failure(EMPTY_RESPONSE));
    }

    #[test]
    fn test_error_status_with_json() {
        let reply = normalize_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"ok": false, "error": "index missing", "detail": "trace"}"#,
        );
        assert_eq!(reply, LlmAnswer::failure("index missing"));

        // a 5xx never counts as success even when the body claims ok
        let reply = normalize_reply(StatusCode::BAD_GATEWAY, r#"{"answer": "partial"}"#);
        assert_eq!(reply, LlmAnswer::failure("partial"));
    }

    #[test]
    fn test_error_status_with_text() {
        let body = "x".repeat(1000);
        let reply = normalize_reply(StatusCode::SERVICE_UNAVAILABLE, &body);
        assert!(!reply.ok);
        assert!(reply.answer.starts_with("Analysis server HTTP error 503."));
        assert!(reply.answer.ends_with(&"x".repeat(400)));
        assert!(!reply.answer.contains(&"x".repeat(401)));
    }

    #[test]
    fn test_contract_text_prefers_full_text() {
        let contract: Contract = serde_json::from_value(json!({
            "id": "1", "name": "NDA", "contractText": "Clause 1. Secrets stay secret."
        }))
        .unwrap();
        assert_eq!(contract_text_for(&contract), "Clause 1. Secrets stay secret.");
    }

    #[test]
    fn test_contract_text_metadata_summary() {
        let contract: Contract = serde_json::from_value(json!({
            "id": "1", "source": "manual", "name": "NDA", "contractor": "ACME",
            "total": 2500, "due": "< 7 days", "contractText": "  "
        }))
        .unwrap();
        assert_eq!(
            contract_text_for(&contract),
            "Structured contract metadata: - Source: manual - Name: NDA - Contractor: ACME \
             - Total amount (USD): 2500 - Due status: < 7 days \
             - Note: No full clause text was provided, only structured metadata."
        );
    }

    #[test]
    fn test_extra_context() {
        let contract: Contract =
            serde_json::from_value(json!({ "id": "7", "name": "Lease" })).unwrap();
        assert_eq!(
            extra_context_for(Some(&contract)),
            "This question is about the contract \"Lease\" with id 7."
        );
        assert_eq!(extra_context_for(None), "No contract was found for this question.");
    }

    #[tokio::test]
    async fn test_ask_posts_canonical_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/llm/ask-basic"))
            .and(body_json(json!({
                "question": "Who pays?",
                "contractText": "Tenant pays.",
                "extraContext": "ctx"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "answer": "The tenant." })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = service(&server.uri())
            .ask(LlmQuery::new("Who pays?", "Tenant pays.", "ctx"))
            .await;
        assert_eq!(answer, LlmAnswer::success("The tenant."));
    }

    #[tokio::test]
    async fn test_ask_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/llm/ask-basic"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let answer = service(&server.uri()).ask(LlmQuery::new("q", "", "")).await;
        assert!(!answer.ok);
        assert!(answer.answer.contains("HTTP error 500"));
        assert!(answer.answer.contains("boom"));
    }

    #[tokio::test]
    async fn test_ask_unreachable_server() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let svc = service(&format!("http://{}", addr));
        let answer = svc.ask(LlmQuery::new("q", "", "")).await;
        assert!(!answer.ok);
        assert!(answer.answer.starts_with("Could not reach analysis server at"));
        assert!(answer.answer.contains(svc.endpoint()));
    }

    #[tokio::test]
    async fn test_ask_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let svc = HttpAnalysisService::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let answer = svc.ask(LlmQuery::new("q", "", "")).await;
        assert!(!answer.ok);
        assert!(answer.answer.starts_with("Could not reach analysis server"));
    }
}
