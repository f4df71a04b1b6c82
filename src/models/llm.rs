use serde::{Deserialize, Serialize};

/// Request sent to the analysis service. This is the only shape the
/// server produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmQuery {
    pub question: String,
    pub contract_text: String,
    pub extra_context: String,
}

impl LlmQuery {
    pub fn new(
        question: impl Into<String>,
        contract_text: impl Into<String>,
        extra_context: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            contract_text: contract_text.into(),
            extra_context: extra_context.into(),
        }
    }
}

/// Normalized outcome of an analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAnswer {
    pub ok: bool,
    pub answer: String,
}

impl LlmAnswer {
    pub fn success(answer: impl Into<String>) -> Self {
        Self {
            ok: true,
            answer: answer.into(),
        }
    }

    pub fn failure(answer: impl Into<String>) -> Self {
        Self {
            ok: false,
            answer: answer.into(),
        }
    }
}

/// Body of `POST /ask-doc-ui`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AskDocRequest {
    pub question: Option<String>,
    pub contract_id: Option<serde_json::Value>,
}

/// Response of `POST /ask-doc-ui`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskDocResponse {
    pub ok: bool,
    pub answer: String,
    pub used_contract_id: Option<String>,
    pub has_full_text: bool,
}
