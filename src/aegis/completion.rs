use crate::aegis::config::{AegisConfig, resolve_gemini_api_key};
use crate::aegis::model::{AegisResponse, Mode, parse_model_payload};
use crate::aegis::prompt::{SYSTEM_INSTRUCTION, user_prompt};
use crate::aegis::schema::response_schema;
use crate::error::AegisError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Explicit deadline for the completion call; the transport default is not
/// relied on.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One moderated completion. Not idempotent — sampling may vary the text —
/// but the schema invariants (field presence, score range, mode-correct
/// summary presence) hold on every successful call.
pub trait CompletionClient {
    fn complete(&self, user_text: &str, mode: Mode) -> Result<AegisResponse, AegisError>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    temperature: f64,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, temperature: f64) -> Self {
        Self {
            api_key,
            model,
            temperature,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl CompletionClient for GeminiClient {
    fn complete(&self, user_text: &str, mode: Mode) -> Result<AegisResponse, AegisError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = serde_json::json!({
            "systemInstruction": {
                "parts": [{"text": SYSTEM_INSTRUCTION}]
            },
            "contents": [
                {
                    "parts": [{"text": user_prompt(user_text, mode)}]
                }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(mode),
                "temperature": self.temperature
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| AegisError::upstream(format!("failed to build http client: {err}")))?;

        // The key travels as a header so transport errors never echo it back
        // in a URL.
        let response = client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .map_err(|err| AegisError::upstream(format!("gemini endpoint unreachable: {err}")))?;

        if !response.status().is_success() {
            return Err(AegisError::upstream(format!(
                "gemini call failed with status {}",
                response.status()
            )));
        }

        let json: Value = response
            .json()
            .map_err(|err| AegisError::upstream(format!("gemini response unreadable: {err}")))?;
        let text = extract_gemini_text(&json)
            .ok_or_else(|| AegisError::upstream("gemini response missing text content"))?;

        parse_model_payload(&text, mode)
    }
}

fn extract_gemini_text(json: &Value) -> Option<String> {
    json.get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|v| v.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Placeholder client used when no credentials are configured. Constructing
/// it is free; every call fails with a configuration error that names the
/// variable to set and nothing else.
pub struct UnconfiguredClient;

impl CompletionClient for UnconfiguredClient {
    fn complete(&self, _user_text: &str, _mode: Mode) -> Result<AegisResponse, AegisError> {
        Err(AegisError::configuration(
            "no AI credentials configured; set GEMINI_API_KEY",
        ))
    }
}

/// Pick the completion client from the environment. Missing credentials do
/// not fail here — the keyword safety branch must keep working without any
/// backend, so the configuration error is deferred to the first actual call.
pub fn resolve_completion_client(cfg: &AegisConfig) -> Box<dyn CompletionClient> {
    match resolve_gemini_api_key() {
        Some(api_key) => Box::new(GeminiClient::new(
            api_key,
            cfg.completion.model.clone(),
            cfg.completion.temperature,
        )),
        None => Box::new(UnconfiguredClient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let json = serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"ok\":true}"}]}}
            ]
        });
        assert_eq!(extract_gemini_text(&json).as_deref(), Some("{\"ok\":true}"));
    }

    #[test]
    fn missing_candidates_yield_none() {
        let json = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(extract_gemini_text(&json), None);
    }

    #[test]
    fn unreachable_endpoint_is_an_upstream_error() {
        // Discard port on loopback; the connection is refused immediately.
        let client = GeminiClient::new(
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
            0.7,
        )
        .with_base_url("http://127.0.0.1:9/v1beta".to_string());

        let err = client.complete("hello", Mode::Private).unwrap_err();
        assert!(matches!(err, AegisError::Upstream(_)));
    }

    #[test]
    fn unconfigured_client_fails_without_leaking_anything() {
        let err = UnconfiguredClient.complete("hi", Mode::Private).unwrap_err();
        assert!(matches!(err, AegisError::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
