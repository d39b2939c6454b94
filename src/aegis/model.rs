use crate::aegis::util::now_epoch_millis;
use crate::error::AegisError;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::atomic::{AtomicU64, Ordering};

/// Substituted whenever the model emits a score that is missing its contract
/// (non-integer or outside 0..=100).
pub const NEUTRAL_SCORE: i64 = 50;

/// Score attached to the canned crisis response.
pub const CRISIS_SCORE: i64 = 5;

/// Conversation visibility setting, durable per owner and passed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "PRIVATE")]
    Private,
    #[serde(rename = "SHARED")]
    Shared,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Private => "PRIVATE",
            Mode::Shared => "SHARED",
        }
    }

    /// Case-insensitive parse. `THERAPIST` is accepted as a legacy alias for
    /// `SHARED` from the first hosted deployment.
    pub fn parse(raw: &str) -> Option<Mode> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRIVATE" => Some(Mode::Private),
            "SHARED" | "THERAPIST" => Some(Mode::Shared),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "AEGIS")]
    Aegis,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "USER",
            Sender::Aegis => "AEGIS",
        }
    }
}

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A submitted user message. Immutable once created; persisted append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: String,
    pub text: String,
    pub created_at_epoch_secs: u64,
}

impl UserMessage {
    pub fn new(text: &str) -> Result<Self, AegisError> {
        if text.trim().is_empty() {
            return Err(AegisError::validation("message text cannot be empty"));
        }
        let millis = now_epoch_millis()
            .map_err(|err| AegisError::validation(format!("clock unavailable: {err}")))?;
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            // Millis prefix keeps ids time-ordered; the sequence suffix keeps
            // them unique within one process tick.
            id: format!("msg-{millis:012x}-{seq:04x}"),
            text: text.to_string(),
            created_at_epoch_secs: millis / 1000,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistSummary {
    pub mood_cues: Vec<String>,
    pub possible_stressors: Vec<String>,
    pub suggested_follow_up: String,
}

/// The structured reply surfaced to the teen (and, in shared mode, the
/// confidential therapist section). Field names match the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AegisResponse {
    pub empathetic_reply: String,
    pub reflection_prompt: String,
    pub wellbeing_score: Option<i64>,
    pub improvement_tip: String,
    pub is_safety_alert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapist_summary: Option<TherapistSummary>,
}

/// One user message paired with the response it produced. In-memory pairing
/// only; the two halves are persisted as separate chat records.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub message: UserMessage,
    pub response: AegisResponse,
}

/// Model payload as received, before clamping and mode enforcement. Unknown
/// fields are rejected outright; `therapistSummary` is a known field so a
/// private-mode response carrying one can be stripped rather than refused.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawModelResponse {
    empathetic_reply: String,
    reflection_prompt: String,
    wellbeing_score: Option<Number>,
    improvement_tip: String,
    is_safety_alert: bool,
    therapist_summary: Option<TherapistSummary>,
}

fn normalize_score(raw: Option<&Number>) -> Option<i64> {
    let raw = raw?;
    match raw.as_i64() {
        Some(v) if (0..=100).contains(&v) => Some(v),
        _ => Some(NEUTRAL_SCORE),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AegisError> {
    if value.trim().is_empty() {
        return Err(AegisError::upstream(format!(
            "model response field `{field}` is empty"
        )));
    }
    Ok(())
}

/// Parse and validate a raw model payload against the contract for `mode`.
///
/// Structural problems (missing or empty required fields, unknown fields,
/// a shared-mode payload without a summary) are upstream failures; only an
/// out-of-contract `wellbeingScore` is repaired in place.
pub fn parse_model_payload(raw_text: &str, mode: Mode) -> Result<AegisResponse, AegisError> {
    let raw: RawModelResponse = serde_json::from_str(raw_text.trim()).map_err(|err| {
        AegisError::upstream(format!(
            "model payload does not match the {} schema: {err}",
            mode.as_str()
        ))
    })?;

    require_non_empty("empatheticReply", &raw.empathetic_reply)?;
    require_non_empty("reflectionPrompt", &raw.reflection_prompt)?;
    require_non_empty("improvementTip", &raw.improvement_tip)?;

    let therapist_summary = match mode {
        // The schema withholds the field in private mode, but a generative
        // model disregarding its schema must not become a data leak: strip
        // unconditionally.
        Mode::Private => None,
        Mode::Shared => {
            let summary = raw.therapist_summary.ok_or_else(|| {
                AegisError::upstream("shared-mode payload is missing therapistSummary")
            })?;
            require_non_empty("therapistSummary.suggestedFollowUp", &summary.suggested_follow_up)?;
            Some(summary)
        }
    };

    Ok(AegisResponse {
        empathetic_reply: raw.empathetic_reply,
        reflection_prompt: raw.reflection_prompt,
        wellbeing_score: normalize_score(raw.wellbeing_score.as_ref()),
        improvement_tip: raw.improvement_tip,
        is_safety_alert: raw.is_safety_alert,
        therapist_summary,
    })
}
