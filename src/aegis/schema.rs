use crate::aegis::model::Mode;
use serde_json::{Value, json};

fn base_properties() -> Value {
    json!({
        "empatheticReply": {
            "type": "STRING",
            "description": "A warm, empathetic, and validating response to the user's statement. It should be supportive, non-judgmental, and use short, warm, teen-friendly conversational language."
        },
        "reflectionPrompt": {
            "type": "STRING",
            "description": "An open-ended question to encourage deeper reflection, like a journal prompt. It should gently guide the user to explore their feelings."
        },
        "wellbeingScore": {
            "type": "INTEGER",
            "description": "A numerical score from 0 to 100 representing the user's emotional state, based on sentiment analysis of their input. 0-40 for negative, 41-70 for neutral/mixed, 71-100 for positive."
        },
        "improvementTip": {
            "type": "STRING",
            "description": "A simple, actionable, healthy coping strategy (e.g., mindfulness, journaling, positive reframing)."
        },
        "isSafetyAlert": {
            "type": "BOOLEAN",
            "description": "CRITICAL: Set this to true ONLY if the user's message contains any mention of suicide, self-harm, severe depression, abuse, or immediate danger. Otherwise, it MUST be false."
        }
    })
}

fn therapist_summary_property() -> Value {
    json!({
        "type": "OBJECT",
        "description": "A confidential summary for a therapist. This section exists ONLY in shared mode.",
        "properties": {
            "moodCues": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of observed mood cues (e.g., anxious, hopeful, sad, overwhelmed)."
            },
            "possibleStressors": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of potential underlying stressors identified from the user's message (e.g., school, friendships, family, identity)."
            },
            "suggestedFollowUp": {
                "type": "STRING",
                "description": "A concise suggestion for a follow-up topic the therapist might explore in a future session."
            }
        },
        "required": ["moodCues", "possibleStressors", "suggestedFollowUp"]
    })
}

/// Build the structured-output descriptor for `mode`.
///
/// Private mode withholds `therapistSummary` from the property set entirely:
/// the schema is the data boundary, not a convention the model is trusted to
/// follow. (`parse_model_payload` enforces the same boundary post-parse.)
pub fn response_schema(mode: Mode) -> Value {
    let mut properties = base_properties();
    let mut required = vec![
        "empatheticReply",
        "reflectionPrompt",
        "wellbeingScore",
        "improvementTip",
        "isSafetyAlert",
    ];

    if mode == Mode::Shared {
        properties["therapistSummary"] = therapist_summary_property();
        required.push("therapistSummary");
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required
    })
}

#[cfg(test)]
mod tests {
    use super::response_schema;
    use crate::aegis::model::Mode;

    #[test]
    fn private_schema_has_exactly_the_five_base_fields() {
        let schema = response_schema(Mode::Private);
        let properties = schema["properties"].as_object().expect("properties");
        assert_eq!(properties.len(), 5);
        assert!(!properties.contains_key("therapistSummary"));

        let required = schema["required"].as_array().expect("required");
        assert_eq!(required.len(), 5);
    }

    #[test]
    fn shared_schema_requires_the_summary_and_its_subfields() {
        let schema = response_schema(Mode::Shared);
        let required = schema["required"].as_array().expect("required");
        assert!(required.iter().any(|v| v == "therapistSummary"));

        let summary = &schema["properties"]["therapistSummary"];
        assert_eq!(summary["type"], "OBJECT");
        let sub_required = summary["required"].as_array().expect("summary required");
        assert_eq!(sub_required.len(), 3);
    }
}
