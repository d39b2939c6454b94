use crate::aegis::model::{AegisResponse, CRISIS_SCORE};
use regex::Regex;
use std::sync::OnceLock;

/// Fixed high-risk phrase list. Matching is case-insensitive and bounded by
/// word boundaries so `kms` never fires inside `kmsl` or similar.
const CRISIS_KEYWORDS: [&str; 8] = [
    "kms",
    "kill myself",
    "suicide",
    "self harm",
    "self-harm",
    "wanna die",
    "end it all",
    "ending my life",
];

static CRISIS_PATTERN: OnceLock<Regex> = OnceLock::new();

fn crisis_pattern() -> &'static Regex {
    CRISIS_PATTERN.get_or_init(|| {
        let joined = CRISIS_KEYWORDS.join("|");
        Regex::new(&format!(r"(?i)\b({joined})\b")).expect("crisis keyword pattern is valid")
    })
}

/// True iff `text` contains any crisis keyword as a whole word or phrase.
///
/// Pure and synchronous: crisis classification must never wait on, or vary
/// with, the AI backend.
pub fn contains_crisis_keywords(text: &str) -> bool {
    crisis_pattern().is_match(text)
}

/// The pre-authored crisis reply returned without consulting the model.
/// Fixed text keeps the crisis path bounded-latency and immune to model
/// drift or an upstream outage.
pub fn crisis_response() -> AegisResponse {
    AegisResponse {
        empathetic_reply: "Thank you for trusting me with something this heavy. I want you to \
            know that what you're feeling right now can change, and you deserve support from a \
            real person immediately. Please don't act on these thoughts. If you are in the U.S., \
            call or text the 988 Suicide & Crisis Lifeline right now — it's free, confidential, \
            and open 24/7."
            .to_string(),
        reflection_prompt: "If you feel up to it, could you tell me a little more about what's \
            causing these feelings? There is no pressure to share if you don't wish to."
            .to_string(),
        improvement_tip: "Please consider speaking with a parent or another adult you trust \
            about what you're experiencing. And sometimes a small, grounding distraction can \
            help: could you try putting on your favorite song or watching a comforting video \
            for a few minutes?"
            .to_string(),
        wellbeing_score: Some(CRISIS_SCORE),
        is_safety_alert: true,
        therapist_summary: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{contains_crisis_keywords, crisis_response};

    #[test]
    fn detects_whole_words_case_insensitively() {
        assert!(contains_crisis_keywords("I want to kill myself"));
        assert!(contains_crisis_keywords("Sometimes I just WANNA DIE"));
        assert!(contains_crisis_keywords("thinking about Suicide again"));
        assert!(contains_crisis_keywords("i might end it all tonight"));
        assert!(contains_crisis_keywords("kms"));
    }

    #[test]
    fn detects_hyphen_and_space_phrase_variants() {
        assert!(contains_crisis_keywords("I've been reading about self-harm"));
        assert!(contains_crisis_keywords("I've been reading about self harm"));
        assert!(contains_crisis_keywords("I keep thinking about ending my life"));
    }

    #[test]
    fn ignores_substrings_inside_unrelated_words() {
        assert!(!contains_crisis_keywords("my gamer tag is kmsl"));
        assert!(!contains_crisis_keywords("the walkmsounds great"));
        assert!(!contains_crisis_keywords("the suicideprevention hashtag trended"));
    }

    #[test]
    fn handles_empty_punctuated_and_very_long_input() {
        assert!(!contains_crisis_keywords(""));
        assert!(contains_crisis_keywords("...kill myself???"));

        let long = "nothing to see here ".repeat(50_000);
        assert!(!contains_crisis_keywords(&long));
    }

    #[test]
    fn crisis_response_carries_the_lifeline_and_alert_flag() {
        let resp = crisis_response();
        assert!(resp.is_safety_alert);
        assert_eq!(resp.wellbeing_score, Some(5));
        assert!(resp.empathetic_reply.contains("988"));
        assert!(resp.therapist_summary.is_none());
    }
}
