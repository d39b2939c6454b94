use crate::aegis::audit;
use crate::aegis::completion::CompletionClient;
use crate::aegis::model::{ChatTurn, Mode, UserMessage};
use crate::aegis::paths::AegisPaths;
use crate::aegis::persistence::{ChatRecord, PersistenceGateway, SummaryRecord};
use crate::aegis::safety::{contains_crisis_keywords, crisis_response};
use crate::aegis::warn;
use crate::error::AegisError;

/// Single entry point for one moderated turn. Stateless: safe to call
/// concurrently across independent conversations; per-conversation
/// single-flight is the submission surface's job.
pub struct Orchestrator<'a> {
    completion: &'a dyn CompletionClient,
    gateway: &'a dyn PersistenceGateway,
    paths: &'a AegisPaths,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        completion: &'a dyn CompletionClient,
        gateway: &'a dyn PersistenceGateway,
        paths: &'a AegisPaths,
    ) -> Self {
        Self {
            completion,
            gateway,
            paths,
        }
    }

    /// Run one turn: validate, persist the user message, then either the
    /// keyword short-circuit or a schema-forced completion, then persist the
    /// response and (shared mode) the therapist summary.
    pub fn respond(
        &self,
        owner_id: &str,
        user_text: &str,
        mode: Mode,
    ) -> Result<ChatTurn, AegisError> {
        if owner_id.trim().is_empty() {
            return Err(AegisError::validation("owner id cannot be empty"));
        }
        let message = UserMessage::new(user_text)?;

        // The user's own message is durable before anything can fail
        // downstream; an upstream outage must not erase what the teen wrote.
        self.gateway
            .append_chat(&ChatRecord::user(owner_id, &message))?;

        if contains_crisis_keywords(&message.text) {
            let response = crisis_response();
            let _ = audit::append_event(
                self.paths,
                "safety",
                "keyword_triggered",
                owner_id,
                "crisis keyword short-circuit, completion skipped",
            );
            // The crisis branch is unconditionally successful: a failed write
            // of the canned record is logged, never surfaced.
            match ChatRecord::aegis(owner_id, &response) {
                Ok(record) => {
                    if let Err(err) = self.gateway.append_chat(&record) {
                        warn::emit(
                            "W001",
                            "safety",
                            owner_id,
                            mode.as_str(),
                            "canned_record_write_failed",
                            err.detail(),
                        );
                        let _ = audit::append_event(
                            self.paths,
                            "safety",
                            "write_failed",
                            owner_id,
                            err.detail(),
                        );
                    }
                }
                Err(err) => {
                    warn::emit(
                        "W001",
                        "safety",
                        owner_id,
                        mode.as_str(),
                        "canned_record_build_failed",
                        err.detail(),
                    );
                }
            }
            return Ok(ChatTurn { message, response });
        }

        // Upstream failures propagate as-is: the caller shows an explicit
        // error, never a fabricated reply.
        let response = self.completion.complete(&message.text, mode)?;

        if response.is_safety_alert {
            let _ = audit::append_event(
                self.paths,
                "safety",
                "model_flagged",
                owner_id,
                "model set isSafetyAlert",
            );
        }

        let record = ChatRecord::aegis(owner_id, &response)?;
        if let Err(err) = self.gateway.append_chat(&record) {
            return Err(AegisError::persistence(format!(
                "reply generated but history save failed: {}",
                err.detail()
            )));
        }

        if mode == Mode::Shared
            && let Some(summary) = &response.therapist_summary
        {
            // Secondary write: the teen-facing reply is already durable and
            // must not be discarded over a summary failure.
            match SummaryRecord::new(owner_id, summary) {
                Ok(summary_record) => {
                    if let Err(err) = self.gateway.append_summary(&summary_record) {
                        warn::emit(
                            "W002",
                            "summary",
                            owner_id,
                            mode.as_str(),
                            "summary_write_failed",
                            err.detail(),
                        );
                        let _ = audit::append_event(
                            self.paths,
                            "summary",
                            "write_failed",
                            owner_id,
                            err.detail(),
                        );
                    }
                }
                Err(err) => {
                    warn::emit(
                        "W002",
                        "summary",
                        owner_id,
                        mode.as_str(),
                        "summary_record_build_failed",
                        err.detail(),
                    );
                }
            }
        }

        Ok(ChatTurn { message, response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aegis::model::{AegisResponse, Sender, TherapistSummary};
    use std::cell::{Cell, RefCell};
    use tempfile::{TempDir, tempdir};

    fn test_paths(tmp: &TempDir) -> AegisPaths {
        AegisPaths {
            aegis_home: tmp.path().to_path_buf(),
            store_dir: tmp.path().join("store"),
            logs_dir: tmp.path().join("logs"),
        }
    }

    fn shared_reply() -> AegisResponse {
        AegisResponse {
            empathetic_reply: "Exams can feel enormous up close.".to_string(),
            reflection_prompt: "What would a kinder study plan look like?".to_string(),
            wellbeing_score: Some(35),
            improvement_tip: "Try a 10-minute break between subjects.".to_string(),
            is_safety_alert: false,
            therapist_summary: Some(TherapistSummary {
                mood_cues: vec!["anxious".to_string()],
                possible_stressors: vec!["academic pressure".to_string()],
                suggested_follow_up: "Explore exam workload next session.".to_string(),
            }),
        }
    }

    fn private_reply() -> AegisResponse {
        AegisResponse {
            therapist_summary: None,
            ..shared_reply()
        }
    }

    struct FakeCompletion {
        calls: Cell<usize>,
        result: Box<dyn Fn() -> Result<AegisResponse, AegisError>>,
    }

    impl FakeCompletion {
        fn returning(response: AegisResponse) -> Self {
            Self {
                calls: Cell::new(0),
                result: Box::new(move || Ok(response.clone())),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Cell::new(0),
                result: Box::new(|| {
                    Err(AegisError::upstream("gemini call failed with status 500"))
                }),
            }
        }
    }

    impl CompletionClient for FakeCompletion {
        fn complete(&self, _text: &str, _mode: Mode) -> Result<AegisResponse, AegisError> {
            self.calls.set(self.calls.get() + 1);
            (self.result)()
        }
    }

    #[derive(Default)]
    struct MemoryGateway {
        chats: RefCell<Vec<ChatRecord>>,
        summaries: RefCell<Vec<SummaryRecord>>,
        fail_aegis_append: bool,
        fail_summary_append: bool,
    }

    impl PersistenceGateway for MemoryGateway {
        fn label(&self) -> &'static str {
            "memory"
        }

        fn append_chat(&self, record: &ChatRecord) -> Result<(), AegisError> {
            if self.fail_aegis_append && record.sender == Sender::Aegis {
                return Err(AegisError::persistence("chats append rejected"));
            }
            self.chats.borrow_mut().push(record.clone());
            Ok(())
        }

        fn list_chats(&self, _owner_id: &str) -> Result<Vec<ChatRecord>, AegisError> {
            Ok(self.chats.borrow().clone())
        }

        fn append_summary(&self, record: &SummaryRecord) -> Result<(), AegisError> {
            if self.fail_summary_append {
                return Err(AegisError::persistence("summaries append rejected"));
            }
            self.summaries.borrow_mut().push(record.clone());
            Ok(())
        }

        fn list_summaries(&self, _owner_id: &str) -> Result<Vec<SummaryRecord>, AegisError> {
            Ok(self.summaries.borrow().clone())
        }

        fn load_mode(&self, _owner_id: &str) -> Result<Mode, AegisError> {
            Ok(Mode::Private)
        }

        fn store_mode(&self, _owner_id: &str, _mode: Mode) -> Result<(), AegisError> {
            Ok(())
        }
    }

    #[test]
    fn crisis_input_short_circuits_without_calling_the_model() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(private_reply());
        let gateway = MemoryGateway::default();
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let turn = orch
            .respond("teen-1", "I want to kill myself", Mode::Private)
            .expect("turn");

        assert_eq!(completion.calls.get(), 0);
        assert!(turn.response.is_safety_alert);
        assert_eq!(turn.response.wellbeing_score, Some(5));
        assert!(turn.response.empathetic_reply.contains("988"));

        let chats = gateway.chats.borrow();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].sender, Sender::User);
        assert_eq!(chats[1].sender, Sender::Aegis);
    }

    #[test]
    fn crisis_branch_survives_a_failed_canned_record_write() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(private_reply());
        let gateway = MemoryGateway {
            fail_aegis_append: true,
            ..MemoryGateway::default()
        };
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let turn = orch
            .respond("teen-1", "i wanna die", Mode::Private)
            .expect("crisis branch never errors");
        assert!(turn.response.is_safety_alert);
        assert_eq!(gateway.chats.borrow().len(), 1); // user record only
    }

    #[test]
    fn private_turn_never_carries_a_summary() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(private_reply());
        let gateway = MemoryGateway::default();
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let turn = orch.respond("teen-1", "hi", Mode::Private).expect("turn");
        assert_eq!(completion.calls.get(), 1);
        assert!(turn.response.therapist_summary.is_none());
        assert!(gateway.summaries.borrow().is_empty());
    }

    #[test]
    fn shared_turn_persists_the_summary_separately() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(shared_reply());
        let gateway = MemoryGateway::default();
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let turn = orch
            .respond("teen-1", "I'm really stressed about my exam", Mode::Shared)
            .expect("turn");

        let summary = turn.response.therapist_summary.expect("summary");
        assert!(
            summary
                .possible_stressors
                .iter()
                .any(|s| s.contains("academic"))
        );

        let stored = gateway.summaries.borrow();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].owner_id, "teen-1");
    }

    #[test]
    fn upstream_failure_propagates_and_keeps_the_user_record() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::failing();
        let gateway = MemoryGateway::default();
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let err = orch
            .respond("teen-1", "rough day", Mode::Private)
            .unwrap_err();
        assert!(matches!(err, AegisError::Upstream(_)));

        let chats = gateway.chats.borrow();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].sender, Sender::User);
    }

    #[test]
    fn history_save_failure_is_distinguishable_from_generation_failure() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(private_reply());
        let gateway = MemoryGateway {
            fail_aegis_append: true,
            ..MemoryGateway::default()
        };
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let err = orch.respond("teen-1", "rough day", Mode::Private).unwrap_err();
        match err {
            AegisError::Persistence(msg) => {
                assert!(msg.contains("reply generated but history save failed"));
            }
            other => panic!("expected persistence error, got {other}"),
        }
    }

    #[test]
    fn summary_write_failure_does_not_fail_the_turn() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(shared_reply());
        let gateway = MemoryGateway {
            fail_summary_append: true,
            ..MemoryGateway::default()
        };
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let turn = orch
            .respond("teen-1", "exams again", Mode::Shared)
            .expect("turn survives summary failure");
        assert!(turn.response.therapist_summary.is_some());
        assert_eq!(gateway.chats.borrow().len(), 2);
        assert!(gateway.summaries.borrow().is_empty());
    }

    #[test]
    fn blank_input_is_rejected_before_any_write() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let completion = FakeCompletion::returning(private_reply());
        let gateway = MemoryGateway::default();
        let orch = Orchestrator::new(&completion, &gateway, &paths);

        let err = orch.respond("teen-1", "   ", Mode::Private).unwrap_err();
        assert!(matches!(err, AegisError::Validation(_)));
        assert!(gateway.chats.borrow().is_empty());
        assert_eq!(completion.calls.get(), 0);
    }
}
