//! CampaignService — drives one builder session against the LLM.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::CampaignError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::sequence::SequenceGraph;

use super::accounts::SenderDirectory;
use super::prompts::InputOrigin;
use super::session::{CampaignSession, SessionEvent, SessionSnapshot};

/// Owns the session and the provider, and runs each AI round trip.
///
/// The session lock is released while the AI call is outstanding; the
/// session itself rejects overlapping submissions.
pub struct CampaignService {
    llm: Arc<dyn LlmProvider>,
    session: Arc<RwLock<CampaignSession>>,
    timeout: Duration,
}

impl CampaignService {
    pub fn new(llm: Arc<dyn LlmProvider>, directory: Arc<SenderDirectory>, timeout: Duration) -> Self {
        Self {
            llm,
            session: Arc::new(RwLock::new(CampaignSession::new(directory))),
            timeout,
        }
    }

    /// Send one user message and wait for the AI turn to land.
    ///
    /// The AI round trip runs on its own task, so the session settles even
    /// when the caller stops waiting.
    pub async fn submit(&self, text: &str, origin: InputOrigin) -> Result<SessionSnapshot, CampaignError> {
        let outcome = self.session.write().await.apply(SessionEvent::UserSubmitted {
            text: text.to_string(),
            origin,
        })?;
        let Some(request) = outcome.request else {
            return Ok(self.snapshot().await);
        };

        let llm = Arc::clone(&self.llm);
        let session = Arc::clone(&self.session);
        let timeout = self.timeout;
        let turn = tokio::spawn(async move {
            let event = run_completion(llm.as_ref(), request, timeout).await;
            let mut session = session.write().await;
            session.apply(event)?;
            Ok::<_, CampaignError>(session.snapshot())
        });

        turn.await.map_err(|e| CampaignError::TurnFailed(e.to_string()))?
    }

    /// Flip one sender account in the mailbox selection.
    pub async fn toggle_mailbox(&self, account_id: &str) -> Result<SessionSnapshot, CampaignError> {
        let mut session = self.session.write().await;
        session.apply(SessionEvent::MailboxToggled {
            account_id: account_id.to_string(),
        })?;
        Ok(session.snapshot())
    }

    /// Launch the campaign. Only allowed once it is ready.
    pub async fn launch(&self) -> Result<SessionSnapshot, CampaignError> {
        let mut session = self.session.write().await;
        session.apply(SessionEvent::LaunchClicked)?;
        info!(session_id = %session.id(), "Launch requested");
        Ok(session.snapshot())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.read().await.snapshot()
    }

    /// Sender accounts available to this session.
    pub async fn directory(&self) -> SenderDirectory {
        self.session.read().await.directory().clone()
    }

    /// Sequence graph built from the session's current cadence.
    pub async fn cadence_graph(&self) -> SequenceGraph {
        self.session.read().await.cadence_graph()
    }
}

/// Call the provider and turn the result into the session event that settles the turn.
async fn run_completion(llm: &dyn LlmProvider, request: CompletionRequest, timeout: Duration) -> SessionEvent {
    match tokio::time::timeout(timeout, llm.complete(request)).await {
        Ok(Ok(response)) => SessionEvent::AiReplied {
            raw: response.content,
        },
        Ok(Err(e)) => {
            warn!(model = llm.model_name(), error = %e, "Campaign builder call failed");
            SessionEvent::AiFailed {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            warn!(
                model = llm.model_name(),
                timeout_secs = timeout.as_secs(),
                "Campaign builder call timed out"
            );
            SessionEvent::AiFailed {
                reason: format!("timed out after {}s", timeout.as_secs()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::accounts::SenderAccount;
    use crate::campaign::session::AI_ERROR_MESSAGE;
    use crate::campaign::state::LaunchStatus;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock LLM that returns queued responses in order.
    struct MockLlm {
        responses: Mutex<Vec<String>>,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Duration,
    }

    impl MockLlm {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let content = self.responses.lock().unwrap().pop().ok_or_else(|| {
                LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "no queued response".into(),
                }
            })?;
            Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn directory() -> Arc<SenderDirectory> {
        Arc::new(SenderDirectory::new(vec![
            SenderAccount::new("a1", "sales@acme.com", "google"),
            SenderAccount::new("b1", "sales@beta.io", "microsoft"),
        ]))
    }

    #[tokio::test]
    async fn submit_merges_reply() {
        let llm = Arc::new(MockLlm::new(&[
            r#"{"ai_response": "Got it, CTOs in fintech.", "suggested_actions": ["US only", "Europe", "Global"],
                "icp": {"role": "CTO", "industry": "Fintech"}}"#,
        ]));
        let service = CampaignService::new(llm.clone(), directory(), Duration::from_secs(5));

        let snapshot = service.submit("Target fintech CTOs", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.config.icp.role.as_deref(), Some("CTO"));
        assert!(snapshot.visibility.icp);
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.quick_actions, vec!["US only", "Europe", "Global"]);
        assert!(!snapshot.awaiting_reply);
        assert_eq!(llm.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provider_error_becomes_error_turn() {
        let llm = Arc::new(MockLlm::new(&[]));
        let service = CampaignService::new(llm, directory(), Duration::from_secs(5));

        let snapshot = service.submit("hello", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[1].text, AI_ERROR_MESSAGE);
        assert_eq!(snapshot.status, LaunchStatus::Draft);
    }

    #[tokio::test]
    async fn timeout_becomes_error_turn() {
        let llm = Arc::new(
            MockLlm::new(&[r#"{"ai_response": "late"}"#]).slow(Duration::from_millis(200)),
        );
        let service = CampaignService::new(llm, directory(), Duration::from_millis(20));

        let snapshot = service.submit("hello", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.turns.last().unwrap().text, AI_ERROR_MESSAGE);
        assert!(!snapshot.awaiting_reply);
    }

    #[tokio::test]
    async fn overlapping_submit_is_rejected() {
        let llm = Arc::new(
            MockLlm::new(&[r#"{"ai_response": "first"}"#]).slow(Duration::from_millis(100)),
        );
        let service = Arc::new(CampaignService::new(llm, directory(), Duration::from_secs(5)));

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.submit("one", InputOrigin::Typed).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = service.submit("two", InputOrigin::Typed).await.unwrap_err();
        assert!(matches!(err, CampaignError::RequestInFlight { .. }));

        let snapshot = first.await.unwrap().unwrap();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[1].text, "first");
    }

    #[tokio::test]
    async fn cancelled_submit_still_settles_session() {
        let llm = Arc::new(
            MockLlm::new(&[r#"{"ai_response": "late but fine"}"#, r#"{"ai_response": "second"}"#])
                .slow(Duration::from_millis(100)),
        );
        let service = Arc::new(CampaignService::new(llm, directory(), Duration::from_secs(5)));

        let pending = {
            let service = service.clone();
            tokio::spawn(async move { service.submit("hello", InputOrigin::Typed).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        pending.abort();
        assert!(service.snapshot().await.awaiting_reply);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let snapshot = service.snapshot().await;
        assert!(!snapshot.awaiting_reply);
        assert_eq!(snapshot.turns[1].text, "late but fine");

        let snapshot = service.submit("next", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.turns.last().unwrap().text, "second");
    }

    #[tokio::test]
    async fn voice_submission_carries_correction_policy() {
        let llm = Arc::new(MockLlm::new(&[r#"{"ai_response": "ok"}"#]));
        let service = CampaignService::new(llm.clone(), directory(), Duration::from_secs(5));

        service.submit("target fin tech", InputOrigin::Voice).await.unwrap();
        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].system_instruction().unwrap().contains("VOICE INPUT"));
    }

    #[tokio::test]
    async fn toggle_and_launch_flow() {
        let llm = Arc::new(MockLlm::new(&[
            r#"{"ai_response": "Using acme.", "mailbox_selection": ["acme.com"]}"#,
            r#"{"ai_response": "All set.", "launch_ready": true}"#,
        ]));
        let service = CampaignService::new(llm, directory(), Duration::from_secs(5));

        assert!(service.launch().await.is_err());

        let snapshot = service.submit("use acme", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.status, LaunchStatus::MailboxSelected);

        let snapshot = service.toggle_mailbox("b1").await.unwrap();
        assert_eq!(snapshot.config.mailbox.selected.len(), 2);

        let snapshot = service.submit("Confirm Selection", InputOrigin::Typed).await.unwrap();
        assert_eq!(snapshot.status, LaunchStatus::Ready);

        let snapshot = service.launch().await.unwrap();
        assert_eq!(snapshot.status, LaunchStatus::Launched);
    }
}
