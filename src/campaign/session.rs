//! Campaign builder session — a reducer over conversation and UI events.
//!
//! `CampaignSession` owns the configuration, the conversation history, the
//! launch status, and the current quick actions. All mutation goes through
//! [`CampaignSession::apply`], so the whole flow is testable without an LLM
//! or a UI.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CampaignError;
use crate::llm::{ChatMessage, CompletionRequest};
use crate::sequence::SequenceGraph;

use super::accounts::SenderDirectory;
use super::merge::{MergeReport, merge_reply};
use super::model::{CampaignConfig, ConversationTurn, SectionVisibility, TurnRole};
use super::prompts::{InputOrigin, system_instruction};
use super::reply::{REPLY_SCHEMA_NAME, parse_ai_reply, reply_schema};
use super::state::{CONFIRM_SELECTION, LaunchStatus};

/// Shown in the conversation when a turn could not be completed.
pub const AI_ERROR_MESSAGE: &str =
    "Sorry, I ran into a problem processing that. Please try again.";

/// Opening line of the utterance that confirms the mailbox selection.
pub const CONFIRMATION_PREFIX: &str = "I confirm using these emails:";

const BUILDER_MAX_TOKENS: u32 = 1024;
const BUILDER_TEMPERATURE: f32 = 0.4;

/// Inputs to the session reducer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The user sent a message (typed, transcribed, or a quick action).
    UserSubmitted { text: String, origin: InputOrigin },
    /// The AI endpoint answered the outstanding request.
    AiReplied { raw: String },
    /// The AI call failed or timed out.
    AiFailed { reason: String },
    /// The user toggled a sender account in the mailbox picker.
    MailboxToggled { account_id: String },
    /// The user clicked Launch.
    LaunchClicked,
}

/// What a single event changed.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    /// Request to send to the AI endpoint, set for accepted user messages.
    pub request: Option<CompletionRequest>,
    /// Launch status before and after, when it moved.
    pub status_change: Option<(LaunchStatus, LaunchStatus)>,
    /// Merge details for a successfully parsed AI reply.
    pub merge: Option<MergeReport>,
    /// Whether the event ended in the generic error turn.
    pub failed: bool,
}

/// Serializable view of a session for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: LaunchStatus,
    pub config: CampaignConfig,
    pub visibility: SectionVisibility,
    pub quick_actions: Vec<String>,
    pub turns: Vec<ConversationTurn>,
    pub awaiting_reply: bool,
}

/// One campaign-creation session.
pub struct CampaignSession {
    id: Uuid,
    directory: Arc<SenderDirectory>,
    config: CampaignConfig,
    turns: Vec<ConversationTurn>,
    quick_actions: Vec<String>,
    awaiting_reply: bool,
}

impl CampaignSession {
    pub fn new(directory: Arc<SenderDirectory>) -> Self {
        Self {
            id: Uuid::new_v4(),
            directory,
            config: CampaignConfig::default(),
            turns: Vec::new(),
            quick_actions: LaunchStatus::Draft.quick_actions(&[]),
            awaiting_reply: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn status(&self) -> LaunchStatus {
        self.config.launch.status
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn quick_actions(&self) -> &[String] {
        &self.quick_actions
    }

    pub fn directory(&self) -> &SenderDirectory {
        &self.directory
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Build the sequence graph from the current cadence.
    pub fn cadence_graph(&self) -> SequenceGraph {
        SequenceGraph::from_cadence(self.config.cadence_text().unwrap_or(crate::sequence::PENDING))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status(),
            config: self.config.clone(),
            visibility: self.config.visibility(),
            quick_actions: self.quick_actions.clone(),
            turns: self.turns.clone(),
            awaiting_reply: self.awaiting_reply,
        }
    }

    /// The utterance sent when the user confirms the current selection.
    pub fn confirmation_utterance(&self) -> String {
        let emails: Vec<&str> = self
            .config
            .mailbox
            .selected
            .iter()
            .filter_map(|id| self.directory.get(id))
            .map(|a| a.email.as_str())
            .collect();
        format!("{} {}", CONFIRMATION_PREFIX, emails.join(", "))
    }

    /// Apply one event.
    ///
    /// Errors leave the session untouched. AI failures are not errors: they
    /// append the generic error turn and report `failed`.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionOutcome, CampaignError> {
        match event {
            SessionEvent::UserSubmitted { text, origin } => self.user_submitted(&text, origin),
            SessionEvent::AiReplied { raw } => self.ai_replied(&raw),
            SessionEvent::AiFailed { reason } => self.ai_failed(&reason),
            SessionEvent::MailboxToggled { account_id } => self.toggle_mailbox(&account_id),
            SessionEvent::LaunchClicked => self.launch(),
        }
    }

    fn user_submitted(
        &mut self,
        text: &str,
        origin: InputOrigin,
    ) -> Result<SessionOutcome, CampaignError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CampaignError::EmptyInput);
        }
        if self.awaiting_reply {
            return Err(CampaignError::RequestInFlight {
                session_id: self.id.to_string(),
            });
        }

        let text = if text.eq_ignore_ascii_case(CONFIRM_SELECTION) {
            self.confirmation_utterance()
        } else {
            text.to_string()
        };

        let request = self.build_request(&text, origin);
        self.turns.push(ConversationTurn::user(&text));
        self.awaiting_reply = true;

        let mut outcome = SessionOutcome {
            request: Some(request),
            ..Default::default()
        };
        if is_confirmation(&text) {
            outcome.status_change = self.advance(LaunchStatus::Ready);
            self.refresh_quick_actions(&[]);
        }

        debug!(session_id = %self.id, ?origin, "User turn accepted");
        Ok(outcome)
    }

    fn build_request(&self, text: &str, origin: InputOrigin) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(ChatMessage::system(system_instruction(
            &self.directory,
            &self.config,
            origin,
        )));
        for turn in &self.turns {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(&turn.text),
                TurnRole::Ai => ChatMessage::assistant(&turn.text),
            });
        }
        messages.push(ChatMessage::user(text));

        CompletionRequest::new(messages)
            .with_max_tokens(BUILDER_MAX_TOKENS)
            .with_temperature(BUILDER_TEMPERATURE)
            .with_json_schema(REPLY_SCHEMA_NAME, reply_schema())
    }

    fn ai_replied(&mut self, raw: &str) -> Result<SessionOutcome, CampaignError> {
        self.take_pending()?;

        let reply = match parse_ai_reply(raw) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Discarding malformed AI reply");
                return Ok(self.record_failure());
            }
        };

        let report = merge_reply(&mut self.config, &reply, &self.directory);
        self.turns.push(ConversationTurn::ai(&reply.ai_response));
        if let Some(ref narrative) = report.narrative {
            self.turns.push(ConversationTurn::ai(narrative));
        }

        let before = self.status();
        if !report.matched.is_empty() && !self.config.mailbox.selected.is_empty() {
            self.advance(LaunchStatus::MailboxSelected);
        }
        if reply.launch_ready == Some(true) {
            self.advance(LaunchStatus::Ready);
        }
        let after = self.status();
        self.refresh_quick_actions(&reply.suggested_actions);

        info!(
            session_id = %self.id,
            sections = ?report.updated_sections,
            status = %after,
            "Merged AI reply"
        );

        Ok(SessionOutcome {
            status_change: (before != after).then_some((before, after)),
            merge: Some(report),
            ..Default::default()
        })
    }

    fn ai_failed(&mut self, reason: &str) -> Result<SessionOutcome, CampaignError> {
        self.take_pending()?;
        warn!(session_id = %self.id, reason, "AI call failed");
        Ok(self.record_failure())
    }

    fn take_pending(&mut self) -> Result<(), CampaignError> {
        if !self.awaiting_reply {
            return Err(CampaignError::NoPendingRequest {
                session_id: self.id.to_string(),
            });
        }
        self.awaiting_reply = false;
        Ok(())
    }

    fn record_failure(&mut self) -> SessionOutcome {
        self.turns.push(ConversationTurn::ai(AI_ERROR_MESSAGE));
        SessionOutcome {
            failed: true,
            ..Default::default()
        }
    }

    fn toggle_mailbox(&mut self, account_id: &str) -> Result<SessionOutcome, CampaignError> {
        if self.directory.get(account_id).is_none() {
            return Err(CampaignError::UnknownMailbox(account_id.to_string()));
        }
        let selected = &mut self.config.mailbox.selected;
        if !selected.remove(account_id) {
            selected.insert(account_id.to_string());
        }
        debug!(session_id = %self.id, account_id, selected = selected.len(), "Mailbox toggled");
        Ok(SessionOutcome::default())
    }

    fn launch(&mut self) -> Result<SessionOutcome, CampaignError> {
        let before = self.status();
        if self.config.launch.status.advance_to(LaunchStatus::Launched)? {
            info!(session_id = %self.id, "Campaign launched");
            self.refresh_quick_actions(&[]);
            return Ok(SessionOutcome {
                status_change: Some((before, LaunchStatus::Launched)),
                ..Default::default()
            });
        }
        Ok(SessionOutcome::default())
    }

    /// Move forward to `target`, logging rather than failing on a rejected
    /// transition.
    fn advance(&mut self, target: LaunchStatus) -> Option<(LaunchStatus, LaunchStatus)> {
        let before = self.status();
        match self.config.launch.status.advance_to(target) {
            Ok(true) => {
                info!(session_id = %self.id, from = %before, to = %target, "Launch status advanced");
                Some((before, target))
            }
            Ok(false) => None,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Launch transition rejected");
                None
            }
        }
    }

    fn refresh_quick_actions(&mut self, ai_suggestions: &[String]) {
        self.quick_actions = self.status().quick_actions(ai_suggestions);
    }
}

/// Whether the user's message confirms the mailbox selection.
pub fn is_confirmation(text: &str) -> bool {
    text.to_lowercase()
        .contains(&CONFIRMATION_PREFIX.trim_end_matches(':').to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::accounts::SenderAccount;
    use crate::campaign::state::FALLBACK_ACTIONS;
    use crate::llm::Role;

    fn session() -> CampaignSession {
        CampaignSession::new(Arc::new(SenderDirectory::new(vec![
            SenderAccount::new("a1", "sales@acme.com", "google"),
            SenderAccount::new("a2", "info@acme.com", "google"),
            SenderAccount::new("b1", "sales@beta.io", "microsoft"),
        ])))
    }

    fn say(session: &mut CampaignSession, text: &str) -> SessionOutcome {
        session
            .apply(SessionEvent::UserSubmitted {
                text: text.to_string(),
                origin: InputOrigin::Typed,
            })
            .unwrap()
    }

    fn reply(session: &mut CampaignSession, raw: &str) -> SessionOutcome {
        session
            .apply(SessionEvent::AiReplied {
                raw: raw.to_string(),
            })
            .unwrap()
    }

    #[test]
    fn new_session_offers_fallback_actions() {
        let s = session();
        assert_eq!(s.status(), LaunchStatus::Draft);
        assert_eq!(s.quick_actions().len(), FALLBACK_ACTIONS.len());
        assert!(s.turns().is_empty());
    }

    #[test]
    fn empty_input_is_rejected_without_change() {
        let mut s = session();
        let err = s
            .apply(SessionEvent::UserSubmitted {
                text: "   ".into(),
                origin: InputOrigin::Typed,
            })
            .unwrap_err();
        assert!(matches!(err, CampaignError::EmptyInput));
        assert!(s.turns().is_empty());
        assert!(!s.is_awaiting_reply());
    }

    #[test]
    fn request_replays_history_then_new_message() {
        let mut s = session();
        say(&mut s, "Target CTOs");
        reply(&mut s, r#"{"ai_response": "In which industry?", "suggested_actions": []}"#);

        let request = say(&mut s, "Fintech").request.unwrap();
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(request.messages[3].content, "Fintech");
        assert!(request.response_format.is_some());
        assert!(request.system_instruction().unwrap().contains("sales@acme.com"));
    }

    #[test]
    fn voice_origin_adds_correction_block() {
        let mut s = session();
        let outcome = s
            .apply(SessionEvent::UserSubmitted {
                text: "target fin tech".into(),
                origin: InputOrigin::Voice,
            })
            .unwrap();
        let request = outcome.request.unwrap();
        assert!(request.system_instruction().unwrap().contains("VOICE INPUT"));
    }

    #[test]
    fn second_submit_while_waiting_is_rejected() {
        let mut s = session();
        say(&mut s, "hello");
        let err = s
            .apply(SessionEvent::UserSubmitted {
                text: "again".into(),
                origin: InputOrigin::Typed,
            })
            .unwrap_err();
        assert!(matches!(err, CampaignError::RequestInFlight { .. }));
        assert_eq!(s.turns().len(), 1);
    }

    #[test]
    fn reply_without_request_is_rejected() {
        let mut s = session();
        let err = s
            .apply(SessionEvent::AiReplied {
                raw: r#"{"ai_response": "hi"}"#.into(),
            })
            .unwrap_err();
        assert!(matches!(err, CampaignError::NoPendingRequest { .. }));
    }

    #[test]
    fn malformed_reply_appends_error_and_keeps_config() {
        let mut s = session();
        say(&mut s, "Target CTOs in fintech");
        reply(
            &mut s,
            r#"{"ai_response": "Got it", "icp": {"role": "CTO", "industry": "Fintech"}}"#,
        );
        let before = s.config().clone();

        say(&mut s, "Goal is 100 leads");
        let outcome = reply(&mut s, r#"{"ai_response": "ok", "icp": {"goal": "100"#);

        assert!(outcome.failed);
        assert_eq!(s.config(), &before);
        assert_eq!(s.turns().last().unwrap().text, AI_ERROR_MESSAGE);
        assert!(!s.is_awaiting_reply());
    }

    #[test]
    fn ai_failure_appends_single_error_turn() {
        let mut s = session();
        say(&mut s, "hello");
        let outcome = s
            .apply(SessionEvent::AiFailed {
                reason: "timeout".into(),
            })
            .unwrap();
        assert!(outcome.failed);
        assert_eq!(s.turns().len(), 2);
        assert_eq!(s.turns()[1].role, TurnRole::Ai);
        assert_eq!(s.config(), &CampaignConfig::default());
    }

    #[test]
    fn narrative_turn_follows_synthesis_once() {
        let mut s = session();
        say(&mut s, "CTOs, 100 leads/month, we are acme.com");
        let raw = r#"{"ai_response": "Great.", "suggested_actions": ["a", "b", "c"],
            "icp": {"role": "CTO", "goal": "100 leads/month"},
            "company": {"url": "acme.com"}}"#;
        let outcome = reply(&mut s, raw);
        assert!(outcome.merge.unwrap().narrative.is_some());
        assert_eq!(s.turns().len(), 3, "user, reply, narrative");
        assert_eq!(s.config().calculations.required, Some(10_000));

        say(&mut s, "sounds good");
        let outcome = reply(&mut s, raw);
        assert!(outcome.merge.unwrap().narrative.is_none());
        assert_eq!(s.turns().len(), 5);
    }

    #[test]
    fn mailbox_selection_moves_to_selected_then_confirm() {
        let mut s = session();
        say(&mut s, "use all acme emails");
        let outcome = reply(
            &mut s,
            r#"{"ai_response": "Selected.", "suggested_actions": ["x", "y", "z"],
                "mailbox_selection": ["acme.com"]}"#,
        );
        assert_eq!(
            outcome.status_change,
            Some((LaunchStatus::Draft, LaunchStatus::MailboxSelected))
        );
        assert_eq!(s.quick_actions(), &[CONFIRM_SELECTION.to_string()]);

        // Clicking the quick action sends the confirmation phrase.
        let outcome = say(&mut s, CONFIRM_SELECTION);
        assert_eq!(
            outcome.status_change,
            Some((LaunchStatus::MailboxSelected, LaunchStatus::Ready))
        );
        let last = s.turns().last().unwrap();
        assert_eq!(last.text, "I confirm using these emails: sales@acme.com, info@acme.com");
        assert!(s.quick_actions().is_empty());

        // A later reply cannot move the status backward.
        let outcome = reply(
            &mut s,
            r#"{"ai_response": "Ready to launch.", "suggested_actions": ["Launch"], "mailbox_selection": ["beta.io"]}"#,
        );
        assert!(outcome.status_change.is_none());
        assert_eq!(s.status(), LaunchStatus::Ready);
        assert!(s.quick_actions().is_empty());
    }

    #[test]
    fn ai_selection_of_toggled_accounts_still_selects() {
        let mut s = session();
        s.apply(SessionEvent::MailboxToggled {
            account_id: "a1".into(),
        })
        .unwrap();
        s.apply(SessionEvent::MailboxToggled {
            account_id: "a2".into(),
        })
        .unwrap();
        assert_eq!(s.status(), LaunchStatus::Draft);

        say(&mut s, "use the acme mailboxes");
        let outcome = reply(
            &mut s,
            r#"{"ai_response": "Using acme.", "suggested_actions": ["x", "y", "z"],
                "mailbox_selection": ["acme.com"]}"#,
        );
        assert!(outcome.merge.unwrap().newly_selected.is_empty());
        assert_eq!(s.status(), LaunchStatus::MailboxSelected);
        assert_eq!(s.quick_actions(), &[CONFIRM_SELECTION.to_string()]);
    }

    #[test]
    fn unmatched_selection_stays_in_draft() {
        let mut s = session();
        s.apply(SessionEvent::MailboxToggled {
            account_id: "a1".into(),
        })
        .unwrap();
        say(&mut s, "use gamma");
        reply(
            &mut s,
            r#"{"ai_response": "No gamma accounts.", "suggested_actions": ["x", "y"],
                "mailbox_selection": ["gamma.dev"]}"#,
        );
        assert_eq!(s.status(), LaunchStatus::Draft);
    }

    #[test]
    fn launch_ready_fast_path_from_draft() {
        let mut s = session();
        say(&mut s, "just launch it");
        let outcome = reply(
            &mut s,
            r#"{"ai_response": "Ready.", "suggested_actions": [], "launch_ready": true}"#,
        );
        assert_eq!(outcome.status_change, Some((LaunchStatus::Draft, LaunchStatus::Ready)));
    }

    #[test]
    fn launch_requires_ready() {
        let mut s = session();
        let err = s.apply(SessionEvent::LaunchClicked).unwrap_err();
        assert!(matches!(err, CampaignError::InvalidTransition { .. }));
        assert_eq!(s.status(), LaunchStatus::Draft);

        say(&mut s, "I confirm using these emails: sales@beta.io");
        assert_eq!(s.status(), LaunchStatus::Ready);
        let outcome = s.apply(SessionEvent::LaunchClicked).unwrap();
        assert_eq!(outcome.status_change, Some((LaunchStatus::Ready, LaunchStatus::Launched)));

        // Clicking again is a no-op.
        let outcome = s.apply(SessionEvent::LaunchClicked).unwrap();
        assert!(outcome.status_change.is_none());
    }

    #[test]
    fn toggle_mailbox_edits_selection_only() {
        let mut s = session();
        s.apply(SessionEvent::MailboxToggled { account_id: "b1".into() }).unwrap();
        assert!(s.config().mailbox.selected.contains("b1"));
        assert_eq!(s.status(), LaunchStatus::Draft);

        s.apply(SessionEvent::MailboxToggled { account_id: "b1".into() }).unwrap();
        assert!(s.config().mailbox.selected.is_empty());

        let err = s
            .apply(SessionEvent::MailboxToggled { account_id: "zzz".into() })
            .unwrap_err();
        assert!(matches!(err, CampaignError::UnknownMailbox(_)));
    }

    #[test]
    fn draft_passes_ai_suggestions_through() {
        let mut s = session();
        say(&mut s, "hi");
        reply(
            &mut s,
            r#"{"ai_response": "Who do you sell to?", "suggested_actions": ["CTOs", "CFOs", "Founders"]}"#,
        );
        assert_eq!(s.quick_actions(), &["CTOs", "CFOs", "Founders"]);
    }

    #[test]
    fn cadence_graph_uses_merged_steps() {
        let mut s = session();
        assert_eq!(s.cadence_graph().nodes().len(), 1, "pending cadence has only the start node");

        say(&mut s, "email then call");
        reply(
            &mut s,
            r#"{"ai_response": "ok", "cadence": {"channels": "Email, Phone", "steps": "Day 1: Send email, Day 3: Follow-up call"}}"#,
        );
        assert_eq!(s.cadence_graph().nodes().len(), 3);
    }

    #[test]
    fn confirmation_phrase_detection() {
        assert!(is_confirmation("I confirm using these emails: a@b.com"));
        assert!(is_confirmation("ok, i CONFIRM using these emails"));
        assert!(!is_confirmation("I confirm the cadence"));
    }
}
