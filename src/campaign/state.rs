//! Launch state machine — tracks how far the campaign is from going live.

use serde::{Deserialize, Serialize};

use crate::error::CampaignError;

/// Label of the single quick action offered while a mailbox selection
/// awaits confirmation.
pub const CONFIRM_SELECTION: &str = "Confirm Selection";

/// Suggestions offered in `Draft` when the AI proposed none.
pub const FALLBACK_ACTIONS: [&str; 2] = ["Tell me more", "Continue"];

/// Launch lifecycle of a campaign.
///
/// Progresses forward only: Draft → MailboxSelected → Ready → Launched, with a
/// fast path Draft → Ready when the AI (or the user) confirms early.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStatus {
    #[default]
    Draft,
    MailboxSelected,
    Ready,
    Launched,
}

impl LaunchStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: LaunchStatus) -> bool {
        use LaunchStatus::*;
        matches!(
            (self, target),
            (Draft, MailboxSelected) | (MailboxSelected, Ready) | (Draft, Ready) | (Ready, Launched)
        )
    }

    /// Whether the campaign has gone live.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Launched)
    }

    /// Move to `target` if the transition is allowed.
    ///
    /// Returns `Ok(true)` when the status changed and `Ok(false)` when the
    /// campaign is already at or past `target`, so repeated signals are
    /// harmless. Anything else is an invalid transition.
    pub fn advance_to(&mut self, target: LaunchStatus) -> Result<bool, CampaignError> {
        if *self >= target {
            return Ok(false);
        }
        if !self.can_transition_to(target) {
            return Err(CampaignError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        *self = target;
        Ok(true)
    }

    /// Quick-action suggestions for this status.
    ///
    /// `ai_suggestions` are passed through verbatim only while in `Draft`.
    pub fn quick_actions(&self, ai_suggestions: &[String]) -> Vec<String> {
        match self {
            Self::Ready | Self::Launched => Vec::new(),
            Self::MailboxSelected => vec![CONFIRM_SELECTION.to_string()],
            Self::Draft if ai_suggestions.is_empty() => {
                FALLBACK_ACTIONS.iter().map(|s| s.to_string()).collect()
            }
            Self::Draft => ai_suggestions.to_vec(),
        }
    }
}

impl std::fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::MailboxSelected => "mailbox_selected",
            Self::Ready => "ready",
            Self::Launched => "launched",
        };
        write!(f, "{s}")
    }
}
