//! Conversational campaign builder.
//!
//! The user describes a campaign in chat; each AI reply is parsed, merged
//! into [`CampaignConfig`] under fill-if-absent rules, and advances the launch
//! status.

pub mod accounts;
pub mod merge;
pub mod model;
pub mod prompts;
pub mod reply;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;

pub use accounts::{SenderAccount, SenderDirectory};
pub use model::{CampaignConfig, ConversationTurn, SectionVisibility, TurnRole};
pub use prompts::InputOrigin;
pub use service::CampaignService;
pub use session::{CampaignSession, SessionEvent, SessionOutcome, SessionSnapshot};
pub use state::LaunchStatus;
