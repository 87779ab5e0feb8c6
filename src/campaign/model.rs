//! Campaign configuration data model — the sections the builder fills in
//! as the conversation progresses.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::LaunchStatus;

/// Ideal customer profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icp {
    pub role: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub goal: Option<String>,
}

impl Icp {
    pub fn is_populated(&self) -> bool {
        self.role.is_some() || self.industry.is_some() || self.location.is_some() || self.goal.is_some()
    }
}

/// Lead volume math derived from the ICP goal and the data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculations {
    /// Contacts needed to hit the goal at the assumed conversion rate.
    pub required: Option<u64>,
    /// Contacts available from the data source.
    pub uploaded: Option<u64>,
}

/// What the sending company offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub url: Option<String>,
    pub value_prop: Option<String>,
    pub pain_points: Option<String>,
}

impl CompanyProfile {
    pub fn is_populated(&self) -> bool {
        self.url.is_some() || self.value_prop.is_some() || self.pain_points.is_some()
    }
}

/// A contact row shown as a preview of the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub name: String,
    pub title: String,
    pub company: String,
    pub location: String,
}

/// Where the campaign's contacts come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub source_type: Option<String>,
    pub status: Option<String>,
    pub uploaded: Option<u64>,
    #[serde(default)]
    pub sample_records: Vec<SampleRecord>,
}

impl DataSource {
    pub fn is_populated(&self) -> bool {
        self.source_type.is_some() || self.status.is_some() || self.uploaded.is_some()
    }
}

/// Free-text outreach cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    pub channels: Option<String>,
    pub steps: Option<String>,
}

impl Cadence {
    pub fn is_populated(&self) -> bool {
        self.channels.is_some() || self.steps.is_some()
    }
}

/// Sender accounts picked for the campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxSelection {
    pub selected: BTreeSet<String>,
}

/// Launch section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSection {
    pub status: LaunchStatus,
}

/// The accumulated campaign configuration for one builder session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub icp: Icp,
    pub calculations: Calculations,
    pub company: CompanyProfile,
    pub data_source: DataSource,
    pub cadence: Cadence,
    pub mailbox: MailboxSelection,
    pub launch: LaunchSection,
}

impl CampaignConfig {
    /// Which sections the UI should reveal.
    ///
    /// Each section needs its predecessor revealed first, so a later section
    /// never appears ahead of an earlier one.
    pub fn visibility(&self) -> SectionVisibility {
        let icp = self.icp.is_populated();
        let company = icp && self.company.is_populated();
        let data_source = company && self.data_source.is_populated();
        let cadence = data_source && self.cadence.is_populated();
        let mailbox = cadence;
        let launch = mailbox && self.launch.status >= LaunchStatus::Ready;
        SectionVisibility {
            icp,
            company,
            data_source,
            cadence,
            mailbox,
            launch,
        }
    }

    /// Cadence steps to feed into the sequence builder, or `None` while the
    /// cadence is still pending.
    pub fn cadence_text(&self) -> Option<&str> {
        self.cadence.steps.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Reveal flags for each section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionVisibility {
    pub icp: bool,
    pub company: bool,
    pub data_source: bool,
    pub cadence: bool,
    pub mailbox: bool,
    pub launch: bool,
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Ai,
}

/// One entry in the builder conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Ai,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
