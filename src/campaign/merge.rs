//! Merge rules that fold each AI reply into the campaign configuration.
//!
//! Every field follows fill-if-absent: a value, once known, is never replaced
//! or cleared by a later reply.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::accounts::SenderDirectory;
use super::model::{CampaignConfig, SampleRecord};
use super::reply::AiReply;

/// Share of contacted leads expected to convert, in percent.
pub const CONVERSION_RATE_PERCENT: u64 = 1;

/// Contacts assumed available once a data source is attached.
pub const ASSUMED_CAPACITY: u64 = 5_000;

const DEFAULT_SOURCE_TYPE: &str = "CSV Upload";
const DEFAULT_SOURCE_STATUS: &str = "Uploaded";

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("static regex"));

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Sections that gained at least one field.
    pub updated_sections: Vec<&'static str>,
    /// Comparison narrative, present only on the turn the data source was
    /// synthesized.
    pub narrative: Option<String>,
    /// Account ids the reply's mailbox selection resolved to.
    pub matched: BTreeSet<String>,
    /// The subset of `matched` that was not already selected.
    pub newly_selected: BTreeSet<String>,
}

/// Contacts needed to reach the integer goal embedded in `goal`.
///
/// `"100 leads/month"` at a 1% conversion rate needs 10,000 contacts.
pub fn required_leads(goal: &str) -> Option<u64> {
    let digits: String = FIRST_INTEGER
        .find(goal)?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let target: u64 = digits.parse().ok()?;
    Some(target.checked_mul(100)?.div_ceil(CONVERSION_RATE_PERCENT))
}

fn fill(slot: &mut Option<String>, value: &Option<String>) -> bool {
    match (slot.as_ref(), value) {
        (None, Some(v)) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

/// Fold `reply` into `config`.
///
/// Launch status is left to the caller; this only touches data sections.
pub fn merge_reply(
    config: &mut CampaignConfig,
    reply: &AiReply,
    directory: &SenderDirectory,
) -> MergeReport {
    let mut report = MergeReport::default();

    if let Some(ref icp) = reply.icp {
        let mut changed = fill(&mut config.icp.role, &icp.role);
        changed |= fill(&mut config.icp.industry, &icp.industry);
        changed |= fill(&mut config.icp.location, &icp.location);
        if fill(&mut config.icp.goal, &icp.goal) {
            changed = true;
            config.calculations.required = config.icp.goal.as_deref().and_then(required_leads);
            tracing::debug!(required = ?config.calculations.required, "Recomputed required leads");
        }
        if changed {
            report.updated_sections.push("icp");
        }
    }

    if let Some(ref company) = reply.company {
        let mut changed = fill(&mut config.company.url, &company.url);
        changed |= fill(&mut config.company.value_prop, &company.value_prop);
        changed |= fill(&mut config.company.pain_points, &company.pain_points);
        if changed {
            report.updated_sections.push("company");
        }
    }
    backfill_company(config);

    if let Some(ref source) = reply.data_source {
        let mut changed = fill(&mut config.data_source.source_type, &source.source_type);
        changed |= fill(&mut config.data_source.status, &source.status);
        if changed {
            report.updated_sections.push("data_source");
        }
    }

    if config.icp.goal.is_some() && config.company.url.is_some() && config.data_source.uploaded.is_none() {
        report.narrative = Some(synthesize_data_source(config));
        if !report.updated_sections.contains(&"data_source") {
            report.updated_sections.push("data_source");
        }
    }

    if let Some(ref cadence) = reply.cadence {
        let mut changed = fill(&mut config.cadence.channels, &cadence.channels);
        changed |= fill(&mut config.cadence.steps, &cadence.steps);
        if changed {
            report.updated_sections.push("cadence");
        }
    }

    if let Some(ref phrases) = reply.mailbox_selection {
        report.matched = directory.match_selection(phrases);
        for id in &report.matched {
            if config.mailbox.selected.insert(id.clone()) {
                report.newly_selected.insert(id.clone());
            }
        }
        if !report.newly_selected.is_empty() {
            report.updated_sections.push("mailbox");
        }
    }

    report
}

/// Generate value proposition and pain points when the AI left them blank.
fn backfill_company(config: &mut CampaignConfig) {
    let Some(url) = config.company.url.as_deref() else {
        return;
    };
    let name = company_name(url);
    let audience = config.icp.industry.as_deref().unwrap_or("B2B");

    if config.company.value_prop.is_none() {
        config.company.value_prop = Some(format!(
            "{name} helps {audience} teams book more qualified meetings with less manual prospecting"
        ));
    }
    if config.company.pain_points.is_none() {
        let role = config.icp.role.as_deref().unwrap_or("Revenue leaders");
        config.company.pain_points = Some(format!(
            "{role} struggle with low reply rates and inconsistent follow-up"
        ));
    }
}

/// Human-friendly company name from a URL: `https://www.acme-labs.com/x` → `Acme-labs`.
fn company_name(url: &str) -> String {
    let host = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let label = host.split(['.', '/']).next().unwrap_or(host);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => url.to_string(),
    }
}

/// Attach the assumed data source and describe how it compares to the
/// required lead volume. Runs once per session.
fn synthesize_data_source(config: &mut CampaignConfig) -> String {
    let records = sample_records(config);
    let source = &mut config.data_source;
    if source.source_type.is_none() {
        source.source_type = Some(DEFAULT_SOURCE_TYPE.to_string());
    }
    if source.status.is_none() {
        source.status = Some(DEFAULT_SOURCE_STATUS.to_string());
    }
    source.uploaded = Some(ASSUMED_CAPACITY);
    source.sample_records = records;
    config.calculations.uploaded = Some(ASSUMED_CAPACITY);

    tracing::info!(
        uploaded = ASSUMED_CAPACITY,
        required = ?config.calculations.required,
        "Synthesized data source"
    );

    let goal = config.icp.goal.as_deref().unwrap_or("your goal");
    match config.calculations.required {
        Some(required) if ASSUMED_CAPACITY >= required => format!(
            "Your data source has {ASSUMED_CAPACITY} contacts. Reaching {goal} needs about \
             {required} contacts at a {CONVERSION_RATE_PERCENT}% conversion rate, so you have a \
             surplus of {} contacts.",
            ASSUMED_CAPACITY - required
        ),
        Some(required) => format!(
            "Your data source has {ASSUMED_CAPACITY} contacts. Reaching {goal} needs about \
             {required} contacts at a {CONVERSION_RATE_PERCENT}% conversion rate, so you are \
             {} contacts short. Consider widening the location or adding adjacent roles.",
            required - ASSUMED_CAPACITY
        ),
        None => format!(
            "Your data source has {ASSUMED_CAPACITY} contacts. Give me a numeric goal and I'll \
             check whether that is enough."
        ),
    }
}

fn sample_records(config: &CampaignConfig) -> Vec<SampleRecord> {
    const NAMES: [&str; 3] = ["Jordan Lee", "Priya Shah", "Marcus Chen"];
    const COMPANIES: [&str; 3] = ["Northwind", "Blue Harbor", "Summit"];

    let title = config.icp.role.as_deref().unwrap_or("Head of Sales");
    let industry = config.icp.industry.as_deref().unwrap_or("Group");
    let location = config.icp.location.as_deref().unwrap_or("United States");

    NAMES
        .iter()
        .zip(COMPANIES.iter())
        .map(|(name, company)| SampleRecord {
            name: name.to_string(),
            title: title.to_string(),
            company: format!("{company} {industry}"),
            location: location.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::accounts::SenderAccount;
    use crate::campaign::reply::{CadenceUpdate, CompanyUpdate, IcpUpdate};

    fn directory() -> SenderDirectory {
        SenderDirectory::new(vec![
            SenderAccount::new("a1", "sales@acme.com", "google"),
            SenderAccount::new("a2", "info@acme.com", "google"),
            SenderAccount::new("b1", "sales@beta.io", "microsoft"),
        ])
    }

    fn reply_with_icp(icp: IcpUpdate) -> AiReply {
        AiReply {
            ai_response: "ok".into(),
            icp: Some(icp),
            ..Default::default()
        }
    }

    #[test]
    fn required_leads_examples() {
        assert_eq!(required_leads("100 leads/month"), Some(10_000));
        assert_eq!(required_leads("Book 1,500 meetings"), Some(150_000));
        assert_eq!(required_leads("7"), Some(700));
        assert_eq!(required_leads("as many as possible"), None);
    }

    #[test]
    fn fill_if_absent_never_reverts() {
        let mut config = CampaignConfig::default();
        let dir = directory();

        merge_reply(
            &mut config,
            &reply_with_icp(IcpUpdate {
                role: Some("CTO".into()),
                industry: Some("Fintech".into()),
                ..Default::default()
            }),
            &dir,
        );
        // Later reply omits role and proposes a different industry.
        merge_reply(
            &mut config,
            &reply_with_icp(IcpUpdate {
                industry: Some("Healthcare".into()),
                location: Some("Berlin".into()),
                ..Default::default()
            }),
            &dir,
        );
        merge_reply(&mut config, &AiReply::default(), &dir);

        assert_eq!(config.icp.role.as_deref(), Some("CTO"));
        assert_eq!(config.icp.industry.as_deref(), Some("Fintech"));
        assert_eq!(config.icp.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn goal_sets_required() {
        let mut config = CampaignConfig::default();
        let report = merge_reply(
            &mut config,
            &reply_with_icp(IcpUpdate {
                goal: Some("100 leads/month".into()),
                ..Default::default()
            }),
            &directory(),
        );
        assert_eq!(config.calculations.required, Some(10_000));
        assert_eq!(report.updated_sections, vec!["icp"]);
        assert!(report.narrative.is_none(), "no company yet");
    }

    #[test]
    fn company_backfills_placeholders() {
        let mut config = CampaignConfig::default();
        config.icp.industry = Some("SaaS".into());
        let reply = AiReply {
            ai_response: "ok".into(),
            company: Some(CompanyUpdate {
                url: Some("https://www.acme.com".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        merge_reply(&mut config, &reply, &directory());

        let value_prop = config.company.value_prop.unwrap();
        assert!(value_prop.starts_with("Acme helps SaaS teams"));
        assert!(config.company.pain_points.is_some());
    }

    #[test]
    fn data_source_synthesized_once() {
        let mut config = CampaignConfig::default();
        let dir = directory();
        let reply = AiReply {
            ai_response: "ok".into(),
            icp: Some(IcpUpdate {
                goal: Some("100 leads/month".into()),
                ..Default::default()
            }),
            company: Some(CompanyUpdate {
                url: Some("acme.com".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let first = merge_reply(&mut config, &reply, &dir);
        let narrative = first.narrative.expect("first qualifying reply synthesizes");
        assert!(narrative.contains("5000 contacts short"));
        assert_eq!(config.data_source.uploaded, Some(ASSUMED_CAPACITY));
        assert_eq!(config.calculations.uploaded, Some(ASSUMED_CAPACITY));
        assert_eq!(config.data_source.sample_records.len(), 3);
        let snapshot = config.data_source.clone();

        let second = merge_reply(&mut config, &reply, &dir);
        assert!(second.narrative.is_none());
        assert_eq!(config.data_source, snapshot);
    }

    #[test]
    fn surplus_narrative_for_small_goal() {
        let mut config = CampaignConfig::default();
        config.company.url = Some("acme.com".into());
        let report = merge_reply(
            &mut config,
            &reply_with_icp(IcpUpdate {
                goal: Some("20 demos".into()),
                ..Default::default()
            }),
            &directory(),
        );
        assert!(report.narrative.unwrap().contains("surplus of 3000"));
    }

    #[test]
    fn ai_data_source_fields_survive_synthesis() {
        let mut config = CampaignConfig::default();
        config.icp.goal = Some("10 leads".into());
        config.company.url = Some("acme.com".into());
        let reply = AiReply {
            ai_response: "ok".into(),
            data_source: Some(crate::campaign::reply::DataSourceUpdate {
                source_type: Some("CRM Export".into()),
                status: None,
            }),
            ..Default::default()
        };
        merge_reply(&mut config, &reply, &directory());
        assert_eq!(config.data_source.source_type.as_deref(), Some("CRM Export"));
        assert_eq!(config.data_source.status.as_deref(), Some("Uploaded"));
    }

    #[test]
    fn mailbox_selection_matches_domain() {
        let mut config = CampaignConfig::default();
        let reply = AiReply {
            ai_response: "ok".into(),
            mailbox_selection: Some(vec!["acme.com".into()]),
            ..Default::default()
        };
        let report = merge_reply(&mut config, &reply, &directory());
        let selected: Vec<&String> = config.mailbox.selected.iter().collect();
        assert_eq!(selected, vec!["a1", "a2"]);
        assert_eq!(report.newly_selected.len(), 2);

        // Repeating the selection still matches but adds nothing new.
        let report = merge_reply(&mut config, &reply, &directory());
        assert_eq!(report.matched.len(), 2);
        assert!(report.newly_selected.is_empty());
    }

    #[test]
    fn cadence_fill_if_absent() {
        let mut config = CampaignConfig::default();
        let first = AiReply {
            ai_response: "ok".into(),
            cadence: Some(CadenceUpdate {
                channels: Some("Email".into()),
                steps: Some("Day 1: Send email".into()),
            }),
            ..Default::default()
        };
        merge_reply(&mut config, &first, &directory());
        let second = AiReply {
            ai_response: "ok".into(),
            cadence: Some(CadenceUpdate {
                channels: None,
                steps: Some("Day 1: Call".into()),
            }),
            ..Default::default()
        };
        let report = merge_reply(&mut config, &second, &directory());
        assert_eq!(config.cadence.steps.as_deref(), Some("Day 1: Send email"));
        assert!(report.updated_sections.is_empty());
    }
}
