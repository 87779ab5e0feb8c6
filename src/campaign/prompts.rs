//! System instruction for the campaign builder conversation.

use serde::{Deserialize, Serialize};

use super::accounts::SenderDirectory;
use super::model::CampaignConfig;

/// How the user's utterance reached us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrigin {
    #[default]
    Typed,
    Voice,
}

const WORKFLOW_POLICY: &str = "\
You are the campaign builder for an outbound sales platform. You help the user \
configure one outreach campaign through a short conversation.

Work through these steps in order, one question at a time:
1. Ideal customer profile: target role, industry, location, and a numeric goal \
(e.g. \"100 leads/month\").
2. Company: the user's website URL, value proposition, and the pain points they solve.
3. Data source: acknowledge the attached contact list; do not invent contact counts.
4. Cadence: channels and a day-by-day plan written as \"Day N: <action>\" clauses \
separated by commas (e.g. \"Day 1: Send personalized email, Day 3: Follow-up call\").
5. Mailboxes: which sender accounts to use. Put the chosen addresses or domains in \
mailbox_selection.
6. Launch: set launch_ready to true only after the user confirms the mailboxes.

Rules:
- Keep ai_response to 1-3 sentences.
- Only fill fields the user actually stated or clearly implied. Omit the rest; \
never send placeholders such as \"unknown\".
- When the user is ambiguous, ask a short clarifying question instead of guessing.
- When the user says \"all\" accounts for a domain, list that domain once in \
mailbox_selection.
- Always return exactly 3 suggested_actions: short replies the user is likely to send next.
- Respond with a single JSON object matching the schema. No markdown.";

const VOICE_CORRECTION_POLICY: &str = "\
VOICE INPUT: The latest message was transcribed from speech and may contain \
recognition errors. Before using it:
- Fix common homophones in a sales context (\"lead\" not \"led\", \"cadence\" not \
\"cadets\", \"CRM\" not \"sea are em\", \"SaaS\" not \"sass\").
- Normalize industry names to their usual form (\"fin tech\" -> \"Fintech\", \
\"health care\" -> \"Healthcare\", \"e commerce\" -> \"E-commerce\").
- Rebuild spoken email addresses and domains (\"sales at acme dot com\" -> \
\"sales@acme.com\").
- If a correction is uncertain, confirm it with the user in ai_response.";

/// List the available sender accounts, clustered by domain.
pub fn sender_accounts_block(directory: &SenderDirectory) -> String {
    if directory.is_empty() {
        return "AVAILABLE SENDER ACCOUNTS: none connected. Tell the user to connect a \
                mailbox before launching."
            .to_string();
    }

    let mut block = String::from("AVAILABLE SENDER ACCOUNTS (grouped by domain):");
    for (domain, accounts) in directory.by_domain() {
        let emails: Vec<&str> = accounts.iter().map(|a| a.email.as_str()).collect();
        block.push_str(&format!(
            "\n- {} ({} account{}): {}",
            domain,
            accounts.len(),
            if accounts.len() == 1 { "" } else { "s" },
            emails.join(", ")
        ));
    }
    block
}

/// Summarize what is already known so the model does not ask again.
fn progress_block(config: &CampaignConfig) -> String {
    let mut known = Vec::new();
    let mut push = |label: &str, value: &Option<String>| {
        if let Some(v) = value {
            known.push(format!("- {label}: {v}"));
        }
    };
    push("ICP role", &config.icp.role);
    push("ICP industry", &config.icp.industry);
    push("ICP location", &config.icp.location);
    push("ICP goal", &config.icp.goal);
    push("Company URL", &config.company.url);
    push("Cadence channels", &config.cadence.channels);
    push("Cadence steps", &config.cadence.steps);

    if !config.mailbox.selected.is_empty() {
        let ids: Vec<&str> = config.mailbox.selected.iter().map(String::as_str).collect();
        known.push(format!("- Selected mailboxes: {}", ids.join(", ")));
    }
    known.push(format!("- Launch status: {}", config.launch.status));

    format!("What you've learned so far:\n{}", known.join("\n"))
}

/// Build the full system instruction for one builder turn.
pub fn system_instruction(
    directory: &SenderDirectory,
    config: &CampaignConfig,
    origin: InputOrigin,
) -> String {
    let mut parts = vec![
        WORKFLOW_POLICY.to_string(),
        sender_accounts_block(directory),
        progress_block(config),
    ];
    if origin == InputOrigin::Voice {
        parts.push(VOICE_CORRECTION_POLICY.to_string());
    }
    parts.join("\n\n")
}
