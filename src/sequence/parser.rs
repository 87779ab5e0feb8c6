//! Cadence text parser — turns "Day N: action" clauses into a linear chain
//! of step nodes.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{OUT_HANDLE, START_ID, SequenceGraph, StepEdge, StepKind, WaitDays};

/// Marker used while the cadence has not been decided yet.
pub const PENDING: &str = "pending";

/// Stored details are cut to this many characters.
pub const DETAILS_LIMIT: usize = 50;

static DAY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bday\s*(\d+)\s*:\s*([^,;]*)").expect("static regex"));

static BRANCH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(if|else)\b").expect("static regex"));

const EMAIL_KEYWORDS: [&str; 3] = ["email", "emails", "mail"];
const CALL_KEYWORDS: [&str; 6] = ["call", "calls", "phone", "dial", "voicemail", "ring"];
const LINKEDIN_KEYWORDS: [&str; 4] = ["linkedin", "inmail", "connect", "connection"];

/// Classify a clause by keyword, checking email, then call, then LinkedIn.
pub fn classify(description: &str) -> StepKind {
    let lower = description.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

    if has(&EMAIL_KEYWORDS) {
        StepKind::Email
    } else if has(&CALL_KEYWORDS) {
        StepKind::Call
    } else if has(&LINKEDIN_KEYWORDS) {
        StepKind::Linkedin
    } else {
        StepKind::Email
    }
}

/// Cut `text` to [`DETAILS_LIMIT`] characters, adding an ellipsis when cut.
pub fn truncate_details(text: &str) -> String {
    if text.chars().count() <= DETAILS_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(DETAILS_LIMIT).collect();
    format!("{head}...")
}

/// Parse a cadence description into an un-laid-out graph.
///
/// Parsing stops at the first clause containing "if" or "else"; steps built
/// before it are kept.
pub fn parse_cadence(text: &str) -> SequenceGraph {
    let mut graph = SequenceGraph::new();
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case(PENDING) {
        return graph;
    }

    let mut previous_id = START_ID.to_string();
    let mut previous_day: Option<u32> = None;

    for caps in DAY_CLAUSE.captures_iter(text) {
        let Ok(day) = caps[1].parse::<u32>() else {
            continue;
        };
        let description = caps[2].trim();
        if BRANCH_KEYWORD.is_match(description) {
            tracing::debug!(day, "Branching clause ends linear cadence");
            break;
        }
        if description.is_empty() {
            continue;
        }

        let wait = match previous_day {
            None if day == 1 => WaitDays::Immediate,
            None => WaitDays::Days(day),
            Some(prev) => WaitDays::Days(day.saturating_sub(prev)),
        };
        let id = graph.push_step(classify(description), truncate_details(description), wait);
        graph.edges.push(StepEdge::new(&previous_id, OUT_HANDLE, &id));

        previous_id = id;
        previous_day = Some(day);
    }

    graph
}
