//! CLI — stdin/stdout REPL over one campaign session, for local testing.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::campaign::{CampaignService, InputOrigin, SessionSnapshot, TurnRole};
use crate::sequence::SequenceEditor;

const HELP: &str = "\
Commands:
  /status          show campaign sections and launch status
  /accounts        list sender accounts
  /toggle <id>     toggle a sender account
  /sequence        show the cadence as ordered steps
  /launch          launch the campaign
  /quit            exit
Anything else is sent to the campaign builder.";

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    Status,
    Accounts,
    Toggle(String),
    Sequence,
    Launch,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        Some(match head {
            "/quit" | "/exit" => Self::Quit,
            "/status" => Self::Status,
            "/accounts" => Self::Accounts,
            "/toggle" if !rest.is_empty() => Self::Toggle(rest.to_string()),
            "/sequence" => Self::Sequence,
            "/launch" => Self::Launch,
            "/help" | "/toggle" => Self::Help,
            _ => Self::Message(line.to_string()),
        })
    }
}

fn print_new_turns(snapshot: &SessionSnapshot, seen: &mut usize) {
    for turn in snapshot.turns.iter().skip(*seen) {
        if turn.role == TurnRole::Ai {
            println!("\n{}\n", turn.text);
        }
    }
    *seen = snapshot.turns.len();
    if !snapshot.quick_actions.is_empty() {
        eprintln!("   Suggestions: {}", snapshot.quick_actions.join(" | "));
    }
}

fn print_status(snapshot: &SessionSnapshot) {
    let config = &snapshot.config;
    let show = |label: &str, visible: bool, value: String| {
        if visible {
            eprintln!("   {label}: {value}");
        }
    };
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    eprintln!("   Status: {}", snapshot.status);
    show(
        "ICP",
        snapshot.visibility.icp,
        format!(
            "{} / {} / {} / goal {}",
            opt(&config.icp.role),
            opt(&config.icp.industry),
            opt(&config.icp.location),
            opt(&config.icp.goal)
        ),
    );
    show("Company", snapshot.visibility.company, opt(&config.company.url));
    show(
        "Data source",
        snapshot.visibility.data_source,
        format!(
            "{} ({} contacts, {} required)",
            opt(&config.data_source.source_type),
            config.data_source.uploaded.unwrap_or(0),
            config.calculations.required.map_or("-".to_string(), |r| r.to_string())
        ),
    );
    show("Cadence", snapshot.visibility.cadence, opt(&config.cadence.steps));
    show(
        "Mailboxes",
        snapshot.visibility.mailbox,
        config.mailbox.selected.iter().cloned().collect::<Vec<_>>().join(", "),
    );
}

/// Run the REPL until EOF or `/quit`.
pub async fn run(service: Arc<CampaignService>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = 0usize;

    eprintln!("{HELP}\n");
    eprint!("> ");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        let Some(command) = Command::parse(&line) else {
            eprint!("> ");
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Help => eprintln!("{HELP}"),
            Command::Status => print_status(&service.snapshot().await),
            Command::Accounts => {
                let snapshot = service.snapshot().await;
                for account in service.directory().await.accounts() {
                    let mark = if snapshot.config.mailbox.selected.contains(&account.id) { "x" } else { " " };
                    eprintln!("   [{mark}] {} {} ({})", account.id, account.email, account.provider);
                }
            }
            Command::Toggle(id) => match service.toggle_mailbox(&id).await {
                Ok(snapshot) => eprintln!("   Selected: {}", snapshot.config.mailbox.selected.len()),
                Err(e) => eprintln!("   {e}"),
            },
            Command::Sequence => {
                let editor = SequenceEditor::new(service.cadence_graph().await);
                let steps = editor.linear_steps();
                if steps.is_empty() {
                    eprintln!("   No cadence yet.");
                }
                for step in steps {
                    eprintln!(
                        "   {}. {} after {} day(s): {}",
                        step.step_order, step.step_type, step.wait_days, step.content
                    );
                }
            }
            Command::Launch => match service.launch().await {
                Ok(snapshot) => eprintln!("   Status: {}", snapshot.status),
                Err(e) => eprintln!("   {e}"),
            },
            Command::Message(text) => {
                eprintln!("⏳ Thinking...");
                match service.submit(&text, InputOrigin::Typed).await {
                    Ok(snapshot) => print_new_turns(&snapshot, &mut seen),
                    Err(e) => eprintln!("   {e}"),
                }
            }
        }
        eprint!("> ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("  "), None);
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("/toggle acc-2"), Some(Command::Toggle("acc-2".into())));
        assert_eq!(Command::parse("/toggle"), Some(Command::Help));
        assert_eq!(Command::parse("/launch"), Some(Command::Launch));
        assert_eq!(
            Command::parse(" Target CTOs in fintech "),
            Some(Command::Message("Target CTOs in fintech".into()))
        );
    }
}
