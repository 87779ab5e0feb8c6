//! Sender-account directory and mailbox matching.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A mailbox the campaign can send from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderAccount {
    pub id: String,
    pub email: String,
    pub provider: String,
}

impl SenderAccount {
    pub fn new(id: impl Into<String>, email: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            provider: provider.into(),
        }
    }

    /// Lowercased domain part of the address.
    pub fn domain(&self) -> String {
        self.email
            .rsplit_once('@')
            .map(|(_, d)| d.to_lowercase())
            .unwrap_or_default()
    }
}

/// Read-only list of sender accounts available to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderDirectory {
    accounts: Vec<SenderAccount>,
}

impl SenderDirectory {
    pub fn new(accounts: Vec<SenderAccount>) -> Self {
        Self { accounts }
    }

    /// Built-in directory used when none is configured.
    pub fn demo() -> Self {
        Self::new(vec![
            SenderAccount::new("acc-1", "alex@outreachlabs.io", "google"),
            SenderAccount::new("acc-2", "sam@outreachlabs.io", "google"),
            SenderAccount::new("acc-3", "team@getoutreach.co", "microsoft"),
            SenderAccount::new("acc-4", "hello@getoutreach.co", "microsoft"),
        ])
    }

    /// Parse a comma-separated `email[:provider]` list.
    ///
    /// Ids are assigned in order as `acc-1`, `acc-2`, ...
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let mut accounts = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (email, provider) = match entry.split_once(':') {
                Some((email, provider)) => (email.trim(), provider.trim()),
                None => (entry, "smtp"),
            };
            if !email.contains('@') {
                return Err(ConfigError::InvalidValue {
                    key: "CAMPAIGN_SENDER_ACCOUNTS".to_string(),
                    message: format!("'{}' is not an email address", email),
                });
            }
            accounts.push(SenderAccount::new(
                format!("acc-{}", accounts.len() + 1),
                email,
                provider,
            ));
        }
        Ok(Self::new(accounts))
    }

    /// Load a JSON array of accounts from disk.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let accounts: Vec<SenderAccount> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(accounts))
    }

    pub fn accounts(&self) -> &[SenderAccount] {
        &self.accounts
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SenderAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Accounts grouped by domain, domains sorted.
    pub fn by_domain(&self) -> BTreeMap<String, Vec<&SenderAccount>> {
        let mut groups: BTreeMap<String, Vec<&SenderAccount>> = BTreeMap::new();
        for account in &self.accounts {
            groups.entry(account.domain()).or_default().push(account);
        }
        groups
    }

    /// Resolve free-form selection phrases to account ids.
    ///
    /// A phrase selects an account when one of its tokens equals the full
    /// address, the domain, or the domain's leading label (three characters
    /// or more, so "acme" in "select all acme emails" selects `*@acme.com`).
    /// Partial substrings never match.
    pub fn match_selection(&self, phrases: &[String]) -> BTreeSet<String> {
        let mut selected = BTreeSet::new();
        for phrase in phrases {
            let tokens = selection_tokens(phrase);
            if tokens.is_empty() {
                continue;
            }
            for account in &self.accounts {
                let email = account.email.to_lowercase();
                let domain = account.domain();
                let label = domain.split('.').next().unwrap_or_default();
                let hit = tokens.iter().any(|t| {
                    *t == email || *t == domain || (t.len() >= 3 && t.as_str() == label)
                });
                if hit {
                    selected.insert(account.id.clone());
                }
            }
        }
        selected
    }
}

fn selection_tokens(phrase: &str) -> Vec<String> {
    phrase
        .to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '_' | '-' | '+')))
        .map(|t| t.trim_start_matches('@').trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
