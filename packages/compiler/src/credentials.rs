// ABOUTME: Connection catalog and keyword-based credential detection
// ABOUTME: Maps platform keywords in custom code step descriptions to Workspace credential fields

use foundry_core::{Connection, Field, FieldType};
use lazy_static::lazy_static;
use regex::Regex;

/// One external service the compiler knows how to detect
pub struct ConnectionRule {
    pub provider: &'static str,
    pub title: &'static str,
    pub field_name: &'static str,
    pub scopes: &'static [&'static str],
    patterns: Vec<Regex>,
}

impl ConnectionRule {
    fn new(
        provider: &'static str,
        title: &'static str,
        field_name: &'static str,
        scopes: &'static [&'static str],
        patterns: &[&str],
    ) -> Self {
        Self {
            provider,
            title,
            field_name,
            scopes,
            patterns: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    pub fn connection(&self) -> Connection {
        Connection {
            provider: self.provider.to_string(),
            title: self.title.to_string(),
            scopes: self.scopes.iter().map(|s| s.to_string()).collect(),
            field_name: self.field_name.to_string(),
        }
    }

    /// Oauth field carried by the Workspace model
    pub fn credential_field(&self) -> Field {
        Field::new(self.field_name, self.title, FieldType::Oauth)
            .with_description(format!("{} account used by this agent", self.title))
    }
}

lazy_static! {
    pub static ref CONNECTION_CATALOG: Vec<ConnectionRule> = vec![
        ConnectionRule::new(
            "x",
            "X (Twitter)",
            "xAuth",
            &["tweet.read", "tweet.write", "users.read", "offline.access"],
            // Bare "X" only after a platform preposition or before a platform noun
            &[
                r"\b(?:to|on|via|onto|in|from)\s+X\b",
                r"\bX\s+(?:posts?|accounts?|threads?|API|timeline|followers)\b",
                r"(?i)\b(twitter|tweets?|tweeting|x\.com)\b",
            ],
        ),
        ConnectionRule::new(
            "linkedin",
            "LinkedIn",
            "linkedinAuth",
            &["openid", "profile", "w_member_social"],
            &[r"(?i)\blinked\s?in\b"],
        ),
        ConnectionRule::new(
            "slack",
            "Slack",
            "slackAuth",
            &["chat:write", "channels:read"],
            &[r"(?i)\bslack\b"],
        ),
        ConnectionRule::new(
            "discord",
            "Discord",
            "discordAuth",
            &["identify", "webhook.incoming"],
            &[r"(?i)\bdiscord\b"],
        ),
        ConnectionRule::new(
            "gmail",
            "Gmail",
            "gmailAuth",
            &["https://www.googleapis.com/auth/gmail.send"],
            &[r"(?i)\b(gmail|google\s+mail)\b"],
        ),
    ];
}

/// Catalog rules whose keywords appear in `text`, in catalog order
pub fn detect_connections(text: &str) -> Vec<&'static ConnectionRule> {
    CONNECTION_CATALOG.iter().filter(|rule| rule.matches(text)).collect()
}

pub fn rule_for(provider: &str) -> Option<&'static ConnectionRule> {
    let provider = provider.trim();
    CONNECTION_CATALOG
        .iter()
        .find(|rule| rule.provider.eq_ignore_ascii_case(provider))
}

/// Rule owning a Workspace credential field name
pub fn rule_for_field(field_name: &str) -> Option<&'static ConnectionRule> {
    CONNECTION_CATALOG.iter().find(|rule| rule.field_name == field_name)
}

pub fn is_permitted(provider: &str, permitted: &[String]) -> bool {
    permitted.iter().any(|p| p.trim().eq_ignore_ascii_case(provider))
}
