//! # Configuration
//!
//! Layered with figment, later layers win:
//!
//! 1. Compiled defaults ([`AssistantConfig::default`])
//! 2. `./assistant.toml`
//! 3. `ASSISTANT_*` environment variables, e.g. `ASSISTANT_FAQ_PAGE_URL`
//!    → `faq.page_url`, `ASSISTANT_SESSION_TIMEOUT_MINUTES` →
//!    `session.timeout_minutes`
//!
//! ```toml
//! handoff_url = "/contact/"
//!
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [faq]
//! page_url = "https://shop.example/faqs/"
//! match_threshold = 0.6
//!
//! [leads]
//! notification_emails = ["support@shop.example"]
//! smtp_host = "smtp.example.com"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Sections that environment variables are split into.
const SECTIONS: &[&str] = &["server", "session", "faq", "leads", "storage"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub faq: FaqConfig,
    pub leads: LeadsConfig,
    pub storage: StorageConfig,
    /// Where the widget sends visitors who need a human.
    pub handoff_url: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            faq: FaqConfig::default(),
            leads: LeadsConfig::default(),
            storage: StorageConfig::default(),
            handoff_url: "/contact/".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes after which a session's memory is reset.
    pub timeout_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_minutes: 30 }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.timeout_minutes))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqConfig {
    /// FAQ page to scrape; dynamic FAQs are off when unset.
    pub page_url: Option<String>,
    pub match_threshold: f64,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for FaqConfig {
    fn default() -> Self {
        Self {
            page_url: None,
            match_threshold: crate::faq::DEFAULT_THRESHOLD,
            cache_ttl_secs: 3600,
            fetch_timeout_secs: 8,
        }
    }
}

impl FaqConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadsConfig {
    /// Source tag stored on every lead; also scopes duplicate detection.
    pub source: String,
    pub notification_emails: Vec<String>,
    pub from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            source: "chat-widget".to_string(),
            notification_emails: Vec::new(),
            from_email: "assistant@localhost".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot of sessions, messages and leads.
    pub data_path: PathBuf,
    /// JSON export of products and orders.
    pub catalog_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/assistant.json"),
            catalog_path: PathBuf::from("data/catalog.json"),
        }
    }
}

/// Loads defaults, `./assistant.toml`, then `ASSISTANT_*` variables.
pub fn load_config() -> Result<AssistantConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AssistantConfig::default()))
        .merge(Toml::file("assistant.toml"))
        .merge(env_provider())
        .extract()
        .map(AssistantConfig::normalized)
}

/// Loads defaults overlaid with a TOML string. No environment lookup.
pub fn load_config_from_str(toml: &str) -> Result<AssistantConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AssistantConfig::default()))
        .merge(Toml::string(toml))
        .extract()
        .map(AssistantConfig::normalized)
}

impl AssistantConfig {
    fn normalized(mut self) -> Self {
        self.faq.match_threshold = self.faq.match_threshold.clamp(0.0, 1.0);
        if self.faq.page_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            self.faq.page_url = None;
        }
        self
    }
}

/// `ASSISTANT_LEADS_SMTP_HOST` → `leads.smtp_host`. Only the first underscore
/// after a known section name becomes a dot.
fn env_provider() -> Env {
    Env::prefixed("ASSISTANT_").map(|key| {
        let key = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key.strip_prefix(*section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        key.to_string().into()
    })
}
