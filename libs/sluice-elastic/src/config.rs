use std::fmt;
use std::time::Duration;

use serde::Deserialize;

// ═══════════════════════════════════════════════════════════════
//  Elastic Config
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, Deserialize)]
pub struct ElasticConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Per-request timeout, seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Appended to a field name in exact-match clauses (`Location.keyword`).
    /// Empty to match on the field itself.
    #[serde(default = "default_keyword_suffix")]
    pub keyword_suffix: String,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: default_password(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
            keyword_suffix: default_keyword_suffix(),
        }
    }
}

impl ElasticConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ElasticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("keyword_suffix", &self.keyword_suffix)
            .finish()
    }
}

fn default_url() -> String {
    "http://localhost:9200".into()
}
fn default_username() -> String {
    "elastic".into()
}
fn default_password() -> String {
    "changeme".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_keyword_suffix() -> String {
    ".keyword".into()
}
