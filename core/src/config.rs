use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::directory::{EndpointDirectory, EndpointInfo};
use crate::messaging::{EndpointId, DEFAULT_MAILBOX_CAPACITY};
use crate::review::ContentDescriptor;
use crate::{Result, TribunalError};

/// Static deployment of one review panel: who produces, who reviews, where
/// each endpoint lives, and how long a cycle may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TribunalConfig {
    pub producer: EndpointId,
    pub cycle_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub mailbox_capacity: usize,
    pub reviewers: Vec<EndpointId>,
    pub bindings: Vec<EndpointInfo>,
    pub content: Vec<ContentDescriptor>,
}

impl Default for TribunalConfig {
    fn default() -> Self {
        let reviewers = ["feedback", "summary", "moderation"];
        let mut bindings = vec![EndpointInfo::new("producer", "local://producer", "producer")];
        bindings.extend(
            reviewers
                .iter()
                .map(|r| EndpointInfo::new(*r, format!("local://{}", r), *r)),
        );

        Self {
            producer: EndpointId::from("producer"),
            cycle_timeout_ms: 5_000,
            poll_interval_ms: 250,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            reviewers: reviewers.iter().map(|r| EndpointId::from(*r)).collect(),
            bindings,
            content: vec![
                ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens")
                    .with_title("Summer dance challenge")
                    .with_tags(["dance", "challenge"]),
            ],
        }
    }
}

impl TribunalConfig {
    /// Load configuration from a TOML file (path via TRIBUNAL_CONFIG or ./tribunal.toml),
    /// then apply environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TRIBUNAL_CONFIG").unwrap_or_else(|_| "tribunal.toml".into());
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "No TOML config found; using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(
            target: "config",
            path = %path.display(),
            reviewers = config.reviewers.len(),
            "Loaded review panel config"
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// TRIBUNAL_CYCLE_TIMEOUT_MS and TRIBUNAL_POLL_INTERVAL_MS take precedence
    /// over the file. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_u64("TRIBUNAL_CYCLE_TIMEOUT_MS") {
            self.cycle_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("TRIBUNAL_POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycle_timeout_ms == 0 {
            return Err(TribunalError::ConfigError(
                "cycle_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TribunalError::ConfigError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(TribunalError::ConfigError(
                "mailbox_capacity must be greater than 0".into(),
            ));
        }

        let mut names = HashSet::new();
        for binding in &self.bindings {
            if !names.insert(&binding.name) {
                return Err(TribunalError::ConfigError(format!(
                    "duplicate binding for endpoint {}",
                    binding.name
                )));
            }
        }
        if !names.contains(&self.producer) {
            return Err(TribunalError::ConfigError(format!(
                "producer {} has no binding",
                self.producer
            )));
        }
        if let Some(missing) = self.reviewers.iter().find(|r| !names.contains(r)) {
            return Err(TribunalError::ConfigError(format!(
                "reviewer {} has no binding",
                missing
            )));
        }
        Ok(())
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn directory(&self) -> EndpointDirectory {
        EndpointDirectory::from_bindings(self.bindings.iter().cloned())
    }

    /// Role of the bound endpoint, if any.
    pub fn role_of(&self, endpoint: &EndpointId) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| &b.name == endpoint)
            .map(|b| b.role.as_str())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}
