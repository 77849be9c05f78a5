use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::{
    error::ClientError,
    stream::{ResumePolicy, StreamSettings},
};

pub const DEFAULT_SETTINGS_FILE: &str = "mirror.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub uid: Option<i64>,
    pub retry_delay: Duration,
    pub resume_policy: ResumePolicy,
    pub state_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000/api".into(),
            token: None,
            refresh_token: None,
            uid: None,
            retry_delay: Duration::from_secs(3),
            resume_policy: ResumePolicy::Immediate,
            state_file: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    token: Option<String>,
    refresh_token: Option<String>,
    uid: Option<i64>,
    retry_delay_ms: Option<u64>,
    resume_policy: Option<ResumePolicy>,
    state_file: Option<PathBuf>,
}

/// Defaults, then `path` if it exists, then the process environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

impl Settings {
    fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if file.token.is_some() {
            self.token = file.token;
        }
        if file.refresh_token.is_some() {
            self.refresh_token = file.refresh_token;
        }
        if file.uid.is_some() {
            self.uid = file.uid;
        }
        if let Some(ms) = file.retry_delay_ms {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(policy) = file.resume_policy {
            self.resume_policy = policy;
        }
        if file.state_file.is_some() {
            self.state_file = file.state_file;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("MIRROR_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("MIRROR_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = lookup("MIRROR_REFRESH_TOKEN") {
            self.refresh_token = Some(v);
        }
        if let Some(v) = lookup("MIRROR_UID") {
            if let Ok(parsed) = v.parse::<i64>() {
                self.uid = Some(parsed);
            }
        }
        if let Some(v) = lookup("MIRROR_RETRY_DELAY_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.retry_delay = Duration::from_millis(parsed);
            }
        }
        if let Some(v) = lookup("MIRROR_RESUME_POLICY") {
            match v.trim() {
                "immediate" => self.resume_policy = ResumePolicy::Immediate,
                "on_credential_change" => self.resume_policy = ResumePolicy::OnCredentialChange,
                _ => {}
            }
        }
        if let Some(v) = lookup("MIRROR_STATE_FILE") {
            self.state_file = Some(PathBuf::from(v));
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            retry_delay: self.retry_delay,
            resume_policy: self.resume_policy,
        }
    }
}

/// Accepts `http(s)://host[:port][/prefix]` and strips trailing slashes so
/// endpoint paths can be appended.
pub fn normalize_server_url(raw: &str) -> Result<String, ClientError> {
    let raw = raw.trim();
    let parsed = Url::parse(raw)
        .map_err(|err| ClientError::Config(format!("invalid server url '{raw}': {err}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::Config(format!(
                "server url must use http or https, got '{other}'"
            )))
        }
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
