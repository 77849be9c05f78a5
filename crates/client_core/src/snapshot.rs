use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::{ChannelId, UserId};

use crate::{
    cursor::CursorTracker,
    directory::{ChannelDirectory, ContactDirectory},
    message_store::Bucket,
    presenter::Presenter,
    session::SessionStore,
    state::ChatState,
};

/// Persisted form of the mirror, written on exit and restored on start so
/// the next stream open resumes from the saved cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub session: SessionStore,
    pub cursor: CursorTracker,
    #[serde(default)]
    pub channel_messages: BTreeMap<ChannelId, Bucket>,
    #[serde(default)]
    pub direct_messages: BTreeMap<UserId, Bucket>,
}

impl ChatSnapshot {
    pub fn capture<C, R, P>(state: &ChatState<C, R, P>) -> Self
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        Self {
            session: state.session.clone(),
            cursor: state.cursor,
            channel_messages: state.messages.channels().buckets().clone(),
            direct_messages: state.messages.direct().buckets().clone(),
        }
    }

    pub fn apply_to<C, R, P>(self, state: &mut ChatState<C, R, P>)
    where
        C: ChannelDirectory,
        R: ContactDirectory,
        P: Presenter,
    {
        state.session = self.session;
        state.cursor = self.cursor;
        state
            .messages
            .restore(self.channel_messages, self.direct_messages);
    }

    /// Returns `Ok(None)` when no snapshot has been written yet.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read snapshot '{}'", path.display()))
            }
        };
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse snapshot '{}'", path.display()))?;
        Ok(Some(snapshot))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create snapshot directory '{}'", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(self).context("failed to encode snapshot")?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("failed to write snapshot '{}'", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to move snapshot into '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/snapshot_tests.rs"]
mod tests;
