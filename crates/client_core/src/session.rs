use serde::{Deserialize, Serialize};
use shared::{
    domain::UserId,
    protocol::{UserLog, UserLogAction},
};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub avatar_updated_at: i64,
}

impl CurrentUser {
    pub fn new(uid: UserId, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            email: None,
            language: None,
            is_admin: false,
            avatar_updated_at: 0,
        }
    }

    fn apply_log(&mut self, log: &UserLog) {
        if let Some(name) = &log.name {
            self.name = name.clone();
        }
        if let Some(email) = &log.email {
            self.email = Some(email.clone());
        }
        if let Some(language) = &log.language {
            self.language = Some(language.clone());
        }
        if let Some(is_admin) = log.is_admin {
            self.is_admin = is_admin;
        }
        if let Some(avatar_updated_at) = log.avatar_updated_at {
            self.avatar_updated_at = avatar_updated_at;
        }
    }
}

/// Credentials returned by a successful renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Auth credentials and the identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStore {
    token: Option<String>,
    refresh_token: Option<String>,
    user: Option<CurrentUser>,
}

impl SessionStore {
    pub fn new(
        token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: CurrentUser,
    ) -> Self {
        Self {
            token: Some(token.into()),
            refresh_token: Some(refresh_token.into()),
            user: Some(user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    pub fn current_uid(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.uid)
    }

    pub fn is_self(&self, uid: UserId) -> bool {
        self.current_uid() == Some(uid)
    }

    pub fn update_token(&mut self, tokens: TokenPair) {
        debug!("session: token updated");
        self.token = Some(tokens.token);
        self.refresh_token = Some(tokens.refresh_token);
    }

    pub fn set_user(&mut self, user: CurrentUser) {
        self.user = Some(user);
    }

    /// Applies the entries of `logs` that describe the signed-in user.
    /// A `delete` entry for the current user drops the identity.
    pub fn update_identity_by_logs(&mut self, logs: &[UserLog]) {
        for log in logs {
            let Some(user) = self.user.as_mut() else {
                return;
            };
            if user.uid != log.uid {
                continue;
            }
            match log.action {
                UserLogAction::Create | UserLogAction::Update => user.apply_log(log),
                UserLogAction::Delete => {
                    info!(uid = log.uid.0, "session: current user deleted by roster log");
                    self.user = None;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
