use serde::{Deserialize, Serialize};

/// Resumption markers handed to the next stream open. Both fields are
/// replaced unconditionally; no ordering is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorTracker {
    users_version: i64,
    after_mid: i64,
}

impl CursorTracker {
    pub fn new(users_version: i64, after_mid: i64) -> Self {
        Self {
            users_version,
            after_mid,
        }
    }

    pub fn users_version(&self) -> i64 {
        self.users_version
    }

    pub fn after_mid(&self) -> i64 {
        self.after_mid
    }

    pub fn set_users_version(&mut self, version: i64) {
        self.users_version = version;
    }

    pub fn set_after_mid(&mut self, mid: i64) {
        self.after_mid = mid;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
