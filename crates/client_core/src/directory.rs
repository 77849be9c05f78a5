//! Channel and contact directories. The dispatcher only needs the
//! operations on the two traits; `ChannelList` and `ContactRoster` are the
//! in-memory mirrors used by the binary and by tests.

use std::collections::{BTreeMap, HashMap};

use shared::{
    domain::{ChannelId, UserId},
    protocol::{ChannelInfo, UserLog, UserLogAction, UserStatus},
};
use tracing::debug;

pub trait ChannelDirectory: Send {
    fn replace_all(&mut self, channels: Vec<ChannelInfo>);
    fn add(&mut self, channel: ChannelInfo);
    fn remove_by_id(&mut self, gid: ChannelId);
}

pub trait ContactDirectory: Send {
    fn apply_logs(&mut self, logs: &[UserLog]);
    fn replace_statuses(&mut self, statuses: Vec<UserStatus>);
    fn patch_status(&mut self, status: UserStatus);
}

#[derive(Debug, Default, Clone)]
pub struct ChannelList {
    channels: BTreeMap<ChannelId, ChannelInfo>,
}

impl ChannelList {
    pub fn get(&self, gid: ChannelId) -> Option<&ChannelInfo> {
        self.channels.get(&gid)
    }

    pub fn ids(&self) -> Vec<ChannelId> {
        self.channels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelDirectory for ChannelList {
    fn replace_all(&mut self, channels: Vec<ChannelInfo>) {
        self.channels = channels
            .into_iter()
            .map(|channel| (channel.gid, channel))
            .collect();
    }

    fn add(&mut self, channel: ChannelInfo) {
        self.channels.insert(channel.gid, channel);
    }

    fn remove_by_id(&mut self, gid: ChannelId) {
        if self.channels.remove(&gid).is_none() {
            debug!(gid = gid.0, "channels: remove for unknown channel");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub uid: UserId,
    pub name: String,
    pub email: Option<String>,
    pub gender: i32,
    pub language: Option<String>,
    pub is_admin: bool,
    pub avatar_updated_at: i64,
}

impl Contact {
    fn from_log(log: &UserLog) -> Self {
        let mut contact = Self {
            uid: log.uid,
            name: String::new(),
            email: None,
            gender: 0,
            language: None,
            is_admin: false,
            avatar_updated_at: 0,
        };
        contact.apply(log);
        contact
    }

    fn apply(&mut self, log: &UserLog) {
        if let Some(name) = &log.name {
            self.name = name.clone();
        }
        if let Some(email) = &log.email {
            self.email = Some(email.clone());
        }
        if let Some(gender) = log.gender {
            self.gender = gender;
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

#[derive(Debug, Default, Clone)]
pub struct ContactRoster {
    contacts: BTreeMap<UserId, Contact>,
    online: HashMap<UserId, bool>,
}

impl ContactRoster {
    pub fn get(&self, uid: UserId) -> Option<&Contact> {
        self.contacts.get(&uid)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn is_online(&self, uid: UserId) -> bool {
        self.online.get(&uid).copied().unwrap_or(false)
    }

    pub fn online_count(&self) -> usize {
        self.online.values().filter(|online| **online).count()
    }
}

impl ContactDirectory for ContactRoster {
    fn apply_logs(&mut self, logs: &[UserLog]) {
        for log in logs {
            match log.action {
                UserLogAction::Create => {
                    self.contacts.insert(log.uid, Contact::from_log(log));
                }
                UserLogAction::Update => match self.contacts.get_mut(&log.uid) {
                    Some(contact) => contact.apply(log),
                    None => {
                        self.contacts.insert(log.uid, Contact::from_log(log));
                    }
                },
                UserLogAction::Delete => {
                    self.contacts.remove(&log.uid);
                    self.online.remove(&log.uid);
                }
            }
        }
    }

    fn replace_statuses(&mut self, statuses: Vec<UserStatus>) {
        self.online = statuses
            .into_iter()
            .map(|status| (status.uid, status.online))
            .collect();
    }

    fn patch_status(&mut self, status: UserStatus) {
        self.online.insert(status.uid, status.online);
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
