use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLogAction {
    Create,
    Update,
    Delete,
}

/// One roster delta. Absent fields are left untouched when applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLog {
    #[serde(default)]
    pub log_id: i64,
    pub action: UserLogAction,
    pub uid: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub uid: UserId,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub gid: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub avatar_updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickReason {
    LoginFromOtherDevice,
    DeleteUser,
    #[default]
    #[serde(other)]
    Other,
}

/// Where a chat message was posted. A `gid` always wins over a `uid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatTarget {
    Channel { gid: ChannelId },
    User { uid: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDetail {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub target: ChatTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub created_at: i64,
    pub mid: MessageId,
    pub from_uid: UserId,
    pub detail: ChatDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Heartbeat,
    UsersSnapshot {
        version: i64,
    },
    UsersLog {
        logs: Vec<UserLog>,
    },
    UsersState {
        users: Vec<UserStatus>,
    },
    UsersStateChanged(UserStatus),
    Kick {
        #[serde(default)]
        reason: KickReason,
    },
    RelatedGroups {
        groups: Vec<ChannelInfo>,
    },
    JoinedGroup {
        group: ChannelInfo,
    },
    KickFromGroup {
        gid: ChannelId,
    },
    Chat(ChatEnvelope),
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Heartbeat => "heartbeat",
            ServerEvent::UsersSnapshot { .. } => "users_snapshot",
            ServerEvent::UsersLog { .. } => "users_log",
            ServerEvent::UsersState { .. } => "users_state",
            ServerEvent::UsersStateChanged(_) => "users_state_changed",
            ServerEvent::Kick { .. } => "kick",
            ServerEvent::RelatedGroups { .. } => "related_groups",
            ServerEvent::JoinedGroup { .. } => "joined_group",
            ServerEvent::KickFromGroup { .. } => "kick_from_group",
            ServerEvent::Chat(_) => "chat",
            ServerEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_channel_chat_envelope() {
        let raw = r#"{
            "type": "chat",
            "created_at": 1700000000000,
            "mid": 41,
            "from_uid": 2,
            "detail": {
                "content": "hi",
                "content_type": "text/plain",
                "expires_in": null,
                "type": "normal",
                "target": { "gid": 9 }
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(raw).expect("decode");
        let ServerEvent::Chat(chat) = event else {
            panic!("expected chat, got {event:?}");
        };
        assert_eq!(chat.mid, MessageId(41));
        assert_eq!(chat.detail.target, ChatTarget::Channel { gid: ChannelId(9) });
        assert_eq!(chat.detail.kind, "normal");
    }

    #[test]
    fn gid_wins_when_target_carries_both_ids() {
        let target: ChatTarget = serde_json::from_str(r#"{"gid": 3, "uid": 4}"#).expect("decode");
        assert_eq!(target, ChatTarget::Channel { gid: ChannelId(3) });
    }

    #[test]
    fn users_state_changed_is_flattened_into_envelope() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"users_state_changed","uid":5,"online":true}"#)
                .expect("decode");
        assert_eq!(
            event,
            ServerEvent::UsersStateChanged(UserStatus {
                uid: UserId(5),
                online: true
            })
        );
    }

    #[test]
    fn unrecognized_kinds_decode_to_unknown() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"pinned_message_updated","gid":1,"mid":2}"#)
                .expect("decode");
        assert_eq!(event, ServerEvent::Unknown);
    }

    #[test]
    fn heartbeat_ignores_extra_fields() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"heartbeat","time":1700000000}"#).expect("decode");
        assert_eq!(event.kind(), "heartbeat");
    }

    #[test]
    fn kick_reason_falls_back_to_other() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"kick","reason":"maintenance"}"#).expect("decode");
        assert_eq!(
            event,
            ServerEvent::Kick {
                reason: KickReason::Other
            }
        );
        let event: ServerEvent = serde_json::from_str(r#"{"type":"kick"}"#).expect("decode");
        assert_eq!(
            event,
            ServerEvent::Kick {
                reason: KickReason::Other
            }
        );
    }
}
