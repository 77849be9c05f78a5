//! Routes decoded server events to the store they mutate.

use shared::{
    domain::Conversation,
    protocol::{ChatEnvelope, ChatTarget, KickReason, ServerEvent},
};
use tracing::{debug, info, warn};

use crate::{
    directory::{ChannelDirectory, ContactDirectory},
    message_store::{MergeOutcome, MessageFields},
    presenter::{LocalNotification, Presenter},
    state::ChatState,
};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied(&'static str),
    Ignored(&'static str),
    SessionEnded(KickReason),
    /// The payload could not be decoded; the event was skipped.
    Malformed,
}

impl<C, R, P> ChatState<C, R, P>
where
    C: ChannelDirectory,
    R: ContactDirectory,
    P: Presenter,
{
    /// Decodes one `data:` payload and dispatches it. A payload that does
    /// not decode fails only itself.
    pub fn dispatch_raw(&mut self, raw: &str) -> Dispatch {
        match serde_json::from_str::<ServerEvent>(raw) {
            Ok(event) => self.dispatch(event),
            Err(err) => {
                warn!(error = %err, payload = raw, "dispatch: skipping malformed event");
                Dispatch::Malformed
            }
        }
    }

    pub fn dispatch(&mut self, event: ServerEvent) -> Dispatch {
        let kind = event.kind();
        match event {
            ServerEvent::Heartbeat => {
                debug!("dispatch: heartbeat");
                Dispatch::Ignored(kind)
            }
            ServerEvent::UsersSnapshot { version } => {
                debug!(version, "dispatch: users snapshot");
                self.cursor.set_users_version(version);
                Dispatch::Applied(kind)
            }
            ServerEvent::UsersLog { logs } => {
                debug!(count = logs.len(), "dispatch: users change logs");
                let touches_self = logs.iter().any(|log| self.session.is_self(log.uid));
                if touches_self {
                    self.session.update_identity_by_logs(&logs);
                }
                self.contacts.apply_logs(&logs);
                Dispatch::Applied(kind)
            }
            ServerEvent::UsersState { users } => {
                self.contacts.replace_statuses(users);
                Dispatch::Applied(kind)
            }
            ServerEvent::UsersStateChanged(status) => {
                self.contacts.patch_status(status);
                Dispatch::Applied(kind)
            }
            ServerEvent::Kick { reason } => self.handle_kick(reason),
            ServerEvent::RelatedGroups { groups } => {
                debug!(count = groups.len(), "dispatch: related group list");
                self.channels.replace_all(groups);
                Dispatch::Applied(kind)
            }
            ServerEvent::JoinedGroup { group } => {
                debug!(gid = group.gid.0, "dispatch: joined group");
                self.channels.add(group);
                Dispatch::Applied(kind)
            }
            ServerEvent::KickFromGroup { gid } => {
                debug!(gid = gid.0, "dispatch: kicked from group");
                self.channels.remove_by_id(gid);
                Dispatch::Applied(kind)
            }
            ServerEvent::Chat(chat) => {
                self.route_chat(chat);
                Dispatch::Applied(kind)
            }
            ServerEvent::Unknown => {
                debug!("dispatch: ignoring unrecognized event kind");
                Dispatch::Ignored(kind)
            }
        }
    }

    fn handle_kick(&mut self, reason: KickReason) -> Dispatch {
        let notice = match reason {
            KickReason::LoginFromOtherDevice => "kicked from the other device",
            KickReason::DeleteUser => "sorry, your account has been deleted",
            KickReason::Other => {
                debug!("dispatch: kick with unrecognized reason ignored");
                return Dispatch::Ignored("kick");
            }
        };
        info!(?reason, "dispatch: session kicked");
        self.reset();
        self.presenter.navigate(LOGIN_PATH);
        self.presenter.notice(notice);
        Dispatch::SessionEnded(reason)
    }

    fn route_chat(&mut self, chat: ChatEnvelope) {
        let ChatEnvelope {
            created_at,
            mid,
            from_uid,
            detail,
        } = chat;
        let is_self = self.session.is_self(from_uid);
        let conversation = match detail.target {
            ChatTarget::Channel { gid } => Conversation::Channel(gid),
            // Bucket under whichever side is not us so both directions of a
            // 1:1 thread land together.
            ChatTarget::User { uid } if is_self => Conversation::Direct(uid),
            ChatTarget::User { .. } => Conversation::Direct(from_uid),
        };

        let fields = MessageFields {
            content: detail.content,
            content_type: detail.content_type,
            created_at,
            from_uid,
        };
        let body = (!is_self).then(|| fields.content.clone());
        let outcome = self.messages.merge(conversation, mid, fields, !is_self);
        debug!(
            mid = mid.0,
            from_uid = from_uid.0,
            ?conversation,
            ?outcome,
            "dispatch: chat message"
        );
        if outcome == MergeOutcome::Replaced {
            debug!(mid = mid.0, "dispatch: redelivered message differed; marked read");
        }

        if let Some(body) = body {
            self.presenter
                .show_notification(LocalNotification::new(body, conversation.path()));
        }

        // Resume point for the next open, self-authored messages included.
        self.cursor.set_after_mid(mid.0);
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
