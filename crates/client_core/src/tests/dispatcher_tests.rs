use super::*;
use crate::{
    directory::{ChannelList, ContactRoster},
    session::{CurrentUser, SessionStore},
};
use shared::domain::{ChannelId, MessageId, UserId};

const ME: i64 = 1;

#[derive(Debug, Default)]
struct RecordingPresenter {
    notifications: Vec<LocalNotification>,
    navigations: Vec<String>,
    notices: Vec<String>,
}

impl Presenter for RecordingPresenter {
    fn show_notification(&mut self, notification: LocalNotification) {
        self.notifications.push(notification);
    }

    fn navigate(&mut self, path: &str) {
        self.navigations.push(path.to_string());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

type TestState = ChatState<ChannelList, ContactRoster, RecordingPresenter>;

fn signed_in() -> TestState {
    ChatState::with_parts(
        SessionStore::new("tok", "ref", CurrentUser::new(UserId(ME), "me")),
        ChannelList::default(),
        ContactRoster::default(),
        RecordingPresenter::default(),
    )
}

fn chat(mid: i64, from_uid: i64, target: &str, content: &str) -> String {
    format!(
        r#"{{"type":"chat","created_at":1700000000,"mid":{mid},"from_uid":{from_uid},
            "detail":{{"content":"{content}","content_type":"text/plain","type":"normal",
            "target":{target}}}}}"#
    )
}

#[test]
fn channel_message_from_peer_is_unread_and_notifies() {
    let mut state = signed_in();

    let outcome = state.dispatch_raw(&chat(100, 2, r#"{"gid":10}"#, "hi"));

    assert_eq!(outcome, Dispatch::Applied("chat"));
    let conversation = Conversation::Channel(ChannelId(10));
    let record = state.messages.get(conversation, MessageId(100)).expect("record");
    assert!(record.unread);
    assert_eq!(state.cursor.after_mid(), 100);
    assert_eq!(
        state.presenter.notifications,
        vec![LocalNotification::new("hi", "/chat/channel/10")]
    );
}

#[test]
fn own_channel_message_is_read_and_silent() {
    let mut state = signed_in();

    state.dispatch_raw(&chat(101, ME, r#"{"gid":10}"#, "mine"));

    let record = state
        .messages
        .get(Conversation::Channel(ChannelId(10)), MessageId(101))
        .expect("record");
    assert!(!record.unread);
    assert!(state.presenter.notifications.is_empty());
    assert_eq!(state.cursor.after_mid(), 101);
}

#[test]
fn both_directions_of_a_dm_share_one_bucket() {
    let mut state = signed_in();

    state.dispatch_raw(&chat(200, 2, &format!(r#"{{"uid":{ME}}}"#), "ping"));
    state.dispatch_raw(&chat(201, ME, r#"{"uid":2}"#, "pong"));

    let bucket = state.messages.direct().bucket(UserId(2)).expect("bucket");
    assert_eq!(bucket.len(), 2);
    assert!(bucket[&MessageId(200)].unread);
    assert!(!bucket[&MessageId(201)].unread);
    assert!(state.messages.direct().bucket(UserId(ME)).is_none());
    assert_eq!(
        state.presenter.notifications,
        vec![LocalNotification::new("ping", "/chat/dm/2")]
    );
}

#[test]
fn target_with_gid_and_uid_is_a_channel_message() {
    let mut state = signed_in();

    state.dispatch_raw(&chat(300, 2, r#"{"gid":4,"uid":9}"#, "x"));

    assert!(state
        .messages
        .get(Conversation::Channel(ChannelId(4)), MessageId(300))
        .is_some());
    assert!(state.messages.direct().is_empty());
}

#[test]
fn redelivered_edit_is_marked_read() {
    let mut state = signed_in();
    state.dispatch_raw(&chat(100, 2, r#"{"gid":10}"#, "hi"));
    state.dispatch_raw(&chat(100, 2, r#"{"gid":10}"#, "hi"));
    assert_eq!(state.messages.unread_count(Conversation::Channel(ChannelId(10))), 1);

    state.dispatch_raw(&chat(100, 2, r#"{"gid":10}"#, "hi!"));

    let record = state
        .messages
        .get(Conversation::Channel(ChannelId(10)), MessageId(100))
        .expect("record");
    assert_eq!(record.fields.content, "hi!");
    assert!(!record.unread);
}

#[test]
fn after_mid_is_replaced_not_maxed() {
    let mut state = signed_in();
    state.dispatch_raw(&chat(200, 2, r#"{"gid":1}"#, "late"));
    state.dispatch_raw(&chat(77, 2, r#"{"gid":1}"#, "early"));

    assert_eq!(state.cursor.after_mid(), 77);
}

#[test]
fn users_snapshot_sets_users_version() {
    let mut state = signed_in();
    assert_eq!(
        state.dispatch_raw(r#"{"type":"users_snapshot","version":42}"#),
        Dispatch::Applied("users_snapshot")
    );
    assert_eq!(state.cursor.users_version(), 42);
}

#[test]
fn users_log_updates_self_then_contacts() {
    let mut state = signed_in();

    state.dispatch_raw(
        r#"{"type":"users_log","logs":[
            {"action":"update","uid":1,"name":"new me"},
            {"action":"create","uid":3,"name":"carol"}
        ]}"#,
    );

    assert_eq!(state.session.user().map(|u| u.name.as_str()), Some("new me"));
    assert_eq!(state.contacts.get(UserId(3)).map(|c| c.name.as_str()), Some("carol"));
    assert_eq!(state.contacts.len(), 2);
}

#[test]
fn presence_events_reach_the_roster() {
    let mut state = signed_in();
    state.dispatch_raw(
        r#"{"type":"users_state","users":[{"uid":2,"online":true},{"uid":3,"online":true}]}"#,
    );
    state.dispatch_raw(r#"{"type":"users_state_changed","uid":3,"online":false}"#);

    assert!(state.contacts.is_online(UserId(2)));
    assert!(!state.contacts.is_online(UserId(3)));
}

#[test]
fn group_events_reach_the_channel_list() {
    let mut state = signed_in();
    state.dispatch_raw(
        r#"{"type":"related_groups","groups":[{"gid":1,"name":"a"},{"gid":2,"name":"b"}]}"#,
    );
    state.dispatch_raw(r#"{"type":"joined_group","group":{"gid":3,"name":"c"}}"#);
    state.dispatch_raw(r#"{"type":"kick_from_group","gid":1}"#);

    assert_eq!(state.channels.ids(), vec![ChannelId(2), ChannelId(3)]);
}

#[test]
fn kick_for_account_deletion_ends_the_session() {
    let mut state = signed_in();
    state.dispatch_raw(&chat(100, 2, r#"{"gid":10}"#, "hi"));

    let outcome = state.dispatch_raw(r#"{"type":"kick","reason":"delete_user"}"#);

    assert_eq!(outcome, Dispatch::SessionEnded(KickReason::DeleteUser));
    assert!(state.session.token().is_none());
    assert!(state.stream_params().is_none());
    assert!(state.messages.channels().is_empty());
    assert_eq!(state.cursor.after_mid(), 0);
    assert_eq!(state.presenter.navigations, vec![LOGIN_PATH.to_string()]);
    assert_eq!(
        state.presenter.notices,
        vec!["sorry, your account has been deleted".to_string()]
    );
}

#[test]
fn kick_from_other_device_uses_its_own_notice() {
    let mut state = signed_in();
    state.dispatch_raw(r#"{"type":"kick","reason":"login_from_other_device"}"#);
    assert_eq!(state.presenter.notices, vec!["kicked from the other device".to_string()]);
}

#[test]
fn kick_with_unknown_reason_is_ignored() {
    let mut state = signed_in();
    assert_eq!(
        state.dispatch_raw(r#"{"type":"kick","reason":"maintenance"}"#),
        Dispatch::Ignored("kick")
    );
    assert_eq!(state.session.token(), Some("tok"));
    assert!(state.presenter.navigations.is_empty());
}

#[test]
fn unknown_and_malformed_events_change_nothing() {
    let mut state = signed_in();

    assert_eq!(
        state.dispatch_raw(r#"{"type":"pinned_message_updated","gid":1}"#),
        Dispatch::Ignored("unknown")
    );
    assert_eq!(state.dispatch_raw("{not json"), Dispatch::Malformed);
    assert_eq!(state.dispatch_raw(r#"{"type":"chat","mid":"x"}"#), Dispatch::Malformed);
    assert_eq!(
        state.dispatch_raw(r#"{"type":"heartbeat","time":1}"#),
        Dispatch::Ignored("heartbeat")
    );

    assert!(state.messages.channels().is_empty());
    assert_eq!(state.cursor, crate::cursor::CursorTracker::default());
}

#[test]
fn users_log_deleting_self_drops_the_identity() {
    let mut state = signed_in();

    state.dispatch_raw(r#"{"type":"users_log","logs":[{"action":"delete","uid":1}]}"#);

    assert!(state.session.user().is_none());
    assert!(!state.session.is_self(UserId(ME)));
    assert_eq!(state.session.token(), Some("tok"));
    assert!(state.contacts.get(UserId(ME)).is_none());
}
