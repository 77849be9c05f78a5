use super::*;

fn channel(gid: i64, name: &str) -> ChannelInfo {
    ChannelInfo {
        gid: ChannelId(gid),
        owner: None,
        name: name.into(),
        description: None,
        members: Vec::new(),
        is_public: true,
        avatar_updated_at: 0,
    }
}

fn log(action: UserLogAction, uid: i64, name: Option<&str>) -> UserLog {
    UserLog {
        log_id: 0,
        action,
        uid: UserId(uid),
        name: name.map(str::to_string),
        email: None,
        gender: None,
        language: None,
        is_admin: None,
        avatar_updated_at: None,
    }
}

#[test]
fn replace_all_drops_channels_missing_from_the_new_list() {
    let mut list = ChannelList::default();
    list.add(channel(1, "general"));
    list.add(channel(2, "random"));

    list.replace_all(vec![channel(2, "random"), channel(3, "ops")]);

    assert_eq!(list.ids(), vec![ChannelId(2), ChannelId(3)]);
}

#[test]
fn add_overwrites_and_remove_is_quiet_for_unknown_ids() {
    let mut list = ChannelList::default();
    list.add(channel(1, "general"));
    list.add(channel(1, "renamed"));
    list.remove_by_id(ChannelId(99));

    assert_eq!(list.len(), 1);
    assert_eq!(list.get(ChannelId(1)).map(|c| c.name.as_str()), Some("renamed"));

    list.remove_by_id(ChannelId(1));
    assert!(list.is_empty());
}

#[test]
fn roster_logs_create_update_and_delete_in_order() {
    let mut roster = ContactRoster::default();
    roster.apply_logs(&[
        log(UserLogAction::Create, 5, Some("eve")),
        log(UserLogAction::Update, 5, Some("eve2")),
        log(UserLogAction::Update, 6, Some("frank")),
        log(UserLogAction::Create, 7, Some("gina")),
        log(UserLogAction::Delete, 7, None),
    ]);

    assert_eq!(roster.len(), 2);
    assert_eq!(roster.get(UserId(5)).map(|c| c.name.as_str()), Some("eve2"));
    assert_eq!(roster.get(UserId(6)).map(|c| c.name.as_str()), Some("frank"));
    assert!(roster.get(UserId(7)).is_none());
}

#[test]
fn statuses_replace_then_patch() {
    let mut roster = ContactRoster::default();
    roster.replace_statuses(vec![
        UserStatus { uid: UserId(1), online: true },
        UserStatus { uid: UserId(2), online: true },
    ]);
    roster.replace_statuses(vec![UserStatus { uid: UserId(2), online: true }]);
    roster.patch_status(UserStatus { uid: UserId(3), online: true });
    roster.patch_status(UserStatus { uid: UserId(2), online: false });

    assert!(!roster.is_online(UserId(1)));
    assert!(!roster.is_online(UserId(2)));
    assert!(roster.is_online(UserId(3)));
    assert_eq!(roster.online_count(), 1);
}
