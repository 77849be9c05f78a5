use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ChannelId);
id_newtype!(MessageId);

/// A conversation is either a channel or a one-to-one thread with a peer.
/// The two id spaces overlap numerically and are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Conversation {
    Channel(ChannelId),
    Direct(UserId),
}

impl Conversation {
    /// Deep-link path used by notifications.
    pub fn path(&self) -> String {
        match self {
            Conversation::Channel(gid) => format!("/chat/channel/{gid}"),
            Conversation::Direct(uid) => format!("/chat/dm/{uid}"),
        }
    }
}
