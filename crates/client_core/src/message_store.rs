//! Per-conversation message mirror with redelivery-safe merging.
//!
//! The stream is at-least-once, so the same `mid` can arrive any number of
//! times. Merging is idempotent for identical payloads. A payload that
//! differs from the stored one (an edit, or a replay carrying new fields)
//! replaces the record and is always treated as seen: `unread` is forced to
//! `false` whatever the caller asked for. That last rule is deliberate and
//! kept as-is even though it means an edited message from someone else never
//! shows up as unread again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::domain::{ChannelId, Conversation, MessageId, UserId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFields {
    pub content: String,
    pub content_type: String,
    pub created_at: i64,
    pub from_uid: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(flatten)]
    pub fields: MessageFields,
    pub unread: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First message of a conversation that had no bucket yet.
    Created,
    Inserted,
    /// Redelivery with different fields; stored record overwritten and read.
    Replaced,
    /// Redelivery with identical fields; nothing touched.
    Unchanged,
}

pub type Bucket = BTreeMap<MessageId, MessageRecord>;

/// One id space of conversations (channels or direct peers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace<K: Ord> {
    conversations: BTreeMap<K, Bucket>,
}

impl<K: Ord> Default for Namespace<K> {
    fn default() -> Self {
        Self {
            conversations: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> Namespace<K> {
    pub fn merge(
        &mut self,
        conversation: K,
        mid: MessageId,
        incoming: MessageFields,
        unread: bool,
    ) -> MergeOutcome {
        let Some(bucket) = self.conversations.get_mut(&conversation) else {
            let mut bucket = Bucket::new();
            bucket.insert(
                mid,
                MessageRecord {
                    fields: incoming,
                    unread,
                },
            );
            self.conversations.insert(conversation, bucket);
            return MergeOutcome::Created;
        };

        match bucket.get_mut(&mid) {
            None => {
                bucket.insert(
                    mid,
                    MessageRecord {
                        fields: incoming,
                        unread,
                    },
                );
                MergeOutcome::Inserted
            }
            Some(stored) if stored.fields == incoming => MergeOutcome::Unchanged,
            Some(stored) => {
                stored.fields = incoming;
                stored.unread = false;
                MergeOutcome::Replaced
            }
        }
    }

    /// Returns `false` when the record does not exist.
    pub fn mark_read(&mut self, conversation: K, mid: MessageId) -> bool {
        match self
            .conversations
            .get_mut(&conversation)
            .and_then(|bucket| bucket.get_mut(&mid))
        {
            Some(record) => {
                record.unread = false;
                true
            }
            None => {
                debug!(mid = mid.0, "messages: mark_read for unknown message");
                false
            }
        }
    }

    /// Returns how many records flipped from unread to read.
    pub fn mark_all_read(&mut self, conversation: K) -> usize {
        let Some(bucket) = self.conversations.get_mut(&conversation) else {
            return 0;
        };
        let mut flipped = 0;
        for record in bucket.values_mut() {
            if record.unread {
                record.unread = false;
                flipped += 1;
            }
        }
        flipped
    }

    pub fn bucket(&self, conversation: K) -> Option<&Bucket> {
        self.conversations.get(&conversation)
    }

    pub fn get(&self, conversation: K, mid: MessageId) -> Option<&MessageRecord> {
        self.bucket(conversation).and_then(|bucket| bucket.get(&mid))
    }

    pub fn unread_count(&self, conversation: K) -> usize {
        self.bucket(conversation)
            .map(|bucket| bucket.values().filter(|record| record.unread).count())
            .unwrap_or(0)
    }

    pub fn buckets(&self) -> &BTreeMap<K, Bucket> {
        &self.conversations
    }

    pub fn conversations(&self) -> impl Iterator<Item = K> + '_ {
        self.conversations.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    /// Replaces the whole namespace, e.g. from a persisted snapshot.
    pub fn restore(&mut self, conversations: BTreeMap<K, Bucket>) {
        self.conversations = conversations;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    channels: Namespace<ChannelId>,
    direct: Namespace<UserId>,
}

impl MessageStore {
    pub fn channels(&self) -> &Namespace<ChannelId> {
        &self.channels
    }

    pub fn direct(&self) -> &Namespace<UserId> {
        &self.direct
    }

    pub fn merge(
        &mut self,
        conversation: Conversation,
        mid: MessageId,
        incoming: MessageFields,
        unread: bool,
    ) -> MergeOutcome {
        match conversation {
            Conversation::Channel(gid) => self.channels.merge(gid, mid, incoming, unread),
            Conversation::Direct(uid) => self.direct.merge(uid, mid, incoming, unread),
        }
    }

    pub fn get(&self, conversation: Conversation, mid: MessageId) -> Option<&MessageRecord> {
        match conversation {
            Conversation::Channel(gid) => self.channels.get(gid, mid),
            Conversation::Direct(uid) => self.direct.get(uid, mid),
        }
    }

    pub fn mark_read(&mut self, conversation: Conversation, mid: MessageId) -> bool {
        match conversation {
            Conversation::Channel(gid) => self.channels.mark_read(gid, mid),
            Conversation::Direct(uid) => self.direct.mark_read(uid, mid),
        }
    }

    pub fn mark_all_read(&mut self, conversation: Conversation) -> usize {
        match conversation {
            Conversation::Channel(gid) => self.channels.mark_all_read(gid),
            Conversation::Direct(uid) => self.direct.mark_all_read(uid),
        }
    }

    pub fn unread_count(&self, conversation: Conversation) -> usize {
        match conversation {
            Conversation::Channel(gid) => self.channels.unread_count(gid),
            Conversation::Direct(uid) => self.direct.unread_count(uid),
        }
    }

    pub fn restore(
        &mut self,
        channels: BTreeMap<ChannelId, Bucket>,
        direct: BTreeMap<UserId, Bucket>,
    ) {
        self.channels.restore(channels);
        self.direct.restore(direct);
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.direct.clear();
    }
}

#[cfg(test)]
#[path = "tests/message_store_tests.rs"]
mod tests;
