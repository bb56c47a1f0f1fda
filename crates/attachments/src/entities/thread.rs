use serde::{Deserialize, Serialize};

/// A private conversation between a fixed set of participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread ID
    pub id: i64,
    /// Participants, in membership order
    pub recipients: Vec<Recipient>,
    /// Messages, oldest first. Only populated when requested via [`ThreadLoad`].
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Membership record tying a user to a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub thread_id: i64,
    pub user_id: i64,
}

/// A single message inside a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Owning thread; never changes after creation
    pub thread_id: i64,
    pub sender_id: i64,
    pub subject: String,
    pub message: String,
    pub date_sent: String,
}

/// Controls how much of a thread a store loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadLoad {
    /// Also load the thread's messages alongside its recipients
    pub include_messages: bool,
}

impl ThreadLoad {
    /// Recipients only. Enough for participant checks.
    pub fn recipients_only() -> Self {
        Self {
            include_messages: false,
        }
    }

    /// Recipients and messages
    pub fn full() -> Self {
        Self {
            include_messages: true,
        }
    }
}

impl Thread {
    /// Create a thread with the given participants and no messages
    pub fn new(id: i64, participant_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            id,
            recipients: participant_ids
                .into_iter()
                .map(|user_id| Recipient {
                    thread_id: id,
                    user_id,
                })
                .collect(),
            messages: Vec::new(),
        }
    }

    /// Check whether `user_id` is one of the thread's participants
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.recipients
            .iter()
            .any(|recipient| recipient.user_id == user_id)
    }

    /// Participant user IDs in membership order
    pub fn participant_ids(&self) -> Vec<i64> {
        self.recipients.iter().map(|r| r.user_id).collect()
    }
}
