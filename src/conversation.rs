use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Name given to a conversation before its first message
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Number of words of the first message used as the conversation name
pub const AUTO_NAME_WORDS: usize = 5;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "Bot",
        }
    }
}

/// A single exchanged message. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

/// A named, ordered list of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHAT_NAME.to_string(),
            messages: Vec::new(),
        }
    }
}

/// Every saved conversation, keyed by id. This is the unit of persistence.
///
/// Serializes as a plain JSON object `{ "<id>": { "name": .., "messages": [..] } }`.
/// Iteration follows id order, which is creation order for ids produced by
/// [`new_conversation_id`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationSet {
    chats: BTreeMap<String, Conversation>,
}

impl ConversationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.chats.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.chats.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chats.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, conversation: Conversation) {
        self.chats.insert(id.into(), conversation);
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        self.chats.remove(id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Conversation)> {
        self.chats.iter().map(|(id, chat)| (id.as_str(), chat))
    }

    /// Id at a sidebar position
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.chats.keys().nth(index).map(String::as_str)
    }

    /// Sidebar position of an id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.chats.keys().position(|key| key == id)
    }
}

/// Last timestamp handed out by [`new_conversation_id`]
static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generate a fresh conversation id.
///
/// The timestamp part is strictly increasing within the process, so ids sort
/// in creation order; the random suffix separates ids from other processes.
pub fn new_conversation_id() -> String {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_ID_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(now);
    let millis = now.max(previous + 1);

    let suffix = Uuid::new_v4().simple().to_string();
    format!("chat_{}_{}", millis, &suffix[..8])
}

/// Conversation name derived from its first message
pub fn auto_name(text: &str) -> String {
    text.split_whitespace()
        .take(AUTO_NAME_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
