//! Wire payload and entity types for the desk bookmark API.
//!
//! The backend answers the bookmark listing endpoint with one object carrying
//! several parallel arrays (`userChats`, `bookmarks`, optionally `messages`,
//! `users`, `managers`). Deserialization is deliberately lenient: unknown
//! fields are ignored and every array is optional, so partial payloads from
//! unrelated endpoints can still be offered to the merge engine.

use serde::Deserialize;

/// Conversation record as sent by the backend. Timestamps are epoch millis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChat {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub front_updated_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl UserChat {
    /// Last relevant activity: `frontUpdatedAt` falling back to `updatedAt`.
    /// Missing both sorts last (0).
    pub fn last_activity(&self) -> i64 {
        self.front_updated_at.or(self.updated_at).unwrap_or(0)
    }

    pub fn chat_state(&self) -> ChatState {
        ChatState::parse(self.state.as_deref())
    }
}

/// Conversation lifecycle state, parsed leniently from the wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Opened,
    Closed,
    Snoozed,
    Other(String),
}

impl ChatState {
    pub fn parse(tag: Option<&str>) -> Self {
        match tag {
            Some("opened") => ChatState::Opened,
            Some("closed") => ChatState::Closed,
            Some("snoozed") => ChatState::Snoozed,
            Some(other) => ChatState::Other(other.to_string()),
            None => ChatState::Other(String::new()),
        }
    }
}

/// Message record; only the newest per conversation is retained by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub chat_id: String,
    #[serde(default)]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub person_type: Option<String>,
}

impl Message {
    pub fn author_kind(&self) -> PersonType {
        PersonType::parse(self.person_type.as_deref())
    }
}

/// Author kind of a message. The wire tag has at least user/manager/bot;
/// anything unrecognized lands in `Other` so no category is lost upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonType {
    User,
    Manager,
    Bot,
    Other,
}

impl PersonType {
    pub fn parse(tag: Option<&str>) -> Self {
        match tag {
            Some("user") => PersonType::User,
            Some("manager") => PersonType::Manager,
            Some("bot") => PersonType::Bot,
            _ => PersonType::Other,
        }
    }

    /// True for the customer side of the conversation.
    pub fn is_customer(self) -> bool {
        matches!(self, PersonType::User)
    }
}

/// Customer or manager record (the two people maps share one shape).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Pinned-set membership entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub chat_id: String,
}

/// One bookmark-endpoint (or look-alike) response body.
///
/// `None` vs empty array matters: a present-but-empty `bookmarks` clears the
/// pinned set, an absent one marks the payload as partial.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    #[serde(default)]
    pub user_chats: Option<Vec<UserChat>>,
    #[serde(default)]
    pub bookmarks: Option<Vec<Bookmark>>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub users: Option<Vec<Person>>,
    #[serde(default)]
    pub managers: Option<Vec<Person>>,
}

impl BookmarkPayload {
    /// A full pinned-subset payload carries both the membership list and the
    /// conversation list; only these may replace membership.
    pub fn is_full(&self) -> bool {
        self.user_chats.is_some() && self.bookmarks.is_some()
    }

    /// True when at least one known array is present.
    pub fn is_usable(&self) -> bool {
        self.user_chats.is_some()
            || self.bookmarks.is_some()
            || self.messages.is_some()
            || self.users.is_some()
            || self.managers.is_some()
    }
}

/// How a payload was obtained, which decides the merge rules applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Positively identified as a bookmark-endpoint response (captured or
    /// polled): trusted with membership.
    Confirmed,
    /// Unrelated traffic that happened to parse into the payload shape:
    /// entity refresh only.
    Opportunistic,
}

/// Parse a response body into a payload, or `None` when the JSON fails to
/// parse or carries none of the expected arrays. Never an error: malformed
/// bodies are a no-op for the pipeline.
pub fn parse_payload(body: &str) -> Option<BookmarkPayload> {
    let payload: BookmarkPayload = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("payload did not parse, ignoring: {}", e);
            return None;
        }
    };
    if payload.is_usable() {
        Some(payload)
    } else {
        None
    }
}
