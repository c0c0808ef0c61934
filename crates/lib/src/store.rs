//! Normalized in-memory entity store.
//!
//! Owned by the pipeline's single consumer task and passed by reference to
//! the merge engine (writes) and projection/renderer (reads), so no locking
//! is involved. Entries are never deleted, only superseded; a conversation
//! that drops out of the pinned set simply stops being projected.

use crate::model::{Message, Person, UserChat};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EntityStore {
    chats: HashMap<String, UserChat>,
    excerpts: HashMap<String, Message>,
    customers: HashMap<String, Person>,
    managers: HashMap<String, Person>,
    /// Pinned membership in backend order; wholesale-replaced, never merged.
    bookmarks: Vec<String>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full replace of the conversation record. Returns true when any field
    /// actually changed value.
    pub fn upsert_chat(&mut self, chat: UserChat) -> bool {
        match self.chats.get(&chat.id) {
            Some(existing) if *existing == chat => false,
            _ => {
                self.chats.insert(chat.id.clone(), chat);
                true
            }
        }
    }

    pub fn chat(&self, id: &str) -> Option<&UserChat> {
        self.chats.get(id)
    }

    /// Keep-if-newer: only a strictly newer excerpt replaces the stored one;
    /// ties keep the existing excerpt. Returns true when the excerpt was
    /// stored.
    pub fn upsert_excerpt(&mut self, message: Message) -> bool {
        let incoming_at = message.created_at.unwrap_or(0);
        match self.excerpts.get(&message.chat_id) {
            Some(existing) if existing.created_at.unwrap_or(0) >= incoming_at => false,
            _ => {
                self.excerpts.insert(message.chat_id.clone(), message);
                true
            }
        }
    }

    pub fn excerpt(&self, chat_id: &str) -> Option<&Message> {
        self.excerpts.get(chat_id)
    }

    /// Last-write-wins overwrite of a customer record.
    pub fn upsert_customer(&mut self, person: Person) -> bool {
        upsert_person(&mut self.customers, person)
    }

    pub fn customer(&self, id: &str) -> Option<&Person> {
        self.customers.get(id)
    }

    /// Last-write-wins overwrite of a manager record.
    pub fn upsert_manager(&mut self, person: Person) -> bool {
        upsert_person(&mut self.managers, person)
    }

    pub fn manager(&self, id: &str) -> Option<&Person> {
        self.managers.get(id)
    }

    /// Replace the pinned membership atomically, keeping payload order.
    /// Returns true when the membership (or its order) changed.
    pub fn set_bookmarks(&mut self, ids: Vec<String>) -> bool {
        if self.bookmarks == ids {
            return false;
        }
        self.bookmarks = ids;
        true
    }

    pub fn bookmarks(&self) -> &[String] {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, chat_id: &str) -> bool {
        self.bookmarks.iter().any(|id| id == chat_id)
    }
}

fn upsert_person(map: &mut HashMap<String, Person>, person: Person) -> bool {
    match map.get(&person.id) {
        Some(existing) if *existing == person => false,
        _ => {
            map.insert(person.id.clone(), person);
            true
        }
    }
}
