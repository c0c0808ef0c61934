//! Merge engine: applies captured or polled payloads to the entity store.
//!
//! Merges run strictly in response-arrival order on the pipeline task; the
//! keep-if-newer and last-write-wins rules in the store make that reordering
//! safe. The returned flag gates re-rendering.

use crate::model::{BookmarkPayload, PayloadSource};
use crate::store::EntityStore;

/// Apply a payload to the store. Returns true iff anything observable changed
/// (membership delta, conversation field delta, a strictly newer excerpt, or
/// a people-record delta).
///
/// A confirmed payload that is not actually full (missing one of the two
/// required lists) is demoted to the opportunistic rules rather than trusted
/// with membership.
pub fn merge(store: &mut EntityStore, payload: &BookmarkPayload, source: PayloadSource) -> bool {
    match source {
        PayloadSource::Confirmed if payload.is_full() => merge_full(store, payload),
        _ => merge_secondary(store, payload),
    }
}

/// Full pinned-subset payload: membership is replaced wholesale and every
/// entity present is upserted.
fn merge_full(store: &mut EntityStore, payload: &BookmarkPayload) -> bool {
    let mut changed = false;

    let members: Vec<String> = payload
        .bookmarks
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|b| b.chat_id.clone())
        .collect();
    changed |= store.set_bookmarks(members);

    for chat in payload.user_chats.as_deref().unwrap_or_default() {
        changed |= store.upsert_chat(chat.clone());
    }
    for message in payload.messages.as_deref().unwrap_or_default() {
        changed |= store.upsert_excerpt(message.clone());
    }
    for user in payload.users.as_deref().unwrap_or_default() {
        changed |= store.upsert_customer(user.clone());
    }
    for manager in payload.managers.as_deref().unwrap_or_default() {
        changed |= store.upsert_manager(manager.clone());
    }
    changed
}

/// Opportunistic payload: same per-entity rules, restricted to conversations
/// already pinned; membership is never altered.
fn merge_secondary(store: &mut EntityStore, payload: &BookmarkPayload) -> bool {
    let mut changed = false;

    for chat in payload.user_chats.as_deref().unwrap_or_default() {
        if store.is_bookmarked(&chat.id) {
            changed |= store.upsert_chat(chat.clone());
        }
    }
    for message in payload.messages.as_deref().unwrap_or_default() {
        if store.is_bookmarked(&message.chat_id) {
            changed |= store.upsert_excerpt(message.clone());
        }
    }
    for user in payload.users.as_deref().unwrap_or_default() {
        if person_referenced(store, &user.id) {
            changed |= store.upsert_customer(user.clone());
        }
    }
    for manager in payload.managers.as_deref().unwrap_or_default() {
        if person_referenced(store, &manager.id) {
            changed |= store.upsert_manager(manager.clone());
        }
    }
    changed
}

/// A person record from secondary traffic is only taken when some pinned
/// conversation references it (as customer or assignee).
fn person_referenced(store: &EntityStore, person_id: &str) -> bool {
    store.bookmarks().iter().any(|chat_id| {
        store.chat(chat_id).is_some_and(|chat| {
            chat.user_id.as_deref() == Some(person_id)
                || chat.assignee_id.as_deref() == Some(person_id)
        })
    })
}
