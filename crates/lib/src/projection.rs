//! Sorted, filtered view of the pinned conversations.

use crate::model::UserChat;
use crate::store::EntityStore;

/// Pinned conversations with a resolved record, newest activity first.
/// Pure function of store state; a pinned id without a conversation record
/// is silently skipped until some payload supplies it. The stable sort keeps
/// membership order for equal timestamps, so repeated calls agree.
pub fn project(store: &EntityStore) -> Vec<UserChat> {
    let mut chats: Vec<UserChat> = store
        .bookmarks()
        .iter()
        .filter_map(|id| store.chat(id).cloned())
        .collect();
    chats.sort_by_key(|chat| std::cmp::Reverse(chat.last_activity()));
    chats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use crate::model::{Bookmark, BookmarkPayload, PayloadSource, UserChat};

    fn chat(id: &str, at: Option<i64>) -> UserChat {
        UserChat {
            id: id.into(),
            name: None,
            state: Some("opened".into()),
            front_updated_at: at,
            updated_at: None,
            assignee_id: None,
            user_id: None,
        }
    }

    fn store_with(chats: Vec<UserChat>, members: &[&str]) -> EntityStore {
        let mut store = EntityStore::new();
        let payload = BookmarkPayload {
            user_chats: Some(chats),
            bookmarks: Some(
                members
                    .iter()
                    .map(|id| Bookmark {
                        chat_id: (*id).into(),
                    })
                    .collect(),
            ),
            ..Default::default()
        };
        merge(&mut store, &payload, PayloadSource::Confirmed);
        store
    }

    #[test]
    fn orders_descending_by_last_activity() {
        let store = store_with(
            vec![chat("a", Some(100)), chat("b", Some(300)), chat("c", Some(200))],
            &["a", "b", "c"],
        );
        let projected = project(&store);
        let ids: Vec<&str> = projected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn missing_timestamp_sorts_last() {
        let store = store_with(vec![chat("a", None), chat("b", Some(1))], &["a", "b"]);
        let projected = project(&store);
        let ids: Vec<&str> = projected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn ties_keep_membership_order_across_repeated_calls() {
        let store = store_with(
            vec![chat("x", Some(100)), chat("y", Some(100)), chat("z", Some(100))],
            &["y", "z", "x"],
        );
        let first: Vec<String> = project(&store).into_iter().map(|c| c.id).collect();
        let second: Vec<String> = project(&store).into_iter().map(|c| c.id).collect();
        assert_eq!(first, ["y", "z", "x"]);
        assert_eq!(first, second);
    }

    #[test]
    fn unresolved_members_are_filtered_not_errors() {
        let store = store_with(vec![chat("a", Some(200)), chat("b", Some(100))], &["a", "b", "c"]);
        let projected = project(&store);
        let ids: Vec<&str> = projected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
