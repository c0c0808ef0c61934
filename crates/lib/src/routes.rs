//! Path and hash-route helpers for the host's client-side routing.
//!
//! The host encodes the channel in the pathname (`/channels/<digits>`) and
//! the open conversation in the hash
//! (`#/channels/<channelId>/user_chats/<chatId>`).

/// Extract the channel id from a navigation path or request URL: the segment
/// following `channels` when it is all digits.
pub fn channel_id_from_path(path: &str) -> Option<String> {
    let mut segments = path.split(['/', '?', '#']);
    while let Some(segment) = segments.next() {
        if segment == "channels" {
            if let Some(next) = segments.next() {
                if !next.is_empty() && next.bytes().all(|b| b.is_ascii_digit()) {
                    return Some(next.to_string());
                }
            }
        }
    }
    None
}

/// Hash route the host uses to open a conversation.
pub fn chat_route(channel_id: &str, chat_id: &str) -> String {
    format!("#/channels/{}/user_chats/{}", channel_id, chat_id)
}

/// The conversation id a hash route points at, if any.
pub fn active_chat_from_route(route: &str) -> Option<String> {
    let mut segments = route.split(['/', '?']);
    while let Some(segment) = segments.next() {
        if segment == "user_chats" {
            return segments.next().filter(|s| !s.is_empty()).map(String::from);
        }
    }
    None
}
