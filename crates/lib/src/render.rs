//! Row view-models and the renderer that projects them into a mount point.

use crate::locator::MountPoint;
use crate::model::UserChat;
use crate::store::EntityStore;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

/// One visual row of the replacement list.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub chat_id: String,
    pub name: String,
    pub tone: IndicatorTone,
    pub assignee: Option<String>,
    pub age_label: String,
    pub excerpt: String,
}

/// Status-indicator tone: emphasized when the customer spoke last, muted for
/// agent/bot replies (and for conversations without an excerpt yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorTone {
    Customer,
    Agent,
}

/// Materializes projections into a mount point. Rows are fully replaced each
/// pass; the active highlight travels separately so selection changes never
/// force a re-render.
pub struct Renderer {
    mount: Arc<dyn MountPoint>,
    excerpt_max_chars: usize,
}

impl Renderer {
    pub fn new(mount: Arc<dyn MountPoint>, excerpt_max_chars: usize) -> Self {
        Self {
            mount,
            excerpt_max_chars,
        }
    }

    /// Replace all rows with the projected conversations, in order. The host
    /// may have repainted its own rows since the last pass, so native content
    /// is suppressed again first.
    pub fn render(
        &self,
        store: &EntityStore,
        chats: &[UserChat],
        active: Option<&str>,
        now_ms: i64,
    ) {
        self.mount.suppress_native();
        let rows: Vec<RowView> = chats
            .iter()
            .map(|chat| self.row(store, chat, now_ms))
            .collect();
        log::debug!("rendering {} rows", rows.len());
        self.mount.set_rows(&rows);
        self.mount.set_active(active);
    }

    /// Move the highlight only.
    pub fn set_active(&self, chat_id: Option<&str>) {
        self.mount.set_active(chat_id);
    }

    fn row(&self, store: &EntityStore, chat: &UserChat, now_ms: i64) -> RowView {
        let excerpt = store.excerpt(&chat.id);
        let tone = match excerpt.map(|m| m.author_kind()) {
            Some(kind) if kind.is_customer() => IndicatorTone::Customer,
            _ => IndicatorTone::Agent,
        };
        let name = display_name(store, chat);
        let assignee = chat
            .assignee_id
            .as_deref()
            .and_then(|id| store.manager(id))
            .and_then(|p| p.name.clone());
        let excerpt_text = excerpt
            .and_then(|m| m.plain_text.as_deref())
            .map(|t| truncate_excerpt(t, self.excerpt_max_chars))
            .unwrap_or_default();
        RowView {
            chat_id: chat.id.clone(),
            name,
            tone,
            assignee,
            age_label: relative_age(now_ms, chat.last_activity()),
            excerpt: excerpt_text,
        }
    }
}

/// Name shown for a conversation: its own name, else the customer's, else
/// the raw id. The locator matches these against host text, so it must agree
/// with what rows display.
pub fn display_name(store: &EntityStore, chat: &UserChat) -> String {
    chat.name
        .clone()
        .or_else(|| {
            chat.user_id
                .as_deref()
                .and_then(|id| store.customer(id))
                .and_then(|p| p.name.clone())
        })
        .unwrap_or_else(|| chat.id.clone())
}

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Bucketed relative-age label for a last-activity timestamp.
pub fn relative_age(now_ms: i64, ts_ms: i64) -> String {
    let delta = (now_ms - ts_ms).max(0);
    if delta < MINUTE_MS {
        return "just now".to_string();
    }
    if delta < HOUR_MS {
        return format!("{} min ago", delta / MINUTE_MS);
    }
    if delta < DAY_MS {
        return format!("{} hr ago", delta / HOUR_MS);
    }
    if delta < 7 * DAY_MS {
        return format!("{} day ago", delta / DAY_MS);
    }
    match Utc.timestamp_millis_opt(ts_ms).single() {
        Some(when) => when.format("%b %-d").to_string(),
        None => String::new(),
    }
}

/// Hard character cap with an ellipsis.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
