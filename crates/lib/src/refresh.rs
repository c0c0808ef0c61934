//! Refresh scheduler: periodic synthetic fetch of the pinned subset.
//!
//! Polls through the raw transport, not the interceptor, so its own fetches
//! never re-enter the capture tap. Self-disables (no-ops each tick) whenever
//! the page-identity flag is false or no channel id has been observed.

use crate::model::{parse_payload, BookmarkPayload, PayloadSource};
use crate::pipeline::Event;
use crate::transport::{HttpRequest, PageState, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub struct RefreshScheduler {
    transport: Arc<dyn Transport>,
    page: Arc<PageState>,
    base_url: String,
    page_limit: u32,
    interval: Duration,
    running: AtomicBool,
}

impl RefreshScheduler {
    pub fn new(
        transport: Arc<dyn Transport>,
        page: Arc<PageState>,
        base_url: impl Into<String>,
        page_limit: u32,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            page,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_limit,
            interval,
            running: AtomicBool::new(false),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Start the poll loop and feed confirmed payloads into the pipeline
    /// queue. Returns a handle to await on shutdown.
    pub fn start(self: Arc<Self>, tx: mpsc::Sender<Event>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!(
            "refresh scheduler: polling bookmarks every {}s",
            self.interval.as_secs()
        );
        tokio::spawn(async move {
            run_poll_loop(self, tx).await;
        })
    }

    /// GET `<base>/channels/<channelId>/user-chats/bookmark?limit=<N>`.
    async fn fetch_bookmarks(&self, channel_id: &str) -> Result<BookmarkPayload, TransportError> {
        let url = format!(
            "{}/channels/{}/user-chats/bookmark?limit={}",
            self.base_url, channel_id, self.page_limit
        );
        let res = self.transport.execute(HttpRequest::get(url)).await?;
        if !res.is_success() {
            return Err(TransportError::Api(format!("{} {}", res.status, res.body)));
        }
        parse_payload(&res.body)
            .ok_or_else(|| TransportError::Api("unexpected bookmark payload shape".to_string()))
    }
}

async fn run_poll_loop(scheduler: Arc<RefreshScheduler>, tx: mpsc::Sender<Event>) {
    while scheduler.running() {
        tokio::time::sleep(scheduler.interval).await;
        if !scheduler.page.on_bookmark_view() {
            continue;
        }
        let Some(channel_id) = scheduler.page.channel_id() else {
            continue;
        };
        match scheduler.fetch_bookmarks(&channel_id).await {
            Ok(payload) => {
                let event = Event::Payload {
                    payload,
                    source: PayloadSource::Confirmed,
                };
                if tx.send(event).await.is_err() {
                    log::debug!("refresh scheduler: pipeline queue closed, stopping loop");
                    return;
                }
            }
            Err(e) => {
                log::debug!("bookmark poll failed: {}", e);
            }
        }
    }
    log::info!("refresh scheduler: poll loop stopped");
}
