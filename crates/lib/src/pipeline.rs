//! Single-consumer pipeline: one work queue, merges in arrival order,
//! re-render gated on observable change.
//!
//! Producers are the interceptor tap, the refresh scheduler, the host
//! surface (clicks, route changes), and the pipeline's own scheduled locate
//! attempts. The consumer task owns the entity store, so two merges can
//! never interleave and a read always sees a complete merge.

use crate::config::Config;
use crate::locator::{self, HostSurface, MountPoint};
use crate::merge::merge;
use crate::model::{BookmarkPayload, PayloadSource};
use crate::projection::project;
use crate::render::{display_name, Renderer};
use crate::routes;
use crate::store::EntityStore;
use crate::transport::PageState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Unit of work for the pipeline queue.
#[derive(Debug)]
pub enum Event {
    /// A captured or polled payload to merge.
    Payload {
        payload: BookmarkPayload,
        source: PayloadSource,
    },
    /// A row of the overlay list was clicked.
    RowClicked { chat_id: String },
    /// The host navigated (hash route change).
    RouteChanged { route: String },
    /// One scheduled mount-search attempt. Stale generations are ignored.
    LocateAttempt { attempt: usize, generation: u64 },
}

pub struct Pipeline {
    store: EntityStore,
    page: Arc<PageState>,
    surface: Option<Arc<dyn HostSurface>>,
    renderer: Option<Renderer>,
    locator_config: crate::config::LocatorConfig,
    excerpt_max_chars: usize,
    active: Option<String>,
    generation: u64,
    /// Weak handle for self-scheduled locate attempts; a strong one would
    /// keep the queue open after every producer is gone.
    tx: mpsc::WeakSender<Event>,
}

impl Pipeline {
    /// Pipeline with a fixed mount point (no locate phase); used by front
    /// ends that own their surface, like the CLI.
    pub fn with_mount(
        mount: Arc<dyn MountPoint>,
        config: &Config,
        page: Arc<PageState>,
        tx: &mpsc::Sender<Event>,
    ) -> Self {
        let renderer = Renderer::new(mount, config.render.excerpt_max_chars);
        Self {
            store: EntityStore::new(),
            page,
            surface: None,
            renderer: Some(renderer),
            locator_config: config.locator.clone(),
            excerpt_max_chars: config.render.excerpt_max_chars,
            active: None,
            generation: 0,
            tx: tx.downgrade(),
        }
    }

    /// Pipeline that searches the given host surface for its mount point
    /// after each confirmed capture.
    pub fn with_surface(
        surface: Arc<dyn HostSurface>,
        config: &Config,
        page: Arc<PageState>,
        tx: &mpsc::Sender<Event>,
    ) -> Self {
        Self {
            store: EntityStore::new(),
            page,
            surface: Some(surface),
            renderer: None,
            locator_config: config.locator.clone(),
            excerpt_max_chars: config.render.excerpt_max_chars,
            active: None,
            generation: 0,
            tx: tx.downgrade(),
        }
    }

    /// Consume the queue until every producer is gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        log::info!("pipeline: event queue closed, stopping");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Payload { payload, source } => {
                let confirmed = source == PayloadSource::Confirmed;
                let changed = merge(&mut self.store, &payload, source);
                log::debug!(
                    "merged {:?} payload, changed: {}",
                    source,
                    changed
                );
                if confirmed && self.renderer.is_none() && self.surface.is_some() {
                    self.schedule_locate_attempts();
                }
                if changed {
                    self.render_current();
                }
            }
            Event::LocateAttempt {
                attempt,
                generation,
            } => self.locate_attempt(attempt, generation),
            Event::RowClicked { chat_id } => {
                if let (Some(surface), Some(channel_id)) =
                    (self.surface.as_deref(), self.page.channel_id())
                {
                    surface.navigate(&routes::chat_route(&channel_id, &chat_id));
                }
                self.set_active(Some(chat_id));
            }
            Event::RouteChanged { route } => {
                if let Some(channel_id) = routes::channel_id_from_path(&route) {
                    self.page.set_channel_id(channel_id);
                }
                self.set_active(routes::active_chat_from_route(&route));
            }
        }
    }

    /// (Re)start the locate ladder: one attempt per configured delay. A new
    /// capture bumps the generation so attempts from an older ladder become
    /// no-ops.
    fn schedule_locate_attempts(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        for (attempt, delay_ms) in self.locator_config.attempt_delays_ms.iter().enumerate() {
            let weak = self.tx.clone();
            let delay = Duration::from_millis(*delay_ms);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(tx) = weak.upgrade() {
                    let _ = tx
                        .send(Event::LocateAttempt {
                            attempt,
                            generation,
                        })
                        .await;
                }
            });
        }
    }

    fn locate_attempt(&mut self, attempt: usize, generation: u64) {
        if generation != self.generation || self.renderer.is_some() {
            return;
        }
        let Some(surface) = self.surface.clone() else {
            return;
        };
        let names = self.known_names();
        match locator::locate(surface.as_ref(), &names, &self.locator_config) {
            Some(id) => match surface.mount(id) {
                Some(mount) => {
                    log::info!("mount located on attempt {}", attempt + 1);
                    self.renderer = Some(Renderer::new(mount, self.excerpt_max_chars));
                    self.render_current();
                }
                None => log::debug!("candidate {} vanished before mounting", id),
            },
            None => {
                // Degraded but non-fatal: the host's own view stays usable.
                log::debug!(
                    "mount not found (attempt {}/{})",
                    attempt + 1,
                    self.locator_config.attempt_delays_ms.len()
                );
            }
        }
    }

    /// Display names the host is expected to show, for the locator's text
    /// overlap heuristic.
    fn known_names(&self) -> Vec<String> {
        project(&self.store)
            .iter()
            .map(|chat| display_name(&self.store, chat))
            .collect()
    }

    fn set_active(&mut self, chat_id: Option<String>) {
        self.active = chat_id;
        if let Some(renderer) = &self.renderer {
            renderer.set_active(self.active.as_deref());
        }
    }

    fn render_current(&mut self) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let chats = project(&self.store);
        let now_ms = chrono::Utc::now().timestamp_millis();
        renderer.render(&self.store, &chats, self.active.as_deref(), now_ms);
    }
}
