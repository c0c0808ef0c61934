//! HTTP transport seam and the passive bookmark interceptor.
//!
//! `Transport` is the boundary the host's traffic flows through; the
//! `Interceptor` decorates any transport, widening the bookmark page limit on
//! the way out and tapping response bodies on the way in. It never alters
//! response content and a tap failure never fails the request.

use crate::model::{parse_payload, PayloadSource};
use crate::pipeline::Event;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Minimal outbound request description.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }
}

/// Raw response: status and full body. Non-2xx is not an error at this layer
/// so decorated traffic passes through unchanged.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

/// Boundary around the network layer. Implementations must forward requests
/// without interpreting them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport; attaches the session cookie when configured.
pub struct HttpTransport {
    client: reqwest::Client,
    cookie: Option<String>,
}

impl HttpTransport {
    pub fn new(cookie: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cookie,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method: reqwest::Method = req
            .method
            .parse()
            .map_err(|_| TransportError::Api(format!("invalid method {}", req.method)))?;
        let mut builder = self.client.request(method, &req.url);
        if let Some(ref cookie) = self.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        let res = builder.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Shared page-identity state: whether the host currently shows the bookmark
/// view, and the channel id observed from traffic or navigation.
#[derive(Debug, Default)]
pub struct PageState {
    on_bookmark_view: AtomicBool,
    channel_id: Mutex<Option<String>>,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_bookmark_view(&self) -> bool {
        self.on_bookmark_view.load(Ordering::SeqCst)
    }

    pub fn enter_bookmark_view(&self) {
        self.on_bookmark_view.store(true, Ordering::SeqCst);
    }

    pub fn leave_bookmark_view(&self) {
        self.on_bookmark_view.store(false, Ordering::SeqCst);
    }

    pub fn channel_id(&self) -> Option<String> {
        self.channel_id.lock().expect("channel id lock").clone()
    }

    pub fn set_channel_id(&self, id: impl Into<String>) {
        *self.channel_id.lock().expect("channel id lock") = Some(id.into());
    }
}

/// True for the pinned-subset listing endpoint.
pub fn is_bookmark_url(url: &str) -> bool {
    url.contains("/user-chats/bookmark")
}

fn is_user_chat_url(url: &str) -> bool {
    url.contains("/user-chats/")
}

/// Rewrite an existing `limit=` query parameter upward to `floor`. Never
/// shrinks a larger limit and leaves urls without the parameter untouched.
pub fn widen_limit(url: &str, floor: u32) -> String {
    let mut search_from = 0;
    while let Some(rel) = url[search_from..].find("limit=") {
        let idx = search_from + rel;
        search_from = idx + "limit=".len();
        // Only a whole query parameter counts (not e.g. pageLimit=).
        let boundary = idx == 0 || matches!(url.as_bytes()[idx - 1], b'?' | b'&');
        if !boundary {
            continue;
        }
        let start = idx + "limit=".len();
        let digits_len = url[start..]
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits_len == 0 {
            continue;
        }
        let value: u32 = match url[start..start + digits_len].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if value < floor {
            return format!("{}{}{}", &url[..start], floor, &url[start + digits_len..]);
        }
        return url.to_string();
    }
    url.to_string()
}

/// Passive decorator around a transport: widens the bookmark page limit,
/// classifies responses, and offers parsed payloads to the pipeline queue.
pub struct Interceptor {
    inner: Arc<dyn Transport>,
    page: Arc<PageState>,
    page_limit: u32,
    tap: mpsc::Sender<Event>,
}

impl Interceptor {
    pub fn new(
        inner: Arc<dyn Transport>,
        page: Arc<PageState>,
        page_limit: u32,
        tap: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            inner,
            page,
            page_limit,
            tap,
        }
    }

    fn offer(&self, body: &str, source: PayloadSource) {
        if let Some(payload) = parse_payload(body) {
            if self
                .tap
                .try_send(Event::Payload { payload, source })
                .is_err()
            {
                log::debug!("pipeline queue unavailable, dropping tapped payload");
            }
        }
    }
}

#[async_trait]
impl Transport for Interceptor {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = req;
        let bookmark = is_bookmark_url(&req.url);
        if bookmark {
            req.url = widen_limit(&req.url, self.page_limit);
        }
        let res = self.inner.execute(req.clone()).await?;

        if bookmark {
            // A bookmark call is positive evidence the host shows that view.
            self.page.enter_bookmark_view();
            if let Some(channel_id) = crate::routes::channel_id_from_path(&req.url) {
                self.page.set_channel_id(channel_id);
            }
            if res.is_success() {
                log::debug!("captured confirmed bookmark payload from {}", req.url);
                self.offer(&res.body, PayloadSource::Confirmed);
            }
        } else if is_user_chat_url(&req.url) {
            // Other user-chat listings mean the host left the bookmark view.
            if self.page.on_bookmark_view() {
                log::debug!("non-bookmark chat traffic, leaving bookmark view");
                self.page.leave_bookmark_view();
            }
        } else if res.is_success() {
            self.offer(&res.body, PayloadSource::Opportunistic);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTransport {
        body: String,
        seen: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(req.url);
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    const FULL_BODY: &str =
        r#"{"userChats":[{"id":"c1","frontUpdatedAt":100}],"bookmarks":[{"chatId":"c1"}]}"#;

    fn interceptor(
        body: &str,
    ) -> (
        Interceptor,
        Arc<FakeTransport>,
        Arc<PageState>,
        mpsc::Receiver<Event>,
    ) {
        let inner = Arc::new(FakeTransport::new(body));
        let page = Arc::new(PageState::new());
        let (tx, rx) = mpsc::channel(8);
        let interceptor = Interceptor::new(inner.clone(), page.clone(), 500, tx);
        (interceptor, inner, page, rx)
    }

    #[test]
    fn widen_limit_raises_but_never_shrinks() {
        assert_eq!(
            widen_limit("https://x/bookmark?limit=25", 500),
            "https://x/bookmark?limit=500"
        );
        assert_eq!(
            widen_limit("https://x/bookmark?limit=900", 500),
            "https://x/bookmark?limit=900"
        );
        assert_eq!(
            widen_limit("https://x/bookmark?limit=30&since=5", 500),
            "https://x/bookmark?limit=500&since=5"
        );
    }

    #[test]
    fn widen_limit_ignores_lookalike_params_and_absence() {
        assert_eq!(
            widen_limit("https://x/bookmark?rowlimit=25", 500),
            "https://x/bookmark?rowlimit=25"
        );
        assert_eq!(
            widen_limit("https://x/bookmark?rowlimit=25&limit=30", 500),
            "https://x/bookmark?rowlimit=25&limit=500"
        );
        assert_eq!(widen_limit("https://x/bookmark", 500), "https://x/bookmark");
    }

    #[tokio::test]
    async fn bookmark_response_confirms_view_and_emits_payload() {
        let (interceptor, inner, page, mut rx) = interceptor(FULL_BODY);
        let req = HttpRequest::get(
            "https://api.example.com/desk/channels/42/user-chats/bookmark?limit=25",
        );
        let res = interceptor.execute(req).await.expect("execute");
        assert_eq!(res.body, FULL_BODY);
        assert!(page.on_bookmark_view());
        assert_eq!(page.channel_id().as_deref(), Some("42"));
        // The forwarded request carried the widened limit.
        assert!(inner.seen.lock().unwrap()[0].ends_with("limit=500"));
        match rx.try_recv().expect("tapped event") {
            Event::Payload { source, .. } => assert_eq!(source, PayloadSource::Confirmed),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn foreign_user_chat_traffic_clears_the_view_flag() {
        let (interceptor, _, page, mut rx) = interceptor(FULL_BODY);
        page.enter_bookmark_view();
        let req = HttpRequest::get("https://api.example.com/desk/channels/42/user-chats/?state=opened");
        interceptor.execute(req).await.expect("execute");
        assert!(!page.on_bookmark_view());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unrelated_payload_shaped_response_is_opportunistic() {
        let body = r#"{"messages":[{"chatId":"c1","plainText":"hi","createdAt":5}]}"#;
        let (interceptor, _, page, mut rx) = interceptor(body);
        interceptor
            .execute(HttpRequest::get("https://api.example.com/desk/inbox/feed"))
            .await
            .expect("execute");
        assert!(!page.on_bookmark_view());
        match rx.try_recv().expect("tapped event") {
            Event::Payload { source, .. } => assert_eq!(source, PayloadSource::Opportunistic),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_ignored() {
        let (interceptor, _, _, mut rx) = interceptor("<html>sign in</html>");
        interceptor
            .execute(HttpRequest::get("https://api.example.com/desk/inbox/feed"))
            .await
            .expect("execute");
        assert!(rx.try_recv().is_err());
    }
}
