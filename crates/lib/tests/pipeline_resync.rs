//! Integration test: drive the pipeline through capture, poll, and
//! interaction events, asserting renders happen only on observable change.
//! No network or host UI involved; the mount records every pass.

use lib::config::Config;
use lib::locator::MountPoint;
use lib::model::{parse_payload, PayloadSource};
use lib::pipeline::{Event, Pipeline};
use lib::render::RowView;
use lib::transport::PageState;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingMount {
    renders: Mutex<Vec<Vec<String>>>,
    actives: Mutex<Vec<Option<String>>>,
}

impl MountPoint for RecordingMount {
    fn suppress_native(&self) {}

    fn set_rows(&self, rows: &[RowView]) {
        self.renders
            .lock()
            .unwrap()
            .push(rows.iter().map(|r| r.chat_id.clone()).collect());
    }

    fn set_active(&self, chat_id: Option<&str>) {
        self.actives.lock().unwrap().push(chat_id.map(String::from));
    }
}

fn confirmed(json: &str) -> Event {
    Event::Payload {
        payload: parse_payload(json).expect("test payload parses"),
        source: PayloadSource::Confirmed,
    }
}

fn start_pipeline() -> (Arc<RecordingMount>, mpsc::Sender<Event>, tokio::task::JoinHandle<()>) {
    let mount = Arc::new(RecordingMount::default());
    let page = Arc::new(PageState::new());
    let (tx, rx) = mpsc::channel(16);
    let pipeline = Pipeline::with_mount(mount.clone(), &Config::default(), page, &tx);
    let handle = tokio::spawn(pipeline.run(rx));
    (mount, tx, handle)
}

const FIRST: &str = r#"{"userChats":[{"id":"A","frontUpdatedAt":100},{"id":"B","frontUpdatedAt":200}],"bookmarks":[{"chatId":"A"},{"chatId":"B"}]}"#;
const A_FRESHER: &str = r#"{"userChats":[{"id":"A","frontUpdatedAt":300},{"id":"B","frontUpdatedAt":200}],"bookmarks":[{"chatId":"A"},{"chatId":"B"}]}"#;

#[tokio::test]
async fn resync_reorders_then_coalesces_identical_polls() {
    let (mount, tx, handle) = start_pipeline();

    tx.send(confirmed(FIRST)).await.unwrap();
    tx.send(confirmed(A_FRESHER)).await.unwrap();
    // The poller returning the identical payload must not re-render.
    tx.send(confirmed(A_FRESHER)).await.unwrap();
    drop(tx);
    handle.await.unwrap();

    let renders = mount.renders.lock().unwrap();
    assert_eq!(renders.len(), 2, "third (unchanged) merge must not render");
    assert_eq!(renders[0], ["B", "A"]);
    assert_eq!(renders[1], ["A", "B"]);
}

#[tokio::test]
async fn unresolved_members_are_skipped_until_supplied() {
    let (mount, tx, handle) = start_pipeline();

    // Membership mentions C but no record for it exists yet.
    tx.send(confirmed(
        r#"{"userChats":[{"id":"A","frontUpdatedAt":100},{"id":"B","frontUpdatedAt":200}],"bookmarks":[{"chatId":"A"},{"chatId":"B"},{"chatId":"C"}]}"#,
    ))
    .await
    .unwrap();
    // A later payload resolves C.
    tx.send(confirmed(
        r#"{"userChats":[{"id":"C","frontUpdatedAt":300}],"bookmarks":[{"chatId":"A"},{"chatId":"B"},{"chatId":"C"}]}"#,
    ))
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    let renders = mount.renders.lock().unwrap();
    assert_eq!(renders[0], ["B", "A"]);
    assert_eq!(renders[1], ["C", "B", "A"]);
}

#[tokio::test]
async fn membership_removal_hides_a_still_stored_chat() {
    let (mount, tx, handle) = start_pipeline();

    tx.send(confirmed(FIRST)).await.unwrap();
    tx.send(confirmed(
        r#"{"userChats":[{"id":"A","frontUpdatedAt":100},{"id":"B","frontUpdatedAt":200}],"bookmarks":[{"chatId":"B"}]}"#,
    ))
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    let renders = mount.renders.lock().unwrap();
    assert_eq!(renders[1], ["B"]);
}

#[tokio::test]
async fn clicks_and_route_changes_move_the_highlight_without_rerender() {
    let (mount, tx, handle) = start_pipeline();

    tx.send(confirmed(FIRST)).await.unwrap();
    tx.send(Event::RowClicked {
        chat_id: "A".into(),
    })
    .await
    .unwrap();
    tx.send(Event::RouteChanged {
        route: "#/channels/42/user_chats/B".into(),
    })
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    assert_eq!(mount.renders.lock().unwrap().len(), 1);
    let actives = mount.actives.lock().unwrap();
    // One None from the initial render, then the click and the navigation.
    assert_eq!(
        *actives,
        vec![None, Some("A".to_string()), Some("B".to_string())]
    );
}

#[tokio::test]
async fn opportunistic_traffic_refreshes_pinned_entities_only() {
    let (mount, tx, handle) = start_pipeline();

    tx.send(confirmed(FIRST)).await.unwrap();
    tx.send(Event::Payload {
        payload: parse_payload(
            r#"{"userChats":[{"id":"A","frontUpdatedAt":900},{"id":"Z","frontUpdatedAt":999}],"bookmarks":[{"chatId":"Z"}]}"#,
        )
        .unwrap(),
        source: PayloadSource::Opportunistic,
    })
    .await
    .unwrap();
    drop(tx);
    handle.await.unwrap();

    let renders = mount.renders.lock().unwrap();
    // A's refresh re-renders; membership still {A, B}, Z never appears.
    assert_eq!(renders[1], ["A", "B"]);
}
