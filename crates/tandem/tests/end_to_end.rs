//! Two clients talking through a real broker.

use std::time::Duration;

use tandem::prelude::*;
use tandem_broker::Broker;
use tokio::sync::mpsc;

/// What a client put on screen, streamed out as it happens.
#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Status(ConnectionState),
    Cursor(ParticipantId, Position),
    Removed(ParticipantId),
    Chat(String),
    Notice(String),
}

struct ObservedSurface {
    inner: MemorySurface,
    tx: mpsc::UnboundedSender<Seen>,
}

impl ObservedSurface {
    fn new() -> (Self, mpsc::UnboundedReceiver<Seen>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: MemorySurface::new(),
                tx,
            },
            rx,
        )
    }
}

impl Surface for ObservedSurface {
    fn set_status(&mut self, state: ConnectionState) {
        self.inner.set_status(state);
        let _ = self.tx.send(Seen::Status(state));
    }

    fn place_cursor(&mut self, identity: &ParticipantId, at: Position) {
        self.inner.place_cursor(identity, at);
        let _ = self.tx.send(Seen::Cursor(identity.clone(), at));
    }

    fn remove_cursor(&mut self, identity: &ParticipantId) {
        self.inner.remove_cursor(identity);
        let _ = self.tx.send(Seen::Removed(identity.clone()));
    }

    fn append_chat_line(&mut self, entry: &ChatEntry) {
        self.inner.append_chat_line(entry);
        let _ = self.tx.send(Seen::Chat(entry.to_string()));
    }

    fn notify(&mut self, notice: &str) {
        self.inner.notify(notice);
        let _ = self.tx.send(Seen::Notice(notice.to_owned()));
    }
}

async fn start_broker() -> String {
    let broker = Broker::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("broker should bind");
    let addr = broker.local_addr().expect("should have local addr");
    tokio::spawn(broker.run());
    format!("ws://{addr}/ws")
}

fn start_client(
    url: &str,
    identity: LocalIdentity,
) -> (ClientHandle<ObservedSurface>, mpsc::UnboundedReceiver<Seen>) {
    let (surface, seen) = ObservedSurface::new();
    let client = TandemClient::builder()
        .config(ClientConfig::default().broker_url(url))
        .identity(identity)
        .start(surface)
        .expect("client should start");
    (client, seen)
}

async fn wait_for(seen: &mut mpsc::UnboundedReceiver<Seen>, pred: impl Fn(&Seen) -> bool) -> Seen {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let item = seen.recv().await.expect("surface stream ended");
            if pred(&item) {
                return item;
            }
        }
    })
    .await
    .expect("timed out waiting for the surface")
}

/// Moves `mover`'s pointer until `watcher` draws it, which proves both are
/// registered with the broker and have pointer capture on.
async fn until_visible(
    mover: &ClientHandle<ObservedSurface>,
    watcher: &mut mpsc::UnboundedReceiver<Seen>,
    identity: &ParticipantId,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            mover.pointer_moved(40, 30);
            tokio::select! {
                item = watcher.recv() => {
                    if let Some(Seen::Cursor(id, _)) = item {
                        if &id == identity {
                            return;
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(20)) => {}
            }
        }
    })
    .await
    .expect("cursor never became visible");
}

#[tokio::test]
async fn test_chat_reaches_the_other_client() {
    let url = start_broker().await;
    let (alice, mut alice_seen) =
        start_client(&url, LocalIdentity::new("10.0.0.1").with_username("alice"));
    let (bob, mut bob_seen) = start_client(&url, LocalIdentity::new("10.0.0.2"));

    assert!(alice.wait_connected().await);
    assert!(bob.wait_connected().await);
    until_visible(&bob, &mut alice_seen, &ParticipantId::from("10.0.0.2")).await;

    alice.submit_chat("hi").await.unwrap();

    let line = wait_for(&mut bob_seen, |s| matches!(s, Seen::Chat(_))).await;
    assert_eq!(line, Seen::Chat("alice: hi".into()));

    // The sender sees its own message through the broker's echo.
    let echo = wait_for(&mut alice_seen, |s| matches!(s, Seen::Chat(_))).await;
    assert_eq!(echo, Seen::Chat("alice: hi".into()));

    let bob_session = bob.shutdown().await.unwrap();
    let entry = bob_session.dispatcher().chat().last().unwrap();
    assert_eq!(entry.author, Username::from("alice"));
    assert_eq!(entry.text, "hi");
    alice.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cursor_is_shared_but_never_drawn_locally() {
    let url = start_broker().await;
    let (alice, mut alice_seen) = start_client(&url, LocalIdentity::new("10.0.0.1"));
    let (bob, mut bob_seen) = start_client(&url, LocalIdentity::new("10.0.0.2"));

    assert!(alice.wait_connected().await);
    assert!(bob.wait_connected().await);
    until_visible(&bob, &mut alice_seen, &ParticipantId::from("10.0.0.2")).await;
    // Alice's own updates are echoed back to her as well.
    until_visible(&alice, &mut bob_seen, &ParticipantId::from("10.0.0.1")).await;

    let alice_session = alice.shutdown().await.unwrap();
    let drawn = alice_session.surface().inner.cursors();
    assert!(drawn.contains_key(&ParticipantId::from("10.0.0.2")));
    assert!(!drawn.contains_key(&ParticipantId::from("10.0.0.1")));
    bob.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_departed_client_cursor_is_removed() {
    let url = start_broker().await;
    let (alice, mut alice_seen) = start_client(&url, LocalIdentity::new("10.0.0.1"));
    let (bob, _bob_seen) = start_client(&url, LocalIdentity::new("10.0.0.2"));

    assert!(alice.wait_connected().await);
    assert!(bob.wait_connected().await);
    let bob_id = ParticipantId::from("10.0.0.2");
    until_visible(&bob, &mut alice_seen, &bob_id).await;

    bob.shutdown().await.unwrap();

    let removed = wait_for(&mut alice_seen, |s| matches!(s, Seen::Removed(_))).await;
    assert_eq!(removed, Seen::Removed(bob_id));
    alice.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unauthenticated_chat_is_refused_locally() {
    let url = start_broker().await;
    let (anon, mut anon_seen) = start_client(&url, LocalIdentity::new("10.0.0.3"));
    assert!(anon.wait_connected().await);

    anon.submit_chat("hello?").await.unwrap();
    let notice = wait_for(&mut anon_seen, |s| matches!(s, Seen::Notice(_))).await;
    assert_eq!(
        notice,
        Seen::Notice("You must be logged in to send messages.".into())
    );

    anon.set_username(Some(Username::from("dana"))).await.unwrap();
    anon.submit_chat("hello!").await.unwrap();
    let line = wait_for(&mut anon_seen, |s| matches!(s, Seen::Chat(_))).await;
    assert_eq!(line, Seen::Chat("dana: hello!".into()));

    let session = anon.shutdown().await.unwrap();
    assert_eq!(session.dispatcher().chat().len(), 1);
}

#[tokio::test]
async fn test_start_requires_identity() {
    let result = TandemClient::builder().start(MemorySurface::new());
    assert!(matches!(result, Err(TandemError::MissingIdentity)));
}
