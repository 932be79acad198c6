//! The transport channel: one client connection, kept alive.
//!
//! A [`TransportChannel`] runs as its own Tokio task. It owns the
//! connection and publishes typed lifecycle and data events; callers talk
//! to it only through a cloneable [`ChannelHandle`] and the event stream.
//!
//! ```text
//!               ┌──────────── TransportChannel task ────────────┐
//! handle.send ─→│ outbound queue ─→ conn.send                   │
//!               │ conn.recv ─→ TransportEvent::Frame ───────────┼─→ events
//!               │ open / close / connect failure ─→ lifecycle ──┼─→ events
//!               │ close ─→ sleep(policy) ─→ connect again        │
//!               └────────────────────────────────────────────────┘
//! ```
//!
//! Attempts are strictly sequential: a new attempt is only started after
//! the previous connection has closed and the reconnect delay elapsed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{Connection, ConnectionState, Connector, ReconnectPolicy};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Why a connection (or connection attempt) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection.
    Remote,
    /// Sending or receiving failed.
    Error(String),
    /// The connection attempt itself failed.
    ConnectFailed(String),
    /// [`ChannelHandle::shutdown`] was called.
    Shutdown,
}

impl CloseReason {
    /// Every close except a local shutdown schedules a reconnect.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, CloseReason::Shutdown)
    }
}

/// What the channel task reports, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection attempt is starting. `attempt` counts from 1 since the
    /// last successful open.
    Connecting { attempt: u32 },
    /// The connection is up; sends are now delivered.
    Opened,
    /// One inbound frame.
    Frame(Vec<u8>),
    /// The connection (or attempt) ended.
    Closed(CloseReason),
    /// The reconnect policy ran out of attempts; the task has stopped.
    GaveUp,
}

// ---------------------------------------------------------------------------
// Outbound side
// ---------------------------------------------------------------------------

/// Result of handing a frame to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted for delivery on the live connection.
    Queued,
    /// Not connected; the frame was discarded, not buffered.
    Dropped,
}

/// The outbound half of a channel, as the dispatcher sees it.
pub trait FrameSink {
    /// Hands one encoded frame to the transport.
    fn send(&self, frame: Vec<u8>) -> SendOutcome;

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}

/// Cloneable handle to a running [`TransportChannel`].
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ChannelHandle {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Queues a frame if connected, otherwise drops it.
    pub fn send(&self, frame: Vec<u8>) -> SendOutcome {
        if self.state() != ConnectionState::Connected {
            tracing::trace!(len = frame.len(), "not connected, frame dropped");
            return SendOutcome::Dropped;
        }
        match self.outbound.send(frame) {
            Ok(()) => SendOutcome::Queued,
            Err(_) => SendOutcome::Dropped,
        }
    }

    /// Stops the channel: cancels a pending reconnect and closes the
    /// live connection, if any. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Waits until the channel reaches `target`.
    ///
    /// Returns `false` if the channel task ended first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> bool {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s == target).await.is_ok()
    }
}

impl FrameSink for ChannelHandle {
    fn send(&self, frame: Vec<u8>) -> SendOutcome {
        ChannelHandle::send(self, frame)
    }

    fn state(&self) -> ConnectionState {
        ChannelHandle::state(self)
    }
}

// ---------------------------------------------------------------------------
// The channel task
// ---------------------------------------------------------------------------

/// Owns one connection to the broker through connect, reconnect and
/// teardown. See the module docs.
pub struct TransportChannel<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shutdown: watch::Receiver<bool>,
}

impl<C: Connector> TransportChannel<C> {
    /// Spawns the channel task and makes the first connection attempt
    /// immediately.
    ///
    /// Returns the handle, the event stream, and the task's join handle.
    /// The task ends on shutdown, when the policy gives up, or when the
    /// event receiver is dropped.
    pub fn spawn(
        connector: C,
        policy: ReconnectPolicy,
    ) -> (
        ChannelHandle,
        mpsc::UnboundedReceiver<TransportEvent>,
        JoinHandle<()>,
    ) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let channel = TransportChannel {
            connector,
            policy,
            state: state_tx,
            outbound: out_rx,
            events: event_tx,
            shutdown: stop_rx,
        };
        let task = tokio::spawn(channel.run());

        let handle = ChannelHandle {
            state: state_rx,
            outbound: out_tx,
            shutdown: Arc::new(stop_tx),
        };
        (handle, event_rx, task)
    }

    async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            self.state.send_replace(ConnectionState::Connecting);
            if !self.emit(TransportEvent::Connecting {
                attempt: failures + 1,
            }) {
                break;
            }

            let attempt = tokio::select! {
                result = self.connector.connect() => result,
                _ = stopped(&mut self.shutdown) => {
                    self.state.send_replace(ConnectionState::Disconnected);
                    self.emit(TransportEvent::Closed(CloseReason::Shutdown));
                    break;
                }
            };

            match attempt {
                Ok(conn) => {
                    failures = 0;
                    self.discard_outbound();
                    self.state.send_replace(ConnectionState::Connected);
                    tracing::info!(conn_id = %conn.id(), "transport connected");
                    if !self.emit(TransportEvent::Opened) {
                        break;
                    }

                    let reason = self.pump(&conn).await;

                    self.state.send_replace(ConnectionState::Disconnected);
                    self.discard_outbound();
                    tracing::info!(conn_id = %conn.id(), ?reason, "transport closed");
                    let listening = self.emit(TransportEvent::Closed(reason.clone()));
                    if !reason.is_abnormal() || !listening {
                        break;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(error = %e, failures, "connection attempt failed");
                    self.state.send_replace(ConnectionState::Disconnected);
                    if !self.emit(TransportEvent::Closed(CloseReason::ConnectFailed(
                        e.to_string(),
                    ))) {
                        break;
                    }
                }
            }

            let Some(delay) = self.policy.delay_after(failures) else {
                tracing::warn!(failures, "reconnect attempts exhausted");
                self.emit(TransportEvent::GaveUp);
                break;
            };

            tracing::warn!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped(&mut self.shutdown) => break,
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
        tracing::debug!("transport channel stopped");
    }

    /// Moves frames both ways until the connection ends.
    ///
    /// Reading and writing run side by side, so a write stalled on a full
    /// socket never stops inbound frames from being drained.
    async fn pump(&mut self, conn: &C::Connection) -> CloseReason {
        let events = &self.events;
        let outbound = &mut self.outbound;
        let shutdown = &mut self.shutdown;

        let reading = async {
            loop {
                match conn.recv().await {
                    Ok(Some(frame)) => {
                        if events.send(TransportEvent::Frame(frame)).is_err() {
                            return None;
                        }
                    }
                    Ok(None) => return Some(CloseReason::Remote),
                    Err(e) => {
                        tracing::warn!(error = %e, "transport receive failed");
                        return Some(CloseReason::Error(e.to_string()));
                    }
                }
            }
        };

        let writing = async {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = conn.send(&frame).await {
                    tracing::warn!(error = %e, "transport send failed");
                    return CloseReason::Error(e.to_string());
                }
            }
            // Every handle is gone; the shutdown branch takes it from here.
            std::future::pending::<CloseReason>().await
        };

        tokio::select! {
            ended = reading => match ended {
                Some(reason) => reason,
                None => {
                    close_quietly(conn).await;
                    CloseReason::Shutdown
                }
            },
            reason = writing => reason,
            _ = stopped(shutdown) => {
                close_quietly(conn).await;
                CloseReason::Shutdown
            }
        }
    }

    /// Publishes an event. `false` means nobody is listening any more.
    fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Frames queued for a connection that no longer exists are dropped,
    /// never replayed on the next one.
    fn discard_outbound(&mut self) {
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded frames queued for a closed connection");
        }
    }
}

/// Resolves once shutdown is requested or every handle is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn close_quietly<T: Connection>(conn: &T) {
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "close during shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_shutdown_is_normal() {
        assert!(!CloseReason::Shutdown.is_abnormal());
        assert!(CloseReason::Remote.is_abnormal());
        assert!(CloseReason::Error("reset".into()).is_abnormal());
        assert!(CloseReason::ConnectFailed("refused".into()).is_abnormal());
    }
}
