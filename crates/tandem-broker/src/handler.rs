//! Per-connection handler: validate, fan out, announce departure.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection
//!   2. Loop: receive a frame → validate it → send it to every connection
//!   3. Unregister and broadcast `Disconnected` for the departed identity

use std::sync::Arc;

use tandem_protocol::{Envelope, ParticipantId, decode_envelope, encode_envelope};
use tandem_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::BrokerError;
use crate::server::BrokerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<BrokerState>,
) -> Result<(), BrokerError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let fallback = conn
        .peer_addr()
        .map(|addr| ParticipantId::new(addr.to_string()))
        .unwrap_or_else(|| ParticipantId::new(conn_id.to_string()));

    state
        .connections
        .lock()
        .await
        .insert(conn_id, Arc::clone(&conn));
    tracing::info!(%conn_id, peer = %fallback, "participant connected");

    // The identity this connection last claimed in a cursor update.
    let mut claimed: Option<ParticipantId> = None;

    let outcome = loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break Err(BrokerError::Transport(e));
            }
        };

        let envelope = match decode_envelope(&state.codec, &data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping invalid frame");
                continue;
            }
        };

        if let Envelope::CursorUpdate { ip, .. } = &envelope {
            if claimed.as_ref() != Some(ip) {
                tracing::debug!(%conn_id, identity = %ip, "connection claimed identity");
                claimed = Some(ip.clone());
            }
        }

        broadcast(&state, &envelope).await;
    };

    state.connections.lock().await.remove(&conn_id);
    let ip = claimed.unwrap_or(fallback);
    tracing::info!(%conn_id, identity = %ip, "participant disconnected");
    broadcast(&state, &Envelope::Disconnected { ip }).await;

    outcome
}

/// Sends one envelope to every registered connection, the sender included.
///
/// A connection whose write fails is unregistered and closed; delivery to
/// the others continues.
pub(crate) async fn broadcast(state: &BrokerState, envelope: &Envelope) {
    let frame = match encode_envelope(&state.codec, envelope) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, kind = %envelope.kind(), "failed to encode envelope");
            return;
        }
    };

    // Snapshot the recipients so the lock is not held across network I/O.
    let recipients: Vec<(ConnectionId, Arc<WebSocketConnection>)> = state
        .connections
        .lock()
        .await
        .iter()
        .map(|(id, conn)| (*id, Arc::clone(conn)))
        .collect();

    let mut failed = Vec::new();
    for (id, conn) in &recipients {
        if let Err(e) = conn.send(&frame).await {
            tracing::warn!(conn_id = %id, error = %e, "write failed, dropping connection");
            failed.push((*id, Arc::clone(conn)));
        }
    }

    if failed.is_empty() {
        tracing::debug!(kind = %envelope.kind(), recipients = recipients.len(), "envelope fanned out");
        return;
    }

    {
        let mut connections = state.connections.lock().await;
        for (id, _) in &failed {
            connections.remove(id);
        }
    }
    for (_, conn) in failed {
        let _ = conn.close().await;
    }
}
