//! `TandemClient` builder and the handle to a running client.

use tandem_protocol::Username;
use tandem_state::{Surface, Viewport};
use tandem_transport::{
    ChannelHandle, ConnectionState, TransportChannel, WebSocketConnector,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::{LocalEvent, SyncSession};
use crate::{ClientConfig, Dispatcher, HttpCollaborator, LocalIdentity, TandemError};

/// Entry point for starting a client.
///
/// # Example
///
/// ```rust,no_run
/// use tandem::prelude::*;
///
/// # async fn demo() -> Result<(), TandemError> {
/// let client = TandemClient::builder()
///     .config(ClientConfig::default().broker_url("ws://127.0.0.1:8080/ws"))
///     .identity(LocalIdentity::new("10.0.0.1").with_username("alice"))
///     .start(MemorySurface::new())?;
///
/// client.wait_connected().await;
/// client.submit_chat("hi").await?;
/// let session = client.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct TandemClient;

impl TandemClient {
    pub fn builder() -> TandemClientBuilder {
        TandemClientBuilder::new()
    }
}

/// Builder for a [`TandemClient`].
#[derive(Debug, Default)]
pub struct TandemClientBuilder {
    config: ClientConfig,
    identity: Option<LocalIdentity>,
}

impl TandemClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a known identity.
    pub fn identity(mut self, identity: LocalIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Asks the web API who we are.
    pub async fn resolve_identity(
        mut self,
        api: &HttpCollaborator,
    ) -> Result<Self, TandemError> {
        self.identity = Some(api.resolve().await?);
        Ok(self)
    }

    /// Spawns the transport channel and the session loop.
    ///
    /// Must be called inside a Tokio runtime. The first connection attempt
    /// starts immediately; it is not awaited.
    pub fn start<S>(self, surface: S) -> Result<ClientHandle<S>, TandemError>
    where
        S: Surface + Send + 'static,
    {
        let identity = self.identity.ok_or(TandemError::MissingIdentity)?;
        tracing::info!(
            broker = %self.config.broker_url,
            participant = %identity.participant,
            "starting tandem client"
        );

        let connector = WebSocketConnector::new(self.config.broker_url.clone());
        let (channel, events, transport) =
            TransportChannel::spawn(connector, self.config.reconnect.clone());

        let dispatcher = Dispatcher::new(identity, self.config.viewport);
        let session = SyncSession::new(dispatcher, channel.clone(), surface);

        let (input, input_rx) = mpsc::channel(self.config.input_buffer.max(1));
        let session = tokio::spawn(session.run(events, input_rx));

        Ok(ClientHandle {
            channel,
            input,
            session,
            transport,
        })
    }
}

/// Handle to a running client.
///
/// Local actions are queued to the session task; the session task is the
/// only place state changes.
pub struct ClientHandle<S: Surface> {
    channel: ChannelHandle,
    input: mpsc::Sender<LocalEvent>,
    session: JoinHandle<SyncSession<ChannelHandle, S>>,
    transport: JoinHandle<()>,
}

impl<S: Surface + Send + 'static> ClientHandle<S> {
    /// Reports a pointer move. Dropped if the input queue is full.
    pub fn pointer_moved(&self, x: i64, y: i64) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.input.try_send(LocalEvent::PointerMoved { x, y })
        {
            tracing::trace!("input queue full, pointer move dropped");
        }
    }

    pub async fn submit_chat(&self, text: impl Into<String>) -> Result<(), TandemError> {
        self.push(LocalEvent::ChatSubmitted(text.into())).await
    }

    pub async fn set_username(&self, username: Option<Username>) -> Result<(), TandemError> {
        self.push(LocalEvent::IdentityChanged(username)).await
    }

    pub async fn resize(&self, viewport: Viewport) -> Result<(), TandemError> {
        self.push(LocalEvent::Resized(viewport)).await
    }

    /// Logs in through the web API, then adopts whatever username the
    /// server's session reports.
    ///
    /// A refused login comes back as [`AuthError::Rejected`](crate::AuthError::Rejected)
    /// inside [`TandemError::Auth`] and leaves the current username alone.
    pub async fn login(
        &self,
        api: &HttpCollaborator,
        username: &str,
        password: &str,
    ) -> Result<Option<Username>, TandemError> {
        api.login(username, password).await?;
        self.refresh_identity(api).await
    }

    /// Creates an account through the web API, then re-reads the session.
    pub async fn register(
        &self,
        api: &HttpCollaborator,
        username: &str,
        password: &str,
    ) -> Result<Option<Username>, TandemError> {
        api.register(username, password).await?;
        self.refresh_identity(api).await
    }

    /// Ends the web session and stops chatting under the old name.
    ///
    /// The local username is cleared even when the API call fails.
    pub async fn logout(&self, api: &HttpCollaborator) -> Result<(), TandemError> {
        let outcome = api.logout().await;
        self.set_username(None).await?;
        Ok(outcome?)
    }

    /// Reads the session status from the web API and applies its username.
    pub async fn refresh_identity(
        &self,
        api: &HttpCollaborator,
    ) -> Result<Option<Username>, TandemError> {
        let username = api.session_status().await?.into_username();
        self.set_username(username.clone()).await?;
        Ok(username)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Waits for the connection to open. `false` if the client stopped
    /// first.
    pub async fn wait_connected(&self) -> bool {
        self.channel.wait_for_state(ConnectionState::Connected).await
    }

    /// Stops the client and returns the final session state.
    pub async fn shutdown(self) -> Result<SyncSession<ChannelHandle, S>, TandemError> {
        self.channel.shutdown();
        self.join().await
    }

    /// Waits for the client to stop on its own (reconnect attempts
    /// exhausted) and returns the final session state.
    pub async fn join(self) -> Result<SyncSession<ChannelHandle, S>, TandemError> {
        let ClientHandle {
            input,
            session,
            transport,
            ..
        } = self;
        drop(input);
        let session = session.await?;
        transport.await?;
        Ok(session)
    }

    async fn push(&self, event: LocalEvent) -> Result<(), TandemError> {
        self.input
            .send(event)
            .await
            .map_err(|_| TandemError::SessionClosed)
    }
}
