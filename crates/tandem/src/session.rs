//! The session controller.
//!
//! [`SyncSession`] is the one object that owns all client-side state: the
//! dispatcher (presence and chat), the render surface, the pointer capture
//! flag, and the mirrored connection state. Every mutation happens inside
//! one of its named handlers, called from a single task by [`SyncSession::run`].
//!
//! ```text
//!   TransportEvent ──→ on_connecting / on_open / on_frame / on_close / on_gave_up
//!   LocalEvent     ──→ on_pointer_move / on_chat_submit / on_identity_change / on_resize
//! ```

use std::ops::ControlFlow;

use tandem_protocol::{Codec, JsonCodec, Username};
use tandem_state::{PresenceRenderer, Surface, Viewport};
use tandem_transport::{ConnectionState, FrameSink, SendOutcome, TransportEvent};
use tokio::sync::mpsc;

use crate::dispatcher::{Applied, DispatchError, Dispatcher};

/// Shown when chat is submitted without a username.
pub const UNAUTHENTICATED_NOTICE: &str = "You must be logged in to send messages.";

/// Shown when the reconnect policy gives up.
pub const GAVE_UP_NOTICE: &str = "Connection lost. Reconnect attempts exhausted.";

/// Something the local user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEvent {
    PointerMoved { x: i64, y: i64 },
    ChatSubmitted(String),
    /// Logged in (`Some`) or out (`None`).
    IdentityChanged(Option<Username>),
    Resized(Viewport),
}

/// Whether pointer moves are being broadcast.
///
/// Enabled when the connection opens and disabled when it closes;
/// `activations` counts how many times it was switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerCapture {
    enabled: bool,
    activations: u32,
}

impl PointerCapture {
    /// Returns `true` if this call switched it on.
    pub fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        self.activations += 1;
        true
    }

    /// Returns `true` if this call switched it off.
    pub fn disable(&mut self) -> bool {
        std::mem::replace(&mut self.enabled, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }
}

/// Single owner of the client's state.
pub struct SyncSession<K: FrameSink, S: Surface, C: Codec = JsonCodec> {
    dispatcher: Dispatcher<C>,
    sink: K,
    surface: S,
    renderer: PresenceRenderer,
    capture: PointerCapture,
    state: ConnectionState,
}

impl<K: FrameSink, S: Surface, C: Codec> SyncSession<K, S, C> {
    pub fn new(dispatcher: Dispatcher<C>, sink: K, mut surface: S) -> Self {
        surface.set_status(ConnectionState::Disconnected);
        Self {
            dispatcher,
            sink,
            surface,
            renderer: PresenceRenderer::new(),
            capture: PointerCapture::default(),
            state: ConnectionState::Disconnected,
        }
    }

    // --- transport lifecycle -------------------------------------------

    /// Routes one transport event to its handler. `Break` means the
    /// transport has stopped for good.
    pub fn handle_transport(&mut self, event: TransportEvent) -> ControlFlow<()> {
        match event {
            TransportEvent::Connecting { attempt } => self.on_connecting(attempt),
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Frame(frame) => self.on_frame(&frame),
            TransportEvent::Closed(reason) => {
                self.on_close();
                if !reason.is_abnormal() {
                    return ControlFlow::Break(());
                }
            }
            TransportEvent::GaveUp => {
                self.on_gave_up();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub fn on_connecting(&mut self, attempt: u32) {
        tracing::debug!(attempt, "connecting to broker");
        self.set_state(ConnectionState::Connecting);
    }

    pub fn on_open(&mut self) {
        self.set_state(ConnectionState::Connected);
        if self.capture.enable() {
            tracing::debug!(
                activations = self.capture.activations(),
                "pointer capture enabled"
            );
        }
    }

    pub fn on_frame(&mut self, frame: &[u8]) {
        match self.dispatcher.dispatch_inbound(frame) {
            Some(Applied::Chat) => {
                if let Some(entry) = self.dispatcher.chat().last() {
                    self.surface.append_chat_line(entry);
                }
            }
            Some(Applied::Presence) => self.render_presence(),
            None => {}
        }
    }

    pub fn on_close(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        if self.capture.disable() {
            tracing::debug!("pointer capture disabled");
        }
    }

    pub fn on_gave_up(&mut self) {
        self.on_close();
        self.surface.notify(GAVE_UP_NOTICE);
    }

    // --- local input ---------------------------------------------------

    /// Routes one local event to its handler.
    pub fn handle_local(&mut self, event: LocalEvent) {
        match event {
            LocalEvent::PointerMoved { x, y } => {
                self.on_pointer_move(x, y);
            }
            LocalEvent::ChatSubmitted(text) => {
                // Failures are already surfaced through the surface.
                let _ = self.on_chat_submit(&text);
            }
            LocalEvent::IdentityChanged(username) => self.on_identity_change(username),
            LocalEvent::Resized(viewport) => self.on_resize(viewport),
        }
    }

    /// Broadcasts the pointer if capture is on. Returns whether a frame was
    /// queued.
    pub fn on_pointer_move(&mut self, x: i64, y: i64) -> bool {
        if !self.capture.is_enabled() {
            return false;
        }
        match self.dispatcher.pointer_moved(&self.sink, x, y) {
            Ok(outcome) => outcome == SendOutcome::Queued,
            Err(e) => {
                tracing::warn!(error = %e, "cursor update not sent");
                false
            }
        }
    }

    pub fn on_chat_submit(&mut self, text: &str) -> Result<SendOutcome, DispatchError> {
        let result = self.dispatcher.submit_chat(&self.sink, text);
        match &result {
            Ok(SendOutcome::Queued) => tracing::debug!("chat queued"),
            Ok(SendOutcome::Dropped) => tracing::debug!("chat dropped while disconnected"),
            Err(DispatchError::Unauthenticated) => self.surface.notify(UNAUTHENTICATED_NOTICE),
            Err(DispatchError::EmptyMessage) => {}
            Err(e) => tracing::warn!(error = %e, "chat not sent"),
        }
        result
    }

    pub fn on_identity_change(&mut self, username: Option<Username>) {
        tracing::info!(username = ?username.as_ref().map(Username::as_str), "local user changed");
        self.dispatcher.set_username(username);
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.dispatcher.set_viewport(viewport);
        self.render_presence();
    }

    // --- event loop ----------------------------------------------------

    /// Processes transport events and local input until the transport
    /// stops, then hands the session back.
    ///
    /// A closed `input` only stops local input; the loop keeps applying
    /// remote events. Input already queued when the loop ends is still
    /// applied, so the returned session reflects it.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut input: mpsc::Receiver<LocalEvent>,
    ) -> Self {
        let mut input_open = true;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if self.handle_transport(event).is_break() {
                        break;
                    }
                }
                local = input.recv(), if input_open => match local {
                    Some(local) => self.handle_local(local),
                    None => input_open = false,
                },
            }
        }
        while let Ok(local) = input.try_recv() {
            self.handle_local(local);
        }
        tracing::debug!("session loop finished");
        self
    }

    // --- accessors -----------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn capture(&self) -> &PointerCapture {
        &self.capture
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            self.surface.set_status(state);
        }
    }

    fn render_presence(&mut self) {
        let d = &self.dispatcher;
        self.renderer
            .render(d.presence(), d.participant(), d.viewport(), &mut self.surface);
    }
}
