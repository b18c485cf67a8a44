//! Reconnecting realtime client.
//!
//! A background driver task owns the connection. Callers only touch shared
//! state (the wanted room, the handlers, the live toggle) and nudge the
//! driver through a command channel. The driver reconciles the wanted room
//! against the room joined on the current connection, so a reconnect rejoins
//! once and a room switch never leaves two rooms joined.

use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ReconnectPolicy, RealtimeSettings};
use crate::connection::{Connection, Connector, WsConnector};
use crate::error::{RealtimeError, Result};
use crate::protocol::{ServerEvent, JOIN_AREA, LEAVE_AREA, REFRESH_DATA};

/// Connection state of a [`RealtimeClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts are used up; call `connect` to start over.
    GaveUp,
}

type Handler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

enum Command {
    /// The wanted room changed.
    SyncRoom,
    Refresh {
        area_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

struct HandlerEntry {
    id: u64,
    /// `None` receives every event.
    event: Option<String>,
    handler: Handler,
}

struct Shared {
    wanted_room: Mutex<Option<String>>,
    joined_room: Mutex<Option<String>>,
    handlers: Mutex<Vec<HandlerEntry>>,
    next_handler_id: AtomicU64,
    live: AtomicBool,
    state: watch::Sender<ConnectionState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "realtime state");
        }
    }

    fn wanted_room(&self) -> Option<String> {
        lock(&self.wanted_room).clone()
    }

    fn dispatch(&self, name: String, data: serde_json::Value) {
        if !self.live.load(Ordering::SeqCst) {
            trace!(event = %name, "live updates paused, event dropped");
            return;
        }
        let event = ServerEvent::parse(&name, data);
        let targets: Vec<Handler> = lock(&self.handlers)
            .iter()
            .filter(|entry| entry.event.as_deref().map_or(true, |e| e == name))
            .map(|entry| Arc::clone(&entry.handler))
            .collect();
        trace!(event = %name, handlers = targets.len(), "relaying event");
        for handler in targets {
            handler(&event);
        }
    }
}

/// Handle returned by [`RealtimeClient::on_event`].
#[must_use = "dropping a Subscription keeps the handler registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove exactly the handler this subscription was created for.
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.handlers).retain(|entry| entry.id != self.id);
        }
    }
}

struct Driver {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Client for the backend's per-area push events.
pub struct RealtimeClient {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    settings: RealtimeSettings,
    driver: Mutex<Option<Driver>>,
}

impl RealtimeClient {
    /// Client over `connector`. Nothing happens until [`connect`](Self::connect).
    pub fn new(settings: RealtimeSettings, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                wanted_room: Mutex::new(None),
                joined_room: Mutex::new(None),
                handlers: Mutex::new(Vec::new()),
                next_handler_id: AtomicU64::new(1),
                live: AtomicBool::new(settings.live_updates),
                state,
            }),
            connector,
            settings,
            driver: Mutex::new(None),
        }
    }

    /// Client connecting over WebSocket to `settings.url`.
    pub fn websocket(settings: RealtimeSettings) -> Result<Self> {
        let connector = Arc::new(WsConnector::new(&settings.url)?);
        Ok(Self::new(settings, connector))
    }

    /// Start the connection driver. A no-op while it is already running.
    /// Must be called within a tokio runtime.
    pub fn connect(&self) {
        let mut driver = lock(&self.driver);
        if driver.as_ref().is_some_and(|d| !d.task.is_finished()) {
            return;
        }
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            self.settings.reconnect,
            self.settings.connect_timeout,
            receiver,
        ));
        *driver = Some(Driver { commands, task });
        info!(url = %self.settings.url, "realtime client started");
    }

    /// Close the connection for good: no reconnect, and the room is cleared.
    pub async fn disconnect(&self) {
        *lock(&self.shared.wanted_room) = None;
        let driver = lock(&self.driver).take();
        if let Some(driver) = driver {
            let _ = driver.commands.send(Command::Shutdown);
            if let Err(e) = driver.task.await {
                warn!("realtime driver ended abnormally: {}", e);
            }
        }
        *lock(&self.shared.joined_room) = None;
        self.shared.set_state(ConnectionState::Disconnected);
        info!("realtime client disconnected");
    }

    /// Subscribe to an area's room, leaving the current one first. While
    /// disconnected the room is remembered and joined on connect.
    pub fn join_room(&self, area_id: &str) -> Result<()> {
        let area_id = area_id.trim();
        if area_id.is_empty() {
            return Err(RealtimeError::Argument("area id must not be empty".to_string()));
        }
        {
            let mut wanted = lock(&self.shared.wanted_room);
            if wanted.as_deref() == Some(area_id) {
                return Ok(());
            }
            *wanted = Some(area_id.to_string());
        }
        debug!(area_id, "room wanted");
        self.command(Command::SyncRoom);
        Ok(())
    }

    /// Leave `area_id` if it is the active room; otherwise nothing happens.
    pub fn leave_room(&self, area_id: &str) {
        {
            let mut wanted = lock(&self.shared.wanted_room);
            if wanted.as_deref() != Some(area_id.trim()) {
                debug!(area_id, "leave ignored, not the active room");
                return;
            }
            *wanted = None;
        }
        self.command(Command::SyncRoom);
    }

    /// Room the client wants to be in.
    pub fn active_room(&self) -> Option<String> {
        self.shared.wanted_room()
    }

    /// Room joined on the current connection.
    pub fn joined_room(&self) -> Option<String> {
        lock(&self.shared.joined_room).clone()
    }

    /// Ask the server to reprocess an area; the outcome arrives as a
    /// `refresh-complete` event.
    pub async fn refresh_area(&self, area_id: &str) -> Result<()> {
        let area_id = area_id.trim();
        if area_id.is_empty() {
            return Err(RealtimeError::Argument("area id must not be empty".to_string()));
        }
        if self.state() != ConnectionState::Connected {
            return Err(RealtimeError::NotConnected);
        }
        let (reply, outcome) = oneshot::channel();
        if !self.command(Command::Refresh {
            area_id: area_id.to_string(),
            reply,
        }) {
            return Err(RealtimeError::NotConnected);
        }
        outcome.await.unwrap_or(Err(RealtimeError::NotConnected))
    }

    /// Register `handler` for events named `event`.
    pub fn on_event<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.register(Some(event.to_string()), Arc::new(handler))
    }

    /// Register `handler` for every event.
    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, event: Option<String>, handler: Handler) -> Subscription {
        let id = self.shared.next_handler_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.shared.handlers).push(HandlerEntry { id, event, handler });
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Pause or resume relaying server events. The connection and the room
    /// are left alone.
    pub fn set_live_updates(&self, enabled: bool) {
        self.shared.live.store(enabled, Ordering::SeqCst);
        info!(enabled, "live updates");
    }

    /// Flip live updates; returns the new setting.
    pub fn toggle_live_updates(&self) -> bool {
        let enabled = !self.shared.live.fetch_xor(true, Ordering::SeqCst);
        info!(enabled, "live updates");
        enabled
    }

    pub fn live_updates(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Hand a command to the running driver. False when there is none.
    fn command(&self, command: Command) -> bool {
        match lock(&self.driver).as_ref() {
            Some(driver) => driver.commands.send(command).is_ok(),
            None => false,
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

async fn run(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    connect_timeout: std::time::Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut attempt: u32 = 0;
    loop {
        shared.set_state(ConnectionState::Connecting);
        match tokio::time::timeout(connect_timeout, connector.connect()).await {
            Ok(Ok(mut connection)) => {
                if attempt > 0 {
                    info!(attempt, "realtime connection restored");
                } else {
                    info!("realtime connection established");
                }
                attempt = 0;
                shared.set_state(ConnectionState::Connected);

                let end = session(&shared, connection.as_mut(), &mut commands).await;
                *lock(&shared.joined_room) = None;
                match end {
                    SessionEnd::Shutdown => {
                        connection.close().await;
                        shared.set_state(ConnectionState::Disconnected);
                        return;
                    }
                    SessionEnd::Lost(reason) => warn!("realtime connection lost: {}", reason),
                }
            }
            Ok(Err(e)) => warn!(attempt, "realtime connect failed: {}", e),
            Err(_) => warn!(
                attempt,
                timeout_secs = connect_timeout.as_secs(),
                "realtime connect timed out"
            ),
        }

        shared.set_state(ConnectionState::Disconnected);
        attempt += 1;
        let Some(delay) = policy.delay_for(attempt) else {
            error!(
                attempts = policy.max_attempts,
                "giving up on the realtime connection"
            );
            shared.set_state(ConnectionState::GaveUp);
            return;
        };
        info!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnecting"
        );
        if !wait_offline(delay, &mut commands).await {
            shared.set_state(ConnectionState::Disconnected);
            return;
        }
    }
}

/// Sleep out a backoff delay while answering commands. False on shutdown.
async fn wait_offline(
    delay: std::time::Duration,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                None | Some(Command::Shutdown) => return false,
                Some(Command::Refresh { reply, .. }) => {
                    let _ = reply.send(Err(RealtimeError::NotConnected));
                }
                // Picked up by the reconcile after reconnecting.
                Some(Command::SyncRoom) => {}
            },
        }
    }
}

async fn session(
    shared: &Shared,
    connection: &mut dyn Connection,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> SessionEnd {
    let mut joined: Option<String> = None;
    if let Err(e) = reconcile_room(shared, connection, &mut joined).await {
        return SessionEnd::Lost(e.to_string());
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(Command::Shutdown) => return SessionEnd::Shutdown,
                Some(Command::SyncRoom) => {
                    if let Err(e) = reconcile_room(shared, connection, &mut joined).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                Some(Command::Refresh { area_id, reply }) => {
                    let sent = connection.emit(REFRESH_DATA, json!(area_id)).await;
                    let lost = sent.as_ref().err().map(|e| e.to_string());
                    if sent.is_ok() {
                        info!(area_id = %area_id, "area refresh requested");
                    }
                    let _ = reply.send(sent);
                    if let Some(reason) = lost {
                        return SessionEnd::Lost(reason);
                    }
                }
            },
            incoming = connection.next_event() => match incoming {
                Ok(Some((name, data))) => shared.dispatch(name, data),
                Ok(None) => return SessionEnd::Lost("closed by server".to_string()),
                Err(e) => return SessionEnd::Lost(e.to_string()),
            },
        }
    }
}

/// Bring the room joined on the wire in line with the wanted room.
async fn reconcile_room(
    shared: &Shared,
    connection: &mut dyn Connection,
    joined: &mut Option<String>,
) -> Result<()> {
    let wanted = shared.wanted_room();
    if *joined == wanted {
        return Ok(());
    }
    if let Some(old) = joined.take() {
        *lock(&shared.joined_room) = None;
        connection.emit(LEAVE_AREA, json!(old)).await?;
        info!(area_id = %old, "left area room");
    }
    if let Some(new) = wanted {
        connection.emit(JOIN_AREA, json!(new)).await?;
        info!(area_id = %new, "joined area room");
        *lock(&shared.joined_room) = Some(new.clone());
        *joined = Some(new);
    }
    Ok(())
}
