use super::{
    ChangeEvent,
    channel::{ChangeCallback, ChannelRegistry, ChannelState},
    protocol::PhoenixMessage,
};
use crate::{
    connection::Connection,
    consts,
    error::{DataError, DataResult},
    models::Table,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, Weak,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Realtime client bound to one [`Connection`].
///
/// The websocket is opened lazily by the first [`RealtimeClient::subscribe`]
/// and stays open while the client or any of its subscriptions is alive.
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

struct Shared {
    connection: Connection,
    registry: Mutex<ChannelRegistry>,
    socket: Mutex<Option<SocketHandle>>,
    connect_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

/// One opened websocket. `generation` tells sockets of the same client apart
/// so a finished reader only tears down its own socket.
struct SocketHandle {
    generation: u64,
    outgoing: mpsc::UnboundedSender<Message>,
    writer: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.writer.abort();
        self.heartbeat.abort();
        self.reader.abort();
    }
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, ChannelRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn socket(&self) -> MutexGuard<'_, Option<SocketHandle>> {
        self.socket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, message: &PhoenixMessage) -> DataResult<()> {
        let text = message.to_json()?;
        let socket = self.socket();
        let handle = socket
            .as_ref()
            .ok_or_else(|| DataError::connection("realtime socket is not connected"))?;

        handle
            .outgoing
            .send(Message::Text(text))
            .map_err(|_| DataError::connection("realtime socket is closed"))
    }

    /// Drops the socket and errors every channel.
    fn disconnect(&self, reason: &str) {
        // take the handle out before dropping it so the guard is released first
        let handle = self.socket().take();
        drop(handle);
        self.registry().close_all(reason);
    }

    /// Same as [`Shared::disconnect`], but only while `generation` is still
    /// the current socket.
    fn disconnect_generation(&self, generation: u64, reason: &str) {
        let handle = {
            let mut socket = self.socket();
            if socket
                .as_ref()
                .is_some_and(|handle| handle.generation == generation)
            {
                socket.take()
            } else {
                None
            }
        };

        if handle.is_some() {
            drop(handle);
            self.registry().close_all(reason);
        }
    }
}

impl RealtimeClient {
    pub fn new(connection: Connection) -> Self {
        Self {
            shared: Arc::new(Shared {
                connection,
                registry: Mutex::new(ChannelRegistry::new()),
                socket: Mutex::new(None),
                connect_lock: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared
            .socket()
            .as_ref()
            .is_some_and(|handle| !handle.outgoing.is_closed())
    }

    /// Subscribes `callback` to every insert, update and delete on `table`.
    ///
    /// Waits until the server acknowledges the channel join, at most
    /// [`consts::JOIN_TIMEOUT`]. The callback runs on the socket reader task,
    /// so it should hand heavy work off instead of blocking.
    ///
    /// # Errors
    /// * `Configuration` on a placeholder connection, without touching the
    ///   network
    /// * `Connection` when the socket cannot be opened, the join times out or
    ///   the server rejects it
    pub async fn subscribe<F>(&self, table: Table, callback: F) -> DataResult<Subscription>
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.shared.connection.ensure_live()?;
        self.ensure_socket().await?;

        let active = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&active);
        let callback: ChangeCallback = Arc::new(move |event: &ChangeEvent| {
            if gate.load(Ordering::Acquire) {
                callback(event);
            }
        });

        let registration =
            self.shared
                .registry()
                .register(table, self.shared.connection.api_key(), callback);

        let mut subscription = Subscription {
            shared: Arc::clone(&self.shared),
            table,
            id: registration.id,
            state: registration.state,
            active,
            released: false,
        };

        if let Some(join) = registration.join {
            log::debug!("joining {}", join.topic);
            self.shared.send(&join)?;
        }

        let joined = tokio::time::timeout(
            consts::JOIN_TIMEOUT,
            subscription.state.wait_for(|state| !state.is_pending()),
        )
        .await
        .map(|result| result.map(|state| *state));

        match joined {
            Ok(Ok(ChannelState::Active)) => {
                logfire::info!("Subscribed to {table} changes", table = table.to_string());
                Ok(subscription)
            }
            Ok(Ok(ChannelState::Errored)) => {
                let reason = self
                    .shared
                    .registry()
                    .rejection(table)
                    .unwrap_or_else(|| "channel errored".to_string());
                Err(DataError::connection(format!(
                    "subscription to {table} rejected: {reason}"
                )))
            }
            Ok(Ok(state)) => Err(DataError::connection(format!(
                "subscription to {table} ended while joining ({state})"
            ))),
            Ok(Err(_)) => Err(DataError::connection(format!(
                "realtime socket closed while joining {table}"
            ))),
            Err(_) => Err(DataError::connection(format!(
                "timed out after {:?} joining {table}",
                consts::JOIN_TIMEOUT
            ))),
        }
    }

    /// Closes the socket. Live subscriptions move to `Errored`.
    pub fn close(&self) {
        self.shared.disconnect("realtime client closed");
    }

    async fn ensure_socket(&self) -> DataResult<()> {
        let _guard = self.shared.connect_lock.lock().await;

        if self.is_connected() {
            return Ok(());
        }

        // a socket whose writer died may still have a reader and joined
        // channels, none of which carry over to the new socket
        let stale = self.shared.socket().is_some();
        if stale {
            self.shared.disconnect("realtime socket replaced");
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let url = self.shared.connection.realtime_url()?;
        logfire::info!(
            "Opening realtime socket to {host}",
            host = url.host_str().unwrap_or_default().to_string()
        );

        let (stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    log::warn!("realtime write failed: {e}");
                    break;
                }
            }
            let _ = write.close().await;
        });

        let heartbeat = {
            let shared = Arc::downgrade(&self.shared);
            let outgoing = outgoing.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(consts::HEARTBEAT_INTERVAL);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // the first tick completes immediately
                interval.tick().await;

                loop {
                    interval.tick().await;
                    let Some(shared) = shared.upgrade() else { break };
                    let msg_ref = shared.registry().next_ref();
                    let Ok(text) = PhoenixMessage::heartbeat(msg_ref).to_json() else {
                        continue;
                    };
                    if outgoing.send(Message::Text(text)).is_err() {
                        break;
                    }
                }
            })
        };

        let reader = {
            let shared = Arc::downgrade(&self.shared);
            let outgoing = outgoing.clone();
            tokio::spawn(async move {
                let reason = read_loop(&shared, &outgoing, &mut read).await;
                logfire::warn!("Realtime socket closed: {reason}", reason = reason.clone());
                if let Some(shared) = shared.upgrade() {
                    shared.disconnect_generation(generation, &reason);
                }
            })
        };

        *self.shared.socket() = Some(SocketHandle {
            generation,
            outgoing,
            writer,
            heartbeat,
            reader,
        });

        Ok(())
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("connection", &self.shared.connection)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Reads frames until the socket ends. Returns why it ended.
async fn read_loop<S>(
    shared: &Weak<Shared>,
    outgoing: &mpsc::UnboundedSender<Message>,
    read: &mut S,
) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let message = match PhoenixMessage::from_json(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        log::warn!("ignoring unreadable realtime frame: {e}");
                        continue;
                    }
                };
                let Some(shared) = shared.upgrade() else {
                    return "realtime client dropped".to_string();
                };
                // callbacks run after the registry lock is released
                let delivery = shared.registry().handle(message);
                if let Some(delivery) = delivery {
                    delivery.dispatch();
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = outgoing.send(Message::Pong(data));
            }
            Ok(Message::Close(frame)) => {
                return frame
                    .map(|f| format!("closed by server: {}", f.reason))
                    .unwrap_or_else(|| "closed by server".to_string());
            }
            Ok(_) => {}
            Err(e) => return format!("socket error: {e}"),
        }
    }
    "socket stream ended".to_string()
}

/// Live registration of a callback on a table channel.
///
/// Dropping the handle unsubscribes. When the last handle of a table goes
/// away the channel is left on the server.
pub struct Subscription {
    shared: Arc<Shared>,
    table: Table,
    id: u64,
    state: tokio::sync::watch::Receiver<ChannelState>,
    active: Arc<AtomicBool>,
    released: bool,
}

impl Subscription {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn state(&self) -> ChannelState {
        if self.released {
            return ChannelState::Unsubscribed;
        }
        *self.state.borrow()
    }

    /// Stops delivery. Same as dropping the handle.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.active.store(false, Ordering::Release);

        let leave = self.shared.registry().release(self.table, self.id);
        if let Some(leave) = leave {
            log::debug!("leaving {}", leave.topic);
            if let Err(e) = self.shared.send(&leave) {
                log::debug!("leave for {} not sent: {e}", self.table);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
