//! Channel bookkeeping shared by the socket tasks and subscription handles.
//!
//! [`ChannelRegistry`] never touches the network. It turns registrations and
//! incoming frames into state changes, outgoing frames and callbacks to run,
//! and the client does the I/O.

use super::{
    ChangeEvent,
    protocol::{self, PhoenixMessage},
};
use crate::models::Table;
use derive_more::Display;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::watch;

/// Lifecycle of a table channel.
///
/// `Created` -> `Subscribed` (join sent) -> `Active` (join acknowledged) ->
/// `Unsubscribed` (last handle released). A rejected join, a server error or
/// a lost socket moves the channel to `Errored`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    #[display("created")]
    Created,
    #[display("subscribed")]
    Subscribed,
    #[display("active")]
    Active,
    #[display("errored")]
    Errored,
    #[display("unsubscribed")]
    Unsubscribed,
}

impl ChannelState {
    /// Whether a join on this channel is still waiting for its answer.
    pub fn is_pending(&self) -> bool {
        matches!(self, ChannelState::Created | ChannelState::Subscribed)
    }
}

pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Channel {
    join_ref: String,
    state: watch::Sender<ChannelState>,
    subscribers: HashMap<u64, ChangeCallback>,
    rejection: Option<String>,
}

impl Channel {
    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    fn current(&self) -> ChannelState {
        *self.state.borrow()
    }
}

/// Result of [`ChannelRegistry::register`].
pub struct Registration {
    pub id: u64,
    pub state: watch::Receiver<ChannelState>,
    /// Join frame to send, only present when the table had no live channel.
    pub join: Option<PhoenixMessage>,
}

/// A change event and the callbacks subscribed to it at arrival time.
pub struct Delivery {
    pub event: ChangeEvent,
    pub callbacks: Vec<ChangeCallback>,
}

impl Delivery {
    pub fn dispatch(self) {
        for callback in &self.callbacks {
            callback(&self.event);
        }
    }
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<Table, Channel>,
    next_id: u64,
    next_ref: u64,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message refs are unique for the lifetime of the registry.
    pub fn next_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    /// Adds a subscriber to the channel of `table`.
    ///
    /// The channel is created, and moved to `Subscribed` with a join frame
    /// to send, when the table has no channel or its channel errored.
    /// Otherwise the subscriber joins the existing channel.
    pub fn register(
        &mut self,
        table: Table,
        access_token: &str,
        callback: ChangeCallback,
    ) -> Registration {
        self.next_id += 1;
        let id = self.next_id;

        let reusable = self
            .channels
            .get(&table)
            .is_some_and(|channel| channel.current() != ChannelState::Errored);

        if reusable {
            if let Some(channel) = self.channels.get_mut(&table) {
                channel.subscribers.insert(id, callback);
                return Registration {
                    id,
                    state: channel.state.subscribe(),
                    join: None,
                };
            }
        }

        let join_ref = self.next_ref();
        let join = PhoenixMessage::join(table, access_token, join_ref.clone());
        let (state, receiver) = watch::channel(ChannelState::Created);

        let channel = Channel {
            join_ref,
            state,
            subscribers: HashMap::from([(id, callback)]),
            rejection: None,
        };
        channel.set_state(ChannelState::Subscribed);
        self.channels.insert(table, channel);

        Registration {
            id,
            state: receiver,
            join: Some(join),
        }
    }

    /// Removes a subscriber. Returns the leave frame to send when it was the
    /// last one on a joined channel.
    pub fn release(&mut self, table: Table, id: u64) -> Option<PhoenixMessage> {
        let channel = self.channels.get_mut(&table)?;

        if channel.subscribers.remove(&id).is_none() || !channel.subscribers.is_empty() {
            return None;
        }

        let channel = self.channels.remove(&table)?;
        let previous = channel.current();
        channel.set_state(ChannelState::Unsubscribed);

        match previous {
            ChannelState::Subscribed | ChannelState::Active => {
                let msg_ref = self.next_ref();
                Some(PhoenixMessage::leave(table, channel.join_ref, msg_ref))
            }
            _ => None,
        }
    }

    /// Applies an incoming frame. Returns the callbacks to run when the frame
    /// carries a row change; they must be run outside of any lock.
    pub fn handle(&mut self, message: PhoenixMessage) -> Option<Delivery> {
        let (table, channel) = self
            .channels
            .iter_mut()
            .find(|(table, _)| protocol::topic_for(**table) == message.topic)?;

        match message.event.as_str() {
            protocol::PHX_REPLY => {
                if message.msg_ref.as_deref() != Some(channel.join_ref.as_str()) {
                    return None;
                }
                match message.reply_status() {
                    Ok(()) => {
                        log::debug!("channel {} joined", message.topic);
                        channel.set_state(ChannelState::Active);
                    }
                    Err(reason) => {
                        logfire::warn!(
                            "Realtime join rejected for {table}: {reason}",
                            table = table.to_string(),
                            reason = reason.clone()
                        );
                        channel.rejection = Some(reason);
                        channel.set_state(ChannelState::Errored);
                    }
                }
                None
            }
            protocol::PHX_ERROR | protocol::PHX_CLOSE => {
                log::warn!("channel {} closed by server ({})", message.topic, message.event);
                channel
                    .rejection
                    .get_or_insert_with(|| format!("channel closed by server ({})", message.event));
                channel.set_state(ChannelState::Errored);
                None
            }
            protocol::POSTGRES_CHANGES => {
                if channel.current() == ChannelState::Errored {
                    return None;
                }
                match protocol::parse_change(&message.payload) {
                    Ok(event) => Some(Delivery {
                        event,
                        callbacks: channel.subscribers.values().cloned().collect(),
                    }),
                    Err(e) => {
                        log::warn!("dropping malformed change on {}: {e}", message.topic);
                        None
                    }
                }
            }
            other => {
                log::debug!("ignoring {other} on {}", message.topic);
                None
            }
        }
    }

    /// Marks every channel errored and forgets them, used when the socket is
    /// gone.
    pub fn close_all(&mut self, reason: &str) {
        for (_, mut channel) in self.channels.drain() {
            channel.rejection = Some(reason.to_string());
            channel.set_state(ChannelState::Errored);
        }
    }

    /// Why the channel of `table` errored, if it did.
    pub fn rejection(&self, table: Table) -> Option<String> {
        self.channels
            .get(&table)
            .and_then(|channel| channel.rejection.clone())
    }

    pub fn subscriber_count(&self, table: Table) -> usize {
        self.channels
            .get(&table)
            .map_or(0, |channel| channel.subscribers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
