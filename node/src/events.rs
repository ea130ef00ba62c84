//! Events generated by the block service.

use std::fmt;
use std::panic::Location;
use std::time::SystemTime;

use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// An error returned from the [`EventSubscriber::recv`].
#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    /// Node and all its event senders are closed.
    #[error("Channel closed")]
    Closed,
}

/// An error returned from the [`EventSubscriber::try_recv`].
#[derive(Debug, thiserror::Error)]
pub enum TryRecvError {
    /// The channel is currently empty.
    #[error("Channel empty")]
    Empty,
    /// Node and all its event senders are closed.
    #[error("Channel closed")]
    Closed,
}

/// A channel which users can subscribe for events.
#[derive(Debug)]
pub struct EventChannel {
    tx: broadcast::Sender<NodeEventInfo>,
}

/// `EventPublisher` is used to broadcast events generated by [`BlockService`] to subscribers.
///
/// [`BlockService`]: crate::block_service::BlockService
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<NodeEventInfo>,
}

/// `EventSubscriber` can be used by users to receive events from [`BlockService`].
///
/// [`BlockService`]: crate::block_service::BlockService
#[derive(Debug)]
pub struct EventSubscriber {
    rx: broadcast::Receiver<NodeEventInfo>,
}

impl EventChannel {
    /// Create a new `EventChannel`.
    pub fn new() -> EventChannel {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventChannel { tx }
    }

    /// Creates a new [`EventPublisher`].
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Creates a new [`EventSubscriber`].
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher {
    #[track_caller]
    pub(crate) fn send(&self, event: NodeEvent) {
        let time = SystemTime::now();
        let location: &'static Location<'static> = Location::caller();

        // Error is produced if there aren't any subscribers. Since this is
        // a valid case, we ignore the error.
        let _ = self.tx.send(NodeEventInfo {
            event,
            time,
            file_path: location.file(),
            file_line: location.line(),
        });
    }
}

impl EventSubscriber {
    /// Receive an event from the channel.
    ///
    /// Slow subscribers skip the events they lagged behind on.
    pub async fn recv(&mut self) -> Result<NodeEventInfo, RecvError> {
        loop {
            match self.rx.recv().await {
                Ok(val) => return Ok(val),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Slow consumer. We will receive a message on the next call.
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Err(RecvError::Closed),
            }
        }
    }

    /// Attempts to receive an already queued event from the channel.
    pub fn try_recv(&mut self) -> Result<NodeEventInfo, TryRecvError> {
        loop {
            match self.rx.try_recv() {
                Ok(val) => return Ok(val),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    // Slow consumer. We will receive a message on the next call.
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty) => return Err(TryRecvError::Empty),
                Err(broadcast::error::TryRecvError::Closed) => return Err(TryRecvError::Closed),
            }
        }
    }
}

/// This struct include the [`NodeEvent`] and some extra information about the event.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEventInfo {
    /// The event
    pub event: NodeEvent,
    /// When the event was generated.
    pub time: SystemTime,
    /// Which file generated the event.
    pub file_path: &'static str,
    /// Which line in the file generated the event.
    pub file_line: u32,
}

/// The events that the block service can generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum NodeEvent {
    /// Block service subscribed to new blocks and started its worker.
    BlockServiceStarted,

    /// Block service was stopped.
    BlockServiceStopped,

    /// A block was extended, stored and added to the cache.
    BlockProcessed {
        /// The height of the block.
        height: u64,
        /// Width of the extended data square.
        square_width: u16,
        /// Hash of the data availability header of the block.
        dah_hash: String,
    },

    /// A block was dropped because of an error.
    BlockDropped {
        /// The height of the block.
        height: u64,
        /// The reason of the drop.
        error: String,
    },

    /// Block service worker stopped because of a fatal error.
    FatalBlockServiceError {
        /// The error that stopped the worker.
        error: String,
    },
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeEvent::BlockServiceStarted => write!(f, "Block service started."),
            NodeEvent::BlockServiceStopped => write!(f, "Block service stopped."),
            NodeEvent::BlockProcessed {
                height,
                square_width,
                dah_hash,
            } => {
                write!(
                    f,
                    "Block {height} processed. Square: {square_width}x{square_width}, DAH hash: {dah_hash}."
                )
            }
            NodeEvent::BlockDropped { height, error } => {
                write!(f, "Block {height} dropped: {error}")
            }
            NodeEvent::FatalBlockServiceError { error } => {
                write!(f, "Block service stopped because of a fatal error: {error}")
            }
        }
    }
}
