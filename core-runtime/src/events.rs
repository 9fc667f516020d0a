//! # Event Bus System
//!
//! Provides the outward event stream of every player instance using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: [`PlaybackEvent`], the per-instance vocabulary
//!   (`initialized`, `playbackStateChanged`, `positionChanged`, ...), wrapped
//!   in a [`PlayerEvent`] envelope that carries the routing id
//! - **EventBus**: Central broadcast channel shared by all instances
//! - **EventStream**: Wrapper for consuming events with filtering, including
//!   the per-instance view returned by [`EventStream::for_player`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │  Player 1   ├──────────────>│           │     subscribe    ┌──────────────┐
//! └─────────────┘               │ EventBus  ├─────────────────>│ host (all)   │
//! ┌─────────────┐     emit      │ (broadcast│                  └──────────────┘
//! │  Player 2   ├──────────────>│  channel) │  for_player(2)   ┌──────────────┐
//! └─────────────┘               │           ├─────────────────>│ player 2 UI  │
//!                               └───────────┘                  └──────────────┘
//! ```
//!
//! ## Ordering
//!
//! Events of one player are received in the order that player emitted them.
//! Nothing is guaranteed across players.
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::PlayerId;
//! use core_runtime::events::{EventBus, EventStream, PlaybackEvent, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut stream = EventStream::for_player(bus.subscribe(), PlayerId::new(7));
//!
//! bus.emit(PlayerEvent::new(PlayerId::new(7), PlaybackEvent::Completed)).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.event, PlaybackEvent::Completed);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; position updates are the usual casualty.
//! - **`RecvError::Closed`**: all senders have been dropped (shutdown).

use bridge_traits::{MemoryPressureLevel, PlayerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position updates arrive every ~200ms per player; this leaves room for a
/// few seconds of backlog across several players.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Playback State
// ============================================================================

/// Lifecycle state of a player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Ready,
    Playing,
    Paused,
    Buffering,
    Completed,
    Disposed,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Uninitialized => "uninitialized",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Completed => "completed",
            PlaybackState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Media Commands
// ============================================================================

/// Command originating from the OS media controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaCommand {
    Play,
    Pause,
    Next,
    Previous,
    Stop,
    /// Absolute seek target in milliseconds.
    SeekTo(u64),
}

impl MediaCommand {
    /// Wire name of the command (`"play"`, `"seekTo"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            MediaCommand::Play => "play",
            MediaCommand::Pause => "pause",
            MediaCommand::Next => "next",
            MediaCommand::Previous => "previous",
            MediaCommand::Stop => "stop",
            MediaCommand::SeekTo(_) => "seekTo",
        }
    }

    pub fn seek_position(&self) -> Option<u64> {
        match self {
            MediaCommand::SeekTo(position) => Some(*position),
            _ => None,
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Event emitted by a single player instance.
///
/// Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlaybackEvent {
    /// Preroll finished. Emitted once per instance.
    Initialized {
        duration: u64,
        width: u32,
        height: u32,
        id: PlayerId,
    },
    PlaybackStateChanged {
        state: PlaybackState,
    },
    PositionChanged {
        position: u64,
    },
    BufferingUpdate {
        buffered: u64,
    },
    Completed,
    Error {
        code: String,
        message: String,
    },
    /// OS transport input surfaced to the host.
    MediaCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seek_position: Option<u64>,
    },
    MemoryPressure {
        level: MemoryPressureLevel,
    },
}

impl PlaybackEvent {
    pub fn state(state: PlaybackState) -> Self {
        PlaybackEvent::PlaybackStateChanged { state }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        PlaybackEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn media_command(command: MediaCommand) -> Self {
        PlaybackEvent::MediaCommand {
            command: command.name().to_string(),
            seek_position: command.seek_position(),
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlaybackEvent::Initialized { .. } => "Player initialized",
            PlaybackEvent::PlaybackStateChanged { .. } => "Playback state changed",
            PlaybackEvent::PositionChanged { .. } => "Playback position updated",
            PlaybackEvent::BufferingUpdate { .. } => "Buffered range updated",
            PlaybackEvent::Completed => "Playback completed",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::MediaCommand { .. } => "Media control command",
            PlaybackEvent::MemoryPressure { .. } => "Memory pressure",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlaybackEvent::Error { .. } => EventSeverity::Error,
            PlaybackEvent::MemoryPressure { .. } => EventSeverity::Warning,
            PlaybackEvent::Initialized { .. }
            | PlaybackEvent::Completed
            | PlaybackEvent::PlaybackStateChanged { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Routing envelope published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEvent {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub event: PlaybackEvent,
}

impl PlayerEvent {
    pub fn new(player_id: PlayerId, event: PlaybackEvent) -> Self {
        Self { player_id, event }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus.
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if nobody is listening. Callers emitting fire-and-forget events
    /// discard that error.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Stream restricted to one player's events.
    pub fn for_player(receiver: Receiver<PlayerEvent>, player_id: PlayerId) -> Self {
        Self::new(receiver).filter(move |event| event.player_id == player_id)
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        use tokio::sync::broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(id: u64, ms: u64) -> PlayerEvent {
        PlayerEvent::new(PlayerId::new(id), PlaybackEvent::PositionChanged { position: ms })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(position(1, 0)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let event = PlayerEvent::new(PlayerId::new(3), PlaybackEvent::Completed);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_stream_for_player_filters_other_instances() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::for_player(bus.subscribe(), PlayerId::new(2));

        bus.emit(position(1, 100)).ok();
        bus.emit(position(2, 200)).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, position(2, 200));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_per_player_order_is_preserved() {
        let bus = EventBus::new(32);
        let mut stream = EventStream::for_player(bus.subscribe(), PlayerId::new(1));

        for ms in [0, 200, 400, 600] {
            bus.emit(position(1, ms)).ok();
            bus.emit(position(9, ms)).ok();
        }

        let mut seen = Vec::new();
        while let Some(Ok(event)) = stream.try_recv() {
            if let PlaybackEvent::PositionChanged { position } = event.event {
                seen.push(position);
            }
        }
        assert_eq!(seen, vec![0, 200, 400, 600]);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(position(1, i * 200)).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(
            PlaybackEvent::error("GST_ERROR", "boom").severity(),
            EventSeverity::Error
        );
        assert_eq!(
            PlaybackEvent::state(PlaybackState::Ready).severity(),
            EventSeverity::Info
        );
        assert_eq!(
            PlaybackEvent::PositionChanged { position: 5 }.severity(),
            EventSeverity::Debug
        );
        assert_eq!(
            PlaybackEvent::MemoryPressure {
                level: MemoryPressureLevel::Warning
            }
            .severity(),
            EventSeverity::Warning
        );
    }

    #[test]
    fn test_event_description() {
        assert_eq!(PlaybackEvent::Completed.description(), "Playback completed");
    }

    #[test]
    fn test_initialized_serialization() {
        let event = PlayerEvent::new(
            PlayerId::new(7),
            PlaybackEvent::Initialized {
                duration: 12_000,
                width: 1920,
                height: 1080,
                id: PlayerId::new(7),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "initialized");
        assert_eq!(json["playerId"], 7);
        assert_eq!(json["duration"], 12_000);
        assert_eq!(json["width"], 1920);
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_state_and_command_serialization() {
        let json = serde_json::to_value(PlaybackEvent::state(PlaybackState::Buffering)).unwrap();
        assert_eq!(json["type"], "playbackStateChanged");
        assert_eq!(json["state"], "buffering");

        let seek = serde_json::to_value(PlaybackEvent::media_command(MediaCommand::SeekTo(1500)))
            .unwrap();
        assert_eq!(seek["type"], "mediaCommand");
        assert_eq!(seek["command"], "seekTo");
        assert_eq!(seek["seekPosition"], 1500);

        let next = serde_json::to_value(PlaybackEvent::media_command(MediaCommand::Next)).unwrap();
        assert_eq!(next["command"], "next");
        assert!(next.get("seekPosition").is_none());
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::default(), PlaybackState::Uninitialized);
        assert_eq!(PlaybackState::Completed.to_string(), "completed");
    }
}
