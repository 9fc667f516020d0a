//! Per-instance gate in front of the shared [`EventBus`].

use bridge_traits::PlayerId;
use core_runtime::events::{EventBus, PlaybackEvent, PlayerEvent};
use parking_lot::RwLock;

/// Publishes one player's events until closed.
///
/// Emission holds the read side of the gate, so once [`EventEmitter::close`]
/// returns no further event for this player reaches the bus.
pub(crate) struct EventEmitter {
    player_id: PlayerId,
    bus: EventBus,
    open: RwLock<bool>,
}

impl EventEmitter {
    pub(crate) fn new(player_id: PlayerId, bus: EventBus) -> Self {
        Self {
            player_id,
            bus,
            open: RwLock::new(true),
        }
    }

    /// Returns `false` if the emitter is closed. Having no subscribers is not
    /// an error.
    pub(crate) fn emit(&self, event: PlaybackEvent) -> bool {
        let open = self.open.read();
        if !*open {
            return false;
        }
        let _ = self.bus.emit(PlayerEvent::new(self.player_id, event));
        true
    }

    pub(crate) fn close(&self) {
        *self.open.write() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_emitter_drops_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let emitter = EventEmitter::new(PlayerId::new(4), bus);

        assert!(emitter.emit(PlaybackEvent::Completed));
        emitter.close();
        assert!(!emitter.emit(PlaybackEvent::Completed));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.player_id, PlayerId::new(4));
        assert!(rx.try_recv().is_err());
    }
}
