//! # Position Poller
//!
//! Periodic task that turns engine position and buffering queries into
//! `positionChanged` / `bufferingUpdate` events and mirrors the position to
//! the OS media controls.

use crate::emitter::EventEmitter;
use crate::engine::EngineAdapter;
use crate::transport::TransportBridge;
use core_runtime::events::PlaybackEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One poll: query, emit, mirror. A failed query skips its event.
pub(crate) fn poll_once(
    engine: &EngineAdapter,
    emitter: &EventEmitter,
    transport: &Mutex<Option<TransportBridge>>,
) {
    if engine.is_disposed() {
        return;
    }

    if let Some(position) = engine.position() {
        let position_ms = position.as_millis() as u64;
        trace!(position_ms, "Position tick");
        emitter.emit(PlaybackEvent::PositionChanged {
            position: position_ms,
        });

        if let Some(bridge) = transport.lock().as_ref() {
            bridge.publish_position(position);
        }
    }

    if let Some(range) = engine.buffered_range() {
        if !range.is_empty() {
            emitter.emit(PlaybackEvent::BufferingUpdate {
                buffered: range.end.as_millis() as u64,
            });
        }
    }
}

/// Handle to a running poller task.
pub struct PositionPoller {
    cancel: CancellationToken,
}

impl PositionPoller {
    pub(crate) fn spawn(
        handle: &Handle,
        period: Duration,
        engine: Arc<EngineAdapter>,
        emitter: Arc<EventEmitter>,
        transport: Arc<Mutex<Option<TransportBridge>>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => poll_once(&engine, &emitter, &transport),
                }
            }
        });

        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BufferedRange, DecodeEngine, PlayerId};
    use core_runtime::events::EventBus;

    struct FixedEngine {
        position: Mutex<Option<Duration>>,
        buffered: Option<BufferedRange>,
    }

    impl DecodeEngine for FixedEngine {
        fn play(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }
        fn seek(&self, _position: Duration, _rate: f64) -> BridgeResult<()> {
            Ok(())
        }
        fn set_volume(&self, _volume: f64) -> BridgeResult<()> {
            Ok(())
        }
        fn query_position(&self) -> Option<Duration> {
            *self.position.lock()
        }
        fn query_duration(&self) -> Option<Duration> {
            None
        }
        fn query_buffered_range(&self) -> Option<BufferedRange> {
            self.buffered
        }
        fn dispose(&self) {}
    }

    fn setup(
        position: Option<Duration>,
        buffered: Option<BufferedRange>,
    ) -> (
        Arc<EngineAdapter>,
        Arc<EventEmitter>,
        tokio::sync::broadcast::Receiver<core_runtime::events::PlayerEvent>,
    ) {
        let bus = EventBus::new(64);
        let rx = bus.subscribe();
        let engine = Arc::new(EngineAdapter::new(Box::new(FixedEngine {
            position: Mutex::new(position),
            buffered,
        })));
        let emitter = Arc::new(EventEmitter::new(PlayerId::new(1), bus));
        (engine, emitter, rx)
    }

    #[test]
    fn test_poll_emits_position_and_buffering() {
        let buffered = BufferedRange::new(Duration::ZERO, Duration::from_millis(8000));
        let (engine, emitter, mut rx) = setup(Some(Duration::from_millis(1200)), Some(buffered));

        poll_once(&engine, &emitter, &Mutex::new(None));

        assert_eq!(
            rx.try_recv().unwrap().event,
            PlaybackEvent::PositionChanged { position: 1200 }
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            PlaybackEvent::BufferingUpdate { buffered: 8000 }
        );
    }

    #[test]
    fn test_failed_queries_skip_events() {
        let empty = BufferedRange::new(Duration::ZERO, Duration::ZERO);
        let (engine, emitter, mut rx) = setup(None, Some(empty));

        poll_once(&engine, &emitter, &Mutex::new(None));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_ticks_until_cancelled() {
        let (engine, emitter, mut rx) = setup(Some(Duration::from_millis(500)), None);
        let poller = PositionPoller::spawn(
            &Handle::current(),
            Duration::from_millis(200),
            engine,
            emitter,
            Arc::new(Mutex::new(None)),
        );

        tokio::time::sleep(Duration::from_millis(650)).await;
        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 3);

        poller.cancel();
        assert!(poller.is_cancelled());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_err());
    }
}
