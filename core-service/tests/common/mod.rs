//! Scripted backend for registry-level tests.
//!
//! Unlike a bare recorder, [`ScriptedFactory`] behaves like a well-mannered
//! pipeline: it prerolls on open and echoes state changes for play/pause, so
//! tests can drive the full host command flow.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, BufferedRange, DecodeEngine, EngineCallbacks, EngineEvent, EngineFactory,
    EngineState, MediaSource, SourceResolver,
};
use core_runtime::config::{CoreConfig, PlayerSettings};
use core_runtime::events::{EventStream, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DURATION_MS: u64 = 12_000;
pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;

pub struct ScriptedEngine {
    callbacks: Arc<dyn EngineCallbacks>,
    position: Mutex<Duration>,
    disposed: Arc<AtomicUsize>,
}

impl DecodeEngine for ScriptedEngine {
    fn play(&self) -> BridgeResult<()> {
        self.callbacks
            .on_event(EngineEvent::StateChanged(EngineState::Playing));
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.callbacks
            .on_event(EngineEvent::StateChanged(EngineState::Paused));
        Ok(())
    }

    fn seek(&self, position: Duration, _rate: f64) -> BridgeResult<()> {
        *self.position.lock() = position;
        Ok(())
    }

    fn set_volume(&self, _volume: f64) -> BridgeResult<()> {
        Ok(())
    }

    fn query_position(&self) -> Option<Duration> {
        Some(*self.position.lock())
    }

    fn query_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(DURATION_MS))
    }

    fn query_buffered_range(&self) -> Option<BufferedRange> {
        None
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opens [`ScriptedEngine`]s. URIs containing `broken` fail to open.
#[derive(Default)]
pub struct ScriptedFactory {
    pub opened: Mutex<Vec<String>>,
    pub disposed: Arc<AtomicUsize>,
}

impl EngineFactory for ScriptedFactory {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    fn open(
        &self,
        uri: &str,
        callbacks: Arc<dyn EngineCallbacks>,
    ) -> BridgeResult<Box<dyn DecodeEngine>> {
        if uri.contains("broken") {
            return Err(BridgeError::OperationFailed(format!(
                "no decoder for {}",
                uri
            )));
        }

        self.opened.lock().push(uri.to_string());
        callbacks.on_event(EngineEvent::MetadataReady {
            duration: Some(Duration::from_millis(DURATION_MS)),
            width: WIDTH,
            height: HEIGHT,
        });
        callbacks.on_event(EngineEvent::StateChanged(EngineState::Paused));

        Ok(Box::new(ScriptedEngine {
            callbacks,
            position: Mutex::new(Duration::ZERO),
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

pub struct TestResolver;

impl SourceResolver for TestResolver {
    fn resolve(&self, source: &MediaSource) -> BridgeResult<String> {
        match source {
            MediaSource::Network { url } => Ok(url.clone()),
            MediaSource::File { file_path } => Ok(format!("file://{}", file_path)),
            MediaSource::Asset { asset_path } => {
                if asset_path.starts_with('/') {
                    Err(BridgeError::InvalidInput(
                        "asset paths must be relative".to_string(),
                    ))
                } else {
                    Ok(format!("file:///app/data/flutter_assets/{}", asset_path))
                }
            }
        }
    }
}

pub fn settings() -> PlayerSettings {
    PlayerSettings::default()
        .with_position_poll_interval(Duration::from_millis(20))
        .with_memory_poll_interval(None)
}

pub fn config(factory: Arc<ScriptedFactory>) -> CoreConfig {
    CoreConfig::builder()
        .engine_factory(factory)
        .source_resolver(Arc::new(TestResolver))
        .player_settings(settings())
        .build()
        .expect("valid test config")
}

pub async fn next_event(stream: &mut EventStream) -> PlaybackEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed");
        match event.event {
            PlaybackEvent::PositionChanged { .. } | PlaybackEvent::BufferingUpdate { .. } => {
                continue
            }
            other => return other,
        }
    }
}

/// Wait for a position report at or past `at_least_ms`.
pub async fn wait_for_position(stream: &mut EventStream, at_least_ms: u64) -> u64 {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("timed out waiting for position")
            .expect("event bus closed");
        if let PlaybackEvent::PositionChanged { position } = event.event {
            if position >= at_least_ms {
                return position;
            }
        }
    }
}
