//! Hand-written test doubles shared by the integration tests.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, BufferedRange, DecodeEngine, DecoderInfo, EngineCallbacks, EngineEvent,
    EngineFactory, FrameSource, FrameSurface, FrameView, MediaMetadata, PlayerId,
    TransportControls, TransportFactory, TransportInput, TransportInputSink, TransportStatus,
};
use core_runtime::events::{EventStream, PlaybackEvent, RecvError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Mock engine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Play,
    Pause,
    Seek(Duration, f64),
    Volume(f64),
    Looping(bool),
    Dispose,
}

/// Scripted engine: records every call and lets the test inject callbacks.
#[derive(Default)]
pub struct MockEngineHandle {
    pub uri: String,
    calls: Mutex<Vec<EngineCall>>,
    position: Mutex<Option<Duration>>,
    buffered: Mutex<Option<BufferedRange>>,
    callbacks: Mutex<Option<Arc<dyn EngineCallbacks>>>,
    dispose_count: AtomicUsize,
}

impl MockEngineHandle {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn set_position(&self, position: Option<Duration>) {
        *self.position.lock() = position;
    }

    pub fn set_buffered(&self, range: Option<BufferedRange>) {
        *self.buffered.lock() = range;
    }

    pub fn emit(&self, event: EngineEvent) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.on_event(event);
        }
    }

    pub fn frame(&self, pixels: &[u8], width: u32, height: u32) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.on_frame(FrameView::new(pixels, width, height));
        }
    }

    /// Callbacks as currently attached. Grab them before dispose to play a
    /// native thread racing the teardown.
    pub fn stale_callbacks(&self) -> Option<Arc<dyn EngineCallbacks>> {
        self.callbacks.lock().clone()
    }

    pub fn preroll(&self, duration_ms: u64, width: u32, height: u32) {
        self.emit(EngineEvent::MetadataReady {
            duration: Some(Duration::from_millis(duration_ms)),
            width,
            height,
        });
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }
}

struct MockEngine(Arc<MockEngineHandle>);

impl DecodeEngine for MockEngine {
    fn play(&self) -> BridgeResult<()> {
        self.0.calls.lock().push(EngineCall::Play);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.0.calls.lock().push(EngineCall::Pause);
        Ok(())
    }

    fn seek(&self, position: Duration, rate: f64) -> BridgeResult<()> {
        self.0.calls.lock().push(EngineCall::Seek(position, rate));
        *self.0.position.lock() = Some(position);
        Ok(())
    }

    fn set_volume(&self, volume: f64) -> BridgeResult<()> {
        self.0.calls.lock().push(EngineCall::Volume(volume));
        Ok(())
    }

    fn set_looping(&self, looping: bool) -> BridgeResult<()> {
        self.0.calls.lock().push(EngineCall::Looping(looping));
        Ok(())
    }

    fn query_position(&self) -> Option<Duration> {
        *self.0.position.lock()
    }

    fn query_duration(&self) -> Option<Duration> {
        None
    }

    fn query_buffered_range(&self) -> Option<BufferedRange> {
        *self.0.buffered.lock()
    }

    fn decoder_info(&self) -> DecoderInfo {
        DecoderInfo {
            is_hardware_accelerated: false,
            decoder_name: Some("mockdec".to_string()),
            codec: Some("h264".to_string()),
        }
    }

    fn dispose(&self) {
        self.0.calls.lock().push(EngineCall::Dispose);
        self.0.dispose_count.fetch_add(1, Ordering::SeqCst);
        *self.0.callbacks.lock() = None;
    }
}

#[derive(Default)]
pub struct MockEngineFactory {
    engines: Mutex<Vec<Arc<MockEngineHandle>>>,
    fail_open: AtomicBool,
}

impl MockEngineFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn last(&self) -> Arc<MockEngineHandle> {
        self.engines
            .lock()
            .last()
            .cloned()
            .expect("no engine opened")
    }

    pub fn opened(&self) -> usize {
        self.engines.lock().len()
    }
}

impl EngineFactory for MockEngineFactory {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn open(
        &self,
        uri: &str,
        callbacks: Arc<dyn EngineCallbacks>,
    ) -> BridgeResult<Box<dyn DecodeEngine>> {
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(
                "no element could handle the uri".to_string(),
            ));
        }

        let handle = Arc::new(MockEngineHandle {
            uri: uri.to_string(),
            ..Default::default()
        });
        *handle.callbacks.lock() = Some(callbacks);
        self.engines.lock().push(Arc::clone(&handle));
        Ok(Box::new(MockEngine(handle)))
    }
}

// ============================================================================
// Recording surface
// ============================================================================

#[derive(Default)]
pub struct RecordingSurface {
    pub sources: Mutex<HashMap<PlayerId, Arc<dyn FrameSource>>>,
    pub notifications: AtomicUsize,
    pub unregistered: Mutex<Vec<PlayerId>>,
}

impl FrameSurface for RecordingSurface {
    fn register(&self, id: PlayerId, source: Arc<dyn FrameSource>) -> BridgeResult<()> {
        self.sources.lock().insert(id, source);
        Ok(())
    }

    fn frame_available(&self, _id: PlayerId) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister(&self, id: PlayerId) {
        self.sources.lock().remove(&id);
        self.unregistered.lock().push(id);
    }
}

// ============================================================================
// Recording transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Metadata(MediaMetadata),
    Status(TransportStatus),
    Position(Duration),
    Shutdown,
}

#[derive(Default)]
pub struct RecordingTransport {
    pub created: AtomicUsize,
    pub calls: Arc<Mutex<Vec<TransportCall>>>,
    pub inputs: Mutex<Option<Arc<dyn TransportInputSink>>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn press(&self, input: TransportInput) {
        let sink = self.inputs.lock().clone();
        if let Some(sink) = sink {
            sink.deliver(input);
        }
    }
}

struct RecordingControls(Arc<Mutex<Vec<TransportCall>>>);

impl TransportControls for RecordingControls {
    fn publish_metadata(&self, metadata: &MediaMetadata) {
        self.0.lock().push(TransportCall::Metadata(metadata.clone()));
    }

    fn publish_status(&self, status: TransportStatus) {
        self.0.lock().push(TransportCall::Status(status));
    }

    fn publish_position(&self, position: Duration) {
        self.0.lock().push(TransportCall::Position(position));
    }

    fn shutdown(&self) {
        self.0.lock().push(TransportCall::Shutdown);
    }
}

impl TransportFactory for RecordingTransport {
    fn create(
        &self,
        _player_id: PlayerId,
        inputs: Arc<dyn TransportInputSink>,
    ) -> BridgeResult<Box<dyn TransportControls>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.inputs.lock() = Some(inputs);
        Ok(Box::new(RecordingControls(Arc::clone(&self.calls))))
    }
}

/// Transport whose OS registration blocks for `delay`.
pub struct SlowTransport {
    pub inner: RecordingTransport,
    pub delay: Duration,
    pub entered: AtomicBool,
}

impl SlowTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: RecordingTransport::default(),
            delay,
            entered: AtomicBool::new(false),
        }
    }

    /// Wait until a `create` call is under way.
    pub async fn wait_until_entered(&self) {
        while !self.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl TransportFactory for SlowTransport {
    fn create(
        &self,
        player_id: PlayerId,
        inputs: Arc<dyn TransportInputSink>,
    ) -> BridgeResult<Box<dyn TransportControls>> {
        self.entered.store(true, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.create(player_id, inputs)
    }
}

// ============================================================================
// Event helpers
// ============================================================================

/// Next event that is not a periodic position/buffering report.
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

/// Let the event loop drain and return whatever non-periodic events are queued.
pub async fn drain_events(stream: &mut EventStream) -> Vec<PlaybackEvent> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut events = Vec::new();
    while let Some(result) = stream.try_recv() {
        match result {
            Ok(event) => match event.event {
                PlaybackEvent::PositionChanged { .. }
                | PlaybackEvent::BufferingUpdate { .. } => {}
                other => events.push(other),
            },
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    events
}

pub fn solid_frame(width: u32, height: u32, value: u8) -> Vec<u8> {
    vec![value; width as usize * height as usize * 4]
}
