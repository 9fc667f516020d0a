//! GStreamer decode backend.
//!
//! Each player gets a `playbin` whose video sink is
//! `videoconvert ! video/x-raw,format=RGBA ! appsink`. Decoded frames are
//! handed to [`EngineCallbacks::on_frame`] straight from the streaming
//! thread; bus messages are drained by a dedicated thread per pipeline and
//! mapped onto [`EngineEvent`]s.

use bridge_traits::{
    error::{BridgeError, Result},
    BufferedRange, DecodeEngine, DecoderInfo, EngineCallbacks, EngineEvent, EngineFactory,
    EngineState, FrameView,
};
use gst::prelude::*;
use ::gstreamer as gst;
use ::gstreamer_app as gst_app;
use ::gstreamer_video as gst_video;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Error code carried by pipeline error events.
pub const GST_ERROR_CODE: &str = "GST_ERROR";

const BUS_POLL_INTERVAL_MS: u64 = 100;

fn op_failed(context: &str, err: impl std::fmt::Display) -> BridgeError {
    BridgeError::OperationFailed(format!("{}: {}", context, err))
}

fn to_clock_time(position: Duration) -> gst::ClockTime {
    gst::ClockTime::from_nseconds(position.as_nanos() as u64)
}

fn to_duration(time: gst::ClockTime) -> Duration {
    Duration::from_nanos(time.nseconds())
}

// ============================================================================
// Factory
// ============================================================================

/// Opens [`GstEngine`]s. Construction initializes GStreamer once.
#[derive(Debug)]
pub struct GstEngineFactory {
    _init: (),
}

impl GstEngineFactory {
    pub fn new() -> Result<Self> {
        gst::init()
            .map_err(|e| BridgeError::NotAvailable(format!("GStreamer init failed: {}", e)))?;

        if gst::ElementFactory::find("playbin").is_none() {
            return Err(BridgeError::NotAvailable(
                "the playbin element is missing; install gst-plugins-base".to_string(),
            ));
        }

        debug!(version = %gst::version_string(), "GStreamer initialized");
        Ok(Self { _init: () })
    }
}

impl EngineFactory for GstEngineFactory {
    fn backend_name(&self) -> &'static str {
        "gstreamer"
    }

    fn open(
        &self,
        uri: &str,
        callbacks: Arc<dyn EngineCallbacks>,
    ) -> Result<Box<dyn DecodeEngine>> {
        let engine = GstEngine::open(uri, callbacks)?;
        Ok(Box::new(engine))
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct GstEngine {
    pipeline: gst::Element,
    appsink: gst_app::AppSink,
    stop: Arc<AtomicBool>,
    bus_thread: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

fn build_video_sink(
    callbacks: Arc<dyn EngineCallbacks>,
) -> Result<(gst::Bin, gst_app::AppSink)> {
    let convert = gst::ElementFactory::make("videoconvert")
        .build()
        .map_err(|e| op_failed("videoconvert unavailable", e))?;

    let appsink = gst_app::AppSink::builder()
        .caps(
            &gst_video::VideoCapsBuilder::new()
                .format(gst_video::VideoFormat::Rgba)
                .build(),
        )
        .max_buffers(1)
        .drop(true)
        .sync(true)
        .build();

    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let Ok(sample) = sink.pull_sample() else {
                    return Ok(gst::FlowSuccess::Ok);
                };
                let (Some(buffer), Some(caps)) = (sample.buffer(), sample.caps()) else {
                    return Ok(gst::FlowSuccess::Ok);
                };
                let Ok(info) = gst_video::VideoInfo::from_caps(caps) else {
                    return Ok(gst::FlowSuccess::Ok);
                };
                if let Ok(map) = buffer.map_readable() {
                    callbacks.on_frame(FrameView::new(map.as_slice(), info.width(), info.height()));
                }
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );

    let bin = gst::Bin::builder().name("video_sink_bin").build();
    bin.add_many([&convert, appsink.upcast_ref()])
        .map_err(|e| op_failed("failed to assemble video sink", e))?;
    gst::Element::link_many([&convert, appsink.upcast_ref()])
        .map_err(|e| op_failed("failed to link video sink", e))?;

    let pad = convert
        .static_pad("sink")
        .ok_or_else(|| BridgeError::OperationFailed("videoconvert has no sink pad".into()))?;
    let ghost = gst::GhostPad::with_target(&pad)
        .map_err(|e| op_failed("failed to create ghost pad", e))?;
    bin.add_pad(&ghost)
        .map_err(|e| op_failed("failed to expose video sink pad", e))?;

    Ok((bin, appsink))
}

fn video_dimensions(appsink: &gst_app::AppSink) -> (u32, u32) {
    appsink
        .static_pad("sink")
        .and_then(|pad| pad.current_caps())
        .and_then(|caps| gst_video::VideoInfo::from_caps(&caps).ok())
        .map(|info| (info.width(), info.height()))
        .unwrap_or((0, 0))
}

/// Drains the pipeline bus until `stop` is raised.
fn run_bus_loop(
    pipeline: gst::Element,
    appsink: gst_app::AppSink,
    callbacks: Arc<dyn EngineCallbacks>,
    stop: Arc<AtomicBool>,
) {
    let Some(bus) = pipeline.bus() else {
        warn!("Pipeline has no bus");
        return;
    };
    let mut prerolled = false;

    while !stop.load(Ordering::Acquire) {
        let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(BUS_POLL_INTERVAL_MS)) else {
            continue;
        };
        if stop.load(Ordering::Acquire) {
            break;
        }

        match msg.view() {
            gst::MessageView::Error(err) => {
                warn!(
                    error = %err.error(),
                    debug = ?err.debug(),
                    "Pipeline error"
                );
                callbacks.on_event(EngineEvent::error(GST_ERROR_CODE, err.error().to_string()));
            }
            gst::MessageView::Eos(_) => callbacks.on_event(EngineEvent::EndOfStream),
            gst::MessageView::Buffering(buffering) => {
                let percent = buffering.percent().clamp(0, 100) as u8;
                callbacks.on_event(EngineEvent::Buffering { percent });
            }
            gst::MessageView::StateChanged(change) => {
                if msg.src() != Some(pipeline.upcast_ref::<gst::Object>()) {
                    continue;
                }

                let current = change.current();
                if current == gst::State::Paused && !prerolled {
                    prerolled = true;
                    let duration = pipeline
                        .query_duration::<gst::ClockTime>()
                        .map(to_duration);
                    let (width, height) = video_dimensions(&appsink);
                    callbacks.on_event(EngineEvent::MetadataReady {
                        duration,
                        width,
                        height,
                    });
                }

                match current {
                    gst::State::Playing => {
                        callbacks.on_event(EngineEvent::StateChanged(EngineState::Playing))
                    }
                    gst::State::Paused => {
                        callbacks.on_event(EngineEvent::StateChanged(EngineState::Paused))
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

impl GstEngine {
    fn open(uri: &str, callbacks: Arc<dyn EngineCallbacks>) -> Result<Self> {
        let pipeline = gst::ElementFactory::make("playbin")
            .property("uri", uri)
            .build()
            .map_err(|e| op_failed("playbin unavailable", e))?;

        let (video_sink, appsink) = build_video_sink(Arc::clone(&callbacks))?;
        pipeline.set_property("video-sink", &video_sink);

        let stop = Arc::new(AtomicBool::new(false));
        let bus_thread = {
            let pipeline = pipeline.clone();
            let appsink = appsink.clone();
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("gst-bus".to_string())
                .spawn(move || run_bus_loop(pipeline, appsink, callbacks, stop))
                .map_err(BridgeError::Io)?
        };

        let engine = Self {
            pipeline,
            appsink,
            stop,
            bus_thread: Mutex::new(Some(bus_thread)),
            disposed: AtomicBool::new(false),
        };

        if let Err(e) = engine.pipeline.set_state(gst::State::Paused) {
            engine.dispose();
            return Err(op_failed("pipeline refused to preroll", e));
        }

        Ok(engine)
    }

    fn set_state(&self, state: gst::State) -> Result<()> {
        self.pipeline
            .set_state(state)
            .map(|_| ())
            .map_err(|e| op_failed("state change failed", e))
    }
}

impl DecodeEngine for GstEngine {
    fn play(&self) -> Result<()> {
        self.set_state(gst::State::Playing)
    }

    fn pause(&self) -> Result<()> {
        self.set_state(gst::State::Paused)
    }

    fn seek(&self, position: Duration, rate: f64) -> Result<()> {
        self.pipeline
            .seek(
                rate,
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                gst::SeekType::Set,
                Some(to_clock_time(position)),
                gst::SeekType::None,
                gst::ClockTime::NONE,
            )
            .map_err(|e| op_failed("seek failed", e))
    }

    fn set_volume(&self, volume: f64) -> Result<()> {
        self.pipeline.set_property("volume", volume);
        Ok(())
    }

    fn query_position(&self) -> Option<Duration> {
        self.pipeline
            .query_position::<gst::ClockTime>()
            .map(to_duration)
    }

    fn query_duration(&self) -> Option<Duration> {
        self.pipeline
            .query_duration::<gst::ClockTime>()
            .map(to_duration)
    }

    fn query_buffered_range(&self) -> Option<BufferedRange> {
        let mut query = gst::query::Buffering::new(gst::Format::Time);
        if !self.pipeline.query(&mut query) {
            return None;
        }

        let (start, stop, _) = query.range();
        match (start, stop) {
            (
                gst::GenericFormattedValue::Time(start),
                gst::GenericFormattedValue::Time(Some(stop)),
            ) if stop > gst::ClockTime::ZERO => Some(BufferedRange::new(
                start.map(to_duration).unwrap_or(Duration::ZERO),
                to_duration(stop),
            )),
            _ => None,
        }
    }

    fn decoder_info(&self) -> DecoderInfo {
        DecoderInfo {
            is_hardware_accelerated: false,
            decoder_name: Some("playbin".to_string()),
            codec: None,
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.stop.store(true, Ordering::Release);
        self.appsink
            .set_callbacks(gst_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(error = %e, "Failed to stop pipeline");
        }

        if let Some(handle) = self.bus_thread.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        debug!("GStreamer pipeline released");
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
