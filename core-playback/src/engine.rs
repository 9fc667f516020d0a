//! # Decode Engine Adapter
//!
//! Normalizes control of one [`DecodeEngine`]: it owns the playback rate,
//! volume and loop flag, and implements the rate/seek interaction that every
//! backend needs (a rate change is a flushing seek at the new rate).
//!
//! Every entry point checks the disposed flag first; once [`EngineAdapter::dispose`]
//! has run, commands fail with [`PlaybackError::Disposed`] and queries return `None`.

use crate::error::{PlaybackError, Result};
use bridge_traits::{BufferedRange, DecodeEngine, DecoderInfo, EngineState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct EngineSettings {
    rate: f64,
    volume: f64,
    looping: bool,
    playing: bool,
    /// A non-unit rate that still has to be applied because the position was
    /// unknown when it was requested.
    rate_pending: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
            looping: false,
            playing: false,
            rate_pending: false,
        }
    }
}

/// Adapter around one opened native pipeline.
pub struct EngineAdapter {
    engine: Box<dyn DecodeEngine>,
    settings: Mutex<EngineSettings>,
    disposed: AtomicBool,
}

impl EngineAdapter {
    pub fn new(engine: Box<dyn DecodeEngine>) -> Self {
        Self {
            engine,
            settings: Mutex::new(EngineSettings::default()),
            disposed: AtomicBool::new(false),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(PlaybackError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Flushing seek in place at `rate`. With no position to seek to (before
    /// preroll, mid-flush) the rate is parked until the next `Playing` report.
    fn reseek_at_rate(&self, rate: f64) -> Result<()> {
        let Some(position) = self.engine.query_position() else {
            debug!(rate, "Position unknown; deferring rate change");
            self.settings.lock().rate_pending = true;
            return Ok(());
        };

        self.settings.lock().rate_pending = false;
        debug!(rate, position_ms = position.as_millis() as u64, "Re-seeking at new rate");
        self.engine
            .seek(position, rate)
            .map_err(PlaybackError::command)
    }

    /// Request playback. At a non-unit rate, the rate is re-applied with a
    /// flushing seek right after the play request.
    pub fn play(&self) -> Result<()> {
        self.ensure_live()?;
        self.engine.play().map_err(PlaybackError::command)?;

        let rate = {
            let mut settings = self.settings.lock();
            settings.playing = true;
            settings.rate
        };

        if rate != 1.0 {
            self.reseek_at_rate(rate)?;
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        self.engine.pause().map_err(PlaybackError::command)?;
        self.settings.lock().playing = false;
        Ok(())
    }

    /// Flushing, accurate seek at the current rate.
    pub fn seek(&self, position: Duration) -> Result<()> {
        self.ensure_live()?;
        let rate = self.settings.lock().rate;
        self.engine
            .seek(position, rate)
            .map_err(PlaybackError::command)
    }

    /// Store a new playback rate, re-seeking in place if currently playing.
    pub fn set_rate(&self, rate: f64) -> Result<()> {
        self.ensure_live()?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "playback speed must be a positive number, got {}",
                rate
            )));
        }

        let playing = {
            let mut settings = self.settings.lock();
            settings.rate = rate;
            settings.playing
        };

        if playing {
            self.reseek_at_rate(rate)?;
        } else {
            // The next play re-applies a non-unit rate itself.
            self.settings.lock().rate_pending = false;
        }
        Ok(())
    }

    /// Clamp `volume` to `[0.0, 1.0]` and apply it. Returns the applied value.
    pub fn set_volume(&self, volume: f64) -> Result<f64> {
        self.ensure_live()?;
        if volume.is_nan() {
            return Err(PlaybackError::InvalidArgument(
                "volume must be a number".to_string(),
            ));
        }

        let clamped = volume.clamp(0.0, 1.0);
        self.engine
            .set_volume(clamped)
            .map_err(PlaybackError::command)?;
        self.settings.lock().volume = clamped;
        Ok(clamped)
    }

    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.ensure_live()?;
        self.settings.lock().looping = looping;
        self.engine
            .set_looping(looping)
            .map_err(PlaybackError::command)
    }

    /// Seek to the start and play again. Used for looping at end of stream.
    pub fn restart(&self) -> Result<()> {
        self.seek(Duration::ZERO)?;
        self.play()
    }

    /// Record the state the backend reported, so rate changes know whether
    /// to re-seek. A deferred rate is applied once playback is confirmed.
    pub fn note_state(&self, state: EngineState) {
        let pending_rate = {
            let mut settings = self.settings.lock();
            settings.playing = state == EngineState::Playing;
            (settings.playing && settings.rate_pending).then_some(settings.rate)
        };

        if let Some(rate) = pending_rate {
            if self.is_disposed() {
                return;
            }
            if let Err(e) = self.reseek_at_rate(rate) {
                warn!(rate, error = %e, "Deferred rate change failed");
            }
        }
    }

    pub fn rate(&self) -> f64 {
        self.settings.lock().rate
    }

    pub fn volume(&self) -> f64 {
        self.settings.lock().volume
    }

    pub fn is_looping(&self) -> bool {
        self.settings.lock().looping
    }

    pub fn is_playing(&self) -> bool {
        self.settings.lock().playing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn position(&self) -> Option<Duration> {
        if self.is_disposed() {
            return None;
        }
        self.engine.query_position()
    }

    pub fn duration(&self) -> Option<Duration> {
        if self.is_disposed() {
            return None;
        }
        self.engine.query_duration()
    }

    pub fn buffered_range(&self) -> Option<BufferedRange> {
        if self.is_disposed() {
            return None;
        }
        self.engine.query_buffered_range()
    }

    pub fn decoder_info(&self) -> DecoderInfo {
        if self.is_disposed() {
            return DecoderInfo::default();
        }
        self.engine.decoder_info()
    }

    /// Stop and release the pipeline. Only the first call reaches the engine.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.engine.dispose();
        self.settings.lock().playing = false;
    }
}

impl Drop for EngineAdapter {
    fn drop(&mut self) {
        if !self.is_disposed() {
            warn!("EngineAdapter dropped without dispose; releasing pipeline");
            self.dispose();
        }
    }
}
