//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (decode backend,
//! frame surface, OS media controls, memory monitor) into the player core and
//! exposes the host command surface. Desktop apps typically enable the
//! `desktop-shims` feature, which fills in the `bridge-desktop` defaults for
//! anything the host does not inject; `gstreamer` and `mpris` add the default
//! engine and media controls.

pub mod command;
pub mod error;
pub mod registry;
mod watcher;

pub use command::{CommandResponse, PlayerCommand};
pub use error::{CoreError, Result};
pub use registry::PlayerRegistry;

use bridge_traits::PlayerId;
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct ServiceInner {
    registry: Arc<PlayerRegistry>,
    bus: EventBus,
    watcher: Option<CancellationToken>,
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        if let Some(watcher) = &self.watcher {
            watcher.cancel();
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Create a service from a validated configuration.
    ///
    /// Must be called within a Tokio runtime: players and the memory watcher
    /// run their tasks on it.
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let handle = Handle::try_current().map_err(|e| {
            CoreError::InitializationFailed(format!("a Tokio runtime is required: {}", e))
        })?;

        let bus = EventBus::new(config.player.event_buffer_size);
        let registry = Arc::new(PlayerRegistry::new(&config, bus.clone()));

        let watcher = match (&config.memory_monitor, config.player.memory_poll_interval()) {
            (Some(monitor), Some(period)) => Some(watcher::spawn(
                &handle,
                Arc::clone(monitor),
                period,
                Arc::downgrade(&registry),
            )),
            _ => None,
        };

        info!(
            backend = config.engine_factory.backend_name(),
            frame_surface = config.frame_surface.is_some(),
            transport = config.transport_factory.is_some(),
            memory_watcher = watcher.is_some(),
            "Core service started"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                registry,
                bus,
                watcher,
            }),
        })
    }

    /// The player command surface.
    pub fn registry(&self) -> Arc<PlayerRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn execute(&self, command: PlayerCommand) -> Result<CommandResponse> {
        self.inner.registry.execute(command)
    }

    /// Events from every player.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.bus.subscribe())
    }

    /// Events from one player. See [`PlayerRegistry::events`] for which
    /// events the first stream includes.
    pub fn events(&self, id: PlayerId) -> Result<EventStream> {
        self.inner.registry.events(id)
    }

    /// Stop the memory watcher and dispose every player.
    pub fn shutdown(&self) {
        if let Some(watcher) = &self.inner.watcher {
            watcher.cancel();
        }
        self.inner.registry.dispose_all();
        info!("Core service shut down");
    }
}

/// Convenience bootstrapper for desktop hosts: every bridge comes from
/// `bridge-desktop`.
///
/// ```
/// # #[cfg(feature = "gstreamer")]
/// # async fn example() -> core_service::Result<()> {
/// use bridge_traits::MediaSource;
///
/// let core = core_service::bootstrap_desktop()?;
/// let id = core.registry().create(&MediaSource::network("https://example.com/a.mp4"))?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder().build()?;
    CoreService::bootstrap(config)
}
