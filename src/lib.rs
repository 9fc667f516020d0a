//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service` and, through it, `bridge-desktop`).
//! Host applications can depend on `av-player-workspace` and enable
//! `desktop-shims`, `gstreamer` or `mpris` without wiring each crate
//! individually.

#[cfg(any(feature = "desktop-shims", feature = "gstreamer", feature = "mpris"))]
pub use core_service::{CoreService, PlayerRegistry};
