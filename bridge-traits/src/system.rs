//! System resource monitoring.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Coarse memory pressure reported to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressureLevel {
    Warning,
    Critical,
}

impl MemoryPressureLevel {
    /// Classify a free-memory ratio (`0.0..=1.0`).
    ///
    /// Below 5% is critical, below 15% is a warning, anything else is normal.
    pub fn from_free_ratio(ratio: f64) -> Option<Self> {
        if ratio < 0.05 {
            Some(Self::Critical)
        } else if ratio < 0.15 {
            Some(Self::Warning)
        } else {
            None
        }
    }
}

/// Samples system memory pressure.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryPressureMonitor: Send + Sync {
    /// Returns `Ok(None)` when memory is not under pressure.
    fn sample(&self) -> Result<Option<MemoryPressureLevel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_free_ratio() {
        assert_eq!(
            MemoryPressureLevel::from_free_ratio(0.01),
            Some(MemoryPressureLevel::Critical)
        );
        assert_eq!(
            MemoryPressureLevel::from_free_ratio(0.10),
            Some(MemoryPressureLevel::Warning)
        );
        assert_eq!(MemoryPressureLevel::from_free_ratio(0.5), None);
    }

    #[test]
    fn test_mock_monitor() {
        let mut monitor = MockMemoryPressureMonitor::new();
        monitor
            .expect_sample()
            .times(1)
            .returning(|| Ok(Some(MemoryPressureLevel::Warning)));
        assert_eq!(
            monitor.sample().unwrap(),
            Some(MemoryPressureLevel::Warning)
        );
    }
}
