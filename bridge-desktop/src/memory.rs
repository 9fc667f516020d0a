//! Memory pressure sampling from `/proc/meminfo`.

use bridge_traits::{
    error::Result, MemoryPressureLevel, MemoryPressureMonitor,
};
use std::path::PathBuf;
use tracing::trace;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Reads `MemTotal` and `MemAvailable` and classifies the free ratio.
///
/// Systems without `/proc/meminfo` (or kernels too old to report
/// `MemAvailable`) never report pressure.
#[derive(Debug, Clone)]
pub struct ProcMeminfoMonitor {
    path: PathBuf,
}

impl ProcMeminfoMonitor {
    pub fn new() -> Self {
        Self::with_path(MEMINFO_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMeminfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts `(MemTotal, MemAvailable)` in kB.
pub fn parse_meminfo(contents: &str) -> Option<(u64, u64)> {
    let mut total = None;
    let mut available = None;

    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest.split_whitespace().next().and_then(|v| v.parse().ok());
        match key {
            "MemTotal" => total = value,
            "MemAvailable" => available = value,
            _ => {}
        }
        if total.is_some() && available.is_some() {
            break;
        }
    }

    Some((total?, available?))
}

impl MemoryPressureMonitor for ProcMeminfoMonitor {
    fn sample(&self) -> Result<Option<MemoryPressureLevel>> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return Ok(None);
        };

        let Some((total, available)) = parse_meminfo(&contents) else {
            return Ok(None);
        };
        if total == 0 {
            return Ok(None);
        }

        let ratio = available as f64 / total as f64;
        trace!(total_kb = total, available_kb = available, ratio, "Sampled meminfo");
        Ok(MemoryPressureLevel::from_free_ratio(ratio))
    }
}
