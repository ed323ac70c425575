//! CPU utilisation from `/proc/stat`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::json;

use crate::collector::{Collected, Collector, CollectorError, RawRecord};

use super::read_proc;

/// Aggregate jiffies from the `cpu` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    total: u64,
    idle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuStat {
    times: CpuTimes,
    cores: usize,
}

fn parse_stat(content: &str) -> Result<CpuStat, CollectorError> {
    let mut times = None;
    let mut cores = 0;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("cpu") => {
                let values = parts
                    .take(8)
                    .map(|v| {
                        v.parse::<u64>()
                            .map_err(|e| CollectorError::Parse(format!("/proc/stat: {e}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() < 4 {
                    return Err(CollectorError::Parse(
                        "/proc/stat: cpu line too short".to_string(),
                    ));
                }
                // idle + iowait
                let idle = values[3] + values.get(4).copied().unwrap_or(0);
                times = Some(CpuTimes {
                    total: values.iter().sum(),
                    idle,
                });
            }
            Some(label) if label.starts_with("cpu") => cores += 1,
            _ => {}
        }
    }

    let times =
        times.ok_or_else(|| CollectorError::Parse("/proc/stat: no cpu line".to_string()))?;
    Ok(CpuStat { times, cores })
}

fn usage_pct(previous: Option<CpuTimes>, current: CpuTimes) -> Option<f64> {
    let (total, idle) = match previous {
        Some(prev) => (
            current.total.saturating_sub(prev.total),
            current.idle.saturating_sub(prev.idle),
        ),
        None => (current.total, current.idle),
    };
    if total == 0 {
        return None;
    }
    Some(100.0 * (total - idle.min(total)) as f64 / total as f64)
}

/// CPU usage collector (`cpu_monitor`).
///
/// The first cycle reports usage since boot; later cycles report usage since
/// the previous cycle.
pub struct CpuCollector {
    proc_root: PathBuf,
    previous: Mutex<Option<CpuTimes>>,
}

impl CpuCollector {
    pub const NAME: &'static str = "cpu_monitor";

    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
            previous: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for CpuCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuCollector")
            .field("proc_root", &self.proc_root)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Collector for CpuCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn collect(&self) -> Result<Collected, CollectorError> {
        let stat = parse_stat(&read_proc(&self.proc_root, "stat").await?)?;

        let previous = {
            let mut guard = self
                .previous
                .lock()
                .map_err(|_| CollectorError::Other("cpu sample lock poisoned".to_string()))?;
            guard.replace(stat.times)
        };

        let Some(usage) = usage_pct(previous, stat.times) else {
            return Ok(Collected::Nothing);
        };

        let mut record = RawRecord::new();
        record.insert("usage_pct".to_string(), json!(usage));
        record.insert("cores".to_string(), json!(stat.cores));
        Ok(Collected::One(record))
    }
}
