//! Load averages from `/proc/loadavg`.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::collector::{Collected, Collector, CollectorError, RawRecord};

use super::read_proc;

fn parse_loadavg(content: &str) -> Result<RawRecord, CollectorError> {
    let bad = || CollectorError::Parse(format!("/proc/loadavg: unexpected '{}'", content.trim()));

    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(bad());
    }

    let mut record = RawRecord::new();
    for (key, raw) in ["load1", "load5", "load15"].iter().zip(&parts) {
        let value: f64 = raw.parse().map_err(|_| bad())?;
        record.insert((*key).to_string(), json!(value));
    }

    let (running, total) = parts[3].split_once('/').ok_or_else(bad)?;
    let running: u64 = running.parse().map_err(|_| bad())?;
    let total: u64 = total.parse().map_err(|_| bad())?;
    record.insert("procs_running".to_string(), json!(running));
    record.insert("procs_total".to_string(), json!(total));
    Ok(record)
}

/// Load average collector (`load_monitor`).
#[derive(Debug)]
pub struct LoadCollector {
    proc_root: PathBuf,
}

impl LoadCollector {
    pub const NAME: &'static str = "load_monitor";

    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Collector for LoadCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn collect(&self) -> Result<Collected, CollectorError> {
        let content = read_proc(&self.proc_root, "loadavg").await?;
        Ok(Collected::One(parse_loadavg(&content)?))
    }
}
