//! Block device I/O counters from `/proc/diskstats`.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::collector::{Collected, Collector, CollectorError, RawRecord};

use super::read_proc;

/// Sector size used by the kernel for diskstats accounting.
const SECTOR_BYTES: u64 = 512;

/// Virtual devices that carry no useful I/O information.
const SKIPPED_PREFIXES: &[&str] = &["loop", "ram", "zram"];

fn parse_diskstats(content: &str) -> Result<Vec<RawRecord>, CollectorError> {
    let mut records = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 13 {
            continue;
        }
        let device = parts[2];
        if SKIPPED_PREFIXES.iter().any(|p| device.starts_with(p)) {
            continue;
        }

        let field = |idx: usize| -> Result<u64, CollectorError> {
            parts[idx].parse().map_err(|_| {
                CollectorError::Parse(format!("/proc/diskstats: bad counter for {device}"))
            })
        };

        let mut record = RawRecord::new();
        record.insert("device".to_string(), json!(device));
        record.insert("reads".to_string(), json!(field(3)?));
        record.insert("read_bytes".to_string(), json!(field(5)?.saturating_mul(SECTOR_BYTES)));
        record.insert("writes".to_string(), json!(field(7)?));
        record.insert("write_bytes".to_string(), json!(field(9)?.saturating_mul(SECTOR_BYTES)));
        record.insert("io_in_progress".to_string(), json!(field(11)?));
        record.insert("io_time_ms".to_string(), json!(field(12)?));
        records.push(record);
    }

    Ok(records)
}

/// Disk I/O collector (`disk_monitor`), one record per block device.
#[derive(Debug)]
pub struct DiskCollector {
    proc_root: PathBuf,
}

impl DiskCollector {
    pub const NAME: &'static str = "disk_monitor";

    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Collector for DiskCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn tag_keys(&self) -> &'static [&'static str] {
        &["device"]
    }

    async fn collect(&self) -> Result<Collected, CollectorError> {
        let content = read_proc(&self.proc_root, "diskstats").await?;
        Ok(Collected::Many(parse_diskstats(&content)?))
    }
}
