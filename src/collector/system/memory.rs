//! Memory usage from `/proc/meminfo`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::collector::{Collected, Collector, CollectorError, RawRecord};

use super::read_proc;

/// Parse `/proc/meminfo` into byte counts keyed by field name.
fn parse_meminfo(content: &str) -> HashMap<&str, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let mut parts = rest.split_whitespace();
            let value: u64 = parts.next()?.parse().ok()?;
            let bytes = match parts.next() {
                Some("kB") => value.saturating_mul(1024),
                _ => value,
            };
            Some((key.trim(), bytes))
        })
        .collect()
}

fn memory_record(info: &HashMap<&str, u64>) -> Result<RawRecord, CollectorError> {
    let total = *info
        .get("MemTotal")
        .ok_or_else(|| CollectorError::Parse("/proc/meminfo: MemTotal missing".to_string()))?;
    let available = info
        .get("MemAvailable")
        .or_else(|| info.get("MemFree"))
        .copied()
        .unwrap_or(0);
    let used = total.saturating_sub(available);
    let swap_total = info.get("SwapTotal").copied().unwrap_or(0);
    let swap_used = swap_total.saturating_sub(info.get("SwapFree").copied().unwrap_or(0));

    let mut record = RawRecord::new();
    record.insert("total_bytes".to_string(), json!(total));
    record.insert("available_bytes".to_string(), json!(available));
    record.insert("used_bytes".to_string(), json!(used));
    if total > 0 {
        record.insert(
            "used_pct".to_string(),
            json!(100.0 * used as f64 / total as f64),
        );
    }
    record.insert("swap_total_bytes".to_string(), json!(swap_total));
    record.insert("swap_used_bytes".to_string(), json!(swap_used));
    Ok(record)
}

/// Memory usage collector (`memory_monitor`).
#[derive(Debug)]
pub struct MemoryCollector {
    proc_root: PathBuf,
}

impl MemoryCollector {
    pub const NAME: &'static str = "memory_monitor";

    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn collect(&self) -> Result<Collected, CollectorError> {
        let content = read_proc(&self.proc_root, "meminfo").await?;
        Ok(Collected::One(memory_record(&parse_meminfo(&content))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:        1000 kB
MemFree:          200 kB
MemAvailable:     250 kB
Buffers:           10 kB
SwapTotal:        100 kB
SwapFree:          40 kB
HugePages_Total:    0
";

    #[test]
    fn test_parse_meminfo() {
        let info = parse_meminfo(MEMINFO);
        assert_eq!(info["MemTotal"], 1000 * 1024);
        assert_eq!(info["HugePages_Total"], 0);

        let huge_content = format!("MemTotal: {} kB\n", u64::MAX);
        let huge = parse_meminfo(&huge_content);
        assert_eq!(huge["MemTotal"], u64::MAX);
    }

    #[test]
    fn test_memory_record() {
        let record = memory_record(&parse_meminfo(MEMINFO)).unwrap();
        assert_eq!(record["used_bytes"], json!(750 * 1024));
        assert_eq!(record["used_pct"], json!(75.0));
        assert_eq!(record["swap_used_bytes"], json!(60 * 1024));
    }

    #[test]
    fn test_memory_record_falls_back_to_memfree() {
        let info = parse_meminfo("MemTotal: 100 kB\nMemFree: 50 kB\n");
        let record = memory_record(&info).unwrap();
        assert_eq!(record["available_bytes"], json!(50 * 1024));
    }

    #[test]
    fn test_memory_record_requires_total() {
        assert!(memory_record(&parse_meminfo("MemFree: 50 kB\n")).is_err());
    }
}
