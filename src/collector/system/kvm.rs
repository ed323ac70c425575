//! Running QEMU/KVM guests discovered through procfs.
//!
//! Only enabled when the libvirt control socket is present on the host.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::collector::{Collected, Collector, CollectorError, RawRecord};

use super::read_proc;

/// Guest name from a QEMU command line (`-name guest=vm1,debug-threads=on` or `-name vm1`).
fn guest_name(cmdline: &str) -> Option<String> {
    let mut args = cmdline.split('\0');
    while let Some(arg) = args.next() {
        if arg == "-name" {
            let value = args.next()?;
            let name = value
                .split(',')
                .find_map(|part| part.strip_prefix("guest="))
                .unwrap_or_else(|| value.split(',').next().unwrap_or(value));
            return Some(name.to_string());
        }
    }
    None
}

/// Resident set size in bytes from `/proc/<pid>/status`.
fn rss_bytes(status: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmRSS:")?;
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb.saturating_mul(1024))
    })
}

/// KVM guest collector (`kvm_monitor`), one record per guest process.
#[derive(Debug)]
pub struct KvmCollector {
    proc_root: PathBuf,
    libvirt_socket: PathBuf,
}

impl KvmCollector {
    pub const NAME: &'static str = "kvm_monitor";

    pub fn new(proc_root: impl AsRef<Path>, libvirt_socket: impl AsRef<Path>) -> Self {
        Self {
            proc_root: proc_root.as_ref().to_path_buf(),
            libvirt_socket: libvirt_socket.as_ref().to_path_buf(),
        }
    }

    async fn guest_record(&self, pid: &str) -> Option<RawRecord> {
        let comm = read_proc(&self.proc_root, format!("{pid}/comm")).await.ok()?;
        if !comm.trim().starts_with("qemu") {
            return None;
        }

        let cmdline = read_proc(&self.proc_root, format!("{pid}/cmdline"))
            .await
            .unwrap_or_default();
        let status = read_proc(&self.proc_root, format!("{pid}/status"))
            .await
            .unwrap_or_default();

        let mut record = RawRecord::new();
        record.insert(
            "domain".to_string(),
            json!(guest_name(&cmdline).unwrap_or_else(|| format!("pid-{pid}"))),
        );
        record.insert("pid".to_string(), json!(pid.parse::<u64>().ok()?));
        if let Some(rss) = rss_bytes(&status) {
            record.insert("rss_bytes".to_string(), json!(rss));
        }
        Some(record)
    }
}

#[async_trait::async_trait]
impl Collector for KvmCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn tag_keys(&self) -> &'static [&'static str] {
        &["domain"]
    }

    fn check_available(&self) -> Result<(), String> {
        if self.libvirt_socket.exists() {
            Ok(())
        } else {
            Err(format!(
                "libvirt not available ({} missing)",
                self.libvirt_socket.display()
            ))
        }
    }

    async fn collect(&self) -> Result<Collected, CollectorError> {
        self.check_available()
            .map_err(CollectorError::Prerequisite)?;

        let mut pids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.proc_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(pid) = name.to_str()
                && pid.bytes().all(|b| b.is_ascii_digit())
            {
                pids.push(pid.to_string());
            }
        }
        pids.sort_by_key(|p| p.parse::<u64>().unwrap_or(u64::MAX));

        let mut records = Vec::new();
        for pid in &pids {
            // Processes may exit between listing and reading.
            if let Some(record) = self.guest_record(pid).await {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Ok(Collected::Nothing);
        }
        Ok(Collected::Many(records))
    }
}
