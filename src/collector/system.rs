//! Built-in Linux host collectors backed by procfs.
//!
//! - [`CpuCollector`] (`cpu_monitor`): CPU utilisation since the previous cycle
//! - [`MemoryCollector`] (`memory_monitor`): memory and swap usage
//! - [`LoadCollector`] (`load_monitor`): load averages and process counts
//! - [`DiskCollector`] (`disk_monitor`): per-device I/O counters
//! - [`KvmCollector`] (`kvm_monitor`): running QEMU/KVM guests, gated on libvirt

mod cpu;
mod disk;
mod kvm;
mod load;
mod memory;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collector::{Collector, CollectorError, CollectorRegistry, RegistryError};

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use kvm::KvmCollector;
pub use load::LoadCollector;
pub use memory::MemoryCollector;

/// Default procfs mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default libvirt control socket probed by `kvm_monitor`.
pub const DEFAULT_LIBVIRT_SOCKET: &str = "/var/run/libvirt/libvirt-sock";

fn default_proc_root() -> PathBuf {
    PathBuf::from(DEFAULT_PROC_ROOT)
}

fn default_libvirt_socket() -> PathBuf {
    PathBuf::from(DEFAULT_LIBVIRT_SOCKET)
}

/// Settings shared by the built-in collectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// procfs root (default: "/proc").
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    /// libvirt socket whose presence enables `kvm_monitor`.
    #[serde(default = "default_libvirt_socket")]
    pub libvirt_socket: PathBuf,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            proc_root: default_proc_root(),
            libvirt_socket: default_libvirt_socket(),
        }
    }
}

/// Build every built-in collector.
pub fn builtin_collectors(config: &SystemConfig) -> Vec<Arc<dyn Collector>> {
    vec![
        Arc::new(CpuCollector::new(&config.proc_root)),
        Arc::new(MemoryCollector::new(&config.proc_root)),
        Arc::new(LoadCollector::new(&config.proc_root)),
        Arc::new(DiskCollector::new(&config.proc_root)),
        Arc::new(KvmCollector::new(&config.proc_root, &config.libvirt_socket)),
    ]
}

/// Register every built-in collector.
pub fn register_builtin(
    registry: &mut CollectorRegistry,
    config: &SystemConfig,
) -> Result<(), RegistryError> {
    for collector in builtin_collectors(config) {
        registry.register_arc(collector)?;
    }
    Ok(())
}

/// Read a file below the procfs root.
async fn read_proc(root: &Path, rel: impl AsRef<Path>) -> Result<String, CollectorError> {
    Ok(tokio::fs::read_to_string(root.join(rel)).await?)
}
