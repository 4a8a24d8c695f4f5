//! Native metric readers.
//!
//! One reader per source, each owning its query handle:
//!
//! - **cpu**: aggregate processor counters
//! - **memory**: physical memory in use
//! - **reserved**: memory held by the OS for caches and kernel pools
//! - **gpu**: per-engine utilization (DRM sysfs, NVML with `nvidia`)
//! - **network**: interface table octet counters
//! - **process**: largest memory consumer, grouped by executable
//!
//! Readers never take the monitor down. [`Guarded`] absorbs open and read
//! failures, and [`SystemReaders`] bundles one guarded reader per source
//! behind the [`MetricSource`] seam.

pub mod cpu;
pub mod gpu;
pub mod iftable;
pub mod memory;
pub mod network;
pub mod process;
pub mod reserved;

pub use cpu::CpuReader;
pub use gpu::{pick_utilization, EngineKind, GpuEngineSample, GpuEngineSource, GpuReader};
pub use iftable::{IfRow, IfTableSource};
pub use memory::{MemoryReader, MemoryReading};
pub use network::{NetworkReader, OctetTotals, Throughput};
pub use process::{ProcProcessHost, ProcessHost, ProcessScanner};
pub use reserved::{PerformanceSnapshot, ReservedReader};

use crate::error::Result;
use crate::types::{MetricReader, MetricSample, MetricSource, ProcessMemoryGroup};

/// What a [`Guarded`] reader reports when a read fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Repeat the last good value.
    ReusePrevious,
    /// Report zero for this read.
    Zero,
}

/// A reader that cannot fail.
///
/// If opening failed the wrapper is permanently inert and reports zero. The
/// open is never retried. Read failures are handled per [`OnFailure`].
#[derive(Debug)]
pub struct Guarded<R: MetricReader> {
    id: &'static str,
    reader: Option<R>,
    policy: OnFailure,
    last: R::Output,
}

impl<R> Guarded<R>
where
    R: MetricReader,
    R::Output: Clone + Default,
{
    /// Wraps the result of a reader's `open`.
    ///
    /// A live reader names itself through [`MetricReader::id`]; `fallback_id`
    /// names the inert wrapper when opening failed.
    pub fn open(opened: Result<R>, fallback_id: &'static str, policy: OnFailure) -> Self {
        match opened {
            Ok(reader) => {
                let id = reader.id();
                tracing::debug!(reader = id, "reader opened");
                Self {
                    id,
                    reader: Some(reader),
                    policy,
                    last: R::Output::default(),
                }
            }
            Err(e) => {
                tracing::warn!(reader = fallback_id, error = %e, "reader unavailable, reporting zero");
                Self::unavailable(fallback_id, policy)
            }
        }
    }

    /// An always-zero reader.
    pub fn unavailable(id: &'static str, policy: OnFailure) -> Self {
        Self {
            id,
            reader: None,
            policy,
            last: R::Output::default(),
        }
    }

    /// Short identifier used in logs.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Whether a live handle is held.
    pub fn is_live(&self) -> bool {
        self.reader.is_some()
    }

    /// Reads once. `None` if the reader is inert, released, or this read
    /// failed.
    pub fn try_read(&mut self) -> Option<R::Output> {
        let reader = self.reader.as_mut()?;
        match reader.read() {
            Ok(value) => {
                self.last = value.clone();
                Some(value)
            }
            Err(e) => {
                tracing::debug!(reader = self.id, error = %e, "read failed");
                None
            }
        }
    }

    /// Reads once, substituting per the failure policy.
    pub fn read(&mut self) -> R::Output {
        if self.reader.is_none() {
            return R::Output::default();
        }
        self.try_read().unwrap_or_else(|| match self.policy {
            OnFailure::ReusePrevious => self.last.clone(),
            OnFailure::Zero => R::Output::default(),
        })
    }

    /// Drops the handle. Returns `true` only on the call that released it.
    pub fn release(&mut self) -> bool {
        let released = self.reader.take().is_some();
        if released {
            tracing::debug!(reader = self.id, "reader released");
        }
        released
    }
}

/// One guarded reader per native source.
#[derive(Debug)]
pub struct SystemReaders {
    cpu: Guarded<CpuReader>,
    memory: Guarded<MemoryReader>,
    reserved: Guarded<ReservedReader>,
    gpu: Guarded<GpuReader>,
    network: Guarded<NetworkReader>,
    throughput: Throughput,
    processes: Option<ProcessScanner<ProcProcessHost>>,
}

impl SystemReaders {
    /// Opens every reader the host supports.
    pub fn open() -> Self {
        let processes = match ProcProcessHost::open() {
            Ok(host) => Some(ProcessScanner::new(host)),
            Err(e) => {
                tracing::warn!(reader = "process", error = %e, "reader unavailable, reporting zero");
                None
            }
        };

        let readers = Self {
            cpu: Guarded::open(CpuReader::open(), "cpu", OnFailure::ReusePrevious),
            memory: Guarded::open(MemoryReader::open(), "memory", OnFailure::ReusePrevious),
            reserved: Guarded::open(ReservedReader::open(), "reserved", OnFailure::Zero),
            gpu: Guarded::open(GpuReader::open(), "gpu", OnFailure::ReusePrevious),
            network: Guarded::open(NetworkReader::open(), "network", OnFailure::Zero),
            throughput: Throughput::new(),
            processes,
        };
        tracing::info!(live = readers.live_count(), "metric readers opened");
        readers
    }

    /// Number of readers holding a live handle.
    pub fn live_count(&self) -> usize {
        [
            self.cpu.is_live(),
            self.memory.is_live(),
            self.reserved.is_live(),
            self.gpu.is_live(),
            self.network.is_live(),
            self.processes.is_some(),
        ]
        .into_iter()
        .filter(|&live| live)
        .count()
    }
}

impl MetricSource for SystemReaders {
    fn sample(&mut self, elapsed_secs: f64) -> MetricSample {
        let memory = self.memory.read();

        // a failed table read reports no traffic; the next rate spans this tick too
        let (rx_bps, tx_bps) = match self.network.try_read() {
            Some(totals) => self.throughput.update(totals, elapsed_secs),
            None => {
                self.throughput.miss(elapsed_secs);
                (0.0, 0.0)
            }
        };

        MetricSample {
            cpu: self.cpu.read(),
            mem_used: memory.used,
            mem_total_bytes: memory.total_bytes,
            sys_reserved: self.reserved.read(),
            gpu: self.gpu.read(),
            rx_bps,
            tx_bps,
        }
    }

    fn top_consumer(&mut self, total_phys: u64) -> Option<ProcessMemoryGroup> {
        self.processes.as_mut()?.scan(total_phys)
    }

    fn release(&mut self) {
        let released = [
            self.cpu.release(),
            self.memory.release(),
            self.reserved.release(),
            self.gpu.release(),
            self.network.release(),
            self.processes.take().is_some(),
        ]
        .into_iter()
        .filter(|&r| r)
        .count();

        if released > 0 {
            tracing::info!(released, "metric readers released");
        }
    }
}

impl Drop for SystemReaders {
    fn drop(&mut self) {
        self.release();
    }
}
