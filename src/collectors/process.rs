//! Per-process memory scan.
//!
//! Finds the executable whose processes, taken together, hold the most
//! memory. Each scan enumerates every pid, opens each process, reads its
//! memory counters and name, then aggregates by name.
//!
//! Processes that cannot be opened or read (protected, exited mid-scan) are
//! skipped without surfacing an error.

use crate::error::{MonitorError, Result};
use crate::types::{Fraction, ProcessMemoryGroup};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Initial pid buffer size, in entries.
pub const INITIAL_PID_CAPACITY: usize = 4096;
/// Largest pid buffer the enumeration will try.
pub const MAX_PID_CAPACITY: usize = 1 << 20;

/// Memory counters of one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    /// Pages private to the process, when the host can tell.
    pub private_bytes: Option<u64>,
    /// Everything resident, shared pages included.
    pub working_set_bytes: u64,
}

impl ProcessMemory {
    /// Private bytes, or the full working set when private is unknown or
    /// zero.
    #[must_use]
    pub fn effective_bytes(&self) -> u64 {
        match self.private_bytes {
            Some(private) if private > 0 => private,
            _ => self.working_set_bytes,
        }
    }
}

/// The host's process table.
pub trait ProcessHost {
    /// An open process. Dropping it releases the host handle.
    type Handle;

    /// Writes live pids into `buf` and returns how many were written.
    ///
    /// A return equal to `buf.len()` means the list may be truncated.
    fn enum_pids(&mut self, buf: &mut [u32]) -> Result<usize>;

    /// Opens a process with the least rights that allow a memory query.
    fn open(&mut self, pid: u32) -> Result<Self::Handle>;

    /// Reads memory counters.
    fn memory(&mut self, handle: &Self::Handle) -> Result<ProcessMemory>;

    /// Full path of the executable image.
    fn image_path(&mut self, handle: &Self::Handle) -> Option<PathBuf>;

    /// Short command name, used when the image path is unavailable.
    fn command_name(&mut self, handle: &Self::Handle) -> Option<String>;
}

/// Enumerates pids with the default buffer sizes.
pub fn enumerate_pids<H: ProcessHost + ?Sized>(host: &mut H) -> Vec<u32> {
    enumerate_pids_with(host, INITIAL_PID_CAPACITY, MAX_PID_CAPACITY)
}

/// Enumerates pids through a growable buffer.
///
/// Starts at `initial` entries and doubles while the host fills the whole
/// buffer. Returns an empty list when the next size would exceed `cap` or
/// the host fails.
pub fn enumerate_pids_with<H: ProcessHost + ?Sized>(host: &mut H, initial: usize, cap: usize) -> Vec<u32> {
    let mut capacity = initial.max(1);

    while capacity <= cap {
        let mut buf = vec![0u32; capacity];
        let count = match host.enum_pids(&mut buf) {
            Ok(count) => count.min(capacity),
            Err(e) => {
                tracing::debug!(error = %e, "pid enumeration failed");
                return Vec::new();
            }
        };

        if count < capacity {
            buf.truncate(count);
            return buf;
        }
        capacity *= 2;
    }

    tracing::warn!(cap, "pid list still full at the buffer cap, skipping scan");
    Vec::new()
}

/// One readable process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Executable base name.
    pub name: String,
    /// Effective memory in bytes.
    pub bytes: u64,
}

/// Groups records by name and returns the largest group.
///
/// Equal totals go to the name that sorts first. Returns `None` when there
/// are no records or `total_phys` is zero.
#[must_use]
pub fn top_group(records: &[ProcessRecord], total_phys: u64) -> Option<ProcessMemoryGroup> {
    if total_phys == 0 {
        return None;
    }

    let mut groups: BTreeMap<&str, (u64, u32)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.name.as_str()).or_default();
        entry.0 = entry.0.saturating_add(record.bytes);
        entry.1 += 1;
    }

    // BTreeMap iterates names ascending; strict > keeps the first on ties
    let mut best: Option<(&str, u64, u32)> = None;
    for (name, (bytes, count)) in groups {
        if best.map_or(true, |(_, b, _)| bytes > b) {
            best = Some((name, bytes, count));
        }
    }

    best.map(|(name, bytes, count)| ProcessMemoryGroup {
        name: name.to_string(),
        aggregate_bytes: bytes,
        fraction_of_total: Fraction::ratio(bytes, total_phys),
        instance_count: count,
    })
}

/// Reads one process, or explains why it was skipped.
fn read_record<H: ProcessHost + ?Sized>(host: &mut H, pid: u32) -> Result<ProcessRecord> {
    let handle = host.open(pid)?;
    let bytes = host.memory(&handle)?.effective_bytes();

    let name = host
        .image_path(&handle)
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|n| !n.is_empty())
        .or_else(|| host.command_name(&handle).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| format!("PID {pid}"));

    Ok(ProcessRecord { name, bytes })
}

/// Finds the largest memory consumer over a process host.
#[derive(Debug)]
pub struct ProcessScanner<H> {
    host: H,
}

impl<H: ProcessHost> ProcessScanner<H> {
    /// Creates a scanner.
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Scans every process once.
    pub fn scan(&mut self, total_phys: u64) -> Option<ProcessMemoryGroup> {
        if total_phys == 0 {
            return None;
        }

        let pids = enumerate_pids(&mut self.host);
        let mut records = Vec::with_capacity(pids.len());
        let mut skipped = 0usize;

        for pid in pids.into_iter().filter(|&pid| pid != 0) {
            match read_record(&mut self.host, pid) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    tracing::trace!(pid, error = %e, "skipping process");
                }
            }
        }

        tracing::trace!(read = records.len(), skipped, "process scan done");
        top_group(&records, total_phys)
    }
}

/// Process host backed by `/proc`.
#[derive(Debug, Clone)]
pub struct ProcProcessHost {
    root: PathBuf,
}

/// An open `/proc/<pid>` directory.
#[derive(Debug)]
pub struct ProcHandle {
    pid: u32,
    dir: PathBuf,
    status: String,
}

impl ProcProcessHost {
    /// Host over `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Host over a `/proc`-shaped directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens the `/proc` host if it exists.
    pub fn open() -> Result<Self> {
        let host = Self::new();
        if host.root.is_dir() {
            Ok(host)
        } else {
            Err(MonitorError::ReaderUnavailable("process"))
        }
    }
}

impl Default for ProcProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of a `Key:   123 kB` line, in bytes.
fn kb_field(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        let kb = rest.split_whitespace().next()?.parse::<u64>().ok()?;
        Some(kb * 1024)
    })
}

fn private_bytes(dir: &Path) -> Option<u64> {
    let rollup = std::fs::read_to_string(dir.join("smaps_rollup")).ok()?;
    let clean = kb_field(&rollup, "Private_Clean")?;
    let dirty = kb_field(&rollup, "Private_Dirty")?;
    Some(clean + dirty)
}

impl ProcessHost for ProcProcessHost {
    type Handle = ProcHandle;

    fn enum_pids(&mut self, buf: &mut [u32]) -> Result<usize> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| MonitorError::sample("process", format!("failed to read {}: {e}", self.root.display())))?;

        let pids = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok());

        let mut count = 0;
        for (slot, pid) in buf.iter_mut().zip(pids) {
            *slot = pid;
            count += 1;
        }
        Ok(count)
    }

    fn open(&mut self, pid: u32) -> Result<ProcHandle> {
        let dir = self.root.join(pid.to_string());
        let status = std::fs::read_to_string(dir.join("status")).map_err(|_| MonitorError::AccessDenied(pid))?;
        Ok(ProcHandle { pid, dir, status })
    }

    fn memory(&mut self, handle: &ProcHandle) -> Result<ProcessMemory> {
        Ok(ProcessMemory {
            private_bytes: private_bytes(&handle.dir),
            // kernel threads have no VmRSS line
            working_set_bytes: kb_field(&handle.status, "VmRSS").unwrap_or(0),
        })
    }

    fn image_path(&mut self, handle: &ProcHandle) -> Option<PathBuf> {
        let path = std::fs::read_link(handle.dir.join("exe")).ok()?;
        tracing::trace!(pid = handle.pid, path = %path.display(), "resolved image");
        Some(path)
    }

    fn command_name(&mut self, handle: &ProcHandle) -> Option<String> {
        handle
            .status
            .lines()
            .find_map(|l| l.strip_prefix("Name:"))
            .map(|n| n.trim().to_string())
    }
}
