//! Physical memory reader.
//!
//! Parses `/proc/meminfo` on Linux. The parsed [`MemInfo`] is shared with
//! the OS-reserved reader, which needs the cache and kernel pool fields from
//! the same snapshot.

use crate::error::{MonitorError, Result};
use crate::types::{Fraction, MetricReader};
use std::path::{Path, PathBuf};

/// The `/proc/meminfo` fields this crate uses, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// `MemTotal`.
    pub total: u64,
    /// `MemAvailable`.
    pub available: u64,
    /// `Buffers`.
    pub buffers: u64,
    /// `Cached`.
    pub cached: u64,
    /// `SReclaimable`: slab memory the kernel can give back.
    pub slab_reclaimable: u64,
    /// `SUnreclaim`: slab memory pinned by the kernel.
    pub slab_unreclaimable: u64,
    /// `KernelStack`.
    pub kernel_stack: u64,
    /// `PageTables`.
    pub page_tables: u64,
}

impl MemInfo {
    /// Parses `/proc/meminfo` content. Unknown lines are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            // values are in kB
            let bytes = value.parse::<u64>().unwrap_or(0) * 1024;

            match key {
                "MemTotal:" => info.total = bytes,
                "MemAvailable:" => info.available = bytes,
                "Buffers:" => info.buffers = bytes,
                "Cached:" => info.cached = bytes,
                "SReclaimable:" => info.slab_reclaimable = bytes,
                "SUnreclaim:" => info.slab_unreclaimable = bytes,
                "KernelStack:" => info.kernel_stack = bytes,
                "PageTables:" => info.page_tables = bytes,
                _ => {}
            }
        }

        info
    }

    /// Reads and parses the file at `path`.
    pub fn load(path: &Path, reader: &'static str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::sample(reader, format!("failed to read {}: {e}", path.display())))?;
        Ok(Self::parse(&content))
    }

    /// Bytes in use: total minus available.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }
}

/// One memory reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryReading {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Share of physical memory in use.
    pub used: Fraction,
}

/// Reads total and available physical memory.
#[derive(Debug)]
pub struct MemoryReader {
    path: PathBuf,
}

impl MemoryReader {
    /// Opens the reader on `/proc/meminfo`.
    pub fn open() -> Result<Self> {
        Self::open_path("/proc/meminfo")
    }

    /// Opens the reader on a meminfo-formatted file.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let info = MemInfo::load(&path, "memory").map_err(|_| MonitorError::ReaderUnavailable("memory"))?;
        if info.total == 0 {
            return Err(MonitorError::ReaderUnavailable("memory"));
        }
        Ok(Self { path })
    }
}

impl MetricReader for MemoryReader {
    type Output = MemoryReading;

    fn id(&self) -> &'static str {
        "memory"
    }

    fn read(&mut self) -> Result<MemoryReading> {
        let info = MemInfo::load(&self.path, "memory")?;
        Ok(MemoryReading {
            total_bytes: info.total,
            used: Fraction::ratio(info.used(), info.total),
        })
    }
}
