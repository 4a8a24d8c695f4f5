//! Processor utilization reader.
//!
//! Keeps `/proc/stat` open for the lifetime of the reader and re-reads it on
//! every sample. Utilization is busy time over total time across the delta
//! since the previous read, so the first read after opening already reports
//! a real value (opening primes the baseline).

use crate::error::{MonitorError, Result};
use crate::types::{Fraction, MetricReader};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Aggregate CPU time counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    fn idle_time(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy share of the interval between `prev` and `self`.
    fn utilization_since(&self, prev: &Self) -> Fraction {
        let total = self.total().saturating_sub(prev.total());
        let idle = self.idle_time().saturating_sub(prev.idle_time());
        Fraction::ratio(total.saturating_sub(idle), total)
    }
}

/// Finds and parses the aggregate `cpu ` line.
fn parse_aggregate(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse().unwrap_or(0))
        .collect();

    if values.len() < 4 {
        return None;
    }

    let field = |i: usize| values.get(i).copied().unwrap_or(0);
    Some(CpuTimes {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
        steal: field(7),
    })
}

/// Reads total processor utilization.
#[derive(Debug)]
pub struct CpuReader {
    /// Persistent handle on the counter file.
    file: File,
    /// Reused read buffer.
    buf: String,
    /// Counters from the previous read.
    prev: CpuTimes,
}

impl CpuReader {
    /// Opens the system counters and primes the first baseline.
    pub fn open() -> Result<Self> {
        Self::open_path("/proc/stat")
    }

    /// Opens a `/proc/stat`-formatted file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).map_err(|_| MonitorError::ReaderUnavailable("cpu"))?;
        let mut reader = Self {
            file,
            buf: String::with_capacity(4096),
            prev: CpuTimes::default(),
        };
        reader.prev = reader
            .snapshot()
            .map_err(|_| MonitorError::ReaderUnavailable("cpu"))?;
        Ok(reader)
    }

    fn snapshot(&mut self) -> Result<CpuTimes> {
        self.buf.clear();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut self.buf))
            .map_err(|e| MonitorError::sample("cpu", e.to_string()))?;

        parse_aggregate(&self.buf).ok_or_else(|| MonitorError::sample("cpu", "no aggregate cpu line"))
    }
}

impl MetricReader for CpuReader {
    type Output = Fraction;

    fn id(&self) -> &'static str {
        "cpu"
    }

    fn read(&mut self) -> Result<Fraction> {
        let current = self.snapshot()?;
        let utilization = current.utilization_since(&self.prev);
        self.prev = current;
        Ok(utilization)
    }
}
