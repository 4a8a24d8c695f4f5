//! OS-reserved memory reader.
//!
//! Takes one [`PerformanceSnapshot`] per read and reports how much physical
//! memory the OS holds for its file cache and kernel pools. A failed read
//! reports zero rather than the previous value.

use crate::collectors::memory::MemInfo;
use crate::error::{MonitorError, Result};
use crate::types::{Fraction, MetricReader};
use std::path::PathBuf;

/// Page-denominated view of system memory, captured atomically.
///
/// Field order is fixed: page size first, then physical total, then the
/// three reserved pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct PerformanceSnapshot {
    /// Bytes per page.
    pub page_size: u64,
    /// Physical memory, in pages.
    pub physical_total_pages: u64,
    /// File cache and buffers, in pages.
    pub system_cache_pages: u64,
    /// Reclaimable kernel pool, in pages.
    pub kernel_paged_pages: u64,
    /// Pinned kernel pool (unreclaimable slab, stacks, page tables), in pages.
    pub kernel_nonpaged_pages: u64,
}

impl PerformanceSnapshot {
    /// Builds a snapshot from one meminfo parse.
    #[must_use]
    pub fn from_meminfo(info: &MemInfo, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let pages = |bytes: u64| bytes / page_size;

        Self {
            page_size,
            physical_total_pages: pages(info.total),
            system_cache_pages: pages(info.cached + info.buffers),
            kernel_paged_pages: pages(info.slab_reclaimable),
            kernel_nonpaged_pages: pages(info.slab_unreclaimable + info.kernel_stack + info.page_tables),
        }
    }

    /// Bytes held by cache and kernel pools.
    #[must_use]
    pub fn reserved_bytes(&self) -> u64 {
        (self.system_cache_pages + self.kernel_paged_pages + self.kernel_nonpaged_pages) * self.page_size
    }

    /// Reserved bytes relative to physical memory; zero when total is zero.
    #[must_use]
    pub fn reserved_fraction(&self) -> Fraction {
        Fraction::ratio(self.reserved_bytes(), self.physical_total_pages * self.page_size)
    }
}

/// Banded one-liner for the SYS row.
#[must_use]
pub fn commentary(reserved: Fraction) -> &'static str {
    match reserved.get() {
        r if r >= 0.28 => "Kernel landlord tax.",
        r if r >= 0.18 => "Kernel is hoarding cache.",
        _ => "Kernel behaving.",
    }
}

/// Returns the system page size.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
#[must_use]
pub fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads a constant.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

/// Returns the system page size.
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn page_size() -> u64 {
    4096
}

/// Reads the reserved share of physical memory.
#[derive(Debug)]
pub struct ReservedReader {
    path: PathBuf,
    page_size: u64,
}

impl ReservedReader {
    /// Opens the reader on `/proc/meminfo`.
    pub fn open() -> Result<Self> {
        Self::open_path("/proc/meminfo", page_size())
    }

    /// Opens the reader on a meminfo-formatted file with an explicit page size.
    pub fn open_path(path: impl Into<PathBuf>, page_size: u64) -> Result<Self> {
        let path = path.into();
        MemInfo::load(&path, "reserved").map_err(|_| MonitorError::ReaderUnavailable("reserved"))?;
        Ok(Self { path, page_size })
    }

    /// Takes one snapshot.
    pub fn snapshot(&self) -> Result<PerformanceSnapshot> {
        let info = MemInfo::load(&self.path, "reserved")?;
        Ok(PerformanceSnapshot::from_meminfo(&info, self.page_size))
    }
}

impl MetricReader for ReservedReader {
    type Output = Fraction;

    fn id(&self) -> &'static str {
        "reserved"
    }

    fn read(&mut self) -> Result<Fraction> {
        Ok(self.snapshot()?.reserved_fraction())
    }
}
