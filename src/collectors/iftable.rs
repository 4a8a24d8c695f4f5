//! Variable-length network interface table.
//!
//! The table is a byte image in native endianness:
//!
//! ```text
//! offset 0                u32 row count
//! offset align_up(4, 8)   row 0 (ROW_SIZE bytes)
//!                         row 1
//!                         ...
//! ```
//!
//! Each row has a fixed layout:
//!
//! ```text
//!  0..32  name        NUL-padded UTF-8
//! 32..40  speed_bps   u64, 0 for inactive or virtual links
//! 40..44  index       u32
//! 44..48  in_octets   u32, cumulative, wraps at 2^32
//! 48..52  out_octets  u32, cumulative, wraps at 2^32
//! 52..56  oper_status u32
//! ```
//!
//! Hosts publish the table through [`IfTableSource`], which follows a
//! two-call protocol: called with a too-small buffer it answers
//! [`MonitorError::BufferTooSmall`] with the exact size it needs.

use crate::error::{MonitorError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes in the row name field.
pub const NAME_LEN: usize = 32;
/// Size of one row.
pub const ROW_SIZE: usize = 56;
/// Alignment of the first row (the row's widest field is a `u64`).
pub const ROW_ALIGN: usize = 8;
/// Size of the leading row count.
pub const HEADER_SIZE: usize = 4;

/// Rounds `offset` up to the next multiple of `align`.
///
/// `align` must be a power of two.
#[must_use]
pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + (align - 1)) & !(align - 1)
}

/// Offset of the first row.
#[must_use]
pub const fn rows_offset() -> usize {
    align_up(HEADER_SIZE, ROW_ALIGN)
}

/// Bytes needed for a table of `rows` rows.
#[must_use]
pub const fn table_size(rows: usize) -> usize {
    rows_offset() + rows * ROW_SIZE
}

/// Operational state of an interface.
pub mod oper_status {
    /// Link down or unknown.
    pub const DOWN: u32 = 0;
    /// Link up.
    pub const UP: u32 = 1;
}

/// One interface row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfRow {
    /// Interface name.
    pub name: String,
    /// Link speed in bits per second; zero means inactive or virtual.
    pub speed_bps: u64,
    /// Interface index.
    pub index: u32,
    /// Cumulative received bytes, truncated to 32 bits.
    pub in_octets: u32,
    /// Cumulative sent bytes, truncated to 32 bits.
    pub out_octets: u32,
    /// See [`oper_status`].
    pub oper_status: u32,
}

impl IfRow {
    /// Whether the interface reports a link speed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.speed_bps != 0
    }

    fn decode(bytes: &[u8]) -> Self {
        let u32_at = |at: usize| u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut speed = [0u8; 8];
        speed.copy_from_slice(&bytes[32..40]);

        let name_bytes = &bytes[..NAME_LEN];
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);

        Self {
            name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            speed_bps: u64::from_ne_bytes(speed),
            index: u32_at(40),
            in_octets: u32_at(44),
            out_octets: u32_at(48),
            oper_status: u32_at(52),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[..ROW_SIZE].fill(0);
        let name = self.name.as_bytes();
        let name_len = name.len().min(NAME_LEN - 1);
        out[..name_len].copy_from_slice(&name[..name_len]);
        out[32..40].copy_from_slice(&self.speed_bps.to_ne_bytes());
        out[40..44].copy_from_slice(&self.index.to_ne_bytes());
        out[44..48].copy_from_slice(&self.in_octets.to_ne_bytes());
        out[48..52].copy_from_slice(&self.out_octets.to_ne_bytes());
        out[52..56].copy_from_slice(&self.oper_status.to_ne_bytes());
    }
}

/// Writes `rows` as a table image into `buf`.
///
/// Returns the number of bytes written, or [`MonitorError::BufferTooSmall`]
/// with the exact size required.
pub fn encode_table(rows: &[IfRow], buf: &mut [u8]) -> Result<usize> {
    let required = table_size(rows.len());
    if buf.len() < required {
        return Err(MonitorError::BufferTooSmall { required });
    }

    buf[..rows_offset()].fill(0);
    buf[..HEADER_SIZE].copy_from_slice(&(rows.len() as u32).to_ne_bytes());

    let mut offset = rows_offset();
    for row in rows {
        row.encode(&mut buf[offset..offset + ROW_SIZE]);
        offset += ROW_SIZE;
    }

    Ok(required)
}

/// Parses a table image.
///
/// Rows that would run past the end of `buf` stop the walk; the rows before
/// them are returned.
pub fn parse_table(buf: &[u8]) -> Result<Vec<IfRow>> {
    if buf.len() < HEADER_SIZE {
        return Err(MonitorError::sample("network", "interface table shorter than its header"));
    }

    let count = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let start = rows_offset();
    let mut rows = Vec::with_capacity(count.min(64));

    for i in 0..count {
        let offset = start + i * ROW_SIZE;
        let Some(bytes) = buf.get(offset..offset + ROW_SIZE) else {
            break;
        };
        rows.push(IfRow::decode(bytes));
    }

    Ok(rows)
}

/// A host facility that publishes the interface table.
pub trait IfTableSource {
    /// Copies the current table into `buf`.
    ///
    /// Returns the number of bytes written, or
    /// [`MonitorError::BufferTooSmall`] when `buf` cannot hold the table.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Runs the two-call size negotiation and returns the table image.
///
/// The first call uses an empty buffer; an undersized answer there is
/// expected. The buffer is then sized exactly as requested and the call
/// repeated once. A table that grew between the two calls fails this read.
pub fn fetch_table<S: IfTableSource + ?Sized>(source: &mut S) -> Result<Vec<u8>> {
    let required = match source.fill(&mut []) {
        Err(MonitorError::BufferTooSmall { required }) if required > 0 => required,
        Err(e) => return Err(e),
        Ok(_) => return Err(MonitorError::sample("network", "interface table reported no size")),
    };

    let mut buf = vec![0u8; required];
    match source.fill(&mut buf) {
        Ok(written) => {
            buf.truncate(written);
            Ok(buf)
        }
        Err(MonitorError::BufferTooSmall { required: grown }) => Err(MonitorError::sample(
            "network",
            format!("interface table grew from {required} to {grown} bytes between calls"),
        )),
        Err(e) => Err(e),
    }
}

/// Placeholder speed for an up link whose driver does not report one.
pub const UNKNOWN_SPEED_BPS: u64 = 1;

/// `IFF_LOOPBACK` from `<net/if.h>`.
const IFF_LOOPBACK: u64 = 0x8;

/// Interface table built from `/proc/net/dev` and `/sys/class/net`.
///
/// Keeps `/proc/net/dev` open; link speeds come from
/// `/sys/class/net/<iface>/speed`. Many drivers (virtio, veth, bridges,
/// most wifi) report `-1` or fail the read; such a link that is up gets
/// [`UNKNOWN_SPEED_BPS`]. Links that are down and loopback devices get 0.
#[derive(Debug)]
pub struct ProcIfTable {
    dev: File,
    class_root: PathBuf,
    buf: String,
}

impl ProcIfTable {
    /// Opens the system interface table.
    pub fn open() -> Result<Self> {
        Self::open_paths("/proc/net/dev", "/sys/class/net")
    }

    /// Opens a table over explicit counter and sysfs paths.
    pub fn open_paths(dev: impl AsRef<Path>, class_root: impl Into<PathBuf>) -> Result<Self> {
        let dev = File::open(dev).map_err(|_| MonitorError::ReaderUnavailable("network"))?;
        Ok(Self {
            dev,
            class_root: class_root.into(),
            buf: String::with_capacity(4096),
        })
    }

    fn snapshot(&mut self) -> Result<Vec<IfRow>> {
        self.buf.clear();
        self.dev
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.dev.read_to_string(&mut self.buf))
            .map_err(|e| MonitorError::sample("network", e.to_string()))?;

        let mut rows = Vec::new();
        // two header lines
        for (index, line) in self.buf.lines().skip(2).enumerate() {
            let Some((name, counters)) = line.trim().split_once(':') else {
                continue;
            };
            let name = name.trim();
            let values: Vec<u64> = counters.split_whitespace().filter_map(|s| s.parse().ok()).collect();
            if values.len() < 16 {
                continue;
            }

            let iface = self.class_root.join(name);
            let up = read_trimmed(&iface.join("operstate")).is_some_and(|s| s == "up");
            let speed_bps = if !up || is_loopback(name, &iface) {
                0
            } else {
                read_trimmed(&iface.join("speed"))
                    .and_then(|s| s.parse::<i64>().ok())
                    .filter(|&mbps| mbps > 0)
                    .map_or(UNKNOWN_SPEED_BPS, |mbps| mbps as u64 * 1_000_000)
            };

            rows.push(IfRow {
                name: name.to_string(),
                speed_bps,
                index: index as u32 + 1,
                // counters are 64-bit here; the table carries the low 32 bits
                in_octets: values[0] as u32,
                out_octets: values[8] as u32,
                oper_status: if up { oper_status::UP } else { oper_status::DOWN },
            });
        }

        Ok(rows)
    }
}

/// `lo`, or any device whose `flags` carry `IFF_LOOPBACK`.
fn is_loopback(name: &str, iface: &Path) -> bool {
    name == "lo"
        || read_trimmed(&iface.join("flags"))
            .and_then(|f| u64::from_str_radix(f.trim_start_matches("0x"), 16).ok())
            .is_some_and(|flags| flags & IFF_LOOPBACK != 0)
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

impl IfTableSource for ProcIfTable {
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let rows = self.snapshot()?;
        encode_table(&rows, buf)
    }
}
