//! Core types shared by the readers, the smoothing stage and the renderer.
//!
//! - [`Fraction`]: a value clamped to `[0, 1]`
//! - [`MetricSample`]: one tick's worth of raw readings
//! - [`ProcessMemoryGroup`]: the biggest memory consumer, grouped by name
//! - [`MetricReader`]: trait for a single native metric source
//! - [`MetricSource`]: the seam the frame loop samples through

use crate::error::Result;
use std::fmt;

/// A share of some capacity, always within `[0, 1]`.
///
/// Construction clamps, so out-of-range or NaN readings from a native
/// counter can never leak into the display.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    /// Zero.
    pub const ZERO: Self = Self(0.0);
    /// One.
    pub const ONE: Self = Self(1.0);

    /// Creates a fraction, clamping `raw` into `[0, 1]`. NaN becomes 0.
    #[must_use]
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            Self::ZERO
        } else {
            Self(raw.clamp(0.0, 1.0))
        }
    }

    /// Creates a fraction from a percentage (`0..=100`).
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        Self::new(percent / 100.0)
    }

    /// Creates `part / whole`, or zero when `whole` is zero.
    #[must_use]
    pub fn ratio(part: u64, whole: u64) -> Self {
        if whole == 0 {
            Self::ZERO
        } else {
            Self::new(part as f64 / whole as f64)
        }
    }

    /// Returns the inner value.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Whole percent, truncated (what the panel prints).
    #[must_use]
    pub fn percent(self) -> u32 {
        (self.0 * 100.0) as u32
    }
}

impl From<Fraction> for f64 {
    fn from(value: Fraction) -> Self {
        value.0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Raw readings taken on one metrics-refresh tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSample {
    /// Processor busy share.
    pub cpu: Fraction,
    /// Physical memory in use.
    pub mem_used: Fraction,
    /// Total physical memory in bytes.
    pub mem_total_bytes: u64,
    /// Memory held by the OS for caches and kernel pools.
    pub sys_reserved: Fraction,
    /// GPU utilization.
    pub gpu: Fraction,
    /// Inbound bytes per second over active interfaces.
    pub rx_bps: f64,
    /// Outbound bytes per second over active interfaces.
    pub tx_bps: f64,
}

impl MetricSample {
    /// Combined network throughput in bytes per second.
    #[must_use]
    pub fn net_bps(&self) -> f64 {
        self.rx_bps + self.tx_bps
    }
}

/// All processes sharing an executable name, summed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessMemoryGroup {
    /// Executable base name.
    pub name: String,
    /// Memory summed over every instance, in bytes.
    pub aggregate_bytes: u64,
    /// `aggregate_bytes` relative to total physical memory.
    pub fraction_of_total: Fraction,
    /// Number of processes in the group.
    pub instance_count: u32,
}

/// A single native metric source.
///
/// A reader is created by its own `open` constructor, which acquires any
/// persistent query handle. `read` may be called any number of times while
/// the reader lives; dropping the reader releases the handle.
pub trait MetricReader {
    /// What one read produces.
    type Output;

    /// Short identifier used in logs and errors.
    fn id(&self) -> &'static str;

    /// Takes one reading.
    ///
    /// # Errors
    ///
    /// Returns an error when this particular read fails. Callers decide
    /// whether to reuse the previous value or report zero.
    fn read(&mut self) -> Result<Self::Output>;
}

/// Everything the frame loop needs from the host's metric facilities.
///
/// Implementations never fail: degraded sources report zero.
pub trait MetricSource {
    /// Reads every fast metric. `elapsed_secs` is the time since the
    /// previous call, used to turn counters into rates.
    fn sample(&mut self, elapsed_secs: f64) -> MetricSample;

    /// Scans processes for the largest memory consumer.
    fn top_consumer(&mut self, total_phys: u64) -> Option<ProcessMemoryGroup>;

    /// Releases every native handle. Must be idempotent.
    fn release(&mut self);
}
