//! Network throughput reader.
//!
//! Sums the 32-bit octet counters of every active interface in the
//! interface table. [`Throughput`] turns successive totals into rates,
//! treating a decrease as a counter wrap.

use crate::collectors::iftable::{fetch_table, parse_table, IfTableSource, ProcIfTable};
use crate::error::Result;
use crate::types::MetricReader;

/// Cumulative octets over active interfaces, modulo 2^32.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctetTotals {
    /// Received.
    pub rx: u32,
    /// Sent.
    pub tx: u32,
}

/// Reads summed interface counters.
pub struct NetworkReader {
    source: Box<dyn IfTableSource>,
}

impl std::fmt::Debug for NetworkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkReader").finish_non_exhaustive()
    }
}

impl NetworkReader {
    /// Opens the system interface table.
    pub fn open() -> Result<Self> {
        Ok(Self::with_source(ProcIfTable::open()?))
    }

    /// Creates a reader over an explicit table source.
    pub fn with_source(source: impl IfTableSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl MetricReader for NetworkReader {
    type Output = OctetTotals;

    fn id(&self) -> &'static str {
        "network"
    }

    fn read(&mut self) -> Result<OctetTotals> {
        let image = fetch_table(self.source.as_mut())?;
        let totals = parse_table(&image)?
            .iter()
            .filter(|row| row.is_active())
            .fold(OctetTotals::default(), |acc, row| OctetTotals {
                rx: acc.rx.wrapping_add(row.in_octets),
                tx: acc.tx.wrapping_add(row.out_octets),
            });
        Ok(totals)
    }
}

/// Converts successive [`OctetTotals`] into bytes per second.
#[derive(Debug, Clone, Copy, Default)]
pub struct Throughput {
    prev: Option<OctetTotals>,
    /// Time spent in failed reads since `prev` was taken.
    missed_secs: f64,
}

impl Throughput {
    /// Creates a tracker with no baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` and returns `(rx_bps, tx_bps)` since the previous
    /// update.
    ///
    /// The first update only sets the baseline and reports zero. A counter
    /// lower than its previous value has wrapped past 2^32. Time recorded
    /// with [`miss`](Self::miss) since the baseline counts toward `elapsed_secs`.
    pub fn update(&mut self, current: OctetTotals, elapsed_secs: f64) -> (f64, f64) {
        let elapsed_secs = elapsed_secs + std::mem::take(&mut self.missed_secs);
        let rates = match self.prev {
            Some(prev) if elapsed_secs > 0.0 => (
                rate(prev.rx, current.rx, elapsed_secs),
                rate(prev.tx, current.tx, elapsed_secs),
            ),
            _ => (0.0, 0.0),
        };
        self.prev = Some(current);
        rates
    }

    /// Records a tick whose table read failed. The baseline is kept and the
    /// next rate spans the missed time too.
    pub fn miss(&mut self, elapsed_secs: f64) {
        if self.prev.is_some() && elapsed_secs > 0.0 {
            self.missed_secs += elapsed_secs;
        }
    }

    /// Previous totals, if any.
    #[must_use]
    pub fn baseline(&self) -> Option<OctetTotals> {
        self.prev
    }
}

/// `((current - prev) mod 2^32) / elapsed`.
#[must_use]
pub fn rate(prev: u32, current: u32, elapsed_secs: f64) -> f64 {
    f64::from(current.wrapping_sub(prev)) / elapsed_secs
}
