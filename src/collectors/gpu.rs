//! GPU utilization reader.
//!
//! Collects one utilization value per engine instance the host exposes and
//! folds them into a single fraction with [`pick_utilization`].
//!
//! ## Sources
//!
//! - DRM sysfs: `/sys/class/drm/card*/device/gpu_busy_percent` (graphics
//!   engine) and `mem_busy_percent` (memory controller). Exposed by amdgpu
//!   and some other drivers.
//! - NVML (feature `nvidia`): graphics, encoder and decoder utilization per
//!   device.

use crate::error::{MonitorError, Result};
use crate::types::{Fraction, MetricReader};
use std::path::{Path, PathBuf};

/// Which engine an instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// The 3D / graphics engine.
    Graphics3d,
    /// Copy, video, memory controller and anything else.
    Other,
}

/// Utilization of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuEngineSample {
    /// Instance name, for logs.
    pub instance: String,
    /// Engine kind.
    pub kind: EngineKind,
    /// Utilization in percent.
    pub utilization: f64,
}

impl GpuEngineSample {
    /// Creates a sample.
    pub fn new(instance: impl Into<String>, kind: EngineKind, utilization: f64) -> Self {
        Self {
            instance: instance.into(),
            kind,
            utilization,
        }
    }
}

/// Graphics sums at or below this (percent) count as idle.
pub const GRAPHICS_IDLE_PERCENT: f64 = 0.1;

/// Folds per-engine samples into one GPU utilization.
///
/// Heuristic: the graphics engines are summed. When that sum is
/// effectively zero the busiest engine of any kind is used instead, so a
/// GPU doing only video decode or compute still registers.
#[must_use]
pub fn pick_utilization(engines: &[GpuEngineSample]) -> Fraction {
    let graphics: f64 = engines
        .iter()
        .filter(|e| e.kind == EngineKind::Graphics3d)
        .map(|e| e.utilization)
        .sum();

    let percent = if graphics > GRAPHICS_IDLE_PERCENT {
        graphics
    } else {
        engines.iter().map(|e| e.utilization).fold(0.0, f64::max)
    };

    Fraction::from_percent(percent)
}

/// A host facility that reports per-engine GPU utilization.
pub trait GpuEngineSource {
    /// Returns every engine instance's current utilization.
    fn engines(&mut self) -> Result<Vec<GpuEngineSample>>;
}

/// Engine counters exposed by DRM drivers in sysfs.
#[derive(Debug)]
pub struct DrmEngines {
    counters: Vec<(String, EngineKind, PathBuf)>,
}

impl DrmEngines {
    /// Discovers engine counters under `/sys/class/drm`.
    pub fn open() -> Result<Self> {
        Self::discover(Path::new("/sys/class/drm"))
    }

    /// Discovers engine counters under `root`.
    ///
    /// Fails with [`MonitorError::ReaderUnavailable`] when no card exposes a
    /// busy counter.
    pub fn discover(root: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(root).map_err(|_| MonitorError::ReaderUnavailable("gpu"))?;

        let mut cards: Vec<(String, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                // card0, card1, ... but not connectors like card0-DP-1
                let is_card = name
                    .strip_prefix("card")
                    .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
                is_card.then(|| (name, e.path().join("device")))
            })
            .collect();
        cards.sort();

        let mut counters = Vec::new();
        for (card, device) in cards {
            for (file, kind) in [
                ("gpu_busy_percent", EngineKind::Graphics3d),
                ("mem_busy_percent", EngineKind::Other),
            ] {
                let path = device.join(file);
                if path.is_file() {
                    counters.push((format!("{card}/{file}"), kind, path));
                }
            }
        }

        if counters.is_empty() {
            return Err(MonitorError::ReaderUnavailable("gpu"));
        }

        tracing::debug!(engines = counters.len(), "found DRM engine counters");
        Ok(Self { counters })
    }

    /// Number of engine counters found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no counters were found. Never true for a discovered source.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl GpuEngineSource for DrmEngines {
    fn engines(&mut self) -> Result<Vec<GpuEngineSample>> {
        self.counters
            .iter()
            .map(|(name, kind, path)| {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| MonitorError::sample("gpu", format!("{name}: {e}")))?;
                let utilization = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| MonitorError::sample("gpu", format!("{name}: {e}")))?;
                Ok(GpuEngineSample::new(name.clone(), *kind, utilization))
            })
            .collect()
    }
}

/// Engine utilization from NVIDIA devices via NVML.
#[cfg(feature = "nvidia")]
pub struct NvmlEngines {
    nvml: nvml_wrapper::Nvml,
    device_count: u32,
}

#[cfg(feature = "nvidia")]
impl std::fmt::Debug for NvmlEngines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvmlEngines").field("device_count", &self.device_count).finish()
    }
}

#[cfg(feature = "nvidia")]
impl NvmlEngines {
    /// Initializes NVML. Fails when the library is missing or no device is
    /// present.
    pub fn open() -> Result<Self> {
        let nvml = nvml_wrapper::Nvml::init().map_err(|_| MonitorError::ReaderUnavailable("gpu"))?;
        let device_count = nvml.device_count().unwrap_or(0);
        if device_count == 0 {
            return Err(MonitorError::ReaderUnavailable("gpu"));
        }
        Ok(Self { nvml, device_count })
    }
}

#[cfg(feature = "nvidia")]
impl GpuEngineSource for NvmlEngines {
    fn engines(&mut self) -> Result<Vec<GpuEngineSample>> {
        let mut engines = Vec::with_capacity(self.device_count as usize * 3);

        for i in 0..self.device_count {
            let device = self
                .nvml
                .device_by_index(i)
                .map_err(|e| MonitorError::sample("gpu", format!("GPU {i}: {e}")))?;

            let graphics = device
                .utilization_rates()
                .map_err(|e| MonitorError::sample("gpu", format!("GPU {i}: {e}")))?;
            engines.push(GpuEngineSample::new(
                format!("nvml{i}/graphics"),
                EngineKind::Graphics3d,
                f64::from(graphics.gpu),
            ));

            if let Ok(enc) = device.encoder_utilization() {
                engines.push(GpuEngineSample::new(
                    format!("nvml{i}/encoder"),
                    EngineKind::Other,
                    f64::from(enc.utilization),
                ));
            }
            if let Ok(dec) = device.decoder_utilization() {
                engines.push(GpuEngineSample::new(
                    format!("nvml{i}/decoder"),
                    EngineKind::Other,
                    f64::from(dec.utilization),
                ));
            }
        }

        Ok(engines)
    }
}

/// Reads GPU utilization across every available engine source.
pub struct GpuReader {
    sources: Vec<Box<dyn GpuEngineSource>>,
}

impl std::fmt::Debug for GpuReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuReader").field("sources", &self.sources.len()).finish()
    }
}

impl GpuReader {
    /// Opens every engine source the host supports.
    pub fn open() -> Result<Self> {
        let mut sources: Vec<Box<dyn GpuEngineSource>> = Vec::new();

        if let Ok(drm) = DrmEngines::open() {
            sources.push(Box::new(drm));
        }

        #[cfg(feature = "nvidia")]
        if let Ok(nvml) = NvmlEngines::open() {
            sources.push(Box::new(nvml));
        }

        if sources.is_empty() {
            return Err(MonitorError::ReaderUnavailable("gpu"));
        }
        Ok(Self { sources })
    }

    /// Creates a reader over a single source.
    pub fn with_source(source: impl GpuEngineSource + 'static) -> Self {
        Self {
            sources: vec![Box::new(source)],
        }
    }
}

impl MetricReader for GpuReader {
    type Output = Fraction;

    fn id(&self) -> &'static str {
        "gpu"
    }

    fn read(&mut self) -> Result<Fraction> {
        let mut engines = Vec::new();
        for source in &mut self.sources {
            engines.extend(source.engines()?);
        }
        Ok(pick_utilization(&engines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<GpuEngineSample>);

    impl GpuEngineSource for Fixed {
        fn engines(&mut self) -> Result<Vec<GpuEngineSample>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl GpuEngineSource for Failing {
        fn engines(&mut self) -> Result<Vec<GpuEngineSample>> {
            Err(MonitorError::sample("gpu", "device lost"))
        }
    }

    fn gfx(u: f64) -> GpuEngineSample {
        GpuEngineSample::new("gfx", EngineKind::Graphics3d, u)
    }

    fn other(u: f64) -> GpuEngineSample {
        GpuEngineSample::new("video", EngineKind::Other, u)
    }

    #[test]
    fn test_graphics_engines_are_summed() {
        let u = pick_utilization(&[gfx(20.0), gfx(15.0), other(90.0)]);
        assert!((u.get() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_idle_graphics_falls_back_to_busiest_engine() {
        let u = pick_utilization(&[gfx(0.05), other(40.0), other(12.0)]);
        assert!((u.get() - 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_graphics_sum_is_clamped() {
        assert_eq!(pick_utilization(&[gfx(80.0), gfx(70.0)]), Fraction::ONE);
    }

    #[test]
    fn test_no_engines_is_zero() {
        assert_eq!(pick_utilization(&[]), Fraction::ZERO);
    }

    #[test]
    fn test_reader_over_source() {
        let mut reader = GpuReader::with_source(Fixed(vec![gfx(50.0)]));
        assert_eq!(reader.read().unwrap().get(), 0.5);
        assert!(GpuReader::with_source(Failing).read().is_err());
    }

    #[test]
    fn test_drm_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let card0 = dir.path().join("card0/device");
        std::fs::create_dir_all(&card0).unwrap();
        std::fs::write(card0.join("gpu_busy_percent"), "0\n").unwrap();
        std::fs::write(card0.join("mem_busy_percent"), "33\n").unwrap();
        // connector directories are not cards
        std::fs::create_dir_all(dir.path().join("card0-DP-1/device")).unwrap();
        std::fs::write(dir.path().join("card0-DP-1/device/gpu_busy_percent"), "99\n").unwrap();

        let mut drm = DrmEngines::discover(dir.path()).unwrap();
        assert_eq!(drm.len(), 2);

        let engines = drm.engines().unwrap();
        assert_eq!(engines[0].kind, EngineKind::Graphics3d);
        assert!((pick_utilization(&engines).get() - 0.33).abs() < 1e-12);
    }

    #[test]
    fn test_drm_without_counters_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("card0/device")).unwrap();
        assert!(matches!(
            DrmEngines::discover(dir.path()),
            Err(MonitorError::ReaderUnavailable("gpu"))
        ));
    }
}
