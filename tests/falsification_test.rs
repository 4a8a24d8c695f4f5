//! Falsification tests for purrtop.
//!
//! Each test is a claim about observable behavior that a counterexample
//! would refute. Property claims are checked with proptest.
//!
//! Run: cargo test --test falsification_test

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use purrtop::canvas::Canvas;
use purrtop::collectors::network::{rate, Throughput};
use purrtop::collectors::process::{enumerate_pids_with, top_group, ProcessMemory, ProcessRecord};
use purrtop::collectors::{OctetTotals, ProcessHost};
use purrtop::compositor::{compose, PanelGeometry, PanelView};
use purrtop::mood::{classify, energy, Mood, MoodInputs, Thresholds};
use purrtop::particles::{particle_count, ParticleField, MAX_PARTICLES, MIN_PARTICLES};
use purrtop::smoothing::{ema_asym, CpuSmoother, SmoothingParams};
use purrtop::text::fit;
use purrtop::{Fraction, MonitorError};

use std::path::PathBuf;

// ============================================================================
// FRACTION CLAIMS
// ============================================================================

proptest! {
    /// Claim 0: any f64 reading becomes a value in [0, 1].
    #[test]
    fn claim_00_fraction_is_clamped(raw in any::<f64>()) {
        let f = Fraction::new(raw).get();
        prop_assert!((0.0..=1.0).contains(&f));
    }
}

// ============================================================================
// SMOOTHING CLAIMS
// ============================================================================

/// Claim 1: a step up settles faster than the same step down.
#[test]
fn claim_01_rise_is_faster_than_fall() {
    let p = SmoothingParams::default();
    let dt = 0.05;

    let mut up = 0.0;
    let mut up_steps = 0;
    while up < 0.99 {
        up = ema_asym(up, 1.0, dt, p.tau_up, p.tau_down);
        up_steps += 1;
    }

    let mut down = 1.0;
    let mut down_steps = 0;
    while down > 0.01 {
        down = ema_asym(down, 0.0, dt, p.tau_up, p.tau_down);
        down_steps += 1;
    }

    assert!(down_steps > up_steps, "fall {down_steps} steps, rise {up_steps} steps");
}

/// Claim 2: a dip below the glitch floor is held, a long one is not.
#[test]
fn claim_02_glitch_dip_is_held_briefly() {
    let mut s = CpuSmoother::default();
    s.update(Fraction::new(0.5), 0.0, 0.25);

    let held = s.update(Fraction::ZERO, 0.1, 0.1);
    assert_eq!(held.displayed, Fraction::new(0.5));

    let released = s.update(Fraction::ZERO, 0.5, 0.4);
    assert_eq!(released.displayed, Fraction::ZERO);
}

proptest! {
    /// Claim 3: the bar moves toward the target without overshooting it.
    #[test]
    fn claim_03_ema_never_overshoots(
        prev in 0.0f64..=1.0,
        raw in 0.0f64..=1.0,
        dt in 0.0f64..5.0,
    ) {
        let next = ema_asym(prev, raw, dt, 0.25, 0.80);
        let (lo, hi) = if prev <= raw { (prev, raw) } else { (raw, prev) };
        prop_assert!(next >= lo - 1e-12 && next <= hi + 1e-12);
    }

    /// Claim 4: any raw reading produces a displayed value and a bar in [0, 1].
    #[test]
    fn claim_04_smoothed_state_stays_in_range(raws in prop::collection::vec(-2.0f64..3.0, 1..50)) {
        let mut s = CpuSmoother::default();
        for (i, raw) in raws.into_iter().enumerate() {
            let state = s.update(Fraction::new(raw), i as f64 * 0.25, 0.25);
            prop_assert!((0.0..=1.0).contains(&state.displayed.get()));
            prop_assert!((0.0..=1.0).contains(&state.bar.get()));
        }
    }
}

// ============================================================================
// NETWORK CLAIMS
// ============================================================================

/// Claim 5: a counter that wraps past 2^32 still yields the true delta.
#[test]
fn claim_05_counter_wrap_is_not_negative() {
    let bps = rate(u32::MAX - 99, 100, 1.0);
    assert_eq!(bps, 200.0);
}

/// Claim 6: the first update is a baseline and reports nothing.
#[test]
fn claim_06_first_update_is_baseline() {
    let mut t = Throughput::new();
    assert_eq!(t.update(OctetTotals { rx: 5_000, tx: 7_000 }, 1.0), (0.0, 0.0));
    assert_eq!(t.update(OctetTotals { rx: 6_000, tx: 7_500 }, 0.5), (2_000.0, 1_000.0));
}

proptest! {
    /// Claim 7: throughput is (B - A) mod 2^32 over the elapsed time.
    #[test]
    fn claim_07_rate_is_modular_delta(a in any::<u32>(), b in any::<u32>(), dt in 0.01f64..10.0) {
        let bps = rate(a, b, dt);
        prop_assert!(bps >= 0.0);
        let expected = f64::from(b.wrapping_sub(a)) / dt;
        prop_assert!((bps - expected).abs() <= expected.abs() * 1e-12);
    }
}

// ============================================================================
// MOOD CLAIMS
// ============================================================================

fn calm() -> MoodInputs {
    MoodInputs {
        mem: Fraction::new(0.60),
        top_process: Fraction::new(0.02),
        cpu: Fraction::new(0.30),
        gpu: Fraction::new(0.10),
        sys: Fraction::new(0.10),
        net_bps: 1_000.0,
    }
}

/// Claim 8: every mood is reachable, and each rule wins over the ones after it.
#[test]
fn claim_08_precedence_matrix() {
    let t = Thresholds::default();
    let everything = MoodInputs {
        mem: Fraction::new(0.95),
        top_process: Fraction::new(0.20),
        cpu: Fraction::new(0.99),
        gpu: Fraction::new(0.90),
        sys: Fraction::new(0.30),
        net_bps: 3_000_000.0,
    };

    // Remove the winning condition one at a time and watch the next rule win
    let mut i = everything;
    assert_eq!(classify(&i, &t), Mood::Panic);
    i.mem = Fraction::new(0.60);
    assert_eq!(classify(&i, &t), Mood::Chrome);
    i.top_process = Fraction::new(0.02);
    assert_eq!(classify(&i, &t), Mood::Rage);
    i.cpu = Fraction::new(0.80);
    assert_eq!(classify(&i, &t), Mood::Tnt);
    i.cpu = Fraction::new(0.30);
    assert_eq!(classify(&i, &t), Mood::Shaders);
    i.gpu = Fraction::new(0.10);
    assert_eq!(classify(&i, &t), Mood::Win);
    i.sys = Fraction::new(0.10);
    assert_eq!(classify(&i, &t), Mood::Hyper);
    i.net_bps = 1_000.0;
    assert_eq!(classify(&i, &t), Mood::Ok);

    let sleepy = MoodInputs {
        cpu: Fraction::new(0.05),
        mem: Fraction::new(0.40),
        ..calm()
    };
    assert_eq!(classify(&sleepy, &t), Mood::Sleepy);
}

/// Claim 9: memory panic triggers at exactly the threshold.
#[test]
fn claim_09_panic_at_threshold() {
    let t = Thresholds::default();
    let at = MoodInputs {
        mem: Fraction::new(t.mem_panic),
        ..calm()
    };
    assert_eq!(classify(&at, &t), Mood::Panic);
}

proptest! {
    /// Claim 10: energy is always within [0, 1].
    #[test]
    fn claim_10_energy_in_range(
        cpu in 0.0f64..=1.0,
        gpu in 0.0f64..=1.0,
        net in 0.0f64..1e12,
    ) {
        let e = energy(Fraction::new(cpu), net, Fraction::new(gpu), &Thresholds::default());
        prop_assert!((0.0..=1.0).contains(&e));
    }

    /// Claim 11: memory at or above the panic line always panics.
    #[test]
    fn claim_11_panic_dominates(
        mem in 0.93f64..=1.0,
        top in 0.0f64..=1.0,
        cpu in 0.0f64..=1.0,
        gpu in 0.0f64..=1.0,
        sys in 0.0f64..=1.0,
        net in 0.0f64..1e9,
    ) {
        let i = MoodInputs {
            mem: Fraction::new(mem),
            top_process: Fraction::new(top),
            cpu: Fraction::new(cpu),
            gpu: Fraction::new(gpu),
            sys: Fraction::new(sys),
            net_bps: net,
        };
        prop_assert_eq!(classify(&i, &Thresholds::default()), Mood::Panic);
    }
}

// ============================================================================
// PROCESS CLAIMS
// ============================================================================

fn record(name: &str, bytes: u64) -> ProcessRecord {
    ProcessRecord {
        name: name.to_string(),
        bytes,
    }
}

/// Claim 12: processes sharing a name are summed before the largest is picked.
#[test]
fn claim_12_groups_are_summed() {
    let records = [record("a.exe", 100), record("a.exe", 150), record("b.exe", 200)];
    let top = top_group(&records, 1_000).unwrap();
    assert_eq!(top.name, "a.exe");
    assert_eq!(top.aggregate_bytes, 250);
    assert_eq!(top.instance_count, 2);
    assert_eq!(top.fraction_of_total, Fraction::new(0.25));
}

/// Host whose process table is always larger than the buffer.
struct EndlessHost {
    calls: Vec<usize>,
}

impl ProcessHost for EndlessHost {
    type Handle = ();

    fn enum_pids(&mut self, buf: &mut [u32]) -> purrtop::Result<usize> {
        self.calls.push(buf.len());
        Ok(buf.len())
    }

    fn open(&mut self, pid: u32) -> purrtop::Result<()> {
        Err(MonitorError::AccessDenied(pid))
    }

    fn memory(&mut self, _handle: &()) -> purrtop::Result<ProcessMemory> {
        Err(MonitorError::sample("process", "no such process"))
    }

    fn image_path(&mut self, _handle: &()) -> Option<PathBuf> {
        None
    }

    fn command_name(&mut self, _handle: &()) -> Option<String> {
        None
    }
}

/// Claim 13: pid enumeration gives up at the cap instead of growing forever.
#[test]
fn claim_13_pid_buffer_is_capped() {
    let mut host = EndlessHost { calls: Vec::new() };
    let pids = enumerate_pids_with(&mut host, 16, 256);
    assert!(pids.is_empty());
    assert_eq!(host.calls, vec![16, 32, 64, 128, 256]);
}

proptest! {
    /// Claim 14: the chosen group is never smaller than any other group.
    #[test]
    fn claim_14_top_group_is_maximal(
        entries in prop::collection::vec((0u8..5, 0u64..1_000_000), 1..40),
    ) {
        let records: Vec<_> = entries
            .iter()
            .map(|(n, b)| record(&format!("p{n}"), *b))
            .collect();
        let top = top_group(&records, 1 << 40).unwrap();

        for n in 0u8..5 {
            let name = format!("p{n}");
            let total: u64 = records.iter().filter(|r| r.name == name).map(|r| r.bytes).sum();
            prop_assert!(top.aggregate_bytes >= total);
        }
    }
}

// ============================================================================
// RENDERING CLAIMS
// ============================================================================

/// Claim 15: star count is bounded for any terminal size.
#[test]
fn claim_15_particle_count_bounded() {
    assert_eq!(particle_count(1, 1), MIN_PARTICLES);
    assert_eq!(particle_count(u16::MAX, u16::MAX), MAX_PARTICLES);
}

/// Claim 16: the panel is drawn even on a screen smaller than the panel.
#[test]
fn claim_16_tiny_screen_does_not_panic() {
    let mut canvas = Canvas::new(20, 5);
    let mut field = ParticleField::new();
    field.reset(20, 5, &mut StdRng::seed_from_u64(1));
    let view = PanelView {
        t: 1.0,
        mood: Mood::Ok,
        cpu_bar: Fraction::new(0.3),
        mem: Fraction::new(0.5),
        top: None,
        sys: Fraction::ZERO,
        gpu: Fraction::ZERO,
        rx_bps: 0.0,
        tx_bps: 0.0,
        commentary: "Nominal. Suspiciously nominal.",
    };
    compose(&mut canvas, &field, &view);
    assert_eq!(canvas.rows().count(), 5);
    assert!(PanelGeometry::centered(20, 5).x0 < 0);
}

proptest! {
    /// Claim 17: stars never leave the drift area.
    #[test]
    fn claim_17_particles_stay_in_bounds(
        w in 3u16..300,
        h in 3u16..120,
        seed in any::<u64>(),
        energies in prop::collection::vec(0.0f64..=1.0, 1..60),
    ) {
        let mut field = ParticleField::new();
        field.reset(w, h, &mut StdRng::seed_from_u64(seed));
        let max_x = (f64::from(w) - 2.0).max(1.0);
        let max_y = (f64::from(h) - 2.0).max(1.0);

        for e in energies {
            field.step(w, h, e);
        }
        for p in field.particles() {
            prop_assert!(p.x >= 1.0 && p.x <= max_x);
            prop_assert!(p.y >= 1.0 && p.y <= max_y);
        }
    }

    /// Claim 18: fitted text never exceeds the width.
    #[test]
    fn claim_18_fit_respects_width(s in "\\PC{0,120}", width in 0usize..100) {
        let out = fit(&s, width);
        prop_assert!(out.chars().count() <= width);
        if s.chars().count() <= width {
            prop_assert_eq!(out, s);
        }
    }
}
