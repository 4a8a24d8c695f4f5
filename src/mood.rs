//! Mood classification.
//!
//! The mood is a pure function of the latest readings: an ordered list of
//! rules is evaluated and the first match wins. There is no hysteresis.

use crate::types::Fraction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The cat's current mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mood {
    /// Nothing going on.
    Sleepy,
    /// Normal load.
    Ok,
    /// Heavy network traffic.
    Hyper,
    /// GPU busy.
    Shaders,
    /// CPU hot.
    Tnt,
    /// One program is hogging memory.
    Chrome,
    /// Memory nearly exhausted.
    Panic,
    /// CPU pegged.
    Rage,
    /// The OS is holding a lot of memory.
    Win,
}

impl Mood {
    /// Every mood, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Sleepy,
        Self::Ok,
        Self::Hyper,
        Self::Shaders,
        Self::Tnt,
        Self::Chrome,
        Self::Panic,
        Self::Rage,
        Self::Win,
    ];

    /// Upper-case label shown in the panel.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sleepy => "SLEEPY",
            Self::Ok => "OK",
            Self::Hyper => "HYPER",
            Self::Shaders => "SHADERS",
            Self::Tnt => "TNT",
            Self::Chrome => "CHROME",
            Self::Panic => "PANIC",
            Self::Rage => "RAGE",
            Self::Win => "WIN",
        }
    }

    /// Built-in one-liner. `{name}` stands for the top memory consumer.
    #[must_use]
    pub fn default_commentary(self) -> &'static str {
        match self {
            Self::Sleepy => "Cat idle. If it dies, it dies.",
            Self::Ok => "Stable. Boring. Good.",
            Self::Hyper => "Zoomies. Packets doing parkour.",
            Self::Shaders => "GPU glam. FPS debt incoming.",
            Self::Tnt => "CPU >75%. Heat mode engaged.",
            Self::Chrome => "{name} is eating RAM. Close it, champ.",
            Self::Panic => "RAM is gone. This is not fine.",
            Self::Rage => "CPU boss fight. Something is cooking hard.",
            Self::Win => "Kernel reserved more. For what? Vibes.",
        }
    }

    /// The two faces this mood alternates between.
    #[must_use]
    pub fn faces(self) -> [&'static str; 2] {
        match self {
            Self::Ok => ["(=^.^=)", "(=^o^=)"],
            Self::Sleepy => ["(= -.-=)", "(= -_- =)"],
            Self::Hyper => ["(=^o^=)", "(=^O^=)"],
            Self::Shaders => ["(=^*^=)", "(=^.^=)"],
            Self::Tnt => ["(=^#^=)", "(=O.O=)"],
            Self::Chrome => ["(=o_o=)", "(=-_- =)"],
            Self::Panic => ["(=O.O=)", "(=0.0=)"],
            Self::Rage => ["(=>.<=)", "(=x_x=)"],
            Self::Win => ["(=o_o=)", "(=._.=)"],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Top line of the face.
pub const EARS: &str = " /\\_/\\ ";
/// Face shown during a blink.
pub const BLINK_FACE: &str = "(= -.-=)";

/// Whether the cat blinks at time `t` (seconds).
#[must_use]
pub fn is_blink(t: f64) -> bool {
    (t * 10.0) as i64 % 37 == 0
}

/// The two face lines for `mood` at time `t`. Frames alternate at 5 Hz.
#[must_use]
pub fn face(mood: Mood, t: f64) -> [&'static str; 2] {
    if is_blink(t) {
        return [EARS, BLINK_FACE];
    }
    let frames = mood.faces();
    let frame = (t * 5.0) as i64 % frames.len() as i64;
    [EARS, frames[frame as usize]]
}

/// Classification thresholds. Every field has a serde default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Memory at or above this is PANIC.
    pub mem_panic: f64,
    /// Top consumer above this share of memory is CHROME.
    pub hog: f64,
    /// CPU above this is RAGE.
    pub cpu_rage: f64,
    /// CPU above this is TNT.
    pub cpu_tnt: f64,
    /// GPU above this is SHADERS.
    pub gpu_shaders: f64,
    /// OS-reserved memory above this is WIN.
    pub sys_win: f64,
    /// Network bytes per second above this is HYPER.
    pub net_hyper_bps: f64,
    /// CPU below this (with low memory) is SLEEPY.
    pub sleepy_cpu: f64,
    /// Memory below this (with low CPU) is SLEEPY.
    pub sleepy_mem: f64,
    /// Network bytes per second that count as full energy.
    pub energy_net_full_bps: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mem_panic: 0.93,
            hog: 0.10,
            cpu_rage: 0.92,
            cpu_tnt: 0.75,
            gpu_shaders: 0.80,
            sys_win: 0.26,
            net_hyper_bps: 2_000_000.0,
            sleepy_cpu: 0.08,
            sleepy_mem: 0.55,
            energy_net_full_bps: 4_000_000.0,
        }
    }
}

/// Everything the rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoodInputs {
    /// Memory in use.
    pub mem: Fraction,
    /// Share of memory held by the top consumer group.
    pub top_process: Fraction,
    /// Displayed (jitter-held) CPU.
    pub cpu: Fraction,
    /// GPU utilization.
    pub gpu: Fraction,
    /// OS-reserved memory.
    pub sys: Fraction,
    /// Combined network bytes per second.
    pub net_bps: f64,
}

/// One classification rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Mood chosen when the rule matches.
    pub mood: Mood,
    /// Predicate.
    pub matches: fn(&MoodInputs, &Thresholds) -> bool,
}

fn panic(i: &MoodInputs, t: &Thresholds) -> bool {
    i.mem.get() >= t.mem_panic
}

fn chrome(i: &MoodInputs, t: &Thresholds) -> bool {
    i.top_process.get() > t.hog
}

fn rage(i: &MoodInputs, t: &Thresholds) -> bool {
    i.cpu.get() > t.cpu_rage
}

fn tnt(i: &MoodInputs, t: &Thresholds) -> bool {
    i.cpu.get() > t.cpu_tnt
}

fn shaders(i: &MoodInputs, t: &Thresholds) -> bool {
    i.gpu.get() > t.gpu_shaders
}

fn win(i: &MoodInputs, t: &Thresholds) -> bool {
    i.sys.get() > t.sys_win
}

fn hyper(i: &MoodInputs, t: &Thresholds) -> bool {
    i.net_bps > t.net_hyper_bps
}

fn sleepy(i: &MoodInputs, t: &Thresholds) -> bool {
    i.cpu.get() < t.sleepy_cpu && i.mem.get() < t.sleepy_mem
}

/// Rules in priority order. OK is the fallback when none match.
pub const RULES: &[Rule] = &[
    Rule { mood: Mood::Panic, matches: panic },
    Rule { mood: Mood::Chrome, matches: chrome },
    Rule { mood: Mood::Rage, matches: rage },
    Rule { mood: Mood::Tnt, matches: tnt },
    Rule { mood: Mood::Shaders, matches: shaders },
    Rule { mood: Mood::Win, matches: win },
    Rule { mood: Mood::Hyper, matches: hyper },
    Rule { mood: Mood::Sleepy, matches: sleepy },
];

/// Picks the mood for `inputs`.
#[must_use]
pub fn classify(inputs: &MoodInputs, thresholds: &Thresholds) -> Mood {
    RULES
        .iter()
        .find(|rule| (rule.matches)(inputs, thresholds))
        .map_or(Mood::Ok, |rule| rule.mood)
}

/// Animation energy in `[0, 1]`: a base level plus smoothed CPU, network
/// and GPU contributions.
#[must_use]
pub fn energy(cpu_bar: Fraction, net_bps: f64, gpu: Fraction, thresholds: &Thresholds) -> f64 {
    let net = (net_bps / thresholds.energy_net_full_bps).clamp(0.0, 1.0);
    let net = if net.is_nan() { 0.0 } else { net };
    (0.12 + 0.75 * cpu_bar.get() + 0.55 * net + 0.25 * gpu.get()).clamp(0.0, 1.0)
}

/// Mood one-liners, with optional per-mood overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commentary {
    overrides: BTreeMap<Mood, String>,
}

impl Commentary {
    /// Commentary with overrides for some moods.
    #[must_use]
    pub fn with_overrides(overrides: BTreeMap<Mood, String>) -> Self {
        Self { overrides }
    }

    /// The line for `mood`. `{name}` is replaced by the top consumer, or
    /// "Something" when none is known.
    #[must_use]
    pub fn line(&self, mood: Mood, top_consumer: Option<&str>) -> String {
        let template = self
            .overrides
            .get(&mood)
            .map_or(mood.default_commentary(), String::as_str);
        let name = top_consumer.filter(|n| !n.is_empty()).unwrap_or("Something");
        template.replace("{name}", name)
    }
}
