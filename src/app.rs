//! Frame loop and lifecycle.
//!
//! ```text
//! INIT ──enter ok──▶ RUNNING ──quit key / error──▶ SHUTDOWN
//!   └──────────────enter failed────────────────────────▲
//! ```
//!
//! All mutable state lives in [`App`]. [`run`] owns the transitions and
//! guarantees the terminal is restored and every reader released exactly
//! once, whichever way the loop ends.

use crate::canvas::Canvas;
use crate::compositor::{compose, PanelView};
use crate::config::Config;
use crate::error::Result;
use crate::input::{handle_key, Action};
use crate::mood::{classify, energy, Commentary, Mood, MoodInputs, Thresholds};
use crate::particles::ParticleField;
use crate::smoothing::{CpuSmoother, SmoothedState, MIN_DT};
use crate::terminal::Console;
use crate::theme::MoodStyle;
use crate::types::{MetricSample, MetricSource, ProcessMemoryGroup};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Where the lifecycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Terminal not yet set up.
    Init,
    /// Frame loop active.
    Running,
    /// Terminal restored and readers released.
    Shutdown,
}

/// Everything the frame loop mutates.
#[derive(Debug)]
pub struct App {
    stats_interval: f64,
    process_interval: f64,
    thresholds: Thresholds,
    commentary: Commentary,
    smoother: CpuSmoother,
    sample: MetricSample,
    cpu: SmoothedState,
    top: Option<ProcessMemoryGroup>,
    mood: Mood,
    last_stats: Option<f64>,
    last_process: Option<f64>,
    particles: ParticleField,
    rng: StdRng,
    canvas: Option<Canvas>,
    frames: u64,
}

impl App {
    /// Creates the loop state with an OS-seeded star field.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates the loop state with a given random source.
    #[must_use]
    pub fn with_rng(config: &Config, rng: StdRng) -> Self {
        Self {
            stats_interval: config.stats_interval().as_secs_f64(),
            process_interval: config.process_interval().as_secs_f64(),
            thresholds: config.thresholds,
            commentary: config.commentary.clone(),
            smoother: CpuSmoother::new(config.cpu.smoothing_params()),
            sample: MetricSample::default(),
            cpu: SmoothedState::default(),
            top: None,
            mood: Mood::Ok,
            last_stats: None,
            last_process: None,
            particles: ParticleField::new(),
            rng,
            canvas: None,
            frames: 0,
        }
    }

    /// Mood of the last frame.
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Latest raw sample.
    #[must_use]
    pub fn sample(&self) -> &MetricSample {
        &self.sample
    }

    /// Latest CPU number and bar.
    #[must_use]
    pub fn cpu(&self) -> SmoothedState {
        self.cpu
    }

    /// Latest top consumer.
    #[must_use]
    pub fn top_consumer(&self) -> Option<&ProcessMemoryGroup> {
        self.top.as_ref()
    }

    /// The star field.
    #[must_use]
    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    /// The last composed frame.
    #[must_use]
    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    /// Frames drawn so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Samples whatever is due at `now` (seconds since start).
    pub fn refresh<S: MetricSource + ?Sized>(&mut self, source: &mut S, now: f64) {
        let stats_due = self.last_stats.map_or(true, |t| now - t >= self.stats_interval);
        if stats_due {
            let dt = self.last_stats.map_or(self.stats_interval, |t| now - t).max(MIN_DT);
            self.sample = source.sample(dt);
            self.cpu = self.smoother.update(self.sample.cpu, now, dt);
            self.last_stats = Some(now);
        }

        let process_due = self.last_process.map_or(true, |t| now - t >= self.process_interval);
        if process_due {
            self.top = source.top_consumer(self.sample.mem_total_bytes);
            self.last_process = Some(now);
        }
    }

    /// Classifies the current readings.
    pub fn classify(&mut self) -> Mood {
        let inputs = MoodInputs {
            mem: self.sample.mem_used,
            top_process: self.top.as_ref().map(|g| g.fraction_of_total).unwrap_or_default(),
            cpu: self.cpu.displayed,
            gpu: self.sample.gpu,
            sys: self.sample.sys_reserved,
            net_bps: self.sample.net_bps(),
        };
        self.mood = classify(&inputs, &self.thresholds);
        self.mood
    }

    /// Scatters a fresh star field.
    pub fn reset_particles(&mut self, width: u16, height: u16) {
        self.particles.reset(width, height, &mut self.rng);
    }

    /// Runs one frame: resize handling, sampling, classification,
    /// animation, drawing and one key poll.
    ///
    /// Returns `false` when the user asked to quit.
    pub fn tick<S, C>(&mut self, source: &mut S, console: &mut C, now: f64) -> Result<bool>
    where
        S: MetricSource + ?Sized,
        C: Console + ?Sized,
    {
        let (width, height) = console.size()?;
        if !self.canvas.as_ref().is_some_and(|c| c.fits(width, height)) {
            tracing::debug!(width, height, "terminal resized");
            console.clear()?;
            self.canvas = Some(Canvas::new(width, height));
            self.particles.clear();
        }
        if self.particles.is_empty() {
            self.reset_particles(width, height);
        }

        self.refresh(source, now);
        let mood = self.classify();

        let level = energy(self.cpu.bar, self.sample.net_bps(), self.sample.gpu, &self.thresholds);
        self.particles.step(width, height, level);

        let commentary = self.commentary.line(mood, self.top.as_ref().map(|g| g.name.as_str()));
        let view = PanelView {
            t: now,
            mood,
            cpu_bar: self.cpu.bar,
            mem: self.sample.mem_used,
            top: self.top.as_ref(),
            sys: self.sample.sys_reserved,
            gpu: self.sample.gpu,
            rx_bps: self.sample.rx_bps,
            tx_bps: self.sample.tx_bps,
            commentary: &commentary,
        };

        if let Some(canvas) = self.canvas.as_mut() {
            compose(canvas, &self.particles, &view);
            console.draw(canvas, MoodStyle::for_mood(mood))?;
        }
        self.frames += 1;

        match console.poll_key()?.map_or(Action::None, handle_key) {
            Action::Quit => return Ok(false),
            Action::ResetParticles => self.reset_particles(width, height),
            Action::None => {}
        }
        Ok(true)
    }
}

/// Holds the terminal and the readers for the lifetime of the loop and
/// tears both down exactly once.
#[derive(Debug)]
pub struct Session<'a, S: MetricSource + ?Sized, C: Console + ?Sized> {
    source: &'a mut S,
    console: &'a mut C,
    state: Lifecycle,
}

impl<'a, S: MetricSource + ?Sized, C: Console + ?Sized> Session<'a, S, C> {
    /// Starts in [`Lifecycle::Init`]; nothing is touched yet.
    pub fn new(source: &'a mut S, console: &'a mut C) -> Self {
        Self {
            source,
            console,
            state: Lifecycle::Init,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Sets up the terminal.
    pub fn enter(&mut self) -> Result<()> {
        self.console.enter()?;
        self.state = Lifecycle::Running;
        Ok(())
    }

    /// Runs frames until quit or error.
    pub fn run_loop(&mut self, app: &mut App, frame_interval: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            let frame_start = Instant::now();
            let now = started.elapsed().as_secs_f64();
            if !app.tick(&mut *self.source, &mut *self.console, now)? {
                return Ok(());
            }
            std::thread::sleep(frame_interval.saturating_sub(frame_start.elapsed()));
        }
    }

    /// Restores the terminal and releases every reader. Only the first call
    /// does anything.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == Lifecycle::Shutdown {
            return Ok(());
        }
        self.state = Lifecycle::Shutdown;

        let restored = self.console.restore();
        self.source.release();
        tracing::info!("shut down");
        restored
    }
}

impl<S: MetricSource + ?Sized, C: Console + ?Sized> Drop for Session<'_, S, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "terminal restore failed");
        }
    }
}

/// Runs the monitor until the user quits.
///
/// # Errors
///
/// Returns the first terminal error. Teardown has already run by then.
pub fn run<S, C>(config: &Config, source: &mut S, console: &mut C) -> Result<()>
where
    S: MetricSource + ?Sized,
    C: Console + ?Sized,
{
    let mut app = App::new(config);
    let mut session = Session::new(source, console);

    let result = session.enter().and_then(|()| {
        tracing::info!(fps = config.global.frame_rate, "entering frame loop");
        session.run_loop(&mut app, config.frame_interval())
    });
    let restored = session.shutdown();

    tracing::info!(frames = app.frames(), "frame loop finished");
    result.and(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::types::Fraction;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::VecDeque;
    use std::io;

    #[derive(Default)]
    struct FakeSource {
        cpu: f64,
        mem: f64,
        top: Option<ProcessMemoryGroup>,
        samples: u32,
        scans: u32,
        releases: u32,
    }

    impl MetricSource for FakeSource {
        fn sample(&mut self, _elapsed_secs: f64) -> MetricSample {
            self.samples += 1;
            MetricSample {
                cpu: Fraction::new(self.cpu),
                mem_used: Fraction::new(self.mem),
                mem_total_bytes: 16 << 30,
                ..MetricSample::default()
            }
        }

        fn top_consumer(&mut self, _total_phys: u64) -> Option<ProcessMemoryGroup> {
            self.scans += 1;
            self.top.clone()
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    /// Console that records calls, replays keys and can fail on a given
    /// frame.
    #[derive(Default)]
    struct FakeConsole {
        size: (u16, u16),
        keys: VecDeque<KeyEvent>,
        fail_on_draw: Option<u64>,
        fail_enter: bool,
        entered: u32,
        restored: u32,
        clears: u32,
        draws: u64,
    }

    impl FakeConsole {
        fn new(width: u16, height: u16) -> Self {
            Self {
                size: (width, height),
                ..Self::default()
            }
        }
    }

    impl Console for FakeConsole {
        fn enter(&mut self) -> Result<()> {
            if self.fail_enter {
                return Err(io::Error::other("not a tty").into());
            }
            self.entered += 1;
            Ok(())
        }
        fn size(&mut self) -> Result<(u16, u16)> {
            Ok(self.size)
        }
        fn clear(&mut self) -> Result<()> {
            self.clears += 1;
            Ok(())
        }
        fn draw(&mut self, _canvas: &Canvas, _style: MoodStyle) -> Result<()> {
            self.draws += 1;
            if self.fail_on_draw == Some(self.draws) {
                return Err(io::Error::other("broken pipe").into());
            }
            Ok(())
        }
        fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
            Ok(self.keys.pop_front())
        }
        fn restore(&mut self) -> Result<()> {
            self.restored += 1;
            Ok(())
        }
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::with_rng(&Config::default(), StdRng::seed_from_u64(3))
    }

    #[test]
    fn test_tick_samples_on_cadence() {
        let mut app = test_app();
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);

        for frame in 0..10 {
            // 100 ms per frame: stats at 0.0, 0.3, 0.6, 0.9
            assert!(app.tick(&mut source, &mut console, f64::from(frame) * 0.1).unwrap());
        }
        assert_eq!(source.samples, 4);
        // process scan at 0.0 only
        assert_eq!(source.scans, 1);
        assert_eq!(console.draws, 10);
    }

    #[test]
    fn test_resize_clears_and_resets_stars() {
        let mut app = test_app();
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);

        app.tick(&mut source, &mut console, 0.0).unwrap();
        app.tick(&mut source, &mut console, 0.1).unwrap();
        assert_eq!(console.clears, 1);
        let before = app.particles().particles().len();

        console.size = (200, 60);
        app.tick(&mut source, &mut console, 0.2).unwrap();
        assert_eq!(console.clears, 2);
        assert!(app.canvas().unwrap().fits(200, 60));
        assert_ne!(app.particles().particles().len(), before);
    }

    #[test]
    fn test_quit_key_stops() {
        let mut app = test_app();
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        console.keys.push_back(press('x'));
        console.keys.push_back(press('q'));

        assert!(app.tick(&mut source, &mut console, 0.0).unwrap());
        assert!(!app.tick(&mut source, &mut console, 0.1).unwrap());
    }

    #[test]
    fn test_reset_key_rescatters() {
        let mut app = test_app();
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);

        app.tick(&mut source, &mut console, 0.0).unwrap();
        let before = app.particles().particles().to_vec();
        console.keys.push_back(press('r'));
        app.tick(&mut source, &mut console, 0.1).unwrap();

        assert_ne!(app.particles().particles(), before.as_slice());
    }

    #[test]
    fn test_mood_follows_readings() {
        let mut app = test_app();
        let mut source = FakeSource {
            cpu: 0.97,
            mem: 0.5,
            ..FakeSource::default()
        };
        let mut console = FakeConsole::new(80, 24);

        app.tick(&mut source, &mut console, 0.0).unwrap();
        assert_eq!(app.mood(), Mood::Rage);

        source.mem = 0.96;
        app.tick(&mut source, &mut console, 0.3).unwrap();
        assert_eq!(app.mood(), Mood::Panic);
    }

    #[test]
    fn test_chrome_names_the_hog() {
        let mut app = test_app();
        let mut source = FakeSource {
            top: Some(ProcessMemoryGroup {
                name: "chrome".to_string(),
                aggregate_bytes: 4 << 30,
                fraction_of_total: Fraction::new(0.25),
                instance_count: 31,
            }),
            ..FakeSource::default()
        };
        let mut console = FakeConsole::new(100, 30);

        app.tick(&mut source, &mut console, 0.0).unwrap();
        assert_eq!(app.mood(), Mood::Chrome);
        let canvas = app.canvas().unwrap();
        assert!(canvas.rows().any(|r| r.contains("chrome is eating RAM. Close it, champ.")));
        assert!(canvas.rows().any(|r| r.contains("RAM hog: chrome (31) 25% 4.0 GB")));
    }

    #[test]
    fn test_run_quits_and_tears_down_once() {
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        console.keys.extend([press('a'), press('q')]);

        run(&Config::default(), &mut source, &mut console).unwrap();

        assert_eq!(console.entered, 1);
        assert_eq!(console.restored, 1);
        assert_eq!(source.releases, 1);
        assert_eq!(console.draws, 2);
    }

    #[test]
    fn test_failure_mid_loop_still_tears_down_once() {
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        console.fail_on_draw = Some(3);

        let err = run(&Config::default(), &mut source, &mut console).unwrap_err();

        assert!(matches!(err, MonitorError::Terminal(_)));
        assert_eq!(console.restored, 1);
        assert_eq!(source.releases, 1);
    }

    #[test]
    fn test_failed_enter_still_releases() {
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        console.fail_enter = true;

        assert!(run(&Config::default(), &mut source, &mut console).is_err());
        assert_eq!(console.draws, 0);
        assert_eq!(console.restored, 1);
        assert_eq!(source.releases, 1);
    }

    #[test]
    fn test_session_shutdown_is_idempotent() {
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        {
            let mut session = Session::new(&mut source, &mut console);
            session.enter().unwrap();
            assert_eq!(session.state(), Lifecycle::Running);
            session.shutdown().unwrap();
            session.shutdown().unwrap();
            assert_eq!(session.state(), Lifecycle::Shutdown);
        }
        assert_eq!(console.restored, 1);
        assert_eq!(source.releases, 1);
    }

    #[test]
    fn test_session_drop_tears_down() {
        let mut source = FakeSource::default();
        let mut console = FakeConsole::new(80, 24);
        {
            let mut session = Session::new(&mut source, &mut console);
            session.enter().unwrap();
        }
        assert_eq!(console.restored, 1);
        assert_eq!(source.releases, 1);
    }
}
