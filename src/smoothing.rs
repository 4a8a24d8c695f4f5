//! CPU number and bar smoothing.
//!
//! The displayed CPU number is the raw reading with brief dips near zero
//! suppressed. The bar is an asymmetric exponential moving average of that
//! number: it rises quickly and falls slowly.

use crate::types::Fraction;

/// Smallest step used for smoothing, in seconds.
pub const MIN_DT: f64 = 1e-3;

/// One asymmetric EMA step.
///
/// Uses `tau_up` when `raw` is above `prev`, `tau_down` otherwise. A time
/// constant at or below 1e-6 snaps straight to `raw`.
#[must_use]
pub fn ema_asym(prev: f64, raw: f64, dt: f64, tau_up: f64, tau_down: f64) -> f64 {
    let tau = if raw > prev { tau_up } else { tau_down };
    if tau <= 1e-6 {
        return raw;
    }
    let a = 1.0 - (-dt.max(MIN_DT) / tau).exp();
    prev + a * (raw - prev)
}

/// Tuning for [`CpuSmoother`], all times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    /// Readings below this may be a counter glitch.
    pub glitch_floor: f64,
    /// How long after the last reading above the floor a dip is held.
    pub glitch_hold: f64,
    /// Rise time constant.
    pub tau_up: f64,
    /// Fall time constant.
    pub tau_down: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            glitch_floor: 0.02,
            glitch_hold: 0.40,
            tau_up: 0.25,
            tau_down: 0.80,
        }
    }
}

/// What the panel shows for the CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedState {
    /// Raw reading with glitch dips held. Drives the mood.
    pub displayed: Fraction,
    /// Smoothed value. Drives the bar and the star speed.
    pub bar: Fraction,
}

/// Jitter hold plus asymmetric smoothing for the CPU reading.
#[derive(Debug, Clone)]
pub struct CpuSmoother {
    params: SmoothingParams,
    state: SmoothedState,
    last_above_floor: Option<f64>,
}

impl CpuSmoother {
    /// Creates a smoother starting at zero.
    #[must_use]
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            state: SmoothedState::default(),
            last_above_floor: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SmoothedState {
        self.state
    }

    /// Feeds one raw reading taken at `now` (seconds), `dt` after the
    /// previous one.
    pub fn update(&mut self, raw: Fraction, now: f64, dt: f64) -> SmoothedState {
        let p = self.params;

        if raw.get() > p.glitch_floor {
            self.last_above_floor = Some(now);
        }

        let held = raw.get() < p.glitch_floor
            && self.last_above_floor.is_some_and(|t| now - t < p.glitch_hold);
        if !held {
            self.state.displayed = raw;
        }

        self.state.bar = Fraction::new(ema_asym(
            self.state.bar.get(),
            self.state.displayed.get(),
            dt,
            p.tau_up,
            p.tau_down,
        ));
        self.state
    }
}

impl Default for CpuSmoother {
    fn default() -> Self {
        Self::new(SmoothingParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ema_step_sizes() {
        let up = ema_asym(0.0, 1.0, 0.25, 0.25, 0.80);
        assert_relative_eq!(up, 1.0 - (-1.0f64).exp(), epsilon = 1e-12);

        let down = ema_asym(1.0, 0.0, 0.80, 0.25, 0.80);
        assert_relative_eq!(down, (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_tau_snaps() {
        assert_eq!(ema_asym(0.2, 0.9, 0.1, 0.0, 0.8), 0.9);
        assert_eq!(ema_asym(0.9, 0.2, 0.1, 0.25, 1e-7), 0.2);
    }

    #[test]
    fn test_dt_floor() {
        let zero_dt = ema_asym(0.0, 1.0, 0.0, 0.25, 0.8);
        let floor_dt = ema_asym(0.0, 1.0, MIN_DT, 0.25, 0.8);
        assert!(zero_dt > 0.0);
        assert_eq!(zero_dt, floor_dt);
    }

    #[test]
    fn test_single_dip_is_held() {
        let mut s = CpuSmoother::default();
        s.update(Fraction::new(0.30), 0.00, 0.25);
        let state = s.update(Fraction::new(0.0), 0.25, 0.25);
        assert_eq!(state.displayed.get(), 0.30);
    }

    #[test]
    fn test_long_dip_updates() {
        let mut s = CpuSmoother::default();
        s.update(Fraction::new(0.30), 0.00, 0.25);
        s.update(Fraction::new(0.0), 0.25, 0.25);
        let state = s.update(Fraction::new(0.0), 0.50, 0.25);
        assert_eq!(state.displayed, Fraction::ZERO);
    }

    #[test]
    fn test_low_reading_without_history_is_shown() {
        let mut s = CpuSmoother::default();
        assert_eq!(s.update(Fraction::new(0.01), 0.0, 0.25).displayed.get(), 0.01);
    }

    #[test]
    fn test_bar_trails_display() {
        let mut s = CpuSmoother::default();
        let state = s.update(Fraction::new(0.8), 0.0, 0.25);
        assert_eq!(state.displayed.get(), 0.8);
        assert!(state.bar.get() > 0.0 && state.bar.get() < 0.8);
    }
}
