//! Drifting star field behind the panel.

use rand::Rng;

/// Star glyphs.
pub const GLYPHS: [char; 5] = ['·', '.', '*', '+', '°'];

/// Fewest stars for any terminal size.
pub const MIN_PARTICLES: usize = 70;
/// Most stars for any terminal size.
pub const MAX_PARTICLES: usize = 180;

/// One star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Column.
    pub x: f64,
    /// Row.
    pub y: f64,
    /// Base horizontal velocity, cells per step.
    pub vx: f64,
    /// Base vertical velocity, cells per step.
    pub vy: f64,
    /// Glyph drawn at the position.
    pub glyph: char,
}

/// Star count for a `width` x `height` terminal.
#[must_use]
pub fn particle_count(width: u16, height: u16) -> usize {
    (usize::from(width) * usize::from(height) / 90).clamp(MIN_PARTICLES, MAX_PARTICLES)
}

/// Speed multiplier for an energy level.
#[must_use]
pub fn speed_factor(energy: f64) -> f64 {
    0.25 + 1.75 * energy
}

/// All stars on screen.
#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Creates an empty field. Call [`reset`](Self::reset) before drawing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stars currently in the field.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Whether the field needs a reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Drops every star.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Scatters a fresh set of stars over a `width` x `height` area.
    pub fn reset<R: Rng + ?Sized>(&mut self, width: u16, height: u16, rng: &mut R) {
        let (max_x, max_y) = bounds(width, height);
        let count = particle_count(width, height);

        self.particles.clear();
        self.particles.extend((0..count).map(|_| Particle {
            x: rng.random_range(1.0..=max_x),
            y: rng.random_range(1.0..=max_y),
            vx: signed(rng, 0.8),
            vy: signed(rng, 0.4),
            glyph: GLYPHS[rng.random_range(0..GLYPHS.len())],
        }));
    }

    /// Advances every star by its velocity scaled with `energy`.
    ///
    /// Stars reflect off the edges: a star that crosses a bound is put back
    /// on it and that velocity component flips sign.
    pub fn step(&mut self, width: u16, height: u16, energy: f64) {
        let (max_x, max_y) = bounds(width, height);
        let k = speed_factor(energy);

        for p in &mut self.particles {
            p.x += p.vx * k;
            p.y += p.vy * k;
            reflect(&mut p.x, &mut p.vx, max_x);
            reflect(&mut p.y, &mut p.vy, max_y);
        }
    }
}

/// Upper bounds of the drift area. Never below the lower bound of 1.
fn bounds(width: u16, height: u16) -> (f64, f64) {
    let max_x = (f64::from(width) - 2.0).max(1.0);
    let max_y = (f64::from(height) - 2.0).max(1.0);
    (max_x, max_y)
}

fn reflect(pos: &mut f64, vel: &mut f64, max: f64) {
    if *pos < 1.0 {
        *pos = 1.0;
        *vel = -*vel;
    }
    if *pos > max {
        *pos = max;
        *vel = -*vel;
    }
}

/// Uniform in `(-limit, limit)`.
fn signed<R: Rng + ?Sized>(rng: &mut R, limit: f64) -> f64 {
    let magnitude = rng.random::<f64>() * limit;
    if rng.random::<bool>() {
        magnitude
    } else {
        -magnitude
    }
}
