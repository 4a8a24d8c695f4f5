//! Frame composition: star field, then the panel on top.
//!
//! Panel layout, rows relative to the top border:
//!
//! ```text
//!  0  ╭──────────────────────────────╮
//!  1  │ Heart: ♥   Mood: OK          │
//!  2  │           /\_/\              │
//!  3  │          (=^.^=)             │
//!  6  │ CPU  12% |██        |        │
//!  7  │ RAM  48% |██████    |        │
//!  8  │ RAM hog: firefox (9) 12% ... │
//!  9  │ SYS  22%  Kernel is hoarding │
//! 10  │ GPU   3% |          |        │
//! 11  │ NET 1.2 KB/s ↓   300 B/s ↑   │
//! 13  │ Stable. Boring. Good.        │
//! 14  │ Keys: q=quit   r=reset stars │
//! 15  ╰──────────────────────────────╯
//! ```

use crate::canvas::Canvas;
use crate::collectors::reserved;
use crate::mood::{face, Mood};
use crate::particles::ParticleField;
use crate::text::{bar_line, fit, human_bps, human_bytes};
use crate::types::{Fraction, ProcessMemoryGroup};

/// Panel height in rows.
pub const PANEL_HEIGHT: i32 = 16;
/// Narrowest panel.
pub const PANEL_MIN_WIDTH: i32 = 56;
/// Widest panel.
pub const PANEL_MAX_WIDTH: i32 = 86;
/// Bottom-row key reminder.
pub const KEY_HINT: &str = "Keys: q=quit   r=reset stars";

/// Everything the panel shows for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView<'a> {
    /// Seconds since start; drives the heartbeat and face animation.
    pub t: f64,
    /// Current mood.
    pub mood: Mood,
    /// Smoothed CPU.
    pub cpu_bar: Fraction,
    /// Memory in use.
    pub mem: Fraction,
    /// Largest memory consumer, if known.
    pub top: Option<&'a ProcessMemoryGroup>,
    /// OS-reserved memory.
    pub sys: Fraction,
    /// GPU utilization.
    pub gpu: Fraction,
    /// Inbound bytes per second.
    pub rx_bps: f64,
    /// Outbound bytes per second.
    pub tx_bps: f64,
    /// Mood one-liner.
    pub commentary: &'a str,
}

/// Where the panel sits on a `width` x `height` screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    /// Left border column.
    pub x0: i32,
    /// Top border row.
    pub y0: i32,
    /// Outer width.
    pub width: i32,
    /// Usable text width inside the borders and padding.
    pub inner_width: usize,
}

impl PanelGeometry {
    /// Centers the panel. On screens narrower than the minimum width the
    /// panel overhangs and is clipped.
    #[must_use]
    pub fn centered(width: u16, height: u16) -> Self {
        let (w, h) = (i32::from(width), i32::from(height));
        let box_w = (w - 4).clamp(PANEL_MIN_WIDTH, PANEL_MAX_WIDTH);
        Self {
            x0: (w - box_w).div_euclid(2),
            y0: (h - PANEL_HEIGHT).div_euclid(2),
            width: box_w,
            inner_width: (box_w - 4) as usize,
        }
    }
}

/// `♥` on the upper half of the beat, `♡` otherwise.
#[must_use]
pub fn heart(t: f64) -> char {
    if 0.5 + 0.5 * (2.2 * t).sin() > 0.5 {
        '♥'
    } else {
        '♡'
    }
}

/// The top consumer line.
#[must_use]
pub fn hog_line(top: Option<&ProcessMemoryGroup>) -> String {
    match top {
        Some(g) if !g.name.is_empty() => format!(
            "RAM hog: {} ({}) {:2}% {}",
            g.name,
            g.instance_count,
            g.fraction_of_total.percent(),
            human_bytes(g.aggregate_bytes)
        ),
        _ => "RAM hog: <unknown>".to_string(),
    }
}

/// Plots each star at its truncated position.
pub fn draw_particles(canvas: &mut Canvas, field: &ParticleField) {
    for p in field.particles() {
        canvas.put_char(p.x as i32, p.y as i32, p.glyph);
    }
}

/// Draws the bordered panel and its contents.
pub fn draw_panel(canvas: &mut Canvas, view: &PanelView<'_>) {
    let g = PanelGeometry::centered(canvas.width(), canvas.height());
    let (x0, y0) = (g.x0, g.y0);
    let span = "─".repeat((g.width - 2) as usize);
    let blank = " ".repeat((g.width - 2) as usize);

    canvas.put(x0, y0, &format!("╭{span}╮"));
    for row in 1..PANEL_HEIGHT - 1 {
        canvas.put(x0, y0 + row, &format!("│{blank}│"));
    }
    canvas.put(x0, y0 + PANEL_HEIGHT - 1, &format!("╰{span}╯"));

    let inner = g.inner_width;
    let mut line = |row: i32, text: &str| canvas.put(x0 + 2, y0 + row, &fit(text, inner));

    line(1, &format!("Heart: {}   Mood: {}", heart(view.t), view.mood));
    line(6, &bar_line("CPU", view.cpu_bar, inner));
    line(7, &bar_line("RAM", view.mem, inner));
    line(8, &hog_line(view.top));
    line(9, &format!("SYS {:3}%  {}", view.sys.percent(), reserved::commentary(view.sys)));
    line(10, &bar_line("GPU", view.gpu, inner));
    line(11, &format!("NET {} ↓   {} ↑", human_bps(view.rx_bps), human_bps(view.tx_bps)));
    line(13, view.commentary);
    line(PANEL_HEIGHT - 2, KEY_HINT);

    let cx = x0 + g.width / 2;
    let [ears, mid] = face(view.mood, view.t);
    canvas.put(cx - 3, y0 + 2, ears);
    canvas.put(cx - 3, y0 + 3, mid);
}

/// Composes a full frame: clears, plots stars, draws the panel.
///
/// Cells carry text only; the mood color is applied to the whole frame when
/// it is flushed.
pub fn compose(canvas: &mut Canvas, field: &ParticleField, view: &PanelView<'_>) {
    canvas.clear();
    draw_particles(canvas, field);
    draw_panel(canvas, view);
}
