//! Panel text formatting.
//!
//! Widths are counted in characters; every glyph the panel uses occupies one
//! terminal cell.

use crate::types::Fraction;

/// Fits `s` into `width` characters.
///
/// Strings that fit are returned unchanged. Longer strings are cut to
/// `width - 3` characters followed by `...`; widths of 3 or less are cut
/// hard. The result never exceeds `width`.
#[must_use]
pub fn fit(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width <= 3 {
        return s.chars().take(width).collect();
    }
    let mut out: String = s.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

/// Scales `value` by 1024 until it drops below 1024 or the units run out.
fn scale_binary(value: f64, units: &[&str]) -> String {
    let mut x = if value.is_nan() { 0.0 } else { value.max(0.0) };
    let mut i = 0;
    while x >= 1024.0 && i < units.len() - 1 {
        x /= 1024.0;
        i += 1;
    }
    if i == 0 {
        format!("{} {}", x as u64, units[0])
    } else {
        format!("{x:.1} {}", units[i])
    }
}

/// Formats a rate: `512 B/s`, `1.5 KB/s`, `3.0 MB/s`, `1.2 GB/s`.
#[must_use]
pub fn human_bps(bps: f64) -> String {
    scale_binary(bps, &["B/s", "KB/s", "MB/s", "GB/s"])
}

/// Formats a size: `512 B`, `1.5 KB`, `3.0 MB`, `1.2 GB`.
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    scale_binary(bytes as f64, &["B", "KB", "MB", "GB"])
}

/// A solid bar `width` cells wide, `round(value * width)` of them filled.
#[must_use]
pub fn bar(value: Fraction, width: usize) -> String {
    let filled = ((value.get() * width as f64).round() as usize).min(width);
    let mut s = "█".repeat(filled);
    s.push_str(&" ".repeat(width - filled));
    s
}

/// A labelled bar filling `inner_width`: `CPU  42% |████      |`.
#[must_use]
pub fn bar_line(name: &str, value: Fraction, inner_width: usize) -> String {
    let left = format!("{name} {:3}% |", value.percent());
    let bar_width = inner_width.saturating_sub(left.chars().count() + 1).max(1);
    format!("{left}{}|", bar(value, bar_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_unchanged_when_short() {
        assert_eq!(fit("hello", 5), "hello");
        assert_eq!(fit("hello", 10), "hello");
    }

    #[test]
    fn test_fit_ellipsis() {
        assert_eq!(fit("hello world", 8), "hello...");
        assert_eq!(fit("hello", 4), "h...");
    }

    #[test]
    fn test_fit_narrow_widths() {
        assert_eq!(fit("hello", 3), "hel");
        assert_eq!(fit("hello", 1), "h");
        assert_eq!(fit("hello", 0), "");
    }

    #[test]
    fn test_fit_counts_chars() {
        assert_eq!(fit("♥♥♥♥♥", 5), "♥♥♥♥♥");
        assert_eq!(fit("♥♥♥♥♥♥", 5), "♥♥...");
    }

    #[test]
    fn test_human_bps() {
        assert_eq!(human_bps(0.0), "0 B/s");
        assert_eq!(human_bps(1023.9), "1023 B/s");
        assert_eq!(human_bps(1536.0), "1.5 KB/s");
        assert_eq!(human_bps(3.0 * 1024.0 * 1024.0), "3.0 MB/s");
        assert_eq!(human_bps(5.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0), "5120.0 GB/s");
        assert_eq!(human_bps(-5.0), "0 B/s");
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1024), "1.0 KB");
        assert_eq!(human_bytes(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn test_bar_rounding() {
        assert_eq!(bar(Fraction::new(0.5), 4), "██  ");
        assert_eq!(bar(Fraction::ZERO, 3), "   ");
        assert_eq!(bar(Fraction::ONE, 3), "███");
        assert_eq!(bar(Fraction::new(0.16), 10), "██        ");
    }

    #[test]
    fn test_bar_line_fills_inner_width() {
        let line = bar_line("CPU", Fraction::new(0.5), 30);
        assert!(line.starts_with("CPU  50% |"));
        assert!(line.ends_with('|'));
        assert_eq!(line.chars().count(), 30);
    }

    #[test]
    fn test_bar_line_minimum_bar() {
        let line = bar_line("RAM", Fraction::ONE, 4);
        assert_eq!(line, "RAM 100% |█|");
    }
}
