//! Mood colors.
//!
//! The whole frame is drawn in one color picked by the mood. Colors are the
//! eight standard ANSI foregrounds, bold for the loud moods.

use crate::mood::Mood;
use ratatui::style::Color;

/// Foreground styling for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodStyle {
    /// Foreground color.
    pub color: Color,
    /// Bold text.
    pub bold: bool,
}

impl MoodStyle {
    /// The style for `mood`.
    #[must_use]
    pub fn for_mood(mood: Mood) -> Self {
        let (color, bold) = match mood {
            Mood::Sleepy => (Color::Cyan, false),
            Mood::Ok => (Color::Green, false),
            Mood::Hyper => (Color::Magenta, false),
            Mood::Shaders => (Color::Magenta, true),
            Mood::Tnt => (Color::Red, false),
            Mood::Chrome => (Color::Yellow, false),
            Mood::Panic => (Color::Yellow, true),
            Mood::Rage => (Color::Red, true),
            Mood::Win => (Color::Blue, false),
        };
        Self { color, bold }
    }

    /// The foreground as a crossterm color.
    #[must_use]
    pub fn crossterm_color(self) -> crossterm::style::Color {
        to_crossterm(self.color)
    }
}

/// Maps a ratatui color onto the ANSI color crossterm emits for it.
///
/// ratatui's plain names are the normal-intensity ANSI colors (SGR 30-37),
/// which crossterm calls `Dark*`.
fn to_crossterm(color: Color) -> crossterm::style::Color {
    use crossterm::style::Color as C;

    match color {
        Color::Reset => C::Reset,
        Color::Black => C::Black,
        Color::Red => C::DarkRed,
        Color::Green => C::DarkGreen,
        Color::Yellow => C::DarkYellow,
        Color::Blue => C::DarkBlue,
        Color::Magenta => C::DarkMagenta,
        Color::Cyan => C::DarkCyan,
        Color::Gray => C::Grey,
        Color::DarkGray => C::DarkGrey,
        Color::LightRed => C::Red,
        Color::LightGreen => C::Green,
        Color::LightYellow => C::Yellow,
        Color::LightBlue => C::Blue,
        Color::LightMagenta => C::Magenta,
        Color::LightCyan => C::Cyan,
        Color::White => C::White,
        Color::Rgb(r, g, b) => C::Rgb { r, g, b },
        Color::Indexed(i) => C::AnsiValue(i),
    }
}
