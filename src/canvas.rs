//! Character grid the frame is composed in.
//!
//! Backed by a ratatui [`Buffer`]. Writes outside the grid are dropped, so
//! callers can draw a panel larger than a tiny terminal without checks.

use crossterm::cursor::MoveTo;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::queue;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::io::{self, Write};

use crate::theme::MoodStyle;

/// A terminal-sized grid of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    buf: Buffer,
}

impl Canvas {
    /// Creates a blank `width` x `height` grid.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            buf: Buffer::empty(Rect::new(0, 0, width, height)),
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.buf.area.width
    }

    /// Grid height in cells.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.buf.area.height
    }

    /// Whether the grid matches a terminal of `width` x `height`.
    #[must_use]
    pub fn fits(&self, width: u16, height: u16) -> bool {
        self.width() == width && self.height() == height
    }

    /// Blanks every cell.
    pub fn clear(&mut self) {
        self.buf.reset();
    }

    /// Writes one character. Out-of-grid positions are ignored.
    pub fn put_char(&mut self, x: i32, y: i32, ch: char) {
        let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
            return;
        };
        if let Some(cell) = self.buf.cell_mut((x, y)) {
            cell.set_char(ch);
        }
    }

    /// Writes `text` left to right from `(x, y)`, one character per cell,
    /// clipping at the grid edges.
    pub fn put(&mut self, x: i32, y: i32, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            self.put_char(x + i as i32, y, ch);
        }
    }

    /// The character at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn char_at(&self, x: u16, y: u16) -> Option<char> {
        self.buf.cell((x, y)).and_then(|c| c.symbol().chars().next())
    }

    /// Row `y` as a string, exactly `width` characters long.
    #[must_use]
    pub fn row(&self, y: u16) -> String {
        (0..self.width())
            .map(|x| self.char_at(x, y).unwrap_or(' '))
            .collect()
    }

    /// Every row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height()).map(move |y| self.row(y))
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    /// Writes the grid to `out` in one color, overwriting from the top-left
    /// corner, then resets attributes.
    ///
    /// Each row is positioned explicitly so no newline ever scrolls the
    /// screen.
    pub fn flush_to<W: Write>(&self, out: &mut W, style: MoodStyle) -> io::Result<()> {
        queue!(out, MoveTo(0, 0), SetForegroundColor(style.crossterm_color()))?;
        if style.bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        for (y, row) in self.rows().enumerate() {
            queue!(out, MoveTo(0, y as u16), Print(row))?;
        }
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        out.flush()
    }
}
