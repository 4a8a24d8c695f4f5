//! Terminal access.
//!
//! The frame loop talks to the screen through [`Console`] so the lifecycle
//! can be exercised without a TTY. [`CrosstermConsole`] is the real one.

use crate::canvas::Canvas;
use crate::error::Result;
use crate::theme::MoodStyle;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyEvent};
use crossterm::execute;
use crossterm::style::{Attribute, ResetColor, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use std::io::{self, Stdout, Write};
use std::panic;
use std::time::Duration;

/// Size assumed when the terminal cannot report one.
pub const FALLBACK_SIZE: (u16, u16) = (110, 34);

/// A full-screen character terminal.
pub trait Console {
    /// Raw mode, alternate screen, hidden cursor.
    fn enter(&mut self) -> Result<()>;

    /// Current size as `(columns, rows)`.
    fn size(&mut self) -> Result<(u16, u16)>;

    /// Clears the whole screen.
    fn clear(&mut self) -> Result<()>;

    /// Draws a composed frame over the previous one.
    fn draw(&mut self, canvas: &Canvas, style: MoodStyle) -> Result<()>;

    /// Returns a pending key event without blocking.
    fn poll_key(&mut self) -> Result<Option<KeyEvent>>;

    /// Undoes [`enter`](Self::enter): colors reset, cursor shown, alternate
    /// screen left, raw mode off.
    fn restore(&mut self) -> Result<()>;
}

/// Resets color, shows the cursor, leaves the alternate screen and turns
/// raw mode off. Safe to call when the terminal was never set up.
pub fn restore_terminal() -> io::Result<()> {
    execute!(io::stdout(), SetAttribute(Attribute::Reset), ResetColor, Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()
}

/// Installs a panic hook that restores the terminal before the panic
/// message prints.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// The process's own terminal, on stdout.
#[derive(Debug)]
pub struct CrosstermConsole {
    out: Stdout,
}

impl CrosstermConsole {
    /// Wraps stdout. Nothing is changed until [`Console::enter`].
    #[must_use]
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for CrosstermConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for CrosstermConsole {
    fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(self.out, EnterAlternateScreen, Hide, MoveTo(0, 0))?;
        Ok(())
    }

    fn size(&mut self) -> Result<(u16, u16)> {
        Ok(terminal::size().unwrap_or(FALLBACK_SIZE))
    }

    fn clear(&mut self) -> Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }

    fn draw(&mut self, canvas: &Canvas, style: MoodStyle) -> Result<()> {
        let mut lock = self.out.lock();
        canvas.flush_to(&mut lock, style)?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    }

    fn restore(&mut self) -> Result<()> {
        execute!(self.out, SetAttribute(Attribute::Reset), ResetColor, Show, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        self.out.flush()?;
        Ok(())
    }
}
