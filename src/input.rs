//! Key handling.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a keypress asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the monitor.
    Quit,
    /// Re-scatter the star field.
    ResetParticles,
    /// Nothing.
    None,
}

/// Maps a key event to an action. Key releases and repeats are ignored.
#[must_use]
pub fn handle_key(event: KeyEvent) -> Action {
    if event.kind != KeyEventKind::Press {
        return Action::None;
    }

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c' | 'C') => Action::Quit,
            _ => Action::None,
        };
    }

    match event.code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r' | 'R') => Action::ResetParticles,
        _ => Action::None,
    }
}
