//! Line input for the pager.
//!
//! On a terminal, lines are read in raw mode so Ctrl-C and Ctrl-D end the
//! session like `q` instead of killing the process. Anything else (pipes,
//! tests) reads plain lines from a `BufRead`.

use std::io::{self, BufRead, Write};

use crossterm::event::{read as ct_read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// A source of user commands, one line at a time.
pub trait InputSource {
    /// Read one line without its terminator. `None` means the user asked
    /// to leave (end of input or an interrupt).
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Lines from any buffered reader.
pub struct LineInput<R> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Raw-mode line editor on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    pub fn new() -> Self {
        Self
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// What a key does to the line being edited.
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Insert(char),
    Erase,
    Submit,
    Abort,
    Ignore,
}

fn key_action(key: &KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c' | 'd')) => KeyAction::Abort,
        (_, KeyCode::Enter) => KeyAction::Submit,
        (_, KeyCode::Backspace) => KeyAction::Erase,
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => KeyAction::Insert(c),
        _ => KeyAction::Ignore,
    }
}

impl InputSource for TerminalInput {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        let mut line = String::new();
        let _guard = RawModeGuard::enable()?;

        loop {
            let Event::Key(key) = ct_read()? else {
                continue;
            };
            match key_action(&key) {
                KeyAction::Insert(c) => {
                    line.push(c);
                    write!(stdout, "{c}")?;
                }
                KeyAction::Erase => {
                    if line.pop().is_some() {
                        write!(stdout, "\u{8} \u{8}")?;
                    }
                }
                KeyAction::Submit => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(Some(line));
                }
                KeyAction::Abort => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(None);
                }
                KeyAction::Ignore => {}
            }
            stdout.flush()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_input_strips_terminators() {
        let mut input = LineInput::new(Cursor::new("n\r\n12\nq"));
        assert_eq!(input.read_line().unwrap().as_deref(), Some("n"));
        assert_eq!(input.read_line().unwrap().as_deref(), Some("12"));
        assert_eq!(input.read_line().unwrap().as_deref(), Some("q"));
        assert_eq!(input.read_line().unwrap(), None);
    }

    #[test]
    fn test_ctrl_c_aborts() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_action(&key), KeyAction::Abort);
        let key = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(key_action(&key), KeyAction::Abort);
    }

    #[test]
    fn test_plain_keys() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(key_action(&key), KeyAction::Insert('c'));
        let key = KeyEvent::new(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert_eq!(key_action(&key), KeyAction::Insert('N'));
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(key_action(&key), KeyAction::Submit);
        let key = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(key_action(&key), KeyAction::Erase);
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(key_action(&key), KeyAction::Ignore);
    }
}
