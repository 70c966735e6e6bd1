//! The read-eval-print loop: a raw-terminal [`LineEditor`] wired to the
//! [`crate::compiler`] driver and the running JavaScript host.
//!
//! ## Concurrency
//!
//! The spec models the REPL as a signal waiter and an input loop
//! joined by a completion channel. In practice, raw mode (which this
//! module enables via [`RawModeGuard`]) disables the terminal's `ISIG`
//! processing, so `Ctrl+C` never reaches the process as `SIGINT` in
//! the first place — it arrives as an ordinary key event. The "signal
//! waiter" and "input loop" therefore collapse into one task here:
//! [`KeyAction::Interrupt`] is recognized at the same point every other
//! key is, and terminates the loop exactly as a delivered signal would.
//! A genuine `SIGTERM` sent to the process is left to Rust's default
//! disposition (terminate), which still runs [`RawModeGuard`]'s `Drop`
//! during unwind for any panic but not for a raw signal kill — matching
//! the original's own best-effort terminal restoration.

mod line;
mod term;

pub use line::LineEditor;
pub use term::RawModeGuard;

use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};

use crate::compiler::{self, HostDriver};
use crate::diagnostics;
use crate::error::WispError;
use crate::pp::{self, HostFrame};
use crate::runtime::RuntimeConfig;

/// A semantic editing action, decoupled from crossterm's key event
/// type so the dispatch table in [`translate_key`] can be tested
/// without a real terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    InsertChar(char),
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveHome,
    MoveEnd,
    DeleteWordLeft,
    DeleteWordRight,
    HistoryPrev,
    HistoryNext,
    Submit,
    Interrupt,
}

/// Maps a raw key event to the [`KeyAction`] table in spec §4.5.
pub fn translate_key(key: KeyEvent) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(KeyAction::Interrupt),
        KeyCode::Char('d') if ctrl => Some(KeyAction::Interrupt),
        KeyCode::Up => Some(KeyAction::HistoryPrev),
        KeyCode::Down => Some(KeyAction::HistoryNext),
        KeyCode::Left if ctrl => Some(KeyAction::MoveWordLeft),
        KeyCode::Right if ctrl => Some(KeyAction::MoveWordRight),
        KeyCode::Left => Some(KeyAction::MoveLeft),
        KeyCode::Right => Some(KeyAction::MoveRight),
        KeyCode::Home => Some(KeyAction::MoveHome),
        KeyCode::End => Some(KeyAction::MoveEnd),
        KeyCode::Backspace if ctrl => Some(KeyAction::DeleteWordLeft),
        KeyCode::Backspace => Some(KeyAction::Backspace),
        KeyCode::Delete if ctrl => Some(KeyAction::DeleteWordRight),
        KeyCode::Delete => Some(KeyAction::Delete),
        KeyCode::Enter => Some(KeyAction::Submit),
        KeyCode::Char(c) => Some(KeyAction::InsertChar(c)),
        _ => None,
    }
}

/// The result of applying one [`KeyAction`] to a [`LineEditor`].
pub enum Outcome {
    /// Keep editing; redraw the line.
    Continue,
    /// The line was submitted; evaluate it.
    Submitted(String),
    /// The loop should terminate.
    Interrupted,
}

/// Applies `action` to `editor`, returning what the caller should do
/// next.
pub fn apply_action(editor: &mut LineEditor, action: KeyAction) -> Outcome {
    match action {
        KeyAction::InsertChar(c) => {
            editor.insert_char(c);
            Outcome::Continue
        }
        KeyAction::Backspace => {
            editor.backspace();
            Outcome::Continue
        }
        KeyAction::Delete => {
            editor.delete();
            Outcome::Continue
        }
        KeyAction::MoveLeft => {
            editor.move_left();
            Outcome::Continue
        }
        KeyAction::MoveRight => {
            editor.move_right();
            Outcome::Continue
        }
        KeyAction::MoveWordLeft => {
            editor.move_word_left();
            Outcome::Continue
        }
        KeyAction::MoveWordRight => {
            editor.move_word_right();
            Outcome::Continue
        }
        KeyAction::MoveHome => {
            editor.move_home();
            Outcome::Continue
        }
        KeyAction::MoveEnd => {
            editor.move_end();
            Outcome::Continue
        }
        KeyAction::DeleteWordLeft => {
            editor.delete_word_left();
            Outcome::Continue
        }
        KeyAction::DeleteWordRight => {
            editor.delete_word_right();
            Outcome::Continue
        }
        KeyAction::HistoryPrev => {
            editor.history_prev();
            Outcome::Continue
        }
        KeyAction::HistoryNext => {
            editor.history_next();
            Outcome::Continue
        }
        KeyAction::Submit => Outcome::Submitted(editor.submit()),
        KeyAction::Interrupt => Outcome::Interrupted,
    }
}

/// Redraws the prompt line: carriage return, erase to end of line,
/// print `"> " + line`, then move the cursor back to its logical
/// column.
fn redraw(editor: &LineEditor) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(
        stdout,
        cursor::MoveToColumn(0),
        Clear(ClearType::UntilNewLine),
        Print(editor.render()),
    )?;
    let behind = editor.line().chars().count().saturating_sub(editor.cursor());
    if behind > 0 {
        execute!(stdout, cursor::MoveLeft(behind as u16))?;
    }
    stdout.flush()
}

/// True if `line` is a bare `(exit ...)` call, the REPL's own
/// shutdown form (handled before reaching the host at all).
fn is_exit(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed == "(exit)" || trimmed.starts_with("(exit ")
}

/// Evaluates one submitted line: compiles it against the host bridge,
/// sends the result to the host, and renders the response or a
/// recovered diagnostic. Never returns an error — parse/expand/host
/// failures are printed and the loop continues, matching the REPL's
/// per-line error recovery.
fn eval_line(driver: &mut HostDriver, line: &str) {
    let js = match compiler::compile(line, driver) {
        Ok(js) => js,
        Err(err) => {
            print!("\r\n{}\r\n", diagnostics::render(line, &err).replace('\n', "\r\n"));
            return;
        }
    };
    match driver.run_js(&js) {
        Ok(HostFrame::Result(text)) if text == pp::DEFINITION_SENTINEL => {
            let echo = pp::definition_echo(line).unwrap_or_else(|| text.clone());
            print!("\r\n{echo}\r\n");
        }
        Ok(HostFrame::Result(text)) => print!("\r\n{text}\r\n"),
        Ok(HostFrame::Error(message)) => print!("\r\nhost error: {message}\r\n"),
        Err(err) => {
            let rendered = match &err {
                WispError::Host(e) => e.to_string(),
                other => other.to_string(),
            };
            print!("\r\nhost error: {rendered}\r\n");
        }
    }
    let _ = io::stdout().flush();
}

/// Runs the interactive REPL until `(exit ...)`, `Ctrl+C`, or `Ctrl+D`.
pub fn run(config: RuntimeConfig) -> Result<(), WispError> {
    let mut driver = HostDriver::spawn(config)?;
    let _raw = RawModeGuard::acquire()?;

    let mut editor = LineEditor::new();
    redraw(&editor)?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        let Some(action) = translate_key(key) else {
            continue;
        };
        match apply_action(&mut editor, action) {
            Outcome::Continue => redraw(&editor)?,
            Outcome::Interrupted => break,
            Outcome::Submitted(line) => {
                if is_exit(&line) {
                    break;
                }
                eval_line(&mut driver, &line);
                redraw(&editor)?;
            }
        }
    }
    print!("\r\n");
    let _ = io::stdout().flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    #[test]
    fn plain_characters_insert() {
        assert_eq!(translate_key(key(KeyCode::Char('x'))), Some(KeyAction::InsertChar('x')));
    }

    #[test]
    fn ctrl_c_is_interrupt() {
        assert_eq!(translate_key(ctrl_key(KeyCode::Char('c'))), Some(KeyAction::Interrupt));
    }

    #[test]
    fn ctrl_arrows_are_word_motion() {
        assert_eq!(translate_key(ctrl_key(KeyCode::Left)), Some(KeyAction::MoveWordLeft));
        assert_eq!(translate_key(ctrl_key(KeyCode::Right)), Some(KeyAction::MoveWordRight));
    }

    #[test]
    fn plain_arrows_are_cursor_motion() {
        assert_eq!(translate_key(key(KeyCode::Left)), Some(KeyAction::MoveLeft));
        assert_eq!(translate_key(key(KeyCode::Right)), Some(KeyAction::MoveRight));
    }

    #[test]
    fn enter_submits() {
        assert_eq!(translate_key(key(KeyCode::Enter)), Some(KeyAction::Submit));
    }

    #[test]
    fn apply_submit_returns_the_line_and_clears_the_buffer() {
        let mut editor = LineEditor::new();
        editor.insert_str("(+ 1 1)");
        match apply_action(&mut editor, KeyAction::Submit) {
            Outcome::Submitted(line) => assert_eq!(line, "(+ 1 1)"),
            _ => panic!("expected Submitted"),
        }
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn exit_form_is_recognized_with_and_without_arguments() {
        assert!(is_exit("(exit)"));
        assert!(is_exit("(exit 0)"));
        assert!(!is_exit("(exit-code 0)"));
        assert!(!is_exit("(+ 1 1)"));
    }
}
