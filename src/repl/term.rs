//! Raw terminal mode, scoped to a guard so a panic or early return
//! during an editing session still restores cooked mode — the Rust
//! `Drop`-based replacement for a `defer`-based restore.

use crossterm::terminal;
use std::io;

/// Enables raw mode (local echo and line buffering disabled) for as
/// long as this value is alive, restoring cooked mode on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enables raw mode and returns a guard that disables it again
    /// when dropped.
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
