//! Serial touchscreen subsystem
//!
//! The display (a Nextion panel) speaks a plain-text command protocol:
//! every command, inbound or outbound, ends with three 0xFF bytes.
//! `link` assembles and decodes inbound frames, `commands` serializes
//! outbound ones, and `view` keeps the on-screen state (current bank,
//! page, blink bits) in sync with storage.

pub mod commands;
pub mod link;
pub mod view;

pub use commands::ScreenCommand;
pub use link::{Button, LinkAccumulator, ScreenEvent, TERMINATOR};
pub use view::{Page, ScreenView};

use anyhow::Result;
use tracing::{debug, info};

/// Byte transport to and from the display.
pub trait ScreenPort {
    /// Write one serialized command, terminator included.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Drain whatever inbound bytes are available right now.
    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reopen the link at a new baud rate (link speed negotiation).
    fn reopen(&mut self, baud: u32) -> Result<()>;
}

/// Screen port that logs outbound commands instead of driving hardware.
///
/// Useful for running the core without a display attached and for
/// validating command traffic during development.
pub struct ConsolePort;

impl ScreenPort for ConsolePort {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let text_end = bytes.len().saturating_sub(link::TERMINATOR_RUN);
        debug!("screen <- {}", String::from_utf8_lossy(&bytes[..text_end]));
        Ok(())
    }

    fn try_read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn reopen(&mut self, baud: u32) -> Result<()> {
        info!(baud, "console screen: reopen is a no-op");
        Ok(())
    }
}
