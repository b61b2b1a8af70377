//! The host I/O seam.

use std::io;

use weft_types::Payload;

/// Where host-directed instructions land.
///
/// The [`crate::Driver`] dispatches each delivered instruction to one of
/// these methods. Implementations decide presentation; the driver decides
/// policy (debug suppression, banners, reply plumbing).
pub trait HostIo {
    /// An informational notification.
    fn notify(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()>;

    /// A non-fatal anomaly.
    fn warning(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()>;

    /// A routine- or engine-level failure report.
    fn error(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()>;

    /// A diagnostic trace. Only called when the driver runs in debug mode.
    fn debug(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()>;

    /// A named side effect.
    fn custom(&mut self, name: &str, payload: Option<&Payload>) -> io::Result<()>;

    /// Solicit a value from the user.
    fn request_input(&mut self, query: &str) -> io::Result<String>;

    /// Run delimiter (started / finished / aborted).
    fn banner(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }

    /// Visual separator emitted when the driver observes a state change.
    fn transition_separator(&mut self, _count: usize) -> io::Result<()> {
        Ok(())
    }
}
