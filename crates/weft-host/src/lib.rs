//! # weft-host: The loop outside the engine
//!
//! The host driver pulls instructions from a
//! [`weft_engine::Engine`], performs them against a [`HostIo`]
//! implementation (console by default), and feeds replies back. It is the
//! only place where workflow side effects actually happen.

pub mod console;
pub mod driver;
pub mod host;
pub mod recording;


pub use console::ConsoleHost;
pub use driver::{Driver, DriverError, RunSummary};
pub use host::HostIo;
pub use recording::{HostEvent, RecordingHost};
