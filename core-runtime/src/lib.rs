//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the decode core and the host
//! bridges:
//! - Logging and tracing setup
//! - Host log forwarding through `LoggerSink`
//! - Path redaction helpers for log fields
//!
//! ## Overview
//!
//! Libraries in this workspace only emit `tracing` events. Whoever owns the
//! process (a desktop binary, the Android `JNI_OnLoad` hook, a test) calls
//! [`logging::init_logging`] once to decide where those events end up.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
