//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the cloud picker core:
//!
//! - **Logging**: structured logging built on `tracing`, with configurable
//!   output formats, module-level filtering, and redaction helpers for
//!   sensitive values (see [`logging`]).
//! - **Events**: a broadcast event bus carrying typed notifications, used by
//!   the adapter sessions to announce token-lifecycle transitions to any
//!   interested subscriber (see [`events`]).

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
