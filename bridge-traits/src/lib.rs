//! # Host Bridge Traits
//!
//! Abstractions the host application must provide to the cloud picker core.
//!
//! The core never talks to the network, the keychain, or the disk directly.
//! Instead it is handed implementations of the traits in this crate:
//!
//! - [`http::HttpTransport`] — executes HTTP requests built by the adapters
//! - [`storage::SecureStore`] — durable, secure persistence for account records
//! - [`storage::LocalStore`] — local file sink for downloads and thumbnails
//!
//! Keeping these behind traits lets the picker run against any HTTP client
//! and any credential store, and lets tests substitute deterministic mocks.

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use storage::{LocalStore, SecureStore};
