//! # Cloud Picker Core Client
//!
//! The provider-adapter abstraction layer: one uniform contract for
//! manipulating files and folders across cloud storage providers with
//! incompatible REST dialects.
//!
//! ## Architecture
//!
//! ```text
//! caller ──> CloudAdapter (contract)
//!               │
//!               ▼
//!          ProviderClient ──── AdapterSession (token lifecycle,
//!               │                              single-flight refresh)
//!               │ paging / transfer engines
//!               ▼
//!          ProviderBinding (per-provider strategy: endpoints,
//!               │            wire types, pagination signal)
//!               ▼
//!          HttpTransport (host-supplied)
//! ```
//!
//! Each `provider-*` crate supplies only a [`ProviderBinding`]: endpoint
//! templates, a pagination strategy, an addressing mode, and the JSON →
//! canonical mapping. Everything the six providers used to re-solve
//! independently — auth refresh, pagination, retry-on-not-ready, id/path
//! duality, error translation — lives here once.

pub mod accounts;
pub mod adapter;
pub mod binding;
pub mod blocking;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod multipart;
pub mod paging;
pub mod registry;
pub mod session;
pub mod transfer;

pub use accounts::{AccountRecord, AccountStore};
pub use adapter::CloudAdapter;
pub use binding::{
    DownloadStage, ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding,
};
pub use blocking::BlockingAdapter;
pub use client::ProviderClient;
pub use config::ProviderConfig;
pub use dispatch::{spawn_call, spawn_listing, spawn_search, BackgroundCall, CallId};
pub use error::{CloudError, Result};
pub use model::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ProviderKind, SearchScope, TokenSet,
};
pub use registry::{AdapterFactory, AdapterParts, AdapterRegistry};
pub use session::{AdapterSession, TokenState};
