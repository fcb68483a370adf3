//! Canonical entity model.
//!
//! Every adapter parses its provider's JSON into these types. Entities are
//! immutable once returned to the caller: mutating operations produce new
//! values.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported cloud storage providers.
///
/// Each provider has its own REST dialect, OAuth endpoints, pagination
/// strategy, and addressing mode; the tag is what the registry keys
/// factories by.
///
/// # Examples
///
/// ```
/// use core_client::ProviderKind;
///
/// let provider = ProviderKind::Dropbox;
/// assert_eq!(provider.display_name(), "Dropbox");
/// assert_eq!(ProviderKind::parse("yandex_disk"), Some(ProviderKind::YandexDisk));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Box cloud storage
    Box,
    /// Dropbox cloud storage
    Dropbox,
    /// Microsoft OneDrive
    OneDrive,
    /// Bitcasa CloudFS
    Bitcasa,
    /// Amazon Cloud Drive
    CloudDrive,
    /// Yandex Disk
    YandexDisk,
}

impl ProviderKind {
    /// Get the human-readable display name for this provider
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Box => "Box",
            ProviderKind::Dropbox => "Dropbox",
            ProviderKind::OneDrive => "OneDrive",
            ProviderKind::Bitcasa => "Bitcasa",
            ProviderKind::CloudDrive => "Amazon Cloud Drive",
            ProviderKind::YandexDisk => "Yandex Disk",
        }
    }

    /// Get the provider identifier string
    ///
    /// Used for logging, event payloads, and account store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Box => "box",
            ProviderKind::Dropbox => "dropbox",
            ProviderKind::OneDrive => "onedrive",
            ProviderKind::Bitcasa => "bitcasa",
            ProviderKind::CloudDrive => "clouddrive",
            ProviderKind::YandexDisk => "yandex_disk",
        }
    }

    /// Parse a provider kind from a string identifier
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "box" => Some(ProviderKind::Box),
            "dropbox" => Some(ProviderKind::Dropbox),
            "onedrive" | "one_drive" => Some(ProviderKind::OneDrive),
            "bitcasa" => Some(ProviderKind::Bitcasa),
            "clouddrive" | "cloud_drive" | "amazon" => Some(ProviderKind::CloudDrive),
            "yandex_disk" | "yandex" | "yandexdisk" => Some(ProviderKind::YandexDisk),
            _ => None,
        }
    }

    /// All provider tags, in a stable order.
    pub fn all() -> [ProviderKind; 6] {
        [
            ProviderKind::Box,
            ProviderKind::Dropbox,
            ProviderKind::OneDrive,
            ProviderKind::Bitcasa,
            ProviderKind::CloudDrive,
            ProviderKind::YandexDisk,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How a provider addresses entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Opaque server-assigned ids (Box, OneDrive, CloudDrive)
    ById,
    /// Full path strings (Dropbox, Bitcasa, Yandex Disk)
    ByPath,
}

/// Provider-specific address of an entity.
///
/// Exactly one addressing half is guaranteed populated for any entity an
/// adapter returns; some providers supply both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EntryLocator {
    pub id: Option<String>,
    pub path: Option<String>,
}

impl EntryLocator {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            path: None,
        }
    }

    pub fn by_path(path: impl Into<String>) -> Self {
        Self {
            id: None,
            path: Some(path.into()),
        }
    }

    pub fn with_id_and_path(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            path: Some(path.into()),
        }
    }

    /// The id half, or `MalformedResponse` if this entity carries none.
    ///
    /// Used by id-addressed bindings when templating request URLs.
    pub fn require_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| CloudError::MalformedResponse("entity locator is missing an id".into()))
    }

    /// The path half, or `MalformedResponse` if this entity carries none.
    pub fn require_path(&self) -> Result<&str> {
        self.path.as_deref().ok_or_else(|| {
            CloudError::MalformedResponse("entity locator is missing a path".into())
        })
    }

    /// Whether two locators address the same entity.
    ///
    /// Ids are compared when both sides carry one; otherwise paths. Locators
    /// with no comparable half never match.
    pub fn matches(&self, other: &EntryLocator) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.path, &other.path) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Parent path derived from the path half, when one is present.
    ///
    /// `/a/b` → `/a`, `/a` → `/`, and scheme-prefixed roots keep their
    /// prefix (`disk:/a` → `disk:/`). The root itself has no parent.
    pub fn parent_path(&self) -> Option<String> {
        let path = self.path.as_deref()?;
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() || trimmed.ends_with(':') {
            return None;
        }
        let (head, _) = trimmed.rsplit_once('/')?;
        if head.is_empty() {
            Some("/".to_string())
        } else if head.ends_with(':') {
            Some(format!("{}/", head))
        } else {
            Some(head.to_string())
        }
    }
}

/// A folder as seen through the uniform contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFolder {
    pub locator: EntryLocator,
    pub name: String,
    /// Folder size in bytes, when the provider reports one.
    pub size: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// True only for the provider-fixed root; the root has no parent and is
    /// immutable (rename/move are no-ops, delete is rejected).
    pub is_root: bool,
}

impl CloudFolder {
    /// Synthesize the root folder for a provider-fixed locator.
    ///
    /// This is a pure construction: no I/O happens here or anywhere in
    /// `CloudAdapter::root`.
    pub fn root(locator: EntryLocator, name: impl Into<String>) -> Self {
        Self {
            locator,
            name: name.into(),
            size: None,
            created: None,
            modified: None,
            is_root: true,
        }
    }
}

/// A file as seen through the uniform contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFile {
    pub locator: EntryLocator,
    pub name: String,
    pub size: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Either kind of directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CloudEntry {
    Folder(CloudFolder),
    File(CloudFile),
}

impl CloudEntry {
    pub fn name(&self) -> &str {
        match self {
            CloudEntry::Folder(f) => &f.name,
            CloudEntry::File(f) => &f.name,
        }
    }

    pub fn locator(&self) -> &EntryLocator {
        match self {
            CloudEntry::Folder(f) => &f.locator,
            CloudEntry::File(f) => &f.locator,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, CloudEntry::Folder(_))
    }
}

/// The authenticated user behind a session.
///
/// `id` must be stable across sessions; it keys the local account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudUser {
    pub id: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// OAuth token material for one session.
///
/// Replaced wholesale on refresh, destroyed on logout. Providers without
/// refresh support leave `refresh_token`/`expires_at` empty.
///
/// # Security
///
/// The `Debug` implementation redacts token values; never log them directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// Create a token set expiring `expires_in` seconds from now.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }

    /// A bare access token with no refresh support and no known expiry.
    pub fn bearer_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Check if the access token is expired or will expire within the
    /// default 5 minute buffer. Tokens without a known expiry never report
    /// expired; the provider's 401 is the only signal for those.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// Check expiry with a custom buffer in seconds.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                Utc::now() >= expires_at - chrono::Duration::seconds(buffer_seconds)
            }
            None => false,
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What the provider should do when an upload target already exists.
///
/// Always explicit per call and passed to the wire, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail the upload if an entity with the same name exists.
    Fail,
    /// Replace the existing entity's content.
    Overwrite,
}

/// Which entity kinds a search should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Files,
    Folders,
    All,
}

impl SearchScope {
    /// Whether an entry of the given kind belongs in results of this scope.
    pub fn admits(&self, is_folder: bool) -> bool {
        match self {
            SearchScope::Files => !is_folder,
            SearchScope::Folders => is_folder,
            SearchScope::All => true,
        }
    }
}
