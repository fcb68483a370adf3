//! Bitcasa CloudFS wire types and canonical mapping.
//!
//! Every response is wrapped in a `{"result": .., "error": ..}` envelope;
//! timestamps are epoch milliseconds.

use chrono::{DateTime, TimeZone, Utc};
use core_client::error::{CloudError, Result};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub(crate) fn parse_timestamp(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: u32,
    pub message: String,
}

/// Unwrap an envelope, translating application-level errors.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_slice(body)
        .map_err(|e| CloudError::MalformedResponse(format!("Bitcasa envelope: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(CloudError::Remote {
            status: error.code.min(u16::MAX as u32) as u16,
            message: error.message,
        });
    }

    envelope.result.ok_or_else(|| {
        CloudError::MalformedResponse("Bitcasa envelope carried neither result nor error".into())
    })
}

/// A file or folder item.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// `folder` or `file`.
    #[serde(rename = "type")]
    pub item_type: String,
    pub absolute_path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub date_created: Option<i64>,
    #[serde(default)]
    pub date_content_last_modified: Option<i64>,
}

/// Listing / create / search result.
#[derive(Debug, Deserialize)]
pub struct ItemsResult {
    pub items: Vec<Item>,
}

/// Meta / mutation / upload result.
#[derive(Debug, Deserialize)]
pub struct MetaResult {
    pub meta: Item,
}

#[derive(Debug, Deserialize)]
pub struct ProfileResult {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Item {
    pub(crate) fn is_folder(&self) -> bool {
        self.item_type == "folder"
    }

    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        EntryLocator::by_path(&self.absolute_path)
            .parent_path()
            .map(EntryLocator::by_path)
    }

    pub(crate) fn into_entry(self) -> CloudEntry {
        let locator = EntryLocator::with_id_and_path(&self.id, &self.absolute_path);
        let created = self.date_created.and_then(parse_timestamp);
        let modified = self.date_content_last_modified.and_then(parse_timestamp);
        let is_root = self.absolute_path == "/";

        if self.is_folder() {
            CloudEntry::Folder(CloudFolder {
                locator,
                name: self.name,
                size: self.size,
                created,
                modified,
                is_root,
            })
        } else {
            CloudEntry::File(CloudFile {
                locator,
                name: self.name,
                size: self.size,
                created,
                modified,
            })
        }
    }

    pub(crate) fn into_folder(self) -> Result<CloudFolder> {
        match self.into_entry() {
            CloudEntry::Folder(folder) => Ok(folder),
            CloudEntry::File(_) => Err(CloudError::MalformedResponse(
                "expected a Bitcasa folder item".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry() {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a Bitcasa file item".into(),
            )),
        }
    }
}

impl From<ProfileResult> for CloudUser {
    fn from(profile: ProfileResult) -> Self {
        CloudUser {
            id: profile.id,
            name: profile.username,
            display_name: profile.display_name,
            email: profile.email,
            avatar_url: None,
        }
    }
}
