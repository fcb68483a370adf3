//! Box API wire types and canonical mapping.

use chrono::{DateTime, Utc};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use core_client::error::{CloudError, Result};
use serde::Deserialize;

/// Box timestamps carry a numeric UTC offset: `2013-05-10T18:50:41-07:00`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// An item as returned by folder listings, info lookups, and search.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub parent: Option<BoxParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxParent {
    pub id: String,
}

/// Paged collection envelope (`/folders/{id}/items`, `/search`).
#[derive(Debug, Deserialize)]
pub struct BoxItemCollection {
    pub total_count: u64,
    pub entries: Vec<BoxItem>,
}

/// Upload responses wrap the created file in a one-element collection.
#[derive(Debug, Deserialize)]
pub struct BoxUploadResponse {
    pub entries: Vec<BoxItem>,
}

#[derive(Debug, Deserialize)]
pub struct BoxUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl BoxItem {
    pub(crate) fn is_folder(&self) -> bool {
        self.item_type == "folder"
    }

    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        self.parent.as_ref().map(|p| EntryLocator::by_id(&p.id))
    }

    /// Map to the canonical entry. Optional-field parse failures are
    /// swallowed; only id/name are load-bearing (enforced by serde).
    pub(crate) fn into_entry(self) -> CloudEntry {
        let locator = EntryLocator::by_id(&self.id);
        let created = self.created_at.as_deref().and_then(parse_timestamp);
        let modified = self.modified_at.as_deref().and_then(parse_timestamp);

        if self.is_folder() {
            CloudEntry::Folder(CloudFolder {
                locator,
                name: self.name,
                size: self.size,
                created,
                modified,
                is_root: self.id == "0",
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
                "expected a Box folder item".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry() {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a Box file item".into(),
            )),
        }
    }
}

impl From<BoxUser> for CloudUser {
    fn from(user: BoxUser) -> Self {
        CloudUser {
            id: user.id,
            display_name: user.name.clone(),
            name: user.name,
            email: user.login,
            avatar_url: user.avatar_url,
        }
    }
}
