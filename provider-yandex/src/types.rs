//! Yandex Disk wire types and canonical mapping.

use chrono::{DateTime, Utc};
use core_client::error::{CloudError, Result};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use serde::Deserialize;

/// Yandex timestamps carry a colon offset: `2014-04-22T10:32:49+04:00`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A resource (file or dir), possibly with an embedded child listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub name: String,
    pub path: String,
    /// `dir` or `file`.
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<ResourceList>,
}

/// The `_embedded` listing of a dir resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList {
    pub items: Vec<Resource>,
    pub total: u64,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Link answer for create/move/delete style operations.
#[derive(Debug, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub templated: Option<bool>,
}

/// Passport identity (`login.yandex.ru/info`).
#[derive(Debug, Deserialize)]
pub struct PassportInfo {
    pub id: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_email: Option<String>,
    #[serde(default)]
    pub default_avatar_id: Option<String>,
}

impl Resource {
    pub(crate) fn is_folder(&self) -> bool {
        self.resource_type == "dir"
    }

    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        EntryLocator::by_path(&self.path)
            .parent_path()
            .map(EntryLocator::by_path)
    }

    pub(crate) fn into_entry(self) -> CloudEntry {
        let locator = EntryLocator::by_path(&self.path);
        let created = self.created.as_deref().and_then(parse_timestamp);
        let modified = self.modified.as_deref().and_then(parse_timestamp);
        let is_root = self.path == "disk:/";

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
                "expected a Yandex dir resource".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry() {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a Yandex file resource".into(),
            )),
        }
    }
}

impl From<PassportInfo> for CloudUser {
    fn from(info: PassportInfo) -> Self {
        let avatar_url = info.default_avatar_id.as_deref().map(|avatar| {
            format!("https://avatars.yandex.net/get-yapic/{}/islands-200", avatar)
        });
        CloudUser {
            id: info.id,
            name: info.login,
            display_name: info.display_name,
            email: info.default_email,
            avatar_url,
        }
    }
}
