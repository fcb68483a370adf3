//! Microsoft Graph drive wire types and canonical mapping.

use chrono::{DateTime, NaiveDateTime, Utc};
use core_client::error::{CloudError, Result};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use serde::Deserialize;

/// Graph timestamps are Zulu with optional fractional seconds:
/// `2016-03-21T20:01:37.388Z`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// A driveItem resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_date_time: Option<String>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    /// Present exactly when the item is a folder.
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    /// Present exactly when the item is a file.
    #[serde(default)]
    pub file: Option<FileFacet>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
    #[serde(default)]
    pub root: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub id: Option<String>,
}

/// Children / search page envelope.
#[derive(Debug, Deserialize)]
pub struct DriveItemPage {
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl DriveItem {
    pub(crate) fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        self.parent_reference
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .map(EntryLocator::by_id)
    }

    pub(crate) fn into_entry(self) -> CloudEntry {
        let locator = EntryLocator::by_id(&self.id);
        let created = self.created_date_time.as_deref().and_then(parse_timestamp);
        let modified = self
            .last_modified_date_time
            .as_deref()
            .and_then(parse_timestamp);
        let is_root = self.root.is_some();

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
                "expected a driveItem folder".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry() {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a driveItem file".into(),
            )),
        }
    }
}

impl From<GraphUser> for CloudUser {
    fn from(user: GraphUser) -> Self {
        CloudUser {
            id: user.id,
            name: user.given_name,
            display_name: user.display_name,
            email: user.user_principal_name,
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_fractional_and_plain() {
        assert_eq!(
            parse_timestamp("2016-03-21T20:01:37.388Z").unwrap(),
            Utc.with_ymd_and_hms(2016, 3, 21, 20, 1, 37).unwrap()
                + chrono::Duration::milliseconds(388)
        );
        assert_eq!(
            parse_timestamp("2016-03-21T20:01:37Z").unwrap(),
            Utc.with_ymd_and_hms(2016, 3, 21, 20, 1, 37).unwrap()
        );
    }

    #[test]
    fn test_folder_item_maps() {
        let json = r#"{
            "id": "0123456789abc",
            "name": "Photos",
            "size": 35212,
            "createdDateTime": "2016-03-21T20:01:37Z",
            "lastModifiedDateTime": "2016-03-21T20:01:37.388Z",
            "folder": { "childCount": 10 },
            "parentReference": { "driveId": "b!abc", "id": "root-id" }
        }"#;

        let item: DriveItem = serde_json::from_str(json).unwrap();
        assert!(item.is_folder());
        assert_eq!(item.parent_locator().unwrap(), EntryLocator::by_id("root-id"));

        let folder = item.into_folder().unwrap();
        assert_eq!(folder.locator, EntryLocator::by_id("0123456789abc"));
        assert_eq!(folder.size, Some(35212));
        assert!(!folder.is_root);
    }

    #[test]
    fn test_file_item_maps() {
        let json = r#"{
            "id": "f-1",
            "name": "vacation.jpg",
            "size": 57291,
            "file": { "mimeType": "image/jpeg" },
            "lastModifiedDateTime": "2016-03-21T20:01:37Z"
        }"#;

        let item: DriveItem = serde_json::from_str(json).unwrap();
        let file = item.into_file().unwrap();
        assert_eq!(file.name, "vacation.jpg");
        assert_eq!(file.size, Some(57291));
        assert!(file.created.is_none());
    }

    #[test]
    fn test_root_facet_detected() {
        let json = r#"{"id": "root-id", "name": "root", "folder": {}, "root": {}}"#;
        let item: DriveItem = serde_json::from_str(json).unwrap();
        let folder = item.into_folder().unwrap();
        assert!(folder.is_root);
    }

    #[test]
    fn test_page_envelope_with_next_link() {
        let json = r#"{
            "value": [
                {"id": "1", "name": "a", "folder": {}}
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/drive/items/root/children?$skiptoken=abc"
        }"#;

        let page: DriveItemPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.unwrap().contains("$skiptoken=abc"));
    }

    #[test]
    fn test_user_mapping() {
        let json = r#"{
            "id": "48d31887-5fad-4d73-a9f5-3c356e68a038",
            "displayName": "Megan Bowen",
            "givenName": "Megan",
            "userPrincipalName": "MeganB@M365x214355.onmicrosoft.com"
        }"#;

        let user: GraphUser = serde_json::from_str(json).unwrap();
        let user: CloudUser = user.into();
        assert_eq!(user.id, "48d31887-5fad-4d73-a9f5-3c356e68a038");
        assert_eq!(user.display_name.as_deref(), Some("Megan Bowen"));
        assert_eq!(
            user.email.as_deref(),
            Some("MeganB@M365x214355.onmicrosoft.com")
        );
    }
}
