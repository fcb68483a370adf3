//! Amazon Cloud Drive wire types and canonical mapping.

use chrono::{DateTime, NaiveDateTime, Utc};
use core_client::error::{CloudError, Result};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use serde::Deserialize;

/// Cloud Drive timestamps carry exactly three fractional digits:
/// `2014-03-07T22:31:12.173Z`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// A node resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    /// `FILE`, `FOLDER`, or `ASSET`.
    pub kind: String,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub content_properties: Option<ContentProperties>,
    #[serde(default)]
    pub is_root: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProperties {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Paged node listing (`/nodes`, `/nodes/{id}/children`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeList {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next_token: Option<String>,
    pub data: Vec<Node>,
}

/// Login-with-Amazon profile.
#[derive(Debug, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Node {
    pub(crate) fn is_folder(&self) -> bool {
        self.kind == "FOLDER"
    }

    /// The declared parent, when unambiguous. Multi-parent nodes (Cloud
    /// Drive allows them) skip the parent guard rather than guessing.
    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        match self.parents.as_slice() {
            [single] => Some(EntryLocator::by_id(single)),
            _ => None,
        }
    }

    pub(crate) fn into_entry(self) -> CloudEntry {
        let locator = EntryLocator::by_id(&self.id);
        let created = self.created_date.as_deref().and_then(parse_timestamp);
        let modified = self.modified_date.as_deref().and_then(parse_timestamp);
        let size = self.content_properties.as_ref().and_then(|p| p.size);
        let is_root = self.is_root.unwrap_or(false);

        if self.is_folder() {
            CloudEntry::Folder(CloudFolder {
                locator,
                name: self.name,
                size,
                created,
                modified,
                is_root,
            })
        } else {
            CloudEntry::File(CloudFile {
                locator,
                name: self.name,
                size,
                created,
                modified,
            })
        }
    }

    pub(crate) fn into_folder(self) -> Result<CloudFolder> {
        match self.into_entry() {
            CloudEntry::Folder(folder) => Ok(folder),
            CloudEntry::File(_) => Err(CloudError::MalformedResponse(
                "expected a Cloud Drive FOLDER node".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry() {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a Cloud Drive FILE node".into(),
            )),
        }
    }
}

impl From<Profile> for CloudUser {
    fn from(profile: Profile) -> Self {
        CloudUser {
            id: profile.user_id,
            display_name: profile.name.clone(),
            name: profile.name,
            email: profile.email,
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_requires_millis() {
        assert_eq!(
            parse_timestamp("2014-03-07T22:31:12.173Z").unwrap(),
            Utc.with_ymd_and_hms(2014, 3, 7, 22, 31, 12).unwrap()
                + chrono::Duration::milliseconds(173)
        );
        assert!(parse_timestamp("2014-03-07T22:31:12Z").is_none());
    }

    #[test]
    fn test_file_node_maps() {
        let json = r#"{
            "id": "fDhQNqosQTqnyFHobGqLfw",
            "name": "mom.jpg",
            "kind": "FILE",
            "createdDate": "2014-03-07T22:31:12.173Z",
            "modifiedDate": "2014-03-07T22:31:12.173Z",
            "parents": ["root-node-id"],
            "contentProperties": {"size": 291806, "contentType": "image/jpeg"}
        }"#;

        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(
            node.parent_locator().unwrap(),
            EntryLocator::by_id("root-node-id")
        );

        let file = node.into_file().unwrap();
        assert_eq!(file.size, Some(291806));
        assert_eq!(file.name, "mom.jpg");
    }

    #[test]
    fn test_multi_parent_node_skips_guard() {
        let json = r#"{
            "id": "n-1", "name": "shared", "kind": "FILE",
            "parents": ["p-1", "p-2"]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(node.parent_locator().is_none());
    }

    #[test]
    fn test_folder_node_with_root_flag() {
        let json = r#"{"id": "r", "name": "Amazon Drive", "kind": "FOLDER", "isRoot": true}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        let folder = node.into_folder().unwrap();
        assert!(folder.is_root);
        assert!(folder.size.is_none());
    }

    #[test]
    fn test_node_list_with_token() {
        let json = r#"{
            "count": 3,
            "nextToken": "kgkbpodpt6y",
            "data": [
                {"id": "1", "name": "a", "kind": "FOLDER"},
                {"id": "2", "name": "b.jpg", "kind": "FILE"}
            ]
        }"#;

        let list: NodeList = serde_json::from_str(json).unwrap();
        assert_eq!(list.next_token.as_deref(), Some("kgkbpodpt6y"));
        assert_eq!(list.data.len(), 2);
    }

    #[test]
    fn test_profile_mapping() {
        let json = r#"{
            "user_id": "amzn1.account.AEZI3A063427738YROOFT8WCXKDE",
            "name": "John Moreland",
            "email": "johnm@example.com"
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        let user: CloudUser = profile.into();
        assert_eq!(user.id, "amzn1.account.AEZI3A063427738YROOFT8WCXKDE");
        assert_eq!(user.email.as_deref(), Some("johnm@example.com"));
    }
}
