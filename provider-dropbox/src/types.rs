//! Dropbox API v2 wire types and canonical mapping.

use chrono::{DateTime, NaiveDateTime, Utc};
use core_client::error::{CloudError, Result};
use core_client::{CloudEntry, CloudFile, CloudFolder, CloudUser, EntryLocator};
use serde::Deserialize;

/// Dropbox timestamps are second-precision Zulu: `2015-05-12T15:50:38Z`.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Metadata entry from listings, `get_metadata`, move/create responses.
///
/// The `.tag` discriminator is absent in some envelopes (`files/upload`
/// responses, `create_folder_v2` metadata), where the kind is already known
/// from context.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(rename = ".tag", default)]
    pub tag: Option<String>,
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub client_modified: Option<String>,
    #[serde(default)]
    pub server_modified: Option<String>,
}

/// `files/list_folder` (and `/continue`) envelope.
#[derive(Debug, Deserialize)]
pub struct ListFolderResponse {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// `files/create_folder_v2`, `files/move_v2` envelope.
#[derive(Debug, Deserialize)]
pub struct MetadataEnvelope {
    pub metadata: Metadata,
}

/// `files/search_v2` envelope.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<SearchMatch>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchMatch {
    pub metadata: SearchMatchMetadata,
}

#[derive(Debug, Deserialize)]
pub struct SearchMatchMetadata {
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: AccountName,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountName {
    pub display_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
}

impl Metadata {
    pub(crate) fn is_folder(&self) -> bool {
        self.tag.as_deref() == Some("folder")
    }

    pub(crate) fn path(&self) -> Result<&str> {
        self.path_display
            .as_deref()
            .or(self.path_lower.as_deref())
            .ok_or_else(|| {
                CloudError::MalformedResponse("Dropbox metadata carried no path".into())
            })
    }

    /// Parent path declared by the entry's own path.
    pub(crate) fn parent_locator(&self) -> Option<EntryLocator> {
        let path = self.path_display.as_deref().or(self.path_lower.as_deref())?;
        EntryLocator::by_path(path)
            .parent_path()
            .map(EntryLocator::by_path)
    }

    /// Map to a canonical entry; `assume_folder` resolves tag-less
    /// envelopes where the kind is contextually known.
    pub(crate) fn into_entry(self, assume_folder: Option<bool>) -> Result<CloudEntry> {
        let folder = match self.tag.as_deref() {
            Some("folder") => true,
            Some("file") => false,
            Some(other) => {
                return Err(CloudError::MalformedResponse(format!(
                    "unsupported Dropbox metadata tag: {}",
                    other
                )))
            }
            None => assume_folder.ok_or_else(|| {
                CloudError::MalformedResponse("Dropbox metadata carried no .tag".into())
            })?,
        };

        let locator = EntryLocator::by_path(self.path()?);
        let modified = self
            .server_modified
            .as_deref()
            .or(self.client_modified.as_deref())
            .and_then(parse_timestamp);

        if folder {
            Ok(CloudEntry::Folder(CloudFolder {
                locator,
                name: self.name,
                size: None,
                created: None, // Dropbox does not report creation times
                modified,
                is_root: false,
            }))
        } else {
            Ok(CloudEntry::File(CloudFile {
                locator,
                name: self.name,
                size: self.size,
                created: None,
                modified,
            }))
        }
    }

    pub(crate) fn into_folder(self) -> Result<CloudFolder> {
        match self.into_entry(Some(true))? {
            CloudEntry::Folder(folder) => Ok(folder),
            CloudEntry::File(_) => Err(CloudError::MalformedResponse(
                "expected a Dropbox folder".into(),
            )),
        }
    }

    pub(crate) fn into_file(self) -> Result<CloudFile> {
        match self.into_entry(Some(false))? {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "expected a Dropbox file".into(),
            )),
        }
    }
}

impl From<Account> for CloudUser {
    fn from(account: Account) -> Self {
        CloudUser {
            id: account.account_id,
            name: account.name.given_name,
            display_name: Some(account.name.display_name),
            email: account.email,
            avatar_url: account.profile_photo_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2015-05-12T15:50:38Z").unwrap(),
            Utc.with_ymd_and_hms(2015, 5, 12, 15, 50, 38).unwrap()
        );
        assert!(parse_timestamp("2015-05-12T15:50:38.123Z").is_none());
    }

    #[test]
    fn test_file_metadata_maps() {
        let json = r#"{
            ".tag": "file",
            "name": "Prime_Numbers.txt",
            "path_display": "/Homework/math/Prime_Numbers.txt",
            "path_lower": "/homework/math/prime_numbers.txt",
            "id": "id:a4ayc_80_OEAAAAAAAAAXw",
            "client_modified": "2015-05-12T15:50:38Z",
            "server_modified": "2015-05-12T15:51:22Z",
            "size": 7212
        }"#;

        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(
            metadata.parent_locator().unwrap(),
            EntryLocator::by_path("/Homework/math")
        );

        let entry = metadata.into_entry(None).unwrap();
        let CloudEntry::File(file) = entry else {
            panic!("expected file");
        };
        assert_eq!(
            file.locator,
            EntryLocator::by_path("/Homework/math/Prime_Numbers.txt")
        );
        assert_eq!(file.size, Some(7212));
        assert_eq!(
            file.modified.unwrap(),
            Utc.with_ymd_and_hms(2015, 5, 12, 15, 51, 22).unwrap()
        );
        assert!(file.created.is_none());
    }

    #[test]
    fn test_top_level_entry_parent_is_root() {
        let json = r#"{".tag": "folder", "name": "Homework", "path_display": "/Homework"}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(
            metadata.parent_locator().unwrap(),
            EntryLocator::by_path("/")
        );
    }

    #[test]
    fn test_tagless_metadata_needs_context() {
        let json = r#"{"name": "a.txt", "path_display": "/a.txt", "size": 3}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert!(metadata.clone().into_entry(None).is_err());
        assert!(metadata.into_entry(Some(false)).is_ok());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let json = r#"{".tag": "deleted", "name": "gone", "path_display": "/gone"}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert!(metadata.into_entry(None).is_err());
    }

    #[test]
    fn test_list_folder_envelope() {
        let json = r#"{
            "entries": [
                {".tag": "folder", "name": "math", "path_display": "/Homework/math"}
            ],
            "cursor": "ZtkX9_EHj3x7PMkVuFIhwKYXEpwpLwyxp9vMKomUhllil9q7eWiAu",
            "has_more": true
        }"#;

        let response: ListFolderResponse = serde_json::from_str(json).unwrap();
        assert!(response.has_more);
        assert_eq!(response.entries.len(), 1);
    }

    #[test]
    fn test_account_mapping() {
        let json = r#"{
            "account_id": "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc",
            "name": {
                "given_name": "Franz",
                "surname": "Ferdinand",
                "display_name": "Franz Ferdinand (Personal)"
            },
            "email": "franz@dropbox.com",
            "profile_photo_url": "https://dl-web.dropbox.com/account_photo/get/abc"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        let user: CloudUser = account.into();
        assert_eq!(user.id, "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc");
        assert_eq!(user.display_name.as_deref(), Some("Franz Ferdinand (Personal)"));
        assert_eq!(user.name.as_deref(), Some("Franz"));
    }
}
