//! Amazon Cloud Drive request building and response parsing.

use bridge_traits::http::{HttpMethod, HttpRequest};
use bytes::Bytes;
use core_client::error::{CloudError, Result};
use core_client::multipart::MultipartBody;
use core_client::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding, ProviderConfig,
    ProviderKind, SearchScope,
};
use serde_json::json;

use crate::types::{Node, NodeList, Profile};

/// Nodes per page.
const PAGE_SIZE: u64 = 200;

/// Login-with-Amazon profile endpoint (fixed service URL, not part of the
/// drive API base).
const PROFILE_URL: &str = "https://api.amazon.com/user/profile";

/// Binding of the uniform contract to the Cloud Drive node dialect.
pub struct CloudDriveBinding {
    config: ProviderConfig,
}

impl CloudDriveBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> &str {
        &self.config.api_base
    }

    fn content(&self) -> &str {
        self.config.content_base()
    }

    fn token_of(page: &PageRequest) -> Result<Option<&str>> {
        match page {
            PageRequest::First => Ok(None),
            PageRequest::Cursor(token) => Ok(Some(token)),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for token pagination: {:?}",
                other
            ))),
        }
    }

    fn parse_node(body: &[u8]) -> Result<Node> {
        serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Cloud Drive node: {}", e)))
    }

    fn parse_node_list(body: &[u8], scope: Option<SearchScope>) -> Result<PageChunk> {
        let list: NodeList = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Cloud Drive node list: {}", e)))?;

        let raw_count = list.data.len() as u64;
        let entries = list
            .data
            .into_iter()
            .filter(|node| scope.map(|s| s.admits(node.is_folder())).unwrap_or(true))
            .map(|node| {
                let parent = node.parent_locator();
                ListedEntry {
                    entry: node.into_entry(),
                    parent,
                }
            })
            .collect();

        let advance = match list.next_token {
            Some(token) => PageAdvance::Cursor(token),
            None => PageAdvance::Done,
        };

        Ok(PageChunk {
            entries,
            raw_count,
            advance,
        })
    }
}

impl ProviderBinding for CloudDriveBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CloudDrive
    }

    fn addressing(&self) -> Addressing {
        Addressing::ById
    }

    fn root(&self) -> CloudFolder {
        // The service resolves the alias "root" to the account root node.
        CloudFolder::root(EntryLocator::by_id("root"), "Amazon Drive")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Get, PROFILE_URL).bearer_token(token))
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let profile: Profile = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Amazon profile: {}", e)))?;
        Ok(profile.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/nodes/{}", self.api(), folder.require_id()?),
        )
        .bearer_token(token))
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/nodes/{}", self.api(), file.require_id()?),
        )
        .bearer_token(token))
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        Self::parse_node(body)?.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        Self::parse_node(body)?.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        // Flat /nodes listing filtered by parent; the service is known to
        // leak nodes from other parents into the page, which the core's
        // parent guard screens out.
        let mut url = format!(
            "{}/nodes?filters={}&limit={}",
            self.api(),
            urlencoding::encode(&format!("parents:{}", folder.locator.require_id()?)),
            PAGE_SIZE
        );
        if let Some(start_token) = Self::token_of(page)? {
            url.push_str("&startToken=");
            url.push_str(&urlencoding::encode(start_token));
        }
        Ok(HttpRequest::new(HttpMethod::Get, url).bearer_token(token))
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        Self::parse_node_list(body, None)
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        HttpRequest::new(HttpMethod::Post, format!("{}/nodes", self.api()))
            .bearer_token(token)
            .json(&json!({
                "name": name,
                "kind": "FOLDER",
                "parents": [parent.locator.require_id()?]
            }))
            .map_err(Into::into)
    }

    fn parse_created_folder(
        &self,
        _parent: &CloudFolder,
        _name: &str,
        body: &[u8],
    ) -> Result<CloudFolder> {
        self.parse_folder(body)
    }

    fn rename_request(
        &self,
        entry: &CloudEntry,
        new_name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        HttpRequest::new(
            HttpMethod::Patch,
            format!("{}/nodes/{}", self.api(), entry.locator().require_id()?),
        )
        .bearer_token(token)
        .json(&json!({ "name": new_name }))
        .map_err(Into::into)
    }

    fn move_request(
        &self,
        entry: &CloudEntry,
        new_parent: &CloudFolder,
        token: &str,
    ) -> Result<HttpRequest> {
        HttpRequest::new(
            HttpMethod::Patch,
            format!("{}/nodes/{}", self.api(), entry.locator().require_id()?),
        )
        .bearer_token(token)
        .json(&json!({ "parents": [new_parent.locator.require_id()?] }))
        .map_err(Into::into)
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        // Deletion is a move to trash.
        Ok(HttpRequest::new(
            HttpMethod::Put,
            format!("{}/trash/{}", self.api(), entry.locator().require_id()?),
        )
        .bearer_token(token))
    }

    fn upload_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
        token: &str,
    ) -> Result<HttpRequest> {
        let metadata = json!({
            "name": name,
            "kind": "FILE",
            "parents": [parent.locator.require_id()?]
        })
        .to_string();
        let form = MultipartBody::new()
            .text("metadata", &metadata)
            .file("content", name, content)
            .finish();

        let mut url = format!("{}/nodes?suppress=deduplication", self.content());
        if matches!(policy, ConflictPolicy::Overwrite) {
            url.push_str("&conflictResolution=overwrite");
        }

        Ok(HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(token)
            .header("Content-Type", form.content_type)
            .body(form.body))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        let form = MultipartBody::new()
            .file("content", &file.name, content)
            .finish();

        Ok(HttpRequest::new(
            HttpMethod::Put,
            format!("{}/nodes/{}/content", self.content(), file.locator.require_id()?),
        )
        .bearer_token(token)
        .header("Content-Type", form.content_type)
        .body(form.body))
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/nodes/{}/content", self.content(), file.locator.require_id()?),
        )
        .bearer_token(token))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!(
                "{}/nodes/{}/content?viewBox=256",
                self.content(),
                file.locator.require_id()?
            ),
        )
        .bearer_token(token))
    }

    fn search_request(
        &self,
        query: &str,
        _scope: SearchScope,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        let mut url = format!(
            "{}/nodes?filters={}&limit={}",
            self.api(),
            urlencoding::encode(&format!("name:{}", query)),
            PAGE_SIZE
        );
        if let Some(start_token) = Self::token_of(page)? {
            url.push_str("&startToken=");
            url.push_str(&urlencoding::encode(start_token));
        }
        Ok(HttpRequest::new(HttpMethod::Get, url).bearer_token(token))
    }

    fn parse_search(&self, _query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        Self::parse_node_list(body, Some(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> CloudDriveBinding {
        CloudDriveBinding::new(crate::config("id", "secret", "app://callback"))
    }

    fn folder(id: &str, name: &str) -> CloudFolder {
        CloudFolder {
            locator: EntryLocator::by_id(id),
            name: name.into(),
            size: None,
            created: None,
            modified: None,
            is_root: false,
        }
    }

    fn file(id: &str, name: &str) -> CloudFile {
        CloudFile {
            locator: EntryLocator::by_id(id),
            name: name.into(),
            size: None,
            created: None,
            modified: None,
        }
    }

    #[test]
    fn test_root_alias() {
        let root = binding().root();
        assert!(root.is_root);
        assert_eq!(root.locator, EntryLocator::by_id("root"));
    }

    #[test]
    fn test_about_hits_lwa_profile() {
        let request = binding().about_request("tok").unwrap();
        assert_eq!(request.url, "https://api.amazon.com/user/profile");
    }

    #[test]
    fn test_list_request_filters_by_parent() {
        let request = binding()
            .list_request(&folder("node-7", "Docs"), &PageRequest::First, "tok")
            .unwrap();
        assert!(request.url.contains("filters=parents%3Anode-7"));
        assert!(!request.url.contains("startToken"));

        let next = binding()
            .list_request(
                &folder("node-7", "Docs"),
                &PageRequest::Cursor("tok-2".into()),
                "tok",
            )
            .unwrap();
        assert!(next.url.contains("startToken=tok-2"));
    }

    #[test]
    fn test_parse_listing_token_advance_and_parents() {
        let body = br#"{
            "count": 2,
            "nextToken": "next-1",
            "data": [
                {"id": "1", "name": "a", "kind": "FILE", "parents": ["node-7"]},
                {"id": "2", "name": "b", "kind": "FILE", "parents": ["elsewhere"]}
            ]
        }"#;

        let chunk = binding().parse_listing(body).unwrap();
        assert_eq!(chunk.raw_count, 2);
        assert_eq!(chunk.advance, PageAdvance::Cursor("next-1".into()));
        assert_eq!(chunk.entries[0].parent, Some(EntryLocator::by_id("node-7")));
        assert_eq!(
            chunk.entries[1].parent,
            Some(EntryLocator::by_id("elsewhere"))
        );
    }

    #[test]
    fn test_create_folder_body() {
        let request = binding()
            .create_folder_request(&folder("root", "Amazon Drive"), "Tax", "tok")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
        assert_eq!(body["kind"], "FOLDER");
        assert_eq!(body["parents"][0], "root");
    }

    #[test]
    fn test_delete_moves_to_trash() {
        let request = binding()
            .delete_request(&CloudEntry::File(file("n-9", "a")), "tok")
            .unwrap();
        assert_eq!(request.method, HttpMethod::Put);
        assert!(request.url.ends_with("/trash/n-9"));
    }

    #[test]
    fn test_upload_multipart_on_content_host() {
        let request = binding()
            .upload_request(
                &folder("root", "Amazon Drive"),
                "mom.jpg",
                Bytes::from_static(b"jpeg"),
                ConflictPolicy::Fail,
                "tok",
            )
            .unwrap();
        assert!(request.url.starts_with("https://content-na.drive.amazonaws.com/cdproxy/nodes"));
        assert!(request.url.contains("suppress=deduplication"));
        assert!(!request.url.contains("conflictResolution"));
        let text = String::from_utf8_lossy(request.body.as_ref().unwrap());
        assert!(text.contains("\"kind\":\"FILE\""));
    }

    #[test]
    fn test_upload_overwrite_policy_in_query() {
        let request = binding()
            .upload_request(
                &folder("root", "Amazon Drive"),
                "mom.jpg",
                Bytes::from_static(b"jpeg"),
                ConflictPolicy::Overwrite,
                "tok",
            )
            .unwrap();
        assert!(request.url.contains("conflictResolution=overwrite"));
    }

    #[test]
    fn test_search_by_name_filter() {
        let request = binding()
            .search_request("mom", SearchScope::All, &PageRequest::First, "tok")
            .unwrap();
        assert!(request.url.contains("filters=name%3Amom"));
    }

    #[test]
    fn test_parse_search_scope() {
        let body = br#"{
            "data": [
                {"id": "1", "name": "mom.jpg", "kind": "FILE"},
                {"id": "2", "name": "mom", "kind": "FOLDER"}
            ]
        }"#;

        let folders = binding().parse_search("", body, SearchScope::Folders).unwrap();
        assert_eq!(folders.entries.len(), 1);
        assert!(folders.entries[0].entry.is_folder());
        assert_eq!(folders.advance, PageAdvance::Done);
    }
}
