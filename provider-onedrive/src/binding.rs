//! OneDrive (Microsoft Graph) request building and response parsing.

use bridge_traits::http::{HttpMethod, HttpRequest};
use bytes::Bytes;
use core_client::error::{CloudError, Result};
use core_client::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding, ProviderConfig,
    ProviderKind, SearchScope,
};
use serde_json::json;

use crate::types::{DriveItem, DriveItemPage, GraphUser};

/// Items per children/search page (`$top`).
const PAGE_SIZE: u64 = 200;

/// Binding of the uniform contract to the Microsoft Graph drive dialect.
pub struct OneDriveBinding {
    config: ProviderConfig,
}

impl OneDriveBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> &str {
        &self.config.api_base
    }

    fn item_url(&self, locator: &EntryLocator) -> Result<String> {
        Ok(format!(
            "{}/me/drive/items/{}",
            self.api(),
            locator.require_id()?
        ))
    }

    fn parse_item(body: &[u8]) -> Result<DriveItem> {
        serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Graph driveItem: {}", e)))
    }

    fn parse_page(body: &[u8], scope: Option<SearchScope>) -> Result<PageChunk> {
        let page: DriveItemPage = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Graph item page: {}", e)))?;

        let raw_count = page.value.len() as u64;
        let entries = page
            .value
            .into_iter()
            .filter(|item| scope.map(|s| s.admits(item.is_folder())).unwrap_or(true))
            .map(|item| {
                let parent = item.parent_locator();
                ListedEntry {
                    entry: item.into_entry(),
                    parent,
                }
            })
            .collect();

        let advance = match page.next_link {
            Some(url) => PageAdvance::NextUrl(url),
            None => PageAdvance::Done,
        };

        Ok(PageChunk {
            entries,
            raw_count,
            advance,
        })
    }

    fn page_url(&self, first: String, page: &PageRequest) -> Result<String> {
        match page {
            PageRequest::First => Ok(first),
            PageRequest::Url(url) => Ok(url.clone()),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for next-link pagination: {:?}",
                other
            ))),
        }
    }
}

impl ProviderBinding for OneDriveBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OneDrive
    }

    fn addressing(&self) -> Addressing {
        Addressing::ById
    }

    fn root(&self) -> CloudFolder {
        // Graph accepts the literal item id alias "root" for the drive root.
        CloudFolder::root(EntryLocator::by_id("root"), "root")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Get, format!("{}/me", self.api())).bearer_token(token))
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let user: GraphUser = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Graph user: {}", e)))?;
        Ok(user.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Get, self.item_url(folder)?).bearer_token(token))
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Get, self.item_url(file)?).bearer_token(token))
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        Self::parse_item(body)?.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        Self::parse_item(body)?.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        let first = format!(
            "{}/children?$top={}",
            self.item_url(&folder.locator)?,
            PAGE_SIZE
        );
        Ok(HttpRequest::new(HttpMethod::Get, self.page_url(first, page)?).bearer_token(token))
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        Self::parse_page(body, None)
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        HttpRequest::new(
            HttpMethod::Post,
            format!("{}/children", self.item_url(&parent.locator)?),
        )
        .bearer_token(token)
        .json(&json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail"
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
        HttpRequest::new(HttpMethod::Patch, self.item_url(entry.locator())?)
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
        let parent_id = new_parent.locator.require_id()?;
        HttpRequest::new(HttpMethod::Patch, self.item_url(entry.locator())?)
            .bearer_token(token)
            .json(&json!({ "parentReference": { "id": parent_id } }))
            .map_err(Into::into)
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(HttpMethod::Delete, self.item_url(entry.locator())?)
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
        let behavior = match policy {
            ConflictPolicy::Fail => "fail",
            ConflictPolicy::Overwrite => "replace",
        };
        let url = format!(
            "{}:/{}:/content?@microsoft.graph.conflictBehavior={}",
            self.item_url(&parent.locator)?,
            urlencoding::encode(name),
            behavior
        );
        Ok(HttpRequest::new(HttpMethod::Put, url)
            .bearer_token(token)
            .header("Content-Type", "application/octet-stream")
            .body(content))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Put,
            format!("{}/content", self.item_url(&file.locator)?),
        )
        .bearer_token(token)
        .header("Content-Type", "application/octet-stream")
        .body(content))
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/content", self.item_url(&file.locator)?),
        )
        .bearer_token(token))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/thumbnails/0/medium/content", self.item_url(&file.locator)?),
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
        let first = format!(
            "{}/me/drive/root/search(q='{}')?$top={}",
            self.api(),
            urlencoding::encode(query),
            PAGE_SIZE
        );
        Ok(HttpRequest::new(HttpMethod::Get, self.page_url(first, page)?).bearer_token(token))
    }

    fn parse_search(&self, _query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        Self::parse_page(body, Some(scope))
    }
}
