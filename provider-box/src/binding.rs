//! Box request building and response parsing.

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

use crate::types::{BoxItem, BoxItemCollection, BoxUploadResponse, BoxUser};

/// Items per listing page. Box caps `limit` at 1000; 500 keeps response
/// bodies moderate.
const LIST_LIMIT: u64 = 500;

/// Items per search page (Box caps search at 200).
const SEARCH_LIMIT: u64 = 200;

/// Fields requested on every item response.
const ITEM_FIELDS: &str = "type,id,name,size,created_at,modified_at,parent";

/// Binding of the uniform contract to the Box dialect.
pub struct BoxBinding {
    config: ProviderConfig,
}

impl BoxBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> &str {
        &self.config.api_base
    }

    fn upload_base(&self) -> &str {
        self.config.content_base()
    }

    fn entry_endpoint(&self, entry: &CloudEntry) -> Result<String> {
        let id = entry.locator().require_id()?;
        let segment = if entry.is_folder() { "folders" } else { "files" };
        Ok(format!("{}/{}/{}", self.api(), segment, id))
    }

    fn offset_of(page: &PageRequest) -> Result<u64> {
        match page {
            PageRequest::First => Ok(0),
            PageRequest::Offset { offset } => Ok(*offset),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for offset pagination: {:?}",
                other
            ))),
        }
    }

    fn parse_collection(body: &[u8]) -> Result<BoxItemCollection> {
        serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Box item collection: {}", e)))
    }

    fn collection_to_chunk(collection: BoxItemCollection, scope: Option<SearchScope>) -> PageChunk {
        let raw_count = collection.entries.len() as u64;
        let entries = collection
            .entries
            .into_iter()
            .filter(|item| {
                scope
                    .map(|s| s.admits(item.is_folder()))
                    .unwrap_or(true)
            })
            .map(|item| {
                let parent = item.parent_locator();
                ListedEntry {
                    entry: item.into_entry(),
                    parent,
                }
            })
            .collect();

        PageChunk {
            entries,
            raw_count,
            advance: PageAdvance::OffsetTotal {
                total: collection.total_count,
            },
        }
    }
}

impl ProviderBinding for BoxBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Box
    }

    fn addressing(&self) -> Addressing {
        Addressing::ById
    }

    fn root(&self) -> CloudFolder {
        CloudFolder::root(EntryLocator::by_id("0"), "All Files")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(
            HttpRequest::new(HttpMethod::Get, format!("{}/users/me", self.api()))
                .bearer_token(token),
        )
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let user: BoxUser = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Box user: {}", e)))?;
        Ok(user.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        let id = folder.require_id()?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/folders/{}?fields={}", self.api(), id, ITEM_FIELDS),
        )
        .bearer_token(token))
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        let id = file.require_id()?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/files/{}?fields={}", self.api(), id, ITEM_FIELDS),
        )
        .bearer_token(token))
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        let item: BoxItem = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Box folder: {}", e)))?;
        item.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        let item: BoxItem = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Box file: {}", e)))?;
        item.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        let id = folder.locator.require_id()?;
        let offset = Self::offset_of(page)?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!(
                "{}/folders/{}/items?fields={}&limit={}&offset={}",
                self.api(),
                id,
                ITEM_FIELDS,
                LIST_LIMIT,
                offset
            ),
        )
        .bearer_token(token))
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        Ok(Self::collection_to_chunk(Self::parse_collection(body)?, None))
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        let parent_id = parent.locator.require_id()?;
        HttpRequest::new(HttpMethod::Post, format!("{}/folders", self.api()))
            .bearer_token(token)
            .json(&json!({ "name": name, "parent": { "id": parent_id } }))
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
        HttpRequest::new(HttpMethod::Put, self.entry_endpoint(entry)?)
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
        HttpRequest::new(HttpMethod::Put, self.entry_endpoint(entry)?)
            .bearer_token(token)
            .json(&json!({ "parent": { "id": parent_id } }))
            .map_err(Into::into)
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        let mut url = self.entry_endpoint(entry)?;
        if entry.is_folder() {
            url.push_str("?recursive=true");
        }
        Ok(HttpRequest::new(HttpMethod::Delete, url).bearer_token(token))
    }

    fn upload_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
        token: &str,
    ) -> Result<HttpRequest> {
        let parent_id = parent.locator.require_id()?;
        let attributes = json!({ "name": name, "parent": { "id": parent_id } }).to_string();
        let form = MultipartBody::new()
            .text("attributes", &attributes)
            .file("file", name, content)
            .finish();

        let overwrite = matches!(policy, ConflictPolicy::Overwrite);
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files/content?overwrite={}", self.upload_base(), overwrite),
        )
        .bearer_token(token)
        .header("Content-Type", form.content_type)
        .body(form.body))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        let id = file.locator.require_id()?;
        let form = MultipartBody::new()
            .file("file", &file.name, content)
            .finish();

        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files/{}/content", self.upload_base(), id),
        )
        .bearer_token(token)
        .header("Content-Type", form.content_type)
        .body(form.body))
    }

    fn parse_uploaded(&self, _parent: &CloudFolder, _name: &str, body: &[u8]) -> Result<CloudFile> {
        let response: BoxUploadResponse = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Box upload response: {}", e)))?;
        response
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| {
                CloudError::MalformedResponse("Box upload response carried no entries".into())
            })?
            .into_file()
    }

    fn parse_updated(&self, _file: &CloudFile, body: &[u8]) -> Result<CloudFile> {
        self.parse_uploaded(&self.root(), "", body)
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        let id = file.locator.require_id()?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!("{}/files/{}/content", self.api(), id),
        )
        .bearer_token(token))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        let id = file.locator.require_id()?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            format!(
                "{}/files/{}/thumbnail.png?min_height=256&min_width=256",
                self.api(),
                id
            ),
        )
        .bearer_token(token))
    }

    fn search_request(
        &self,
        query: &str,
        scope: SearchScope,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        let offset = Self::offset_of(page)?;
        let mut url = format!(
            "{}/search?query={}&fields={}&limit={}&offset={}",
            self.api(),
            urlencoding::encode(query),
            ITEM_FIELDS,
            SEARCH_LIMIT,
            offset
        );
        match scope {
            SearchScope::Files => url.push_str("&type=file"),
            SearchScope::Folders => url.push_str("&type=folder"),
            SearchScope::All => {}
        }
        Ok(HttpRequest::new(HttpMethod::Get, url).bearer_token(token))
    }

    fn parse_search(&self, _query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        Ok(Self::collection_to_chunk(
            Self::parse_collection(body)?,
            Some(scope),
        ))
    }
}
