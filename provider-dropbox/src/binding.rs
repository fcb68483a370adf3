//! Dropbox request building and response parsing.

use bridge_traits::http::{HttpMethod, HttpRequest};
use bytes::Bytes;
use core_client::error::{CloudError, Result};
use core_client::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding, ProviderConfig,
    ProviderKind, SearchScope,
};
use serde_json::json;
use tracing::debug;

use crate::types::{Account, ListFolderResponse, Metadata, MetadataEnvelope, SearchResponse};

/// Entries requested per `list_folder` page.
const LIST_LIMIT: u64 = 1000;

/// Matches requested per `search_v2` page.
const SEARCH_LIMIT: u64 = 200;

/// Binding of the uniform contract to the Dropbox v2 dialect.
pub struct DropboxBinding {
    config: ProviderConfig,
}

impl DropboxBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> &str {
        &self.config.api_base
    }

    fn content(&self) -> &str {
        self.config.content_base()
    }

    /// Dropbox addresses the root as the empty string on the wire, while
    /// the canonical root carries `/` so path arithmetic (parent checks,
    /// child joins) stays uniform.
    fn wire_path(locator: &EntryLocator) -> Result<String> {
        let path = locator.require_path()?;
        Ok(if path == "/" { String::new() } else { path.to_string() })
    }

    fn join(parent: &CloudFolder, name: &str) -> Result<String> {
        let base = parent.locator.require_path()?;
        if base == "/" {
            Ok(format!("/{}", name))
        } else {
            Ok(format!("{}/{}", base, name))
        }
    }

    fn rpc(&self, endpoint: &str, body: &serde_json::Value, token: &str) -> Result<HttpRequest> {
        HttpRequest::new(HttpMethod::Post, format!("{}/{}", self.api(), endpoint))
            .bearer_token(token)
            .json(body)
            .map_err(Into::into)
    }

    fn content_call(
        &self,
        endpoint: &str,
        api_arg: &serde_json::Value,
        body: Option<Bytes>,
        token: &str,
    ) -> HttpRequest {
        let mut request =
            HttpRequest::new(HttpMethod::Post, format!("{}/{}", self.content(), endpoint))
                .bearer_token(token)
                .header("Dropbox-API-Arg", api_arg.to_string());
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/octet-stream")
                .body(body);
        }
        request
    }

    /// Convert tagged listing entries, skipping tags outside file/folder
    /// (e.g. `deleted` tombstones in continued cursors).
    fn convert_entries(entries: Vec<Metadata>) -> Result<Vec<ListedEntry>> {
        let mut converted = Vec::with_capacity(entries.len());
        for metadata in entries {
            match metadata.tag.as_deref() {
                Some("file") | Some("folder") => {
                    let parent = metadata.parent_locator();
                    let entry = metadata.into_entry(None)?;
                    converted.push(ListedEntry { entry, parent });
                }
                other => {
                    debug!(tag = ?other, "skipping non-content Dropbox entry");
                }
            }
        }
        Ok(converted)
    }
}

impl ProviderBinding for DropboxBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dropbox
    }

    fn addressing(&self) -> Addressing {
        Addressing::ByPath
    }

    fn root(&self) -> CloudFolder {
        CloudFolder::root(EntryLocator::by_path("/"), "/")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!("{}/users/get_current_account", self.api()),
        )
        .bearer_token(token))
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let account: Account = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox account: {}", e)))?;
        Ok(account.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        self.rpc(
            "files/get_metadata",
            &json!({ "path": Self::wire_path(folder)? }),
            token,
        )
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        self.rpc(
            "files/get_metadata",
            &json!({ "path": Self::wire_path(file)? }),
            token,
        )
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        let metadata: Metadata = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox metadata: {}", e)))?;
        metadata.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        let metadata: Metadata = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox metadata: {}", e)))?;
        metadata.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        match page {
            PageRequest::First => self.rpc(
                "files/list_folder",
                &json!({
                    "path": Self::wire_path(&folder.locator)?,
                    "limit": LIST_LIMIT,
                    "recursive": false
                }),
                token,
            ),
            PageRequest::Cursor(cursor) => self.rpc(
                "files/list_folder/continue",
                &json!({ "cursor": cursor }),
                token,
            ),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for cursor pagination: {:?}",
                other
            ))),
        }
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        let response: ListFolderResponse = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox list_folder: {}", e)))?;

        let raw_count = response.entries.len() as u64;
        let entries = Self::convert_entries(response.entries)?;
        let advance = if response.has_more {
            PageAdvance::Cursor(response.cursor)
        } else {
            PageAdvance::Done
        };

        Ok(PageChunk {
            entries,
            raw_count,
            advance,
        })
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        self.rpc(
            "files/create_folder_v2",
            &json!({ "path": Self::join(parent, name)?, "autorename": false }),
            token,
        )
    }

    fn parse_created_folder(
        &self,
        _parent: &CloudFolder,
        _name: &str,
        body: &[u8],
    ) -> Result<CloudFolder> {
        let envelope: MetadataEnvelope = serde_json::from_slice(body).map_err(|e| {
            CloudError::MalformedResponse(format!("Dropbox create_folder_v2: {}", e))
        })?;
        envelope.metadata.into_folder()
    }

    fn rename_request(
        &self,
        entry: &CloudEntry,
        new_name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        let from = entry.locator().require_path()?;
        let parent = entry.locator().parent_path().ok_or_else(|| {
            CloudError::MalformedResponse("cannot rename an entry with no parent".into())
        })?;
        let to = if parent == "/" {
            format!("/{}", new_name)
        } else {
            format!("{}/{}", parent, new_name)
        };
        self.rpc(
            "files/move_v2",
            &json!({ "from_path": from, "to_path": to, "autorename": false }),
            token,
        )
    }

    fn move_request(
        &self,
        entry: &CloudEntry,
        new_parent: &CloudFolder,
        token: &str,
    ) -> Result<HttpRequest> {
        let from = entry.locator().require_path()?;
        let to = Self::join(new_parent, entry.name())?;
        self.rpc(
            "files/move_v2",
            &json!({ "from_path": from, "to_path": to, "autorename": false }),
            token,
        )
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        self.rpc(
            "files/delete_v2",
            &json!({ "path": entry.locator().require_path()? }),
            token,
        )
    }

    fn parse_renamed(&self, entry: &CloudEntry, _new_name: &str, body: &[u8]) -> Result<CloudEntry> {
        let envelope: MetadataEnvelope = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox move_v2: {}", e)))?;
        envelope.metadata.into_entry(Some(entry.is_folder()))
    }

    fn parse_moved(
        &self,
        entry: &CloudEntry,
        _new_parent: &CloudFolder,
        body: &[u8],
    ) -> Result<CloudEntry> {
        let envelope: MetadataEnvelope = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox move_v2: {}", e)))?;
        envelope.metadata.into_entry(Some(entry.is_folder()))
    }

    fn upload_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
        token: &str,
    ) -> Result<HttpRequest> {
        let mode = match policy {
            ConflictPolicy::Fail => "add",
            ConflictPolicy::Overwrite => "overwrite",
        };
        Ok(self.content_call(
            "files/upload",
            &json!({
                "path": Self::join(parent, name)?,
                "mode": mode,
                "autorename": false,
                "mute": true
            }),
            Some(content),
            token,
        ))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        Ok(self.content_call(
            "files/upload",
            &json!({
                "path": file.locator.require_path()?,
                "mode": "overwrite",
                "autorename": false,
                "mute": true
            }),
            Some(content),
            token,
        ))
    }

    fn parse_uploaded(&self, _parent: &CloudFolder, _name: &str, body: &[u8]) -> Result<CloudFile> {
        // files/upload answers bare FileMetadata without a .tag.
        let metadata: Metadata = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox upload: {}", e)))?;
        metadata.into_file()
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(self.content_call(
            "files/download",
            &json!({ "path": file.locator.require_path()? }),
            None,
            token,
        ))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(self.content_call(
            "files/get_thumbnail_v2",
            &json!({
                "resource": { ".tag": "path", "path": file.locator.require_path()? },
                "format": "jpeg",
                "size": "w256h256"
            }),
            None,
            token,
        ))
    }

    fn search_request(
        &self,
        query: &str,
        _scope: SearchScope,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        match page {
            PageRequest::First => self.rpc(
                "files/search_v2",
                &json!({
                    "query": query,
                    "options": { "filename_only": true, "max_results": SEARCH_LIMIT }
                }),
                token,
            ),
            PageRequest::Cursor(cursor) => self.rpc(
                "files/search/continue_v2",
                &json!({ "cursor": cursor }),
                token,
            ),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for cursor pagination: {:?}",
                other
            ))),
        }
    }

    fn parse_search(&self, _query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        let response: SearchResponse = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Dropbox search_v2: {}", e)))?;

        let raw_count = response.matches.len() as u64;
        let metadata: Vec<Metadata> = response
            .matches
            .into_iter()
            .map(|m| m.metadata.metadata)
            .collect();
        let entries = Self::convert_entries(metadata)?
            .into_iter()
            .filter(|listed| scope.admits(listed.entry.is_folder()))
            .collect();

        let advance = match (response.has_more, response.cursor) {
            (true, Some(cursor)) => PageAdvance::Cursor(cursor),
            _ => PageAdvance::Done,
        };

        Ok(PageChunk {
            entries,
            raw_count,
            advance,
        })
    }
}
