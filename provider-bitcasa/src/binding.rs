//! Bitcasa request building (signed) and response parsing.

use bridge_traits::http::{HttpMethod, HttpRequest};
use bytes::Bytes;
use chrono::Utc;
use core_client::error::{CloudError, Result};
use core_client::multipart::MultipartBody;
use core_client::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding, ProviderConfig,
    ProviderKind, SearchScope,
};

use crate::signing;
use crate::types::{unwrap_envelope, ItemsResult, MetaResult, ProfileResult};

/// Binding of the uniform contract to the Bitcasa CloudFS dialect.
pub struct BitcasaBinding {
    config: ProviderConfig,
}

impl BitcasaBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Build a signed request. `path` is the endpoint path relative to the
    /// API base; `params` become the canonical query string, which the
    /// signature covers together with method, path, and date.
    fn signed(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(&str, &str)],
    ) -> HttpRequest {
        let date = signing::http_date(Utc::now());
        let canonical = signing::canonical_query(params);
        let string_to_sign = signing::string_to_sign(method.as_str(), path, &canonical, &date);
        let signature = signing::sign(&self.config.client_secret, &string_to_sign);

        let url = if canonical.is_empty() {
            format!("{}{}", self.config.api_base, path)
        } else {
            format!("{}{}?{}", self.config.api_base, path, canonical)
        };

        HttpRequest::new(method, url)
            .header("Date", date)
            .header(
                "Authorization",
                signing::authorization(&self.config.client_id, &signature),
            )
    }

    /// Endpoint path for an entity: `/folders{path}` or `/files{path}`.
    fn fs_path(segment: &str, entry_path: &str) -> String {
        if entry_path == "/" {
            format!("/{}/", segment)
        } else {
            format!("/{}{}", segment, entry_path)
        }
    }

    fn entry_fs_path(entry: &CloudEntry) -> Result<String> {
        let segment = if entry.is_folder() { "folders" } else { "files" };
        Ok(Self::fs_path(segment, entry.locator().require_path()?))
    }

    fn join(parent: &CloudFolder, name: &str) -> Result<String> {
        let base = parent.locator.require_path()?;
        if base == "/" {
            Ok(format!("/{}", name))
        } else {
            Ok(format!("{}/{}", base, name))
        }
    }

    fn items_to_chunk(result: ItemsResult, scope: Option<SearchScope>) -> PageChunk {
        let raw_count = result.items.len() as u64;
        let entries = result
            .items
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

        PageChunk {
            entries,
            raw_count,
            // CloudFS answers complete listings in one page.
            advance: PageAdvance::Done,
        }
    }

    fn expect_first_page(page: &PageRequest) -> Result<()> {
        match page {
            PageRequest::First => Ok(()),
            other => Err(CloudError::MalformedResponse(format!(
                "unexpected page request for single-page listing: {:?}",
                other
            ))),
        }
    }
}

impl ProviderBinding for BitcasaBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bitcasa
    }

    fn addressing(&self) -> Addressing {
        Addressing::ByPath
    }

    fn root(&self) -> CloudFolder {
        CloudFolder::root(EntryLocator::by_path("/"), "/")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(self.signed(
            HttpMethod::Get,
            "/user/profile",
            &[("access_token", token)],
        ))
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let profile: ProfileResult = unwrap_envelope(body)?;
        Ok(profile.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        let path = format!("{}/meta", Self::fs_path("folders", folder.require_path()?));
        Ok(self.signed(HttpMethod::Get, &path, &[("access_token", token)]))
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        let path = format!("{}/meta", Self::fs_path("files", file.require_path()?));
        Ok(self.signed(HttpMethod::Get, &path, &[("access_token", token)]))
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        let result: MetaResult = unwrap_envelope(body)?;
        result.meta.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        let result: MetaResult = unwrap_envelope(body)?;
        result.meta.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        Self::expect_first_page(page)?;
        let path = Self::fs_path("folders", folder.locator.require_path()?);
        Ok(self.signed(HttpMethod::Get, &path, &[("access_token", token)]))
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        Ok(Self::items_to_chunk(unwrap_envelope(body)?, None))
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        let path = Self::fs_path("folders", parent.locator.require_path()?);
        let body = serde_urlencoded::to_string([("operation", "create"), ("name", name)])
            .map_err(|e| CloudError::Transport(format!("encode form body: {}", e)))?;
        Ok(self
            .signed(HttpMethod::Post, &path, &[("access_token", token)])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body)))
    }

    fn parse_created_folder(
        &self,
        _parent: &CloudFolder,
        _name: &str,
        body: &[u8],
    ) -> Result<CloudFolder> {
        let result: ItemsResult = unwrap_envelope(body)?;
        result
            .items
            .into_iter()
            .next()
            .ok_or_else(|| {
                CloudError::MalformedResponse("create answered with no items".into())
            })?
            .into_folder()
    }

    fn rename_request(
        &self,
        entry: &CloudEntry,
        new_name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        let path = Self::entry_fs_path(entry)?;
        let body = serde_urlencoded::to_string([
            ("operation", "rename"),
            ("name", new_name),
            ("exists", "fail"),
        ])
        .map_err(|e| CloudError::Transport(format!("encode form body: {}", e)))?;
        Ok(self
            .signed(HttpMethod::Post, &path, &[("access_token", token)])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body)))
    }

    fn move_request(
        &self,
        entry: &CloudEntry,
        new_parent: &CloudFolder,
        token: &str,
    ) -> Result<HttpRequest> {
        let path = Self::entry_fs_path(entry)?;
        let to = new_parent.locator.require_path()?;
        let body = serde_urlencoded::to_string([
            ("operation", "move"),
            ("to", to),
            ("exists", "fail"),
        ])
        .map_err(|e| CloudError::Transport(format!("encode form body: {}", e)))?;
        Ok(self
            .signed(HttpMethod::Post, &path, &[("access_token", token)])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body)))
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        let path = Self::entry_fs_path(entry)?;
        Ok(self.signed(
            HttpMethod::Delete,
            &path,
            &[("access_token", token), ("commit", "true")],
        ))
    }

    fn parse_renamed(&self, _entry: &CloudEntry, _new_name: &str, body: &[u8]) -> Result<CloudEntry> {
        let result: MetaResult = unwrap_envelope(body)?;
        Ok(result.meta.into_entry())
    }

    fn parse_moved(
        &self,
        _entry: &CloudEntry,
        _new_parent: &CloudFolder,
        body: &[u8],
    ) -> Result<CloudEntry> {
        let result: MetaResult = unwrap_envelope(body)?;
        Ok(result.meta.into_entry())
    }

    fn upload_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
        token: &str,
    ) -> Result<HttpRequest> {
        let path = Self::fs_path("files", parent.locator.require_path()?);
        let exists = match policy {
            ConflictPolicy::Fail => "fail",
            ConflictPolicy::Overwrite => "overwrite",
        };
        let form = MultipartBody::new()
            .text("exists", exists)
            .file("file", name, content)
            .finish();

        Ok(self
            .signed(HttpMethod::Post, &path, &[("access_token", token)])
            .header("Content-Type", form.content_type)
            .body(form.body))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        let parent = file.locator.parent_path().ok_or_else(|| {
            CloudError::MalformedResponse("cannot update a file with no parent".into())
        })?;
        let path = Self::fs_path("files", &parent);
        let form = MultipartBody::new()
            .text("exists", "overwrite")
            .file("file", &file.name, content)
            .finish();

        Ok(self
            .signed(HttpMethod::Post, &path, &[("access_token", token)])
            .header("Content-Type", form.content_type)
            .body(form.body))
    }

    fn parse_uploaded(&self, _parent: &CloudFolder, _name: &str, body: &[u8]) -> Result<CloudFile> {
        let result: MetaResult = unwrap_envelope(body)?;
        result.meta.into_file()
    }

    fn parse_updated(&self, _file: &CloudFile, body: &[u8]) -> Result<CloudFile> {
        let result: MetaResult = unwrap_envelope(body)?;
        result.meta.into_file()
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        let path = Self::fs_path("files", file.locator.require_path()?);
        Ok(self.signed(HttpMethod::Get, &path, &[("access_token", token)]))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        let path = format!(
            "{}/thumbnail",
            Self::fs_path("files", file.locator.require_path()?)
        );
        Ok(self.signed(
            HttpMethod::Get,
            &path,
            &[("access_token", token), ("size", "256")],
        ))
    }

    fn search_request(
        &self,
        query: &str,
        _scope: SearchScope,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        Self::expect_first_page(page)?;
        Ok(self.signed(
            HttpMethod::Get,
            "/search",
            &[
                ("access_token", token),
                ("query", query),
                ("path", "/"),
            ],
        ))
    }

    fn parse_search(&self, _query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        Ok(Self::items_to_chunk(unwrap_envelope(body)?, Some(scope)))
    }
}
