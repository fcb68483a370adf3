//! Yandex Disk request building and response parsing.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_client::error::{CloudError, Result};
use core_client::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, DownloadStage,
    EntryLocator, ListedEntry, PageAdvance, PageChunk, PageRequest, ProviderBinding,
    ProviderConfig, ProviderKind, SearchScope,
};
use serde::Deserialize;

use crate::types::{PassportInfo, Resource};

/// Items per listing page.
const LIST_LIMIT: u64 = 200;

/// Flat file listing size for client-side search.
const SEARCH_LIMIT: u64 = 1000;

/// Binding of the uniform contract to the Yandex Disk dialect.
pub struct YandexBinding {
    config: ProviderConfig,
}

impl YandexBinding {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> &str {
        &self.config.api_base
    }

    fn login_host(&self) -> &str {
        self.config.content_base()
    }

    /// Yandex uses `Authorization: OAuth <token>` instead of Bearer.
    fn authed(request: HttpRequest, token: &str) -> HttpRequest {
        request.header("Authorization", format!("OAuth {}", token))
    }

    fn join(parent: &CloudFolder, name: &str) -> Result<String> {
        let base = parent.locator.require_path()?;
        if base.ends_with('/') {
            Ok(format!("{}{}", base, name))
        } else {
            Ok(format!("{}/{}", base, name))
        }
    }

    fn sibling_path(locator: &EntryLocator, new_name: &str) -> Result<String> {
        let parent = locator.parent_path().ok_or_else(|| {
            CloudError::MalformedResponse("cannot rename an entry with no parent".into())
        })?;
        if parent.ends_with('/') {
            Ok(format!("{}{}", parent, new_name))
        } else {
            Ok(format!("{}/{}", parent, new_name))
        }
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

    fn parse_resource(body: &[u8]) -> Result<Resource> {
        serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Yandex resource: {}", e)))
    }

    /// Relocate an entity after a move/rename; Yandex answers with an
    /// operation link, so the canonical entity is synthesized locally.
    fn relocated(entry: &CloudEntry, new_path: String) -> CloudEntry {
        let new_name = new_path
            .rsplit('/')
            .next()
            .unwrap_or(new_path.as_str())
            .to_string();
        match entry {
            CloudEntry::Folder(folder) => {
                let mut folder = folder.clone();
                folder.locator = EntryLocator::by_path(new_path);
                folder.name = new_name;
                CloudEntry::Folder(folder)
            }
            CloudEntry::File(file) => {
                let mut file = file.clone();
                file.locator = EntryLocator::by_path(new_path);
                file.name = new_name;
                CloudEntry::File(file)
            }
        }
    }
}

/// Shape of the download-href indirection answer.
#[derive(Debug, Deserialize)]
struct HrefAnswer {
    href: String,
    #[serde(default)]
    #[allow(dead_code)]
    method: Option<String>,
}

impl ProviderBinding for YandexBinding {
    fn kind(&self) -> ProviderKind {
        ProviderKind::YandexDisk
    }

    fn addressing(&self) -> Addressing {
        Addressing::ByPath
    }

    fn root(&self) -> CloudFolder {
        CloudFolder::root(EntryLocator::by_path("disk:/"), "/")
    }

    fn about_request(&self, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!("{}/info?format=json", self.login_host()),
            ),
            token,
        ))
    }

    fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
        let info: PassportInfo = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Yandex passport info: {}", e)))?;
        Ok(info.into())
    }

    fn folder_info_request(&self, folder: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!(
                    "{}/resources?path={}&limit=0",
                    self.api(),
                    urlencoding::encode(folder.require_path()?)
                ),
            ),
            token,
        ))
    }

    fn file_info_request(&self, file: &EntryLocator, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!(
                    "{}/resources?path={}",
                    self.api(),
                    urlencoding::encode(file.require_path()?)
                ),
            ),
            token,
        ))
    }

    fn parse_folder(&self, body: &[u8]) -> Result<CloudFolder> {
        Self::parse_resource(body)?.into_folder()
    }

    fn parse_file(&self, body: &[u8]) -> Result<CloudFile> {
        Self::parse_resource(body)?.into_file()
    }

    fn list_request(
        &self,
        folder: &CloudFolder,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        let offset = Self::offset_of(page)?;
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!(
                    "{}/resources?path={}&limit={}&offset={}&sort=name",
                    self.api(),
                    urlencoding::encode(folder.locator.require_path()?),
                    LIST_LIMIT,
                    offset
                ),
            ),
            token,
        ))
    }

    fn parse_listing(&self, body: &[u8]) -> Result<PageChunk> {
        let resource = Self::parse_resource(body)?;
        let Some(embedded) = resource.embedded else {
            return Ok(PageChunk {
                entries: vec![],
                raw_count: 0,
                advance: PageAdvance::Done,
            });
        };

        let raw_count = embedded.items.len() as u64;
        let total = embedded.total;
        let entries = embedded
            .items
            .into_iter()
            .map(|item| {
                let parent = item.parent_locator();
                ListedEntry {
                    entry: item.into_entry(),
                    parent,
                }
            })
            .collect();

        Ok(PageChunk {
            entries,
            raw_count,
            advance: PageAdvance::OffsetTotal { total },
        })
    }

    fn create_folder_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Put,
                format!(
                    "{}/resources?path={}",
                    self.api(),
                    urlencoding::encode(&Self::join(parent, name)?)
                ),
            ),
            token,
        ))
    }

    fn parse_created_folder(
        &self,
        parent: &CloudFolder,
        name: &str,
        _body: &[u8],
    ) -> Result<CloudFolder> {
        // The answer is an operation link; synthesize the canonical folder.
        Ok(CloudFolder {
            locator: EntryLocator::by_path(Self::join(parent, name)?),
            name: name.to_string(),
            size: None,
            created: None,
            modified: None,
            is_root: false,
        })
    }

    fn rename_request(
        &self,
        entry: &CloudEntry,
        new_name: &str,
        token: &str,
    ) -> Result<HttpRequest> {
        let from = entry.locator().require_path()?;
        let to = Self::sibling_path(entry.locator(), new_name)?;
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Post,
                format!(
                    "{}/resources/move?from={}&path={}&overwrite=false",
                    self.api(),
                    urlencoding::encode(from),
                    urlencoding::encode(&to)
                ),
            ),
            token,
        ))
    }

    fn move_request(
        &self,
        entry: &CloudEntry,
        new_parent: &CloudFolder,
        token: &str,
    ) -> Result<HttpRequest> {
        let from = entry.locator().require_path()?;
        let to = Self::join(new_parent, entry.name())?;
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Post,
                format!(
                    "{}/resources/move?from={}&path={}&overwrite=false",
                    self.api(),
                    urlencoding::encode(from),
                    urlencoding::encode(&to)
                ),
            ),
            token,
        ))
    }

    fn delete_request(&self, entry: &CloudEntry, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Delete,
                format!(
                    "{}/resources?path={}&permanently=true",
                    self.api(),
                    urlencoding::encode(entry.locator().require_path()?)
                ),
            ),
            token,
        ))
    }

    fn parse_renamed(&self, entry: &CloudEntry, new_name: &str, _body: &[u8]) -> Result<CloudEntry> {
        Ok(Self::relocated(
            entry,
            Self::sibling_path(entry.locator(), new_name)?,
        ))
    }

    fn parse_moved(
        &self,
        entry: &CloudEntry,
        new_parent: &CloudFolder,
        _body: &[u8],
    ) -> Result<CloudEntry> {
        Ok(Self::relocated(entry, Self::join(new_parent, entry.name())?))
    }

    fn upload_request(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
        token: &str,
    ) -> Result<HttpRequest> {
        let overwrite = matches!(policy, ConflictPolicy::Overwrite);
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Put,
                format!(
                    "{}/resources/upload-content?path={}&overwrite={}",
                    self.api(),
                    urlencoding::encode(&Self::join(parent, name)?),
                    overwrite
                ),
            )
            .header("Content-Type", "application/octet-stream")
            .body(content),
            token,
        ))
    }

    fn update_request(&self, file: &CloudFile, content: Bytes, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Put,
                format!(
                    "{}/resources/upload-content?path={}&overwrite=true",
                    self.api(),
                    urlencoding::encode(file.locator.require_path()?)
                ),
            )
            .header("Content-Type", "application/octet-stream")
            .body(content),
            token,
        ))
    }

    fn parse_uploaded(&self, parent: &CloudFolder, name: &str, _body: &[u8]) -> Result<CloudFile> {
        // Upload answers carry no metadata; synthesize the canonical file.
        Ok(CloudFile {
            locator: EntryLocator::by_path(Self::join(parent, name)?),
            name: name.to_string(),
            size: None,
            created: None,
            modified: None,
        })
    }

    fn parse_updated(&self, file: &CloudFile, _body: &[u8]) -> Result<CloudFile> {
        Ok(file.clone())
    }

    fn download_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!(
                    "{}/resources/download?path={}",
                    self.api(),
                    urlencoding::encode(file.locator.require_path()?)
                ),
            ),
            token,
        ))
    }

    fn thumbnail_request(&self, file: &CloudFile, token: &str) -> Result<HttpRequest> {
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!(
                    "{}/resources/preview?path={}&size=M",
                    self.api(),
                    urlencoding::encode(file.locator.require_path()?)
                ),
            ),
            token,
        ))
    }

    /// Yandex signals the pre-signed content location through a JSON
    /// `{href, method}` body on the download endpoint rather than a
    /// `Location` header.
    fn classify_download(&self, response: &HttpResponse) -> DownloadStage {
        if response.status == 202 {
            return DownloadStage::Processing;
        }
        if response.status == 200 {
            let is_json = response
                .header("Content-Type")
                .map(|ct| ct.contains("application/json"))
                .unwrap_or(false);
            if is_json {
                if let Ok(answer) = serde_json::from_slice::<HrefAnswer>(&response.body) {
                    return DownloadStage::Redirect(answer.href);
                }
            }
        }
        DownloadStage::Ready
    }

    fn search_request(
        &self,
        _query: &str,
        _scope: SearchScope,
        page: &PageRequest,
        token: &str,
    ) -> Result<HttpRequest> {
        // No server-side search; fetch the flat file listing and filter
        // locally in parse_search.
        let _ = Self::offset_of(page)?;
        Ok(Self::authed(
            HttpRequest::new(
                HttpMethod::Get,
                format!("{}/resources/files?limit={}", self.api(), SEARCH_LIMIT),
            ),
            token,
        ))
    }

    fn parse_search(&self, query: &str, body: &[u8], scope: SearchScope) -> Result<PageChunk> {
        #[derive(Debug, Deserialize)]
        struct FilesList {
            items: Vec<Resource>,
        }

        let list: FilesList = serde_json::from_slice(body)
            .map_err(|e| CloudError::MalformedResponse(format!("Yandex files list: {}", e)))?;

        let needle = query.to_lowercase();
        let raw_count = list.items.len() as u64;
        let entries = list
            .items
            .into_iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .filter(|item| scope.admits(item.is_folder()))
            .map(|item| ListedEntry::new(item.into_entry()))
            .collect();

        Ok(PageChunk {
            entries,
            raw_count,
            advance: PageAdvance::Done,
        })
    }
}
