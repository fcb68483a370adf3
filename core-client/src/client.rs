//! Shared provider client.
//!
//! One implementation of [`CloudAdapter`] serves all six providers. The
//! client owns the cross-provider rules — fail-fast token checks, the no-op
//! rename/move short-circuits, root immutability, pagination, readiness
//! retries — and delegates every provider-specific detail to its
//! [`ProviderBinding`].

use async_trait::async_trait;
use bridge_traits::http::{HttpRequest, HttpResponse, HttpTransport};
use bridge_traits::storage::LocalStore;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::adapter::CloudAdapter;
use crate::binding::ProviderBinding;
use crate::error::{CloudError, Result};
use crate::model::{
    Addressing, CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator,
    ProviderKind, SearchScope,
};
use crate::paging::accumulate_pages;
use crate::registry::AdapterParts;
use crate::session::AdapterSession;
use crate::transfer::{fetch_content, save_content};
use crate::accounts::AccountStore;

/// Generic adapter: a [`ProviderBinding`] bound to a session and transports.
pub struct ProviderClient {
    binding: Arc<dyn ProviderBinding>,
    session: Arc<AdapterSession>,
    http: Arc<dyn HttpTransport>,
    local: Arc<dyn LocalStore>,
}

impl ProviderClient {
    pub fn new(
        binding: Arc<dyn ProviderBinding>,
        session: Arc<AdapterSession>,
        http: Arc<dyn HttpTransport>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            binding,
            session,
            http,
            local,
        }
    }

    /// Assemble a client (and its session) from registry parts.
    pub fn from_parts(binding: Arc<dyn ProviderBinding>, parts: AdapterParts) -> Arc<Self> {
        let session = Arc::new(AdapterSession::new(
            binding.kind(),
            parts.config,
            parts.http.clone(),
            AccountStore::new(parts.secure),
            parts.events,
        ));
        Arc::new(Self::new(binding, session, parts.http, parts.local))
    }

    /// The session backing this adapter, for auth-flow integration
    /// (code exchange, hydration, state inspection).
    pub fn session(&self) -> &Arc<AdapterSession> {
        &self.session
    }

    /// Fail-fast token fetch; precedes every network call.
    async fn token(&self) -> Result<String> {
        self.session.access_token().await
    }

    /// Execute a data-operation request and triage the status.
    ///
    /// 401 surfaces as `Unauthorized` — data calls never trigger the
    /// refresh sub-flow, only `prepare()` does.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(CloudError::from_status(response.status, &response.body))
        }
    }

    fn expect_folder(entry: CloudEntry) -> Result<CloudFolder> {
        match entry {
            CloudEntry::Folder(folder) => Ok(folder),
            CloudEntry::File(_) => Err(CloudError::MalformedResponse(
                "provider returned a file where a folder was expected".into(),
            )),
        }
    }

    fn expect_file(entry: CloudEntry) -> Result<CloudFile> {
        match entry {
            CloudEntry::File(file) => Ok(file),
            CloudEntry::Folder(_) => Err(CloudError::MalformedResponse(
                "provider returned a folder where a file was expected".into(),
            )),
        }
    }

    /// Whether `entry` already sits under `new_parent`.
    ///
    /// Only decidable for path-addressed entities; id-addressed entities
    /// carry no parent in the canonical model, so the move is always issued.
    fn already_under(locator: &EntryLocator, new_parent: &CloudFolder) -> bool {
        match locator.parent_path() {
            Some(parent_path) => new_parent.locator.path.as_deref() == Some(parent_path.as_str()),
            None => false,
        }
    }
}

#[async_trait]
impl CloudAdapter for ProviderClient {
    fn kind(&self) -> ProviderKind {
        self.binding.kind()
    }

    fn root(&self) -> CloudFolder {
        self.binding.root()
    }

    #[instrument(skip(self), fields(provider = %self.kind()))]
    async fn prepare(&self) -> Result<CloudUser> {
        self.session.prepare(self.binding.as_ref()).await
    }

    #[instrument(skip(self), fields(provider = %self.kind()))]
    async fn current_user(&self) -> Result<CloudUser> {
        let token = self.token().await?;
        let response = self.execute(self.binding.about_request(&token)?).await?;
        self.binding.parse_user(&response.body)
    }

    #[instrument(skip(self, locator), fields(provider = %self.kind()))]
    async fn folder_info(&self, locator: &EntryLocator) -> Result<CloudFolder> {
        let token = self.token().await?;
        let response = self
            .execute(self.binding.folder_info_request(locator, &token)?)
            .await?;
        self.binding.parse_folder(&response.body)
    }

    #[instrument(skip(self, locator), fields(provider = %self.kind()))]
    async fn file_info(&self, locator: &EntryLocator) -> Result<CloudFile> {
        let token = self.token().await?;
        let response = self
            .execute(self.binding.file_info_request(locator, &token)?)
            .await?;
        self.binding.parse_file(&response.body)
    }

    #[instrument(skip(self, folder, cancel), fields(provider = %self.kind(), folder = %folder.name))]
    async fn list_children_with(
        &self,
        folder: &CloudFolder,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<CloudEntry>>> {
        let token = self.token().await?;
        accumulate_pages(
            self.http.as_ref(),
            |page| self.binding.list_request(folder, page, &token),
            |body| self.binding.parse_listing(body),
            Some(folder),
            &cancel,
        )
        .await
    }

    #[instrument(skip(self, parent), fields(provider = %self.kind()))]
    async fn create_folder(&self, parent: &CloudFolder, name: &str) -> Result<CloudFolder> {
        let token = self.token().await?;
        let response = self
            .execute(self.binding.create_folder_request(parent, name, &token)?)
            .await?;
        self.binding
            .parse_created_folder(parent, name, &response.body)
    }

    #[instrument(skip(self, folder), fields(provider = %self.kind()))]
    async fn rename_folder(&self, folder: &CloudFolder, new_name: &str) -> Result<CloudFolder> {
        if folder.is_root {
            debug!("rename of root is a no-op");
            return Ok(folder.clone());
        }
        if folder.name == new_name {
            debug!("rename to current name is a no-op");
            return Ok(folder.clone());
        }

        let token = self.token().await?;
        let entry = CloudEntry::Folder(folder.clone());
        let response = self
            .execute(self.binding.rename_request(&entry, new_name, &token)?)
            .await?;
        Self::expect_folder(self.binding.parse_renamed(&entry, new_name, &response.body)?)
    }

    #[instrument(skip(self, file), fields(provider = %self.kind()))]
    async fn rename_file(&self, file: &CloudFile, new_name: &str) -> Result<CloudFile> {
        if file.name == new_name {
            debug!("rename to current name is a no-op");
            return Ok(file.clone());
        }

        let token = self.token().await?;
        let entry = CloudEntry::File(file.clone());
        let response = self
            .execute(self.binding.rename_request(&entry, new_name, &token)?)
            .await?;
        Self::expect_file(self.binding.parse_renamed(&entry, new_name, &response.body)?)
    }

    #[instrument(skip(self, folder, new_parent), fields(provider = %self.kind()))]
    async fn move_folder(
        &self,
        folder: &CloudFolder,
        new_parent: &CloudFolder,
    ) -> Result<CloudFolder> {
        if folder.is_root {
            debug!("move of root is a no-op");
            return Ok(folder.clone());
        }
        if Self::already_under(&folder.locator, new_parent) {
            debug!("move to current parent is a no-op");
            return Ok(folder.clone());
        }

        let token = self.token().await?;
        let entry = CloudEntry::Folder(folder.clone());
        let response = self
            .execute(self.binding.move_request(&entry, new_parent, &token)?)
            .await?;
        Self::expect_folder(self.binding.parse_moved(&entry, new_parent, &response.body)?)
    }

    #[instrument(skip(self, file, new_parent), fields(provider = %self.kind()))]
    async fn move_file(&self, file: &CloudFile, new_parent: &CloudFolder) -> Result<CloudFile> {
        if Self::already_under(&file.locator, new_parent) {
            debug!("move to current parent is a no-op");
            return Ok(file.clone());
        }

        let token = self.token().await?;
        let entry = CloudEntry::File(file.clone());
        let response = self
            .execute(self.binding.move_request(&entry, new_parent, &token)?)
            .await?;
        Self::expect_file(self.binding.parse_moved(&entry, new_parent, &response.body)?)
    }

    #[instrument(skip(self, folder), fields(provider = %self.kind()))]
    async fn delete_folder(&self, folder: &CloudFolder) -> Result<()> {
        if folder.is_root {
            return Err(CloudError::Remote {
                status: 403,
                message: "the root folder cannot be deleted".into(),
            });
        }

        let token = self.token().await?;
        let entry = CloudEntry::Folder(folder.clone());
        self.execute(self.binding.delete_request(&entry, &token)?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, file), fields(provider = %self.kind()))]
    async fn delete_file(&self, file: &CloudFile) -> Result<()> {
        let token = self.token().await?;
        let entry = CloudEntry::File(file.clone());
        self.execute(self.binding.delete_request(&entry, &token)?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, parent, content), fields(provider = %self.kind(), bytes = content.len()))]
    async fn upload(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
    ) -> Result<CloudFile> {
        let token = self.token().await?;
        let response = self
            .execute(
                self.binding
                    .upload_request(parent, name, content, policy, &token)?,
            )
            .await?;
        self.binding.parse_uploaded(parent, name, &response.body)
    }

    #[instrument(skip(self, file, content), fields(provider = %self.kind(), bytes = content.len()))]
    async fn update_content(&self, file: &CloudFile, content: Bytes) -> Result<CloudFile> {
        let token = self.token().await?;
        let response = self
            .execute(self.binding.update_request(file, content, &token)?)
            .await?;
        self.binding.parse_updated(file, &response.body)
    }

    #[instrument(skip(self, file, dest), fields(provider = %self.kind(), file = %file.name))]
    async fn download(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf> {
        let token = self.token().await?;
        let request = self.binding.download_request(file, &token)?;
        let response = fetch_content(self.http.as_ref(), request, self.binding.as_ref()).await?;
        save_content(self.local.as_ref(), dest, response).await
    }

    #[instrument(skip(self, file, dest), fields(provider = %self.kind(), file = %file.name))]
    async fn thumbnail(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf> {
        let token = self.token().await?;
        let request = self.binding.thumbnail_request(file, &token)?;
        let response = fetch_content(self.http.as_ref(), request, self.binding.as_ref()).await?;
        save_content(self.local.as_ref(), dest, response).await
    }

    #[instrument(skip(self, cancel), fields(provider = %self.kind()))]
    async fn search_with(
        &self,
        query: &str,
        scope: SearchScope,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<CloudEntry>>> {
        let token = self.token().await?;
        // Search is cross-folder by nature; no parent filter applies.
        accumulate_pages(
            self.http.as_ref(),
            |page| self.binding.search_request(query, scope, page, &token),
            |body| self.binding.parse_search(query, body, scope),
            None,
            &cancel,
        )
        .await
    }

    #[instrument(skip(self), fields(provider = %self.kind()))]
    async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await
    }
}

// Addressing is part of the binding surface; expose it for hosts that need
// to branch on it (e.g. breadcrumb construction in a picker UI).
impl ProviderClient {
    pub fn addressing(&self) -> Addressing {
        self.binding.addressing()
    }
}
