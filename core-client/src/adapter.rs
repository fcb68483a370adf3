//! # Provider Adapter Contract
//!
//! The uniform operation set every provider implements. Callers hold an
//! `Arc<dyn CloudAdapter>` and never see a provider-specific type.
//!
//! ## Operation forms
//!
//! The async methods here are the non-blocking form; the
//! [`crate::dispatch`] module layers channel-delivered background calls on
//! top of them, and [`crate::blocking::BlockingAdapter`] provides the
//! blocking form. All three forms run the same code, so they cannot diverge
//! in business logic.
//!
//! ## Contract rules
//!
//! - Every data operation fails fast with
//!   [`CloudError::NoAccessToken`](crate::error::CloudError::NoAccessToken)
//!   before any network call when the session holds no token.
//! - `rename_*`/`move_*` return the input unchanged, with no network call,
//!   when the target name/parent already matches or the entity is the root.
//! - [`CloudAdapter::root`] never performs I/O.
//! - Upload conflict policy is explicit per call.
//! - Listings and searches return `Ok(None)` for "succeeded, zero results"
//!   — distinct from an error.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{
    CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator, ProviderKind,
    SearchScope,
};

/// The uniform provider contract.
#[async_trait]
pub trait CloudAdapter: Send + Sync {
    /// Which provider this adapter binds.
    fn kind(&self) -> ProviderKind;

    /// Synthesize the canonical root folder from the provider-fixed
    /// locator. Never performs network I/O.
    fn root(&self) -> CloudFolder;

    /// Validate the session's token, refreshing it if the provider rejects
    /// it, and return the authenticated user. This is the only operation
    /// that drives the refresh sub-flow.
    async fn prepare(&self) -> Result<CloudUser>;

    /// Fetch the authenticated user's profile.
    async fn current_user(&self) -> Result<CloudUser>;

    /// Fetch metadata for a folder.
    async fn folder_info(&self, locator: &EntryLocator) -> Result<CloudFolder>;

    /// Fetch metadata for a file.
    async fn file_info(&self, locator: &EntryLocator) -> Result<CloudFile>;

    /// Accumulate the complete child listing of `folder` across however
    /// many pages the provider requires. `Ok(None)` means the folder is
    /// empty.
    async fn list_children(&self, folder: &CloudFolder) -> Result<Option<Vec<CloudEntry>>> {
        self.list_children_with(folder, CancellationToken::new())
            .await
    }

    /// [`CloudAdapter::list_children`] with caller-controlled cancellation:
    /// cancelling stops further page fetches and fails the accumulation
    /// with [`CloudError::Cancelled`](crate::error::CloudError::Cancelled).
    async fn list_children_with(
        &self,
        folder: &CloudFolder,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<CloudEntry>>>;

    /// Create a child folder under `parent`.
    async fn create_folder(&self, parent: &CloudFolder, name: &str) -> Result<CloudFolder>;

    /// Rename a folder. No-op (no network call) when the name already
    /// matches or the folder is the root.
    async fn rename_folder(&self, folder: &CloudFolder, new_name: &str) -> Result<CloudFolder>;

    /// Rename a file. No-op when the name already matches.
    async fn rename_file(&self, file: &CloudFile, new_name: &str) -> Result<CloudFile>;

    /// Move a folder under a new parent. No-op when the parent already
    /// matches (detectable only for path-addressed providers) or the folder
    /// is the root.
    async fn move_folder(&self, folder: &CloudFolder, new_parent: &CloudFolder)
        -> Result<CloudFolder>;

    /// Move a file under a new parent.
    async fn move_file(&self, file: &CloudFile, new_parent: &CloudFolder) -> Result<CloudFile>;

    /// Delete a folder and its contents. Deleting the root is rejected.
    async fn delete_folder(&self, folder: &CloudFolder) -> Result<()>;

    /// Delete a file.
    async fn delete_file(&self, file: &CloudFile) -> Result<()>;

    /// Upload a new file under `parent`. `policy` decides what happens when
    /// the name is taken and is always passed through to the provider.
    async fn upload(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
    ) -> Result<CloudFile>;

    /// Replace an existing file's content.
    async fn update_content(&self, file: &CloudFile, content: Bytes) -> Result<CloudFile>;

    /// Download a file to `dest`, waiting out "still processing" responses
    /// (bounded), following pre-signed redirects, and failing with
    /// `InsufficientStorage` before writing if local space is short.
    async fn download(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf>;

    /// Download a thumbnail rendition of `file` to `dest`. Same readiness
    /// and storage semantics as [`CloudAdapter::download`].
    async fn thumbnail(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf>;

    /// Search for entries matching `query`. `Ok(None)` means no matches.
    async fn search(&self, query: &str, scope: SearchScope) -> Result<Option<Vec<CloudEntry>>> {
        self.search_with(query, scope, CancellationToken::new())
            .await
    }

    /// [`CloudAdapter::search`] with caller-controlled cancellation.
    async fn search_with(
        &self,
        query: &str,
        scope: SearchScope,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<CloudEntry>>>;

    /// Revoke the token (best effort), remove the local account record, and
    /// reset the session.
    async fn sign_out(&self) -> Result<()>;
}
