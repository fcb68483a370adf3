//! Blocking facade.
//!
//! The synchronous operation form: each call blocks the calling thread until
//! the network round trip (plus any pagination or readiness follow-ups it
//! triggers) completes. The facade delegates to the same async adapter, so
//! the two forms cannot diverge in behavior.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapter::CloudAdapter;
use crate::error::Result;
use crate::model::{
    CloudEntry, CloudFile, CloudFolder, CloudUser, ConflictPolicy, EntryLocator, ProviderKind,
    SearchScope,
};

/// Blocking wrapper around a [`CloudAdapter`].
///
/// Owns a private current-thread runtime; must NOT be used from inside an
/// async context (that would block the executor — use the async adapter
/// directly there).
///
/// # Example
///
/// ```ignore
/// let adapter: Arc<dyn CloudAdapter> = registry.build(kind, parts).unwrap();
/// let blocking = BlockingAdapter::new(adapter)?;
///
/// let user = blocking.prepare()?;
/// let children = blocking.list_children(&blocking.root())?;
/// ```
pub struct BlockingAdapter {
    inner: Arc<dyn CloudAdapter>,
    runtime: tokio::runtime::Runtime,
}

impl BlockingAdapter {
    /// Wrap `inner`, building the private runtime.
    pub fn new(inner: Arc<dyn CloudAdapter>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { inner, runtime })
    }

    pub fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    /// Synthesize the root folder. No I/O, no blocking.
    pub fn root(&self) -> CloudFolder {
        self.inner.root()
    }

    pub fn prepare(&self) -> Result<CloudUser> {
        self.runtime.block_on(self.inner.prepare())
    }

    pub fn current_user(&self) -> Result<CloudUser> {
        self.runtime.block_on(self.inner.current_user())
    }

    pub fn folder_info(&self, locator: &EntryLocator) -> Result<CloudFolder> {
        self.runtime.block_on(self.inner.folder_info(locator))
    }

    pub fn file_info(&self, locator: &EntryLocator) -> Result<CloudFile> {
        self.runtime.block_on(self.inner.file_info(locator))
    }

    pub fn list_children(&self, folder: &CloudFolder) -> Result<Option<Vec<CloudEntry>>> {
        self.runtime.block_on(self.inner.list_children(folder))
    }

    pub fn create_folder(&self, parent: &CloudFolder, name: &str) -> Result<CloudFolder> {
        self.runtime.block_on(self.inner.create_folder(parent, name))
    }

    pub fn rename_folder(&self, folder: &CloudFolder, new_name: &str) -> Result<CloudFolder> {
        self.runtime
            .block_on(self.inner.rename_folder(folder, new_name))
    }

    pub fn rename_file(&self, file: &CloudFile, new_name: &str) -> Result<CloudFile> {
        self.runtime.block_on(self.inner.rename_file(file, new_name))
    }

    pub fn move_folder(&self, folder: &CloudFolder, new_parent: &CloudFolder) -> Result<CloudFolder> {
        self.runtime
            .block_on(self.inner.move_folder(folder, new_parent))
    }

    pub fn move_file(&self, file: &CloudFile, new_parent: &CloudFolder) -> Result<CloudFile> {
        self.runtime
            .block_on(self.inner.move_file(file, new_parent))
    }

    pub fn delete_folder(&self, folder: &CloudFolder) -> Result<()> {
        self.runtime.block_on(self.inner.delete_folder(folder))
    }

    pub fn delete_file(&self, file: &CloudFile) -> Result<()> {
        self.runtime.block_on(self.inner.delete_file(file))
    }

    pub fn upload(
        &self,
        parent: &CloudFolder,
        name: &str,
        content: Bytes,
        policy: ConflictPolicy,
    ) -> Result<CloudFile> {
        self.runtime
            .block_on(self.inner.upload(parent, name, content, policy))
    }

    pub fn update_content(&self, file: &CloudFile, content: Bytes) -> Result<CloudFile> {
        self.runtime
            .block_on(self.inner.update_content(file, content))
    }

    pub fn download(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf> {
        self.runtime.block_on(self.inner.download(file, dest))
    }

    pub fn thumbnail(&self, file: &CloudFile, dest: &Path) -> Result<PathBuf> {
        self.runtime.block_on(self.inner.thumbnail(file, dest))
    }

    pub fn search(&self, query: &str, scope: SearchScope) -> Result<Option<Vec<CloudEntry>>> {
        self.runtime.block_on(self.inner.search(query, scope))
    }

    pub fn sign_out(&self) -> Result<()> {
        self.runtime.block_on(self.inner.sign_out())
    }
}
