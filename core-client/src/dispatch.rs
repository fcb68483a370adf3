//! Background dispatch.
//!
//! The non-blocking operation form: schedule an adapter operation on the
//! runtime and receive its outcome over a channel, without blocking the
//! caller. Channels replace the original failure/items callback pair — the
//! "succeeded with zero results" case stays distinct (`Ok(None)`), and the
//! caller decides on which thread/executor to await the outcome.
//!
//! Every call carries a [`CallId`] so hosts juggling several in-flight
//! operations can correlate outcomes with the requests that produced them.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapter::CloudAdapter;
use crate::error::{CloudError, Result};
use crate::model::{CloudEntry, CloudFolder, SearchScope};

/// Identifier correlating a background call with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(Uuid);

impl CallId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to an operation running in the background.
///
/// Await [`BackgroundCall::outcome`] for the typed result, or drop the
/// handle to let the operation finish unobserved. [`BackgroundCall::cancel`]
/// aborts cancellation-aware operations (listing/search stop fetching pages)
/// and resolves the outcome to [`CloudError::Cancelled`].
pub struct BackgroundCall<T> {
    id: CallId,
    rx: oneshot::Receiver<Result<T>>,
    cancel: CancellationToken,
}

impl<T> BackgroundCall<T> {
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token backing this call's cancellation.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the operation's outcome.
    pub async fn outcome(self) -> Result<T> {
        match self.rx.await {
            Ok(result) => result,
            // The worker was torn down before sending; the only way that
            // happens without a result is cancellation during shutdown.
            Err(_) => Err(CloudError::Cancelled),
        }
    }
}

/// Spawn an arbitrary adapter operation in the background.
///
/// The future races against the handle's cancellation token, so `cancel()`
/// resolves promptly even for operations without internal cancellation
/// points.
pub fn spawn_call<T, F>(fut: F) -> BackgroundCall<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    tokio::spawn(async move {
        let result = tokio::select! {
            _ = worker_cancel.cancelled() => Err(CloudError::Cancelled),
            result = fut => result,
        };
        let _ = tx.send(result);
    });

    BackgroundCall {
        id: CallId::new(),
        rx,
        cancel,
    }
}

/// Spawn a full listing accumulation with page-level cancellation.
///
/// Unlike [`spawn_call`], the token is threaded into the pagination loop:
/// cancelling between pages stops further page fetches immediately.
pub fn spawn_listing(
    adapter: Arc<dyn CloudAdapter>,
    folder: CloudFolder,
) -> BackgroundCall<Option<Vec<CloudEntry>>> {
    let (tx, rx) = oneshot::channel();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    tokio::spawn(async move {
        let result = adapter.list_children_with(&folder, worker_cancel).await;
        let _ = tx.send(result);
    });

    BackgroundCall {
        id: CallId::new(),
        rx,
        cancel,
    }
}

/// Spawn a search accumulation with page-level cancellation.
pub fn spawn_search(
    adapter: Arc<dyn CloudAdapter>,
    query: String,
    scope: SearchScope,
) -> BackgroundCall<Option<Vec<CloudEntry>>> {
    let (tx, rx) = oneshot::channel();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    tokio::spawn(async move {
        let result = adapter.search_with(&query, scope, worker_cancel).await;
        let _ = tx.send(result);
    });

    BackgroundCall {
        id: CallId::new(),
        rx,
        cancel,
    }
}
