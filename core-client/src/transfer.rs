//! Download engine: readiness retry, redirect following, local sink.
//!
//! A download or thumbnail request issued right after an upload can answer
//! "processing" while the provider finishes ingesting the file. The engine
//! waits a fixed delay and retries the same request, bounded — the retry
//! must never loop forever.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use bridge_traits::storage::LocalStore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::binding::{DownloadStage, ProviderBinding};
use crate::error::{CloudError, Result};

/// Fixed delay between readiness retries.
pub(crate) const READINESS_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on "still processing" retries for one request.
pub(crate) const MAX_READINESS_ATTEMPTS: u32 = 10;

/// Upper bound on pre-signed redirect hops.
const MAX_REDIRECTS: u32 = 3;

/// Execute a content request until the provider hands over the bytes.
///
/// Handles the three outcomes a binding can classify:
/// - `Processing`: sleep [`READINESS_DELAY`], retry the same request, up to
///   [`MAX_READINESS_ATTEMPTS`] times, then fail.
/// - `Redirect`: follow the pre-signed URL with a plain GET.
/// - `Ready`: triage the status and return the response.
pub(crate) async fn fetch_content(
    http: &dyn HttpTransport,
    request: HttpRequest,
    binding: &dyn ProviderBinding,
) -> Result<HttpResponse> {
    let mut current = request;
    let mut processing_attempts = 0u32;
    let mut redirects = 0u32;

    loop {
        let response = http
            .execute(current.clone())
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        match binding.classify_download(&response) {
            DownloadStage::Processing => {
                processing_attempts += 1;
                if processing_attempts >= MAX_READINESS_ATTEMPTS {
                    warn!(
                        attempts = processing_attempts,
                        "content still processing after max retries"
                    );
                    return Err(CloudError::Remote {
                        status: response.status,
                        message: format!(
                            "content still processing after {} attempts",
                            processing_attempts
                        ),
                    });
                }
                debug!(
                    attempt = processing_attempts,
                    delay_ms = READINESS_DELAY.as_millis() as u64,
                    "content not ready, retrying"
                );
                tokio::time::sleep(READINESS_DELAY).await;
            }
            DownloadStage::Redirect(url) => {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(CloudError::Remote {
                        status: response.status,
                        message: "too many download redirects".to_string(),
                    });
                }
                debug!("following pre-signed content URL");
                // Pre-signed URLs carry their own authorization.
                current = HttpRequest::new(HttpMethod::Get, url);
            }
            DownloadStage::Ready => {
                if !response.is_success() {
                    return Err(CloudError::from_status(response.status, &response.body));
                }
                return Ok(response);
            }
        }
    }
}

/// Write a ready content response to `dest`, guarding free space first.
///
/// The declared content length (header, falling back to the body length) is
/// compared against the sink's available space; a shortfall fails with
/// [`CloudError::InsufficientStorage`] before a single byte is written.
pub(crate) async fn save_content(
    local: &dyn LocalStore,
    dest: &Path,
    response: HttpResponse,
) -> Result<PathBuf> {
    let needed = response
        .content_length()
        .unwrap_or(response.body.len() as u64);
    let probe = dest.parent().filter(|p| !p.as_os_str().is_empty());

    let available = local
        .available_space(probe.unwrap_or_else(|| Path::new(".")))
        .await
        .map_err(|e| CloudError::Store(e.to_string()))?;

    if needed > available {
        return Err(CloudError::InsufficientStorage { needed, available });
    }

    if let Some(parent) = probe {
        local
            .create_dir_all(parent)
            .await
            .map_err(|e| CloudError::Store(e.to_string()))?;
    }

    local
        .write_file(dest, response.body)
        .await
        .map_err(|e| CloudError::Store(e.to_string()))?;

    Ok(dest.to_path_buf())
}
