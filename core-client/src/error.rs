//! Error taxonomy shared by every adapter.
//!
//! All provider dialects translate into this one enum; callers never see a
//! provider-specific error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    /// Operation attempted before successful authentication/validation.
    /// Checked before any network call is issued.
    #[error("no access token held; authenticate before performing data operations")]
    NoAccessToken,

    /// Provider rejected the credentials (HTTP 401) on a data operation.
    /// Only the validation call self-heals via refresh; data calls surface
    /// this to the caller.
    #[error("provider rejected the access token (HTTP 401)")]
    Unauthorized,

    /// Any other non-2xx response, with the provider's own message.
    #[error("remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// JSON structurally unexpected: missing required field, wrong type.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Network-level failure (connection, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Local disk space smaller than the declared remote content length.
    /// Raised before any bytes are written.
    #[error("insufficient local storage: need {needed} bytes, {available} available")]
    InsufficientStorage { needed: u64, available: u64 },

    /// Account store (secure persistence) failure.
    #[error("account store failure: {0}")]
    Store(String),

    /// The session was reset (stale refresh token, revoked grant); a full
    /// re-authentication flow is required before further use.
    #[error("re-authentication required: {0}")]
    ReauthRequired(String),

    /// Caller cancelled an in-flight accumulation.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl From<bridge_traits::error::BridgeError> for CloudError {
    fn from(error: bridge_traits::error::BridgeError) -> Self {
        CloudError::Transport(error.to_string())
    }
}

impl CloudError {
    /// Translate a non-2xx provider response into a typed error.
    ///
    /// 401 becomes [`CloudError::Unauthorized`]; everything else becomes
    /// [`CloudError::Remote`] with the message pulled from whichever of the
    /// common provider error shapes matches the body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        if status == 401 {
            return CloudError::Unauthorized;
        }
        CloudError::Remote {
            status,
            message: extract_message(body),
        }
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// Providers disagree on the envelope: Box uses `message`, Dropbox
/// `error_summary`, OneDrive `error.message`, CloudDrive/Bitcasa
/// `message`/`error.message`. Falls back to the raw (truncated) body.
fn extract_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for candidate in [
            value.get("message"),
            value.get("error_summary"),
            value.get("error").and_then(|e| e.get("message")),
            value.get("error").filter(|e| e.is_string()),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(text) = candidate.as_str() {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let raw = String::from_utf8_lossy(body);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "no error body".to_string()
    } else {
        trimmed.chars().take(256).collect()
    }
}
