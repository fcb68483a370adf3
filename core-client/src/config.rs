//! Provider configuration.
//!
//! All provider-specific constants are fixed at construction time in an
//! immutable value — there is no global mutable configuration. Each
//! `provider-*` crate exposes a helper that fills in its endpoint constants,
//! leaving only the application credentials to the caller.

/// Immutable configuration for one provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// OAuth authorization endpoint (consumed by the external browser flow).
    pub auth_url: String,
    /// OAuth token endpoint used for code exchange and refresh.
    pub token_url: String,
    /// Token revocation endpoint, when the provider has one.
    pub revoke_url: Option<String>,
    /// Primary REST API base URL.
    pub api_base: String,
    /// Secondary host for providers that split traffic (Box uploads,
    /// Dropbox content calls, CloudDrive content node calls, the Yandex
    /// identity host).
    pub content_base: Option<String>,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URL registered with the provider.
    pub redirect_uri: String,
    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// The secondary host, falling back to the primary API base for
    /// providers that use a single host.
    pub fn content_base(&self) -> &str {
        self.content_base.as_deref().unwrap_or(&self.api_base)
    }
}
