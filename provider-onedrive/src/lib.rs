//! OneDrive adapter binding
//!
//! Binds the uniform adapter contract to the Microsoft Graph drive dialect:
//! id-addressed items, `@odata.nextLink` continuation URLs, JSON PATCH
//! mutations, `conflictBehavior` upload semantics, and 302 pre-signed
//! content redirects. Microsoft issues no revocation endpoint; sign-out
//! only clears local state.

mod binding;
mod types;

pub use binding::OneDriveBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// OneDrive endpoint constants with caller-supplied application credentials.
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize".into(),
        token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token".into(),
        revoke_url: None,
        api_base: "https://graph.microsoft.com/v1.0".into(),
        content_base: None,
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec![
            "Files.ReadWrite".into(),
            "User.Read".into(),
            "offline_access".into(),
        ],
    }
}

/// Register the OneDrive factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::OneDrive,
        Box::new(|parts| {
            let binding = Arc::new(OneDriveBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
