//! Box adapter binding
//!
//! Binds the uniform adapter contract to the Box REST dialect:
//! id-addressed entities, offset/limit pagination with a declared
//! `total_count`, Bearer authentication, multipart uploads on a dedicated
//! upload host, and pre-signed `Location` redirects for downloads (202 with
//! `Retry-After` while a fresh upload is still processing).

mod binding;
mod types;

pub use binding::BoxBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Box endpoint constants with caller-supplied application credentials.
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://account.box.com/api/oauth2/authorize".into(),
        token_url: "https://api.box.com/oauth2/token".into(),
        revoke_url: Some("https://api.box.com/oauth2/revoke".into()),
        api_base: "https://api.box.com/2.0".into(),
        content_base: Some("https://upload.box.com/api/2.0".into()),
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec!["root_readwrite".into()],
    }
}

/// Register the Box factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::Box,
        Box::new(|parts| {
            let binding = Arc::new(BoxBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
