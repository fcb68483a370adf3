//! Dropbox adapter binding
//!
//! Binds the uniform adapter contract to the Dropbox v2 dialect:
//! path-addressed entities, POST-with-JSON RPC endpoints, opaque cursor
//! continuation (`list_folder` / `list_folder/continue`), and content calls
//! on a separate host authorized through the `Dropbox-API-Arg` header.

mod binding;
mod types;

pub use binding::DropboxBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Dropbox endpoint constants with caller-supplied application credentials.
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://www.dropbox.com/oauth2/authorize".into(),
        token_url: "https://api.dropboxapi.com/oauth2/token".into(),
        revoke_url: Some("https://api.dropboxapi.com/2/auth/token/revoke".into()),
        api_base: "https://api.dropboxapi.com/2".into(),
        content_base: Some("https://content.dropboxapi.com/2".into()),
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec![
            "files.metadata.read".into(),
            "files.content.read".into(),
            "files.content.write".into(),
        ],
    }
}

/// Register the Dropbox factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::Dropbox,
        Box::new(|parts| {
            let binding = Arc::new(DropboxBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
