//! Amazon Cloud Drive adapter binding
//!
//! Binds the uniform adapter contract to the Cloud Drive node dialect:
//! id-addressed nodes, continuation-token pagination (`nextToken`), flat
//! filtered `/nodes` listings (which can leak nodes from other parents —
//! the core's parent guard drops those), and a separate content host for
//! upload/download with 202 responses while fresh media is processed.

mod binding;
mod types;

pub use binding::CloudDriveBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Cloud Drive endpoint constants with caller-supplied application
/// credentials. Login-with-Amazon has no revocation endpoint.
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://www.amazon.com/ap/oa".into(),
        token_url: "https://api.amazon.com/auth/o2/token".into(),
        revoke_url: None,
        api_base: "https://drive.amazonaws.com/drive/v1".into(),
        content_base: Some("https://content-na.drive.amazonaws.com/cdproxy".into()),
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec!["clouddrive:read_all".into(), "clouddrive:write".into()],
    }
}

/// Register the Cloud Drive factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::CloudDrive,
        Box::new(|parts| {
            let binding = Arc::new(CloudDriveBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
