//! Yandex Disk adapter binding
//!
//! Binds the uniform adapter contract to the Yandex Disk dialect:
//! path-addressed resources under the `disk:/` namespace, an
//! `Authorization: OAuth <token>` header scheme, offset/limit pagination
//! with a declared `total` inside `_embedded`, link-style responses for
//! mutations (the entity is synthesized locally), and downloads indirected
//! through a JSON `href`.

mod binding;
mod types;

pub use binding::YandexBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Yandex Disk endpoint constants with caller-supplied application
/// credentials. The identity lookup lives on the login host
/// (`content_base`).
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://oauth.yandex.com/authorize".into(),
        token_url: "https://oauth.yandex.com/token".into(),
        revoke_url: None,
        api_base: "https://cloud-api.yandex.net/v1/disk".into(),
        content_base: Some("https://login.yandex.ru".into()),
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec!["cloud_api:disk.read".into(), "cloud_api:disk.write".into()],
    }
}

/// Register the Yandex Disk factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::YandexDisk,
        Box::new(|parts| {
            let binding = Arc::new(YandexBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
