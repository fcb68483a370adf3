//! Bitcasa CloudFS adapter binding
//!
//! Binds the uniform adapter contract to the Bitcasa CloudFS dialect:
//! path-addressed entities, envelope responses (`{"result": .., "error":
//! ..}`), epoch-millisecond timestamps, single-page listings, and an
//! HMAC-SHA1 request-signing scheme — every request carries a signature
//! over method, path, canonical query, and date instead of a plain Bearer
//! header. Bitcasa issues no refresh tokens: an expired access token goes
//! straight down the logout-and-reset path.

mod binding;
pub mod signing;
mod types;

pub use binding::BitcasaBinding;

use core_client::{AdapterRegistry, CloudAdapter, ProviderClient, ProviderConfig, ProviderKind};
use std::sync::Arc;

/// Bitcasa endpoint constants with caller-supplied application credentials.
pub fn config(
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: "https://api.bitcasa.cloudfs.io/v2/oauth2/authenticate".into(),
        token_url: "https://api.bitcasa.cloudfs.io/v2/oauth2/token".into(),
        revoke_url: None,
        api_base: "https://api.bitcasa.cloudfs.io/v2".into(),
        content_base: None,
        client_id: client_id.into(),
        client_secret: client_secret.into(),
        redirect_uri: redirect_uri.into(),
        scopes: vec![],
    }
}

/// Register the Bitcasa factory with an adapter registry.
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(
        ProviderKind::Bitcasa,
        Box::new(|parts| {
            let binding = Arc::new(BitcasaBinding::new(parts.config.clone()));
            let adapter: Arc<dyn CloudAdapter> = ProviderClient::from_parts(binding, parts);
            adapter
        }),
    );
}
