use std::sync::Once;

pub mod http;

static RUSTLS_PROVIDER: Once = Once::new();

/// reqwest is built with `rustls-no-provider`, so a crypto provider has to be installed
/// process-wide before the first client is created.
pub fn ensure_rustls_crypto_provider() {
    RUSTLS_PROVIDER.call_once(|| {
        // Err only means another provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
