use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use reqwest::{Client, StatusCode};

use crate::{cors, error::WidgetError, logging, util};

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

/// Upper bound for establishing the TCP/TLS connection to the proxy.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client, WidgetError> {
    CLIENT.get_or_try_init(|| {
        util::ensure_rustls_crypto_provider();

        Client::builder()
            .brotli(true)
            .gzip(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("single_stock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WidgetError::Transport(format!("Failed to create reqwest client: {:?}", e))
            })
    })
}

/// Performs one HTTP GET and returns the status together with the body text.
///
/// The whole exchange, headers and body, must finish within `timeout`; a request that
/// never completes comes back as [`WidgetError::Timeout`] instead of staying pending.
/// The status is not interpreted here.
pub async fn get_text(url: &str, timeout: Duration) -> Result<(StatusCode, String), WidgetError> {
    let client = get_client()?;
    let visit_log = format!("GET:{}", cors::redact_request_headers(url));
    let start = Instant::now();

    let exchange = async {
        let response = client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok((status, body))) => {
            logging::info_file_async(format!(
                "{} {} {} ms",
                visit_log,
                status,
                start.elapsed().as_millis()
            ));
            Ok((status, body))
        }
        Ok(Err(why)) => {
            logging::error_file_async(format!(
                "{} failed because {:?}. {} ms",
                visit_log,
                why,
                start.elapsed().as_millis()
            ));
            Err(why.into())
        }
        Err(_) => {
            logging::error_file_async(format!(
                "{} timed out after {} ms",
                visit_log,
                timeout.as_millis()
            ));
            Err(WidgetError::Timeout(timeout))
        }
    }
}
