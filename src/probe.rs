use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::ProbeError;
use crate::website::CheckStatus;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs one availability check against an endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> CheckStatus;
}

/// HTTP(S) GET prober.
///
/// Certificate validation is switched off: the check is about whether the
/// site answers, and monitored sites may present chains the local trust
/// store does not know. Environment proxies are ignored.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()
            .map_err(|err| ProbeError::Other(error_chain(&err)))?;
        Ok(HttpProber { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> CheckStatus {
        let outcome = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match outcome {
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "probe succeeded");
                CheckStatus::Up
            }
            Err(err) => {
                let reason = classify(&err);
                debug!(url, %reason, "probe failed");
                CheckStatus::Down(reason)
            }
        }
    }
}

fn classify(err: &reqwest::Error) -> ProbeError {
    let detail = error_chain(err);
    if err.is_status() {
        ProbeError::HttpStatus(detail)
    } else if mentions_tls(err) {
        ProbeError::Tls(detail)
    } else if err.is_timeout() || err.is_connect() || err.is_request() {
        ProbeError::Transport(detail)
    } else {
        ProbeError::Other(detail)
    }
}

/// Whether any underlying cause looks like a TLS failure. The top-level
/// message is skipped because it embeds the URL.
fn mentions_tls(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if ["tls", "ssl", "certificate", "handshake"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Joins an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
