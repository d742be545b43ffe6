use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PiConfig, PiError, PiPayment, PiPlatform, PiUser};

/// Pi Platform API client over HTTPS.
pub struct HttpPiPlatform {
    client: Client,
    api_base: String,
    api_key: String,
}

/// Body of `GET /v2/me`.
#[derive(Debug, Deserialize)]
struct MeResponse {
    uid: String,
    username: String,
    #[serde(default)]
    wallet_address: Option<String>,
}

impl HttpPiPlatform {
    pub fn new(config: &PiConfig) -> Result<Self, PiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.api_base, path)
    }

    /// `{api_base}/v2/payments/{id}/{action}` with the id as one encoded
    /// path segment.
    fn payment_url(&self, payment_id: &str, action: &str) -> Result<Url, PiError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| PiError::Network(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PiError::Network(format!("invalid api base '{}'", self.api_base)))?
            .pop_if_empty()
            .extend(["v2", "payments", payment_id, action]);
        Ok(url)
    }

    /// Payment endpoints authenticate with the server key.
    fn keyed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Key {}", self.api_key))
    }

    async fn send_payment(&self, payment_id: &str, req: RequestBuilder) -> Result<PiPayment, PiError> {
        let resp = req.send().await.map_err(transport)?;
        match resp.status() {
            s if s.is_success() => resp
                .json::<PiPayment>()
                .await
                .map_err(|e| PiError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(PiError::PaymentNotFound(payment_id.to_string())),
            status => {
                let body = resp.text().await.unwrap_or_default();
                warn!(payment_id, %status, "Pi payment call failed");
                Err(PiError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

fn transport(e: reqwest::Error) -> PiError {
    if e.is_timeout() {
        PiError::Timeout
    } else {
        PiError::Network(e.to_string())
    }
}

#[async_trait]
impl PiPlatform for HttpPiPlatform {
    async fn me(&self, access_token: &str) -> Result<PiUser, PiError> {
        let resp = self
            .client
            .get(self.url("/me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        match resp.status() {
            s if s.is_success() => {
                let me: MeResponse = resp
                    .json()
                    .await
                    .map_err(|e| PiError::Decode(e.to_string()))?;
                debug!(uid = %me.uid, "verified Pi access token");
                Ok(PiUser {
                    uid: me.uid,
                    username: me.username,
                    wallet_address: me.wallet_address,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PiError::InvalidToken),
            status => Err(PiError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, PiError> {
        let url = self.payment_url(payment_id, "approve")?;
        let req = self.keyed(self.client.post(url));
        self.send_payment(payment_id, req).await
    }

    async fn complete_payment(&self, payment_id: &str, txid: &str) -> Result<PiPayment, PiError> {
        let url = self.payment_url(payment_id, "complete")?;
        let req = self
            .keyed(self.client.post(url))
            .json(&serde_json::json!({ "txid": txid }));
        self.send_payment(payment_id, req).await
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, PiError> {
        let url = self.payment_url(payment_id, "cancel")?;
        let req = self.keyed(self.client.post(url));
        self.send_payment(payment_id, req).await
    }
}
