//! Authenticated HTTP transport for the Echo API.
//!
//! Every request carries `Authorization: Bearer <token>`. A non-success
//! status is returned to the caller as data; only failures where no
//! response arrived (connect, DNS, timeout) are errors here.

use crate::config::EchoConfig;
use crate::error::{EchoError, EchoResult};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use tracing::{debug, warn};

/// Status and parsed JSON body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    /// Parsed JSON body. Empty or non-JSON bodies become `Value::Null`.
    pub body: serde_json::Value,
}

impl TransportResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// HTTP transport bound to one base URL and one vault token.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &EchoConfig) -> EchoResult<Self> {
        let base_url = Url::parse(config.api_url.trim_end_matches('/')).map_err(|e| {
            EchoError::Config(format!("api_url {:?} is not a valid URL: {e}", config.api_url))
        })?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        if config.vault_token.is_empty() {
            warn!("vault token is empty; requests will carry an empty bearer credential");
        }

        Ok(Self {
            client,
            base_url,
            token: config.vault_token.clone(),
        })
    }

    /// URL for `segments` under the base URL. Each segment is
    /// percent-encoded, so an id can never change the endpoint.
    pub fn endpoint(&self, segments: &[&str]) -> EchoResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EchoError::Config(format!("api_url {} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request to `url`, normally built with [`Self::endpoint`].
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        extra_headers: &[(HeaderName, HeaderValue)],
    ) -> EchoResult<TransportResponse> {
        let path = url.path().to_string();

        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            if *name == AUTHORIZATION {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }

        let mut req = self.client.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.bearer_auth(&self.token).send().await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                debug!("non-JSON body from {method} {path}: {e}");
                serde_json::Value::Null
            })
        };

        debug!("{method} {path} -> {status}");
        Ok(TransportResponse { status, body })
    }
}
