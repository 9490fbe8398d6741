//! Aster futures REST transport.
//!
//! Sends parameter sets to the API, signing them first when asked. Endpoint
//! paths and response shapes belong to the caller; this client only knows how
//! to encode, authenticate and rate limit a request.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aster_sdk::client::{FuturesClient, FuturesConfig};
//! use aster_sdk::auth::Credentials;
//! use reqwest::Method;
//!
//! let client = FuturesClient::new(FuturesConfig::default())?
//!     .with_credentials(Credentials::from_env()?);
//!
//! let body = client
//!     .call(Method::POST, "/fapi/v3/listenKey", &Default::default(), true)
//!     .await?;
//! ```

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter as GovRateLimiter};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::{Credentials, RequestSigner, SignedRequest, SigningConfig};
use crate::client::encode::{form_pairs, query_pairs, without_nulls};
use crate::core::futures_api_url;
use crate::core::{AsterError, Result};
use crate::types::Params;

type RateLimiter = GovRateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Futures API configuration
#[derive(Debug, Clone)]
pub struct FuturesConfig {
    /// Futures API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_per_second: u32,
    /// User agent string
    pub user_agent: String,
    /// Freshness policy for signed requests
    pub signing: SigningConfig,
}

impl Default for FuturesConfig {
    fn default() -> Self {
        Self {
            // Honours ASTER_FUTURES_URL
            base_url: futures_api_url(),
            timeout: Duration::from_secs(15),
            rate_limit_per_second: 10,
            user_agent: concat!("aster-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
            signing: SigningConfig::default(),
        }
    }
}

impl FuturesConfig {
    /// Create a new configuration builder with defaults.
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit (requests per second)
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit_per_second = rate_limit;
        self
    }

    /// Set user agent string
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set signing policy
    #[must_use]
    pub fn with_signing(mut self, signing: SigningConfig) -> Self {
        self.signing = signing;
        self
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Futures REST client
#[derive(Clone)]
pub struct FuturesClient {
    config: FuturesConfig,
    client: Client,
    signer: Option<Arc<RequestSigner>>,
    rate_limiter: Arc<RateLimiter>,
}

impl FuturesClient {
    /// Create a client without credentials (public endpoints only).
    ///
    /// # Errors
    ///
    /// Returns `AsterError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: FuturesConfig) -> Result<Self> {
        Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| AsterError::config(format!("Failed to create HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limit_per_second).unwrap_or(NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(GovRateLimiter::direct(quota));

        Ok(Self {
            config,
            client,
            signer: None,
            rate_limiter,
        })
    }

    /// Attach credentials, signing with the configured policy.
    #[must_use]
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        let signer = RequestSigner::new(credentials, self.config.signing);
        self.with_signer(Arc::new(signer))
    }

    /// Attach a shared request signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &FuturesConfig {
        &self.config
    }

    /// Account address of the attached credentials.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.signer.as_ref().map(|s| s.credentials().user())
    }

    /// Wait for rate limiter
    async fn wait_for_rate_limit(&self) {
        self.rate_limiter.until_ready().await;
    }

    /// Sign parameters with the attached credentials.
    ///
    /// # Errors
    ///
    /// Returns `AsterError::Config` when no credentials are attached, or any
    /// signing pipeline error.
    pub fn sign(&self, params: &Params) -> Result<SignedRequest> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| AsterError::config("Signed request requires credentials"))?;
        signer.sign(params)
    }

    /// Parameters exactly as they go on the wire.
    ///
    /// `null` mapping entries are dropped before signing so the signed text
    /// only covers fields the server receives.
    fn wire_params(&self, params: &Params, signed: bool) -> Result<Params> {
        let params = without_nulls(params);
        if !signed {
            return Ok(params);
        }
        let signed_request = self.sign(&params)?;
        debug!(nonce = signed_request.nonce(), "Request signed");
        Ok(signed_request.into_params())
    }

    /// Send a request and return the raw response body.
    ///
    /// POST sends a form body; GET and DELETE send a query string. The
    /// template `params` is never modified.
    ///
    /// # Errors
    ///
    /// Signing errors, `AsterError::Config` for unsupported methods,
    /// transport errors, and `AsterError::Api` for HTTP status >= 400.
    #[instrument(skip(self, method, params), fields(method = %method))]
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        signed: bool,
    ) -> Result<Vec<u8>> {
        self.wait_for_rate_limit().await;

        // Sign after waiting so the timestamp is fresh
        let params = self.wire_params(params, signed)?;

        let mut url = build_url(&self.config.base_url, path)?;
        let request = if method == Method::POST {
            self.client.post(url).form(&form_pairs(&params)?)
        } else if method == Method::GET || method == Method::DELETE {
            let pairs = query_pairs(&params)?;
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
            self.client.request(method, url)
        } else {
            return Err(AsterError::config(format!(
                "Unsupported HTTP method: {method}"
            )));
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.as_u16() >= 400 {
            let err = parse_api_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "Request rejected");
            return Err(err);
        }

        debug!(status = status.as_u16(), len = body.len(), "Response received");
        Ok(body)
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Errors of [`FuturesClient::call`], plus `AsterError::Parse` when the
    /// body does not match `T`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        signed: bool,
    ) -> Result<T> {
        let body = self.call(method, path, params, signed).await?;
        serde_json::from_slice(&body).map_err(|e| {
            AsterError::parse_with_source(format!("Failed to parse response from {path}: {e}"), e)
        })
    }
}

impl std::fmt::Debug for FuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuturesClient")
            .field("config", &self.config)
            .field("user", &self.user())
            .finish()
    }
}

/// Join base URL and path.
fn build_url(base_url: &str, path: &str) -> Result<Url> {
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), path))?)
}

/// Map an error response to `AsterError::Api`.
fn parse_api_error(status: u16, body: &[u8]) -> AsterError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(api) => AsterError::Api {
            status,
            message: api.msg,
            error_code: Some(api.code),
        },
        Err(_) => AsterError::api(status, String::from_utf8_lossy(body).into_owned()),
    }
}
