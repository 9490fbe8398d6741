//! API endpoint configuration.
//!
//! Base URLs are plain values passed into clients, never process-wide state.
//! [`futures_api_url`] honours the `ASTER_FUTURES_URL` environment variable so
//! deployments can point at a proxy without code changes.

/// Aster futures REST API (mainnet)
pub const FUTURES_API_BASE: &str = "https://fapi.asterdex.com";

/// Futures testnet REST API
pub const FUTURES_TESTNET_API_BASE: &str = "https://testnet.binancefuture.com";

/// Environment variable overriding the futures base URL
pub const FUTURES_URL_ENV: &str = "ASTER_FUTURES_URL";

/// Futures API base URL, with `ASTER_FUTURES_URL` override.
#[must_use]
pub fn futures_api_url() -> String {
    std::env::var(FUTURES_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| FUTURES_API_BASE.to_string())
}

/// Set of endpoints used by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Futures REST base URL
    pub futures: String,
}

impl Endpoints {
    /// Mainnet endpoints.
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            futures: FUTURES_API_BASE.to_string(),
        }
    }

    /// Testnet endpoints.
    #[must_use]
    pub fn testnet() -> Self {
        Self {
            futures: FUTURES_TESTNET_API_BASE.to_string(),
        }
    }

    /// Pick mainnet or testnet.
    #[must_use]
    pub fn for_network(testnet: bool) -> Self {
        if testnet {
            Self::testnet()
        } else {
            Self::mainnet()
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            futures: futures_api_url(),
        }
    }
}
