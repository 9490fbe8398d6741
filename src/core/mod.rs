//! Core infrastructure: error handling and endpoint configuration.

mod endpoints;
mod error;

pub use endpoints::{
    futures_api_url, Endpoints, FUTURES_API_BASE, FUTURES_TESTNET_API_BASE, FUTURES_URL_ENV,
};
pub use error::{AsterError, Error, Result};
