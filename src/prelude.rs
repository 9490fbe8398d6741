//! Commonly used types for quick imports.
//!
//! # Example
//!
//! ```rust,ignore
//! use aster_sdk::prelude::*;
//!
//! let signer = RequestSigner::new(Credentials::from_env()?, SigningConfig::default());
//! let signed = signer.sign(&Params::new())?;
//! ```

// Core
pub use crate::core::{AsterError, Endpoints, Error, Result};

// Common types
pub use crate::types::{params_from_json, Number, ParamValue, Params};

// Auth (if enabled)
#[cfg(feature = "auth")]
pub use crate::auth::{
    build_signed_request, Credentials, RequestSigner, Signature, SignedRequest, SigningConfig,
};

// Clients (if enabled)
#[cfg(feature = "client")]
pub use crate::client::{FuturesClient, FuturesConfig};
