//! # Aster SDK
//!
//! Request authentication and transport for the Aster futures API.
//!
//! Signed endpoints expect every parameter set to carry a secp256k1 signature
//! over `abi.encode(canonicalJson, user, signer, nonce)`, wrapped in the
//! Ethereum personal-message prefix. This crate builds that signature
//! deterministically and hands back a ready-to-send parameter set.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aster_sdk::prelude::*;
//!
//! let credentials = Credentials::from_env()?;
//! let signer = RequestSigner::new(credentials, SigningConfig::default());
//!
//! let template = params_from_json(serde_json::json!({
//!     "symbol": "BTCUSDT",
//!     "side": "BUY",
//!     "type": "MARKET",
//!     "quantity": "1.5",
//! }))
//! .unwrap();
//!
//! let signed = signer.sign(&template)?;
//! println!("signature {}", signed.signature());
//! ```
//!
//! ## Module Organization
//!
//! - [`core`] - Error handling and endpoint configuration
//! - [`types`] - Request parameter tree
//! - [`auth`] - Canonicalization, nonces, ABI encoding, signing
//! - [`client`] - REST transport

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core infrastructure
pub mod core;

// Type definitions
pub mod types;

// Authentication
#[cfg(feature = "auth")]
#[cfg_attr(docsrs, doc(cfg(feature = "auth")))]
pub mod auth;

// API clients
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Prelude for convenient imports
pub mod prelude;

// ============================================================================
// Core Re-exports (always available)
// ============================================================================

pub use core::{
    futures_api_url, AsterError, Endpoints, Error, Result, FUTURES_API_BASE,
    FUTURES_TESTNET_API_BASE,
};

// ============================================================================
// Type Re-exports (always available)
// ============================================================================

pub use types::{params_from_json, Number, ParamValue, Params};

// ============================================================================
// Auth Re-exports
// ============================================================================

#[cfg(feature = "auth")]
pub use auth::{
    build_signed_request, canonicalize, canonicalize_params, decode_tuple, encode_tuple,
    recover_address, sign, Credentials, DecodedTuple, NonceSource, RequestSigner, Signature,
    SignedRequest, SigningConfig,
};

// ============================================================================
// Client Re-exports
// ============================================================================

#[cfg(feature = "client")]
pub use client::{FuturesClient, FuturesConfig};
