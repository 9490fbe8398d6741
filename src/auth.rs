//! Request authentication for the Aster futures API.
//!
//! Every signed call goes through the same pipeline:
//!
//! | Step | Module | Output |
//! |------|--------|--------|
//! | Canonicalize parameters | [`canonical`] | sorted compact JSON text |
//! | Draw nonce | [`nonce`] | microsecond counter |
//! | Encode tuple | [`abi`] | `abi.encode(string,address,address,uint256)` |
//! | Digest and sign | [`signer`] | 65-byte signature, `v` in `{27,28}` |
//! | Assemble | [`request`] | template + six authentication fields |
//!
//! # Example
//!
//! ```rust,ignore
//! use aster_sdk::auth::{Credentials, RequestSigner, SigningConfig};
//! use aster_sdk::types::params_from_json;
//!
//! let credentials = Credentials::from_env()?;
//! let signer = RequestSigner::new(credentials, SigningConfig::default());
//!
//! let template = params_from_json(serde_json::json!({
//!     "symbol": "BTCUSDT",
//!     "side": "BUY",
//!     "quantity": "1.5",
//! }))
//! .unwrap();
//! let signed = signer.sign(&template)?;
//! ```

pub mod abi;
pub mod canonical;
mod credentials;
pub mod nonce;
mod request;
pub mod signer;

pub use abi::{decode_tuple, encode_tuple, encode_tuple_with, DecodedTuple};
pub use canonical::{canonicalize, canonicalize_params};
pub use credentials::{Credentials, PRIVATE_KEY_ENV, SIGNER_ENV, USER_ENV};
pub use nonce::{Nonce, NonceSource};
pub use request::{
    build_signed_request, RequestSigner, SignedRequest, SigningConfig, DEFAULT_RECV_WINDOW_MS,
    NONCE_KEY, RECV_WINDOW_KEY, SIGNATURE_KEY, SIGNER_KEY, TIMESTAMP_KEY, USER_KEY,
};
pub use signer::{message_digest, recover_address, sign, Signature};
