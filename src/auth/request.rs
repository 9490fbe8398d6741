//! Assembly of signed request parameters.
//!
//! The caller's template is cloned, stamped with `recvWindow` and
//! `timestamp`, canonicalized and signed together with the account fields and
//! a fresh nonce. `user`, `signer`, `signature` and `nonce` are added to the
//! copy afterwards; the template itself is never touched.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::auth::abi::encode_tuple_with;
use crate::auth::canonical::canonicalize_params;
use crate::auth::credentials::Credentials;
use crate::auth::nonce::{unix_millis, Nonce, NonceSource, SHARED_NONCES};
use crate::auth::signer::{self, Signature};
use crate::core::{AsterError, Result};
use crate::types::{ParamValue, Params};

/// Default `recvWindow` in milliseconds.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 50_000;

/// Validity window field, signed.
pub const RECV_WINDOW_KEY: &str = "recvWindow";
/// Request time in milliseconds, signed.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Account address, added after signing.
pub const USER_KEY: &str = "user";
/// API wallet address, added after signing.
pub const SIGNER_KEY: &str = "signer";
/// Hex signature, added after signing.
pub const SIGNATURE_KEY: &str = "signature";
/// Request nonce, added after signing.
pub const NONCE_KEY: &str = "nonce";

/// Freshness policy applied to signed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningConfig {
    /// Validity window the server grants after `timestamp`
    pub recv_window_ms: u64,
    /// Server clock minus local clock, in milliseconds
    pub time_offset_ms: i64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            time_offset_ms: 0,
        }
    }
}

impl SigningConfig {
    /// Set the receive window
    #[must_use]
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Set the server time offset
    #[must_use]
    pub fn with_time_offset(mut self, time_offset_ms: i64) -> Self {
        self.time_offset_ms = time_offset_ms;
        self
    }

    fn adjusted(&self, local_ms: u64) -> u64 {
        local_ms.saturating_add_signed(self.time_offset_ms)
    }
}

/// Template parameters plus the six authentication fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SignedRequest {
    params: Params,
    #[serde(skip)]
    canonical: String,
    #[serde(skip)]
    signature: Signature,
    #[serde(skip)]
    nonce: Nonce,
    #[serde(skip)]
    signer_address: Address,
}

impl SignedRequest {
    /// All parameters to send.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Take the parameters to send.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }

    /// The exact text that was signed. Not sent.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The signature placed in `signature`.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The nonce placed in `nonce`.
    #[must_use]
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// The `timestamp` field, if it is still present and numeric.
    #[must_use]
    pub fn timestamp(&self) -> Option<u64> {
        self.params
            .get(TIMESTAMP_KEY)
            .and_then(ParamValue::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Re-derive the tuple from the stored fields and check the signature.
    ///
    /// # Errors
    ///
    /// Returns [`AsterError::Encoding`] if the account fields are missing or
    /// malformed and [`AsterError::Signing`] if the signature does not
    /// recover to the `signer` field.
    pub fn verify(&self) -> Result<Address> {
        let field = |key: &str| {
            self.params
                .get(key)
                .and_then(ParamValue::as_str)
                .ok_or_else(|| AsterError::encoding_field(format!("Missing {key} field"), key))
        };
        let user = crate::auth::abi::parse_address(field(USER_KEY)?, USER_KEY)?;
        let signer = crate::auth::abi::parse_address(field(SIGNER_KEY)?, SIGNER_KEY)?;

        let packed = encode_tuple_with(&self.canonical, user, signer, self.nonce);
        let recovered = signer::recover_address(&packed, &self.signature)?;
        if recovered != signer || recovered != self.signer_address {
            return Err(AsterError::signing(format!(
                "Signature recovers to {recovered}, expected {signer}"
            )));
        }
        Ok(recovered)
    }
}

/// Signs request templates for one set of credentials.
///
/// `Send + Sync`; share one instance behind an `Arc`.
#[derive(Debug)]
pub struct RequestSigner {
    credentials: Credentials,
    config: SigningConfig,
    // None draws from the process-wide source
    nonces: Option<Arc<NonceSource>>,
}

impl RequestSigner {
    /// Create a signer drawing nonces from the process-wide source.
    ///
    /// Every signer created this way, and [`build_signed_request`], shares one
    /// counter, so nonces never repeat within the process.
    #[must_use]
    pub fn new(credentials: Credentials, config: SigningConfig) -> Self {
        Self {
            credentials,
            config,
            nonces: None,
        }
    }

    /// Use a dedicated nonce source instead of the process-wide one.
    ///
    /// Uniqueness then only holds among signers sharing `nonces`.
    #[must_use]
    pub fn with_nonce_source(mut self, nonces: Arc<NonceSource>) -> Self {
        self.nonces = Some(nonces);
        self
    }

    fn nonce_source(&self) -> &NonceSource {
        self.nonces.as_deref().unwrap_or(&SHARED_NONCES)
    }

    /// Credentials in use.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Freshness policy in use.
    #[must_use]
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign a template with the current time and a fresh nonce.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization, clock, encoding and signing errors
    /// unchanged.
    pub fn sign(&self, template: &Params) -> Result<SignedRequest> {
        let timestamp_ms = self.config.adjusted(unix_millis()?);
        let nonce = self.nonce_source().next_nonce()?;
        assemble(template, &self.credentials, &self.config, timestamp_ms, nonce)
    }

    /// Sign with an explicit timestamp and nonce.
    ///
    /// `timestamp_ms` is used as-is; the configured time offset is not
    /// applied.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization, encoding and signing errors unchanged.
    pub fn sign_at(&self, template: &Params, timestamp_ms: u64, nonce: Nonce) -> Result<SignedRequest> {
        assemble(template, &self.credentials, &self.config, timestamp_ms, nonce)
    }
}

/// Sign a template with default settings and the process-wide nonce source.
///
/// # Errors
///
/// Propagates canonicalization, clock, encoding and signing errors unchanged.
pub fn build_signed_request(template: &Params, credentials: &Credentials) -> Result<SignedRequest> {
    let config = SigningConfig::default();
    let timestamp_ms = unix_millis()?;
    let nonce = SHARED_NONCES.next_nonce()?;
    assemble(template, credentials, &config, timestamp_ms, nonce)
}

#[instrument(skip_all, fields(user = %credentials.user(), nonce = nonce))]
fn assemble(
    template: &Params,
    credentials: &Credentials,
    config: &SigningConfig,
    timestamp_ms: u64,
    nonce: Nonce,
) -> Result<SignedRequest> {
    let mut params = template.clone();
    params.insert(
        RECV_WINDOW_KEY.to_string(),
        config.recv_window_ms.to_string().into(),
    );
    params.insert(TIMESTAMP_KEY.to_string(), timestamp_ms.to_string().into());

    let canonical = canonicalize_params(&params)?;
    let packed = encode_tuple_with(
        &canonical,
        credentials.user_address(),
        credentials.signer_address(),
        nonce,
    );
    let signature = signer::sign(&packed, credentials.private_key())?;

    params.insert(USER_KEY.to_string(), credentials.user().into());
    params.insert(SIGNER_KEY.to_string(), credentials.signer().into());
    params.insert(SIGNATURE_KEY.to_string(), signature.to_hex().into());
    params.insert(NONCE_KEY.to_string(), nonce.into());

    debug!(
        timestamp = timestamp_ms,
        canonical_len = canonical.len(),
        param_count = params.len(),
        "Assembled signed request"
    );

    Ok(SignedRequest {
        params,
        canonical,
        signature,
        nonce,
        signer_address: credentials.signer_address(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::abi::encode_tuple;
    use crate::types::params_from_json;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const USER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const NONCE: u64 = 1_700_000_000_000_000;
    const TIMESTAMP: u64 = 1_700_000_000_000;

    fn credentials() -> Credentials {
        Credentials::new(USER, SIGNER, KEY).unwrap()
    }

    fn order() -> Params {
        params_from_json(json!({"symbol": "BTCUSDT", "side": "BUY", "quantity": "1.5"})).unwrap()
    }

    #[test]
    fn test_end_to_end_example() {
        let template = order();
        assert_eq!(
            canonicalize_params(&template).unwrap(),
            r#"{"quantity":"1.5","side":"BUY","symbol":"BTCUSDT"}"#
        );

        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let signed = signer.sign_at(&template, TIMESTAMP, NONCE).unwrap();

        assert_eq!(
            signed.canonical(),
            r#"{"quantity":"1.5","recvWindow":"50000","side":"BUY","symbol":"BTCUSDT","timestamp":"1700000000000"}"#
        );

        let packed = encode_tuple(signed.canonical(), USER, SIGNER, NONCE).unwrap();
        let recovered = signer::recover_address(&packed, signed.signature()).unwrap();
        assert_eq!(recovered, SIGNER.parse::<Address>().unwrap());
        assert_eq!(signed.verify().unwrap(), recovered);
    }

    #[test]
    fn test_injected_fields() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let signed = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        let params = signed.params();

        assert_eq!(params[RECV_WINDOW_KEY], ParamValue::from("50000"));
        assert_eq!(params[TIMESTAMP_KEY], ParamValue::from("1700000000000"));
        assert_eq!(params[USER_KEY], ParamValue::from(USER));
        assert_eq!(params[SIGNER_KEY], ParamValue::from(SIGNER));
        assert_eq!(params[NONCE_KEY], ParamValue::from(NONCE));
        assert_eq!(
            params[SIGNATURE_KEY],
            ParamValue::from(signed.signature().to_hex())
        );
        assert_eq!(params.len(), 3 + 6);
        assert_eq!(signed.timestamp(), Some(TIMESTAMP));
        assert_eq!(signed.nonce(), NONCE);
    }

    #[test]
    fn test_signed_fields_excluded_from_canonical() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let signed = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();

        for key in [USER_KEY, SIGNER_KEY, SIGNATURE_KEY, NONCE_KEY] {
            assert!(
                !signed.canonical().contains(&format!("\"{key}\"")),
                "{key} leaked into signed text"
            );
        }
    }

    #[test]
    fn test_template_is_not_mutated() {
        let template =
            params_from_json(json!({"symbol": "BTCUSDT", "side": "BUY"})).unwrap();
        let before = template.clone();

        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        signer.sign(&template).unwrap();
        build_signed_request(&template, &credentials()).unwrap();

        assert_eq!(template, before);
        assert_eq!(template.len(), 2);
    }

    #[test]
    fn test_deterministic_for_fixed_inputs() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let a = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        let b = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_recv_window_and_offset_config() {
        let config = SigningConfig::default()
            .with_recv_window(5_000)
            .with_time_offset(-250);
        assert_eq!(config.adjusted(10_000), 9_750);

        let signer = RequestSigner::new(credentials(), config);
        let signed = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        assert_eq!(signed.params()[RECV_WINDOW_KEY], ParamValue::from("5000"));
        assert!(signed.canonical().contains(r#""recvWindow":"5000""#));
    }

    #[test]
    fn test_encoding_failure_surfaces_unchanged() {
        let mut template = order();
        template.insert("price".into(), f64::NAN.into());

        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let err = signer.sign(&template).unwrap_err();
        assert!(matches!(err, AsterError::Encoding { .. }));
        assert!(!template.contains_key(TIMESTAMP_KEY));
    }

    #[test]
    fn test_verify_detects_tampering() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let mut signed = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        signed.canonical = signed.canonical.replace("1.5", "15");
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_concurrent_signing_uses_distinct_nonces() {
        let signer = Arc::new(RequestSigner::new(credentials(), SigningConfig::default()));
        let template = Arc::new(order());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let signer = Arc::clone(&signer);
                let template = Arc::clone(&template);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| signer.sign(&template).unwrap().nonce())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let nonces: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(nonces.len(), 100);
        assert_eq!(template.len(), 3);
    }

    #[test]
    fn test_signers_of_one_credential_share_nonces() {
        let first = Arc::new(RequestSigner::new(credentials(), SigningConfig::default()));
        let second = Arc::new(RequestSigner::new(credentials(), SigningConfig::default()));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|signer| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..20_000)
                        .map(|_| signer.nonce_source().next_nonce().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let nonces: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(nonces.len(), 40_000);
    }

    #[test]
    fn test_free_function_and_signer_never_collide() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let creds = credentials();
        let template = order();

        let mut seen = HashSet::new();
        for _ in 0..50 {
            assert!(seen.insert(signer.sign(&template).unwrap().nonce()));
            assert!(seen.insert(build_signed_request(&template, &creds).unwrap().nonce()));
        }
    }

    #[test]
    fn test_dedicated_nonce_source() {
        let source = Arc::new(NonceSource::new());
        let signer = RequestSigner::new(credentials(), SigningConfig::default())
            .with_nonce_source(Arc::clone(&source));

        let signed = signer.sign(&order()).unwrap();
        assert_eq!(source.last(), signed.nonce());
    }

    #[test]
    fn test_serializes_as_flat_params() {
        let signer = RequestSigner::new(credentials(), SigningConfig::default());
        let signed = signer.sign_at(&order(), TIMESTAMP, NONCE).unwrap();
        let value = serde_json::to_value(&signed).unwrap();

        assert_eq!(value["symbol"], "BTCUSDT");
        assert_eq!(value["nonce"], NONCE);
        assert!(value.get("canonical").is_none());
    }
}
