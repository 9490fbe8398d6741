//! Digest and secp256k1 signing of encoded tuples.
//!
//! `digest = keccak256("\x19Ethereum Signed Message:\n32" || keccak256(packed))`,
//! signed with the account's API wallet key. The recovery byte goes out in the
//! `{27, 28}` convention.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{hex, keccak256, Address, Signature as AlloySignature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use secrecy::zeroize::Zeroizing;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::core::{AsterError, Result};

/// Personal-message prefix, followed by the decimal length of the hash.
pub const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// `r || s || v`
pub const SIGNATURE_LEN: usize = 65;

/// Offset added to the raw recovery id.
const RECOVERY_OFFSET: u8 = 27;

/// A 65-byte recoverable signature with `v` in `{27, 28}`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    r: B256,
    s: B256,
    v: u8,
}

impl Signature {
    /// Build from the 65 wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AsterError::Encoding`] if the length is not 65 or `v` is not
    /// 27 or 28.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(AsterError::encoding(format!(
                "Signature must be {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let v = bytes[64];
        if v != RECOVERY_OFFSET && v != RECOVERY_OFFSET + 1 {
            return Err(AsterError::encoding(format!(
                "Signature v must be 27 or 28, got {v}"
            )));
        }
        Ok(Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v,
        })
    }

    /// `R` component.
    #[must_use]
    pub fn r(&self) -> B256 {
        self.r
    }

    /// `S` component.
    #[must_use]
    pub fn s(&self) -> B256 {
        self.s
    }

    /// Recovery byte, 27 or 28.
    #[must_use]
    pub fn v(&self) -> u8 {
        self.v
    }

    /// Raw recovery id, 0 or 1.
    #[must_use]
    pub fn recovery_id(&self) -> u8 {
        self.v - RECOVERY_OFFSET
    }

    /// The 65 wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }

    /// `0x`-prefixed lowercase hex, 132 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Recover the address that signed `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`AsterError::Signing`] if no public key can be recovered.
    pub fn recover_from_digest(&self, digest: &B256) -> Result<Address> {
        let sig = AlloySignature::new(
            U256::from_be_slice(self.r.as_slice()),
            U256::from_be_slice(self.s.as_slice()),
            self.recovery_id() == 1,
        );
        sig.recover_address_from_prehash(digest)
            .map_err(|e| AsterError::signing(format!("Failed to recover signer: {e}")))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl FromStr for Signature {
    type Err = AsterError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| AsterError::encoding(format!("Signature is not valid hex: {e}")))?;
        Self::from_slice(&bytes)
    }
}

/// `keccak256(packed)`
#[must_use]
pub fn payload_hash(packed: &[u8]) -> B256 {
    keccak256(packed)
}

/// Apply the personal-message prefix to a hash and hash again.
///
/// The hash is appended as raw bytes, not hex text.
#[must_use]
pub fn prefixed_digest(hash: &B256) -> B256 {
    let len = hash.len().to_string();
    let mut message = Vec::with_capacity(ETH_MESSAGE_PREFIX.len() + len.len() + hash.len());
    message.extend_from_slice(ETH_MESSAGE_PREFIX.as_bytes());
    message.extend_from_slice(len.as_bytes());
    message.extend_from_slice(hash.as_slice());
    keccak256(&message)
}

/// Final digest signed for an encoded tuple.
#[must_use]
pub fn message_digest(packed: &[u8]) -> B256 {
    prefixed_digest(&payload_hash(packed))
}

/// Sign an encoded tuple with a hex private key.
///
/// The key is parsed for the duration of this call only.
///
/// # Errors
///
/// Returns [`AsterError::Signing`] if the key is malformed or signing fails,
/// and [`AsterError::InvariantViolation`] if the signature is not 65 bytes.
pub fn sign(packed: &[u8], private_key: &SecretString) -> Result<Signature> {
    let key = load_private_key(private_key)?;
    sign_digest(&key, &message_digest(packed))
}

/// Recover the address that produced `signature` over an encoded tuple.
///
/// # Errors
///
/// Returns [`AsterError::Signing`] if recovery fails.
pub fn recover_address(packed: &[u8], signature: &Signature) -> Result<Address> {
    signature.recover_from_digest(&message_digest(packed))
}

/// Parse a hex secp256k1 key, with or without `0x`.
pub(crate) fn load_private_key(private_key: &SecretString) -> Result<PrivateKeySigner> {
    let text = private_key.expose_secret().trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    let bytes = Zeroizing::new(
        hex::decode(text)
            .map_err(|e| AsterError::signing(format!("Private key is not valid hex: {e}")))?,
    );
    if bytes.len() != 32 {
        return Err(AsterError::signing(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    PrivateKeySigner::from_slice(&bytes)
        .map_err(|e| AsterError::signing(format!("Invalid secp256k1 private key: {e}")))
}

fn sign_digest(key: &PrivateKeySigner, digest: &B256) -> Result<Signature> {
    let sig = key
        .sign_hash_sync(digest)
        .map_err(|e| AsterError::signing_with_source("secp256k1 signing failed", e))?;

    let mut raw = Vec::with_capacity(SIGNATURE_LEN);
    raw.extend_from_slice(&sig.r().to_be_bytes::<32>());
    raw.extend_from_slice(&sig.s().to_be_bytes::<32>());
    raw.push(u8::from(sig.v()));

    if raw.len() != SIGNATURE_LEN {
        return Err(AsterError::invariant(format!(
            "Unexpected signature length: {}",
            raw.len()
        )));
    }
    raw[64] += RECOVERY_OFFSET;

    debug!(digest = %digest, v = raw[64], "Signed request digest");

    Signature::from_slice(&raw)
}
