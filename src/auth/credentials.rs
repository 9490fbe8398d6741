//! Account credentials for signed requests.
//!
//! Uses the `secrecy` crate to prevent accidental logging of the private key
//! and to zero its memory on drop.

use alloy_primitives::Address;
use secrecy::SecretString;
use tracing::warn;

use crate::auth::abi::parse_address;
use crate::auth::signer::load_private_key;
use crate::core::{AsterError, Result};

/// Environment variable holding the account (main wallet) address.
pub const USER_ENV: &str = "ASTER_USER";
/// Environment variable holding the API wallet (signer) address.
pub const SIGNER_ENV: &str = "ASTER_SIGNER";
/// Environment variable holding the API wallet private key.
pub const PRIVATE_KEY_ENV: &str = "ASTER_PRIVATE_KEY";

/// Immutable `{user, signer, private key}` triple.
///
/// The private key is wrapped in `SecretString` which:
/// - Prevents accidental Debug/Display printing
/// - Zeros memory on drop via zeroize
#[derive(Clone)]
pub struct Credentials {
    user: String,
    signer: String,
    user_address: Address,
    signer_address: Address,
    private_key: SecretString,
}

impl Credentials {
    /// Create credentials, validating both addresses and the key.
    ///
    /// Address text is trimmed of surrounding whitespace and otherwise kept
    /// as given, including its case; that is what the server sees in the
    /// `user` and `signer` fields.
    ///
    /// # Errors
    /// Returns `AsterError::Encoding` for a malformed address and
    /// `AsterError::Signing` for a malformed private key.
    pub fn new(
        user: impl Into<String>,
        signer: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Result<Self> {
        let user = user.into().trim().to_string();
        let signer = signer.into().trim().to_string();
        let private_key = SecretString::from(private_key.into());

        let user_address = parse_address(&user, "user")?;
        let signer_address = parse_address(&signer, "signer")?;

        let key_address = load_private_key(&private_key)?.address();
        if key_address != signer_address {
            warn!(
                signer = %signer_address,
                key_address = %key_address,
                "Private key does not belong to the configured signer; the server will reject signatures"
            );
        }

        Ok(Self {
            user,
            signer,
            user_address,
            signer_address,
            private_key,
        })
    }

    /// Load credentials from environment variables.
    ///
    /// Looks for:
    /// - `ASTER_USER` - Account address
    /// - `ASTER_SIGNER` - API wallet address
    /// - `ASTER_PRIVATE_KEY` - API wallet private key
    ///
    /// # Errors
    /// Returns `AsterError::Config` if a variable is not set, or the
    /// validation errors of [`Credentials::new`].
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| AsterError::config(format!("Missing environment variable: {name}")))
        };

        Self::new(var(USER_ENV)?, var(SIGNER_ENV)?, var(PRIVATE_KEY_ENV)?)
    }

    /// Account address as configured (safe to log).
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Signer address as configured (safe to log).
    pub fn signer(&self) -> &str {
        &self.signer
    }

    /// Parsed account address.
    pub fn user_address(&self) -> Address {
        self.user_address
    }

    /// Parsed signer address.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// The private key, for signing only.
    ///
    /// **WARNING**: Never log or display the exposed value.
    pub(crate) fn private_key(&self) -> &SecretString {
        &self.private_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("signer", &self.signer)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
