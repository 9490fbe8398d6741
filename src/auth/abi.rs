//! ABI encoding of the signed tuple.
//!
//! The verifier hashes `abi.encode(string canonical, address user,
//! address signer, uint256 nonce)`:
//!
//! ```text
//! word 0   0x80                     offset of the string tail
//! word 1   user, left-padded        20 bytes in the low end
//! word 2   signer, left-padded
//! word 3   nonce, big-endian uint256
//! word 4   byte length of canonical
//! word 5.. canonical UTF-8, zero-padded to a 32-byte boundary
//! ```

use alloy_primitives::{Address, U256};

use crate::core::{AsterError, Result};

const WORD: usize = 32;
const HEAD_WORDS: usize = 4;
const STRING_OFFSET: usize = HEAD_WORDS * WORD;

/// The four values carried by an encoded tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTuple {
    /// Canonical parameter text
    pub canonical: String,
    /// Account address
    pub user: Address,
    /// Authorized signer address
    pub signer: Address,
    /// Request nonce (full uint256 range as sent on the wire)
    pub nonce: U256,
}

/// Parse a 20-byte hex address, with or without `0x`.
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] naming `field` if the text is not 40 hex
/// digits.
pub fn parse_address(text: &str, field: &str) -> Result<Address> {
    text.trim().parse::<Address>().map_err(|e| {
        AsterError::encoding_field(format!("Invalid {field} address {text:?}: {e}"), field)
    })
}

/// Encode the tuple from textual addresses.
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] if either address is malformed.
pub fn encode_tuple(canonical: &str, user: &str, signer: &str, nonce: u64) -> Result<Vec<u8>> {
    let user = parse_address(user, "user")?;
    let signer = parse_address(signer, "signer")?;
    Ok(encode_tuple_with(canonical, user, signer, nonce))
}

/// Encode the tuple from parsed addresses.
#[must_use]
pub fn encode_tuple_with(canonical: &str, user: Address, signer: Address, nonce: u64) -> Vec<u8> {
    let bytes = canonical.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(STRING_OFFSET + WORD + padded_len);
    out.extend_from_slice(&U256::from(STRING_OFFSET).to_be_bytes::<WORD>());
    out.extend_from_slice(&address_word(user));
    out.extend_from_slice(&address_word(signer));
    out.extend_from_slice(&U256::from(nonce).to_be_bytes::<WORD>());

    out.extend_from_slice(&U256::from(bytes.len()).to_be_bytes::<WORD>());
    out.extend_from_slice(bytes);
    out.resize(STRING_OFFSET + WORD + padded_len, 0);
    out
}

fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Decode bytes produced by [`encode_tuple`].
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] if the layout does not match: wrong
/// offset, dirty address padding, truncated tail, non-zero string padding or
/// invalid UTF-8.
pub fn decode_tuple(data: &[u8]) -> Result<DecodedTuple> {
    if data.len() < STRING_OFFSET + WORD {
        return Err(AsterError::encoding(format!(
            "Tuple too short: {} bytes, expected at least {}",
            data.len(),
            STRING_OFFSET + WORD
        )));
    }

    let offset = read_usize(word_at(data, 0), "string offset")?;
    if offset != STRING_OFFSET {
        return Err(AsterError::encoding(format!(
            "Unexpected string offset {offset}, expected {STRING_OFFSET}"
        )));
    }

    let user = read_address(word_at(data, 1), "user")?;
    let signer = read_address(word_at(data, 2), "signer")?;
    let nonce = U256::from_be_slice(word_at(data, 3));

    let len = read_usize(word_at(data, 4), "string length")?;
    let start = STRING_OFFSET + WORD;
    if len > data.len() - start {
        return Err(AsterError::encoding(format!(
            "String length {len} exceeds the {} tail bytes",
            data.len() - start
        )));
    }
    let padded_len = len.div_ceil(WORD) * WORD;
    if data.len() != start + padded_len {
        return Err(AsterError::encoding(format!(
            "Tuple length {} does not match string length {len}",
            data.len()
        )));
    }
    if data[start + len..].iter().any(|b| *b != 0) {
        return Err(AsterError::encoding("Non-zero string padding"));
    }

    let canonical = std::str::from_utf8(&data[start..start + len])
        .map_err(|e| AsterError::encoding(format!("Canonical text is not UTF-8: {e}")))?
        .to_string();

    Ok(DecodedTuple {
        canonical,
        user,
        signer,
        nonce,
    })
}

fn word_at(data: &[u8], index: usize) -> &[u8] {
    &data[index * WORD..(index + 1) * WORD]
}

fn read_usize(word: &[u8], what: &str) -> Result<usize> {
    let value = U256::from_be_slice(word);
    usize::try_from(value)
        .map_err(|_| AsterError::encoding(format!("{what} {value} does not fit in usize")))
}

fn read_address(word: &[u8], field: &str) -> Result<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AsterError::encoding_field(
            format!("{field} address word has non-zero high bytes"),
            field,
        ));
    }
    Ok(Address::from_slice(&word[12..]))
}
