//! Key layout of the header store.
//!
//! Numbers are encoded big-endian so that lexicographic key order equals
//! numeric order, which the ordered backend relies on for range scans.
//!
//! | Key | Value |
//! |---|---|
//! | `h` ++ number ++ hash | RLP encoded header |
//! | `H` ++ hash | number |
//! | `LastHeader` | head hash |

use alloy_primitives::B256;

/// Prefix of `number ++ hash -> header` entries.
pub(crate) const HEADER_PREFIX: &[u8] = b"h";

/// Prefix of `hash -> number` entries.
pub(crate) const HEADER_NUMBER_PREFIX: &[u8] = b"H";

/// Key of the head pointer.
pub(crate) const HEAD_HEADER_KEY: &[u8] = b"LastHeader";

const NUMBER_LEN: usize = 8;
const HASH_LEN: usize = 32;

/// `h ++ number`
pub(crate) fn header_number_prefix(number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(HEADER_PREFIX.len() + NUMBER_LEN);
    key.extend_from_slice(HEADER_PREFIX);
    key.extend_from_slice(&encode_number(number));
    key
}

/// `h ++ number ++ hash`
pub(crate) fn header_key(number: u64, hash: B256) -> Vec<u8> {
    let mut key = header_number_prefix(number);
    key.extend_from_slice(hash.as_slice());
    key
}

/// `H ++ hash`
pub(crate) fn header_number_key(hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(HEADER_NUMBER_PREFIX.len() + HASH_LEN);
    key.extend_from_slice(HEADER_NUMBER_PREFIX);
    key.extend_from_slice(hash.as_slice());
    key
}

/// Splits a header key back into its number and hash.
pub(crate) fn decode_header_key(key: &[u8]) -> Option<(u64, B256)> {
    let rest = key.strip_prefix(HEADER_PREFIX)?;
    if rest.len() != NUMBER_LEN + HASH_LEN {
        return None;
    }
    let (number, hash) = rest.split_at(NUMBER_LEN);
    Some((decode_number(number)?, B256::from_slice(hash)))
}

pub(crate) const fn encode_number(number: u64) -> [u8; NUMBER_LEN] {
    number.to_be_bytes()
}

pub(crate) fn decode_number(bytes: &[u8]) -> Option<u64> {
    bytes.try_into().ok().map(u64::from_be_bytes)
}
