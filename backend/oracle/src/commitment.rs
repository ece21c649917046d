//! Moderation vote commitment.
//!
//! `keccak256(abi.encodePacked(uint256 project_id, uint256 user_id,
//! bytes32 decryption_key, bool vote))`, rendered as `0x`-prefixed hex so the
//! contract can verify the reveal.

use sha3::{Digest, Keccak256};

use crate::errors::{OracleError, Result};

pub fn moderation_commitment(
    project_id: i64,
    user_id: i64,
    decryption_key: &str,
    vote: bool,
) -> Result<String> {
    let mut hasher = Keccak256::new();
    hasher.update(uint256(project_id)?);
    hasher.update(uint256(user_id)?);
    hasher.update(bytes32(decryption_key)?);
    hasher.update([u8::from(vote)]);
    Ok(format!("0x{}", hex::encode(hasher.finalize())))
}

fn uint256(value: i64) -> Result<[u8; 32]> {
    let value = u64::try_from(value)
        .map_err(|_| OracleError::InvalidRequest(format!("{value} is not a valid uint256")))?;
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    Ok(word)
}

/// A `0x` hex key is taken as raw bytes; anything else as UTF-8. Either way
/// left-aligned and zero-padded to 32 bytes.
fn bytes32(key: &str) -> Result<[u8; 32]> {
    let raw = match key.strip_prefix("0x") {
        Some(hex_key) => hex::decode(hex_key).map_err(|e| {
            OracleError::InvalidRequest(format!("decryption_key is not valid hex: {e}"))
        })?,
        None => key.as_bytes().to_vec(),
    };
    if raw.len() > 32 {
        return Err(OracleError::InvalidRequest(
            "decryption_key is longer than 32 bytes".to_string(),
        ));
    }
    let mut word = [0u8; 32];
    word[..raw.len()].copy_from_slice(&raw);
    Ok(word)
}
