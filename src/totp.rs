//! Time-window one-time codes (RFC 6238 / RFC 4226, HMAC-SHA1).
//!
//! Defaults (6 digits, 30-second window) match common authenticator apps;
//! callers that need other parameters use [`generate_with`].

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{AppError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 30;

/// Default code width.
pub const DEFAULT_DIGITS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCode {
    pub code: String,
    /// Seconds until the current window rolls over.
    pub seconds_remaining: u64,
}

/// Generate a code for `unix_time` with the default window and width.
pub fn generate(secret_b32: &str, unix_time: i64) -> Result<TimeCode> {
    generate_with(secret_b32, unix_time, DEFAULT_WINDOW_SECS, DEFAULT_DIGITS)
}

/// Generate a code for `unix_time` with explicit parameters.
pub fn generate_with(
    secret_b32: &str,
    unix_time: i64,
    window_secs: u64,
    digits: u32,
) -> Result<TimeCode> {
    if window_secs == 0 {
        return Err(AppError::BadRequest("Window must be non-zero".into()));
    }
    if !(1..=9).contains(&digits) {
        return Err(AppError::BadRequest("Digits must be 1..=9".into()));
    }
    if unix_time < 0 {
        return Err(AppError::BadRequest("Time before the epoch".into()));
    }

    let key = decode_secret(secret_b32)?;
    let unix_time = unix_time as u64;
    let counter = unix_time / window_secs;

    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|_| AppError::BadRequest("One-time-code seed is empty".into()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation: low 4 bits of the last byte pick the offset.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let word = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = word % 10u32.pow(digits);

    Ok(TimeCode {
        code: format!("{:0width$}", code, width = digits as usize),
        seconds_remaining: window_secs - (unix_time % window_secs),
    })
}

/// Decode an RFC 4648 base32 secret, tolerating whitespace and padding.
fn decode_secret(secret_b32: &str) -> Result<Vec<u8>> {
    let cleaned: String = secret_b32
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let decoded = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned)
        .ok_or_else(|| AppError::BadRequest("Invalid base32 one-time-code seed".into()))?;

    if decoded.is_empty() {
        return Err(AppError::BadRequest("One-time-code seed is empty".into()));
    }
    Ok(decoded)
}
