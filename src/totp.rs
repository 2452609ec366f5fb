use data_encoding::{BASE32, Encoding};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Length of one TOTP time step in seconds.
pub const TIME_STEP: u64 = 30;

const DIGITS: u32 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("invalid OTP secret: {0}")]
    InvalidSecret(String),
    #[error("system clock error: {0}")]
    ClockError(String),
}

/// Decoded shared key. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({} bytes)", self.0.len())
    }
}

impl Secret {
    /// Parse a base32 secret as found in otpauth:// URIs.
    ///
    /// Whitespace is dropped, letters are uppercased and `=` padding is
    /// added up to a multiple of 8 characters before decoding.
    pub fn from_base32(encoded: &str) -> Result<Self, TotpError> {
        let mut s: String = encoded
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        // Tolerate stray or partial padding: strip it and pad again.
        while s.ends_with('=') {
            s.pop();
        }
        if s.is_empty() {
            return Err(TotpError::InvalidSecret("secret is empty".to_string()));
        }
        pad_to_base32_block(&mut s);

        let bytes = lenient_base32()?
            .decode(s.as_bytes())
            .map_err(|e| TotpError::InvalidSecret(e.to_string()))?;

        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TotpError> {
        if bytes.is_empty() {
            return Err(TotpError::InvalidSecret(
                "secret decoded to an empty byte string".to_string(),
            ));
        }
        Ok(Secret(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// RFC 4648 base32 that ignores non-zero trailing bits, as many issuers emit them.
fn lenient_base32() -> Result<Encoding, TotpError> {
    let mut spec = BASE32.specification();
    spec.check_trailing_bits = false;
    spec.encoding()
        .map_err(|e| TotpError::InvalidSecret(e.to_string()))
}

/// Pad the string with `=` so its length is divisible by 8.
fn pad_to_base32_block(s: &mut String) {
    let rem = s.len() % 8;
    if rem != 0 {
        s.extend(std::iter::repeat_n('=', 8 - rem));
    }
}

/// Codes for the current and the following time step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpWindow {
    pub current: String,
    pub next: String,
    pub seconds_remaining: u64,
}

/// HOTP value (RFC 4226) for a raw counter.
pub fn hotp(secret: &Secret, counter: u64) -> Result<String, TotpError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| TotpError::InvalidSecret(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Low nibble of the last byte picks where the 4-byte window starts.
    let offset = (digest[19] & 0x0f) as usize;
    let value = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    Ok(format!(
        "{:0w$}",
        value % 10u32.pow(DIGITS),
        w = DIGITS as usize
    ))
}

/// Time step counter for a unix timestamp.
pub fn counter_at(at_time: u64) -> u64 {
    at_time / TIME_STEP
}

/// TOTP code (RFC 6238, SHA1, 6 digits, 30 s) at `at_time` seconds since epoch.
pub fn compute_code(secret: &Secret, at_time: u64) -> Result<String, TotpError> {
    hotp(secret, counter_at(at_time))
}

/// Whole seconds left in the step containing `now`, in `[1, TIME_STEP]`.
///
/// Only an instant exactly on a step boundary yields `TIME_STEP`.
pub fn seconds_remaining(now: Duration) -> u64 {
    let step_nanos = u128::from(TIME_STEP) * 1_000_000_000;
    let left = step_nanos - now.as_nanos() % step_nanos;
    let secs = (left / 1_000_000_000) as u64;
    secs.max(1)
}

/// Current code, code of the next step and the seconds the current one stays valid.
pub fn current_and_next(secret: &Secret, now: Duration) -> Result<TotpWindow, TotpError> {
    let at = now.as_secs();
    Ok(TotpWindow {
        current: compute_code(secret, at)?,
        next: compute_code(secret, at.saturating_add(TIME_STEP))?,
        seconds_remaining: seconds_remaining(now),
    })
}

/// Time since the unix epoch with sub-second precision.
pub fn now_since_epoch() -> Result<Duration, TotpError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| TotpError::ClockError(e.to_string()))
}
