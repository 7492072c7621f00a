//! Cryptographically secure random integers and strings.
//!
//! Everything draws from the operating system generator ([`OsRng`]) unless a
//! caller supplies its own `CryptoRng` through the `*_with` variants.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::{CryptoError, CryptoResult};

/// The 62-symbol alphabet used for salts and session tokens.
pub const ALPHANUMERIC: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Uniformly distributed integer in `[0, max)` from the OS generator.
pub fn random_int(max: u64) -> CryptoResult<u64> {
    random_int_with(&mut OsRng, max)
}

/// `n` random characters drawn from [`ALPHANUMERIC`] using the OS generator.
pub fn random_string(n: usize) -> CryptoResult<String> {
    random_string_with(&mut OsRng, n)
}

/// Uniformly distributed integer in `[0, max)` from `rng`.
///
/// Uses rejection sampling so that no residue class is favoured.
pub fn random_int_with<R>(rng: &mut R, max: u64) -> CryptoResult<u64>
where
    R: RngCore + CryptoRng + ?Sized,
{
    if max == 0 {
        return Err(CryptoError::InvalidBound(max));
    }

    // 2^64 mod max; draws above `ceiling` fall in the incomplete last block.
    let rem = (u64::MAX % max + 1) % max;
    let ceiling = u64::MAX - rem;

    loop {
        let mut buf = [0u8; 8];
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| CryptoError::Entropy(e.to_string()))?;
        let value = u64::from_le_bytes(buf);
        if value <= ceiling {
            return Ok(value % max);
        }
    }
}

/// `n` random characters drawn from [`ALPHANUMERIC`] using `rng`.
pub fn random_string_with<R>(rng: &mut R, n: usize) -> CryptoResult<String>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let alphabet_len = ALPHANUMERIC.len() as u64;
    (0..n)
        .map(|_| random_int_with(rng, alphabet_len).map(|i| ALPHANUMERIC[i as usize] as char))
        .collect()
}
