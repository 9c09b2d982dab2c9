// src/random.rs
use crate::errors::SecretError;

use age::secrecy::{SecretString, zeroize::Zeroize};
use getrandom::fill;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const SYMBOLS: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

const SYMBOLS_BIT: u8 = 0b100;
const UPPERCASE_BIT: u8 = 0b010;
const DIGITS_BIT: u8 = 0b001;

/// Random bytes pulled from the OS per refill (eight per candidate draw)
const CHUNK_DRAWS: usize = 64;

/// Character classes and length of a generated password.
/// Lowercase letters are always part of the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    length: usize,
    pub uppercase: bool,
    pub symbols: bool,
    pub digits: bool,
}

impl PasswordPolicy {
    pub fn new(
        length: usize,
        uppercase: bool,
        symbols: bool,
        digits: bool,
    ) -> Result<Self, SecretError> {
        if length == 0 {
            return Err(SecretError::InvalidPolicy(
                "length must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            length,
            uppercase,
            symbols,
            digits,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Pack the class flags as `symbols | uppercase | digits`, high bit first
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.symbols {
            bits |= SYMBOLS_BIT;
        }
        if self.uppercase {
            bits |= UPPERCASE_BIT;
        }
        if self.digits {
            bits |= DIGITS_BIT;
        }
        bits
    }

    #[cfg(test)]
    pub fn from_bits(length: usize, bits: u8) -> Result<Self, SecretError> {
        if bits > 0b111 {
            return Err(SecretError::InvalidPolicy(format!(
                "unknown class bits {:03b}",
                bits
            )));
        }
        Self::new(
            length,
            bits & UPPERCASE_BIT != 0,
            bits & SYMBOLS_BIT != 0,
            bits & DIGITS_BIT != 0,
        )
    }

    /// Union of the enabled character classes
    pub fn alphabet(&self) -> Vec<u8> {
        let mut alphabet = LOWERCASE.to_vec();
        if self.symbols {
            alphabet.extend_from_slice(SYMBOLS);
        }
        if self.uppercase {
            alphabet.extend_from_slice(UPPERCASE);
        }
        if self.digits {
            alphabet.extend_from_slice(DIGITS);
        }
        alphabet
    }
}

/// Generate a password using direct OS entropy.
///
/// Every position is an independent uniform draw from the policy alphabet.
/// Candidates above the largest multiple of the alphabet size are rejected so
/// the modulo carries no bias.
pub fn generate(policy: &PasswordPolicy) -> Result<SecretString, SecretError> {
    let alphabet = policy.alphabet();
    let base = alphabet.len() as u64;
    let rejection_threshold: u64 = (u64::MAX / base) * base;

    tracing::debug!(
        length = policy.length(),
        conf = %format!("{:03b}", policy.bits()),
        "Building password"
    );

    let mut rng_buffer = vec![0u8; CHUNK_DRAWS * 8];
    let mut result = Vec::with_capacity(policy.length());

    while result.len() < policy.length() {
        fill(&mut rng_buffer)
            .map_err(|e| SecretError::Io(std::io::Error::other(e.to_string())))?;

        for chunk in rng_buffer.chunks_exact(8) {
            if result.len() == policy.length() {
                break;
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            let r = u64::from_ne_bytes(bytes);
            if r < rejection_threshold {
                result.push(alphabet[(r % base) as usize]);
            }
        }
    }

    rng_buffer.zeroize();
    // Alphabet is pure ASCII
    let password: String = result.iter().map(|&b| b as char).collect();
    result.zeroize();
    Ok(SecretString::from(password))
}
