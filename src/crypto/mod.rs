mod age_native;
mod gpg;

pub use age_native::AgeGateway;
pub use gpg::GpgGateway;

use crate::errors::SecretError;
use crate::mem_struct::SecureBuffer;

use age::secrecy::SecretString;

/// Encryption service addressed by recipient key id.
///
/// Plaintext must only ever travel through memory or a child's stdin; never
/// through argv and never into logs.
pub trait CryptoGateway {
    /// Fail with a precondition error if the backend cannot be used at all
    fn probe(&self) -> Result<(), SecretError>;

    /// Encrypt to `recipient`, returning ASCII-armored ciphertext
    fn encrypt(&self, plaintext: &SecretString, recipient: &str) -> Result<String, SecretError>;

    /// Decrypt ciphertext, armored or binary
    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretString, SecretError>;
}

/// Turn decrypted bytes into a secret string, dropping trailing line endings
fn into_secret(mut buffer: SecureBuffer) -> Result<SecretString, SecretError> {
    buffer.trim_line_endings();
    if buffer.is_empty() {
        return Err(SecretError::Decrypt("decryption produced no output".to_string()));
    }
    let text = std::str::from_utf8(buffer.as_slice())
        .map_err(|_| SecretError::Decrypt("plaintext is not valid UTF-8".to_string()))?;
    Ok(SecretString::from(text.to_string()))
}
