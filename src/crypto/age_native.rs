// src/crypto/age_native.rs
use super::{CryptoGateway, into_secret};
use crate::errors::SecretError;
use crate::mem_struct::SecureBuffer;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::secrecy::{ExposeSecret, SecretString};
use age::{Decryptor, Encryptor};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Where the decryption identity comes from
enum IdentitySource {
    Loaded(age::x25519::Identity),
    /// Read on first decrypt, so encrypt-only commands never touch it
    File(PathBuf),
    Missing,
}

/// In-process backend: key ids are age x25519 recipients (`age1...`).
/// Decryption needs the matching identity file.
pub struct AgeGateway {
    identity: IdentitySource,
}

impl AgeGateway {
    pub fn new(identity: Option<age::x25519::Identity>) -> Self {
        let identity = match identity {
            Some(identity) => IdentitySource::Loaded(identity),
            None => IdentitySource::Missing,
        };
        Self { identity }
    }

    /// Decrypt with the identity in `key_path`; the file is only read when a
    /// secret is decrypted.
    pub fn with_identity_file(key_path: &Path) -> Self {
        Self {
            identity: IdentitySource::File(key_path.to_path_buf()),
        }
    }
}

/// Load the identity from an `age-keygen` style file; comment lines are
/// ignored.
fn load_identity(key_path: &Path) -> Result<age::x25519::Identity, SecretError> {
    let key_content = SecretString::from(fs::read_to_string(key_path)?);
    let key_line = key_content
        .expose_secret()
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("AGE-SECRET-KEY-"))
        .ok_or_else(|| {
            SecretError::MalformedConfig(format!(
                "no age identity found in {}",
                key_path.display()
            ))
        })?;

    key_line
        .parse()
        .map_err(|e| SecretError::MalformedConfig(format!("Invalid private key: {}", e)))
}

impl CryptoGateway for AgeGateway {
    fn probe(&self) -> Result<(), SecretError> {
        Ok(())
    }

    fn encrypt(&self, plaintext: &SecretString, recipient: &str) -> Result<String, SecretError> {
        let recipient: age::x25519::Recipient = recipient.parse().map_err(|e| {
            SecretError::Encrypt(format!("Invalid recipient {}: {}", recipient, e))
        })?;
        let encryptor =
            Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| SecretError::Encrypt(format!("Failed to create encryptor: {}", e)))?;

        let io_err = |e: std::io::Error| SecretError::Encrypt(e.to_string());
        let mut encrypted = Vec::new();
        {
            let armor = ArmoredWriter::wrap_output(&mut encrypted, Format::AsciiArmor)
                .map_err(io_err)?;
            let mut writer = encryptor.wrap_output(armor).map_err(io_err)?;
            writer
                .write_all(plaintext.expose_secret().as_bytes())
                .map_err(io_err)?;
            writer.finish().and_then(|armor| armor.finish()).map_err(io_err)?;
        }

        String::from_utf8(encrypted)
            .map_err(|_| SecretError::Encrypt("ciphertext is not armored text".to_string()))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretString, SecretError> {
        let loaded;
        let identity = match &self.identity {
            IdentitySource::Loaded(identity) => identity,
            IdentitySource::File(key_path) => {
                loaded = load_identity(key_path)?;
                &loaded
            }
            IdentitySource::Missing => {
                return Err(SecretError::Decrypt(
                    "no age identity configured (--age-identity)".to_string(),
                ));
            }
        };

        let decryptor = Decryptor::new(ArmoredReader::new(ciphertext))
            .map_err(|e| SecretError::Decrypt(e.to_string()))?;
        let mut reader = decryptor
            .decrypt(std::iter::once(identity as &dyn age::Identity))
            .map_err(|e| SecretError::Decrypt(e.to_string()))?;

        let mut decrypted = Vec::new();
        let read = reader.read_to_end(&mut decrypted);
        let buffer = SecureBuffer::new(decrypted);
        read.map_err(|e| SecretError::Decrypt(e.to_string()))?;

        into_secret(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keypair() -> (AgeGateway, String) {
        let identity = age::x25519::Identity::generate();
        let recipient = identity.to_public().to_string();
        (AgeGateway::new(Some(identity)), recipient)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (gateway, recipient) = keypair();
        for secret in ["test-secret", "with spaces and ünïcödé"] {
            let plaintext = SecretString::from(secret.to_string());
            let armored = gateway.encrypt(&plaintext, &recipient).unwrap();

            assert!(armored.starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));
            assert!(!armored.contains(secret));
            assert_eq!(gateway.decrypt(armored.as_bytes()).unwrap().expose_secret(), secret);
        }
    }

    #[test]
    fn test_single_character_roundtrip() {
        // One character can show up anywhere in the base64 body by chance
        let (gateway, recipient) = keypair();
        let plaintext = SecretString::from("x".to_string());
        let armored = gateway.encrypt(&plaintext, &recipient).unwrap();
        assert_eq!(gateway.decrypt(armored.as_bytes()).unwrap().expose_secret(), "x");
    }

    #[test]
    fn test_invalid_recipient() {
        let (gateway, _) = keypair();
        let plaintext = SecretString::from("secret".to_string());
        assert!(matches!(
            gateway.encrypt(&plaintext, "ABCD1234"),
            Err(SecretError::Encrypt(_))
        ));
    }

    #[test]
    fn test_wrong_identity_fails() {
        let (sender, recipient) = keypair();
        let (other, _) = keypair();
        let plaintext = SecretString::from("secret".to_string());
        let armored = sender.encrypt(&plaintext, &recipient).unwrap();

        assert!(matches!(other.decrypt(armored.as_bytes()), Err(SecretError::Decrypt(_))));
        assert!(matches!(
            AgeGateway::new(None).decrypt(armored.as_bytes()),
            Err(SecretError::Decrypt(_))
        ));
    }

    #[test]
    fn test_identity_file_with_comments() {
        let temp_dir = TempDir::new().unwrap();
        let identity = age::x25519::Identity::generate();
        let recipient = identity.to_public().to_string();
        let key_path = temp_dir.path().join("identity.txt");
        fs::write(
            &key_path,
            format!(
                "# created: 2026-01-01T00:00:00Z\n# public key: {}\n{}\n",
                recipient,
                identity.to_string().expose_secret()
            ),
        )
        .unwrap();

        let gateway = AgeGateway::with_identity_file(&key_path);
        let plaintext = SecretString::from("from-file".to_string());
        let armored = gateway.encrypt(&plaintext, &recipient).unwrap();
        assert_eq!(gateway.decrypt(armored.as_bytes()).unwrap().expose_secret(), "from-file");
    }

    #[test]
    fn test_identity_file_without_key() {
        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join("identity.txt");
        fs::write(&key_path, "# nothing here\n").unwrap();

        let (sender, recipient) = keypair();
        let armored = sender
            .encrypt(&SecretString::from("secret".to_string()), &recipient)
            .unwrap();

        assert!(matches!(
            AgeGateway::with_identity_file(&key_path).decrypt(armored.as_bytes()),
            Err(SecretError::MalformedConfig(_))
        ));
    }

    #[test]
    fn test_encrypt_without_identity_file() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = AgeGateway::with_identity_file(&temp_dir.path().join("absent.txt"));
        let recipient = age::x25519::Identity::generate().to_public().to_string();

        assert!(gateway.probe().is_ok());
        let armored = gateway
            .encrypt(&SecretString::from("secret".to_string()), &recipient)
            .unwrap();
        assert!(armored.starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));
        assert!(matches!(
            gateway.decrypt(armored.as_bytes()),
            Err(SecretError::Io(_))
        ));
    }
}
