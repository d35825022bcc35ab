//! Signed object URLs.
//!
//! URL: `{base}/objects/{key}?expires={unix seconds}&signature={hex}` where the signature is
//! the BLAKE3 keyed hash of `key` and `expires`. The key is derived from a configured secret.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub const OBJECTS_PATH: &str = "objects";

const KEY_CONTEXT: &str = "pdfview 2024-05 signed object url";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature")]
    Malformed,

    #[error("signature mismatch")]
    Mismatch,

    #[error("link expired at {0}")]
    Expired(u64),
}

#[derive(Clone)]
pub struct UrlSigner {
    key: [u8; blake3::KEY_LEN],
    base: String,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("key", &"<hidden>")
            .field("base", &self.base)
            .finish()
    }
}

impl UrlSigner {
    #[must_use]
    pub fn new(secret: &str, public_url: &str) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            base: public_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Signs `key` for `expires_in` from now.
    #[must_use]
    pub fn sign(&self, key: &str, expires_in: Duration) -> String {
        let expires = unix_now().saturating_add(expires_in.as_secs());
        self.sign_until(key, expires)
    }

    /// Signs `key` until the absolute unix time `expires`.
    #[must_use]
    pub fn sign_until(&self, key: &str, expires: u64) -> String {
        let signature = self.mac(key, expires);
        format!(
            "{}/{OBJECTS_PATH}/{key}?expires={expires}&signature={}",
            self.base,
            signature.to_hex()
        )
    }

    pub fn verify(&self, key: &str, expires: u64, signature: &str) -> Result<(), SignatureError> {
        let presented = blake3::Hash::from_hex(signature).map_err(|_| SignatureError::Malformed)?;
        // blake3::Hash equality is constant time
        if presented != self.mac(key, expires) {
            return Err(SignatureError::Mismatch);
        }
        if unix_now() > expires {
            return Err(SignatureError::Expired(expires));
        }
        Ok(())
    }

    fn mac(&self, key: &str, expires: u64) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
        hasher.update(&expires.to_be_bytes());
        hasher.finalize()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const KEY: &str = "0b7e3c9a-5d1f-4f5e-9a4b-2c8d6e1f3a70.pdf";

    #[fixture]
    fn signer() -> UrlSigner {
        UrlSigner::new("secret", "http://localhost:5000/")
    }

    fn query(url: &str) -> (u64, String) {
        let (_, q) = url.split_once('?').unwrap();
        let mut expires = 0;
        let mut signature = String::new();
        for pair in q.split('&') {
            let (name, value) = pair.split_once('=').unwrap();
            match name {
                "expires" => expires = value.parse().unwrap(),
                "signature" => signature = value.to_owned(),
                _ => unreachable!("unexpected query parameter {name}"),
            }
        }
        (expires, signature)
    }

    #[rstest]
    fn sign_builds_object_url(signer: UrlSigner) {
        // Arrange

        // Act
        let url = signer.sign(KEY, Duration::from_secs(300));

        // Assert
        assert!(url.starts_with(&format!("http://localhost:5000/objects/{KEY}?expires=")));
        let (expires, signature) = query(&url);
        assert!(expires >= unix_now() + 299);
        assert_eq!(signature.len(), 64);
    }

    #[rstest]
    fn verify_own_signature(signer: UrlSigner) {
        // Arrange
        let url = signer.sign(KEY, Duration::from_secs(300));
        let (expires, signature) = query(&url);

        // Act
        let result = signer.verify(KEY, expires, &signature);

        // Assert
        assert_eq!(result, Ok(()));
    }

    #[rstest]
    #[case("other.pdf", 0)]
    #[case(KEY, 1)]
    #[trace]
    fn verify_tampered(signer: UrlSigner, #[case] key: &str, #[case] extra_secs: u64) {
        // Arrange
        let url = signer.sign(KEY, Duration::from_secs(300));
        let (expires, signature) = query(&url);

        // Act
        let result = signer.verify(key, expires + extra_secs, &signature);

        // Assert
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[rstest]
    #[case("")]
    #[case("zz")]
    #[case("abcdef")]
    #[trace]
    fn verify_malformed(signer: UrlSigner, #[case] signature: &str) {
        // Act
        let result = signer.verify(KEY, unix_now() + 60, signature);

        // Assert
        assert_eq!(result, Err(SignatureError::Malformed));
    }

    #[rstest]
    fn verify_expired(signer: UrlSigner) {
        // Arrange
        let expires = unix_now() - 1;
        let url = signer.sign_until(KEY, expires);
        let (_, signature) = query(&url);

        // Act
        let result = signer.verify(KEY, expires, &signature);

        // Assert
        assert_eq!(result, Err(SignatureError::Expired(expires)));
    }

    #[test]
    fn different_secret_rejects() {
        // Arrange
        let a = UrlSigner::new("a", "http://localhost");
        let b = UrlSigner::new("b", "http://localhost");
        let (expires, signature) = query(&a.sign(KEY, Duration::from_secs(60)));

        // Act
        let result = b.verify(KEY, expires, &signature);

        // Assert
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[rstest]
    fn debug_hides_key(signer: UrlSigner) {
        // Act
        let printed = format!("{signer:?}");

        // Assert
        assert!(printed.contains("<hidden>"));
        assert!(printed.contains("http://localhost:5000"));
        assert!(!printed.contains(&format!("{:?}", signer.key)));
    }
}
