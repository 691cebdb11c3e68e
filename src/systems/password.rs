use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::Sha256;

pub const DIGEST_LEN: usize = 32;

pub type Digest = [u8; DIGEST_LEN];

/// An opaque keyed function turning a password into a fixed-size digest
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &[u8]) -> Digest;

    fn verify(&self, password: &[u8], digest: &Digest) -> bool {
        let candidate = self.hash(password);

        // Compare every byte so the timing doesn't leak the matching prefix
        candidate
            .iter()
            .zip(digest.iter())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

#[derive(Clone)]
pub struct HmacSha256 {
    // Keyed once, cloned for every digest
    mac: Hmac<Sha256>,
}

impl HmacSha256 {
    pub fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: Hmac::new_from_slice(key)?,
        })
    }

    // Digests won't survive a restart
    pub fn random() -> Result<Self, InvalidLength> {
        Self::new(&rand::random::<[u8; 32]>())
    }
}

impl PasswordHasher for HmacSha256 {
    fn hash(&self, password: &[u8]) -> Digest {
        let mut mac = self.mac.clone();
        mac.update(password);

        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&mac.finalize().into_bytes());
        digest
    }

    fn verify(&self, password: &[u8], digest: &Digest) -> bool {
        let mut mac = self.mac.clone();
        mac.update(password);
        mac.verify_slice(digest).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{HmacSha256, PasswordHasher};

    #[test]
    fn digest_depends_on_password_and_key() {
        let hasher = HmacSha256::new(b"secret").unwrap();

        let digest = hasher.hash(b"pw1");
        assert_eq!(digest, hasher.hash(b"pw1"));
        assert_ne!(digest, hasher.hash(b"pw2"));
        assert_ne!(digest, HmacSha256::new(b"other").unwrap().hash(b"pw1"));
    }

    #[test]
    fn verify_password() {
        let hasher = HmacSha256::random().unwrap();
        let digest = hasher.hash(b"hunter2");

        assert!(hasher.verify(b"hunter2", &digest));
        assert!(!hasher.verify(b"hunter3", &digest));
        assert!(!hasher.verify(b"", &digest));
    }

    struct Identity;

    impl PasswordHasher for Identity {
        fn hash(&self, password: &[u8]) -> super::Digest {
            let mut digest = [0u8; super::DIGEST_LEN];
            let len = password.len().min(digest.len());
            digest[..len].copy_from_slice(&password[..len]);
            digest
        }
    }

    #[test]
    fn default_verify_compares_digests() {
        let digest = Identity.hash(b"abc");
        assert!(Identity.verify(b"abc", &digest));
        assert!(!Identity.verify(b"abd", &digest));
    }
}
