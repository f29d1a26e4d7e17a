/// HMAC signatures for upload locations
use crate::error::{AppError, AppResult};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies `(path, expiry)` pairs for presigned uploads
#[derive(Clone)]
pub struct UploadSigner {
    secret: Vec<u8>,
}

impl UploadSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(b"PUT\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Hex signature authorizing a PUT of `path` until `expires_at`
    pub fn sign(&self, path: &str, expires_at: DateTime<Utc>) -> String {
        hex::encode(self.mac(path, expires_at.timestamp()).finalize().into_bytes())
    }

    /// Check a signature and its expiry against `now`
    pub fn verify(
        &self,
        path: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let expires_at = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or_else(|| AppError::InvalidArgument("Invalid expiry".to_string()))?;

        if expires_at < now {
            return Err(AppError::Forbidden("Upload location has expired".to_string()));
        }

        let signature = hex::decode(signature)
            .map_err(|_| AppError::Forbidden("Malformed upload signature".to_string()))?;

        self.mac(path, expires)
            .verify_slice(&signature)
            .map_err(|_| AppError::Forbidden("Invalid upload signature".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_signature_verifies_until_expiry() {
        let signer = UploadSigner::new("a-secret-that-is-long-enough-for-tests");
        let now = Utc::now();
        let expires_at = now + Duration::minutes(20);
        let sig = signer.sign("videos/abc", expires_at);

        assert!(signer
            .verify("videos/abc", expires_at.timestamp(), &sig, now)
            .is_ok());

        // Other path, tampered expiry, past expiry
        assert!(signer
            .verify("videos/other", expires_at.timestamp(), &sig, now)
            .is_err());
        assert!(signer
            .verify("videos/abc", expires_at.timestamp() + 60, &sig, now)
            .is_err());
        assert!(matches!(
            signer.verify(
                "videos/abc",
                expires_at.timestamp(),
                &sig,
                expires_at + Duration::seconds(1)
            ),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_signature_from_other_secret_rejected() {
        let a = UploadSigner::new("first-secret-first-secret-first-secret");
        let b = UploadSigner::new("second-secret-second-secret-second");
        let expires_at = Utc::now() + Duration::minutes(5);
        let sig = a.sign("videos/abc", expires_at);

        assert!(b
            .verify("videos/abc", expires_at.timestamp(), &sig, Utc::now())
            .is_err());
    }
}
