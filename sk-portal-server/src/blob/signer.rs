//! Time-limited signed URLs for reading stored documents.
//!
//! A URL carries its expiry (unix seconds) and an HMAC-SHA256 signature over
//! `bucket/key/expires`. Verification is constant-time.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::Bucket;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signed URL has expired")]
    Expired,

    #[error("signature does not match")]
    Invalid,
}

/// A signed URL and the moment it stops working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UrlSigner {
    keyed: HmacSha256,
    base_url: String,
    ttl: Duration,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(
        secret: impl AsRef<[u8]>,
        base_url: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(secret.as_ref())?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
        })
    }

    fn mac(&self, bucket: Bucket, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{}/{}/{}", bucket.as_str(), key, expires).as_bytes());
        mac
    }

    /// Hex signature for `bucket/key` valid until `expires` (unix seconds).
    pub fn signature(&self, bucket: Bucket, key: &str, expires: i64) -> String {
        hex::encode(self.mac(bucket, key, expires).finalize().into_bytes())
    }

    /// Signs a read URL that expires one TTL after `now`.
    pub fn sign(&self, bucket: Bucket, key: &str, now: DateTime<Utc>) -> SignedUrl {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(ttl);
        let expires_at = Utc
            .timestamp_opt(expires, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        SignedUrl {
            url: format!(
                "{}/blobs/{}/{}?expires={}&signature={}",
                self.base_url,
                bucket.as_str(),
                key,
                expires,
                self.signature(bucket, key, expires)
            ),
            expires_at,
        }
    }

    /// Checks a signature presented with a blob request.
    pub fn verify(
        &self,
        bucket: Bucket,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let signature_bytes = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(bucket, key, expires)
            .verify_slice(&signature_bytes)
            .map_err(|_| SignatureError::Invalid)?;
        if now.timestamp() > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("test-secret", "http://localhost:3000/", Duration::from_secs(60)).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let signed = signer().sign(Bucket::MeetingReports, "c/r.pdf", now());
        assert!(signed
            .url
            .starts_with("http://localhost:3000/blobs/meeting-reports/c/r.pdf?expires="));
        assert_eq!(signed.expires_at, now() + chrono::Duration::seconds(60));

        let expires: i64 = query_param(&signed.url, "expires").parse().unwrap();
        let signature = query_param(&signed.url, "signature");
        assert_eq!(
            signer().verify(Bucket::MeetingReports, "c/r.pdf", expires, signature, now()),
            Ok(())
        );
    }

    #[test]
    fn test_expired_url_rejected() {
        let signed = signer().sign(Bucket::MeetingReports, "c/r.pdf", now());
        let expires: i64 = query_param(&signed.url, "expires").parse().unwrap();
        let signature = query_param(&signed.url, "signature");
        let later = now() + chrono::Duration::seconds(61);
        assert_eq!(
            signer().verify(Bucket::MeetingReports, "c/r.pdf", expires, signature, later),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_other_secret_rejected() {
        let other = UrlSigner::new("other", "http://localhost:3000", Duration::from_secs(60)).unwrap();
        let expires = now().timestamp() + 60;
        let signature = other.signature(Bucket::MeetingReports, "c/r.pdf", expires);
        assert_eq!(
            signer().verify(Bucket::MeetingReports, "c/r.pdf", expires, &signature, now()),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            signer().verify(Bucket::MeetingReports, "c/r.pdf", expires, "not-hex", now()),
            Err(SignatureError::Invalid)
        );
    }

    proptest! {
        /// Property: changing the bucket, key or expiry invalidates the signature.
        #[test]
        fn tampering_is_detected(key in "[a-z0-9]{1,12}/[a-z0-9]{1,12}\\.pdf", bump in 1i64..10_000) {
            let s = signer();
            let expires = now().timestamp() + 30;
            let signature = s.signature(Bucket::MeetingReports, &key, expires);

            prop_assert!(s.verify(Bucket::MeetingReports, &key, expires, &signature, now()).is_ok());
            prop_assert_eq!(
                s.verify(Bucket::OfficerDocuments, &key, expires, &signature, now()),
                Err(SignatureError::Invalid)
            );
            prop_assert_eq!(
                s.verify(Bucket::MeetingReports, &format!("{}x", key), expires, &signature, now()),
                Err(SignatureError::Invalid)
            );
            prop_assert_eq!(
                s.verify(Bucket::MeetingReports, &key, expires + bump, &signature, now()),
                Err(SignatureError::Invalid)
            );
        }
    }
}
