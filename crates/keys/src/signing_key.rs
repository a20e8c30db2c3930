//! Validated signing key.

use chrono::{DateTime, Utc};

use crate::{
    document::RawKeyEntry,
    error::{KeyError, KeyResult},
};

/// One published public key, validated and with its expiration resolved.
///
/// Built by [`KeyParser`](crate::KeyParser) from one element of the key
/// document. Immutable once constructed.
///
/// # Expiration
///
/// `expiration` is `None` for keys that never expire (the document carried
/// no expiration, or `0`). A key with an expiration is usable only while
/// `now < expiration`; see [`SigningKey::is_expired_at`].
///
/// The key value is opaque: it is carried exactly as published and never
/// decoded here.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use paykey_keys::SigningKey;
///
/// let key = SigningKey::builder()
///     .value("MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE")
///     .protocol_version("ECv2")
///     .expiration(Utc::now() + Duration::days(30))
///     .build();
///
/// assert!(!key.is_expired_at(Utc::now()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, bon::Builder)]
pub struct SigningKey {
    /// Base64-encoded ASN.1 public key.
    #[builder(into)]
    value: String,

    /// Protocol version this key signs for.
    #[builder(into)]
    protocol_version: String,

    /// Instant after which the key must not be used.
    expiration: Option<DateTime<Utc>>,
}

impl SigningKey {
    /// Base64-encoded key material.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Protocol version (e.g. `ECv2`).
    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Expiration instant, `None` if the key never expires.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Returns `true` if the key is no longer usable at `now`.
    ///
    /// A key whose expiration equals `now` is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }

    /// Consumes the key, returning its base64 value.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }
}

impl TryFrom<&RawKeyEntry> for SigningKey {
    type Error = KeyError;

    fn try_from(entry: &RawKeyEntry) -> KeyResult<Self> {
        if entry.key_value.trim().is_empty() {
            return Err(KeyError::malformed("keyValue is empty"));
        }

        if entry.protocol_version.trim().is_empty() {
            return Err(KeyError::malformed("protocolVersion is empty"));
        }

        let expiration = match entry.key_expiration {
            None | Some(0) => None,
            Some(millis) => Some(DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                KeyError::malformed(format!("keyExpiration {millis} is out of range"))
            })?),
        };

        Ok(Self {
            value: entry.key_value.clone(),
            protocol_version: entry.protocol_version.clone(),
            expiration,
        })
    }
}
