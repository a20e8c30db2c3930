//! Raw key document as published by the key endpoint.
//!
//! The endpoint serves JSON of the form:
//!
//! ```json
//! {
//!   "keys": [
//!     {
//!       "keyValue": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE...",
//!       "protocolVersion": "ECv2",
//!       "keyExpiration": "2154841200000"
//!     }
//!   ]
//! }
//! ```
//!
//! `keyExpiration` is milliseconds since the Unix epoch and is published as a
//! string, although plain JSON numbers are accepted too. A missing, `null`,
//! empty, or zero expiration means the key never expires.
//!
//! Types here only describe the wire shape. Validation and expiry filtering
//! happen in [`KeyParser`](crate::KeyParser).

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::error::{KeyError, KeyResult};

/// The full key document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDocument {
    /// Published keys, in document order.
    pub keys: Vec<RawKeyEntry>,
}

impl KeyDocument {
    /// Decodes a key document from a JSON byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyDocumentMalformed`] if the bytes are not valid
    /// JSON or a required field (`keys`, `keyValue`, `protocolVersion`) is
    /// missing or has the wrong type.
    pub fn from_slice(bytes: &[u8]) -> KeyResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| KeyError::malformed_with_source(format!("invalid key document: {e}"), e))
    }

    /// Encodes the document as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Internal`] if serialization fails.
    pub fn to_vec(&self) -> KeyResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| KeyError::internal_with_source("failed to encode key document", e))
    }
}

/// One entry of the `keys` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeyEntry {
    /// Base64-encoded ASN.1 public key.
    pub key_value: String,

    /// Protocol version the key is used with (e.g. `ECv2`).
    pub protocol_version: String,

    /// Expiration in milliseconds since the Unix epoch, if any.
    #[serde(
        default,
        deserialize_with = "deserialize_expiration",
        serialize_with = "serialize_expiration",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_expiration: Option<i64>,
}

/// `keyExpiration` arrives either as a JSON string or a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpirationRepr {
    Millis(i64),
    Text(String),
}

fn deserialize_expiration<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<ExpirationRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ExpirationRepr::Millis(millis)) => Ok(Some(millis)),
        Some(ExpirationRepr::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid keyExpiration {text:?}: {e}")))
        },
    }
}

fn serialize_expiration<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(millis) => serializer.serialize_str(&millis.to_string()),
        None => serializer.serialize_none(),
    }
}
