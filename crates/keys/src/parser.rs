//! Key document parsing and expiration filtering.
//!
//! [`KeyParser`] turns the raw bytes returned by the key endpoint into a
//! [`KeySnapshot`]. Parsing is all-or-nothing: if any entry fails validation
//! the whole document is rejected, so a partially valid key set is never
//! observable.

use std::sync::Arc;

use fail::fail_point;

use crate::{
    clock::Clock,
    document::KeyDocument,
    error::{KeyError, KeyResult},
    signing_key::SigningKey,
    snapshot::KeySnapshot,
};

/// Outcome of a successful parse.
#[derive(Debug, Clone)]
pub struct ParseReport {
    /// The keys that survived expiration filtering.
    pub snapshot: KeySnapshot,
    /// Number of well-formed keys dropped because they had expired.
    pub discarded_expired: usize,
}

/// Decodes key documents and drops expired keys.
///
/// Pure and synchronous apart from reading the injected [`Clock`].
#[derive(Clone)]
pub struct KeyParser {
    clock: Arc<dyn Clock>,
}

impl KeyParser {
    /// Creates a parser that evaluates expiration against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Parses `raw` into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyDocumentMalformed`] if the document cannot be
    /// decoded or any entry is invalid.
    pub fn parse(&self, raw: &[u8]) -> KeyResult<KeySnapshot> {
        self.parse_report(raw).map(|report| report.snapshot)
    }

    /// Parses `raw` and reports how many expired keys were discarded.
    ///
    /// # Errors
    ///
    /// Same as [`KeyParser::parse`].
    pub fn parse_report(&self, raw: &[u8]) -> KeyResult<ParseReport> {
        fail_point!("parser-before-decode", |_| {
            Err(KeyError::malformed("injected failure before decode"))
        });

        let document = KeyDocument::from_slice(raw)?;
        let now = self.clock.now();

        let mut live = Vec::with_capacity(document.keys.len());
        let mut discarded_expired = 0;
        for (index, entry) in document.keys.iter().enumerate() {
            let key = SigningKey::try_from(entry).map_err(|e| match e {
                KeyError::KeyDocumentMalformed { message, source } => {
                    KeyError::KeyDocumentMalformed { message: format!("keys[{index}]: {message}"), source }
                },
                other => other,
            })?;

            if key.is_expired_at(now) {
                tracing::debug!(
                    index,
                    protocol_version = key.protocol_version(),
                    "discarding expired key"
                );
                discarded_expired += 1;
                continue;
            }
            live.push(key);
        }

        Ok(ParseReport { snapshot: KeySnapshot::from_keys(live, now), discarded_expired })
    }
}

impl std::fmt::Debug for KeyParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyParser").finish_non_exhaustive()
    }
}
