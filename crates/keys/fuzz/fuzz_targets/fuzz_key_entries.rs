//! Structured fuzz target for key entries.
//!
//! Uses the `arbitrary` crate to generate documents with plausible shape
//! (string or numeric expirations, short protocol versions) so the fuzzer
//! spends its time in validation and expiry filtering rather than in the
//! JSON tokenizer.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use paykey_keys::{KeyParser, SystemClock};

#[derive(Debug, Arbitrary)]
enum FuzzedExpiration {
    Absent,
    Null,
    Number(i64),
    Text(String),
}

#[derive(Debug, Arbitrary)]
struct FuzzedEntry {
    key_value: String,
    protocol_version: String,
    expiration: FuzzedExpiration,
}

fuzz_target!(|entries: Vec<FuzzedEntry>| {
    let keys: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            let mut object = serde_json::json!({
                "keyValue": entry.key_value,
                "protocolVersion": entry.protocol_version,
            });
            let expiration = match &entry.expiration {
                FuzzedExpiration::Absent => None,
                FuzzedExpiration::Null => Some(serde_json::Value::Null),
                FuzzedExpiration::Number(n) => Some(serde_json::json!(n)),
                FuzzedExpiration::Text(s) => Some(serde_json::json!(s)),
            };
            if let Some(expiration) = expiration {
                object["keyExpiration"] = expiration;
            }
            object
        })
        .collect();

    let Ok(raw) = serde_json::to_vec(&serde_json::json!({ "keys": keys })) else {
        return;
    };

    let parser = KeyParser::new(Arc::new(SystemClock));
    if let Ok(report) = parser.parse_report(&raw) {
        assert!(report.snapshot.key_count() + report.discarded_expired <= entries.len());
    }
});
