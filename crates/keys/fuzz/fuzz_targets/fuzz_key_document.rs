//! Fuzz target for key document decoding and parsing.
//!
//! Feeds arbitrary bytes to the parser. Any input must either produce a
//! snapshot or a `KeyDocumentMalformed` error; it must never panic.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use paykey_keys::{KeyError, KeyParser, SystemClock};

fuzz_target!(|data: &[u8]| {
    let parser = KeyParser::new(Arc::new(SystemClock));
    match parser.parse(data) {
        Ok(snapshot) => {
            let total: usize = snapshot
                .protocol_versions()
                .iter()
                .filter_map(|v| snapshot.keys_for(v))
                .map(<[String]>::len)
                .sum();
            assert_eq!(total, snapshot.key_count());
        },
        Err(KeyError::KeyDocumentMalformed { .. }) => {},
        Err(other) => panic!("unexpected error kind: {other:?}"),
    }
});
