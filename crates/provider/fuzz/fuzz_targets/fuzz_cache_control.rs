//! Fuzz target for `Cache-Control` max-age extraction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use paykey_provider::parse_max_age;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(max_age) = parse_max_age(header) {
        assert!(header.to_ascii_lowercase().contains("max-age"));
        assert!(header.contains(&max_age.as_secs().to_string()));
    }
});
