//! Fuzz target for instance URL parsing.
//!
//! Parsing must never panic, and a parsed host never carries credentials.

#![no_main]

use couch_replication::Instance;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|raw: &str| {
    let Ok(instance) = Instance::parse(raw) else {
        return;
    };

    assert!(!instance.host().is_empty());
    assert!(!instance.host().contains('@'));
    assert!(!instance.base_url().ends_with('/'));

    // Building URLs for arbitrary names must not panic either
    let _ = instance.database_url(raw);
    let _ = instance.database_endpoint(raw);
});
