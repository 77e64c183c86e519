//! Fuzz target for replication document normalization.
//!
//! Arbitrary bytes are parsed as JSON and fed to the normalizer, which must
//! never panic and must account for every document.

#![no_main]

use couch_replication::record::{normalize_log, LogDocument, NormalizedRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &[u8])| {
    let (id, body) = data;
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(body) else {
        return;
    };

    // Should never panic
    if let Ok(record) = NormalizedRecord::from_document(id, &doc) {
        assert!(!record.src_db.is_empty());
        assert!(!record.tgt_db.is_empty());
        assert!(!record.src_host.contains('@'));
        assert!(!record.tgt_host.contains('@'));
    }

    let log = normalize_log(&[LogDocument::new(id, doc)]);
    assert_eq!(log.records.len() + log.internal + log.malformed.len(), 1);
});
