#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Sentence chunking walks char boundaries by hand; arbitrary Unicode
    // (combining marks, lone punctuation, huge inputs) must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = seance_client::narrative::chunk_narration(s);
    }
});
