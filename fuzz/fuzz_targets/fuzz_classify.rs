#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw-byte deserialization first, so serde_json's own UTF-8 handling
    // sees invalid sequences too.
    let _ = serde_json::from_slice::<seance_client::protocol::ServerMessage>(data);

    // The classifier is total: any text frame must come back as some
    // ServerMessage, with unparseable content preserved under Unknown.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = seance_client::protocol::classify(s);
    }

    // Batch items go through their own classifier.
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = seance_client::protocol::classify_event(value);
    }
});
