#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<lounge_client::protocol::SyncEvent>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<lounge_client::protocol::SyncEvent>(s);
    }
});
