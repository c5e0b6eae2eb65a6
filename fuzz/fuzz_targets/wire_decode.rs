#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whatever decodes must encode back to something that decodes to the same patches.
    if let Ok(patches) = wire::decode(data) {
        let again = wire::encode(&patches);
        assert_eq!(wire::decode(&again).ok(), Some(patches));
    }
});
