#![no_main]

use libfuzzer_sys::fuzz_target;
use huh::decode_bytes;

fuzz_target!(|data: &[u8]| {
    // Either layout, any bytes: the decoder must return an error, never panic
    if let Ok(container) = decode_bytes(data) {
        assert_eq!(
            container.pixels.len(),
            container.width as usize * container.height as usize * 3
        );
    }
});
