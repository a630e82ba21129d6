#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if stampede::fuzzing::parse_duration_value_input(input).is_ok() {
            debug_assert!(!input.trim().is_empty());
            debug_assert!(!input.trim_start().starts_with('-'));
        }
    }
});
