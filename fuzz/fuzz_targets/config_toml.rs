#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(plan) = stampede::fuzzing::build_plan_from_toml(input) {
            debug_assert!(plan.validate().is_ok());
            debug_assert!(!plan.profile.scenarios().is_empty());
        }
    }
});
