#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(plan) = stampede::fuzzing::build_plan_from_json(input) {
            debug_assert!(plan.validate().is_ok());
            for threshold in &plan.thresholds {
                debug_assert!(
                    stampede::fuzzing::parse_threshold_expr_input(&threshold.source).is_ok()
                );
            }
        }
    }
});
