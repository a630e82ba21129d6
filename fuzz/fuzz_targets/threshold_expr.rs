#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(expr) = stampede::fuzzing::parse_threshold_expr_input(input) {
            let rendered = expr.to_string();
            debug_assert!(stampede::fuzzing::parse_threshold_expr_input(&rendered).is_ok());
        }
        if let Some((selector, expression)) = input.split_once('|') {
            let _parsed = stampede::fuzzing::parse_threshold_input(selector, expression);
        }
    }
});
