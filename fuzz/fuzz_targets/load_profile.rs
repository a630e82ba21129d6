#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut words = data
        .chunks_exact(4)
        .map(|chunk| u64::from(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])));
    let start = words.next().unwrap_or(0) % 1_000;
    let elapsed = words.next().unwrap_or(0);
    let mut stages = Vec::new();
    while let (Some(duration), Some(target)) = (words.next(), words.next()) {
        stages.push((duration % 60_000, target % 1_000));
    }

    let value = stampede::fuzzing::target_at_input(start, &stages, elapsed);
    let max = stages
        .iter()
        .map(|(_, target)| *target)
        .fold(start, u64::max);
    debug_assert!(value <= max);
});
