#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|depth: u8| {
    let depth = (depth as usize % 100) + 1;

    let mut expr = String::from("sunrise");
    for _ in 0..depth {
        expr = format!("({} + 1min)", expr);
    }

    let _ = zmanim::parse(&expr);
});
