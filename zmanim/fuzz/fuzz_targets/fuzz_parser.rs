#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(expr) = zmanim::parse(s) {
            // Whatever parses must print back to something that parses to the same tree
            let printed = expr.to_string();
            assert_eq!(zmanim::parse(&printed).ok(), Some(expr));
        }
    }
});
