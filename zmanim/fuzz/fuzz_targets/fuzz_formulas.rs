#![no_main]

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use libfuzzer_sys::fuzz_target;
use zmanim::{BatchRequest, Engine, FixedProvider, Location, ZmanDefinition};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let provider = FixedProvider::new(
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        let mut engine = Engine::new(provider);
        let _ = engine.add_zmanim([
            ZmanDefinition::new("fuzz", s),
            ZmanDefinition::new("alos", "sunrise - 72min"),
        ]);

        let location = Location::new(31.778, 35.235, FixedOffset::east_opt(7200).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let response = engine.calculate(&BatchRequest::new(date, location));
        assert_eq!(response.results.len() + response.excluded.len(), 2);
    }
});
