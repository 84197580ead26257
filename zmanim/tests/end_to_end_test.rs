use chrono::{FixedOffset, NaiveDate, NaiveTime, Timelike};
use zmanim::{
    BatchRequest, Engine, ErrorKind, EventPatternMapping, FixedProvider, Location, TagAssociation,
    Value, ZmanDefinition,
};

fn location() -> Location {
    Location::new(31.778, 35.235, FixedOffset::east_opt(2 * 3600).unwrap())
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
}

fn fixed_engine() -> Engine {
    Engine::new(FixedProvider::new(
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    ))
}

fn clock(value: &Value) -> (u32, u32, u32) {
    let time = value.as_time().expect("expected a time");
    (time.hour(), time.minute(), time.second())
}

#[test]
fn test_scenario_alos_72_minutes_before_sunrise() {
    let mut engine = fixed_engine();
    engine
        .add_zman(ZmanDefinition::new("alos_72", "sunrise - 72min"))
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    assert_eq!(clock(response.value("alos_72").unwrap()), (4, 48, 0));
}

#[test]
fn test_scenario_sof_zman_shema_gra() {
    let mut engine = fixed_engine();
    engine
        .add_zman(ZmanDefinition::new("sof_zman_shema_gra", "proportional_hours(3, gra)"))
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    assert_eq!(clock(response.value("sof_zman_shema_gra").unwrap()), (9, 0, 0));
}

#[test]
fn test_scenario_tagged_formula_is_excluded() {
    let mut engine = fixed_engine();
    engine
        .add_zmanim([
            ZmanDefinition::new("candle_lighting", "sunset - 18min")
                .with_tag(TagAssociation::event("erev_shabbos")),
            ZmanDefinition::new("shkia", "sunset"),
        ])
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));

    assert!(response.active_events.is_empty());
    assert_eq!(response.excluded, vec!["candle_lighting".to_string()]);
    assert_eq!(response.results.len(), 1);
    assert_eq!(clock(response.value("shkia").unwrap()), (18, 0, 0));
}

#[test]
fn test_full_day_with_dependencies() {
    let mut engine = fixed_engine();
    engine
        .add_zmanim([
            ZmanDefinition::new("alos", "solar(16.1, before_sunrise)"),
            ZmanDefinition::new("misheyakir", "solar(11.5, before_sunrise)"),
            ZmanDefinition::new("sof_zman_shema_mga", "proportional_hours(3, mga_16_1)"),
            ZmanDefinition::new("sof_zman_tefila_gra", "proportional_hours(4, gra)"),
            ZmanDefinition::new("chatzos", "midpoint(sunrise, sunset)"),
            ZmanDefinition::new("mincha_gedola", "@chatzos + 30min"),
            ZmanDefinition::new("plag", "sunset - shaah_zmanis(gra) * 1.25"),
            ZmanDefinition::new("tzais", "solar(8.5, after_sunset)"),
            ZmanDefinition::new("tzais_rabbeinu_tam", "sunset + 72min"),
        ])
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    assert_eq!(response.errors().count(), 0);

    let expected = [
        ("alos", (4, 55, 36)),
        ("misheyakir", (5, 14, 0)),
        // 04:55:36 to 19:04:24 is 14h08m48s; a quarter is 3h32m12s
        ("sof_zman_shema_mga", (8, 27, 48)),
        ("sof_zman_tefila_gra", (10, 0, 0)),
        ("chatzos", (12, 0, 0)),
        ("mincha_gedola", (12, 30, 0)),
        ("plag", (16, 45, 0)),
        ("tzais", (18, 34, 0)),
        ("tzais_rabbeinu_tam", (19, 12, 0)),
    ];
    for (key, time) in expected {
        assert_eq!(clock(response.value(key).unwrap()), time, "{}", key);
    }
}

#[test]
fn test_chanukah_titles_select_chanukah_zmanim() {
    let mut engine = fixed_engine();
    engine
        .add_event_patterns([
            EventPatternMapping::new("Chanukah: 3 Candles", "chanukah_day_3"),
            EventPatternMapping::new("Chanukah%", "chanukah"),
        ])
        .unwrap();
    engine
        .add_zmanim([
            ZmanDefinition::new("chanukah_candles", "sunset + 30min")
                .with_tag(TagAssociation::event("chanukah")),
            ZmanDefinition::new("third_night_only", "sunset + 31min")
                .with_tag(TagAssociation::event("chanukah_day_3")),
            ZmanDefinition::new("not_on_chanukah", "sunset")
                .with_tag(TagAssociation::event("chanukah").negated()),
        ])
        .unwrap();

    let december = NaiveDate::from_ymd_opt(2024, 12, 27).unwrap();
    let request =
        BatchRequest::new(december, location()).with_event_title("Chanukah: 3 Candles");
    let response = engine.calculate(&request);

    assert!(response.active_events.contains("chanukah"));
    assert!(response.active_events.contains("chanukah_day_3"));
    assert!(response.get("chanukah_candles").is_some());
    assert!(response.get("third_night_only").is_some());
    assert!(response.is_excluded("not_on_chanukah"));
}

#[test]
fn test_cycles_in_a_batch() {
    let mut engine = fixed_engine();
    engine
        .add_zmanim([
            ZmanDefinition::new("a", "@a + 5min"),
            ZmanDefinition::new("b", "@c - 5min"),
            ZmanDefinition::new("c", "@b + 5min"),
            ZmanDefinition::new("d", "sunrise"),
        ])
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    for key in ["a", "b", "c"] {
        let error = response.value(key).and_then(Value::error).unwrap();
        assert_eq!(error.kind(), ErrorKind::Cycle, "{}", key);
    }
    assert_eq!(clock(response.value("d").unwrap()), (6, 0, 0));
}

#[test]
fn test_overflowing_formula_does_not_stop_the_batch() {
    let mut engine = fixed_engine();
    engine
        .add_zmanim([
            ZmanDefinition::new("ok", "sunrise"),
            ZmanDefinition::new("bad", "sunrise + 30min * 79228162514264337593543950335"),
        ])
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    assert_eq!(clock(response.value("ok").unwrap()), (6, 0, 0));
    let error = response.value("bad").and_then(Value::error).unwrap();
    assert_eq!(error.kind(), ErrorKind::Computation);
}

#[test]
fn test_conditional_and_seasonal_formulas_in_a_batch() {
    let mut engine = fixed_engine();
    engine
        .add_zmanim([
            ZmanDefinition::new(
                "candle_lighting",
                "if (latitude > 31.7 && month >= 3) { sunset - 40min } else { sunset - 18min }",
            ),
            ZmanDefinition::new(
                "tzais",
                "if (season == \"winter\") { sunset + 50min } else if (date >= 21-May) { sunset + 72min } else { @seasonal }",
            ),
            ZmanDefinition::new("seasonal", "seasonal_solar(8.5, after_sunset)"),
            ZmanDefinition::new("summer_only", "if (season == \"summer\") { sunset }"),
        ])
        .unwrap();

    let response = engine.calculate(&BatchRequest::new(date(), location()));
    assert_eq!(clock(response.value("candle_lighting").unwrap()), (17, 20, 0));
    assert_eq!(clock(response.value("tzais").unwrap()), (18, 34, 0));
    assert_eq!(clock(response.value("seasonal").unwrap()), (18, 34, 0));
    assert_eq!(
        response.value("summer_only").and_then(Value::error).unwrap().kind(),
        ErrorKind::Computation
    );
}
