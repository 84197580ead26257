use super::{equinox, hm, registry, twelve_hour_day, utc_location};
use crate::astronomy::FixedProvider;
use crate::evaluator::{evaluate, evaluate_formula, ExecutionContext};
use crate::{AstronomicalProvider, ErrorKind, Location, Value};
use chrono::{Duration, FixedOffset, NaiveDate};

fn eval_with(provider: &dyn AstronomicalProvider, entries: &[(&str, &str)], key: &str) -> Value {
    let zmanim = registry(entries);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, provider);
    evaluate(key, &context)
}

fn eval(formula: &str) -> Value {
    eval_with(&twelve_hour_day(), &[("z", formula)], "z")
}

#[test]
fn test_alos_72_fixed_minutes() {
    assert_eq!(hm(&eval("sunrise - 72min")), "04:48:00");
}

#[test]
fn test_sof_zman_shema_gra() {
    assert_eq!(hm(&eval("proportional_hours(3, gra)")), "09:00:00");
}

#[test]
fn test_sof_zman_shema_mga() {
    // 04:48 to 19:12 is 14.4 hours; a quarter of it is 3h36m
    assert_eq!(hm(&eval("proportional_hours(3, mga)")), "08:24:00");
}

#[test]
fn test_mincha_gedola_fractional_hours() {
    assert_eq!(hm(&eval("proportional_hours(6.5, gra)")), "12:30:00");
}

#[test]
fn test_shaah_zmanis() {
    assert_eq!(eval("shaah_zmanis(gra)"), Value::Duration(Duration::minutes(60)));
    assert_eq!(eval("shaah_zmanis(mga_72)"), Value::Duration(Duration::minutes(72)));
    assert_eq!(
        eval("shaah_zmanis(ateret_torah)"),
        Value::Duration(Duration::minutes(760) / 12)
    );
}

#[test]
fn test_solar_depression_with_linear_provider() {
    assert_eq!(hm(&eval("solar(16.1, before_sunrise)")), "04:55:36");
    assert_eq!(hm(&eval("solar(8.5, after_sunset)")), "18:34:00");
}

#[test]
fn test_twilight_primitives() {
    assert_eq!(hm(&eval("civil_dawn")), "05:36:00");
    assert_eq!(hm(&eval("nautical_dusk")), "18:48:00");
    assert_eq!(hm(&eval("astronomical_dawn")), "04:48:00");
}

#[test]
fn test_noon_midnight_and_midpoint() {
    assert_eq!(hm(&eval("solar_noon")), "12:00:00");
    assert_eq!(hm(&eval("midpoint(sunrise, sunset)")), "12:00:00");
    let midnight = eval("solar_midnight").as_time().unwrap();
    assert_eq!(midnight.format("%Y-%m-%d %H:%M").to_string(), "2024-03-20 00:00");
}

#[test]
fn test_clock_time_arithmetic() {
    assert_eq!(hm(&eval("18:30 + 1.5hr")), "20:00:00");
    assert_eq!(hm(&eval("18:30 - 2 * 15min")), "18:00:00");
}

#[test]
fn test_duration_results() {
    assert_eq!(eval("(sunset - sunrise) / 3"), Value::Duration(Duration::hours(4)));
    assert_eq!(eval("sunset - sunrise"), Value::Duration(Duration::hours(12)));
}

#[test]
fn test_proportional_minutes_on_a_twelve_hour_day() {
    // a 720 minute day: zmaniyos minutes equal clock minutes
    assert_eq!(hm(&eval("proportional_minutes(72, after_sunset)")), "19:12:00");
    assert_eq!(hm(&eval("proportional_minutes(90, before_sunrise)")), "04:30:00");
    assert_eq!(eval("shaah_zmanis(mga_72_zmanis)"), Value::Duration(Duration::minutes(72)));
}

#[test]
fn test_proportional_minutes_on_a_long_day() {
    let provider = FixedProvider::new(
        chrono::NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
        chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
    );
    let value = eval_with(&provider, &[("tzais", "proportional_minutes(72, after_sunset)")], "tzais");
    assert_eq!(hm(&value), "21:30:00");
}

#[test]
fn test_custom_base_from_references() {
    let value = eval_with(
        &twelve_hour_day(),
        &[
            ("alos", "sunrise - 72min"),
            ("tzais", "sunset + 72min"),
            ("tefila", "proportional_hours(4, custom(@alos, @tzais))"),
        ],
        "tefila",
    );
    assert_eq!(hm(&value), "09:36:00");
}

#[test]
fn test_computed_domain_is_checked_at_runtime() {
    let value = eval("solar(50 * 2, after_sunset)");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Validation));
}

#[test]
fn test_computed_division_by_zero() {
    let value = eval("shaah_zmanis(gra) / (2 - 2)");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Computation));
}

#[test]
fn test_huge_durations_are_computation_errors() {
    let value = eval("sunrise + 30min * 79228162514264337593543950335");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Computation));

    let provider = twelve_hour_day();
    let zmanim = registry(&[]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    let value = evaluate_formula("sunrise + 999999999999999999999999999min", &context);
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Computation));

    let value = eval("sunrise + 99999999999999999999999999days");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Computation));
}

#[test]
fn test_custom_day_must_end_after_it_starts() {
    let value = eval("proportional_hours(3, custom(sunset, sunrise))");
    let error = value.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::Computation);
    assert!(error.to_string().contains("invalid day duration"));

    let value = eval("shaah_zmanis(custom(sunrise, sunrise))");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Computation));
}

#[test]
fn test_provider_failure_is_a_computation_error() {
    let value = eval_with(&FixedProvider::polar_night(), &[("z", "sunrise - 72min")], "z");
    let error = value.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::Computation);
    assert!(error.to_string().contains("sunrise does not occur"));
}

#[test]
fn test_parse_errors_are_values() {
    let value = eval("sunrise -");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Parse));
}

#[test]
fn test_results_use_location_offset() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("alos", "sunrise - 72min")]);
    let location = Location::new(40.0828, -74.2094, FixedOffset::west_opt(5 * 3600).unwrap());
    let context = ExecutionContext::new(equinox(), location, &zmanim, &provider);

    let alos = evaluate("alos", &context).as_time().unwrap();
    assert_eq!(alos.offset().local_minus_utc(), -5 * 3600);
    assert_eq!(alos.format("%H:%M").to_string(), "04:48");
}

#[test]
fn test_ad_hoc_formula_resolves_references() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("alos", "sunrise - 72min")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let value = evaluate_formula("midpoint(@alos, sunrise)", &context);
    assert_eq!(hm(&value), "05:24:00");
}

#[test]
fn test_molad_tishrei_5784() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("molad", "molad")]);
    let jerusalem_mean_time = FixedOffset::east_opt(8456).unwrap();
    let location = Location::new(31.778, 35.235, jerusalem_mean_time);
    let date = NaiveDate::from_ymd_opt(2023, 9, 15).unwrap();
    let context = ExecutionContext::new(date, location, &zmanim, &provider);

    let molad = evaluate("molad", &context).as_time().unwrap();
    assert_eq!(molad.format("%Y-%m-%d %H:%M").to_string(), "2023-09-15 05:49");
}

#[test]
fn test_conditions_on_location_and_date() {
    // utc_location() is at 31.778°N; equinox() is 20 March 2024, day 80
    assert_eq!(hm(&eval("if (latitude > 30) { sunrise } else { sunset }")), "06:00:00");
    assert_eq!(hm(&eval("if (latitude > 40) { sunrise } else { sunset }")), "18:00:00");
    assert_eq!(hm(&eval("if (month == 3 && day == 20) { 07:00 } else { 08:00 }")), "07:00:00");
    assert_eq!(hm(&eval("if (day_of_year == 80) { 07:00 } else { 08:00 }")), "07:00:00");
    assert_eq!(hm(&eval("if (date == 20-Mar) { 07:00 } else { 08:00 }")), "07:00:00");
    assert_eq!(hm(&eval("if (date > 21-Mar) { 07:00 } else { 08:00 }")), "08:00:00");
    assert_eq!(hm(&eval("if (season == \"spring\") { 07:00 } else { 08:00 }")), "07:00:00");
    assert_eq!(hm(&eval("if (day_length >= 12hr) { sunrise } else { sunset }")), "06:00:00");
    assert_eq!(hm(&eval("if (!(elevation > 0)) { sunrise } else { sunset }")), "06:00:00");
}

#[test]
fn test_else_if_chain_takes_first_true_branch() {
    let formula = "if (month < 3) { 05:00 } else if (month < 6) { 06:00 } else { 07:00 }";
    assert_eq!(hm(&eval(formula)), "06:00:00");
}

#[test]
fn test_conditions_short_circuit() {
    // the right-hand side would be a reference error if it were evaluated
    let value = eval("if (month == 3 || @missing > sunrise) { sunrise }");
    assert_eq!(hm(&value), "06:00:00");

    let value = eval("if (month == 4 && @missing > sunrise) { sunrise } else { sunset }");
    assert_eq!(hm(&value), "18:00:00");

    let value = eval("if (month == 4 || @missing > sunrise) { sunrise } else { sunset }");
    assert_eq!(value.error().map(|e| e.kind()), Some(ErrorKind::Reference));
}

#[test]
fn test_conditional_without_else_fails_when_false() {
    let value = eval("if (latitude > 60) { sunrise }");
    let error = value.error().unwrap();
    assert_eq!(error.kind(), ErrorKind::Computation);
    assert!(error.to_string().contains("no else branch"));
}

#[test]
fn test_leap_day_literal_outside_leap_years() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("z", "if (date == 29-Feb) { sunrise } else { sunset }")]);

    let non_leap = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    let context = ExecutionContext::new(non_leap, utc_location(), &zmanim, &provider);
    let error = evaluate("z", &context).error().cloned().unwrap();
    assert_eq!(error.kind(), ErrorKind::Computation);
    assert!(error.to_string().contains("does not exist"));

    let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let context = ExecutionContext::new(leap, utc_location(), &zmanim, &provider);
    assert_eq!(hm(&evaluate("z", &context)), "06:00:00");
}

#[test]
fn test_seasons_flip_south_of_the_equator() {
    use crate::semantic::Season;

    assert_eq!(Season::of(1, 31.8), Season::Winter);
    assert_eq!(Season::of(7, 31.8), Season::Summer);
    assert_eq!(Season::of(1, -33.9), Season::Summer);
    assert_eq!(Season::of(4, -33.9), Season::Autumn);
}

#[test]
fn test_seasonal_solar_matches_solar_when_days_do_not_change() {
    assert_eq!(hm(&eval("seasonal_solar(16.1, before_sunrise)")), "04:55:36");
    assert_eq!(hm(&eval("seasonal_solar(8.5, after_sunset)")), "18:34:00");
}

#[test]
fn test_seasonal_solar_scales_with_day_length() {
    use crate::astronomy::ProviderResult;
    use crate::semantic::SolarSide;
    use chrono::NaiveTime;

    /// 12-hour days on the March equinox, 15-hour days (05:00 to 20:00) otherwise
    struct Seasons {
        equinox: FixedProvider,
        summer: FixedProvider,
    }

    impl Seasons {
        fn on(&self, date: NaiveDate) -> &FixedProvider {
            if date == equinox() {
                &self.equinox
            } else {
                &self.summer
            }
        }
    }

    impl AstronomicalProvider for Seasons {
        fn sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.on(date).sunrise(date, location)
        }
        fn sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.on(date).sunset(date, location)
        }
        fn solar_noon(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.on(date).solar_noon(date, location)
        }
        fn solar_angle_crossing(
            &self,
            date: NaiveDate,
            location: &Location,
            degrees: f64,
            side: SolarSide,
        ) -> ProviderResult {
            self.on(date).solar_angle_crossing(date, location, degrees, side)
        }
    }

    let provider = Seasons {
        equinox: twelve_hour_day(),
        summer: FixedProvider::new(
            NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        ),
    };
    let zmanim = registry(&[
        ("alos", "seasonal_solar(15, before_sunrise)"),
        ("tzais", "seasonal_solar(7.5, after_sunset)"),
        ("alos_fixed", "solar(15, before_sunrise)"),
    ]);
    let summer = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
    let context = ExecutionContext::new(summer, utc_location(), &zmanim, &provider);

    // 60 minutes at the equinox, stretched by 15/12
    assert_eq!(hm(&evaluate("alos", &context)), "03:45:00");
    // 30 minutes at the equinox, stretched by 15/12
    assert_eq!(hm(&evaluate("tzais", &context)), "20:37:30");
    assert_eq!(hm(&evaluate("alos_fixed", &context)), "04:00:00");
}

#[test]
fn test_provider_queries_are_cached_per_run() {
    use crate::astronomy::ProviderResult;
    use crate::semantic::SolarSide;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: FixedProvider,
        calls: AtomicUsize,
    }

    impl AstronomicalProvider for Counting {
        fn sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sunrise(date, location)
        }
        fn sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.inner.sunset(date, location)
        }
        fn solar_noon(&self, date: NaiveDate, location: &Location) -> ProviderResult {
            self.inner.solar_noon(date, location)
        }
        fn solar_angle_crossing(
            &self,
            date: NaiveDate,
            location: &Location,
            degrees: f64,
            side: SolarSide,
        ) -> ProviderResult {
            self.inner.solar_angle_crossing(date, location, degrees, side)
        }
    }

    let provider = Counting {
        inner: twelve_hour_day(),
        calls: AtomicUsize::new(0),
    };
    let zmanim = registry(&[
        ("a", "sunrise - 72min"),
        ("b", "sunrise + 30min"),
        ("c", "proportional_hours(3, gra)"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    for key in ["a", "b", "c"] {
        assert!(!evaluate(key, &context).is_error());
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
