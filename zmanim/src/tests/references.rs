use super::{equinox, hm, registry, twelve_hour_day, utc_location};
use crate::evaluator::{evaluate, Evaluator, ExecutionContext, VisitState};
use crate::{ErrorKind, ResourceLimits, Value, ZmanimError};
use chrono::Duration;

fn chain_of(value: &Value) -> Vec<String> {
    match value {
        Value::Error(ZmanimError::Cycle { chain }) => chain.clone(),
        other => panic!("expected a cycle error, got {:?}", other),
    }
}

#[test]
fn test_reference_to_another_zman() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("alos", "sunrise - 72min"),
        ("misheyakir", "@alos + 6min"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    assert_eq!(hm(&evaluate("misheyakir", &context)), "04:54:00");
}

#[test]
fn test_reference_to_a_duration() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("shaah", "shaah_zmanis(gra)"),
        ("plag", "sunset - @shaah * 1.25"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    assert_eq!(hm(&evaluate("plag", &context)), "16:45:00");
    assert_eq!(
        evaluate("shaah", &context),
        Value::Duration(Duration::minutes(60))
    );
}

#[test]
fn test_direct_self_reference_is_a_cycle() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("a", "@a + 5min")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let value = evaluate("a", &context);
    assert_eq!(chain_of(&value), vec!["a", "a"]);
    assert_eq!(value.to_string(), "Cycle error: a -> a");
}

#[test]
fn test_two_step_cycle_marks_every_member() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("a", "@b + 5min"),
        ("b", "@a - 5min"),
        ("c", "sunrise"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    assert_eq!(chain_of(&evaluate("a", &context)), vec!["a", "b", "a"]);
    assert_eq!(
        evaluate("b", &context).error().map(|e| e.kind()),
        Some(ErrorKind::Cycle)
    );
    assert_eq!(hm(&evaluate("c", &context)), "06:00:00");
}

#[test]
fn test_cycle_reported_from_the_entry_key() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("a", "@b + 5min"), ("b", "@a - 5min")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    assert_eq!(chain_of(&evaluate("b", &context)), vec!["b", "a", "b"]);
}

#[test]
fn test_cycle_through_custom_boundaries() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("start", "proportional_hours(1, custom(sunrise, @end))"),
        ("end", "@start + 10hr"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    assert_eq!(chain_of(&evaluate("start", &context)), vec!["start", "end", "start"]);
}

#[test]
fn test_dependent_of_a_cycle_reports_the_cycle() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("a", "@b"),
        ("b", "@a"),
        ("uses_a", "@a + 1hr"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);
    assert_eq!(chain_of(&evaluate("uses_a", &context)), vec!["a", "b", "a"]);
}

#[test]
fn test_missing_reference() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("tzais", "@shkia + 18min")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let value = evaluate("tzais", &context);
    assert_eq!(
        value.error(),
        Some(&ZmanimError::Reference {
            key: "shkia".to_string()
        })
    );
    assert_eq!(
        evaluate("shkia", &context).to_string(),
        "Reference error: unknown zman '@shkia'"
    );
}

#[test]
fn test_memo_is_write_once() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("a", "sunrise")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let first = evaluate("a", &context);
    let stored = context.memoize("a", Value::Duration(Duration::zero()));
    assert_eq!(stored, first);
    assert_eq!(context.memoized("a"), Some(first));
}

#[test]
fn test_visit_states() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("a", "sunrise")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let mut evaluator = Evaluator::new(&context);
    assert_eq!(evaluator.visit_state("a"), VisitState::Unvisited);
    let value = evaluator.evaluate_key("a");
    assert_eq!(evaluator.visit_state("a"), VisitState::Done(value));
}

#[test]
fn test_reference_depth_limit() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("k0", "@k1"),
        ("k1", "@k2"),
        ("k2", "@k3"),
        ("k3", "@k4"),
        ("k4", "sunrise"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider)
        .with_limits(ResourceLimits::default().with_max_reference_depth(3));

    let value = evaluate("k0", &context);
    assert_eq!(
        value.error().map(|e| e.kind()),
        Some(ErrorKind::ResourceLimitExceeded)
    );

    // a fresh entry point deeper in the chain stays within the limit
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider)
        .with_limits(ResourceLimits::default().with_max_reference_depth(3));
    assert_eq!(hm(&evaluate("k2", &context)), "06:00:00");
}

#[test]
fn test_evaluation_time_limit() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[("a", "sunrise")]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider)
        .with_limits(ResourceLimits::default().with_max_evaluation_time_ms(0));

    std::thread::sleep(std::time::Duration::from_millis(5));
    let value = evaluate("a", &context);
    assert!(matches!(
        value.error(),
        Some(ZmanimError::ResourceLimitExceeded { limit_name, .. }) if limit_name == "max_evaluation_time_ms"
    ));
}

#[test]
fn test_context_is_shared_across_threads() {
    let provider = twelve_hour_day();
    let zmanim = registry(&[
        ("alos", "sunrise - 72min"),
        ("sof_zman_shema", "proportional_hours(3, custom(@alos, @tzais))"),
        ("tzais", "sunset + 72min"),
        ("chatzos", "midpoint(@alos, @tzais)"),
    ]);
    let context = ExecutionContext::new(equinox(), utc_location(), &zmanim, &provider);

    let values: Vec<Value> = std::thread::scope(|scope| {
        let handles: Vec<_> = ["sof_zman_shema", "chatzos", "alos"]
            .into_iter()
            .map(|key| {
                let context = &context;
                scope.spawn(move || evaluate(key, context))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(hm(&values[0]), "08:24:00");
    assert_eq!(hm(&values[1]), "12:00:00");
    assert_eq!(hm(&values[2]), "04:48:00");
}
