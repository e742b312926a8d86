//! Tests for Registry
//!
//! These tests verify:
//! - Registration rules (unique names, at least one accessor)
//! - Exact, case-sensitive lookup filtered by verb
//! - Adapter bindings (value, setting, action)

use regatron_bridge::protocol::{Verb, ACK};
use regatron_bridge::{Binding, BridgeError, Registry};

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Default)]
struct Scratch {
    value: f64,
    actions: usize,
}

fn sample_registry() -> Registry<Scratch> {
    let mut builder = Registry::builder();
    builder
        .register(Binding::setting(
            "value",
            |s: &mut Scratch| Ok(s.value),
            |s: &mut Scratch, v| {
                s.value = v;
                Ok(())
            },
        ))
        .unwrap()
        .register(Binding::reader("label", |_: &mut Scratch| Ok("scratch".to_string())))
        .unwrap()
        .register(Binding::action("poke", |s: &mut Scratch, _| {
            s.actions += 1;
            Ok(())
        }))
        .unwrap();
    builder.build()
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_preserves_order() {
    let registry = sample_registry();
    let names: Vec<&str> = registry.iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["value", "label", "poke"]);
    assert_eq!(registry.len(), 3);
    assert!(!registry.is_empty());
}

#[test]
fn test_register_duplicate_fails() {
    let mut builder = Registry::<Scratch>::builder();
    builder
        .register(Binding::reader("label", |_: &mut Scratch| Ok(String::new())))
        .unwrap();

    let result = builder.register(Binding::reader("label", |_: &mut Scratch| Ok(String::new())));
    assert!(matches!(result, Err(BridgeError::Registry(_))));
}

#[test]
fn test_register_without_accessors_fails() {
    let mut builder = Registry::<Scratch>::builder();
    let result = builder.register(Binding::new("nothing", None, None));
    assert!(matches!(result, Err(BridgeError::Registry(_))));
}

#[test]
fn test_register_invalid_names_fail() {
    let mut builder = Registry::<Scratch>::builder();
    for name in ["", "two words", "tab\tname"] {
        let result = builder.register(Binding::reader(name, |_: &mut Scratch| Ok(String::new())));
        assert!(matches!(result, Err(BridgeError::Registry(_))), "accepted {:?}", name);
    }
    assert!(builder.build().is_empty());
}

#[test]
fn test_register_all_stops_at_first_failure() {
    let mut builder = Registry::<Scratch>::builder();
    let result = builder.register_all(vec![
        Binding::reader("a", |_: &mut Scratch| Ok(String::new())),
        Binding::reader("a", |_: &mut Scratch| Ok(String::new())),
        Binding::reader("b", |_: &mut Scratch| Ok(String::new())),
    ]);
    assert!(result.is_err());

    let registry = builder.build();
    assert!(registry.contains("a"));
    assert!(!registry.contains("b"));
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_lookup_is_exact_and_case_sensitive() {
    let registry = sample_registry();
    assert!(registry.lookup(Verb::Get, "value").is_some());
    assert!(registry.lookup(Verb::Get, "Value").is_none());
    assert!(registry.lookup(Verb::Get, "val").is_none());
    assert!(registry.lookup(Verb::Get, "values").is_none());
}

#[test]
fn test_lookup_filters_by_verb() {
    let registry = sample_registry();

    assert!(registry.lookup(Verb::Get, "label").is_some());
    assert!(registry.lookup(Verb::Set, "label").is_none());

    assert!(registry.lookup(Verb::Set, "poke").is_some());
    assert!(registry.lookup(Verb::Get, "poke").is_none());

    assert!(registry.get("poke").is_some());
}

// =============================================================================
// Binding Tests
// =============================================================================

#[test]
fn test_setting_round_trip() {
    let registry = sample_registry();
    let binding = registry.get("value").unwrap();
    let mut scratch = Scratch::default();

    assert_eq!(binding.write(&mut scratch, 12.5).unwrap(), ACK);
    assert_eq!(binding.read(&mut scratch).unwrap(), "12.5");
}

#[test]
fn test_action_receives_calls() {
    let registry = sample_registry();
    let binding = registry.get("poke").unwrap();
    let mut scratch = Scratch::default();

    binding.write(&mut scratch, 0.0).unwrap();
    binding.write(&mut scratch, 1.0).unwrap();
    assert_eq!(scratch.actions, 2);
}

#[test]
fn test_missing_accessor_is_runtime_fault() {
    let registry = sample_registry();
    let mut scratch = Scratch::default();

    let read = registry.get("poke").unwrap().read(&mut scratch);
    assert!(matches!(read, Err(BridgeError::Runtime(_))));

    let write = registry.get("label").unwrap().write(&mut scratch, 1.0);
    assert!(matches!(write, Err(BridgeError::Runtime(_))));
}

#[test]
fn test_binding_capabilities() {
    let registry = sample_registry();
    let value = registry.get("value").unwrap();
    assert!(value.can_read() && value.can_write());
    assert!(value.supports(Verb::Get));
    assert!(value.supports(Verb::Set));

    let label = registry.get("label").unwrap();
    assert!(label.can_read());
    assert!(!label.can_write());
}
