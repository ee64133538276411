use crate::*;
use std::sync::Arc;

#[test]
fn lifeline_guard() {
    let lifeline = Lifeline::new();
    assert_eq!(lifeline.observers(), 0);
    let guard = lifeline.guard();
    assert_eq!(lifeline.observers(), 1);
    assert!(guard.is_alive());
    drop(lifeline);
    assert!(!guard.is_alive());
}

#[test]
fn arc_guard_follows_last_reference() {
    let owner = Arc::new(String::from("owner"));
    let other = owner.clone();
    let guard = owner.guard();
    drop(owner);
    assert!(guard.is_alive());
    drop(other);
    assert!(!guard.is_alive());
}

#[test]
fn hold_keeps_owner_alive() {
    let owner = Arc::new(7_u32);
    let guard = owner.guard();
    let held = guard.hold();
    assert!(held.is_some());
    drop(owner);
    assert!(guard.is_alive());
    drop(held);
    assert!(!guard.is_alive());
    assert!(guard.hold().is_none());
}

#[test]
fn guard_of_guard_observes_same_owner() {
    let lifeline = Lifeline::new();
    let guard = lifeline.guard();
    let again = guard.guard();
    assert!(again.is_alive());
    drop(lifeline);
    assert!(!again.is_alive());
}

#[test]
fn guard_checked_from_other_thread() {
    let lifeline = Lifeline::new();
    let guard = lifeline.guard();
    let alive = std::thread::spawn(move || guard.is_alive()).join().unwrap();
    assert!(alive);

    let guard = lifeline.guard();
    drop(lifeline);
    let alive = std::thread::spawn(move || guard.is_alive()).join().unwrap();
    assert!(!alive);
}
