// These tests run in their own binary: nothing here seals the layout
// hierarchy, so the pre-seal behavior stays observable.

use adata::{LayoutIndex, TOP};

#[test]
fn top_join_top_is_always_allowed() {
    assert_eq!(TOP.join(TOP), TOP);
    assert_eq!(TOP.meet(TOP), Some(TOP));
    assert!(TOP.is_sub_of(TOP));
}

#[test]
#[should_panic(expected = "not sealed")]
fn join_before_seal_panics() {
    let _ = LayoutIndex::new(0x0d01).join(TOP);
}

#[test]
#[should_panic(expected = "not sealed")]
fn meet_before_seal_panics() {
    let _ = TOP.meet(LayoutIndex::new(0x0d01));
}

#[test]
#[should_panic(expected = "not sealed")]
fn sub_query_before_seal_panics() {
    let _ = LayoutIndex::new(0x0c00).is_sub_of(TOP);
}
