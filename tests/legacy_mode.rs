// The hack_arrays flag is process-wide, so it gets its own test binary and
// is flipped before any test runs.

use adata::{ArrayData, Key, Kind, Value};

#[ctor::ctor]
fn enable_hack_arrays() {
    adata::set_hack_arrays(true);
}

#[test]
fn varray_factory_produces_legacy_vecs() {
    let v = ArrayData::create_varray(None, [Value::Int(1)]);
    assert_eq!(v.kind(), Kind::Vec);
    assert!(v.is_legacy());
}

#[test]
fn darray_factory_produces_legacy_dicts() {
    let d = ArrayData::create_darray(None, [(Key::from("k"), Value::Int(1))]);
    assert_eq!(d.kind(), Kind::Dict);
    assert!(d.is_legacy());
}

#[test]
fn empty_legacy_factories_use_marked_singletons() {
    let a = ArrayData::create_varray(None, []);
    let b = ArrayData::create_varray(None, []);
    assert!(a.same(&b));
    assert!(a.is_legacy());
    assert_eq!(a.ref_count(), None);

    let plain = ArrayData::create_vec([]);
    assert!(!a.same(&plain), "marked and unmarked singletons are distinct");
}

#[test]
fn legacy_mark_round_trips() {
    let mut v = ArrayData::create_varray(None, [Value::Int(1)]);
    let alias = v.clone();
    v.set_legacy(false);
    assert!(!v.is_legacy());
    assert!(alias.is_legacy(), "clearing the mark on a shared array copies");
    v.set_legacy(true);
    assert!(v.is_legacy());
}

#[test]
fn equality_distinguishes_the_mark() {
    let marked = ArrayData::create_varray(None, [Value::Int(1)]);
    let plain = ArrayData::create_vec([Value::Int(1)]);
    assert_ne!(marked, plain);
    let mut unmarked = marked.clone();
    unmarked.set_legacy(false);
    assert_eq!(unmarked, plain);
}
