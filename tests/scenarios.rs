use adata::{ArrayData, ArrayError, Key, Kind, Value};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[test]
fn shared_write_copies_and_preserves_aliases() {
    let mut a = ArrayData::create_dict([
        (Key::from("x"), Value::Int(1)),
        (Key::from("y"), Value::Int(2)),
    ]);
    let alias = a.clone();
    assert!(a.same(&alias));

    a.set("x", 10i64).unwrap();
    assert!(!a.same(&alias));
    assert_eq!(a.get("x"), Some(Value::Int(10)));
    assert_eq!(alias.get("x"), Some(Value::Int(1)));

    // The copy is exclusively owned; further writes stay in place.
    let mut b = a.clone();
    drop(a);
    assert_eq!(b.ref_count(), Some(1));
    b.set("y", 20i64).unwrap();
    assert_eq!(b.get("y"), Some(Value::Int(20)));
}

#[test]
fn varray_escalates_on_string_key() {
    let mut v = ArrayData::create_varray(None, [Value::Int(1), Value::Int(2)]);
    assert_eq!(v.kind(), Kind::Packed);

    v.set("name", "test").unwrap();
    assert_eq!(v.kind(), Kind::Mixed, "string keys force the mixed layout");
    assert_eq!(v.len(), 3);
    assert_eq!(v.get(0), Some(Value::Int(1)));
    assert_eq!(v.get(1), Some(Value::Int(2)));
    assert_eq!(v.get("name"), Some(Value::from("test")));

    // Order is preserved across the escalation.
    let keys: Vec<Key> = v.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Key::Int(0), Key::Int(1), Key::from("name")]);
}

#[test]
fn vec_rejects_string_keys_without_escalating() {
    let mut v = ArrayData::create_vec([Value::Int(1)]);
    let err = v.set("oops", 2i64).unwrap_err();
    assert!(matches!(err, ArrayError::InvalidKey { .. }));
    assert_eq!(v.kind(), Kind::Vec);
    assert_eq!(v.len(), 1);
}

#[test]
fn nested_arrays_refcount_through_values() {
    let inner = ArrayData::create_vec([Value::Int(1)]);
    assert_eq!(inner.ref_count(), Some(1));

    let mut outer = ArrayData::create_dict([]);
    outer.set("inner", inner.clone()).unwrap();
    assert_eq!(inner.ref_count(), Some(2));

    let fetched = outer.get("inner").unwrap();
    assert!(fetched.as_arr().unwrap().same(&inner));
    assert_eq!(inner.ref_count(), Some(3), "reads hand out references");
    drop(fetched);

    outer.remove("inner").unwrap();
    assert_eq!(inner.ref_count(), Some(1));
}

#[test]
fn empty_singletons_are_identical_and_immutable() {
    let a = ArrayData::create_vec([]);
    let b = ArrayData::create_vec([]);
    assert!(a.same(&b));
    assert_eq!(a.ref_count(), None);

    // Writing to a singleton copies; the singleton itself never changes.
    let mut c = a.clone();
    c.append(1i64).unwrap();
    assert!(!c.same(&a));
    assert!(a.is_empty());
    assert_eq!(c.len(), 1);
}

#[test]
fn dvarray_range_checks_cover_both_layouts() {
    let va = ArrayData::create_varray(None, [Value::Int(1)]);
    assert!(va.is_varray() && va.is_dvarray() && !va.is_darray());
    let da = va.to_darray();
    assert!(da.is_darray() && da.is_dvarray() && !da.is_varray());
    let v = ArrayData::create_vec([Value::Int(1)]);
    assert!(!v.is_dvarray());
}

#[test]
fn dict_set_remove_iterate() {
    let mut d = ArrayData::create_dict([]);
    d.set("x", 1i64).unwrap();
    d.set("y", 2i64).unwrap();
    d.remove("x").unwrap();
    assert_eq!(d.len(), 1);
    assert!(d.exists("y"));
    assert_eq!(
        d.iter().collect::<Vec<_>>(),
        vec![(Key::from("y"), Value::Int(2))]
    );
}

#[test]
fn coalloc_mark_never_touches_the_shared_singleton() {
    let mut a = ArrayData::create_vec([]);
    let b = ArrayData::create_vec([]);
    assert!(a.same(&b));
    a.set_coalloc_tv(true);
    assert!(!a.same(&b), "marking copies off the immortal singleton");
    assert!(a.has_coalloc_tv());
    assert!(!b.has_coalloc_tv());
    assert_eq!(b.ref_count(), None);

    // Shared counted arrays copy too; the alias never sees the bit.
    let mut c = ArrayData::create_vec([Value::Int(1)]);
    let alias = c.clone();
    c.set_coalloc_tv(true);
    assert!(!c.same(&alias));
    assert!(!alias.has_coalloc_tv());
}

#[test]
fn empty_legacy_marks_swap_between_singletons() {
    let mut a = ArrayData::create_vec([]);
    a.set_legacy(true);
    assert!(a.is_legacy());
    assert_eq!(a.ref_count(), None, "the marked empty is also immortal");
    let mut b = ArrayData::create_vec([]);
    b.set_legacy(true);
    assert!(a.same(&b));
    b.set_legacy(false);
    assert!(b.same(&ArrayData::create_vec([])));

    let mut d = ArrayData::create_dict([]).to_darray();
    d.set_legacy(true);
    assert_eq!(d.ref_count(), None);
    assert!(d.is_legacy() && d.is_darray());
}

#[test]
fn sampled_mark_survives_copies() {
    let mut v = ArrayData::create_vec([Value::Int(1)]);
    assert!(!v.is_sampled());
    v.mark_sampled();
    assert!(v.is_sampled());
    let alias = v.clone();
    v.set(0, 2i64).unwrap();
    assert!(v.is_sampled(), "the copy keeps the mark");
    assert!(alias.is_sampled());
}

#[test]
fn reverse_iteration_skips_removed_entries() {
    let mut d = ArrayData::create_dict([
        (Key::Int(0), Value::Int(1)),
        (Key::from("mid"), Value::Int(2)),
        (Key::Int(1), Value::Int(3)),
    ]);
    d.remove("mid").unwrap();
    let rev: Vec<(Key, Value)> = d.iter_rev().collect();
    assert_eq!(
        rev,
        vec![(Key::Int(1), Value::Int(3)), (Key::Int(0), Value::Int(1))]
    );
    assert_eq!(d.first(), Some((Key::Int(0), Value::Int(1))));
    assert_eq!(d.last(), Some((Key::Int(1), Value::Int(3))));
    assert_eq!(ArrayData::create_dict([]).last(), None);
}

#[test]
fn scan_visits_every_value_and_heap_size_grows() {
    let inner = ArrayData::create_vec([Value::Int(1)]);
    let mut d = ArrayData::create_dict([(Key::from("a"), Value::Int(1))]);
    let small = d.heap_size();
    d.set("inner", inner).unwrap();
    assert!(d.heap_size() >= small);

    let mut seen = 0;
    d.scan(&mut |v| {
        seen += 1;
        if let Some(a) = v.as_arr() {
            a.scan(&mut |_| seen += 1);
        }
    });
    assert_eq!(seen, 3, "two entries plus one nested element");
}

#[test]
fn get_throw_reports_the_missing_key() {
    let d = ArrayData::create_dict([(Key::from("k"), Value::Int(1))]);
    assert_eq!(d.get_throw("k").unwrap(), Value::Int(1));
    let err = d.get_throw("absent").unwrap_err();
    match err {
        ArrayError::MissingKey { key, .. } => assert_eq!(key, Key::from("absent")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn append_follows_the_highest_int_key() {
    let mut d = ArrayData::create_dict([]);
    d.set(5, 50i64).unwrap();
    d.append(60i64).unwrap();
    assert_eq!(d.get(6), Some(Value::Int(60)));
    d.remove(6).unwrap();
    d.append(70i64).unwrap();
    // Removal does not lower the append cursor.
    assert_eq!(d.get(7), Some(Value::Int(70)));
}

#[test]
fn pop_returns_entries_in_reverse_order() {
    let mut d = ArrayData::create_dict([
        (Key::Int(0), Value::Int(1)),
        (Key::from("s"), Value::Int(2)),
    ]);
    assert_eq!(d.pop(), Some(Value::Int(2)));
    assert_eq!(d.pop(), Some(Value::Int(1)));
    assert_eq!(d.pop(), None);
    assert!(d.is_empty());
}

// Random operation sequences against a model map, exercising cow at every
// step through a persistent alias.
#[test]
fn random_ops_match_model() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut arr = ArrayData::create_dict([]);
    let mut model: Vec<(Key, i64)> = Vec::new();

    for step in 0..500 {
        let alias = arr.clone();
        let before: Vec<(Key, Value)> = alias.iter().collect();

        match rng.gen_range(0..4) {
            0 => {
                let k = Key::Int(rng.gen_range(0..20));
                let v = rng.gen_range(0..1000);
                arr.set(k, v).unwrap();
                match model.iter_mut().find(|(mk, _)| *mk == k) {
                    Some(slot) => slot.1 = v,
                    None => model.push((k, v)),
                }
            }
            1 => {
                let k = Key::from(["a", "b", "c", "d"][rng.gen_range(0..4)]);
                let v = rng.gen_range(0..1000);
                arr.set(k, v).unwrap();
                match model.iter_mut().find(|(mk, _)| *mk == k) {
                    Some(slot) => slot.1 = v,
                    None => model.push((k, v)),
                }
            }
            2 => {
                let k = Key::Int(rng.gen_range(0..20));
                arr.remove(k).unwrap();
                model.retain(|(mk, _)| *mk != k);
            }
            _ => {
                if let Some(popped) = arr.pop() {
                    let (_, expect) = model.pop().unwrap();
                    assert_eq!(popped, Value::Int(expect), "step {step}");
                } else {
                    assert!(model.is_empty());
                }
            }
        }

        let got: Vec<(Key, Value)> = arr.iter().collect();
        let want: Vec<(Key, Value)> =
            model.iter().map(|(k, v)| (*k, Value::Int(*v))).collect();
        assert_eq!(got, want, "step {step}");
        // The alias snapshot never moves.
        let after: Vec<(Key, Value)> = alias.iter().collect();
        assert_eq!(before, after, "step {step}");
    }
}
