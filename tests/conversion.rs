use adata::{ArrayData, ArrayError, Key, Kind, SortFlags, SortSpec, Value};

fn sample_dict() -> ArrayData {
    ArrayData::create_dict([
        (Key::from("b"), Value::Int(2)),
        (Key::from("a"), Value::Int(1)),
        (Key::Int(7), Value::Int(3)),
    ])
}

#[test]
fn to_vec_drops_keys_and_keeps_order() {
    let d = sample_dict();
    let v = d.to_vec();
    assert_eq!(v.kind(), Kind::Vec);
    assert_eq!(
        v.iter().collect::<Vec<_>>(),
        vec![
            (Key::Int(0), Value::Int(2)),
            (Key::Int(1), Value::Int(1)),
            (Key::Int(2), Value::Int(3)),
        ]
    );
    // Converting a vec to a vec shares the array.
    assert!(v.to_vec().same(&v));
}

#[test]
fn to_dict_preserves_keys() {
    let v = ArrayData::create_vec([Value::Int(9), Value::Int(8)]);
    let d = v.to_dict();
    assert_eq!(d.kind(), Kind::Dict);
    assert_eq!(d.get(0), Some(Value::Int(9)));
    assert_eq!(d.get(1), Some(Value::Int(8)));
    assert!(d.to_dict().same(&d));

    let back = d.to_vec();
    assert_eq!(back, v);
}

#[test]
fn dvarray_conversions() {
    let d = sample_dict();
    let da = d.to_darray();
    assert_eq!(da.kind(), Kind::Mixed);
    assert_eq!(da.get("b"), Some(Value::Int(2)));

    let va = da.to_varray();
    assert_eq!(va.kind(), Kind::Packed);
    assert_eq!(va.len(), 3);
    assert_eq!(va.get(0), Some(Value::Int(2)));

    let empty = ArrayData::create_dict([]).to_varray();
    assert!(empty.same(&ArrayData::create_dict([]).to_varray()), "empty conversions share the singleton");
}

#[test]
fn in_place_legacy_and_modern_conversions() {
    let mut d = sample_dict();
    d.to_legacy();
    assert_eq!(d.kind(), Kind::Mixed);
    assert!(d.is_darray());
    assert_eq!(d.get("b"), Some(Value::Int(2)));
    let keys: Vec<Key> = d.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Key::from("b"), Key::from("a"), Key::Int(7)]);

    d.to_modern();
    assert_eq!(d.kind(), Kind::Dict);
    assert!(!d.is_legacy());

    // Shared arrays copy first; the alias keeps its kind.
    let mut v = ArrayData::create_vec([Value::Int(1)]);
    let alias = v.clone();
    v.to_legacy();
    assert_eq!(v.kind(), Kind::Packed);
    assert_eq!(alias.kind(), Kind::Vec);
    assert!(!v.same(&alias));

    // Empty conversions land on the singletons.
    let mut e = ArrayData::create_vec([]);
    e.to_legacy();
    assert!(e.same(&ArrayData::create_varray(None, [])));
    e.to_modern();
    assert!(e.same(&ArrayData::create_vec([])));

    // Keysets have no counterpart on either side.
    let mut ks = ArrayData::create_keyset([Key::Int(1)]);
    ks.to_legacy();
    assert_eq!(ks.kind(), Kind::Keyset);
    ks.to_modern();
    assert_eq!(ks.kind(), Kind::Keyset);
}

#[test]
fn legacy_conversion_appends_keep_vector_shape() {
    let mut a = ArrayData::create_vec([]);
    for i in 0..3i64 {
        a.append(i).unwrap();
    }
    a.to_legacy();
    a.to_darray().iter().zip(0..3i64).for_each(|((k, v), i)| {
        assert_eq!(k, Key::Int(i));
        assert_eq!(v, Value::Int(i));
    });
    assert!(a.is_varray());
    assert!(a.is_vector_data());
}

#[test]
fn to_keyset_requires_arraykeys() {
    let ok = ArrayData::create_vec([Value::Int(1), Value::from("x"), Value::Int(1)]);
    let ks = ok.to_keyset().unwrap();
    assert_eq!(ks.kind(), Kind::Keyset);
    assert_eq!(ks.len(), 2, "duplicates collapse");
    assert!(ks.exists(1));
    assert!(ks.exists("x"));
    assert_eq!(ks.get(1), Some(Value::Int(1)), "members are their own keys");

    let bad = ArrayData::create_vec([Value::Dbl(1.5)]);
    assert!(matches!(bad.to_keyset(), Err(ArrayError::IllegalOperation { .. })));
}

#[test]
fn keyset_rejects_set_but_appends_keys() {
    let mut ks = ArrayData::create_keyset([Key::Int(1)]);
    assert!(matches!(ks.set(2, 3i64), Err(ArrayError::IllegalOperation { .. })));
    ks.append("k").unwrap();
    ks.append(1i64).unwrap();
    assert_eq!(ks.len(), 2, "re-adding a member is a no-op");
    assert!(matches!(ks.append(2.5f64), Err(ArrayError::IllegalOperation { .. })));
}

#[test]
fn value_sort_renumbers() {
    let mut d = sample_dict();
    d.sort(&mut SortSpec::by_value(true, SortFlags::Regular));
    assert_eq!(
        d.iter().collect::<Vec<_>>(),
        vec![
            (Key::Int(0), Value::Int(1)),
            (Key::Int(1), Value::Int(2)),
            (Key::Int(2), Value::Int(3)),
        ]
    );
}

#[test]
fn assoc_sort_keeps_keys() {
    let mut d = sample_dict();
    d.sort(&mut SortSpec::assoc_by_value(false, SortFlags::Regular));
    assert_eq!(
        d.iter().collect::<Vec<_>>(),
        vec![
            (Key::Int(7), Value::Int(3)),
            (Key::from("b"), Value::Int(2)),
            (Key::from("a"), Value::Int(1)),
        ]
    );
}

#[test]
fn key_sort_orders_ints_before_strings() {
    let mut d = sample_dict();
    d.sort(&mut SortSpec::by_key(true, SortFlags::Regular));
    let keys: Vec<Key> = d.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Key::Int(7), Key::from("a"), Key::from("b")]);
}

#[test]
fn user_sort_on_values() {
    let mut v = ArrayData::create_vec([Value::Int(3), Value::Int(1), Value::Int(2)]);
    let mut desc = |a: &Value, b: &Value| b.as_int().cmp(&a.as_int());
    v.sort(&mut SortSpec::user_by_value(&mut desc));
    assert_eq!(
        v.iter().map(|(_, v)| v).collect::<Vec<_>>(),
        vec![Value::Int(3), Value::Int(2), Value::Int(1)]
    );
    assert_eq!(v.kind(), Kind::Vec, "vec sorts without escalating");
}

#[test]
fn user_key_sort_keeps_associations() {
    let mut d = sample_dict();
    // Reverse of the builtin cross-type key order.
    let mut cmp = |a: &Value, b: &Value| match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => b
            .as_str()
            .unwrap()
            .as_str()
            .cmp(a.as_str().unwrap().as_str()),
    };
    d.sort(&mut SortSpec::user_by_key(&mut cmp));
    let keys: Vec<Key> = d.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Key::from("b"), Key::from("a"), Key::Int(7)]);
    assert_eq!(d.get("b"), Some(Value::Int(2)), "values follow their keys");
}

#[test]
fn user_assoc_sort_keeps_keys() {
    let mut d = sample_dict();
    let mut desc = |a: &Value, b: &Value| b.as_int().cmp(&a.as_int());
    d.sort(&mut SortSpec::user_assoc_by_value(&mut desc));
    assert_eq!(
        d.iter().collect::<Vec<_>>(),
        vec![
            (Key::Int(7), Value::Int(3)),
            (Key::from("b"), Value::Int(2)),
            (Key::from("a"), Value::Int(1)),
        ]
    );
}

#[test]
fn sorting_a_shared_array_copies_first() {
    let mut a = ArrayData::create_vec([Value::Int(2), Value::Int(1)]);
    let alias = a.clone();
    a.sort(&mut SortSpec::by_value(true, SortFlags::Regular));
    assert!(!a.same(&alias));
    assert_eq!(alias.get(0), Some(Value::Int(2)), "alias keeps the old order");
    assert_eq!(a.get(0), Some(Value::Int(1)));
}

#[test]
fn numeric_string_sort_flags() {
    let mut v = ArrayData::create_vec([Value::from("10"), Value::from("9")]);
    let mut a = v.clone();
    a.sort(&mut SortSpec::by_value(true, SortFlags::Numeric));
    assert_eq!(a.get(0), Some(Value::from("9")));
    v.sort(&mut SortSpec::by_value(true, SortFlags::String));
    assert_eq!(v.get(0), Some(Value::from("10")));
}

#[test]
fn is_vector_data_tracks_key_shape() {
    let v = ArrayData::create_vec([Value::Int(1)]);
    assert!(v.is_vector_data());
    let mut d = ArrayData::create_dict([(Key::Int(0), Value::Int(1))]);
    assert!(d.is_vector_data());
    d.set("k", 2i64).unwrap();
    assert!(!d.is_vector_data());
}

#[test]
fn str_key_table_proves_absence() {
    let mut d = ArrayData::create_dict([
        (Key::from("present"), Value::Int(1)),
        (Key::Int(3), Value::Int(2)),
    ]);
    assert!(d.install_str_key_table());
    assert!(d.has_str_key_table());
    assert!(d.exists("present"));
    assert!(!d.exists("absent"));

    // Copies never inherit the side table.
    let alias = d.clone();
    d.set("fresh", 9i64).unwrap();
    assert!(alias.has_str_key_table());
    assert!(!d.has_str_key_table());
    assert!(d.exists("fresh"));

    let mut v = ArrayData::create_vec([]);
    assert!(!v.install_str_key_table(), "only mixed-backed arrays have one");
}
