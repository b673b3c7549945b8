//! The keyset layout: an insertion-ordered set of arraykeys, where every
//! element is its own key.

use std::ptr::NonNull;

use hashbrown::HashMap;

use crate::cast::{cast_mut, cast_ref, ArrayRepr};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, Header, Kind};
use crate::sort::{SortBy, SortSpec};
use crate::strdata::StrData;
use crate::value::{Key, Value};

#[repr(C)]
pub(crate) struct KeysetArray {
    hdr: Header,
    elems: Vec<Key>,
    index: HashMap<Key, usize>,
}

unsafe impl ArrayRepr for KeysetArray {
    fn matches(h: &Header) -> bool {
        h.kind() == Kind::Keyset
    }
}

/// Allocates a counted keyset. Duplicate elements keep their first
/// position.
pub(crate) fn alloc(elems: Vec<Key>) -> Ad {
    let mut a = KeysetArray {
        hdr: Header::counted(Kind::Keyset, 0, 0),
        elems: Vec::with_capacity(elems.len()),
        index: HashMap::with_capacity(elems.len()),
    };
    for k in elems {
        if !a.index.contains_key(&k) {
            a.index.insert(k, a.elems.len());
            a.elems.push(k);
        }
    }
    a.hdr.set_size(a.elems.len());
    NonNull::from(Box::leak(Box::new(a))).cast::<Header>()
}

/// Allocates the uncounted empty keyset for the singleton pool.
pub(crate) fn alloc_static() -> Ad {
    let a = KeysetArray {
        hdr: Header::uncounted(Kind::Keyset, 0),
        elems: Vec::new(),
        index: HashMap::new(),
    };
    NonNull::from(Box::leak(Box::new(a))).cast::<Header>()
}

unsafe fn cow(ad: Ad) -> Ad {
    if hdr_ref(ad).rc().has_exactly_one_ref() {
        ad
    } else {
        copy(ad)
    }
}

pub(crate) unsafe fn release(ad: Ad) {
    drop(Box::from_raw(ad.cast::<KeysetArray>().as_ptr()));
}

pub(crate) unsafe fn copy(ad: Ad) -> Ad {
    let src = cast_ref::<KeysetArray>(ad);
    let hdr = Header::counted(Kind::Keyset, src.hdr.aux_bits(), src.hdr.size());
    hdr.copy_extra_from(&src.hdr);
    let a = KeysetArray { hdr, elems: src.elems.clone(), index: src.index.clone() };
    NonNull::from(Box::leak(Box::new(a))).cast::<Header>()
}

pub(crate) unsafe fn heap_size(ad: Ad) -> usize {
    let a = cast_ref::<KeysetArray>(ad);
    std::mem::size_of::<KeysetArray>()
        + a.elems.capacity() * std::mem::size_of::<Key>()
        + a.index.capacity() * std::mem::size_of::<(Key, usize)>()
}

pub(crate) unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value)) {
    for k in &cast_ref::<KeysetArray>(ad).elems {
        f(&k.to_value());
    }
}

unsafe fn get(ad: Ad, key: Key) -> Option<Value> {
    let a = cast_ref::<KeysetArray>(ad);
    a.index.get(&key).map(|_| key.to_value())
}

pub(crate) unsafe fn get_int(ad: Ad, key: i64) -> Option<Value> {
    get(ad, Key::Int(key))
}

pub(crate) unsafe fn get_str(ad: Ad, key: StrData) -> Option<Value> {
    get(ad, Key::Str(key))
}

pub(crate) unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key {
    cast_ref::<KeysetArray>(ad).elems[pos]
}

pub(crate) unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value {
    cast_ref::<KeysetArray>(ad).elems[pos].to_value()
}

unsafe fn reject_set(ad: Ad) -> ArrayError {
    ArrayError::IllegalOperation {
        kind: hdr_ref(ad).kind().name(),
        op: "set a key on",
    }
}

pub(crate) unsafe fn set_int_move(ad: Ad, _key: i64, _v: Value) -> Result<Ad, ArrayError> {
    Err(reject_set(ad))
}

pub(crate) unsafe fn set_str_move(ad: Ad, _key: StrData, _v: Value) -> Result<Ad, ArrayError> {
    Err(reject_set(ad))
}

unsafe fn remove(ad: Ad, key: Key) -> Result<Ad, ArrayError> {
    if !cast_ref::<KeysetArray>(ad).index.contains_key(&key) {
        return Ok(ad);
    }
    let out = cow(ad);
    let a = cast_mut::<KeysetArray>(out);
    let pos = a.index.remove(&key).unwrap();
    a.elems.remove(pos);
    for k in &a.elems[pos..] {
        *a.index.get_mut(k).unwrap() -= 1;
    }
    a.hdr.set_size(a.elems.len());
    Ok(out)
}

pub(crate) unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
    remove(ad, Key::Int(key))
}

pub(crate) unsafe fn remove_str_move(ad: Ad, key: StrData) -> Result<Ad, ArrayError> {
    remove(ad, Key::Str(key))
}

pub(crate) unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
    let key = match v.to_key() {
        Some(k) => k,
        None => {
            return Err(ArrayError::IllegalOperation {
                kind: hdr_ref(ad).kind().name(),
                op: "append a non-arraykey value to",
            })
        }
    };
    if cast_ref::<KeysetArray>(ad).index.contains_key(&key) {
        // Element already present; sets are idempotent, no copy.
        return Ok(ad);
    }
    let out = cow(ad);
    let a = cast_mut::<KeysetArray>(out);
    a.index.insert(key, a.elems.len());
    a.elems.push(key);
    a.hdr.set_size(a.elems.len());
    Ok(out)
}

pub(crate) unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
    if hdr_ref(ad).size() == 0 {
        *out = None;
        return ad;
    }
    let new = cow(ad);
    let a = cast_mut::<KeysetArray>(new);
    let k = a.elems.pop().unwrap();
    a.index.remove(&k);
    a.hdr.set_size(a.elems.len());
    *out = Some(k.to_value());
    new
}

pub(crate) unsafe fn iter_begin(ad: Ad) -> usize {
    if hdr_ref(ad).size() == 0 {
        iter_end(ad)
    } else {
        0
    }
}

pub(crate) unsafe fn iter_last(ad: Ad) -> usize {
    let len = hdr_ref(ad).size();
    if len == 0 {
        iter_end(ad)
    } else {
        len - 1
    }
}

pub(crate) unsafe fn iter_end(ad: Ad) -> usize {
    hdr_ref(ad).size()
}

pub(crate) unsafe fn iter_advance(ad: Ad, pos: usize) -> usize {
    let end = iter_end(ad);
    debug_assert!(pos < end);
    (pos + 1).min(end)
}

pub(crate) unsafe fn iter_rewind(ad: Ad, pos: usize) -> usize {
    if pos == 0 {
        iter_end(ad)
    } else {
        pos - 1
    }
}

pub(crate) unsafe fn is_vector_data(ad: Ad) -> bool {
    cast_ref::<KeysetArray>(ad)
        .elems
        .iter()
        .enumerate()
        .all(|(i, k)| *k == Key::Int(i as i64))
}

pub(crate) unsafe fn escalate_for_sort(ad: Ad, _by: SortBy) -> Ad {
    ad
}

pub(crate) unsafe fn sort(ad: Ad, spec: &mut SortSpec<'_>) {
    debug_assert!(hdr_ref(ad).rc().has_exactly_one_ref());
    let a = cast_mut::<KeysetArray>(ad);
    // Keys are values here, so key and value sorts coincide.
    let mut elems = std::mem::take(&mut a.elems);
    elems.sort_by(|x, y| spec.compare(&(*x, x.to_value()), &(*y, y.to_value())));
    a.index = elems.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    a.elems = elems;
}

pub(crate) unsafe fn set_legacy_move(ad: Ad, legacy: bool) -> Ad {
    if hdr_ref(ad).is_legacy() == legacy {
        return ad;
    }
    let out = cow(ad);
    hdr_ref(out).set_legacy_flag(legacy);
    out
}
