//! The packed layout: values stored densely at integer keys `0..size`.
//!
//! Backs the varray and vec kinds. The two kinds share storage and differ
//! only in edge-case behavior: a varray escalates to the mixed layout when
//! an operation leaves the packed domain, while a vec reports an error.

use std::ptr::NonNull;

use crate::cast::{cast_mut, cast_ref, ArrayRepr};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, Header, Kind};
use crate::sort::{SortBy, SortSpec};
use crate::strdata::StrData;
use crate::value::{Key, Value};
use crate::vanilla::mixed;

#[repr(C)]
pub(crate) struct PackedArray {
    hdr: Header,
    elems: Vec<Value>,
}

unsafe impl ArrayRepr for PackedArray {
    fn matches(h: &Header) -> bool {
        matches!(h.kind(), Kind::Packed | Kind::Vec)
    }
}

/// Allocates a counted packed array. `kind` must be varray or vec.
pub(crate) fn alloc(kind: Kind, legacy: bool, elems: Vec<Value>) -> Ad {
    debug_assert!(matches!(kind, Kind::Packed | Kind::Vec));
    let aux = if legacy { crate::header::F_LEGACY } else { 0 };
    let hdr = Header::counted(kind, aux, elems.len());
    let b = Box::new(PackedArray { hdr, elems });
    NonNull::from(Box::leak(b)).cast::<Header>()
}

/// Allocates an uncounted empty packed array for the singleton pool.
pub(crate) fn alloc_static(kind: Kind, legacy: bool) -> Ad {
    debug_assert!(matches!(kind, Kind::Packed | Kind::Vec));
    let hdr = Header::uncounted(kind, if legacy { crate::header::F_LEGACY } else { 0 });
    let b = Box::new(PackedArray { hdr, elems: Vec::new() });
    NonNull::from(Box::leak(b)).cast::<Header>()
}

unsafe fn cow(ad: Ad) -> Ad {
    if hdr_ref(ad).rc().has_exactly_one_ref() {
        ad
    } else {
        copy(ad)
    }
}

pub(crate) unsafe fn release(ad: Ad) {
    drop(Box::from_raw(ad.cast::<PackedArray>().as_ptr()));
}

pub(crate) unsafe fn copy(ad: Ad) -> Ad {
    let src = cast_ref::<PackedArray>(ad);
    let hdr = Header::counted(src.hdr.kind(), src.hdr.aux_bits(), src.hdr.size());
    hdr.copy_extra_from(&src.hdr);
    let b = Box::new(PackedArray { hdr, elems: src.elems.clone() });
    NonNull::from(Box::leak(b)).cast::<Header>()
}

pub(crate) unsafe fn heap_size(ad: Ad) -> usize {
    let a = cast_ref::<PackedArray>(ad);
    std::mem::size_of::<PackedArray>() + a.elems.capacity() * std::mem::size_of::<Value>()
}

pub(crate) unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value)) {
    for v in &cast_ref::<PackedArray>(ad).elems {
        f(v);
    }
}

pub(crate) unsafe fn get_int(ad: Ad, key: i64) -> Option<Value> {
    let a = cast_ref::<PackedArray>(ad);
    if key < 0 || key as usize >= a.elems.len() {
        return None;
    }
    Some(a.elems[key as usize].clone())
}

pub(crate) unsafe fn get_str(_ad: Ad, _key: StrData) -> Option<Value> {
    None
}

pub(crate) unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key {
    debug_assert!(pos < cast_ref::<PackedArray>(ad).elems.len());
    Key::Int(pos as i64)
}

pub(crate) unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value {
    cast_ref::<PackedArray>(ad).elems[pos].clone()
}

pub(crate) unsafe fn set_int_move(ad: Ad, key: i64, v: Value) -> Result<Ad, ArrayError> {
    let h = hdr_ref(ad);
    let len = h.size();
    if key >= 0 && (key as usize) < len {
        let out = cow(ad);
        let a = cast_mut::<PackedArray>(out);
        a.elems[key as usize] = v;
        return Ok(out);
    }
    if h.kind() == Kind::Vec {
        // Vecs only update existing indices; appends go through append.
        return Err(ArrayError::OutOfBounds { kind: h.kind().name(), index: key, size: len });
    }
    if key >= 0 && key as usize == len {
        // Setting one past the end of a varray is an append and stays
        // packed.
        let out = cow(ad);
        let a = cast_mut::<PackedArray>(out);
        a.elems.push(v);
        a.hdr.set_size(a.elems.len());
        return Ok(out);
    }
    let out = to_mixed(ad, "set");
    mixed::set_int_move(out, key, v)
}

pub(crate) unsafe fn set_str_move(ad: Ad, key: StrData, v: Value) -> Result<Ad, ArrayError> {
    let h = hdr_ref(ad);
    if h.kind() == Kind::Vec {
        return Err(ArrayError::InvalidKey {
            kind: h.kind().name(),
            op: "set",
            key: Key::Str(key),
        });
    }
    let out = to_mixed(ad, "set");
    mixed::set_str_move(out, key, v)
}

pub(crate) unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
    let h = hdr_ref(ad);
    let len = h.size();
    if key < 0 || key as usize >= len {
        // Removing an absent key leaves the array untouched, no copy.
        return Ok(ad);
    }
    if key as usize != len - 1 {
        return Err(ArrayError::IllegalOperation {
            kind: h.kind().name(),
            op: "remove a non-final index from",
        });
    }
    let out = cow(ad);
    let a = cast_mut::<PackedArray>(out);
    a.elems.pop();
    a.hdr.set_size(a.elems.len());
    Ok(out)
}

pub(crate) unsafe fn remove_str_move(ad: Ad, _key: StrData) -> Result<Ad, ArrayError> {
    // A packed array holds no string keys, so this is always a no-op.
    Ok(ad)
}

pub(crate) unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
    let out = cow(ad);
    let a = cast_mut::<PackedArray>(out);
    a.elems.push(v);
    a.hdr.set_size(a.elems.len());
    Ok(out)
}

pub(crate) unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
    if hdr_ref(ad).size() == 0 {
        *out = None;
        return ad;
    }
    let new = cow(ad);
    let a = cast_mut::<PackedArray>(new);
    *out = a.elems.pop();
    a.hdr.set_size(a.elems.len());
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

pub(crate) unsafe fn is_vector_data(_ad: Ad) -> bool {
    true
}

pub(crate) unsafe fn escalate_for_sort(ad: Ad, _by: SortBy) -> Ad {
    // Packed handles both key and value sorts directly.
    ad
}

pub(crate) unsafe fn sort(ad: Ad, spec: &mut SortSpec<'_>) {
    debug_assert!(hdr_ref(ad).rc().has_exactly_one_ref());
    if spec.by == SortBy::Key {
        // Packed keys are already in ascending order; a descending key
        // sort reverses the elements.
        if !spec.ascending && spec.cmp.is_none() {
            cast_mut::<PackedArray>(ad).elems.reverse();
        }
        return;
    }
    let a = cast_mut::<PackedArray>(ad);
    let mut pairs: Vec<(Key, Value)> = std::mem::take(&mut a.elems)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (Key::Int(i as i64), v))
        .collect();
    pairs.sort_by(|x, y| spec.compare(x, y));
    a.elems = pairs.into_iter().map(|(_, v)| v).collect();
}

pub(crate) unsafe fn set_legacy_move(ad: Ad, legacy: bool) -> Ad {
    let h = hdr_ref(ad);
    if h.is_legacy() == legacy {
        return ad;
    }
    if h.rc().is_uncounted() {
        // The pool carries both mark states for every empty kind.
        return crate::static_pool::static_empty(h.kind(), legacy);
    }
    let out = cow(ad);
    hdr_ref(out).set_legacy_flag(legacy);
    out
}

/// Escalates to the mixed layout with the same entries, keyed `0..size`.
/// Returns a fresh counted mixed array; the caller still owns `ad`.
pub(crate) unsafe fn to_mixed(ad: Ad, why: &'static str) -> Ad {
    let h = hdr_ref(ad);
    let target = if h.kind() == Kind::Packed { Kind::Mixed } else { Kind::Dict };
    log::debug!(
        "escalating {} of size {} to {} for {}",
        h.kind().name(),
        h.size(),
        target.name(),
        why
    );
    let a = cast_ref::<PackedArray>(ad);
    let pairs = a
        .elems
        .iter()
        .enumerate()
        .map(|(i, v)| (Key::Int(i as i64), v.clone()))
        .collect();
    let out = mixed::alloc(target, h.is_legacy(), pairs);
    hdr_ref(out).copy_extra_from(h);
    out
}
