//! The owning array handle and the public operation surface.
//!
//! An [`ArrayData`] is one reference to a refcounted array. Clones bump
//! the count, drops release it, and every mutator runs the copy-on-write
//! protocol: validate against the current array, copy unless exclusively
//! owned, mutate, swap the handle. A mutator returning an error leaves the
//! handle exactly as it was.

use std::fmt::{self, Debug, Formatter};

use crate::bespoke::layout::LayoutIndex;
use crate::bespoke::{self, monotype};
use crate::dispatch::{dec_ref_and_release, ensure_exclusive, G_ARRAY_FUNCS};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, Header, Kind};
use crate::options::{self, ProvTag};
use crate::sort::SortSpec;
use crate::static_pool;
use crate::value::{Key, Value};
use crate::vanilla;

/// One owning reference to an array.
///
/// Handles are single-threaded: the refcount is not atomic. Immortal
/// arrays (the empty singletons) are the exception and may be named from
/// any thread.
pub struct ArrayData {
    ptr: Ad,
}

impl ArrayData {
    /// Wraps a raw handle the caller already owns a reference to.
    pub(crate) unsafe fn from_owned(ptr: Ad) -> ArrayData {
        ArrayData { ptr }
    }

    /// Wraps a raw handle, taking a new reference.
    pub(crate) unsafe fn from_borrowed(ptr: Ad) -> ArrayData {
        hdr_ref(ptr).rc().inc();
        ArrayData { ptr }
    }

    fn hdr(&self) -> &Header {
        // Safety: the handle owns a reference, so the allocation is live.
        unsafe { hdr_ref(self.ptr) }
    }

    fn idx(&self) -> usize {
        self.hdr().kind() as usize
    }

    /// Swaps in the handle a move-style table operation returned, and
    /// releases the previous array if it was replaced.
    fn adopt(&mut self, new: Ad) {
        if new != self.ptr {
            let old = std::mem::replace(&mut self.ptr, new);
            unsafe { dec_ref_and_release(old) };
        }
    }

    ///////////////////////////////////////////////////////////////////////
    // Factories

    fn tag_if_requested(mut arr: ArrayData, tag: Option<ProvTag>) -> ArrayData {
        if let Some(t) = tag {
            arr.tag_prov(t);
        }
        arr
    }

    /// A vec of the given values. The empty vec is the immortal singleton.
    pub fn create_vec<I: IntoIterator<Item = Value>>(elems: I) -> ArrayData {
        let elems: Vec<Value> = elems.into_iter().collect();
        if elems.is_empty() {
            return unsafe { ArrayData::from_owned(static_pool::static_empty(Kind::Vec, false)) };
        }
        unsafe { ArrayData::from_owned(vanilla::packed::alloc(Kind::Vec, false, elems)) }
    }

    /// A dict of the given entries, in order. Repeated keys overwrite in
    /// place. The empty dict is the immortal singleton.
    pub fn create_dict<I: IntoIterator<Item = (Key, Value)>>(pairs: I) -> ArrayData {
        let pairs: Vec<(Key, Value)> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return unsafe { ArrayData::from_owned(static_pool::static_empty(Kind::Dict, false)) };
        }
        unsafe { ArrayData::from_owned(vanilla::mixed::alloc(Kind::Dict, false, pairs)) }
    }

    /// A keyset of the given elements, first occurrence wins.
    pub fn create_keyset<I: IntoIterator<Item = Key>>(elems: I) -> ArrayData {
        let elems: Vec<Key> = elems.into_iter().collect();
        if elems.is_empty() {
            return unsafe {
                ArrayData::from_owned(static_pool::static_empty(Kind::Keyset, false))
            };
        }
        unsafe { ArrayData::from_owned(vanilla::keyset::alloc(elems)) }
    }

    /// A varray. Under `hack_arrays` this is a legacy-marked vec instead.
    /// A provenance tag is recorded when provenance mode is active.
    pub fn create_varray<I: IntoIterator<Item = Value>>(
        tag: Option<ProvTag>,
        elems: I,
    ) -> ArrayData {
        let elems: Vec<Value> = elems.into_iter().collect();
        let (kind, legacy) = if options::hack_arrays() {
            (Kind::Vec, true)
        } else {
            (Kind::Packed, false)
        };
        let want_tag = tag.is_some() && options::array_provenance();
        if elems.is_empty() && !want_tag {
            return unsafe { ArrayData::from_owned(static_pool::static_empty(kind, legacy)) };
        }
        let arr = unsafe { ArrayData::from_owned(vanilla::packed::alloc(kind, legacy, elems)) };
        Self::tag_if_requested(arr, tag)
    }

    /// A darray. Under `hack_arrays` this is a legacy-marked dict instead.
    pub fn create_darray<I: IntoIterator<Item = (Key, Value)>>(
        tag: Option<ProvTag>,
        pairs: I,
    ) -> ArrayData {
        let pairs: Vec<(Key, Value)> = pairs.into_iter().collect();
        let (kind, legacy) = if options::hack_arrays() {
            (Kind::Dict, true)
        } else {
            (Kind::Mixed, false)
        };
        let want_tag = tag.is_some() && options::array_provenance();
        if pairs.is_empty() && !want_tag {
            return unsafe { ArrayData::from_owned(static_pool::static_empty(kind, legacy)) };
        }
        let arr = unsafe { ArrayData::from_owned(vanilla::mixed::alloc(kind, legacy, pairs)) };
        Self::tag_if_requested(arr, tag)
    }

    ///////////////////////////////////////////////////////////////////////
    // Inspection

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hdr().size()
    }

    /// Whether the array has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The runtime kind.
    pub fn kind(&self) -> Kind {
        self.hdr().kind()
    }

    /// Whether this array uses a compiled-in layout.
    pub fn is_vanilla(&self) -> bool {
        self.hdr().kind().is_vanilla()
    }

    /// Whether this array uses a bespoke layout.
    pub fn is_bespoke(&self) -> bool {
        !self.is_vanilla()
    }

    /// The bespoke layout index, if any.
    pub fn layout_index(&self) -> Option<LayoutIndex> {
        if self.is_bespoke() {
            Some(self.hdr().bespoke_index())
        } else {
            None
        }
    }

    /// Whether the array carries the legacy-behavior mark.
    pub fn is_legacy(&self) -> bool {
        self.hdr().is_legacy()
    }

    /// Whether this is a darray (of any layout).
    pub fn is_darray(&self) -> bool {
        self.hdr().is_darray()
    }

    /// Whether this is a varray (of any layout).
    pub fn is_varray(&self) -> bool {
        self.hdr().is_varray()
    }

    /// Whether this is either legacy dvarray kind.
    pub fn is_dvarray(&self) -> bool {
        self.hdr().is_dvarray()
    }

    /// Whether this array was picked by layout-selection sampling.
    pub fn is_sampled(&self) -> bool {
        self.hdr().is_sampled()
    }

    /// Marks this array as sampled for layout-selection logging. The mark
    /// survives copies.
    pub fn mark_sampled(&mut self) {
        let excl = unsafe { ensure_exclusive(self.ptr) };
        self.adopt(excl);
        self.hdr().set_sampled();
    }

    /// Whether a typed value is co-allocated after this array. The bit is
    /// owned by the host's persistence format; copies never carry it.
    pub fn has_coalloc_tv(&self) -> bool {
        self.hdr().has_coalloc_tv()
    }

    /// Records that the host co-allocated a typed value after this array.
    /// Runs the copy protocol first: the bit lands on an exclusively owned
    /// allocation, never on a shared or immortal one.
    pub fn set_coalloc_tv(&mut self, on: bool) {
        let excl = unsafe { ensure_exclusive(self.ptr) };
        self.adopt(excl);
        self.hdr().set_coalloc_tv_flag(on);
    }

    /// Whether the keys are exactly `0..len()` in order.
    pub fn is_vector_data(&self) -> bool {
        unsafe { (G_ARRAY_FUNCS.is_vector_data[self.idx()])(self.ptr) }
    }

    /// Whether both handles name the same array in memory.
    pub fn same(&self, other: &ArrayData) -> bool {
        self.ptr == other.ptr
    }

    /// Bytes attributable to this array's own allocations.
    pub fn heap_size(&self) -> usize {
        unsafe { (G_ARRAY_FUNCS.heap_size[self.idx()])(self.ptr) }
    }

    /// Visits every element value, for tracing collectors and leak checks.
    pub fn scan(&self, f: &mut dyn FnMut(&Value)) {
        unsafe { (G_ARRAY_FUNCS.scan[self.idx()])(self.ptr, f) }
    }

    /// The current reference count. Immortal arrays report `None`.
    pub fn ref_count(&self) -> Option<u32> {
        let rc = self.hdr().rc();
        if rc.is_uncounted() {
            None
        } else {
            Some(rc.count())
        }
    }

    /// Sets the sticky shared mark, disabling in-place mutation for the
    /// rest of this array's life. Used when a handle is exposed to code
    /// that may hold uncounted aliases.
    pub fn mark_shared(&self) {
        self.hdr().rc().mark_shared();
    }

    ///////////////////////////////////////////////////////////////////////
    // Reads

    /// The value at `key`, if present.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        unsafe {
            match key.into() {
                Key::Int(i) => (G_ARRAY_FUNCS.get_int[self.idx()])(self.ptr, i),
                Key::Str(s) => (G_ARRAY_FUNCS.get_str[self.idx()])(self.ptr, s),
            }
        }
    }

    /// The value at `key`, or a [`ArrayError::MissingKey`] error.
    pub fn get_throw(&self, key: impl Into<Key>) -> Result<Value, ArrayError> {
        let key = key.into();
        if self.is_bespoke() {
            return unsafe {
                match key {
                    Key::Int(i) => bespoke::get_int_throw(self.ptr, i),
                    Key::Str(s) => bespoke::get_str_throw(self.ptr, s),
                }
            };
        }
        self.get(key).ok_or(ArrayError::MissingKey {
            kind: self.kind().name(),
            key,
        })
    }

    /// Whether `key` is present. Uses the string-key side table, when one
    /// is installed, to prove absence without probing the hash index.
    pub fn exists(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        if let Key::Str(s) = key {
            if self.hdr().has_side_table()
                && !unsafe { vanilla::mixed::may_have_str_key(self.ptr, s) }
            {
                return false;
            }
        }
        self.get(key).is_some()
    }

    ///////////////////////////////////////////////////////////////////////
    // Mutation

    /// Sets `key` to `value`.
    pub fn set(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Result<(), ArrayError> {
        let value = value.into();
        let new = unsafe {
            match key.into() {
                Key::Int(i) => (G_ARRAY_FUNCS.set_int_move[self.idx()])(self.ptr, i, value)?,
                Key::Str(s) => (G_ARRAY_FUNCS.set_str_move[self.idx()])(self.ptr, s, value)?,
            }
        };
        self.adopt(new);
        Ok(())
    }

    /// Removes `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: impl Into<Key>) -> Result<(), ArrayError> {
        let new = unsafe {
            match key.into() {
                Key::Int(i) => (G_ARRAY_FUNCS.remove_int_move[self.idx()])(self.ptr, i)?,
                Key::Str(s) => (G_ARRAY_FUNCS.remove_str_move[self.idx()])(self.ptr, s)?,
            }
        };
        self.adopt(new);
        Ok(())
    }

    /// Appends `value` at the next position.
    pub fn append(&mut self, value: impl Into<Value>) -> Result<(), ArrayError> {
        let new =
            unsafe { (G_ARRAY_FUNCS.append_move[self.idx()])(self.ptr, value.into())? };
        self.adopt(new);
        Ok(())
    }

    /// Removes and returns the last entry's value.
    pub fn pop(&mut self) -> Option<Value> {
        let mut out = None;
        let new = unsafe { (G_ARRAY_FUNCS.pop_move[self.idx()])(self.ptr, &mut out) };
        self.adopt(new);
        out
    }

    /// Sorts in place per `spec`, escalating to a vanilla layout first if
    /// the current layout cannot sort itself.
    pub fn sort(&mut self, spec: &mut SortSpec<'_>) {
        unsafe {
            let esc = (G_ARRAY_FUNCS.escalate_for_sort[self.idx()])(self.ptr, spec.by);
            self.adopt(esc);
            let excl = ensure_exclusive(self.ptr);
            self.adopt(excl);
            (G_ARRAY_FUNCS.sort[self.idx()])(self.ptr, spec);
        }
    }

    /// Sets or clears the legacy-behavior mark.
    pub fn set_legacy(&mut self, legacy: bool) {
        let new = unsafe { (G_ARRAY_FUNCS.set_legacy_move[self.idx()])(self.ptr, legacy) };
        self.adopt(new);
    }

    ///////////////////////////////////////////////////////////////////////
    // Conversions

    fn values(&self) -> Vec<Value> {
        self.iter().map(|(_, v)| v).collect()
    }

    fn pairs(&self) -> Vec<(Key, Value)> {
        self.iter().collect()
    }

    /// This array as a vec: values in iteration order, keys discarded.
    pub fn to_vec(&self) -> ArrayData {
        if self.kind() == Kind::Vec && !self.is_legacy() {
            return self.clone();
        }
        ArrayData::create_vec(self.values())
    }

    /// This array as a dict, preserving keys and order.
    pub fn to_dict(&self) -> ArrayData {
        if self.kind() == Kind::Dict && !self.is_legacy() {
            return self.clone();
        }
        ArrayData::create_dict(self.pairs())
    }

    /// This array as a varray.
    pub fn to_varray(&self) -> ArrayData {
        if self.kind() == Kind::Packed {
            return self.clone();
        }
        unsafe {
            if self.is_empty() {
                return ArrayData::from_owned(static_pool::static_empty(Kind::Packed, false));
            }
            ArrayData::from_owned(vanilla::packed::alloc(Kind::Packed, false, self.values()))
        }
    }

    /// This array as a darray, preserving keys and order.
    pub fn to_darray(&self) -> ArrayData {
        if self.kind() == Kind::Mixed {
            return self.clone();
        }
        unsafe {
            if self.is_empty() {
                return ArrayData::from_owned(static_pool::static_empty(Kind::Mixed, false));
            }
            ArrayData::from_owned(vanilla::mixed::alloc(Kind::Mixed, false, self.pairs()))
        }
    }

    /// Converts a dvarray to its modern counterpart in place: varray to
    /// vec, darray to dict. Exclusively owned arrays keep their storage
    /// and flip the kind tag; shared ones copy first. A no-op for every
    /// other kind.
    pub fn to_modern(&mut self) {
        if !self.is_dvarray() {
            return;
        }
        self.devolve_bespoke("modern conversion");
        let target = match self.kind() {
            Kind::Packed => Kind::Vec,
            Kind::Mixed => Kind::Dict,
            _ => return,
        };
        self.flip_kind(target);
    }

    /// Converts a vec or dict to its legacy counterpart in place: vec to
    /// varray, dict to darray. The legacy mark does not survive; dvarray
    /// kinds carry legacy behavior in the kind itself.
    pub fn to_legacy(&mut self) {
        let target = match self.kind().vanilla() {
            Kind::Vec => Kind::Packed,
            Kind::Dict => Kind::Mixed,
            _ => return,
        };
        self.devolve_bespoke("legacy conversion");
        self.flip_kind(target);
    }

    fn devolve_bespoke(&mut self, why: &'static str) {
        if self.is_bespoke() {
            let esc = unsafe { bespoke::escalate_to_vanilla(self.ptr, why) };
            self.adopt(esc);
        }
    }

    /// Same-storage kind change: the packed and mixed representations back
    /// both members of their legacy/modern pairs.
    fn flip_kind(&mut self, target: Kind) {
        if self.is_empty() && self.ref_count().is_none() {
            self.adopt(static_pool::static_empty(target, false));
            return;
        }
        let excl = unsafe { ensure_exclusive(self.ptr) };
        self.adopt(excl);
        self.hdr().set_kind(target);
        self.hdr().set_legacy_flag(false);
    }

    /// This array as a keyset. Fails if any value is not an arraykey.
    pub fn to_keyset(&self) -> Result<ArrayData, ArrayError> {
        if self.kind() == Kind::Keyset {
            return Ok(self.clone());
        }
        let mut elems = Vec::with_capacity(self.len());
        for (_, v) in self.iter() {
            match v.to_key() {
                Some(k) => elems.push(k),
                None => {
                    return Err(ArrayError::IllegalOperation {
                        kind: self.kind().name(),
                        op: "convert a non-arraykey value into a member of",
                    })
                }
            }
        }
        Ok(ArrayData::create_keyset(elems))
    }

    /// Attempts to specialize a vanilla vec into a monotype bespoke vec.
    /// `None` means the array is not eligible; the receiver is untouched
    /// either way.
    pub fn monoify(&self) -> Option<ArrayData> {
        unsafe { monotype::maybe_monoify(self.ptr).map(|ad| ArrayData::from_owned(ad)) }
    }

    ///////////////////////////////////////////////////////////////////////
    // Provenance and side tables

    /// The provenance tag, if provenance mode is on and a tag was stored.
    pub fn prov_tag(&self) -> Option<ProvTag> {
        if self.is_bespoke() {
            return None;
        }
        self.hdr().prov_tag()
    }

    /// Stores a provenance tag. A no-op unless provenance mode is active;
    /// never applied to bespoke arrays, whose extra slot is the layout
    /// index.
    pub fn tag_prov(&mut self, tag: ProvTag) {
        if !options::array_provenance() || self.is_bespoke() {
            return;
        }
        let excl = unsafe { ensure_exclusive(self.ptr) };
        self.adopt(excl);
        self.hdr().set_prov_tag(tag);
    }

    /// Builds the string-key side table for a mixed-backed array. Returns
    /// false for layouts without one.
    pub fn install_str_key_table(&mut self) -> bool {
        if self.is_bespoke() || !matches!(self.kind(), Kind::Mixed | Kind::Dict) {
            return false;
        }
        unsafe {
            let excl = ensure_exclusive(self.ptr);
            self.adopt(excl);
            vanilla::mixed::install_str_key_table(self.ptr);
        }
        true
    }

    /// Whether a string-key side table is attached.
    pub fn has_str_key_table(&self) -> bool {
        self.hdr().has_side_table()
    }

    ///////////////////////////////////////////////////////////////////////
    // Iteration

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        let (pos, end) = unsafe {
            (
                (G_ARRAY_FUNCS.iter_begin[self.idx()])(self.ptr),
                (G_ARRAY_FUNCS.iter_end[self.idx()])(self.ptr),
            )
        };
        Iter { arr: self, pos, end }
    }

    /// Iterates entries in reverse insertion order.
    pub fn iter_rev(&self) -> RevIter<'_> {
        let (pos, end) = unsafe {
            (
                (G_ARRAY_FUNCS.iter_last[self.idx()])(self.ptr),
                (G_ARRAY_FUNCS.iter_end[self.idx()])(self.ptr),
            )
        };
        RevIter { arr: self, pos, end }
    }

    fn entry_at(&self, pos: usize) -> (Key, Value) {
        unsafe {
            (
                (G_ARRAY_FUNCS.get_pos_key[self.idx()])(self.ptr, pos),
                (G_ARRAY_FUNCS.get_pos_val[self.idx()])(self.ptr, pos),
            )
        }
    }

    /// The first entry, if any.
    pub fn first(&self) -> Option<(Key, Value)> {
        self.iter().next()
    }

    /// The last entry, if any.
    pub fn last(&self) -> Option<(Key, Value)> {
        self.iter_rev().next()
    }
}

impl Clone for ArrayData {
    fn clone(&self) -> Self {
        unsafe { ArrayData::from_borrowed(self.ptr) }
    }
}

impl Drop for ArrayData {
    fn drop(&mut self) {
        unsafe { dec_ref_and_release(self.ptr) };
    }
}

impl PartialEq for ArrayData {
    /// Structural equality: same semantic kind, same legacy mark, same
    /// entries in the same order. Layout (vanilla vs bespoke) is invisible.
    fn eq(&self, other: &Self) -> bool {
        if self.same(other) {
            return true;
        }
        if self.kind().vanilla() != other.kind().vanilla()
            || self.is_legacy() != other.is_legacy()
            || self.len() != other.len()
        {
            return false;
        }
        self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Debug for ArrayData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.kind().name())?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} => {:?}", k, v)?;
        }
        write!(f, "]")
    }
}

/// Entry iterator over an array. Positions are layout-internal; the
/// iterator must not outlive a mutation of the underlying handle, which
/// the borrow on [`ArrayData`] guarantees.
pub struct Iter<'a> {
    arr: &'a ArrayData,
    pos: usize,
    end: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<(Key, Value)> {
        if self.pos == self.end {
            return None;
        }
        let entry = self.arr.entry_at(self.pos);
        self.pos =
            unsafe { (G_ARRAY_FUNCS.iter_advance[self.arr.idx()])(self.arr.ptr, self.pos) };
        Some(entry)
    }
}

/// Reverse entry iterator. Rewinding past the first entry lands on the end
/// position, which terminates it.
pub struct RevIter<'a> {
    arr: &'a ArrayData,
    pos: usize,
    end: usize,
}

impl<'a> Iterator for RevIter<'a> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<(Key, Value)> {
        if self.pos == self.end {
            return None;
        }
        let entry = self.arr.entry_at(self.pos);
        self.pos =
            unsafe { (G_ARRAY_FUNCS.iter_rewind[self.arr.idx()])(self.arr.ptr, self.pos) };
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vec_is_the_singleton() {
        let a = ArrayData::create_vec([]);
        let b = ArrayData::create_vec([]);
        assert!(a.same(&b));
        assert_eq!(a.ref_count(), None);
    }

    #[test]
    fn clone_shares_until_written() {
        let mut a = ArrayData::create_vec([Value::Int(1), Value::Int(2)]);
        let b = a.clone();
        assert!(a.same(&b));
        assert_eq!(a.ref_count(), Some(2));

        a.set(0, 10i64).unwrap();
        assert!(!a.same(&b), "write to a shared array copies");
        assert_eq!(a.get(0), Some(Value::Int(10)));
        assert_eq!(b.get(0), Some(Value::Int(1)), "the alias is untouched");
        assert_eq!(b.ref_count(), Some(1));
    }

    #[test]
    fn exclusive_writes_stay_in_place() {
        let mut a = ArrayData::create_vec([Value::Int(1)]);
        let before = a.ptr;
        a.set(0, 5i64).unwrap();
        a.append(7i64).unwrap();
        assert_eq!(a.ptr, before, "exclusively owned arrays mutate in place");
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn failed_mutation_leaves_handle_alone() {
        let mut a = ArrayData::create_vec([Value::Int(1)]);
        let b = a.clone();
        let err = a.set(5, 9i64).unwrap_err();
        assert!(matches!(err, ArrayError::OutOfBounds { .. }));
        assert!(a.same(&b), "no copy happens on a rejected mutation");
    }

    #[test]
    fn mark_shared_forces_copies() {
        let mut a = ArrayData::create_vec([Value::Int(1)]);
        a.mark_shared();
        let before = a.ptr;
        a.set(0, 2i64).unwrap();
        assert_ne!(a.ptr, before);
    }

    #[test]
    fn dict_round_trip() {
        let mut d = ArrayData::create_dict([]);
        assert!(d.same(&ArrayData::create_dict([])));
        d.set("x", 1i64).unwrap();
        d.set(0, 2i64).unwrap();
        d.append(3i64).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d.get("x"), Some(Value::Int(1)));
        assert_eq!(d.get(1), Some(Value::Int(3)), "append follows the int keys");
        let keys: Vec<Key> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Key::from("x"), Key::Int(0), Key::Int(1)]);
    }

    #[test]
    fn pop_and_remove() {
        let mut v = ArrayData::create_vec([Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(v.pop(), Some(Value::Int(3)));
        let err = v.remove(0).unwrap_err();
        assert!(matches!(err, ArrayError::IllegalOperation { .. }));
        v.remove(1).unwrap();
        assert_eq!(v.len(), 1);
        v.remove(100).unwrap();
    }

    #[test]
    fn structural_equality_ignores_layout() {
        let v = ArrayData::create_vec([Value::Int(1), Value::Int(2)]);
        let m = v.monoify().expect("all-int vec is monotyped");
        assert!(m.is_bespoke());
        assert_eq!(v, m);
        assert_ne!(v, ArrayData::create_vec([Value::Int(1)]));
    }
}
