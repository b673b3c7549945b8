//! The mixed layout: insertion-ordered entries with int or string keys.
//!
//! Backs the darray and dict kinds and serves as the escalation target for
//! every other layout. Entries live in a dense vector with tombstones for
//! removed slots; a hash index maps keys to entry positions. Iteration
//! positions are entry indices and skip tombstones.

use std::ptr::NonNull;

use hashbrown::HashMap;

use crate::cast::{cast_mut, cast_ref, ArrayRepr};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, Header, Kind};
use crate::sort::{SortBy, SortSpec};
use crate::strdata::StrData;
use crate::value::{Key, Value};

/// A one-sided membership filter over an array's string keys, kept as a
/// separate allocation and advertised by a header flag. `may_contain`
/// returning false proves absence; true proves nothing.
pub(crate) struct StrKeyTable {
    bits: [u64; 4],
}

impl StrKeyTable {
    fn new() -> StrKeyTable {
        StrKeyTable { bits: [0; 4] }
    }

    fn slot(s: StrData) -> (usize, u64) {
        // Interned handles hash by pointer; mix the low bits away since
        // allocations are aligned.
        let h = ((s.ptr_usize() as u64) >> 3).wrapping_mul(0x9e3779b97f4a7c15);
        (((h >> 6) & 3) as usize, 1u64 << (h & 63))
    }

    fn add(&mut self, s: StrData) {
        let (w, b) = Self::slot(s);
        self.bits[w] |= b;
    }

    pub(crate) fn may_contain(&self, s: StrData) -> bool {
        let (w, b) = Self::slot(s);
        self.bits[w] & b != 0
    }
}

#[repr(C)]
pub(crate) struct MixedArray {
    hdr: Header,
    entries: Vec<Option<(Key, Value)>>,
    index: HashMap<Key, usize>,
    next_ki: i64,
    side: Option<Box<StrKeyTable>>,
}

unsafe impl ArrayRepr for MixedArray {
    fn matches(h: &Header) -> bool {
        matches!(h.kind(), Kind::Mixed | Kind::Dict)
    }
}

impl MixedArray {
    fn insert(&mut self, key: Key, v: Value) {
        if let Some(&pos) = self.index.get(&key) {
            // Overwrite keeps insertion order.
            self.entries[pos] = Some((key, v));
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push(Some((key, v)));
            self.hdr.set_size(self.hdr.size() + 1);
            if let Key::Str(_) = key {
                self.drop_side_table();
            }
        }
        if let Key::Int(k) = key {
            if k >= self.next_ki {
                self.next_ki = k.checked_add(1).unwrap_or(i64::MAX);
            }
        }
    }

    fn drop_side_table(&mut self) {
        if self.side.take().is_some() {
            self.hdr.set_side_table_flag(false);
        }
    }

    fn live(&self) -> impl Iterator<Item = &(Key, Value)> {
        self.entries.iter().flatten()
    }
}

/// Allocates a counted mixed array from ordered pairs. Later pairs with a
/// repeated key overwrite earlier ones in place.
pub(crate) fn alloc(kind: Kind, legacy: bool, pairs: Vec<(Key, Value)>) -> Ad {
    debug_assert!(matches!(kind, Kind::Mixed | Kind::Dict));
    let aux = if legacy { crate::header::F_LEGACY } else { 0 };
    let mut a = MixedArray {
        hdr: Header::counted(kind, aux, 0),
        entries: Vec::with_capacity(pairs.len()),
        index: HashMap::with_capacity(pairs.len()),
        next_ki: 0,
        side: None,
    };
    for (k, v) in pairs {
        a.insert(k, v);
    }
    NonNull::from(Box::leak(Box::new(a))).cast::<Header>()
}

/// Allocates an uncounted empty mixed array for the singleton pool.
pub(crate) fn alloc_static(kind: Kind, legacy: bool) -> Ad {
    debug_assert!(matches!(kind, Kind::Mixed | Kind::Dict));
    let a = MixedArray {
        hdr: Header::uncounted(kind, if legacy { crate::header::F_LEGACY } else { 0 }),
        entries: Vec::new(),
        index: HashMap::new(),
        next_ki: 0,
        side: None,
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
    drop(Box::from_raw(ad.cast::<MixedArray>().as_ptr()));
}

/// Copies compact the entry vector: tombstones are not carried over, and
/// neither is the side table (the flag is not in the copied aux bits).
pub(crate) unsafe fn copy(ad: Ad) -> Ad {
    let src = cast_ref::<MixedArray>(ad);
    let mut entries = Vec::with_capacity(src.hdr.size());
    let mut index = HashMap::with_capacity(src.hdr.size());
    for (k, v) in src.live() {
        index.insert(*k, entries.len());
        entries.push(Some((*k, v.clone())));
    }
    let hdr = Header::counted(src.hdr.kind(), src.hdr.aux_bits(), src.hdr.size());
    hdr.copy_extra_from(&src.hdr);
    let a = MixedArray { hdr, entries, index, next_ki: src.next_ki, side: None };
    NonNull::from(Box::leak(Box::new(a))).cast::<Header>()
}

pub(crate) unsafe fn heap_size(ad: Ad) -> usize {
    let a = cast_ref::<MixedArray>(ad);
    let side = if a.side.is_some() { std::mem::size_of::<StrKeyTable>() } else { 0 };
    std::mem::size_of::<MixedArray>()
        + a.entries.capacity() * std::mem::size_of::<Option<(Key, Value)>>()
        + a.index.capacity() * std::mem::size_of::<(Key, usize)>()
        + side
}

pub(crate) unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value)) {
    for (_, v) in cast_ref::<MixedArray>(ad).live() {
        f(v);
    }
}

unsafe fn get(ad: Ad, key: Key) -> Option<Value> {
    let a = cast_ref::<MixedArray>(ad);
    let pos = *a.index.get(&key)?;
    a.entries[pos].as_ref().map(|(_, v)| v.clone())
}

pub(crate) unsafe fn get_int(ad: Ad, key: i64) -> Option<Value> {
    get(ad, Key::Int(key))
}

pub(crate) unsafe fn get_str(ad: Ad, key: StrData) -> Option<Value> {
    get(ad, Key::Str(key))
}

pub(crate) unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key {
    cast_ref::<MixedArray>(ad).entries[pos]
        .as_ref()
        .map(|(k, _)| *k)
        .unwrap()
}

pub(crate) unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value {
    cast_ref::<MixedArray>(ad).entries[pos]
        .as_ref()
        .map(|(_, v)| v.clone())
        .unwrap()
}

pub(crate) unsafe fn set_int_move(ad: Ad, key: i64, v: Value) -> Result<Ad, ArrayError> {
    let out = cow(ad);
    cast_mut::<MixedArray>(out).insert(Key::Int(key), v);
    Ok(out)
}

pub(crate) unsafe fn set_str_move(ad: Ad, key: StrData, v: Value) -> Result<Ad, ArrayError> {
    let out = cow(ad);
    cast_mut::<MixedArray>(out).insert(Key::Str(key), v);
    Ok(out)
}

unsafe fn remove(ad: Ad, key: Key) -> Result<Ad, ArrayError> {
    if !cast_ref::<MixedArray>(ad).index.contains_key(&key) {
        return Ok(ad);
    }
    let out = cow(ad);
    let a = cast_mut::<MixedArray>(out);
    let pos = a.index.remove(&key).unwrap();
    a.entries[pos] = None;
    a.hdr.set_size(a.hdr.size() - 1);
    Ok(out)
}

pub(crate) unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
    remove(ad, Key::Int(key))
}

pub(crate) unsafe fn remove_str_move(ad: Ad, key: StrData) -> Result<Ad, ArrayError> {
    remove(ad, Key::Str(key))
}

pub(crate) unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
    let a = cast_ref::<MixedArray>(ad);
    if a.next_ki == i64::MAX {
        return Err(ArrayError::IllegalOperation {
            kind: a.hdr.kind().name(),
            op: "append beyond the maximum integer key to",
        });
    }
    let key = a.next_ki;
    set_int_move(ad, key, v)
}

pub(crate) unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
    if hdr_ref(ad).size() == 0 {
        *out = None;
        return ad;
    }
    let new = cow(ad);
    let a = cast_mut::<MixedArray>(new);
    let pos = a.entries.iter().rposition(|e| e.is_some()).unwrap();
    let (k, v) = a.entries[pos].take().unwrap();
    a.index.remove(&k);
    a.hdr.set_size(a.hdr.size() - 1);
    if k == Key::Int(a.next_ki - 1) {
        a.next_ki -= 1;
    }
    *out = Some(v);
    new
}

pub(crate) unsafe fn iter_begin(ad: Ad) -> usize {
    let a = cast_ref::<MixedArray>(ad);
    a.entries
        .iter()
        .position(|e| e.is_some())
        .unwrap_or(a.entries.len())
}

pub(crate) unsafe fn iter_last(ad: Ad) -> usize {
    let a = cast_ref::<MixedArray>(ad);
    a.entries
        .iter()
        .rposition(|e| e.is_some())
        .unwrap_or(a.entries.len())
}

pub(crate) unsafe fn iter_end(ad: Ad) -> usize {
    cast_ref::<MixedArray>(ad).entries.len()
}

pub(crate) unsafe fn iter_advance(ad: Ad, pos: usize) -> usize {
    let a = cast_ref::<MixedArray>(ad);
    debug_assert!(pos < a.entries.len());
    a.entries[pos + 1..]
        .iter()
        .position(|e| e.is_some())
        .map(|off| pos + 1 + off)
        .unwrap_or(a.entries.len())
}

pub(crate) unsafe fn iter_rewind(ad: Ad, pos: usize) -> usize {
    let a = cast_ref::<MixedArray>(ad);
    a.entries[..pos]
        .iter()
        .rposition(|e| e.is_some())
        .unwrap_or(a.entries.len())
}

pub(crate) unsafe fn is_vector_data(ad: Ad) -> bool {
    let a = cast_ref::<MixedArray>(ad);
    a.live()
        .enumerate()
        .all(|(i, (k, _))| *k == Key::Int(i as i64))
}

pub(crate) unsafe fn escalate_for_sort(ad: Ad, _by: SortBy) -> Ad {
    ad
}

pub(crate) unsafe fn sort(ad: Ad, spec: &mut SortSpec<'_>) {
    debug_assert!(hdr_ref(ad).rc().has_exactly_one_ref());
    let a = cast_mut::<MixedArray>(ad);
    let mut pairs: Vec<(Key, Value)> =
        std::mem::take(&mut a.entries).into_iter().flatten().collect();
    pairs.sort_by(|x, y| spec.compare(x, y));
    if spec.renumber {
        pairs = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (_, v))| (Key::Int(i as i64), v))
            .collect();
        a.next_ki = pairs.len() as i64;
        a.drop_side_table();
    }
    a.index = pairs.iter().enumerate().map(|(i, (k, _))| (*k, i)).collect();
    a.entries = pairs.into_iter().map(Some).collect();
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

///////////////////////////////////////////////////////////////////////////
// Side table

/// Builds and attaches the string-key filter. Requires an exclusively
/// owned mixed array; the table stays valid until a new string key is
/// inserted in place, at which point it is discarded.
pub(crate) unsafe fn install_str_key_table(ad: Ad) {
    debug_assert!(hdr_ref(ad).rc().has_exactly_one_ref());
    let a = cast_mut::<MixedArray>(ad);
    let mut table = StrKeyTable::new();
    for (k, _) in a.entries.iter().flatten() {
        if let Key::Str(s) = k {
            table.add(*s);
        }
    }
    a.side = Some(Box::new(table));
    a.hdr.set_side_table_flag(true);
}

/// Fast absence check through the side table. Only meaningful when the
/// header's side-table flag is set.
pub(crate) unsafe fn may_have_str_key(ad: Ad, key: StrData) -> bool {
    let a = cast_ref::<MixedArray>(ad);
    match &a.side {
        Some(t) => t.may_contain(key),
        None => true,
    }
}
