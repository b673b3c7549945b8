//! Monotype vecs: the bespoke layout for vecs whose elements all share one
//! value kind.
//!
//! Two families: `EmptyMonotypeVec` (two immortal empty singletons, one per
//! legacy-flag state) and `MonotypeVec<T>` (one concrete layout per
//! supported element kind). Both share a representation and a vtable; the
//! element kind lives in the header's layout-private bits. Appending the
//! first element moves an empty copy into the matching concrete layout;
//! any operation that breaks the monotype guarantee escalates to a vanilla
//! vec.

use std::ptr::NonNull;

use lazy_static::lazy_static;

use crate::bespoke::layout::{
    LatticeBuilder, LayoutIndex, FAMILY_EMPTY_MONOTYPE_VEC, FAMILY_MONOTYPE_VEC, TOP,
};
use crate::bespoke::{vtable_of, BespokeOps, LayoutVtable};
use crate::cast::{cast_mut, cast_ref, ArrayRepr};
use crate::dispatch::{kind_idx, G_ARRAY_FUNCS};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, Header, Kind};
use crate::static_pool::Immortal;
use crate::strdata::StrData;
use crate::value::{Key, Value, ValueKind};
use crate::vanilla::packed;

/// Abstract parent of every monotype vec layout.
pub const MONOTYPE_VEC_TOP: LayoutIndex = LayoutIndex::of((FAMILY_MONOTYPE_VEC as u16) << 8 | 0xff);

/// The empty monotype vec layout.
pub const EMPTY_INDEX: LayoutIndex = LayoutIndex::of((FAMILY_EMPTY_MONOTYPE_VEC as u16) << 8);

/// Layout-private sentinel for "no element kind yet".
const NO_VKIND: u16 = 0xffff;

/// The concrete layout index for a monotype vec of `vk`.
pub fn index_of(vk: ValueKind) -> LayoutIndex {
    LayoutIndex::of((FAMILY_MONOTYPE_VEC as u16) << 8 | vk_code(vk))
}

fn vk_code(vk: ValueKind) -> u16 {
    match vk {
        ValueKind::Bool => 0,
        ValueKind::Int => 1,
        ValueKind::Dbl => 2,
        ValueKind::Str => 3,
        _ => unreachable!("unsupported monotype element kind {:?}", vk),
    }
}

fn vk_from_code(code: u16) -> ValueKind {
    match code {
        0 => ValueKind::Bool,
        1 => ValueKind::Int,
        2 => ValueKind::Dbl,
        3 => ValueKind::Str,
        _ => unreachable!("bad monotype private bits {:#x}", code),
    }
}

fn supported(vk: ValueKind) -> bool {
    matches!(vk, ValueKind::Bool | ValueKind::Int | ValueKind::Dbl | ValueKind::Str)
}

/// Registers the monotype layouts. Both families share one vtable since
/// the representation is shared and the empty case is a size check.
pub(crate) fn register(b: &mut LatticeBuilder) {
    b.add_abstract("MonotypeVec<Top>", MONOTYPE_VEC_TOP, &[TOP]);
    b.add_concrete("EmptyMonotypeVec", EMPTY_INDEX, &[MONOTYPE_VEC_TOP], &MONOTYPE_VTABLE);
    b.add_concrete("MonotypeVec<Bool>", index_of(ValueKind::Bool), &[MONOTYPE_VEC_TOP], &MONOTYPE_VTABLE);
    b.add_concrete("MonotypeVec<Int>", index_of(ValueKind::Int), &[MONOTYPE_VEC_TOP], &MONOTYPE_VTABLE);
    b.add_concrete("MonotypeVec<Dbl>", index_of(ValueKind::Dbl), &[MONOTYPE_VEC_TOP], &MONOTYPE_VTABLE);
    b.add_concrete("MonotypeVec<Str>", index_of(ValueKind::Str), &[MONOTYPE_VEC_TOP], &MONOTYPE_VTABLE);
}

pub(crate) static MONOTYPE_VTABLE: LayoutVtable = vtable_of::<MonotypeVec>();

#[repr(C)]
pub(crate) struct MonotypeVec {
    hdr: Header,
    elems: Vec<Value>,
}

unsafe impl ArrayRepr for MonotypeVec {
    fn matches(h: &Header) -> bool {
        h.kind() == Kind::BespokeVec
            && matches!(
                h.bespoke_index().family(),
                FAMILY_EMPTY_MONOTYPE_VEC | FAMILY_MONOTYPE_VEC
            )
    }
}

lazy_static! {
    static ref EMPTY_PLAIN: Immortal = Immortal(make_static_empty(false));
    static ref EMPTY_LEGACY: Immortal = Immortal(make_static_empty(true));
}

fn make_static_empty(legacy: bool) -> Ad {
    let aux = if legacy { crate::header::F_LEGACY } else { 0 };
    let hdr = Header::uncounted(Kind::BespokeVec, aux);
    hdr.set_bespoke(EMPTY_INDEX, NO_VKIND);
    let b = Box::new(MonotypeVec { hdr, elems: Vec::new() });
    NonNull::from(Box::leak(b)).cast::<Header>()
}

/// The immortal empty monotype vec. Seals the hierarchy if needed.
pub(crate) fn static_empty(legacy: bool) -> Ad {
    crate::bespoke::ensure_hierarchy();
    if legacy {
        EMPTY_LEGACY.0
    } else {
        EMPTY_PLAIN.0
    }
}

/// The element kind of a monotype vec handle, `None` while empty-shaped.
pub(crate) unsafe fn vkind(ad: Ad) -> Option<ValueKind> {
    match hdr_ref(ad).bespoke_private() {
        NO_VKIND => None,
        code => Some(vk_from_code(code)),
    }
}

fn alloc_from(vk: ValueKind, legacy: bool, elems: Vec<Value>) -> Ad {
    debug_assert!(!elems.is_empty());
    let aux = if legacy { crate::header::F_LEGACY } else { 0 };
    let hdr = Header::counted(Kind::BespokeVec, aux, elems.len());
    hdr.set_bespoke(index_of(vk), vk_code(vk));
    let b = Box::new(MonotypeVec { hdr, elems });
    NonNull::from(Box::leak(b)).cast::<Header>()
}

/// Attempts to specialize a vanilla vec into a monotype vec. Returns a
/// fresh reference (or an immortal singleton) and leaves the caller's
/// reference to `ad` untouched; `None` means the vec is not monotyped.
pub(crate) unsafe fn maybe_monoify(ad: Ad) -> Option<Ad> {
    let h = hdr_ref(ad);
    if h.kind() != Kind::Vec {
        return None;
    }
    crate::bespoke::ensure_hierarchy();
    let size = h.size();
    if size == 0 {
        return Some(static_empty(h.is_legacy()));
    }
    let get = G_ARRAY_FUNCS.get_pos_val[kind_idx(ad)];
    let first = get(ad, 0);
    let vk = first.kind();
    if !supported(vk) {
        return None;
    }
    let mut elems = Vec::with_capacity(size);
    elems.push(first);
    for pos in 1..size {
        let v = get(ad, pos);
        if v.kind() != vk {
            return None;
        }
        elems.push(v);
    }
    log::trace!("monoifying vec of size {} to MonotypeVec ({:?})", size, vk);
    Some(alloc_from(vk, h.is_legacy(), elems))
}

unsafe fn cow(ad: Ad) -> Ad {
    if hdr_ref(ad).rc().has_exactly_one_ref() {
        ad
    } else {
        MonotypeVec::copy(ad)
    }
}

unsafe impl BespokeOps for MonotypeVec {
    unsafe fn release(ad: Ad) {
        drop(Box::from_raw(ad.cast::<MonotypeVec>().as_ptr()));
    }

    unsafe fn copy(ad: Ad) -> Ad {
        let src = cast_ref::<MonotypeVec>(ad);
        let hdr = Header::counted(Kind::BespokeVec, src.hdr.aux_bits(), src.hdr.size());
        hdr.copy_extra_from(&src.hdr);
        let b = Box::new(MonotypeVec { hdr, elems: src.elems.clone() });
        NonNull::from(Box::leak(b)).cast::<Header>()
    }

    unsafe fn heap_size(ad: Ad) -> usize {
        let a = cast_ref::<MonotypeVec>(ad);
        std::mem::size_of::<MonotypeVec>() + a.elems.capacity() * std::mem::size_of::<Value>()
    }

    unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value)) {
        for v in &cast_ref::<MonotypeVec>(ad).elems {
            f(v);
        }
    }

    unsafe fn get_int(ad: Ad, key: i64) -> Option<Value> {
        let a = cast_ref::<MonotypeVec>(ad);
        if key < 0 || key as usize >= a.elems.len() {
            return None;
        }
        Some(a.elems[key as usize].clone())
    }

    unsafe fn get_str(_ad: Ad, _key: StrData) -> Option<Value> {
        None
    }

    unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key {
        debug_assert!(pos < cast_ref::<MonotypeVec>(ad).elems.len());
        Key::Int(pos as i64)
    }

    unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value {
        cast_ref::<MonotypeVec>(ad).elems[pos].clone()
    }

    unsafe fn iter_begin(ad: Ad) -> usize {
        if hdr_ref(ad).size() == 0 {
            Self::iter_end(ad)
        } else {
            0
        }
    }

    unsafe fn iter_last(ad: Ad) -> usize {
        let len = hdr_ref(ad).size();
        if len == 0 {
            Self::iter_end(ad)
        } else {
            len - 1
        }
    }

    unsafe fn iter_end(ad: Ad) -> usize {
        hdr_ref(ad).size()
    }

    unsafe fn iter_advance(ad: Ad, pos: usize) -> usize {
        let end = Self::iter_end(ad);
        debug_assert!(pos < end);
        (pos + 1).min(end)
    }

    unsafe fn iter_rewind(ad: Ad, pos: usize) -> usize {
        if pos == 0 {
            Self::iter_end(ad)
        } else {
            pos - 1
        }
    }

    unsafe fn is_vector_data(_ad: Ad) -> bool {
        true
    }

    unsafe fn escalate_to_vanilla(ad: Ad, why: &'static str) -> Ad {
        let h = hdr_ref(ad);
        log::debug!(
            "escalating monotype vec of size {} to vec for {}",
            h.size(),
            why
        );
        let a = cast_ref::<MonotypeVec>(ad);
        packed::alloc(Kind::Vec, h.is_legacy(), a.elems.clone())
    }

    unsafe fn set_int_move(ad: Ad, key: i64, v: Value) -> Result<Ad, ArrayError> {
        let h = hdr_ref(ad);
        let len = h.size();
        if key < 0 || key as usize >= len {
            return Err(ArrayError::OutOfBounds {
                kind: h.kind().name(),
                index: key,
                size: len,
            });
        }
        if vkind(ad) != Some(v.kind()) {
            return crate::bespoke::synth::set_int_move::<Self>(ad, key, v);
        }
        let out = cow(ad);
        cast_mut::<MonotypeVec>(out).elems[key as usize] = v;
        Ok(out)
    }

    unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
        let vk = v.kind();
        let fits = supported(vk)
            && match vkind(ad) {
                None => true,
                Some(k) => k == vk,
            };
        if !fits {
            return crate::bespoke::synth::append_move::<Self>(ad, v);
        }
        let out = cow(ad);
        let a = cast_mut::<MonotypeVec>(out);
        if a.hdr.bespoke_private() == NO_VKIND {
            a.hdr.set_bespoke(index_of(vk), vk_code(vk));
        }
        a.elems.push(v);
        a.hdr.set_size(a.elems.len());
        Ok(out)
    }

    unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
        let h = hdr_ref(ad);
        let len = h.size();
        if key < 0 || key as usize >= len {
            return Ok(ad);
        }
        if key as usize != len - 1 {
            return Err(ArrayError::IllegalOperation {
                kind: h.kind().name(),
                op: "remove a non-final index from",
            });
        }
        let out = cow(ad);
        let a = cast_mut::<MonotypeVec>(out);
        a.elems.pop();
        a.hdr.set_size(a.elems.len());
        Ok(out)
    }

    unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
        if hdr_ref(ad).size() == 0 {
            *out = None;
            return ad;
        }
        let new = cow(ad);
        let a = cast_mut::<MonotypeVec>(new);
        *out = a.elems.pop();
        a.hdr.set_size(a.elems.len());
        new
    }

    unsafe fn set_legacy_move(ad: Ad, legacy: bool) -> Ad {
        if hdr_ref(ad).is_legacy() == legacy {
            return ad;
        }
        let out = cow(ad);
        hdr_ref(out).set_legacy_flag(legacy);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bespoke::ensure_hierarchy;
    use crate::bespoke::layout::lattice;

    #[test]
    fn hierarchy_names_and_joins() {
        ensure_hierarchy();
        let l = lattice();
        assert_eq!(l.name(EMPTY_INDEX), "EmptyMonotypeVec");
        assert!(l.is_concrete(index_of(ValueKind::Int)));
        assert_eq!(
            l.join(index_of(ValueKind::Int), index_of(ValueKind::Str)),
            MONOTYPE_VEC_TOP
        );
        assert_eq!(l.join(EMPTY_INDEX, index_of(ValueKind::Dbl)), MONOTYPE_VEC_TOP);
        assert!(l.is_descendant(EMPTY_INDEX, MONOTYPE_VEC_TOP));
    }

    #[test]
    fn static_empties_are_uncounted() {
        let plain = static_empty(false);
        let legacy = static_empty(true);
        assert_ne!(plain, legacy);
        assert_eq!(plain, static_empty(false), "singleton identity");
        unsafe {
            assert!(hdr_ref(plain).rc().is_uncounted());
            assert!(hdr_ref(legacy).is_legacy());
            assert_eq!(hdr_ref(plain).bespoke_index(), EMPTY_INDEX);
        }
    }
}
