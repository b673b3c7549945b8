//! Bespoke (runtime-registered) layouts.
//!
//! A bespoke array's header carries a layout index instead of pointing at
//! one of the compiled-in vanilla layouts. The odd dispatch-table slots all
//! land in the forwarders here, which look up the family vtable in the
//! sealed hierarchy and tail-call through it. A layout implements the
//! [`BespokeOps`] trait; operations it does not support natively fall back
//! to synthesized defaults that escalate to the equivalent vanilla array
//! and retry there.

pub mod layout;
pub mod monotype;
mod synth;

use std::sync::Once;

use crate::dispatch::{
    AppendFn, CopyFn, EscalateForSortFn, GetIntFn, GetPosKeyFn, GetPosValFn, GetStrFn,
    HeapSizeFn, IsVectorDataFn, IterPosFn, IterStepFn, PopFn, ReleaseFn, RemoveIntFn,
    RemoveStrFn, ScanFn, SetIntFn, SetLegacyFn, SetStrFn,
};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad};
use crate::sort::{SortBy, SortSpec};
use crate::strdata::StrData;
use crate::value::{Key, Value};

/// Escalation entry: returns a fresh counted vanilla array with the same
/// entries. The caller keeps its reference to the original.
pub(crate) type EscalateFn = unsafe fn(Ad, &'static str) -> Ad;
pub(crate) type GetIntThrowFn = unsafe fn(Ad, i64) -> Result<Value, ArrayError>;
pub(crate) type GetStrThrowFn = unsafe fn(Ad, StrData) -> Result<Value, ArrayError>;

/// The per-family operation table. One static instance exists per layout
/// family; the hierarchy maps family bytes to these at seal time.
pub struct LayoutVtable {
    pub(crate) release: ReleaseFn,
    pub(crate) copy: CopyFn,
    pub(crate) heap_size: HeapSizeFn,
    pub(crate) scan: ScanFn,
    pub(crate) get_int: GetIntFn,
    pub(crate) get_str: GetStrFn,
    pub(crate) get_int_throw: GetIntThrowFn,
    pub(crate) get_str_throw: GetStrThrowFn,
    pub(crate) get_pos_key: GetPosKeyFn,
    pub(crate) get_pos_val: GetPosValFn,
    pub(crate) set_int_move: SetIntFn,
    pub(crate) set_str_move: SetStrFn,
    pub(crate) remove_int_move: RemoveIntFn,
    pub(crate) remove_str_move: RemoveStrFn,
    pub(crate) append_move: AppendFn,
    pub(crate) pop_move: PopFn,
    pub(crate) iter_begin: IterPosFn,
    pub(crate) iter_last: IterPosFn,
    pub(crate) iter_end: IterPosFn,
    pub(crate) iter_advance: IterStepFn,
    pub(crate) iter_rewind: IterStepFn,
    pub(crate) is_vector_data: IsVectorDataFn,
    pub(crate) escalate_to_vanilla: EscalateFn,
    pub(crate) set_legacy_move: SetLegacyFn,
}

/// Operations a bespoke layout provides. Structural ops are required;
/// mutators default to synthesized escalate-and-retry implementations, so
/// a minimal layout only has to know how to read itself and how to turn
/// itself into a vanilla array.
///
/// # Safety
///
/// Every implementation must treat `ad` as a handle to its own concrete
/// representation; the dispatcher guarantees the header's layout index
/// belongs to this layout's family.
pub(crate) unsafe trait BespokeOps: Sized {
    unsafe fn release(ad: Ad);
    unsafe fn copy(ad: Ad) -> Ad;
    unsafe fn heap_size(ad: Ad) -> usize;
    unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value));
    unsafe fn get_int(ad: Ad, key: i64) -> Option<Value>;
    unsafe fn get_str(ad: Ad, key: StrData) -> Option<Value>;
    unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key;
    unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value;
    unsafe fn iter_begin(ad: Ad) -> usize;
    unsafe fn iter_last(ad: Ad) -> usize;
    unsafe fn iter_end(ad: Ad) -> usize;
    unsafe fn iter_advance(ad: Ad, pos: usize) -> usize;
    unsafe fn iter_rewind(ad: Ad, pos: usize) -> usize;
    unsafe fn is_vector_data(ad: Ad) -> bool;
    unsafe fn escalate_to_vanilla(ad: Ad, why: &'static str) -> Ad;

    unsafe fn get_int_throw(ad: Ad, key: i64) -> Result<Value, ArrayError> {
        synth::get_int_throw::<Self>(ad, key)
    }
    unsafe fn get_str_throw(ad: Ad, key: StrData) -> Result<Value, ArrayError> {
        synth::get_str_throw::<Self>(ad, key)
    }
    unsafe fn set_int_move(ad: Ad, key: i64, v: Value) -> Result<Ad, ArrayError> {
        synth::set_int_move::<Self>(ad, key, v)
    }
    unsafe fn set_str_move(ad: Ad, key: StrData, v: Value) -> Result<Ad, ArrayError> {
        synth::set_str_move::<Self>(ad, key, v)
    }
    unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
        synth::remove_int_move::<Self>(ad, key)
    }
    unsafe fn remove_str_move(ad: Ad, key: StrData) -> Result<Ad, ArrayError> {
        synth::remove_str_move::<Self>(ad, key)
    }
    unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
        synth::append_move::<Self>(ad, v)
    }
    unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
        synth::pop_move::<Self>(ad, out)
    }
    unsafe fn set_legacy_move(ad: Ad, legacy: bool) -> Ad {
        synth::set_legacy_move::<Self>(ad, legacy)
    }
}

/// Builds a layout's vtable from its trait implementation. Purely fn-item
/// coercion, so family vtables can live in statics.
pub(crate) const fn vtable_of<T: BespokeOps>() -> LayoutVtable {
    LayoutVtable {
        release: T::release,
        copy: T::copy,
        heap_size: T::heap_size,
        scan: T::scan,
        get_int: T::get_int,
        get_str: T::get_str,
        get_int_throw: T::get_int_throw,
        get_str_throw: T::get_str_throw,
        get_pos_key: T::get_pos_key,
        get_pos_val: T::get_pos_val,
        set_int_move: T::set_int_move,
        set_str_move: T::set_str_move,
        remove_int_move: T::remove_int_move,
        remove_str_move: T::remove_str_move,
        append_move: T::append_move,
        pop_move: T::pop_move,
        iter_begin: T::iter_begin,
        iter_last: T::iter_last,
        iter_end: T::iter_end,
        iter_advance: T::iter_advance,
        iter_rewind: T::iter_rewind,
        is_vector_data: T::is_vector_data,
        escalate_to_vanilla: T::escalate_to_vanilla,
        set_legacy_move: T::set_legacy_move,
    }
}

static SEAL_ONCE: Once = Once::new();

/// Registers the standard bespoke layouts and seals the hierarchy. Safe to
/// call any number of times from any thread; only the first call builds.
pub fn ensure_hierarchy() {
    SEAL_ONCE.call_once(|| {
        let mut b = layout::LatticeBuilder::new();
        monotype::register(&mut b);
        layout::seal(b.finalize());
    });
}

/// Family vtable for a bespoke handle, with a dispatch trace.
unsafe fn vt(ad: Ad) -> &'static LayoutVtable {
    let h = hdr_ref(ad);
    let idx = h.bespoke_index();
    log::trace!(
        "bespoke dispatch: layout {:#06x} ({})",
        idx.raw(),
        h.kind().name()
    );
    layout::lattice().vtable_for_family(idx.family())
}

///////////////////////////////////////////////////////////////////////////
// Dispatch-table forwarders for the odd (bespoke) kind slots.

pub(crate) unsafe fn release(ad: Ad) {
    (vt(ad).release)(ad)
}

pub(crate) unsafe fn copy(ad: Ad) -> Ad {
    (vt(ad).copy)(ad)
}

pub(crate) unsafe fn heap_size(ad: Ad) -> usize {
    (vt(ad).heap_size)(ad)
}

pub(crate) unsafe fn scan(ad: Ad, f: &mut dyn FnMut(&Value)) {
    (vt(ad).scan)(ad, f)
}

pub(crate) unsafe fn get_int(ad: Ad, key: i64) -> Option<Value> {
    (vt(ad).get_int)(ad, key)
}

pub(crate) unsafe fn get_str(ad: Ad, key: StrData) -> Option<Value> {
    (vt(ad).get_str)(ad, key)
}

pub(crate) unsafe fn get_int_throw(ad: Ad, key: i64) -> Result<Value, ArrayError> {
    (vt(ad).get_int_throw)(ad, key)
}

pub(crate) unsafe fn get_str_throw(ad: Ad, key: StrData) -> Result<Value, ArrayError> {
    (vt(ad).get_str_throw)(ad, key)
}

pub(crate) unsafe fn get_pos_key(ad: Ad, pos: usize) -> Key {
    (vt(ad).get_pos_key)(ad, pos)
}

pub(crate) unsafe fn get_pos_val(ad: Ad, pos: usize) -> Value {
    (vt(ad).get_pos_val)(ad, pos)
}

pub(crate) unsafe fn set_int_move(ad: Ad, key: i64, v: Value) -> Result<Ad, ArrayError> {
    (vt(ad).set_int_move)(ad, key, v)
}

pub(crate) unsafe fn set_str_move(ad: Ad, key: StrData, v: Value) -> Result<Ad, ArrayError> {
    (vt(ad).set_str_move)(ad, key, v)
}

pub(crate) unsafe fn remove_int_move(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
    (vt(ad).remove_int_move)(ad, key)
}

pub(crate) unsafe fn remove_str_move(ad: Ad, key: StrData) -> Result<Ad, ArrayError> {
    (vt(ad).remove_str_move)(ad, key)
}

pub(crate) unsafe fn append_move(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
    (vt(ad).append_move)(ad, v)
}

pub(crate) unsafe fn pop_move(ad: Ad, out: &mut Option<Value>) -> Ad {
    (vt(ad).pop_move)(ad, out)
}

pub(crate) unsafe fn iter_begin(ad: Ad) -> usize {
    (vt(ad).iter_begin)(ad)
}

pub(crate) unsafe fn iter_last(ad: Ad) -> usize {
    (vt(ad).iter_last)(ad)
}

pub(crate) unsafe fn iter_end(ad: Ad) -> usize {
    (vt(ad).iter_end)(ad)
}

pub(crate) unsafe fn iter_advance(ad: Ad, pos: usize) -> usize {
    (vt(ad).iter_advance)(ad, pos)
}

pub(crate) unsafe fn iter_rewind(ad: Ad, pos: usize) -> usize {
    (vt(ad).iter_rewind)(ad, pos)
}

pub(crate) unsafe fn is_vector_data(ad: Ad) -> bool {
    (vt(ad).is_vector_data)(ad)
}

pub(crate) unsafe fn escalate_for_sort(ad: Ad, _by: SortBy) -> Ad {
    escalate_to_vanilla(ad, "sort")
}

/// Escalates a bespoke handle to a fresh vanilla array with the same
/// entries. The caller keeps its reference to the original.
pub(crate) unsafe fn escalate_to_vanilla(ad: Ad, why: &'static str) -> Ad {
    (vt(ad).escalate_to_vanilla)(ad, why)
}

pub(crate) unsafe fn sort(_ad: Ad, _spec: &mut SortSpec<'_>) {
    unreachable!("bespoke arrays escalate to vanilla before sorting");
}

pub(crate) unsafe fn set_legacy_move(ad: Ad, legacy: bool) -> Ad {
    (vt(ad).set_legacy_move)(ad, legacy)
}
