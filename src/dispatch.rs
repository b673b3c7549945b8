//! The global dispatch table.
//!
//! There is exactly one virtual-dispatch point in this crate: a static
//! table of function pointers indexed by the header's kind tag. Layouts do
//! not carry vtable pointers and handles stay thin. Every row pairs the
//! three vanilla layouts with the bespoke forwarders, following the kind
//! numbering (even slots vanilla, odd slots bespoke).
//!
//! Mutating entries use move semantics on the raw handle: they take the
//! caller's reference to `ad` and return the reference the caller owns
//! afterwards. When copy-on-write triggers, the returned handle is a fresh
//! exclusively owned array and the caller still owns its reference to the
//! original (and is responsible for releasing it). On `Err` the original
//! is unmodified and no copy has been made.

use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad, NUM_KINDS};
use crate::sort::{SortBy, SortSpec};
use crate::strdata::StrData;
use crate::value::{Key, Value};
use crate::{bespoke, vanilla};

pub(crate) type ReleaseFn = unsafe fn(Ad);
pub(crate) type CopyFn = unsafe fn(Ad) -> Ad;
pub(crate) type HeapSizeFn = unsafe fn(Ad) -> usize;
pub(crate) type ScanFn = unsafe fn(Ad, &mut dyn FnMut(&Value));
pub(crate) type GetIntFn = unsafe fn(Ad, i64) -> Option<Value>;
pub(crate) type GetStrFn = unsafe fn(Ad, StrData) -> Option<Value>;
pub(crate) type GetPosKeyFn = unsafe fn(Ad, usize) -> Key;
pub(crate) type GetPosValFn = unsafe fn(Ad, usize) -> Value;
pub(crate) type SetIntFn = unsafe fn(Ad, i64, Value) -> Result<Ad, ArrayError>;
pub(crate) type SetStrFn = unsafe fn(Ad, StrData, Value) -> Result<Ad, ArrayError>;
pub(crate) type RemoveIntFn = unsafe fn(Ad, i64) -> Result<Ad, ArrayError>;
pub(crate) type RemoveStrFn = unsafe fn(Ad, StrData) -> Result<Ad, ArrayError>;
pub(crate) type AppendFn = unsafe fn(Ad, Value) -> Result<Ad, ArrayError>;
pub(crate) type PopFn = unsafe fn(Ad, &mut Option<Value>) -> Ad;
pub(crate) type IterPosFn = unsafe fn(Ad) -> usize;
pub(crate) type IterStepFn = unsafe fn(Ad, usize) -> usize;
pub(crate) type IsVectorDataFn = unsafe fn(Ad) -> bool;
pub(crate) type EscalateForSortFn = unsafe fn(Ad, SortBy) -> Ad;
pub(crate) type SortFn = unsafe fn(Ad, &mut SortSpec<'_>);
pub(crate) type SetLegacyFn = unsafe fn(Ad, bool) -> Ad;

/// One row per operation, one column per kind. Indexed by `Kind as u8`.
pub(crate) struct ArrayFunctions {
    pub release: [ReleaseFn; NUM_KINDS],
    pub copy: [CopyFn; NUM_KINDS],
    pub heap_size: [HeapSizeFn; NUM_KINDS],
    pub scan: [ScanFn; NUM_KINDS],
    pub get_int: [GetIntFn; NUM_KINDS],
    pub get_str: [GetStrFn; NUM_KINDS],
    pub get_pos_key: [GetPosKeyFn; NUM_KINDS],
    pub get_pos_val: [GetPosValFn; NUM_KINDS],
    pub set_int_move: [SetIntFn; NUM_KINDS],
    pub set_str_move: [SetStrFn; NUM_KINDS],
    pub remove_int_move: [RemoveIntFn; NUM_KINDS],
    pub remove_str_move: [RemoveStrFn; NUM_KINDS],
    pub append_move: [AppendFn; NUM_KINDS],
    pub pop_move: [PopFn; NUM_KINDS],
    pub iter_begin: [IterPosFn; NUM_KINDS],
    pub iter_last: [IterPosFn; NUM_KINDS],
    pub iter_end: [IterPosFn; NUM_KINDS],
    pub iter_advance: [IterStepFn; NUM_KINDS],
    pub iter_rewind: [IterStepFn; NUM_KINDS],
    pub is_vector_data: [IsVectorDataFn; NUM_KINDS],
    pub escalate_for_sort: [EscalateForSortFn; NUM_KINDS],
    pub sort: [SortFn; NUM_KINDS],
    pub set_legacy_move: [SetLegacyFn; NUM_KINDS],
}

/// Builds one table row. Mixed backs both darray and dict, packed backs
/// both varray and vec; all odd (bespoke) slots forward through the layout
/// vtable.
macro_rules! dispatch_row {
    ($op:ident: $ty:ty) => {
        [
            vanilla::mixed::$op as $ty,
            bespoke::$op as $ty,
            vanilla::packed::$op as $ty,
            bespoke::$op as $ty,
            vanilla::mixed::$op as $ty,
            bespoke::$op as $ty,
            vanilla::packed::$op as $ty,
            bespoke::$op as $ty,
            vanilla::keyset::$op as $ty,
            bespoke::$op as $ty,
        ]
    };
}

pub(crate) static G_ARRAY_FUNCS: ArrayFunctions = ArrayFunctions {
    release: dispatch_row!(release: ReleaseFn),
    copy: dispatch_row!(copy: CopyFn),
    heap_size: dispatch_row!(heap_size: HeapSizeFn),
    scan: dispatch_row!(scan: ScanFn),
    get_int: dispatch_row!(get_int: GetIntFn),
    get_str: dispatch_row!(get_str: GetStrFn),
    get_pos_key: dispatch_row!(get_pos_key: GetPosKeyFn),
    get_pos_val: dispatch_row!(get_pos_val: GetPosValFn),
    set_int_move: dispatch_row!(set_int_move: SetIntFn),
    set_str_move: dispatch_row!(set_str_move: SetStrFn),
    remove_int_move: dispatch_row!(remove_int_move: RemoveIntFn),
    remove_str_move: dispatch_row!(remove_str_move: RemoveStrFn),
    append_move: dispatch_row!(append_move: AppendFn),
    pop_move: dispatch_row!(pop_move: PopFn),
    iter_begin: dispatch_row!(iter_begin: IterPosFn),
    iter_last: dispatch_row!(iter_last: IterPosFn),
    iter_end: dispatch_row!(iter_end: IterPosFn),
    iter_advance: dispatch_row!(iter_advance: IterStepFn),
    iter_rewind: dispatch_row!(iter_rewind: IterStepFn),
    is_vector_data: dispatch_row!(is_vector_data: IsVectorDataFn),
    escalate_for_sort: dispatch_row!(escalate_for_sort: EscalateForSortFn),
    sort: dispatch_row!(sort: SortFn),
    set_legacy_move: dispatch_row!(set_legacy_move: SetLegacyFn),
};

/// The table column for this handle's kind.
///
/// # Safety
///
/// `ad` must point to a live array allocation.
#[inline]
pub(crate) unsafe fn kind_idx(ad: Ad) -> usize {
    hdr_ref(ad).kind() as usize
}

/// Runs the kind's release entry. The handle is dead afterwards.
///
/// # Safety
///
/// `ad` must be a live counted array with a zero refcount (the caller just
/// observed the last decrement) and no outstanding references.
pub(crate) unsafe fn release(ad: Ad) {
    debug_assert!(!hdr_ref(ad).rc().is_uncounted());
    (G_ARRAY_FUNCS.release[kind_idx(ad)])(ad)
}

/// Drops one reference, releasing the array if it was the last. The sole
/// relinquish path in the crate.
///
/// # Safety
///
/// `ad` must be a live array the caller owns one reference to; the caller
/// must not use `ad` afterwards.
pub(crate) unsafe fn dec_ref_and_release(ad: Ad) {
    if hdr_ref(ad).rc().dec_release_check() {
        release(ad);
    }
}

/// Returns a counted, exclusively owned copy of `ad`. Copy-on-write aux
/// bits carry over; allocation-specific state (side tables) does not.
///
/// # Safety
///
/// `ad` must be a live array.
pub(crate) unsafe fn copy(ad: Ad) -> Ad {
    (G_ARRAY_FUNCS.copy[kind_idx(ad)])(ad)
}

/// The copy-on-write step every mutator runs after validation: returns
/// `ad` itself when it is exclusively owned, or a fresh copy otherwise.
/// Does not touch the original's refcount either way.
///
/// # Safety
///
/// `ad` must be a live array.
#[inline]
pub(crate) unsafe fn ensure_exclusive(ad: Ad) -> Ad {
    if hdr_ref(ad).rc().has_exactly_one_ref() {
        ad
    } else {
        copy(ad)
    }
}
