//! The fixed-size header shared by every backing layout, the kind tag, and
//! the intrusive refcount.
//!
//! An array handle is a bare `NonNull<Header>`: there is no per-instance
//! vtable pointer. Every concrete layout struct is `#[repr(C)]` with a
//! `Header` as its first field, so a handle can be classified (and
//! dispatched through the global function table) from the header alone, and
//! downcast to its concrete layout with a pointer cast.

use std::cell::Cell;
use std::ptr::NonNull;

use crate::bespoke::layout::LayoutIndex;
use crate::options::ProvTag;

/// A raw array handle: a pointer to the header prefix of some layout.
pub(crate) type Ad = NonNull<Header>;

/// Shorthand for viewing a raw handle's header. The pointer must reference
/// a live allocation headed by a `Header`.
pub(crate) unsafe fn hdr_ref<'a>(ad: Ad) -> &'a Header {
    &*ad.as_ptr()
}

/// Number of kind slots in the dispatch table (vanilla + bespoke).
pub const NUM_KINDS: usize = 10;

/// This bit is set for bespoke kinds, and not for vanilla kinds.
pub(crate) const BESPOKE_KIND_MASK: u8 = 0x01;

/// Runtime kind tag of the possible array layouts.
///
/// The numeric values are load-bearing, not incidental: bit 0 is the
/// bespoke bit, the values are contiguous from 0 so the tag can index the
/// dispatch table, and legacy-mode compatibility checks are range
/// comparisons over the raw values. The `const` assertions below pin the
/// order; don't reorder variants without auditing them.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    /// darray: legacy dict-like array with int or string keys
    Mixed = 0,
    /// Bespoke layout with darray semantics
    BespokeMixed = 1,
    /// varray: legacy vec-like array with keys in `[0..size)`
    Packed = 2,
    /// Bespoke layout with varray semantics
    BespokePacked = 3,
    /// Modern associative array
    Dict = 4,
    /// Bespoke layout with dict semantics
    BespokeDict = 5,
    /// Modern ordered array
    Vec = 6,
    /// Bespoke layout with vec semantics
    BespokeVec = 7,
    /// Unique-set of arraykeys; elements are their own keys
    Keyset = 8,
    /// Bespoke layout with keyset semantics
    BespokeKeyset = 9,
}

const _: () = {
    assert!(Kind::Mixed as u8 == 0);
    assert!(Kind::BespokeMixed as u8 == 1);
    assert!(Kind::Packed as u8 == 2);
    assert!(Kind::BespokePacked as u8 == 3);
    assert!(Kind::Dict as u8 == 4);
    assert!(Kind::BespokeDict as u8 == 5);
    assert!(Kind::Vec as u8 == 6);
    assert!(Kind::BespokeVec as u8 == 7);
    assert!(Kind::Keyset as u8 == 8);
    assert!(Kind::BespokeKeyset as u8 == 9);
    assert!(NUM_KINDS == 10);
};

impl Kind {
    /// Whether `k` is a declared kind value.
    pub fn is_valid(k: u8) -> bool {
        (k as usize) < NUM_KINDS
    }

    pub(crate) fn from_u8(k: u8) -> Kind {
        debug_assert!(Kind::is_valid(k), "invalid kind byte {:#x}", k);
        // Safety: the tag invariant guarantees only declared values are
        // ever stored in a header.
        unsafe { std::mem::transmute(k) }
    }

    /// Whether this is a vanilla (statically compiled) kind. One bit test.
    pub fn is_vanilla(self) -> bool {
        self as u8 & BESPOKE_KIND_MASK == 0
    }

    /// The vanilla kind of this kind's family.
    pub fn vanilla(self) -> Kind {
        Kind::from_u8(self as u8 & !BESPOKE_KIND_MASK)
    }

    /// The bespoke kind of this kind's family.
    pub fn bespoke(self) -> Kind {
        Kind::from_u8(self as u8 | BESPOKE_KIND_MASK)
    }

    /// Whether both kinds are vanilla. One OR-then-mask test.
    pub fn both_vanilla(a: Kind, b: Kind) -> bool {
        (a as u8 | b as u8) & BESPOKE_KIND_MASK == 0
    }

    /// The kind's name, for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Mixed => "darray",
            Kind::BespokeMixed => "bespoke darray",
            Kind::Packed => "varray",
            Kind::BespokePacked => "bespoke varray",
            Kind::Dict => "dict",
            Kind::BespokeDict => "bespoke dict",
            Kind::Vec => "vec",
            Kind::BespokeVec => "bespoke vec",
            Kind::Keyset => "keyset",
            Kind::BespokeKeyset => "bespoke keyset",
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Refcount

/// Refcount value of uncounted/static arrays. Never incremented or
/// decremented; such arrays are immortal.
const UNCOUNTED: u32 = u32::MAX;

/// Sticky "marked shared" bit. While set, `has_exactly_one_ref()` is false
/// even with a single owner, so every in-place fast path refuses and takes
/// the copy path instead.
const SHARED_MARK: u32 = 1 << 30;

/// The intrusive reference count. Three states:
/// counted (ordinary shared ownership), uncounted/static (immortal), and
/// marked-shared (counted, with in-place mutation disabled).
pub(crate) struct RefCount(Cell<u32>);

impl RefCount {
    pub(crate) fn counted() -> RefCount {
        RefCount(Cell::new(1))
    }

    pub(crate) fn uncounted() -> RefCount {
        RefCount(Cell::new(UNCOUNTED))
    }

    pub(crate) fn is_uncounted(&self) -> bool {
        self.0.get() == UNCOUNTED
    }

    /// The current count, ignoring the shared mark. Meaningless for
    /// uncounted arrays.
    pub(crate) fn count(&self) -> u32 {
        self.0.get() & !SHARED_MARK
    }

    /// Gate for in-place mutation fast paths.
    pub(crate) fn has_exactly_one_ref(&self) -> bool {
        self.0.get() == 1
    }

    pub(crate) fn has_multiple_refs(&self) -> bool {
        !self.is_uncounted() && self.0.get() != 1
    }

    /// Sets the sticky shared mark. No-op on uncounted arrays, which are
    /// already excluded from in-place mutation.
    pub(crate) fn mark_shared(&self) {
        if !self.is_uncounted() {
            self.0.set(self.0.get() | SHARED_MARK);
        }
    }

    pub(crate) fn inc(&self) {
        if !self.is_uncounted() {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Decrements and reports whether the caller was the last owner and
    /// must now invoke the kind's release entry. Always false for
    /// uncounted arrays.
    pub(crate) fn dec_release_check(&self) -> bool {
        if self.is_uncounted() {
            return false;
        }
        let v = self.0.get();
        debug_assert!(v & !SHARED_MARK > 0, "refcount underflow");
        self.0.set(v - 1);
        (v - 1) & !SHARED_MARK == 0
    }
}

///////////////////////////////////////////////////////////////////////////
// Flags

/// Indicates a typed value co-allocated after this array in the host's
/// persistence format. Owned by that format; this layer only stores the
/// bit and keeps it out of the copied aux set.
pub(crate) const F_HAS_COALLOC_TV: u8 = 1;
/// Indicates this vec/dict should use legacy (PHP-compatible) behaviors.
pub(crate) const F_LEGACY: u8 = 2;
/// Indicates a side table describing this array's static-string keys.
pub(crate) const F_HAS_SIDE_TABLE: u8 = 4;
/// Indicates this array was sampled for layout logging.
pub(crate) const F_SAMPLED: u8 = 8;

/// The vanilla `extra` value: no provenance tag, no bespoke index.
pub(crate) const DEFAULT_VANILLA_EXTRA: u32 = u32::MAX;

/// The fixed-size prefix shared by every backing layout.
///
/// `extra` has two mutually exclusive, process-wide interpretations: a
/// provenance tag (when provenance mode is on), or - for bespoke arrays -
/// 16 private bits in the low half and the layout index in the high half.
/// All access goes through the accessors below; there is deliberately no
/// other way to touch the raw bits.
#[repr(C)]
pub struct Header {
    rc: RefCount,
    size: Cell<u32>,
    kind: Cell<u8>,
    aux: Cell<u8>,
    extra: Cell<u32>,
}

impl Header {
    pub(crate) fn counted(kind: Kind, aux: u8, size: usize) -> Header {
        debug_assert!(size <= u32::MAX as usize);
        Header {
            rc: RefCount::counted(),
            size: Cell::new(size as u32),
            kind: Cell::new(kind as u8),
            aux: Cell::new(aux),
            extra: Cell::new(DEFAULT_VANILLA_EXTRA),
        }
    }

    pub(crate) fn uncounted(kind: Kind, aux: u8) -> Header {
        Header {
            rc: RefCount::uncounted(),
            size: Cell::new(0),
            kind: Cell::new(kind as u8),
            aux: Cell::new(aux),
            extra: Cell::new(DEFAULT_VANILLA_EXTRA),
        }
    }

    pub(crate) fn rc(&self) -> &RefCount {
        &self.rc
    }

    /// The array kind. Requires a valid tag byte; a header holding an
    /// undeclared value makes every further operation undefined.
    pub fn kind(&self) -> Kind {
        debug_assert!(Kind::is_valid(self.kind.get()));
        Kind::from_u8(self.kind.get())
    }

    /// In-place kind change, used by same-shape conversions. Requires an
    /// exclusively owned header.
    pub(crate) fn set_kind(&self, kind: Kind) {
        debug_assert!(!self.rc.has_multiple_refs());
        self.kind.set(kind as u8);
    }

    pub(crate) fn size(&self) -> usize {
        self.size.get() as usize
    }

    pub(crate) fn set_size(&self, size: usize) {
        debug_assert!(size <= u32::MAX as usize);
        self.size.set(size as u32);
    }

    ///////////////////////////////////////////////////////////////////////
    // Flag bits

    pub(crate) fn is_legacy(&self) -> bool {
        self.aux.get() & F_LEGACY != 0
    }

    pub(crate) fn set_legacy_flag(&self, legacy: bool) {
        debug_assert!(!self.rc.has_multiple_refs());
        let aux = self.aux.get();
        self.aux
            .set(if legacy { aux | F_LEGACY } else { aux & !F_LEGACY });
    }

    pub(crate) fn is_sampled(&self) -> bool {
        self.aux.get() & F_SAMPLED != 0
    }

    pub(crate) fn set_sampled(&self) {
        debug_assert!(self.rc.has_exactly_one_ref());
        self.aux.set(self.aux.get() | F_SAMPLED);
    }

    pub(crate) fn has_coalloc_tv(&self) -> bool {
        self.aux.get() & F_HAS_COALLOC_TV != 0
    }

    pub(crate) fn set_coalloc_tv_flag(&self, on: bool) {
        debug_assert!(self.rc.has_exactly_one_ref());
        let aux = self.aux.get();
        self.aux.set(if on {
            aux | F_HAS_COALLOC_TV
        } else {
            aux & !F_HAS_COALLOC_TV
        });
    }

    pub(crate) fn has_side_table(&self) -> bool {
        self.aux.get() & F_HAS_SIDE_TABLE != 0
    }

    pub(crate) fn set_side_table_flag(&self, on: bool) {
        let aux = self.aux.get();
        self.aux.set(if on {
            aux | F_HAS_SIDE_TABLE
        } else {
            aux & !F_HAS_SIDE_TABLE
        });
    }

    /// The aux bits that survive a copy. Everything else (side table,
    /// co-allocation) describes this particular allocation and resets.
    pub(crate) fn aux_bits(&self) -> u8 {
        self.aux.get() & (F_LEGACY | F_SAMPLED)
    }

    ///////////////////////////////////////////////////////////////////////
    // The extra slot

    /// The provenance tag, if provenance mode is active and a tag was
    /// stored. Must not be called on bespoke arrays.
    pub(crate) fn prov_tag(&self) -> Option<ProvTag> {
        debug_assert!(self.kind().is_vanilla());
        if !crate::options::array_provenance() {
            return None;
        }
        match self.extra.get() {
            DEFAULT_VANILLA_EXTRA => None,
            raw => ProvTag::new(raw),
        }
    }

    pub(crate) fn set_prov_tag(&self, tag: ProvTag) {
        debug_assert!(self.kind().is_vanilla());
        debug_assert!(crate::options::array_provenance());
        self.extra.set(tag.raw());
    }

    /// Stores a bespoke layout index and the layout's 16 private bits.
    /// The index's sign bit is always set in storage, keeping the high
    /// half distinguishable from small indices in generated code.
    pub(crate) fn set_bespoke(&self, index: LayoutIndex, private: u16) {
        debug_assert!(!self.kind().is_vanilla());
        let hi = (index.raw() | 0x8000) as u32;
        self.extra.set((hi << 16) | private as u32);
    }

    /// The bespoke layout index. Must only be called on bespoke arrays.
    pub(crate) fn bespoke_index(&self) -> LayoutIndex {
        debug_assert!(!self.kind().is_vanilla());
        LayoutIndex::new(((self.extra.get() >> 16) as u16) & 0x7fff)
    }

    /// The 16 layout-private bits of a bespoke array.
    pub(crate) fn bespoke_private(&self) -> u16 {
        debug_assert!(!self.kind().is_vanilla());
        self.extra.get() as u16
    }

    pub(crate) fn copy_extra_from(&self, other: &Header) {
        self.extra.set(other.extra.get());
    }
}

/// Legacy-compatibility range checks. These rely on the declaration order
/// pinned by the `const` assertions on [`Kind`].
impl Header {
    /// darray or bespoke darray.
    pub(crate) fn is_darray(&self) -> bool {
        self.kind() as u8 <= Kind::BespokeMixed as u8
    }

    /// varray or bespoke varray.
    pub(crate) fn is_varray(&self) -> bool {
        let k = self.kind() as u8;
        k >= Kind::Packed as u8 && k <= Kind::BespokePacked as u8
    }

    /// Any legacy dvarray kind.
    pub(crate) fn is_dvarray(&self) -> bool {
        self.kind() as u8 <= Kind::BespokePacked as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_bits() {
        assert!(Kind::Vec.is_vanilla());
        assert!(!Kind::BespokeVec.is_vanilla());
        assert_eq!(Kind::Vec.bespoke(), Kind::BespokeVec);
        assert_eq!(Kind::BespokeDict.vanilla(), Kind::Dict);
        assert!(Kind::both_vanilla(Kind::Vec, Kind::Dict));
        assert!(!Kind::both_vanilla(Kind::Vec, Kind::BespokeDict));
        assert!(!Kind::both_vanilla(Kind::BespokeVec, Kind::BespokeDict));
        for k in 0..NUM_KINDS as u8 {
            assert!(Kind::is_valid(k));
            assert_eq!(Kind::from_u8(k) as u8, k);
        }
        assert!(!Kind::is_valid(NUM_KINDS as u8));
    }

    #[test]
    fn legacy_range_checks() {
        let h = Header::counted(Kind::Mixed, 0, 0);
        assert!(h.is_darray() && h.is_dvarray() && !h.is_varray());
        h.set_kind(Kind::Packed);
        assert!(h.is_varray() && h.is_dvarray() && !h.is_darray());
        h.set_kind(Kind::Dict);
        assert!(!h.is_darray() && !h.is_dvarray());
    }

    #[test]
    fn refcount_states() {
        let rc = RefCount::counted();
        assert!(rc.has_exactly_one_ref());
        rc.inc();
        assert!(rc.has_multiple_refs());
        assert!(!rc.dec_release_check());
        assert!(rc.dec_release_check());

        let rc = RefCount::uncounted();
        assert!(rc.is_uncounted());
        rc.inc();
        assert!(rc.is_uncounted());
        assert!(!rc.dec_release_check());
    }

    #[test]
    fn marked_shared_gates_fast_paths() {
        let rc = RefCount::counted();
        rc.mark_shared();
        assert!(!rc.has_exactly_one_ref());
        assert!(rc.has_multiple_refs());
        // The single real owner still releases.
        assert!(rc.dec_release_check());
    }

    #[test]
    fn aux_bits_keep_only_copyable_flags() {
        let h = Header::counted(Kind::Dict, F_LEGACY, 0);
        h.set_sampled();
        h.set_side_table_flag(true);
        h.set_coalloc_tv_flag(true);
        assert_eq!(h.aux_bits(), F_LEGACY | F_SAMPLED);
        assert!(h.has_side_table());
        assert!(h.has_coalloc_tv());
        h.set_coalloc_tv_flag(false);
        assert!(!h.has_coalloc_tv());
    }

    #[test]
    fn bespoke_extra_round_trip() {
        let h = Header::counted(Kind::BespokeVec, 0, 0);
        let idx = LayoutIndex::new(0x0d02);
        h.set_bespoke(idx, 0x1234);
        assert_eq!(h.bespoke_index(), idx);
        assert_eq!(h.bespoke_private(), 0x1234);
        // The sign bit is set in storage.
        assert_eq!(h.extra.get() >> 31, 1);
    }
}
