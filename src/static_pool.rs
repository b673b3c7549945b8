//! The immortal empty-array singletons.
//!
//! Empty arrays are by far the most common arrays in a running program, so
//! each vanilla kind (and each legacy-flag state of the dvarray-capable
//! kinds) has one uncounted singleton that every empty-array factory
//! returns. Singletons are never mutated: their refcount state routes any
//! mutation through the copy path.

use lazy_static::lazy_static;

use crate::header::{Ad, Kind};
use crate::vanilla;

/// A raw handle that is safe to share across threads because the array it
/// names is uncounted, immutable, and lives forever.
pub(crate) struct Immortal(pub(crate) Ad);

// Safety: immortal arrays are never written after construction and are
// never released.
unsafe impl Send for Immortal {}
unsafe impl Sync for Immortal {}

lazy_static! {
    static ref EMPTY_MIXED: Immortal = Immortal(vanilla::mixed::alloc_static(Kind::Mixed, false));
    static ref EMPTY_MIXED_LEGACY: Immortal =
        Immortal(vanilla::mixed::alloc_static(Kind::Mixed, true));
    static ref EMPTY_PACKED: Immortal =
        Immortal(vanilla::packed::alloc_static(Kind::Packed, false));
    static ref EMPTY_PACKED_LEGACY: Immortal =
        Immortal(vanilla::packed::alloc_static(Kind::Packed, true));
    static ref EMPTY_DICT: Immortal = Immortal(vanilla::mixed::alloc_static(Kind::Dict, false));
    static ref EMPTY_DICT_LEGACY: Immortal =
        Immortal(vanilla::mixed::alloc_static(Kind::Dict, true));
    static ref EMPTY_VEC: Immortal = Immortal(vanilla::packed::alloc_static(Kind::Vec, false));
    static ref EMPTY_VEC_LEGACY: Immortal =
        Immortal(vanilla::packed::alloc_static(Kind::Vec, true));
    static ref EMPTY_KEYSET: Immortal = Immortal(vanilla::keyset::alloc_static());
}

/// The empty singleton for a vanilla kind. Keysets have no legacy state.
pub(crate) fn static_empty(kind: Kind, legacy: bool) -> Ad {
    match (kind, legacy) {
        (Kind::Mixed, false) => EMPTY_MIXED.0,
        (Kind::Mixed, true) => EMPTY_MIXED_LEGACY.0,
        (Kind::Packed, false) => EMPTY_PACKED.0,
        (Kind::Packed, true) => EMPTY_PACKED_LEGACY.0,
        (Kind::Dict, false) => EMPTY_DICT.0,
        (Kind::Dict, true) => EMPTY_DICT_LEGACY.0,
        (Kind::Vec, false) => EMPTY_VEC.0,
        (Kind::Vec, true) => EMPTY_VEC_LEGACY.0,
        (Kind::Keyset, _) => EMPTY_KEYSET.0,
        (k, _) => unreachable!("no static singleton for {}", k.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::hdr_ref;

    #[test]
    fn singletons_are_uncounted_and_stable() {
        for kind in [Kind::Mixed, Kind::Packed, Kind::Dict, Kind::Vec, Kind::Keyset] {
            for legacy in [false, true] {
                let ad = static_empty(kind, legacy);
                assert_eq!(ad, static_empty(kind, legacy), "same handle every call");
                unsafe {
                    let h = hdr_ref(ad);
                    assert!(h.rc().is_uncounted());
                    assert_eq!(h.size(), 0);
                    assert_eq!(h.kind(), kind);
                    if kind != Kind::Keyset {
                        assert_eq!(h.is_legacy(), legacy);
                    }
                }
            }
        }
    }

    #[test]
    fn legacy_and_plain_are_distinct() {
        assert_ne!(
            static_empty(Kind::Vec, false),
            static_empty(Kind::Vec, true)
        );
    }
}
