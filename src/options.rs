//! Process-wide mode flags and the provenance tag slot.
//!
//! The host runtime decides, once per process, whether legacy dvarray
//! factories produce modern Hack arrays (`hack_arrays`) and whether array
//! provenance is tracked. Provenance and bespoke layouts share the header's
//! `extra` field, so they are mutually exclusive for the whole process;
//! enabling both is a fatal configuration error.

use std::sync::atomic::{AtomicBool, Ordering};

static HACK_ARRAYS: AtomicBool = AtomicBool::new(false);
static ARRAY_PROVENANCE: AtomicBool = AtomicBool::new(false);

/// Whether the legacy-array factories (`create_varray`/`create_darray`)
/// produce modern vec/dict arrays instead. Read on every factory call;
/// callers must not cache arrays obtained from a factory across a flip.
pub fn hack_arrays() -> bool {
    HACK_ARRAYS.load(Ordering::Relaxed)
}

/// Set the `hack_arrays` mode flag.
pub fn set_hack_arrays(on: bool) {
    HACK_ARRAYS.store(on, Ordering::Relaxed);
}

/// Whether provenance tags are stored in array headers.
pub fn array_provenance() -> bool {
    ARRAY_PROVENANCE.load(Ordering::Relaxed)
}

/// Enable or disable provenance tracking.
///
/// # Panics
///
/// Panics if the bespoke layout hierarchy has already been sealed:
/// provenance tags and bespoke layout indices occupy the same header slot
/// and can never coexist in one process.
pub fn set_array_provenance(on: bool) {
    if on && crate::bespoke::layout::is_sealed() {
        panic!("array provenance and bespoke layouts are mutually exclusive");
    }
    ARRAY_PROVENANCE.store(on, Ordering::Relaxed);
}

/// A provenance tag: an opaque token naming the creation site of an array
/// value. Only the storage slot lives in this layer; producing meaningful
/// tags is the host's job. Zero is reserved for "no tag".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProvTag(u32);

impl ProvTag {
    /// Wrap a raw nonzero tag value.
    pub fn new(raw: u32) -> Option<ProvTag> {
        if raw == 0 {
            None
        } else {
            Some(ProvTag(raw))
        }
    }

    /// The raw tag value.
    pub fn raw(self) -> u32 {
        self.0
    }
}
