//! Checked downcasts from a raw header pointer to a concrete layout.
//!
//! Every concrete layout is `#[repr(C)]` with a [`Header`] first field, so
//! the downcast itself is a pointer cast. The check that the header really
//! belongs to the requested layout is debug-only; release builds trust the
//! kind tag invariant.

use crate::header::{Ad, Header};

/// Implemented by every concrete array layout struct.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` with a `Header` as their first field,
/// and `matches` must return true only for headers that genuinely prefix an
/// instance of `Self`.
pub(crate) unsafe trait ArrayRepr {
    /// Whether `h` is the header of an instance of this layout.
    fn matches(h: &Header) -> bool;
}

/// Downcasts `ad` to a shared reference to the concrete layout.
///
/// # Safety
///
/// `ad` must point to a live allocation whose concrete type is `T`.
#[inline]
pub(crate) unsafe fn cast_ref<'a, T: ArrayRepr>(ad: Ad) -> &'a T {
    #[cfg(debug_assertions)]
    {
        let h = &*ad.as_ptr();
        assert!(
            T::matches(h),
            "layout cast mismatch: header is {}",
            h.kind().name()
        );
    }
    &*ad.as_ptr().cast::<T>()
}

/// Downcasts `ad` to an exclusive reference to the concrete layout.
///
/// # Safety
///
/// `ad` must point to a live allocation whose concrete type is `T`, and no
/// other reference to it may exist for the returned lifetime.
#[inline]
pub(crate) unsafe fn cast_mut<'a, T: ArrayRepr>(ad: Ad) -> &'a mut T {
    #[cfg(debug_assertions)]
    {
        let h = &*ad.as_ptr();
        assert!(
            T::matches(h),
            "layout cast mismatch: header is {}",
            h.kind().name()
        );
    }
    &mut *ad.as_ptr().cast::<T>()
}
