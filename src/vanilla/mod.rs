//! The vanilla (statically compiled) layouts: packed, mixed, and keyset.
//!
//! Each module exports the full operation set as free functions with the
//! exact signatures of the dispatch table rows. Packed backs the varray
//! and vec kinds, mixed backs darray and dict, keyset backs itself.

pub(crate) mod keyset;
pub(crate) mod mixed;
pub(crate) mod packed;
