//! Synthesized fallbacks for bespoke operations.
//!
//! A layout that does not implement a mutator natively still has to honor
//! its contract. The shims here escalate to the equivalent vanilla array
//! and run the operation there, keeping the move discipline intact: the
//! escalated copy is released if the vanilla operation replaces or rejects
//! it, and the caller's reference to the original is never consumed on
//! error.

use crate::bespoke::BespokeOps;
use crate::dispatch::{dec_ref_and_release, kind_idx, G_ARRAY_FUNCS};
use crate::error::ArrayError;
use crate::header::{hdr_ref, Ad};
use crate::strdata::StrData;
use crate::value::{Key, Value};

pub(crate) unsafe fn get_int_throw<T: BespokeOps>(ad: Ad, key: i64) -> Result<Value, ArrayError> {
    T::get_int(ad, key).ok_or_else(|| ArrayError::MissingKey {
        kind: hdr_ref(ad).kind().name(),
        key: Key::Int(key),
    })
}

pub(crate) unsafe fn get_str_throw<T: BespokeOps>(
    ad: Ad,
    key: StrData,
) -> Result<Value, ArrayError> {
    T::get_str(ad, key).ok_or_else(|| ArrayError::MissingKey {
        kind: hdr_ref(ad).kind().name(),
        key: Key::Str(key),
    })
}

/// Runs a fallible vanilla mutator on the escalated copy, releasing the
/// copy whenever it does not become the result.
unsafe fn delegate_escalated(
    esc: Ad,
    result: Result<Ad, ArrayError>,
) -> Result<Ad, ArrayError> {
    match result {
        Ok(out) => {
            if out != esc {
                dec_ref_and_release(esc);
            }
            Ok(out)
        }
        Err(e) => {
            dec_ref_and_release(esc);
            Err(e)
        }
    }
}

pub(crate) unsafe fn set_int_move<T: BespokeOps>(
    ad: Ad,
    key: i64,
    v: Value,
) -> Result<Ad, ArrayError> {
    let esc = T::escalate_to_vanilla(ad, "set");
    delegate_escalated(esc, (G_ARRAY_FUNCS.set_int_move[kind_idx(esc)])(esc, key, v))
}

pub(crate) unsafe fn set_str_move<T: BespokeOps>(
    ad: Ad,
    key: StrData,
    v: Value,
) -> Result<Ad, ArrayError> {
    let esc = T::escalate_to_vanilla(ad, "set");
    delegate_escalated(esc, (G_ARRAY_FUNCS.set_str_move[kind_idx(esc)])(esc, key, v))
}

pub(crate) unsafe fn remove_int_move<T: BespokeOps>(ad: Ad, key: i64) -> Result<Ad, ArrayError> {
    if T::get_int(ad, key).is_none() {
        return Ok(ad);
    }
    let esc = T::escalate_to_vanilla(ad, "remove");
    delegate_escalated(esc, (G_ARRAY_FUNCS.remove_int_move[kind_idx(esc)])(esc, key))
}

pub(crate) unsafe fn remove_str_move<T: BespokeOps>(
    ad: Ad,
    key: StrData,
) -> Result<Ad, ArrayError> {
    if T::get_str(ad, key).is_none() {
        return Ok(ad);
    }
    let esc = T::escalate_to_vanilla(ad, "remove");
    delegate_escalated(esc, (G_ARRAY_FUNCS.remove_str_move[kind_idx(esc)])(esc, key))
}

pub(crate) unsafe fn append_move<T: BespokeOps>(ad: Ad, v: Value) -> Result<Ad, ArrayError> {
    let esc = T::escalate_to_vanilla(ad, "append");
    delegate_escalated(esc, (G_ARRAY_FUNCS.append_move[kind_idx(esc)])(esc, v))
}

pub(crate) unsafe fn pop_move<T: BespokeOps>(ad: Ad, out: &mut Option<Value>) -> Ad {
    if hdr_ref(ad).size() == 0 {
        *out = None;
        return ad;
    }
    let esc = T::escalate_to_vanilla(ad, "pop");
    let new = (G_ARRAY_FUNCS.pop_move[kind_idx(esc)])(esc, out);
    if new != esc {
        dec_ref_and_release(esc);
    }
    new
}

pub(crate) unsafe fn set_legacy_move<T: BespokeOps>(ad: Ad, legacy: bool) -> Ad {
    if hdr_ref(ad).is_legacy() == legacy {
        return ad;
    }
    let esc = T::escalate_to_vanilla(ad, "set legacy flag");
    let new = (G_ARRAY_FUNCS.set_legacy_move[kind_idx(esc)])(esc, legacy);
    if new != esc {
        dec_ref_and_release(esc);
    }
    new
}
