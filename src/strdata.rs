//! Interned string handles used as array keys.
//!
//! `StrData` is an immortal interned string: a `Copy` handle whose equality
//! and hash are pointer identity. All handles are produced by [`StrData::intern`],
//! which deduplicates through a global concurrent cache, so two handles are
//! pointer-equal exactly when their contents are equal. Interned storage
//! lives for the whole process, matching the runtime's static-string model.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use lazy_static::lazy_static;

lazy_static! {
    static ref INTERN_CACHE: DashMap<Box<str>, &'static str> = DashMap::new();
}

/// An interned, immortal string handle.
///
/// Cloning is trivial (`Copy`), comparison is a pointer comparison, and the
/// backing bytes never move or go away.
#[derive(Copy, Clone)]
pub struct StrData(&'static str);

impl StrData {
    /// Interns `s` in the global string cache and returns its canonical
    /// handle. Repeated calls with equal contents return pointer-identical
    /// handles.
    #[must_use]
    pub fn intern(s: &str) -> Self {
        if let Some(existing) = INTERN_CACHE.get(s) {
            return StrData(*existing);
        }
        // The entry API holds the shard lock across the lookup-or-insert,
        // so concurrent interns of the same contents converge on one leak.
        let entry = *INTERN_CACHE
            .entry(Box::from(s))
            .or_insert_with(|| Box::leak(Box::from(s)));
        StrData(entry)
    }

    /// Obtains the `&str` contents. This is free.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty string.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn ptr_usize(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl PartialEq for StrData {
    fn eq(&self, other: &Self) -> bool {
        // Interning guarantees one canonical allocation per contents.
        self.ptr_usize() == other.ptr_usize()
    }
}

impl Eq for StrData {}

impl Hash for StrData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.ptr_usize());
    }
}

impl Ord for StrData {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl PartialOrd for StrData {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<str> for StrData {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl From<&str> for StrData {
    fn from(s: &str) -> Self {
        StrData::intern(s)
    }
}

impl Debug for StrData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.as_str(), f)
    }
}

impl Display for StrData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_intern() {
        let x = StrData::intern("foofoofoo");
        let y = StrData::intern("bar");
        let z = StrData::intern("foofoofoo");

        assert_eq!(x.ptr_usize(), z.ptr_usize());
        assert_ne!(x.ptr_usize(), y.ptr_usize());
        assert_eq!(x.as_str(), "foofoofoo");
        assert_eq!(y.as_str(), "bar");
    }

    #[test]
    fn pointer_equality_matches_content_equality() {
        let a = StrData::intern("key");
        let b = StrData::intern(&"key".to_string());
        assert_eq!(a, b);
        assert!(a == *"key");
        assert!(StrData::intern("a") < StrData::intern("b"));
    }
}
