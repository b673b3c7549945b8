//! Element values and array keys.
//!
//! The broader variant system of the host runtime is out of scope here;
//! `Value` is the minimal typed-value surface the array layer needs to
//! store elements, and `Key` is the arraykey subset (64-bit integers or
//! interned strings).

use std::fmt::{self, Display, Formatter};

use crate::handle::ArrayData;
use crate::strdata::StrData;

/// Discriminant of a [`Value`], used by monotype layouts to describe the
/// single element type they hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// The null value
    Null,
    /// Booleans
    Bool,
    /// 64-bit integers
    Int,
    /// 64-bit floats
    Dbl,
    /// Interned strings
    Str,
    /// Nested arrays
    Arr,
}

/// An element value. Cloning and dropping a `Value` follows the refcount
/// protocol of its payload: nested arrays are increffed on clone and
/// decreffed (and possibly released) on drop.
#[derive(Clone, Debug)]
pub enum Value {
    /// The null value
    Null,
    /// A boolean
    Bool(bool),
    /// A 64-bit integer
    Int(i64),
    /// A 64-bit float
    Dbl(f64),
    /// An interned string
    Str(StrData),
    /// A nested array
    Arr(ArrayData),
}

impl Value {
    /// The value's discriminant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Dbl(_) => ValueKind::Dbl,
            Value::Str(_) => ValueKind::Str,
            Value::Arr(_) => ValueKind::Arr,
        }
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<StrData> {
        match self {
            Value::Str(s) => Some(*s),
            _ => None,
        }
    }

    /// The array payload, if this is an `Arr`.
    pub fn as_arr(&self) -> Option<&ArrayData> {
        match self {
            Value::Arr(a) => Some(a),
            _ => None,
        }
    }

    /// Converts an arraykey-typed value into a [`Key`]. Returns `None` for
    /// values that are not valid keys.
    pub fn to_key(&self) -> Option<Key> {
        match self {
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Str(s) => Some(Key::Str(*s)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Dbl(a), Value::Dbl(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Arr(a), Value::Arr(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Dbl(v)
    }
}

impl From<StrData> for Value {
    fn from(v: StrData) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(StrData::intern(v))
    }
}

impl From<ArrayData> for Value {
    fn from(v: ArrayData) -> Self {
        Value::Arr(v)
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        match k {
            Key::Int(i) => Value::Int(i),
            Key::Str(s) => Value::Str(s),
        }
    }
}

/// An array key: a 64-bit integer or an interned string handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Integer key
    Int(i64),
    /// Interned string key
    Str(StrData),
}

impl Key {
    /// The key as a value.
    pub fn to_value(self) -> Value {
        self.into()
    }

    /// The string payload, if any.
    pub fn as_str(self) -> Option<StrData> {
        match self {
            Key::Str(s) => Some(s),
            Key::Int(_) => None,
        }
    }
}

// Integer keys sort before string keys; within a class, natural order.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Str(a), Key::Str(b)) => a.cmp(b),
            (Key::Int(_), Key::Str(_)) => std::cmp::Ordering::Less,
            (Key::Str(_), Key::Int(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for Key {
    fn from(k: i64) -> Self {
        Key::Int(k)
    }
}

impl From<StrData> for Key {
    fn from(k: StrData) -> Self {
        Key::Str(k)
    }
}

impl From<&str> for Key {
    fn from(k: &str) -> Self {
        Key::Str(StrData::intern(k))
    }
}
