//! Sort specifications and the comparison functions behind them.
//!
//! Sorting always happens on a vanilla, exclusively owned array; the public
//! entry points escalate and copy first. A [`SortSpec`] carries everything
//! a layout's sort entry needs: what to compare (keys or values), which
//! ordering to use, an optional user comparator, and whether integer keys
//! are renumbered afterwards.

use std::cmp::Ordering;

use crate::value::{Key, Value};

/// What a sort compares.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortBy {
    /// Order entries by key (ksort family).
    Key,
    /// Order entries by value (sort/asort family).
    Value,
}

/// Builtin comparison modes, mirroring the host's sort flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortFlags {
    /// Compare with the standard cross-type ordering.
    Regular,
    /// Compare numerically, coercing non-numbers to 0.
    Numeric,
    /// Compare string renderings.
    String,
}

/// A user comparator. Receives the two keys or the two values depending on
/// [`SortBy`].
pub type UserCmp<'a> = &'a mut dyn FnMut(&Value, &Value) -> Ordering;

/// Full description of one sort request.
pub struct SortSpec<'a> {
    /// Keys or values.
    pub by: SortBy,
    /// Ascending or descending (builtin comparators only).
    pub ascending: bool,
    /// Builtin comparison mode, ignored when `cmp` is set.
    pub flags: SortFlags,
    /// Optional user comparator.
    pub cmp: Option<UserCmp<'a>>,
    /// Whether integer keys are discarded and entries renumbered from 0.
    pub renumber: bool,
}

impl<'a> SortSpec<'a> {
    /// sort()/rsort(): order by value, renumber keys.
    pub fn by_value(ascending: bool, flags: SortFlags) -> SortSpec<'a> {
        SortSpec { by: SortBy::Value, ascending, flags, cmp: None, renumber: true }
    }

    /// asort()/arsort(): order by value, keep key association.
    pub fn assoc_by_value(ascending: bool, flags: SortFlags) -> SortSpec<'a> {
        SortSpec { by: SortBy::Value, ascending, flags, cmp: None, renumber: false }
    }

    /// ksort()/krsort(): order by key.
    pub fn by_key(ascending: bool, flags: SortFlags) -> SortSpec<'a> {
        SortSpec { by: SortBy::Key, ascending, flags, cmp: None, renumber: false }
    }

    /// usort(): user comparator on values, renumber keys.
    pub fn user_by_value(cmp: UserCmp<'a>) -> SortSpec<'a> {
        SortSpec {
            by: SortBy::Value,
            ascending: true,
            flags: SortFlags::Regular,
            cmp: Some(cmp),
            renumber: true,
        }
    }

    /// uasort(): user comparator on values, keep key association.
    pub fn user_assoc_by_value(cmp: UserCmp<'a>) -> SortSpec<'a> {
        SortSpec {
            by: SortBy::Value,
            ascending: true,
            flags: SortFlags::Regular,
            cmp: Some(cmp),
            renumber: false,
        }
    }

    /// uksort(): user comparator on keys.
    pub fn user_by_key(cmp: UserCmp<'a>) -> SortSpec<'a> {
        SortSpec {
            by: SortBy::Key,
            ascending: true,
            flags: SortFlags::Regular,
            cmp: Some(cmp),
            renumber: false,
        }
    }

    /// Compares two entries under this spec.
    pub(crate) fn compare(&mut self, a: &(Key, Value), b: &(Key, Value)) -> Ordering {
        let (x, y) = match self.by {
            SortBy::Key => (a.0.to_value(), b.0.to_value()),
            SortBy::Value => (a.1.clone(), b.1.clone()),
        };
        let ord = match &mut self.cmp {
            Some(f) => return f(&x, &y),
            None => match self.flags {
                SortFlags::Regular => value_cmp(&x, &y),
                SortFlags::Numeric => value_to_num(&x).total_cmp(&value_to_num(&y)),
                SortFlags::String => value_to_string(&x).cmp(&value_to_string(&y)),
            },
        };
        if self.ascending {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// The standard cross-type ordering: nulls first, then bools, numbers
/// (ints and doubles compared together), strings, arrays last. Arrays
/// compare by size; this layer has no deep array ordering.
pub(crate) fn value_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Dbl(_) => 2,
            Value::Str(_) => 3,
            Value::Arr(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Dbl(x), Value::Dbl(y)) => x.total_cmp(y),
        (Value::Int(x), Value::Dbl(y)) => (*x as f64).total_cmp(y),
        (Value::Dbl(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::Str(x), Value::Str(y)) => x.as_str().cmp(y.as_str()),
        (Value::Arr(x), Value::Arr(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn value_to_num(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(b) => *b as i64 as f64,
        Value::Int(i) => *i as f64,
        Value::Dbl(d) => *d,
        Value::Str(s) => s.as_str().trim().parse::<f64>().unwrap_or(0.0),
        Value::Arr(_) => 0.0,
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1".into() } else { String::new() },
        Value::Int(i) => i.to_string(),
        Value::Dbl(d) => d.to_string(),
        Value::Str(s) => s.as_str().to_string(),
        Value::Arr(_) => "Array".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strdata::StrData;

    #[test]
    fn cross_type_ordering() {
        assert_eq!(value_cmp(&Value::Null, &Value::Bool(false)), Ordering::Less);
        assert_eq!(value_cmp(&Value::Int(3), &Value::Dbl(3.5)), Ordering::Less);
        assert_eq!(value_cmp(&Value::Dbl(4.0), &Value::Int(4)), Ordering::Equal);
        assert_eq!(
            value_cmp(&Value::Str(StrData::intern("a")), &Value::Int(0)),
            Ordering::Greater
        );
    }

    #[test]
    fn numeric_flag_coerces_strings() {
        let mut spec = SortSpec::by_value(true, SortFlags::Numeric);
        let a = (Key::Int(0), Value::from("10"));
        let b = (Key::Int(1), Value::from("9"));
        assert_eq!(spec.compare(&a, &b), Ordering::Greater);

        let mut spec = SortSpec::by_value(true, SortFlags::String);
        assert_eq!(spec.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn descending_reverses_builtin_only() {
        let mut spec = SortSpec::by_key(false, SortFlags::Regular);
        let a = (Key::Int(1), Value::Null);
        let b = (Key::Int(2), Value::Null);
        assert_eq!(spec.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn user_comparator_wins() {
        let mut rev = |a: &Value, b: &Value| value_cmp(b, a);
        let mut spec = SortSpec::user_by_value(&mut rev);
        let a = (Key::Int(0), Value::Int(1));
        let b = (Key::Int(1), Value::Int(2));
        assert_eq!(spec.compare(&a, &b), Ordering::Greater);
    }
}
