//! A polymorphic, copy-on-write array-representation layer for
//! managed-language runtimes.
//!
//! Arrays are refcounted, single-threaded values with several interchangeable
//! backing layouts behind one handle type, [`ArrayData`]. Three vanilla
//! layouts are compiled in (packed, mixed, keyset); bespoke layouts such as
//! monotype vecs are registered at startup into a sealed hierarchy and
//! dispatch through per-family vtables. All polymorphism runs through a
//! single static function-pointer table indexed by the header's kind tag,
//! so a handle is one thin pointer.
//!
//! ```
//! use adata::{ArrayData, Value};
//!
//! let mut a = ArrayData::create_dict([]);
//! a.set("answer", 42i64).unwrap();
//! let alias = a.clone();
//! a.set("answer", 43i64).unwrap(); // copies; the alias is unchanged
//! assert_eq!(alias.get("answer"), Some(Value::Int(42)));
//! ```

pub mod bespoke;
mod cast;
mod dispatch;
mod error;
mod handle;
mod header;
mod options;
mod sort;
mod static_pool;
mod strdata;
mod value;
mod vanilla;

pub use bespoke::ensure_hierarchy;
pub use bespoke::layout::{dump_layouts, Lattice, LatticeBuilder, LayoutIndex, TOP};
pub use error::ArrayError;
pub use handle::{ArrayData, Iter, RevIter};
pub use header::Kind;
pub use options::{
    array_provenance, hack_arrays, set_array_provenance, set_hack_arrays, ProvTag,
};
pub use sort::{SortBy, SortFlags, SortSpec, UserCmp};
pub use strdata::StrData;
pub use value::{Key, Value, ValueKind};
