//! The bespoke layout hierarchy.
//!
//! Layouts form a join-semilattice rooted at [`TOP`]. The hierarchy is
//! built once at startup through a [`LatticeBuilder`], sealed into a global
//! immutable [`Lattice`], and queried for the rest of the process. Indices
//! are 15-bit; the high nibble-pair of an index is its family byte, and all
//! concrete layouts of one family share a single vtable, so generated code
//! can dispatch from the family alone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::OnceLock;

use crate::bespoke::LayoutVtable;

/// Identifier of one layout in the hierarchy. 15 bits; the sign bit is
/// reserved for the header encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutIndex(u16);

/// The root of the hierarchy, an ancestor of every layout.
pub const TOP: LayoutIndex = LayoutIndex(0);

/// Family byte of the abstract top layouts.
pub const FAMILY_TOP: u8 = 0x0;
/// Family byte of the empty monotype vec layout.
pub const FAMILY_EMPTY_MONOTYPE_VEC: u8 = 0xc;
/// Family byte of the monotype vec layouts.
pub const FAMILY_MONOTYPE_VEC: u8 = 0xd;

impl LayoutIndex {
    /// Wraps a raw index. The value must fit in 15 bits.
    pub fn new(raw: u16) -> LayoutIndex {
        assert!(raw < 0x8000, "layout index {:#x} does not fit in 15 bits", raw);
        LayoutIndex(raw)
    }

    /// Const constructor for layout index declarations.
    pub const fn of(raw: u16) -> LayoutIndex {
        assert!(raw < 0x8000, "layout index does not fit in 15 bits");
        LayoutIndex(raw)
    }

    /// The raw index value.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// The family byte, shared by all layouts dispatched together.
    pub fn family(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Least upper bound in the sealed hierarchy.
    ///
    /// # Panics
    ///
    /// Panics before the hierarchy is sealed, except for the trivial
    /// `TOP.join(TOP)` query, which is always `TOP`.
    pub fn join(self, other: LayoutIndex) -> LayoutIndex {
        if self == TOP && other == TOP {
            return TOP;
        }
        lattice().join(self, other)
    }

    /// Greatest lower bound in the sealed hierarchy, or `None` if the two
    /// layouts have no common descendant.
    ///
    /// # Panics
    ///
    /// Panics before the hierarchy is sealed, except for `TOP.meet(TOP)`.
    pub fn meet(self, other: LayoutIndex) -> Option<LayoutIndex> {
        if self == TOP && other == TOP {
            return Some(TOP);
        }
        lattice().meet(self, other)
    }

    /// Whether `self` is `other` or one of its descendants.
    ///
    /// # Panics
    ///
    /// Panics before the hierarchy is sealed, except for
    /// `TOP.is_sub_of(TOP)`.
    pub fn is_sub_of(self, other: LayoutIndex) -> bool {
        if self == TOP && other == TOP {
            return true;
        }
        lattice().is_descendant(self, other)
    }

    /// The layout's registered name.
    ///
    /// # Panics
    ///
    /// Panics before the hierarchy is sealed.
    pub fn name(self) -> &'static str {
        lattice().name(self)
    }
}

/// Renders the sealed hierarchy, one layout per line.
///
/// # Panics
///
/// Panics before the hierarchy is sealed.
pub fn dump_layouts() -> String {
    lattice().dump()
}

struct Node {
    name: &'static str,
    vtable: Option<&'static LayoutVtable>,
    parents: Vec<LayoutIndex>,
    // Closures include the node itself.
    ancestors: BTreeSet<LayoutIndex>,
    descendants: BTreeSet<LayoutIndex>,
}

/// Mutable assembly phase of the hierarchy. Nodes must be registered
/// parents-first; misuse is a startup bug and panics.
pub struct LatticeBuilder {
    nodes: BTreeMap<LayoutIndex, Node>,
}

impl LatticeBuilder {
    /// A builder pre-populated with the `TOP` layout.
    pub fn new() -> LatticeBuilder {
        let mut b = LatticeBuilder { nodes: BTreeMap::new() };
        b.add("Top", TOP, &[], None);
        b
    }

    /// Registers an abstract (non-instantiable) layout.
    pub fn add_abstract(&mut self, name: &'static str, index: LayoutIndex, parents: &[LayoutIndex]) {
        self.add(name, index, parents, None);
    }

    /// Registers a concrete layout with its vtable. Concrete layouts are
    /// leaves; every concrete layout of a family must pass the same
    /// vtable.
    pub fn add_concrete(
        &mut self,
        name: &'static str,
        index: LayoutIndex,
        parents: &[LayoutIndex],
        vtable: &'static LayoutVtable,
    ) {
        self.add(name, index, parents, Some(vtable));
    }

    fn add(
        &mut self,
        name: &'static str,
        index: LayoutIndex,
        parents: &[LayoutIndex],
        vtable: Option<&'static LayoutVtable>,
    ) {
        assert!(
            index.family() < 16,
            "layout {} index {:#x} exceeds the family range",
            name,
            index.raw()
        );
        assert!(
            !self.nodes.contains_key(&index),
            "layout index {:#x} registered twice ({})",
            index.raw(),
            name
        );
        let mut ancestors = BTreeSet::from([index]);
        for p in parents {
            let parent = self
                .nodes
                .get(p)
                .unwrap_or_else(|| panic!("layout {} has unregistered parent {:#x}", name, p.raw()));
            assert!(
                parent.vtable.is_none(),
                "layout {} has concrete parent {}",
                name,
                parent.name
            );
            ancestors.extend(&parent.ancestors);
        }
        assert!(index == TOP || !parents.is_empty(), "layout {} has no parent", name);
        self.nodes.insert(
            index,
            Node {
                name,
                vtable,
                parents: parents.to_vec(),
                ancestors,
                descendants: BTreeSet::new(),
            },
        );
    }

    /// Computes the closures and the per-family vtables, producing the
    /// immutable lattice.
    pub fn finalize(mut self) -> Lattice {
        let indices: Vec<LayoutIndex> = self.nodes.keys().copied().collect();
        for &i in &indices {
            let ancestors = self.nodes[&i].ancestors.clone();
            for a in ancestors {
                self.nodes.get_mut(&a).unwrap().descendants.insert(i);
            }
        }
        let mut family_vtables: [Option<&'static LayoutVtable>; 16] = [None; 16];
        for (i, node) in &self.nodes {
            if let Some(vt) = node.vtable {
                let slot = &mut family_vtables[i.family() as usize];
                match slot {
                    None => *slot = Some(vt),
                    Some(existing) => assert!(
                        std::ptr::eq(*existing, vt),
                        "family {:#x} has two distinct vtables",
                        i.family()
                    ),
                }
            }
        }
        Lattice { nodes: self.nodes, family_vtables }
    }
}

impl Default for LatticeBuilder {
    fn default() -> Self {
        LatticeBuilder::new()
    }
}

/// The sealed, immutable layout hierarchy.
pub struct Lattice {
    nodes: BTreeMap<LayoutIndex, Node>,
    family_vtables: [Option<&'static LayoutVtable>; 16],
}

impl Lattice {
    fn node(&self, i: LayoutIndex) -> &Node {
        self.nodes
            .get(&i)
            .unwrap_or_else(|| panic!("unknown layout index {:#x}", i.raw()))
    }

    /// The layout's registered name.
    pub fn name(&self, i: LayoutIndex) -> &'static str {
        self.node(i).name
    }

    /// Whether the layout is concrete (instantiable).
    pub fn is_concrete(&self, i: LayoutIndex) -> bool {
        self.node(i).vtable.is_some()
    }

    /// Whether `a` is `b` or one of its descendants.
    pub fn is_descendant(&self, a: LayoutIndex, b: LayoutIndex) -> bool {
        self.node(a).ancestors.contains(&b)
    }

    /// Least upper bound of `a` and `b`.
    pub fn join(&self, a: LayoutIndex, b: LayoutIndex) -> LayoutIndex {
        if a == b {
            return a;
        }
        let candidates: BTreeSet<LayoutIndex> = self
            .node(a)
            .ancestors
            .intersection(&self.node(b).ancestors)
            .copied()
            .collect();
        for &c in &candidates {
            if candidates.is_subset(&self.node(c).ancestors) {
                return c;
            }
        }
        TOP
    }

    /// Greatest lower bound of `a` and `b`, or `None` when they share no
    /// descendant.
    pub fn meet(&self, a: LayoutIndex, b: LayoutIndex) -> Option<LayoutIndex> {
        if a == b {
            return Some(a);
        }
        let candidates: BTreeSet<LayoutIndex> = self
            .node(a)
            .descendants
            .intersection(&self.node(b).descendants)
            .copied()
            .collect();
        candidates
            .iter()
            .copied()
            .find(|&c| candidates.is_subset(&self.node(c).descendants))
    }

    /// The vtable shared by a family's concrete layouts.
    pub(crate) fn vtable_for_family(&self, family: u8) -> &'static LayoutVtable {
        self.family_vtables[family as usize]
            .unwrap_or_else(|| panic!("family {:#x} has no concrete layouts", family))
    }

    /// A human-readable rendering of the whole hierarchy.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, node) in &self.nodes {
            let tag = if node.vtable.is_some() { "concrete" } else { "abstract" };
            let parents: Vec<String> =
                node.parents.iter().map(|p| format!("{:#06x}", p.raw())).collect();
            let _ = writeln!(
                out,
                "{:#06x} {} [{}] parents: {}",
                i.raw(),
                node.name,
                tag,
                parents.join(", ")
            );
        }
        out
    }
}

static LATTICE: OnceLock<Lattice> = OnceLock::new();

/// Whether the global hierarchy has been sealed.
pub fn is_sealed() -> bool {
    LATTICE.get().is_some()
}

/// Seals the global hierarchy. Called exactly once at startup, before any
/// bespoke array exists.
///
/// # Panics
///
/// Panics if already sealed, or if array provenance is enabled: the two
/// features share the header's extra slot and cannot coexist.
pub(crate) fn seal(lattice: Lattice) {
    if crate::options::array_provenance() {
        panic!("cannot seal bespoke layouts with array provenance enabled");
    }
    if LATTICE.set(lattice).is_err() {
        panic!("layout hierarchy sealed twice");
    }
}

/// The sealed hierarchy.
///
/// # Panics
///
/// Panics if the hierarchy has not been sealed yet.
pub(crate) fn lattice() -> &'static Lattice {
    LATTICE.get().expect("layout hierarchy is not sealed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bespoke::monotype::MONOTYPE_VTABLE;

    const A: LayoutIndex = LayoutIndex(0x0100);
    const A1: LayoutIndex = LayoutIndex(0x0200);
    const A2: LayoutIndex = LayoutIndex(0x0201);
    const B: LayoutIndex = LayoutIndex(0x0300);

    fn diamond() -> Lattice {
        let mut b = LatticeBuilder::new();
        b.add_abstract("A", A, &[TOP]);
        b.add_abstract("B", B, &[TOP]);
        b.add_concrete("A1", A1, &[A], &MONOTYPE_VTABLE);
        b.add_concrete("A2", A2, &[A, B], &MONOTYPE_VTABLE);
        b.finalize()
    }

    #[test]
    fn join_laws() {
        let l = diamond();
        for &x in &[TOP, A, A1, A2, B] {
            assert_eq!(l.join(x, x), x, "join is reflexive");
            assert_eq!(l.join(x, TOP), TOP, "top absorbs");
            for &y in &[TOP, A, A1, A2, B] {
                assert_eq!(l.join(x, y), l.join(y, x), "join is commutative");
            }
        }
        assert_eq!(l.join(A1, A2), A);
        assert_eq!(l.join(A, B), TOP);
    }

    #[test]
    fn meet_and_sub() {
        let l = diamond();
        assert_eq!(l.meet(A, B), Some(A2));
        assert_eq!(l.meet(A1, B), None);
        assert_eq!(l.meet(A, A1), Some(A1));
        assert!(l.is_descendant(A2, B));
        assert!(l.is_descendant(A2, TOP));
        assert!(!l.is_descendant(A1, B));
    }

    #[test]
    fn names_and_dump() {
        let l = diamond();
        assert_eq!(l.name(A1), "A1");
        assert!(l.is_concrete(A2));
        assert!(!l.is_concrete(A));
        let dump = l.dump();
        assert!(dump.contains("A2"));
        assert!(dump.contains("concrete"));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_index_panics() {
        let mut b = LatticeBuilder::new();
        b.add_abstract("A", A, &[TOP]);
        b.add_abstract("A again", A, &[TOP]);
    }

    #[test]
    #[should_panic(expected = "unregistered parent")]
    fn missing_parent_panics() {
        let mut b = LatticeBuilder::new();
        b.add_abstract("orphan", A1, &[A]);
    }

    #[test]
    #[should_panic(expected = "concrete parent")]
    fn concrete_parent_panics() {
        let mut b = LatticeBuilder::new();
        b.add_concrete("leaf", A, &[TOP], &MONOTYPE_VTABLE);
        b.add_abstract("child", A1, &[A]);
    }

    #[test]
    #[should_panic(expected = "family range")]
    fn family_range_panics() {
        let mut b = LatticeBuilder::new();
        b.add_abstract("far", LayoutIndex::new(0x1000), &[TOP]);
    }
}
