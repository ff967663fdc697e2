use std::hash::BuildHasher;

use hashbrown::HashTable;
use rapidhash::quality::RandomState;
use serde::{Deserialize, Serialize};

mod build;
pub(crate) mod bv;
mod display;
mod iter;

pub use iter::TermDagIter;

/// A handle to a term within a [`TermTable`].
///
/// This is a lightweight wrapper around a `u32`. It packs both the index of the node
/// and its polarity into a single integer, allowing for extremely fast copying,
/// hashing, and O(1) negation.
///
/// # Bit Layout
/// * **Bits 1..32:** The index of the node in the `TermTable::nodes` vector.
/// * **Bit 0 (LSB):** The polarity flag. 1 = Negated, 0 = Positive.
///
/// Polarity is only meaningful on Boolean terms; handles to non-Boolean terms
/// always carry a clear polarity bit.
///
/// *Note: Because the LSB is used for polarity, the maximum number of unique nodes
/// in a single `TermTable` is `u32::MAX / 2`.*
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
#[repr(transparent)]
pub struct TermId(u32);

impl TermId {
    /// The Boolean constant `true` (the positive polarity of node 0).
    pub const TRUE: Self = Self(0);
    /// The Boolean constant `false` (the negative polarity of node 0).
    pub const FALSE: Self = Self(1);

    /// Sentinel marking the constant monomial of a polynomial.
    ///
    /// Polynomial nodes store `(coefficient, variable)` pairs; the constant
    /// part of the polynomial, when present, is always the first entry and
    /// uses this sentinel in place of a variable. It never denotes a node.
    pub const CONST_IDX: Self = Self(u32::MAX);

    pub(crate) fn new(idx: u32, neg: bool) -> Self {
        Self((idx << 1) | (if neg { 1 } else { 0 }))
    }
    pub(crate) fn raw(&self) -> u32 {
        self.0
    }
    pub(crate) fn idx(&self) -> usize {
        (self.0 >> 1) as usize
    }

    /// Returns `true` if the polarity bit is set.
    pub fn is_neg(&self) -> bool {
        (self.0 & 1) == 1
    }

    /// Strips the polarity bit, returning the positive form of the term.
    pub fn positive(&self) -> Self {
        Self(self.0 & !1)
    }

    /// Flips the polarity bit. `TermId::TRUE.negate() == TermId::FALSE`.
    pub fn negate(&self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Flips the polarity bit when `neg` is set, otherwise returns `self`.
    pub fn negate_if(&self, neg: bool) -> Self {
        Self(self.0 ^ (neg as u32))
    }

    /// The Boolean constant for `b`.
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }
}

/// The sort (type) of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
pub enum Sort {
    Bool,
    Int,
    /// Bit-vectors of a fixed positive width.
    BitVec(u32),
    Tuple(Vec<Sort>),
    /// Uninterpreted functions from `dom` to `ret`.
    Fun { dom: Vec<Sort>, ret: Box<Sort> },
}

impl Sort {
    /// Returns the width of a bit-vector sort.
    ///
    /// # Panics
    /// Panics if the sort is not `BitVec`.
    pub fn bv_width(&self) -> u32 {
        match self {
            Sort::BitVec(w) => *w,
            _ => panic!("bv_width on non-bitvector sort {self:?}"),
        }
    }
}

/// A monomial of an integer polynomial: `coeff * var`.
///
/// `var` is [`TermId::CONST_IDX`] for the constant monomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
pub struct Mono {
    pub coeff: i64,
    pub var: TermId,
}

/// A monomial of a bit-vector polynomial of width <= 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
pub struct BvMono64 {
    pub coeff: u64,
    pub var: TermId,
}

/// A monomial of a wide bit-vector polynomial. The coefficient is stored as
/// little-endian 64-bit limbs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
pub struct BvMono {
    pub coeff: Vec<u64>,
    pub var: TermId,
}

/// Stores the structure of a single term node.
///
/// Nodes are stored in a flat vector within a [`TermTable`]. Composite terms
/// reference their children via [`TermId`]s, forming a directed acyclic graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode, bitcode::Decode))]
pub enum TermData {
    /// The canonical Boolean constant node. Its positive polarity is `true`,
    /// its negative polarity is `false`. Always node 0.
    BoolConst,
    ArithConst(i64),
    /// A bit-vector constant, little-endian 64-bit limbs, masked to `width`.
    BvConst { width: u32, words: Vec<u64> },
    /// An uninterpreted constant or function, interpreted by a model.
    Uninterpreted { name: String, sort: Sort },
    /// A free variable. Only legal under a quantifier or lambda.
    Variable { name: String, sort: Sort },
    /// The atom `arg = 0` over an integer term.
    ArithEq0(TermId),
    /// The atom `arg >= 0` over an integer term.
    ArithGe0(TermId),
    Ite { cond: TermId, then: TermId, els: TermId },
    /// Application of an uninterpreted function to its arguments.
    App { fun: TermId, args: Vec<TermId> },
    /// A function modified at one point: `update(fun, args) := value`.
    Update { fun: TermId, args: Vec<TermId>, value: TermId },
    Tuple(Vec<TermId>),
    Eq(TermId, TermId),
    Distinct(Vec<TermId>),
    Forall { vars: Vec<TermId>, body: TermId },
    Lambda { vars: Vec<TermId>, body: TermId },
    /// N-ary disjunction. Conjunction is represented as a negated
    /// disjunction of negations.
    Or(Vec<TermId>),
    /// N-ary exclusive or. Children are stored with positive polarity; the
    /// constructor lifts child polarities to the root.
    Xor(Vec<TermId>),
    /// Equality between two integer terms, kept in binary form.
    ArithBinEq(TermId, TermId),
    /// A bit-vector assembled from Boolean terms, LSB first.
    BvArray(Vec<TermId>),
    BvDiv(TermId, TermId),
    BvRem(TermId, TermId),
    BvSDiv(TermId, TermId),
    BvSRem(TermId, TermId),
    BvSMod(TermId, TermId),
    BvShl(TermId, TermId),
    BvLShr(TermId, TermId),
    BvAShr(TermId, TermId),
    BvEq(TermId, TermId),
    /// Unsigned bit-vector `lhs >= rhs`.
    BvGe(TermId, TermId),
    /// Signed bit-vector `lhs >= rhs`.
    BvSGe(TermId, TermId),
    /// Projection of a tuple component.
    Select { idx: u32, tuple: TermId },
    /// Extraction of a single bit of a bit-vector, as a Boolean.
    Bit { idx: u32, bv: TermId },
    /// A product of terms raised to positive exponents.
    PowerProduct(Vec<(TermId, u32)>),
    /// An integer polynomial. The constant monomial, if present, is first.
    ArithPoly(Vec<Mono>),
    /// A bit-vector polynomial with coefficients of width <= 64.
    BvPoly64 { width: u32, monos: Vec<BvMono64> },
    /// A bit-vector polynomial with coefficients wider than 64 bits.
    BvPoly { width: u32, monos: Vec<BvMono> },
}

/// The kind tag of a term, one per [`TermData`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    BoolConst,
    ArithConst,
    BvConst,
    Uninterpreted,
    Variable,
    ArithEq0,
    ArithGe0,
    Ite,
    App,
    Update,
    Tuple,
    Eq,
    Distinct,
    Forall,
    Lambda,
    Or,
    Xor,
    ArithBinEq,
    BvArray,
    BvDiv,
    BvRem,
    BvSDiv,
    BvSRem,
    BvSMod,
    BvShl,
    BvLShr,
    BvAShr,
    BvEq,
    BvGe,
    BvSGe,
    Select,
    Bit,
    PowerProduct,
    ArithPoly,
    BvPoly64,
    BvPoly,
}

impl TermData {
    /// Returns the kind tag of this node.
    pub fn kind(&self) -> TermKind {
        match self {
            TermData::BoolConst => TermKind::BoolConst,
            TermData::ArithConst(_) => TermKind::ArithConst,
            TermData::BvConst { .. } => TermKind::BvConst,
            TermData::Uninterpreted { .. } => TermKind::Uninterpreted,
            TermData::Variable { .. } => TermKind::Variable,
            TermData::ArithEq0(_) => TermKind::ArithEq0,
            TermData::ArithGe0(_) => TermKind::ArithGe0,
            TermData::Ite { .. } => TermKind::Ite,
            TermData::App { .. } => TermKind::App,
            TermData::Update { .. } => TermKind::Update,
            TermData::Tuple(_) => TermKind::Tuple,
            TermData::Eq(..) => TermKind::Eq,
            TermData::Distinct(_) => TermKind::Distinct,
            TermData::Forall { .. } => TermKind::Forall,
            TermData::Lambda { .. } => TermKind::Lambda,
            TermData::Or(_) => TermKind::Or,
            TermData::Xor(_) => TermKind::Xor,
            TermData::ArithBinEq(..) => TermKind::ArithBinEq,
            TermData::BvArray(_) => TermKind::BvArray,
            TermData::BvDiv(..) => TermKind::BvDiv,
            TermData::BvRem(..) => TermKind::BvRem,
            TermData::BvSDiv(..) => TermKind::BvSDiv,
            TermData::BvSRem(..) => TermKind::BvSRem,
            TermData::BvSMod(..) => TermKind::BvSMod,
            TermData::BvShl(..) => TermKind::BvShl,
            TermData::BvLShr(..) => TermKind::BvLShr,
            TermData::BvAShr(..) => TermKind::BvAShr,
            TermData::BvEq(..) => TermKind::BvEq,
            TermData::BvGe(..) => TermKind::BvGe,
            TermData::BvSGe(..) => TermKind::BvSGe,
            TermData::Select { .. } => TermKind::Select,
            TermData::Bit { .. } => TermKind::Bit,
            TermData::PowerProduct(_) => TermKind::PowerProduct,
            TermData::ArithPoly(_) => TermKind::ArithPoly,
            TermData::BvPoly64 { .. } => TermKind::BvPoly64,
            TermData::BvPoly { .. } => TermKind::BvPoly,
        }
    }

    /// Calls `f` on every direct child of this node.
    ///
    /// Polynomial constant monomials and the sentinel they carry are skipped;
    /// quantifier and lambda variable lists are included.
    pub fn for_each_child(&self, mut f: impl FnMut(TermId)) {
        match self {
            TermData::BoolConst
            | TermData::ArithConst(_)
            | TermData::BvConst { .. }
            | TermData::Uninterpreted { .. }
            | TermData::Variable { .. } => {}
            TermData::ArithEq0(u) | TermData::ArithGe0(u) => f(*u),
            TermData::Ite { cond, then, els } => {
                f(*cond);
                f(*then);
                f(*els);
            }
            TermData::App { fun, args } => {
                f(*fun);
                args.iter().for_each(|&a| f(a));
            }
            TermData::Update { fun, args, value } => {
                f(*fun);
                args.iter().for_each(|&a| f(a));
                f(*value);
            }
            TermData::Tuple(args)
            | TermData::Distinct(args)
            | TermData::Or(args)
            | TermData::Xor(args)
            | TermData::BvArray(args) => args.iter().for_each(|&a| f(a)),
            TermData::Forall { vars, body } | TermData::Lambda { vars, body } => {
                vars.iter().for_each(|&v| f(v));
                f(*body);
            }
            TermData::Eq(a, b)
            | TermData::ArithBinEq(a, b)
            | TermData::BvDiv(a, b)
            | TermData::BvRem(a, b)
            | TermData::BvSDiv(a, b)
            | TermData::BvSRem(a, b)
            | TermData::BvSMod(a, b)
            | TermData::BvShl(a, b)
            | TermData::BvLShr(a, b)
            | TermData::BvAShr(a, b)
            | TermData::BvEq(a, b)
            | TermData::BvGe(a, b)
            | TermData::BvSGe(a, b) => {
                f(*a);
                f(*b);
            }
            TermData::Select { tuple, .. } => f(*tuple),
            TermData::Bit { bv, .. } => f(*bv),
            TermData::PowerProduct(factors) => factors.iter().for_each(|&(v, _)| f(v)),
            TermData::ArithPoly(monos) => {
                for m in monos {
                    if m.var != TermId::CONST_IDX {
                        f(m.var);
                    }
                }
            }
            TermData::BvPoly64 { monos, .. } => {
                for m in monos {
                    if m.var != TermId::CONST_IDX {
                        f(m.var);
                    }
                }
            }
            TermData::BvPoly { monos, .. } => {
                for m in monos {
                    if m.var != TermId::CONST_IDX {
                        f(m.var);
                    }
                }
            }
        }
    }
}

/// A self-contained, hash-consed term DAG.
///
/// `TermTable` stores terms in a deduplicated Directed Acyclic Graph. Every
/// structurally distinct term is stored exactly once, so syntactic equality
/// of terms reduces to equality of [`TermId`]s.
///
/// # Key Features
/// * **Interning:** Every unique node is stored exactly once.
/// * **Flat Memory:** Nodes are stored in a dense `Vec`, improving CPU cache locality.
/// * **Smart Constructors:** Construction normalizes on the fly (constant
///   folding, child ordering, complement detection), so a constructor may
///   return a term of a different kind than the one requested.
///
/// # Example
/// ```rust
/// use implify::{TermTable, TermId, Sort};
///
/// let mut terms = TermTable::new();
/// let x = terms.declare("x", Sort::Int);
///
/// // x = 0, built twice, interns to the same handle
/// let a = terms.arith_eq0(x);
/// let b = terms.arith_eq0(x);
/// assert_eq!(a, b);
///
/// // or() folds complements
/// assert_eq!(terms.or([a, a.negate()]), TermId::TRUE);
/// ```
#[derive(Serialize, Deserialize)]
#[serde(from = "TermTableShadow")]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Encode))]
pub struct TermTable {
    pub(crate) nodes: Vec<TermData>,
    pub(crate) sorts: Vec<Sort>,
    #[serde(skip, default)]
    #[cfg_attr(feature = "fast-binary", bitcode(skip))]
    cache: HashTable<TermId>,
    #[serde(skip, default)]
    #[cfg_attr(feature = "fast-binary", bitcode(skip))]
    hasher: RandomState,
}

impl Default for TermTable {
    fn default() -> Self {
        Self {
            nodes: vec![TermData::BoolConst], // node 0 is the Boolean constant
            sorts: vec![Sort::Bool],
            cache: HashTable::new(),
            hasher: RandomState::new(),
        }
    }
}

impl Clone for TermTable {
    fn clone(&self) -> Self {
        let nodes = self.nodes.clone();
        let hasher = RandomState::new();
        let cache = build_cache(&nodes, &hasher);
        Self {
            nodes,
            sorts: self.sorts.clone(),
            cache,
            hasher,
        }
    }
}

impl TermTable {
    /// Creates a table holding only the Boolean constant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind tag of `t`.
    pub fn kind(&self, t: TermId) -> TermKind {
        self.nodes[t.idx()].kind()
    }

    /// Returns the node structure of `t` (polarity is ignored).
    pub fn data(&self, t: TermId) -> &TermData {
        &self.nodes[t.idx()]
    }

    /// Returns the sort of `t`.
    pub fn sort(&self, t: TermId) -> &Sort {
        &self.sorts[t.idx()]
    }

    /// Returns `true` if `t` has sort `Bool`.
    pub fn is_boolean(&self, t: TermId) -> bool {
        self.sorts[t.idx()] == Sort::Bool
    }

    /// Returns `true` if `t` is a handle into this table.
    ///
    /// The polynomial sentinel [`TermId::CONST_IDX`] is never valid.
    pub fn is_valid(&self, t: TermId) -> bool {
        t != TermId::CONST_IDX && t.idx() < self.nodes.len()
    }

    /// Returns the total number of nodes in the table.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Interns `data`, returning the existing handle when an identical node
    /// is already stored.
    pub(crate) fn intern(&mut self, data: TermData, sort: Sort) -> TermId {
        let hash = self.hasher.hash_one(&data);
        let nodes = &self.nodes;
        let hasher = &self.hasher;
        let entry = self.cache.entry(
            hash,
            |&id| nodes[id.idx()] == data,
            |&id| hasher.hash_one(&nodes[id.idx()]),
        );
        match entry {
            hashbrown::hash_table::Entry::Occupied(entry) => *entry.get(), // duplicate node
            hashbrown::hash_table::Entry::Vacant(entry) => {
                let id = TermId::new(self.nodes.len() as u32, false);
                entry.insert(id);
                self.nodes.push(data);
                self.sorts.push(sort);
                id
            }
        }
    }
}

#[derive(Deserialize)]
#[cfg_attr(feature = "fast-binary", derive(bitcode::Decode))]
struct TermTableShadow {
    nodes: Vec<TermData>,
    sorts: Vec<Sort>,
}

impl From<TermTableShadow> for TermTable {
    fn from(value: TermTableShadow) -> Self {
        let hasher = RandomState::new();
        let cache = build_cache(&value.nodes, &hasher);
        Self {
            nodes: value.nodes,
            sorts: value.sorts,
            cache,
            hasher,
        }
    }
}

fn build_cache(nodes: &[TermData], hasher: &RandomState) -> HashTable<TermId> {
    let mut cache = HashTable::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if i == 0 {
            continue;
        } // skip the constant node

        let hash = hasher.hash_one(node);
        let id = TermId::new(i as u32, false);
        // every node in a valid table is unique
        cache.insert_unique(hash, id, |&id| hasher.hash_one(&nodes[id.idx()]));
    }
    cache
}
