use std::cell::RefCell;

use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::term::{TermId, TermTable};

mod logic_node;
pub use logic_node::LogicNode;

new_key_type! {
    /// A lightweight handle to a staged node within a [`FormulaBuilder`].
    ///
    /// `NodeHandle`s serve as opaque keys that allow you to reference and
    /// connect nodes while a formula is being staged.
    ///
    /// * **Copyable:** Handles are small and cheap to copy/pass by value.
    /// * **Scoped:** A handle is only valid for the `FormulaBuilder` that created it.
    pub struct NodeHandle;
}

/// Represents the raw structure of a staged formula node.
///
/// While `FormulaBuilder` manages these internally, this enum is exposed to
/// allow for inspection or manual traversal of the staged graph if necessary.
#[derive(Clone, PartialEq, Eq)]
pub enum BuilderNode {
    /// An already-interned term used as a leaf.
    Term(TermId),
    /// A disjunction (OR). True if *any* child is true.
    Any(Vec<NodeHandle>),
    /// A conjunction (AND). True if *all* children are true.
    All(Vec<NodeHandle>),
    /// An exclusive or over all children.
    Xor(Vec<NodeHandle>),
    /// A negation.
    Not(NodeHandle),
    /// An if-then-else over staged nodes.
    Ite(NodeHandle, NodeHandle, NodeHandle),
}

/// A staging area for constructing formulas over a [`TermTable`].
///
/// The builder allows interior mutability and arbitrary wiring order, so
/// formulas can be assembled incrementally before being interned in one
/// pass. Unlike the table's smart constructors, staged nodes are not
/// normalized until [`build`](Self::build) runs.
///
/// # Logic Nodes & Macros
/// You can use the builder in three main ways depending on your preference:
/// 1. **Direct Handles:** Manually wiring `NodeHandle`s (best for programmatic generation).
/// 2. **Operator Overloading:** Using `.leaf()` to get objects that support `&`, `|`, `^`, `!`.
/// 3. **Macros:** Using `formula!`, `any!`, `all!`, and `xor!` for a visual representation.
///
/// # Example 1: Direct Handles (Programmatic)
/// ```rust
/// use implify::{FormulaBuilder, TermTable, Sort};
///
/// let mut terms = TermTable::new();
/// let p = terms.declare("p", Sort::Bool);
/// let q = terms.declare("q", Sort::Bool);
///
/// let builder = FormulaBuilder::new();
/// let a = builder.term(p);
/// let b = builder.term(q);
///
/// // (p | q) & !q
/// let a_or_b = builder.any([a, b]);
/// let not_b = builder.not(b);
/// let root = builder.all([a_or_b, not_b]);
/// builder.add_root(root);
///
/// let roots = builder.build(&mut terms);
/// assert_eq!(roots.len(), 1);
/// assert!(terms.is_boolean(roots[0]));
/// ```
///
/// # Example 2: Operator Style (Ergonomic)
/// ```rust
/// use implify::{FormulaBuilder, TermTable, Sort};
///
/// let mut terms = TermTable::new();
/// let p = terms.declare("p", Sort::Bool);
/// let q = terms.declare("q", Sort::Bool);
///
/// let builder = FormulaBuilder::new();
/// let a = builder.leaf(p);
/// let b = builder.leaf(q);
///
/// // Natural syntax: (p OR q) XOR (NOT q)
/// builder.add_root((a | b) ^ !b);
/// let roots = builder.build(&mut terms);
/// ```
///
/// # Example 3: Macro Style (Visual)
/// ```rust
/// use implify::{FormulaBuilder, TermTable, Sort, formula};
///
/// let mut terms = TermTable::new();
/// let p = terms.declare("p", Sort::Bool);
/// let q = terms.declare("q", Sort::Bool);
/// let r = terms.declare("r", Sort::Bool);
///
/// let builder = FormulaBuilder::new();
/// let root = formula!(builder,
///     any![
///         p,
///         all![q, r],
///         ! r
///     ]
/// );
/// builder.add_root(root);
/// let roots = builder.build(&mut terms);
/// ```
#[derive(Clone)]
pub struct FormulaBuilder {
    pub nodes: RefCell<SlotMap<NodeHandle, BuilderNode>>,
    pub roots: RefCell<Vec<NodeHandle>>,
}

impl Default for FormulaBuilder {
    fn default() -> Self {
        Self {
            nodes: RefCell::new(SlotMap::with_key()),
            roots: RefCell::new(Vec::new()),
        }
    }
}

impl FormulaBuilder {
    /// Creates a new, empty `FormulaBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an interned term as a leaf.
    pub fn term(&self, t: TermId) -> NodeHandle {
        self.nodes.borrow_mut().insert(BuilderNode::Term(t))
    }

    /// Stages a disjunction (OR) over the provided children.
    pub fn any<H: Into<NodeHandle>>(&self, kids: impl IntoIterator<Item = H>) -> NodeHandle {
        let kids = kids.into_iter().map(|h| h.into()).collect();
        self.nodes.borrow_mut().insert(BuilderNode::Any(kids))
    }

    /// Stages a conjunction (AND) over the provided children.
    pub fn all<H: Into<NodeHandle>>(&self, kids: impl IntoIterator<Item = H>) -> NodeHandle {
        let kids = kids.into_iter().map(|h| h.into()).collect();
        self.nodes.borrow_mut().insert(BuilderNode::All(kids))
    }

    /// Stages an exclusive or over the provided children.
    pub fn xor<H: Into<NodeHandle>>(&self, kids: impl IntoIterator<Item = H>) -> NodeHandle {
        let kids = kids.into_iter().map(|h| h.into()).collect();
        self.nodes.borrow_mut().insert(BuilderNode::Xor(kids))
    }

    /// Stages a negation.
    pub fn not<H: Into<NodeHandle>>(&self, child: H) -> NodeHandle {
        self.nodes
            .borrow_mut()
            .insert(BuilderNode::Not(child.into()))
    }

    /// Stages an if-then-else.
    pub fn ite<H: Into<NodeHandle>>(&self, cond: H, then: H, els: H) -> NodeHandle {
        self.nodes
            .borrow_mut()
            .insert(BuilderNode::Ite(cond.into(), then.into(), els.into()))
    }

    /// Marks a node as a "Root".
    ///
    /// Roots are the formulas [`build`](Self::build) interns, in the order
    /// they were added.
    pub fn add_root<H: Into<NodeHandle>>(&self, root: H) {
        self.roots.borrow_mut().push(root.into());
    }

    /// Interns every root into `terms`, consuming the builder.
    ///
    /// Staged nodes are interned bottom-up through the table's smart
    /// constructors, so the results are fully normalized; shared staged
    /// nodes are interned once.
    pub fn build(self, terms: &mut TermTable) -> Vec<TermId> {
        let nodes = self.nodes.into_inner();
        let roots = self.roots.into_inner();
        let mut memo: SecondaryMap<NodeHandle, TermId> = SecondaryMap::new();
        roots
            .iter()
            .map(|&r| intern_node(&nodes, r, terms, &mut memo))
            .collect()
    }

    /// Internal helper to force type errors to appear in user code.
    #[doc(hidden)]
    #[inline(always)]
    pub fn __check_type(&self) -> &Self {
        self
    }
}

fn intern_node(
    nodes: &SlotMap<NodeHandle, BuilderNode>,
    h: NodeHandle,
    terms: &mut TermTable,
    memo: &mut SecondaryMap<NodeHandle, TermId>,
) -> TermId {
    if let Some(&t) = memo.get(h) {
        return t;
    }
    let t = match &nodes[h] {
        BuilderNode::Term(t) => *t,
        BuilderNode::Any(kids) => {
            let ts: Vec<TermId> = kids
                .iter()
                .map(|&k| intern_node(nodes, k, terms, memo))
                .collect();
            terms.or(ts)
        }
        BuilderNode::All(kids) => {
            let ts: Vec<TermId> = kids
                .iter()
                .map(|&k| intern_node(nodes, k, terms, memo))
                .collect();
            terms.and(ts)
        }
        BuilderNode::Xor(kids) => {
            let ts: Vec<TermId> = kids
                .iter()
                .map(|&k| intern_node(nodes, k, terms, memo))
                .collect();
            terms.xor(ts)
        }
        BuilderNode::Not(k) => intern_node(nodes, *k, terms, memo).negate(),
        BuilderNode::Ite(c, a, b) => {
            let (c, a, b) = (*c, *a, *b);
            let c = intern_node(nodes, c, terms, memo);
            let a = intern_node(nodes, a, terms, memo);
            let b = intern_node(nodes, b, terms, memo);
            terms.ite(c, a, b)
        }
    };
    memo.insert(h, t);
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Sort;

    #[test]
    fn builds_through_smart_constructors() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);

        let builder = FormulaBuilder::new();
        let a = builder.term(p);
        let b = builder.term(q);
        let both = builder.all([a, b]);
        let either = builder.any([a, b]);
        builder.add_root(both);
        builder.add_root(either);
        let roots = builder.build(&mut terms);

        assert_eq!(roots[0], terms.and([p, q]));
        assert_eq!(roots[1], terms.or([p, q]));
    }

    #[test]
    fn staged_normalization_happens_at_build() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);

        let builder = FormulaBuilder::new();
        let a = builder.term(p);
        let na = builder.not(a);
        let taut = builder.any([a, na]);
        builder.add_root(taut);
        let roots = builder.build(&mut terms);
        assert_eq!(roots, vec![TermId::TRUE]);
    }

    #[test]
    fn ite_stages() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);
        let r = terms.declare("r", Sort::Bool);

        let builder = FormulaBuilder::new();
        let c = builder.term(p);
        let t = builder.term(q);
        let e = builder.term(r);
        let ite = builder.ite(c, t, e);
        builder.add_root(ite);
        let roots = builder.build(&mut terms);
        assert_eq!(roots, vec![terms.ite(p, q, r)]);
    }
}
