use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::builder::{FormulaBuilder, NodeHandle};
use crate::term::TermId;

/// A staged node paired with its builder, supporting `&`, `|`, `^`, `!`.
#[derive(Clone, Copy)]
pub struct LogicNode<'a> {
    builder: &'a FormulaBuilder,
    handle: NodeHandle,
}

impl<'a> LogicNode<'a> {
    pub fn new(builder: &'a FormulaBuilder, handle: NodeHandle) -> Self {
        Self { builder, handle }
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }
}

impl<'a> From<LogicNode<'a>> for NodeHandle {
    fn from(node: LogicNode<'a>) -> Self {
        node.handle
    }
}

impl<'a> From<&LogicNode<'a>> for NodeHandle {
    fn from(node: &LogicNode<'a>) -> Self {
        node.handle
    }
}

impl FormulaBuilder {
    /// Stages a term and returns a `LogicNode` wrapper around it.
    ///
    /// The wrapper supports operator overloading (`&`, `|`, `^`, `!`) for
    /// more ergonomic construction.
    ///
    /// # Example
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
    /// // LogicNode supports standard operators
    /// let c = a & !b;
    /// builder.add_root(c);
    /// ```
    pub fn leaf(&self, t: TermId) -> LogicNode<'_> {
        let h = self.term(t);
        LogicNode::new(self, h)
    }

    /// Wraps an existing handle in a `LogicNode` helper.
    ///
    /// Useful if you have a raw `NodeHandle` (perhaps from `builder.any(...)`)
    /// but want to switch back to using operator overloading.
    pub fn wrap(&self, handle: NodeHandle) -> LogicNode<'_> {
        LogicNode::new(self, handle)
    }
}

impl<'a> BitOr for LogicNode<'a> {
    type Output = LogicNode<'a>;

    fn bitor(self, rhs: Self) -> Self::Output {
        let new_handle = self.builder.any([self.handle, rhs.handle]);
        LogicNode {
            builder: self.builder,
            handle: new_handle,
        }
    }
}

impl<'a> BitAnd for LogicNode<'a> {
    type Output = LogicNode<'a>;

    fn bitand(self, rhs: Self) -> Self::Output {
        let new_handle = self.builder.all([self.handle, rhs.handle]);
        LogicNode {
            builder: self.builder,
            handle: new_handle,
        }
    }
}

impl<'a> BitXor for LogicNode<'a> {
    type Output = LogicNode<'a>;

    fn bitxor(self, rhs: Self) -> Self::Output {
        let new_handle = self.builder.xor([self.handle, rhs.handle]);
        LogicNode {
            builder: self.builder,
            handle: new_handle,
        }
    }
}

impl<'a> Not for LogicNode<'a> {
    type Output = LogicNode<'a>;

    fn not(self) -> Self::Output {
        let new_handle = self.builder.not(self.handle);
        LogicNode {
            builder: self.builder,
            handle: new_handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::FormulaBuilder;
    use crate::term::{Sort, TermTable};

    #[test]
    fn operators_stage_the_right_nodes() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);

        let builder = FormulaBuilder::new();
        let a = builder.leaf(p);
        let b = builder.leaf(q);
        builder.add_root((a | b) & !(a ^ b));
        let roots = builder.build(&mut terms);

        let or = terms.or([p, q]);
        let xor = terms.xor([p, q]);
        assert_eq!(roots, vec![terms.and([or, xor.negate()])]);
    }
}
