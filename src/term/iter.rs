use crate::term::{TermData, TermId, TermTable};

/// An iterator that visits the subterms of a root in post-order.
///
/// Children are yielded before their parents, which is the right order for
/// evaluation-like passes and structural checks.
///
/// # Behavior
/// * **Iterative:** Uses an explicit stack, so it is safe for very deep DAGs.
/// * **Deduplicated:** Shared nodes (diamonds in the DAG) are yielded exactly once.
/// * **Unsigned:** Nodes are yielded in positive polarity, whatever the
///   polarity of the handles that reached them.
pub struct TermDagIter<'a> {
    terms: &'a TermTable,
    stack: Vec<(TermId, bool)>,
    visited: Vec<bool>,
}

impl<'a> TermDagIter<'a> {
    pub(crate) fn new(terms: &'a TermTable, root: TermId) -> Self {
        Self {
            terms,
            stack: vec![(root.positive(), false)],
            visited: vec![false; terms.node_count()],
        }
    }
}

impl<'a> Iterator for TermDagIter<'a> {
    type Item = (TermId, &'a TermData);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, expanded)) = self.stack.pop() {
            if self.visited[id.idx()] {
                continue;
            }
            if expanded {
                self.visited[id.idx()] = true;
                return Some((id, self.terms.data(id)));
            } else {
                // mark self as expanded, visit children first
                self.stack.push((id, true));
                let stack = &mut self.stack;
                let visited = &self.visited;
                self.terms.data(id).for_each_child(|k| {
                    let k = k.positive();
                    if !visited[k.idx()] {
                        stack.push((k, false));
                    }
                });
            }
        }
        None
    }
}

impl TermTable {
    /// Returns an iterator over the subterms of `root`, children first.
    ///
    /// Each reachable node is yielded exactly once, in positive polarity.
    pub fn subterms(&self, root: TermId) -> TermDagIter<'_> {
        TermDagIter::new(self, root)
    }
}
