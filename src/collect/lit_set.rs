use hashbrown::HashSet;
use rapidhash::quality::RandomState;

use crate::term::TermId;

/// An insertion-ordered, insertion-only set of literals.
///
/// Duplicate inserts are no-ops and [`TermId::TRUE`] is filtered out, so the
/// set only ever holds informative literals. Draining consumes the set,
/// which freezes it by construction.
pub(crate) struct LitSet {
    seen: HashSet<TermId, RandomState>,
    order: Vec<TermId>,
}

impl LitSet {
    pub(crate) fn new() -> Self {
        Self {
            seen: HashSet::with_hasher(RandomState::new()),
            order: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, t: TermId) {
        if t == TermId::TRUE {
            return;
        }
        if self.seen.insert(t) {
            self.order.push(t);
        }
    }

    pub(crate) fn as_slice(&self) -> &[TermId] {
        &self.order
    }

    pub(crate) fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }

    /// Drains the set in insertion order.
    pub(crate) fn into_vec(self) -> Vec<TermId> {
        self.order
    }
}
