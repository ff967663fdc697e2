//! Assertion pre-processing for model-based reasoning.
//!
//! Solvers hand the literal collector quantifier-free Boolean formulas. This
//! module does the preparatory decomposition: splitting assertions into
//! conjuncts (stripping top-level universal quantifiers on the way), the
//! dual splitting of a formula into disjuncts, and scanning a term for its
//! free variables and uninterpreted leaves.

use std::collections::VecDeque;

use bitflags::bitflags;
use hashbrown::HashSet;
use rapidhash::quality::RandomState;
use tracing::debug;

use crate::term::{TermData, TermId, TermTable};

bitflags! {
    /// Controls how aggressively [`Flattener`] decomposes formulas.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FlattenOptions: u8 {
        /// Unfold a Boolean `(ite c a b)` into `(!c | a)` and `(c | b)` when
        /// splitting conjuncts, and into `(c & a) | (!c & b)` when splitting
        /// disjuncts.
        const SPLIT_ITE = 0b01;
        /// Unfold a Boolean equality (iff) into its two implications, or
        /// into the two agreeing conjunctions on the disjunct side.
        const SPLIT_IFF = 0b10;
    }
}

/// Queue-driven decomposition of formulas into conjuncts or disjuncts.
///
/// A conjunction is a negated disjunction, so conjunct splitting walks
/// negated `or` nodes; top-level `forall`s are stripped (their bodies keep
/// the free variables). Already-seen subformulas are skipped, so shared
/// structure is emitted once.
///
/// # Example
/// ```rust
/// use implify::{Flattener, FlattenOptions, TermTable, Sort};
///
/// let mut terms = TermTable::new();
/// let p = terms.declare("p", Sort::Bool);
/// let q = terms.declare("q", Sort::Bool);
/// let r = terms.declare("r", Sort::Bool);
/// let inner = terms.and([q, r]);
/// let f = terms.and([p, inner]);
///
/// let mut flat = Vec::new();
/// Flattener::new().flatten_conjuncts(&mut terms, &[f], FlattenOptions::empty(), &mut flat);
/// assert_eq!(flat, vec![p, q, r]);
/// ```
pub struct Flattener {
    queue: VecDeque<TermId>,
    cache: HashSet<TermId, RandomState>,
}

impl Default for Flattener {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            cache: HashSet::with_hasher(RandomState::new()),
        }
    }
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the queue and the seen-set.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.cache.clear();
    }

    fn push(&mut self, t: TermId) {
        if self.cache.insert(t) {
            self.queue.push_back(t);
        }
    }

    /// Splits `assertions` into conjuncts, appending them to `out`.
    ///
    /// Conjunctions are split recursively, a top-level `(forall ys. body)`
    /// is replaced by `body`, and `opts` selects the optional `ite`/iff
    /// unfoldings. Trivially true conjuncts are dropped. Non-Boolean
    /// assertions are passed through untouched.
    pub fn flatten_conjuncts(
        &mut self,
        terms: &mut TermTable,
        assertions: &[TermId],
        opts: FlattenOptions,
        out: &mut Vec<TermId>,
    ) {
        self.reset();
        for &a in assertions {
            self.push(a);
        }
        while let Some(t) = self.queue.pop_front() {
            let neg = t.is_neg();
            let data = terms.data(t.positive()).clone();
            match data {
                TermData::Or(args) if neg => {
                    // a negated disjunction is a conjunction of negations
                    for a in args {
                        self.push(a.negate());
                    }
                }
                TermData::Forall { body, .. } if !neg => self.push(body),
                TermData::Ite { cond, then, els }
                    if terms.is_boolean(then) && opts.contains(FlattenOptions::SPLIT_ITE) =>
                {
                    let pos = terms.or([cond.negate(), then.negate_if(neg)]);
                    let negb = terms.or([cond, els.negate_if(neg)]);
                    self.push(pos);
                    self.push(negb);
                }
                TermData::Eq(p, q)
                    if terms.is_boolean(p) && opts.contains(FlattenOptions::SPLIT_IFF) =>
                {
                    // (p = q) is (p => q) & (q => p); negation moves onto q
                    let q = q.negate_if(neg);
                    let fwd = terms.or([p.negate(), q]);
                    let bwd = terms.or([p, q.negate()]);
                    self.push(fwd);
                    self.push(bwd);
                }
                _ => {
                    if t != TermId::TRUE {
                        out.push(t);
                    }
                }
            }
        }
        debug!(conjuncts = out.len(), "flattened assertions");
    }

    /// Splits a single formula into disjuncts, appending them to `out`.
    ///
    /// The dual of [`flatten_conjuncts`](Self::flatten_conjuncts):
    /// disjunctions are split recursively and trivially false disjuncts are
    /// dropped.
    pub fn flatten_disjuncts(
        &mut self,
        terms: &mut TermTable,
        root: TermId,
        opts: FlattenOptions,
        out: &mut Vec<TermId>,
    ) {
        self.reset();
        self.push(root);
        while let Some(t) = self.queue.pop_front() {
            let neg = t.is_neg();
            let data = terms.data(t.positive()).clone();
            match data {
                TermData::Or(args) if !neg => {
                    for a in args {
                        self.push(a);
                    }
                }
                TermData::Ite { cond, then, els }
                    if terms.is_boolean(then) && opts.contains(FlattenOptions::SPLIT_ITE) =>
                {
                    let pos = terms.and([cond, then.negate_if(neg)]);
                    let negb = terms.and([cond.negate(), els.negate_if(neg)]);
                    self.push(pos);
                    self.push(negb);
                }
                TermData::Eq(p, q)
                    if terms.is_boolean(p) && opts.contains(FlattenOptions::SPLIT_IFF) =>
                {
                    // (p = q) is (p & q) | (!p & !q)
                    let q = q.negate_if(neg);
                    let both = terms.and([p, q]);
                    let neither = terms.and([p.negate(), q.negate()]);
                    self.push(both);
                    self.push(neither);
                }
                _ => {
                    if t != TermId::FALSE {
                        out.push(t);
                    }
                }
            }
        }
    }

    /// Collects the free variables and uninterpreted leaves of `t`.
    ///
    /// Variables go to `uvars`, uninterpreted constants and functions to
    /// `evars`, each term once. Returns `false` when `t` contains a
    /// quantifier or lambda (whose bound variables are reported like free
    /// ones).
    pub fn scan_vars(
        &self,
        terms: &TermTable,
        t: TermId,
        uvars: &mut Vec<TermId>,
        evars: &mut Vec<TermId>,
    ) -> bool {
        let mut quantifier_free = true;
        for (id, data) in terms.subterms(t) {
            match data {
                TermData::Variable { .. } => uvars.push(id),
                TermData::Uninterpreted { .. } => evars.push(id),
                TermData::Forall { .. } | TermData::Lambda { .. } => quantifier_free = false,
                _ => {}
            }
        }
        quantifier_free
    }
}
