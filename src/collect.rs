//! Model-guided implicant extraction.
//!
//! Given a model `M` and a formula `F` with `M ⊨ F`, the collector walks the
//! term DAG of `F` and gathers a conjunction of atomic literals, each true in
//! `M`, that together imply `F`. If-then-else branches and disjunctions are
//! resolved against the model, so only the parts of `F` that actually made it
//! true contribute literals.

use hashbrown::HashMap;
use rapidhash::quality::RandomState;
use tracing::{debug, trace};

use crate::model::Model;
use crate::term::{TermId, TermTable};

mod lit_set;
mod scratch;
mod visit;

use lit_set::LitSet;
use scratch::ScratchStack;

/// Why literal collection stopped.
///
/// The numeric codes returned by [`CollectError::code`] are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    /// The model has no value for some subterm.
    #[error("the model has no value for a subterm")]
    EvalFailed,
    /// A free variable occurs outside any binder.
    #[error("free variable in term")]
    FreeVarInTerm,
    /// A quantified subterm was reached.
    #[error("quantified term")]
    Quantifier,
    /// A lambda subterm was reached.
    #[error("lambda term")]
    Lambda,
    /// An internal inconsistency, e.g. an assertion that does not hold in
    /// the model it is being explained against.
    #[error("internal error during literal collection")]
    Internal,
}

impl CollectError {
    /// A stable negative error code.
    pub const fn code(self) -> i32 {
        match self {
            CollectError::EvalFailed => -1,
            CollectError::FreeVarInTerm => -2,
            CollectError::Quantifier => -3,
            CollectError::Lambda => -4,
            CollectError::Internal => -5,
        }
    }
}

/// Collects the literals that explain why a model satisfies a formula.
///
/// The collector rewrites each processed term into an *atomic* residue: a
/// Boolean term becomes [`TermId::TRUE`] or [`TermId::FALSE`] (its value in
/// the model), any other term loses every if-then-else inside it. Each
/// rewrite step that consults the model records the consulted atom (or its
/// negation) as a literal, and the recorded literals imply that the residue
/// equals the original term.
///
/// Shared subterms are rewritten at most once thanks to a per-node memo that
/// is keyed by the node index with polarity stripped, so a term and its
/// negation share all rewrite work except a sign flip at the root.
///
/// The collector borrows the table mutably (rebuilding interns new terms)
/// and never outlives the model it explains.
pub struct LitCollector<'a> {
    terms: &'a mut TermTable,
    model: &'a Model,
    // unsigned node index -> simplified term
    cache: HashMap<u32, TermId, RandomState>,
    lits: LitSet,
    scratch: ScratchStack,
}

impl<'a> LitCollector<'a> {
    /// Creates a collector for `model` over `terms`.
    pub fn new(terms: &'a mut TermTable, model: &'a Model) -> Self {
        Self {
            terms,
            model,
            cache: HashMap::with_hasher(RandomState::new()),
            lits: LitSet::new(),
            scratch: ScratchStack::new(),
        }
    }

    /// Clears the memo, the collected literals, and the scratch pool.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.lits.clear();
        self.scratch.reset();
    }

    /// Processes one term: collects its literals and returns its atomic
    /// residue.
    ///
    /// For a Boolean `t` the result is `TRUE` or `FALSE` and matches the
    /// value of `t` in the model. On error the scratch pool is reset but the
    /// memo and the literals collected so far are kept; they are unsound as
    /// an explanation of `t` and the caller is expected to [`reset`] or drop
    /// the collector.
    ///
    /// Recursion depth is bounded by the deepest chain of composite subterms
    /// in `t`. For pathological inputs (chains thousands deep), run the
    /// collector on a thread with an enlarged stack.
    ///
    /// [`reset`]: Self::reset
    pub fn process(&mut self, t: TermId) -> Result<TermId, CollectError> {
        match self.visit(t) {
            Ok(u) => Ok(u),
            Err(e) => {
                self.scratch.reset();
                Err(e)
            }
        }
    }

    /// The literals collected so far, in insertion order.
    pub fn literals(&self) -> &[TermId] {
        self.lits.as_slice()
    }

    /// Consumes the collector and drains its literals in insertion order.
    pub fn into_literals(self) -> Vec<TermId> {
        self.lits.into_vec()
    }

    /// Whether `t` is true in the model. `t` must be Boolean.
    fn term_is_true(&self, t: TermId) -> Result<bool, CollectError> {
        debug_assert!(self.terms.is_boolean(t));
        let v = self
            .model
            .eval(self.terms, t)
            .ok_or(CollectError::EvalFailed)?;
        Ok(v.is_true())
    }

    /// Records an atom: inserts `t` or its negation, whichever holds in the
    /// model, and returns the truth constant `t` simplifies to.
    ///
    /// `TRUE` is never recorded, so an atom that canonicalized to a constant
    /// contributes nothing.
    fn register_atom(&mut self, t: TermId) -> Result<TermId, CollectError> {
        if self.term_is_true(t)? {
            trace!(lit = t.raw(), "collected literal");
            self.lits.insert(t);
            Ok(TermId::TRUE)
        } else {
            trace!(lit = t.negate().raw(), "collected literal");
            self.lits.insert(t.negate());
            Ok(TermId::FALSE)
        }
    }
}

/// Computes an implicant for a conjunction of assertions under `model`.
///
/// Every assertion must be a Boolean term that is true in `model`. On
/// success the collected literals are appended to `out` in a deterministic
/// order and `Ok(())` is returned; `out` is left untouched on error, and is
/// never cleared, so results can be accumulated across calls.
///
/// # Example
/// ```rust
/// use implify::{Model, TermTable, Sort, Value, get_implicants};
///
/// let mut terms = TermTable::new();
/// let x = terms.declare("x", Sort::Int);
/// let y = terms.declare("y", Sort::Int);
///
/// // (= x 0) | (= y 0), satisfied by x = 0
/// let x0 = terms.arith_eq0(x);
/// let y0 = terms.arith_eq0(y);
/// let f = terms.or([x0, y0]);
///
/// let mut model = Model::new();
/// model.assign(x, Value::Int(0));
/// model.assign(y, Value::Int(0));
///
/// let mut implicant = Vec::new();
/// get_implicants(&mut terms, &model, &[f], &mut implicant).unwrap();
///
/// // only the first true disjunct is explained
/// assert_eq!(implicant, vec![x0]);
/// ```
pub fn get_implicants(
    terms: &mut TermTable,
    model: &Model,
    assertions: &[TermId],
    out: &mut Vec<TermId>,
) -> Result<(), CollectError> {
    let mut collector = LitCollector::new(terms, model);
    debug!(assertions = assertions.len(), "collecting implicants");
    for &f in assertions {
        let u = collector.process(f)?;
        if u != TermId::TRUE {
            // the caller promised the model satisfies every assertion
            return Err(CollectError::Internal);
        }
    }
    let lits = collector.into_literals();
    debug!(literals = lits.len(), "implicant collection finished");
    out.extend(lits);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::term::{Sort, TermKind};

    fn int_pair() -> (TermTable, TermId, TermId) {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        (terms, x, y)
    }

    fn model_ints(pairs: &[(TermId, i64)]) -> Model {
        let mut model = Model::new();
        for &(t, v) in pairs {
            model.assign(t, Value::Int(v));
        }
        model
    }

    #[test]
    fn arithmetic_ite_keeps_only_the_taken_branch() {
        let (mut terms, x, y) = int_pair();
        // (< (+ 2 (ite (< x y) x y)) 5)
        let cond = terms.arith_lt(x, y);
        let picked = terms.ite(cond, x, y);
        let two = terms.arith_const(2);
        let sum = terms.arith_add(two, picked);
        let five = terms.arith_const(5);
        let f = terms.arith_lt(sum, five);

        let model = model_ints(&[(x, 1), (y, 3)]);
        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut out).unwrap();

        // (< x y) and (< (+ 2 x) 5), both true in the model
        let three = terms.arith_const(3);
        let simplified = terms.arith_lt(x, three);
        assert_eq!(out, vec![cond, simplified]);
        for &lit in &out {
            assert!(model.eval(&terms, lit).unwrap().is_true());
        }
    }

    #[test]
    fn true_disjunction_explains_only_the_first_true_disjunct() {
        let (mut terms, x, y) = int_pair();
        let x0 = terms.arith_eq0(x);
        let y0 = terms.arith_eq0(y);
        let f = terms.or([x0, y0]);

        let model = model_ints(&[(x, 0), (y, 0)]);
        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut out).unwrap();
        assert_eq!(out, vec![x0]); // y0 is true too but never visited
    }

    #[test]
    fn false_disjunction_negates_every_disjunct() {
        let (mut terms, x, y) = int_pair();
        let x0 = terms.arith_eq0(x);
        let y0 = terms.arith_eq0(y);
        let or = terms.or([x0, y0]);
        let f = or.negate();

        let model = model_ints(&[(x, 1), (y, 2)]);
        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut out).unwrap();
        assert_eq!(out, vec![x0.negate(), y0.negate()]);
    }

    #[test]
    fn xor_visits_every_child() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);
        let f = terms.xor([p, q]);

        let mut model = Model::new();
        model.assign(p, Value::Bool(true));
        model.assign(q, Value::Bool(false));

        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut out).unwrap();
        assert_eq!(out, vec![p, q.negate()]);
    }

    #[test]
    fn shared_subterm_is_rewritten_once() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        // abs = (ite (< x 0) (- x) x), asserted non-negative and equal to 5
        let zero = terms.arith_const(0);
        let neg_cond = terms.arith_lt(x, zero);
        let minus_x = terms.arith_linear(&[(-1, x)]);
        let abs = terms.ite(neg_cond, minus_x, x);
        let f1 = terms.arith_ge0(abs);
        let five = terms.arith_const(5);
        let f2 = terms.arith_eq(abs, five);
        let f = terms.and([f1, f2]);

        let model = model_ints(&[(x, 5)]);
        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut out).unwrap();

        // the condition is decided once; both conjuncts reduce over x itself
        let ge = terms.arith_ge0(x);
        let eq = terms.arith_eq(x, five);
        assert_eq!(out, vec![ge, eq]);
        assert_eq!(
            out.iter().filter(|&&l| l.positive() == ge.positive()).count(),
            1
        );
    }

    #[test]
    fn free_variable_is_rejected() {
        let mut terms = TermTable::new();
        let y = terms.variable("y", Sort::Int);
        let f = terms.arith_ge0(y);

        let model = Model::new();
        let mut out = vec![TermId::TRUE]; // pre-existing content survives errors
        let err = get_implicants(&mut terms, &model, &[f], &mut out).unwrap_err();
        assert_eq!(err, CollectError::FreeVarInTerm);
        assert_eq!(err.code(), -2);
        assert_eq!(out, vec![TermId::TRUE]);
    }

    #[test]
    fn quantifier_and_lambda_are_rejected() {
        let mut terms = TermTable::new();
        let y = terms.variable("y", Sort::Int);
        let body = terms.arith_ge0(y);
        let forall = terms.forall(vec![y], body);

        let model = Model::new();
        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(forall), Err(CollectError::Quantifier));
        drop(collector);

        let lam = terms.lambda(vec![y], body);
        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(lam), Err(CollectError::Lambda));
    }

    #[test]
    fn silent_model_reports_eval_failure() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let model = Model::new();
        let mut out = Vec::new();
        let err = get_implicants(&mut terms, &model, &[p], &mut out).unwrap_err();
        assert_eq!(err, CollectError::EvalFailed);
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn unsatisfied_assertion_is_an_internal_error() {
        let (mut terms, x, _) = int_pair();
        let x0 = terms.arith_eq0(x);
        let model = model_ints(&[(x, 1)]);
        let mut out = Vec::new();
        let err = get_implicants(&mut terms, &model, &[x0], &mut out).unwrap_err();
        assert_eq!(err, CollectError::Internal);
        assert_eq!(err.code(), -5);
        assert!(out.is_empty());
    }

    #[test]
    fn polarity_law() {
        let (mut terms, x, y) = int_pair();
        let x0 = terms.arith_eq0(x);
        let lt = terms.arith_lt(x, y);
        let f = terms.or([x0, lt]);

        let model = model_ints(&[(x, 0), (y, 5)]);
        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(f), Ok(TermId::TRUE));
        assert_eq!(collector.process(f.negate()), Ok(TermId::FALSE));
    }

    #[test]
    fn collection_is_idempotent() {
        let (mut terms, x, y) = int_pair();
        let cond = terms.arith_lt(x, y);
        let picked = terms.ite(cond, x, y);
        let f = terms.arith_ge0(picked);

        let model = model_ints(&[(x, 2), (y, 3)]);
        let mut first = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut first).unwrap();
        let mut second = Vec::new();
        get_implicants(&mut terms, &model, &[f], &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn literals_are_atomic() {
        let (mut terms, x, y) = int_pair();
        let p = terms.declare("p", Sort::Bool);
        let cond = terms.arith_lt(x, y);
        let picked = terms.ite(cond, y, x);
        let big = terms.arith_ge0(picked);
        let x0 = terms.arith_eq0(x);
        let inner = terms.or([x0, big]);
        let f1 = terms.xor([p, inner.negate()]);
        let f2 = terms.and([big, p]);

        let mut model = model_ints(&[(x, 1), (y, 3)]);
        model.assign(p, Value::Bool(true));

        let mut out = Vec::new();
        get_implicants(&mut terms, &model, &[f1, f2], &mut out).unwrap();
        assert!(!out.is_empty());
        for &lit in &out {
            assert!(terms.is_boolean(lit));
            assert!(model.eval(&terms, lit).unwrap().is_true());
            for (_, data) in terms.subterms(lit) {
                assert!(!matches!(
                    data.kind(),
                    TermKind::Ite
                        | TermKind::Or
                        | TermKind::Xor
                        | TermKind::Forall
                        | TermKind::Lambda
                ));
            }
        }
    }

    #[test]
    fn reset_clears_state() {
        let (mut terms, x, _) = int_pair();
        let x0 = terms.arith_eq0(x);
        let model = model_ints(&[(x, 0)]);

        let mut collector = LitCollector::new(&mut terms, &model);
        collector.process(x0).unwrap();
        assert_eq!(collector.literals(), &[x0]);

        collector.reset();
        assert!(collector.literals().is_empty());
        collector.process(x0).unwrap();
        assert_eq!(collector.literals(), &[x0]);
    }

    #[test]
    fn multiple_assertions_accumulate_deduplicated() {
        let (mut terms, x, y) = int_pair();
        let x0 = terms.arith_eq0(x);
        let lt = terms.arith_lt(x, y);
        let both = terms.and([x0, lt]);

        let model = model_ints(&[(x, 0), (y, 4)]);
        let mut out = Vec::new();
        // x0 appears in both assertions but is collected once
        get_implicants(&mut terms, &model, &[both, x0], &mut out).unwrap();
        assert_eq!(out, vec![x0, lt]);
    }
}
