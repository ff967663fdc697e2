use std::cell::RefCell;
use std::cmp::Ordering;

use hashbrown::HashMap;
use rapidhash::quality::RandomState;
use serde::{Deserialize, Serialize};

use crate::term::{Sort, TermData, TermId, TermTable, bv};

/// A concrete value a term can take in a [`Model`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// A bit-vector value, little-endian 64-bit limbs, masked to `width`.
    Bv { width: u32, words: Vec<u64> },
    Tuple(Vec<Value>),
    /// The interpretation of an uninterpreted function.
    Fun(FunInterp),
}

impl Value {
    /// A bit-vector value of width <= 64.
    pub fn bv64(width: u32, value: u64) -> Self {
        Value::Bv {
            width,
            words: bv::from_u64(value, width),
        }
    }

    /// `true` exactly for `Value::Bool(true)`.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

/// A finite function interpretation: explicit entries plus a default value.
///
/// Lookups scan the entries newest-first, so [`set`](Self::set) overrides
/// earlier entries for the same arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunInterp {
    entries: Vec<(Vec<Value>, Value)>,
    default: Box<Value>,
}

impl FunInterp {
    /// An interpretation mapping every argument tuple to `default`.
    pub fn new(default: Value) -> Self {
        Self {
            entries: Vec::new(),
            default: Box::new(default),
        }
    }

    /// Maps `args` to `value`, overriding any previous entry.
    pub fn set(&mut self, args: Vec<Value>, value: Value) {
        self.entries.push((args, value));
    }

    /// The value of the function at `args`.
    pub fn apply(&self, args: &[Value]) -> &Value {
        for (entry, value) in self.entries.iter().rev() {
            if entry == args {
                return value;
            }
        }
        &self.default
    }
}

/// An assignment of values to uninterpreted terms, with a structural
/// evaluator over a [`TermTable`].
///
/// `eval` interprets every composite kind the table can hold and memoizes
/// per node. It returns `None` when the model is silent on some
/// uninterpreted subterm (or when integer arithmetic overflows), which
/// callers treat as "the model has no value here".
///
/// # Example
/// ```rust
/// use implify::{Model, TermTable, Sort, Value};
///
/// let mut terms = TermTable::new();
/// let x = terms.declare("x", Sort::Int);
/// let five = terms.arith_const(5);
/// let atom = terms.arith_lt(x, five);
///
/// let mut model = Model::new();
/// model.assign(x, Value::Int(3));
/// assert_eq!(model.eval(&terms, atom), Some(Value::Bool(true)));
///
/// let y = terms.declare("y", Sort::Int);
/// assert_eq!(model.eval(&terms, y), None); // the model is silent on y
/// ```
pub struct Model {
    map: HashMap<TermId, Value, RandomState>,
    // memoized values per unsigned node index
    cache: RefCell<HashMap<u32, Value, RandomState>>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            cache: RefCell::new(HashMap::with_hasher(RandomState::new())),
        }
    }
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a value to an uninterpreted term.
    ///
    /// Reassigning invalidates all memoized evaluations.
    pub fn assign(&mut self, t: TermId, value: Value) {
        debug_assert!(!t.is_neg());
        self.cache.get_mut().clear();
        self.map.insert(t, value);
    }

    /// Evaluates `t`, returning `None` when the model cannot interpret it.
    pub fn eval(&self, terms: &TermTable, t: TermId) -> Option<Value> {
        let v = self.eval_node(terms, t.positive())?;
        if t.is_neg() {
            match v {
                Value::Bool(b) => Some(Value::Bool(!b)),
                _ => None,
            }
        } else {
            Some(v)
        }
    }

    fn eval_node(&self, terms: &TermTable, t: TermId) -> Option<Value> {
        if let Some(v) = self.cache.borrow().get(&t.raw()) {
            return Some(v.clone());
        }
        let v = self.compute(terms, t)?;
        self.cache.borrow_mut().insert(t.raw(), v.clone());
        Some(v)
    }

    fn compute(&self, terms: &TermTable, t: TermId) -> Option<Value> {
        match terms.data(t) {
            TermData::BoolConst => Some(Value::Bool(true)),
            TermData::ArithConst(c) => Some(Value::Int(*c)),
            TermData::BvConst { width, words } => Some(Value::Bv {
                width: *width,
                words: words.clone(),
            }),
            TermData::Uninterpreted { .. } => self.map.get(&t).cloned(),
            TermData::Variable { .. } => None,
            TermData::ArithEq0(u) => Some(Value::Bool(self.int(terms, *u)? == 0)),
            TermData::ArithGe0(u) => Some(Value::Bool(self.int(terms, *u)? >= 0)),
            TermData::Ite { cond, then, els } => {
                if self.bool(terms, *cond)? {
                    self.eval(terms, *then)
                } else {
                    self.eval(terms, *els)
                }
            }
            TermData::App { fun, args } => {
                let f = self.fun(terms, *fun)?;
                let vals = self.eval_all(terms, args)?;
                Some(f.apply(&vals).clone())
            }
            TermData::Update { fun, args, value } => {
                let mut f = self.fun(terms, *fun)?;
                let vals = self.eval_all(terms, args)?;
                let v = self.eval(terms, *value)?;
                f.set(vals, v);
                Some(Value::Fun(f))
            }
            TermData::Tuple(args) => Some(Value::Tuple(self.eval_all(terms, args)?)),
            TermData::Eq(a, b) => {
                Some(Value::Bool(self.eval(terms, *a)? == self.eval(terms, *b)?))
            }
            TermData::Distinct(args) => {
                let vals = self.eval_all(terms, args)?;
                for i in 0..vals.len() {
                    for j in (i + 1)..vals.len() {
                        if vals[i] == vals[j] {
                            return Some(Value::Bool(false));
                        }
                    }
                }
                Some(Value::Bool(true))
            }
            TermData::Forall { .. } | TermData::Lambda { .. } => None,
            TermData::Or(args) => {
                // true if any disjunct is true; false only when all are false
                let mut unknown = false;
                for &a in args {
                    match self.eval(terms, a) {
                        Some(Value::Bool(true)) => return Some(Value::Bool(true)),
                        Some(Value::Bool(false)) => {}
                        _ => unknown = true,
                    }
                }
                if unknown { None } else { Some(Value::Bool(false)) }
            }
            TermData::Xor(args) => {
                let mut b = false;
                for &a in args {
                    b ^= self.bool(terms, a)?;
                }
                Some(Value::Bool(b))
            }
            TermData::ArithBinEq(a, b) => {
                Some(Value::Bool(self.int(terms, *a)? == self.int(terms, *b)?))
            }
            TermData::BvArray(bits) => {
                let width = bits.len() as u32;
                let mut words = vec![0u64; bv::words_needed(width)];
                for (i, &bit) in bits.iter().enumerate() {
                    if self.bool(terms, bit)? {
                        words[i / 64] |= 1u64 << (i % 64);
                    }
                }
                Some(Value::Bv { width, words })
            }
            TermData::BvDiv(a, b) => {
                self.bv_bin(terms, *a, *b, |x, y, w| bv::udiv_urem(x, y, w).0)
            }
            TermData::BvRem(a, b) => {
                self.bv_bin(terms, *a, *b, |x, y, w| bv::udiv_urem(x, y, w).1)
            }
            TermData::BvSDiv(a, b) => self.bv_bin(terms, *a, *b, bv::sdiv),
            TermData::BvSRem(a, b) => self.bv_bin(terms, *a, *b, bv::srem),
            TermData::BvSMod(a, b) => self.bv_bin(terms, *a, *b, bv::smod),
            TermData::BvShl(a, b) => {
                self.bv_bin(terms, *a, *b, |x, y, w| bv::shl(x, bv::shift_amount(y, w), w))
            }
            TermData::BvLShr(a, b) => {
                self.bv_bin(terms, *a, *b, |x, y, w| bv::lshr(x, bv::shift_amount(y, w), w))
            }
            TermData::BvAShr(a, b) => {
                self.bv_bin(terms, *a, *b, |x, y, w| bv::ashr(x, bv::shift_amount(y, w), w))
            }
            TermData::BvEq(a, b) => {
                Some(Value::Bool(self.bv(terms, *a)?.0 == self.bv(terms, *b)?.0))
            }
            TermData::BvGe(a, b) => {
                let (x, _) = self.bv(terms, *a)?;
                let (y, _) = self.bv(terms, *b)?;
                Some(Value::Bool(bv::ucmp(&x, &y) != Ordering::Less))
            }
            TermData::BvSGe(a, b) => {
                let (x, w) = self.bv(terms, *a)?;
                let (y, _) = self.bv(terms, *b)?;
                Some(Value::Bool(bv::scmp(&x, &y, w) != Ordering::Less))
            }
            TermData::Select { idx, tuple } => match self.eval(terms, *tuple)? {
                Value::Tuple(vals) => vals.into_iter().nth(*idx as usize),
                _ => None,
            },
            TermData::Bit { idx, bv: v } => {
                let (words, _) = self.bv(terms, *v)?;
                Some(Value::Bool(bv::bit(&words, *idx)))
            }
            TermData::PowerProduct(factors) => match terms.sort(t) {
                Sort::BitVec(w) => {
                    let w = *w;
                    let mut acc = bv::from_u64(1, w);
                    for &(base, exp) in factors {
                        let (x, _) = self.bv(terms, base)?;
                        for _ in 0..exp {
                            acc = bv::mul(&acc, &x, w);
                        }
                    }
                    Some(Value::Bv { width: w, words: acc })
                }
                _ => {
                    let mut acc: i64 = 1;
                    for &(base, exp) in factors {
                        let x = self.int(terms, base)?;
                        acc = acc.checked_mul(x.checked_pow(exp)?)?;
                    }
                    Some(Value::Int(acc))
                }
            },
            TermData::ArithPoly(monos) => {
                let mut acc: i64 = 0;
                for m in monos {
                    let part = if m.var == TermId::CONST_IDX {
                        m.coeff
                    } else {
                        m.coeff.checked_mul(self.int(terms, m.var)?)?
                    };
                    acc = acc.checked_add(part)?;
                }
                Some(Value::Int(acc))
            }
            TermData::BvPoly64 { width, monos } => {
                let w = *width;
                let mask = if w == 64 { u64::MAX } else { (1u64 << w) - 1 };
                let mut acc = 0u64;
                for m in monos {
                    let part = if m.var == TermId::CONST_IDX {
                        m.coeff
                    } else {
                        m.coeff.wrapping_mul(self.bv(terms, m.var)?.0[0])
                    };
                    acc = acc.wrapping_add(part) & mask;
                }
                Some(Value::Bv {
                    width: w,
                    words: vec![acc],
                })
            }
            TermData::BvPoly { width, monos } => {
                let w = *width;
                let mut acc = vec![0u64; bv::words_needed(w)];
                for m in monos {
                    let part = if m.var == TermId::CONST_IDX {
                        m.coeff.clone()
                    } else {
                        bv::mul(&m.coeff, &self.bv(terms, m.var)?.0, w)
                    };
                    acc = bv::add(&acc, &part, w);
                }
                Some(Value::Bv { width: w, words: acc })
            }
        }
    }

    fn int(&self, terms: &TermTable, t: TermId) -> Option<i64> {
        match self.eval(terms, t)? {
            Value::Int(x) => Some(x),
            _ => None,
        }
    }

    fn bool(&self, terms: &TermTable, t: TermId) -> Option<bool> {
        match self.eval(terms, t)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn bv(&self, terms: &TermTable, t: TermId) -> Option<(Vec<u64>, u32)> {
        match self.eval(terms, t)? {
            Value::Bv { width, words } => Some((words, width)),
            _ => None,
        }
    }

    fn fun(&self, terms: &TermTable, t: TermId) -> Option<FunInterp> {
        match self.eval(terms, t)? {
            Value::Fun(f) => Some(f),
            _ => None,
        }
    }

    fn eval_all(&self, terms: &TermTable, args: &[TermId]) -> Option<Vec<Value>> {
        args.iter().map(|&a| self.eval(terms, a)).collect()
    }

    fn bv_bin(
        &self,
        terms: &TermTable,
        a: TermId,
        b: TermId,
        op: fn(&[u64], &[u64], u32) -> Vec<u64>,
    ) -> Option<Value> {
        let (x, w) = self.bv(terms, a)?;
        let (y, _) = self.bv(terms, b)?;
        Some(Value::Bv {
            width: w,
            words: op(&x, &y, w),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Sort;

    #[test]
    fn evaluates_boolean_structure() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        let x0 = terms.arith_eq0(x);
        let y0 = terms.arith_eq0(y);
        let either = terms.or([x0, y0]);
        let both = terms.and([x0, y0]);

        let mut model = Model::new();
        model.assign(x, Value::Int(0));
        model.assign(y, Value::Int(7));

        assert_eq!(model.eval(&terms, either), Some(Value::Bool(true)));
        assert_eq!(model.eval(&terms, both), Some(Value::Bool(false)));
        assert_eq!(model.eval(&terms, both.negate()), Some(Value::Bool(true)));
        let p = terms.xor([x0, y0]);
        assert_eq!(model.eval(&terms, p), Some(Value::Bool(true)));
    }

    #[test]
    fn evaluates_ite_and_polynomials() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        // 2 + (ite (x < y) x y)
        let cond = terms.arith_lt(x, y);
        let picked = terms.ite(cond, x, y);
        let two = terms.arith_const(2);
        let sum = terms.arith_add(two, picked);

        let mut model = Model::new();
        model.assign(x, Value::Int(1));
        model.assign(y, Value::Int(3));
        assert_eq!(model.eval(&terms, sum), Some(Value::Int(3)));

        let sq = terms.power_product(&[(x, 2), (y, 1)]);
        assert_eq!(model.eval(&terms, sq), Some(Value::Int(3)));
    }

    #[test]
    fn silent_model_yields_none() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        let sum = terms.arith_add(x, y);

        let mut model = Model::new();
        model.assign(x, Value::Int(1));
        assert_eq!(model.eval(&terms, sum), None);
        // an or with one true disjunct tolerates a silent sibling
        let one = terms.arith_const(1);
        let x1 = terms.arith_eq(x, one);
        let y1 = terms.arith_eq(y, one);
        let or = terms.or([x1, y1]);
        assert_eq!(model.eval(&terms, or), Some(Value::Bool(true)));
    }

    #[test]
    fn evaluates_functions_and_tuples() {
        let mut terms = TermTable::new();
        let fsort = Sort::Fun {
            dom: vec![Sort::Int],
            ret: Box::new(Sort::Int),
        };
        let f = terms.declare("f", fsort);
        let x = terms.declare("x", Sort::Int);
        let fx = terms.app(f, vec![x]);

        let mut interp = FunInterp::new(Value::Int(0));
        interp.set(vec![Value::Int(5)], Value::Int(42));

        let mut model = Model::new();
        model.assign(f, Value::Fun(interp));
        model.assign(x, Value::Int(5));
        assert_eq!(model.eval(&terms, fx), Some(Value::Int(42)));

        // update overrides the interpretation at one point
        let seven = terms.arith_const(7);
        let g = terms.update(f, vec![x], seven);
        let five = terms.arith_const(5);
        let gother = terms.app(g, vec![five]);
        assert_eq!(model.eval(&terms, gother), Some(Value::Int(7)));

        let pair = terms.tuple(vec![x, seven]);
        let snd = terms.select(pair, 1);
        assert_eq!(model.eval(&terms, snd), Some(Value::Int(7)));
        assert_eq!(
            model.eval(&terms, pair),
            Some(Value::Tuple(vec![Value::Int(5), Value::Int(7)]))
        );
    }

    #[test]
    fn evaluates_bitvectors() {
        let mut terms = TermTable::new();
        let v = terms.declare("v", Sort::BitVec(8));
        let w = terms.declare("w", Sort::BitVec(8));
        let q = terms.bv_div(v, w);
        let ge = terms.bv_ge(v, w);
        let sge = terms.bv_sge(v, w);
        let b7 = terms.bit(v, 7);

        let mut model = Model::new();
        model.assign(v, Value::bv64(8, 200));
        model.assign(w, Value::bv64(8, 3));
        assert_eq!(model.eval(&terms, q), Some(Value::bv64(8, 66)));
        assert_eq!(model.eval(&terms, ge), Some(Value::Bool(true)));
        // 200 is negative as a signed byte
        assert_eq!(model.eval(&terms, sge), Some(Value::Bool(false)));
        assert_eq!(model.eval(&terms, b7), Some(Value::Bool(true)));

        let poly = terms.bv_linear64(8, &[(3, v), (1, TermId::CONST_IDX)]);
        assert_eq!(model.eval(&terms, poly), Some(Value::bv64(8, 89)));
    }
}
