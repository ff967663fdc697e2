//! The recursive rewriter behind [`LitCollector`].
//!
//! One case per term kind. Branching kinds (`ite`, true `or`) consult the
//! model and descend into a single child; every other composite descends
//! into all children in index order and rebuilds only when a child changed.
//! Rebuilding goes through the smart constructors, which may canonicalize a
//! Boolean composite all the way to a constant, so Boolean results are
//! re-evaluated and re-atomized after every rebuild.

use crate::collect::{CollectError, LitCollector};
use crate::term::{BvMono, BvMono64, Mono, TermData, TermId, TermTable};

impl LitCollector<'_> {
    /// Rewrites `t` to its atomic residue, recording literals as it goes.
    ///
    /// The memo is keyed by the node index with polarity stripped; the
    /// polarity is re-applied to the memoized result, so a term and its
    /// negation share one cache entry.
    pub(crate) fn visit(&mut self, t: TermId) -> Result<TermId, CollectError> {
        let neg = t.is_neg();
        let t = t.positive();
        let u = match self.cache.get(&t.raw()) {
            Some(&u) => u,
            None => {
                let u = self.visit_node(t)?;
                self.cache.insert(t.raw(), u);
                u
            }
        };
        Ok(u.negate_if(neg))
    }

    fn visit_node(&mut self, t: TermId) -> Result<TermId, CollectError> {
        // rebuilding interns new nodes, which can move descriptors; work
        // from a copy
        let data = self.terms.data(t).clone();
        match data {
            TermData::BoolConst | TermData::ArithConst(_) | TermData::BvConst { .. } => Ok(t),

            TermData::Uninterpreted { .. } => {
                if self.terms.is_boolean(t) {
                    self.register_atom(t)
                } else {
                    Ok(t)
                }
            }

            TermData::Variable { .. } => Err(CollectError::FreeVarInTerm),
            TermData::Forall { .. } => Err(CollectError::Quantifier),
            TermData::Lambda { .. } => Err(CollectError::Lambda),

            TermData::ArithEq0(u) => {
                let v = self.visit(u)?;
                let t = if v != u { self.terms.arith_eq0(v) } else { t };
                self.register_atom(t)
            }
            TermData::ArithGe0(u) => {
                let v = self.visit(u)?;
                let t = if v != u { self.terms.arith_ge0(v) } else { t };
                self.register_atom(t)
            }

            TermData::Ite { cond, then, els } => self.visit_ite(cond, then, els),
            TermData::Or(args) => self.visit_or(t, &args),
            TermData::Xor(args) => self.visit_xor(&args),

            TermData::Eq(a, b) => {
                let t = self.visit_bin(t, a, b, TermTable::eq)?;
                self.register_atom(t)
            }
            TermData::ArithBinEq(a, b) => {
                let t = self.visit_bin(t, a, b, TermTable::arith_bineq)?;
                self.register_atom(t)
            }
            TermData::Distinct(args) => {
                let t = self.visit_nary(t, &args, |terms, kids| terms.distinct(kids))?;
                self.register_atom(t)
            }

            TermData::App { fun, args } => self.visit_app(t, fun, &args),
            TermData::Update { fun, args, value } => self.visit_update(t, fun, &args, value),
            TermData::Tuple(args) => self.visit_nary(t, &args, TermTable::tuple),
            TermData::BvArray(args) => self.visit_nary(t, &args, TermTable::bv_array),

            TermData::BvDiv(a, b) => self.visit_bin(t, a, b, TermTable::bv_div),
            TermData::BvRem(a, b) => self.visit_bin(t, a, b, TermTable::bv_rem),
            TermData::BvSDiv(a, b) => self.visit_bin(t, a, b, TermTable::bv_sdiv),
            TermData::BvSRem(a, b) => self.visit_bin(t, a, b, TermTable::bv_srem),
            TermData::BvSMod(a, b) => self.visit_bin(t, a, b, TermTable::bv_smod),
            TermData::BvShl(a, b) => self.visit_bin(t, a, b, TermTable::bv_shl),
            TermData::BvLShr(a, b) => self.visit_bin(t, a, b, TermTable::bv_lshr),
            TermData::BvAShr(a, b) => self.visit_bin(t, a, b, TermTable::bv_ashr),

            TermData::BvEq(a, b) => {
                let t = self.visit_bin(t, a, b, TermTable::bv_eq)?;
                self.register_atom(t)
            }
            TermData::BvGe(a, b) => {
                let t = self.visit_bin(t, a, b, TermTable::bv_ge)?;
                self.register_atom(t)
            }
            TermData::BvSGe(a, b) => {
                let t = self.visit_bin(t, a, b, TermTable::bv_sge)?;
                self.register_atom(t)
            }

            TermData::Select { idx, tuple } => {
                let v = self.visit(tuple)?;
                let t = if v != tuple { self.terms.select(v, idx) } else { t };
                if self.terms.is_boolean(t) {
                    self.register_atom(t)
                } else {
                    Ok(t)
                }
            }
            TermData::Bit { idx, bv } => {
                let v = self.visit(bv)?;
                let t = if v != bv { self.terms.bit(v, idx) } else { t };
                self.register_atom(t)
            }

            TermData::PowerProduct(factors) => self.visit_pprod(t, &factors),
            TermData::ArithPoly(monos) => self.visit_poly(t, &monos),
            TermData::BvPoly64 { width, monos } => self.visit_bvpoly64(t, width, &monos),
            TermData::BvPoly { width, monos } => self.visit_bvpoly(t, width, &monos),
        }
    }

    /// Simplify the condition to a constant, then descend into the chosen
    /// branch only. The untaken branch contributes no literals.
    fn visit_ite(
        &mut self,
        cond: TermId,
        then: TermId,
        els: TermId,
    ) -> Result<TermId, CollectError> {
        let picked = match self.visit(cond)? {
            TermId::TRUE => then,
            TermId::FALSE => els,
            _ => return Err(CollectError::Internal),
        };
        self.visit(picked)
    }

    /// A true disjunction is explained by its first true disjunct; the rest
    /// are never visited. A false disjunction descends into every disjunct,
    /// each of which must reduce to `FALSE`.
    fn visit_or(&mut self, t: TermId, args: &[TermId]) -> Result<TermId, CollectError> {
        if self.term_is_true(t)? {
            for &d in args {
                if self.term_is_true(d)? {
                    if self.visit(d)? != TermId::TRUE {
                        return Err(CollectError::Internal);
                    }
                    return Ok(TermId::TRUE);
                }
            }
            // contradicts the disjunction being true in the model
            Err(CollectError::Internal)
        } else {
            for &d in args {
                if self.visit(d)? != TermId::FALSE {
                    return Err(CollectError::Internal);
                }
            }
            Ok(TermId::FALSE)
        }
    }

    /// No short-circuiting: every child is visited and contributes its
    /// literals, and the truth values are folded.
    fn visit_xor(&mut self, args: &[TermId]) -> Result<TermId, CollectError> {
        let mut parity = false;
        for &a in args {
            match self.visit(a)? {
                TermId::TRUE => parity = !parity,
                TermId::FALSE => {}
                _ => return Err(CollectError::Internal),
            }
        }
        Ok(TermId::from_bool(parity))
    }

    fn visit_bin(
        &mut self,
        t: TermId,
        a: TermId,
        b: TermId,
        rebuild: fn(&mut TermTable, TermId, TermId) -> TermId,
    ) -> Result<TermId, CollectError> {
        let va = self.visit(a)?;
        let vb = self.visit(b)?;
        if va != a || vb != b {
            Ok(rebuild(self.terms, va, vb))
        } else {
            Ok(t)
        }
    }

    fn visit_nary(
        &mut self,
        t: TermId,
        args: &[TermId],
        rebuild: fn(&mut TermTable, Vec<TermId>) -> TermId,
    ) -> Result<TermId, CollectError> {
        let (buf, changed) = self.visit_args(args)?;
        let t = if changed {
            rebuild(self.terms, buf.clone())
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_app(&mut self, t: TermId, fun: TermId, args: &[TermId]) -> Result<TermId, CollectError> {
        let vf = self.visit(fun)?;
        let (buf, changed) = self.visit_args(args)?;
        let t = if vf != fun || changed {
            self.terms.app(vf, buf.clone())
        } else {
            t
        };
        self.scratch.give(buf);
        if self.terms.is_boolean(t) {
            self.register_atom(t)
        } else {
            Ok(t)
        }
    }

    fn visit_update(
        &mut self,
        t: TermId,
        fun: TermId,
        args: &[TermId],
        value: TermId,
    ) -> Result<TermId, CollectError> {
        let vf = self.visit(fun)?;
        let (buf, changed) = self.visit_args(args)?;
        let vv = self.visit(value)?;
        let t = if vf != fun || changed || vv != value {
            self.terms.update(vf, buf.clone(), vv)
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_pprod(&mut self, t: TermId, factors: &[(TermId, u32)]) -> Result<TermId, CollectError> {
        let mut buf = self.scratch.take(factors.len());
        let mut changed = false;
        for &(base, _) in factors {
            let v = self.visit(base)?;
            changed |= v != base;
            buf.push(v);
        }
        let t = if changed {
            self.terms.power_product_rebuild(factors, &buf)
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_poly(&mut self, t: TermId, monos: &[Mono]) -> Result<TermId, CollectError> {
        let mut buf = self.scratch.take(monos.len());
        let mut changed = false;
        for m in monos {
            if m.var == TermId::CONST_IDX {
                buf.push(TermId::CONST_IDX); // the constant monomial stays put
            } else {
                let v = self.visit(m.var)?;
                changed |= v != m.var;
                buf.push(v);
            }
        }
        let t = if changed {
            self.terms.arith_poly_rebuild(monos, &buf)
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_bvpoly64(
        &mut self,
        t: TermId,
        width: u32,
        monos: &[BvMono64],
    ) -> Result<TermId, CollectError> {
        let mut buf = self.scratch.take(monos.len());
        let mut changed = false;
        for m in monos {
            if m.var == TermId::CONST_IDX {
                buf.push(TermId::CONST_IDX);
            } else {
                let v = self.visit(m.var)?;
                changed |= v != m.var;
                buf.push(v);
            }
        }
        let t = if changed {
            self.terms.bv_poly64_rebuild(width, monos, &buf)
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_bvpoly(
        &mut self,
        t: TermId,
        width: u32,
        monos: &[BvMono],
    ) -> Result<TermId, CollectError> {
        let mut buf = self.scratch.take(monos.len());
        let mut changed = false;
        for m in monos {
            if m.var == TermId::CONST_IDX {
                buf.push(TermId::CONST_IDX);
            } else {
                let v = self.visit(m.var)?;
                changed |= v != m.var;
                buf.push(v);
            }
        }
        let t = if changed {
            self.terms.bv_poly_rebuild(width, monos, &buf)
        } else {
            t
        };
        self.scratch.give(buf);
        Ok(t)
    }

    fn visit_args(&mut self, args: &[TermId]) -> Result<(Vec<TermId>, bool), CollectError> {
        let mut buf = self.scratch.take(args.len());
        let mut changed = false;
        for &a in args {
            let v = self.visit(a)?;
            changed |= v != a;
            buf.push(v);
        }
        Ok((buf, changed))
    }
}

#[cfg(test)]
mod tests {
    use crate::collect::LitCollector;
    use crate::model::{FunInterp, Model, Value};
    use crate::term::{Sort, TermId, TermTable};

    #[test]
    fn boolean_application_becomes_an_atom() {
        let mut terms = TermTable::new();
        let psort = Sort::Fun {
            dom: vec![Sort::Int],
            ret: Box::new(Sort::Bool),
        };
        let p = terms.declare("p", psort);
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        let cond = terms.arith_lt(x, y);
        let picked = terms.ite(cond, x, y);
        let applied = terms.app(p, vec![picked]);

        let mut interp = FunInterp::new(Value::Bool(false));
        interp.set(vec![Value::Int(1)], Value::Bool(true));
        let mut model = Model::new();
        model.assign(p, Value::Fun(interp));
        model.assign(x, Value::Int(1));
        model.assign(y, Value::Int(3));

        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(applied), Ok(TermId::TRUE));
        let lits = collector.into_literals();
        // the rebuilt atom ranges over the taken branch only
        let expected = terms.app(p, vec![x]);
        assert_eq!(lits, vec![cond, expected]);
    }

    #[test]
    fn bit_extraction_over_an_ite_reduces() {
        let mut terms = TermTable::new();
        let v = terms.declare("v", Sort::BitVec(4));
        let w = terms.declare("w", Sort::BitVec(4));
        let c = terms.bv_ge(v, w);
        let picked = terms.ite(c, v, w);
        let b = terms.bit(picked, 0);

        let mut model = Model::new();
        model.assign(v, Value::bv64(4, 0b1010));
        model.assign(w, Value::bv64(4, 0b0011));

        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(b), Ok(TermId::FALSE));
        let lits = collector.into_literals();
        let vbit = terms.bit(v, 0);
        assert_eq!(lits, vec![c, vbit.negate()]);
    }

    #[test]
    fn polynomial_rebuild_folds_constants() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        let zero = terms.arith_const(0);
        let x0 = terms.arith_eq(x, zero);
        // (ite (= x 0) 0 x) + y, with x = 0: the branch constant folds into
        // the polynomial and the residue is just y
        let picked = terms.ite(x0, zero, x);
        let sum = terms.arith_add(picked, y);

        let mut model = Model::new();
        model.assign(x, Value::Int(0));
        model.assign(y, Value::Int(9));

        let mut collector = LitCollector::new(&mut terms, &model);
        assert_eq!(collector.process(sum), Ok(y));
        assert_eq!(collector.literals(), &[x0]);
    }

    #[test]
    fn xor_child_that_simplifies_to_constant_adds_no_literal() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);
        let eq = terms.eq(p, q);
        let f = terms.xor([eq, p]);

        let mut model = Model::new();
        model.assign(p, Value::Bool(true));
        model.assign(q, Value::Bool(false));

        let mut collector = LitCollector::new(&mut terms, &model);
        // the equality rebuilds over constants and folds away without
        // recording itself; only the leaf atoms are collected
        assert_eq!(collector.process(f), Ok(TermId::TRUE));
        assert_eq!(collector.literals(), &[p, q.negate()]);
    }
}
