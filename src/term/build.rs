use crate::term::{BvMono, BvMono64, Mono, Sort, TermData, TermId, TermTable, bv};

use std::cmp::Ordering;

/// Construction methods.
///
/// Every method acts as a **Smart Constructor**: it performs immediate
/// on-the-fly normalization (constant folding, child ordering, complement
/// detection) and interns the result. A constructor may therefore return a
/// term of a different kind than the one requested, e.g. a disjunction may
/// collapse to [`TermId::TRUE`].
impl TermTable {
    /// Declares an uninterpreted constant (or function, for a `Fun` sort).
    ///
    /// Declaring the same name with the same sort twice returns the same handle.
    ///
    /// # Example
    /// ```rust
    /// use implify::{TermTable, Sort};
    /// let mut terms = TermTable::new();
    /// let x1 = terms.declare("x", Sort::Int);
    /// let x2 = terms.declare("x", Sort::Int);
    /// assert_eq!(x1, x2);
    /// ```
    pub fn declare(&mut self, name: &str, sort: Sort) -> TermId {
        self.intern(
            TermData::Uninterpreted {
                name: name.to_string(),
                sort: sort.clone(),
            },
            sort,
        )
    }

    /// Creates a free variable. Free variables are only legal below a
    /// quantifier or lambda binder.
    pub fn variable(&mut self, name: &str, sort: Sort) -> TermId {
        self.intern(
            TermData::Variable {
                name: name.to_string(),
                sort: sort.clone(),
            },
            sort,
        )
    }

    /// Creates an integer constant.
    pub fn arith_const(&mut self, c: i64) -> TermId {
        self.intern(TermData::ArithConst(c), Sort::Int)
    }

    /// Creates a bit-vector constant from little-endian limbs, masked to `width`.
    pub fn bv_const(&mut self, width: u32, words: Vec<u64>) -> TermId {
        let words = bv::mask(words, width);
        self.intern(TermData::BvConst { width, words }, Sort::BitVec(width))
    }

    /// Creates a bit-vector constant of width <= 64 from a single limb.
    pub fn bv_const64(&mut self, width: u32, value: u64) -> TermId {
        self.bv_const(width, vec![value])
    }

    /// Creates an n-ary disjunction (`OR`).
    ///
    /// # Simplifications Performed
    /// * **Commutativity:** children are sorted.
    /// * **Idempotence:** `a | a` -> `a`.
    /// * **Identity:** `a | false` -> `a`.
    /// * **Annihilation:** `a | true` -> `true`.
    /// * **Complements:** `a | !a` -> `true`.
    /// * **Singleton:** `or([a])` -> `a`, `or([])` -> `false`.
    pub fn or(&mut self, children: impl IntoIterator<Item = TermId>) -> TermId {
        let mut kids: Vec<TermId> = children.into_iter().collect();

        // places a and !a next to each other
        kids.sort_unstable(); // commutative, b | a == a | b
        kids.dedup(); // idempotent, a | a == a

        // identity and annulment; the constants sort first
        if let Some(&first) = kids.first() {
            if first == TermId::TRUE {
                return TermId::TRUE;
            }
            if first == TermId::FALSE {
                kids.remove(0);
            }
        }

        // complements, a | !a == true
        for w in kids.windows(2) {
            if w[0].idx() == w[1].idx() {
                return TermId::TRUE;
            }
        }

        match kids.len() {
            0 => TermId::FALSE,
            1 => kids[0],
            _ => self.intern(TermData::Or(kids), Sort::Bool),
        }
    }

    /// Creates an n-ary conjunction.
    ///
    /// There is no conjunction node: `and(a, b)` is `!(!a | !b)`, so all the
    /// [`or`](Self::or) simplifications apply through the negations.
    pub fn and(&mut self, children: impl IntoIterator<Item = TermId>) -> TermId {
        let negs: Vec<TermId> = children.into_iter().map(|c| c.negate()).collect();
        self.or(negs).negate()
    }

    /// Creates an n-ary exclusive or.
    ///
    /// Child polarities and constants are lifted to the root, so the stored
    /// node only ever holds positive, non-constant children: `xor(!a, b)`
    /// interns the same node as `xor(a, b)` with the result negated.
    /// Duplicate pairs cancel (`a ^ a` -> `false`).
    pub fn xor(&mut self, children: impl IntoIterator<Item = TermId>) -> TermId {
        let mut neg = false;
        let mut kids: Vec<TermId> = Vec::new();
        for c in children {
            debug_assert!(self.is_boolean(c));
            if c.is_neg() {
                neg = !neg;
            }
            let c = c.positive();
            if c == TermId::TRUE {
                neg = !neg; // xor with true flips, xor with false is identity
                continue;
            }
            kids.push(c);
        }
        kids.sort_unstable();

        // cancel pairs
        let mut out: Vec<TermId> = Vec::with_capacity(kids.len());
        for c in kids {
            if out.last() == Some(&c) {
                out.pop();
            } else {
                out.push(c);
            }
        }

        let t = match out.len() {
            0 => TermId::FALSE,
            1 => out[0],
            _ => self.intern(TermData::Xor(out), Sort::Bool),
        };
        t.negate_if(neg)
    }

    /// Creates an if-then-else term.
    ///
    /// The condition is canonicalized to positive polarity (swapping the
    /// branches), constant conditions and equal branches fold away, and a
    /// Boolean ite over constants reduces to the condition itself.
    pub fn ite(&mut self, cond: TermId, then: TermId, els: TermId) -> TermId {
        debug_assert!(self.is_boolean(cond));
        let (cond, then, els) = if cond.is_neg() {
            (cond.positive(), els, then)
        } else {
            (cond, then, els)
        };
        if cond == TermId::TRUE {
            return then;
        }
        if then == els {
            return then;
        }
        if then == TermId::TRUE && els == TermId::FALSE {
            return cond;
        }
        if then == TermId::FALSE && els == TermId::TRUE {
            return cond.negate();
        }
        let sort = self.sort(then).clone();
        self.intern(
            TermData::Ite {
                cond,
                then,
                els,
            },
            sort,
        )
    }

    /// Creates an equality.
    ///
    /// Operands are ordered, identical operands fold to `true`, Boolean
    /// equality folds against constants and complements and canonicalizes
    /// operand polarities, and equality of two distinct interpreted
    /// constants folds to `false`.
    pub fn eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return TermId::TRUE;
        }
        if self.is_boolean(lhs) {
            if lhs == rhs.negate() {
                return TermId::FALSE;
            }
            if lhs.positive() == TermId::TRUE {
                return rhs.negate_if(lhs == TermId::FALSE);
            }
            if rhs.positive() == TermId::TRUE {
                return lhs.negate_if(rhs == TermId::FALSE);
            }
            // (!a = !b) == (a = b), (!a = b) == !(a = b)
            let neg = lhs.is_neg() ^ rhs.is_neg();
            let (a, b) = order(lhs.positive(), rhs.positive());
            return self.intern(TermData::Eq(a, b), Sort::Bool).negate_if(neg);
        }
        if self.is_interpreted_const(lhs) && self.is_interpreted_const(rhs) {
            return TermId::FALSE; // distinct interned constants denote distinct values
        }
        let (a, b) = order(lhs, rhs);
        self.intern(TermData::Eq(a, b), Sort::Bool)
    }

    /// Creates an n-ary distinctness constraint.
    ///
    /// Syntactically equal members fold to `false`, fewer than two members
    /// fold to `true`, exactly two become a negated equality, and a set of
    /// interpreted constants folds to `true`.
    pub fn distinct(&mut self, members: impl IntoIterator<Item = TermId>) -> TermId {
        let mut args: Vec<TermId> = members.into_iter().collect();
        args.sort_unstable();
        let n = args.len();
        args.dedup();
        if args.len() != n {
            return TermId::FALSE;
        }
        match args.len() {
            0 | 1 => TermId::TRUE,
            2 => self.eq(args[0], args[1]).negate(),
            _ => {
                if args.iter().all(|&a| self.is_interpreted_const(a)) {
                    return TermId::TRUE;
                }
                self.intern(TermData::Distinct(args), Sort::Bool)
            }
        }
    }

    fn is_interpreted_const(&self, t: TermId) -> bool {
        matches!(
            self.data(t),
            TermData::BoolConst | TermData::ArithConst(_) | TermData::BvConst { .. }
        )
    }

    /// Creates the atom `u = 0` over an integer term.
    pub fn arith_eq0(&mut self, u: TermId) -> TermId {
        if let TermData::ArithConst(c) = self.data(u) {
            return TermId::from_bool(*c == 0);
        }
        self.intern(TermData::ArithEq0(u), Sort::Bool)
    }

    /// Creates the atom `u >= 0` over an integer term.
    pub fn arith_ge0(&mut self, u: TermId) -> TermId {
        if let TermData::ArithConst(c) = self.data(u) {
            return TermId::from_bool(*c >= 0);
        }
        self.intern(TermData::ArithGe0(u), Sort::Bool)
    }

    /// Creates a binary integer equality, kept in binary form.
    pub fn arith_bineq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return TermId::TRUE;
        }
        if let (TermData::ArithConst(a), TermData::ArithConst(b)) =
            (self.data(lhs), self.data(rhs))
        {
            return TermId::from_bool(a == b);
        }
        let (a, b) = order(lhs, rhs);
        self.intern(TermData::ArithBinEq(a, b), Sort::Bool)
    }

    /// Builds the normalized linear combination `sum(coeff * term)`.
    ///
    /// A term of [`TermId::CONST_IDX`] stands for the literal constant 1, so
    /// `(k, CONST_IDX)` contributes `k`. Constants and nested polynomials
    /// among the terms are folded in, like monomials are combined, zero
    /// coefficients are dropped, and trivial results collapse to a constant
    /// or a bare term. The constant monomial of an interned polynomial comes
    /// first, remaining monomials are ordered by term index.
    pub fn arith_linear(&mut self, terms: &[(i64, TermId)]) -> TermId {
        let mut constant: i64 = 0;
        let mut monos: Vec<Mono> = Vec::with_capacity(terms.len());
        for &(k, t) in terms {
            if k == 0 {
                continue;
            }
            if t == TermId::CONST_IDX {
                constant = constant.wrapping_add(k);
                continue;
            }
            match self.data(t) {
                TermData::ArithConst(c) => constant = constant.wrapping_add(k.wrapping_mul(*c)),
                TermData::ArithPoly(ms) => {
                    for m in ms {
                        if m.var == TermId::CONST_IDX {
                            constant = constant.wrapping_add(k.wrapping_mul(m.coeff));
                        } else {
                            monos.push(Mono {
                                coeff: k.wrapping_mul(m.coeff),
                                var: m.var,
                            });
                        }
                    }
                }
                _ => monos.push(Mono { coeff: k, var: t }),
            }
        }

        monos.sort_unstable_by_key(|m| m.var.raw());
        let mut combined: Vec<Mono> = Vec::with_capacity(monos.len());
        for m in monos {
            match combined.last_mut() {
                Some(last) if last.var == m.var => last.coeff = last.coeff.wrapping_add(m.coeff),
                _ => combined.push(m),
            }
        }
        combined.retain(|m| m.coeff != 0);

        if combined.is_empty() {
            return self.arith_const(constant);
        }
        if constant == 0 && combined.len() == 1 && combined[0].coeff == 1 {
            return combined[0].var;
        }
        let mut out = Vec::with_capacity(combined.len() + 1);
        if constant != 0 {
            out.push(Mono {
                coeff: constant,
                var: TermId::CONST_IDX,
            });
        }
        out.extend(combined);
        self.intern(TermData::ArithPoly(out), Sort::Int)
    }

    /// Rebuilds a polynomial whose monomial terms have been replaced.
    /// `vars[i]` replaces the term of `monos[i]`; the constant monomial
    /// passes its sentinel through unchanged.
    pub fn arith_poly_rebuild(&mut self, monos: &[Mono], vars: &[TermId]) -> TermId {
        let terms: Vec<(i64, TermId)> =
            monos.iter().zip(vars).map(|(m, &v)| (m.coeff, v)).collect();
        self.arith_linear(&terms)
    }

    /// `lhs + rhs` as a normalized polynomial.
    pub fn arith_add(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.arith_linear(&[(1, lhs), (1, rhs)])
    }

    /// `lhs - rhs` as a normalized polynomial.
    pub fn arith_sub(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.arith_linear(&[(1, lhs), (-1, rhs)])
    }

    /// The atom `lhs = rhs`, normalized to `lhs - rhs = 0`.
    pub fn arith_eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let d = self.arith_sub(lhs, rhs);
        self.arith_eq0(d)
    }

    /// The atom `lhs >= rhs`, normalized to `lhs - rhs >= 0`.
    pub fn arith_ge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let d = self.arith_sub(lhs, rhs);
        self.arith_ge0(d)
    }

    /// The atom `lhs <= rhs`.
    pub fn arith_le(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.arith_ge(rhs, lhs)
    }

    /// The atom `lhs < rhs`, as the negation of `lhs >= rhs`.
    pub fn arith_lt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.arith_ge(lhs, rhs).negate()
    }

    /// The atom `lhs > rhs`.
    pub fn arith_gt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.arith_lt(rhs, lhs)
    }

    /// Builds a normalized power product `prod(base ^ exponent)`.
    ///
    /// Equal bases merge their exponents, zero exponents are dropped,
    /// constant bases fold into a scalar coefficient, and trivial results
    /// collapse to a constant or a bare term.
    pub fn power_product(&mut self, factors: &[(TermId, u32)]) -> TermId {
        let sort = match factors.first() {
            Some(&(t, _)) => self.sort(t).clone(),
            None => Sort::Int,
        };

        let mut rest: Vec<(TermId, u32)> = Vec::with_capacity(factors.len());
        match sort {
            Sort::BitVec(width) => {
                let mut coeff = bv::from_u64(1, width);
                for &(t, e) in factors {
                    if e == 0 {
                        continue;
                    }
                    if let TermData::BvConst { words, .. } = self.data(t) {
                        let words = words.clone();
                        for _ in 0..e {
                            coeff = bv::mul(&coeff, &words, width);
                        }
                    } else {
                        rest.push((t, e));
                    }
                }
                let core = self.pprod_core(rest, Sort::BitVec(width));
                match core {
                    Some(core) => self.bv_linear(width, &[(coeff, core)]),
                    None => self.bv_const(width, coeff),
                }
            }
            _ => {
                let mut coeff: i64 = 1;
                for &(t, e) in factors {
                    if e == 0 {
                        continue;
                    }
                    if let TermData::ArithConst(c) = self.data(t) {
                        coeff = coeff.wrapping_mul(c.wrapping_pow(e));
                    } else {
                        rest.push((t, e));
                    }
                }
                let core = self.pprod_core(rest, Sort::Int);
                match core {
                    Some(core) => self.arith_linear(&[(coeff, core)]),
                    None => self.arith_const(coeff),
                }
            }
        }
    }

    /// Merges exponents and interns the non-constant part of a power
    /// product; `None` when every factor folded away.
    fn pprod_core(&mut self, mut factors: Vec<(TermId, u32)>, sort: Sort) -> Option<TermId> {
        factors.sort_unstable_by_key(|&(t, _)| t.raw());
        let mut merged: Vec<(TermId, u32)> = Vec::with_capacity(factors.len());
        for (t, e) in factors {
            match merged.last_mut() {
                Some(last) if last.0 == t => last.1 += e,
                _ => merged.push((t, e)),
            }
        }
        match merged.len() {
            0 => None,
            1 if merged[0].1 == 1 => Some(merged[0].0),
            _ => Some(self.intern(TermData::PowerProduct(merged), sort)),
        }
    }

    /// Rebuilds a power product whose bases have been replaced, keeping the
    /// exponents.
    pub fn power_product_rebuild(
        &mut self,
        factors: &[(TermId, u32)],
        bases: &[TermId],
    ) -> TermId {
        let rebuilt: Vec<(TermId, u32)> = factors
            .iter()
            .zip(bases)
            .map(|(&(_, e), &b)| (b, e))
            .collect();
        self.power_product(&rebuilt)
    }

    /// Builds a normalized bit-vector linear combination for widths <= 64.
    ///
    /// Mirrors [`arith_linear`](Self::arith_linear), with all arithmetic
    /// performed modulo `2^width`.
    pub fn bv_linear64(&mut self, width: u32, terms: &[(u64, TermId)]) -> TermId {
        debug_assert!(width <= 64);
        let m = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let mut constant: u64 = 0;
        let mut monos: Vec<BvMono64> = Vec::with_capacity(terms.len());
        for &(k, t) in terms {
            let k = k & m;
            if k == 0 {
                continue;
            }
            if t == TermId::CONST_IDX {
                constant = constant.wrapping_add(k) & m;
                continue;
            }
            match self.data(t) {
                TermData::BvConst { words, .. } => {
                    constant = constant.wrapping_add(k.wrapping_mul(words[0])) & m;
                }
                TermData::BvPoly64 { monos: ms, .. } => {
                    for mm in ms {
                        if mm.var == TermId::CONST_IDX {
                            constant = constant.wrapping_add(k.wrapping_mul(mm.coeff)) & m;
                        } else {
                            monos.push(BvMono64 {
                                coeff: k.wrapping_mul(mm.coeff) & m,
                                var: mm.var,
                            });
                        }
                    }
                }
                _ => monos.push(BvMono64 { coeff: k, var: t }),
            }
        }

        monos.sort_unstable_by_key(|mm| mm.var.raw());
        let mut combined: Vec<BvMono64> = Vec::with_capacity(monos.len());
        for mm in monos {
            match combined.last_mut() {
                Some(last) if last.var == mm.var => {
                    last.coeff = last.coeff.wrapping_add(mm.coeff) & m;
                }
                _ => combined.push(mm),
            }
        }
        combined.retain(|mm| mm.coeff != 0);

        if combined.is_empty() {
            return self.bv_const64(width, constant);
        }
        if constant == 0 && combined.len() == 1 && combined[0].coeff == 1 {
            return combined[0].var;
        }
        let mut out = Vec::with_capacity(combined.len() + 1);
        if constant != 0 {
            out.push(BvMono64 {
                coeff: constant,
                var: TermId::CONST_IDX,
            });
        }
        out.extend(combined);
        self.intern(TermData::BvPoly64 { width, monos: out }, Sort::BitVec(width))
    }

    /// Rebuilds a width <= 64 bit-vector polynomial whose monomial terms
    /// have been replaced.
    pub fn bv_poly64_rebuild(
        &mut self,
        width: u32,
        monos: &[BvMono64],
        vars: &[TermId],
    ) -> TermId {
        let terms: Vec<(u64, TermId)> =
            monos.iter().zip(vars).map(|(m, &v)| (m.coeff, v)).collect();
        self.bv_linear64(width, &terms)
    }

    /// Builds a normalized wide bit-vector linear combination. Widths <= 64
    /// are routed to [`bv_linear64`](Self::bv_linear64) so narrow
    /// polynomials keep their canonical single-limb representation.
    pub fn bv_linear(&mut self, width: u32, terms: &[(Vec<u64>, TermId)]) -> TermId {
        if width <= 64 {
            let narrow: Vec<(u64, TermId)> = terms
                .iter()
                .map(|(k, t)| (k.first().copied().unwrap_or(0), *t))
                .collect();
            return self.bv_linear64(width, &narrow);
        }
        let n = bv::words_needed(width);
        let mut constant = vec![0u64; n];
        let mut monos: Vec<BvMono> = Vec::with_capacity(terms.len());
        for (k, t) in terms {
            let k = bv::mask(k.clone(), width);
            if bv::is_zero(&k) {
                continue;
            }
            if *t == TermId::CONST_IDX {
                constant = bv::add(&constant, &k, width);
                continue;
            }
            match self.data(*t) {
                TermData::BvConst { words, .. } => {
                    let prod = bv::mul(&k, words, width);
                    constant = bv::add(&constant, &prod, width);
                }
                TermData::BvPoly { monos: ms, .. } => {
                    for mm in ms {
                        let prod = bv::mul(&k, &mm.coeff, width);
                        if mm.var == TermId::CONST_IDX {
                            constant = bv::add(&constant, &prod, width);
                        } else {
                            monos.push(BvMono {
                                coeff: prod,
                                var: mm.var,
                            });
                        }
                    }
                }
                _ => monos.push(BvMono { coeff: k, var: *t }),
            }
        }

        monos.sort_unstable_by_key(|mm| mm.var.raw());
        let mut combined: Vec<BvMono> = Vec::with_capacity(monos.len());
        for mm in monos {
            match combined.last_mut() {
                Some(last) if last.var == mm.var => {
                    last.coeff = bv::add(&last.coeff, &mm.coeff, width);
                }
                _ => combined.push(mm),
            }
        }
        combined.retain(|mm| !bv::is_zero(&mm.coeff));

        if combined.is_empty() {
            return self.bv_const(width, constant);
        }
        let one = bv::from_u64(1, width);
        if bv::is_zero(&constant) && combined.len() == 1 && combined[0].coeff == one {
            return combined[0].var;
        }
        let mut out = Vec::with_capacity(combined.len() + 1);
        if !bv::is_zero(&constant) {
            out.push(BvMono {
                coeff: constant,
                var: TermId::CONST_IDX,
            });
        }
        out.extend(combined);
        self.intern(TermData::BvPoly { width, monos: out }, Sort::BitVec(width))
    }

    /// Rebuilds a wide bit-vector polynomial whose monomial terms have been
    /// replaced.
    pub fn bv_poly_rebuild(&mut self, width: u32, monos: &[BvMono], vars: &[TermId]) -> TermId {
        let terms: Vec<(Vec<u64>, TermId)> = monos
            .iter()
            .zip(vars)
            .map(|(m, &v)| (m.coeff.clone(), v))
            .collect();
        self.bv_linear(width, &terms)
    }

    /// Assembles a bit-vector from Boolean terms, LSB first. An all-constant
    /// array folds to a bit-vector constant.
    pub fn bv_array(&mut self, bits: Vec<TermId>) -> TermId {
        let width = bits.len() as u32;
        if bits.iter().all(|&b| b.positive() == TermId::TRUE) {
            let mut words = vec![0u64; bv::words_needed(width)];
            for (i, &b) in bits.iter().enumerate() {
                if b == TermId::TRUE {
                    words[i / 64] |= 1u64 << (i % 64);
                }
            }
            return self.bv_const(width, words);
        }
        self.intern(TermData::BvArray(bits), Sort::BitVec(width))
    }

    /// Extracts bit `idx` of a bit-vector as a Boolean. Folds through
    /// constants and bit arrays.
    pub fn bit(&mut self, v: TermId, idx: u32) -> TermId {
        match self.data(v) {
            TermData::BvConst { words, .. } => return TermId::from_bool(bv::bit(words, idx)),
            TermData::BvArray(bits) => return bits[idx as usize],
            _ => {}
        }
        self.intern(TermData::Bit { idx, bv: v }, Sort::Bool)
    }

    fn bv_consts2(&self, a: TermId, b: TermId) -> Option<(Vec<u64>, Vec<u64>, u32)> {
        match (self.data(a), self.data(b)) {
            (
                TermData::BvConst { width, words: wa },
                TermData::BvConst { words: wb, .. },
            ) => Some((wa.clone(), wb.clone(), *width)),
            _ => None,
        }
    }

    fn bv_bin(
        &mut self,
        a: TermId,
        b: TermId,
        fold: fn(&[u64], &[u64], u32) -> Vec<u64>,
        mk: fn(TermId, TermId) -> TermData,
    ) -> TermId {
        if let Some((wa, wb, w)) = self.bv_consts2(a, b) {
            let words = fold(&wa, &wb, w);
            return self.bv_const(w, words);
        }
        let w = self.sort(a).bv_width();
        self.intern(mk(a, b), Sort::BitVec(w))
    }

    /// Unsigned bit-vector division, `a / 0` = all-ones.
    pub fn bv_div(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(a, b, |x, y, w| bv::udiv_urem(x, y, w).0, TermData::BvDiv)
    }

    /// Unsigned bit-vector remainder, `a rem 0` = `a`.
    pub fn bv_rem(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(a, b, |x, y, w| bv::udiv_urem(x, y, w).1, TermData::BvRem)
    }

    /// Signed bit-vector division, rounding toward zero.
    pub fn bv_sdiv(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(a, b, bv::sdiv, TermData::BvSDiv)
    }

    /// Signed bit-vector remainder, taking the dividend's sign.
    pub fn bv_srem(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(a, b, bv::srem, TermData::BvSRem)
    }

    /// Signed bit-vector modulo, taking the divisor's sign.
    pub fn bv_smod(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(a, b, bv::smod, TermData::BvSMod)
    }

    /// Left shift, shifting in zeros; amounts >= width yield zero.
    pub fn bv_shl(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(
            a,
            b,
            |x, y, w| bv::shl(x, bv::shift_amount(y, w), w),
            TermData::BvShl,
        )
    }

    /// Logical right shift, shifting in zeros.
    pub fn bv_lshr(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(
            a,
            b,
            |x, y, w| bv::lshr(x, bv::shift_amount(y, w), w),
            TermData::BvLShr,
        )
    }

    /// Arithmetic right shift, replicating the sign bit.
    pub fn bv_ashr(&mut self, a: TermId, b: TermId) -> TermId {
        self.bv_bin(
            a,
            b,
            |x, y, w| bv::ashr(x, bv::shift_amount(y, w), w),
            TermData::BvAShr,
        )
    }

    /// Bit-vector equality.
    pub fn bv_eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return TermId::TRUE;
        }
        if let Some((wa, wb, _)) = self.bv_consts2(lhs, rhs) {
            return TermId::from_bool(wa == wb);
        }
        let (a, b) = order(lhs, rhs);
        self.intern(TermData::BvEq(a, b), Sort::Bool)
    }

    /// Unsigned bit-vector `lhs >= rhs`.
    pub fn bv_ge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return TermId::TRUE;
        }
        if let Some((wa, wb, _)) = self.bv_consts2(lhs, rhs) {
            return TermId::from_bool(bv::ucmp(&wa, &wb) != Ordering::Less);
        }
        self.intern(TermData::BvGe(lhs, rhs), Sort::Bool)
    }

    /// Signed bit-vector `lhs >= rhs`.
    pub fn bv_sge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return TermId::TRUE;
        }
        if let Some((wa, wb, w)) = self.bv_consts2(lhs, rhs) {
            return TermId::from_bool(bv::scmp(&wa, &wb, w) != Ordering::Less);
        }
        self.intern(TermData::BvSGe(lhs, rhs), Sort::Bool)
    }

    /// Applies an uninterpreted function to its arguments.
    ///
    /// Applying a function updated at exactly these arguments folds to the
    /// updated value.
    ///
    /// # Panics
    /// Panics if `fun` does not have a `Fun` sort.
    pub fn app(&mut self, fun: TermId, args: Vec<TermId>) -> TermId {
        if let TermData::Update {
            args: uargs, value, ..
        } = self.data(fun)
        {
            if uargs == &args {
                return *value;
            }
        }
        let ret = match self.sort(fun) {
            Sort::Fun { ret, .. } => (**ret).clone(),
            s => panic!("applying a term of non-function sort {s:?}"),
        };
        self.intern(TermData::App { fun, args }, ret)
    }

    /// A function equal to `fun` everywhere except at `args`, where it
    /// returns `value`.
    pub fn update(&mut self, fun: TermId, args: Vec<TermId>, value: TermId) -> TermId {
        let sort = self.sort(fun).clone();
        debug_assert!(matches!(&sort, Sort::Fun { .. }));
        self.intern(TermData::Update { fun, args, value }, sort)
    }

    /// Creates a tuple term.
    pub fn tuple(&mut self, args: Vec<TermId>) -> TermId {
        let sort = Sort::Tuple(args.iter().map(|&a| self.sort(a).clone()).collect());
        self.intern(TermData::Tuple(args), sort)
    }

    /// Projects component `idx` of a tuple. Folds through tuple terms.
    ///
    /// # Panics
    /// Panics if `tup` does not have a `Tuple` sort.
    pub fn select(&mut self, tup: TermId, idx: u32) -> TermId {
        if let TermData::Tuple(args) = self.data(tup) {
            return args[idx as usize];
        }
        let sort = match self.sort(tup) {
            Sort::Tuple(sorts) => sorts[idx as usize].clone(),
            s => panic!("selecting from a term of non-tuple sort {s:?}"),
        };
        self.intern(TermData::Select { idx, tuple: tup }, sort)
    }

    /// Creates a universally quantified formula.
    pub fn forall(&mut self, vars: Vec<TermId>, body: TermId) -> TermId {
        debug_assert!(self.is_boolean(body));
        self.intern(TermData::Forall { vars, body }, Sort::Bool)
    }

    /// Creates a lambda term.
    pub fn lambda(&mut self, vars: Vec<TermId>, body: TermId) -> TermId {
        let sort = Sort::Fun {
            dom: vars.iter().map(|&v| self.sort(v).clone()).collect(),
            ret: Box::new(self.sort(body).clone()),
        };
        self.intern(TermData::Lambda { vars, body }, sort)
    }
}

fn order(a: TermId, b: TermId) -> (TermId, TermId) {
    if a.raw() <= b.raw() { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_ints() -> (TermTable, TermId, TermId) {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        (terms, x, y)
    }

    #[test]
    fn or_simplifications() {
        let (mut terms, x, y) = table_with_ints();
        let a = terms.arith_eq0(x);
        let b = terms.arith_eq0(y);

        assert_eq!(terms.or([a, TermId::TRUE]), TermId::TRUE);
        assert_eq!(terms.or([a, TermId::FALSE]), a);
        assert_eq!(terms.or([a, a]), a);
        assert_eq!(terms.or([a, a.negate()]), TermId::TRUE);
        assert_eq!(terms.or([]), TermId::FALSE);
        assert_eq!(terms.or([a, b]), terms.or([b, a]));
    }

    #[test]
    fn and_through_negated_or() {
        let (mut terms, x, y) = table_with_ints();
        let a = terms.arith_eq0(x);
        let b = terms.arith_eq0(y);

        let c = terms.and([a, b]);
        assert!(c.is_neg());
        assert_eq!(terms.kind(c), super::super::TermKind::Or);
        assert_eq!(terms.and([a, TermId::TRUE]), a);
        assert_eq!(terms.and([a, TermId::FALSE]), TermId::FALSE);
        assert_eq!(terms.and([a, a.negate()]), TermId::FALSE);
    }

    #[test]
    fn xor_lifts_polarity() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);

        let pq = terms.xor([p, q]);
        assert_eq!(terms.xor([p.negate(), q]), pq.negate());
        assert_eq!(terms.xor([p.negate(), q.negate()]), pq);
        assert_eq!(terms.xor([p, q, TermId::TRUE]), pq.negate());
        assert_eq!(terms.xor([p, p]), TermId::FALSE);
        assert_eq!(terms.xor([p, p, q]), q);
    }

    #[test]
    fn ite_folds() {
        let (mut terms, x, y) = table_with_ints();
        let c = terms.arith_ge0(x);

        assert_eq!(terms.ite(TermId::TRUE, x, y), x);
        assert_eq!(terms.ite(TermId::FALSE, x, y), y);
        assert_eq!(terms.ite(c, x, x), x);
        assert_eq!(terms.ite(c, TermId::TRUE, TermId::FALSE), c);
        assert_eq!(terms.ite(c, TermId::FALSE, TermId::TRUE), c.negate());
        // negated conditions swap the branches
        let swapped = terms.ite(c.negate(), x, y);
        assert_eq!(swapped, terms.ite(c, y, x));
    }

    #[test]
    fn eq_folds() {
        let (mut terms, x, y) = table_with_ints();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);

        assert_eq!(terms.eq(x, x), TermId::TRUE);
        assert_eq!(terms.eq(p, p.negate()), TermId::FALSE);
        assert_eq!(terms.eq(p, TermId::TRUE), p);
        assert_eq!(terms.eq(p, TermId::FALSE), p.negate());
        let pq = terms.eq(p, q);
        assert_eq!(terms.eq(p.negate(), q), pq.negate());
        assert_eq!(terms.eq(p.negate(), q.negate()), pq);

        let two = terms.arith_const(2);
        let three = terms.arith_const(3);
        assert_eq!(terms.eq(two, three), TermId::FALSE);
        assert_eq!(terms.eq(x, y), terms.eq(y, x));
    }

    #[test]
    fn distinct_normalizes() {
        let (mut terms, x, y) = table_with_ints();
        let z = terms.declare("z", Sort::Int);

        assert_eq!(terms.distinct([x]), TermId::TRUE);
        assert_eq!(terms.distinct([x, x, y]), TermId::FALSE);
        let two = terms.distinct([x, y]);
        let xy = terms.eq(x, y);
        assert_eq!(two, xy.negate());
        let three = terms.distinct([x, y, z]);
        assert_eq!(terms.distinct([z, y, x]), three);

        let c2 = terms.arith_const(2);
        let c3 = terms.arith_const(3);
        let c4 = terms.arith_const(4);
        assert_eq!(terms.distinct([c2, c3, c4]), TermId::TRUE);
    }

    #[test]
    fn linear_combination_normalizes() {
        let (mut terms, x, y) = table_with_ints();

        // 2 + x - 2 - x == 0
        assert_eq!(
            terms.arith_linear(&[(2, TermId::CONST_IDX), (1, x), (-2, TermId::CONST_IDX), (-1, x)]),
            terms.arith_const(0)
        );
        // x + y - y == x
        let sum = terms.arith_add(x, y);
        assert_eq!(terms.arith_sub(sum, y), x);
        // nested polynomials distribute: (x + 2) + (y - 2) == x + y
        let a = terms.arith_linear(&[(2, TermId::CONST_IDX), (1, x)]);
        let b = terms.arith_linear(&[(-2, TermId::CONST_IDX), (1, y)]);
        assert_eq!(terms.arith_add(a, b), sum);
    }

    #[test]
    fn atoms_fold_constants() {
        let mut terms = TermTable::new();
        let zero = terms.arith_const(0);
        let neg = terms.arith_const(-3);
        assert_eq!(terms.arith_eq0(zero), TermId::TRUE);
        assert_eq!(terms.arith_eq0(neg), TermId::FALSE);
        assert_eq!(terms.arith_ge0(zero), TermId::TRUE);
        assert_eq!(terms.arith_ge0(neg), TermId::FALSE);

        let x = terms.declare("x", Sort::Int);
        let five = terms.arith_const(5);
        assert_eq!(terms.arith_bineq(x, x), TermId::TRUE);
        assert_eq!(terms.arith_bineq(five, neg), TermId::FALSE);
    }

    #[test]
    fn power_products_fold() {
        let (mut terms, x, y) = table_with_ints();

        let xy = terms.power_product(&[(x, 1), (y, 1)]);
        assert_eq!(terms.power_product(&[(y, 1), (x, 1)]), xy);
        assert_eq!(terms.power_product(&[(x, 1)]), x);
        let two = terms.arith_const(2);
        let three = terms.arith_const(3);
        assert_eq!(terms.power_product(&[(two, 2), (three, 1)]), terms.arith_const(12));
        // x * x * 2 == 2 * x^2
        let xx = terms.power_product(&[(x, 2)]);
        let doubled = terms.power_product(&[(x, 1), (x, 1), (two, 1)]);
        assert_eq!(doubled, terms.arith_linear(&[(2, xx)]));
    }

    #[test]
    fn bv_constructors_fold() {
        let mut terms = TermTable::new();
        let a = terms.bv_const64(8, 200);
        let b = terms.bv_const64(8, 100);

        assert_eq!(terms.bv_div(a, b), terms.bv_const64(8, 2));
        assert_eq!(terms.bv_rem(a, b), terms.bv_const64(8, 0));
        let one = terms.bv_const64(8, 1);
        let shifted = terms.bv_shl(b, one);
        assert_eq!(shifted, terms.bv_const64(8, 200));
        assert_eq!(terms.bv_eq(a, b), TermId::FALSE);
        assert_eq!(terms.bv_ge(a, b), TermId::TRUE);
        // 200 is negative as a signed byte
        assert_eq!(terms.bv_sge(a, b), TermId::FALSE);

        let v = terms.declare("v", Sort::BitVec(8));
        assert_eq!(terms.bv_eq(v, v), TermId::TRUE);
        assert_eq!(terms.bv_eq(a, v), terms.bv_eq(v, a));
    }

    #[test]
    fn bv_linear_normalizes() {
        let mut terms = TermTable::new();
        let v = terms.declare("v", Sort::BitVec(8));
        let w = terms.declare("w", Sort::BitVec(8));

        // v + w - w == v, arithmetic mod 256
        let sum = terms.bv_linear64(8, &[(1, v), (1, w)]);
        assert_eq!(terms.bv_linear64(8, &[(1, sum), (255, w)]), v);
        // coefficients reduce mod 2^width
        assert_eq!(
            terms.bv_linear64(8, &[(257, v)]),
            terms.bv_linear64(8, &[(1, v)])
        );
    }

    #[test]
    fn bv_array_and_bits() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);

        let c = terms.bv_array(vec![TermId::TRUE, TermId::FALSE, TermId::TRUE]);
        assert_eq!(c, terms.bv_const64(3, 0b101));
        assert_eq!(terms.bit(c, 0), TermId::TRUE);
        assert_eq!(terms.bit(c, 1), TermId::FALSE);

        let arr = terms.bv_array(vec![p, TermId::TRUE]);
        assert_eq!(terms.bit(arr, 0), p);
        let v = terms.declare("v", Sort::BitVec(8));
        let b = terms.bit(v, 3);
        assert!(terms.is_boolean(b));
    }

    #[test]
    fn tuples_and_functions_fold() {
        let (mut terms, x, y) = table_with_ints();

        let pair = terms.tuple(vec![x, y]);
        assert_eq!(terms.select(pair, 0), x);
        assert_eq!(terms.select(pair, 1), y);

        let f = terms.declare(
            "f",
            Sort::Fun {
                dom: vec![Sort::Int],
                ret: Box::new(Sort::Int),
            },
        );
        let fx = terms.app(f, vec![x]);
        assert_eq!(terms.sort(fx), &Sort::Int);
        let g = terms.update(f, vec![x], y);
        assert_eq!(terms.app(g, vec![x]), y);
        let fy = terms.app(g, vec![y]);
        assert_eq!(terms.kind(fy), super::super::TermKind::App);
    }
}
