use crate::term::{TermData, TermId, TermTable};

impl TermTable {
    /// Recursively formats the term rooted at `t`.
    ///
    /// Negation is rendered as a trailing `'`. Shared subterms are expanded
    /// at every occurrence, so this is intended for debugging and test
    /// diagnostics, not for large DAGs.
    ///
    /// # Example
    /// ```rust
    /// use implify::{TermTable, Sort};
    /// let mut terms = TermTable::new();
    /// let x = terms.declare("x", Sort::Int);
    /// let atom = terms.arith_ge0(x);
    /// assert_eq!(terms.to_string(atom.negate()), "(x >= 0)'");
    /// ```
    pub fn to_string(&self, t: TermId) -> String {
        let neg = if t.is_neg() { "'" } else { "" };
        match self.data(t) {
            TermData::BoolConst => {
                if t.is_neg() {
                    "false".to_string()
                } else {
                    "true".to_string()
                }
            }
            TermData::ArithConst(c) => format!("{}{}", c, neg),
            TermData::BvConst { width, words } => {
                if words.len() == 1 {
                    format!("{}:bv{}", words[0], width)
                } else {
                    let hex: Vec<String> =
                        words.iter().rev().map(|w| format!("{:016x}", w)).collect();
                    format!("0x{}:bv{}", hex.join(""), width)
                }
            }
            TermData::Uninterpreted { name, .. } | TermData::Variable { name, .. } => {
                format!("{}{}", name, neg)
            }
            TermData::ArithEq0(u) => format!("({} = 0){}", self.to_string(*u), neg),
            TermData::ArithGe0(u) => format!("({} >= 0){}", self.to_string(*u), neg),
            TermData::Ite { cond, then, els } => format!(
                "(ite {} {} {}){}",
                self.to_string(*cond),
                self.to_string(*then),
                self.to_string(*els),
                neg
            ),
            TermData::App { fun, args } => {
                format!("{}({}){}", self.to_string(*fun), self.join(args, ", "), neg)
            }
            TermData::Update { fun, args, value } => format!(
                "({} with ({}) := {}){}",
                self.to_string(*fun),
                self.join(args, ", "),
                self.to_string(*value),
                neg
            ),
            TermData::Tuple(args) => format!("(tuple {})", self.join(args, " ")),
            TermData::Eq(a, b) | TermData::ArithBinEq(a, b) | TermData::BvEq(a, b) => {
                format!("({} = {}){}", self.to_string(*a), self.to_string(*b), neg)
            }
            TermData::Distinct(args) => format!("(distinct {}){}", self.join(args, " "), neg),
            TermData::Forall { vars, body } => format!(
                "(forall ({}) {}){}",
                self.join(vars, " "),
                self.to_string(*body),
                neg
            ),
            TermData::Lambda { vars, body } => format!(
                "(lambda ({}) {}){}",
                self.join(vars, " "),
                self.to_string(*body),
                neg
            ),
            TermData::Or(args) => format!("({}){}", self.join(args, " | "), neg),
            TermData::Xor(args) => format!("({}){}", self.join(args, " ^ "), neg),
            TermData::BvArray(bits) => format!("(bits {}){}", self.join(bits, " "), neg),
            TermData::BvDiv(a, b) => self.infix(*a, "/u", *b, neg),
            TermData::BvRem(a, b) => self.infix(*a, "%u", *b, neg),
            TermData::BvSDiv(a, b) => self.infix(*a, "/s", *b, neg),
            TermData::BvSRem(a, b) => self.infix(*a, "%s", *b, neg),
            TermData::BvSMod(a, b) => self.infix(*a, "mod", *b, neg),
            TermData::BvShl(a, b) => self.infix(*a, "<<", *b, neg),
            TermData::BvLShr(a, b) => self.infix(*a, ">>u", *b, neg),
            TermData::BvAShr(a, b) => self.infix(*a, ">>s", *b, neg),
            TermData::BvGe(a, b) => self.infix(*a, ">=u", *b, neg),
            TermData::BvSGe(a, b) => self.infix(*a, ">=s", *b, neg),
            TermData::Select { idx, tuple } => format!("{}.{}{}", self.to_string(*tuple), idx, neg),
            TermData::Bit { idx, bv } => format!("{}[{}]{}", self.to_string(*bv), idx, neg),
            TermData::PowerProduct(factors) => {
                let parts: Vec<String> = factors
                    .iter()
                    .map(|&(v, e)| {
                        if e == 1 {
                            self.to_string(v)
                        } else {
                            format!("{}^{}", self.to_string(v), e)
                        }
                    })
                    .collect();
                format!("({})", parts.join("*"))
            }
            TermData::ArithPoly(monos) => {
                let parts: Vec<String> = monos
                    .iter()
                    .map(|m| {
                        if m.var == TermId::CONST_IDX {
                            format!("{}", m.coeff)
                        } else if m.coeff == 1 {
                            self.to_string(m.var)
                        } else {
                            format!("{}*{}", m.coeff, self.to_string(m.var))
                        }
                    })
                    .collect();
                format!("({})", parts.join(" + "))
            }
            TermData::BvPoly64 { monos, .. } => {
                let parts: Vec<String> = monos
                    .iter()
                    .map(|m| {
                        if m.var == TermId::CONST_IDX {
                            format!("{}", m.coeff)
                        } else if m.coeff == 1 {
                            self.to_string(m.var)
                        } else {
                            format!("{}*{}", m.coeff, self.to_string(m.var))
                        }
                    })
                    .collect();
                format!("({})", parts.join(" + "))
            }
            TermData::BvPoly { monos, .. } => {
                let parts: Vec<String> = monos
                    .iter()
                    .map(|m| {
                        if m.var == TermId::CONST_IDX {
                            format!("{:?}", m.coeff)
                        } else {
                            format!("{:?}*{}", m.coeff, self.to_string(m.var))
                        }
                    })
                    .collect();
                format!("({})", parts.join(" + "))
            }
        }
    }

    fn join(&self, ids: &[TermId], sep: &str) -> String {
        let parts: Vec<String> = ids.iter().map(|&id| self.to_string(id)).collect();
        parts.join(sep)
    }

    fn infix(&self, a: TermId, op: &str, b: TermId, neg: &str) -> String {
        format!("({} {} {}){}", self.to_string(a), op, self.to_string(b), neg)
    }
}

#[cfg(test)]
mod tests {
    use crate::term::{Sort, TermId, TermTable};

    #[test]
    fn renders_composites() {
        let mut terms = TermTable::new();
        let x = terms.declare("x", Sort::Int);
        let y = terms.declare("y", Sort::Int);
        let lt = terms.arith_lt(x, y); // ((x - y) >= 0)'
        assert_eq!(terms.to_string(lt), "((x + -1*y) >= 0)'");

        let p = terms.declare("p", Sort::Bool);
        let or = terms.or([p, lt]);
        assert!(terms.to_string(or).contains(" | "));
        assert_eq!(terms.to_string(TermId::TRUE), "true");
        assert_eq!(terms.to_string(TermId::FALSE), "false");
    }
}
