#[macro_export]
#[doc(hidden)]
macro_rules! formula_list {
    ($b:ident, $($input:tt)*) => {
        $crate::formula_list!(@recurse $b, [$($input)*] -> [])
    };

	// base
    (@recurse $b:ident, [] -> [$($out:expr),*]) => {
        vec![ $($out),* ]
    };

	// munchers
    (@recurse $b:ident, [ $k:ident ! [ $($args:tt)* ] , $($rest:tt)* ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [$($rest)*] -> [
            $($out,)*
            $crate::formula!($b, $k ! [ $($args)* ])
        ])
    };
    (@recurse $b:ident, [ $k:ident ! [ $($args:tt)* ] ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [] -> [
            $($out,)*
            $crate::formula!($b, $k ! [ $($args)* ])
        ])
    };

    // !
    (@recurse $b:ident, [ ! $val:tt , $($rest:tt)* ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [$($rest)*] -> [
            $($out,)*
            $crate::formula!($b, ! $val)
        ])
    };
    (@recurse $b:ident, [ ! $val:tt ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [] -> [
            $($out,)*
            $crate::formula!($b, ! $val)
        ])
    };

    // other
    (@recurse $b:ident, [ $val:tt , $($rest:tt)* ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [$($rest)*] -> [
            $($out,)*
            $crate::formula!($b, $val)
        ])
    };
    (@recurse $b:ident, [ $val:tt ] -> [$($out:expr),*]) => {
        $crate::formula_list!(@recurse $b, [] -> [
            $($out,)*
            $crate::formula!($b, $val)
        ])
    };
}

#[macro_export]
macro_rules! formula {
    ($builder:ident, $($input:tt)+) => {
        $crate::formula!(@recurse $builder, [ $($input)* ] -> [])
    };

    // exit
    (@recurse $b:ident, [] -> [$($out:tt)*]) => { $($out)* };

	// any![]
    (@recurse $b:ident, [ any ! [ $($args:tt)* ] $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [
            $($out)*
            {
                let safe_b = $crate::builder::FormulaBuilder::__check_type(&$b);
                safe_b.wrap(safe_b.any( $crate::formula_list!($b, $($args)*) ))
            }
        ])
    };

	// all![]
	(@recurse $b:ident, [ all ! [ $($args:tt)* ] $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [
            $($out)*
            {
                let safe_b = $crate::builder::FormulaBuilder::__check_type(&$b);
                safe_b.wrap(safe_b.all( $crate::formula_list!($b, $($args)*) ))
            }
        ])
    };

	// xor![]
	(@recurse $b:ident, [ xor ! [ $($args:tt)* ] $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [
            $($out)*
            {
                let safe_b = $crate::builder::FormulaBuilder::__check_type(&$b);
                safe_b.wrap(safe_b.xor( $crate::formula_list!($b, $($args)*) ))
            }
        ])
    };

	// |
    (@recurse $b:ident, [ | $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [$($out)* |])
    };
	// &
    (@recurse $b:ident, [ & $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [$($out)* &])
    };
	// ^
    (@recurse $b:ident, [ ^ $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [$($out)* ^])
    };
	// !
    (@recurse $b:ident, [ ! $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [$($out)* !])
    };

    // groups
    (@recurse $b:ident, [ ( $($inner:tt)* ) $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [
            $($out)*
            ( $crate::formula!($b, $($inner)*) )
        ])
    };

    // leaves
    (@recurse $b:ident, [ $val:tt $($rest:tt)* ] -> [$($out:tt)*]) => {
        $crate::formula!(@recurse $b, [$($rest)*] -> [
            $($out)*
            {
                let safe_b = $crate::builder::FormulaBuilder::__check_type(&$b);
                safe_b.leaf($val)
            }
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::builder::FormulaBuilder;
    use crate::term::{Sort, TermTable};

    #[test]
    fn macro_builds_nested_formulas() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);
        let r = terms.declare("r", Sort::Bool);

        let builder = FormulaBuilder::new();
        let root = formula!(builder,
            any![
                p,
                all![q, r],
                xor![p, ! r]
            ]
        );
        builder.add_root(root);
        let roots = builder.build(&mut terms);

        let qr = terms.and([q, r]);
        let px = terms.xor([p, r.negate()]);
        assert_eq!(roots, vec![terms.or([p, qr, px])]);
    }

    #[test]
    fn macro_operators_mix_with_lists() {
        let mut terms = TermTable::new();
        let p = terms.declare("p", Sort::Bool);
        let q = terms.declare("q", Sort::Bool);

        let builder = FormulaBuilder::new();
        let root = formula!(builder, (p & q) | ! p);
        builder.add_root(root);
        let roots = builder.build(&mut terms);

        let pq = terms.and([p, q]);
        assert_eq!(roots, vec![terms.or([pq, p.negate()])]);
    }
}
