use implify::{Model, Sort, TermTable, Value, get_implicants};

// Walks through the core use case: explain why a model satisfies a formula
// with a minimal conjunction of literals.
//
// Run with RUST_LOG=implify=debug to see the collection events.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut terms = TermTable::new();
    let x = terms.declare("x", Sort::Int);
    let y = terms.declare("y", Sort::Int);

    // (< (+ 2 (ite (< x y) x y)) 5): add 2 to the smaller of x and y,
    // require the result below 5
    let cond = terms.arith_lt(x, y);
    let smaller = terms.ite(cond, x, y);
    let two = terms.arith_const(2);
    let sum = terms.arith_add(two, smaller);
    let five = terms.arith_const(5);
    let formula = terms.arith_lt(sum, five);

    // a model that satisfies the formula
    let mut model = Model::new();
    model.assign(x, Value::Int(1));
    model.assign(y, Value::Int(3));

    println!("formula: {}", terms.to_string(formula));
    println!("model:   x = 1, y = 3");

    let mut implicant = Vec::new();
    get_implicants(&mut terms, &model, &[formula], &mut implicant)
        .expect("the model satisfies the formula");

    // the branch the model did not take never shows up
    println!("implicant:");
    for lit in implicant {
        println!("  {}", terms.to_string(lit));
    }
}
