#[macro_use]
mod macros;

pub mod builder;
pub mod collect;
pub mod ef;
pub mod model;
pub mod term;

pub mod prelude {
    pub use crate::builder::{BuilderNode, FormulaBuilder, LogicNode, NodeHandle};
    pub use crate::collect::{CollectError, LitCollector, get_implicants};
    pub use crate::ef::{FlattenOptions, Flattener};
    pub use crate::model::{FunInterp, Model, Value};
    pub use crate::term::{Sort, TermData, TermId, TermKind, TermTable};

    pub use crate::formula;
}

pub use builder::FormulaBuilder;
pub use collect::{CollectError, LitCollector, get_implicants};
pub use ef::{FlattenOptions, Flattener};
pub use model::{FunInterp, Model, Value};
pub use term::{Sort, TermData, TermId, TermKind, TermTable};
