#![allow(clippy::mutable_key_type)]
pub mod bridge;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod env;
pub mod error;
pub mod function;
pub mod hash;
pub mod numeric;
pub mod pretty;
pub mod program;
pub mod runtime;
pub mod symbol;
pub mod value;

pub use bridge::{Bridge, BridgedType, Pointer, Reflected};
pub use catalog::Catalog;
pub use compare::{compare, compare_with, CompareOp};
pub use config::RuntimeConfig;
pub use env::{dump_chain, Env, EnvDepth, Scope};
pub use error::{Span, StackTrace, ZyError};
pub use function::{Function, FunctionKind, NativeFn};
pub use hash::{HashKind, SexpHash};
pub use numeric::{IntegerOp, NumericOp};
pub use pretty::pretty_print;
pub use program::{Op, Prototype};
pub use runtime::Runtime;
pub use symbol::{intern, resolve, with_resolved, Symbol};
pub use value::{Pair, Sexp, SexpArray, SexpStr};

pub use lasso::Spur;
