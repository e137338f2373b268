#![allow(dead_code)]

use zylisp::{Interpreter, Sexp, ZyError};

/// A fresh interpreter with every builtin and a fixed random seed.
pub fn interp() -> Interpreter {
    Interpreter::builder().seed(42).build()
}

pub fn sandboxed() -> Interpreter {
    Interpreter::builder().sandboxed(true).seed(42).build()
}

/// Evaluate in a fresh interpreter, panicking on failure.
pub fn eval(input: &str) -> Sexp {
    interp()
        .eval_str(input)
        .unwrap_or_else(|e| panic!("eval failed for `{input}`: {e}"))
}

/// Evaluate and render the result in reader syntax.
pub fn eval_to_string(input: &str) -> String {
    eval(input).to_string()
}

/// Evaluate expecting failure; returns the error without its stack trace.
pub fn eval_err(input: &str) -> ZyError {
    match interp().eval_str(input) {
        Ok(v) => panic!("expected an error for `{input}`, got {v}"),
        Err(e) => e.inner().clone(),
    }
}

/// Generate one test per `name: "source" => expected` entry.
///
/// ```ignore
/// eval_tests! {
///     adds: "(+ 1 2)" => Sexp::Int(3),
/// }
/// ```
#[macro_export]
macro_rules! eval_tests {
    ($($name:ident : $input:expr => $expected:expr),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                assert_eq!(common::eval($input), $expected, "{}", $input);
            }
        )*
    };
}
