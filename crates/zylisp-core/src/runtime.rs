use rand::rngs::StdRng;

use crate::config::RuntimeConfig;
use crate::env::Env;
use crate::error::ZyError;
use crate::symbol::Symbol;
use crate::value::Sexp;

/// What a native function can reach while it runs: the environment, the
/// configuration, the random source, and the machine itself for calling
/// back into compiled code or evaluating freshly built expressions.
pub trait Runtime {
    fn env(&self) -> &Env;
    fn env_mut(&mut self) -> &mut Env;

    fn config(&self) -> &RuntimeConfig;
    fn config_mut(&mut self) -> &mut RuntimeConfig;

    fn rng(&mut self) -> &mut StdRng;

    /// Call a function value with already-evaluated arguments.
    fn apply(&mut self, f: &Sexp, args: &[Sexp]) -> Result<Sexp, ZyError>;

    /// Compile and run one expression tree in the current scope.
    fn eval(&mut self, expr: &Sexp) -> Result<Sexp, ZyError>;

    /// Parse source text into expression trees.
    fn read(&mut self, source: &str) -> Result<Vec<Sexp>, ZyError>;

    /// Parse and evaluate source text, returning the last value.
    fn eval_source(&mut self, source: &str) -> Result<Sexp, ZyError> {
        let exprs = self.read(source)?;
        let mut last = Sexp::Null;
        for expr in &exprs {
            last = self.eval(expr)?;
        }
        Ok(last)
    }

    /// A fresh symbol that has not been handed out before.
    fn gensym(&mut self, prefix: &str) -> Symbol;
}
