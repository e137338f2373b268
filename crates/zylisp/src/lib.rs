//! zylisp: an embeddable s-expression runtime.
//!
//! Source text is read into expression trees, compiled to bytecode and run
//! on a stack machine. Host programs extend the runtime with native
//! functions and bridged host types.
//!
//! # Quick Start
//!
//! ```no_run
//! use zylisp::{Interpreter, Sexp};
//!
//! let mut interp = Interpreter::new();
//! let result = interp.eval_str("(+ 1 2)").unwrap();
//! assert_eq!(result, Sexp::Int(3));
//! ```

pub use zylisp_core::{
    Bridge, BridgedType, Catalog, HashKind, Pointer, Reflected, Runtime, RuntimeConfig, Sexp,
    SexpHash, StackTrace, Symbol, ZyError,
};
pub use zylisp_core::pretty_print;
pub use zylisp_reader::{read, read_many};
pub use zylisp_vm::{disassemble, Machine};

use zylisp_core::{Function, NativeFn};

pub type Result<T> = std::result::Result<T, ZyError>;

/// Builder for configuring and constructing an [`Interpreter`].
///
/// By default every builtin catalog is registered. A sandboxed interpreter
/// gets only the data-structure, string and encoding functions.
pub struct InterpreterBuilder {
    config: RuntimeConfig,
    natives: Catalog,
    bridge: Bridge,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            natives: Catalog::new(),
            bridge: Bridge::new(),
        }
    }

    /// Restrict the runtime to functions without host effects.
    pub fn sandboxed(mut self, on: bool) -> Self {
        self.config.sandboxed = on;
        self
    }

    /// Seed the random source for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.config.verbose = on;
        self
    }

    /// Trace every executed instruction at `trace` level.
    pub fn debug_exec(mut self, on: bool) -> Self {
        self.config.debug_exec = on;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    /// How deeply natives such as `apply`, `map` and `eval` may re-enter
    /// the machine.
    pub fn max_reentry_depth(mut self, depth: usize) -> Self {
        self.config.max_reentry_depth = depth;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a native function. Clashing with a builtin panics in [`build`](Self::build).
    pub fn register_fn<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[Sexp]) -> Result<Sexp> + 'static,
    {
        self.natives
            .insert(Function::native(NativeFn::simple(name, f)));
        self
    }

    /// Add a native function that can call back into the runtime.
    pub fn register_runtime_fn<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut dyn Runtime, &[Sexp]) -> Result<Sexp> + 'static,
    {
        self.natives
            .register_fn(name, move |rt, _name, args| f(rt, args));
        self
    }

    /// Register a host type for `togo`, `fromgo`, field access and `derefSet`.
    pub fn bridge_type(mut self, ty: BridgedType) -> Result<Self> {
        self.bridge.register(ty)?;
        Ok(self)
    }

    /// Build the [`Interpreter`]. Panics if two catalogs define the same name.
    pub fn build(self) -> Interpreter {
        let mut catalog = if self.config.sandboxed {
            zylisp_stdlib::sandbox_safe_functions()
        } else {
            zylisp_stdlib::all_builtin_functions()
        };
        catalog.merge(self.natives);
        tracing::debug!(
            functions = catalog.len(),
            sandboxed = self.config.sandboxed,
            "building interpreter"
        );
        Interpreter {
            machine: Machine::new(catalog, self.bridge, self.config),
        }
    }
}

/// A zylisp runtime instance.
///
/// Bindings persist across calls, so a function defined by one
/// [`eval_str`](Interpreter::eval_str) can be called by the next.
pub struct Interpreter {
    machine: Machine,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Parse, compile and run `source`, returning the value of its last form.
    pub fn eval_str(&mut self, source: &str) -> Result<Sexp> {
        self.machine.eval_str(source)
    }

    /// Compile and run one already-parsed expression.
    pub fn eval(&mut self, expr: &Sexp) -> Result<Sexp> {
        self.machine.eval(expr)
    }

    /// Compile `source` without running it.
    pub fn load_str(&mut self, source: &str) -> Result<()> {
        self.machine.load_str(source)
    }

    /// Run whatever was last loaded.
    pub fn run(&mut self) -> Result<Sexp> {
        self.machine.run()
    }

    /// Read and run a source file.
    pub fn eval_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<Sexp> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ZyError::Io(format!("{}: {e}", path.display())))?;
        self.eval_str(&source)
    }

    /// Call a function value, or the function bound to a name, with
    /// already-evaluated arguments.
    pub fn call(&mut self, name: &str, args: &[Sexp]) -> Result<Sexp> {
        let f = self.get(name)?;
        self.machine.apply(&f, args)
    }

    /// Look up a binding or catalog function by name.
    pub fn get(&self, name: &str) -> Result<Sexp> {
        self.machine.env().lookup(Symbol::new(name))
    }

    /// Bind `name` in the current innermost scope.
    pub fn define(&mut self, name: &str, value: Sexp) -> Result<()> {
        self.machine.env_mut().bind(Symbol::new(name), value)
    }

    /// Add a native function after construction.
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&[Sexp]) -> Result<Sexp> + 'static,
    {
        self.machine
            .env_mut()
            .catalog_mut()
            .try_insert(Function::native(NativeFn::simple(name, f)))
    }

    /// Register a bridged host type after construction.
    pub fn bridge_type(&mut self, ty: BridgedType) -> Result<()> {
        self.machine.env_mut().bridge_mut().register(ty)
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.machine.config()
    }

    /// Text for a result: one line, or broken across lines at 80 columns
    /// once `(pretty true)` has been evaluated.
    pub fn render(&self, value: &Sexp) -> String {
        if self.config().pretty {
            pretty_print(value, 80)
        } else {
            value.to_string()
        }
    }

    pub fn set_verbose(&mut self, on: bool) {
        self.machine.set_verbose(on);
    }

    pub fn set_debug(&mut self, on: bool) {
        self.machine.set_debug(on);
    }

    /// Rendering of every scope on the current chain.
    pub fn dump_environment(&self) -> String {
        self.machine.dump_environment()
    }

    /// Disassembly of a named function, or of the last loaded program.
    pub fn dump_function(&self, name: Option<&str>) -> Result<String> {
        self.machine.dump_function(name)
    }

    /// Sorted names of every catalog function.
    pub fn function_names(&self) -> Vec<String> {
        self.machine.env().catalog().names()
    }

    /// Discard partial state left by a failed evaluation. Bindings survive.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Forget every binding.
    pub fn clear(&mut self) {
        self.machine.clear();
    }

    pub fn stack_depth(&self) -> usize {
        self.machine.stack_depth()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }
}
