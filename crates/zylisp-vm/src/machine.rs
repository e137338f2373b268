use std::rc::Rc;

use rand::rngs::StdRng;
use zylisp_core::{
    Bridge, Catalog, Env, EnvDepth, Function, FunctionKind, Op, Prototype, Runtime,
    RuntimeConfig, Scope, Sexp, StackTrace, Symbol, ZyError,
};

use crate::disasm::disassemble;
use crate::generator::compile_program;

/// One activation of a compiled function.
struct Frame {
    proto: Rc<Prototype>,
    pc: usize,
    /// Data-stack depth when the frame was entered.
    base: usize,
    /// Scope depth to restore on return.
    env_depth: EnvDepth,
}

/// Saved machine state for unwinding a failed run.
struct Checkpoint {
    frames: usize,
    stack: usize,
    env: EnvDepth,
}

/// The stack machine. Owns the environment, the data stack, the call
/// stack, and the per-runtime configuration and random source.
pub struct Machine {
    env: Env,
    stack: Vec<Sexp>,
    frames: Vec<Frame>,
    config: RuntimeConfig,
    rng: StdRng,
    gensym_counter: u64,
    loaded: Option<Rc<Prototype>>,
    /// Natives currently re-entered through `apply` or `eval`.
    reentry: usize,
}

impl Machine {
    pub fn new(catalog: Catalog, bridge: Bridge, config: RuntimeConfig) -> Self {
        let rng = config.new_rng();
        Machine {
            env: Env::new(catalog, bridge),
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(64),
            config,
            rng,
            gensym_counter: 0,
            loaded: None,
            reentry: 0,
        }
    }

    /// Parse and compile `source`, leaving it ready for [`Machine::run`].
    pub fn load_str(&mut self, source: &str) -> Result<(), ZyError> {
        let exprs = zylisp_reader::read_many(source)?;
        self.load_exprs(&exprs)
    }

    pub fn load_exprs(&mut self, exprs: &[Sexp]) -> Result<(), ZyError> {
        let proto = compile_program(exprs, self.env.catalog())?;
        tracing::debug!(forms = exprs.len(), ops = proto.code.len(), "compiled program");
        if self.config.verbose {
            tracing::info!("\n{}", disassemble(&proto));
        }
        self.loaded = Some(proto);
        Ok(())
    }

    /// Run the loaded program to completion. Returns `nil` when nothing is loaded.
    pub fn run(&mut self) -> Result<Sexp, ZyError> {
        match self.loaded.clone() {
            Some(proto) => self.run_proto(proto),
            None => Ok(Sexp::Null),
        }
    }

    /// Parse, compile and run `source`, returning the value of its last form.
    pub fn eval_str(&mut self, source: &str) -> Result<Sexp, ZyError> {
        self.load_str(source)?;
        self.run()
    }

    pub fn loaded(&self) -> Option<&Rc<Prototype>> {
        self.loaded.as_ref()
    }

    /// Drop any partial state left by a failed evaluation, keeping bindings.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.reentry = 0;
        self.env.restore(EnvDepth {
            chains: 1,
            scopes: 1,
        });
    }

    /// Forget every binding and the loaded program.
    pub fn clear(&mut self) {
        self.reset();
        self.env.clear();
        self.loaded = None;
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn dump_environment(&self) -> String {
        self.env.dump()
    }

    /// Disassembly of the compiled function bound to `name`, or of the
    /// loaded program when `name` is `None`.
    pub fn dump_function(&self, name: Option<&str>) -> Result<String, ZyError> {
        let Some(name) = name else {
            return self
                .loaded
                .as_ref()
                .map(|p| disassemble(p))
                .ok_or_else(|| ZyError::eval("no program loaded"));
        };
        match self.env.lookup(Symbol::new(name))? {
            Sexp::Function(f) => match &f.kind {
                FunctionKind::Compiled { proto, .. } => Ok(disassemble(proto)),
                _ => Ok(format!("== {name} ==\n<native>\n")),
            },
            other => Err(ZyError::type_error("function", other.type_name())),
        }
    }

    pub fn set_verbose(&mut self, on: bool) {
        self.config.verbose = on;
    }

    pub fn set_debug(&mut self, on: bool) {
        self.config.debug_exec = on;
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            frames: self.frames.len(),
            stack: self.stack.len(),
            env: self.env.depth(),
        }
    }

    /// Unwind everything above `cp` and attach the names of the frames
    /// that were active to the error.
    fn unwind(&mut self, cp: Checkpoint, err: ZyError) -> ZyError {
        let names: Vec<String> = self.frames[cp.frames.min(self.frames.len())..]
            .iter()
            .rev()
            .map(|f| f.proto.name.clone())
            .collect();
        self.frames.truncate(cp.frames);
        self.stack.truncate(cp.stack);
        self.env.restore(cp.env);
        extend_trace(err, names)
    }

    fn apply_value(&mut self, f: &Sexp, args: &[Sexp]) -> Result<Sexp, ZyError> {
        let cp = self.checkpoint();
        self.stack.push(f.clone());
        self.stack.extend_from_slice(args);
        let result = self.call_value(args.len()).and_then(|()| {
            if self.frames.len() > cp.frames {
                self.run_until(cp.frames)
            } else {
                self.pop()
            }
        });
        match result {
            Ok(value) => {
                self.check_stack_depth(cp.stack, "apply");
                Ok(value)
            }
            Err(e) => Err(self.unwind(cp, e)),
        }
    }

    /// Run `f` one re-entry level deeper, failing instead of exhausting the
    /// host stack.
    fn reenter<T>(
        &mut self,
        context: &str,
        f: impl FnOnce(&mut Self) -> Result<T, ZyError>,
    ) -> Result<T, ZyError> {
        if self.reentry >= self.config.max_reentry_depth {
            return Err(ZyError::eval(format!(
                "maximum nesting depth ({}) exceeded in {context}",
                self.config.max_reentry_depth
            )));
        }
        self.reentry += 1;
        let result = f(self);
        self.reentry -= 1;
        result
    }

    fn check_stack_depth(&self, expected: usize, context: &str) {
        if self.stack.len() != expected {
            tracing::error!(
                expected,
                actual = self.stack.len(),
                context,
                "data stack depth invariant violated"
            );
            panic!(
                "data stack depth invariant violated in {context}: expected {expected}, found {}",
                self.stack.len()
            );
        }
    }

    /// Run `proto` as a new frame in the current scope chain.
    fn run_proto(&mut self, proto: Rc<Prototype>) -> Result<Sexp, ZyError> {
        let cp = self.checkpoint();
        self.frames.push(Frame {
            proto,
            pc: 0,
            base: cp.stack,
            env_depth: self.env.depth(),
        });
        match self.run_until(cp.frames) {
            Ok(value) => {
                self.check_stack_depth(cp.stack, "top-level form");
                Ok(value)
            }
            Err(e) => Err(self.unwind(cp, e)),
        }
    }

    /// Execute until the call stack is back down to `stop` frames and
    /// return the value the last frame returned.
    fn run_until(&mut self, stop: usize) -> Result<Sexp, ZyError> {
        loop {
            let op = {
                let Some(frame) = self.frames.last_mut() else {
                    return Err(ZyError::eval("no active frame"));
                };
                let Some(op) = frame.proto.code.get(frame.pc) else {
                    return Err(ZyError::eval(format!(
                        "execution ran past the end of `{}`",
                        frame.proto.name
                    )));
                };
                let op = op.clone();
                frame.pc += 1;
                op
            };
            if self.config.debug_exec {
                tracing::trace!(depth = self.stack.len(), op = ?op, "exec");
            }

            match op {
                Op::Push(v) => self.stack.push(v),
                Op::Pop => {
                    self.pop()?;
                }
                Op::EndForm => {
                    self.pop()?;
                    let base = self.frames.last().map_or(0, |f| f.base);
                    self.check_stack_depth(base, "top-level form");
                }
                Op::Dup => {
                    let v = self.peek()?.clone();
                    self.stack.push(v);
                }
                Op::Get(sym) => {
                    let v = self.env.lookup(sym)?;
                    self.stack.push(v);
                }
                Op::Bind(sym) => {
                    let v = self.peek()?.clone();
                    self.env.bind(sym, v)?;
                }
                Op::Assign(sym) => {
                    let v = self.peek()?.clone();
                    self.env.assign(sym, v)?;
                }
                Op::DotSet(sym) => {
                    let v = self.peek()?.clone();
                    self.env.dot_set(sym, v)?;
                }
                Op::Jump(offset) => self.jump(offset),
                Op::BranchIfFalse(offset) => {
                    if !self.pop()?.is_truthy() {
                        self.jump(offset);
                    }
                }
                Op::BranchIfTrue(offset) => {
                    if self.pop()?.is_truthy() {
                        self.jump(offset);
                    }
                }
                Op::Call(argc) => self.call_value(argc)?,
                Op::Return => {
                    let value = self.pop()?;
                    let Some(frame) = self.frames.pop() else {
                        return Err(ZyError::eval("return with no active frame"));
                    };
                    self.check_stack_depth(frame.base, &frame.proto.name);
                    self.env.restore(frame.env_depth);
                    if self.frames.len() <= stop {
                        return Ok(value);
                    }
                    self.stack.push(value);
                }
                Op::MakeClosure(proto) => {
                    let f = Function::compiled(proto, self.env.capture());
                    self.stack.push(Sexp::Function(Rc::new(f)));
                }
                Op::PushScope => self.env.push_scope(Scope::new("let")),
                Op::PopScope => {
                    self.env.pop_scope()?;
                }
                Op::PushPackage(name) => self.env.push_scope(Scope::package(name.name())),
                Op::PopPackage => {
                    let scope = self.env.pop_scope()?;
                    if !scope.is_package() {
                        return Err(ZyError::eval("package end without a package scope"));
                    }
                    let name = Symbol::new(scope.name());
                    let pkg = Sexp::Package(scope);
                    self.env.bind(name, pkg.clone())?;
                    self.stack.push(pkg);
                }
                Op::MakeArray(n) => {
                    let items = self.pop_n(n)?;
                    self.stack.push(Sexp::array(items));
                }
            }
        }
    }

    fn jump(&mut self, offset: isize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = frame.pc.wrapping_add_signed(offset);
        }
    }

    fn pop(&mut self) -> Result<Sexp, ZyError> {
        self.stack
            .pop()
            .ok_or_else(|| ZyError::eval("data stack underflow"))
    }

    fn peek(&self) -> Result<&Sexp, ZyError> {
        self.stack
            .last()
            .ok_or_else(|| ZyError::eval("data stack underflow"))
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Sexp>, ZyError> {
        if n > self.stack.len() {
            return Err(ZyError::eval("data stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Call the function sitting below `argc` arguments. Compiled functions
    /// push a frame; natives run to completion and push their result.
    fn call_value(&mut self, argc: usize) -> Result<(), ZyError> {
        let args = self.pop_n(argc)?;
        let callee = self.pop()?;
        let func = match callee {
            Sexp::Function(f) => f,
            other => return Err(ZyError::type_error("function", other.type_name())),
        };
        match &func.kind {
            FunctionKind::Compiled { proto, closure } => {
                if self.frames.len() >= self.config.max_call_depth {
                    return Err(ZyError::eval(format!(
                        "maximum call depth ({}) exceeded in `{}`",
                        self.config.max_call_depth, proto.name
                    )));
                }
                let scope = bind_params(proto, args)?;
                let env_depth = self.env.depth();
                let mut chain = closure.clone();
                chain.push(scope);
                self.env.push_chain(chain);
                self.frames.push(Frame {
                    proto: proto.clone(),
                    pc: 0,
                    base: self.stack.len(),
                    env_depth,
                });
                Ok(())
            }
            FunctionKind::Native(nf) | FunctionKind::NativeBuilder(nf) => {
                let nf = nf.clone();
                let result = nf.call(self, &args)?;
                self.stack.push(result);
                Ok(())
            }
        }
    }
}

/// A fresh frame holding `args` under the prototype's parameter names.
/// Surplus arguments go to the rest parameter as a list.
fn bind_params(proto: &Prototype, mut args: Vec<Sexp>) -> Result<Scope, ZyError> {
    let fixed = proto.params.len();
    let arity_ok = match proto.rest {
        Some(_) => args.len() >= fixed,
        None => args.len() == fixed,
    };
    if !arity_ok {
        return Err(ZyError::arity(&proto.name, proto.arity_label(), args.len()));
    }
    let scope = Scope::new(&proto.name);
    let rest = args.split_off(fixed);
    for (sym, value) in proto.params.iter().zip(args) {
        scope.set(*sym, value);
    }
    if let Some(rest_sym) = proto.rest {
        scope.set(rest_sym, Sexp::list(rest));
    }
    Ok(scope)
}

/// Frame names from a nested run go after any already recorded deeper in.
fn extend_trace(err: ZyError, names: Vec<String>) -> ZyError {
    if names.is_empty() {
        return err;
    }
    match err {
        ZyError::WithTrace { inner, mut trace } => {
            trace.0.extend(names);
            ZyError::WithTrace { inner, trace }
        }
        other => other.with_stack_trace(StackTrace(names)),
    }
}

impl Runtime for Machine {
    fn env(&self) -> &Env {
        &self.env
    }

    fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn apply(&mut self, f: &Sexp, args: &[Sexp]) -> Result<Sexp, ZyError> {
        self.reenter("apply", |m| m.apply_value(f, args))
    }

    fn eval(&mut self, expr: &Sexp) -> Result<Sexp, ZyError> {
        self.reenter("eval", |m| {
            let proto = compile_program(std::slice::from_ref(expr), m.env.catalog())?;
            tracing::debug!(ops = proto.code.len(), "nested eval");
            m.run_proto(proto)
        })
    }

    fn read(&mut self, source: &str) -> Result<Vec<Sexp>, ZyError> {
        zylisp_reader::read_many(source)
    }

    fn gensym(&mut self, prefix: &str) -> Symbol {
        loop {
            self.gensym_counter += 1;
            let sym = Symbol::new(&format!("{prefix}{}", self.gensym_counter));
            if !self.env.is_defined(sym) {
                return sym;
            }
        }
    }
}
