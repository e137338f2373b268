use std::fmt;
use std::rc::Rc;

use crate::env::Scope;
use crate::error::ZyError;
use crate::program::Prototype;
use crate::runtime::Runtime;
use crate::value::Sexp;

/// A native function callable from zylisp. It receives the runtime, the
/// name it was invoked under, and its argument list.
pub type NativeFnInner = dyn Fn(&mut dyn Runtime, &str, &[Sexp]) -> Result<Sexp, ZyError>;

#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    pub func: Rc<NativeFnInner>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&mut dyn Runtime, &str, &[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) -> Self {
        NativeFn {
            name: name.into(),
            func: Rc::new(f),
        }
    }

    /// A function that needs neither the runtime nor its invocation name.
    pub fn simple(
        name: impl Into<String>,
        f: impl Fn(&[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) -> Self {
        Self::new(name, move |_rt, _name, args| f(args))
    }

    pub fn call(&self, rt: &mut dyn Runtime, args: &[Sexp]) -> Result<Sexp, ZyError> {
        (self.func)(rt, &self.name, args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native-fn {}>", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Bytecode plus the scope chain captured when the closure was made.
    Compiled {
        proto: Rc<Prototype>,
        closure: Vec<Scope>,
    },
    /// Receives evaluated arguments.
    Native(NativeFn),
    /// Receives its argument expressions unevaluated.
    NativeBuilder(NativeFn),
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
}

impl Function {
    pub fn native(f: NativeFn) -> Self {
        Function {
            name: f.name.clone(),
            kind: FunctionKind::Native(f),
        }
    }

    pub fn builder(f: NativeFn) -> Self {
        Function {
            name: f.name.clone(),
            kind: FunctionKind::NativeBuilder(f),
        }
    }

    pub fn compiled(proto: Rc<Prototype>, closure: Vec<Scope>) -> Self {
        Function {
            name: proto.name.clone(),
            kind: FunctionKind::Compiled { proto, closure },
        }
    }

    pub fn is_builder(&self) -> bool {
        matches!(self.kind, FunctionKind::NativeBuilder(_))
    }
}
