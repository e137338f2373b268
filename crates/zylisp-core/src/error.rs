use std::fmt;

/// Check arity of a native function's arguments, returning `ZyError::WrongArgCount` on mismatch.
///
/// # Forms
///
/// ```ignore
/// check_arity!(args, name, 2);        // exactly 2
/// check_arity!(args, name, 1..=3);    // 1 to 3 inclusive
/// check_arity!(args, name, 2..);      // 2 or more
/// ```
#[macro_export]
macro_rules! check_arity {
    ($args:expr, $name:expr, $exact:literal) => {
        if $args.len() != $exact {
            return Err($crate::ZyError::arity(
                $name,
                stringify!($exact),
                $args.len(),
            ));
        }
    };
    ($args:expr, $name:expr, $lo:literal ..= $hi:literal) => {
        if $args.len() < $lo || $args.len() > $hi {
            return Err($crate::ZyError::arity(
                $name,
                concat!(stringify!($lo), "-", stringify!($hi)),
                $args.len(),
            ));
        }
    };
    ($args:expr, $name:expr, $lo:literal ..) => {
        if $args.len() < $lo {
            return Err($crate::ZyError::arity(
                $name,
                concat!(stringify!($lo), "+"),
                $args.len(),
            ));
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Names of the call frames active when an error was raised, innermost first.
#[derive(Debug, Clone, Default)]
pub struct StackTrace(pub Vec<String>);

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.0 {
            writeln!(f, "  in {name}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ZyError {
    #[error("Reader error at {span}: {message}")]
    Reader { message: String, span: Span },

    #[error("Incomplete input: {0}")]
    Incomplete(String),

    #[error("Eval error: {0}")]
    Eval(String),

    #[error("Type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("Wrong argument count: {name} expects {expected} args, got {got}")]
    WrongArgCount {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("symbol `{0}` not found")]
    SymbolNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("no such field: {field} on {type_name}")]
    NoSuchField { type_name: String, field: String },

    #[error("no such method: {method} on {type_name}")]
    NoSuchMethod { type_name: String, method: String },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("private access: `{name}` is not exported from package `{package}`")]
    PrivateAccess { package: String, name: String },

    #[error("type mismatch: cannot assign {got} to pointer of type {expected}")]
    TypeMismatch { expected: String, got: String },

    #[error("cannot assign to `{0}`: reserved name")]
    Assignment(String),

    #[error("unsupported assignment: {0}")]
    UnsupportedAssignment(String),

    #[error("stop{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    UserStop(Option<String>),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{inner}")]
    WithTrace {
        inner: Box<ZyError>,
        trace: StackTrace,
    },
}

impl ZyError {
    pub fn eval(msg: impl Into<String>) -> Self {
        ZyError::Eval(msg.into())
    }

    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ZyError::Type {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        ZyError::WrongArgCount {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn field_not_found(field: impl fmt::Display) -> Self {
        ZyError::FieldNotFound(field.to_string())
    }

    pub fn io(err: std::io::Error) -> Self {
        ZyError::Io(err.to_string())
    }

    /// Wrap this error with a stack trace (no-op if already wrapped or the trace is empty).
    pub fn with_stack_trace(self, trace: StackTrace) -> Self {
        if trace.0.is_empty() {
            return self;
        }
        match self {
            ZyError::WithTrace { .. } => self,
            other => ZyError::WithTrace {
                inner: Box::new(other),
                trace,
            },
        }
    }

    pub fn stack_trace(&self) -> Option<&StackTrace> {
        match self {
            ZyError::WithTrace { trace, .. } => Some(trace),
            _ => None,
        }
    }

    pub fn inner(&self) -> &ZyError {
        match self {
            ZyError::WithTrace { inner, .. } => inner.inner(),
            other => other,
        }
    }

    /// True when the reader ran out of input inside an open form.
    pub fn is_incomplete(&self) -> bool {
        matches!(self.inner(), ZyError::Incomplete(_))
    }
}

impl From<std::io::Error> for ZyError {
    fn from(err: std::io::Error) -> Self {
        ZyError::io(err)
    }
}
