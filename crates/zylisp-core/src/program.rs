use std::rc::Rc;

use crate::symbol::Symbol;
use crate::value::Sexp;

/// Stack-machine instructions.
///
/// Jump offsets are relative to the instruction after the jump.
#[derive(Debug, Clone)]
pub enum Op {
    // Constants & stack
    Push(Sexp), // push a constant
    Pop,        // discard TOS
    EndForm,    // discard a top-level form's value; the stack must be back at the frame base
    Dup,        // duplicate TOS

    // Bindings (the bound value stays on the stack)
    Get(Symbol),    // push lookup(sym); dot symbols walk the path
    Bind(Symbol),   // bind TOS in the innermost frame
    Assign(Symbol), // update the nearest existing binding, else bind innermost
    DotSet(Symbol), // write TOS through a dot path

    // Control flow
    Jump(isize),
    BranchIfFalse(isize), // pop condition
    BranchIfTrue(isize),  // pop condition

    // Calls
    Call(usize), // call TOS-argc with argc args
    Return,      // return TOS

    // Closures and scopes
    MakeClosure(Rc<Prototype>),
    PushScope,
    PopScope,
    PushPackage(Symbol),
    PopPackage, // pop the package frame and bind it under its name

    // Data constructors
    MakeArray(usize), // pop n values, push array
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Push(_) => "PUSH",
            Op::Pop => "POP",
            Op::EndForm => "END_FORM",
            Op::Dup => "DUP",
            Op::Get(_) => "GET",
            Op::Bind(_) => "BIND",
            Op::Assign(_) => "ASSIGN",
            Op::DotSet(_) => "DOTSET",
            Op::Jump(_) => "JUMP",
            Op::BranchIfFalse(_) => "BRANCH_IF_FALSE",
            Op::BranchIfTrue(_) => "BRANCH_IF_TRUE",
            Op::Call(_) => "CALL",
            Op::Return => "RETURN",
            Op::MakeClosure(_) => "MAKE_CLOSURE",
            Op::PushScope => "PUSH_SCOPE",
            Op::PopScope => "POP_SCOPE",
            Op::PushPackage(_) => "PUSH_PACKAGE",
            Op::PopPackage => "POP_PACKAGE",
            Op::MakeArray(_) => "MAKE_ARRAY",
        }
    }
}

/// A compiled function body, the template closures are made from.
#[derive(Debug, Clone)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<Symbol>,
    pub rest: Option<Symbol>,
    pub code: Vec<Op>,
    /// The expressions this body was compiled from.
    pub orig: Vec<Sexp>,
}

impl Prototype {
    pub fn new(name: impl Into<String>) -> Self {
        Prototype {
            name: name.into(),
            params: Vec::new(),
            rest: None,
            code: Vec::new(),
            orig: Vec::new(),
        }
    }

    pub fn arity_label(&self) -> String {
        match self.rest {
            Some(_) => format!("{}+", self.params.len()),
            None => self.params.len().to_string(),
        }
    }
}
