use std::rc::Rc;

use zylisp_core::{Catalog, Op, Prototype, Sexp, Symbol, ZyError};

use crate::emit::Emitter;

/// Maximum nesting depth for the generator.
/// This prevents native stack overflow from deeply nested expressions.
const MAX_COMPILE_DEPTH: usize = 256;

/// Name given to top-level programs.
pub const MAIN_NAME: &str = "__main";

/// Compile a sequence of top-level expressions into one program. Every
/// form but the last has its value discarded by `EndForm`, which also
/// checks the stack depth; the last is returned.
pub fn compile_program(exprs: &[Sexp], catalog: &Catalog) -> Result<Rc<Prototype>, ZyError> {
    let mut gen = Generator::new(catalog);
    match exprs.split_last() {
        None => gen.emit.emit_const(Sexp::Null),
        Some((last, init)) => {
            for expr in init {
                gen.compile_expr(expr)?;
                gen.emit.emit(Op::EndForm);
            }
            gen.compile_expr(last)?;
        }
    }
    gen.emit.emit(Op::Return);
    let mut proto = Prototype::new(MAIN_NAME);
    proto.code = gen.emit.into_code();
    proto.orig = exprs.to_vec();
    Ok(Rc::new(proto))
}

/// Walks expression trees and emits instructions. Each call to
/// `compile_expr` leaves exactly one value on the data stack. Function
/// bodies are compiled by a fresh generator with its own buffer.
struct Generator<'a> {
    emit: Emitter,
    catalog: &'a Catalog,
    depth: usize,
}

fn syntax(form: &str, msg: impl std::fmt::Display) -> ZyError {
    ZyError::eval(format!("{form}: {msg}"))
}

impl<'a> Generator<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Generator {
            emit: Emitter::new(),
            catalog,
            depth: 0,
        }
    }

    /// Forms in sequence, keeping only the last value (`nil` when empty).
    fn compile_body(&mut self, body: &[Sexp]) -> Result<(), ZyError> {
        if body.is_empty() {
            self.emit.emit_const(Sexp::Null);
            return Ok(());
        }
        for (i, expr) in body.iter().enumerate() {
            self.compile_expr(expr)?;
            if i < body.len() - 1 {
                self.emit.emit(Op::Pop);
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Sexp) -> Result<(), ZyError> {
        self.depth += 1;
        if self.depth > MAX_COMPILE_DEPTH {
            self.depth -= 1;
            return Err(ZyError::eval("expression nested too deeply"));
        }
        let result = self.compile_expr_inner(expr);
        self.depth -= 1;
        result
    }

    fn compile_expr_inner(&mut self, expr: &Sexp) -> Result<(), ZyError> {
        match expr {
            Sexp::Symbol(sym) => {
                self.emit.emit(Op::Get(*sym));
                Ok(())
            }
            Sexp::Pair(_) => {
                let items = expr.list_to_vec()?;
                self.compile_form(&items)
            }
            Sexp::Array(a) => {
                let items = a.borrow().items.clone();
                for item in &items {
                    self.compile_expr(item)?;
                }
                self.emit.emit(Op::MakeArray(items.len()));
                Ok(())
            }
            other => {
                self.emit.emit_const(other.clone());
                Ok(())
            }
        }
    }

    fn compile_form(&mut self, items: &[Sexp]) -> Result<(), ZyError> {
        let (head, args) = match items.split_first() {
            Some(split) => split,
            None => {
                self.emit.emit_const(Sexp::Null);
                return Ok(());
            }
        };
        if let Sexp::Symbol(sym) = head {
            let handled = sym.with_name(|name| -> Option<&'static str> {
                Some(match name {
                    "quote" => "quote",
                    "begin" => "begin",
                    "def" => "def",
                    ":=" => ":=",
                    "=" => "=",
                    "fn" => "fn",
                    "defn" => "defn",
                    "if" => "if",
                    "cond" => "cond",
                    "and" => "and",
                    "or" => "or",
                    "let" => "let",
                    "package" => "package",
                    _ => return None,
                })
            });
            if let Some(form) = handled {
                return self.compile_special(form, args);
            }
            if self.catalog.is_builder(*sym) {
                // builders receive their argument expressions unevaluated
                self.emit.emit(Op::Get(*sym));
                for arg in args {
                    self.emit.emit_const(arg.clone());
                }
                self.emit.emit(Op::Call(args.len()));
                return Ok(());
            }
        }
        self.compile_expr(head)?;
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.emit.emit(Op::Call(args.len()));
        Ok(())
    }

    fn compile_special(&mut self, form: &'static str, args: &[Sexp]) -> Result<(), ZyError> {
        match form {
            "quote" => {
                let [quoted] = args else {
                    return Err(ZyError::arity("quote", "1", args.len()));
                };
                self.emit.emit_const(quoted.clone());
                Ok(())
            }
            "begin" => self.compile_body(args),
            "def" | ":=" => self.compile_binding(form, args, false),
            "=" => self.compile_binding(form, args, true),
            "fn" => self.compile_fn(args, None),
            "defn" => {
                let Some((Sexp::Symbol(name), rest)) = args.split_first() else {
                    return Err(syntax("defn", "expected a name"));
                };
                self.compile_fn(rest, Some(*name))?;
                self.emit.emit(Op::Bind(*name));
                Ok(())
            }
            "if" => self.compile_if(args),
            "cond" => self.compile_cond(args),
            "and" => self.compile_short_circuit(args, true),
            "or" => self.compile_short_circuit(args, false),
            "let" => self.compile_let(args),
            "package" => self.compile_package(args),
            other => Err(syntax(other, "unknown special form")),
        }
    }

    /// `(def x e)`, `(:= x e)` bind in the innermost frame; `(= x e)` updates
    /// the nearest existing binding. Dot paths write through the path.
    fn compile_binding(&mut self, form: &str, args: &[Sexp], assign: bool) -> Result<(), ZyError> {
        let [target, value] = args else {
            return Err(ZyError::arity(form, "2", args.len()));
        };
        let Sexp::Symbol(sym) = target else {
            return Err(ZyError::UnsupportedAssignment(format!(
                "{form}: cannot assign to {}",
                target.type_name()
            )));
        };
        self.compile_expr(value)?;
        let op = if sym.is_dot() {
            if form == "def" {
                return Err(syntax("def", format!("cannot define dotted name `{sym}`")));
            }
            Op::DotSet(*sym)
        } else if assign {
            Op::Assign(*sym)
        } else {
            Op::Bind(*sym)
        };
        self.emit.emit(op);
        Ok(())
    }

    /// `(fn [a b & rest] body...)` or `(fn name [params] body...)`.
    fn compile_fn(&mut self, args: &[Sexp], defn_name: Option<Symbol>) -> Result<(), ZyError> {
        let (name, args) = match (defn_name, args.split_first()) {
            (Some(n), _) => (n.name(), args),
            (None, Some((Sexp::Symbol(n), rest))) => (n.name(), rest),
            (None, _) => ("anonymous".to_string(), args),
        };
        let Some((params, body)) = args.split_first() else {
            return Err(syntax("fn", "expected a parameter list"));
        };
        let param_items = match params {
            Sexp::Array(a) => a.borrow().items.clone(),
            Sexp::Null | Sexp::Pair(_) => params.list_to_vec()?,
            other => {
                return Err(syntax(
                    "fn",
                    format!("parameter list must be an array, got {}", other.type_name()),
                ))
            }
        };

        let mut proto = Prototype::new(name);
        let mut iter = param_items.iter();
        while let Some(p) = iter.next() {
            match p {
                Sexp::Symbol(s) if s.with_name(|n| n == "&") => {
                    let Some(Sexp::Symbol(rest)) = iter.next() else {
                        return Err(syntax("fn", "`&` must be followed by a rest parameter"));
                    };
                    if iter.next().is_some() {
                        return Err(syntax("fn", "rest parameter must be last"));
                    }
                    proto.rest = Some(*rest);
                }
                Sexp::Symbol(s) => proto.params.push(*s),
                other => {
                    return Err(syntax(
                        "fn",
                        format!("parameters must be symbols, got {}", other.type_name()),
                    ))
                }
            }
        }

        let mut inner = Generator::new(self.catalog);
        inner.depth = self.depth;
        inner.compile_body(body)?;
        inner.emit.emit(Op::Return);
        proto.code = inner.emit.into_code();
        proto.orig = body.to_vec();
        self.emit.emit(Op::MakeClosure(Rc::new(proto)));
        Ok(())
    }

    fn compile_if(&mut self, args: &[Sexp]) -> Result<(), ZyError> {
        let (cond, then, otherwise) = match args {
            [c, t] => (c, t, None),
            [c, t, e] => (c, t, Some(e)),
            _ => return Err(ZyError::arity("if", "2-3", args.len())),
        };
        self.compile_expr(cond)?;
        let to_else = self.emit.emit_jump(Op::BranchIfFalse);
        self.compile_expr(then)?;
        let to_end = self.emit.emit_jump(Op::Jump);
        self.emit.patch_jump(to_else);
        match otherwise {
            Some(e) => self.compile_expr(e)?,
            None => self.emit.emit_const(Sexp::Null),
        }
        self.emit.patch_jump(to_end);
        Ok(())
    }

    /// `(cond c1 e1 c2 e2 ... [default])`
    fn compile_cond(&mut self, args: &[Sexp]) -> Result<(), ZyError> {
        let mut to_end = Vec::new();
        let mut chunks = args.chunks_exact(2);
        for pair in chunks.by_ref() {
            self.compile_expr(&pair[0])?;
            let next = self.emit.emit_jump(Op::BranchIfFalse);
            self.compile_expr(&pair[1])?;
            to_end.push(self.emit.emit_jump(Op::Jump));
            self.emit.patch_jump(next);
        }
        match chunks.remainder() {
            [default] => self.compile_expr(default)?,
            _ => self.emit.emit_const(Sexp::Null),
        }
        for at in to_end {
            self.emit.patch_jump(at);
        }
        Ok(())
    }

    /// `and` stops at the first falsy value, `or` at the first truthy one;
    /// the deciding value is the result.
    fn compile_short_circuit(&mut self, args: &[Sexp], is_and: bool) -> Result<(), ZyError> {
        let Some((first, rest)) = args.split_first() else {
            self.emit.emit_const(Sexp::Bool(is_and));
            return Ok(());
        };
        self.compile_expr(first)?;
        let mut to_end = Vec::new();
        for expr in rest {
            self.emit.emit(Op::Dup);
            let branch: fn(isize) -> Op = if is_and {
                Op::BranchIfFalse
            } else {
                Op::BranchIfTrue
            };
            to_end.push(self.emit.emit_jump(branch));
            self.emit.emit(Op::Pop);
            self.compile_expr(expr)?;
        }
        for at in to_end {
            self.emit.patch_jump(at);
        }
        Ok(())
    }

    /// `(let [a 1 b (+ a 1)] body...)`: bindings are sequential, in a new frame.
    fn compile_let(&mut self, args: &[Sexp]) -> Result<(), ZyError> {
        let Some((bindings, body)) = args.split_first() else {
            return Err(syntax("let", "expected a binding array"));
        };
        let items = match bindings {
            Sexp::Array(a) => a.borrow().items.clone(),
            Sexp::Null | Sexp::Pair(_) => bindings.list_to_vec()?,
            other => {
                return Err(syntax(
                    "let",
                    format!("bindings must be an array, got {}", other.type_name()),
                ))
            }
        };
        if items.len() % 2 != 0 {
            return Err(syntax("let", "bindings need an even number of forms"));
        }
        self.emit.emit(Op::PushScope);
        for pair in items.chunks_exact(2) {
            let Sexp::Symbol(sym) = &pair[0] else {
                return Err(syntax("let", "binding names must be symbols"));
            };
            self.compile_expr(&pair[1])?;
            self.emit.emit(Op::Bind(*sym));
            self.emit.emit(Op::Pop);
        }
        self.compile_body(body)?;
        self.emit.emit(Op::PopScope);
        Ok(())
    }

    /// `(package name forms...)` evaluates the forms inside a package frame
    /// and binds the package under `name`.
    fn compile_package(&mut self, args: &[Sexp]) -> Result<(), ZyError> {
        let Some((Sexp::Symbol(name), body)) = args.split_first() else {
            return Err(syntax("package", "expected a package name"));
        };
        self.emit.emit(Op::PushPackage(*name));
        for expr in body {
            self.compile_expr(expr)?;
            self.emit.emit(Op::Pop);
        }
        self.emit.emit(Op::PopPackage);
        Ok(())
    }
}
