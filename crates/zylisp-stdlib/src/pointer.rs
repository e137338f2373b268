use std::rc::Rc;

use zylisp_core::{check_arity, Catalog, Pointer, Sexp, ZyError};

pub fn register(c: &mut Catalog) {
    // (& x) points at x's binding, so a later derefSet is visible through x.
    // Any other expression is evaluated and boxed in a fresh cell.
    c.register_builder("&", |rt, name, args| {
        check_arity!(args, name, 1);
        if let Sexp::Symbol(sym) = &args[0] {
            if !sym.is_dot() {
                if let Some(scope) = rt.env().find_scope(*sym) {
                    return Ok(Sexp::Pointer(Rc::new(Pointer::to_binding(scope, *sym)?)));
                }
            }
        }
        let value = rt.eval(&args[0])?;
        Ok(Sexp::Pointer(Rc::new(Pointer::to_value(value))))
    });

    c.register_fn("deref", |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Pointer(p) => Ok(p.get()),
            other => Err(ZyError::type_error("pointer", other.type_name())),
        }
    });

    c.register_fn("derefSet", |rt, name, args| {
        check_arity!(args, name, 2);
        match &args[0] {
            Sexp::Pointer(p) => {
                p.set(args[1].clone(), rt.env().bridge())?;
                Ok(args[1].clone())
            }
            other => Err(ZyError::type_error("pointer", other.type_name())),
        }
    });
}
