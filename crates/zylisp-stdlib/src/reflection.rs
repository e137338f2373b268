use std::rc::Rc;

use zylisp_core::{check_arity, Catalog, Sexp, ZyError};

use crate::name_arg;

pub fn register(c: &mut Catalog) {
    // struct hash -> bridged host value of the same registered name
    c.register_fn("togo", |rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Hash(h) => {
                let r = rt.env().bridge().from_hash(&h.borrow())?;
                Ok(Sexp::Reflect(Rc::new(r)))
            }
            other => Err(ZyError::type_error("struct hash", other.type_name())),
        }
    });

    c.register_fn("fromgo", |rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Reflect(r) => Ok(Sexp::hash(rt.env().bridge().to_hash(r)?)),
            other => Err(ZyError::type_error("bridged value", other.type_name())),
        }
    });

    // Field names of a bridged value, a struct hash, or a registered type name.
    c.register_fn("fieldls", |rt, name, args| {
        check_arity!(args, name, 1);
        let bridge = rt.env().bridge();
        let names: Vec<String> = match &args[0] {
            Sexp::Reflect(r) => bridge.field_names(r)?,
            Sexp::Hash(h) => h.borrow().keys().iter().map(Sexp::to_plain_string).collect(),
            other => {
                let type_name = name_arg(name, other)?;
                bridge
                    .lookup(&type_name)
                    .map(|t| t.field_names())
                    .ok_or_else(|| ZyError::type_error("registered bridged type", type_name))?
            }
        };
        Ok(Sexp::array(names.into_iter().map(Sexp::string).collect()))
    });

    c.register_fn("methodls", |rt, name, args| {
        check_arity!(args, name, 1);
        let bridge = rt.env().bridge();
        let names = match &args[0] {
            Sexp::Reflect(r) => bridge.method_names(r)?,
            other => {
                let type_name = name_arg(name, other)?;
                bridge
                    .lookup(&type_name)
                    .map(|t| t.method_names())
                    .ok_or_else(|| ZyError::type_error("registered bridged type", type_name))?
            }
        };
        Ok(Sexp::array(names.into_iter().map(Sexp::string).collect()))
    });

    // (_method value Name args...) calls a host method on a bridged value.
    c.register_fn("_method", |rt, name, args| {
        check_arity!(args, name, 2..);
        let method = name_arg(name, &args[1])?;
        match &args[0] {
            Sexp::Reflect(r) => rt.env().bridge().call_method(r, &method, &args[2..]),
            other => Err(ZyError::type_error("bridged value", other.type_name())),
        }
    });

    c.register_fn("typelist", |rt, name, args| {
        check_arity!(args, name, 0);
        let names = rt.env().bridge().type_names();
        Ok(Sexp::array(names.into_iter().map(Sexp::string).collect()))
    });
}
