use zylisp_core::{check_arity, dump_chain, Catalog, FunctionKind, Sexp, Symbol, ZyError};

use crate::{name_arg, str_arg};

pub fn register(c: &mut Catalog) {
    c.register_fn("eval", |rt, name, args| {
        check_arity!(args, name, 1..);
        let mut last = Sexp::Null;
        for expr in args {
            last = rt.eval(expr)?;
        }
        Ok(last)
    });

    // First form of the text, or End when it holds none.
    c.register_fn("read", |rt, name, args| {
        check_arity!(args, name, 1);
        let source = str_arg(name, &args[0])?;
        Ok(rt.read(source)?.into_iter().next().unwrap_or(Sexp::End))
    });

    c.register_fn("str", |_rt, name, args| {
        check_arity!(args, name, 1);
        Ok(Sexp::string(args[0].to_string()))
    });

    c.register_fn("raw", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        Ok(Sexp::raw_string(text))
    });

    c.register_fn("joinsym", |_rt, name, args| {
        let mut joined = String::new();
        for arg in args {
            match arg {
                Sexp::Null => {}
                Sexp::Pair(_) | Sexp::Array(_) => {
                    for item in arg.sequence_items()? {
                        joined.push_str(&name_arg(name, &item)?);
                    }
                }
                other => joined.push_str(&name_arg(name, other)?),
            }
        }
        Ok(Sexp::symbol(&joined))
    });

    // The scopes a closure captured, rendered like the environment dump.
    c.register_fn("_closdump", |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Function(f) => match &f.kind {
                FunctionKind::Compiled { closure, .. } => Ok(Sexp::string(dump_chain(closure))),
                _ => Err(ZyError::eval(format!("{name}: {} is native and has no closure", f.name))),
            },
            other => Err(ZyError::type_error("function", other.type_name())),
        }
    });

    c.register_fn("GOOS", |_rt, name, args| {
        check_arity!(args, name, 0);
        Ok(Sexp::string(std::env::consts::OS))
    });

    // (pretty) reads the result-rendering flag, (pretty bool) sets it.
    c.register_fn("pretty", |rt, name, args| {
        if args.len() > 1 {
            return Err(ZyError::arity(name, "0-1", args.len()));
        }
        if let Some(flag) = args.first() {
            match flag {
                Sexp::Bool(b) => rt.config_mut().pretty = *b,
                other => return Err(ZyError::type_error("bool", other.type_name())),
            }
        }
        Ok(Sexp::Bool(rt.config().pretty))
    });

    c.register_fn("stop", |_rt, _name, args| {
        let msg = match args {
            [] => None,
            parts => Some(
                parts
                    .iter()
                    .map(Sexp::to_plain_string)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        };
        Err(ZyError::UserStop(msg))
    });

    // First-class forms of the assignment operators. As calls they compile
    // to instructions; these are reached only through `apply` or a binding,
    // so the value argument has already been evaluated.
    c.register_builder("=", |rt, name, args| {
        check_arity!(args, name, 2);
        let sym = target_symbol(name, &args[0])?;
        let value = args[1].clone();
        if sym.is_dot() {
            rt.env_mut().dot_set(sym, value.clone())?;
        } else {
            rt.env_mut().assign(sym, value.clone())?;
        }
        Ok(value)
    });

    c.register_builder(":=", |rt, name, args| {
        check_arity!(args, name, 2);
        let sym = target_symbol(name, &args[0])?;
        let value = args[1].clone();
        if sym.is_dot() {
            rt.env_mut().dot_set(sym, value.clone())?;
        } else {
            rt.env_mut().bind(sym, value.clone())?;
        }
        Ok(value)
    });
}

fn target_symbol(name: &str, target: &Sexp) -> Result<Symbol, ZyError> {
    match target {
        Sexp::Symbol(s) => Ok(*s),
        other => Err(ZyError::UnsupportedAssignment(format!(
            "{name}: cannot assign to {}",
            other.type_name()
        ))),
    }
}
