use zylisp_core::{check_arity, compare_with, Catalog, CompareOp, Sexp, ZyError};

pub fn register(c: &mut Catalog) {
    c.register_many(&["<", "<=", "==", "!=", ">", ">="], |_rt, name, args| {
        check_arity!(args, name, 2);
        let op = CompareOp::from_name(name)
            .ok_or_else(|| ZyError::eval(format!("unknown comparison `{name}`")))?;
        Ok(Sexp::Bool(compare_with(op, &args[0], &args[1])?))
    });

    c.register_fn("not", |_rt, name, args| {
        check_arity!(args, name, 1);
        Ok(Sexp::Bool(!args[0].is_truthy()))
    });
}
