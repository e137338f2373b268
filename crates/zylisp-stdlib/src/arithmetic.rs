use zylisp_core::numeric::{binary_integer, bit_not, numeric_fold};
use zylisp_core::{check_arity, Catalog, IntegerOp, NumericOp, Sexp, ZyError};

pub fn register(c: &mut Catalog) {
    c.register_many(&["+", "-", "*", "/", "**"], |_rt, name, args| {
        let op = NumericOp::from_name(name)
            .ok_or_else(|| ZyError::eval(format!("unknown numeric operator `{name}`")))?;
        numeric_fold(op, name, args)
    });

    c.register_many(
        &["mod", "sll", "sra", "srl", "bitAnd", "bitOr", "bitXor"],
        |_rt, name, args| {
            check_arity!(args, name, 2);
            let op = IntegerOp::from_name(name)
                .ok_or_else(|| ZyError::eval(format!("unknown integer operator `{name}`")))?;
            binary_integer(op, &args[0], &args[1])
        },
    );

    c.register_fn("bitNot", |_rt, name, args| {
        check_arity!(args, name, 1);
        bit_not(&args[0])
    });

    c.register_fn("asUint64", |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Int(n) => Ok(Sexp::Uint64(*n as u64)),
            Sexp::Float(x) => Ok(Sexp::Uint64(*x as u64)),
            Sexp::Uint64(n) => Ok(Sexp::Uint64(*n)),
            Sexp::Char(ch) => Ok(Sexp::Uint64(u64::from(u32::from(*ch)))),
            other => Err(ZyError::type_error("number", other.type_name())),
        }
    });

    c.register_many(&["isnan", "isNaN"], |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Float(x) => Ok(Sexp::Bool(x.is_nan())),
            Sexp::Int(_) | Sexp::Uint64(_) => Ok(Sexp::Bool(false)),
            other => Err(ZyError::type_error("number", other.type_name())),
        }
    });
}
