use zylisp_core::{check_arity, Catalog, Sexp, Symbol};

fn is_number(v: &Sexp) -> bool {
    matches!(v, Sexp::Int(_) | Sexp::Float(_) | Sexp::Uint64(_))
}

fn is_zero(v: &Sexp) -> bool {
    match v {
        Sexp::Int(n) => *n == 0,
        Sexp::Uint64(n) => *n == 0,
        Sexp::Float(x) => *x == 0.0,
        Sexp::Char(c) => *c == '\0',
        _ => false,
    }
}

fn is_empty(v: &Sexp) -> bool {
    match v {
        Sexp::Null => true,
        Sexp::Array(a) => a.borrow().items.is_empty(),
        Sexp::Str(s) => s.text.is_empty(),
        Sexp::Hash(h) => h.borrow().is_empty(),
        _ => false,
    }
}

pub fn register(c: &mut Catalog) {
    c.register_fn("type?", |_rt, name, args| {
        check_arity!(args, name, 1);
        Ok(Sexp::string(args[0].type_name()))
    });

    c.register_many(
        &[
            "list?", "null?", "array?", "number?", "float?", "int?", "char?", "symbol?",
            "string?", "hash?", "zero?", "empty?", "func?",
        ],
        |_rt, name, args| {
            check_arity!(args, name, 1);
            let v = &args[0];
            let answer = match name {
                "list?" => v.is_list(),
                "null?" => matches!(v, Sexp::Null),
                "array?" => matches!(v, Sexp::Array(_)),
                "number?" => is_number(v),
                "float?" => matches!(v, Sexp::Float(_)),
                "int?" => matches!(v, Sexp::Int(_) | Sexp::Uint64(_)),
                "char?" => matches!(v, Sexp::Char(_)),
                "symbol?" => matches!(v, Sexp::Symbol(_)),
                "string?" => matches!(v, Sexp::Str(_)),
                "hash?" => matches!(v, Sexp::Hash(_)),
                "zero?" => is_zero(v),
                "empty?" => is_empty(v),
                _ => matches!(v, Sexp::Function(_)),
            };
            Ok(Sexp::Bool(answer))
        },
    );

    c.register_fn("defined?", |rt, name, args| {
        check_arity!(args, name, 1);
        let defined = match &args[0] {
            Sexp::Symbol(s) => rt.env().is_defined(*s),
            Sexp::Str(s) => rt.env().is_defined(Symbol::new(&s.text)),
            Sexp::Function(_) => true,
            _ => false,
        };
        Ok(Sexp::Bool(defined))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_and_zero() {
        assert!(is_empty(&Sexp::Null));
        assert!(is_empty(&Sexp::array(vec![])));
        assert!(!is_empty(&Sexp::string("x")));
        assert!(is_zero(&Sexp::Float(0.0)));
        assert!(!is_zero(&Sexp::Int(3)));
        assert!(!is_number(&Sexp::Char('a')));
    }
}
