use zylisp_core::{check_arity, Catalog, HashKind, Sexp, SexpHash, ZyError};

use crate::list::{array_access, index_path};
use crate::name_arg;

pub fn register(c: &mut Catalog) {
    c.register_fn("hash", |_rt, name, args| {
        Ok(Sexp::hash(fill_hash(SexpHash::new(), name, args)?))
    });

    // (struct Name k v ...) and (field Name k v ...): nominally typed hashes.
    c.register_many(&["struct", "field"], |_rt, name, args| {
        check_arity!(args, name, 1..);
        let type_name = name_arg(name, &args[0])?;
        let kind = if name == "struct" {
            HashKind::Struct
        } else {
            HashKind::Field
        };
        let h = SexpHash::with_kind(kind, type_name);
        Ok(Sexp::hash(fill_hash(h, name, &args[1..])?))
    });

    c.register_fn("hget", |_rt, name, args| {
        check_arity!(args, name, 2..=3);
        match &args[0] {
            Sexp::Hash(h) => {
                let h = h.borrow();
                match args.get(2) {
                    Some(default) => Ok(h.get_or(&args[1], default.clone())),
                    None => h.get(&args[1]),
                }
            }
            Sexp::Array(arr) => array_access("aget", arr, args),
            other => Err(ZyError::type_error("hash or array", other.type_name())),
        }
    });

    c.register_fn("hset", |_rt, name, args| {
        check_arity!(args, name, 3);
        let h = hash_arg(&args[0])?;
        SexpHash::check_key(&args[1])?;
        h.borrow_mut().insert(args[1].clone(), args[2].clone())?;
        Ok(Sexp::Null)
    });

    c.register_fn("hdel", |_rt, name, args| {
        check_arity!(args, name, 2);
        let h = hash_arg(&args[0])?;
        h.borrow_mut().delete(&args[1]);
        Ok(Sexp::Null)
    });

    c.register_fn("keys", |_rt, name, args| {
        check_arity!(args, name, 1);
        let h = hash_arg(&args[0])?;
        let keys = h.borrow().keys().to_vec();
        Ok(Sexp::array(keys))
    });

    c.register_fn("hpair", |_rt, name, args| {
        check_arity!(args, name, 2);
        let h = hash_arg(&args[0])?;
        let pos = crate::int_arg(name, &args[1])?;
        let (k, v) = h.borrow().pair_at(pos)?;
        Ok(Sexp::list(vec![k, v]))
    });

    // (hashidx h key) or (hashidx h [k1 k2]). Arrays are never keys, so an
    // array argument is always a path; array levels along it take an index.
    c.register_fn("hashidx", |_rt, name, args| {
        check_arity!(args, name, 2..);
        hash_arg(&args[0])?;
        index_through(&args[0], &index_path(&args[1..])?)
    });

    c.register_fn("->", |_rt, name, args| {
        check_arity!(args, name, 1..);
        hash_arg(&args[0])?;
        thread_fields(&args[0], &args[1..])
    });
}

fn hash_arg(v: &Sexp) -> Result<&std::rc::Rc<std::cell::RefCell<SexpHash>>, ZyError> {
    match v {
        Sexp::Hash(h) => Ok(h),
        other => Err(ZyError::type_error("hash", other.type_name())),
    }
}

fn fill_hash(mut h: SexpHash, name: &str, kvs: &[Sexp]) -> Result<SexpHash, ZyError> {
    if kvs.len() % 2 != 0 {
        return Err(ZyError::eval(format!(
            "{name} requires an even number of key/value arguments, got {}",
            kvs.len()
        )));
    }
    for kv in kvs.chunks_exact(2) {
        h.insert(kv[0].clone(), kv[1].clone())?;
    }
    Ok(h)
}

/// Successive single-field lookups. Running out of hashes while field names
/// remain is `FieldNotFound` on the next name.
fn thread_fields(start: &Sexp, fields: &[Sexp]) -> Result<Sexp, ZyError> {
    let mut cur = start.clone();
    for field in fields {
        let next = match &cur {
            Sexp::Hash(h) => h.borrow().get(field)?,
            _ => return Err(ZyError::field_not_found(field)),
        };
        cur = next;
    }
    Ok(cur)
}

fn index_through(start: &Sexp, path: &[Sexp]) -> Result<Sexp, ZyError> {
    let mut cur = start.clone();
    for step in path {
        let next = match &cur {
            Sexp::Hash(h) => h.borrow().get(step)?,
            Sexp::Array(a) => {
                let index = crate::int_arg("hashidx", step)?;
                let a = a.borrow();
                let len = a.items.len();
                usize::try_from(index)
                    .ok()
                    .and_then(|i| a.items.get(i).cloned())
                    .ok_or(ZyError::IndexOutOfBounds { index, len })?
            }
            _ => return Err(ZyError::field_not_found(step)),
        };
        cur = next;
    }
    Ok(cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Sexp {
        let mut inner = SexpHash::new();
        inner.set(Sexp::symbol("b"), Sexp::Int(2));
        let mut outer = SexpHash::new();
        outer.set(Sexp::symbol("a"), Sexp::hash(inner));
        outer.set(Sexp::symbol("n"), Sexp::Int(5));
        Sexp::hash(outer)
    }

    #[test]
    fn threading_walks_nested_hashes() {
        let h = nested();
        let got = thread_fields(&h, &[Sexp::symbol("a"), Sexp::symbol("b")]).unwrap();
        assert_eq!(got, Sexp::Int(2));
    }

    #[test]
    fn threading_through_a_non_hash_is_field_not_found() {
        let h = nested();
        let err = thread_fields(&h, &[Sexp::symbol("n"), Sexp::symbol("b")]).unwrap_err();
        assert!(matches!(err, ZyError::FieldNotFound(_)));
        let err = thread_fields(&h, &[Sexp::symbol("zz")]).unwrap_err();
        assert!(matches!(err, ZyError::FieldNotFound(_)));
    }

    #[test]
    fn index_path_crosses_hashes_and_arrays() {
        let h = nested();
        if let Sexp::Hash(outer) = &h {
            let list = Sexp::array(vec![Sexp::string("x"), Sexp::string("y")]);
            outer.borrow_mut().set(Sexp::symbol("xs"), list);
        }
        let got = index_through(&h, &[Sexp::symbol("xs"), Sexp::Int(1)]).unwrap();
        assert_eq!(got, Sexp::string("y"));
        let got = index_through(&h, &[Sexp::symbol("a"), Sexp::symbol("b")]).unwrap();
        assert_eq!(got, Sexp::Int(2));
        let err = index_through(&h, &[Sexp::symbol("n"), Sexp::symbol("b")]).unwrap_err();
        assert!(matches!(err, ZyError::FieldNotFound(_)));
    }

    #[test]
    fn odd_key_value_count_is_rejected() {
        assert!(fill_hash(SexpHash::new(), "hash", &[Sexp::Int(1)]).is_err());
        let h = fill_hash(SexpHash::new(), "hash", &[Sexp::Int(1), Sexp::Int(2)]).unwrap();
        assert_eq!(h.get(&Sexp::Int(1)).unwrap(), Sexp::Int(2));
    }
}
