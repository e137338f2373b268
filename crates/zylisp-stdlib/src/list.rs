use std::cell::RefCell;
use std::rc::Rc;

use zylisp_core::{check_arity, Catalog, Runtime, Sexp, SexpArray, ZyError};

use crate::{int_arg, str_arg};

pub fn register(c: &mut Catalog) {
    c.register_fn("list", |_rt, _name, args| Ok(Sexp::list(args.to_vec())));
    c.register_fn("array", |_rt, _name, args| Ok(Sexp::array(args.to_vec())));

    c.register_fn("makeArray", |_rt, name, args| {
        check_arity!(args, name, 1..=2);
        let size = int_arg(name, &args[0])?;
        let size = usize::try_from(size)
            .map_err(|_| ZyError::eval(format!("{name}: negative size {size}")))?;
        let fill = args.get(1).cloned().unwrap_or(Sexp::Null);
        let typ = match fill {
            Sexp::Null => None,
            ref v => Some(v.type_name()),
        };
        Ok(Sexp::typed_array(vec![fill; size], typ))
    });

    c.register_fn("cons", |_rt, name, args| {
        check_arity!(args, name, 2);
        Ok(Sexp::cons(args[0].clone(), args[1].clone()))
    });

    c.register_many(&["car", "first"], |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Pair(p) => Ok(p.head.clone()),
            Sexp::Array(a) => a
                .borrow()
                .items
                .first()
                .cloned()
                .ok_or_else(|| ZyError::eval(format!("{name} called on empty array"))),
            other => Err(ZyError::type_error("list or array", other.type_name())),
        }
    });

    c.register_many(&["cdr", "rest"], |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Null => Ok(Sexp::Null),
            Sexp::Pair(p) => Ok(p.tail.clone()),
            Sexp::Array(a) => {
                let a = a.borrow();
                let items = a.items.get(1..).map(<[Sexp]>::to_vec).unwrap_or_default();
                Ok(Sexp::typed_array(items, a.typ.clone()))
            }
            other => Err(ZyError::type_error("list or array", other.type_name())),
        }
    });

    c.register_fn("second", |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Pair(p) => match &p.tail {
                Sexp::Pair(next) => Ok(next.head.clone()),
                _ => Err(ZyError::eval("list too small for second")),
            },
            Sexp::Array(a) => a
                .borrow()
                .items
                .get(1)
                .cloned()
                .ok_or_else(|| ZyError::eval("array too small for second")),
            other => Err(ZyError::type_error("list or array", other.type_name())),
        }
    });

    c.register_many(&["aget", "aset"], |_rt, name, args| match args.first() {
        Some(Sexp::Array(arr)) => array_access(name, arr, args),
        Some(other) => Err(ZyError::type_error("array", other.type_name())),
        None => Err(ZyError::arity(name, "2-3", 0)),
    });

    // (arrayidx arr [i j]) indexes nested arrays, one level per index.
    c.register_fn("arrayidx", |_rt, name, args| {
        check_arity!(args, name, 2..);
        let path = index_path(&args[1..])?;
        nested_index(&args[0], &path)
    });

    c.register_fn("sget", |_rt, name, args| {
        check_arity!(args, name, 2..=3);
        let text = str_arg(name, &args[0])?;
        let index = int_arg(name, &args[1])?;
        let found = usize::try_from(index)
            .ok()
            .and_then(|i| text.chars().nth(i));
        match (found, args.get(2)) {
            (Some(ch), _) => Ok(Sexp::Char(ch)),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(ZyError::IndexOutOfBounds {
                index,
                len: text.chars().count(),
            }),
        }
    });

    c.register_many(&["append", "appendslice"], |_rt, name, args| {
        check_arity!(args, name, 2);
        match (&args[0], name) {
            (Sexp::Array(a), "append") => {
                let a = a.borrow();
                let mut items = a.items.clone();
                items.push(args[1].clone());
                Ok(Sexp::typed_array(items, a.typ.clone()))
            }
            (Sexp::Array(a), _) => {
                let Sexp::Array(extra) = &args[1] else {
                    return Err(ZyError::type_error("array", args[1].type_name()));
                };
                let a = a.borrow();
                let mut items = a.items.clone();
                items.extend(extra.borrow().items.iter().cloned());
                Ok(Sexp::typed_array(items, a.typ.clone()))
            }
            (Sexp::Str(s), _) => {
                let mut text = s.text.clone();
                push_text(&mut text, &args[1])?;
                Ok(Sexp::string(text))
            }
            (other, _) => Err(ZyError::type_error("array or string", other.type_name())),
        }
    });

    c.register_fn("concat", |_rt, name, args| {
        check_arity!(args, name, 1..);
        match &args[0] {
            Sexp::Array(a) => {
                let typ = a.borrow().typ.clone();
                let mut items = a.borrow().items.clone();
                for extra in &args[1..] {
                    match extra {
                        Sexp::Array(e) => items.extend(e.borrow().items.iter().cloned()),
                        other => return Err(ZyError::type_error("array", other.type_name())),
                    }
                }
                Ok(Sexp::typed_array(items, typ))
            }
            Sexp::Str(s) => {
                let mut text = s.text.clone();
                for extra in &args[1..] {
                    push_text(&mut text, extra)?;
                }
                Ok(Sexp::string(text))
            }
            Sexp::Null | Sexp::Pair(_) => {
                let mut items = Vec::new();
                for list in args {
                    if !list.is_list() {
                        return Err(ZyError::type_error("list", list.type_name()));
                    }
                    items.extend(list.list_to_vec()?);
                }
                Ok(Sexp::list(items))
            }
            other => Err(ZyError::type_error(
                "strings, lists or arrays",
                other.type_name(),
            )),
        }
    });

    c.register_fn("slice", |_rt, name, args| {
        check_arity!(args, name, 3);
        let start = int_arg(name, &args[1])?;
        let end = int_arg(name, &args[2])?;
        match &args[0] {
            Sexp::Array(a) => {
                let a = a.borrow();
                let range = checked_range(start, end, a.items.len())?;
                Ok(Sexp::typed_array(a.items[range].to_vec(), a.typ.clone()))
            }
            Sexp::Str(s) => {
                let chars: Vec<char> = s.text.chars().collect();
                let range = checked_range(start, end, chars.len())?;
                Ok(Sexp::string(chars[range].iter().collect::<String>()))
            }
            other => Err(ZyError::type_error("array or string", other.type_name())),
        }
    });

    c.register_fn("len", |_rt, name, args| {
        check_arity!(args, name, 1);
        let n = match &args[0] {
            Sexp::Null => 0,
            Sexp::Array(a) => a.borrow().items.len(),
            Sexp::Str(s) => s.text.chars().count(),
            Sexp::Hash(h) => h.borrow().len(),
            Sexp::Pair(_) => args[0].list_to_vec()?.len(),
            other => {
                return Err(ZyError::type_error(
                    "string, list, hash, or array",
                    other.type_name(),
                ))
            }
        };
        Ok(Sexp::Int(n as i64))
    });

    c.register_fn("flatten", |_rt, name, args| {
        check_arity!(args, name, 1..);
        let words = flatten_to_words(args)?;
        Ok(Sexp::array(words.into_iter().map(Sexp::string).collect()))
    });

    c.register_fn("quotelist", |_rt, name, args| {
        check_arity!(args, name, 1);
        if !matches!(args[0], Sexp::Pair(_)) {
            return Err(ZyError::type_error("list", args[0].type_name()));
        }
        let quoted = args[0]
            .list_to_vec()?
            .into_iter()
            .map(|v| Sexp::list(vec![Sexp::symbol("quote"), v]))
            .collect();
        Ok(Sexp::list(quoted))
    });

    c.register_fn("apply", |rt, name, args| {
        check_arity!(args, name, 2);
        if !matches!(args[0], Sexp::Function(_)) {
            return Err(ZyError::type_error("function", args[0].type_name()));
        }
        let fargs = args[1].sequence_items()?;
        rt.apply(&args[0], &fargs)
    });

    c.register_fn("map", |rt, name, args| {
        check_arity!(args, name, 2);
        if !matches!(args[0], Sexp::Function(_)) {
            return Err(ZyError::type_error("function", args[0].type_name()));
        }
        match &args[1] {
            Sexp::Array(a) => {
                let items = a.borrow().items.clone();
                let mapped = map_items(rt, &args[0], items)?;
                Ok(Sexp::array(mapped))
            }
            Sexp::Null | Sexp::Pair(_) => {
                let mapped = map_items(rt, &args[0], args[1].list_to_vec()?)?;
                Ok(Sexp::list(mapped))
            }
            other => Err(ZyError::type_error("array or list", other.type_name())),
        }
    });
}

fn map_items(rt: &mut dyn Runtime, f: &Sexp, items: Vec<Sexp>) -> Result<Vec<Sexp>, ZyError> {
    items
        .into_iter()
        .map(|item| rt.apply(f, std::slice::from_ref(&item)))
        .collect()
}

/// `aget`/`aset` (and `hget` on arrays). An out-of-range `aget` returns the
/// optional third argument when one is supplied.
pub(crate) fn array_access(
    name: &str,
    arr: &Rc<RefCell<SexpArray>>,
    args: &[Sexp],
) -> Result<Sexp, ZyError> {
    check_arity!(args, name, 2..=3);
    let index = int_arg(name, &args[1])?;
    let len = arr.borrow().items.len();
    let slot = usize::try_from(index).ok().filter(|i| *i < len);
    if name == "aset" {
        let Some(value) = args.get(2) else {
            return Err(ZyError::arity(name, "3", args.len()));
        };
        let i = slot.ok_or(ZyError::IndexOutOfBounds { index, len })?;
        arr.borrow_mut().items[i] = value.clone();
        return Ok(Sexp::Null);
    }
    match (slot, args.get(2)) {
        (Some(i), _) => Ok(arr.borrow().items[i].clone()),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(ZyError::IndexOutOfBounds { index, len }),
    }
}

/// Indices given either as one array or as separate arguments.
pub(crate) fn index_path(args: &[Sexp]) -> Result<Vec<Sexp>, ZyError> {
    match args {
        [Sexp::Array(a)] => Ok(a.borrow().items.clone()),
        rest => Ok(rest.to_vec()),
    }
}

fn nested_index(start: &Sexp, path: &[Sexp]) -> Result<Sexp, ZyError> {
    if path.is_empty() {
        return Err(ZyError::eval("arrayidx needs at least one index"));
    }
    let mut cur = start.clone();
    for step in path {
        let index = int_arg("arrayidx", step)?;
        let next = match &cur {
            Sexp::Array(a) => {
                let a = a.borrow();
                let len = a.items.len();
                usize::try_from(index)
                    .ok()
                    .and_then(|i| a.items.get(i).cloned())
                    .ok_or(ZyError::IndexOutOfBounds { index, len })?
            }
            other => return Err(ZyError::type_error("array", other.type_name())),
        };
        cur = next;
    }
    Ok(cur)
}

fn checked_range(start: i64, end: i64, len: usize) -> Result<std::ops::Range<usize>, ZyError> {
    let to_index = |i: i64| {
        usize::try_from(i)
            .ok()
            .filter(|u| *u <= len)
            .ok_or(ZyError::IndexOutOfBounds { index: i, len })
    };
    let (s, e) = (to_index(start)?, to_index(end)?);
    if s > e {
        return Err(ZyError::IndexOutOfBounds { index: start, len });
    }
    Ok(s..e)
}

fn push_text(text: &mut String, extra: &Sexp) -> Result<(), ZyError> {
    match extra {
        Sexp::Char(ch) => text.push(*ch),
        other => text.push_str(str_arg("append", other)?),
    }
    Ok(())
}

/// Strings split on spaces, symbols by name, lists recursively.
pub(crate) fn flatten_to_words(args: &[Sexp]) -> Result<Vec<String>, ZyError> {
    let mut words = Vec::new();
    for arg in args {
        match arg {
            Sexp::Str(s) => words.extend(s.text.split(' ').map(str::to_string)),
            Sexp::Symbol(sym) => words.push(sym.name()),
            Sexp::Pair(_) => words.extend(flatten_to_words(&arg.list_to_vec()?)?),
            Sexp::Array(a) => {
                let items = a.borrow().items.clone();
                words.extend(flatten_to_words(&items)?);
            }
            other => return Err(ZyError::type_error("string or symbol", other.type_name())),
        }
    }
    Ok(words)
}
