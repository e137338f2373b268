use serde_json::{Map, Number, Value as Json};
use zylisp_core::{check_arity, Catalog, HashKind, Sexp, SexpHash, ZyError};

use crate::{name_arg, str_arg};

pub fn register(c: &mut Catalog) {
    c.register_fn("json", |_rt, name, args| {
        check_arity!(args, name, 1);
        let json = sexp_to_json(&args[0])?;
        let text =
            serde_json::to_string(&json).map_err(|e| ZyError::eval(format!("{name}: {e}")))?;
        Ok(Sexp::string(text))
    });

    c.register_fn("unjson", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        let json: Json =
            serde_json::from_str(text).map_err(|e| ZyError::eval(format!("{name}: {e}")))?;
        Ok(json_to_sexp(&json))
    });

    // MessagePack bytes travel as a uint8-typed array of ints.
    c.register_fn("msgpack", |_rt, name, args| {
        check_arity!(args, name, 1);
        let json = sexp_to_json(&args[0])?;
        let bytes = rmp_serde::to_vec(&json).map_err(|e| ZyError::eval(format!("{name}: {e}")))?;
        Ok(bytes_to_sexp(&bytes))
    });

    c.register_fn("unmsgpack", |_rt, name, args| {
        check_arity!(args, name, 1);
        let bytes = sexp_to_bytes(name, &args[0])?;
        let json: Json = rmp_serde::from_slice(&bytes)
            .map_err(|e| ZyError::eval(format!("{name}: {e}")))?;
        Ok(json_to_sexp(&json))
    });

    // (msgmap Name k v ...): a hash tagged for message encoding.
    c.register_fn("msgmap", |_rt, name, args| {
        check_arity!(args, name, 1..);
        let type_name = name_arg(name, &args[0])?;
        let kvs = &args[1..];
        if kvs.len() % 2 != 0 {
            return Err(ZyError::eval(format!(
                "{name} requires an even number of key/value arguments"
            )));
        }
        let mut h = SexpHash::with_kind(HashKind::MsgMap, type_name);
        for kv in kvs.chunks_exact(2) {
            h.insert(kv[0].clone(), kv[1].clone())?;
        }
        Ok(Sexp::hash(h))
    });
}

/// Encode a value as JSON. Hash keys are written as their plain text;
/// values with no JSON counterpart (functions, pointers, NaN) are errors.
pub fn sexp_to_json(v: &Sexp) -> Result<Json, ZyError> {
    let unsupported = |what: &str| ZyError::eval(format!("cannot encode {what} as JSON"));
    Ok(match v {
        Sexp::Null => Json::Null,
        Sexp::Bool(b) => Json::Bool(*b),
        Sexp::Int(n) => Json::Number((*n).into()),
        Sexp::Uint64(n) => Json::Number((*n).into()),
        Sexp::Float(x) => Json::Number(Number::from_f64(*x).ok_or_else(|| unsupported("NaN or infinity"))?),
        Sexp::Char(c) => Json::String(c.to_string()),
        Sexp::Str(s) => Json::String(s.text.clone()),
        Sexp::Symbol(s) => Json::String(s.name()),
        Sexp::Time(t) => Json::String(t.to_rfc3339()),
        Sexp::Pair(_) | Sexp::Array(_) => Json::Array(
            v.sequence_items()?
                .iter()
                .map(sexp_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Sexp::Hash(h) => {
            let mut obj = Map::new();
            for (k, val) in h.borrow().iter() {
                obj.insert(k.to_plain_string(), sexp_to_json(val)?);
            }
            Json::Object(obj)
        }
        other => return Err(unsupported(&other.type_name())),
    })
}

/// Decode JSON. Objects become plain hashes keyed by strings, in document order.
pub fn json_to_sexp(json: &Json) -> Sexp {
    match json {
        Json::Null => Sexp::Null,
        Json::Bool(b) => Sexp::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sexp::Int(i)
            } else if let Some(u) = n.as_u64() {
                Sexp::Uint64(u)
            } else {
                Sexp::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Sexp::string(s.as_str()),
        Json::Array(items) => Sexp::array(items.iter().map(json_to_sexp).collect()),
        Json::Object(obj) => {
            let mut h = SexpHash::new();
            for (k, val) in obj {
                h.set(Sexp::string(k.as_str()), json_to_sexp(val));
            }
            Sexp::hash(h)
        }
    }
}

fn bytes_to_sexp(bytes: &[u8]) -> Sexp {
    let items = bytes.iter().map(|b| Sexp::Int(i64::from(*b))).collect();
    Sexp::typed_array(items, Some("uint8".to_string()))
}

fn sexp_to_bytes(name: &str, v: &Sexp) -> Result<Vec<u8>, ZyError> {
    let Sexp::Array(a) = v else {
        return Err(ZyError::type_error("byte array", v.type_name()));
    };
    a.borrow()
        .items
        .iter()
        .map(|item| {
            item.as_int()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| ZyError::eval(format!("{name}: {item} is not a byte")))
        })
        .collect()
}
