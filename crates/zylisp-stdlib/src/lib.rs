#![allow(clippy::mutable_key_type)]
mod arithmetic;
mod comparison;
mod json;
mod list;
mod map;
mod meta;
mod pointer;
mod predicates;
mod random;
mod reflection;
mod string;
mod system;

use zylisp_core::{Catalog, Sexp, ZyError};

pub use json::{json_to_sexp, sexp_to_json};
pub use string::format_printf;

/// Arithmetic, comparison, collections, pointers, predicates and evaluation.
pub fn core_functions() -> Catalog {
    let mut c = Catalog::new();
    arithmetic::register(&mut c);
    comparison::register(&mut c);
    list::register(&mut c);
    map::register(&mut c);
    predicates::register(&mut c);
    meta::register(&mut c);
    pointer::register(&mut c);
    c
}

pub fn string_functions() -> Catalog {
    let mut c = Catalog::new();
    string::register(&mut c);
    c
}

pub fn encoding_functions() -> Catalog {
    let mut c = Catalog::new();
    json::register(&mut c);
    c
}

/// Filesystem, process and environment access. Not sandbox-safe.
pub fn system_functions() -> Catalog {
    let mut c = Catalog::new();
    system::register(&mut c);
    c
}

pub fn random_functions() -> Catalog {
    let mut c = Catalog::new();
    random::register(&mut c);
    c
}

pub fn reflection_functions() -> Catalog {
    let mut c = Catalog::new();
    reflection::register(&mut c);
    c
}

/// Pure data-structure, string and encoding functions only.
pub fn sandbox_safe_functions() -> Catalog {
    let mut c = core_functions();
    c.merge(string_functions());
    c.merge(encoding_functions());
    c
}

/// Every builtin. Panics at startup if two catalogs define the same name.
pub fn all_builtin_functions() -> Catalog {
    let mut c = sandbox_safe_functions();
    c.merge(system_functions());
    c.merge(random_functions());
    c.merge(reflection_functions());
    c
}

pub(crate) fn str_arg<'a>(name: &str, v: &'a Sexp) -> Result<&'a str, ZyError> {
    v.as_str()
        .ok_or_else(|| ZyError::type_error(format!("string ({name})"), v.type_name()))
}

/// Integer-valued argument; chars count by code point.
pub(crate) fn int_arg(name: &str, v: &Sexp) -> Result<i64, ZyError> {
    match v {
        Sexp::Int(n) => Ok(*n),
        Sexp::Uint64(n) => Ok(*n as i64),
        Sexp::Char(c) => Ok(i64::from(u32::from(*c))),
        other => Err(ZyError::type_error(
            format!("integer ({name})"),
            other.type_name(),
        )),
    }
}

/// A symbol or string, as a name.
pub(crate) fn name_arg(name: &str, v: &Sexp) -> Result<String, ZyError> {
    match v {
        Sexp::Symbol(s) => Ok(s.name()),
        Sexp::Str(s) => Ok(s.text.clone()),
        other => Err(ZyError::type_error(
            format!("symbol or string ({name})"),
            other.type_name(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zylisp_core::Symbol;

    #[test]
    fn full_catalog_has_no_duplicates() {
        // merge panics on a duplicate
        let all = all_builtin_functions();
        assert!(all.len() > sandbox_safe_functions().len());
    }

    #[test]
    fn sandbox_excludes_effects() {
        let safe = sandbox_safe_functions();
        for name in [
            "system", "sys", "slurpf", "writef", "save", "exit", "getenv", "random", "togo",
            "_method",
        ] {
            assert!(!safe.contains(Symbol::new(name)), "{name} should not be sandbox-safe");
        }
        for name in ["+", "hget", "hashidx", "arrayidx", "split", "json", "msgpack", "&", "pretty"] {
            assert!(safe.contains(Symbol::new(name)), "{name} should be sandbox-safe");
        }
    }

    #[test]
    fn builders_are_flagged() {
        let all = all_builtin_functions();
        for name in ["&", "sys", "=", ":="] {
            assert!(all.is_builder(Symbol::new(name)), "{name} should be a builder");
        }
        assert!(!all.is_builder(Symbol::new("system")));
    }

    #[test]
    #[should_panic(expected = "duplicate function name")]
    fn merging_overlapping_catalogs_panics() {
        let mut c = core_functions();
        c.merge(core_functions());
    }
}
