use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use chrono::{DateTime, FixedOffset};

use crate::bridge::{Pointer, Reflected};
use crate::env::Scope;
use crate::error::ZyError;
use crate::function::Function;
use crate::hash::{HashKind, SexpHash};
use crate::symbol::Symbol;

/// String payload. `raw` strings display with backticks and no escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SexpStr {
    pub text: String,
    pub raw: bool,
}

/// A cons cell.
#[derive(Debug, Clone)]
pub struct Pair {
    pub head: Sexp,
    pub tail: Sexp,
}

/// A mutable sequence with an advisory element-type tag.
#[derive(Debug, Clone, Default)]
pub struct SexpArray {
    pub items: Vec<Sexp>,
    pub typ: Option<String>,
}

impl SexpArray {
    pub fn new(items: Vec<Sexp>) -> Self {
        let typ = items.first().map(|v| v.type_name());
        SexpArray { items, typ }
    }
}

/// The tagged value every part of the runtime manipulates.
#[derive(Clone)]
pub enum Sexp {
    /// The empty list and the canonical "no value".
    Null,
    /// End-of-stream marker.
    End,
    Bool(bool),
    Int(i64),
    Float(f64),
    Uint64(u64),
    Char(char),
    Str(Rc<SexpStr>),
    Symbol(Symbol),
    Pair(Rc<Pair>),
    Array(Rc<RefCell<SexpArray>>),
    Hash(Rc<RefCell<SexpHash>>),
    Function(Rc<Function>),
    Pointer(Rc<Pointer>),
    Reflect(Rc<Reflected>),
    Time(DateTime<FixedOffset>),
    Package(Scope),
}

impl Sexp {
    pub fn type_name(&self) -> String {
        match self {
            Sexp::Null => "nil".into(),
            Sexp::End => "end".into(),
            Sexp::Bool(_) => "bool".into(),
            Sexp::Int(_) => "int64".into(),
            Sexp::Float(_) => "float64".into(),
            Sexp::Uint64(_) => "uint64".into(),
            Sexp::Char(_) => "char".into(),
            Sexp::Str(_) => "string".into(),
            Sexp::Symbol(_) => "symbol".into(),
            Sexp::Pair(_) => "list".into(),
            Sexp::Array(a) => match &a.borrow().typ {
                Some(t) => format!("[]{t}"),
                None => "[]".into(),
            },
            Sexp::Hash(h) => h.borrow().type_name().to_string(),
            Sexp::Function(_) => "func".into(),
            Sexp::Pointer(p) => format!("*{}", p.pointed_to()),
            Sexp::Reflect(r) => r.type_name().to_string(),
            Sexp::Time(_) => "time.Time".into(),
            Sexp::Package(_) => "package".into(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Sexp::Null | Sexp::End => false,
            Sexp::Bool(b) => *b,
            Sexp::Int(n) => *n != 0,
            Sexp::Char(c) => *c != '\0',
            _ => true,
        }
    }

    pub fn string(s: impl Into<String>) -> Sexp {
        Sexp::Str(Rc::new(SexpStr {
            text: s.into(),
            raw: false,
        }))
    }

    pub fn raw_string(s: impl Into<String>) -> Sexp {
        Sexp::Str(Rc::new(SexpStr {
            text: s.into(),
            raw: true,
        }))
    }

    pub fn symbol(name: &str) -> Sexp {
        Sexp::Symbol(Symbol::new(name))
    }

    pub fn cons(head: Sexp, tail: Sexp) -> Sexp {
        Sexp::Pair(Rc::new(Pair { head, tail }))
    }

    pub fn list(items: Vec<Sexp>) -> Sexp {
        items
            .into_iter()
            .rev()
            .fold(Sexp::Null, |tail, head| Sexp::cons(head, tail))
    }

    pub fn array(items: Vec<Sexp>) -> Sexp {
        Sexp::Array(Rc::new(RefCell::new(SexpArray::new(items))))
    }

    pub fn typed_array(items: Vec<Sexp>, typ: Option<String>) -> Sexp {
        Sexp::Array(Rc::new(RefCell::new(SexpArray { items, typ })))
    }

    pub fn hash(h: SexpHash) -> Sexp {
        Sexp::Hash(Rc::new(RefCell::new(h)))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Sexp::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Sexp::Str(s) => Some(&s.text),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Sexp::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Sexp::Null | Sexp::Pair(_))
    }

    /// Linearize a proper list into a vector.
    pub fn list_to_vec(&self) -> Result<Vec<Sexp>, ZyError> {
        let mut out = Vec::new();
        let mut cur = self.clone();
        loop {
            match cur {
                Sexp::Null => return Ok(out),
                Sexp::Pair(p) => {
                    out.push(p.head.clone());
                    cur = p.tail.clone();
                }
                other => {
                    return Err(ZyError::type_error("proper list", other.type_name()));
                }
            }
        }
    }

    /// Elements of a list or array.
    pub fn sequence_items(&self) -> Result<Vec<Sexp>, ZyError> {
        match self {
            Sexp::Array(a) => Ok(a.borrow().items.clone()),
            Sexp::Null | Sexp::Pair(_) => self.list_to_vec(),
            other => Err(ZyError::type_error("array or list", other.type_name())),
        }
    }

    /// Text as `str`/`print` show it: strings and chars without quoting.
    pub fn to_plain_string(&self) -> String {
        match self {
            Sexp::Str(s) => s.text.clone(),
            Sexp::Char(c) => c.to_string(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Sexp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Sexp::Null, Sexp::Null) | (Sexp::End, Sexp::End) => true,
            (Sexp::Bool(a), Sexp::Bool(b)) => a == b,
            (Sexp::Int(a), Sexp::Int(b)) => a == b,
            (Sexp::Float(a), Sexp::Float(b)) => a.to_bits() == b.to_bits(),
            (Sexp::Uint64(a), Sexp::Uint64(b)) => a == b,
            (Sexp::Char(a), Sexp::Char(b)) => a == b,
            (Sexp::Str(a), Sexp::Str(b)) => a.text == b.text,
            (Sexp::Symbol(a), Sexp::Symbol(b)) => a == b,
            (Sexp::Pair(a), Sexp::Pair(b)) => {
                Rc::ptr_eq(a, b) || (a.head == b.head && a.tail == b.tail)
            }
            (Sexp::Array(a), Sexp::Array(b)) => {
                Rc::ptr_eq(a, b) || a.borrow().items == b.borrow().items
            }
            (Sexp::Hash(a), Sexp::Hash(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Sexp::Function(a), Sexp::Function(b)) => Rc::ptr_eq(a, b),
            (Sexp::Pointer(a), Sexp::Pointer(b)) => Rc::ptr_eq(a, b),
            (Sexp::Reflect(a), Sexp::Reflect(b)) => Rc::ptr_eq(a, b),
            (Sexp::Time(a), Sexp::Time(b)) => a == b,
            (Sexp::Package(a), Sexp::Package(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Sexp {}

impl Hash for Sexp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Sexp::Null | Sexp::End => {}
            Sexp::Bool(b) => b.hash(state),
            Sexp::Int(n) => n.hash(state),
            Sexp::Float(f) => f.to_bits().hash(state),
            Sexp::Uint64(n) => n.hash(state),
            Sexp::Char(c) => c.hash(state),
            Sexp::Str(s) => s.text.hash(state),
            Sexp::Symbol(s) => s.hash(state),
            Sexp::Pair(p) => {
                p.head.hash(state);
                p.tail.hash(state);
            }
            Sexp::Array(a) => a.borrow().items.hash(state),
            Sexp::Hash(h) => {
                let h = h.borrow();
                h.type_name().hash(state);
                h.len().hash(state);
            }
            Sexp::Function(f) => (Rc::as_ptr(f) as usize).hash(state),
            Sexp::Pointer(p) => (Rc::as_ptr(p) as usize).hash(state),
            Sexp::Reflect(r) => (Rc::as_ptr(r) as usize).hash(state),
            Sexp::Time(t) => t.hash(state),
            Sexp::Package(p) => p.addr().hash(state),
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Sexp]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Null => f.write_str("nil"),
            Sexp::End => f.write_str("End"),
            Sexp::Bool(b) => write!(f, "{b}"),
            Sexp::Int(n) => write!(f, "{n}"),
            Sexp::Float(x) => {
                if x.is_nan() {
                    f.write_str("NaN")
                } else if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Sexp::Uint64(n) => write!(f, "{n}"),
            Sexp::Char(c) => match c {
                ' ' => f.write_str("#space"),
                '\n' => f.write_str("#newline"),
                '\t' => f.write_str("#tab"),
                c => write!(f, "#{c}"),
            },
            Sexp::Str(s) if s.raw => write!(f, "`{}`", s.text),
            Sexp::Str(s) => write_escaped(f, &s.text),
            Sexp::Symbol(s) => write!(f, "{s}"),
            Sexp::Pair(p) => {
                f.write_str("(")?;
                write!(f, "{}", p.head)?;
                let mut cur = p.tail.clone();
                loop {
                    match cur {
                        Sexp::Null => break,
                        Sexp::Pair(next) => {
                            write!(f, " {}", next.head)?;
                            cur = next.tail.clone();
                        }
                        other => {
                            write!(f, " \\ {other}")?;
                            break;
                        }
                    }
                }
                f.write_str(")")
            }
            Sexp::Array(a) => {
                f.write_str("[")?;
                write_seq(f, &a.borrow().items)?;
                f.write_str("]")
            }
            Sexp::Hash(h) => {
                let h = h.borrow();
                match h.kind() {
                    HashKind::Hash => f.write_str("(hash")?,
                    kind => write!(f, "({} {}", kind.as_str(), h.type_name())?,
                }
                for (k, v) in h.iter() {
                    write!(f, " {k} {v}")?;
                }
                f.write_str(")")
            }
            Sexp::Function(func) => write!(f, "(fn {})", func.name),
            Sexp::Pointer(p) => write!(f, "(* {})", p.pointed_to()),
            Sexp::Reflect(r) => write!(f, "(reflect {})", r.type_name()),
            Sexp::Time(t) => write!(f, "(time {})", t.to_rfc3339()),
            Sexp::Package(p) => write!(f, "(package {})", p.name()),
        }
    }
}

impl fmt::Debug for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trips_through_vec() {
        let l = Sexp::list(vec![Sexp::Int(1), Sexp::Int(2), Sexp::Int(3)]);
        assert_eq!(l.to_string(), "(1 2 3)");
        assert_eq!(
            l.list_to_vec().unwrap(),
            vec![Sexp::Int(1), Sexp::Int(2), Sexp::Int(3)]
        );
        assert_eq!(Sexp::list(vec![]), Sexp::Null);
    }

    #[test]
    fn improper_list_is_not_linearized() {
        let p = Sexp::cons(Sexp::Int(1), Sexp::Int(2));
        assert_eq!(p.to_string(), "(1 \\ 2)");
        assert!(matches!(p.list_to_vec(), Err(ZyError::Type { .. })));
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Sexp::Float(2.0).to_string(), "2.0");
        assert_eq!(Sexp::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Sexp::Char(' ').to_string(), "#space");
        assert_eq!(Sexp::Char('a').to_string(), "#a");
        assert_eq!(Sexp::string("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Sexp::raw_string("x\\y").to_string(), "`x\\y`");
    }

    #[test]
    fn array_type_tag_follows_first_element() {
        let a = Sexp::array(vec![Sexp::Int(1), Sexp::Int(2)]);
        assert_eq!(a.type_name(), "[]int64");
        assert_eq!(Sexp::array(vec![]).type_name(), "[]");
    }

    #[test]
    fn truthiness() {
        assert!(!Sexp::Null.is_truthy());
        assert!(!Sexp::Bool(false).is_truthy());
        assert!(!Sexp::Int(0).is_truthy());
        assert!(Sexp::Int(3).is_truthy());
        assert!(Sexp::string("").is_truthy());
    }

    #[test]
    fn float_keys_compare_by_bits() {
        assert_eq!(Sexp::Float(f64::NAN), Sexp::Float(f64::NAN));
        assert_ne!(Sexp::Int(1), Sexp::Float(1.0));
    }
}
