use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};

use lasso::{Key, Rodeo, Spur};

thread_local! {
    static INTERNER: RefCell<Rodeo> = RefCell::new(Rodeo::default());
}

/// Intern a string, returning a Spur key.
pub fn intern(s: &str) -> Spur {
    INTERNER.with(|r| r.borrow_mut().get_or_intern(s))
}

/// Resolve a Spur key back to a String.
pub fn resolve(spur: Spur) -> String {
    INTERNER.with(|r| r.borrow().resolve(&spur).to_string())
}

/// Resolve a Spur and call f with the &str, avoiding allocation.
pub fn with_resolved<F, R>(spur: Spur, f: F) -> R
where
    F: FnOnce(&str) -> R,
{
    INTERNER.with(|r| {
        let interner = r.borrow();
        f(interner.resolve(&spur))
    })
}

/// Whether `name` denotes a field-access path (`a.b`, `.field`) rather than a
/// plain binding. Names made only of dots (`.`, `...`) are ordinary symbols.
pub fn is_dot_name(name: &str) -> bool {
    name.contains('.') && !name.chars().all(|c| c == '.')
}

/// An interned symbol. Equality and hashing use the interned id only.
#[derive(Clone, Copy)]
pub struct Symbol {
    id: Spur,
    dot: bool,
}

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol {
            id: intern(name),
            dot: is_dot_name(name),
        }
    }

    pub fn id(&self) -> Spur {
        self.id
    }

    /// Small integer id, stable for the life of the thread.
    pub fn number(&self) -> usize {
        self.id.into_usize()
    }

    pub fn is_dot(&self) -> bool {
        self.dot
    }

    pub fn name(&self) -> String {
        resolve(self.id)
    }

    pub fn with_name<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        with_resolved(self.id, f)
    }

    /// Path segments of a dot symbol; `a.b.c` and `.a.b.c` both give `[a, b, c]`.
    pub fn segments(&self) -> Vec<Symbol> {
        self.with_name(|n| {
            n.split('.')
                .filter(|s| !s.is_empty())
                .map(Symbol::new)
                .collect()
        })
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_name(|n| write!(f, "Symbol({n})"))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_name(|n| f.write_str(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        let a = Symbol::new("alpha");
        let b = Symbol::new("alpha");
        assert_eq!(a, b);
        assert_eq!(a.number(), b.number());
        assert_ne!(a, Symbol::new("beta"));
    }

    #[test]
    fn dot_flag() {
        assert!(Symbol::new("a.b").is_dot());
        assert!(Symbol::new(".field").is_dot());
        assert!(!Symbol::new(".").is_dot());
        assert!(!Symbol::new("...").is_dot());
        assert!(!Symbol::new("plain").is_dot());
    }

    #[test]
    fn segments_skip_leading_dot() {
        let segs: Vec<String> = Symbol::new(".a.b.c")
            .segments()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(segs, vec!["a", "b", "c"]);
    }
}
