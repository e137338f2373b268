use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::Rc;

use hashbrown::HashMap;
use lasso::Spur;

use crate::bridge::Bridge;
use crate::catalog::Catalog;
use crate::error::ZyError;
use crate::symbol::{resolve, Symbol};
use crate::value::Sexp;

/// Names the generator treats as special forms; they cannot be rebound.
pub const SPECIAL_FORMS: &[&str] = &[
    "quote", "begin", "=", ":=", "def", "fn", "defn", "if", "cond", "and", "or", "let", "package",
];

struct ScopeInner {
    name: String,
    is_package: bool,
    bindings: RefCell<HashMap<Spur, Sexp>>,
}

/// One lexical frame. Cloning shares the frame, so closures that capture
/// it observe later rebindings.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Scope(Rc::new(ScopeInner {
            name: name.into(),
            is_package: false,
            bindings: RefCell::new(HashMap::new()),
        }))
    }

    pub fn package(name: impl Into<String>) -> Self {
        Scope(Rc::new(ScopeInner {
            name: name.into(),
            is_package: true,
            bindings: RefCell::new(HashMap::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_package(&self) -> bool {
        self.0.is_package
    }

    pub fn get(&self, sym: Symbol) -> Option<Sexp> {
        self.0.bindings.borrow().get(&sym.id()).cloned()
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.0.bindings.borrow().contains_key(&sym.id())
    }

    pub fn set(&self, sym: Symbol, value: Sexp) {
        self.0.bindings.borrow_mut().insert(sym.id(), value);
    }

    pub fn remove(&self, sym: Symbol) -> Option<Sexp> {
        self.0.bindings.borrow_mut().remove(&sym.id())
    }

    pub fn len(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bindings sorted by name.
    pub fn entries(&self) -> Vec<(String, Sexp)> {
        let mut out: Vec<(String, Sexp)> = self
            .0
            .bindings
            .borrow()
            .iter()
            .map(|(k, v)| (resolve(*k), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_package() { "package" } else { "scope" };
        write!(f, "<{kind} {} ({} bindings)>", self.name(), self.len())
    }
}

/// Package members are exported when their name starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Saved stack shape, used to unwind after a failed evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvDepth {
    pub chains: usize,
    pub scopes: usize,
}

/// The scope stack-of-stacks.
///
/// Each chain is the lexical scope list of one activation: the chain of the
/// calling closure plus a fresh frame. The base chain holds only the global
/// frame and is never popped.
pub struct Env {
    global: Scope,
    chains: Vec<Vec<Scope>>,
    catalog: Catalog,
    bridge: Bridge,
}

impl Env {
    pub fn new(catalog: Catalog, bridge: Bridge) -> Self {
        let global = Scope::new("global");
        Env {
            chains: vec![vec![global.clone()]],
            global,
            catalog,
            bridge,
        }
    }

    pub fn global(&self) -> &Scope {
        &self.global
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    fn chain(&self) -> &Vec<Scope> {
        // the base chain is never popped
        &self.chains[self.chains.len() - 1]
    }

    fn chain_mut(&mut self) -> &mut Vec<Scope> {
        let last = self.chains.len() - 1;
        &mut self.chains[last]
    }

    /// The innermost frame of the current chain.
    pub fn top_scope(&self) -> &Scope {
        let chain = self.chain();
        &chain[chain.len() - 1]
    }

    pub fn is_reserved(&self, sym: Symbol) -> bool {
        self.catalog.contains(sym) || sym.with_name(|n| SPECIAL_FORMS.contains(&n))
    }

    fn check_bindable(&self, sym: Symbol) -> Result<(), ZyError> {
        if self.is_reserved(sym) {
            return Err(ZyError::Assignment(sym.name()));
        }
        Ok(())
    }

    /// Introduce or overwrite `sym` in the innermost frame.
    pub fn bind(&mut self, sym: Symbol, value: Sexp) -> Result<(), ZyError> {
        self.check_bindable(sym)?;
        self.top_scope().set(sym, value);
        Ok(())
    }

    /// Update the nearest existing binding of `sym` along the current chain,
    /// or bind it in the innermost frame when none exists.
    pub fn assign(&mut self, sym: Symbol, value: Sexp) -> Result<(), ZyError> {
        self.check_bindable(sym)?;
        match self.chain().iter().rev().find(|s| s.contains(sym)) {
            Some(scope) => scope.set(sym, value),
            None => self.top_scope().set(sym, value),
        }
        Ok(())
    }

    /// The frame that currently binds `sym`, searching innermost first.
    pub fn find_scope(&self, sym: Symbol) -> Option<Scope> {
        self.chain().iter().rev().find(|s| s.contains(sym)).cloned()
    }

    /// Resolve `sym` innermost to outermost, then in the catalog. Dot
    /// symbols resolve as field-access paths.
    pub fn lookup(&self, sym: Symbol) -> Result<Sexp, ZyError> {
        if sym.is_dot() {
            return self.dot_get(sym);
        }
        self.lookup_plain(sym)
    }

    fn lookup_plain(&self, sym: Symbol) -> Result<Sexp, ZyError> {
        for scope in self.chain().iter().rev() {
            if let Some(v) = scope.get(sym) {
                return Ok(v);
            }
        }
        self.catalog
            .get(sym)
            .cloned()
            .ok_or_else(|| ZyError::SymbolNotFound(sym.name()))
    }

    pub fn is_defined(&self, sym: Symbol) -> bool {
        self.lookup(sym).is_ok()
    }

    /// Walk `a.b.c`: `a` by normal lookup, then each segment into the
    /// package, hash, or bridged value reached so far.
    pub fn dot_get(&self, sym: Symbol) -> Result<Sexp, ZyError> {
        let segs = sym.segments();
        let (first, rest) = segs
            .split_first()
            .ok_or_else(|| ZyError::SymbolNotFound(sym.name()))?;
        let mut cur = self.lookup_plain(*first)?;
        for seg in rest {
            cur = self.member(&cur, *seg)?;
        }
        Ok(cur)
    }

    fn member(&self, container: &Sexp, seg: Symbol) -> Result<Sexp, ZyError> {
        match container {
            Sexp::Package(pkg) => {
                check_exported(pkg, seg)?;
                pkg.get(seg)
                    .ok_or_else(|| ZyError::SymbolNotFound(format!("{}.{}", pkg.name(), seg)))
            }
            Sexp::Hash(h) => {
                let h = h.borrow();
                seg.with_name(|n| h.get_field(n))
                    .ok_or_else(|| ZyError::field_not_found(seg))
            }
            Sexp::Reflect(r) => seg.with_name(|n| self.bridge.get_field(r, n)),
            other => Err(ZyError::FieldNotFound(format!(
                "{seg} (on a {}, not a hash)",
                other.type_name()
            ))),
        }
    }

    /// Write through a dot path. A single segment assigns like `=`; longer
    /// paths must end in a hash or a package.
    pub fn dot_set(&mut self, sym: Symbol, value: Sexp) -> Result<(), ZyError> {
        let segs = sym.segments();
        match segs.as_slice() {
            [] => Err(ZyError::SymbolNotFound(sym.name())),
            [only] => self.assign(*only, value),
            [first, middle @ .., last] => {
                let mut cur = self.lookup_plain(*first)?;
                for seg in middle {
                    cur = self.member(&cur, *seg)?;
                }
                match &cur {
                    Sexp::Package(pkg) => {
                        check_exported(pkg, *last)?;
                        pkg.set(*last, value);
                        Ok(())
                    }
                    Sexp::Hash(h) => {
                        let mut h = h.borrow_mut();
                        let as_str = Sexp::string(last.name());
                        let key = if !h.contains(&Sexp::Symbol(*last)) && h.contains(&as_str) {
                            as_str
                        } else {
                            Sexp::Symbol(*last)
                        };
                        h.set(key, value);
                        Ok(())
                    }
                    Sexp::Reflect(r) => Err(ZyError::UnsupportedAssignment(format!(
                        "cannot set `{last}` through bridged value of type {}",
                        r.type_name()
                    ))),
                    other => Err(ZyError::type_error("hash or package", other.type_name())),
                }
            }
        }
    }

    /// Remove `sym` from the innermost frame only.
    pub fn delete_from_top(&mut self, sym: Symbol) -> Result<(), ZyError> {
        self.top_scope()
            .remove(sym)
            .map(|_| ())
            .ok_or_else(|| ZyError::SymbolNotFound(sym.name()))
    }

    /// Snapshot of the current chain, shared by reference.
    pub fn capture(&self) -> Vec<Scope> {
        self.chain().clone()
    }

    pub fn push_chain(&mut self, chain: Vec<Scope>) {
        self.chains.push(chain);
    }

    pub fn pop_chain(&mut self) -> Result<(), ZyError> {
        if self.chains.len() <= 1 {
            return Err(ZyError::eval("cannot pop the base scope chain"));
        }
        self.chains.pop();
        Ok(())
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.chain_mut().push(scope);
    }

    pub fn pop_scope(&mut self) -> Result<Scope, ZyError> {
        let chain = self.chain_mut();
        if chain.len() <= 1 {
            return Err(ZyError::eval("cannot pop the outermost scope of a chain"));
        }
        chain
            .pop()
            .ok_or_else(|| ZyError::eval("scope chain is empty"))
    }

    pub fn depth(&self) -> EnvDepth {
        EnvDepth {
            chains: self.chains.len(),
            scopes: self.chain().len(),
        }
    }

    /// Unwind to a previously saved depth.
    pub fn restore(&mut self, depth: EnvDepth) {
        self.chains.truncate(depth.chains.max(1));
        let chain = self.chain_mut();
        chain.truncate(depth.scopes.max(1));
    }

    /// Drop every chain but the base one and clear the global frame.
    pub fn clear(&mut self) {
        self.global = Scope::new("global");
        self.chains = vec![vec![self.global.clone()]];
    }

    /// Render the stack-of-stacks, outermost chain first.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, chain) in self.chains.iter().enumerate() {
            let _ = writeln!(out, "chain {i}:");
            out.push_str(&dump_chain(chain));
        }
        out
    }
}

/// One line per scope, outermost first, followed by its sorted bindings.
/// Also used for the environment a closure captured.
pub fn dump_chain(chain: &[Scope]) -> String {
    let mut out = String::new();
    for (depth, scope) in chain.iter().enumerate() {
        let kind = if scope.is_package() { "package" } else { "scope" };
        let _ = writeln!(out, "  [{depth}] {kind} '{}'", scope.name());
        for (name, value) in scope.entries() {
            let _ = writeln!(out, "      {name} = {value}");
        }
    }
    out
}

fn check_exported(pkg: &Scope, seg: Symbol) -> Result<(), ZyError> {
    if seg.with_name(is_exported) {
        Ok(())
    } else {
        Err(ZyError::PrivateAccess {
            package: pkg.name().to_string(),
            name: seg.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgedType, Reflected};
    use crate::hash::SexpHash;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn env() -> Env {
        let mut catalog = Catalog::new();
        catalog.register_fn("builtin", |_rt, _n, _a| Ok(Sexp::Null));
        Env::new(catalog, Bridge::new())
    }

    #[test]
    fn lookup_inner_to_outer_then_catalog() {
        let mut e = env();
        e.bind(sym("x"), Sexp::Int(1)).unwrap();
        e.push_scope(Scope::new("inner"));
        e.bind(sym("x"), Sexp::Int(2)).unwrap();
        assert_eq!(e.lookup(sym("x")).unwrap(), Sexp::Int(2));
        e.pop_scope().unwrap();
        assert_eq!(e.lookup(sym("x")).unwrap(), Sexp::Int(1));
        assert!(matches!(e.lookup(sym("builtin")), Ok(Sexp::Function(_))));
        assert!(matches!(
            e.lookup(sym("missing")),
            Err(ZyError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn reserved_names_cannot_be_bound() {
        let mut e = env();
        assert!(matches!(
            e.bind(sym("builtin"), Sexp::Int(1)),
            Err(ZyError::Assignment(_))
        ));
        assert!(matches!(
            e.bind(sym("defn"), Sexp::Int(1)),
            Err(ZyError::Assignment(_))
        ));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let mut e = env();
        e.bind(sym("n"), Sexp::Int(1)).unwrap();
        e.push_scope(Scope::new("inner"));
        e.assign(sym("n"), Sexp::Int(5)).unwrap();
        e.assign(sym("fresh"), Sexp::Int(7)).unwrap();
        e.pop_scope().unwrap();
        assert_eq!(e.lookup(sym("n")).unwrap(), Sexp::Int(5));
        assert!(e.lookup(sym("fresh")).is_err());
    }

    #[test]
    fn captured_chain_sees_later_rebinding() {
        let mut e = env();
        e.bind(sym("v"), Sexp::Int(1)).unwrap();
        let captured = e.capture();
        e.bind(sym("v"), Sexp::Int(2)).unwrap();
        e.push_chain(captured);
        e.push_scope(Scope::new("call"));
        assert_eq!(e.lookup(sym("v")).unwrap(), Sexp::Int(2));
        e.pop_chain().unwrap();
    }

    #[test]
    fn delete_only_touches_top_frame() {
        let mut e = env();
        e.bind(sym("g"), Sexp::Int(1)).unwrap();
        e.push_scope(Scope::new("inner"));
        assert!(matches!(
            e.delete_from_top(sym("g")),
            Err(ZyError::SymbolNotFound(_))
        ));
        e.pop_scope().unwrap();
        e.delete_from_top(sym("g")).unwrap();
        assert!(e.lookup(sym("g")).is_err());
    }

    #[test]
    fn package_privacy() {
        let mut e = env();
        let pkg = Scope::package("geo");
        pkg.set(sym("Pi"), Sexp::Float(3.14));
        pkg.set(sym("secret"), Sexp::Int(1));
        e.bind(sym("geo"), Sexp::Package(pkg)).unwrap();
        assert_eq!(e.lookup(sym("geo.Pi")).unwrap(), Sexp::Float(3.14));
        assert!(matches!(
            e.lookup(sym("geo.secret")),
            Err(ZyError::PrivateAccess { .. })
        ));
        e.dot_set(sym("geo.Pi"), Sexp::Int(3)).unwrap();
        assert_eq!(e.lookup(sym("geo.Pi")).unwrap(), Sexp::Int(3));
        assert!(matches!(
            e.dot_set(sym("geo.secret"), Sexp::Int(2)),
            Err(ZyError::PrivateAccess { .. })
        ));
    }

    #[test]
    fn nested_hash_paths() {
        let mut e = env();
        let mut inner = SexpHash::new();
        inner.set(Sexp::symbol("b"), Sexp::Int(42));
        let mut outer = SexpHash::new();
        outer.set(Sexp::symbol("a"), Sexp::hash(inner));
        e.bind(sym("h"), Sexp::hash(outer)).unwrap();
        assert_eq!(e.lookup(sym("h.a.b")).unwrap(), Sexp::Int(42));
        e.dot_set(sym("h.a.c"), Sexp::Int(7)).unwrap();
        assert_eq!(e.lookup(sym("h.a.c")).unwrap(), Sexp::Int(7));
        assert!(matches!(
            e.lookup(sym("h.a.b.z")),
            Err(ZyError::FieldNotFound(_))
        ));
        assert!(matches!(
            e.lookup(sym("h.zz")),
            Err(ZyError::FieldNotFound(_))
        ));
    }

    #[derive(Default)]
    struct Temp {
        celsius: f64,
    }

    #[test]
    fn bridged_values_read_but_do_not_write() {
        let mut bridge = Bridge::new();
        bridge
            .register(BridgedType::new::<Temp>("Temp").field(
                "C",
                |t: &Temp| Sexp::Float(t.celsius),
                |t: &mut Temp, v| {
                    if let Sexp::Float(f) = v {
                        t.celsius = *f;
                    }
                    Ok(())
                },
            ))
            .unwrap();
        let mut e = Env::new(Catalog::new(), bridge);
        let r = Reflected::new("Temp", Temp { celsius: 21.5 });
        e.bind(sym("t"), Sexp::Reflect(Rc::new(r))).unwrap();
        assert_eq!(e.lookup(sym("t.C")).unwrap(), Sexp::Float(21.5));
        assert!(matches!(
            e.lookup(sym("t.F")),
            Err(ZyError::NoSuchField { .. })
        ));
        assert!(matches!(
            e.dot_set(sym("t.C"), Sexp::Float(0.0)),
            Err(ZyError::UnsupportedAssignment(_))
        ));
    }

    #[test]
    fn restore_unwinds_chains_and_scopes() {
        let mut e = env();
        let saved = e.depth();
        e.push_scope(Scope::new("a"));
        e.push_chain(vec![e.global().clone()]);
        e.push_scope(Scope::new("b"));
        e.restore(saved);
        assert_eq!(e.depth(), saved);
        assert!(e.pop_scope().is_err());
        assert!(e.pop_chain().is_err());
    }
}
