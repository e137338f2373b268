use std::rc::Rc;

use hashbrown::HashMap;
use lasso::Spur;

use crate::error::ZyError;
use crate::function::{Function, NativeFn, NativeFnInner};
use crate::runtime::Runtime;
use crate::symbol::{resolve, Symbol};
use crate::value::Sexp;

/// Process-wide table of native functions, keyed by name.
///
/// Names are unique: inserting a name twice is a configuration bug and
/// panics, so it surfaces at startup rather than at call time.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    functions: HashMap<Spur, Sexp>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_insert(&mut self, f: Function) -> Result<(), ZyError> {
        let sym = Symbol::new(&f.name);
        if self.functions.contains_key(&sym.id()) {
            return Err(ZyError::eval(format!(
                "duplicate function name `{}` in catalog",
                f.name
            )));
        }
        self.functions
            .insert(sym.id(), Sexp::Function(Rc::new(f)));
        Ok(())
    }

    pub fn insert(&mut self, f: Function) {
        if let Err(e) = self.try_insert(f) {
            panic!("{e}");
        }
    }

    pub fn register_fn(
        &mut self,
        name: &str,
        f: impl Fn(&mut dyn Runtime, &str, &[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) {
        self.insert(Function::native(NativeFn::new(name, f)));
    }

    pub fn register_builder(
        &mut self,
        name: &str,
        f: impl Fn(&mut dyn Runtime, &str, &[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) {
        self.insert(Function::builder(NativeFn::new(name, f)));
    }

    /// Register one implementation under several names; it branches on the
    /// name it is invoked under.
    pub fn register_many(
        &mut self,
        names: &[&str],
        f: impl Fn(&mut dyn Runtime, &str, &[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) {
        let shared: Rc<NativeFnInner> = Rc::new(f);
        for name in names {
            self.insert(Function::native(NativeFn {
                name: (*name).to_string(),
                func: shared.clone(),
            }));
        }
    }

    /// Fold another catalog into this one. Panics on a duplicate name.
    pub fn merge(&mut self, other: Catalog) {
        for (id, f) in other.functions {
            if self.functions.contains_key(&id) {
                panic!("duplicate function name `{}` in catalog", resolve(id));
            }
            self.functions.insert(id, f);
        }
    }

    pub fn get(&self, sym: Symbol) -> Option<&Sexp> {
        self.functions.get(&sym.id())
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.functions.contains_key(&sym.id())
    }

    pub fn is_builder(&self, sym: Symbol) -> bool {
        matches!(self.get(sym), Some(Sexp::Function(f)) if f.is_builder())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().map(|id| resolve(*id)).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
