//! Host-type bridge: explicit marshaling tables for host values, plus the
//! pointer type behind `&`, `deref` and `derefSet`.
//!
//! Every bridged host type is registered once with a constructor and one
//! read/write accessor pair per field. Type compatibility is always checked
//! against the registration name, never inferred from the host value.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::env::Scope;
use crate::error::ZyError;
use crate::hash::{HashKind, SexpHash};
use crate::symbol::Symbol;
use crate::value::Sexp;

/// A host value wrapped for the runtime.
pub struct Reflected {
    type_name: String,
    data: RefCell<Box<dyn Any>>,
}

impl Reflected {
    pub fn new<T: Any>(type_name: impl Into<String>, value: T) -> Self {
        Reflected {
            type_name: type_name.into(),
            data: RefCell::new(Box::new(value)),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrow the host value as `T`. `None` when it holds another type.
    pub fn with_ref<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let data = self.data.borrow();
        data.downcast_ref::<T>().map(f)
    }
}

impl fmt::Debug for Reflected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<reflect {}>", self.type_name)
    }
}

type FieldGetter = Box<dyn Fn(&dyn Any) -> Option<Sexp>>;
type FieldSetter = Box<dyn Fn(&mut dyn Any, &Sexp) -> Option<Result<(), ZyError>>>;

struct BridgedField {
    name: String,
    get: FieldGetter,
    set: FieldSetter,
}

type MethodFn = Box<dyn Fn(&mut dyn Any, &[Sexp]) -> Option<Result<Sexp, ZyError>>>;

struct BridgedMethod {
    name: String,
    call: MethodFn,
}

/// Registration for one host type.
pub struct BridgedType {
    name: String,
    construct: Box<dyn Fn() -> Box<dyn Any>>,
    fields: Vec<BridgedField>,
    methods: Vec<BridgedMethod>,
}

impl BridgedType {
    pub fn new<T: Any + Default>(name: impl Into<String>) -> Self {
        BridgedType {
            name: name.into(),
            construct: Box::new(|| Box::new(T::default())),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a field accessor pair. The setter rejects values it cannot store.
    pub fn field<T: Any>(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> Sexp + 'static,
        set: impl Fn(&mut T, &Sexp) -> Result<(), ZyError> + 'static,
    ) -> Self {
        self.fields.push(BridgedField {
            name: name.into(),
            get: Box::new(move |any: &dyn Any| any.downcast_ref::<T>().map(&get)),
            set: Box::new(move |any: &mut dyn Any, v: &Sexp| {
                any.downcast_mut::<T>().map(|t| set(t, v))
            }),
        });
        self
    }

    /// Add a method callable from scripts with `_method`.
    pub fn method<T: Any>(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut T, &[Sexp]) -> Result<Sexp, ZyError> + 'static,
    ) -> Self {
        self.methods.push(BridgedMethod {
            name: name.into(),
            call: Box::new(move |any: &mut dyn Any, args: &[Sexp]| {
                any.downcast_mut::<T>().map(|t| f(t, args))
            }),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name.clone()).collect()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn instantiate(&self) -> Reflected {
        Reflected {
            type_name: self.name.clone(),
            data: RefCell::new((self.construct)()),
        }
    }

    fn find(&self, field: &str) -> Option<&BridgedField> {
        self.fields.iter().find(|f| f.name == field)
    }
}

impl fmt::Debug for BridgedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgedType")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Registry of bridged host types.
#[derive(Debug, Default, Clone)]
pub struct Bridge {
    types: HashMap<String, Rc<BridgedType>>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ty: BridgedType) -> Result<(), ZyError> {
        if self.types.contains_key(&ty.name) {
            return Err(ZyError::eval(format!(
                "bridged type `{}` already registered",
                ty.name
            )));
        }
        tracing::debug!(name = %ty.name, "bridged type registered");
        self.types.insert(ty.name.clone(), Rc::new(ty));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&BridgedType> {
        self.types.get(name).map(|t| t.as_ref())
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    fn type_of(&self, r: &Reflected, field: &str) -> Result<&BridgedType, ZyError> {
        self.lookup(&r.type_name).ok_or_else(|| ZyError::NoSuchField {
            type_name: r.type_name.clone(),
            field: field.to_string(),
        })
    }

    /// Read a field of a bridged value by name.
    pub fn get_field(&self, r: &Reflected, field: &str) -> Result<Sexp, ZyError> {
        let no_such = || ZyError::NoSuchField {
            type_name: r.type_name.clone(),
            field: field.to_string(),
        };
        let ty = self.type_of(r, field)?;
        let accessor = ty.find(field).ok_or_else(no_such)?;
        let data = r.data.borrow();
        (accessor.get)(&**data).ok_or_else(no_such)
    }

    /// Write a field of a bridged value by name.
    pub fn set_field(&self, r: &Reflected, field: &str, value: &Sexp) -> Result<(), ZyError> {
        let no_such = || ZyError::NoSuchField {
            type_name: r.type_name.clone(),
            field: field.to_string(),
        };
        let ty = self.type_of(r, field)?;
        let accessor = ty.find(field).ok_or_else(no_such)?;
        let mut data = r.data.borrow_mut();
        (accessor.set)(&mut **data, value).ok_or_else(no_such)?
    }

    pub fn field_names(&self, r: &Reflected) -> Result<Vec<String>, ZyError> {
        self.lookup(&r.type_name)
            .map(|t| t.field_names())
            .ok_or_else(|| ZyError::type_error("registered bridged type", r.type_name.clone()))
    }

    pub fn method_names(&self, r: &Reflected) -> Result<Vec<String>, ZyError> {
        self.lookup(&r.type_name)
            .map(|t| t.method_names())
            .ok_or_else(|| ZyError::type_error("registered bridged type", r.type_name.clone()))
    }

    /// Invoke a registered method on a bridged value. The value stays
    /// mutably borrowed for the duration of the call.
    pub fn call_method(&self, r: &Reflected, method: &str, args: &[Sexp]) -> Result<Sexp, ZyError> {
        let no_such = || ZyError::NoSuchMethod {
            type_name: r.type_name.clone(),
            method: method.to_string(),
        };
        let ty = self.lookup(&r.type_name).ok_or_else(no_such)?;
        let m = ty.methods.iter().find(|m| m.name == method).ok_or_else(no_such)?;
        let mut data = r.data.try_borrow_mut().map_err(|_| {
            ZyError::eval(format!("{}.{method}: value is already in use", r.type_name))
        })?;
        (m.call)(&mut **data, args).ok_or_else(no_such)?
    }

    /// Marshal a bridged value into a `struct` hash named after its type.
    pub fn to_hash(&self, r: &Reflected) -> Result<SexpHash, ZyError> {
        let mut h = SexpHash::with_kind(HashKind::Struct, r.type_name.clone());
        for name in self.field_names(r)? {
            let v = self.get_field(r, &name)?;
            h.set(Sexp::symbol(&name), v);
        }
        Ok(h)
    }

    /// Build a new bridged value from a `struct` hash whose type name is registered.
    pub fn from_hash(&self, h: &SexpHash) -> Result<Reflected, ZyError> {
        let ty = self
            .lookup(h.type_name())
            .ok_or_else(|| ZyError::type_error("registered bridged type", h.type_name()))?;
        let r = ty.instantiate();
        self.write_fields(&r, h)?;
        Ok(r)
    }

    /// Overwrite a bridged value's fields from a hash of the same type name.
    pub fn assign_from_hash(&self, r: &Reflected, h: &SexpHash) -> Result<(), ZyError> {
        if h.type_name() != r.type_name {
            return Err(ZyError::TypeMismatch {
                expected: r.type_name.clone(),
                got: h.type_name().to_string(),
            });
        }
        self.write_fields(r, h)
    }

    fn write_fields(&self, r: &Reflected, h: &SexpHash) -> Result<(), ZyError> {
        for (k, v) in h.iter() {
            let name = match k {
                Sexp::Symbol(s) => s.name(),
                Sexp::Str(s) => s.text.clone(),
                other => return Err(ZyError::type_error("symbol field name", other.type_name())),
            };
            self.set_field(r, &name, v).map_err(|e| match e {
                ZyError::Type { got, .. } => ZyError::TypeMismatch {
                    expected: format!("{}.{}", r.type_name, name),
                    got,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Where a pointer's value lives.
#[derive(Debug)]
enum PointerTarget {
    /// A variable binding in a scope frame.
    Binding { scope: Scope, sym: Symbol },
    /// A free-standing cell holding a value.
    Cell(RefCell<Sexp>),
}

/// A reference to a value's storage, created by address-of.
#[derive(Debug)]
pub struct Pointer {
    target: PointerTarget,
    pointed_to: String,
}

impl Pointer {
    pub fn to_binding(scope: Scope, sym: Symbol) -> Result<Self, ZyError> {
        let current = scope
            .get(sym)
            .ok_or_else(|| ZyError::SymbolNotFound(sym.name()))?;
        Ok(Pointer {
            pointed_to: current.type_name(),
            target: PointerTarget::Binding { scope, sym },
        })
    }

    pub fn to_value(value: Sexp) -> Self {
        Pointer {
            pointed_to: value.type_name(),
            target: PointerTarget::Cell(RefCell::new(value)),
        }
    }

    /// Declared type of the storage this pointer was made for.
    pub fn pointed_to(&self) -> &str {
        &self.pointed_to
    }

    pub fn get(&self) -> Sexp {
        match &self.target {
            PointerTarget::Binding { scope, sym } => scope.get(*sym).unwrap_or(Sexp::Null),
            PointerTarget::Cell(c) => c.borrow().clone(),
        }
    }

    fn store(&self, value: Sexp) {
        match &self.target {
            PointerTarget::Binding { scope, sym } => scope.set(*sym, value),
            PointerTarget::Cell(c) => *c.borrow_mut() = value,
        }
    }

    /// Write `value` through the pointer. Struct and field hashes are typed
    /// by name; everything else must have the pointer's declared type.
    pub fn set(&self, value: Sexp, bridge: &Bridge) -> Result<(), ZyError> {
        let mismatch = |got: String| ZyError::TypeMismatch {
            expected: self.pointed_to.clone(),
            got,
        };
        match (self.get(), &value) {
            (Sexp::Hash(dst), Sexp::Hash(src)) => {
                if Rc::ptr_eq(&dst, src) {
                    return Ok(());
                }
                let src = src.borrow().clone();
                let nominal = dst.borrow().kind().is_nominal() || src.kind().is_nominal();
                if nominal && dst.borrow().type_name() != src.type_name() {
                    return Err(mismatch(src.type_name().to_string()));
                }
                dst.borrow_mut().clone_from_hash(&src);
                Ok(())
            }
            (Sexp::Reflect(dst), Sexp::Hash(src)) => bridge.assign_from_hash(&dst, &src.borrow()),
            (Sexp::Reflect(dst), Sexp::Reflect(src)) => {
                if dst.type_name() != src.type_name() {
                    return Err(mismatch(src.type_name().to_string()));
                }
                self.store(value);
                Ok(())
            }
            _ => {
                let got = value.type_name();
                let both_arrays = got.starts_with("[]") && self.pointed_to.starts_with("[]");
                if got != self.pointed_to && !both_arrays {
                    return Err(mismatch(got));
                }
                self.store(value);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Point {
        x: i64,
        y: i64,
    }

    fn int_field(v: &Sexp) -> Result<i64, ZyError> {
        v.as_int()
            .ok_or_else(|| ZyError::type_error("int64", v.type_name()))
    }

    fn point_type() -> BridgedType {
        BridgedType::new::<Point>("Point")
            .field("X", |p: &Point| Sexp::Int(p.x), |p: &mut Point, v| {
                p.x = int_field(v)?;
                Ok(())
            })
            .field("Y", |p: &Point| Sexp::Int(p.y), |p: &mut Point, v| {
                p.y = int_field(v)?;
                Ok(())
            })
            .method("Scale", |p: &mut Point, args: &[Sexp]| {
                let k = args.first().map(int_field).transpose()?.unwrap_or(2);
                p.x *= k;
                p.y *= k;
                Ok(Sexp::Null)
            })
    }

    fn bridge() -> Bridge {
        let mut b = Bridge::new();
        b.register(point_type()).unwrap();
        b
    }

    #[test]
    fn methods_mutate_the_host_value() {
        let b = bridge();
        let r = Reflected::new("Point", Point { x: 3, y: 4 });
        assert_eq!(b.method_names(&r).unwrap(), vec!["Scale".to_string()]);
        b.call_method(&r, "Scale", &[Sexp::Int(10)]).unwrap();
        assert_eq!(b.get_field(&r, "X").unwrap(), Sexp::Int(30));
        assert!(matches!(
            b.call_method(&r, "Nope", &[]),
            Err(ZyError::NoSuchMethod { .. })
        ));
    }

    #[test]
    fn field_read_and_missing_field() {
        let b = bridge();
        let r = Reflected::new("Point", Point { x: 3, y: 4 });
        assert_eq!(b.get_field(&r, "Y").unwrap(), Sexp::Int(4));
        assert!(matches!(
            b.get_field(&r, "Z"),
            Err(ZyError::NoSuchField { .. })
        ));
        let unregistered = Reflected::new("Opaque", 7u8);
        assert!(matches!(
            b.get_field(&unregistered, "X"),
            Err(ZyError::NoSuchField { .. })
        ));
    }

    #[test]
    fn hash_round_trip_through_bridge() {
        let b = bridge();
        let r = Reflected::new("Point", Point { x: 1, y: 2 });
        let h = b.to_hash(&r).unwrap();
        assert_eq!(h.type_name(), "Point");
        assert_eq!(h.kind(), HashKind::Struct);
        let back = b.from_hash(&h).unwrap();
        assert_eq!(back.with_ref(|p: &Point| (p.x, p.y)), Some((1, 2)));
    }

    #[test]
    fn assign_requires_same_name() {
        let b = bridge();
        let r = Reflected::new("Point", Point::default());
        let mut other = SexpHash::with_kind(HashKind::Struct, "Vec2");
        other.set(Sexp::symbol("X"), Sexp::Int(1));
        assert!(matches!(
            b.assign_from_hash(&r, &other),
            Err(ZyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn rejected_field_write_is_type_mismatch() {
        let b = bridge();
        let mut h = SexpHash::with_kind(HashKind::Struct, "Point");
        h.set(Sexp::symbol("X"), Sexp::string("nope"));
        assert!(matches!(
            b.from_hash(&h),
            Err(ZyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn cell_pointer_checks_type() {
        let b = Bridge::new();
        let p = Pointer::to_value(Sexp::Int(1));
        assert_eq!(p.pointed_to(), "int64");
        p.set(Sexp::Int(5), &b).unwrap();
        assert_eq!(p.get(), Sexp::Int(5));
        assert!(matches!(
            p.set(Sexp::string("x"), &b),
            Err(ZyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn struct_hash_pointer_is_nominal() {
        let b = Bridge::new();
        let mut a = SexpHash::with_kind(HashKind::Struct, "A");
        a.set(Sexp::symbol("v"), Sexp::Int(1));
        let target = Sexp::hash(a);
        let p = Pointer::to_value(target.clone());

        let mut same = SexpHash::with_kind(HashKind::Struct, "A");
        same.set(Sexp::symbol("v"), Sexp::Int(2));
        p.set(Sexp::hash(same), &b).unwrap();
        match &target {
            Sexp::Hash(h) => assert_eq!(h.borrow().get_field("v"), Some(Sexp::Int(2))),
            _ => unreachable!(),
        }

        let other = SexpHash::with_kind(HashKind::Struct, "B");
        assert!(matches!(
            p.set(Sexp::hash(other), &b),
            Err(ZyError::TypeMismatch { .. })
        ));
    }
}
