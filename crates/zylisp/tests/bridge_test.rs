use std::rc::Rc;

use zylisp::{BridgedType, Interpreter, Reflected, Sexp, ZyError};

#[derive(Default)]
struct Point {
    x: i64,
    y: i64,
}

fn int_field(v: &Sexp) -> Result<i64, ZyError> {
    match v {
        Sexp::Int(n) => Ok(*n),
        other => Err(ZyError::type_error("int64", other.type_name())),
    }
}

fn point_type() -> BridgedType {
    BridgedType::new::<Point>("Point")
        .field(
            "x",
            |p: &Point| Sexp::Int(p.x),
            |p: &mut Point, v: &Sexp| {
                p.x = int_field(v)?;
                Ok(())
            },
        )
        .field(
            "y",
            |p: &Point| Sexp::Int(p.y),
            |p: &mut Point, v: &Sexp| {
                p.y = int_field(v)?;
                Ok(())
            },
        )
        .method("Shift", |p: &mut Point, args: &[Sexp]| {
            let dx = args.first().map(int_field).transpose()?.unwrap_or(1);
            p.x += dx;
            Ok(Sexp::Int(p.x))
        })
}

fn interp() -> Interpreter {
    Interpreter::builder()
        .bridge_type(point_type())
        .expect("register Point")
        .build()
}

#[test]
fn togo_and_fromgo_marshal_struct_hashes() {
    let mut interp = interp();
    interp
        .eval_str("(def p (togo (struct 'Point 'x 1 'y 2)))")
        .unwrap();
    assert_eq!(interp.eval_str("(type? p)").unwrap(), Sexp::string("Point"));
    assert_eq!(interp.eval_str("p.x").unwrap(), Sexp::Int(1));
    assert_eq!(interp.eval_str("(hget (fromgo p) 'y)").unwrap(), Sexp::Int(2));
    assert_eq!(
        interp.eval_str("(type? (fromgo p))").unwrap(),
        Sexp::string("Point")
    );
}

#[test]
fn rejected_field_write_is_a_type_mismatch() {
    let mut interp = interp();
    let err = interp
        .eval_str("(togo (struct 'Point 'x \"one\"))")
        .unwrap_err();
    assert!(matches!(err.inner(), ZyError::TypeMismatch { .. }), "{err}");
}

#[test]
fn unregistered_struct_name_is_rejected() {
    let mut interp = interp();
    let err = interp.eval_str("(togo (struct 'Nope 'x 1))").unwrap_err();
    assert!(matches!(err.inner(), ZyError::Type { .. }));
}

#[test]
fn unknown_field_is_no_such_field() {
    let mut interp = interp();
    interp.eval_str("(def p (togo (struct 'Point)))").unwrap();
    let err = interp.eval_str("p.z").unwrap_err();
    assert!(matches!(err.inner(), ZyError::NoSuchField { .. }));
}

#[test]
fn assigning_through_a_bridged_value_is_unsupported() {
    let mut interp = interp();
    interp.eval_str("(def p (togo (struct 'Point)))").unwrap();
    let err = interp.eval_str("(= p.x 5)").unwrap_err();
    assert!(matches!(err.inner(), ZyError::UnsupportedAssignment(_)));
}

#[test]
fn deref_set_writes_struct_hash_into_host_value() {
    let mut interp = interp();
    interp
        .eval_str("(def p (togo (struct 'Point 'x 1 'y 1))) (def ptr (& p))")
        .unwrap();
    interp
        .eval_str("(derefSet ptr (struct 'Point 'x 10 'y 20))")
        .unwrap();
    assert_eq!(interp.eval_str("p.x").unwrap(), Sexp::Int(10));
    assert_eq!(interp.eval_str("p.y").unwrap(), Sexp::Int(20));

    let err = interp
        .eval_str("(derefSet ptr (struct 'Other 'x 1))")
        .unwrap_err();
    assert!(matches!(err.inner(), ZyError::TypeMismatch { .. }));
}

#[test]
fn host_values_are_visible_to_the_host() {
    let mut interp = interp();
    let v = interp.eval_str("(togo (struct 'Point 'x 3 'y 4))").unwrap();
    let Sexp::Reflect(r) = v else {
        panic!("expected a bridged value");
    };
    assert_eq!(r.with_ref(|p: &Point| p.x * p.x + p.y * p.y), Some(25));

    interp
        .define("origin", Sexp::Reflect(Rc::new(Reflected::new("Point", Point::default()))))
        .unwrap();
    assert_eq!(interp.eval_str("origin.y").unwrap(), Sexp::Int(0));
}

#[test]
fn field_listing_and_type_list() {
    let mut interp = interp();
    assert_eq!(
        interp.eval_str("(fieldls 'Point)").unwrap().to_string(),
        "[\"x\" \"y\"]"
    );
    assert_eq!(
        interp.eval_str("(typelist)").unwrap().to_string(),
        "[\"Point\"]"
    );
}

#[test]
fn duplicate_type_registration_fails() {
    let result = Interpreter::builder()
        .bridge_type(point_type())
        .and_then(|b| b.bridge_type(point_type()));
    assert!(result.is_err());
}

#[test]
fn types_can_be_bridged_after_build() {
    let mut interp = Interpreter::new();
    assert!(interp.eval_str("(togo (struct 'Point 'x 1))").is_err());
    interp.bridge_type(point_type()).unwrap();
    interp.eval_str("(def p (togo (struct 'Point 'x 1)))").unwrap();
    assert_eq!(interp.eval_str("p.x").unwrap(), Sexp::Int(1));
    assert!(interp.bridge_type(point_type()).is_err());
}

#[test]
fn host_methods_are_listed_and_called() {
    let mut interp = interp();
    assert_eq!(
        interp.eval_str("(methodls 'Point)").unwrap().to_string(),
        "[\"Shift\"]"
    );
    interp
        .eval_str("(def p (togo (struct 'Point 'x 1 'y 2)))")
        .unwrap();
    assert_eq!(interp.eval_str("(_method p 'Shift 10)").unwrap(), Sexp::Int(11));
    assert_eq!(interp.eval_str("(_method p 'Shift)").unwrap(), Sexp::Int(12));
    assert_eq!(interp.eval_str("p.x").unwrap(), Sexp::Int(12));
    assert_eq!(
        interp.eval_str("(methodls p)").unwrap().to_string(),
        "[\"Shift\"]"
    );
}

#[test]
fn unknown_method_is_reported() {
    let mut interp = interp();
    interp.eval_str("(def p (togo (struct 'Point)))").unwrap();
    let err = interp.eval_str("(_method p 'Rotate)").unwrap_err();
    assert!(
        matches!(err.inner(), ZyError::NoSuchMethod { method, .. } if method == "Rotate"),
        "{err}"
    );
    let err = interp.eval_str("(_method p 'Shift \"far\")").unwrap_err();
    assert!(matches!(err.inner(), ZyError::Type { .. }), "{err}");
}
