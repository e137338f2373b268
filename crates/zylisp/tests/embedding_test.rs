mod common;

use zylisp::{Interpreter, Runtime, Sexp, ZyError};

#[test]
fn host_functions_are_callable_from_source() {
    let mut interp = Interpreter::builder()
        .register_fn("square", |args: &[Sexp]| match args {
            [Sexp::Int(n)] => Ok(Sexp::Int(n * n)),
            [other] => Err(ZyError::type_error("int64", other.type_name())),
            _ => Err(ZyError::arity("square", "1", args.len())),
        })
        .build();
    assert_eq!(interp.eval_str("(square 12)").unwrap(), Sexp::Int(144));
    let err = interp.eval_str("(square \"x\")").unwrap_err();
    assert!(matches!(err.inner(), ZyError::Type { .. }));
}

#[test]
fn runtime_functions_can_call_back() {
    let mut interp = Interpreter::builder()
        .register_runtime_fn("twice", |rt: &mut dyn Runtime, args: &[Sexp]| {
            let once = rt.apply(&args[0], &args[1..])?;
            rt.apply(&args[0], &[once])
        })
        .build();
    assert_eq!(
        interp.eval_str("(twice (fn [x] (* x 3)) 2)").unwrap(),
        Sexp::Int(18)
    );
}

#[test]
#[should_panic(expected = "duplicate function name")]
fn shadowing_a_builtin_at_build_panics() {
    Interpreter::builder()
        .register_fn("car", |_args: &[Sexp]| Ok(Sexp::Null))
        .build();
}

#[test]
fn late_registration_rejects_duplicates() {
    let mut interp = common::interp();
    interp
        .register_fn("host-answer", |_args: &[Sexp]| Ok(Sexp::Int(42)))
        .unwrap();
    assert_eq!(interp.eval_str("(host-answer)").unwrap(), Sexp::Int(42));
    assert!(interp
        .register_fn("host-answer", |_args: &[Sexp]| Ok(Sexp::Null))
        .is_err());
}

#[test]
fn host_can_define_get_and_call() {
    let mut interp = common::interp();
    interp.define("limit", Sexp::Int(3)).unwrap();
    interp.eval_str("(defn under [n] (< n limit))").unwrap();
    assert_eq!(interp.call("under", &[Sexp::Int(2)]).unwrap(), Sexp::Bool(true));
    assert_eq!(interp.call("+", &[Sexp::Int(2), Sexp::Int(5)]).unwrap(), Sexp::Int(7));
    assert_eq!(interp.get("limit").unwrap(), Sexp::Int(3));
    assert!(matches!(
        interp.get("missing").unwrap_err(),
        ZyError::SymbolNotFound(_)
    ));
}

#[test]
fn parsed_expressions_evaluate_directly() {
    let mut interp = common::interp();
    let expr = zylisp::read("(* 2 21)").unwrap();
    assert_eq!(interp.eval(&expr).unwrap(), Sexp::Int(42));
    let built = Sexp::list(vec![Sexp::symbol("-"), Sexp::Int(10), Sexp::Int(4)]);
    assert_eq!(interp.eval(&built).unwrap(), Sexp::Int(6));
}

#[test]
fn load_compiles_without_running() {
    let mut interp = common::interp();
    interp.load_str("(def loaded 1) (+ loaded 1)").unwrap();
    assert!(interp.get("loaded").is_err());
    assert_eq!(interp.run().unwrap(), Sexp::Int(2));
    let listing = interp.dump_function(None).unwrap();
    assert!(listing.starts_with("== __main =="));
}

#[test]
fn dump_shows_compiled_functions_and_scopes() {
    let mut interp = common::interp();
    interp.eval_str("(defn sq [x] (* x x)) (def kept 5)").unwrap();
    let listing = interp.dump_function(Some("sq")).unwrap();
    assert!(listing.starts_with("== sq == [x]"), "{listing}");
    assert!(interp.dump_environment().contains("kept = 5"));
}

#[test]
fn reset_keeps_bindings_and_clear_drops_them() {
    let mut interp = common::interp();
    interp.eval_str("(def keep 1)").unwrap();
    assert!(interp.eval_str("(defn f [] (g)) (f)").is_err());
    interp.reset();
    assert_eq!(interp.stack_depth(), 0);
    assert_eq!(interp.eval_str("keep").unwrap(), Sexp::Int(1));
    interp.clear();
    assert!(interp.eval_str("keep").is_err());
}

#[test]
fn toggles_update_config() {
    let mut interp = common::interp();
    interp.set_verbose(true);
    interp.set_debug(true);
    assert!(interp.config().verbose);
    assert!(interp.config().debug_exec);
    assert_eq!(interp.eval_str("(+ 1 1)").unwrap(), Sexp::Int(2));
}

#[test]
fn sandboxed_catalog_is_smaller() {
    let full = common::interp().function_names();
    let safe = common::sandboxed().function_names();
    assert!(safe.len() < full.len());
    assert!(safe.iter().all(|name| full.contains(name)));
    assert!(!safe.contains(&"sys".to_string()));
}

#[test]
fn call_depth_is_bounded() {
    let mut interp = Interpreter::builder().max_call_depth(64).build();
    let err = interp
        .eval_str("(defn down [n] (down (+ n 1))) (down 0)")
        .unwrap_err();
    assert!(err.to_string().contains("maximum call depth"), "{err}");
}

#[test]
fn pretty_flag_changes_result_rendering() {
    let mut interp = common::interp();
    let src = "(def wide (hash 'first (makeArray 12 \"padding\") 'second 2)) wide";
    let value = interp.eval_str(src).unwrap();
    assert!(!interp.render(&value).contains('\n'));
    interp.eval_str("(pretty true)").unwrap();
    let text = interp.render(&value);
    assert!(text.starts_with("(hash\n  first ["), "{text}");
    assert!(text.ends_with("\n  second 2)"), "{text}");
}
