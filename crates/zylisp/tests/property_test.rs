mod common;

use proptest::prelude::*;
use zylisp::{Sexp, SexpHash, ZyError};

fn number() -> impl Strategy<Value = Sexp> {
    prop_oneof![
        any::<i32>().prop_map(|n| Sexp::Int(i64::from(n))),
        (-1.0e6f64..1.0e6).prop_map(Sexp::Float),
    ]
}

fn any_value() -> impl Strategy<Value = Sexp> {
    prop_oneof![
        number(),
        Just(Sexp::Null),
        Just(Sexp::Float(f64::NAN)),
        "[a-z]{0,8}".prop_map(|s| Sexp::string(&s)),
        "[a-z]{1,8}".prop_map(|s| Sexp::symbol(&s)),
        prop::collection::vec(any::<i32>(), 0..4)
            .prop_map(|xs| Sexp::array(xs.into_iter().map(|n| Sexp::Int(i64::from(n))).collect())),
        Just(Sexp::hash(SexpHash::new())),
    ]
}

proptest! {
    #[test]
    fn addition_commutes_and_promotes(a in number(), b in number()) {
        let mut interp = common::interp();
        let ab = interp.call("+", &[a.clone(), b.clone()]).unwrap();
        let ba = interp.call("+", &[b.clone(), a.clone()]).unwrap();
        prop_assert_eq!(&ab, &ba);
        let any_float = matches!(a, Sexp::Float(_)) || matches!(b, Sexp::Float(_));
        prop_assert_eq!(matches!(ab, Sexp::Float(_)), any_float);
    }

    #[test]
    fn nan_only_satisfies_not_equal(x in any_value()) {
        let mut interp = common::interp();
        let nan = Sexp::Float(f64::NAN);
        for op in ["<", "<=", "==", ">", ">="] {
            let got = interp.call(op, &[x.clone(), nan.clone()]).unwrap();
            prop_assert_eq!(got, Sexp::Bool(false), "{} {}", op, x);
            let got = interp.call(op, &[nan.clone(), x.clone()]).unwrap();
            prop_assert_eq!(got, Sexp::Bool(false), "{} {}", op, x);
        }
        let ne = interp.call("!=", &[x.clone(), nan.clone()]).unwrap();
        prop_assert_eq!(ne, Sexp::Bool(true));
        let ne = interp.call("!=", &[nan, x]).unwrap();
        prop_assert_eq!(ne, Sexp::Bool(true));
    }

    #[test]
    fn hash_keys_appear_once_in_first_insertion_order(
        ops in prop::collection::vec((0i64..6, any::<i64>()), 1..30)
    ) {
        let mut interp = common::interp();
        let h = interp.eval_str("(hash)").unwrap();
        let mut order: Vec<i64> = Vec::new();
        for (k, v) in &ops {
            interp.call("hset", &[h.clone(), Sexp::Int(*k), Sexp::Int(*v)]).unwrap();
            let got = interp.call("hget", &[h.clone(), Sexp::Int(*k)]).unwrap();
            prop_assert_eq!(got, Sexp::Int(*v));
            if !order.contains(k) {
                order.push(*k);
            }
        }
        let keys = interp.call("keys", &[h.clone()]).unwrap();
        let expected = Sexp::array(order.into_iter().map(Sexp::Int).collect());
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn array_set_then_get(len in 1usize..20, idx in 0usize..40, v in any::<i64>()) {
        let mut interp = common::interp();
        let arr = interp.call("makeArray", &[Sexp::Int(len as i64), Sexp::Int(0)]).unwrap();
        let set = interp.call("aset", &[arr.clone(), Sexp::Int(idx as i64), Sexp::Int(v)]);
        let get = interp.call("aget", &[arr.clone(), Sexp::Int(idx as i64)]);
        if idx < len {
            prop_assert!(set.is_ok());
            prop_assert_eq!(get.unwrap(), Sexp::Int(v));
        } else {
            let out_of_bounds = |r: &Result<Sexp, ZyError>| {
                matches!(r, Err(ZyError::IndexOutOfBounds { .. }))
            };
            prop_assert!(out_of_bounds(&set));
            prop_assert!(out_of_bounds(&get));
            let fallback = interp
                .call("aget", &[arr, Sexp::Int(idx as i64), Sexp::Int(-1)])
                .unwrap();
            prop_assert_eq!(fallback, Sexp::Int(-1));
        }
    }

    #[test]
    fn reader_never_panics(src in "\\PC{0,64}") {
        let _ = zylisp::read_many(&src);
    }
}
