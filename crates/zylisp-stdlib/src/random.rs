use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zylisp_core::{check_arity, Catalog, Sexp, ZyError};

use crate::int_arg;

pub fn register(c: &mut Catalog) {
    // (random) is a float in [0, 1); (random n) an integer in [0, n).
    c.register_fn("random", |rt, name, args| match args {
        [] => Ok(Sexp::Float(rt.rng().gen::<f64>())),
        [n] => {
            let n = int_arg(name, n)?;
            if n <= 0 {
                return Err(ZyError::eval(format!("{name}: bound must be positive, got {n}")));
            }
            Ok(Sexp::Int(rt.rng().gen_range(0..n)))
        }
        _ => Err(ZyError::arity(name, "0-1", args.len())),
    });

    c.register_fn("reseed", |rt, name, args| {
        check_arity!(args, name, 1);
        let seed = int_arg(name, &args[0])? as u64;
        *rt.rng() = StdRng::seed_from_u64(seed);
        rt.config_mut().seed = Some(seed);
        tracing::debug!(seed, "random source reseeded");
        Ok(Sexp::Null)
    });
}
