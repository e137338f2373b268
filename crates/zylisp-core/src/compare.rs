use std::cmp::Ordering;

use crate::error::ZyError;
use crate::value::Sexp;

/// Comparison code: exactly one operand was NaN.
pub const ONE_NAN: i32 = 2;
/// Comparison code: both operands were NaN.
pub const BOTH_NAN: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            _ => return None,
        })
    }

    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Apply this operator to a comparison code. Any NaN makes `!=` true
    /// and every other operator false.
    pub fn holds(self, code: i32) -> bool {
        if code > 1 {
            return self == CompareOp::Ne;
        }
        match self {
            CompareOp::Lt => code < 0,
            CompareOp::Le => code <= 0,
            CompareOp::Eq => code == 0,
            CompareOp::Ne => code != 0,
            CompareOp::Gt => code > 0,
            CompareOp::Ge => code >= 0,
        }
    }
}

fn ord_code(o: Ordering) -> i32 {
    match o {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

fn float_code(a: f64, b: f64) -> i32 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => BOTH_NAN,
        (true, false) | (false, true) => ONE_NAN,
        // neither side is NaN, so partial_cmp is total here
        _ => a.partial_cmp(&b).map(ord_code).unwrap_or(ONE_NAN),
    }
}

fn seq_code(a: &[Sexp], b: &[Sexp]) -> Result<i32, ZyError> {
    for (x, y) in a.iter().zip(b) {
        let c = compare(x, y)?;
        if c != 0 {
            return Ok(c);
        }
    }
    Ok(ord_code(a.len().cmp(&b.len())))
}

fn is_nan(v: &Sexp) -> bool {
    matches!(v, Sexp::Float(f) if f.is_nan())
}

/// Three-way comparison returning -1, 0 or 1, or [`ONE_NAN`] / [`BOTH_NAN`]
/// when NaN is involved. Mixed Int/Float compares as Float.
pub fn compare(a: &Sexp, b: &Sexp) -> Result<i32, ZyError> {
    use Sexp::*;
    // NaN decides the result before any other rule, whatever the other operand is.
    match (is_nan(a), is_nan(b)) {
        (true, true) => return Ok(BOTH_NAN),
        (true, false) | (false, true) => return Ok(ONE_NAN),
        _ => {}
    }
    let code = match (a, b) {
        (Int(x), Int(y)) => ord_code(x.cmp(y)),
        (Uint64(x), Uint64(y)) => ord_code(x.cmp(y)),
        (Int(x), Uint64(y)) => ord_code(i128::from(*x).cmp(&i128::from(*y))),
        (Uint64(x), Int(y)) => ord_code(i128::from(*x).cmp(&i128::from(*y))),
        (Float(x), Float(y)) => float_code(*x, *y),
        (Int(x), Float(y)) => float_code(*x as f64, *y),
        (Float(x), Int(y)) => float_code(*x, *y as f64),
        (Uint64(x), Float(y)) => float_code(*x as f64, *y),
        (Float(x), Uint64(y)) => float_code(*x, *y as f64),
        (Char(x), Char(y)) => ord_code(x.cmp(y)),
        (Char(x), Int(y)) => ord_code(i64::from(u32::from(*x)).cmp(y)),
        (Int(x), Char(y)) => ord_code(x.cmp(&i64::from(u32::from(*y)))),
        (Bool(x), Bool(y)) => ord_code(x.cmp(y)),
        (Str(x), Str(y)) => ord_code(x.text.cmp(&y.text)),
        (Symbol(x), Symbol(y)) => {
            if x == y {
                0
            } else {
                ord_code(x.with_name(|xn| y.with_name(|yn| xn.cmp(yn))))
            }
        }
        (Null, Null) | (End, End) => 0,
        (Null, _) => -1,
        (_, Null) => 1,
        (Time(x), Time(y)) => ord_code(x.cmp(y)),
        (Array(x), Array(y)) => {
            let xs = x.borrow().items.clone();
            let ys = y.borrow().items.clone();
            seq_code(&xs, &ys)?
        }
        (Pair(_), Pair(_)) => seq_code(&a.list_to_vec()?, &b.list_to_vec()?)?,
        _ if a == b => 0,
        _ => {
            return Err(ZyError::type_error(
                format!("values comparable with {}", a.type_name()),
                b.type_name(),
            ))
        }
    };
    Ok(code)
}

/// Evaluate `a op b`. Values without an ordering still support `==` and
/// `!=`, by structural equality.
pub fn compare_with(op: CompareOp, a: &Sexp, b: &Sexp) -> Result<bool, ZyError> {
    match compare(a, b) {
        Ok(code) => Ok(op.holds(code)),
        Err(_) if op.is_equality() => Ok((a == b) == (op == CompareOp::Eq)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::SexpHash;
    use proptest::prelude::*;

    const ALL: [CompareOp; 6] = [
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Gt,
        CompareOp::Ge,
    ];

    #[test]
    fn nan_codes() {
        let nan = Sexp::Float(f64::NAN);
        assert_eq!(compare(&nan, &Sexp::Int(1)).unwrap(), ONE_NAN);
        assert_eq!(compare(&Sexp::Float(0.5), &nan).unwrap(), ONE_NAN);
        assert_eq!(compare(&nan, &nan).unwrap(), BOTH_NAN);
    }

    #[test]
    fn nan_wins_over_every_other_rule() {
        let nan = Sexp::Float(f64::NAN);
        for v in [
            Sexp::Null,
            Sexp::string("a"),
            Sexp::symbol("s"),
            Sexp::hash(SexpHash::new()),
            Sexp::array(vec![Sexp::Int(1)]),
        ] {
            for op in ALL {
                let want = op == CompareOp::Ne;
                assert_eq!(compare_with(op, &v, &nan).unwrap(), want, "{v} {op:?}");
                assert_eq!(compare_with(op, &nan, &v).unwrap(), want, "{v} {op:?}");
            }
        }
    }

    #[test]
    fn mixed_numeric() {
        assert_eq!(compare(&Sexp::Int(2), &Sexp::Float(2.5)).unwrap(), -1);
        assert_eq!(compare(&Sexp::Float(2.0), &Sexp::Int(2)).unwrap(), 0);
        assert_eq!(compare(&Sexp::Uint64(u64::MAX), &Sexp::Int(-1)).unwrap(), 1);
    }

    #[test]
    fn null_orders_first() {
        assert_eq!(compare(&Sexp::Null, &Sexp::Int(0)).unwrap(), -1);
        assert_eq!(compare(&Sexp::string("a"), &Sexp::Null).unwrap(), 1);
    }

    #[test]
    fn sequences_compare_elementwise() {
        let a = Sexp::array(vec![Sexp::Int(1), Sexp::Int(2)]);
        let b = Sexp::array(vec![Sexp::Int(1), Sexp::Int(3)]);
        let c = Sexp::array(vec![Sexp::Int(1)]);
        assert_eq!(compare(&a, &b).unwrap(), -1);
        assert_eq!(compare(&c, &a).unwrap(), -1);
        let l = Sexp::list(vec![Sexp::Int(1), Sexp::Int(2)]);
        assert_eq!(compare(&l, &l.clone()).unwrap(), 0);
    }

    #[test]
    fn unordered_values_support_equality_only() {
        let h1 = Sexp::hash(SexpHash::new());
        let h2 = Sexp::hash(SexpHash::new());
        assert!(compare_with(CompareOp::Eq, &h1, &h2).unwrap());
        let s = Sexp::string("x");
        assert!(compare_with(CompareOp::Ne, &s, &Sexp::Int(1)).unwrap());
        assert!(compare_with(CompareOp::Lt, &s, &Sexp::Int(1)).is_err());
    }

    proptest! {
        #[test]
        fn nan_policy_for_any_number(x in any::<f64>(), i in any::<i64>()) {
            let nan = Sexp::Float(f64::NAN);
            for v in [Sexp::Float(x), Sexp::Int(i), nan.clone()] {
                for op in ALL {
                    let want = op == CompareOp::Ne;
                    prop_assert_eq!(compare_with(op, &v, &nan).unwrap(), want);
                    prop_assert_eq!(compare_with(op, &nan, &v).unwrap(), want);
                }
            }
        }
    }
}
