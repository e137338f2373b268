use crate::error::ZyError;
use crate::value::Sexp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl NumericOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "+" => NumericOp::Add,
            "-" => NumericOp::Sub,
            "*" => NumericOp::Mul,
            "/" => NumericOp::Div,
            "**" => NumericOp::Pow,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerOp {
    Mod,
    Sll,
    Sra,
    Srl,
    BitAnd,
    BitOr,
    BitXor,
}

impl IntegerOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "mod" => IntegerOp::Mod,
            "sll" => IntegerOp::Sll,
            "sra" => IntegerOp::Sra,
            "srl" => IntegerOp::Srl,
            "bitAnd" => IntegerOp::BitAnd,
            "bitOr" => IntegerOp::BitOr,
            "bitXor" => IntegerOp::BitXor,
            _ => return None,
        })
    }
}

fn not_a_number(v: &Sexp) -> ZyError {
    ZyError::type_error("number", v.type_name())
}

fn float_op(op: NumericOp, a: f64, b: f64) -> f64 {
    match op {
        NumericOp::Add => a + b,
        NumericOp::Sub => a - b,
        NumericOp::Mul => a * b,
        NumericOp::Div => a / b,
        NumericOp::Pow => a.powf(b),
    }
}

fn int_op(op: NumericOp, a: i64, b: i64) -> Result<Sexp, ZyError> {
    Ok(match op {
        NumericOp::Add => Sexp::Int(a.wrapping_add(b)),
        NumericOp::Sub => Sexp::Int(a.wrapping_sub(b)),
        NumericOp::Mul => Sexp::Int(a.wrapping_mul(b)),
        NumericOp::Div => {
            if b == 0 {
                return Err(ZyError::eval("division by zero"));
            }
            Sexp::Int(a.wrapping_div(b))
        }
        NumericOp::Pow => match u32::try_from(b) {
            Ok(e) => Sexp::Int(a.wrapping_pow(e)),
            Err(_) => Sexp::Float((a as f64).powf(b as f64)),
        },
    })
}

fn uint_op(op: NumericOp, a: u64, b: u64) -> Result<Sexp, ZyError> {
    Ok(match op {
        NumericOp::Add => Sexp::Uint64(a.wrapping_add(b)),
        NumericOp::Sub => Sexp::Uint64(a.wrapping_sub(b)),
        NumericOp::Mul => Sexp::Uint64(a.wrapping_mul(b)),
        NumericOp::Div => {
            if b == 0 {
                return Err(ZyError::eval("division by zero"));
            }
            Sexp::Uint64(a / b)
        }
        NumericOp::Pow => Sexp::Uint64(a.wrapping_pow(u32::try_from(b).unwrap_or(u32::MAX))),
    })
}

fn char_offset(op: NumericOp, c: char, n: i64) -> Result<Sexp, ZyError> {
    let code = i64::from(u32::from(c));
    let shifted = match op {
        NumericOp::Add => code.checked_add(n),
        NumericOp::Sub => code.checked_sub(n),
        _ => return Err(ZyError::type_error("number", "char")),
    };
    shifted
        .and_then(|s| u32::try_from(s).ok())
        .and_then(char::from_u32)
        .map(Sexp::Char)
        .ok_or_else(|| ZyError::eval(format!("char arithmetic out of range: {c:?} and {n}")))
}

/// `a op b` with Int/Float promotion: the result is Float iff either side is.
pub fn binary_numeric(op: NumericOp, a: &Sexp, b: &Sexp) -> Result<Sexp, ZyError> {
    use Sexp::*;
    match (a, b) {
        (Int(x), Int(y)) => int_op(op, *x, *y),
        (Float(x), Float(y)) => Ok(Float(float_op(op, *x, *y))),
        (Int(x), Float(y)) => Ok(Float(float_op(op, *x as f64, *y))),
        (Float(x), Int(y)) => Ok(Float(float_op(op, *x, *y as f64))),
        (Uint64(x), Uint64(y)) => uint_op(op, *x, *y),
        (Uint64(x), Int(y)) => uint_op(op, *x, *y as u64),
        (Int(x), Uint64(y)) => uint_op(op, *x as u64, *y),
        (Uint64(x), Float(y)) => Ok(Float(float_op(op, *x as f64, *y))),
        (Float(x), Uint64(y)) => Ok(Float(float_op(op, *x, *y as f64))),
        (Char(c), Int(n)) => char_offset(op, *c, *n),
        (Float(_) | Int(_) | Uint64(_) | Char(_), other) => Err(not_a_number(other)),
        (other, _) => Err(not_a_number(other)),
    }
}

/// Fold `op` left to right over `args`. A lone operand is returned as is,
/// except that `-` negates it.
pub fn numeric_fold(op: NumericOp, name: &str, args: &[Sexp]) -> Result<Sexp, ZyError> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| ZyError::arity(name, "1+", 0))?;
    if rest.is_empty() {
        return match (op, first) {
            (NumericOp::Sub, Sexp::Int(n)) => Ok(Sexp::Int(n.wrapping_neg())),
            (NumericOp::Sub, Sexp::Float(x)) => Ok(Sexp::Float(-x)),
            (_, Sexp::Int(_) | Sexp::Float(_) | Sexp::Uint64(_) | Sexp::Char(_)) => {
                Ok(first.clone())
            }
            (_, other) => Err(not_a_number(other)),
        };
    }
    rest.iter()
        .try_fold(first.clone(), |acc, x| binary_numeric(op, &acc, x))
}

fn int_operand(v: &Sexp) -> Result<i64, ZyError> {
    match v {
        Sexp::Int(n) => Ok(*n),
        Sexp::Uint64(n) => Ok(*n as i64),
        Sexp::Char(c) => Ok(i64::from(u32::from(*c))),
        other => Err(ZyError::type_error("integer", other.type_name())),
    }
}

fn shift_amount(v: &Sexp) -> Result<u32, ZyError> {
    let n = int_operand(v)?;
    u32::try_from(n)
        .ok()
        .filter(|s| *s < 64)
        .ok_or_else(|| ZyError::eval(format!("shift amount out of range: {n}")))
}

/// Integer-only operations; any non-integer operand is a type error.
pub fn binary_integer(op: IntegerOp, a: &Sexp, b: &Sexp) -> Result<Sexp, ZyError> {
    let x = int_operand(a)?;
    let result = match op {
        IntegerOp::Mod => {
            let y = int_operand(b)?;
            if y == 0 {
                return Err(ZyError::eval("division by zero"));
            }
            x.wrapping_rem(y)
        }
        IntegerOp::Sll => x.wrapping_shl(shift_amount(b)?),
        IntegerOp::Sra => x >> shift_amount(b)?,
        IntegerOp::Srl => ((x as u64) >> shift_amount(b)?) as i64,
        IntegerOp::BitAnd => x & int_operand(b)?,
        IntegerOp::BitOr => x | int_operand(b)?,
        IntegerOp::BitXor => x ^ int_operand(b)?,
    };
    Ok(match a {
        Sexp::Uint64(_) => Sexp::Uint64(result as u64),
        _ => Sexp::Int(result),
    })
}

pub fn bit_not(a: &Sexp) -> Result<Sexp, ZyError> {
    match a {
        Sexp::Uint64(n) => Ok(Sexp::Uint64(!n)),
        other => Ok(Sexp::Int(!int_operand(other)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn num(v: &Sexp) -> f64 {
        match v {
            Sexp::Int(n) => *n as f64,
            Sexp::Float(x) => *x,
            _ => f64::NAN,
        }
    }

    #[test]
    fn folds_left_to_right() {
        let args = [Sexp::Int(10), Sexp::Int(3), Sexp::Int(2)];
        assert_eq!(numeric_fold(NumericOp::Sub, "-", &args).unwrap(), Sexp::Int(5));
        assert_eq!(numeric_fold(NumericOp::Div, "/", &args).unwrap(), Sexp::Int(1));
    }

    #[test]
    fn single_operand() {
        assert_eq!(
            numeric_fold(NumericOp::Sub, "-", &[Sexp::Int(4)]).unwrap(),
            Sexp::Int(-4)
        );
        assert_eq!(
            numeric_fold(NumericOp::Add, "+", &[Sexp::Float(1.5)]).unwrap(),
            Sexp::Float(1.5)
        );
        assert!(numeric_fold(NumericOp::Add, "+", &[]).is_err());
    }

    #[test]
    fn int_division_by_zero_fails() {
        assert!(matches!(
            binary_numeric(NumericOp::Div, &Sexp::Int(1), &Sexp::Int(0)),
            Err(ZyError::Eval(_))
        ));
        match binary_numeric(NumericOp::Div, &Sexp::Float(1.0), &Sexp::Int(0)).unwrap() {
            Sexp::Float(x) => assert!(x.is_infinite()),
            other => panic!("expected float, got {other}"),
        }
    }

    #[test]
    fn char_arithmetic() {
        assert_eq!(
            binary_numeric(NumericOp::Add, &Sexp::Char('a'), &Sexp::Int(2)).unwrap(),
            Sexp::Char('c')
        );
        for (op, n) in [(NumericOp::Add, i64::MAX), (NumericOp::Sub, i64::MIN), (NumericOp::Sub, 98)] {
            assert!(matches!(
                binary_numeric(op, &Sexp::Char('a'), &Sexp::Int(n)),
                Err(ZyError::Eval(_))
            ));
        }
    }

    #[test]
    fn integer_ops_reject_floats() {
        for op in [IntegerOp::Mod, IntegerOp::Sll, IntegerOp::BitAnd] {
            assert!(matches!(
                binary_integer(op, &Sexp::Float(1.0), &Sexp::Int(1)),
                Err(ZyError::Type { .. })
            ));
            assert!(matches!(
                binary_integer(op, &Sexp::Int(1), &Sexp::Float(1.0)),
                Err(ZyError::Type { .. })
            ));
        }
    }

    #[test]
    fn shifts() {
        let b = |op, x, y| binary_integer(op, &Sexp::Int(x), &Sexp::Int(y)).unwrap();
        assert_eq!(b(IntegerOp::Sll, 1, 4), Sexp::Int(16));
        assert_eq!(b(IntegerOp::Sra, -16, 2), Sexp::Int(-4));
        assert_eq!(b(IntegerOp::Srl, -1, 60), Sexp::Int(15));
        assert_eq!(b(IntegerOp::Mod, 7, 3), Sexp::Int(1));
        assert_eq!(bit_not(&Sexp::Int(0)).unwrap(), Sexp::Int(-1));
    }

    proptest! {
        #[test]
        fn add_commutes_and_promotes(a in -1_000_000i64..1_000_000, b in -1.0e6f64..1.0e6, c in -1_000_000i64..1_000_000) {
            let (ia, fb, ic) = (Sexp::Int(a), Sexp::Float(b), Sexp::Int(c));
            let ab = binary_numeric(NumericOp::Add, &ia, &fb).unwrap();
            let ba = binary_numeric(NumericOp::Add, &fb, &ia).unwrap();
            prop_assert!(matches!(ab, Sexp::Float(_)));
            prop_assert_eq!(num(&ab), num(&ba));

            let ac = binary_numeric(NumericOp::Add, &ia, &ic).unwrap();
            prop_assert_eq!(&ac, &binary_numeric(NumericOp::Add, &ic, &ia).unwrap());
            prop_assert!(matches!(ac, Sexp::Int(_)));
        }
    }
}
