use std::io::Write;

use zylisp_core::{check_arity, Catalog, Sexp, Symbol, ZyError};

use crate::{name_arg, str_arg};

pub fn register(c: &mut Catalog) {
    c.register_fn("split", |_rt, name, args| {
        check_arity!(args, name, 2);
        let text = str_arg(name, &args[0])?;
        let sep = str_arg(name, &args[1])?;
        let parts: Vec<Sexp> = if sep.is_empty() {
            text.chars().map(|ch| Sexp::string(ch.to_string())).collect()
        } else {
            text.split(sep).map(Sexp::string).collect()
        };
        Ok(Sexp::array(parts))
    });

    // Lines, without their terminators.
    c.register_fn("nsplit", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        Ok(Sexp::array(text.lines().map(Sexp::string).collect()))
    });

    c.register_fn("chomp", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        Ok(Sexp::string(chomp(text)))
    });

    c.register_fn("trim", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        Ok(Sexp::string(text.trim()))
    });

    c.register_many(&["print", "println"], |_rt, name, args| {
        let line = args
            .iter()
            .map(Sexp::to_plain_string)
            .collect::<Vec<_>>()
            .join(" ");
        if name == "println" {
            println!("{line}");
        } else {
            print!("{line}");
            flush_stdout()?;
        }
        Ok(Sexp::Null)
    });

    c.register_many(&["printf", "sprintf"], |_rt, name, args| {
        check_arity!(args, name, 1..);
        let fmt = str_arg(name, &args[0])?;
        let text = format_printf(fmt, &args[1..])?;
        if name == "sprintf" {
            return Ok(Sexp::string(text));
        }
        print!("{text}");
        flush_stdout()?;
        Ok(Sexp::Null)
    });

    c.register_fn("raw2str", |_rt, name, args| {
        check_arity!(args, name, 1);
        let text = str_arg(name, &args[0])?;
        Ok(Sexp::string(text))
    });

    c.register_fn("str2sym", |_rt, name, args| {
        check_arity!(args, name, 1);
        Ok(Sexp::symbol(str_arg(name, &args[0])?))
    });

    c.register_fn("sym2str", |_rt, name, args| {
        check_arity!(args, name, 1);
        match &args[0] {
            Sexp::Symbol(s) => Ok(Sexp::string(s.name())),
            other => Err(ZyError::type_error("symbol", other.type_name())),
        }
    });

    c.register_fn("gensym", |rt, name, args| {
        if args.len() > 1 {
            return Err(ZyError::arity(name, "0-1", args.len()));
        }
        let prefix = match args.first() {
            Some(p) => name_arg(name, p)?,
            None => "__gensym".to_string(),
        };
        Ok(Sexp::Symbol(rt.gensym(&prefix)))
    });

    c.register_fn("symnum", |_rt, name, args| {
        check_arity!(args, name, 1);
        let sym: Symbol = args[0]
            .as_symbol()
            .ok_or_else(|| ZyError::type_error("symbol", args[0].type_name()))?;
        Ok(Sexp::Int(sym.number() as i64))
    });
}

fn flush_stdout() -> Result<(), ZyError> {
    std::io::stdout().flush().map_err(ZyError::io)
}

fn chomp(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

/// Render a printf-style format. Verbs: `%v` `%s` `%d` `%f` `%.Nf` `%q`
/// `%x` and `%%`.
pub fn format_printf(fmt: &str, args: &[Sexp]) -> Result<String, ZyError> {
    let mut out = String::new();
    let mut next_arg = args.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            precision = Some(digits.parse().unwrap_or(0));
        }
        let verb = chars
            .next()
            .ok_or_else(|| ZyError::eval("printf: format ends in a bare %"))?;
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = next_arg
            .next()
            .ok_or_else(|| ZyError::eval(format!("printf: missing argument for %{verb}")))?;
        match verb {
            'v' | 's' => out.push_str(&arg.to_plain_string()),
            'd' => match arg {
                Sexp::Int(n) => out.push_str(&n.to_string()),
                Sexp::Uint64(n) => out.push_str(&n.to_string()),
                Sexp::Char(c) => out.push_str(&u32::from(*c).to_string()),
                other => return Err(ZyError::type_error("integer (%d)", other.type_name())),
            },
            'f' => {
                let x = match arg {
                    Sexp::Float(x) => *x,
                    Sexp::Int(n) => *n as f64,
                    Sexp::Uint64(n) => *n as f64,
                    other => return Err(ZyError::type_error("number (%f)", other.type_name())),
                };
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), x));
            }
            'q' => out.push_str(&Sexp::string(arg.to_plain_string()).to_string()),
            'x' => match arg {
                Sexp::Int(n) => out.push_str(&format!("{n:x}")),
                Sexp::Uint64(n) => out.push_str(&format!("{n:x}")),
                Sexp::Str(s) => {
                    for b in s.text.bytes() {
                        out.push_str(&format!("{b:02x}"));
                    }
                }
                other => return Err(ZyError::type_error("integer or string (%x)", other.type_name())),
            },
            other => return Err(ZyError::eval(format!("printf: unknown verb %{other}"))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printf_verbs() {
        let args = [
            Sexp::Int(42),
            Sexp::string("hi"),
            Sexp::Float(1.23456),
            Sexp::Int(255),
        ];
        assert_eq!(
            format_printf("%d %s %.2f %x 100%%", &args).unwrap(),
            "42 hi 1.23 ff 100%"
        );
        assert_eq!(
            format_printf("%q", &[Sexp::string("a\"b")]).unwrap(),
            "\"a\\\"b\""
        );
        assert_eq!(format_printf("%v", &[Sexp::Bool(true)]).unwrap(), "true");
    }

    #[test]
    fn printf_argument_errors() {
        assert!(format_printf("%d", &[]).is_err());
        assert!(format_printf("%d", &[Sexp::string("x")]).is_err());
        assert!(format_printf("%z", &[Sexp::Int(1)]).is_err());
        assert!(format_printf("50%", &[]).is_err());
    }

    #[test]
    fn chomp_strips_one_line_ending() {
        assert_eq!(chomp("abc\n"), "abc");
        assert_eq!(chomp("abc\r\n"), "abc");
        assert_eq!(chomp("abc\n\n"), "abc\n");
        assert_eq!(chomp("abc"), "abc");
    }
}
