use crate::hash::HashKind;
use crate::value::Sexp;

/// Render `v` in reader syntax, breaking collections across lines when
/// their one-line form does not fit in `width` columns.
pub fn pretty_print(v: &Sexp, width: usize) -> String {
    let mut out = String::new();
    write_pretty(&mut out, v, 0, width);
    out
}

fn write_pretty(out: &mut String, v: &Sexp, indent: usize, width: usize) {
    let flat = v.to_string();
    if indent + flat.len() <= width {
        out.push_str(&flat);
        return;
    }
    match v {
        Sexp::Hash(h) => {
            let h = h.borrow();
            match h.kind() {
                HashKind::Hash => out.push_str("(hash"),
                kind => {
                    out.push('(');
                    out.push_str(kind.as_str());
                    out.push(' ');
                    out.push_str(h.type_name());
                }
            }
            for (k, val) in h.iter() {
                newline(out, indent + 2);
                let key = k.to_string();
                out.push_str(&key);
                out.push(' ');
                write_pretty(out, val, indent + 3 + key.len(), width);
            }
            out.push(')');
        }
        Sexp::Array(a) => {
            out.push('[');
            for (i, item) in a.borrow().items.iter().enumerate() {
                if i > 0 {
                    newline(out, indent + 1);
                }
                write_pretty(out, item, indent + 1, width);
            }
            out.push(']');
        }
        Sexp::Pair(_) => match v.list_to_vec() {
            Ok(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        newline(out, indent + 2);
                    }
                    write_pretty(out, item, indent + if i == 0 { 1 } else { 2 }, width);
                }
                out.push(')');
            }
            Err(_) => out.push_str(&flat),
        },
        _ => out.push_str(&flat),
    }
}

fn newline(out: &mut String, indent: usize) {
    out.push('\n');
    out.extend(std::iter::repeat(' ').take(indent));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::SexpHash;

    #[test]
    fn short_values_stay_on_one_line() {
        let v = Sexp::array(vec![Sexp::Int(1), Sexp::Int(2)]);
        assert_eq!(pretty_print(&v, 80), "[1 2]");
    }

    #[test]
    fn wide_hashes_put_one_entry_per_line() {
        let mut inner = SexpHash::new();
        inner.set(Sexp::symbol("port"), Sexp::Int(5432));
        let mut h = SexpHash::new();
        h.set(Sexp::symbol("name"), Sexp::string("primary"));
        h.set(Sexp::symbol("db"), Sexp::hash(inner));
        let out = pretty_print(&Sexp::hash(h), 24);
        assert_eq!(out, "(hash\n  name \"primary\"\n  db (hash port 5432))");
    }

    #[test]
    fn wide_arrays_align_under_the_bracket() {
        let items = (0..4).map(|i| Sexp::string(format!("item-{i}"))).collect();
        let out = pretty_print(&Sexp::array(items), 12);
        assert_eq!(out, "[\"item-0\"\n \"item-1\"\n \"item-2\"\n \"item-3\"]");
    }
}
