use std::fmt::{self, Write};

use zylisp_core::{Op, Prototype};

/// Render a compiled prototype as an instruction listing. Nested function
/// bodies are listed after the body that creates them.
pub fn disassemble(proto: &Prototype) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_proto(&mut out, proto);
    out
}

fn write_proto(out: &mut String, proto: &Prototype) -> fmt::Result {
    let params: Vec<String> = proto.params.iter().map(|p| p.name()).collect();
    write!(out, "== {} ==", proto.name)?;
    if !params.is_empty() || proto.rest.is_some() {
        write!(out, " [{}", params.join(" "))?;
        if let Some(rest) = proto.rest {
            if !params.is_empty() {
                out.push(' ');
            }
            write!(out, "& {rest}")?;
        }
        out.push(']');
    }
    out.push('\n');

    let mut nested = Vec::new();
    for (pc, op) in proto.code.iter().enumerate() {
        let name = op.mnemonic();
        match op {
            Op::Push(val) => writeln!(out, "{pc:04}  {name:<16} ; {val}")?,
            Op::Get(sym)
            | Op::Bind(sym)
            | Op::Assign(sym)
            | Op::DotSet(sym)
            | Op::PushPackage(sym) => {
                writeln!(out, "{pc:04}  {name:<16} {:<4} ; {sym}", sym.number())?
            }
            Op::Jump(offset) | Op::BranchIfFalse(offset) | Op::BranchIfTrue(offset) => {
                let target = (pc as isize + 1 + offset) as usize;
                writeln!(out, "{pc:04}  {name:<16} {offset:<4} ; -> {target:04}")?
            }
            Op::Call(n) | Op::MakeArray(n) => writeln!(out, "{pc:04}  {name:<16} {n}")?,
            Op::MakeClosure(inner) => {
                writeln!(
                    out,
                    "{pc:04}  {name:<16} ; {} ({} args)",
                    inner.name,
                    inner.arity_label()
                )?;
                nested.push(inner.clone());
            }
            Op::Pop | Op::EndForm | Op::Dup | Op::Return | Op::PushScope | Op::PopScope | Op::PopPackage => {
                writeln!(out, "{pc:04}  {name}")?
            }
        }
    }

    for inner in nested {
        out.push('\n');
        write_proto(out, &inner)?;
    }
    Ok(())
}
