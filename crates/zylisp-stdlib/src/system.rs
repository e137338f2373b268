use std::io::Write;
use std::process::Command;

use zylisp_core::{check_arity, Catalog, Sexp, ZyError};

use crate::list::flatten_to_words;
use crate::{int_arg, name_arg, str_arg};

pub fn register(c: &mut Catalog) {
    c.register_fn("source", |rt, name, args| {
        check_arity!(args, name, 1..);
        let mut last = Sexp::Null;
        for arg in args {
            let path = str_arg(name, arg)?;
            let text = read_file(name, path)?;
            tracing::debug!(path, "sourcing file");
            last = rt.eval_source(&text)?;
        }
        Ok(last)
    });

    c.register_fn("slurpf", |_rt, name, args| {
        check_arity!(args, name, 1);
        let path = str_arg(name, &args[0])?;
        Ok(Sexp::string(read_file(name, path)?))
    });

    // writef and save refuse to clobber an existing file; owritef overwrites.
    c.register_many(&["writef", "save", "owritef"], |_rt, name, args| {
        check_arity!(args, name, 2);
        let path = str_arg(name, &args[1])?;
        let contents = args[0].to_plain_string();
        if name != "owritef" && std::path::Path::new(path).exists() {
            return Err(ZyError::Io(format!("{name}: refusing to overwrite {path}")));
        }
        std::fs::write(path, contents).map_err(|e| ZyError::Io(format!("{name} {path}: {e}")))?;
        Ok(Sexp::Null)
    });

    // (sys ls -l) takes its words literally; (system "ls" flag) evaluates them.
    c.register_builder("sys", |_rt, name, args| {
        check_arity!(args, name, 1..);
        run_shell(name, &flatten_to_words(args)?)
    });

    c.register_fn("system", |_rt, name, args| {
        check_arity!(args, name, 1..);
        run_shell(name, &flatten_to_words(args)?)
    });

    c.register_many(&["exit", "quit"], |_rt, _name, args| {
        let code = match args.first() {
            Some(v) => int_arg("exit", v)? as i32,
            None => 0,
        };
        let _ = std::io::stdout().flush();
        std::process::exit(code);
    });

    c.register_fn("rmsym", |rt, name, args| {
        check_arity!(args, name, 1);
        let sym = zylisp_core::Symbol::new(&name_arg(name, &args[0])?);
        rt.env_mut().delete_from_top(sym)?;
        Ok(Sexp::Null)
    });

    c.register_fn("getenv", |_rt, name, args| {
        check_arity!(args, name, 1);
        let var = str_arg(name, &args[0])?;
        Ok(Sexp::string(std::env::var(var).unwrap_or_default()))
    });

    c.register_fn("setenv", |_rt, name, args| {
        check_arity!(args, name, 2);
        let var = str_arg(name, &args[0])?;
        let value = str_arg(name, &args[1])?;
        std::env::set_var(var, value);
        Ok(Sexp::Null)
    });

    c.register_fn("now", |_rt, name, args| {
        check_arity!(args, name, 0);
        let now = chrono::Local::now();
        Ok(Sexp::Time(now.with_timezone(now.offset())))
    });
}

fn read_file(name: &str, path: &str) -> Result<String, ZyError> {
    std::fs::read_to_string(path).map_err(|e| ZyError::Io(format!("{name} {path}: {e}")))
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let shell = std::env::var("COMSPEC").unwrap_or_else(|_| "cmd".to_string());
        let mut cmd = Command::new(shell);
        cmd.arg("/c").arg(line);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

/// Run the words as one shell line and return its stdout without the
/// trailing newline. A non-zero exit is an error carrying stderr.
fn run_shell(name: &str, words: &[String]) -> Result<Sexp, ZyError> {
    let line = words.join(" ");
    tracing::debug!(command = %line, "{name}");
    let output = shell_command(&line)
        .output()
        .map_err(|e| ZyError::Io(format!("{name}: {e}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ZyError::Io(format!(
            "{name} `{line}` failed ({}): {}",
            output.status,
            stderr.trim_end()
        )));
    }
    let out = stdout.strip_suffix('\n').unwrap_or(&stdout);
    Ok(Sexp::string(out))
}
