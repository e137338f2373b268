use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use zylisp::{Interpreter, Sexp, ZyError};

#[derive(Parser)]
#[command(name = "zylisp", version, about = "zylisp: an embeddable s-expression runtime")]
struct Cli {
    /// Script to run
    file: Option<String>,

    /// Evaluate an expression and exit
    #[arg(short = 'e', long = "command")]
    command: Option<String>,

    /// Register only functions without filesystem, process or network effects
    #[arg(long)]
    sandbox: bool,

    /// Do not echo results
    #[arg(long)]
    quiet: bool,

    /// Log compiled programs
    #[arg(long)]
    verbose: bool,

    /// Trace every executed instruction
    #[arg(long)]
    trace: bool,

    /// Seed the random source
    #[arg(long)]
    seed: Option<u64>,

    /// Exit with status 1 on the first failing form
    #[arg(long)]
    exit_on_failure: bool,

    /// Enter the REPL after the script finishes
    #[arg(long)]
    after_script_repl: bool,
}

fn init_logging(cli: &Cli) {
    let default = if cli.trace {
        "zylisp_vm=trace"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut builder = Interpreter::builder()
        .sandboxed(cli.sandbox)
        .verbose(cli.verbose)
        .debug_exec(cli.trace);
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    let mut interp = builder.build();

    if let Some(expr) = &cli.command {
        match interp.eval_str(expr) {
            Ok(val) => echo(&cli, &interp, &val),
            Err(e) => {
                report(&e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Some(file) = &cli.file {
        if let Err(e) = interp.eval_file(file) {
            eprintln!("Error in {file}:");
            report(&e);
            if cli.exit_on_failure || !cli.after_script_repl {
                std::process::exit(1);
            }
            interp.reset();
        }
        if !cli.after_script_repl {
            return;
        }
    }

    repl(&cli, interp);
}

fn echo(cli: &Cli, interp: &Interpreter, val: &Sexp) {
    if !cli.quiet && !matches!(val, Sexp::Null) {
        println!("{}", interp.render(val));
    }
}

fn report(e: &ZyError) {
    eprintln!("Error: {e}");
    if let Some(trace) = e.stack_trace() {
        eprint!("{trace}");
    }
}

fn repl(cli: &Cli, mut interp: Interpreter) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: cannot start line editor: {e}");
            std::process::exit(1);
        }
    };
    let history_path = history_dir().join("history.txt");
    let _ = rl.load_history(&history_path);

    if !cli.quiet {
        println!("zylisp v{}", env!("CARGO_PKG_VERSION"));
        println!("Type .quit to exit\n");
    }

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            "zylisp> "
        } else {
            "   ...> "
        };
        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    match run_command(&mut interp, line.trim()) {
                        Command::Quit => break,
                        Command::Handled => continue,
                        Command::NotACommand => {}
                    }
                } else {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                // keep reading while a form is still open
                if let Err(e) = zylisp::read_many(&buffer) {
                    if e.is_incomplete() {
                        continue;
                    }
                }

                let input = std::mem::take(&mut buffer);
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match interp.eval_str(input) {
                    Ok(val) => echo(cli, &interp, &val),
                    Err(e) => {
                        report(&e);
                        if cli.exit_on_failure {
                            std::process::exit(1);
                        }
                        interp.reset();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if !buffer.is_empty() {
                    buffer.clear();
                    println!("^C");
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(history_dir());
    let _ = rl.save_history(&history_path);
}

enum Command {
    Quit,
    Handled,
    NotACommand,
}

fn run_command(interp: &mut Interpreter, line: &str) -> Command {
    let mut words = line.split_whitespace();
    match words.next() {
        Some(".quit") => Command::Quit,
        Some(".dump") => {
            match interp.dump_function(words.next()) {
                Ok(text) => print!("{text}"),
                Err(e) => report(&e),
            }
            Command::Handled
        }
        Some(".ls") => {
            print!("{}", interp.dump_environment());
            Command::Handled
        }
        Some(".verb") => {
            let on = !interp.config().verbose;
            interp.set_verbose(on);
            println!("verbose {}", if on { "on" } else { "off" });
            Command::Handled
        }
        Some(".debug") => {
            interp.set_debug(true);
            println!("instruction tracing on");
            Command::Handled
        }
        Some(".undebug") => {
            interp.set_debug(false);
            println!("instruction tracing off");
            Command::Handled
        }
        _ => Command::NotACommand,
    }
}

fn history_dir() -> std::path::PathBuf {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join(".zylisp")
}
