use std::env;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use atom::interpreter::value::Value;
use atom::Interpreter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut interactive = false;
    let mut filename: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-i" | "--interactive" => interactive = true,
            "-f" | "--file" => match args.next() {
                Some(path) => filename = Some(path),
                None => {
                    eprintln!("Error: filename expected");
                    process::exit(1);
                }
            },
            other => {
                eprintln!("Error: unknown argument {}", other);
                usage();
                process::exit(1);
            }
        }
    }

    if filename.is_none() && !interactive {
        usage();
        process::exit(1);
    }

    let mut interp = Interpreter::new();

    if let Some(path) = filename {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("Error: could not read {}: {}", path, error);
                process::exit(1);
            }
        };
        info!(%path, "loading");
        if let Err(error) = interp.run_with(&source, |_, _| {}) {
            eprintln!("Error: {}", error);
        }
    }

    if interactive {
        repl(&mut interp);
    }
}

fn usage() {
    eprintln!("usage: atom [-f | --file <path>] [-i | --interactive]");
}

fn repl(interp: &mut Interpreter) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("Error: could not initialize line editing: {}", error);
            process::exit(1);
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                let result = interp.run_with(&line, |interp, value| {
                    // results the language leaves unspecified are not echoed
                    if value != Value::Unspecified {
                        println!("{}", interp.write_string(value));
                    }
                });
                if let Err(error) = result {
                    eprintln!("Error: {}", error);
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(error) => {
                eprintln!("Error: {}", error);
                break;
            }
        }
    }
}
