use std::io::{BufRead, Write};
use std::{env, fs, io, process};

use rlox::Lox;

fn main() {
    let args: Vec<String> = env::args().collect();

    match &args[..] {
        [_] => run_prompt(),
        [_, path] => run_file(path),
        _ => {
            println!("Usage: rlox [script]");
            process::exit(64);
        }
    }
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            println!("Error: could not open file {}", path);
            process::exit(66);
        }
    };

    let mut lox = Lox::new();
    lox.run(&source);

    if lox.had_error() {
        process::exit(65);
    }
    if lox.had_runtime_error() {
        process::exit(70);
    }
}

fn run_prompt() {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut line = String::with_capacity(1024);

    loop {
        print!("> ");
        io::stdout().flush().expect("flush stdout");

        line.clear();
        match handle.read_line(&mut line) {
            // EOF, the user is done (usually Ctrl-D).
            Ok(0) => return,
            Ok(_) => {
                lox.run(&line);
                lox.session.diagnostics.reset();
            }
            Err(error) => {
                println!("Error: {}", error);
                process::exit(70);
            }
        }
    }
}
