//! Tree-walking interpreter for the Lox scripting language.
//!
//! The pipeline is strictly linear: source text is scanned into tokens,
//! parsed into an AST, statically resolved (every variable use gets
//! annotated with its lexical depth), and finally evaluated against a
//! chain of environment frames. Each phase reports into a shared
//! diagnostics sink and later phases are skipped once anything failed.

pub mod ast;
pub mod ast_printer;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod interner;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod value;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::session::Session;

/// One interpreter session: the shared pipeline state plus the evaluator.
/// Feeding several sources through [`Lox::run`] accumulates definitions in
/// the same globals, which is what the REPL relies on.
pub struct Lox {
    pub session: Session,
    interpreter: Interpreter,
}

impl Lox {
    pub fn new() -> Lox {
        let session = Session::new();
        let interpreter = Interpreter::new(&session.interner);
        Lox {
            session,
            interpreter,
        }
    }

    /// A session whose `print` output goes to `out` instead of standard
    /// output.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Lox {
        let session = Session::new();
        let interpreter = Interpreter::with_output(&session.interner, out);
        Lox {
            session,
            interpreter,
        }
    }

    /// Runs one source unit through the whole pipeline.
    pub fn run(&mut self, source: &str) {
        let scanner = Scanner::new(&self.session, source.as_bytes());
        let tokens = scanner.scan_tokens();

        let mut parser = Parser::new(&self.session, tokens);
        let statements = parser.parse();

        if self.session.diagnostics.had_error() {
            return;
        }

        let resolver = Resolver::new(&self.session);
        let locals = resolver.resolve(&statements);

        if self.session.diagnostics.had_error() {
            return;
        }

        self.interpreter.add_resolutions(locals);
        self.interpreter.interpret(&self.session, &statements);
    }

    pub fn had_error(&self) -> bool {
        self.session.diagnostics.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.session.diagnostics.had_runtime_error()
    }
}

impl Default for Lox {
    fn default() -> Lox {
        Lox::new()
    }
}
