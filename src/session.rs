use std::cell::Cell;

use crate::ast::ExprId;
use crate::diagnostics::Diagnostics;
use crate::error::RuntimeError;
use crate::interner::Interner;
use crate::scanner::{Token, TokenKind};

/// State shared by every phase of one interpreter session: the diagnostics
/// sink, the interner, and the expression id counter. Ids are drawn from
/// the session rather than the parser so that they stay unique across REPL
/// lines; the resolution table outlives individual source units.
pub struct Session {
    pub diagnostics: Diagnostics,
    pub interner: Interner,
    next_expr_id: Cell<usize>,
}

impl Session {
    pub fn new() -> Session {
        Session {
            diagnostics: Diagnostics::new(),
            interner: Interner::new(),
            next_expr_id: Cell::new(0),
        }
    }

    pub fn fresh_expr_id(&self) -> ExprId {
        let id = self.next_expr_id.get();
        self.next_expr_id.set(id + 1);
        ExprId(id)
    }

    pub fn error(&self, line: u64, message: &str) {
        self.diagnostics.error(line, message);
    }

    pub fn error_at(&self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.diagnostics.report(token.line, " at end", message);
        } else {
            let lexeme = self.interner.resolve(token.lexeme);
            self.diagnostics
                .report(token.line, &format!(" at '{}'", lexeme), message);
        }
    }

    pub fn runtime_error(&self, error: &RuntimeError) {
        self.diagnostics
            .runtime_error(error.line(), &error.to_string());
    }
}

impl Default for Session {
    fn default() -> Session {
        Session::new()
    }
}
