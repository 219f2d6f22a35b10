use std::rc::Rc;

use rustc_hash::FxHashMap;
use vec_map::VecMap;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt, VariableRef};
use crate::interner::Symbol;
use crate::scanner::Token;
use crate::session::Session;

#[derive(Copy, Clone, Eq, PartialEq)]
enum FunctionContext {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum ClassContext {
    None,
    Class,
    Subclass,
}

/// Static resolution pass. Walks the AST once and records, for every
/// variable-bearing expression, how many frames up the environment chain
/// its binding lives. Names that reach no surrounding scope get no entry
/// and fall through to the globals at runtime.
///
/// Each scope maps a name to a "ready" flag: false between declaration and
/// the end of its initializer, which is how reads of a variable inside its
/// own initializer are caught.
pub struct Resolver<'a> {
    session: &'a Session,
    scopes: Vec<FxHashMap<Symbol, bool>>,
    locals: VecMap<usize>,
    current_function: FunctionContext,
    current_class: ClassContext,
}

impl<'a> Resolver<'a> {
    pub fn new(session: &'a Session) -> Resolver<'a> {
        Resolver {
            session,
            scopes: Vec::new(),
            locals: VecMap::new(),
            current_function: FunctionContext::None,
            current_class: ClassContext::None,
        }
    }

    /// Resolves a program and returns the side table keyed by `ExprId`.
    /// Errors are reported through the diagnostics sink; resolution keeps
    /// going so one pass surfaces as many as possible.
    pub fn resolve(mut self, statements: &[Stmt]) -> VecMap<usize> {
        self.resolve_stmts(statements);
        self.locals
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Function(function) => {
                self.declare(&function.name);
                self.define(&function.name);

                self.resolve_function(function, FunctionContext::Function);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::Print { expression } => self.resolve_expr(expression),
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionContext::None {
                    self.session
                        .error_at(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionContext::Initializer {
                        self.session
                            .error_at(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&VariableRef>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassContext::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if superclass.name.lexeme == name.lexeme {
                self.session
                    .error_at(name, "A class can't inherit from itself.");
            }

            self.current_class = ClassContext::Subclass;
            self.resolve_variable(superclass);

            // Methods of a subclass see `super` one frame outside `this`.
            self.begin_scope();
            self.define_implicit(self.session.interner.sym_super);
        }

        self.begin_scope();
        self.define_implicit(self.session.interner.sym_this);

        for method in methods {
            let context = if method.name.lexeme == self.session.interner.sym_init {
                FunctionContext::Initializer
            } else {
                FunctionContext::Method
            };
            self.resolve_function(method, context);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, function: &FunctionDecl, context: FunctionContext) {
        let enclosing_function = std::mem::replace(&mut self.current_function, context);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { name, value, id } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Grouping { expression } => self.resolve_expr(expression),
            Expr::Literal { .. } => {}
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::Super { keyword, id, .. } => {
                if self.current_class == ClassContext::None {
                    self.session
                        .error_at(keyword, "Can't use 'super' outside of a class.");
                } else if self.current_class != ClassContext::Subclass {
                    self.session
                        .error_at(keyword, "Can't use 'super' in a class with no superclass.");
                }
                self.resolve_local(*id, keyword);
            }
            Expr::This { keyword, id } => {
                if self.current_class == ClassContext::None {
                    self.session
                        .error_at(keyword, "Can't use 'this' outside of class.");
                } else {
                    self.resolve_local(*id, keyword);
                }
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Variable(var) => self.resolve_variable(var),
        }
    }

    fn resolve_variable(&mut self, var: &VariableRef) {
        if let Some(scope) = self.scopes.last() {
            if scope.get(&var.name.lexeme) == Some(&false) {
                self.session.error_at(
                    &var.name,
                    "Can't read local variable in its own initializer.",
                );
            }
        }
        self.resolve_local(var.id, &var.name);
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id.0, depth);
                return;
            }
        }
        // Not found in any scope: the name is global.
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.session
                    .error_at(name, "Already a variable with this name in this scope.");
            }
            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    /// Binds a keyword (`this` / `super`) in the scope just pushed.
    fn define_implicit(&mut self, name: Symbol) {
        self.scopes
            .last_mut()
            .expect("scope just pushed")
            .insert(name, true);
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve_source(session: &Session, source: &str) -> (Vec<Stmt>, VecMap<usize>) {
        let tokens = Scanner::new(session, source.as_bytes()).scan_tokens();
        let statements = Parser::new(session, tokens).parse();
        assert!(!session.diagnostics.had_error(), "parse should succeed");
        let locals = Resolver::new(session).resolve(&statements);
        (statements, locals)
    }

    fn resolve_reports(source: &str) -> Vec<String> {
        let session = Session::new();
        let tokens = Scanner::new(&session, source.as_bytes()).scan_tokens();
        let statements = Parser::new(&session, tokens).parse();
        assert!(!session.diagnostics.had_error(), "parse should succeed");
        Resolver::new(&session).resolve(&statements);
        session.diagnostics.reports()
    }

    #[test]
    fn local_reads_record_their_scope_distance() {
        let session = Session::new();
        let (statements, locals) = resolve_source(&session, "{ var a = 1; { print a; } }");

        let Stmt::Block { statements: outer } = &statements[0] else {
            panic!("expected a block");
        };
        let Stmt::Block { statements: inner } = &outer[1] else {
            panic!("expected the inner block");
        };
        let Stmt::Print {
            expression: Expr::Variable(var),
        } = &inner[0]
        else {
            panic!("expected a variable print");
        };

        assert_eq!(locals.get(var.id.0), Some(&1));
    }

    #[test]
    fn globals_get_no_table_entry() {
        let session = Session::new();
        let (_, locals) = resolve_source(&session, "var a = 1; print a;");
        assert!(locals.is_empty());
    }

    #[test]
    fn parameters_resolve_at_distance_zero() {
        let session = Session::new();
        let (statements, locals) = resolve_source(&session, "fun f(x) { print x; }");

        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected a function declaration");
        };
        let Stmt::Print {
            expression: Expr::Variable(var),
        } = &decl.body[0]
        else {
            panic!("expected a variable print");
        };

        assert_eq!(locals.get(var.id.0), Some(&0));
    }

    #[test]
    fn closures_resolve_across_function_scopes() {
        let session = Session::new();
        let (statements, locals) =
            resolve_source(&session, "fun outer() { var n = 1; fun inner() { print n; } }");

        let Stmt::Function(outer) = &statements[0] else {
            panic!("expected the outer function");
        };
        let Stmt::Function(inner) = &outer.body[1] else {
            panic!("expected the inner function");
        };
        let Stmt::Print {
            expression: Expr::Variable(var),
        } = &inner.body[0]
        else {
            panic!("expected a variable print");
        };

        assert_eq!(locals.get(var.id.0), Some(&1));
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let reports = resolve_reports("return 1;");
        assert!(reports[0].contains("Can't return from top-level code."));
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        let reports = resolve_reports("print this;");
        assert!(reports[0].contains("Can't use 'this' outside of class."));
    }

    #[test]
    fn super_outside_a_class_is_an_error() {
        let reports = resolve_reports("fun f() { super.m(); }");
        assert!(reports[0].contains("Can't use 'super' outside of a class."));
    }

    #[test]
    fn super_without_a_superclass_is_an_error() {
        let reports = resolve_reports("class A { f() { super.f(); } }");
        assert!(reports[0].contains("Can't use 'super' in a class with no superclass."));
    }

    #[test]
    fn a_class_cannot_inherit_from_itself() {
        let reports = resolve_reports("class A < A {}");
        assert!(reports[0].contains("A class can't inherit from itself."));
    }

    #[test]
    fn duplicate_declaration_in_one_scope_is_an_error() {
        let reports = resolve_reports("fun f() { var a = 1; var a = 2; }");
        assert!(reports[0].contains("Already a variable with this name in this scope."));
    }

    #[test]
    fn reading_a_variable_in_its_own_initializer_is_an_error() {
        let reports = resolve_reports("{ var a = a; }");
        assert!(reports[0].contains("Can't read local variable in its own initializer."));
    }

    #[test]
    fn returning_a_value_from_an_initializer_is_an_error() {
        let reports = resolve_reports("class A { init() { return 1; } }");
        assert!(reports[0].contains("Can't return a value from an initializer."));
    }

    #[test]
    fn a_bare_return_in_an_initializer_is_allowed() {
        let reports = resolve_reports("class A { init() { return; } }");
        assert!(reports.is_empty());
    }
}
