use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time;

use rustc_hash::FxHashMap;
use vec_map::VecMap;

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt, VariableRef};
use crate::environment::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::interner::Interner;
use crate::scanner::{Token, TokenKind};
use crate::session::Session;
use crate::value::{
    is_equal, is_truthy, string_content, stringify, Class, Instance, LoxFunction, NativeFn, Value,
};

/// Tree-walking evaluator. Holds the global frame, the frame currently in
/// scope, and the resolution table. The table is read-only during
/// evaluation: every `Variable`/`Assign`/`This`/`Super` node either has a
/// recorded distance and goes through `get_at`/`assign_at`, or has none and
/// goes to the globals.
pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: VecMap<usize>,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    pub fn new(interner: &Interner) -> Interpreter {
        Interpreter::with_output(interner, Rc::new(RefCell::new(io::stdout())))
    }

    pub fn with_output(interner: &Interner, out: Rc<RefCell<dyn Write>>) -> Interpreter {
        let globals = Rc::new(Environment::new(None));

        globals.define(
            interner.intern("clock"),
            Value::NativeFn(Rc::new(NativeFn {
                arity: 0,
                body: |_, _| {
                    let now = time::SystemTime::now()
                        .duration_since(time::UNIX_EPOCH)
                        .expect("system clock before UNIX_EPOCH");
                    Ok(Value::Number(now.as_secs_f64()))
                },
            })),
        );

        let environment = Rc::clone(&globals);

        Interpreter {
            globals,
            environment,
            locals: VecMap::new(),
            out,
        }
    }

    /// Merges a resolution table into the side table. Entries are keyed by
    /// session-unique expression ids, so tables from successive REPL lines
    /// never collide.
    pub fn add_resolutions(&mut self, locals: VecMap<usize>) {
        for (id, depth) in locals {
            self.locals.insert(id, depth);
        }
    }

    pub fn interpret(&mut self, session: &Session, statements: &[Stmt]) {
        for statement in statements {
            match self.execute(&session.interner, statement) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => {
                    session.runtime_error(&error);
                    break;
                }
                Err(Unwind::Return(_)) => panic!("return escaped the top level"),
            }
        }
    }

    fn execute(&mut self, interner: &Interner, statement: &Stmt) -> Result<(), Unwind> {
        match statement {
            Stmt::Block { statements } => {
                let frame = Environment::new(Some(Rc::clone(&self.environment)));
                self.execute_block(interner, statements, frame)?;
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(interner, name, superclass.as_ref(), methods)?,
            Stmt::Expression(expr) => {
                self.evaluate(interner, expr)?;
            }
            Stmt::Function(declaration) => {
                let function =
                    LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment), false);
                self.environment
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(interner, condition)?) {
                    self.execute(interner, then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(interner, else_branch)?;
                }
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(interner, expression)?;
                let text = stringify(interner, &value);
                let mut out = self.out.borrow_mut();
                writeln!(out, "{}", text)
                    .and_then(|_| out.flush())
                    .expect("write to output sink");
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(interner, expr)?,
                    None => Value::Nil,
                };
                return Err(Unwind::Return(value));
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(interner, expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme, value);
            }
            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(interner, condition)?) {
                    self.execute(interner, body)?;
                }
            }
        }
        Ok(())
    }

    fn execute_class(
        &mut self,
        interner: &Interner,
        name: &Token,
        superclass: Option<&VariableRef>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass = match superclass {
            Some(var) => match self.look_up_variable(interner, &var.name, var.id)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::SuperclassNotAClass {
                        line: var.name.line,
                    }
                    .into());
                }
            },
            None => None,
        };

        // Two-stage definition so methods can refer to the class by name.
        self.environment.define(name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra frame holding `super`.
        let class_environment = match &superclass {
            Some(class) => {
                let frame = Rc::new(Environment::new(Some(Rc::clone(&self.environment))));
                frame.define(interner.sym_super, Value::Class(Rc::clone(class)));
                frame
            }
            None => Rc::clone(&self.environment),
        };

        let mut class_methods = FxHashMap::default();
        for method in methods {
            let is_initializer = method.name.lexeme == interner.sym_init;
            let function =
                LoxFunction::new(Rc::clone(method), Rc::clone(&class_environment), is_initializer);
            class_methods.insert(method.name.lexeme, function);
        }

        let class = Class::new(name.lexeme, class_methods, superclass);
        self.environment
            .assign(interner, name, Value::Class(Rc::new(class)))?;

        Ok(())
    }

    pub(crate) fn execute_block(
        &mut self,
        interner: &Interner,
        statements: &[Stmt],
        frame: Environment,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, Rc::new(frame));

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(interner, statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn evaluate(&mut self, interner: &Interner, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Assign { name, value, id } => {
                let value = self.evaluate(interner, value)?;
                match self.locals.get(id.0) {
                    Some(distance) => {
                        Environment::assign_at(
                            &self.environment,
                            *distance,
                            name.lexeme,
                            value.clone(),
                        );
                    }
                    None => self.globals.assign(interner, name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(interner, left)?;
                let right = self.evaluate(interner, right)?;
                self.apply_binary(interner, operator, left, right)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(interner, callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(interner, argument)?);
                }

                Ok(self.call_value(interner, paren, callee, &argument_values)?)
            }
            Expr::Get { object, name } => match self.evaluate(interner, object)? {
                Value::Instance(instance) => Ok(Instance::get(&instance, interner, name)?),
                _ => Err(RuntimeError::PropertyOnNonInstance { line: name.line }.into()),
            },
            Expr::Grouping { expression } => self.evaluate(interner, expression),
            Expr::Literal { value } => Ok(match value {
                LiteralValue::Number(num) => Value::Number(*num),
                LiteralValue::String(symbol) => Value::InternedString(*symbol),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(interner, left)?;

                let short_circuits = if operator.kind == TokenKind::Or {
                    is_truthy(&left)
                } else {
                    !is_truthy(&left)
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(interner, right)
                }
            }
            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(interner, object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(interner, value)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::FieldOnNonInstance { line: name.line }.into()),
            },
            Expr::Super { method, id, .. } => self.evaluate_super(interner, method, *id),
            Expr::This { keyword, id } => {
                Ok(self.look_up_variable(interner, keyword, *id)?)
            }
            Expr::Unary { operator, right } => {
                let right = self.evaluate(interner, right)?;

                match operator.kind {
                    TokenKind::Bang => Ok(Value::Bool(!is_truthy(&right))),
                    TokenKind::Minus => match right {
                        Value::Number(num) => Ok(Value::Number(-num)),
                        _ => Err(RuntimeError::UnaryOperandType {
                            line: operator.line,
                        }
                        .into()),
                    },
                    _ => unreachable!("unary operator token"),
                }
            }
            Expr::Variable(var) => Ok(self.look_up_variable(interner, &var.name, var.id)?),
        }
    }

    fn apply_binary(
        &mut self,
        interner: &Interner,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<Value, Unwind> {
        match operator.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (left, right) => match (
                    string_content(interner, &left),
                    string_content(interner, &right),
                ) {
                    (Some(l), Some(r)) => Ok(Value::String(Rc::from(l + &r))),
                    _ => Err(RuntimeError::AdditionOperandTypes {
                        line: operator.line,
                    }
                    .into()),
                },
            },
            TokenKind::Minus => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(l - r))
            }
            TokenKind::Star => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(l * r))
            }
            TokenKind::Slash => {
                let (l, r) = number_operands(operator, &left, &right)?;
                if r == 0.0 {
                    return Err(RuntimeError::DivisionByZero {
                        line: operator.line,
                    }
                    .into());
                }
                Ok(Value::Number(l / r))
            }
            TokenKind::Greater => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l > r))
            }
            TokenKind::GreaterEqual => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l >= r))
            }
            TokenKind::Less => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l < r))
            }
            TokenKind::LessEqual => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l <= r))
            }
            TokenKind::BangEqual => Ok(Value::Bool(!is_equal(&left, &right, interner))),
            TokenKind::EqualEqual => Ok(Value::Bool(is_equal(&left, &right, interner))),
            _ => unreachable!("binary operator token"),
        }
    }

    fn call_value(
        &mut self,
        interner: &Interner,
        paren: &Token,
        callee: Value,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::NativeFn(native) => {
                check_arity(paren, native.arity, arguments.len())?;
                (native.body)(self, arguments)
            }
            Value::Function(function) => {
                check_arity(paren, function.arity(), arguments.len())?;
                function.call(self, interner, arguments)
            }
            Value::Class(class) => {
                check_arity(paren, class.arity(interner), arguments.len())?;
                Class::construct(&class, self, interner, arguments)
            }
            _ => Err(RuntimeError::NotCallable { line: paren.line }),
        }
    }

    fn evaluate_super(
        &mut self,
        interner: &Interner,
        method: &Token,
        id: ExprId,
    ) -> Result<Value, Unwind> {
        let distance = *self.locals.get(id.0).expect("unresolved 'super' expression");

        let superclass = match Environment::get_at(&self.environment, distance, interner.sym_super)
        {
            Value::Class(class) => class,
            _ => unreachable!("'super' bound to a non-class"),
        };
        // The `this` frame sits one hop inside the `super` frame.
        let this = match Environment::get_at(&self.environment, distance - 1, interner.sym_this) {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' bound to a non-instance"),
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(interner, this)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: interner.resolve(method.lexeme),
                line: method.line,
            }
            .into()),
        }
    }

    fn look_up_variable(
        &self,
        interner: &Interner,
        name: &Token,
        id: ExprId,
    ) -> Result<Value, RuntimeError> {
        match self.locals.get(id.0) {
            Some(distance) => Ok(Environment::get_at(
                &self.environment,
                *distance,
                name.lexeme,
            )),
            None => self.globals.get(interner, name),
        }
    }
}

fn number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::BinaryOperandTypes {
            line: operator.line,
        }),
    }
}

fn check_arity(paren: &Token, expected: usize, found: usize) -> Result<(), RuntimeError> {
    if expected == found {
        Ok(())
    } else {
        Err(RuntimeError::WrongArity {
            expected,
            found,
            line: paren.line,
        })
    }
}
