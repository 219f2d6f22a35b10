use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::{RuntimeError, Unwind};
use crate::interner::{Interner, Symbol};
use crate::interpreter::Interpreter;
use crate::scanner::Token;

/// A runtime value. Strings come in two representations: literals stay
/// interned, computed strings own their buffer. The two compare and
/// concatenate by content.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    InternedString(Symbol),
    Function(Rc<LoxFunction>),
    NativeFn(Rc<NativeFn>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(num) => write!(f, "Number({})", num),
            Value::String(str) => write!(f, "String({:?})", str),
            Value::InternedString(symbol) => write!(f, "InternedString({:?})", symbol),
            Value::Function(_) => write!(f, "Function"),
            Value::NativeFn(_) => write!(f, "NativeFn"),
            Value::Class(_) => write!(f, "Class"),
            Value::Instance(_) => write!(f, "Instance"),
        }
    }
}

/// `nil` and `false` are falsy, every other value is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// The text of a string value in either representation.
pub fn string_content(interner: &Interner, value: &Value) -> Option<String> {
    match value {
        Value::String(str) => Some(str.to_string()),
        Value::InternedString(symbol) => Some(interner.resolve(*symbol)),
        _ => None,
    }
}

/// Value equality: by content for primitives and strings, by identity for
/// functions, classes and instances. `nil` equals only itself.
pub fn is_equal(left: &Value, right: &Value, interner: &Interner) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
        (Value::NativeFn(l), Value::NativeFn(r)) => Rc::ptr_eq(l, r),
        (Value::Class(l), Value::Class(r)) => Rc::ptr_eq(l, r),
        (Value::Instance(l), Value::Instance(r)) => Rc::ptr_eq(l, r),
        (l, r) => match (string_content(interner, l), string_content(interner, r)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

/// Renders a value the way `print` shows it. Numbers use the shortest
/// round-tripping form, so integral doubles have no trailing fraction.
pub fn stringify(interner: &Interner, value: &Value) -> String {
    match value {
        Value::Nil => String::from("nil"),
        Value::Bool(true) => String::from("true"),
        Value::Bool(false) => String::from("false"),
        Value::Number(num) => format!("{}", num),
        Value::String(str) => str.to_string(),
        Value::InternedString(symbol) => interner.resolve(*symbol),
        Value::Function(function) => format!("<fn {}>", interner.resolve(function.name())),
        Value::NativeFn(_) => String::from("<native fn>"),
        Value::Class(class) => interner.resolve(class.name),
        Value::Instance(instance) => {
            format!("{} instance", interner.resolve(instance.class.name))
        }
    }
}

/// A built-in function provided by the host.
pub struct NativeFn {
    pub arity: usize,
    pub body: fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>,
}

/// A user-declared function: its declaration, the environment captured at
/// declaration time, and whether it is a class initializer.
#[derive(Clone)]
pub struct LoxFunction {
    decl: Rc<FunctionDecl>,
    closure: Rc<Environment>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> LoxFunction {
        LoxFunction {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> Symbol {
        self.decl.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// Invokes the body in a fresh frame chained to the capture. A `return`
    /// unwind is consumed here; an initializer always yields the instance
    /// `this` is bound to, even on a bare `return;`.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        interner: &Interner,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let frame = Environment::new(Some(Rc::clone(&self.closure)));
        for (param, argument) in self.decl.params.iter().zip(arguments) {
            frame.define(param.lexeme, argument.clone());
        }

        let result = interpreter.execute_block(interner, &self.decl.body, frame);

        if self.is_initializer {
            if let Err(Unwind::Error(error)) = result {
                return Err(error);
            }
            return Ok(Environment::get_at(&self.closure, 0, interner.sym_this));
        }

        match result {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    /// A copy of this method bound to `instance`: a one-entry frame that
    /// defines `this` is spliced between the body and the capture.
    pub fn bind(&self, interner: &Interner, instance: Rc<Instance>) -> LoxFunction {
        let frame = Environment::new(Some(Rc::clone(&self.closure)));
        frame.define(interner.sym_this, Value::Instance(instance));
        LoxFunction {
            decl: Rc::clone(&self.decl),
            closure: Rc::new(frame),
            is_initializer: self.is_initializer,
        }
    }
}

/// A class value: the method table plus an optional superclass. Methods
/// are stored unbound; `this` binding happens at lookup time.
pub struct Class {
    pub name: Symbol,
    methods: FxHashMap<Symbol, LoxFunction>,
    superclass: Option<Rc<Class>>,
}

impl Class {
    pub fn new(
        name: Symbol,
        methods: FxHashMap<Symbol, LoxFunction>,
        superclass: Option<Rc<Class>>,
    ) -> Class {
        Class {
            name,
            methods,
            superclass,
        }
    }

    /// Walks the inheritance chain for a method.
    pub fn find_method(&self, name: Symbol) -> Option<&LoxFunction> {
        self.methods.get(&name).or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// A class called as a constructor has the arity of its `init`, found
    /// anywhere on the chain.
    pub fn arity(&self, interner: &Interner) -> usize {
        self.find_method(interner.sym_init)
            .map_or(0, LoxFunction::arity)
    }

    /// Instantiates the class, running `init` when the chain declares one.
    pub fn construct(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        interner: &Interner,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(Instance::new(Rc::clone(class)));
        if let Some(initializer) = class.find_method(interner.sym_init) {
            initializer
                .bind(interner, Rc::clone(&instance))
                .call(interpreter, interner, arguments)?;
        }
        Ok(Value::Instance(instance))
    }
}

/// An object: a class reference plus mutable fields.
pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<FxHashMap<Symbol, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Instance {
        Instance {
            class,
            fields: RefCell::new(FxHashMap::default()),
        }
    }

    /// Property lookup: fields shadow methods; methods come back bound to
    /// the instance.
    pub fn get(
        instance: &Rc<Instance>,
        interner: &Interner,
        name: &Token,
    ) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(name.lexeme) {
            return Ok(Value::Function(Rc::new(
                method.bind(interner, Rc::clone(instance)),
            )));
        }

        Err(RuntimeError::UndefinedProperty {
            name: interner.resolve(name.lexeme),
            line: name.line,
        })
    }

    /// Field writes create or overwrite, never fail.
    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme, value);
    }
}
