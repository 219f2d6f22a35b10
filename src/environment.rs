use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::RuntimeError;
use crate::interner::{Interner, Symbol};
use crate::scanner::Token;
use crate::value::Value;

/// One scope frame. Frames chain through `enclosing` up to the global
/// frame; closures keep their capture frame alive through the `Rc`, so a
/// frame may outlive the block that created it.
pub struct Environment {
    values: RefCell<FxHashMap<Symbol, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<Environment>>) -> Environment {
        Environment {
            values: RefCell::new(FxHashMap::default()),
            enclosing,
        }
    }

    /// Inserts or overwrites in this frame.
    pub fn define(&self, name: Symbol, value: Value) {
        self.values.borrow_mut().insert(name, value);
    }

    /// Looks `name` up through the chain.
    pub fn get(&self, interner: &Interner, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.get(interner, name),
            None => Err(RuntimeError::UndefinedVariable {
                name: interner.resolve(name.lexeme),
                line: name.line,
            }),
        }
    }

    /// Overwrites an existing binding, searching up the chain.
    pub fn assign(
        &self,
        interner: &Interner,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        if self.values.borrow().contains_key(&name.lexeme) {
            self.values.borrow_mut().insert(name.lexeme, value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.assign(interner, name, value),
            None => Err(RuntimeError::UndefinedVariable {
                name: interner.resolve(name.lexeme),
                line: name.line,
            }),
        }
    }

    /// The frame `distance` hops up the chain. The resolver guarantees the
    /// chain is long enough wherever a distance was recorded.
    pub fn ancestor(environment: &Rc<Environment>, distance: usize) -> Rc<Environment> {
        let mut frame = Rc::clone(environment);
        for _ in 0..distance {
            let enclosing = Rc::clone(
                frame
                    .enclosing
                    .as_ref()
                    .expect("resolved past the end of the environment chain"),
            );
            frame = enclosing;
        }
        frame
    }

    /// Reads a binding at an exact depth, bypassing the chain lookup.
    pub fn get_at(environment: &Rc<Environment>, distance: usize, name: Symbol) -> Value {
        Environment::ancestor(environment, distance)
            .values
            .borrow()
            .get(&name)
            .expect("resolved name missing from its frame")
            .clone()
    }

    /// Writes a binding at an exact depth, bypassing the chain lookup.
    pub fn assign_at(environment: &Rc<Environment>, distance: usize, name: Symbol, value: Value) {
        Environment::ancestor(environment, distance)
            .values
            .borrow_mut()
            .insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(interner: &Interner, name: &str) -> Token {
        Token {
            kind: crate::scanner::TokenKind::Identifier,
            lexeme: interner.intern(name),
            literal: None,
            line: 1,
        }
    }

    fn number(value: Result<Value, RuntimeError>) -> f64 {
        match value {
            Ok(Value::Number(num)) => num,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn define_then_get() {
        let interner = Interner::new();
        let env = Environment::new(None);
        let a = ident(&interner, "a");

        env.define(a.lexeme, Value::Number(1.0));
        assert_eq!(number(env.get(&interner, &a)), 1.0);
    }

    #[test]
    fn get_walks_the_chain() {
        let interner = Interner::new();
        let globals = Rc::new(Environment::new(None));
        let a = ident(&interner, "a");
        globals.define(a.lexeme, Value::Number(7.0));

        let inner = Environment::new(Some(Rc::clone(&globals)));
        assert_eq!(number(inner.get(&interner, &a)), 7.0);
    }

    #[test]
    fn assign_updates_the_enclosing_binding() {
        let interner = Interner::new();
        let globals = Rc::new(Environment::new(None));
        let a = ident(&interner, "a");
        globals.define(a.lexeme, Value::Number(1.0));

        let inner = Environment::new(Some(Rc::clone(&globals)));
        inner
            .assign(&interner, &a, Value::Number(2.0))
            .expect("binding exists");

        assert_eq!(number(globals.get(&interner, &a)), 2.0);
    }

    #[test]
    fn assign_to_an_undefined_name_is_an_error() {
        let interner = Interner::new();
        let env = Environment::new(None);
        let ghost = ident(&interner, "ghost");

        let error = env
            .assign(&interner, &ghost, Value::Nil)
            .expect_err("nothing defined");
        assert_eq!(
            error,
            RuntimeError::UndefinedVariable {
                name: String::from("ghost"),
                line: 1,
            }
        );
    }

    #[test]
    fn shadowed_bindings_are_reachable_by_distance() {
        let interner = Interner::new();
        let outer = Rc::new(Environment::new(None));
        let a = ident(&interner, "a");
        outer.define(a.lexeme, Value::Number(1.0));

        let inner = Rc::new(Environment::new(Some(Rc::clone(&outer))));
        inner.define(a.lexeme, Value::Number(2.0));

        assert_eq!(number(inner.get(&interner, &a)), 2.0);
        assert_eq!(number(Ok(Environment::get_at(&inner, 0, a.lexeme))), 2.0);
        assert_eq!(number(Ok(Environment::get_at(&inner, 1, a.lexeme))), 1.0);
    }

    #[test]
    fn assign_at_targets_the_exact_frame() {
        let interner = Interner::new();
        let outer = Rc::new(Environment::new(None));
        let a = ident(&interner, "a");
        outer.define(a.lexeme, Value::Number(1.0));

        let inner = Rc::new(Environment::new(Some(Rc::clone(&outer))));
        inner.define(a.lexeme, Value::Number(2.0));

        Environment::assign_at(&inner, 1, a.lexeme, Value::Number(9.0));
        assert_eq!(number(outer.get(&interner, &a)), 9.0);
        assert_eq!(number(inner.get(&interner, &a)), 2.0);
    }
}
