use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to one scope.  Closures keep the scope they were defined in
/// alive through this handle; captures are live views, never copies.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope: bindings plus a link to the enclosing scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: a fresh child of `enclosing`, already shared.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Read `name` from the scope exactly `distance` hops out, without
    /// walking further.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let scope = Self::ancestor(env, distance)?;
        let value = scope.borrow().values.get(name).cloned();

        debug!("get_at({}, '{}') -> {:?}", distance, name, value.is_some());

        value
    }

    /// Overwrite `name` in the scope exactly `distance` hops out.  Returns
    /// `false` if that scope has no such binding.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        let Some(scope) = Self::ancestor(env, distance) else {
            return false;
        };

        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut scope: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = Rc::clone(scope.borrow().enclosing.as_ref()?);
            scope = next;
        }

        Some(scope)
    }
}

pub(crate) fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn lookup_walks_outward() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&Environment::child_of(&globals));

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn define_shadows_only_current_scope() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&outer);
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(outer.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_writes_the_declaring_scope() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::Nil);

        let inner = Environment::child_of(&outer);
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Bool(true))
            .unwrap();

        assert_eq!(outer.borrow().get(&ident("a")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn missing_variable_is_a_runtime_error() {
        let env = Environment::new();
        let err = env.get(&ident("nope")).unwrap_err();

        assert_eq!(err.message, "Undefined variable 'nope'.");
        assert_eq!(err.token.lexeme, "nope");
    }

    #[test]
    fn get_at_does_not_walk() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&outer);

        assert_eq!(Environment::get_at(&inner, 0, "a"), None);
        assert_eq!(
            Environment::get_at(&inner, 1, "a"),
            Some(Value::Number(1.0))
        );
        assert_eq!(Environment::get_at(&inner, 2, "a"), None);
    }

    #[test]
    fn assign_at_targets_exact_scope() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&outer);
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert!(Environment::assign_at(&inner, 1, "a", Value::Number(3.0)));
        assert!(!Environment::assign_at(&inner, 0, "b", Value::Nil));

        assert_eq!(
            Environment::get_at(&inner, 0, "a"),
            Some(Value::Number(2.0))
        );
        assert_eq!(
            Environment::get_at(&outer, 0, "a"),
            Some(Value::Number(3.0))
        );
    }
}
